use anyhow::{Context, Result};
use log::info;
use std::path::PathBuf;

use specmatch::baseline::{BaselineConfig, BaselineMode};
use specmatch::formats;
use specmatch::library::archive::DataDir;
use specmatch::library::{LibraryConfig, LibraryKind};
use specmatch::normalize::{normalize, Window};
use specmatch::score::{score_all, Metric};

use super::library::load_or_build;

/// Everything the identify command needs, gathered by the dispatcher.
pub struct IdentifyArgs {
    pub file: PathBuf,
    pub kind: LibraryKind,
    pub data_dir: DataDir,
    pub xmin: f64,
    pub xmax: f64,
    pub smoothness: f64,
    pub asymmetry: f64,
    pub no_baseline: bool,
    pub recalibrate: Option<(f64, f64)>,
    pub resolution: f64,
    pub top: usize,
    pub max_similar: usize,
    pub preferred_laser: f64,
}

/// Identify a spectrum against the reference library
pub fn run(args: IdentifyArgs) -> Result<()> {
    if !args.file.exists() {
        anyhow::bail!("Input file does not exist: {}", args.file.display());
    }

    let decoded = formats::decode(&args.file)
        .with_context(|| format!("cannot decode {}", args.file.display()))?;
    info!(
        "decoded {} as {} ({} points)",
        args.file.display(),
        decoded.format,
        decoded.spectrum.len()
    );

    let mut spectrum = decoded.spectrum;
    if let Some((slope, intercept)) = args.recalibrate {
        spectrum = spectrum
            .recalibrate(slope, intercept)
            .context("axis recalibration failed")?;
        info!("recalibrated axis: x' = {slope} * x + {intercept}");
    }

    let mode = if args.no_baseline {
        BaselineMode::None
    } else {
        BaselineMode::Remove
    };
    let baseline = BaselineConfig::from_decades(args.smoothness, args.asymmetry, mode);
    let cleaned = normalize(
        &spectrum,
        None,
        &Window::new(args.xmin, args.xmax),
        &baseline,
    )
    .context("cannot normalize the query spectrum")?;

    let config = LibraryConfig {
        max_similar: args.max_similar,
        preferred_laser: args.preferred_laser,
    };
    let library = load_or_build(&args.data_dir, args.kind, &config, false)?;
    if library.is_empty() {
        anyhow::bail!(
            "the {} reference library is empty; install archives with `specmatch archive install` first",
            args.kind
        );
    }

    info!(
        "scoring against {} reference spectra at resolution {}",
        library.len(),
        args.resolution
    );
    let report = score_all(&cleaned.spectrum, &library, args.resolution);

    let failed = report.failures().count();
    if failed > 0 {
        info!("{failed} reference entries could not be compared (scored 0.0)");
    }

    for metric in Metric::ALL {
        println!("Top matches by {metric}:");
        for (rank, candidate) in report
            .top_candidates(metric, args.top)
            .into_iter()
            .enumerate()
        {
            println!("  {:2}. {:<50} {:.4}", rank + 1, candidate.key, candidate.score);
        }
        println!();
    }

    Ok(())
}
