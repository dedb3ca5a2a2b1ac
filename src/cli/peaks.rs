use anyhow::{Context, Result};
use log::info;
use std::path::PathBuf;

use specmatch::baseline::{BaselineConfig, BaselineMode};
use specmatch::formats;
use specmatch::normalize::{normalize, Window};
use specmatch::peaks::find_peaks;

/// Detect and list prominent peaks in a spectrum
#[allow(clippy::too_many_arguments)]
pub fn run(
    file: PathBuf,
    xmin: f64,
    xmax: f64,
    prominence: f64,
    subtract_baseline: bool,
    smoothness: f64,
    asymmetry: f64,
) -> Result<()> {
    if !file.exists() {
        anyhow::bail!("Input file does not exist: {}", file.display());
    }

    let decoded = formats::decode(&file)
        .with_context(|| format!("cannot decode {}", file.display()))?;
    info!(
        "decoded {} as {} ({} points)",
        file.display(),
        decoded.format,
        decoded.spectrum.len()
    );

    let mode = if subtract_baseline {
        BaselineMode::Remove
    } else {
        BaselineMode::None
    };
    let cleaned = normalize(
        &decoded.spectrum,
        decoded.peaks.as_ref(),
        &Window::new(xmin, xmax),
        &BaselineConfig::from_decades(smoothness, asymmetry, mode),
    )
    .context("cannot normalize the spectrum")?;

    let detected = find_peaks(cleaned.spectrum.x(), cleaned.spectrum.y(), prominence);
    if detected.is_empty() {
        println!("No peaks above {prominence}% prominence in ({xmin}, {xmax})");
        return Ok(());
    }

    println!("{} peaks above {prominence}% prominence:", detected.len());
    println!("{:>10}  {:>10}  {:>12}", "position", "intensity", "prominence");
    for peak in &detected {
        println!("{:>10}  {:>10.4}  {:>12.4}", peak.label, peak.y, peak.prominence);
    }

    if let Some(tagged) = &cleaned.peaks {
        if !tagged.is_empty() {
            println!("\n{} peaks tagged by the source file:", tagged.len());
            for (x, y) in tagged.x().iter().zip(tagged.y()) {
                println!("{x:>10.1}  {y:>10.4}");
            }
        }
    }

    Ok(())
}
