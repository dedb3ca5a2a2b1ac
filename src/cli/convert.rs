use anyhow::{Context, Result};
use log::info;
use std::path::PathBuf;

use specmatch::formats::{self, lrd, rruff};

use super::OutputFormatArg;

/// Convert a spectral file to the RRUFF or LRD layout
pub fn run(
    input: PathBuf,
    output: PathBuf,
    format: OutputFormatArg,
    name: Option<String>,
) -> Result<()> {
    if !input.exists() {
        anyhow::bail!("Input file does not exist: {}", input.display());
    }

    let decoded = formats::decode(&input)
        .with_context(|| format!("cannot decode {}", input.display()))?;
    info!(
        "decoded {} as {} ({} points)",
        input.display(),
        decoded.format,
        decoded.spectrum.len()
    );

    // Header name defaults to the input stem.
    let name = name.unwrap_or_else(|| {
        input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "unnamed".to_string())
    });

    match format {
        OutputFormatArg::Rruff => rruff::write_file(&output, &name, &decoded.spectrum),
        OutputFormatArg::Lrd => lrd::write_file(&output, &name, &decoded.spectrum),
    }
    .with_context(|| format!("cannot write {}", output.display()))?;

    println!(
        "Wrote {} ({} points) to {}",
        name,
        decoded.spectrum.len(),
        output.display()
    );
    Ok(())
}
