use anyhow::{Context, Result};
use std::path::PathBuf;

use specmatch::formats;

/// Display information about a spectral file
pub fn run(file: PathBuf) -> Result<()> {
    if !file.exists() {
        anyhow::bail!("File does not exist: {}", file.display());
    }

    let decoded = formats::decode(&file)
        .with_context(|| format!("cannot decode {}", file.display()))?;
    let spectrum = &decoded.spectrum;
    let (xlo, xhi) = spectrum.x_bounds();
    let (ylo, yhi) = spectrum.y_bounds();

    println!("Spectral File Information");
    println!("=========================");
    println!("File:   {}", file.display());
    println!("Format: {}", decoded.format);
    println!();
    println!("Trace:");
    println!("  Points:    {}", spectrum.len());
    println!("  x range:   {xlo:.1} .. {xhi:.1}");
    println!("  y range:   {ylo:.4} .. {yhi:.4}");

    match &decoded.peaks {
        Some(peaks) if !peaks.is_empty() => {
            println!();
            println!("Tagged peaks: {}", peaks.len());
            for (x, y) in peaks.x().iter().zip(peaks.y()) {
                println!("  {x:>10.1}  {y:>10.4}");
            }
        }
        Some(_) => {
            println!();
            println!("Tagged peaks: none (empty block)");
        }
        None => {}
    }

    Ok(())
}
