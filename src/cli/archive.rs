use anyhow::{Context, Result};
use std::path::PathBuf;

use specmatch::library::archive::{self, DataDir, Dataset};

/// Show which archives are installed and how old they are
pub fn run_status(data: DataDir) -> Result<()> {
    println!("Reference archive status");
    println!("========================");
    println!("Data directory: {}", data.root().display());
    println!("Last updated:   {}", archive::last_updated(&data));
    println!();
    for dataset in &Dataset::ALL {
        let state = if archive::is_installed(&data, dataset) {
            "installed"
        } else {
            "missing"
        };
        println!("  {:<32} {:<10} {}", dataset.dir_name(), state, dataset.url());
    }
    Ok(())
}

/// Install a downloaded archive zip into the data directory
pub fn run_install(data: DataDir, dataset: &str, zip: PathBuf) -> Result<()> {
    let Some(dataset) = Dataset::by_dir_name(dataset) else {
        let known: Vec<String> = Dataset::ALL.iter().map(Dataset::dir_name).collect();
        anyhow::bail!(
            "unknown dataset {dataset:?}; expected one of: {}",
            known.join(", ")
        );
    };
    if !zip.exists() {
        anyhow::bail!("Archive file does not exist: {}", zip.display());
    }

    let extracted = archive::install_archive(&data, dataset, &zip)
        .with_context(|| format!("cannot install {}", zip.display()))?;
    println!(
        "Installed {} into {} (library caches invalidated)",
        dataset.dir_name(),
        extracted.display()
    );
    Ok(())
}
