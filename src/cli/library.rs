use anyhow::{Context, Result};
use log::info;

use specmatch::library::archive::DataDir;
use specmatch::library::cache::CachedLibrary;
use specmatch::library::{build_library, LibraryConfig, LibraryKind, ReferenceLibrary};

/// Load the cached library for `kind`, building and caching it when no
/// usable blob exists (or when `force` discards the existing one).
///
/// A cached blob wins even when it was built with different parameters;
/// the mismatch is logged so the user knows a `--force` rebuild would
/// change the selection.
pub fn load_or_build(
    data: &DataDir,
    kind: LibraryKind,
    config: &LibraryConfig,
    force: bool,
) -> Result<ReferenceLibrary> {
    let cache = data.library_cache();
    if force {
        cache.invalidate(kind)?;
    } else if let Some(cached) = cache.load(kind)? {
        if cached.config != *config {
            info!(
                "using cached {} library built with max_similar={} preferred_laser={}; \
                 rebuild with --force to apply the requested parameters",
                kind, cached.config.max_similar, cached.config.preferred_laser
            );
        }
        return Ok(cached.library);
    }

    let refdir = data.reference_dir();
    info!("building {} library from {}", kind, refdir.display());
    let library = build_library(&refdir, kind, config)
        .with_context(|| format!("cannot scan {}", refdir.display()))?;
    cache
        .store(kind, &CachedLibrary::new(*config, library.clone()))
        .context("cannot persist the library cache")?;
    Ok(library)
}

/// Scan the reference archive and cache the built library
pub fn run_build(
    data: DataDir,
    kind: LibraryKind,
    max_similar: usize,
    preferred_laser: f64,
    force: bool,
) -> Result<()> {
    let config = LibraryConfig {
        max_similar,
        preferred_laser,
    };
    let library = load_or_build(&data, kind, &config, force)?;
    println!(
        "{} library ready: {} entries (cache: {})",
        kind,
        library.len(),
        data.library_cache().blob_path(kind).display()
    );
    Ok(())
}

/// Report what the cached library contains
pub fn run_info(data: DataDir, kind: LibraryKind) -> Result<()> {
    let cache = data.library_cache();
    match cache.load(kind)? {
        Some(cached) => {
            println!("{} library cache: {}", kind, cache.blob_path(kind).display());
            println!("  Entries:         {}", cached.library.len());
            println!("  max_similar:     {}", cached.config.max_similar);
            println!("  preferred_laser: {}", cached.config.preferred_laser);
        }
        None => {
            println!(
                "no cached {} library at {}; run `specmatch library build` first",
                kind,
                cache.blob_path(kind).display()
            );
        }
    }
    Ok(())
}
