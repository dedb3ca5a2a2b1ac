//! Persisted reference library cache.
//!
//! Building a library walks thousands of files; the result is therefore
//! serialized to one JSON blob per collection kind inside the user data
//! directory. The blob records the cache format version and the build
//! parameters alongside the entries, so a later load can report what the
//! cached library was built with. Writes go through a temporary file that
//! is atomically renamed into place, leaving either the old or the new
//! blob on disk after a crash, never a torn one.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use super::{LibraryConfig, LibraryKind, ReferenceLibrary};

/// Bumped whenever the serialized layout changes; older blobs are treated
/// as absent.
const CACHE_VERSION: u32 = 1;

/// Errors from loading or storing a cache blob.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// Filesystem access failed.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// The blob exists but does not deserialize.
    #[error("malformed cache blob: {0}")]
    Json(#[from] serde_json::Error),

    /// The freshly written blob could not replace the old one.
    #[error("cannot persist cache blob: {0}")]
    Persist(#[from] tempfile::PersistError),
}

/// A built library together with the parameters that produced it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedLibrary {
    version: u32,
    /// Build parameters the cached library was created with.
    pub config: LibraryConfig,
    /// The cached entries.
    pub library: ReferenceLibrary,
}

impl CachedLibrary {
    /// Wrap a freshly built library for storage.
    pub fn new(config: LibraryConfig, library: ReferenceLibrary) -> Self {
        Self {
            version: CACHE_VERSION,
            config,
            library,
        }
    }
}

/// File-backed cache living in one directory, one blob per
/// [`LibraryKind`].
#[derive(Debug, Clone)]
pub struct LibraryCache {
    dir: PathBuf,
}

impl LibraryCache {
    /// A cache rooted at `dir`. The directory is created on first store.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Path of the blob for one collection kind.
    pub fn blob_path(&self, kind: LibraryKind) -> PathBuf {
        self.dir.join(kind.cache_file_name())
    }

    /// Load the cached library for `kind`.
    ///
    /// A missing blob or one written by an older cache version yields
    /// `Ok(None)`; a blob that exists but cannot be parsed is an error so
    /// the caller can surface it instead of silently rebuilding.
    pub fn load(&self, kind: LibraryKind) -> Result<Option<CachedLibrary>, CacheError> {
        let path = self.blob_path(kind);
        let file = match File::open(&path) {
            Ok(file) => file,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        let cached: CachedLibrary = serde_json::from_reader(BufReader::new(file))?;
        if cached.version != CACHE_VERSION {
            log::debug!(
                "ignoring {} cache with version {} (current {CACHE_VERSION})",
                kind,
                cached.version
            );
            return Ok(None);
        }
        Ok(Some(cached))
    }

    /// Write the blob for `kind`, replacing any previous one atomically.
    pub fn store(&self, kind: LibraryKind, cached: &CachedLibrary) -> Result<(), CacheError> {
        fs::create_dir_all(&self.dir)?;
        let staging = NamedTempFile::new_in(&self.dir)?;
        {
            let mut writer = BufWriter::new(staging.as_file());
            serde_json::to_writer(&mut writer, cached)?;
            writer.flush()?;
        }
        staging.persist(self.blob_path(kind))?;
        log::info!("wrote {} library cache", kind);
        Ok(())
    }

    /// Delete the blob for `kind`; returns whether one existed.
    pub fn invalidate(&self, kind: LibraryKind) -> Result<bool, CacheError> {
        match fs::remove_file(self.blob_path(kind)) {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(false),
            Err(err) => Err(err.into()),
        }
    }

    /// Delete every cached blob, for use after an archive refresh.
    pub fn invalidate_all(&self) -> Result<(), CacheError> {
        for kind in [LibraryKind::Raman, LibraryKind::Infrared] {
            self.invalidate(kind)?;
        }
        Ok(())
    }

    /// The directory this cache lives in.
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spectrum::Spectrum;

    fn sample_library() -> ReferenceLibrary {
        let mut library = ReferenceLibrary::new();
        let spectrum =
            Spectrum::new(vec![100.0, 200.0, 300.0], vec![0.1, 0.9, 0.4]).expect("spectrum");
        library.insert("Min__780__R1".to_string(), spectrum);
        library
    }

    #[test]
    fn missing_blob_loads_as_none() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cache = LibraryCache::new(dir.path());
        assert!(cache.load(LibraryKind::Raman).expect("load").is_none());
    }

    #[test]
    fn store_then_load_round_trips_entries_and_config() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cache = LibraryCache::new(dir.path());
        let config = LibraryConfig {
            max_similar: 3,
            preferred_laser: 532.0,
        };
        cache
            .store(
                LibraryKind::Raman,
                &CachedLibrary::new(config, sample_library()),
            )
            .expect("store");

        let loaded = cache
            .load(LibraryKind::Raman)
            .expect("load")
            .expect("present");
        assert_eq!(loaded.config, config);
        assert_eq!(loaded.library.len(), 1);
        let spectrum = loaded.library.get("Min__780__R1").expect("entry");
        assert_eq!(spectrum.x(), &[100.0, 200.0, 300.0]);
    }

    #[test]
    fn kinds_use_separate_blobs() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cache = LibraryCache::new(dir.path());
        cache
            .store(
                LibraryKind::Raman,
                &CachedLibrary::new(LibraryConfig::default(), sample_library()),
            )
            .expect("store");

        assert!(cache.load(LibraryKind::Raman).expect("load").is_some());
        assert!(cache.load(LibraryKind::Infrared).expect("load").is_none());
    }

    #[test]
    fn invalidate_removes_the_blob() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cache = LibraryCache::new(dir.path());
        cache
            .store(
                LibraryKind::Raman,
                &CachedLibrary::new(LibraryConfig::default(), sample_library()),
            )
            .expect("store");

        assert!(cache.invalidate(LibraryKind::Raman).expect("invalidate"));
        assert!(!cache.invalidate(LibraryKind::Raman).expect("second"));
        assert!(cache.load(LibraryKind::Raman).expect("load").is_none());
    }

    #[test]
    fn stale_version_loads_as_none() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cache = LibraryCache::new(dir.path());
        let mut cached = CachedLibrary::new(LibraryConfig::default(), sample_library());
        cached.version = 0;
        cache.store(LibraryKind::Raman, &cached).expect("store");

        assert!(cache.load(LibraryKind::Raman).expect("load").is_none());
    }

    #[test]
    fn malformed_blob_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cache = LibraryCache::new(dir.path());
        std::fs::create_dir_all(dir.path()).expect("mkdir");
        std::fs::write(cache.blob_path(LibraryKind::Raman), b"{ not json").expect("write");

        assert!(matches!(
            cache.load(LibraryKind::Raman),
            Err(CacheError::Json(_))
        ));
    }
}
