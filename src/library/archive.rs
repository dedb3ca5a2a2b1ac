//! Reference archive layout and installation.
//!
//! The reference collection ships as five zip archives published under a
//! fixed base URL. Fetching them is left to the caller (a browser, curl,
//! or any download layer); this module owns everything after the bytes
//! exist locally: the per-user data directory, the archive naming scheme,
//! replace-then-extract installation, and the "last updated" report the
//! status output shows. Installing an archive invalidates the persisted
//! library caches, since they were built from the previous contents.

use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Utc};

use super::cache::{CacheError, LibraryCache};

/// Where the published archives live.
pub const ARCHIVE_BASE_URL: &str = "https://rruff.info/zipped_data_files/";

/// Shown by the status report when no archive has been installed.
pub const NEVER_UPDATED: &str = "None downloaded yet!";

/// Errors from data directory resolution or archive installation.
#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    /// The platform reports no home directory to anchor the data dir in.
    #[error("cannot determine a home directory for the data dir")]
    NoHome,

    /// Filesystem access failed.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// The archive file is not a readable zip.
    #[error("cannot unpack archive: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// Cache invalidation after install failed.
    #[error(transparent)]
    Cache(#[from] CacheError),
}

/// One published reference archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dataset {
    /// Collection category on the server (`raman` or `infrared`).
    pub category: &'static str,
    /// Archive name within the category.
    pub name: &'static str,
}

impl Dataset {
    /// Every archive the reference library is built from.
    pub const ALL: [Dataset; 5] = [
        Dataset {
            category: "raman",
            name: "excellent_unoriented",
        },
        Dataset {
            category: "raman",
            name: "fair_unoriented",
        },
        Dataset {
            category: "raman",
            name: "poor_unoriented",
        },
        Dataset {
            category: "raman",
            name: "unrated_unoriented",
        },
        Dataset {
            category: "infrared",
            name: "Processed",
        },
    ];

    /// Directory the archive unpacks into, also used as its local stem.
    pub fn dir_name(&self) -> String {
        format!("{}_{}", self.category, self.name)
    }

    /// Download URL for this archive.
    pub fn url(&self) -> String {
        format!("{ARCHIVE_BASE_URL}{}/{}.zip", self.category, self.name)
    }

    /// Look an archive up by its local directory name.
    pub fn by_dir_name(name: &str) -> Option<&'static Dataset> {
        Self::ALL.iter().find(|d| d.dir_name() == name)
    }
}

/// The per-user data directory holding archives, unpacked references, and
/// cache blobs.
#[derive(Debug, Clone)]
pub struct DataDir {
    root: PathBuf,
}

impl DataDir {
    /// The default location, `~/.specmatch`.
    pub fn resolve() -> Result<Self, ArchiveError> {
        let home = dirs::home_dir().ok_or(ArchiveError::NoHome)?;
        Ok(Self {
            root: home.join(".specmatch"),
        })
    }

    /// An explicit location, for tests and the `--data-dir` flag.
    pub fn at(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root of the data directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Where archives and their unpacked trees live.
    pub fn reference_dir(&self) -> PathBuf {
        self.root.join("reference_library")
    }

    /// Local path of one dataset's zip file.
    pub fn archive_path(&self, dataset: &Dataset) -> PathBuf {
        self.reference_dir().join(format!("{}.zip", dataset.dir_name()))
    }

    /// Local path of one dataset's unpacked directory.
    pub fn extract_path(&self, dataset: &Dataset) -> PathBuf {
        self.reference_dir().join(dataset.dir_name())
    }

    /// Cache object for the library blobs stored at the data dir root.
    pub fn library_cache(&self) -> LibraryCache {
        LibraryCache::new(&self.root)
    }
}

/// Install a downloaded archive: remove any previous copy and its
/// unpacked directory, move the zip into place, extract it, and
/// invalidate the library caches.
///
/// Returns the directory the archive was unpacked into.
pub fn install_archive(
    data: &DataDir,
    dataset: &Dataset,
    source_zip: &Path,
) -> Result<PathBuf, ArchiveError> {
    let refdir = data.reference_dir();
    fs::create_dir_all(&refdir)?;

    let local_zip = data.archive_path(dataset);
    let extract_dir = data.extract_path(dataset);
    if local_zip.exists() {
        log::info!("replacing existing archive {}", local_zip.display());
        fs::remove_file(&local_zip)?;
    }
    if extract_dir.exists() {
        fs::remove_dir_all(&extract_dir)?;
    }

    fs::copy(source_zip, &local_zip)?;
    let file = File::open(&local_zip)?;
    let mut archive = zip::ZipArchive::new(BufReader::new(file))?;
    archive.extract(&extract_dir)?;
    log::info!(
        "unpacked {} entries into {}",
        archive.len(),
        extract_dir.display()
    );

    data.library_cache().invalidate_all()?;
    Ok(extract_dir)
}

/// True when the dataset's zip is present locally.
pub fn is_installed(data: &DataDir, dataset: &Dataset) -> bool {
    data.archive_path(dataset).is_file()
}

/// Human-readable date of the oldest installed archive, or
/// [`NEVER_UPDATED`] when nothing is installed.
///
/// The oldest modification time is the honest answer to "how stale is my
/// reference data": newer archives do not refresh the ones still sitting
/// at their old version.
pub fn last_updated(data: &DataDir) -> String {
    let mut oldest: Option<SystemTime> = None;
    for dataset in &Dataset::ALL {
        let Ok(metadata) = fs::metadata(data.archive_path(dataset)) else {
            continue;
        };
        let Ok(modified) = metadata.modified() else {
            continue;
        };
        oldest = Some(match oldest {
            Some(t) if t <= modified => t,
            _ => modified,
        });
    }
    match oldest {
        Some(time) => DateTime::<Utc>::from(time).format("%Y-%m-%d").to_string(),
        None => NEVER_UPDATED.to_string(),
    }
}
