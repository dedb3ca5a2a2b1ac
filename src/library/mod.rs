//! Reference library construction.
//!
//! A reference library maps entry keys to known spectra. It is built by
//! scanning quality-tiered directories of reference files whose names
//! encode identity fields, selecting a bounded subset per mineral, and
//! decoding the survivors with the format layer.
//!
//! Selection is deterministic: candidates are ranked by quality tier
//! (descending), distance from the preferred laser wavelength (ascending),
//! and catalog id (descending string order), then truncated to
//! `max_similar` per mineral. Infrared references skip selection entirely;
//! every discovered file is kept.
//!
//! Persisted caching of built libraries lives in [`cache`]; fetching and
//! unpacking the reference archives lives in [`archive`].

pub mod archive;
pub mod cache;

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::formats;
use crate::spectrum::Spectrum;

/// Errors raised while scanning a reference directory tree.
#[derive(Debug, thiserror::Error)]
pub enum LibraryError {
    /// Directory listing failed.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

/// Which reference collection to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LibraryKind {
    /// Raman spectra, tiered by measurement quality.
    Raman,
    /// Processed infrared spectra, one untiered collection.
    Infrared,
}

/// One scanned subdirectory and the quality tier it confers.
#[derive(Debug, Clone, Copy)]
pub struct QualityTier {
    /// Subdirectory name under the reference root.
    pub dir: &'static str,
    /// Ordinal quality, higher is better.
    pub quality: u8,
}

const RAMAN_TIERS: [QualityTier; 4] = [
    QualityTier {
        dir: "raman_excellent_unoriented",
        quality: 3,
    },
    QualityTier {
        dir: "raman_fair_unoriented",
        quality: 2,
    },
    QualityTier {
        dir: "raman_poor_unoriented",
        quality: 1,
    },
    QualityTier {
        dir: "raman_unrated_unoriented",
        quality: 0,
    },
];

const INFRARED_TIERS: [QualityTier; 1] = [QualityTier {
    dir: "infrared_Processed",
    quality: 3,
}];

impl LibraryKind {
    /// The tier directories scanned for this collection.
    pub fn tiers(self) -> &'static [QualityTier] {
        match self {
            LibraryKind::Raman => &RAMAN_TIERS,
            LibraryKind::Infrared => &INFRARED_TIERS,
        }
    }

    /// File name of the persisted cache blob for this collection.
    pub fn cache_file_name(self) -> &'static str {
        match self {
            LibraryKind::Raman => "raman_reflib.json",
            LibraryKind::Infrared => "infrared_reflib.json",
        }
    }
}

impl fmt::Display for LibraryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LibraryKind::Raman => write!(f, "Raman"),
            LibraryKind::Infrared => write!(f, "infrared"),
        }
    }
}

/// Build parameters for the Raman selection step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LibraryConfig {
    /// Upper bound on entries kept per mineral.
    pub max_similar: usize,
    /// Laser wavelength (nm) candidates are ranked towards.
    pub preferred_laser: f64,
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            max_similar: 2,
            preferred_laser: 780.0,
        }
    }
}

/// One reference file discovered during a scan, identity fields parsed
/// from its name.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceEntry {
    /// Mineral name, the grouping identity.
    pub mineral: String,
    /// External catalog id; for infrared entries this also carries the
    /// per-file id suffix.
    pub catalog_id: String,
    /// Laser wavelength in nm, 0.0 when the name carries none.
    pub laser: f64,
    /// Quality tier inherited from the containing directory.
    pub quality: u8,
    /// Full path of the reference file.
    pub path: PathBuf,
}

impl ReferenceEntry {
    /// Parse identity fields out of a reference file name.
    ///
    /// Raman names split on `__` into 8 fields (mineral, catalog id, scan
    /// kind, laser, orientation, two processing tokens, file id); infrared
    /// names into 5. Returns `None` when the name does not follow the
    /// convention or the laser token is not numeric.
    pub fn from_path(path: &Path, quality: u8, kind: LibraryKind) -> Option<Self> {
        let stem = path.file_stem()?.to_str()?;
        let fields: Vec<&str> = stem.split("__").collect();
        match kind {
            LibraryKind::Raman => {
                if fields.len() != 8 {
                    return None;
                }
                let token = fields[3];
                let laser = if token.is_empty() {
                    0.0
                } else {
                    // A laser token may carry an underscored suffix;
                    // only the leading number counts.
                    let number = token.split('_').next()?;
                    let value: f64 = number.parse().ok()?;
                    if !value.is_finite() {
                        return None;
                    }
                    value
                };
                Some(Self {
                    mineral: fields[0].to_string(),
                    catalog_id: fields[1].to_string(),
                    laser,
                    quality,
                    path: path.to_path_buf(),
                })
            }
            LibraryKind::Infrared => {
                if fields.len() != 5 {
                    return None;
                }
                Some(Self {
                    mineral: fields[0].to_string(),
                    catalog_id: format!("{}-{}", fields[1], fields[4]),
                    laser: 0.0,
                    quality,
                    path: path.to_path_buf(),
                })
            }
        }
    }

    /// Library key for this entry.
    pub fn key(&self, kind: LibraryKind) -> String {
        match kind {
            LibraryKind::Raman => format!(
                "{}__{}__{}",
                self.mineral,
                format_laser(self.laser),
                self.catalog_id
            ),
            LibraryKind::Infrared => format!("{}__{}", self.mineral, self.catalog_id),
        }
    }
}

/// Built library: entry key to spectrum, iterated in key order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReferenceLibrary {
    entries: BTreeMap<String, Spectrum>,
}

impl ReferenceLibrary {
    /// An empty library.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a spectrum under `key`. The first insertion wins; returns
    /// `false` when the key was already present.
    pub fn insert(&mut self, key: String, spectrum: Spectrum) -> bool {
        match self.entries.entry(key) {
            std::collections::btree_map::Entry::Occupied(_) => false,
            std::collections::btree_map::Entry::Vacant(slot) => {
                slot.insert(spectrum);
                true
            }
        }
    }

    /// True when `key` is present.
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Look up a spectrum by key.
    pub fn get(&self, key: &str) -> Option<&Spectrum> {
        self.entries.get(key)
    }

    /// Iterate entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Spectrum)> {
        self.entries.iter().map(|(k, s)| (k.as_str(), s))
    }

    /// Iterate keys in order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when the library holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Scan the tier directories under `root` and build a library.
///
/// Raman candidates are grouped by mineral, ranked, and truncated to
/// `config.max_similar` before decoding; infrared keeps everything. Files
/// with unrecognized names or undecodable content are logged and skipped,
/// never fatal. A missing tier directory is skipped with a warning so a
/// partially downloaded archive still yields a usable library.
pub fn build_library(
    root: &Path,
    kind: LibraryKind,
    config: &LibraryConfig,
) -> Result<ReferenceLibrary, LibraryError> {
    let groups = scan_references(root, kind)?;
    let mineral_count = groups.len();

    let mut library = ReferenceLibrary::new();
    let mut loaded = 0usize;
    for (_, mut entries) in groups {
        if kind == LibraryKind::Raman {
            rank_candidates(&mut entries, config.preferred_laser);
            entries.truncate(config.max_similar);
        }
        for entry in entries {
            let key = entry.key(kind);
            if library.contains(&key) {
                continue;
            }
            match formats::decode(&entry.path) {
                Ok(decoded) => {
                    library.insert(key, decoded.spectrum);
                    loaded += 1;
                    if loaded % 100 == 0 {
                        log::debug!("loaded {loaded} reference spectra so far");
                    }
                }
                Err(err) => {
                    log::warn!("skipping reference {}: {err}", entry.path.display());
                }
            }
        }
    }
    log::info!("loaded {loaded} {kind} spectra for {mineral_count} minerals");
    Ok(library)
}

/// Group scanned entries by mineral name, file order made deterministic
/// by sorting each tier listing.
fn scan_references(
    root: &Path,
    kind: LibraryKind,
) -> Result<BTreeMap<String, Vec<ReferenceEntry>>, LibraryError> {
    let mut groups: BTreeMap<String, Vec<ReferenceEntry>> = BTreeMap::new();
    for tier in kind.tiers() {
        let dir = root.join(tier.dir);
        if !dir.is_dir() {
            log::warn!("reference tier {} not found, skipping", dir.display());
            continue;
        }
        let mut paths = Vec::new();
        for item in std::fs::read_dir(&dir)? {
            let path = item?.path();
            if path.is_file() {
                paths.push(path);
            }
        }
        paths.sort();
        for path in paths {
            match ReferenceEntry::from_path(&path, tier.quality, kind) {
                Some(entry) => groups.entry(entry.mineral.clone()).or_default().push(entry),
                None => log::warn!("skipping unrecognized reference name {}", path.display()),
            }
        }
    }
    Ok(groups)
}

/// Order candidates best-first: quality tier descending, distance from the
/// preferred laser ascending, catalog id descending.
fn rank_candidates(entries: &mut [ReferenceEntry], preferred_laser: f64) {
    entries.sort_by(|a, b| {
        b.quality
            .cmp(&a.quality)
            .then_with(|| {
                let da = (preferred_laser - a.laser).abs();
                let db = (preferred_laser - b.laser).abs();
                da.total_cmp(&db)
            })
            .then_with(|| b.catalog_id.cmp(&a.catalog_id))
    });
}

/// Shortest decimal rendering of a laser wavelength for entry keys:
/// integral values print without a fraction.
fn format_laser(laser: f64) -> String {
    if laser.fract() == 0.0 && laser.abs() < 1e15 {
        format!("{}", laser as i64)
    } else {
        format!("{laser}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn raman_path(name: &str) -> PathBuf {
        PathBuf::from(format!("/refs/raman_excellent_unoriented/{name}"))
    }

    #[test]
    fn parses_raman_filename_fields() {
        let path =
            raman_path("Abelsonite__R070007__Broad_Scan__785__0__unoriented__Raman_Data_Processed__21504.txt");
        let entry = ReferenceEntry::from_path(&path, 3, LibraryKind::Raman).expect("parse");
        assert_eq!(entry.mineral, "Abelsonite");
        assert_eq!(entry.catalog_id, "R070007");
        assert_eq!(entry.laser, 785.0);
        assert_eq!(entry.quality, 3);
        assert_eq!(entry.key(LibraryKind::Raman), "Abelsonite__785__R070007");
    }

    #[test]
    fn empty_laser_token_maps_to_zero() {
        let path =
            raman_path("Quartz__R040031__Broad_Scan____0__unoriented__Raman_Data_Processed__4.txt");
        let entry = ReferenceEntry::from_path(&path, 2, LibraryKind::Raman).expect("parse");
        assert_eq!(entry.laser, 0.0);
        assert_eq!(entry.key(LibraryKind::Raman), "Quartz__0__R040031");
    }

    #[test]
    fn laser_token_suffix_is_ignored() {
        let path = raman_path(
            "Calcite__R040070__Broad_Scan__532_edge__0__unoriented__Raman_Data_Processed__9.txt",
        );
        let entry = ReferenceEntry::from_path(&path, 3, LibraryKind::Raman).expect("parse");
        assert_eq!(entry.laser, 532.0);
    }

    #[test]
    fn infrared_filename_combines_catalog_and_file_id() {
        let path = PathBuf::from(
            "/refs/infrared_Processed/Abelsonite__R070007__Infrared__Infrared_Data_Processed__1884.txt",
        );
        let entry = ReferenceEntry::from_path(&path, 3, LibraryKind::Infrared).expect("parse");
        assert_eq!(entry.catalog_id, "R070007-1884");
        assert_eq!(entry.key(LibraryKind::Infrared), "Abelsonite__R070007-1884");
    }

    #[test]
    fn unconventional_names_are_rejected() {
        let path = raman_path("notes.txt");
        assert!(ReferenceEntry::from_path(&path, 3, LibraryKind::Raman).is_none());
        assert!(ReferenceEntry::from_path(&path, 3, LibraryKind::Infrared).is_none());
    }

    #[test]
    fn ranking_prefers_quality_then_laser_distance_then_catalog() {
        let mut entries = vec![
            entry("R1", 785.0, 3),
            entry("R2", 780.0, 3),
            entry("R3", 532.0, 1),
        ];
        rank_candidates(&mut entries, 780.0);
        let order: Vec<&str> = entries.iter().map(|e| e.catalog_id.as_str()).collect();
        assert_eq!(order, ["R2", "R1", "R3"]);

        // Full tie on quality and laser falls back to catalog id,
        // descending.
        let mut tied = vec![entry("R100", 780.0, 3), entry("R200", 780.0, 3)];
        rank_candidates(&mut tied, 780.0);
        assert_eq!(tied[0].catalog_id, "R200");
    }

    fn entry(catalog_id: &str, laser: f64, quality: u8) -> ReferenceEntry {
        ReferenceEntry {
            mineral: "Mineralite".to_string(),
            catalog_id: catalog_id.to_string(),
            laser,
            quality,
            path: PathBuf::from("/dev/null"),
        }
    }

    fn write_reference(dir: &Path, name: &str, scale: f64) {
        let mut body = String::from("##NAMES=test\n");
        for i in 1..=5 {
            let x = 100.0 * f64::from(i);
            body.push_str(&format!("{x:.6}, {:.6}\n", scale * f64::from(i)));
        }
        body.push_str("##END=\n");
        fs::write(dir.join(name), body).expect("write reference");
    }

    #[test]
    fn build_selects_preferred_laser_within_quality_tier() {
        let root = tempfile::tempdir().expect("tempdir");
        let excellent = root.path().join("raman_excellent_unoriented");
        let poor = root.path().join("raman_poor_unoriented");
        fs::create_dir_all(&excellent).expect("mkdir");
        fs::create_dir_all(&poor).expect("mkdir");

        write_reference(
            &excellent,
            "Min__RA__Broad_Scan__785__0__unoriented__Raman_Data_Processed__1.txt",
            1.0,
        );
        write_reference(
            &excellent,
            "Min__RB__Broad_Scan__780__0__unoriented__Raman_Data_Processed__2.txt",
            2.0,
        );
        write_reference(
            &poor,
            "Min__RC__Broad_Scan__532__0__unoriented__Raman_Data_Processed__3.txt",
            3.0,
        );

        let library = build_library(
            root.path(),
            LibraryKind::Raman,
            &LibraryConfig::default(),
        )
        .expect("build");

        let keys: Vec<&str> = library.keys().collect();
        assert_eq!(keys, ["Min__780__RB", "Min__785__RA"]);
    }

    #[test]
    fn build_caps_entries_per_mineral() {
        let root = tempfile::tempdir().expect("tempdir");
        let excellent = root.path().join("raman_excellent_unoriented");
        fs::create_dir_all(&excellent).expect("mkdir");
        for (i, catalog) in ["R1", "R2", "R3", "R4"].iter().enumerate() {
            write_reference(
                &excellent,
                &format!(
                    "Min__{catalog}__Broad_Scan__780__0__unoriented__Raman_Data_Processed__{i}.txt"
                ),
                1.0,
            );
        }

        let library = build_library(
            root.path(),
            LibraryKind::Raman,
            &LibraryConfig {
                max_similar: 2,
                preferred_laser: 780.0,
            },
        )
        .expect("build");
        assert_eq!(library.len(), 2);
    }

    #[test]
    fn build_skips_undecodable_files() {
        let root = tempfile::tempdir().expect("tempdir");
        let excellent = root.path().join("raman_excellent_unoriented");
        fs::create_dir_all(&excellent).expect("mkdir");
        write_reference(
            &excellent,
            "Min__RA__Broad_Scan__780__0__unoriented__Raman_Data_Processed__1.txt",
            1.0,
        );
        fs::write(
            excellent.join("Min__RB__Broad_Scan__785__0__unoriented__Raman_Data_Processed__2.txt"),
            "not a spectrum at all\n",
        )
        .expect("write");

        let library = build_library(
            root.path(),
            LibraryKind::Raman,
            &LibraryConfig::default(),
        )
        .expect("build");
        assert_eq!(library.len(), 1);
        assert!(library.contains("Min__780__RA"));
    }

    #[test]
    fn infrared_build_keeps_every_entry() {
        let root = tempfile::tempdir().expect("tempdir");
        let processed = root.path().join("infrared_Processed");
        fs::create_dir_all(&processed).expect("mkdir");
        for i in 1..=4 {
            write_reference(
                &processed,
                &format!("Min__R00{i}__Infrared__Infrared_Data_Processed__{i}.txt"),
                f64::from(i),
            );
        }

        let library = build_library(
            root.path(),
            LibraryKind::Infrared,
            &LibraryConfig::default(),
        )
        .expect("build");
        assert_eq!(library.len(), 4);
    }
}
