//! # specmatch - Spectral Identification Toolkit
//!
//! `specmatch` ingests 1-D spectral measurements (wavenumber/wavelength
//! axis, intensity ordinate) from heterogeneous vendor file formats,
//! cleans them, and scores them against a curated reference library of
//! mineral spectra to produce ranked lists of best-matching identities.
//!
//! ## Key Features
//!
//! - **Auto-detecting decoder**: four recognized layouts (plain scan
//!   exports, RRUFF archive files, Defender LRD 1.1 library files, and
//!   GRAMS SPC binary containers), with transparent gzip handling and
//!   statistical text-encoding detection for undeclared vendor encodings.
//!
//! - **Asymmetric least squares baseline**: an O(L) banded solver
//!   separates fluorescence background from sharp peaks, for overlay
//!   display or destructive removal prior to matching.
//!
//! - **Deterministic reference libraries**: quality-tiered directory
//!   scans with reproducible per-mineral selection, persisted to an
//!   atomically written JSON cache.
//!
//! - **Three complementary similarity metrics**: Pearson correlation,
//!   cosine similarity, and squared first-difference cosine, computed on
//!   a shared spline-resampled grid, with per-entry failures reported
//!   rather than swallowed.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use specmatch::baseline::BaselineConfig;
//! use specmatch::formats::decode;
//! use specmatch::normalize::{normalize, Window};
//! use specmatch::library::{build_library, LibraryConfig, LibraryKind};
//! use specmatch::score::{score_all, Metric, DEFAULT_RESOLUTION, TOP_CANDIDATES};
//! use std::path::Path;
//!
//! // Decode a measurement and clean it for matching.
//! let decoded = decode(Path::new("sample.txt"))?;
//! let cleaned = normalize(
//!     &decoded.spectrum,
//!     decoded.peaks.as_ref(),
//!     &Window::new(200.0, 3000.0),
//!     &BaselineConfig::remove(1e3, 1e-3),
//! )?;
//!
//! // Score against a reference library.
//! let library = build_library(
//!     Path::new("reference_library"),
//!     LibraryKind::Raman,
//!     &LibraryConfig::default(),
//! )?;
//! let report = score_all(&cleaned.spectrum, &library, DEFAULT_RESOLUTION);
//! for candidate in report.top_candidates(Metric::Sfec, TOP_CANDIDATES) {
//!     println!("{}  {:.4}", candidate.key, candidate.score);
//! }
//! # Ok::<(), anyhow::Error>(())
//! ```
//!
//! ## Pipeline
//!
//! raw file → [`formats::decode`] → ([`Spectrum`](spectrum::Spectrum),
//! optional [`PeakSet`](spectrum::PeakSet)) → [`normalize::normalize`]
//! (+ [`baseline`], + [`peaks`]) → cleaned spectrum → [`score::score_all`]
//! (+ [`resample`]) against [`library::build_library`]'s output → ranked
//! match lists.
//!
//! The core is single-threaded and synchronous; every public type is
//! `Send`, so callers needing a responsive foreground run builds and
//! scoring on a worker thread and poll for completion.

// Documentation lints - enforce complete documentation for publication
#![deny(missing_docs)]
#![deny(rustdoc::missing_crate_level_docs)]

pub mod baseline;
pub mod formats;
pub mod library;
pub mod normalize;
pub mod peaks;
pub mod resample;
pub mod score;
pub mod spectrum;

/// Re-export commonly used types for convenience
pub mod prelude {
    pub use crate::baseline::{
        estimate_baseline, BaselineConfig, BaselineError, BaselineMode, DEFAULT_ITERATIONS,
    };
    pub use crate::formats::{decode, DecodedSpectrum, FormatError, SpectralFormat};
    pub use crate::library::{
        archive::{install_archive, last_updated, ArchiveError, DataDir, Dataset},
        build_library,
        cache::{CachedLibrary, CacheError, LibraryCache},
        LibraryConfig, LibraryError, LibraryKind, ReferenceEntry, ReferenceLibrary,
    };
    pub use crate::normalize::{normalize, DegenerateInputError, Normalized, Window};
    pub use crate::peaks::{find_peaks, AnnotatedPeak};
    pub use crate::resample::{resample, InterpolationError};
    pub use crate::score::{
        score_all, score_pair, Candidate, EntryReport, MatchReport, MatchScores, Metric,
        DEFAULT_RESOLUTION, TOP_CANDIDATES,
    };
    pub use crate::spectrum::{PeakSet, Spectrum, SpectrumError};
}
