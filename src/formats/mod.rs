//! # Spectral File Format Module
//!
//! Decoding of the vendor and archive file formats that carry 1-D spectra,
//! plus writers for the two formats this crate exports.
//!
//! ## Detection
//!
//! Formats are recognized by an ordered list of cheap predicates; the first
//! match wins and no recognizer runs after a match:
//!
//! 1. `.spc` extension → GRAMS SPC binary container ([`spc`])
//! 2. first line's first token is `scanname` → plain scan export ([`txt`])
//! 3. first line's `=`-key is `##NAMES` → RRUFF archive file ([`rruff`])
//! 4. first line starts with `#! Defender LRD 1.1` → handheld LRD ([`lrd`])
//!
//! Text inputs may be gzip-compressed (`.gz`) and arrive in undeclared
//! encodings (UTF-8, UTF-16, legacy single-byte); the [`encoding`] layer
//! normalizes them to Rust strings before any recognizer runs.
//!
//! ## Example
//!
//! ```rust,no_run
//! use specmatch::formats::decode;
//! use std::path::Path;
//!
//! let decoded = decode(Path::new("sample.txt"))?;
//! println!("{}: {} points", decoded.format, decoded.spectrum.len());
//! # Ok::<(), specmatch::formats::FormatError>(())
//! ```

pub mod encoding;
pub mod lrd;
pub mod rruff;
pub mod spc;
pub mod txt;

use std::fmt;
use std::path::Path;

use crate::spectrum::{PeakSet, Spectrum, SpectrumError};

/// Errors produced while decoding or writing spectral files.
#[derive(Debug, thiserror::Error)]
pub enum FormatError {
    /// Underlying I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// No recognizer accepted the file.
    #[error("unrecognized spectral layout (first line: {preview:?})")]
    UnrecognizedLayout {
        /// Start of the first decoded line, truncated for display.
        preview: String,
    },

    /// A line failed to parse under the recognized layout.
    #[error("line {line}: {reason}")]
    Malformed {
        /// 1-based line number in the decoded text.
        line: usize,
        /// What went wrong on that line.
        reason: String,
    },

    /// A binary container ended before a required field.
    #[error("container truncated at byte {at}: needed {needed} more bytes")]
    Truncated {
        /// Offset where the read was attempted.
        at: usize,
        /// How many bytes the field required.
        needed: usize,
    },

    /// The file was recognized but held no spectral trace.
    #[error("no spectral data: {0}")]
    MissingData(String),

    /// The abscissa failed the instrument-domain sanity check.
    #[error("invalid abscissa: {0}")]
    InvalidAxis(String),

    /// A binary container feature this reader does not handle.
    #[error("unsupported container: {0}")]
    UnsupportedContainer(String),

    /// The parsed data violated the spectrum construction contract.
    #[error(transparent)]
    Spectrum(#[from] SpectrumError),
}

/// The spectral file layouts this crate recognizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpectralFormat {
    /// Whitespace-delimited scan export with counted blocks.
    Txt,
    /// RRUFF archive format (comma-delimited pairs, `##KEY=` headers).
    Rruff,
    /// Defender LRD 1.1 handheld instrument library file.
    Lrd11,
    /// GRAMS/Thermo SPC binary container.
    Spc,
}

impl fmt::Display for SpectralFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SpectralFormat::Txt => "plain scan export",
            SpectralFormat::Rruff => "RRUFF",
            SpectralFormat::Lrd11 => "Defender LRD 1.1",
            SpectralFormat::Spc => "GRAMS SPC",
        };
        f.write_str(name)
    }
}

/// A successfully decoded spectral file.
#[derive(Debug, Clone)]
pub struct DecodedSpectrum {
    /// Which recognizer matched.
    pub format: SpectralFormat,
    /// The spectral trace.
    pub spectrum: Spectrum,
    /// Instrument-tagged peaks, for formats that carry them.
    pub peaks: Option<PeakSet>,
}

/// One entry in the ordered recognizer table for text layouts.
struct TextRecognizer {
    format: SpectralFormat,
    matches: fn(&str) -> bool,
    read: fn(&str) -> Result<(Spectrum, Option<PeakSet>), FormatError>,
}

/// Recognizers are tried top to bottom; order is part of the contract.
static TEXT_RECOGNIZERS: &[TextRecognizer] = &[
    TextRecognizer {
        format: SpectralFormat::Txt,
        matches: txt::matches,
        read: txt::read,
    },
    TextRecognizer {
        format: SpectralFormat::Rruff,
        matches: rruff::matches,
        read: rruff::read,
    },
    TextRecognizer {
        format: SpectralFormat::Lrd11,
        matches: lrd::matches,
        read: lrd::read,
    },
];

/// Decode a spectral file of any recognized format.
///
/// Binary `.spc` containers are dispatched on extension; everything else is
/// decoded to text first and matched against the recognizer table. The
/// abscissa of the result is checked against the instrument-domain rule
/// that no wavenumber is exactly zero (a reliable symptom of a misparsed
/// column) before the spectrum is returned.
pub fn decode(path: &Path) -> Result<DecodedSpectrum, FormatError> {
    if has_extension(path, "spc") {
        let (spectrum, peaks) = spc::read_file(path)?;
        return finish(SpectralFormat::Spc, spectrum, peaks);
    }

    let text = encoding::read_decoded(path)?;
    let first_line = text.lines().next().unwrap_or("");

    for recognizer in TEXT_RECOGNIZERS {
        if (recognizer.matches)(first_line) {
            log::debug!("{} matched {}", recognizer.format, path.display());
            let (spectrum, peaks) = (recognizer.read)(&text)?;
            return finish(recognizer.format, spectrum, peaks);
        }
    }

    Err(FormatError::UnrecognizedLayout {
        preview: first_line.chars().take(40).collect(),
    })
}

/// Decode already-loaded text using the recognizer table only.
///
/// Used by callers that hold in-memory content. Binary `.spc` containers
/// cannot arrive this way.
pub fn decode_text(text: &str) -> Result<DecodedSpectrum, FormatError> {
    let first_line = text.lines().next().unwrap_or("");
    for recognizer in TEXT_RECOGNIZERS {
        if (recognizer.matches)(first_line) {
            let (spectrum, peaks) = (recognizer.read)(text)?;
            return finish(recognizer.format, spectrum, peaks);
        }
    }
    Err(FormatError::UnrecognizedLayout {
        preview: first_line.chars().take(40).collect(),
    })
}

fn finish(
    format: SpectralFormat,
    spectrum: Spectrum,
    peaks: Option<PeakSet>,
) -> Result<DecodedSpectrum, FormatError> {
    validate_axis(&spectrum)?;
    Ok(DecodedSpectrum {
        format,
        spectrum,
        peaks,
    })
}

/// Reject spectra whose abscissa contains an exact zero.
///
/// Wavenumber and wavelength axes never touch zero on real instruments; a
/// zero is the usual symptom of a swapped or misparsed column.
fn validate_axis(spectrum: &Spectrum) -> Result<(), FormatError> {
    if let Some(i) = spectrum.x().iter().position(|&v| v == 0.0) {
        return Err(FormatError::InvalidAxis(format!(
            "x[{i}] is zero; the abscissa looks misparsed"
        )));
    }
    Ok(())
}

fn has_extension(path: &Path, wanted: &str) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(wanted))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizer_order_is_txt_rruff_lrd() {
        let order: Vec<SpectralFormat> = TEXT_RECOGNIZERS.iter().map(|r| r.format).collect();
        assert_eq!(
            order,
            vec![
                SpectralFormat::Txt,
                SpectralFormat::Rruff,
                SpectralFormat::Lrd11
            ]
        );
    }

    #[test]
    fn unrecognized_text_reports_preview() {
        let err = decode_text("hello world\n1 2\n").unwrap_err();
        match err {
            FormatError::UnrecognizedLayout { preview } => {
                assert_eq!(preview, "hello world");
            }
            other => panic!("expected UnrecognizedLayout, got {other:?}"),
        }
    }

    #[test]
    fn zero_abscissa_is_rejected() {
        let text = "##NAMES=Test\n0.000000, 1.000000\n100.000000, 2.000000\n##END=\n";
        let err = decode_text(text).unwrap_err();
        assert!(matches!(err, FormatError::InvalidAxis(_)));
    }

    #[test]
    fn spc_extension_is_case_insensitive() {
        assert!(has_extension(Path::new("a/b/sample.SPC"), "spc"));
        assert!(has_extension(Path::new("sample.spc"), "spc"));
        assert!(!has_extension(Path::new("sample.spc.gz"), "spc"));
    }
}
