//! Defender LRD 1.1 reader and writer.
//!
//! Library files for TSI/Ahura Defender handheld Raman units. Line-oriented
//! key/value text, stored as UTF-16 with a BOM. Two block constructs matter:
//!
//! ```text
//! peaks begin
//! <x> <width> <height>
//! peaks end
//! spectrum begin
//! <count>
//! <x> <y>
//! spectrum end
//! ```
//!
//! Peak rows carry three columns; the height lives in column 2 (column 1 is
//! a width figure this crate does not use). Rows with fewer columns are
//! rejected rather than guessed at.
//!
//! The instrument indexes libraries by inventory number, so the writer
//! warns (but does not refuse) when the target filename is not six
//! uppercase characters plus `.lrd`.

use std::fs;
use std::path::Path;

use chrono::Utc;

use crate::spectrum::{PeakSet, Spectrum};

use super::FormatError;

/// Signature line every LRD 1.1 file opens with.
const SIGNATURE: &str = "#! Defender LRD 1.1";

/// Line 1 begins with the vendor signature.
pub(super) fn matches(first_line: &str) -> bool {
    first_line.starts_with(SIGNATURE)
}

/// Parse an LRD 1.1 document from decoded text.
pub(super) fn read(text: &str) -> Result<(Spectrum, Option<PeakSet>), FormatError> {
    let mut in_peaks = false;
    let mut in_spectrum = false;
    let mut peaks_declared = false;
    let mut declared_count: Option<usize> = None;

    let mut sx = Vec::new();
    let mut sy = Vec::new();
    let mut px = Vec::new();
    let mut py = Vec::new();

    for (idx, line) in text.lines().enumerate() {
        let lineno = idx + 1;
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.is_empty() {
            continue;
        }

        match (tokens[0], tokens.get(1).copied()) {
            ("peaks", Some("begin")) => {
                in_peaks = true;
                peaks_declared = true;
                continue;
            }
            ("peaks", Some("end")) => {
                in_peaks = false;
                continue;
            }
            ("spectrum", Some("begin")) => {
                in_spectrum = true;
                continue;
            }
            ("spectrum", Some("end")) => {
                in_spectrum = false;
                continue;
            }
            _ => {}
        }

        if in_peaks {
            if tokens.len() < 3 {
                return Err(FormatError::Malformed {
                    line: lineno,
                    reason: format!("peak row needs 3 columns, got {}", tokens.len()),
                });
            }
            px.push(parse_float(tokens[0], lineno)?);
            py.push(parse_float(tokens[2], lineno)?);
            continue;
        }

        if in_spectrum {
            if tokens.len() == 1 {
                declared_count = Some(parse_count(tokens[0], lineno)?);
                continue;
            }
            sx.push(parse_float(tokens[0], lineno)?);
            sy.push(parse_float(tokens[1], lineno)?);
            continue;
        }

        // Everything else is a header key/value pair; none affect decoding.
    }

    if sx.is_empty() {
        return Err(FormatError::MissingData(
            "no spectrum block in LRD document".into(),
        ));
    }
    if let Some(declared) = declared_count {
        if declared != sx.len() {
            log::warn!(
                "LRD spectrum block declared {declared} points but held {}",
                sx.len()
            );
        }
    }

    let spectrum = Spectrum::new(sx, sy)?;
    let peaks = if peaks_declared {
        Some(PeakSet::new(px, py)?)
    } else {
        None
    };
    Ok((spectrum, peaks))
}

fn parse_float(token: &str, line: usize) -> Result<f64, FormatError> {
    token.parse().map_err(|_| FormatError::Malformed {
        line,
        reason: format!("bad numeric value {token:?}"),
    })
}

fn parse_count(token: &str, line: usize) -> Result<usize, FormatError> {
    token.parse().map_err(|_| FormatError::Malformed {
        line,
        reason: format!("bad point count {token:?}"),
    })
}

/// Write a spectrum as a Defender LRD 1.1 library file.
///
/// The document is encoded as UTF-16LE with a BOM, which is what the
/// instrument firmware expects. The header's inventory number is taken
/// from the filename stem; naming deviations from the instrument's
/// convention are logged as warnings and the file is written anyway.
pub fn write_file(path: &Path, name: &str, spectrum: &Spectrum) -> Result<(), FormatError> {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("UNNAMED");
    warn_on_unconventional_name(path, stem);

    let (xlo, xhi) = spectrum.x_bounds();
    let timestamp = Utc::now().format("%Y%m%d %H:%M:%S");

    let mut doc = String::new();
    doc.push_str(SIGNATURE);
    doc.push('\n');
    doc.push_str(&format!("datetime {timestamp}\n"));
    doc.push_str(&format!("name {name}\n"));
    doc.push_str("source \n");
    doc.push_str(&format!("ahurainvno {stem}\n"));
    doc.push_str("category User Added\n");
    doc.push_str("cas \n");
    doc.push_str("cluster 0\n");
    doc.push_str("peaks begin\n");
    doc.push_str("peaks end\n");
    doc.push('\n');
    doc.push_str("state\n");
    doc.push_str("preparation\n");
    doc.push_str("waveunits delta cm-1\n");
    doc.push_str(&format!(
        "wavenumrange {} {}\n",
        xlo.round() as i64,
        xhi.round() as i64
    ));
    doc.push_str("group \n");
    doc.push_str("librarytype 1\n");
    doc.push_str("spectrum begin\n");
    doc.push_str(&format!("{}\n", spectrum.len()));
    for (x, y) in spectrum.x().iter().zip(spectrum.y()) {
        doc.push_str(&format!("{x:.6} {y:.6}\n"));
    }
    doc.push_str("spectrum end\n");

    fs::write(path, encode_utf16le(&doc))?;
    Ok(())
}

fn warn_on_unconventional_name(path: &Path, stem: &str) {
    let ext_ok = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e == "lrd");
    if !ext_ok {
        log::warn!("{}: extension should be .lrd", path.display());
    }
    if stem.chars().count() != 6 {
        log::warn!("{}: filename stem should be 6 characters", path.display());
    }
    if stem.chars().any(|c| c.is_ascii_lowercase()) {
        log::warn!("{}: filename stem should be uppercase", path.display());
    }
}

fn encode_utf16le(text: &str) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(2 + text.len() * 2);
    bytes.extend_from_slice(&[0xFF, 0xFE]);
    for unit in text.encode_utf16() {
        bytes.extend_from_slice(&unit.to_le_bytes());
    }
    bytes
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> String {
        "#! Defender LRD 1.1\n\
         datetime 20030909 04:38:50\n\
         name Calcite\n\
         ahurainvno ABCDEF\n\
         peaks begin\n\
         711.0 12.0 0.25\n\
         1085.0 20.0 1.00\n\
         peaks end\n\
         waveunits delta cm-1\n\
         spectrum begin\n\
         3\n\
         700.000000 0.100000\n\
         1085.000000 1.000000\n\
         1400.000000 0.050000\n\
         spectrum end\n"
            .to_string()
    }

    #[test]
    fn reads_spectrum_and_peaks() {
        let (spectrum, peaks) = read(&sample()).expect("decode");
        assert_eq!(spectrum.x(), &[700.0, 1085.0, 1400.0]);
        let peaks = peaks.expect("peaks block present");
        assert_eq!(peaks.x(), &[711.0, 1085.0]);
        assert_eq!(peaks.y(), &[0.25, 1.0]);
    }

    #[test]
    fn peak_height_comes_from_column_two() {
        let text = "#! Defender LRD 1.1\n\
                    peaks begin\n\
                    500.0 9.0 0.75\n\
                    peaks end\n\
                    spectrum begin\n\
                    2\n\
                    400.0 0.1\n\
                    600.0 0.9\n\
                    spectrum end\n";
        let (_, peaks) = read(text).expect("decode");
        assert_eq!(peaks.expect("peaks").y(), &[0.75]);
    }

    #[test]
    fn short_peak_row_is_malformed() {
        let text = "#! Defender LRD 1.1\n\
                    peaks begin\n\
                    500.0 0.75\n\
                    peaks end\n\
                    spectrum begin\n\
                    2\n\
                    400.0 0.1\n\
                    600.0 0.9\n\
                    spectrum end\n";
        let err = read(text).unwrap_err();
        assert!(matches!(err, FormatError::Malformed { line: 3, .. }));
    }

    #[test]
    fn missing_spectrum_block_is_missing_data() {
        let text = "#! Defender LRD 1.1\npeaks begin\npeaks end\n";
        assert!(matches!(read(text), Err(FormatError::MissingData(_))));
    }

    #[test]
    fn writer_round_trips_through_full_decoder() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("ABCDEF.lrd");
        let spectrum =
            Spectrum::new(vec![250.0, 1000.0, 2844.0], vec![0.1, 1.0, 0.2]).expect("spectrum");
        write_file(&path, "Calcite", &spectrum).expect("write");

        let decoded = super::super::decode(&path).expect("decode");
        assert_eq!(decoded.format, super::super::SpectralFormat::Lrd11);
        for (a, b) in decoded.spectrum.x().iter().zip(spectrum.x()) {
            assert!((a - b).abs() < 1e-6);
        }
        assert!(decoded.peaks.expect("empty peaks block").is_empty());
    }

    #[test]
    fn written_bytes_are_utf16le_with_bom() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("ABCDEF.lrd");
        let spectrum = Spectrum::new(vec![250.0, 500.0], vec![0.0, 1.0]).expect("spectrum");
        write_file(&path, "Test", &spectrum).expect("write");

        let bytes = fs::read(&path).expect("read");
        assert_eq!(&bytes[..2], &[0xFF, 0xFE]);
        // '#' then '!' as little-endian code units.
        assert_eq!(&bytes[2..6], &[b'#', 0x00, b'!', 0x00]);
    }
}
