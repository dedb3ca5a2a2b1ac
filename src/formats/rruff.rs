//! RRUFF archive format reader and writer.
//!
//! The plaintext convention used by the RRUFF project's zipped data files:
//! a `##NAMES=<mineral>` first line, any number of further `##KEY=value`
//! header lines, then comma-delimited "x, y" rows, closed by a `##END=`
//! trailer. Every `#`-prefixed line is treated as a comment, which covers
//! both the headers and the trailer.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use csv::ReaderBuilder;

use crate::spectrum::{PeakSet, Spectrum};

use super::FormatError;

/// Key of line 1 (before `=`) is `##NAMES`.
pub(super) fn matches(first_line: &str) -> bool {
    first_line.split('=').next() == Some("##NAMES")
}

/// Parse the comma-delimited body. RRUFF files never carry peaks.
pub(super) fn read(text: &str) -> Result<(Spectrum, Option<PeakSet>), FormatError> {
    let mut reader = ReaderBuilder::new()
        .delimiter(b',')
        .has_headers(false)
        .flexible(true)
        .comment(Some(b'#'))
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let mut x = Vec::new();
    let mut y = Vec::new();

    for result in reader.records() {
        let record = result.map_err(|e| FormatError::Malformed {
            line: csv_line(e.position()),
            reason: e.to_string(),
        })?;
        let line = csv_line(record.position());

        // Whitespace-only lines survive the csv layer as one empty field.
        if record.len() == 1 && record[0].is_empty() {
            continue;
        }
        if record.len() != 2 {
            return Err(FormatError::Malformed {
                line,
                reason: format!("expected 2 comma-separated values, got {}", record.len()),
            });
        }

        x.push(parse_field(&record[0], line)?);
        y.push(parse_field(&record[1], line)?);
    }

    if x.is_empty() {
        return Err(FormatError::MissingData(
            "no numeric rows in RRUFF body".into(),
        ));
    }

    Ok((Spectrum::new(x, y)?, None))
}

fn parse_field(field: &str, line: usize) -> Result<f64, FormatError> {
    field.parse().map_err(|_| FormatError::Malformed {
        line,
        reason: format!("bad numeric value {field:?}"),
    })
}

fn csv_line(position: Option<&csv::Position>) -> usize {
    position.map(|p| p.line() as usize).unwrap_or(0)
}

/// Write a spectrum in the RRUFF plaintext convention.
///
/// Emits `##NAMES=<name>`, one `"%.6f, %.6f"` row per sample, and the
/// `##END=` trailer, so the output decodes back through [`read`].
pub fn write<W: Write>(writer: &mut W, name: &str, spectrum: &Spectrum) -> io::Result<()> {
    writeln!(writer, "##NAMES={name}")?;
    for (x, y) in spectrum.x().iter().zip(spectrum.y()) {
        writeln!(writer, "{x:.6}, {y:.6}")?;
    }
    writeln!(writer, "##END=")?;
    Ok(())
}

/// Write a spectrum to a new RRUFF file at `path`.
pub fn write_file(path: &Path, name: &str, spectrum: &Spectrum) -> Result<(), FormatError> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    write(&mut writer, name, spectrum)?;
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_headers_body_and_trailer() {
        let text = "##NAMES=Quartz\n\
                    ##RRUFFID=R040031\n\
                    100.000000, 5.500000\n\
                    101.000000, 6.250000\n\
                    ##END=\n";
        let (spectrum, peaks) = read(text).expect("decode");
        assert_eq!(spectrum.x(), &[100.0, 101.0]);
        assert_eq!(spectrum.y(), &[5.5, 6.25]);
        assert!(peaks.is_none());
    }

    #[test]
    fn tolerates_blank_lines() {
        let text = "##NAMES=Quartz\n\n100.0, 1.0\n\n200.0, 2.0\n##END=\n";
        let (spectrum, _) = read(text).expect("decode");
        assert_eq!(spectrum.len(), 2);
    }

    #[test]
    fn wrong_column_count_is_malformed() {
        let text = "##NAMES=Quartz\n100.0, 1.0, 9.0\n##END=\n";
        let err = read(text).unwrap_err();
        assert!(matches!(err, FormatError::Malformed { .. }));
    }

    #[test]
    fn header_only_file_is_missing_data() {
        let text = "##NAMES=Quartz\n##END=\n";
        assert!(matches!(read(text), Err(FormatError::MissingData(_))));
    }

    #[test]
    fn writer_output_decodes_back() {
        let spectrum = Spectrum::new(vec![100.5, 200.25], vec![0.123456, 1.0]).expect("spectrum");
        let mut out = Vec::new();
        write(&mut out, "Test", &spectrum).expect("write");
        let text = String::from_utf8(out).expect("utf8");
        assert!(text.starts_with("##NAMES=Test\n"));
        assert!(text.ends_with("##END=\n"));

        let (again, _) = read(&text).expect("reread");
        for (a, b) in again.x().iter().zip(spectrum.x()) {
            assert!((a - b).abs() < 1e-6);
        }
        for (a, b) in again.y().iter().zip(spectrum.y()) {
            assert!((a - b).abs() < 1e-6);
        }
    }

    #[test]
    fn matches_names_key_only() {
        assert!(matches("##NAMES=Quartz"));
        assert!(!matches("##RRUFFID=R040031"));
        assert!(!matches("scanname foo"));
    }
}
