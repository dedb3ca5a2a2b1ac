//! Plain scan export reader (counted-block layout).
//!
//! The layout written by the lab's acquisition scripts: a `scanname` header
//! line, then a `spectrum N` header followed by exactly N "x y" lines, and
//! optionally a `peaks N` header followed by N more. Anything outside a
//! counted block (comments, trailing metadata) is ignored.

use crate::spectrum::{PeakSet, Spectrum};

use super::FormatError;

/// First whitespace token of line 1 is `scanname`.
pub(super) fn matches(first_line: &str) -> bool {
    first_line.split_whitespace().next() == Some("scanname")
}

/// Parse the counted-block layout from decoded text.
///
/// Returns the trace plus `Some(PeakSet)` only when a `peaks` block was
/// declared; a file without one yields `None` rather than an empty set.
pub(super) fn read(text: &str) -> Result<(Spectrum, Option<PeakSet>), FormatError> {
    enum Block {
        Outside,
        Spectrum(usize),
        Peaks(usize),
    }

    let mut block = Block::Outside;
    let mut sx = Vec::new();
    let mut sy = Vec::new();
    let mut px = Vec::new();
    let mut py = Vec::new();
    let mut peaks_declared = false;

    for (idx, line) in text.lines().enumerate() {
        let lineno = idx + 1;
        let mut tokens = line.split_whitespace();
        let Some(first) = tokens.next() else {
            continue;
        };

        match first {
            "spectrum" => {
                let n = parse_count(tokens.next(), lineno)?;
                block = if n > 0 { Block::Spectrum(n) } else { Block::Outside };
                continue;
            }
            "peaks" => {
                peaks_declared = true;
                let n = parse_count(tokens.next(), lineno)?;
                block = if n > 0 { Block::Peaks(n) } else { Block::Outside };
                continue;
            }
            _ => {}
        }

        match block {
            Block::Outside => {}
            Block::Spectrum(ref mut remaining) => {
                let (x, y) = parse_pair(first, tokens.next(), lineno)?;
                sx.push(x);
                sy.push(y);
                *remaining -= 1;
                if *remaining == 0 {
                    block = Block::Outside;
                }
            }
            Block::Peaks(ref mut remaining) => {
                let (x, y) = parse_pair(first, tokens.next(), lineno)?;
                px.push(x);
                py.push(y);
                *remaining -= 1;
                if *remaining == 0 {
                    block = Block::Outside;
                }
            }
        }
    }

    if sx.is_empty() {
        return Err(FormatError::MissingData(
            "no spectrum block in scan export".into(),
        ));
    }

    let spectrum = Spectrum::new(sx, sy)?;
    let peaks = if peaks_declared {
        Some(PeakSet::new(px, py)?)
    } else {
        None
    };
    Ok((spectrum, peaks))
}

fn parse_count(token: Option<&str>, line: usize) -> Result<usize, FormatError> {
    let token = token.ok_or_else(|| FormatError::Malformed {
        line,
        reason: "block header missing a point count".into(),
    })?;
    token.parse().map_err(|_| FormatError::Malformed {
        line,
        reason: format!("bad point count {token:?}"),
    })
}

fn parse_pair(first: &str, second: Option<&str>, line: usize) -> Result<(f64, f64), FormatError> {
    let second = second.ok_or_else(|| FormatError::Malformed {
        line,
        reason: "expected two values inside a counted block".into(),
    })?;
    let x: f64 = first.parse().map_err(|_| FormatError::Malformed {
        line,
        reason: format!("bad x value {first:?}"),
    })?;
    let y: f64 = second.parse().map_err(|_| FormatError::Malformed {
        line,
        reason: format!("bad y value {second:?}"),
    })?;
    Ok((x, y))
}
