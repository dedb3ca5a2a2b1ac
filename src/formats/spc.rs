//! GRAMS SPC binary container reader.
//!
//! The `.spc` container ships a 512-byte header, an optional shared x-axis
//! block, and one or more sub-spectra of `[32-byte subheader][y words]`.
//! This reader handles the new little-endian layout (version byte `0x4B`),
//! which is what every Raman vendor exporting `.spc` writes today, and
//! reports the old 1980s layout and the big-endian variant as unsupported
//! rather than misreading them.
//!
//! Y words are IEEE `f32` when the exponent byte is `0x80`; otherwise they
//! are fixed-point integers scaled by `2^(exp-32)` (or `2^(exp-16)` for
//! 16-bit files). Only the first sub-spectrum is exposed; multi-spectrum
//! containers log a warning.

use std::fs;
use std::path::Path;

use crate::spectrum::{PeakSet, Spectrum};

use super::FormatError;

const HEADER_LEN: usize = 512;
const SUBHEADER_LEN: usize = 32;

const VERSION_NEW_LSB: u8 = 0x4B;
const VERSION_NEW_MSB: u8 = 0x4C;
const VERSION_OLD: u8 = 0x4D;

// ftflgs bits.
const FLAG_16BIT: u8 = 0x01;
const FLAG_XYXYS: u8 = 0x40;
const FLAG_XVALS: u8 = 0x80;

/// Exponent byte marking IEEE float y words.
const EXPONENT_IEEE: u8 = 0x80;

/// Read the first sub-spectrum of an SPC container. SPC carries no peaks.
pub fn read_file(path: &Path) -> Result<(Spectrum, Option<PeakSet>), FormatError> {
    let bytes = fs::read(path)?;
    let spectrum = parse(&bytes)?;
    Ok((spectrum, None))
}

/// Parse an SPC container from raw bytes.
pub fn parse(bytes: &[u8]) -> Result<Spectrum, FormatError> {
    if bytes.len() < HEADER_LEN {
        return Err(FormatError::Truncated {
            at: bytes.len(),
            needed: HEADER_LEN - bytes.len(),
        });
    }

    let flags = bytes[0];
    match bytes[1] {
        VERSION_NEW_LSB => {}
        VERSION_NEW_MSB => {
            return Err(FormatError::UnsupportedContainer(
                "big-endian SPC (version byte 0x4C)".into(),
            ))
        }
        VERSION_OLD => {
            return Err(FormatError::UnsupportedContainer(
                "old-format SPC (version byte 0x4D)".into(),
            ))
        }
        other => {
            return Err(FormatError::UnsupportedContainer(format!(
                "unknown SPC version byte 0x{other:02X}"
            )))
        }
    }

    let exponent = bytes[3];
    let npts = le_u32(bytes, 4)? as usize;
    let first = le_f64(bytes, 8)?;
    let last = le_f64(bytes, 16)?;
    let nsub = le_u32(bytes, 24)? as usize;

    if nsub > 1 {
        log::warn!("SPC container holds {nsub} sub-spectra; reading the first");
    }

    if flags & FLAG_XYXYS != 0 {
        return parse_subfile_with_own_axis(bytes);
    }

    if npts < 2 {
        return Err(FormatError::MissingData(format!(
            "SPC container declares {npts} points"
        )));
    }

    let mut pos = HEADER_LEN;
    let x = if flags & FLAG_XVALS != 0 {
        let x = read_f32_array(bytes, pos, npts)?;
        pos += 4 * npts;
        x
    } else {
        linspace(first, last, npts)
    };

    // Skip the first subheader; the y exponent comes from the file header.
    pos += SUBHEADER_LEN;
    let y = read_y(bytes, pos, npts, exponent, flags)?;

    Ok(Spectrum::new(x, y)?)
}

/// TXYXYS layout: each sub-spectrum carries its own point count, x block,
/// and exponent in its subheader.
fn parse_subfile_with_own_axis(bytes: &[u8]) -> Result<Spectrum, FormatError> {
    let flags = bytes[0];
    let sub = HEADER_LEN;
    if bytes.len() < sub + SUBHEADER_LEN {
        return Err(FormatError::Truncated {
            at: bytes.len(),
            needed: sub + SUBHEADER_LEN - bytes.len(),
        });
    }

    let sub_exponent = bytes[sub + 1];
    let npts = le_u32(bytes, sub + 16)? as usize;
    if npts < 2 {
        return Err(FormatError::MissingData(format!(
            "SPC sub-spectrum declares {npts} points"
        )));
    }

    let mut pos = sub + SUBHEADER_LEN;
    let x = read_f32_array(bytes, pos, npts)?;
    pos += 4 * npts;
    let y = read_y(bytes, pos, npts, sub_exponent, flags)?;

    Ok(Spectrum::new(x, y)?)
}

fn read_y(
    bytes: &[u8],
    pos: usize,
    npts: usize,
    exponent: u8,
    flags: u8,
) -> Result<Vec<f64>, FormatError> {
    if exponent == EXPONENT_IEEE {
        return read_f32_array(bytes, pos, npts);
    }

    // Fixed-point words scaled by a signed power-of-two exponent.
    let shift = i32::from(exponent as i8);
    if flags & FLAG_16BIT != 0 {
        let scale = f64::from(shift - 16).exp2();
        let mut y = Vec::with_capacity(npts);
        for i in 0..npts {
            let at = pos + 2 * i;
            let word = le_bytes::<2>(bytes, at)?;
            y.push(f64::from(i16::from_le_bytes(word)) * scale);
        }
        Ok(y)
    } else {
        let scale = f64::from(shift - 32).exp2();
        let mut y = Vec::with_capacity(npts);
        for i in 0..npts {
            let at = pos + 4 * i;
            let word = le_bytes::<4>(bytes, at)?;
            y.push(f64::from(i32::from_le_bytes(word)) * scale);
        }
        Ok(y)
    }
}

fn read_f32_array(bytes: &[u8], pos: usize, count: usize) -> Result<Vec<f64>, FormatError> {
    let mut out = Vec::with_capacity(count);
    for i in 0..count {
        let word = le_bytes::<4>(bytes, pos + 4 * i)?;
        out.push(f32::from_le_bytes(word) as f64);
    }
    Ok(out)
}

fn le_bytes<const N: usize>(bytes: &[u8], at: usize) -> Result<[u8; N], FormatError> {
    let slice = bytes
        .get(at..at + N)
        .ok_or(FormatError::Truncated { at, needed: N })?;
    let mut out = [0u8; N];
    out.copy_from_slice(slice);
    Ok(out)
}

fn le_u32(bytes: &[u8], at: usize) -> Result<u32, FormatError> {
    Ok(u32::from_le_bytes(le_bytes::<4>(bytes, at)?))
}

fn le_f64(bytes: &[u8], at: usize) -> Result<f64, FormatError> {
    Ok(f64::from_le_bytes(le_bytes::<8>(bytes, at)?))
}

fn linspace(first: f64, last: f64, npts: usize) -> Vec<f64> {
    let step = (last - first) / (npts - 1) as f64;
    (0..npts).map(|i| first + step * i as f64).collect()
}
