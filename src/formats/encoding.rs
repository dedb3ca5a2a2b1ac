//! Byte-to-text normalization for vendor exports.
//!
//! Instrument software writes text files in whatever encoding the host OS
//! favored, without declarations: handheld LRD libraries are UTF-16 with a
//! BOM, RRUFF archive files are ASCII, and ad-hoc exports show up in
//! Latin-1. Everything funnels through here so the format readers only ever
//! see `&str`.
//!
//! Detection order: BOM sniffing first (the one reliable signal), then a
//! statistical guess over the first 1 KiB of the payload.

use std::fs;
use std::io::Read;
use std::path::Path;

use chardetng::EncodingDetector;
use encoding_rs::Encoding;
use flate2::read::GzDecoder;

use super::FormatError;

/// How many payload bytes feed the statistical detector.
const DETECT_PREFIX: usize = 1024;

/// Read a file and return its contents as decoded text.
///
/// Files named `*.gz` are transparently decompressed before detection, so
/// a gzipped RRUFF export behaves exactly like the plain one. Empty files
/// (after decompression) are rejected here rather than confusing a
/// recognizer downstream.
pub fn read_decoded(path: &Path) -> Result<String, FormatError> {
    let raw = fs::read(path)?;
    let bytes = if is_gzip(path) {
        let mut out = Vec::new();
        GzDecoder::new(raw.as_slice()).read_to_end(&mut out)?;
        out
    } else {
        raw
    };

    if bytes.is_empty() {
        return Err(FormatError::MissingData(format!(
            "{} is empty",
            path.display()
        )));
    }

    Ok(decode_bytes(&bytes))
}

/// Decode raw bytes to a string, guessing the encoding.
///
/// A BOM wins outright; otherwise the detector sees up to the first
/// [`DETECT_PREFIX`] bytes. Undecodable sequences become replacement
/// characters instead of failing, matching how instrument vendors treat
/// their own mojibake.
pub fn decode_bytes(bytes: &[u8]) -> String {
    if let Some((encoding, _bom_len)) = Encoding::for_bom(bytes) {
        // decode() strips the BOM from the output.
        let (text, _, _) = encoding.decode(bytes);
        return text.into_owned();
    }

    let prefix_len = bytes.len().min(DETECT_PREFIX);
    let mut detector = EncodingDetector::new();
    detector.feed(&bytes[..prefix_len], prefix_len == bytes.len());
    let encoding = detector.guess(None, true);
    log::trace!("detected encoding {}", encoding.name());

    let (text, _, _) = encoding.decode(bytes);
    text.into_owned()
}

fn is_gzip(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("gz"))
}
