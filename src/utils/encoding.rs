//! Encoding-tolerant file reading.

use anyhow::{Context, Result};
use chardetng::EncodingDetector;
use encoding_rs::{Encoding, UTF_8};
use std::fs;
use std::path::Path;
use tracing::debug;

/// Read a text file, honouring a byte-order mark and falling back to
/// charset detection when the content is not valid UTF-8.
pub fn read_file_safe(path: &Path) -> Result<String> {
    let bytes = fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let (text, encoding) = decode_bytes(&bytes);
    if encoding != UTF_8 {
        debug!(path = %path.display(), encoding = encoding.name(), "Decoded non-UTF-8 source");
    }
    Ok(text)
}

/// Decode raw bytes to a string, returning the encoding that was used.
pub fn decode_bytes(bytes: &[u8]) -> (String, &'static Encoding) {
    if let Some((encoding, bom_len)) = Encoding::for_bom(bytes) {
        let (text, _) = encoding.decode_without_bom_handling(&bytes[bom_len..]);
        return (text.into_owned(), encoding);
    }

    if let Ok(text) = std::str::from_utf8(bytes) {
        return (text.to_string(), UTF_8);
    }

    let mut detector = EncodingDetector::new();
    detector.feed(bytes, true);
    let encoding = detector.guess(None, true);
    let (text, _, _) = encoding.decode(bytes);
    (text.into_owned(), encoding)
}
