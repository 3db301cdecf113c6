//! Validates and wraps zlib-compressed chunk payloads.
//!
//! Compression level 9 corresponds to [`crate::encoder::EncodeFlags::MAX_COMPRESSION`]; the
//! default level is used otherwise.

use crate::error::{Error, Result};
use flate2::read::{ZlibDecoder, ZlibEncoder};
use flate2::Compression;
use std::io::Read;

/// The closed set of two-byte zlib header values this format is known to produce. Values are
/// compared against the chunk's first two on-disk bytes read as a big-endian `u16` (the
/// mixed-endian convention the original encoder used).
const VALID_ZLIB_HEADERS: [u16; 32] = [
    0x1D08, 0x5B08, 0x9908, 0xD708, 0x1918, 0x5718, 0x9518, 0xD318, 0x1528, 0x5328, 0x9128,
    0xCF28, 0x1138, 0xF438, 0x8D38, 0xCB38, 0x0D48, 0x4B48, 0x8948, 0xC748, 0x0958, 0x4758,
    0x8558, 0xC358, 0x0568, 0x4368, 0x8168, 0xDE68, 0x0178, 0x5E78, 0x9C78, 0xDA78,
];

/// Checks whether `data` begins with a zlib header from the allowlist.
pub fn is_valid_header(data: &[u8]) -> bool {
    header_value(data).is_some_and(|h| VALID_ZLIB_HEADERS.contains(&h))
}

fn header_value(data: &[u8]) -> Option<u16> {
    if data.len() < 2 {
        return None;
    }
    Some(u16::from_be_bytes([data[0], data[1]]))
}

/// Validates `data`'s zlib header and decompresses it into a buffer of exactly
/// `uncompressed_size` bytes.
///
/// Fails with [`Error::InvalidZlibHeader`] if the header is not in the allowlist, or
/// [`Error::ChunkDecode`] if zlib fails or produces fewer bytes than expected.
pub fn decompress(data: &[u8], uncompressed_size: usize, chunk: u32) -> Result<Vec<u8>> {
    match header_value(data) {
        Some(h) if VALID_ZLIB_HEADERS.contains(&h) => {}
        Some(h) => return Err(Error::InvalidZlibHeader(h)),
        None => return Err(Error::InvalidZlibHeader(0)),
    }

    let mut out = vec![0u8; uncompressed_size];
    let mut decoder = ZlibDecoder::new(data);
    decoder
        .read_exact(&mut out)
        .map_err(|source| Error::ChunkDecode { chunk, source })?;
    Ok(out)
}

/// Validates `data`'s zlib header and decompresses it to completion, without knowing the
/// uncompressed size up front.
pub fn decompress_to_end(data: &[u8], chunk: u32) -> Result<Vec<u8>> {
    match header_value(data) {
        Some(h) if VALID_ZLIB_HEADERS.contains(&h) => {}
        Some(h) => return Err(Error::InvalidZlibHeader(h)),
        None => return Err(Error::InvalidZlibHeader(0)),
    }

    let mut out = Vec::new();
    let mut decoder = ZlibDecoder::new(data);
    decoder
        .read_to_end(&mut out)
        .map_err(|source| Error::ChunkDecode { chunk, source })?;
    Ok(out)
}

/// Compresses `data` at the given zlib level (9 for max compression, 6 otherwise).
pub fn compress(data: &[u8], max_compression: bool) -> Vec<u8> {
    let level = if max_compression {
        Compression::best()
    } else {
        Compression::default()
    };
    let mut encoder = ZlibEncoder::new(data, level);
    let mut out = Vec::new();
    encoder
        .read_to_end(&mut out)
        .expect("compressing an in-memory buffer cannot fail");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip() {
        let input = b"the quick brown fox jumps over the lazy dog".repeat(50);
        let compressed = compress(&input, true);
        assert!(is_valid_header(&compressed));
        let decompressed = decompress(&compressed, input.len(), 0).unwrap();
        assert_eq!(decompressed, input);
    }

    #[test]
    fn rejects_bad_header() {
        let bad = [0xffu8, 0xff, 0x00, 0x00];
        assert!(!is_valid_header(&bad));
        let err = decompress(&bad, 4, 0).unwrap_err();
        assert!(matches!(err, Error::InvalidZlibHeader(0xffff)));
    }
}
