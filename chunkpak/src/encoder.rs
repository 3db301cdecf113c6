//! Batch encoding of a plain byte stream into one of the chunked container variants.
//!
//! Encoding is a single pass over a whole input file; there is no streaming/incremental
//! encoder, matching the non-goal that this is a batch pipeline rather than a live writer.

use crate::decoder::{Variant, H2AM_BLAM_PREFIX_LEN, H2AM_CHUNK_ALIGN};
use crate::error::{Error, Result};
use crate::zlib;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;
use tracing::{debug, trace_span};

bitflags::bitflags! {
    /// Options controlling how [`Encoder::encode`] lays out the container.
    #[derive(Copy, Clone, Eq, PartialEq, Debug)]
    pub struct EncodeFlags: u32 {
        /// Compress at zlib level 9 instead of the default level.
        const MAX_COMPRESSION = 0b001;
        /// Pack the chunk table tightly instead of padding to the variant's default
        /// header allowance.
        const MINIMAL_HEADER = 0b010;
        /// H2A only: record the uncompressed-passthrough flag in the header. Does not
        /// suppress compression of the chunk data itself.
        const UNCOMPRESSED = 0b100;
        /// Shorthand for the combination that produces the smallest output file.
        const MINIMAL_FILESIZE = Self::MAX_COMPRESSION.bits() | Self::MINIMAL_HEADER.bits();
    }
}

impl Default for EncodeFlags {
    fn default() -> Self {
        EncodeFlags::MINIMAL_HEADER
    }
}

/// Encodes a plain file into one of the chunked container variants.
pub struct Encoder {
    variant: Variant,
    flags: EncodeFlags,
}

impl Encoder {
    /// Creates an encoder for `variant` with the default flags (`MINIMAL_HEADER`).
    pub fn new(variant: Variant) -> Self {
        Self {
            variant,
            flags: EncodeFlags::default(),
        }
    }

    /// Overrides the default flags.
    pub fn with_flags(mut self, flags: EncodeFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Reads `source` in its entirety and writes the encoded container to `dest`.
    pub fn encode(&self, source: impl AsRef<Path>, dest: impl AsRef<Path>) -> Result<()> {
        let _span = trace_span!("Encoder::encode", variant = self.variant.name()).entered();

        let mut src = File::open(source).map_err(Error::FileAccess)?;
        let file_size = src.metadata().map_err(Error::FileAccess)?.len();
        let chunk_size = self.variant.chunk_size();

        // For H2AM, the leading 4096 bytes of the source become the opaque blam prefix and are
        // not themselves chunked; chunking covers only the payload bytes that follow.
        let payload_start = if let Variant::H2AM = self.variant {
            H2AM_BLAM_PREFIX_LEN as u64
        } else {
            0
        };
        let payload_size = file_size.saturating_sub(payload_start);
        // chunk_count is derived from the whole file size, not the prefix-reduced payload
        // size — for H2AM the blam prefix is carved out of the chunk *read* loop below, but
        // the chunk count itself is computed before that carve-out happens.
        let chunk_count = file_size.div_ceil(chunk_size.max(1)) as u32;
        let minimal = self.flags.contains(EncodeFlags::MINIMAL_HEADER);
        let max_compression = self.flags.contains(EncodeFlags::MAX_COMPRESSION);

        debug!(
            variant = self.variant.name(),
            chunk_count, file_size, minimal, max_compression, "encoding container"
        );

        let mut out = File::create(dest).map_err(Error::FileAccess)?;

        let blam_prefix = if let Variant::H2AM = self.variant {
            let mut prefix = vec![0u8; H2AM_BLAM_PREFIX_LEN];
            src.seek(SeekFrom::Start(0)).map_err(Error::FileAccess)?;
            let n = src.read(&mut prefix).map_err(Error::FileAccess)?;
            prefix[n..].fill(0);
            Some(prefix)
        } else {
            None
        };

        let header_size = self.variant.header_size(chunk_count, minimal);
        out.set_len(header_size).map_err(Error::FileAccess)?;
        out.seek(SeekFrom::Start(header_size)).map_err(Error::FileAccess)?;

        src.seek(SeekFrom::Start(payload_start)).map_err(Error::FileAccess)?;

        let mut offsets_u32 = Vec::with_capacity(chunk_count as usize);
        let mut offsets_u64 = Vec::with_capacity(chunk_count as usize);
        let mut sizes_u32 = Vec::with_capacity(chunk_count as usize);

        let mut remaining = payload_size;
        for _ in 0..chunk_count {
            let this_chunk_len = remaining.min(chunk_size) as usize;
            let mut raw = vec![0u8; this_chunk_len];
            src.read_exact(&mut raw).map_err(Error::FileAccess)?;
            remaining -= this_chunk_len as u64;

            let compressed = zlib::compress(&raw, max_compression);

            let pos = out.stream_position().map_err(Error::FileAccess)?;
            match self.variant {
                Variant::H1A => {
                    offsets_u32.push(pos as u32);
                    out.write_all(&(raw.len() as u32).to_le_bytes())
                        .map_err(Error::FileAccess)?;
                    out.write_all(&compressed).map_err(Error::FileAccess)?;
                }
                Variant::H2A => {
                    offsets_u64.push(pos);
                    out.write_all(&compressed).map_err(Error::FileAccess)?;
                }
                Variant::H2AM => {
                    out.write_all(&compressed).map_err(Error::FileAccess)?;
                    let padded_end = next_h2am_boundary(pos + compressed.len() as u64);
                    let pad_len = padded_end - (pos + compressed.len() as u64);
                    if pad_len > 0 {
                        out.write_all(&vec![0u8; pad_len as usize]).map_err(Error::FileAccess)?;
                    }
                    offsets_u32.push(pos as u32);
                    sizes_u32.push(compressed.len() as u32);
                }
            }
        }

        out.seek(SeekFrom::Start(0)).map_err(Error::FileAccess)?;
        match self.variant {
            Variant::H1A => {
                out.write_all(&chunk_count.to_le_bytes()).map_err(Error::FileAccess)?;
                for offset in &offsets_u32 {
                    out.write_all(&offset.to_le_bytes()).map_err(Error::FileAccess)?;
                }
            }
            Variant::H2A => {
                out.write_all(&chunk_count.to_le_bytes()).map_err(Error::FileAccess)?;
                let flags_word: u32 = if self.flags.contains(EncodeFlags::UNCOMPRESSED) { 1 } else { 0 };
                out.write_all(&flags_word.to_le_bytes()).map_err(Error::FileAccess)?;
                for offset in &offsets_u64 {
                    out.write_all(&offset.to_le_bytes()).map_err(Error::FileAccess)?;
                }
            }
            Variant::H2AM => {
                out.write_all(blam_prefix.as_deref().unwrap_or(&[0u8; H2AM_BLAM_PREFIX_LEN]))
                    .map_err(Error::FileAccess)?;
                for (size, offset) in sizes_u32.iter().zip(offsets_u32.iter()) {
                    out.write_all(&size.to_le_bytes()).map_err(Error::FileAccess)?;
                    out.write_all(&offset.to_le_bytes()).map_err(Error::FileAccess)?;
                }
                // A zero-size entry terminates the table for the decoder; the header region
                // was already zero-filled by `set_len`, so no explicit terminator write is
                // needed as long as `header_size` reserved room for one more entry than
                // `chunk_count` strictly requires. It does, by construction of `header_size`.
            }
        }

        Ok(())
    }
}

fn next_h2am_boundary(pos: u64) -> u64 {
    pos.div_ceil(H2AM_CHUNK_ALIGN) * H2AM_CHUNK_ALIGN
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::Decoder;

    fn round_trip(variant: Variant, data: &[u8]) {
        let src = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(src.path(), data).unwrap();
        let dst = tempfile::NamedTempFile::new().unwrap();

        Encoder::new(variant)
            .with_flags(EncodeFlags::MINIMAL_FILESIZE)
            .encode(src.path(), dst.path())
            .unwrap();

        let decoder = Decoder::open(dst.path(), variant).unwrap();
        let got = decoder.get(0, data.len() as u64).unwrap();
        assert_eq!(got, data, "variant {:?} round trip mismatch", variant);
    }

    #[test]
    fn h1a_round_trip_single_chunk() {
        round_trip(Variant::H1A, &vec![0xABu8; 96 * 1024]);
    }

    #[test]
    fn h2a_round_trip_multi_chunk() {
        let data: Vec<u8> = (0..3).flat_map(|i| vec![i as u8; 0x8000]).collect();
        round_trip(Variant::H2A, &data);
    }

    #[test]
    fn h2am_round_trip_with_prefix() {
        let mut data = vec![0xCDu8; H2AM_BLAM_PREFIX_LEN];
        data.extend((0..8192).map(|i| (i % 256) as u8));
        round_trip(Variant::H2AM, &data);
    }

    #[test]
    fn h2am_chunk_count_uses_full_file_size() {
        // file_size (266240) and payload_size (262144) straddle one chunk_size (262144)
        // boundary on opposite sides: ceil(file_size / chunk_size) = 2, but
        // ceil(payload_size / chunk_size) = 1. chunk_count must come out to 2.
        let variant = Variant::H2AM;
        let chunk_size = variant.chunk_size() as usize;
        let mut data = vec![0u8; H2AM_BLAM_PREFIX_LEN];
        data.extend(vec![0x11u8; chunk_size]);
        assert_eq!(data.len(), 266240);

        let src = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(src.path(), &data).unwrap();
        let dst = tempfile::NamedTempFile::new().unwrap();

        Encoder::new(variant)
            .with_flags(EncodeFlags::MINIMAL_FILESIZE)
            .encode(src.path(), dst.path())
            .unwrap();

        let decoder = Decoder::open(dst.path(), variant).unwrap();
        assert_eq!(decoder.chunk_count(), 2);

        let payload_len = data.len() - H2AM_BLAM_PREFIX_LEN;
        let got = decoder.get(0, payload_len as u64).unwrap();
        assert_eq!(got, &data[H2AM_BLAM_PREFIX_LEN..]);
    }
}
