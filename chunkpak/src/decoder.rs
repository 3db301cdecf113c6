//! Random-access decoding of the three chunked container variants.
//!
//! A [`Decoder`] parses a variant-specific header eagerly at construction, then lazily
//! decompresses only the chunks a [`Decoder::get`] call actually touches. Decompressed chunks
//! are cached for the decoder's lifetime in a sparse, zero-copy `Arc<[u8]>` array, the same
//! pattern `Msfz::get_chunk_data` uses for its chunk cache.

use crate::error::{Error, Result};
use crate::zlib;
use std::sync::{Arc, OnceLock};
use sync_file::ReadAt;
use tracing::{debug, trace, trace_span};

/// The blam prefix H2AM carries ahead of its chunk table; treated as opaque and re-emitted
/// verbatim on save.
pub const H2AM_BLAM_PREFIX_LEN: usize = 4096;

/// The hard cap on the number of chunk-table entries scanned while looking for the
/// zero-size terminator in an H2AM file.
const H2AM_MAX_CHUNKS: usize = 0x400;

/// The alignment, in bytes, that H2AM pads each compressed chunk to.
pub const H2AM_CHUNK_ALIGN: u64 = 128;

/// One of the three generations of chunked container this crate understands.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum Variant {
    /// 0x20000-byte chunks, 32-bit offsets, each chunk prefixed by a 32-bit uncompressed length.
    H1A,
    /// 0x8000-byte chunks, 64-bit offsets, a flag word marking uncompressed passthrough.
    H2A,
    /// 0x40000-byte chunks, a 4096-byte opaque prefix, and (size, offset) chunk pairs.
    H2AM,
}

impl Variant {
    /// The fixed chunk size for this variant.
    pub fn chunk_size(self) -> u64 {
        match self {
            Variant::H1A => 0x20000,
            Variant::H2A => 0x8000,
            Variant::H2AM => 0x40000,
        }
    }

    /// The header size reserved by the encoder for this variant, either packed tightly
    /// around `chunk_count` entries (`minimal`) or padded to the variant's default allowance.
    pub fn header_size(self, chunk_count: u32, minimal: bool) -> u64 {
        match self {
            Variant::H1A => {
                if minimal {
                    4 + chunk_count as u64 * 4
                } else {
                    0x40000
                }
            }
            Variant::H2A => {
                if minimal {
                    8 + chunk_count as u64 * 8
                } else {
                    0x600000
                }
            }
            Variant::H2AM => {
                H2AM_BLAM_PREFIX_LEN as u64 + if minimal { 0x1000 } else { 0x3000 }
            }
        }
    }

    /// The stable textual name of this variant, used in diagnostics and by
    /// [`Variant::from_name`].
    pub fn name(self) -> &'static str {
        match self {
            Variant::H1A => "H1A",
            Variant::H2A => "H2A",
            Variant::H2AM => "H2AM",
        }
    }

    /// Parses a variant name. Fails with [`Error::UnknownVariant`] for anything else.
    pub fn from_name(name: &str) -> Result<Self> {
        match name {
            "H1A" => Ok(Variant::H1A),
            "H2A" => Ok(Variant::H2A),
            "H2AM" => Ok(Variant::H2AM),
            other => Err(Error::UnknownVariant(other.to_string())),
        }
    }
}

const H2A_FLAG_UNCOMPRESSED: u32 = 1;

enum ChunkTable {
    H1A {
        /// `chunk_count + 1` entries; the last is the sentinel file-size offset.
        offsets: Vec<u32>,
    },
    H2A {
        offsets: Vec<u64>,
        uncompressed: bool,
    },
    H2AM {
        sizes: Vec<u32>,
        offsets: Vec<u32>,
        blam_prefix: Box<[u8; H2AM_BLAM_PREFIX_LEN]>,
    },
}

/// Decodes one of the chunked container variants, exposing random access to the logical
/// (uncompressed) byte stream.
pub struct Decoder<F> {
    file: F,
    variant: Variant,
    chunk_count: u32,
    table: ChunkTable,
    /// Set when the whole file should be treated as a raw, uncompressed byte stream — either
    /// because the caller asked for that up front, or because chunk decompression failed once
    /// and this decoder fell back permanently.
    raw_passthrough: bool,
    cache: Vec<OnceLock<Arc<[u8]>>>,
}

fn read_u32_be_at<F: ReadAt>(file: &F, offset: u64) -> Result<u32> {
    let mut buf = [0u8; 4];
    file.read_exact_at(&mut buf, offset).map_err(Error::FileAccess)?;
    Ok(u32::from_be_bytes(buf))
}

fn read_u32_le_at<F: ReadAt>(file: &F, offset: u64) -> Result<u32> {
    let mut buf = [0u8; 4];
    file.read_exact_at(&mut buf, offset).map_err(Error::FileAccess)?;
    Ok(u32::from_le_bytes(buf))
}

fn read_u64_le_at<F: ReadAt>(file: &F, offset: u64) -> Result<u64> {
    let mut buf = [0u8; 8];
    file.read_exact_at(&mut buf, offset).map_err(Error::FileAccess)?;
    Ok(u64::from_le_bytes(buf))
}

impl<F: ReadAt> Decoder<F> {
    /// Opens `file` and parses its header as the given variant.
    ///
    /// `file_size` must be the exact length of `file`; it is used to compute the sentinel
    /// entry that terminates the H1A/H2A chunk-offset table (`ReadAt` has no length query of
    /// its own). [`Decoder::open`] computes this automatically from file metadata.
    pub fn from_file(file: F, variant: Variant, file_size: u64) -> Result<Self> {
        let _span = trace_span!("Decoder::from_file", variant = variant.name()).entered();

        let (chunk_count, table) = match variant {
            Variant::H1A => {
                let chunk_count = read_u32_le_at(&file, 0)?;
                let mut offsets = Vec::with_capacity(chunk_count as usize + 1);
                for i in 0..chunk_count {
                    offsets.push(read_u32_le_at(&file, 4 + i as u64 * 4)?);
                }
                offsets.push(file_size as u32);
                (chunk_count, ChunkTable::H1A { offsets })
            }
            Variant::H2A => {
                let chunk_count = read_u32_le_at(&file, 0)?;
                let flags = read_u32_le_at(&file, 4)?;
                let mut offsets = Vec::with_capacity(chunk_count as usize + 1);
                for i in 0..chunk_count {
                    offsets.push(read_u64_le_at(&file, 8 + i as u64 * 8)?);
                }
                offsets.push(file_size);
                (
                    chunk_count,
                    ChunkTable::H2A {
                        offsets,
                        uncompressed: flags & H2A_FLAG_UNCOMPRESSED != 0,
                    },
                )
            }
            Variant::H2AM => {
                let mut blam_prefix = Box::new([0u8; H2AM_BLAM_PREFIX_LEN]);
                file.read_exact_at(blam_prefix.as_mut_slice(), 0)
                    .map_err(Error::FileAccess)?;

                let mut sizes = Vec::new();
                let mut offsets = Vec::new();
                for i in 0..H2AM_MAX_CHUNKS {
                    let entry_offset = H2AM_BLAM_PREFIX_LEN as u64 + i as u64 * 8;
                    let size = read_u32_le_at(&file, entry_offset)?;
                    if size == 0 {
                        break;
                    }
                    let offset = read_u32_le_at(&file, entry_offset + 4)?;
                    sizes.push(size);
                    offsets.push(offset);
                }
                let chunk_count = sizes.len() as u32;
                (
                    chunk_count,
                    ChunkTable::H2AM {
                        sizes,
                        offsets,
                        blam_prefix,
                    },
                )
            }
        };

        debug!(
            variant = variant.name(),
            chunk_count,
            chunk_size = variant.chunk_size(),
            "parsed container header"
        );

        let mut cache = Vec::with_capacity(chunk_count as usize);
        cache.resize_with(chunk_count as usize, Default::default);

        Ok(Self {
            file,
            variant,
            chunk_count,
            table,
            raw_passthrough: false,
            cache,
        })
    }

    /// Wraps `file` as a raw, uncompressed byte stream: [`Decoder::get`] reads directly from
    /// the file with no chunking or decompression.
    pub fn from_file_uncompressed(file: F, variant: Variant) -> Self {
        Self {
            file,
            variant,
            chunk_count: 0,
            table: ChunkTable::H1A { offsets: Vec::new() },
            raw_passthrough: true,
            cache: Vec::new(),
        }
    }

    /// The container variant this decoder was opened as.
    pub fn variant(&self) -> Variant {
        self.variant
    }

    /// The number of chunks in the container.
    pub fn chunk_count(&self) -> u32 {
        self.chunk_count
    }

    /// The logical (uncompressed) length of the stream, as implied by the chunk table.
    pub fn logical_len(&self) -> u64 {
        let base = self.chunk_count as u64 * self.variant.chunk_size();
        if matches!(self.variant, Variant::H2AM) {
            base + H2AM_BLAM_PREFIX_LEN as u64
        } else {
            base
        }
    }

    fn compressed_extent(&self, i: u32) -> Result<(u64, u64)> {
        match &self.table {
            ChunkTable::H1A { offsets } => {
                let start = offsets[i as usize] as u64;
                let end = offsets[i as usize + 1] as u64;
                // The first 4 bytes at `start` are the uncompressed-length prefix, not payload.
                Ok((start + 4, end.saturating_sub(start + 4)))
            }
            ChunkTable::H2A { offsets, .. } => {
                let start = offsets[i as usize];
                let end = offsets[i as usize + 1];
                Ok((start, end - start))
            }
            ChunkTable::H2AM { sizes, offsets, .. } => {
                Ok((offsets[i as usize] as u64, sizes[i as usize] as u64))
            }
        }
    }

    fn is_uncompressed_flagged(&self) -> bool {
        matches!(&self.table, ChunkTable::H2A { uncompressed: true, .. })
    }

    fn load_chunk(&self, i: u32) -> Result<Arc<[u8]>> {
        let _span = trace_span!("Decoder::load_chunk", chunk = i).entered();

        let (offset, len) = self.compressed_extent(i)?;
        let mut raw = vec![0u8; len as usize];
        self.file.read_exact_at(&mut raw, offset).map_err(Error::FileAccess)?;

        if self.is_uncompressed_flagged() {
            return Ok(Arc::from(raw));
        }

        // H1A stores the uncompressed length of this chunk 4 bytes before the payload.
        let expected_len = if let Variant::H1A = self.variant {
            let prefix_offset = offset - 4;
            Some(read_u32_le_at(&self.file, prefix_offset)? as usize)
        } else {
            None
        };

        let decompressed = zlib::decompress_to_end(&raw, i)?;
        if let Some(expected) = expected_len {
            if decompressed.len() != expected {
                return Err(Error::ChunkDecode {
                    chunk: i,
                    source: std::io::Error::new(
                        std::io::ErrorKind::InvalidData,
                        format!(
                            "chunk decompressed to {} bytes, expected {expected}",
                            decompressed.len()
                        ),
                    ),
                });
            }
        }
        Ok(Arc::from(decompressed.into_boxed_slice()))
    }

    fn chunk_data(&self, i: u32) -> Result<Arc<[u8]>> {
        let slot = self
            .cache
            .get(i as usize)
            .ok_or(Error::Bounds { offset: i as u64, size: 1, len: self.chunk_count as u64 })?;
        if let Some(arc) = slot.get() {
            trace!(chunk = i, "chunk cache hit");
            return Ok(Arc::clone(arc));
        }
        let arc = self.load_chunk(i)?;
        Ok(Arc::clone(slot.get_or_init(|| arc)))
    }

    fn read_raw(&self, offset: u64, size: u64) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; size as usize];
        self.file.read_exact_at(&mut buf, offset).map_err(Error::FileAccess)?;
        Ok(buf)
    }

    /// Reads `size` logical bytes starting at `offset`, decompressing only the chunks needed
    /// to satisfy the request.
    ///
    /// If chunk decompression fails, this retries once treating the whole file as raw,
    /// uncompressed bytes; if that also fails, returns an empty result rather than an error.
    pub fn get(&self, offset: u64, size: u64) -> Result<Vec<u8>> {
        if self.raw_passthrough {
            return self.read_raw(offset, size);
        }

        match self.get_chunked(offset, size) {
            Ok(data) => Ok(data),
            Err(e) => {
                tracing::debug!(error = %e, "chunked read failed, retrying as raw passthrough");
                match self.read_raw(offset, size) {
                    Ok(data) => Ok(data),
                    Err(_) => Ok(Vec::new()),
                }
            }
        }
    }

    fn get_chunked(&self, mut offset: u64, mut size: u64) -> Result<Vec<u8>> {
        if size == 0 {
            return Ok(Vec::new());
        }

        let chunk_size = self.variant.chunk_size();
        let mut head = Vec::new();

        if let Variant::H2AM = self.variant {
            if offset < H2AM_BLAM_PREFIX_LEN as u64 {
                let ChunkTable::H2AM { blam_prefix, .. } = &self.table else {
                    unreachable!()
                };
                let take = size.min(H2AM_BLAM_PREFIX_LEN as u64 - offset) as usize;
                head.extend_from_slice(&blam_prefix[offset as usize..offset as usize + take]);
                size -= take as u64;
                offset = 0;
                if size == 0 {
                    return Ok(head);
                }
            } else {
                offset -= H2AM_BLAM_PREFIX_LEN as u64;
            }
        }

        let start = offset / chunk_size;
        let end = (offset + size - 1) / chunk_size;
        if start >= self.chunk_count as u64 || end >= self.chunk_count as u64 {
            return Err(Error::Bounds {
                offset,
                size,
                len: self.chunk_count as u64 * chunk_size,
            });
        }

        let start_rem = offset - start * chunk_size;

        let mut out = head;
        out.reserve(size as usize);
        let mut remaining = size;
        for chunk_index in start..=end {
            let chunk = self.chunk_data(chunk_index as u32)?;
            let chunk_start = if chunk_index == start { start_rem as usize } else { 0 };
            let available = chunk.len().saturating_sub(chunk_start);
            let take = (remaining as usize).min(available);
            out.extend_from_slice(&chunk[chunk_start..chunk_start + take]);
            remaining -= take as u64;
            if remaining == 0 {
                break;
            }
        }
        Ok(out)
    }
}

impl Decoder<sync_file::RandomAccessFile> {
    /// Opens the file at `path` and parses its header as the given variant.
    pub fn open<P: AsRef<std::path::Path>>(path: P, variant: Variant) -> Result<Self> {
        let std_file = std::fs::File::open(path).map_err(Error::FileAccess)?;
        let len = std_file.metadata().map_err(Error::FileAccess)?.len();
        let raf = sync_file::RandomAccessFile::from(std_file);
        Self::from_file(raf, variant, len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::{EncodeFlags, Encoder};

    #[test]
    fn h2a_uncompressed_flag_reads_raw() {
        let src = tempfile::NamedTempFile::new().unwrap();
        let data: Vec<u8> = (0..16 * 1024).map(|i| (i % 251) as u8).collect();
        std::fs::write(src.path(), &data).unwrap();

        let dst = tempfile::NamedTempFile::new().unwrap();
        Encoder::new(Variant::H2A)
            .with_flags(EncodeFlags::UNCOMPRESSED | EncodeFlags::MINIMAL_HEADER)
            .encode(src.path(), dst.path())
            .unwrap();

        let decoder = Decoder::open(dst.path(), Variant::H2A).unwrap();
        assert!(matches!(&decoder.table, ChunkTable::H2A { uncompressed: true, .. }));
        let got = decoder.get(0, data.len() as u64).unwrap();
        assert_eq!(got, data);
    }

    #[test]
    fn bad_zlib_header_falls_back_to_raw() {
        // Build a synthetic H1A file by hand: one chunk whose "compressed" payload is just raw
        // bytes with an invalid leading zlib header, so the decoder must fall back.
        let chunk_size: usize = Variant::H1A.chunk_size() as usize;
        let payload = vec![0x42u8; chunk_size];

        let mut bytes = Vec::new();
        bytes.extend_from_slice(&1u32.to_le_bytes()); // chunk_count
        let offset_slot = bytes.len();
        bytes.extend_from_slice(&0u32.to_le_bytes()); // offsets[0], patched below

        let chunk_offset = bytes.len() as u32;
        bytes.extend_from_slice(&(payload.len() as u32).to_le_bytes()); // uncompressed length prefix
        bytes.extend_from_slice(&[0xff, 0xff]); // invalid zlib header
        bytes.extend_from_slice(&payload[2..]);

        bytes[offset_slot..offset_slot + 4].copy_from_slice(&chunk_offset.to_le_bytes());

        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), &bytes).unwrap();

        let decoder = Decoder::open(file.path(), Variant::H1A).unwrap();
        let got = decoder.get(chunk_offset as u64 + 4, 8).unwrap();
        assert_eq!(got, &[0xff, 0xff, 0x42, 0x42, 0x42, 0x42, 0x42, 0x42]);
    }

    #[test]
    fn h2am_blam_prefix_read_without_decompressing_chunks() {
        let mut source = vec![0xCDu8; H2AM_BLAM_PREFIX_LEN];
        source.extend((0..4096).map(|i| (i % 7) as u8));

        let src = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(src.path(), &source).unwrap();
        let dst = tempfile::NamedTempFile::new().unwrap();
        Encoder::new(Variant::H2AM)
            .with_flags(EncodeFlags::MINIMAL_FILESIZE)
            .encode(src.path(), dst.path())
            .unwrap();

        let decoder = Decoder::open(dst.path(), Variant::H2AM).unwrap();
        let prefix = decoder.get(0, H2AM_BLAM_PREFIX_LEN as u64).unwrap();
        assert_eq!(prefix, &source[..H2AM_BLAM_PREFIX_LEN]);

        let rest = decoder
            .get(H2AM_BLAM_PREFIX_LEN as u64, 4096)
            .unwrap();
        assert_eq!(rest, &source[H2AM_BLAM_PREFIX_LEN..]);
    }
}
