use std::io;

/// The error kinds produced by this crate.
///
/// Every fallible operation in `chunkpak` returns one of these kinds rather than a
/// stringly-typed status. The byte codec additionally stashes the most recent error behind
/// [`crate::codec::BufferStream::last_error`] / [`crate::codec::FileReader::last_error`] for
/// callers that prefer to inspect a failure after a neutral-value-returning call.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The source or destination file could not be opened, read, or written.
    #[error("file access error: {0}")]
    FileAccess(#[from] io::Error),

    /// A requested offset or (offset, size) range exceeds the bounds of the stream.
    #[error("requested range is out of bounds (offset {offset}, size {size}, stream length {len})")]
    Bounds {
        /// The offset that was requested.
        offset: u64,
        /// The size that was requested.
        size: u64,
        /// The length of the stream being read.
        len: u64,
    },

    /// A null-terminated string scan exceeded [`crate::codec::MAX_STRING_LEN`] without finding a
    /// terminator.
    #[error("string scan exceeded the maximum length without finding a terminator")]
    RecursionLimit,

    /// A chunk's leading two bytes did not match any entry in the zlib header allowlist.
    #[error("chunk header 0x{0:04x} is not a recognized zlib header")]
    InvalidZlibHeader(u16),

    /// zlib decompression failed or produced a different number of bytes than expected.
    #[error("failed to decompress chunk {chunk}: {source}")]
    ChunkDecode {
        /// The chunk index that failed to decompress.
        chunk: u32,
        /// The underlying zlib error.
        source: io::Error,
    },

    /// The container variant tag did not match `H1A`, `H2A`, or `H2AM`.
    #[error("unrecognized container variant tag {0:?}")]
    UnknownVariant(String),
}

/// A specialized [`Result`] type for operations in this crate.
pub type Result<T> = std::result::Result<T, Error>;

impl Clone for Error {
    fn clone(&self) -> Self {
        match self {
            Error::FileAccess(e) => Error::FileAccess(io::Error::new(e.kind(), e.to_string())),
            Error::Bounds { offset, size, len } => Error::Bounds {
                offset: *offset,
                size: *size,
                len: *len,
            },
            Error::RecursionLimit => Error::RecursionLimit,
            Error::InvalidZlibHeader(h) => Error::InvalidZlibHeader(*h),
            Error::ChunkDecode { chunk, source } => Error::ChunkDecode {
                chunk: *chunk,
                source: io::Error::new(source.kind(), source.to_string()),
            },
            Error::UnknownVariant(s) => Error::UnknownVariant(s.clone()),
        }
    }
}
