//! Reads and writes the chunked, zlib-compressed asset container format used by the H1A, H2A,
//! and H2AM archive generations.
//!
//! This crate covers the container layer only: splitting a logical byte stream into
//! fixed-size, independently zlib-compressed chunks, and supporting random-access reads
//! against the logical stream without decompressing more than is necessary. The archive/file
//! table layer built on top of this lives in the `chunkpak-archive` crate.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod codec;
pub mod decoder;
pub mod encoder;
mod error;
pub mod zlib;

pub use decoder::{Decoder, Variant};
pub use encoder::{EncodeFlags, Encoder};
pub use error::{Error, Result};
