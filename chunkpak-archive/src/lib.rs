//! A generic file-table engine layered on the `chunkpak` container format.
//!
//! An archive is a child-count-prefixed run of entry headers, one per payload, followed by
//! the concatenated payloads themselves, the whole thing stored inside a chunked container.
//! The header layout is pluggable via [`EntryCodec`]; concrete header shapes (scene-pack,
//! bitmap-metadata, ...) live in the `gamepak` crate.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod archive;
mod entry;
mod error;

pub use archive::{Archive, ArchiveConfig, ChildCountWidth, MAX_ENTRY_HEADER_SIZE};
pub use entry::EntryCodec;
pub use error::{Error, Result};
