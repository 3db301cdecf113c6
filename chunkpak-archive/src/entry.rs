//! The pluggable per-record codec that [`crate::Archive`] is generic over.
//!
//! An archive's file table is a run of fixed- or variable-length entry headers, each naming a
//! payload's location, size, and format tag. The layout of that header is specific to the
//! archive kind (scene-pack vs. bitmap-metadata, say); [`EntryCodec`] is the seam that keeps
//! [`crate::Archive`] ignorant of which kind it is holding.

use chunkpak::codec::BufferStream;
use chunkpak::Result;

/// One archive entry's header: its name, payload location, and format tag.
///
/// Implementors decode and encode their own on-disk header layout; [`crate::Archive`] only
/// ever calls through this trait, never assumes a concrete layout.
pub trait EntryCodec: Sized {
    /// The format tag carried by this kind of entry (a scene-pack content-type code, a
    /// bitmap-metadata pixel format, and so on).
    type Format: Copy + Eq;

    /// Decodes one header starting at `buf`'s current position, leaving the position just past
    /// the header's last byte.
    fn read(buf: &mut BufferStream) -> Result<Self>;

    /// Appends this header's on-disk encoding to `out`.
    fn write(&self, out: &mut Vec<u8>);

    /// The number of bytes [`EntryCodec::write`] appends. Must match exactly; callers use this
    /// to lay out the header table before any header is actually serialized.
    fn header_size(&self) -> usize;

    /// Builds a fresh header for a new entry. The offset and size fields are left at zero;
    /// [`crate::Archive::save`] assigns their real values.
    fn new(name: &str, format: Self::Format) -> Self;

    /// `Some(header size)` for codecs whose header length is the same for every entry
    /// regardless of content (a fixed-size record). [`crate::Archive::load`] uses this to
    /// compute the header table's total length directly, instead of decoding a probe entry
    /// and trusting its `offset` field to mark the boundary — the right call for a codec
    /// whose `offset` field doesn't describe a location in this archive's own container at
    /// all (bitmap-metadata records point into a paired pixel archive instead).
    ///
    /// Defaults to `None`, meaning the header size varies by entry and must be learned from
    /// the first entry's `offset` field, as is the case for the scene-pack entry.
    fn fixed_header_size() -> Option<usize> {
        None
    }

    /// The entry's name, used as the archive's lookup key.
    fn name(&self) -> &str;

    /// The absolute byte offset of this entry's payload within the archive's logical stream.
    fn offset(&self) -> u64;
    /// Overwrites the payload offset.
    fn set_offset(&mut self, offset: u64);

    /// The payload's length in bytes.
    fn size(&self) -> u64;
    /// Overwrites the payload size.
    fn set_size(&mut self, size: u64);

    /// The entry's format tag.
    fn format(&self) -> Self::Format;
    /// Overwrites the format tag.
    fn set_format(&mut self, format: Self::Format);
}
