//! The bitmap-metadata entry codec: a fixed-size record describing one texture's dimensions
//! and pixel format, separate from the pixel payload itself (which, for an image pack, lives
//! in a parallel [`crate::scene::SceneEntry`]-keyed archive; see [`crate::ImagePack`]).

use chunkpak::codec::BufferStream;
use chunkpak::Result;
use chunkpak_archive::EntryCodec;

/// The on-disk size of a bitmap-metadata record.
pub const RECORD_LEN: usize = 0x148;

const NAME_FIELD_LEN: usize = 0x100;

/// Payloads carry a fixed 0x40-byte metadata prefix ahead of the pixel data; the record's
/// three `adj_size` fields store the payload size with that prefix subtracted out.
const META_PREFIX_LEN: u64 = 0x40;

/// One entry in a bitmap-metadata archive.
#[derive(Clone, Debug)]
pub struct BitmapMetadataEntry {
    name: String,
    offset: u64,
    size: u64,
    format: u32,
    width: u32,
    height: u32,
    depth: u32,
    mipmap_count: u32,
    face_count: u32,
}

impl BitmapMetadataEntry {
    /// The texture's width, in texels.
    pub fn width(&self) -> u32 {
        self.width
    }
    /// The texture's height, in texels.
    pub fn height(&self) -> u32 {
        self.height
    }
    /// The texture's depth (1 for a 2D texture).
    pub fn depth(&self) -> u32 {
        self.depth
    }
    /// The number of mip levels stored in the payload.
    pub fn mipmap_count(&self) -> u32 {
        self.mipmap_count
    }
    /// `1` for a plain texture, `6` for a cubemap.
    pub fn face_count(&self) -> u32 {
        self.face_count
    }

    /// Sets the texture's dimensions.
    pub fn set_dimensions(&mut self, width: u32, height: u32, depth: u32) {
        self.width = width;
        self.height = height;
        self.depth = depth;
    }

    /// Sets the mip level count.
    pub fn set_mipmap_count(&mut self, mipmap_count: u32) {
        self.mipmap_count = mipmap_count;
    }

    /// Sets the face count; `6` marks a cubemap.
    pub fn set_face_count(&mut self, face_count: u32) {
        self.face_count = face_count;
    }
}

impl EntryCodec for BitmapMetadataEntry {
    type Format = u32;

    fn read(buf: &mut BufferStream) -> Result<Self> {
        let name = buf.read_fixed_string(NAME_FIELD_LEN)?;
        buf.pad(12);
        buf.read::<u32>()?; // constant, always 1
        let width = buf.read::<u32>()?;
        let height = buf.read::<u32>()?;
        let depth = buf.read::<u32>()?;
        let mipmap_count = buf.read::<u32>()?;
        let face_count = buf.read::<u32>()?;
        let format = buf.read::<u32>()?;
        buf.pad(8);
        let adj_size = buf.read::<u32>()?;
        buf.pad(4);
        buf.read::<u32>()?; // adj_size, repeated
        let offset = buf.read::<u32>()? as u64;
        buf.pad(4);
        buf.read::<u32>()?; // adj_size, repeated

        Ok(BitmapMetadataEntry {
            name,
            offset,
            size: adj_size as u64 + META_PREFIX_LEN,
            format,
            width,
            height,
            depth,
            mipmap_count,
            face_count,
        })
    }

    fn write(&self, out: &mut Vec<u8>) {
        let mut name_field = [0u8; NAME_FIELD_LEN];
        let name_bytes = self.name.as_bytes();
        let n = name_bytes.len().min(NAME_FIELD_LEN);
        name_field[..n].copy_from_slice(&name_bytes[..n]);
        out.extend_from_slice(&name_field);
        out.extend_from_slice(&[0u8; 12]);
        out.extend_from_slice(&1u32.to_le_bytes());
        out.extend_from_slice(&self.width.to_le_bytes());
        out.extend_from_slice(&self.height.to_le_bytes());
        out.extend_from_slice(&self.depth.to_le_bytes());
        out.extend_from_slice(&self.mipmap_count.to_le_bytes());
        out.extend_from_slice(&self.face_count.to_le_bytes());
        out.extend_from_slice(&self.format.to_le_bytes());
        out.extend_from_slice(&[0u8; 8]);
        let adj_size = self.size.saturating_sub(META_PREFIX_LEN) as u32;
        out.extend_from_slice(&adj_size.to_le_bytes());
        out.extend_from_slice(&[0u8; 4]);
        out.extend_from_slice(&adj_size.to_le_bytes());
        out.extend_from_slice(&(self.offset as u32).to_le_bytes());
        out.extend_from_slice(&[0u8; 4]);
        out.extend_from_slice(&adj_size.to_le_bytes());
    }

    fn header_size(&self) -> usize {
        RECORD_LEN
    }

    fn fixed_header_size() -> Option<usize> {
        Some(RECORD_LEN)
    }

    fn new(name: &str, format: Self::Format) -> Self {
        BitmapMetadataEntry {
            name: name.to_string(),
            offset: 0,
            size: 0,
            format,
            width: 0,
            height: 0,
            depth: 1,
            mipmap_count: 1,
            face_count: 1,
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
    fn offset(&self) -> u64 {
        self.offset
    }
    fn set_offset(&mut self, offset: u64) {
        self.offset = offset;
    }
    fn size(&self) -> u64 {
        self.size
    }
    fn set_size(&mut self, size: u64) {
        self.size = size;
    }
    fn format(&self) -> Self::Format {
        self.format
    }
    fn set_format(&mut self, format: Self::Format) {
        self.format = format;
    }
}

/// The human-readable label for a bitmap-metadata pixel format code, if known.
pub fn label_for(format: u32) -> Option<&'static str> {
    match format {
        0x30 => Some("A8L8"),
        0x46 => Some("OXT1/AXT1"),
        0x49 => Some("DXT3"),
        0x4C => Some("DXT5"),
        0x4F => Some("DXT5A"),
        0x52 => Some("DXN"),
        0x5A => Some("A8R8G8B8/X8R8G8B8"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chunkpak::codec::Endian;

    #[test]
    fn header_is_fixed_length() {
        let entry = BitmapMetadataEntry::new("diffuse", 0x49);
        let mut bytes = Vec::new();
        entry.write(&mut bytes);
        assert_eq!(bytes.len(), RECORD_LEN);
    }

    #[test]
    fn round_trips_dimensions_and_size() {
        let mut entry = BitmapMetadataEntry::new("diffuse", 0x49);
        entry.set_dimensions(512, 256, 1);
        entry.set_mipmap_count(9);
        entry.set_offset(328);
        entry.set_size(0x4440);

        let mut bytes = Vec::new();
        entry.write(&mut bytes);
        let mut buf = BufferStream::new(&bytes, Endian::Little);
        let back = BitmapMetadataEntry::read(&mut buf).unwrap();

        assert_eq!(back.name(), "diffuse");
        assert_eq!(back.width(), 512);
        assert_eq!(back.height(), 256);
        assert_eq!(back.mipmap_count(), 9);
        assert_eq!(back.offset(), 328);
        assert_eq!(back.size(), 0x4440);
        assert_eq!(back.format(), 0x49);
    }

    #[test]
    fn long_name_is_truncated_to_field_width() {
        let name = "x".repeat(300);
        let entry = BitmapMetadataEntry::new(&name, 0);
        let mut bytes = Vec::new();
        entry.write(&mut bytes);
        let mut buf = BufferStream::new(&bytes, Endian::Little);
        let back = BitmapMetadataEntry::read(&mut buf).unwrap();
        assert_eq!(back.name().len(), NAME_FIELD_LEN);
    }

    #[test]
    fn known_and_unknown_labels() {
        assert_eq!(label_for(0x49), Some("DXT3"));
        assert_eq!(label_for(0xff), None);
    }
}
