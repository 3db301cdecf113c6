//! The scene-pack entry codec: a variable-length header naming an offset, size, content-type
//! tag, and name for each payload.

use chunkpak::codec::BufferStream;
use chunkpak::Result;
use chunkpak_archive::EntryCodec;

/// The number of fixed bytes in a scene-pack entry header, not counting the variable-length
/// name (`offset`, `size`, `name_len`: `u32` each; `format`: `u32`; trailing padding: `u64`).
const FIXED_HEADER_LEN: usize = 4 + 4 + 4 + 4 + 8;

/// One entry in a scene-pack archive: an offset/size/name triple plus a numeric content-type
/// tag. See [`extension_for`] for the tag's meaning.
#[derive(Clone, Debug)]
pub struct SceneEntry {
    name: String,
    offset: u64,
    size: u64,
    format: u32,
}

impl EntryCodec for SceneEntry {
    type Format = u32;

    fn read(buf: &mut BufferStream) -> Result<Self> {
        let offset = buf.read::<u32>()? as u64;
        let size = buf.read::<u32>()? as u64;
        let name_len = buf.read::<u32>()? as usize;
        let name = String::from_utf8_lossy(buf.read_bytes(name_len)?).into_owned();
        let format = buf.read::<u32>()?;
        buf.read::<u64>()?; // reserved, always written back as zero
        Ok(SceneEntry { name, offset, size, format })
    }

    fn write(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&(self.offset as u32).to_le_bytes());
        out.extend_from_slice(&(self.size as u32).to_le_bytes());
        out.extend_from_slice(&(self.name.len() as u32).to_le_bytes());
        out.extend_from_slice(self.name.as_bytes());
        out.extend_from_slice(&self.format.to_le_bytes());
        out.extend_from_slice(&0u64.to_le_bytes());
    }

    fn header_size(&self) -> usize {
        FIXED_HEADER_LEN + self.name.len()
    }

    fn new(name: &str, format: Self::Format) -> Self {
        SceneEntry {
            name: name.to_string(),
            offset: 0,
            size: 0,
            format,
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

/// The file extension conventionally associated with a scene-pack content-type tag, or `None`
/// for tags that carry no stable extension.
pub fn extension_for(format: u32) -> Option<&'static str> {
    match format {
        0 => Some(".scenedata"),
        2 => Some(".cacheblock"),
        4 => Some(".shadercache"),
        5 => Some(".texturesinfo"),
        6 => Some(".texture"),
        7 => Some(".texturesmips64"),
        9 => Some(".sound"),
        10 => Some(".wavebanks_mem"),
        11 => Some(".wavebanks_strm_file"),
        12 => Some(".tpl"),
        13 => Some(".voicespline"),
        14 => Some(".string"),
        20 => Some(".texturesdistancefile"),
        21 => Some(".checkpointtexfile"),
        22 => Some(".loadingscreengfx"),
        30 => Some(".animstream"),
        31 => Some(".animbank"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chunkpak::codec::Endian;

    fn round_trip(entry: &SceneEntry) -> SceneEntry {
        let mut bytes = Vec::new();
        entry.write(&mut bytes);
        assert_eq!(bytes.len(), entry.header_size());
        let mut buf = BufferStream::new(&bytes, Endian::Little);
        SceneEntry::read(&mut buf).unwrap()
    }

    #[test]
    fn header_round_trips() {
        let mut entry = SceneEntry::new("Scene", 16);
        entry.set_offset(33);
        entry.set_size(2048);
        let back = round_trip(&entry);
        assert_eq!(back.name(), "Scene");
        assert_eq!(back.offset(), 33);
        assert_eq!(back.size(), 2048);
        assert_eq!(back.format(), 16);
    }

    #[test]
    fn header_size_matches_name_length() {
        let entry = SceneEntry::new("TexturesInfo", 5);
        assert_eq!(entry.header_size(), 24 + "TexturesInfo".len());
    }

    #[test]
    fn known_and_unknown_extensions() {
        assert_eq!(extension_for(6), Some(".texture"));
        assert_eq!(extension_for(1), None);
        assert_eq!(extension_for(99), None);
    }
}
