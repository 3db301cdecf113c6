//! An image pack: a metadata archive of fixed-size bitmap records paired with a pixel-payload
//! archive keyed by the same names, kept in lockstep.
//!
//! The two halves are independent archives on disk (conventionally `.imeta`/`.ipak` files);
//! [`ImagePack`] is the thin layer that keeps a bitmap-metadata record's cached `offset`/`size`
//! in sync with where its pixel payload actually lands when the pixel archive is saved.

use crate::bitmap::BitmapMetadataEntry;
use crate::error::Result;
use crate::scene::SceneEntry;
use chunkpak::Variant;
use chunkpak_archive::{Archive, ArchiveConfig, ChildCountWidth, EntryCodec};
use std::path::Path;

/// Every image-pack pixel payload entry is written with this extension; the pack has no
/// format-to-extension table of its own.
pub const PIXEL_EXTENSION: &str = ".ipak_entry";

fn metadata_config() -> ArchiveConfig {
    ArchiveConfig {
        variant: Variant::H1A,
        child_count_width: ChildCountWidth::U64,
        footer_pad: Some(0x290008),
    }
}

fn pixel_config() -> ArchiveConfig {
    ArchiveConfig {
        variant: Variant::H1A,
        child_count_width: ChildCountWidth::U64,
        footer_pad: Some(0x200000),
    }
}

/// A paired bitmap-metadata archive and pixel-payload archive, addressed by a shared set of
/// texture names.
pub struct ImagePack {
    metadata: Archive<BitmapMetadataEntry>,
    pixels: Archive<SceneEntry>,
}

impl ImagePack {
    /// Creates an empty image pack backed by no file.
    pub fn empty() -> Self {
        Self {
            metadata: Archive::empty(metadata_config()),
            pixels: Archive::empty(pixel_config()),
        }
    }

    /// Opens the metadata and pixel archives at the given paths.
    pub fn load(metadata_path: impl AsRef<Path>, pixels_path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self {
            metadata: Archive::load(metadata_path, metadata_config())?,
            pixels: Archive::load(pixels_path, pixel_config())?,
        })
    }

    /// The texture names present in this pack, in insertion order.
    pub fn list(&self) -> impl Iterator<Item = &str> {
        self.metadata.list()
    }

    /// Returns `true` if a texture with this name exists in both halves of the pack.
    pub fn has(&self, name: &str) -> bool {
        self.metadata.has(name) && self.pixels.has(name)
    }

    /// The bitmap-metadata record for the named texture.
    pub fn metadata(&self, name: &str) -> Option<&BitmapMetadataEntry> {
        self.metadata.entry(name)
    }

    /// The named texture's raw pixel payload, loading it from the pixel archive on first
    /// access.
    pub fn pixels(&mut self, name: &str) -> Result<&[u8]> {
        Ok(self.pixels.get(name)?)
    }

    /// Writes the named texture's pixel payload to `path`.
    pub fn extract(&mut self, name: &str, path: impl AsRef<Path>) -> Result<()> {
        self.pixels.extract(name, path)?;
        Ok(())
    }

    /// Adds a new texture to both halves of the pack.
    ///
    /// Fails with [`chunkpak_archive::Error::DuplicateEntry`] if the name already exists in
    /// either half.
    #[allow(clippy::too_many_arguments)]
    pub fn new_entry(
        &mut self,
        name: &str,
        format: u32,
        width: u32,
        height: u32,
        depth: u32,
        mipmap_count: u32,
        face_count: u32,
        pixels: Vec<u8>,
    ) -> Result<()> {
        self.pixels.new_entry(name, 0, pixels)?;
        let mut meta = BitmapMetadataEntry::new(name, format);
        meta.set_dimensions(width, height, depth);
        meta.set_mipmap_count(mipmap_count);
        meta.set_face_count(face_count);
        self.metadata.insert_header(meta)?;
        Ok(())
    }

    /// Removes a texture from both halves of the pack.
    ///
    /// Fails with [`chunkpak_archive::Error::AbsentEntry`] if the name is missing from either
    /// half.
    pub fn delete(&mut self, name: &str) -> Result<()> {
        self.metadata.delete(name)?;
        self.pixels.delete(name)?;
        Ok(())
    }

    /// Saves the pixel archive first, then copies each texture's freshly assigned pixel
    /// `(offset, size)` into its metadata record before saving the metadata archive — the
    /// metadata record's own `offset`/`size` fields describe a location in the pixel archive,
    /// not the metadata archive, so they can only be finalized after the pixel archive's
    /// layout is known.
    pub fn save(&mut self, metadata_path: impl AsRef<Path>, pixels_path: impl AsRef<Path>) -> Result<()> {
        self.pixels.save(pixels_path)?;

        let names: Vec<String> = self.metadata.list().map(str::to_string).collect();
        for name in names {
            if let Some((offset, size)) = self.pixels.entry_location(&name) {
                self.metadata.set_location(&name, offset, size)?;
            }
        }

        self.metadata.save(metadata_path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_save_and_load() {
        let mut pack = ImagePack::empty();
        pack.new_entry("diffuse", 0x49, 256, 256, 1, 9, 1, vec![7u8; 4096])
            .unwrap();

        let meta_file = tempfile::NamedTempFile::new().unwrap();
        let pixel_file = tempfile::NamedTempFile::new().unwrap();
        pack.save(meta_file.path(), pixel_file.path()).unwrap();

        let mut loaded = ImagePack::load(meta_file.path(), pixel_file.path()).unwrap();
        assert!(loaded.has("diffuse"));
        assert_eq!(loaded.metadata("diffuse").unwrap().width(), 256);
        assert_eq!(loaded.pixels("diffuse").unwrap(), &vec![7u8; 4096][..]);
    }

    #[test]
    fn delete_removes_from_both_halves() {
        let mut pack = ImagePack::empty();
        pack.new_entry("a", 0x30, 4, 4, 1, 1, 1, vec![1, 2, 3])
            .unwrap();
        pack.delete("a").unwrap();
        assert!(!pack.has("a"));
    }
}
