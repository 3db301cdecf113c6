//! Concrete archive kinds built on `chunkpak-archive`: scene-pack, bitmap-metadata, and the
//! paired image-pack format, plus each kind's format-to-extension mapping.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod bitmap;
mod error;
pub mod image_pack;
pub mod scene;

pub use bitmap::BitmapMetadataEntry;
pub use chunkpak::Variant;
pub use chunkpak_archive::{Archive, ArchiveConfig, ChildCountWidth, EntryCodec};
pub use error::{Error, Result};
pub use image_pack::ImagePack;
pub use scene::SceneEntry;

/// The archive parameters for a scene-pack archive: an H1A container, a `u32` entry count,
/// and no footer padding.
pub fn scene_pack_config() -> ArchiveConfig {
    ArchiveConfig {
        variant: Variant::H1A,
        child_count_width: ChildCountWidth::U32,
        footer_pad: None,
    }
}
