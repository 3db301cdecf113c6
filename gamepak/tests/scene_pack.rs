use gamepak::{scene_pack_config, Archive, EntryCodec, SceneEntry};

#[test]
fn delete_and_save_matches_expected_layout() {
    let mut archive: Archive<SceneEntry> = Archive::empty(scene_pack_config());
    archive
        .new_entry("TexturesInfo", 5, vec![0u8; 1024])
        .unwrap();
    archive.new_entry("Scene", 16, vec![0u8; 2048]).unwrap();

    archive.delete("TexturesInfo").unwrap();

    let file = tempfile::NamedTempFile::new().unwrap();
    archive.save(file.path()).unwrap();

    let mut loaded: Archive<SceneEntry> = Archive::load(file.path(), scene_pack_config()).unwrap();
    assert_eq!(loaded.list().collect::<Vec<_>>(), ["Scene"]);
    let entry = loaded.entry("Scene").unwrap().clone();
    assert_eq!(entry.offset(), 4 + 24 + 5);
    assert_eq!(entry.size(), 2048);
}

#[test]
fn image_pack_metadata_tracks_pixel_location() {
    use gamepak::ImagePack;

    let mut pack = ImagePack::empty();
    pack.new_entry("bitmap_01", 0x4C, 256, 256, 1, 8, 1, vec![0xEEu8; 0x4040])
        .unwrap();

    let meta_file = tempfile::NamedTempFile::new().unwrap();
    let pixel_file = tempfile::NamedTempFile::new().unwrap();
    pack.save(meta_file.path(), pixel_file.path()).unwrap();

    let loaded = ImagePack::load(meta_file.path(), pixel_file.path()).unwrap();
    let record = loaded.metadata("bitmap_01").unwrap();
    assert_eq!(record.format(), 0x4C);
    assert_eq!(record.width(), 256);
    assert_eq!(record.mipmap_count(), 8);
}
