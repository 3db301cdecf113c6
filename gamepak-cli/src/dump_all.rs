use gamepak::{scene, scene_pack_config, Archive, SceneEntry};

#[derive(clap::Parser)]
pub struct Options {
    /// The scene-pack archive to read.
    archive: String,

    /// The directory to extract every entry into.
    out_dir: String,
}

pub fn command(options: &Options) -> anyhow::Result<()> {
    std::fs::create_dir_all(&options.out_dir)?;
    let mut archive: Archive<SceneEntry> = Archive::load(&options.archive, scene_pack_config())?;
    archive.save_all(&options.out_dir, scene::extension_for)?;
    Ok(())
}
