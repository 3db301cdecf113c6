use gamepak::{scene_pack_config, Archive, SceneEntry};

#[derive(clap::Parser)]
pub struct Options {
    /// The scene-pack archive to read.
    archive: String,
}

pub fn command(options: &Options) -> anyhow::Result<()> {
    let archive: Archive<SceneEntry> = Archive::load(&options.archive, scene_pack_config())?;
    for name in archive.list() {
        println!("{name}");
    }
    Ok(())
}
