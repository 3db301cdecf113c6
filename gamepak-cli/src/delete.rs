use gamepak::{scene_pack_config, Archive, SceneEntry};

#[derive(clap::Parser)]
pub struct Options {
    /// The scene-pack archive to read.
    archive: String,

    /// The name of the entry to delete.
    entry_name: String,

    /// Where to write the resulting archive.
    out: String,
}

pub fn command(options: &Options) -> anyhow::Result<()> {
    let mut archive: Archive<SceneEntry> = Archive::load(&options.archive, scene_pack_config())?;
    archive.delete(&options.entry_name)?;
    archive.save(&options.out)?;
    Ok(())
}
