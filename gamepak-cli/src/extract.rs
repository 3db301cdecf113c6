use gamepak::{scene_pack_config, Archive, SceneEntry};

#[derive(clap::Parser)]
pub struct Options {
    /// The scene-pack archive to read.
    archive: String,

    /// The name of the entry to extract.
    entry_name: String,

    /// The file to write the entry's payload to.
    out_file: String,
}

pub fn command(options: &Options) -> anyhow::Result<()> {
    let mut archive: Archive<SceneEntry> = Archive::load(&options.archive, scene_pack_config())?;
    archive.extract(&options.entry_name, &options.out_file)?;
    Ok(())
}
