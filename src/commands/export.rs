use super::Services;
use anyhow::Result;
use packsmith::export_pack;
use std::fs;
use std::path::PathBuf;

pub fn run(pack: String, with_packs: bool, out: Option<String>) -> Result<()> {
    let services = Services::load()?;

    let out_dir = match out {
        Some(dir) => PathBuf::from(shellexpand::tilde(&dir).into_owned()),
        None => services.config.downloads_dir()?,
    };
    fs::create_dir_all(&out_dir)?;

    println!("Exporting {}...", pack);
    let archive = export_pack(&services.layout, &pack, with_packs, &out_dir)?;

    println!("✓ Exported to {}", archive.display());
    if with_packs {
        println!("  Resource and shader packs are bundled as overrides");
    }
    Ok(())
}
