use super::installed_packs;
use anyhow::Result;
use packsmith::sync::load_pack;
use packsmith::{Config, Layout};

pub fn run() -> Result<()> {
    let config = Config::load()?;
    let layout = Layout::from_config(&config)?;
    layout.clear_staging()?;

    let packs = installed_packs(&layout)?;
    if packs.is_empty() {
        return Ok(());
    }

    println!(
        "{} modpack{} in {}:",
        packs.len(),
        if packs.len() == 1 { "" } else { "s" },
        layout.instances_root.display()
    );
    for name in &packs {
        match load_pack(&layout, name) {
            Ok(manifest) => println!(
                "  {} - Minecraft {}, Fabric {} ({} files)",
                name,
                manifest.runtime_version(),
                manifest.loader_version(),
                manifest.files.len()
            ),
            Err(e) => {
                tracing::debug!(pack = %name, error = %e, "manifest unreadable");
                println!("  {} - ⚠ no readable manifest", name);
            }
        }
    }

    Ok(())
}
