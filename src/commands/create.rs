use super::{progress_display, Services};
use anyhow::Result;
use packsmith::create_custom;

pub fn run(name: String, game_version: String, loader: Option<String>) -> Result<()> {
    let services = Services::load()?;
    let ctx = services.context().with_progress(progress_display());

    println!("Creating modpack {} for Minecraft {}", name, game_version);
    let outcome = create_custom(&ctx, &name, &game_version, loader.as_deref())?;

    println!();
    println!("✓ Created {}", outcome.name);
    println!("  Location: {}", outcome.instance_dir.display());
    println!();
    println!("Add mods with: packsmith add {} <mod>", outcome.name);
    Ok(())
}
