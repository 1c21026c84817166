use super::{confirm, Services};
use anyhow::Result;
use packsmith::remove_pack;

pub fn run(pack: String, yes: bool) -> Result<()> {
    let services = Services::load()?;
    let layout = &services.layout;

    if !yes && !confirm(&format!("Remove modpack '{}' and its launcher profile?", pack))? {
        println!("Remove cancelled.");
        return Ok(());
    }

    let outcome = remove_pack(layout, &pack)?;

    if outcome.instance_removed {
        println!("  ✓ Removed {}", layout.instance_dir(&pack).display());
    } else {
        println!("  ⚠ Instance directory not found (continuing)");
    }
    if outcome.version_removed {
        println!("  ✓ Removed {}", layout.version_dir(&pack).display());
    }
    if outcome.profiles_removed > 0 {
        println!(
            "  ✓ Removed {} launcher profile{}",
            outcome.profiles_removed,
            if outcome.profiles_removed == 1 { "" } else { "s" }
        );
    }

    println!();
    println!("✓ Successfully removed {}", pack);
    Ok(())
}
