use super::{print_update_report, Services};
use anyhow::Result;
use packsmith::change_runtime_version;

pub fn run(pack: String, game_version: String, loader: Option<String>) -> Result<()> {
    let services = Services::load()?;
    let ctx = services.context();

    println!("Moving {} to Minecraft {}...", pack, game_version);
    println!();

    let report = change_runtime_version(&ctx, &pack, &game_version, loader.as_deref())?;
    print_update_report(&report);

    if !report.dropped.is_empty() {
        println!();
        println!(
            "⚠ {} mod{} had no release for Minecraft {} and {} removed",
            report.dropped.len(),
            if report.dropped.len() == 1 { "" } else { "s" },
            game_version,
            if report.dropped.len() == 1 { "was" } else { "were" }
        );
    }
    Ok(())
}
