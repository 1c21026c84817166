use super::{print_update_report, Services};
use anyhow::Result;
use packsmith::update_pack;

pub fn run(pack: String) -> Result<()> {
    let services = Services::load()?;
    let ctx = services.context();

    println!("Checking {} for updates...", pack);
    println!();

    let report = update_pack(&ctx, &pack)?;
    print_update_report(&report);
    Ok(())
}
