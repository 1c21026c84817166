use super::{confirm, prompt, Services};
use anyhow::Result;
use packsmith::selection::select_name;
use packsmith::sync::load_pack;
use packsmith::{list_managed_files, remove_artifact, Selection};

pub fn run(pack: String, name: Option<String>, yes: bool) -> Result<()> {
    let services = Services::load()?;
    let layout = &services.layout;

    load_pack(layout, &pack)?;
    let files = list_managed_files(layout, &pack)?;
    if files.is_empty() {
        println!("No mods installed in {}", pack);
        return Ok(());
    }

    let mut input = match name {
        Some(name) => name,
        None => {
            print_files(&files);
            prompt("Mod to remove (number or name, empty to cancel): ")?
        }
    };

    let file = loop {
        match select_name(&files, &input) {
            Selection::Ok(index) => break files[index].clone(),
            Selection::Cancelled => {
                println!("Remove cancelled.");
                return Ok(());
            }
            Selection::Invalid => {
                println!("⚠ '{}' does not match exactly one mod", input);
                print_files(&files);
                input = prompt("Mod to remove (number or name, empty to cancel): ")?;
            }
        }
    };

    if !yes && !confirm(&format!("Remove {} from {}?", file, pack))? {
        println!("Remove cancelled.");
        return Ok(());
    }

    let removed = remove_artifact(layout, &pack, &file)?;
    if removed.is_empty() {
        println!("  ⚠ {} was not tracked by the manifest", file);
    }
    println!("✓ Removed {}", file);
    Ok(())
}

fn print_files(files: &[String]) {
    println!();
    for (i, file) in files.iter().enumerate() {
        println!("  [{}] {}", i + 1, file);
    }
    println!();
}
