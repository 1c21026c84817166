use super::{choose_project, progress_display, prompt, Services};
use anyhow::Result;
use packsmith::selection::select_by_index;
use packsmith::sync::InstallOutcome;
use packsmith::{
    available_runtime_versions, install_from_archive, install_from_catalog, CatalogProject,
    ProjectType, SearchQuery, Selection, SyncContext,
};
use std::path::PathBuf;

pub fn run(source: String, game_version: Option<String>) -> Result<()> {
    let services = Services::load()?;
    let ctx = services.context();

    let outcome = match local_archive(&services, &source)? {
        Some(path) => {
            if game_version.is_some() {
                println!("⚠ --game-version is ignored for .mrpack files");
            }
            println!("Installing modpack from {}", path.display());
            install_from_archive(&ctx.with_progress(progress_display()), &path)?
        }
        None => {
            let search = SearchQuery::new(source.as_str(), ProjectType::Modpack).loader(ctx.loader_tag.as_str());
            let Some(project) = choose_project(ctx.catalog, &search)? else {
                println!("Nothing installed.");
                return Ok(());
            };

            let runtime_version = match game_version {
                Some(version) => version,
                None => match choose_runtime_version(&ctx, &project)? {
                    Some(version) => version,
                    None => {
                        println!("Nothing installed.");
                        return Ok(());
                    }
                },
            };

            println!("Installing modpack {} for Minecraft {}", project.title, runtime_version);
            install_from_catalog(&ctx.with_progress(progress_display()), &project, Some(&runtime_version))?
        }
    };

    print_outcome(&outcome);
    Ok(())
}

/// Ask which game version to install the pack for.
///
/// A pack released for a single version needs no answer; `None` when the
/// user cancels.
fn choose_runtime_version(ctx: &SyncContext, project: &CatalogProject) -> Result<Option<String>> {
    let versions = available_runtime_versions(ctx, project)?;
    if versions.is_empty() {
        anyhow::bail!("{} has no release for {}", project.title, ctx.loader_tag);
    }
    if versions.len() == 1 {
        return Ok(versions.into_iter().next());
    }

    println!("{} is available for:", project.title);
    for (i, version) in versions.iter().enumerate() {
        println!("  [{}] Minecraft {}", i + 1, version);
    }
    println!();

    loop {
        let input = prompt("Choose a game version (number, empty to cancel): ")?;
        match select_by_index(&versions, &input) {
            Selection::Ok(index) => return Ok(Some(versions[index].clone())),
            Selection::Invalid => println!("⚠ '{}' is not in the list", input),
            Selection::Cancelled => return Ok(None),
        }
    }
}

/// A `.mrpack` path given directly or found in the downloads directory
fn local_archive(services: &Services, source: &str) -> Result<Option<PathBuf>> {
    let path = PathBuf::from(shellexpand::tilde(source).into_owned());
    if path.is_file() {
        return Ok(Some(path));
    }
    if !source.ends_with(".mrpack") {
        return Ok(None);
    }

    let in_downloads = services.config.downloads_dir()?.join(source);
    if in_downloads.is_file() {
        return Ok(Some(in_downloads));
    }
    anyhow::bail!("{} not found", source)
}

fn print_outcome(outcome: &InstallOutcome) {
    println!();
    println!("✓ Installed {}", outcome.name);
    println!("  Files: {}", outcome.files_fetched);
    println!("  Location: {}", outcome.instance_dir.display());
    println!("  Launcher profile: {}", outcome.profile_id);
}
