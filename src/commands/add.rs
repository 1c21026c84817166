use super::{choose_project, ensure_content_type, Services};
use anyhow::Result;
use packsmith::sync::load_pack;
use packsmith::{add_content, ProjectType, SearchQuery};

pub fn run(pack: String, query: String, project_type: ProjectType) -> Result<()> {
    ensure_content_type(project_type)?;
    let services = Services::load()?;
    let ctx = services.context();

    let manifest = load_pack(&ctx.layout, &pack)?;
    let runtime_version = manifest.runtime_version().to_string();

    let mut search = SearchQuery::new(query.as_str(), project_type).runtime_version(runtime_version.as_str());
    if project_type.requires_loader() {
        search = search.loader(ctx.loader_tag.as_str());
    }

    let project = match choose_project(ctx.catalog, &search)? {
        Some(project) => project,
        None => {
            println!("Nothing added.");
            return Ok(());
        }
    };

    println!("Adding {} to {} (Minecraft {})...", project.title, pack, runtime_version);
    let outcome = add_content(&ctx, &pack, &project)?;

    println!("  ✓ {}", outcome.entry.path);
    for dependency in &outcome.dependencies {
        println!("  ✓ {} (dependency)", dependency.path);
    }
    for skipped in &outcome.skipped {
        println!("  ⚠ Skipped dependency {}: {}", skipped.name, skipped.reason);
    }
    for stale in &outcome.evicted {
        println!("  - Removed stale {}", stale);
    }

    println!();
    println!("✓ Added {} to {}", project.title, pack);
    Ok(())
}
