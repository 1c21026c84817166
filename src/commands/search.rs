use super::Services;
use anyhow::Result;
use packsmith::sync::load_pack;
use packsmith::{Catalog, ProjectType, SearchQuery};

pub fn run(
    query: String,
    project_type: ProjectType,
    pack: Option<String>,
    game_version: Option<String>,
) -> Result<()> {
    let services = Services::load()?;

    let game_version = match pack {
        Some(pack) => Some(load_pack(&services.layout, &pack)?.runtime_version().to_string()),
        None => game_version,
    };

    let mut search = SearchQuery::new(query.as_str(), project_type);
    if let Some(version) = &game_version {
        search = search.runtime_version(version.as_str());
    }
    if project_type.requires_loader() {
        search = search.loader(services.config.loader.tag.as_str());
    }

    match &game_version {
        Some(version) => println!("Searching {}s for: {} (Minecraft {})", project_type, query, version),
        None => println!("Searching {}s for: {}", project_type, query),
    }
    println!();

    let hits = services.catalog.search(&search)?;
    if hits.is_empty() {
        println!("No {}s found matching '{}'", project_type, query);
        println!();
        println!("Try a different search term or drop the version filter.");
        return Ok(());
    }

    println!(
        "Found {} project{}:",
        hits.len(),
        if hits.len() == 1 { "" } else { "s" }
    );
    for hit in &hits {
        println!("  {} - {}", hit.slug, hit.title);
    }
    println!();

    Ok(())
}
