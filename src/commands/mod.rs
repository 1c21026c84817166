pub mod add;
pub mod create;
pub mod export;
pub mod install;
pub mod list;
pub mod remove;
pub mod remove_mod;
pub mod search;
pub mod set_version;
pub mod update;

use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use packsmith::{
    Catalog, CatalogProject, Config, FabricInstaller, HttpCatalogClient, HttpFetcher, Layout,
    ProgressCallback, ProjectType, SearchQuery, Selection, SyncContext,
};
use packsmith::selection::select_by_index;
use packsmith::sync::UpdateReport;
use std::io::{self, Write};
use std::sync::Arc;
use std::time::Duration;

/// Catalog, fetcher and loader built from the user configuration
pub struct Services {
    pub config: Config,
    pub layout: Layout,
    pub catalog: HttpCatalogClient,
    pub fetcher: HttpFetcher,
    pub loader: FabricInstaller,
}

impl Services {
    /// Load the configuration and clear leftovers of interrupted runs
    pub fn load() -> Result<Self> {
        let config = Config::load()?;
        let layout = Layout::from_config(&config)?;
        layout.clear_staging()?;
        let catalog = HttpCatalogClient::from_config(&config)?;
        let fetcher = HttpFetcher::from_config(&config)?;
        let loader = FabricInstaller::from_config(&config)?;

        Ok(Self {
            config,
            layout,
            catalog,
            fetcher,
            loader,
        })
    }

    pub fn context(&self) -> SyncContext<'_> {
        SyncContext::new(self.layout.clone(), &self.catalog, &self.fetcher, &self.loader)
            .with_config(&self.config)
    }
}

/// Step counter for install progress.
///
/// Reports carry `current` of `total` steps; the line is cleared once the
/// last step is reached. Reports without a total only update the message.
pub fn progress_display() -> ProgressCallback {
    let bar = ProgressBar::new(0);
    bar.set_style(
        ProgressStyle::with_template("{spinner:.green} [{pos}/{len}] {wide_msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );
    bar.enable_steady_tick(Duration::from_millis(100));
    report_to(bar)
}

fn report_to(bar: ProgressBar) -> ProgressCallback {
    Arc::new(move |message: &str, current: u64, total: u64| {
        if total > 0 {
            bar.set_length(total);
            bar.set_position(current.min(total));
        }
        bar.set_message(message.to_string());
        if total > 0 && current >= total {
            bar.finish_and_clear();
        }
    })
}

/// Print `message` and read one trimmed line from stdin
pub fn prompt(message: &str) -> Result<String> {
    print!("{}", message);
    io::stdout().flush()?;

    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

/// Ask a yes/no question; an empty answer counts as yes
pub fn confirm(message: &str) -> Result<bool> {
    let answer = prompt(&format!("{} [Y/n]: ", message))?;
    Ok(packsmith::selection::parse_confirm(&answer))
}

/// Pick a catalog project for `query`.
///
/// An exact slug match is taken directly; otherwise the hits are listed and
/// the user picks one by number. `None` when nothing matches or the user
/// cancels.
pub fn choose_project(catalog: &dyn Catalog, query: &SearchQuery) -> Result<Option<CatalogProject>> {
    let hits = catalog.search(query)?;

    if let Some(exact) = hits.iter().find(|hit| hit.slug.eq_ignore_ascii_case(&query.query)) {
        return Ok(Some(exact.clone()));
    }
    if hits.is_empty() {
        println!("No {} found matching '{}'", query.project_type, query.query);
        return Ok(None);
    }

    println!("Matching projects:");
    for (i, hit) in hits.iter().enumerate() {
        println!("  [{}] {} ({})", i + 1, hit.title, hit.slug);
    }
    println!();

    loop {
        let input = prompt("Choose a project (number, empty to cancel): ")?;
        match select_by_index(&hits, &input) {
            Selection::Ok(index) => return Ok(Some(hits[index].clone())),
            Selection::Invalid => println!("⚠ '{}' is not in the list", input),
            Selection::Cancelled => return Ok(None),
        }
    }
}

/// Installed pack names, or a hint when there are none
pub fn installed_packs(layout: &Layout) -> Result<Vec<String>> {
    let packs = packsmith::list_packs(layout)?;
    if packs.is_empty() {
        println!("No modpacks installed in {}", layout.instances_root.display());
        println!();
        println!("Install one with: packsmith install <file.mrpack | query>");
    }
    Ok(packs)
}

pub fn print_update_report(report: &UpdateReport) {
    for (old, new) in &report.replaced {
        println!("  ✓ {} -> {}", old, new);
    }
    for (path, reason) in &report.dropped {
        println!("  ✗ Dropped {} ({})", path, reason);
    }
    for file in &report.evicted {
        println!("  - Removed stale {}", file);
    }

    println!();
    if report.has_changes() {
        println!(
            "Checked {} file{}: {} replaced, {} dropped, {} up to date",
            report.checked,
            if report.checked == 1 { "" } else { "s" },
            report.replaced.len(),
            report.dropped.len(),
            report.unchanged.len()
        );
    } else {
        println!("✓ All {} files are up to date", report.checked);
    }
}

/// Content type names accepted by `add`
pub fn ensure_content_type(project_type: ProjectType) -> Result<()> {
    if project_type.content_dir().is_none() {
        anyhow::bail!(
            "'{}' content can't be added to a modpack (expected mod, resourcepack or shader)",
            project_type
        );
    }
    Ok(())
}
