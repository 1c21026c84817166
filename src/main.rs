use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use packsmith::ProjectType;
use tracing_subscriber::EnvFilter;

mod commands;

/// packsmith - Modrinth modpack manager for Fabric instances
#[derive(Parser)]
#[command(name = "packsmith")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List installed modpacks
    List,

    /// Search the Modrinth catalog
    Search {
        /// Search query
        query: String,

        /// Project type: mod, modpack, resourcepack or shader
        #[arg(short = 't', long = "type", default_value = "mod")]
        project_type: ProjectType,

        /// Filter by the game version of an installed modpack
        #[arg(short, long)]
        pack: Option<String>,

        /// Filter by game version (e.g., 1.20.1)
        #[arg(short, long, conflicts_with = "pack")]
        game_version: Option<String>,
    },

    /// Add a mod, resource pack or shader pack to a modpack
    Add {
        /// Installed modpack name
        pack: String,

        /// Catalog slug or search query
        query: String,

        /// Project type: mod, resourcepack or shader
        #[arg(short = 't', long = "type", default_value = "mod")]
        project_type: ProjectType,
    },

    /// Install a modpack from a .mrpack file or from the catalog
    Install {
        /// Path to a .mrpack file, or a catalog slug or search query
        source: String,

        /// Game version to install the modpack for (catalog installs only)
        #[arg(short, long)]
        game_version: Option<String>,
    },

    /// Create an empty modpack
    Create {
        /// Modpack name
        name: String,

        /// Game version (e.g., 1.20.1)
        #[arg(short, long)]
        game_version: String,

        /// Fabric loader version (defaults to the latest for the game version)
        #[arg(short, long)]
        loader: Option<String>,
    },

    /// Update every mod of a modpack to its newest compatible release
    Update {
        /// Installed modpack name
        pack: String,
    },

    /// Remove a mod from a modpack
    RemoveMod {
        /// Installed modpack name
        pack: String,

        /// Mod file name, unique prefix or list number (prompts when omitted)
        #[arg(value_name = "MOD")]
        file: Option<String>,

        /// Don't ask for confirmation
        #[arg(short, long)]
        yes: bool,
    },

    /// Remove a modpack, its version descriptor and launcher profile
    Remove {
        /// Installed modpack name
        pack: String,

        /// Don't ask for confirmation
        #[arg(short, long)]
        yes: bool,
    },

    /// Move a modpack to another game version
    SetVersion {
        /// Installed modpack name
        pack: String,

        /// New game version (e.g., 1.21)
        game_version: String,

        /// Fabric loader version (defaults to the latest for the game version)
        #[arg(short, long)]
        loader: Option<String>,
    },

    /// Export a modpack as a .mrpack archive
    Export {
        /// Installed modpack name
        pack: String,

        /// Bundle resource packs and shader packs as overrides
        #[arg(long)]
        with_packs: bool,

        /// Output directory (defaults to the downloads directory)
        #[arg(short, long)]
        out: Option<String>,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Diagnostics go to stderr, filtered by `PACKSMITH_LOG` (default `warn`)
fn initialize_tracing() {
    let filter = EnvFilter::try_from_env("PACKSMITH_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    initialize_tracing();

    let result = match cli.command {
        Commands::List => commands::list::run(),
        Commands::Search {
            query,
            project_type,
            pack,
            game_version,
        } => commands::search::run(query, project_type, pack, game_version),
        Commands::Add {
            pack,
            query,
            project_type,
        } => commands::add::run(pack, query, project_type),
        Commands::Install {
            source,
            game_version,
        } => commands::install::run(source, game_version),
        Commands::Create {
            name,
            game_version,
            loader,
        } => commands::create::run(name, game_version, loader),
        Commands::Update { pack } => commands::update::run(pack),
        Commands::RemoveMod { pack, file, yes } => commands::remove_mod::run(pack, file, yes),
        Commands::Remove { pack, yes } => commands::remove::run(pack, yes),
        Commands::SetVersion {
            pack,
            game_version,
            loader,
        } => commands::set_version::run(pack, game_version, loader),
        Commands::Export {
            pack,
            with_packs,
            out,
        } => commands::export::run(pack, with_packs, out),
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "packsmith", &mut std::io::stdout());
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
