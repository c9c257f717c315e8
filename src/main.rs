//! devac CLI entry point

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser)]
#[command(name = "devac")]
#[command(about = "Incremental code-graph indexing across a multi-repo workspace", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Package root path
    #[arg(long, global = true, default_value = ".")]
    package: PathBuf,

    /// Branch name within the seed
    #[arg(long, global = true, default_value = "base")]
    branch: String,

    /// Emit machine-readable JSON instead of text
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Cold-build a package's seed tables
    Analyze {
        /// Skip the build if the source tree is unchanged since the last analyze
        #[arg(long)]
        if_changed: bool,

        /// Rebuild even if nothing changed
        #[arg(long)]
        force: bool,

        /// Repo name recorded in the seed's provenance
        #[arg(long, default_value = "")]
        repo: String,
    },
    /// Watch a package and apply incremental updates as files change
    Watch,
    /// Run a SQL query against a package's seed tables
    Query {
        /// SQL text; `nodes`/`edges`/`external_refs`/`effects` name the seed tables
        sql: String,
    },
    /// Check a package's seed set for structural integrity
    Verify,
    /// Remove a package's seed directory
    Clean,
    /// Find repos affected by a set of changed entity ids
    Affected {
        /// Workspace root (defaults to the discovered workspace)
        #[arg(long)]
        workspace: Option<PathBuf>,

        /// Changed entity ids
        entity_ids: Vec<String>,
    },
    /// CI/review context surfaces (not backed by this core)
    Context {
        #[command(subcommand)]
        which: ContextSurface,
    },
    /// List entities that depend on a given entity (not backed by this core)
    Dependents,
    /// Sync generated docs from the graph (not backed by this core)
    DocSync,
    /// Workspace hub: repo registry, cross-repo edges, diagnostics
    Hub {
        #[command(subcommand)]
        action: HubAction,
    },
    /// Run the project's type checker (not backed by this core)
    Typecheck,
    /// Run the project's linter (not backed by this core)
    Lint,
    /// Run the project's test suite (not backed by this core)
    Test,
}

#[derive(Subcommand)]
enum ContextSurface {
    Ci,
    Issues,
    Reviews,
    Review,
}

#[derive(Subcommand)]
enum HubAction {
    /// Create the hub database for a workspace
    Init {
        #[arg(long)]
        workspace: Option<PathBuf>,
    },
    /// Register a repo's manifest with the hub
    Register {
        path: PathBuf,
        #[arg(long)]
        workspace: Option<PathBuf>,
    },
    /// Drop a repo's registration
    Unregister {
        repo_id: String,
        #[arg(long)]
        workspace: Option<PathBuf>,
    },
    /// List registered repos
    List {
        #[arg(long)]
        workspace: Option<PathBuf>,
    },
    /// Re-walk one or every registered repo's manifest
    Refresh {
        repo_id: Option<String>,
        #[arg(long)]
        workspace: Option<PathBuf>,
    },
    /// Registered-repo status summary
    Status {
        #[arg(long)]
        workspace: Option<PathBuf>,
    },
    /// List diagnostics pushed to the hub
    Diagnostics {
        #[arg(long)]
        repo: Option<String>,
        #[arg(long)]
        workspace: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(format!("devac={}", log_level)))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let result = match cli.command {
        Commands::Analyze { if_changed, force, repo } => {
            commands::analyze(&cli.package, &cli.branch, if_changed, force, repo, cli.json).await
        }
        Commands::Watch => commands::watch(&cli.package, &cli.branch).await,
        Commands::Query { sql } => commands::query(&cli.package, &cli.branch, &sql, cli.json),
        Commands::Verify => commands::verify(&cli.package, &cli.branch, cli.json),
        Commands::Clean => commands::clean(&cli.package),
        Commands::Affected { workspace, entity_ids } => {
            commands::affected(workspace.as_deref(), &cli.package, &entity_ids, cli.json)
        }
        Commands::Context { which } => commands::unimplemented_surface(match which {
            ContextSurface::Ci => "context ci",
            ContextSurface::Issues => "context issues",
            ContextSurface::Reviews => "context reviews",
            ContextSurface::Review => "context review",
        }),
        Commands::Dependents => commands::unimplemented_surface("dependents"),
        Commands::DocSync => commands::unimplemented_surface("doc-sync"),
        Commands::Hub { action } => commands::hub(action, &cli.package, cli.json).await,
        Commands::Typecheck => commands::unimplemented_surface("typecheck"),
        Commands::Lint => commands::unimplemented_surface("lint"),
        Commands::Test => commands::unimplemented_surface("test"),
    };

    if let Err(e) = &result {
        tracing::error!("{e}");
    }
    result
}
