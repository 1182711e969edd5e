use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

mod cli;

#[derive(Parser)]
#[command(name = "codeindex")]
#[command(author = "Intent Project Team")]
#[command(version)]
#[command(about = "Structural code and documentation index for AI agents via MCP", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Project directory (shorthand for 'codeindex serve --project <project>')
    #[arg(value_name = "PROJECT")]
    project: Option<String>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the index and save the snapshot
    Index {
        /// Project directory to index
        #[arg(short, long, default_value = ".")]
        project: String,

        /// Snapshot destination (overrides .codeindex.toml)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Run one search against the fresh index
        #[arg(short, long)]
        search: Option<String>,

        /// Restrict the search to one component kind
        #[arg(short, long)]
        kind: Option<String>,

        /// Maximum number of search results
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Search the index
    Search {
        /// Search query
        query: String,

        /// Project directory
        #[arg(short, long, default_value = ".")]
        project: String,

        /// Restrict results to one component kind
        #[arg(short, long)]
        kind: Option<String>,

        /// Maximum number of results
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Show index statistics
    Stats {
        /// Project directory
        #[arg(short, long, default_value = ".")]
        project: String,
    },

    /// Start MCP server on stdio
    Serve {
        /// Project directory to index
        #[arg(short, long, default_value = ".")]
        project: String,
    },
}

fn init_logging(debug: bool, verbose: bool) {
    let level = if debug {
        Level::DEBUG
    } else if verbose {
        Level::INFO
    } else {
        Level::WARN
    };

    // stdout carries results and the JSON-RPC stream
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(level).into())
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.debug, cli.verbose);

    info!("codeindex v{} starting...", env!("CARGO_PKG_VERSION"));

    // Handle shorthand: codeindex <project>
    let command = cli.command.unwrap_or_else(|| Commands::Serve {
        project: cli.project.unwrap_or_else(|| ".".to_string()),
    });

    match command {
        Commands::Index {
            project,
            output,
            search,
            kind,
            limit,
        } => {
            cli::index::index_project(project, output, search, kind, limit)?;
        }

        Commands::Search {
            query,
            project,
            kind,
            limit,
        } => {
            cli::search::search_project(project, query, kind, limit)?;
        }

        Commands::Stats { project } => {
            cli::stats::show_stats(project, cli.verbose)?;
        }

        Commands::Serve { project } => {
            info!("Starting MCP server for project: {}", project);
            cli::serve::serve_stdio(project).await?;
        }
    }

    Ok(())
}
