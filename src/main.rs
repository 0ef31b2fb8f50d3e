//! MetaGraph CLI entry point

use clap::{Parser, Subcommand};
use metagraph_importer::MetagraphConfig;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser)]
#[command(name = "metagraph")]
#[command(about = "Typed knowledge graph of software artefacts, versioned through patches", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Config file (defaults to ./metagraph.toml when present)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse SQL and Markdown files straight into the graph
    Build {
        files: Vec<PathBuf>,

        /// Graph file to extend (defaults to the configured graph)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Summarize a graph by node kind
    Show {
        graph: Option<PathBuf>,
    },
    /// Print the patch turning one graph into another
    Diff {
        old: PathBuf,
        new: PathBuf,
    },
    /// Import artefacts into a patch, using the cache and AI where configured
    Import {
        files: Vec<PathBuf>,

        /// Write the patch here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Stop at the first file that fails
        #[arg(long)]
        strict: bool,
    },
    /// Apply a patch file to a graph, keeping the result only if it validates
    Apply {
        patch: PathBuf,

        #[arg(short, long)]
        graph: Option<PathBuf>,
    },
    /// Check every node against the schema
    Validate {
        graph: Option<PathBuf>,
    },
    /// Clear the import cache
    ClearCache,
    /// Show version
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(format!("metagraph={}", log_level)))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Commands::Version = cli.command {
        println!("MetaGraph v{}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let config = MetagraphConfig::load(cli.config.as_deref())?;
    tracing::debug!("Config: {:?}", config);

    match cli.command {
        Commands::Build { files, output } => commands::build(&config, &files, output).await,
        Commands::Show { graph } => commands::show(&config, graph),
        Commands::Diff { old, new } => commands::diff(&old, &new),
        Commands::Import {
            files,
            output,
            strict,
        } => commands::import(&config, &files, output, strict).await,
        Commands::Apply { patch, graph } => commands::apply(&config, &patch, graph),
        Commands::Validate { graph } => commands::validate(&config, graph),
        Commands::ClearCache => commands::clear_cache(&config),
        Commands::Version => Ok(()),
    }
}
