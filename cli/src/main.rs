//! Canopy CLI - materialize a remote graph into a tree, or sum independent values.
//!
//! ```text
//! canopy tree  [--root-id N] [--root-type T] [--strategy S] [--max-depth D]
//! canopy total [--count N]
//! ```
//!
//! Results go to stdout as JSON; logs go to stderr, filtered by `RUST_LOG`.

mod backend;

use std::io::stderr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use canopy_config::CanopyConfig;
use canopy_core::{Materializer, Strategy, aggregate_total};
use canopy_lookup::SimulatedValues;
use canopy_types::NodeId;
use clap::builder::RangedU64ValueParser;
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser)]
#[command(name = "canopy")]
#[command(about = "Materialize remote graph trees with concurrent fan-out")]
struct Cli {
    /// Config file (defaults to $CANOPY_CONFIG, then ~/.canopy/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Materialize a tree and print it as JSON
    Tree {
        /// Id of the root record
        #[arg(long, default_value_t = 1)]
        root_id: u64,
        /// Type label of the root (defaults to the first configured level)
        #[arg(long)]
        root_type: Option<String>,
        /// depth-first or breadth-first
        #[arg(long)]
        strategy: Option<Strategy>,
        /// Maximum number of levels, root included
        #[arg(long, value_parser = RangedU64ValueParser::<usize>::new().range(1..))]
        max_depth: Option<usize>,
    },
    /// Fetch independent values concurrently and print their sum
    Total {
        /// Number of values to fetch
        #[arg(long)]
        count: Option<usize>,
    },
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(stderr))
        .with(env_filter)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let config = CanopyConfig::load(cli.config.as_deref()).context("failed to load config")?;

    match cli.command {
        Commands::Tree {
            root_id,
            root_type,
            strategy,
            max_depth,
        } => run_tree(&config, NodeId::new(root_id), root_type, strategy, max_depth).await,
        Commands::Total { count } => run_total(&config, count).await,
    }
}

async fn run_tree(
    config: &CanopyConfig,
    root_id: NodeId,
    root_type: Option<String>,
    strategy: Option<Strategy>,
    max_depth: Option<usize>,
) -> Result<()> {
    let lookup = backend::build(&config.lookup)?;

    let mut options = config.materialize.options();
    if let Some(strategy) = strategy {
        options = options.with_strategy(strategy);
    }
    if let Some(max_depth) = max_depth {
        options = options.with_max_depth(max_depth);
    }
    let root_type = root_type.unwrap_or_else(|| options.levels.root().to_string());

    let materializer = Materializer::with_options(lookup, options);
    let (abort, task) = materializer.materialize_abortable(root_id, &root_type);

    // Ctrl-C cancels every fetch still in flight.
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, cancelling materialization");
            abort.abort();
        }
    });
    let result = task.await;
    interrupt.abort();

    let tree = result.with_context(|| format!("failed to materialize tree {root_id}"))?;
    let json = serde_json::to_string_pretty(&tree).context("failed to serialize tree")?;
    println!("{json}");
    Ok(())
}

async fn run_total(config: &CanopyConfig, count: Option<usize>) -> Result<()> {
    let count = count.unwrap_or(config.aggregate.count);
    let source = SimulatedValues::new(config.aggregate.latency());

    let total = aggregate_total(&source, count)
        .await
        .with_context(|| format!("failed to aggregate {count} values"))?;
    println!("{}", serde_json::json!({ "count": count, "total": total }));
    Ok(())
}
