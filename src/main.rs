//! Scopus Sweep CLI
//!
//! ```bash
//! # Search every combination and write search_results.csv
//! scopus-sweep run --first "daylighting,lighting" --second "reinforcement learning" --third control
//!
//! # Print the generated queries without calling the API
//! scopus-sweep queries --first a,b --second c --third d --doctype ar --year 2015-2024
//!
//! # Serve the HTTP API
//! scopus-sweep serve
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use tokio::net::TcpListener;
use tracing::info;

use scopus_sweep::config::{Config, ScopusConfig};
use scopus_sweep::events::ConsoleLog;
use scopus_sweep::executor::{FanOutExecutor, RunContext, RunPlan};
use scopus_sweep::export::{format_preview, write_csv, DEFAULT_CSV_NAME};
use scopus_sweep::query::{DocumentType, QueryFilterSet};
use scopus_sweep::search::ScopusClient;
use scopus_sweep::session::Session;
use scopus_sweep::store::AggregationStore;
use scopus_sweep::utils::init_logger;
use scopus_sweep::{create_router, AppState};

#[derive(Parser)]
#[command(name = "scopus-sweep", version, about)]
struct Cli {
    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Search every combination and export the merged table
    Run(RunArgs),
    /// Print the queries a run would submit
    Queries(QueryArgs),
    /// Serve the HTTP API
    Serve,
}

#[derive(Args)]
struct QueryArgs {
    /// Comma separated first sub-keywords
    #[arg(long)]
    first: String,

    /// Comma separated second sub-keywords
    #[arg(long)]
    second: String,

    /// Comma separated third sub-keywords
    #[arg(long)]
    third: String,

    /// Document type code, repeatable (ar, cp, re, ...)
    #[arg(long = "doctype")]
    doctypes: Vec<DocumentType>,

    /// Publication year `2020` or range `2015-2024`
    #[arg(long)]
    year: Option<String>,

    /// Restrict to an author name
    #[arg(long)]
    author: Option<String>,
}

#[derive(Args)]
struct RunArgs {
    #[command(flatten)]
    query: QueryArgs,

    /// Papers per search (page size when --all is set)
    #[arg(short = 'n', long)]
    count: Option<u32>,

    /// Follow pagination and fetch every result
    #[arg(long)]
    all: bool,

    /// Concurrent searches
    #[arg(short, long)]
    workers: Option<usize>,

    /// CSV output path
    #[arg(short, long, default_value = DEFAULT_CSV_NAME)]
    output: PathBuf,

    /// Print the first N rows after the run
    #[arg(long, default_value = "10")]
    preview: usize,
}

impl QueryArgs {
    fn plan(&self, scopus: &ScopusConfig) -> RunPlan {
        let filters = QueryFilterSet::new(
            self.doctypes.iter().copied(),
            self.year.as_deref(),
            self.author.as_deref(),
        );
        RunPlan::from_term_lists(&self.first, &self.second, &self.third, filters, scopus.fetch_mode())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::from_env()?;
    let _guard = init_logger(&config.logging, cli.debug);

    match cli.command {
        Command::Run(args) => run(config, args).await,
        Command::Queries(args) => {
            for query in args.plan(&config.scopus).queries() {
                println!("{}", query);
            }
            Ok(())
        }
        Command::Serve => serve(config).await,
    }
}

async fn run(config: Config, args: RunArgs) -> Result<()> {
    let mut scopus = config.scopus.clone();
    if let Some(count) = args.count {
        scopus.papers_per_search = count;
    }
    if args.all {
        scopus.fetch_all = true;
    }
    if let Some(workers) = args.workers {
        scopus.workers = workers;
    }

    let plan = args.query.plan(&scopus);
    if plan.is_empty() {
        bail!("each of --first, --second and --third needs at least one term");
    }

    let client = ScopusClient::from_config(&scopus).context("Scopus client setup failed")?;
    let executor = FanOutExecutor::with_workers(Arc::new(client), scopus.workers);
    let store = AggregationStore::new();
    let ctx = RunContext::begin(store.clone()).await.with_log(Arc::new(ConsoleLog));

    let summary = executor.run(&plan, &ctx).await;
    let rows = store.snapshot().await;

    println!(
        "\n{} queries: {} with results, {} empty, {} failed",
        summary.total_queries, summary.succeeded, summary.empty, summary.failed
    );
    if !rows.is_empty() && args.preview > 0 {
        println!("\n{}", format_preview(&rows, args.preview));
    }

    write_csv(&args.output, &rows).await?;
    println!("Wrote {} rows to {}", rows.len(), args.output.display());
    Ok(())
}

async fn serve(config: Config) -> Result<()> {
    if config.scopus.api_key.trim().is_empty() {
        bail!("SCOPUS_API_KEY must be set to serve searches");
    }
    let client = ScopusClient::from_config(&config.scopus).context("Scopus client setup failed")?;
    let executor = FanOutExecutor::with_workers(Arc::new(client), config.scopus.workers);
    let state = AppState::new(config.clone(), Session::new(Arc::new(executor)));
    let app = create_router(state);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .with_context(|| format!("Invalid listen address {}:{}", config.server.host, config.server.port))?;
    info!("Server listening on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .await
        .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;

    Ok(())
}
