//! CLI command definitions, routing, and tracing setup.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use siteindex_client::{ArtifactSource, DirSource, HttpSource, SearchClient};
use siteindex_core::{BuildHooks, BuildResult, ProgressReporter, build_site, discover_pages};
use siteindex_devserver::ArtifactResolver;
use siteindex_shared::{AppConfig, BuildSettings, IndexKey, init_config, load_config, load_config_from};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// siteindex: static search indexes for generated sites.
#[derive(Parser)]
#[command(
    name = "siteindex",
    version,
    about = "Extract search documents from built pages into static, partitioned search indexes.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Extract documents from a built site and write its search artifacts.
    Build {
        /// Output directory of the built site (overrides `build.out_dir`).
        #[arg(short, long)]
        dir: Option<PathBuf>,

        /// Config file (defaults to ./siteindex.toml).
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Serve a built site and its search artifacts for development.
    Serve {
        /// Output directory of the built site (overrides `build.out_dir`).
        #[arg(short, long)]
        dir: Option<PathBuf>,

        /// Address to listen on (overrides `dev.bind`).
        #[arg(long)]
        bind: Option<String>,

        /// Public base path of the site (overrides `dev.base`).
        #[arg(long)]
        base: Option<String>,
    },

    /// Query built search artifacts.
    Search {
        /// Query string, e.g. `+title:rust sea*`.
        query: String,

        /// Partition to search (default partition when omitted).
        #[arg(short, long)]
        index: Option<String>,

        /// Local artifact directory (defaults to the configured artifact root).
        #[arg(long, conflicts_with = "url")]
        dir: Option<PathBuf>,

        /// Base URL of a deployed or dev-served site.
        #[arg(long)]
        url: Option<String>,

        /// Maximum number of results to print.
        #[arg(short, long, default_value = "10")]
        limit: usize,

        /// Print enriched hits as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "siteindex=info",
        1 => "siteindex=debug",
        _ => "siteindex=trace",
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Build { dir, config } => cmd_build(dir, config.as_deref()).await,
        Command::Serve { dir, bind, base } => cmd_serve(dir, bind, base).await,
        Command::Search {
            query,
            index,
            dir,
            url,
            limit,
            json,
        } => cmd_search(&query, index.as_deref(), dir, url.as_deref(), limit, json).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show().await,
        },
    }
}

// ---------------------------------------------------------------------------
// build
// ---------------------------------------------------------------------------

async fn cmd_build(dir: Option<PathBuf>, config_path: Option<&Path>) -> Result<()> {
    let config = match config_path {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    };

    let mut settings = BuildSettings::from(&config);
    if let Some(dir) = dir {
        settings.out_dir = dir;
    }
    if !settings.out_dir.is_dir() {
        return Err(eyre!(
            "output directory '{}' not found; build the site first",
            settings.out_dir.display()
        ));
    }

    let hooks = BuildHooks::from_config(&config)?;
    let pages = discover_pages(&settings.out_dir, Some(&settings.artifact_root())).await?;

    info!(
        out_dir = %settings.out_dir.display(),
        pages = pages.len(),
        "building search artifacts"
    );

    let reporter = CliProgress::new();
    let result = build_site(&settings, &hooks, &pages, &reporter).await?;

    println!();
    println!("  Search artifacts built!");
    println!("  Pages:      {} scanned, {} indexed", result.pages_scanned, result.pages_indexed);
    println!("  Documents:  {}", result.documents);
    for partition in &result.manifest.partitions {
        println!("    {:<12} {}", partition.index.to_string(), partition.document_count);
    }
    println!("  Path:       {}", result.artifact_root.display());
    println!("  Build:      {}", result.manifest.build_id);
    println!("  Time:       {:.1}s", result.elapsed.as_secs_f64());
    println!();

    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn page_scanned(&self, pathname: &str, current: usize, total: usize) {
        let shown = if pathname.is_empty() { "/" } else { pathname };
        self.spinner
            .set_message(format!("Scanning [{current}/{total}] {shown}"));
    }

    fn done(&self, _result: &BuildResult) {
        self.spinner.finish_and_clear();
    }
}

// ---------------------------------------------------------------------------
// serve
// ---------------------------------------------------------------------------

async fn cmd_serve(dir: Option<PathBuf>, bind: Option<String>, base: Option<String>) -> Result<()> {
    let config = load_config()?;
    let out_dir = dir.unwrap_or_else(|| PathBuf::from(&config.build.out_dir));
    let bind = bind.unwrap_or_else(|| config.dev.bind.clone());
    let base = base.unwrap_or_else(|| config.dev.base.clone());

    let addr: SocketAddr = bind
        .parse()
        .map_err(|e| eyre!("invalid bind address '{bind}': {e}"))?;

    println!("Serving {} on http://{addr}{base}", out_dir.display());
    siteindex_devserver::serve(addr, ArtifactResolver::new(out_dir, &base)).await?;
    Ok(())
}

// ---------------------------------------------------------------------------
// search
// ---------------------------------------------------------------------------

async fn cmd_search(
    query: &str,
    index: Option<&str>,
    dir: Option<PathBuf>,
    url: Option<&str>,
    limit: usize,
    json: bool,
) -> Result<()> {
    let key = IndexKey::from(index);

    match (url, dir) {
        (Some(url), _) => {
            let config = load_config()?;
            let sub_dir = BuildSettings::from(&config).sub_dir.unwrap_or_default();
            let client = SearchClient::new(HttpSource::new(url)?, sub_dir);
            print_results(&client, query, &key, limit, json).await
        }
        (None, Some(dir)) => {
            let client = SearchClient::new(DirSource::new(dir), "");
            print_results(&client, query, &key, limit, json).await
        }
        (None, None) => {
            let config = load_config()?;
            let root = BuildSettings::from(&config).artifact_root();
            let client = SearchClient::new(DirSource::new(root), "");
            print_results(&client, query, &key, limit, json).await
        }
    }
}

async fn print_results<S: ArtifactSource>(
    client: &SearchClient<S>,
    query: &str,
    key: &IndexKey,
    limit: usize,
    json: bool,
) -> Result<()> {
    let mut results = client.search_enriched(query, key).await?;
    results.truncate(limit);

    if json {
        println!("{}", serde_json::to_string_pretty(&results)?);
        return Ok(());
    }

    if results.is_empty() {
        println!("No results for '{query}' in index {key}");
        return Ok(());
    }

    for (rank, result) in results.iter().enumerate() {
        let (url, title) = match &result.document {
            Some(doc) => (doc.canonical_url.as_str(), doc.get("title").unwrap_or("")),
            None => ("<missing document>", ""),
        };
        println!(
            "{:>3}. {:>7.3}  {url}  {title}",
            rank + 1,
            result.hit.score
        );
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// config
// ---------------------------------------------------------------------------

async fn cmd_config_init() -> Result<()> {
    let cwd = std::env::current_dir()
        .map_err(|e| eyre!("cannot determine working directory: {e}"))?;
    let path = init_config(&cwd)?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}
