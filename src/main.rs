use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use ratescraper::{
    fetch, pass, schedule,
    store::RateStore,
    ScraperConfig,
};
use std::{fs, path::PathBuf};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};
use url::Url;

#[derive(Parser)]
#[command(name = "ratescraper")]
#[command(about = "NBS exchange-rate list scraper", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level used when RUST_LOG is unset (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Override RATES_PAGE_URL
    #[arg(long)]
    url: Option<Url>,

    /// Override RATES_OUTPUT_DIR
    #[arg(long)]
    output_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a single pass and store it
    Once,
    /// Run a pass now and then every RATES_INTERVAL_HOURS until Ctrl-C / SIGTERM
    Daemon,
    /// Parse a saved HTML page and print the records as JSON
    ParseFile {
        /// Path to the saved page
        path: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ─── 1) init logging ─────────────────────────────────────────────
    let env = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("info,ratescraper={}", cli.log_level)));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_span_events(fmt::format::FmtSpan::CLOSE)
        .init();

    // ─── 2) configuration ────────────────────────────────────────────
    let mut config = ScraperConfig::from_env()?;
    if let Some(url) = cli.url {
        config.page_url = url;
    }
    if let Some(dir) = cli.output_dir {
        config.output_dir = dir;
    }
    info!(
        url = %config.page_url,
        codes = config.tracked_codes.len(),
        output = %config.output_dir.display(),
        "startup"
    );

    // ─── 3) run ──────────────────────────────────────────────────────
    match cli.command {
        Commands::Once => {
            let client = fetch::build_client(config.request_timeout())?;
            let store = RateStore::new(&config.output_dir)?;
            let stats = pass::run_pass(&client, &config, &store).await?;
            stats.log_summary("rate pass");
        }
        Commands::Daemon => {
            let client = fetch::build_client(config.request_timeout())?;
            let store = RateStore::new(&config.output_dir)?;
            let passes =
                schedule::run_daemon(&client, &config, &store, schedule::shutdown_signal())
                    .await?;
            info!(passes, "daemon stopped");
        }
        Commands::ParseFile { path } => {
            let html = fs::read_to_string(&path)
                .with_context(|| format!("reading {}", path.display()))?;
            let (registry, tally) =
                pass::extract_registry(&html, &config.tracked_codes, Utc::now())?;
            info!(
                cells = tally.cells,
                anchors = tally.anchors,
                parse_failures = tally.parse_failures,
                "parsed {}",
                path.display()
            );
            println!("{}", serde_json::to_string_pretty(&registry)?);
        }
    }

    info!("all done");
    Ok(())
}
