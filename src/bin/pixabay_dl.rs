use clap::{Parser, Subcommand};
use pixabay_dl::{
    BatchStart, Config, Event, ItemId, PixabayDownloader, SearchResults, run_with_shutdown,
    wait_for_signal,
};
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "pixabay-dl")]
#[command(about = "Search Pixabay videos and download them in paced, deduplicated batches")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file
    #[arg(long, global = true, default_value = "config.json")]
    config: PathBuf,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Search the catalog and print one page of results
    Search {
        /// Search terms
        query: String,
        /// Page to show
        #[arg(long, default_value_t = 1)]
        page: u32,
    },
    /// Download every not-yet-downloaded result, page after page
    Batch {
        /// Search terms
        query: String,
        /// Page to start from
        #[arg(long, default_value_t = 1)]
        page: u32,
        /// Pause between items, in seconds (defaults to the configured value)
        #[arg(long)]
        delay: Option<u64>,
        /// Stop after the start page instead of walking further pages
        #[arg(long)]
        no_advance: bool,
    },
    /// Download a single result by id
    Download {
        /// Search terms the item appears under
        query: String,
        /// Item id
        id: String,
        /// Page the item appears on
        #[arg(long, default_value_t = 1)]
        page: u32,
        /// Output file (defaults to the download directory)
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Inspect or edit the download history
    History {
        #[command(subcommand)]
        action: HistoryAction,
    },
    /// Show or edit the configuration file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// Run the REST API until interrupted
    Serve,
}

#[derive(Subcommand)]
enum HistoryAction {
    /// Print the number of recorded ids
    Count,
    /// Write all recorded ids to a JSON file
    Export {
        /// Destination file
        path: PathBuf,
    },
    /// Merge ids from a JSON array file into the history
    Import {
        /// Source file
        path: PathBuf,
    },
    /// Forget every recorded id
    Clear,
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration with the API key masked
    Show,
    /// Store the Pixabay API key
    SetKey {
        /// API key
        key: String,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let default_filter = if cli.verbose {
        "pixabay_dl=debug"
    } else {
        "pixabay_dl=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .init();

    if let Err(e) = run(cli).await {
        error!("{}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> pixabay_dl::Result<()> {
    let config = Config::load(&cli.config);

    match cli.command {
        Commands::Config { action } => match action {
            ConfigAction::Show => {
                println!("{}", serde_json::to_string_pretty(&config.redacted())?);
            }
            ConfigAction::SetKey { key } => {
                let mut config = config;
                config.api_key = key.trim().to_string();
                config.save(&cli.config).await?;
                info!(path = %cli.config.display(), "API key saved");
            }
        },
        Commands::Search { query, page } => {
            let downloader = PixabayDownloader::new(config).await?;
            let results = downloader.search(&query, page).await?;
            print_results(&results);
        }
        Commands::Batch {
            query,
            page,
            delay,
            no_advance,
        } => {
            let mut batch = config.batch_defaults(query, page);
            if let Some(secs) = delay {
                batch.per_item_delay = Duration::from_secs(secs);
            }
            if no_advance {
                batch.auto_advance_pages = false;
            }
            let downloader = PixabayDownloader::new(config).await?;
            run_batch(&downloader, batch).await?;
        }
        Commands::Download {
            query,
            id,
            page,
            output,
        } => {
            let downloader = PixabayDownloader::new(config).await?;
            downloader.search(&query, page).await?;
            let path = downloader.download_result(&ItemId::new(id), output).await?;
            println!("{}", path.display());
        }
        Commands::History { action } => {
            let downloader = PixabayDownloader::new(config).await?;
            let history = downloader.history();
            match action {
                HistoryAction::Count => println!("{}", history.count()),
                HistoryAction::Export { path } => {
                    let count = history.export(&path).await?;
                    info!(count, path = %path.display(), "History exported");
                }
                HistoryAction::Import { path } => {
                    let added = history.import(&path).await?;
                    info!(added, total = history.count(), "History imported");
                }
                HistoryAction::Clear => {
                    history.clear().await?;
                    info!("History cleared");
                }
            }
        }
        Commands::Serve => {
            info!(address = %config.server.api.bind_address, "Serving REST API");
            let downloader = PixabayDownloader::new(config).await?;
            let _server = downloader.spawn_api_server();
            run_with_shutdown(downloader).await?;
        }
    }

    Ok(())
}

/// Drive a batch in the foreground, logging progress until it finishes
///
/// The first Ctrl+C asks the run to stop after the current item.
async fn run_batch(
    downloader: &PixabayDownloader,
    batch: pixabay_dl::BatchConfig,
) -> pixabay_dl::Result<()> {
    let mut events = downloader.subscribe();
    if downloader.start_batch(batch).await? == BatchStart::AlreadyRunning {
        warn!("A batch is already running");
        return Ok(());
    }

    let signal = wait_for_signal();
    tokio::pin!(signal);
    let mut stop_requested = false;

    loop {
        tokio::select! {
            _ = &mut signal, if !stop_requested => {
                stop_requested = true;
                info!("Stopping after the current item");
                downloader.stop_batch().await;
            }
            event = events.recv() => match event {
                Ok(Event::BatchProgress { index, total, page, item_id }) => {
                    info!(page, "[{}/{}] downloading {}", index, total, item_id);
                }
                Ok(Event::ItemDownloaded { id, path }) => {
                    info!(%id, path = %path.display(), "Downloaded");
                }
                Ok(Event::ItemFailed { id, error }) => {
                    warn!(%id, %error, "Download failed");
                }
                Ok(Event::BatchPageAdvance { next_page }) => {
                    info!(next_page, "Moving to next page");
                }
                Ok(Event::Error { message }) => warn!("{}", message),
                Ok(Event::BatchDone { reason, downloaded, failed, last_page }) => {
                    info!(downloaded, failed, last_page, "Batch finished: {}", reason);
                    return Ok(());
                }
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Event stream lagged");
                }
                Err(RecvError::Closed) => return Ok(()),
            }
        }
    }
}

fn print_results(results: &SearchResults) {
    println!("\"{}\" page {}", results.query, results.page);
    if results.items.is_empty() {
        println!("  (no results)");
    }
    for view in &results.items {
        let marker = if view.downloaded { "x" } else { " " };
        println!(
            "  [{}] {:>10}  {:>4}s  {}",
            marker, view.item.id, view.item.duration_seconds, view.item.tags
        );
    }
    let mut nav = Vec::new();
    if results.has_previous {
        nav.push(format!("--page {}", results.page - 1));
    }
    if results.has_next {
        nav.push(format!("--page {}", results.page + 1));
    }
    if !nav.is_empty() {
        println!("  more: {}", nav.join(" | "));
    }
}
