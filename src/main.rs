mod db;
mod error;
mod export;
mod fetch;
mod html;
mod model;
mod parser;
mod pipeline;
mod settings;

use std::time::{Duration, Instant};

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;

use crate::db::Store;
use crate::fetch::HttpFetcher;
use crate::pipeline::{ListingStatus, Pipeline};
use crate::settings::Settings;

#[derive(Parser)]
#[command(name = "arxiv_scraper", about = "arXiv listing scraper (SQLite + CSV)")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Scrape the listing, enrich each entry, store and export (default)
    Run,
    /// Show what is in the store
    Stats,
    /// Rewrite the CSV export from everything in the store
    Export,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();
    let settings = Settings::load().context("Invalid configuration")?;
    info!(settings = ?settings, "Configuration loaded");

    let result = match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run(&settings).await,
        Commands::Stats => {
            let store = open_store(&settings)?;
            let total = store.count()?;
            let latest = store.latest_submission()?;
            println!("Table:     {}", settings.table_name);
            println!("Articles:  {}", total);
            println!("Latest:    {}", latest.as_deref().unwrap_or("-"));
            Ok(())
        }
        Commands::Export => {
            let records = open_store(&settings)?.all()?;
            let n = export::write_csv(&records, &settings.csv_path)
                .with_context(|| format!("Failed to write {:?}", settings.csv_path))?;
            println!("Exported {} articles to {:?}", n, settings.csv_path);
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_elapsed(elapsed));
    }

    result
}

async fn run(settings: &Settings) -> anyhow::Result<()> {
    let pipeline = Pipeline::new(settings, HttpFetcher::new()?)?;
    let extraction = pipeline.extract(&settings.scrape_url).await;

    match &extraction.status {
        ListingStatus::Unreachable(e) => println!("Could not reach {}: {}", settings.scrape_url, e),
        ListingStatus::NotFound => println!("No article list found at {}", settings.scrape_url),
        ListingStatus::Parsed { entries, unpaired } => println!(
            "Listing: {} entries ({} unpaired dropped), {} extracted, {} skipped",
            entries,
            unpaired,
            extraction.records.len(),
            extraction.skipped.len()
        ),
    }
    for s in &extraction.skipped {
        println!("  skipped {}: {}", s.subject, s.error);
    }

    if extraction.records.is_empty() {
        println!("No articles extracted. Nothing to store.");
        return Ok(());
    }

    let inserted = {
        let store = open_store(settings)?;
        store
            .upsert(&extraction.records)
            .context("Batch insert failed; nothing was written")?
    };
    println!(
        "Inserted {} new articles ({} already stored)",
        inserted,
        extraction.records.len() - inserted
    );

    let n = export::write_csv(&extraction.records, &settings.csv_path)
        .with_context(|| format!("Failed to write {:?}", settings.csv_path))?;
    println!("Exported {} articles to {:?}", n, settings.csv_path);
    Ok(())
}

fn open_store(settings: &Settings) -> anyhow::Result<Store> {
    Store::open(&settings.database_path, &settings.table_name)
        .with_context(|| format!("Failed to open {:?}", settings.database_path))
}

/// Wall-clock summary for the closing status line, e.g. `4.2s`, `3m07s`, `1h02m05s`.
fn format_elapsed(elapsed: Duration) -> String {
    let total = elapsed.as_secs();
    match (total / 3600, total / 60 % 60, total % 60) {
        (0, 0, _) => format!("{:.1}s", elapsed.as_secs_f64()),
        (0, m, s) => format!("{m}m{s:02}s"),
        (h, m, s) => format!("{h}h{m:02}m{s:02}s"),
    }
}
