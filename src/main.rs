//! # btc_sentiment
//!
//! Data-collection jobs for a Bitcoin news-sentiment dataset. The binary
//! scrapes Bitcoin headlines from news search pages, scores each headline
//! through a hosted sentiment-inference API, pulls the daily BTC/USD OHLCV
//! history from a market-data API, and persists everything to PostgreSQL.
//!
//! ## Jobs
//!
//! - `init-schema`: drop and recreate the two destination tables
//! - `fetch-prices`: ingest the daily price series into `bitcoin_dayly_price`
//! - `scrape-news`: collect headline/date pairs and print them as JSON
//! - `classify-sentiment`: score a scraped mapping into `sentiment_news`
//! - `run-news`: scrape and classify chained in one invocation
//!
//! ## Usage
//!
//! ```sh
//! btc_sentiment init-schema
//! btc_sentiment fetch-prices --price-api-key YOUR_KEY
//! btc_sentiment run-news --sentiment-api-key YOUR_TOKEN \
//!     --sentiment-api-url https://api-inference.example.com/models/finbert
//! ```
//!
//! ## Architecture
//!
//! Each job is a one-shot run: it opens its own database pool, does its
//! strictly sequential work, closes the pool, and exits. The classifier can
//! also be driven standalone from an event file whose `responsePayload`
//! field carries a previously scraped mapping, which is exactly the envelope
//! `run-news` builds internally when it chains the two jobs.

use std::time::Duration;

use clap::Parser;
use reqwest::Client;
use serde_json::Value;
use tracing::info;
use tracing_subscriber::{fmt as tfmt, EnvFilter};

mod cli;
mod db;
mod error;
mod models;
mod prices;
mod scrapers;
mod sentiment;

use cli::{Cli, Command};
use error::{JobError, JobResult};
use models::ClassifierEvent;
use sentiment::InferenceClient;

#[tokio::main]
async fn main() -> Result<(), JobError> {
    // Load .env if present so env-backed flags resolve before parsing.
    dotenvy::dotenv().ok();

    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        // Job payloads print to stdout; diagnostics stay on stderr.
        .with_writer(std::io::stderr)
        .init();

    let start_time = std::time::Instant::now();
    info!("btc_sentiment starting up");

    let args = Cli::parse();
    let client = http_client()?;

    match args.command {
        Command::InitSchema { database_url } => {
            let pool = db::connect(&database_url).await?;
            db::init_schema(&pool).await?;
            pool.close().await;
            info!("Schema initialized");
        }

        Command::FetchPrices {
            database_url,
            price_api_url,
            price_api_key,
        } => {
            prices::ingest_prices(&client, &price_api_url, &price_api_key, &database_url).await?;
        }

        Command::ScrapeNews {
            news_base_url,
            start_page,
        } => {
            let mapping = scrapers::ft::scrape_headlines(&client, &news_base_url, start_page).await?;
            println!("{}", serde_json::to_string(&mapping)?);
        }

        Command::ClassifySentiment {
            database_url,
            sentiment_api_url,
            sentiment_api_key,
            event,
        } => {
            let event = read_event(&event).await?;
            let inference = InferenceClient::new(client.clone(), sentiment_api_url, sentiment_api_key);
            let response = sentiment::classify_sentiment(&event, &inference, &database_url).await;
            println!("{}", serde_json::to_string(&response)?);
        }

        Command::RunNews {
            database_url,
            sentiment_api_url,
            sentiment_api_key,
            news_base_url,
            start_page,
        } => {
            let mapping = scrapers::ft::scrape_headlines(&client, &news_base_url, start_page).await?;
            let event = serde_json::to_value(ClassifierEvent::from_mapping(&mapping)?)?;
            let inference = InferenceClient::new(client.clone(), sentiment_api_url, sentiment_api_key);
            let response = sentiment::classify_sentiment(&event, &inference, &database_url).await;
            println!("{}", serde_json::to_string(&response)?);
        }
    }

    let elapsed = start_time.elapsed();
    info!(?elapsed, "Execution complete");

    Ok(())
}

/// HTTP client shared by every job: bounded timeout, crate User-Agent.
///
/// The news scraper overrides the User-Agent per request with a browser
/// string, everything else identifies itself honestly.
fn http_client() -> JobResult<Client> {
    let client = Client::builder()
        .timeout(Duration::from_secs(30))
        .user_agent(concat!("btc_sentiment/", env!("CARGO_PKG_VERSION")))
        .build()?;
    Ok(client)
}

/// Read the classifier's invocation event from a file, or stdin for `-`.
async fn read_event(path: &str) -> JobResult<Value> {
    let raw = if path == "-" {
        std::io::read_to_string(std::io::stdin())?
    } else {
        tokio::fs::read_to_string(path).await?
    };
    Ok(serde_json::from_str(&raw)?)
}
