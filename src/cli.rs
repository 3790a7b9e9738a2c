//! Command-line interface definitions for the collection jobs.
//!
//! This module defines the CLI arguments and options using the `clap` crate.
//! One binary hosts every job as a subcommand, and all connection-ish options
//! can be provided via command-line flags or environment variables.

use clap::{Parser, Subcommand};
use url::Url;

use crate::scrapers::ft;

/// Default market-data endpoint serving the daily BTC/USD series.
const DEFAULT_PRICE_API_URL: &str =
    "https://www.alphavantage.co/query?function=DIGITAL_CURRENCY_DAILY&symbol=BTC&market=USD";

/// Default origin of the news search endpoint.
const DEFAULT_NEWS_BASE_URL: &str = "https://www.ft.com";

/// Command-line arguments for the collection jobs.
///
/// # Examples
///
/// ```sh
/// # Recreate both tables, connection string from the environment
/// btc_sentiment init-schema
///
/// # Pull the daily price history
/// btc_sentiment fetch-prices --price-api-key YOUR_KEY
///
/// # Scrape headlines, then classify them in one run
/// btc_sentiment run-news --sentiment-api-url https://api-inference.example.com/models/finbert \
///     --sentiment-api-key YOUR_TOKEN
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// One subcommand per collection job.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Drop and recreate both destination tables
    InitSchema {
        /// PostgreSQL connection string
        #[arg(long, env = "DATABASE_URL")]
        database_url: String,
    },

    /// Fetch the daily Bitcoin price series and store it
    FetchPrices {
        /// PostgreSQL connection string
        #[arg(long, env = "DATABASE_URL")]
        database_url: String,

        /// Market-data endpoint serving the daily series
        #[arg(long, env = "PRICE_API_URL", default_value = DEFAULT_PRICE_API_URL)]
        price_api_url: Url,

        /// Market-data API key, appended to the request as `apikey`
        #[arg(long, env = "PRICE_API_KEY")]
        price_api_key: String,
    },

    /// Scrape headline/date pairs from the news search pages
    ScrapeNews {
        /// Origin of the news search endpoint
        #[arg(long, env = "NEWS_BASE_URL", default_value = DEFAULT_NEWS_BASE_URL)]
        news_base_url: Url,

        /// Highest search-results page to request; the walk runs down to page 1
        #[arg(long, default_value_t = ft::START_PAGE)]
        start_page: u32,
    },

    /// Classify a scraped mapping and store sentiment rows
    ClassifySentiment {
        /// PostgreSQL connection string
        #[arg(long, env = "DATABASE_URL")]
        database_url: String,

        /// Sentiment-inference endpoint
        #[arg(long, env = "SENTIMENT_API_URL")]
        sentiment_api_url: Url,

        /// Bearer token for the inference endpoint
        #[arg(long, env = "SENTIMENT_API_KEY")]
        sentiment_api_key: String,

        /// Path of the event JSON file, or `-` to read it from stdin
        #[arg(long, default_value = "-")]
        event: String,
    },

    /// Scrape and classify in one run, feeding the scraper's output straight into the classifier
    RunNews {
        /// PostgreSQL connection string
        #[arg(long, env = "DATABASE_URL")]
        database_url: String,

        /// Sentiment-inference endpoint
        #[arg(long, env = "SENTIMENT_API_URL")]
        sentiment_api_url: Url,

        /// Bearer token for the inference endpoint
        #[arg(long, env = "SENTIMENT_API_KEY")]
        sentiment_api_key: String,

        /// Origin of the news search endpoint
        #[arg(long, env = "NEWS_BASE_URL", default_value = DEFAULT_NEWS_BASE_URL)]
        news_base_url: Url,

        /// Highest search-results page to request; the walk runs down to page 1
        #[arg(long, default_value_t = ft::START_PAGE)]
        start_page: u32,
    },
}
