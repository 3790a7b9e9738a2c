//! Daily Bitcoin price ingestion from the market-data API.
//!
//! The API serves the full daily OHLCV history for a digital currency as one
//! JSON document. Every numeric field arrives as a decimal string, so each
//! record is parsed individually and bad records cost only themselves. Rows
//! land in `bitcoin_dayly_price` keyed by date, with re-runs ignoring days
//! that are already present.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use reqwest::Client;
use serde::Deserialize;
use tracing::{error, info, instrument, warn};
use url::Url;

use crate::db;
use crate::error::{JobError, JobResult};
use crate::models::PricePoint;

/// The top-level market-data response. Everything except the daily series
/// (metadata, rate-limit notes) is ignored.
#[derive(Debug, Deserialize)]
struct DailySeriesResponse {
    #[serde(rename = "Time Series (Digital Currency Daily)")]
    series: BTreeMap<String, DailyBar>,
}

/// One raw daily bar exactly as served, numeric fields still strings.
#[derive(Debug, Deserialize)]
struct DailyBar {
    #[serde(rename = "1. open")]
    open: String,
    #[serde(rename = "2. high")]
    high: String,
    #[serde(rename = "3. low")]
    low: String,
    #[serde(rename = "4. close")]
    close: String,
    #[serde(rename = "5. volume")]
    volume: String,
}

impl DailyBar {
    /// Parse the bar's string fields into a [`PricePoint`] for `date`.
    fn into_price_point(self, date: &str) -> JobResult<PricePoint> {
        let date = NaiveDate::parse_from_str(date, "%Y-%m-%d")
            .map_err(|e| JobError::Parse(format!("bad series date {date:?}: {e}")))?;

        Ok(PricePoint {
            date,
            open: parse_price_field("open", &self.open)?,
            low: parse_price_field("low", &self.low)?,
            high: parse_price_field("high", &self.high)?,
            close: parse_price_field("close", &self.close)?,
            volume: parse_price_field("volume", &self.volume)?,
        })
    }
}

fn parse_price_field(name: &str, raw: &str) -> JobResult<f64> {
    raw.trim()
        .parse()
        .map_err(|_| JobError::Parse(format!("{name} is not a number: {raw:?}")))
}

/// Fetch the complete daily series from the market-data API.
///
/// The API key is appended as the `apikey` query parameter on the request
/// only; error values report the endpoint without it.
///
/// # Returns
///
/// The date-keyed series of raw bars, or the fetch/decode failure.
async fn fetch_daily_series(
    client: &Client,
    api_url: &Url,
    api_key: &str,
) -> JobResult<BTreeMap<String, DailyBar>> {
    let mut url = api_url.clone();
    url.query_pairs_mut().append_pair("apikey", api_key);

    let response = client.get(url).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(JobError::Status {
            status: status.as_u16(),
            url: api_url.to_string(),
        });
    }

    let decoded: DailySeriesResponse = response.json().await?;
    Ok(decoded.series)
}

/// Run the price-ingestion job end to end.
///
/// A database connection failure is fatal and propagates. A failed API fetch
/// is logged and the job returns without writing anything. Within the series,
/// malformed records and failed inserts are logged and skipped so one bad day
/// never blocks the rest of the history.
#[instrument(level = "info", skip_all)]
pub async fn ingest_prices(
    client: &Client,
    api_url: &Url,
    api_key: &str,
    database_url: &str,
) -> JobResult<()> {
    let pool = db::connect(database_url).await?;

    let series = match fetch_daily_series(client, api_url, api_key).await {
        Ok(series) => series,
        Err(e) => {
            error!(error = %e, "Price API fetch failed; nothing written");
            pool.close().await;
            return Ok(());
        }
    };
    info!(days = series.len(), "Fetched daily price series");

    let mut inserted = 0usize;
    let mut duplicates = 0usize;
    let mut skipped = 0usize;

    for (date, bar) in series {
        let point = match bar.into_price_point(&date) {
            Ok(point) => point,
            Err(e) => {
                warn!(%date, error = %e, "Skipping malformed price record");
                skipped += 1;
                continue;
            }
        };

        match db::insert_price(&pool, &point).await {
            Ok(true) => inserted += 1,
            Ok(false) => duplicates += 1,
            Err(e) => {
                warn!(%date, error = %e, "Price insert failed; continuing");
                skipped += 1;
            }
        }
    }

    info!(inserted, duplicates, skipped, "Price ingestion complete");
    pool.close().await;

    Ok(())
}
