//! Data models shared by the collection jobs.
//!
//! This module defines the core data structures used throughout the application:
//! - [`Headline`]: One scraped article headline with its publication date
//! - [`NewsMapping`]: The scraper's output, headline title keyed to date
//! - [`PricePoint`]: One parsed daily OHLCV bar ready for persistence
//! - [`ClassifierEvent`]: The invocation payload handed from the scraper to
//!   the classifier
//! - [`JobResponse`]: The classifier's status/body result object
//!
//! The wire-facing structs use camelCase field names to match the JSON the
//! jobs exchange, hence the `#[serde(rename = …)]` attributes.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Headline titles mapped to publication dates in `YYYY-MM-DD` form.
///
/// Titles are the keys, so a headline that appears on several result pages
/// collapses to a single entry holding the date seen last. Ordered so that
/// serialized payloads and logs come out deterministic.
pub type NewsMapping = BTreeMap<String, String>;

/// A single article headline scraped from a search-results page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Headline {
    /// The headline text exactly as rendered in the teaser link.
    pub title: String,
    /// The publication date taken from the teaser timestamp.
    pub date: NaiveDate,
}

/// One day of Bitcoin OHLCV data, parsed out of the market-data API response.
///
/// Field order follows the destination table's column order.
#[derive(Debug, Clone, PartialEq)]
pub struct PricePoint {
    /// Trading day the bar covers.
    pub date: NaiveDate,
    /// Opening price in the quote currency.
    pub open: f64,
    /// Daily low.
    pub low: f64,
    /// Daily high.
    pub high: f64,
    /// Closing price.
    pub close: f64,
    /// Traded volume.
    pub volume: f64,
}

/// The event object that triggers sentiment classification.
///
/// When the scraper and classifier run chained, the scraper's result mapping
/// travels inside the `responsePayload` field, mirroring how one function's
/// response is forwarded as the next function's event.
#[derive(Debug, Deserialize, Serialize)]
pub struct ClassifierEvent {
    /// The upstream job's result, expected to be a [`NewsMapping`].
    #[serde(rename = "responsePayload")]
    pub response_payload: serde_json::Value,
}

impl ClassifierEvent {
    /// Wrap a scraped mapping in the event envelope the classifier expects.
    pub fn from_mapping(mapping: &NewsMapping) -> serde_json::Result<Self> {
        Ok(Self {
            response_payload: serde_json::to_value(mapping)?,
        })
    }
}

/// Status/body result object returned by the classifier job.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct JobResponse {
    /// HTTP-style status code: 200, 400, or 500.
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    /// Human-readable outcome message.
    pub body: String,
}

impl JobResponse {
    /// Build a response from a status code and message.
    pub fn new(status_code: u16, body: impl Into<String>) -> Self {
        Self {
            status_code,
            body: body.into(),
        }
    }
}
