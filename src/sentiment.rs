//! Headline sentiment classification through the hosted inference API.
//!
//! The classifier consumes the scraper's title/date mapping out of an event
//! envelope, asks the inference endpoint for a sentiment label per headline,
//! and upserts `(date, title, sentiment)` rows into `sentiment_news`. The
//! whole job answers with a [`JobResponse`] instead of an error: client
//! mistakes come back as 400, connection trouble as 500, everything else
//! completes as 200 with per-headline problems downgraded to the `"Unknown"`
//! label or a skipped row.

use reqwest::{Client, StatusCode};
use serde_json::Value;
use sqlx::PgPool;
use tracing::{debug, error, info, instrument, warn};
use url::Url;

use crate::db;
use crate::error::{JobError, JobResult};
use crate::models::{JobResponse, NewsMapping};

/// Label recorded when the inference endpoint fails or answers nonsense.
const UNKNOWN_SENTIMENT: &str = "Unknown";

/// Client for the hosted sentiment-inference endpoint.
///
/// Wraps the HTTP client together with the endpoint and its bearer token so
/// call sites only ever hand over a headline.
pub struct InferenceClient {
    client: Client,
    api_url: Url,
    api_key: String,
}

impl InferenceClient {
    /// Bundle an HTTP client with the inference endpoint and token.
    pub fn new(client: Client, api_url: Url, api_key: impl Into<String>) -> Self {
        Self {
            client,
            api_url,
            api_key: api_key.into(),
        }
    }

    /// POST one headline to the inference endpoint and return the raw JSON.
    async fn query(&self, title: &str) -> JobResult<Value> {
        let response = self
            .client
            .post(self.api_url.clone())
            .bearer_auth(&self.api_key)
            .json(&serde_json::json!({ "inputs": title }))
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(JobError::Status {
                status: status.as_u16(),
                url: self.api_url.to_string(),
            });
        }

        Ok(response.json().await?)
    }

    /// Classify one headline, mapping every failure to `"Unknown"`.
    ///
    /// A request error, a non-200 answer, or a response that is not the
    /// expected nested list all degrade to the fallback label so the row
    /// still gets stored.
    pub async fn classify(&self, title: &str) -> String {
        match self.query(title).await {
            Ok(response) => match label_from_response(&response) {
                Some(label) => label,
                None => {
                    warn!(%title, "Unexpected inference response shape; using Unknown");
                    UNKNOWN_SENTIMENT.to_string()
                }
            },
            Err(e) => {
                warn!(%title, error = %e, "Inference request failed; using Unknown");
                UNKNOWN_SENTIMENT.to_string()
            }
        }
    }
}

/// Pull the top label out of an inference response.
///
/// The endpoint answers `[[{"label": …, "score": …}, …]]` with candidates
/// ordered best-first. Any deviation from that shape yields `None`.
fn label_from_response(response: &Value) -> Option<String> {
    response
        .get(0)?
        .get(0)?
        .get("label")?
        .as_str()
        .map(str::to_string)
}

/// Destination for classified rows.
///
/// The production implementation is [`PgPool`] writing to `sentiment_news`;
/// tests substitute an in-memory recorder to observe the insert loop.
trait SentimentStore {
    /// Persist one classified headline.
    ///
    /// Returns `true` if a row was written, `false` on a title already present.
    async fn store(&self, date: &str, title: &str, sentiment: &str) -> JobResult<bool>;
}

impl SentimentStore for PgPool {
    async fn store(&self, date: &str, title: &str, sentiment: &str) -> JobResult<bool> {
        db::insert_sentiment(self, date, title, sentiment).await
    }
}

/// Classify every headline in the mapping and hand each row to the store.
///
/// Every entry gets exactly one store attempt; a failed insert is logged and
/// counted without stopping the batch.
///
/// # Returns
///
/// `(stored, duplicates, failed)` counts over the whole mapping.
async fn classify_and_store<S: SentimentStore>(
    news_data: &NewsMapping,
    inference: &InferenceClient,
    store: &S,
) -> (usize, usize, usize) {
    let mut stored = 0usize;
    let mut duplicates = 0usize;
    let mut failed = 0usize;

    for (title, date) in news_data {
        let sentiment = inference.classify(title).await;

        match store.store(date, title, &sentiment).await {
            Ok(true) => {
                info!(%title, %sentiment, "Stored sentiment row");
                stored += 1;
            }
            Ok(false) => {
                debug!(%title, "Title already classified; skipped");
                duplicates += 1;
            }
            Err(e) => {
                warn!(%title, error = %e, "Sentiment insert failed; continuing");
                failed += 1;
            }
        }
    }

    (stored, duplicates, failed)
}

/// Extract the scraped mapping from the triggering event.
///
/// The event must be a JSON object whose `responsePayload` field holds an
/// object of string values. Anything else means the caller handed over
/// something that never came from the scraper.
fn extract_mapping(event: &Value) -> Option<NewsMapping> {
    let payload = event.as_object()?.get("responsePayload")?;
    serde_json::from_value(payload.clone()).ok()
}

/// Run the classification job for one event.
///
/// Returns 400 before touching the database when the event payload is not a
/// title/date mapping, 500 when the database cannot be reached, and 200 once
/// every headline has been processed. Individual insert failures are logged
/// and skipped rather than failing the run.
#[instrument(level = "info", skip_all)]
pub async fn classify_sentiment(
    event: &Value,
    inference: &InferenceClient,
    database_url: &str,
) -> JobResponse {
    debug!(%event, "Classifier event received");

    let Some(news_data) = extract_mapping(event) else {
        warn!("Event payload is not a title/date mapping");
        return JobResponse::new(400, "Invalid news_data format");
    };
    info!(count = news_data.len(), "Classifying scraped headlines");

    let pool = match db::connect(database_url).await {
        Ok(pool) => pool,
        Err(e) => {
            error!(error = %e, "Database connection failed");
            return JobResponse::new(500, format!("Error connecting to database: {e}"));
        }
    };

    let (stored, duplicates, failed) = classify_and_store(&news_data, inference, &pool).await;

    info!(stored, duplicates, failed, "Sentiment analysis complete");
    pool.close().await;

    JobResponse::new(200, "Sentiment analysis completed successfully")
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use httpmock::{Method::POST, MockServer};
    use serde_json::json;

    use super::*;
    use crate::models::ClassifierEvent;

    /// Records every row handed to it, deduplicating on title like the table's
    /// primary key does.
    #[derive(Default)]
    struct RecordingStore {
        rows: Mutex<Vec<(String, String, String)>>,
    }

    impl SentimentStore for RecordingStore {
        async fn store(&self, date: &str, title: &str, sentiment: &str) -> JobResult<bool> {
            let mut rows = self.rows.lock().unwrap();
            if rows.iter().any(|(_, existing, _)| existing == title) {
                return Ok(false);
            }
            rows.push((date.to_string(), title.to_string(), sentiment.to_string()));
            Ok(true)
        }
    }

    /// Refuses every insert while counting the attempts it received.
    #[derive(Default)]
    struct FailingStore {
        attempts: Mutex<usize>,
    }

    impl SentimentStore for FailingStore {
        async fn store(&self, _date: &str, _title: &str, _sentiment: &str) -> JobResult<bool> {
            *self.attempts.lock().unwrap() += 1;
            Err(JobError::Database(sqlx::Error::PoolClosed))
        }
    }

    fn inference_for(server: &MockServer) -> InferenceClient {
        InferenceClient::new(
            Client::new(),
            Url::parse(&format!("{}/models/sentiment", server.base_url())).unwrap(),
            "test-token",
        )
    }

    #[test]
    fn test_label_from_top_entry() {
        let response = json!([[
            { "label": "positive", "score": 0.98 },
            { "label": "negative", "score": 0.02 }
        ]]);

        assert_eq!(label_from_response(&response), Some("positive".to_string()));
    }

    #[test]
    fn test_label_missing_on_error_object() {
        let response = json!({ "error": "Model is currently loading" });
        assert_eq!(label_from_response(&response), None);
    }

    #[test]
    fn test_label_missing_on_empty_list() {
        assert_eq!(label_from_response(&json!([])), None);
    }

    #[test]
    fn test_label_missing_when_entry_is_not_an_object() {
        assert_eq!(label_from_response(&json!([["positive"]])), None);
    }

    #[test]
    fn test_label_missing_without_label_field() {
        assert_eq!(label_from_response(&json!([[{ "score": 0.98 }]])), None);
    }

    #[test]
    fn test_extract_mapping_accepts_payload() {
        let event = json!({
            "responsePayload": {
                "Bitcoin hits new high": "2024-05-01",
                "ETF inflows slow": "2024-05-02"
            }
        });

        let mapping = extract_mapping(&event).unwrap();
        assert_eq!(mapping.len(), 2);
        assert_eq!(mapping["Bitcoin hits new high"], "2024-05-01");
    }

    #[test]
    fn test_extract_mapping_accepts_empty_payload() {
        let event = json!({ "responsePayload": {} });
        assert_eq!(extract_mapping(&event), Some(NewsMapping::new()));
    }

    #[test]
    fn test_extract_mapping_rejects_missing_payload() {
        assert_eq!(extract_mapping(&json!({ "detail": "oops" })), None);
    }

    #[test]
    fn test_extract_mapping_rejects_non_object_event() {
        assert_eq!(extract_mapping(&json!([1, 2, 3])), None);
        assert_eq!(extract_mapping(&json!("responsePayload")), None);
    }

    #[test]
    fn test_extract_mapping_rejects_non_string_values() {
        let event = json!({ "responsePayload": { "Bitcoin hits new high": 20240501 } });
        assert_eq!(extract_mapping(&event), None);
    }

    #[tokio::test]
    async fn test_classify_returns_top_label() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/models/sentiment")
                .header("authorization", "Bearer test-token")
                .json_body(json!({ "inputs": "BTC hits new high" }));
            then.status(200)
                .header("content-type", "application/json")
                .body(r#"[[{"label": "positive", "score": 0.98}, {"label": "negative", "score": 0.02}]]"#);
        });

        let sentiment = inference_for(&server).classify("BTC hits new high").await;

        mock.assert();
        assert_eq!(sentiment, "positive");
    }

    #[tokio::test]
    async fn test_classify_unknown_on_server_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/models/sentiment");
            then.status(503).body("model overloaded");
        });

        let sentiment = inference_for(&server).classify("BTC slides").await;
        assert_eq!(sentiment, "Unknown");
    }

    #[tokio::test]
    async fn test_classify_unknown_on_malformed_body() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/models/sentiment");
            then.status(200)
                .header("content-type", "application/json")
                .body(r#"{"error": "Model is currently loading"}"#);
        });

        let sentiment = inference_for(&server).classify("BTC slides").await;
        assert_eq!(sentiment, "Unknown");
    }

    #[tokio::test]
    async fn test_unknown_sentiment_row_is_still_stored() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/models/sentiment");
            then.status(200)
                .header("content-type", "application/json")
                .body(r#"{"error": "Model is currently loading"}"#);
        });

        let mut news_data = NewsMapping::new();
        news_data.insert("BTC slides".to_string(), "2024-05-01".to_string());

        let store = RecordingStore::default();
        let counts = classify_and_store(&news_data, &inference_for(&server), &store).await;

        assert_eq!(counts, (1, 0, 0));
        assert_eq!(
            *store.rows.lock().unwrap(),
            vec![(
                "2024-05-01".to_string(),
                "BTC slides".to_string(),
                "Unknown".to_string()
            )]
        );
    }

    #[tokio::test]
    async fn test_insert_failure_does_not_abort_the_batch() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/models/sentiment");
            then.status(200)
                .header("content-type", "application/json")
                .body(r#"[[{"label": "negative", "score": 0.91}]]"#);
        });

        let mut news_data = NewsMapping::new();
        news_data.insert("BTC slides".to_string(), "2024-05-01".to_string());
        news_data.insert("ETF inflows slow".to_string(), "2024-05-02".to_string());

        let store = FailingStore::default();
        let counts = classify_and_store(&news_data, &inference_for(&server), &store).await;

        assert_eq!(counts, (0, 0, 2));
        assert_eq!(*store.attempts.lock().unwrap(), 2);
    }

    #[tokio::test]
    async fn test_classifier_rejects_invalid_event_before_any_work() {
        let inference = InferenceClient::new(
            Client::new(),
            Url::parse("http://127.0.0.1:1/models/sentiment").unwrap(),
            "unused",
        );

        let response = classify_sentiment(
            &json!({ "detail": "not a scraper result" }),
            &inference,
            "postgres://unused@127.0.0.1:1/never_reached",
        )
        .await;

        assert_eq!(response, JobResponse::new(400, "Invalid news_data format"));
    }

    #[tokio::test]
    async fn test_event_chain_preserves_titles_and_dates() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/models/sentiment");
            then.status(200)
                .header("content-type", "application/json")
                .body(r#"[[{"label": "positive", "score": 0.99}]]"#);
        });

        let mut scraped = NewsMapping::new();
        scraped.insert("BTC hits new high".to_string(), "2024-05-01".to_string());

        let event = ClassifierEvent::from_mapping(&scraped).unwrap();
        let event = serde_json::to_value(&event).unwrap();
        let mapping = extract_mapping(&event).unwrap();
        assert_eq!(mapping, scraped);

        let inference = inference_for(&server);
        let (title, date) = mapping.iter().next().unwrap();
        let sentiment = inference.classify(title).await;

        assert_eq!(
            (date.as_str(), title.as_str(), sentiment.as_str()),
            ("2024-05-01", "BTC hits new high", "positive")
        );
    }
}
