//! Financial Times search-results scraper.
//!
//! This module walks the FT search endpoint for Bitcoin coverage and extracts
//! headline/date pairs from the teaser markup. Search results are paginated
//! and served newest-first, so the walk starts at the highest configured page
//! number and works down to page 1, letting later (newer) pages overwrite
//! duplicate titles collected from earlier ones.
//!
//! # Page Structure
//!
//! Every result teaser renders a `div.o-teaser__heading` holding the headline
//! link, followed by a sibling `div.o-teaser__timestamp` whose `<time>`
//! element carries the publication instant in its `datetime` attribute.

use chrono::{DateTime, NaiveDate};
use once_cell::sync::Lazy;
use reqwest::header::USER_AGENT;
use reqwest::{Client, StatusCode};
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::error::JobResult;
use crate::models::{Headline, NewsMapping};

/// Browser User-Agent sent with every search request. The search endpoint
/// serves a stripped-down page to clients it does not recognize.
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// Highest search-results page; the walk runs from here down to page 1.
pub const START_PAGE: u32 = 20;

/// The search term the walk queries for.
const SEARCH_QUERY: &str = "bitcoin";

/// Format of the `<time datetime="…">` attribute on result teasers.
const TEASER_DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%z";

static HEADING_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("div.o-teaser__heading").unwrap());
static LINK_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("a").unwrap());
static TIME_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("time").unwrap());

/// Walk the search pages from `start_page` down to 1 and collect headlines.
///
/// The walk ends early at the first page that fails to fetch, answers with a
/// non-200 status, or renders no article teasers at all. Whatever was
/// accumulated before that point is still returned, so a flaky deep page
/// costs only the older results, never the newer ones. A page whose teasers
/// are all unusable (no link, no parsable date) contributes nothing but does
/// not end the walk.
///
/// # Arguments
///
/// * `client` - Shared HTTP client
/// * `base_url` - Origin of the search endpoint, e.g. `https://www.ft.com`
/// * `start_page` - Highest page number to request
///
/// # Returns
///
/// A [`NewsMapping`] of headline titles to `YYYY-MM-DD` dates. Titles seen on
/// several pages keep the date from the page processed last.
#[instrument(level = "info", skip(client, base_url))]
pub async fn scrape_headlines(
    client: &Client,
    base_url: &Url,
    start_page: u32,
) -> JobResult<NewsMapping> {
    let mut news_data = NewsMapping::new();

    for page in (1..=start_page).rev() {
        let url = search_url(base_url, page)?;

        let response = match client
            .get(url.clone())
            .header(USER_AGENT, BROWSER_USER_AGENT)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                warn!(page, error = %e, "Search page fetch failed; stopping");
                break;
            }
        };

        let status = response.status();
        if status != StatusCode::OK {
            warn!(page, status = status.as_u16(), "Failed to retrieve search page; stopping");
            break;
        }

        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                warn!(page, error = %e, "Search page body unreadable; stopping");
                break;
            }
        };

        let parsed = parse_search_page(&body);
        if parsed.article_count == 0 {
            info!(page, "No more articles found; stopping");
            break;
        }

        debug!(
            page,
            articles = parsed.article_count,
            usable = parsed.headlines.len(),
            "Parsed search page"
        );
        for headline in parsed.headlines {
            news_data.insert(headline.title, headline.date.to_string());
        }
    }

    info!(count = news_data.len(), "Scraped headlines");
    debug!(mapping = ?news_data, "Scraped news data");

    Ok(news_data)
}

/// Build the search URL for one result page.
fn search_url(base_url: &Url, page: u32) -> Result<Url, url::ParseError> {
    let mut url = base_url.join("/search")?;
    url.query_pairs_mut()
        .append_pair("q", SEARCH_QUERY)
        .append_pair("page", &page.to_string())
        .append_pair("sort", "date")
        .append_pair("isFirstView", "true");
    Ok(url)
}

/// What one search-results page yielded.
#[derive(Debug)]
pub struct ParsedPage {
    /// How many article teaser headings the page rendered, usable or not.
    /// Pagination stops only when this reaches zero.
    pub article_count: usize,
    /// The headlines that carried both a link and a parsable date.
    pub headlines: Vec<Headline>,
}

/// Extract headline/date pairs from one search-results page.
///
/// Headings without a link element are skipped outright. Headings whose
/// sibling timestamp is missing, lacks a `<time datetime>` attribute, or
/// carries an unparsable value are skipped with a logged warning, so every
/// returned [`Headline`] has a valid date. The raw heading count is reported
/// alongside so the caller can tell an empty page from a page that merely
/// produced no usable headlines.
pub fn parse_search_page(html: &str) -> ParsedPage {
    let document = Html::parse_document(html);
    let mut article_count = 0usize;
    let mut headlines = Vec::new();

    for heading in document.select(&HEADING_SELECTOR) {
        article_count += 1;

        let Some(link) = heading.select(&LINK_SELECTOR).next() else {
            continue;
        };
        let title = link.text().collect::<String>().trim().to_string();

        match sibling_timestamp_date(heading) {
            Some(date) => headlines.push(Headline { title, date }),
            None => warn!(%title, "Skipping article due to missing or invalid date"),
        }
    }

    ParsedPage {
        article_count,
        headlines,
    }
}

/// Resolve a heading's publication date from the `<time datetime="…">` inside
/// its following `div.o-teaser__timestamp` sibling.
fn sibling_timestamp_date(heading: ElementRef<'_>) -> Option<NaiveDate> {
    let timestamp = heading
        .next_siblings()
        .filter_map(ElementRef::wrap)
        .find(|el| {
            el.value().name() == "div"
                && el.value().classes().any(|class| class == "o-teaser__timestamp")
        })?;

    let time = timestamp.select(&TIME_SELECTOR).next()?;
    let datetime = time.value().attr("datetime")?;

    DateTime::parse_from_str(datetime, TEASER_DATETIME_FORMAT)
        .ok()
        .map(|parsed| parsed.date_naive())
}
