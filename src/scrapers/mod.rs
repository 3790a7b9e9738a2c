//! News source scrapers for collecting Bitcoin headlines.
//!
//! Each scraper walks a source's search or listing pages and produces a
//! [`crate::models::NewsMapping`] of headline titles to publication dates.
//! Scrapers follow a consistent pattern:
//!
//! 1. **Paging**: Walk a bounded range of result pages, newest page number
//!    first, stopping at the first failed or empty page
//! 2. **Extraction**: Pull (title, date) pairs out of each page's teaser
//!    markup, skipping articles that lack a usable date
//!
//! # Supported Sources
//!
//! | Source | Module | Method | Notes |
//! |--------|--------|--------|-------|
//! | Financial Times | [`ft`] | HTML scraping | Search results for the "bitcoin" query |
//!
//! Failed or empty pages end the walk without discarding what earlier pages
//! already produced.

pub mod ft;
