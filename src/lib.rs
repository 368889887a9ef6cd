//! # Almanac
//!
//! A scheduled bot that posts one historical "On This Day" event at a time.
//!
//! ## Architecture
//!
//! Each run is a straight pipeline:
//!
//! ```text
//! FeedClient → ContentStore → Selector → MessageFormatter → Publisher
//! ```
//!
//! - [`fetcher`]: Date-templated feed fetching with exponential backoff
//! - [`store`]: Today's batch, refreshed lazily, with random selection
//! - [`formatter`]: Fits an event into a 280-character post
//! - [`publisher`]: Posts to X, resubmitting on duplicate rejection
//!
//! ## Quick Start
//!
//! ```bash
//! # Print what would be posted
//! almanac preview
//!
//! # Post once
//! ALMANAC_BEARER_TOKEN=... almanac run
//!
//! # Post every day until interrupted
//! almanac daemon --interval 1d
//! ```

/// Application context and error handling.
///
/// The [`AppContext`](app::AppContext) struct wires together all components
/// from a [`Config`](config::Config).
pub mod app;

/// Command-line interface using clap.
///
/// - `run` - Post one message
/// - `preview` - Print the next message without posting
/// - `daemon [--interval 1d] [--no-initial-run]` - Post on a timer
pub mod cli;

/// Configuration loaded from `~/.config/almanac/config.toml`.
pub mod config;

/// Interval loop that triggers the pipeline until SIGINT/SIGTERM.
pub mod daemon;

/// Core domain models.
///
/// - [`ContentItem`](domain::ContentItem): One event with a SHA256 ID
/// - [`ContentBatch`](domain::ContentBatch): The items fetched for one day
/// - [`FormattedMessage`](domain::FormattedMessage): Post text within the length limit
/// - [`Clock`](domain::Clock): Injectable source of "today"
pub mod domain;

/// HTTP fetching with retries.
///
/// - [`Fetcher`](fetcher::Fetcher): Async trait for fetching a URL
/// - [`HttpFetcher`](fetcher::HttpFetcher): reqwest-based implementation
/// - [`FeedClient`](fetcher::FeedClient): Today's feed, with exponential backoff
pub mod fetcher;

/// Message rendering and truncation.
pub mod formatter;

/// Converts the Wikimedia "On this day" response into [`ContentItem`](domain::ContentItem)s.
pub mod normalizer;

/// One end-to-end run with an in-flight guard and a timeout.
pub mod pipeline;

/// Posting to X, with optional image attachment.
pub mod publisher;

/// In-memory content store and random selection.
pub mod store;

#[cfg(test)]
mod test_support;
