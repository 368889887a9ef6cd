use std::sync::Arc;

use chrono::{Datelike, NaiveDate};
use tracing::{debug, info, warn};
use url::Url;

use crate::app::{AlmanacError, Result};
use crate::domain::{Clock, ContentBatch};
use crate::fetcher::{Fetcher, RetryPolicy};
use crate::normalizer::{FeedSection, Normalizer};

pub const DEFAULT_FEED_URL_TEMPLATE: &str =
    "https://api.wikimedia.org/feed/v1/wikipedia/en/onthisday/{section}/{MM}/{DD}";

/// Feed URL with date placeholders.
///
/// Supported placeholders: `{month}` and `{day}` (no padding), `{MM}` and
/// `{DD}` (zero-padded), `{section}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedUrlTemplate(String);

impl FeedUrlTemplate {
    pub fn new(template: impl Into<String>) -> Result<Self> {
        let template = Self(template.into());
        // Any date will do; this only checks the result is an absolute URL.
        let probe = NaiveDate::from_ymd_opt(2000, 1, 1).unwrap_or_default();
        Url::parse(&template.render(probe, FeedSection::default()))?;
        Ok(template)
    }

    pub fn render(&self, date: NaiveDate, section: FeedSection) -> String {
        self.0
            .replace("{section}", section.as_str())
            .replace("{MM}", &format!("{:02}", date.month()))
            .replace("{DD}", &format!("{:02}", date.day()))
            .replace("{month}", &date.month().to_string())
            .replace("{day}", &date.day().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for FeedUrlTemplate {
    fn default() -> Self {
        Self(DEFAULT_FEED_URL_TEMPLATE.to_string())
    }
}

pub struct FeedClient {
    fetcher: Arc<dyn Fetcher>,
    template: FeedUrlTemplate,
    normalizer: Normalizer,
    clock: Arc<dyn Clock>,
}

impl FeedClient {
    pub fn new(
        fetcher: Arc<dyn Fetcher>,
        template: FeedUrlTemplate,
        normalizer: Normalizer,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            fetcher,
            template,
            normalizer,
            clock,
        }
    }

    /// URL for today's batch
    pub fn current_url(&self) -> String {
        self.template
            .render(self.clock.today(), self.normalizer.section())
    }

    /// Fetch today's batch, retrying with backoff.
    ///
    /// Makes at most `policy.max_retries + 1` upstream calls. A response that
    /// parses to zero valid items counts as a failed attempt.
    pub async fn fetch(&self, policy: &RetryPolicy) -> Result<ContentBatch> {
        let url = self.current_url();
        let mut attempts = 0;

        loop {
            attempts += 1;

            let error = match self.fetch_once(&url).await {
                Ok(batch) => {
                    info!("Fetched {} items from {}", batch.len(), url);
                    return Ok(batch);
                }
                Err(e) => e,
            };

            let retry = attempts - 1;
            if retry >= policy.max_retries {
                return Err(AlmanacError::FetchFailure {
                    attempts,
                    last_error: error.to_string(),
                });
            }

            let delay = policy.delay_for_retry(retry);
            warn!(
                "Feed fetch attempt {} failed: {} (retrying in {:?})",
                attempts, error, delay
            );
            tokio::time::sleep(delay).await;
        }
    }

    async fn fetch_once(&self, url: &str) -> Result<ContentBatch> {
        debug!("GET {}", url);
        let response = self.fetcher.fetch(url).await?;
        let batch = self.normalizer.normalize(&response.body)?;

        if batch.is_empty() {
            return Err(AlmanacError::FeedParse(format!(
                "no valid '{}' entries in response",
                self.normalizer.section().as_str()
            )));
        }

        Ok(batch)
    }
}
