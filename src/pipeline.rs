//! One end-to-end posting run: refresh, select, render, publish.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{error, info};

use crate::app::{AlmanacError, Result};
use crate::domain::{ContentItem, FormattedMessage};
use crate::fetcher::{FeedClient, RetryPolicy};
use crate::formatter::MessageFormatter;
use crate::publisher::{PublishResult, Publisher};
use crate::store::ContentStore;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Wall-clock cap for one run, retries included (default: 600)
    pub timeout_secs: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self { timeout_secs: 600 }
    }
}

impl PipelineConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Success,
    Failure,
}

/// What a trigger gets back from [`Pipeline::run_once`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunOutcome {
    pub status: RunStatus,
    pub detail: String,
    pub post_id: Option<String>,
}

impl RunOutcome {
    pub fn is_success(&self) -> bool {
        self.status == RunStatus::Success
    }
}

impl fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            RunStatus::Success => write!(f, "success: {}", self.detail),
            RunStatus::Failure => write!(f, "failure: {}", self.detail),
        }
    }
}

pub struct Pipeline {
    store: Arc<ContentStore>,
    feed: FeedClient,
    retry: RetryPolicy,
    formatter: MessageFormatter,
    publisher: Publisher,
    timeout: Duration,
    in_flight: Mutex<()>,
}

impl Pipeline {
    pub fn new(
        store: Arc<ContentStore>,
        feed: FeedClient,
        retry: RetryPolicy,
        formatter: MessageFormatter,
        publisher: Publisher,
        timeout: Duration,
    ) -> Self {
        Self {
            store,
            feed,
            retry,
            formatter,
            publisher,
            timeout,
            in_flight: Mutex::new(()),
        }
    }

    pub fn store(&self) -> &Arc<ContentStore> {
        &self.store
    }

    /// Run every stage once and report the result; never returns an error.
    pub async fn run_once(&self) -> RunOutcome {
        match self.execute().await {
            Ok(result) => {
                let detail = if result.media_attached {
                    format!("Posted {} with image", result.post_id)
                } else {
                    format!("Posted {}", result.post_id)
                };
                RunOutcome {
                    status: RunStatus::Success,
                    detail,
                    post_id: Some(result.post_id),
                }
            }
            Err(e) => {
                error!("Run failed: {}", e);
                RunOutcome {
                    status: RunStatus::Failure,
                    detail: e.to_string(),
                    post_id: None,
                }
            }
        }
    }

    /// Like [`run_once`](Self::run_once), with the typed error.
    ///
    /// Returns [`AlmanacError::AlreadyRunning`] immediately if another run
    /// holds the guard, and [`AlmanacError::Timeout`] once the cap expires.
    ///
    /// An item whose publish failed outright is restored to the store. Items
    /// refused as duplicates, or caught by the timeout, are not: either may
    /// already be posted.
    pub async fn execute(&self) -> Result<PublishResult> {
        let _guard = self
            .in_flight
            .try_lock()
            .map_err(|_| AlmanacError::AlreadyRunning)?;

        tokio::time::timeout(self.timeout, async {
            let (item, message) = self.prepare().await?;
            info!(
                "Publishing item {} ({} chars)",
                item.short_id(),
                message.char_count()
            );
            let result = self
                .publisher
                .publish(&message, item.media_search_term.as_deref())
                .await;

            // Nothing was posted, so the item can go out on a later run.
            if let Err(AlmanacError::PublishFailure(_)) = &result {
                self.store.restore(item).await;
            }
            result
        })
        .await
        .map_err(|_| AlmanacError::Timeout(self.timeout))?
    }

    /// Select and render the next message without posting it. The item stays
    /// in the batch.
    pub async fn preview(&self) -> Result<(ContentItem, FormattedMessage)> {
        let _guard = self
            .in_flight
            .try_lock()
            .map_err(|_| AlmanacError::AlreadyRunning)?;

        let (item, message) = tokio::time::timeout(self.timeout, self.prepare())
            .await
            .map_err(|_| AlmanacError::Timeout(self.timeout))??;

        self.store.restore(item.clone()).await;
        Ok((item, message))
    }

    async fn prepare(&self) -> Result<(ContentItem, FormattedMessage)> {
        self.store.ensure_fresh(&self.feed, &self.retry).await?;
        let item = self.store.take_next().await?;
        let message = self.formatter.render(&item);
        Ok((item, message))
    }
}
