//! Delivery of a rendered message to the posting API.

pub mod media;
pub mod x_api;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::app::{AlmanacError, Result};
use crate::domain::FormattedMessage;
use crate::fetcher::RetryPolicy;

pub use media::{ImageLookup, MediaAttacher, MediaConfig, MediaError, WikipediaImageLookup};
pub use x_api::XApiClient;

/// Opaque id returned by a media upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaHandle(pub String);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostDraft {
    pub text: String,
    pub media: Vec<MediaHandle>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostedStatus {
    pub id: String,
}

#[derive(Debug, Error)]
pub enum PostError {
    /// The API refused the post because identical content was already posted.
    #[error("Duplicate content rejected by the posting API")]
    Duplicate,

    #[error("Posting API rejected the request with status {status}: {message}")]
    Rejected { status: u16, message: String },

    #[error("No credentials configured for the posting API")]
    MissingCredentials,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unexpected response from posting API: {0}")]
    InvalidResponse(String),
}

/// The social-media account we post to.
#[async_trait]
pub trait PostingApi: Send + Sync {
    async fn post(&self, draft: &PostDraft) -> std::result::Result<PostedStatus, PostError>;

    async fn upload_media(
        &self,
        bytes: Vec<u8>,
        mime_type: &str,
    ) -> std::result::Result<MediaHandle, PostError>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PublisherConfig {
    /// Base URL of the posting API (default: https://api.x.com)
    pub api_base: String,
    /// OAuth 2.0 user access token; `ALMANAC_BEARER_TOKEN` overrides it
    pub bearer_token: Option<String>,
    /// Wait before resubmitting after a duplicate rejection (default: 3000)
    pub duplicate_retry_delay_ms: u64,
    /// Resubmissions allowed after duplicate rejections (default: 10)
    pub max_duplicate_retries: u32,
    /// Growth of the wait between resubmissions; 1.0 keeps it fixed (default: 1.0)
    pub duplicate_backoff_multiplier: f64,
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            api_base: x_api::DEFAULT_API_BASE.to_string(),
            bearer_token: None,
            duplicate_retry_delay_ms: 3000,
            max_duplicate_retries: 10,
            duplicate_backoff_multiplier: 1.0,
        }
    }
}

impl PublisherConfig {
    pub fn duplicate_retry_delay(&self) -> Duration {
        Duration::from_millis(self.duplicate_retry_delay_ms)
    }

    /// The duplicate loop expressed as a [`RetryPolicy`], the same schedule
    /// type the feed fetch uses.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.max_duplicate_retries,
            self.duplicate_retry_delay_ms,
            self.duplicate_backoff_multiplier,
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishResult {
    pub post_id: String,
    /// Post calls made, including duplicate rejections
    pub attempts: u32,
    pub media_attached: bool,
}

pub struct Publisher {
    api: Arc<dyn PostingApi>,
    media: Option<MediaAttacher>,
    retry: RetryPolicy,
}

impl Publisher {
    pub fn new(api: Arc<dyn PostingApi>, config: &PublisherConfig) -> Self {
        Self::with_retry_policy(api, config.retry_policy())
    }

    pub fn with_retry_policy(api: Arc<dyn PostingApi>, retry: RetryPolicy) -> Self {
        Self {
            api,
            media: None,
            retry,
        }
    }

    pub fn with_media(mut self, media: MediaAttacher) -> Self {
        self.media = Some(media);
        self
    }

    /// Post `message`, resubmitting it unchanged after each duplicate rejection.
    ///
    /// Media is resolved once up front; if that fails the post goes out as
    /// text only. Any non-duplicate error is returned immediately.
    pub async fn publish(
        &self,
        message: &FormattedMessage,
        media_search_term: Option<&str>,
    ) -> Result<PublishResult> {
        let media = self.resolve_media(media_search_term).await;
        let media_attached = media.is_some();

        let draft = PostDraft {
            text: message.as_str().to_string(),
            media: media.into_iter().collect(),
        };

        let mut attempts = 0;
        loop {
            attempts += 1;

            match self.api.post(&draft).await {
                Ok(status) => {
                    info!("Posted {} after {} attempt(s)", status.id, attempts);
                    return Ok(PublishResult {
                        post_id: status.id,
                        attempts,
                        media_attached,
                    });
                }
                Err(PostError::Duplicate) => {
                    let retry = attempts - 1;
                    if retry >= self.retry.max_retries {
                        return Err(AlmanacError::DuplicateLimit { attempts });
                    }
                    let delay = self.retry.delay_for_retry(retry);
                    warn!("Duplicate post detected, retrying in {:?}", delay);
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(AlmanacError::PublishFailure(e.to_string())),
            }
        }
    }

    async fn resolve_media(&self, term: Option<&str>) -> Option<MediaHandle> {
        let (media, term) = match (self.media.as_ref(), term) {
            (Some(media), Some(term)) => (media, term),
            _ => return None,
        };

        match media.attach(self.api.as_ref(), term).await {
            Ok(Some(handle)) => {
                debug!("Attached image for '{}'", term);
                Some(handle)
            }
            Ok(None) => {
                debug!("No image found for '{}'", term);
                None
            }
            Err(e) => {
                warn!("Posting without image for '{}': {}", term, e);
                None
            }
        }
    }
}
