//! Optional image enrichment: find a picture for the item, download it,
//! upload it to the posting API.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::fetcher::http_fetcher::DEFAULT_USER_AGENT;
use crate::fetcher::Fetcher;
use crate::publisher::{MediaHandle, PostError, PostingApi};

pub const DEFAULT_LOOKUP_BASE: &str = "https://en.wikipedia.org/api/rest_v1";

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("Image lookup failed: {0}")]
    Lookup(String),

    #[error("Image download failed: {0}")]
    Download(String),

    #[error("Not an image: {0}")]
    NotAnImage(String),

    #[error("Image upload failed: {0}")]
    Upload(#[from] PostError),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaConfig {
    /// Attach an image when the item names a page (default: false)
    pub enabled: bool,
    /// Base URL of the Wikipedia REST API used for thumbnails
    pub lookup_base: String,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            lookup_base: DEFAULT_LOOKUP_BASE.to_string(),
        }
    }
}

/// Resolves a search term to an image URL.
#[async_trait]
pub trait ImageLookup: Send + Sync {
    async fn thumbnail_url(&self, term: &str) -> Result<Option<String>, MediaError>;
}

#[derive(Debug, Deserialize)]
struct PageSummary {
    #[serde(default)]
    thumbnail: Option<Thumbnail>,
}

#[derive(Debug, Deserialize)]
struct Thumbnail {
    source: String,
}

/// Thumbnail lookup via the Wikipedia page summary endpoint.
pub struct WikipediaImageLookup {
    client: Client,
    base: Url,
}

impl WikipediaImageLookup {
    pub fn new(base: &str) -> Result<Self, MediaError> {
        let base = Url::parse(base).map_err(|e| MediaError::Lookup(e.to_string()))?;
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .user_agent(DEFAULT_USER_AGENT)
            .build()
            .map_err(|e| MediaError::Lookup(e.to_string()))?;

        Ok(Self { client, base })
    }

    fn summary_url(&self, term: &str) -> Result<Url, MediaError> {
        let title = term.trim().replace(' ', "_");
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| MediaError::Lookup(format!("cannot use {} as a base", self.base)))?
            .pop_if_empty()
            .extend(["page", "summary", title.as_str()]);
        Ok(url)
    }
}

#[async_trait]
impl ImageLookup for WikipediaImageLookup {
    async fn thumbnail_url(&self, term: &str) -> Result<Option<String>, MediaError> {
        let url = self.summary_url(term)?;
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| MediaError::Lookup(e.to_string()))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let response = response
            .error_for_status()
            .map_err(|e| MediaError::Lookup(e.to_string()))?;

        let summary: PageSummary = response
            .json()
            .await
            .map_err(|e| MediaError::Lookup(e.to_string()))?;

        Ok(summary.thumbnail.map(|t| t.source))
    }
}

/// Lookup + download + upload, producing a handle to attach to a post.
pub struct MediaAttacher {
    lookup: Arc<dyn ImageLookup>,
    fetcher: Arc<dyn Fetcher>,
}

impl MediaAttacher {
    pub fn new(lookup: Arc<dyn ImageLookup>, fetcher: Arc<dyn Fetcher>) -> Self {
        Self { lookup, fetcher }
    }

    /// `Ok(None)` means there simply is no image for this term.
    pub async fn attach(
        &self,
        api: &dyn PostingApi,
        term: &str,
    ) -> Result<Option<MediaHandle>, MediaError> {
        let Some(image_url) = self.lookup.thumbnail_url(term).await? else {
            return Ok(None);
        };

        let image = self
            .fetcher
            .fetch(&image_url)
            .await
            .map_err(|e| MediaError::Download(e.to_string()))?;

        let mime_type = image
            .content_type
            .as_deref()
            .map(|ct| ct.split(';').next().unwrap_or(ct).trim().to_string())
            .or_else(|| guess_mime(&image_url).map(String::from))
            .filter(|m| m.starts_with("image/"))
            .ok_or_else(|| MediaError::NotAnImage(image_url.clone()))?;

        let handle = api.upload_media(image.body, &mime_type).await?;
        Ok(Some(handle))
    }
}

fn guess_mime(url: &str) -> Option<&'static str> {
    let path = url.split(['?', '#']).next().unwrap_or(url).to_ascii_lowercase();
    let ext = path.rsplit('.').next()?;
    match ext {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        _ => None,
    }
}
