pub mod feed_client;
pub mod http_fetcher;
pub mod retry;

use async_trait::async_trait;

use crate::app::Result;

pub use feed_client::{FeedClient, FeedUrlTemplate};
pub use http_fetcher::HttpFetcher;
pub use retry::RetryPolicy;

/// Successful response body
#[derive(Debug, Clone)]
pub struct FetchResult {
    pub body: Vec<u8>,
    pub content_type: Option<String>,
}

/// Plain HTTP GET. Non-success statuses come back as errors.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<FetchResult>;
}
