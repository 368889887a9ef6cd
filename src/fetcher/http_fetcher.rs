use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;

use crate::app::{AlmanacError, Result};
use crate::fetcher::{FetchResult, Fetcher};

pub const DEFAULT_USER_AGENT: &str = concat!("almanac/", env!("CARGO_PKG_VERSION"));

pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self> {
        Self::with_options(DEFAULT_USER_AGENT, Duration::from_secs(10))
    }

    /// Wikimedia asks API clients to identify themselves, so the agent is configurable.
    pub fn with_options(user_agent: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .gzip(true)
            .brotli(true)
            .user_agent(user_agent)
            .build()?;

        Ok(Self { client })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchResult> {
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AlmanacError::Status(status.as_u16()));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(String::from);

        let body = response.bytes().await?.to_vec();

        Ok(FetchResult { body, content_type })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_fetch_returns_body_and_content_type() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/feed"))
            .and(header("user-agent", "almanac-test"))
            .respond_with(
                ResponseTemplate::new(200).set_body_raw(r#"{"selected":[]}"#, "application/json"),
            )
            .expect(1)
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::with_options("almanac-test", Duration::from_secs(5)).unwrap();
        let result = fetcher.fetch(&format!("{}/feed", server.uri())).await.unwrap();

        assert_eq!(result.body, br#"{"selected":[]}"#.to_vec());
        assert_eq!(result.content_type.as_deref(), Some("application/json"));
    }

    #[tokio::test]
    async fn test_fetch_maps_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::new().unwrap();
        let err = fetcher.fetch(&server.uri()).await.unwrap_err();

        assert!(matches!(err, AlmanacError::Status(503)));
    }
}
