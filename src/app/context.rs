use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tracing::warn;

use crate::app::error::{AlmanacError, Result};
use crate::config::Config;
use crate::domain::{Clock, SystemClock};
use crate::fetcher::http_fetcher::{HttpFetcher, DEFAULT_USER_AGENT};
use crate::fetcher::{FeedClient, FeedUrlTemplate, Fetcher};
use crate::formatter::MessageFormatter;
use crate::normalizer::Normalizer;
use crate::pipeline::Pipeline;
use crate::publisher::{MediaAttacher, Publisher, WikipediaImageLookup, XApiClient};
use crate::store::{ContentStore, Selector};

/// Wires the configured components into one pipeline.
pub struct AppContext {
    pub config: Config,
    pub pipeline: Arc<Pipeline>,
}

impl AppContext {
    /// Load configuration from `config_path` (or the default location) and build.
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let config = Config::load(config_path)?;
        Self::new(config)
    }

    pub fn new(config: Config) -> Result<Self> {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);

        let user_agent = config
            .feed
            .user_agent
            .as_deref()
            .unwrap_or(DEFAULT_USER_AGENT);
        let fetcher: Arc<dyn Fetcher> = Arc::new(HttpFetcher::with_options(
            user_agent,
            Duration::from_secs(config.feed.timeout_secs),
        )?);

        let feed = FeedClient::new(
            fetcher.clone(),
            FeedUrlTemplate::new(config.feed.url_template.clone())?,
            Normalizer::new(config.feed.section),
            clock.clone(),
        );

        let store = Arc::new(ContentStore::new(
            config.store.mode,
            Selector::from_entropy(),
            clock,
        ));

        if !config.has_credentials() {
            warn!(
                "No bearer token configured; posting will fail until {} is set",
                crate::config::BEARER_TOKEN_ENV
            );
        }
        let api = XApiClient::new(
            &config.publisher.api_base,
            config.publisher.bearer_token.clone(),
        )
        .map_err(|e| AlmanacError::Other(format!("Failed to build API client: {}", e)))?;

        let mut publisher = Publisher::new(Arc::new(api), &config.publisher);
        if config.media.enabled {
            let lookup = WikipediaImageLookup::new(&config.media.lookup_base)
                .map_err(|e| AlmanacError::Other(e.to_string()))?;
            publisher = publisher.with_media(MediaAttacher::new(Arc::new(lookup), fetcher));
        }

        let pipeline = Pipeline::new(
            store,
            feed,
            config.retry,
            MessageFormatter::new(config.message.clone()),
            publisher,
            config.pipeline.timeout(),
        );

        Ok(Self {
            config,
            pipeline: Arc::new(pipeline),
        })
    }
}
