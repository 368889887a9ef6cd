use std::time::Duration;

use thiserror::Error;

use crate::config::ConfigError;

#[derive(Error, Debug)]
pub enum AlmanacError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Upstream returned status {0}")]
    Status(u16),

    #[error("Feed parsing error: {0}")]
    FeedParse(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Upstream unreachable, or no valid items, after the whole retry budget.
    #[error("Failed to fetch feed after {attempts} attempts: {last_error}")]
    FetchFailure { attempts: u32, last_error: String },

    #[error("No content available")]
    NoContentAvailable,

    #[error("Cannot select from an empty batch")]
    EmptyBatch,

    #[error("Publish failed: {0}")]
    PublishFailure(String),

    /// Every resubmission was refused as duplicate content.
    #[error("Publish failed: duplicate content rejected {attempts} times, giving up")]
    DuplicateLimit { attempts: u32 },

    #[error("Pipeline timed out after {0:?}")]
    Timeout(Duration),

    #[error("A pipeline run is already in progress")]
    AlreadyRunning,

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, AlmanacError>;
