use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use serde_json::json;

use crate::fetcher::http_fetcher::DEFAULT_USER_AGENT;
use crate::publisher::{MediaHandle, PostDraft, PostError, PostedStatus, PostingApi};

pub const DEFAULT_API_BASE: &str = "https://api.x.com";

#[derive(Debug, Deserialize)]
struct DataEnvelope {
    data: Option<IdData>,
    #[serde(default)]
    media_id_string: Option<String>,
}

#[derive(Debug, Deserialize)]
struct IdData {
    id: String,
}

/// X API v2 client authenticated with a pre-issued user access token.
///
/// X answers a repeated status with 403 and a "duplicate content" detail,
/// which is reported as [`PostError::Duplicate`]. Any other 403 (missing
/// scope, suspended app) is a plain rejection.
pub struct XApiClient {
    client: Client,
    base: String,
    token: Option<String>,
}

impl XApiClient {
    pub fn new(base: &str, token: Option<String>) -> Result<Self, PostError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(DEFAULT_USER_AGENT)
            .build()?;

        Ok(Self {
            client,
            base: base.trim_end_matches('/').to_string(),
            token: token.filter(|t| !t.trim().is_empty()),
        })
    }

    fn token(&self) -> Result<&str, PostError> {
        self.token.as_deref().ok_or(PostError::MissingCredentials)
    }

    async fn read_id(response: Response, detect_duplicate: bool) -> Result<String, PostError> {
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            if detect_duplicate && is_duplicate_rejection(status, &message) {
                return Err(PostError::Duplicate);
            }
            return Err(PostError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let envelope: DataEnvelope = response
            .json()
            .await
            .map_err(|e| PostError::InvalidResponse(e.to_string()))?;

        envelope
            .data
            .map(|d| d.id)
            .or(envelope.media_id_string)
            .ok_or_else(|| PostError::InvalidResponse("missing id".to_string()))
    }
}

#[async_trait]
impl PostingApi for XApiClient {
    async fn post(&self, draft: &PostDraft) -> Result<PostedStatus, PostError> {
        let mut body = json!({ "text": draft.text });
        if !draft.media.is_empty() {
            let ids: Vec<&str> = draft.media.iter().map(|m| m.0.as_str()).collect();
            body["media"] = json!({ "media_ids": ids });
        }

        let response = self
            .client
            .post(format!("{}/2/tweets", self.base))
            .bearer_auth(self.token()?)
            .json(&body)
            .send()
            .await?;

        let id = Self::read_id(response, true).await?;
        Ok(PostedStatus { id })
    }

    async fn upload_media(&self, bytes: Vec<u8>, mime_type: &str) -> Result<MediaHandle, PostError> {
        let part = Part::bytes(bytes)
            .file_name("image")
            .mime_str(mime_type)?;
        let form = Form::new()
            .text("media_category", "tweet_image")
            .part("media", part);

        let response = self
            .client
            .post(format!("{}/2/media/upload", self.base))
            .bearer_auth(self.token()?)
            .multipart(form)
            .send()
            .await?;

        let id = Self::read_id(response, false).await?;
        Ok(MediaHandle(id))
    }
}

/// A bare 403 is still taken as a duplicate; one whose body explains
/// something else is not.
fn is_duplicate_rejection(status: StatusCode, body: &str) -> bool {
    status == StatusCode::FORBIDDEN
        && (body.trim().is_empty() || body.to_ascii_lowercase().contains("duplicate"))
}
