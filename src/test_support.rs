//! Scripted stand-ins for the network collaborators.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use tokio::time::Instant;

use crate::app::{AlmanacError, Result};
use crate::domain::{Clock, FixedClock};
use crate::fetcher::{FeedClient, FeedUrlTemplate, FetchResult, Fetcher, RetryPolicy};
use crate::formatter::{MessageConfig, MessageFormatter};
use crate::normalizer::Normalizer;
use crate::pipeline::Pipeline;
use crate::publisher::{
    ImageLookup, MediaError, MediaHandle, PostDraft, PostError, PostedStatus, PostingApi,
    Publisher, PublisherConfig,
};
use crate::store::{ContentStore, SelectionMode, Selector};

/// Build a minimal "On this day" response with one page link per entry.
pub fn feed_json(entries: &[(&str, i32)]) -> String {
    let selected: Vec<_> = entries
        .iter()
        .map(|(text, year)| {
            serde_json::json!({
                "text": text,
                "year": year,
                "pages": [{
                    "titles": { "normalized": format!("Page for {}", year) },
                    "content_urls": { "desktop": { "page": format!("https://en.wikipedia.org/wiki/{}", year) } }
                }]
            })
        })
        .collect();
    serde_json::json!({ "selected": selected }).to_string()
}

/// Pipeline over scripted collaborators, fixed on 2024-01-01, exhaust mode.
pub fn test_pipeline(
    fetcher: Arc<ScriptedFetcher>,
    api: Arc<FakePostingApi>,
    retry: RetryPolicy,
    timeout: Duration,
) -> Pipeline {
    let clock: Arc<dyn Clock> = Arc::new(FixedClock::on(
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
    ));
    let feed = FeedClient::new(
        fetcher,
        FeedUrlTemplate::default(),
        Normalizer::default(),
        clock.clone(),
    );
    let store = Arc::new(ContentStore::new(
        SelectionMode::Exhaust,
        Selector::seeded(5),
        clock,
    ));
    let publisher = Publisher::new(api, &PublisherConfig::default());

    Pipeline::new(
        store,
        feed,
        retry,
        MessageFormatter::new(MessageConfig::default()),
        publisher,
        timeout,
    )
}

enum Scripted {
    Ok(FetchResult),
    Status(u16),
}

/// Fetcher that replays queued responses in order.
#[derive(Default)]
pub struct ScriptedFetcher {
    queue: Mutex<VecDeque<Scripted>>,
    urls: Mutex<Vec<String>>,
    times: Mutex<Vec<Instant>>,
}

impl ScriptedFetcher {
    pub fn push_ok(&self, body: String) {
        self.push_ok_bytes(body.into_bytes(), Some("application/json"));
    }

    pub fn push_ok_bytes(&self, body: Vec<u8>, content_type: Option<&str>) {
        self.queue.lock().unwrap().push_back(Scripted::Ok(FetchResult {
            body,
            content_type: content_type.map(String::from),
        }));
    }

    pub fn push_image(&self, body: Vec<u8>, content_type: &str) {
        self.push_ok_bytes(body, Some(content_type));
    }

    pub fn push_err(&self, status: u16) {
        self.queue.lock().unwrap().push_back(Scripted::Status(status));
    }

    pub fn calls(&self) -> usize {
        self.urls.lock().unwrap().len()
    }

    pub fn urls(&self) -> Vec<String> {
        self.urls.lock().unwrap().clone()
    }

    pub fn call_times(&self) -> Vec<Instant> {
        self.times.lock().unwrap().clone()
    }
}

#[async_trait]
impl Fetcher for ScriptedFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchResult> {
        self.urls.lock().unwrap().push(url.to_string());
        self.times.lock().unwrap().push(Instant::now());

        match self.queue.lock().unwrap().pop_front() {
            Some(Scripted::Ok(result)) => Ok(result),
            Some(Scripted::Status(status)) => Err(AlmanacError::Status(status)),
            None => Err(AlmanacError::Other("no scripted response left".into())),
        }
    }
}

/// Clock whose date can be moved forward by a test.
pub struct ManualClock {
    today: Mutex<NaiveDate>,
}

impl ManualClock {
    pub fn new(today: NaiveDate) -> Self {
        Self {
            today: Mutex::new(today),
        }
    }

    pub fn set_today(&self, today: NaiveDate) {
        *self.today.lock().unwrap() = today;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        self.today()
            .and_hms_opt(12, 0, 0)
            .map(|dt| dt.and_utc())
            .unwrap_or_default()
    }

    fn today(&self) -> NaiveDate {
        *self.today.lock().unwrap()
    }
}

pub enum PostReply {
    Ok(String),
    Duplicate,
    Rejected(u16),
    /// Never answers; used to exercise timeouts and the in-flight guard.
    Hang,
}

#[derive(Default)]
pub struct FakePostingApi {
    replies: Mutex<VecDeque<PostReply>>,
    drafts: Mutex<Vec<PostDraft>>,
    uploads: Mutex<Vec<(String, usize)>>,
}

impl FakePostingApi {
    pub fn push(&self, reply: PostReply) {
        self.replies.lock().unwrap().push_back(reply);
    }

    pub fn post_calls(&self) -> usize {
        self.drafts.lock().unwrap().len()
    }

    pub fn posted_texts(&self) -> Vec<String> {
        self.drafts
            .lock()
            .unwrap()
            .iter()
            .map(|d| d.text.clone())
            .collect()
    }

    pub fn posted_media(&self) -> Vec<Vec<MediaHandle>> {
        self.drafts
            .lock()
            .unwrap()
            .iter()
            .map(|d| d.media.clone())
            .collect()
    }

    pub fn uploads(&self) -> Vec<(String, usize)> {
        self.uploads.lock().unwrap().clone()
    }
}

#[async_trait]
impl PostingApi for FakePostingApi {
    async fn post(&self, draft: &PostDraft) -> std::result::Result<PostedStatus, PostError> {
        self.drafts.lock().unwrap().push(draft.clone());
        let reply = self.replies.lock().unwrap().pop_front();

        match reply {
            Some(PostReply::Ok(id)) => Ok(PostedStatus { id }),
            Some(PostReply::Duplicate) => Err(PostError::Duplicate),
            Some(PostReply::Rejected(status)) => Err(PostError::Rejected {
                status,
                message: "rejected".into(),
            }),
            Some(PostReply::Hang) => {
                tokio::time::sleep(Duration::from_secs(365 * 24 * 3600)).await;
                Err(PostError::InvalidResponse("woke up".into()))
            }
            None => Err(PostError::InvalidResponse("no scripted reply left".into())),
        }
    }

    async fn upload_media(
        &self,
        bytes: Vec<u8>,
        mime_type: &str,
    ) -> std::result::Result<MediaHandle, PostError> {
        let mut uploads = self.uploads.lock().unwrap();
        uploads.push((mime_type.to_string(), bytes.len()));
        Ok(MediaHandle(format!("media-{}", uploads.len())))
    }
}

pub struct FakeImageLookup {
    url: Option<String>,
    calls: AtomicUsize,
}

impl FakeImageLookup {
    pub fn found(url: &str) -> Self {
        Self {
            url: Some(url.to_string()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn missing() -> Self {
        Self {
            url: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ImageLookup for FakeImageLookup {
    async fn thumbnail_url(&self, _term: &str) -> std::result::Result<Option<String>, MediaError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.url.clone())
    }
}
