//! In-memory holder for the current batch.
//!
//! Nothing here survives a restart; the first run after startup always
//! fetches.

pub mod selector;

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::app::{AlmanacError, Result};
use crate::domain::{Clock, ContentBatch, ContentItem};
use crate::fetcher::{FeedClient, RetryPolicy};

pub use selector::Selector;

/// What happens to an item once it has been handed out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectionMode {
    /// Leave the batch untouched; the same item may come up again.
    Repeat,
    /// Remove the item, so a batch never repeats and is refetched once drained.
    #[default]
    Exhaust,
}

#[derive(Debug, Default)]
pub struct StoreState {
    pub batch: ContentBatch,
    pub fetched_at: Option<DateTime<Utc>>,
    /// Feed date the batch was fetched for
    pub fetched_for: Option<NaiveDate>,
    pub stale: bool,
}

impl StoreState {
    fn needs_refresh(&self, today: NaiveDate) -> bool {
        self.batch.is_empty() || self.stale || self.fetched_for != Some(today)
    }
}

struct Inner {
    state: StoreState,
    selector: Selector,
}

pub struct ContentStore {
    inner: Mutex<Inner>,
    mode: SelectionMode,
    clock: Arc<dyn Clock>,
}

impl ContentStore {
    pub fn new(mode: SelectionMode, selector: Selector, clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Mutex::new(Inner {
                state: StoreState::default(),
                selector,
            }),
            mode,
            clock,
        }
    }

    pub fn mode(&self) -> SelectionMode {
        self.mode
    }

    /// Refetch only when the batch is empty, marked stale, or from another day.
    ///
    /// The lock is held across the fetch so concurrent callers wait for one
    /// refresh instead of each hitting the feed.
    pub async fn ensure_fresh(&self, client: &FeedClient, policy: &RetryPolicy) -> Result<()> {
        let mut inner = self.inner.lock().await;
        let today = self.clock.today();

        if !inner.state.needs_refresh(today) {
            debug!(
                "Reusing cached batch ({} items left)",
                inner.state.batch.len()
            );
            return Ok(());
        }

        let batch = client.fetch(policy).await?;
        info!("Stored new batch of {} items for {}", batch.len(), today);

        inner.state = StoreState {
            batch,
            fetched_at: Some(self.clock.now()),
            fetched_for: Some(today),
            stale: false,
        };

        Ok(())
    }

    /// Hand out one item according to the configured mode.
    pub async fn take_next(&self) -> Result<ContentItem> {
        let mut inner = self.inner.lock().await;
        let Inner { state, selector } = &mut *inner;

        if state.batch.is_empty() {
            return Err(AlmanacError::NoContentAvailable);
        }

        let index = selector.pick_index(&state.batch)?;
        let item = match self.mode {
            SelectionMode::Repeat => state.batch.get(index).cloned(),
            SelectionMode::Exhaust => state.batch.take(index),
        }
        .ok_or(AlmanacError::EmptyBatch)?;

        debug!(
            "Selected item {} ({} left in batch)",
            item.short_id(),
            state.batch.len()
        );

        Ok(item)
    }

    /// Return an item whose post never went out.
    ///
    /// Only exhaust mode removes items, and an item is only put back into the
    /// batch for the day it was fetched for.
    pub async fn restore(&self, item: ContentItem) {
        if self.mode != SelectionMode::Exhaust {
            return;
        }

        let mut inner = self.inner.lock().await;
        if inner.state.fetched_for != Some(self.clock.today()) {
            debug!("Not restoring item {}: batch is from another day", item.short_id());
            return;
        }

        let id = item.short_id().to_string();
        if inner.state.batch.push(item) {
            debug!("Restored item {} to the batch", id);
        }
    }

    pub async fn current_batch(&self) -> ContentBatch {
        self.inner.lock().await.state.batch.clone()
    }

    /// Force the next `ensure_fresh` to refetch.
    pub async fn mark_stale(&self) {
        self.inner.lock().await.state.stale = true;
    }

    pub async fn remaining(&self) -> usize {
        self.inner.lock().await.state.batch.len()
    }

    pub async fn last_fetched_at(&self) -> Option<DateTime<Utc>> {
        self.inner.lock().await.state.fetched_at
    }
}
