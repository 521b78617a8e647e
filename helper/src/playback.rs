//! In-memory playback request queue.
//!
//! Requests are only recorded here; handing them to a renderer is left to
//! whatever integrates with `Device::play_url`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;

/// A queued playback request.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackRequest {
    pub id: String,
    pub device: String,
    pub name: String,
    pub target: String,
    pub at: DateTime<Utc>,
    #[serde(skip)]
    seq: u64,
}

/// Requests kept before the oldest are evicted.
pub const DEFAULT_PLAYBACK_LIMIT: usize = 200;

/// Thread-safe queue of the most recent playback requests, shareable via `Arc`.
#[derive(Debug)]
pub struct PlaybackQueue {
    requests: DashMap<String, PlaybackRequest>,
    next_seq: AtomicU64,
    limit: usize,
}

impl Default for PlaybackQueue {
    fn default() -> Self {
        Self::with_limit(DEFAULT_PLAYBACK_LIMIT)
    }
}

impl PlaybackQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep at most `limit` requests (at least one).
    pub fn with_limit(limit: usize) -> Self {
        Self {
            requests: DashMap::new(),
            next_seq: AtomicU64::new(0),
            limit: limit.max(1),
        }
    }

    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Record a request and return it.
    pub fn enqueue(&self, device: &str, name: &str, target: &str) -> PlaybackRequest {
        let request = PlaybackRequest {
            id: uuid::Uuid::new_v4().to_string(),
            device: device.to_string(),
            name: name.to_string(),
            target: target.to_string(),
            at: Utc::now(),
            seq: self.next_seq.fetch_add(1, Ordering::Relaxed),
        };
        self.requests.insert(request.id.clone(), request.clone());
        self.evict_oldest();
        request
    }

    fn evict_oldest(&self) {
        while self.requests.len() > self.limit {
            let oldest = self
                .requests
                .iter()
                .min_by_key(|entry| entry.value().seq)
                .map(|entry| entry.key().clone());
            match oldest {
                Some(id) => {
                    self.requests.remove(&id);
                    tracing::debug!(request_id = %id, "evicted playback request");
                }
                None => break,
            }
        }
    }

    pub fn get(&self, id: &str) -> Option<PlaybackRequest> {
        self.requests.get(id).map(|entry| entry.value().clone())
    }

    /// All requests, oldest first.
    pub fn list(&self) -> Vec<PlaybackRequest> {
        let mut requests: Vec<_> = self
            .requests
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        requests.sort_by_key(|r| r.seq);
        requests
    }

    pub fn len(&self) -> usize {
        self.requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }
}
