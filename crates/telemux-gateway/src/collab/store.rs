//! Persistence-store collaborator.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use telemux_core::error::{GatewayError, Result};
use telemux_core::protocol::frame::RawFrame;

/// One persisted raw frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameRecord {
    pub device_id: String,
    #[serde(flatten)]
    pub frame: RawFrame,
    pub enqueued_at: DateTime<Utc>,
    pub inserted_at: DateTime<Utc>,
}

#[async_trait]
pub trait FrameStore: Send + Sync {
    /// Insert a whole batch; either all records are accepted or the call fails.
    async fn insert_batch(&self, records: Vec<FrameRecord>) -> Result<()>;

    /// Newest first, optionally filtered by device.
    async fn query_recent(&self, device_id: Option<&str>, limit: usize) -> Result<Vec<FrameRecord>>;
}

/// In-process store. Used by default and in tests.
#[derive(Default)]
pub struct MemoryFrameStore {
    records: Mutex<Vec<FrameRecord>>,
    batches: AtomicU64,
}

impl MemoryFrameStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of successful `insert_batch` calls.
    pub fn batch_count(&self) -> u64 {
        self.batches.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl FrameStore for MemoryFrameStore {
    async fn insert_batch(&self, records: Vec<FrameRecord>) -> Result<()> {
        let mut guard = self.records.lock().unwrap_or_else(PoisonError::into_inner);
        guard.extend(records);
        self.batches.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    async fn query_recent(&self, device_id: Option<&str>, limit: usize) -> Result<Vec<FrameRecord>> {
        let guard = self.records.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(guard
            .iter()
            .rev()
            .filter(|r| device_id.map_or(true, |d| r.device_id == d))
            .take(limit)
            .cloned()
            .collect())
    }
}

/// Store backed by an HTTP batch endpoint.
///
/// `POST {url}` with a JSON array of records; `GET {url}?deviceId=&limit=`
/// returns records newest first.
pub struct HttpFrameStore {
    client: reqwest::Client,
    url: String,
}

impl HttpFrameStore {
    pub fn new(url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GatewayError::Internal(format!("store http client init failed: {e}")))?;
        Ok(Self {
            client,
            url: url.to_string(),
        })
    }
}

#[async_trait]
impl FrameStore for HttpFrameStore {
    async fn insert_batch(&self, records: Vec<FrameRecord>) -> Result<()> {
        self.client
            .post(&self.url)
            .json(&records)
            .send()
            .await
            .map_err(|e| GatewayError::PersistenceFailure(format!("batch insert request failed: {e}")))?
            .error_for_status()
            .map_err(|e| GatewayError::PersistenceFailure(format!("batch insert rejected: {e}")))?;
        Ok(())
    }

    async fn query_recent(&self, device_id: Option<&str>, limit: usize) -> Result<Vec<FrameRecord>> {
        let mut query: Vec<(&str, String)> = vec![("limit", limit.to_string())];
        if let Some(d) = device_id {
            query.push(("deviceId", d.to_string()));
        }

        self.client
            .get(&self.url)
            .query(&query)
            .send()
            .await
            .map_err(|e| GatewayError::PersistenceFailure(format!("query request failed: {e}")))?
            .error_for_status()
            .map_err(|e| GatewayError::PersistenceFailure(format!("query rejected: {e}")))?
            .json::<Vec<FrameRecord>>()
            .await
            .map_err(|e| GatewayError::PersistenceFailure(format!("query body invalid: {e}")))
    }
}
