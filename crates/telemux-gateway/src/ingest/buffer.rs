//! Shared frame buffer with batched, retry-safe persistence.
//!
//! - `enqueue` is synchronous and O(1); it only appends under a short lock.
//! - `flush` snapshots the queue, awaits one `insert_batch`, and on success
//!   removes exactly the snapshotted entries (by sequence number). Entries
//!   enqueued while the insert is in flight stay queued.
//! - A failed flush leaves the queue untouched: at-least-once delivery.
//! - At most one flush is in flight at a time.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Duration, Instant, MissedTickBehavior};

use telemux_core::error::Result;
use telemux_core::protocol::frame::RawFrame;

use crate::collab::{FrameRecord, FrameStore};
use crate::config::{BufferSection, OverflowPolicy};
use crate::obs::GatewayMetrics;

#[derive(Debug, Clone, PartialEq)]
pub struct BufferEntry {
    pub seq: u64,
    pub device_id: Arc<str>,
    pub frame: RawFrame,
    pub enqueued_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnqueueOutcome {
    Queued {
        depth: usize,
        /// Threshold reached and not backing off after a failure.
        flush_due: bool,
        /// The oldest entry was evicted to make room.
        evicted: bool,
    },
    /// Buffer full under `drop_newest`.
    Rejected,
}

impl EnqueueOutcome {
    pub fn flush_due(self) -> bool {
        matches!(self, EnqueueOutcome::Queued { flush_due: true, .. })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushReport {
    pub flushed: usize,
    pub remaining: usize,
}

struct BufferState {
    entries: VecDeque<BufferEntry>,
    next_seq: u64,
    retry_after: Option<Instant>,
}

pub struct FrameBuffer {
    state: Mutex<BufferState>,
    flush_gate: tokio::sync::Mutex<()>,
    flush_scheduled: AtomicBool,
    store: Arc<dyn FrameStore>,
    settings: BufferSection,
    metrics: Arc<GatewayMetrics>,
}

impl FrameBuffer {
    pub fn new(settings: BufferSection, store: Arc<dyn FrameStore>, metrics: Arc<GatewayMetrics>) -> Self {
        Self {
            state: Mutex::new(BufferState {
                entries: VecDeque::new(),
                next_seq: 1,
                retry_after: None,
            }),
            flush_gate: tokio::sync::Mutex::new(()),
            flush_scheduled: AtomicBool::new(false),
            store,
            settings,
            metrics,
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, BufferState> {
        // A panic while holding the lock cannot leave the queue half-mutated
        // (push/pop are atomic), so poisoning is ignored.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn len(&self) -> usize {
        self.lock_state().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy of the pending entries, oldest first.
    pub fn pending(&self) -> Vec<BufferEntry> {
        self.lock_state().entries.iter().cloned().collect()
    }

    pub fn enqueue(&self, device_id: Arc<str>, frame: RawFrame) -> EnqueueOutcome {
        let mut st = self.lock_state();

        let mut evicted = false;
        if st.entries.len() >= self.settings.max_entries {
            match self.settings.overflow {
                OverflowPolicy::DropNewest => {
                    drop(st);
                    self.metrics.frames_dropped.inc(&[("reason", "buffer_full")]);
                    tracing::warn!(device_id = %device_id, frame_id = frame.id, "buffer full, frame rejected");
                    return EnqueueOutcome::Rejected;
                }
                OverflowPolicy::DropOldest => {
                    st.entries.pop_front();
                    evicted = true;
                }
            }
        }

        let seq = st.next_seq;
        st.next_seq += 1;
        st.entries.push_back(BufferEntry {
            seq,
            device_id,
            frame,
            enqueued_at: Utc::now(),
        });

        let depth = st.entries.len();
        let backing_off = st.retry_after.is_some_and(|t| Instant::now() < t);
        let flush_due = depth >= self.settings.flush_threshold && !backing_off;
        drop(st);

        if evicted {
            self.metrics.frames_dropped.inc(&[("reason", "buffer_evicted")]);
            tracing::warn!(depth, "buffer full, oldest frame evicted");
        }

        EnqueueOutcome::Queued {
            depth,
            flush_due,
            evicted,
        }
    }

    /// Flush now, waiting for any in-flight flush first.
    pub async fn flush(&self) -> Result<FlushReport> {
        let _gate = self.flush_gate.lock().await;
        self.flush_locked().await
    }

    async fn flush_locked(&self) -> Result<FlushReport> {
        let snapshot: Vec<BufferEntry> = self.lock_state().entries.iter().cloned().collect();
        let Some(last_seq) = snapshot.last().map(|e| e.seq) else {
            return Ok(FlushReport::default());
        };

        let batch_len = snapshot.len();
        let inserted_at = Utc::now();
        let records: Vec<FrameRecord> = snapshot
            .into_iter()
            .map(|e| FrameRecord {
                device_id: e.device_id.to_string(),
                frame: e.frame,
                enqueued_at: e.enqueued_at,
                inserted_at,
            })
            .collect();

        let started = Instant::now();
        let res = self.store.insert_batch(records).await;
        let elapsed = started.elapsed();

        let outcome = if res.is_ok() { "ok" } else { "error" };
        self.metrics.flushes.inc(&[("outcome", outcome)]);
        self.metrics.flush_duration.observe(&[("outcome", outcome)], elapsed);

        match res {
            Ok(()) => {
                let remaining = {
                    let mut st = self.lock_state();
                    while st.entries.front().is_some_and(|e| e.seq <= last_seq) {
                        st.entries.pop_front();
                    }
                    st.retry_after = None;
                    st.entries.len()
                };
                self.metrics.flushed_frames.add(&[], batch_len as u64);
                tracing::info!(batch = batch_len, remaining, elapsed_ms = elapsed.as_millis() as u64, "frame batch persisted");
                Ok(FlushReport {
                    flushed: batch_len,
                    remaining,
                })
            }
            Err(e) => {
                let pending = {
                    let mut st = self.lock_state();
                    st.retry_after = Some(Instant::now() + Duration::from_millis(self.settings.retry_backoff_ms));
                    st.entries.len()
                };
                tracing::warn!(error = %e, batch = batch_len, pending, "batch flush failed, frames kept for retry");
                Err(e)
            }
        }
    }

    /// Schedule a background flush unless one is already scheduled.
    pub fn spawn_flush(self: &Arc<Self>) -> Option<JoinHandle<()>> {
        if self.flush_scheduled.swap(true, Ordering::AcqRel) {
            return None;
        }
        let this = Arc::clone(self);
        Some(tokio::spawn(async move {
            // errors are logged inside flush
            let _ = this.flush().await;
            this.flush_scheduled.store(false, Ordering::Release);
        }))
    }

    /// Periodic flush until `shutdown` flips to true. `None` when disabled.
    pub fn spawn_periodic(self: &Arc<Self>, mut shutdown: watch::Receiver<bool>) -> Option<JoinHandle<()>> {
        if self.settings.flush_interval_ms == 0 {
            return None;
        }
        let this = Arc::clone(self);
        let every = Duration::from_millis(self.settings.flush_interval_ms);

        Some(tokio::spawn(async move {
            let mut tick = tokio::time::interval(every);
            tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
            tick.tick().await;

            loop {
                tokio::select! {
                    _ = tick.tick() => {
                        if !this.is_empty() {
                            let _ = this.flush().await;
                        }
                    }
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            break;
                        }
                    }
                }
            }
            tracing::debug!("periodic flusher stopped");
        }))
    }
}
