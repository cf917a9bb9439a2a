//! In-memory task store.
//!
//! One process-wide map from task id to the latest webhook payload. Entries
//! can be bounded by age and by count; with neither limit set the store grows
//! for the life of the process.
//!
//! Entries are also indexed by write order, so evicting the oldest entry and
//! purging expired ones only touch the front of that index.

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::domain::foundation::TaskId;
use crate::domain::generation::TaskPayload;
use crate::ports::{TaskStore, TaskStoreError};

/// Retention limits. `None` disables the corresponding bound.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TaskStoreLimits {
    pub ttl: Option<Duration>,
    pub capacity: Option<usize>,
}

impl TaskStoreLimits {
    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn new(ttl: Option<Duration>, capacity: Option<usize>) -> Self {
        Self { ttl, capacity }
    }
}

#[derive(Debug, Clone)]
struct Entry {
    payload: TaskPayload,
    stored_at: Instant,
    seq: u64,
}

/// Payloads keyed by id plus an oldest-first index of write sequence numbers.
///
/// A rewrite moves the id to the back of `order`, so `order` is also sorted
/// by `stored_at`.
#[derive(Debug, Default)]
struct Entries {
    by_id: HashMap<TaskId, Entry>,
    order: BTreeMap<u64, TaskId>,
    next_seq: u64,
}

impl Entries {
    fn insert(&mut self, task_id: TaskId, payload: TaskPayload, now: Instant) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.order.insert(seq, task_id.clone());
        let previous = self.by_id.insert(
            task_id,
            Entry {
                payload,
                stored_at: now,
                seq,
            },
        );
        if let Some(previous) = previous {
            self.order.remove(&previous.seq);
        }
    }

    fn pop_oldest(&mut self) -> Option<TaskId> {
        let (_, task_id) = self.order.pop_first()?;
        self.by_id.remove(&task_id);
        Some(task_id)
    }

    fn oldest(&self) -> Option<&Entry> {
        let (_, task_id) = self.order.first_key_value()?;
        self.by_id.get(task_id)
    }
}

#[derive(Debug, Clone)]
pub struct InMemoryTaskStore {
    entries: Arc<RwLock<Entries>>,
    limits: TaskStoreLimits,
}

impl InMemoryTaskStore {
    pub fn new(limits: TaskStoreLimits) -> Self {
        Self {
            entries: Arc::new(RwLock::new(Entries::default())),
            limits,
        }
    }

    pub fn unbounded() -> Self {
        Self::new(TaskStoreLimits::unbounded())
    }

    fn is_expired(&self, entry: &Entry, now: Instant) -> bool {
        match self.limits.ttl {
            Some(ttl) => now.saturating_duration_since(entry.stored_at) >= ttl,
            None => false,
        }
    }

    /// Purges expired entries every `interval` until `shutdown` fires.
    pub fn spawn_reaper(&self, interval: Duration, shutdown: CancellationToken) -> JoinHandle<()> {
        let store = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => {
                        tracing::debug!("Task store reaper stopping");
                        break;
                    }
                    _ = ticker.tick() => {
                        match store.purge_expired().await {
                            Ok(0) => {}
                            Ok(removed) => tracing::debug!(removed, "Purged expired tasks"),
                            Err(e) => tracing::warn!(error = %e, "Task store purge failed"),
                        }
                    }
                }
            }
        })
    }
}

impl Default for InMemoryTaskStore {
    fn default() -> Self {
        Self::unbounded()
    }
}

#[async_trait]
impl TaskStore for InMemoryTaskStore {
    async fn put(&self, task_id: TaskId, payload: TaskPayload) -> Result<(), TaskStoreError> {
        let now = Instant::now();
        let mut entries = self.entries.write().await;

        if let Some(capacity) = self.limits.capacity {
            if !entries.by_id.contains_key(&task_id) && entries.by_id.len() >= capacity.max(1) {
                if let Some(oldest) = entries.pop_oldest() {
                    tracing::debug!(task_id = %oldest, "Evicted oldest task at capacity");
                }
            }
        }

        entries.insert(task_id, payload, now);
        Ok(())
    }

    async fn get(&self, task_id: &TaskId) -> Result<Option<TaskPayload>, TaskStoreError> {
        let now = Instant::now();
        let entries = self.entries.read().await;
        Ok(entries
            .by_id
            .get(task_id)
            .filter(|entry| !self.is_expired(entry, now))
            .map(|entry| entry.payload.clone()))
    }

    async fn len(&self) -> Result<usize, TaskStoreError> {
        Ok(self.entries.read().await.by_id.len())
    }

    async fn purge_expired(&self) -> Result<usize, TaskStoreError> {
        if self.limits.ttl.is_none() {
            return Ok(0);
        }
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        let mut removed = 0;
        while entries
            .oldest()
            .is_some_and(|entry| self.is_expired(entry, now))
        {
            entries.pop_oldest();
            removed += 1;
        }
        Ok(removed)
    }
}
