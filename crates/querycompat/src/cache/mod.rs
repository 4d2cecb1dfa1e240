//! Time-bounded memo of table existence per cluster.
//!
//! Each [`TableKey`] moves between three states: absent, fresh (`now < expires_at`) and stale.
//! Fresh entries are served without I/O. Absent or stale keys trigger one call to the
//! [`ExistenceCheck`] primitive; callers that arrive while that call is running wait on the same
//! shared future instead of issuing their own. Both positive and negative answers are kept for the
//! configured TTL. Failures are handed to every waiting caller and are never stored.
//!
//! Entries and in-flight checks live in sharded maps, so keys on different shards never contend and
//! no lock is held across an await point.

mod clock;

use std::fmt::{Display, Formatter};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use serde::Serialize;
use thiserror::Error;

pub use clock::{Clock, ManualClock, SystemClock};

use crate::classify::panic_payload_message;
use crate::config::CacheSettings;
use crate::models::HostId;

/// Remote probe answering "does `database.table` exist on this cluster?".
///
/// Implementations own their timeouts and retries and must be safe to call repeatedly with the same
/// arguments.
#[async_trait]
pub trait ExistenceCheck: Send + Sync + 'static {
    async fn table_exists(
        &self,
        host_id: HostId,
        database: &str,
        table: &str,
    ) -> anyhow::Result<bool>;
}

/// Cache identity. Comparison is exact and case-sensitive on all three parts.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TableKey {
    pub host_id: HostId,
    pub database: String,
    pub table: String,
}

impl TableKey {
    #[must_use]
    pub fn new(host_id: HostId, database: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            host_id,
            database: database.into(),
            table: table.into(),
        }
    }
}

impl Display for TableKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "host {} table {}.{}", self.host_id, self.database, self.table)
    }
}

/// Failure of one existence check, shared by every caller coalesced onto it.
#[derive(Debug, Clone, Error)]
pub enum CheckFailure {
    #[error("existence check for {key} failed: {cause:#}")]
    Remote {
        key: TableKey,
        cause: Arc<anyhow::Error>,
    },

    #[error("existence check for {key} panicked: {payload}")]
    Panicked { key: TableKey, payload: String },
}

impl CheckFailure {
    #[must_use]
    pub fn key(&self) -> &TableKey {
        match self {
            Self::Remote { key, .. } | Self::Panicked { key, .. } => key,
        }
    }

    /// The primitive's own error, when it returned one instead of panicking.
    #[must_use]
    pub fn cause(&self) -> Option<&anyhow::Error> {
        match self {
            Self::Remote { cause, .. } => Some(cause.as_ref()),
            Self::Panicked { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub coalesced: u64,
    pub remote_checks: u64,
    pub failures: u64,
    pub evictions: u64,
    pub entry_count: usize,
}

#[derive(Debug, Clone, Copy)]
struct CacheEntry {
    exists: bool,
    expires_at: Instant,
    sequence: u64,
}

impl CacheEntry {
    fn is_fresh(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

#[derive(Debug, Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    coalesced: AtomicU64,
    remote_checks: AtomicU64,
    failures: AtomicU64,
    evictions: AtomicU64,
    sequence: AtomicU64,
}

impl Counters {
    fn bump(counter: &AtomicU64) -> u64 {
        counter.fetch_add(1, Ordering::Relaxed)
    }
}

type PendingCheck = Shared<BoxFuture<'static, Result<bool, CheckFailure>>>;

struct CacheInner {
    checker: Arc<dyn ExistenceCheck>,
    clock: Arc<dyn Clock>,
    settings: CacheSettings,
    entries: DashMap<TableKey, CacheEntry>,
    in_flight: DashMap<TableKey, PendingCheck>,
    counters: Counters,
}

/// Shared, cloneable handle to one existence cache.
#[derive(Clone)]
pub struct TableExistenceCache {
    inner: Arc<CacheInner>,
}

impl std::fmt::Debug for TableExistenceCache {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TableExistenceCache")
            .field("settings", &self.inner.settings)
            .field("entries", &self.inner.entries.len())
            .field("in_flight", &self.inner.in_flight.len())
            .finish()
    }
}

impl TableExistenceCache {
    #[must_use]
    pub fn new(checker: Arc<dyn ExistenceCheck>, settings: CacheSettings) -> Self {
        Self::with_clock(checker, settings, Arc::new(SystemClock))
    }

    #[must_use]
    pub fn with_clock(
        checker: Arc<dyn ExistenceCheck>,
        settings: CacheSettings,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            inner: Arc::new(CacheInner {
                checker,
                clock,
                settings,
                entries: DashMap::new(),
                in_flight: DashMap::new(),
                counters: Counters::default(),
            }),
        }
    }

    #[must_use]
    pub fn settings(&self) -> CacheSettings {
        self.inner.settings
    }

    /// Answers from a fresh entry, or joins (or starts) the single in-flight check for the key.
    ///
    /// A started check is also handed to the ambient Tokio runtime, so it runs to completion and
    /// fills the cache even when every caller waiting on it is dropped.
    pub async fn check_table_exists(
        &self,
        host_id: HostId,
        database: &str,
        table: &str,
    ) -> Result<bool, CheckFailure> {
        let key = TableKey::new(host_id, database, table);
        if let Some(exists) = self.inner.fresh(&key) {
            Counters::bump(&self.inner.counters.hits);
            tracing::trace!(%key, exists, "table existence cache hit");
            return Ok(exists);
        }

        let (pending, started) = match self.inner.in_flight.entry(key.clone()) {
            Entry::Occupied(occupied) => {
                Counters::bump(&self.inner.counters.coalesced);
                tracing::trace!(%key, "joining in-flight table existence check");
                (occupied.get().clone(), false)
            }
            Entry::Vacant(vacant) => {
                // A check may have finished between the first lookup and taking the slot.
                if let Some(exists) = self.inner.fresh(&key) {
                    Counters::bump(&self.inner.counters.hits);
                    return Ok(exists);
                }

                Counters::bump(&self.inner.counters.misses);
                let pending = CacheInner::start_check(Arc::clone(&self.inner), key);
                vacant.insert(pending.clone());
                (pending, true)
            }
        };

        if started && let Ok(runtime) = tokio::runtime::Handle::try_current() {
            runtime.spawn(pending.clone());
        }

        pending.await
    }

    /// Drops every cached answer for one cluster. In-flight checks still land when they finish.
    pub fn invalidate_host(&self, host_id: HostId) {
        self.inner.entries.retain(|key, _| key.host_id != host_id);
    }

    pub fn clear(&self) {
        self.inner.entries.clear();
    }

    #[must_use]
    pub fn stats(&self) -> CacheStats {
        let counters = &self.inner.counters;
        CacheStats {
            hits: counters.hits.load(Ordering::Relaxed),
            misses: counters.misses.load(Ordering::Relaxed),
            coalesced: counters.coalesced.load(Ordering::Relaxed),
            remote_checks: counters.remote_checks.load(Ordering::Relaxed),
            failures: counters.failures.load(Ordering::Relaxed),
            evictions: counters.evictions.load(Ordering::Relaxed),
            entry_count: self.inner.entries.len(),
        }
    }
}

impl CacheInner {
    /// Stale entries are removed on sight.
    fn fresh(&self, key: &TableKey) -> Option<bool> {
        let now = self.clock.now();
        let cached = self.entries.get(key).map(|entry| *entry.value());
        match cached {
            Some(entry) if entry.is_fresh(now) => Some(entry.exists),
            Some(_) => {
                self.entries.remove_if(key, |_, entry| !entry.is_fresh(now));
                None
            }
            None => None,
        }
    }

    fn start_check(inner: Arc<Self>, key: TableKey) -> PendingCheck {
        async move {
            Counters::bump(&inner.counters.remote_checks);
            tracing::debug!(%key, "checking table existence on cluster");

            let outcome = AssertUnwindSafe(inner.checker.table_exists(
                key.host_id,
                &key.database,
                &key.table,
            ))
            .catch_unwind()
            .await;

            let result = match outcome {
                Ok(Ok(exists)) => {
                    tracing::debug!(%key, exists, "table existence resolved");
                    inner.store(key.clone(), exists);
                    Ok(exists)
                }
                Ok(Err(error)) => {
                    Counters::bump(&inner.counters.failures);
                    let message = format!("{error:#}");
                    tracing::warn!(%key, error = %message, "table existence check failed");
                    Err(CheckFailure::Remote {
                        key: key.clone(),
                        cause: Arc::new(error),
                    })
                }
                Err(payload) => {
                    Counters::bump(&inner.counters.failures);
                    let payload = panic_payload_message(payload.as_ref());
                    tracing::error!(%key, payload = %payload, "table existence check panicked");
                    Err(CheckFailure::Panicked {
                        key: key.clone(),
                        payload,
                    })
                }
            };

            inner.in_flight.remove(&key);
            result
        }
        .boxed()
        .shared()
    }

    fn store(&self, key: TableKey, exists: bool) {
        let now = self.clock.now();
        let Some(expires_at) = now.checked_add(self.settings.ttl) else {
            tracing::warn!(
                %key,
                ttl = ?self.settings.ttl,
                "ttl overflows the clock; answer not cached"
            );
            return;
        };
        let entry = CacheEntry {
            exists,
            expires_at,
            sequence: Counters::bump(&self.counters.sequence),
        };
        self.entries.insert(key, entry);

        if self.entries.len() > self.settings.max_entries {
            self.evict(now);
        }
    }

    /// Purges stale entries, then the oldest live ones until the cache is back within capacity.
    ///
    /// Each pass is linear in the entry count and only runs once the cache is over capacity. That is
    /// cheap at the default capacity; a much larger one would want an ordered index on `sequence`.
    fn evict(&self, now: Instant) {
        self.entries.retain(|_, entry| entry.is_fresh(now));

        while self.entries.len() > self.settings.max_entries {
            let oldest = self
                .entries
                .iter()
                .min_by_key(|entry| entry.value().sequence)
                .map(|entry| entry.key().clone());
            let Some(oldest) = oldest else {
                break;
            };

            if self.entries.remove(&oldest).is_some() {
                Counters::bump(&self.counters.evictions);
                tracing::trace!(key = %oldest, "evicted table existence entry");
            }
        }
    }
}
