#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use anyhow::{Result, bail};
use async_trait::async_trait;
use querycompat::cache::ExistenceCheck;
use querycompat::config::CacheSettings;
use querycompat::models::HostId;
use tokio::sync::Notify;

/// Scripted existence check: answers from a table set and counts every call per key.
#[derive(Debug, Default)]
pub struct ScriptedCheck {
    tables: Mutex<BTreeSet<(u64, String)>>,
    failing: Mutex<BTreeSet<(u64, String)>>,
    calls: Mutex<BTreeMap<String, usize>>,
    total: AtomicUsize,
}

impl ScriptedCheck {
    pub fn with_tables<'a>(host_id: u64, tables: impl IntoIterator<Item = &'a str>) -> Self {
        let check = Self::default();
        for table in tables {
            check.add_table(host_id, table);
        }
        check
    }

    pub fn add_table(&self, host_id: u64, qualified: &str) {
        lock(&self.tables).insert((host_id, qualified.to_string()));
    }

    pub fn remove_table(&self, host_id: u64, qualified: &str) {
        lock(&self.tables).remove(&(host_id, qualified.to_string()));
    }

    pub fn fail_on(&self, host_id: u64, qualified: &str) {
        lock(&self.failing).insert((host_id, qualified.to_string()));
    }

    pub fn recover(&self, host_id: u64, qualified: &str) {
        lock(&self.failing).remove(&(host_id, qualified.to_string()));
    }

    pub fn total_calls(&self) -> usize {
        self.total.load(Ordering::SeqCst)
    }

    pub fn calls_for(&self, host_id: u64, qualified: &str) -> usize {
        lock(&self.calls)
            .get(&format!("{host_id}/{qualified}"))
            .copied()
            .unwrap_or(0)
    }
}

#[async_trait]
impl ExistenceCheck for ScriptedCheck {
    async fn table_exists(&self, host_id: HostId, database: &str, table: &str) -> Result<bool> {
        let qualified = format!("{database}.{table}");
        self.total.fetch_add(1, Ordering::SeqCst);
        *lock(&self.calls)
            .entry(format!("{host_id}/{qualified}"))
            .or_default() += 1;

        let key = (host_id.get(), qualified);
        if lock(&self.failing).contains(&key) {
            bail!("Connection refused while checking {} on host {host_id}", key.1);
        }
        Ok(lock(&self.tables).contains(&key))
    }
}

/// Existence check that blocks every call until [`GatedCheck::release`] is called.
#[derive(Debug)]
pub struct GatedCheck {
    gate: Notify,
    calls: AtomicUsize,
    answer: Option<bool>,
}

impl GatedCheck {
    pub fn new(answer: bool) -> Self {
        Self {
            gate: Notify::new(),
            calls: AtomicUsize::new(0),
            answer: Some(answer),
        }
    }

    /// Every released call fails with a refused connection.
    pub fn failing() -> Self {
        Self {
            gate: Notify::new(),
            calls: AtomicUsize::new(0),
            answer: None,
        }
    }

    pub fn release(&self) {
        self.gate.notify_one();
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ExistenceCheck for GatedCheck {
    async fn table_exists(&self, _host_id: HostId, _database: &str, _table: &str) -> Result<bool> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.gate.notified().await;
        match self.answer {
            Some(answer) => Ok(answer),
            None => bail!("Connection refused"),
        }
    }
}

#[derive(Debug, Default)]
pub struct PanickingCheck;

#[async_trait]
impl ExistenceCheck for PanickingCheck {
    async fn table_exists(&self, _host_id: HostId, _database: &str, table: &str) -> Result<bool> {
        panic!("driver exploded while checking {table}");
    }
}

pub fn settings(ttl_secs: u64, max_entries: usize) -> CacheSettings {
    CacheSettings::new(Duration::from_secs(ttl_secs), max_entries)
        .expect("test cache settings should be valid")
}

/// Polls `condition` until it holds, failing the test after five seconds.
pub async fn wait_until(mut condition: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    })
    .await
    .expect("condition should hold within five seconds");
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
