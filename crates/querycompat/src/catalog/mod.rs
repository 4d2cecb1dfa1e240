use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::cache::ExistenceCheck;
use crate::models::{HostId, InputError};

/// What one cluster reports about itself in a catalog file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HostCatalog {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(default)]
    pub tables: BTreeSet<String>,

    #[serde(default)]
    pub unreachable: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct CatalogFile {
    hosts: BTreeMap<String, HostCatalog>,
}

/// Existence checks answered from a snapshot of each cluster's `system.tables`.
///
/// Hosts marked `unreachable` fail the way a refused connection would, so callers see the same
/// failure path as against a live cluster.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StaticCatalog {
    hosts: BTreeMap<HostId, HostCatalog>,
}

impl StaticCatalog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_host(mut self, host_id: HostId, host: HostCatalog) -> Self {
        self.hosts.insert(host_id, host);
        self
    }

    pub fn from_json_str(raw: &str) -> Result<Self> {
        let file = serde_json::from_str::<CatalogFile>(raw)
            .context("catalog must be a JSON object with a `hosts` map")?;

        let mut hosts = BTreeMap::new();
        for (raw_id, host) in file.hosts {
            let host_id = raw_id.parse::<HostId>()?;
            if hosts.insert(host_id, host).is_some() {
                bail!("catalog lists host {host_id} more than once");
            }
        }

        Ok(Self { hosts })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read catalog: {}", path.display()))?;
        Self::from_json_str(&raw)
            .with_context(|| format!("failed to load catalog: {}", path.display()))
    }

    pub fn host(&self, host_id: HostId) -> Result<&HostCatalog, InputError> {
        self.hosts
            .get(&host_id)
            .ok_or_else(|| InputError::UnknownHost {
                host_id: host_id.to_string(),
            })
    }

    /// The version string the cluster reports, if the catalog recorded one.
    pub fn reported_version(&self, host_id: HostId) -> Result<Option<&str>, InputError> {
        Ok(self.host(host_id)?.version.as_deref())
    }
}

#[async_trait]
impl ExistenceCheck for StaticCatalog {
    async fn table_exists(&self, host_id: HostId, database: &str, table: &str) -> Result<bool> {
        let host = self.host(host_id)?;
        if host.unreachable {
            bail!("Connection refused while checking {database}.{table} on host {host_id}");
        }

        Ok(host.tables.contains(&format!("{database}.{table}")))
    }
}
