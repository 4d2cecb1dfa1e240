use std::path::{Component, Path, PathBuf};
use std::time::Duration;

use anyhow::{Result, bail};
use serde::Serialize;

pub const DEFAULT_CACHE_TTL_SECS: u64 = 300;
pub const DEFAULT_CACHE_MAX_ENTRIES: usize = 1_000;
/// Upper bound on the cache TTL (30 days). Keeps `now + ttl` representable as an `Instant`.
pub const MAX_CACHE_TTL_SECS: u64 = 30 * 24 * 60 * 60;

pub const CACHE_TTL_ENV_VAR: &str = "QUERYCOMPAT_CACHE_TTL_SECS";
pub const CACHE_MAX_ENTRIES_ENV_VAR: &str = "QUERYCOMPAT_CACHE_MAX_ENTRIES";

/// Lifetime and capacity of the table existence cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CacheSettings {
    pub ttl: Duration,
    pub max_entries: usize,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(DEFAULT_CACHE_TTL_SECS),
            max_entries: DEFAULT_CACHE_MAX_ENTRIES,
        }
    }
}

impl CacheSettings {
    pub fn new(ttl: Duration, max_entries: usize) -> Result<Self> {
        if ttl.is_zero() {
            bail!("cache ttl must be greater than zero");
        }
        if ttl > Duration::from_secs(MAX_CACHE_TTL_SECS) {
            bail!(
                "cache ttl must be at most {MAX_CACHE_TTL_SECS} seconds, got {}",
                ttl.as_secs()
            );
        }
        if max_entries == 0 {
            bail!("cache max_entries must be greater than zero");
        }

        Ok(Self { ttl, max_entries })
    }

    /// Applies optional overrides (flags or environment) on top of the defaults.
    pub fn resolve(ttl_secs: Option<u64>, max_entries: Option<usize>) -> Result<Self> {
        let defaults = Self::default();
        Self::new(
            ttl_secs.map_or(defaults.ttl, Duration::from_secs),
            max_entries.unwrap_or(defaults.max_entries),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimePaths {
    pub home_dir: PathBuf,
    pub cwd: PathBuf,
}

impl RuntimePaths {
    /// Resolves a user-supplied path: `~` against the home dir, relative paths against the cwd.
    pub fn resolve_input(&self, path: &Path) -> Result<PathBuf> {
        resolve_user_path(path, &self.home_dir, &self.cwd)
    }
}

pub fn resolve_runtime_paths(home_dir: &Path, cwd: &Path) -> Result<RuntimePaths> {
    if !home_dir.is_absolute() {
        bail!("home_dir must be absolute: {}", home_dir.display());
    }
    if !cwd.is_absolute() {
        bail!("cwd must be absolute: {}", cwd.display());
    }

    Ok(RuntimePaths {
        home_dir: normalize_lexical(home_dir),
        cwd: normalize_lexical(cwd),
    })
}

fn resolve_user_path(path: &Path, home_dir: &Path, cwd: &Path) -> Result<PathBuf> {
    let expanded = expand_tilde(path, home_dir)?;
    let resolved = if expanded.is_absolute() {
        expanded
    } else {
        cwd.join(expanded)
    };

    Ok(normalize_lexical(&resolved))
}

fn expand_tilde(path: &Path, home_dir: &Path) -> Result<PathBuf> {
    let mut components = path.components();
    match components.next() {
        Some(Component::Normal(first)) if first == "~" => {
            let mut expanded = home_dir.to_path_buf();
            for component in components {
                expanded.push(component.as_os_str());
            }
            Ok(expanded)
        }
        Some(Component::Normal(first))
            if first
                .to_str()
                .is_some_and(|segment| segment.starts_with('~')) =>
        {
            bail!(
                "unsupported home expansion syntax (only `~` and `~/...` are supported): {}",
                path.display()
            )
        }
        _ => Ok(path.to_path_buf()),
    }
}

fn normalize_lexical(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();

    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !normalized.pop() {
                    normalized.push(component.as_os_str());
                }
            }
            _ => normalized.push(component.as_os_str()),
        }
    }

    normalized
}
