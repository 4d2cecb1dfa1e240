use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Args;
use futures::future::join_all;
use serde_json::{Value, json};

use super::{command_failure, print_envelope};
use crate::cache::TableExistenceCache;
use crate::catalog::StaticCatalog;
use crate::compat::{QueryCompatibilityService, Resolution};
use crate::config::{CacheSettings, RuntimePaths};
use crate::models::{HostId, ResponseEnvelope};
use crate::registry::QueryRegistry;
use crate::version::parse_version;

#[derive(Debug, Clone, Args)]
pub struct ResolveArgs {
    #[arg(long, value_name = "PATH")]
    pub registry: PathBuf,

    #[arg(long, value_name = "PATH")]
    pub catalog: PathBuf,

    #[arg(long, value_name = "ID")]
    pub host_id: String,

    /// Overrides the version recorded for the host in the catalog.
    #[arg(long, value_name = "VERSION")]
    pub server_version: Option<String>,

    #[arg(long = "query", value_name = "NAME")]
    pub queries: Vec<String>,
}

pub async fn run(
    args: &ResolveArgs,
    runtime_paths: &RuntimePaths,
    cache_settings: CacheSettings,
) -> Result<()> {
    let envelope = build_envelope(args, runtime_paths, cache_settings)
        .await
        .map_err(|error| command_failure("resolve", &error))?;
    print_envelope("resolve", &envelope)
}

async fn build_envelope(
    args: &ResolveArgs,
    runtime_paths: &RuntimePaths,
    cache_settings: CacheSettings,
) -> Result<ResponseEnvelope> {
    let host_id = args.host_id.parse::<HostId>()?;
    let registry = QueryRegistry::load(&runtime_paths.resolve_input(&args.registry)?)?;
    let catalog = Arc::new(StaticCatalog::load(
        &runtime_paths.resolve_input(&args.catalog)?,
    )?);

    // Unknown hosts are rejected even when the version comes from the command line.
    catalog.host(host_id)?;
    let reported_version = match &args.server_version {
        Some(version) => Some(version.clone()),
        None => catalog.reported_version(host_id)?.map(str::to_string),
    };
    let parsed_version = parse_version(reported_version.as_deref());
    let queries = registry.select(&args.queries)?;

    let service =
        QueryCompatibilityService::new(TableExistenceCache::new(catalog, cache_settings));
    let resolutions = join_all(
        queries
            .iter()
            .map(|query| service.resolve(query, host_id, parsed_version.as_ref())),
    )
    .await;

    let skipped = resolutions.iter().filter(|resolution| resolution.is_skip()).count();
    let rows = queries
        .iter()
        .zip(&resolutions)
        .map(|(query, resolution)| resolution_row(&query.name, query.optional, resolution))
        .collect::<Vec<Value>>();

    let mut envelope = ResponseEnvelope::ok(
        "resolve",
        json!({
            "host_id": host_id,
            "reported_version": reported_version,
            "parsed_version": parsed_version,
            "queries": rows,
        }),
    )
    .with_meta("query_count", json!(queries.len()))
    .with_meta("skipped_count", json!(skipped))
    .with_meta("cache", json!(service.cache().stats()));

    if reported_version.is_some() && parsed_version.is_none() {
        envelope = envelope.with_warning(
            "version_unparsed",
            "server version could not be parsed; using the oldest variant of every query",
        );
    }
    for warning in registry.warnings() {
        envelope = envelope
            .with_warning(&warning.code, &warning.message)
            .with_warning_details(json!({ "query": warning.query }));
    }

    Ok(envelope)
}

fn resolution_row(name: &str, optional: bool, resolution: &Resolution) -> Value {
    let mut row = json!({ "query": name, "optional": optional });
    if let (Value::Object(row), Value::Object(fields)) = (&mut row, json!(resolution)) {
        row.extend(fields);
    }
    row
}
