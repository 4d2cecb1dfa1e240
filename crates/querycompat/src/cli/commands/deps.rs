use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use serde_json::{Value, json};

use super::{command_failure, print_envelope};
use crate::config::RuntimePaths;
use crate::dependencies::resolve_dependencies;
use crate::models::ResponseEnvelope;
use crate::registry::QueryRegistry;

#[derive(Debug, Clone, Args)]
pub struct DepsArgs {
    #[arg(long, value_name = "PATH")]
    pub registry: PathBuf,

    #[arg(long = "query", value_name = "NAME")]
    pub queries: Vec<String>,
}

pub fn run(args: &DepsArgs, runtime_paths: &RuntimePaths) -> Result<()> {
    let envelope =
        build_envelope(args, runtime_paths).map_err(|error| command_failure("deps", &error))?;
    print_envelope("deps", &envelope)
}

fn build_envelope(args: &DepsArgs, runtime_paths: &RuntimePaths) -> Result<ResponseEnvelope> {
    let registry = QueryRegistry::load(&runtime_paths.resolve_input(&args.registry)?)?;
    let queries = registry.select(&args.queries)?;

    let rows = queries
        .iter()
        .map(|query| {
            let source = if query.table_check.is_some() {
                "table_check"
            } else {
                "sql_scan"
            };
            json!({
                "query": query.name,
                "optional": query.optional,
                "source": source,
                "tables": resolve_dependencies(query),
            })
        })
        .collect::<Vec<Value>>();

    Ok(ResponseEnvelope::ok("deps", json!({ "queries": rows }))
        .with_meta("query_count", json!(queries.len())))
}
