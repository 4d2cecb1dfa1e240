use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use serde_json::json;

use super::{command_failure, print_envelope};
use crate::config::RuntimePaths;
use crate::models::ResponseEnvelope;
use crate::registry::QueryRegistry;
use crate::version::{parse_version, select_versioned_sql};

#[derive(Debug, Clone, Args)]
pub struct SelectArgs {
    #[arg(long, value_name = "PATH")]
    pub registry: PathBuf,

    #[arg(long, value_name = "NAME")]
    pub query: String,

    #[arg(long, value_name = "VERSION")]
    pub server_version: Option<String>,
}

pub fn run(args: &SelectArgs, runtime_paths: &RuntimePaths) -> Result<()> {
    let envelope = build_envelope(args, runtime_paths)
        .map_err(|error| command_failure("select", &error))?;
    print_envelope("select", &envelope)
}

fn build_envelope(args: &SelectArgs, runtime_paths: &RuntimePaths) -> Result<ResponseEnvelope> {
    let registry = QueryRegistry::load(&runtime_paths.resolve_input(&args.registry)?)?;
    let query = registry.get(&args.query)?;
    let parsed_version = parse_version(args.server_version.as_deref());
    let sql = select_versioned_sql(&query.sql, parsed_version.as_ref());

    let mut envelope = ResponseEnvelope::ok(
        "select",
        json!({
            "query": query.name,
            "optional": query.optional,
            "reported_version": args.server_version,
            "parsed_version": parsed_version,
            "sql": sql,
        }),
    );
    if args.server_version.is_some() && parsed_version.is_none() {
        envelope = envelope.with_warning(
            "version_unparsed",
            "server version could not be parsed; using the oldest variant",
        );
    }

    Ok(envelope)
}
