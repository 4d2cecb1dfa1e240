use anyhow::Result;
use clap::Args;
use serde_json::json;

use super::print_envelope;
use crate::models::ResponseEnvelope;

#[derive(Debug, Clone, Args)]
pub struct SchemaArgs {}

pub fn run(_args: &SchemaArgs) -> Result<()> {
    let envelope = ResponseEnvelope::ok("schema", crate::registry::json_schema())
        .with_meta("format", json!("query-registry"));
    print_envelope("schema", &envelope)
}
