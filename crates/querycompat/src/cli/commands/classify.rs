use anyhow::Result;
use clap::Args;
use serde_json::json;

use super::print_envelope;
use crate::classify::{ClassifyContext, classify_message};
use crate::models::{ResponseEnvelope, ResponseError};

#[derive(Debug, Clone, Args)]
pub struct ClassifyArgs {
    #[arg(long, value_name = "TEXT")]
    pub message: String,

    #[arg(long, default_value_t = false)]
    pub optional: bool,
}

pub fn run(args: &ClassifyArgs) -> Result<()> {
    let classified = classify_message(&args.message, ClassifyContext::optional(args.optional));
    let envelope = ResponseEnvelope::ok("classify", json!(ResponseError::from(&classified)));
    print_envelope("classify", &envelope)
}
