pub mod classify;
pub mod deps;
pub mod resolve;
pub mod schema;
pub mod select;

use anyhow::{Error, Result};

use crate::classify::{ClassifyContext, classify};
use crate::models::{CommandFailure, ResponseEnvelope};

/// Wraps any failure of `command` into a classified JSON envelope error.
pub(crate) fn command_failure(command: &str, error: &Error) -> Error {
    let classified = classify(error, ClassifyContext::default());
    Error::new(CommandFailure::new(command, &classified))
}

pub(crate) fn print_envelope(command: &str, envelope: &ResponseEnvelope) -> Result<()> {
    let encoded = serde_json::to_string(envelope)
        .map_err(|error| command_failure(command, &Error::new(error)))?;
    println!("{encoded}");
    Ok(())
}
