use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::classify::{ClassifiedError, ErrorKind};
use crate::utils::time::generated_at_utc;

pub const RESPONSE_ENVELOPE_SCHEMA_VERSION: &str = "querycompat.envelope.v1";

pub type ResponseMeta = BTreeMap<String, Value>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseWarning {
    pub code: String,
    pub message: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

/// Wire form of a [`ClassifiedError`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseError {
    pub kind: ErrorKind,
    pub code: String,
    pub http_status: u16,
    pub message: String,
    pub soft: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl From<&ClassifiedError> for ResponseError {
    fn from(error: &ClassifiedError) -> Self {
        let details = (!error.details.is_empty()).then(|| json!(error.details));
        Self {
            kind: error.kind,
            code: error.kind.code().to_string(),
            http_status: error.kind.http_status(),
            message: error.message.clone(),
            soft: error.is_soft(),
            details,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    pub ok: bool,
    pub command: String,
    pub generated_at_utc: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,

    pub meta: ResponseMeta,
    pub warnings: Vec<ResponseWarning>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ResponseError>,
}

impl ResponseEnvelope {
    #[must_use]
    pub fn ok(command: impl Into<String>, data: Value) -> Self {
        Self::base(command, true).with_data(data)
    }

    #[must_use]
    pub fn failure(command: impl Into<String>, error: &ClassifiedError) -> Self {
        let mut envelope = Self::base(command, false);
        envelope.error = Some(ResponseError::from(error));
        envelope
    }

    fn base(command: impl Into<String>, ok: bool) -> Self {
        let mut meta = ResponseMeta::new();
        meta.insert(
            "schema_version".to_string(),
            json!(RESPONSE_ENVELOPE_SCHEMA_VERSION),
        );

        Self {
            ok,
            command: command.into(),
            generated_at_utc: generated_at_utc(),
            data: None,
            meta,
            warnings: Vec::new(),
            error: None,
        }
    }

    #[must_use]
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    #[must_use]
    pub fn with_meta(mut self, key: impl Into<String>, value: Value) -> Self {
        self.meta.insert(key.into(), value);
        self
    }

    #[must_use]
    pub fn with_warning(mut self, code: impl Into<String>, message: impl Into<String>) -> Self {
        self.warnings.push(ResponseWarning {
            code: code.into(),
            message: message.into(),
            details: None,
        });
        self
    }

    #[must_use]
    pub fn with_warning_details(mut self, details: Value) -> Self {
        if let Some(last_warning) = self.warnings.last_mut() {
            last_warning.details = Some(details);
        }
        self
    }
}

/// Command failure whose display form is the JSON envelope printed by the binary.
#[derive(Debug, Clone)]
pub struct CommandFailure {
    envelope: ResponseEnvelope,
}

impl CommandFailure {
    #[must_use]
    pub fn new(command: impl Into<String>, error: &ClassifiedError) -> Self {
        Self {
            envelope: ResponseEnvelope::failure(command, error),
        }
    }

    #[must_use]
    pub fn envelope(&self) -> &ResponseEnvelope {
        &self.envelope
    }

    #[must_use]
    pub fn kind(&self) -> Option<ErrorKind> {
        self.envelope.error.as_ref().map(|error| error.kind)
    }
}

impl Display for CommandFailure {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match serde_json::to_string(&self.envelope) {
            Ok(encoded) => f.write_str(&encoded),
            Err(_) => f.write_str("response envelope serialization failure"),
        }
    }
}

impl std::error::Error for CommandFailure {}
