use std::any::Any;
use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::Regex;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use thiserror::Error;

use crate::cache::CheckFailure;
use crate::models::InputError;

pub const FALLBACK_MESSAGE: &str = "An unexpected error occurred while running the query";

/// Closed set of failure categories handed to the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub enum ErrorKind {
    ValidationError,
    PermissionError,
    TableNotFound,
    NetworkError,
    QueryError,
}

impl ErrorKind {
    #[must_use]
    pub const fn http_status(self) -> u16 {
        match self {
            Self::ValidationError => 400,
            Self::PermissionError => 403,
            Self::TableNotFound => 404,
            Self::NetworkError => 503,
            Self::QueryError => 500,
        }
    }

    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::ValidationError => "validation_error",
            Self::PermissionError => "permission_error",
            Self::TableNotFound => "table_not_found",
            Self::NetworkError => "network_error",
            Self::QueryError => "query_error",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClassifyContext {
    pub query_optional: bool,
}

impl ClassifyContext {
    #[must_use]
    pub const fn optional(query_optional: bool) -> Self {
        Self { query_optional }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message}")]
pub struct ClassifiedError {
    pub kind: ErrorKind,
    pub message: String,
    pub details: BTreeMap<String, Value>,
    pub query_optional: bool,
}

impl ClassifiedError {
    #[must_use]
    pub fn new(kind: ErrorKind, message: impl Into<String>, context: ClassifyContext) -> Self {
        let mut details = BTreeMap::new();
        details.insert("query_optional".to_string(), json!(context.query_optional));
        Self {
            kind,
            message: message.into(),
            details,
            query_optional: context.query_optional,
        }
    }

    #[must_use]
    pub fn with_detail(mut self, key: impl Into<String>, value: Value) -> Self {
        self.details.insert(key.into(), value);
        self
    }

    /// A missing table behind an optional query is informational, not an alarm.
    #[must_use]
    pub fn is_soft(&self) -> bool {
        self.kind == ErrorKind::TableNotFound && self.query_optional
    }
}

struct ErrorPattern {
    kind: ErrorKind,
    regex: fn() -> &'static Regex,
}

/// Maps a failure raised while checking or running a query onto [`ErrorKind`].
#[must_use]
pub fn classify(raw: &anyhow::Error, context: ClassifyContext) -> ClassifiedError {
    for cause in raw.chain() {
        if let Some(classified) = cause.downcast_ref::<ClassifiedError>() {
            return classified.clone();
        }
        if let Some(input) = cause.downcast_ref::<InputError>() {
            return ClassifiedError::new(ErrorKind::ValidationError, input.to_string(), context);
        }
        if let Some(failure) = cause.downcast_ref::<CheckFailure>() {
            return classify_check_failure(failure, context);
        }
    }

    classify_message(&format!("{raw:#}"), context)
}

#[must_use]
pub fn classify_check_failure(failure: &CheckFailure, context: ClassifyContext) -> ClassifiedError {
    let key = failure.key();
    let table = format!("{}.{}", key.database, key.table);
    let classified = match failure {
        CheckFailure::Remote { cause, .. } => {
            let mut classified = classify(cause, context);
            classified.message = failure.to_string();
            classified
        }
        CheckFailure::Panicked { payload, .. } => panicked(payload, context),
    };

    classified
        .with_detail("host_id", json!(key.host_id))
        .with_detail("table", json!(table))
}

/// Pattern classification of an error message from the cluster or the transport.
#[must_use]
pub fn classify_message(message: &str, context: ClassifyContext) -> ClassifiedError {
    let message = message.trim();
    if message.is_empty() {
        return ClassifiedError::new(ErrorKind::QueryError, FALLBACK_MESSAGE, context);
    }

    let kind = error_pattern_catalog()
        .iter()
        .find(|pattern| (pattern.regex)().is_match(message))
        .map_or(ErrorKind::QueryError, |pattern| pattern.kind);

    let classified = ClassifiedError::new(kind, message, context);
    match (kind, extract_table_name(message)) {
        (ErrorKind::TableNotFound, Some(table)) => classified.with_detail("table", json!(table)),
        _ => classified,
    }
}

/// Panic payloads stand in for thrown non-error values: they always become a generic query error.
#[must_use]
pub fn classify_panic(payload: &(dyn Any + Send), context: ClassifyContext) -> ClassifiedError {
    panicked(&panic_payload_message(payload), context)
}

fn panicked(message: &str, context: ClassifyContext) -> ClassifiedError {
    ClassifiedError::new(ErrorKind::QueryError, FALLBACK_MESSAGE, context)
        .with_detail("panic", json!(message))
}

#[must_use]
pub fn panic_payload_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

fn extract_table_name(message: &str) -> Option<String> {
    table_name_regex()
        .captures(message)
        .and_then(|captures| captures.get(1))
        .map(|table| table.as_str().to_string())
}

/// Checked in order; the first match wins.
fn error_pattern_catalog() -> &'static [ErrorPattern] {
    static CATALOG: OnceLock<Vec<ErrorPattern>> = OnceLock::new();
    CATALOG.get_or_init(|| {
        vec![
            ErrorPattern {
                kind: ErrorKind::PermissionError,
                regex: permission_regex,
            },
            ErrorPattern {
                kind: ErrorKind::TableNotFound,
                regex: table_not_found_regex,
            },
            ErrorPattern {
                kind: ErrorKind::NetworkError,
                regex: network_regex,
            },
        ]
    })
}

fn permission_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(
            r"(?i)not enough privileges|access[_ ]denied|permission denied|authentication failed|\bREQUIRED_PASSWORD\b|\bunauthorized\b|\bforbidden\b|\bCode:\s*(?:497|516)\b",
        )
        .expect("permission regex should compile")
    })
}

fn table_not_found_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(
            r"(?i)\bUNKNOWN_(?:TABLE|DATABASE)\b|\bunknown table\b|\b(?:table|database)\b[^\n]*?\b(?:doesn't|does not) exist|\bCode:\s*(?:60|81)\b",
        )
        .expect("table not found regex should compile")
    })
}

fn network_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(
            r"(?i)connection (?:refused|reset|closed|aborted|timed out)|\bE(?:CONNREFUSED|CONNRESET|TIMEDOUT|NOTFOUND|AI_AGAIN|HOSTUNREACH)\b|getaddrinfo|name or service not known|failed to lookup address|\bdns\b|timed out|\btimeout\b|network (?:is )?unreachable|no route to host|socket hang up|broken pipe|\bCode:\s*(?:209|210)\b",
        )
        .expect("network regex should compile")
    })
}

fn table_name_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r"(?i)\btable\s+[`'\x22]?(\w+\.\w+)")
            .expect("table name regex should compile")
    })
}
