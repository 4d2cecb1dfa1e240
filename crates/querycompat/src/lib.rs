#![forbid(unsafe_code)]

pub mod cache;
pub mod catalog;
pub mod classify;
pub mod cli;
pub mod compat;
pub mod config;
pub mod dependencies;
pub mod models;
pub mod registry;
pub mod utils;
pub mod version;

pub use cache::{CheckFailure, ExistenceCheck, TableExistenceCache, TableKey};
pub use classify::{ClassifiedError, ClassifyContext, ErrorKind, classify};
pub use cli::app::{Cli, Command};
pub use compat::{QueryCompatibilityService, Resolution, ValidationResult};
pub use dependencies::resolve_dependencies;
pub use models::{HostId, QueryDefinition, Sql, SqlVariant};
pub use version::{ParsedVersion, parse_version, select_versioned_sql};
