//! Decides, per cluster, which SQL a monitoring query runs and whether it should run at all.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::cache::{CheckFailure, TableExistenceCache};
use crate::classify::{ClassifiedError, ClassifyContext, classify_check_failure};
use crate::dependencies::{DependencyResolver, PatternDependencyResolver, TableRef};
use crate::models::{HostId, QueryDefinition};
use crate::version::{ParsedVersion, select_versioned_sql};

/// Outcome of [`QueryCompatibilityService::resolve`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Resolution {
    Proceed { sql: String },
    Skip { missing_tables: Vec<String> },
}

impl Resolution {
    #[must_use]
    pub fn sql(&self) -> Option<&str> {
        match self {
            Self::Proceed { sql } => Some(sql),
            Self::Skip { .. } => None,
        }
    }

    #[must_use]
    pub fn is_skip(&self) -> bool {
        matches!(self, Self::Skip { .. })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub should_proceed: bool,
    pub missing_tables: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub struct QueryCompatibilityService {
    cache: TableExistenceCache,
    resolver: Arc<dyn DependencyResolver>,
}

impl std::fmt::Debug for QueryCompatibilityService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryCompatibilityService")
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Default)]
struct DependencyReport {
    missing_tables: Vec<String>,
    failures: Vec<CheckFailure>,
}

impl QueryCompatibilityService {
    #[must_use]
    pub fn new(cache: TableExistenceCache) -> Self {
        Self::with_resolver(cache, Arc::new(PatternDependencyResolver))
    }

    #[must_use]
    pub fn with_resolver(cache: TableExistenceCache, resolver: Arc<dyn DependencyResolver>) -> Self {
        Self { cache, resolver }
    }

    #[must_use]
    pub fn cache(&self) -> &TableExistenceCache {
        &self.cache
    }

    /// Picks the SQL for `version` and, for optional queries only, confirms every dependency.
    ///
    /// Required queries are never checked: a missing table there should fail loudly when the query
    /// runs. For optional queries a dependency whose check fails counts as missing.
    pub async fn resolve(
        &self,
        query: &QueryDefinition,
        host_id: HostId,
        version: Option<&ParsedVersion>,
    ) -> Resolution {
        let sql = select_versioned_sql(&query.sql, version).to_string();
        if !query.optional {
            return Resolution::Proceed { sql };
        }

        let report = self.check_dependencies(query, host_id).await;
        if report.missing_tables.is_empty() {
            return Resolution::Proceed { sql };
        }

        tracing::info!(
            query = %query.name,
            host_id = %host_id,
            missing = ?report.missing_tables,
            "skipping optional query with missing tables"
        );
        Resolution::Skip {
            missing_tables: report.missing_tables,
        }
    }

    /// Dependency check for any query, reported as a [`ValidationResult`].
    ///
    /// Check failures fold into `missing_tables` for optional queries and surface as a classified
    /// error for required ones.
    pub async fn validate(
        &self,
        query: &QueryDefinition,
        host_id: HostId,
    ) -> Result<ValidationResult, ClassifiedError> {
        let context = ClassifyContext::optional(query.optional);
        let report = self.check_dependencies(query, host_id).await;

        if !query.optional
            && let Some(failure) = report.failures.first()
        {
            return Err(classify_check_failure(failure, context));
        }

        let error = if !report.failures.is_empty() {
            Some(
                report
                    .failures
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join("; "),
            )
        } else if !query.optional && !report.missing_tables.is_empty() {
            Some(format!(
                "Required table(s) missing: {}",
                report.missing_tables.join(", ")
            ))
        } else {
            None
        };

        Ok(ValidationResult {
            should_proceed: report.missing_tables.is_empty(),
            missing_tables: report.missing_tables,
            error,
        })
    }

    async fn check_dependencies(
        &self,
        query: &QueryDefinition,
        host_id: HostId,
    ) -> DependencyReport {
        let mut report = DependencyReport::default();
        for qualified in self.resolver.resolve_dependencies(query) {
            let table = TableRef::parse(&qualified);
            match self
                .cache
                .check_table_exists(host_id, &table.database, &table.table)
                .await
            {
                Ok(true) => {}
                Ok(false) => report.missing_tables.push(qualified),
                Err(failure) => {
                    tracing::warn!(
                        query = %query.name,
                        table = %qualified,
                        error = %failure,
                        "treating unconfirmed table as missing"
                    );
                    report.missing_tables.push(qualified);
                    report.failures.push(failure);
                }
            }
        }

        report
    }
}
