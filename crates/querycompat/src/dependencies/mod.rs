use std::collections::HashSet;
use std::fmt::{Display, Formatter};
use std::sync::OnceLock;

use regex::Regex;

use crate::models::QueryDefinition;

/// Database a dependency falls back to when it is declared without a `database.` prefix.
pub const DEFAULT_DATABASE: &str = "default";

/// Produces the `database.table` names a query must find on the cluster before it runs.
pub trait DependencyResolver: Send + Sync {
    fn resolve_dependencies(&self, query: &QueryDefinition) -> Vec<String>;
}

/// Uses `tableCheck` when declared, otherwise scans every SQL variant for `FROM`/`JOIN db.table`.
///
/// The scan is lexical: CTE names, table functions such as `clusterAllReplicas(...)` and tables
/// reached only through subqueries are not followed, and matches inside literals or comments are
/// reported as dependencies.
#[derive(Debug, Clone, Copy, Default)]
pub struct PatternDependencyResolver;

impl DependencyResolver for PatternDependencyResolver {
    fn resolve_dependencies(&self, query: &QueryDefinition) -> Vec<String> {
        resolve_dependencies(query)
    }
}

#[must_use]
pub fn resolve_dependencies(query: &QueryDefinition) -> Vec<String> {
    if let Some(table_check) = &query.table_check {
        return dedupe_in_order(table_check.as_slice().iter().map(String::as_str));
    }

    dedupe_in_order(query.sql.texts().flat_map(scan_table_references))
}

/// Every `db.table` token that directly follows `FROM` or `JOIN`, in order of appearance.
pub fn scan_table_references(sql: &str) -> impl Iterator<Item = &str> {
    table_reference_regex()
        .captures_iter(sql)
        .filter_map(|captures| captures.get(2).map(|token| token.as_str()))
}

fn dedupe_in_order<'a>(tables: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut seen = HashSet::new();
    tables
        .filter(|table| seen.insert(*table))
        .map(str::to_string)
        .collect()
}

fn table_reference_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r"(?i)(FROM|JOIN)\s+(\w+\.\w+)")
            .expect("table reference regex should compile")
    })
}

/// A dependency split into its database and table parts.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TableRef {
    pub database: String,
    pub table: String,
}

impl TableRef {
    /// Splits on the first `.`; a bare name lands in [`DEFAULT_DATABASE`].
    #[must_use]
    pub fn parse(qualified: &str) -> Self {
        let qualified = qualified.trim();
        match qualified.split_once('.') {
            Some((database, table)) => Self {
                database: database.to_string(),
                table: table.to_string(),
            },
            None => Self {
                database: DEFAULT_DATABASE.to_string(),
                table: qualified.to_string(),
            },
        }
    }
}

impl Display for TableRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.database, self.table)
    }
}
