use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::{InputError, QueryDefinition, Sql};
use crate::version::parse_version;

/// Declarative set of monitoring queries, keyed by name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryRegistry {
    queries: Vec<QueryDefinition>,
    by_name: BTreeMap<String, usize>,
    warnings: Vec<RegistryWarning>,
}

/// Recoverable oddity found while loading; the registry still loads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryWarning {
    pub query: String,
    pub code: String,
    pub message: String,
}

impl QueryRegistry {
    /// Validates and indexes the definitions. Unsorted or unparsable `since` values only warn,
    /// because selection tolerates them.
    pub fn from_definitions(queries: Vec<QueryDefinition>) -> Result<Self, InputError> {
        let mut by_name = BTreeMap::new();
        let mut warnings = Vec::new();

        for (index, query) in queries.iter().enumerate() {
            if by_name.insert(query.name.clone(), index).is_some() {
                return Err(InputError::DuplicateQuery {
                    name: query.name.clone(),
                });
            }
            validate_definition(query, &mut warnings)?;
        }

        for warning in &warnings {
            tracing::warn!(
                query = %warning.query,
                code = %warning.code,
                "{}",
                warning.message
            );
        }

        Ok(Self {
            queries,
            by_name,
            warnings,
        })
    }

    pub fn from_json_str(raw: &str) -> Result<Self> {
        let queries = serde_json::from_str::<Vec<QueryDefinition>>(raw)
            .context("query registry must be a JSON array of query definitions")?;
        Ok(Self::from_definitions(queries)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read query registry: {}", path.display()))?;
        Self::from_json_str(&raw)
            .with_context(|| format!("failed to load query registry: {}", path.display()))
    }

    pub fn get(&self, name: &str) -> Result<&QueryDefinition, InputError> {
        self.by_name
            .get(name)
            .map(|index| &self.queries[*index])
            .ok_or_else(|| InputError::UnknownQuery {
                name: name.to_string(),
            })
    }

    /// Named queries in the order given, or every query in declaration order when `names` is empty.
    pub fn select<'a>(&'a self, names: &[String]) -> Result<Vec<&'a QueryDefinition>, InputError> {
        if names.is_empty() {
            return Ok(self.queries.iter().collect());
        }

        names.iter().map(|name| self.get(name)).collect()
    }

    #[must_use]
    pub fn queries(&self) -> &[QueryDefinition] {
        &self.queries
    }

    #[must_use]
    pub fn warnings(&self) -> &[RegistryWarning] {
        &self.warnings
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.queries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queries.is_empty()
    }
}

fn validate_definition(
    query: &QueryDefinition,
    warnings: &mut Vec<RegistryWarning>,
) -> Result<(), InputError> {
    let variants = match &query.sql {
        Sql::Plain(sql) if sql.trim().is_empty() => {
            return Err(InputError::EmptySql {
                name: query.name.clone(),
            });
        }
        Sql::Plain(_) => return Ok(()),
        Sql::Versioned(variants) if variants.is_empty() => {
            return Err(InputError::EmptyVariants {
                name: query.name.clone(),
            });
        }
        Sql::Versioned(variants) => variants,
    };

    if variants.iter().any(|variant| variant.sql.trim().is_empty()) {
        return Err(InputError::EmptySql {
            name: query.name.clone(),
        });
    }

    let mut previous: Option<(u32, u32)> = None;
    let mut seen_levels = HashSet::new();
    for variant in variants {
        let Some(level) = parse_version(Some(variant.since.as_str())).map(|v| v.feature_level())
        else {
            warnings.push(RegistryWarning {
                query: query.name.clone(),
                code: "unparsable_since".to_string(),
                message: format!(
                    "variant since `{}` is not a version; it is treated as the oldest variant",
                    variant.since
                ),
            });
            continue;
        };

        if previous.is_some_and(|previous| level < previous) {
            warnings.push(RegistryWarning {
                query: query.name.clone(),
                code: "unsorted_variants".to_string(),
                message: format!(
                    "variant since `{}` is older than the variant declared before it",
                    variant.since
                ),
            });
        }
        if !seen_levels.insert(level) {
            warnings.push(RegistryWarning {
                query: query.name.clone(),
                code: "duplicate_since".to_string(),
                message: format!(
                    "more than one variant declares since `{}`; the last one wins",
                    variant.since
                ),
            });
        }
        previous = Some(level);
    }

    Ok(())
}

/// JSON Schema of the registry file format.
#[must_use]
pub fn json_schema() -> Value {
    let schema = schemars::schema_for!(Vec<QueryDefinition>);
    match serde_json::to_value(schema) {
        Ok(value) => value,
        Err(error) => {
            panic!("failed to serialize generated query registry schema: {error}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::QueryRegistry;
    use crate::models::{InputError, QueryDefinition, SqlVariant};

    #[test]
    fn rejects_duplicate_names() {
        let err = QueryRegistry::from_definitions(vec![
            QueryDefinition::new("disk-usage", "SELECT 1"),
            QueryDefinition::new("disk-usage", "SELECT 2"),
        ])
        .expect_err("duplicates must be rejected");
        assert_eq!(
            err,
            InputError::DuplicateQuery {
                name: "disk-usage".into()
            }
        );
    }

    #[test]
    fn rejects_empty_sql_and_empty_variant_lists() {
        let empty_plain = QueryRegistry::from_definitions(vec![QueryDefinition::new("a", "  ")])
            .expect_err("blank SQL must be rejected");
        assert!(matches!(empty_plain, InputError::EmptySql { .. }));

        let empty_list = QueryRegistry::from_definitions(vec![QueryDefinition::new(
            "b",
            Vec::<SqlVariant>::new(),
        )])
        .expect_err("empty variant list must be rejected");
        assert!(matches!(empty_list, InputError::EmptyVariants { .. }));
    }

    #[test]
    fn warns_on_unsorted_and_unparsable_since() {
        let registry = QueryRegistry::from_definitions(vec![QueryDefinition::new(
            "merges",
            vec![
                SqlVariant::new("24.1", "SELECT new"),
                SqlVariant::new("23.8", "SELECT old"),
                SqlVariant::new("nightly", "SELECT odd"),
            ],
        )])
        .expect("ordering issues only warn");

        let codes = registry
            .warnings()
            .iter()
            .map(|warning| warning.code.as_str())
            .collect::<Vec<_>>();
        assert_eq!(codes, vec!["unsorted_variants", "unparsable_since"]);
    }

    #[test]
    fn select_preserves_requested_order_and_reports_unknown_names() {
        let registry = QueryRegistry::from_definitions(vec![
            QueryDefinition::new("a", "SELECT 1"),
            QueryDefinition::new("b", "SELECT 2"),
        ])
        .expect("registry should load");

        let picked = registry
            .select(&["b".to_string(), "a".to_string()])
            .expect("known names should resolve");
        assert_eq!(
            picked.iter().map(|query| query.name.as_str()).collect::<Vec<_>>(),
            vec!["b", "a"]
        );
        assert_eq!(registry.select(&[]).expect("all queries").len(), 2);

        let err = registry
            .select(&["missing".to_string()])
            .expect_err("unknown name must fail");
        assert_eq!(
            err,
            InputError::UnknownQuery {
                name: "missing".into()
            }
        );
    }
}
