use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// One version-scoped SQL alternative. `since` is the minimum server version the text applies to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct SqlVariant {
    pub since: String,
    pub sql: String,
}

impl SqlVariant {
    #[must_use]
    pub fn new(since: impl Into<String>, sql: impl Into<String>) -> Self {
        Self {
            since: since.into(),
            sql: sql.into(),
        }
    }
}

/// SQL text of a query: either version independent or a list of variants ordered oldest to newest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum Sql {
    Plain(String),
    Versioned(Vec<SqlVariant>),
}

impl Sql {
    /// Every SQL text declared for the query, in declaration order.
    pub fn texts(&self) -> impl Iterator<Item = &str> {
        let (plain, variants) = match self {
            Self::Plain(sql) => (Some(sql.as_str()), &[] as &[SqlVariant]),
            Self::Versioned(variants) => (None, variants.as_slice()),
        };
        plain
            .into_iter()
            .chain(variants.iter().map(|variant| variant.sql.as_str()))
    }
}

impl From<&str> for Sql {
    fn from(sql: &str) -> Self {
        Self::Plain(sql.to_string())
    }
}

impl From<String> for Sql {
    fn from(sql: String) -> Self {
        Self::Plain(sql)
    }
}

impl From<Vec<SqlVariant>> for Sql {
    fn from(variants: Vec<SqlVariant>) -> Self {
        Self::Versioned(variants)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum TableCheck {
    One(String),
    Many(Vec<String>),
}

impl TableCheck {
    #[must_use]
    pub fn as_slice(&self) -> &[String] {
        match self {
            Self::One(table) => std::slice::from_ref(table),
            Self::Many(tables) => tables,
        }
    }
}

/// A named monitoring query as declared in the query registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct QueryDefinition {
    pub name: String,
    pub sql: Sql,

    #[serde(default)]
    pub optional: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table_check: Option<TableCheck>,
}

impl QueryDefinition {
    #[must_use]
    pub fn new(name: impl Into<String>, sql: impl Into<Sql>) -> Self {
        Self {
            name: name.into(),
            sql: sql.into(),
            optional: false,
            table_check: None,
        }
    }

    #[must_use]
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    #[must_use]
    pub fn with_table_check<I, S>(mut self, tables: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.table_check = Some(TableCheck::Many(
            tables.into_iter().map(Into::into).collect(),
        ));
        self
    }
}
