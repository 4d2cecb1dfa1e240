use thiserror::Error;

/// Malformed caller input. The classifier maps every variant to a validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputError {
    #[error("invalid host id `{raw}`: expected a non-negative integer")]
    InvalidHostId { raw: String },

    #[error("unknown query `{name}`")]
    UnknownQuery { name: String },

    #[error("duplicate query name `{name}` in registry")]
    DuplicateQuery { name: String },

    #[error("query `{name}` declares an empty variant list")]
    EmptyVariants { name: String },

    #[error("query `{name}` has empty SQL text")]
    EmptySql { name: String },

    #[error("unknown host `{host_id}` in catalog")]
    UnknownHost { host_id: String },
}
