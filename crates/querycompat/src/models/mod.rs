pub mod envelope;
pub mod error;
pub mod host;
pub mod query;

pub use envelope::{
    CommandFailure, RESPONSE_ENVELOPE_SCHEMA_VERSION, ResponseEnvelope, ResponseError,
    ResponseMeta, ResponseWarning,
};
pub use error::InputError;
pub use host::HostId;
pub use query::{QueryDefinition, Sql, SqlVariant, TableCheck};
