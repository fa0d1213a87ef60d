pub mod config;
pub mod dataset;
pub mod error;
pub mod fetch;
pub mod parse;
pub mod query;
pub mod schema;
pub mod service;

pub use config::Config;
pub use dataset::{Dataset, DatasetHandle, LoadState};
pub use error::{FetchError, LoadError, ParseError, QueryError};
pub use query::{QueryResult, Record, Stats};
pub use schema::{FieldMapping, LogicalField};
pub use service::{Health, LoadOutcome, Service};
