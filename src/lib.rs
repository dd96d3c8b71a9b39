//! `mssql-testdb` provisions throwaway SQL Server databases for client test
//! suites.
//!
//! Databases are created through a SQL pipeline gateway:
//! - [`create_test_db`] opens a connection, creates a uniquely named database
//!   and waits for Azure SQL's asynchronous `CREATE DATABASE` to finish
//! - [`clean_up_test_db`] drops it again
//!
//! The workflow itself ([`provision`], [`teardown`]) runs over any
//! [`ExecutionChannel`], so it can be driven by other connection types.

mod baton;
mod channel;
pub mod config;
mod connection;
mod decode;
mod detect;
mod error;
mod options;
mod poll;
mod provision;
mod row_map;
mod split;
mod types;
mod value;
mod wire;

pub mod baseline;

#[cfg(test)]
mod testing;

pub use channel::ExecutionChannel;
pub use config::ConnectionConfig;
pub use connection::PipelineConnection;
pub use detect::{
    classify_version, detect_backend, is_cloud_backend, BackendKind, VERSION_QUERY,
};
pub use error::TestDbError;
pub use options::{ClientOptions, PollSettings, ProvisionOptions};
pub use poll::{create_status_query, poll_create_status, OperationState, OperationStatus};
pub use provision::{
    clean_up_test_db, create_test_db, normalize_host, provision, teardown, DatabaseName,
};
pub use row_map::RowRef;
pub use types::{Column, StatementResult};
pub use value::Value;

pub type Result<T> = std::result::Result<T, TestDbError>;
