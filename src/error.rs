use std::time::Duration;

use crate::OperationState;

/// Error type returned by this crate.
#[derive(Debug, thiserror::Error)]
pub enum TestDbError {
    /// Network or request execution error from `reqwest`.
    #[error("transport error: {0}")]
    Transport(reqwest::Error),
    /// Non-success HTTP status code with raw response body.
    #[error("http error {status}: {body}")]
    Http { status: u16, body: String },
    /// Response decoding or protocol-shape validation error.
    #[error("decode error: {0}")]
    Decode(String),
    /// Unknown, missing or empty connection option.
    #[error("config error: {0}")]
    Config(String),
    /// A submitted statement came back flagged as an error.
    #[error("statement failed: {message}")]
    Statement { message: String },
    /// The database could not be created.
    #[error("database creation failed for {database}: {detail}")]
    ProvisioningFailed {
        database: String,
        /// Backend status text or the error reported by the operation catalog.
        detail: String,
    },
    /// The asynchronous `CREATE DATABASE` did not finish before the poll deadline.
    #[error("database creation for {database} still {state} after {waited:?}")]
    ProvisioningTimeout {
        database: String,
        /// Last state observed before the deadline passed.
        state: OperationState,
        waited: Duration,
    },
    /// Releasing the connection failed.
    #[error("connection release failed: {0}")]
    Release(Box<TestDbError>),
}

impl TestDbError {
    /// Returns true when provisioning did not succeed, whether the backend
    /// reported a failure or the poll deadline passed.
    pub fn is_provisioning_failure(&self) -> bool {
        matches!(
            self,
            Self::ProvisioningFailed { .. } | Self::ProvisioningTimeout { .. }
        )
    }
}
