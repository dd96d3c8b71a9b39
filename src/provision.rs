//! Creation and removal of throwaway test databases.
//!
//! [`provision`] runs `CREATE DATABASE`, then asks the backend what it is.
//! A standard SQL Server is done at that point. Azure SQL creates databases
//! asynchronously, so the workflow keeps sampling the operation catalog
//! (see [`poll`](crate::poll)) until the operation is terminal or the deadline
//! passes. Either way the connection is released exactly once before
//! returning.

use std::fmt;

use rand::{distributions::Alphanumeric, Rng};
use tokio::time::Instant;

use crate::{
    config, detect::detect_backend, poll::poll_create_status, types::first_error, BackendKind,
    ConnectionConfig, ExecutionChannel, OperationState, PipelineConnection, ProvisionOptions,
    Result, TestDbError,
};

const SUFFIX_LEN: usize = 10;

/// Name of a test database, unique per run with overwhelming probability.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct DatabaseName(String);

impl DatabaseName {
    /// Builds `<product>_testdb_<normalized-host>_<random-suffix>`.
    pub fn generate(product: &str, host: &str) -> Self {
        let suffix: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(SUFFIX_LEN)
            .map(|byte| char::from(byte).to_ascii_lowercase())
            .collect();
        Self(format!("{product}_testdb_{}_{suffix}", normalize_host(host)))
    }

    /// Wraps an existing name, e.g. one returned by an earlier run.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DatabaseName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for DatabaseName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Replaces the `-` and `.` separators of a host name with `_`.
pub fn normalize_host(host: &str) -> String {
    host.replace(['-', '.'], "_")
}

/// Creates `name` through `channel` and waits until the backend reports it
/// ready. The channel is released on every exit path.
pub async fn provision<C: ExecutionChannel>(
    mut channel: C,
    name: DatabaseName,
    options: &ProvisionOptions,
) -> Result<DatabaseName> {
    let outcome = create_database(&mut channel, &name, options).await;
    let released = channel.release().await;
    finish(outcome.map(|()| name), released)
}

async fn create_database<C: ExecutionChannel>(
    channel: &mut C,
    name: &DatabaseName,
    options: &ProvisionOptions,
) -> Result<()> {
    let results = channel.execute(&format!("CREATE DATABASE {name};")).await?;
    if let Some(failed) = first_error(&results) {
        return Err(TestDbError::ProvisioningFailed {
            database: name.to_string(),
            detail: failed.status.clone(),
        });
    }

    let backend = detect_backend(channel).await?;
    if backend == BackendKind::Standard {
        #[cfg(feature = "tracing")]
        tracing::info!(database = %name, "created test database");
        return Ok(());
    }

    let started = Instant::now();
    let status = poll_create_status(channel, name, &options.poll).await?;
    match status.state {
        OperationState::Failed => Err(TestDbError::ProvisioningFailed {
            database: name.to_string(),
            detail: status
                .error_detail
                .unwrap_or_else(|| "operation reported FAILED without detail".to_owned()),
        }),
        OperationState::Processing | OperationState::Unknown => {
            Err(TestDbError::ProvisioningTimeout {
                database: name.to_string(),
                state: status.state,
                waited: started.elapsed(),
            })
        }
        OperationState::Succeeded | OperationState::Other(_) => {
            #[cfg(feature = "tracing")]
            tracing::info!(database = %name, state = %status.state, "created cloud test database");
            Ok(())
        }
    }
}

/// Drops `name` through `channel`, then releases the channel.
///
/// Returns `Ok(false)` when any statement of the drop batch failed.
pub async fn teardown<C: ExecutionChannel>(mut channel: C, name: &DatabaseName) -> Result<bool> {
    let outcome = channel
        .execute(&format!("DROP DATABASE {name};"))
        .await
        .map(|results| first_error(&results).is_none());
    let released = channel.release().await;

    #[cfg(feature = "tracing")]
    if let Ok(dropped) = &outcome {
        tracing::info!(database = %name, dropped, "dropped test database");
    }

    finish(outcome, released)
}

/// Opens a connection to `master` and provisions a freshly named database.
pub async fn create_test_db(
    config: &ConnectionConfig,
    options: &ProvisionOptions,
) -> Result<DatabaseName> {
    let host = options.resolved_host(config.get(config::HOST));
    let name = DatabaseName::generate(&options.product, &host);
    let connection = PipelineConnection::open(&config.clone().with_database("master")).await?;
    provision(connection, name, options).await
}

/// Opens a connection to `master` and drops `name`.
pub async fn clean_up_test_db(config: &ConnectionConfig, name: &DatabaseName) -> Result<bool> {
    let connection = PipelineConnection::open(&config.clone().with_database("master")).await?;
    teardown(connection, name).await
}

/// Combines a workflow outcome with the result of releasing its connection.
///
/// A release failure only surfaces when the workflow itself succeeded.
fn finish<T>(outcome: Result<T>, released: Result<()>) -> Result<T> {
    match (outcome, released) {
        (Ok(value), Ok(())) => Ok(value),
        (Ok(_), Err(release_err)) => Err(TestDbError::Release(Box::new(release_err))),
        (Err(err), Ok(())) => Err(err),
        (Err(err), Err(_release_err)) => {
            #[cfg(feature = "tracing")]
            tracing::warn!(error = %_release_err, "connection release failed after earlier error");
            Err(err)
        }
    }
}
