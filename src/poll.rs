//! Completion polling for asynchronous `CREATE DATABASE` on Azure SQL.
//!
//! Azure SQL accepts `CREATE DATABASE` before the database exists. Progress is
//! only visible through `sys.dm_operation_status`, which this module samples
//! at a fixed interval until the operation reaches a terminal state or the
//! deadline passes.

use std::fmt;

use tokio::time::{sleep_until, Instant};

use crate::{
    types::first_error, DatabaseName, ExecutionChannel, PollSettings, Result, StatementResult,
    TestDbError,
};

/// State of an asynchronous operation as reported by `state_desc`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OperationState {
    Processing,
    Succeeded,
    Failed,
    /// The catalog returned no row (operation not recorded yet).
    Unknown,
    /// Any other `state_desc`; treated as terminal.
    Other(String),
}

impl OperationState {
    fn from_state_desc(desc: &str) -> Self {
        match desc.trim() {
            "PROCESSING" => Self::Processing,
            "SUCCEEDED" => Self::Succeeded,
            "FAILED" => Self::Failed,
            "" => Self::Unknown,
            other => Self::Other(other.to_owned()),
        }
    }

    /// `Processing` and `Unknown` may still change; everything else is final.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Processing | Self::Unknown)
    }
}

impl fmt::Display for OperationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Processing => f.write_str("PROCESSING"),
            Self::Succeeded => f.write_str("SUCCEEDED"),
            Self::Failed => f.write_str("FAILED"),
            Self::Unknown => f.write_str("UNKNOWN"),
            Self::Other(desc) => f.write_str(desc),
        }
    }
}

/// One sample of the operation catalog.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OperationStatus {
    pub state: OperationState,
    /// `error_desc` of the sampled row, if not NULL.
    pub error_detail: Option<String>,
}

impl OperationStatus {
    pub fn unknown() -> Self {
        Self {
            state: OperationState::Unknown,
            error_detail: None,
        }
    }

    fn from_results(results: &[StatementResult]) -> Option<Self> {
        let row = results.iter().find_map(StatementResult::first_row)?;
        let state = row
            .text_at(0)
            .map_or(OperationState::Unknown, OperationState::from_state_desc);
        Some(Self {
            state,
            error_detail: row.text_at(1).map(str::to_owned),
        })
    }
}

/// Status query for the most recent `CREATE DATABASE` of `database`.
pub fn create_status_query(database: &DatabaseName) -> String {
    format!(
        "SELECT TOP 1 state_desc, error_desc FROM sys.dm_operation_status \
         WHERE major_resource_id = '{database}' AND operation = 'CREATE DATABASE' \
         ORDER BY start_time DESC"
    )
}

/// Samples the operation catalog until the `CREATE DATABASE` of `database`
/// reaches a terminal state or `settings.deadline` elapses.
///
/// Returns the last observed status in both cases; a non-terminal state in
/// the result means the deadline passed. A status query that comes back
/// flagged as an error fails immediately.
pub async fn poll_create_status<C: ExecutionChannel>(
    channel: &mut C,
    database: &DatabaseName,
    settings: &PollSettings,
) -> Result<OperationStatus> {
    let query = create_status_query(database);
    let deadline = Instant::now() + settings.deadline;
    let mut status = OperationStatus::unknown();
    let mut _samples = 0u32;

    while Instant::now() < deadline {
        let results = channel.execute(&query).await?;
        _samples += 1;

        if let Some(failed) = first_error(&results) {
            return Err(TestDbError::Statement {
                message: format!(
                    "checking database creation status failed: {}",
                    failed.status
                ),
            });
        }

        if let Some(sampled) = OperationStatus::from_results(&results) {
            status = sampled;
        }

        #[cfg(feature = "tracing")]
        tracing::debug!(
            database = %database,
            sample = _samples,
            state = %status.state,
            "sampled create database status"
        );

        if status.state.is_terminal() {
            return Ok(status);
        }

        // Sleep between samples so the catalog is not hammered.
        let wake = (Instant::now() + settings.interval).min(deadline);
        sleep_until(wake).await;
    }

    Ok(status)
}
