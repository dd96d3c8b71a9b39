use crate::{types::first_error, ExecutionChannel, Result, TestDbError};

pub const VERSION_QUERY: &str = "SELECT @@VERSION";

const CLOUD_MARKER: &str = "microsoft sql azure";

/// Flavor of the SQL Server backend behind a connection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BackendKind {
    /// On-premises SQL Server: DDL completes before the statement returns.
    Standard,
    /// Azure SQL: `CREATE DATABASE` finishes asynchronously.
    Cloud,
}

impl BackendKind {
    pub fn is_cloud(self) -> bool {
        matches!(self, Self::Cloud)
    }
}

/// Classifies an `@@VERSION` string.
pub fn classify_version(version: &str) -> BackendKind {
    if version.to_lowercase().contains(CLOUD_MARKER) {
        BackendKind::Cloud
    } else {
        BackendKind::Standard
    }
}

/// Runs the version query and classifies the backend.
///
/// A result without rows counts as a standard backend. A statement error is
/// returned as-is; there is no retry here.
pub async fn detect_backend<C: ExecutionChannel>(channel: &mut C) -> Result<BackendKind> {
    let results = channel.execute(VERSION_QUERY).await?;
    if let Some(failed) = first_error(&results) {
        return Err(TestDbError::Statement {
            message: failed.status.clone(),
        });
    }

    let version = results
        .first()
        .and_then(|result| result.rows.first())
        .and_then(|row| row.first())
        .map(ToString::to_string);

    Ok(version.map_or(BackendKind::Standard, |text| classify_version(&text)))
}

/// Returns true when the connection targets Azure SQL.
pub async fn is_cloud_backend<C: ExecutionChannel>(channel: &mut C) -> Result<bool> {
    detect_backend(channel).await.map(BackendKind::is_cloud)
}

#[cfg(test)]
mod tests {
    use crate::{
        detect::{classify_version, is_cloud_backend, BackendKind},
        testing::{self, ScriptedChannel, AZURE_VERSION, STANDARD_VERSION},
        TestDbError,
    };

    #[test]
    fn classify_matches_marker_case_insensitively() {
        assert_eq!(classify_version(AZURE_VERSION), BackendKind::Cloud);
        assert_eq!(
            classify_version("MICROSOFT SQL AZURE (RTM) - 12.0"),
            BackendKind::Cloud
        );
        assert_eq!(classify_version(STANDARD_VERSION), BackendKind::Standard);
    }

    #[tokio::test]
    async fn azure_version_is_cloud() {
        let mut channel = ScriptedChannel::cloud(&[]);
        assert!(is_cloud_backend(&mut channel).await.expect("must detect"));
        assert_eq!(channel.journal().borrow().statements(), ["SELECT @@VERSION"]);
    }

    #[tokio::test]
    async fn sql_server_version_is_standard() {
        let mut channel = ScriptedChannel::standard();
        assert!(!is_cloud_backend(&mut channel).await.expect("must detect"));
    }

    #[tokio::test]
    async fn empty_result_is_standard() {
        let mut channel =
            ScriptedChannel::new().on("SELECT @@VERSION", [vec![testing::rows(&[""], vec![])]]);
        assert!(!is_cloud_backend(&mut channel).await.expect("must detect"));
    }

    #[tokio::test]
    async fn statement_error_propagates() {
        let mut channel = ScriptedChannel::new().on(
            "SELECT @@VERSION",
            [vec![testing::failed("Login failed for user 'sa'.")]],
        );
        let err = is_cloud_backend(&mut channel)
            .await
            .expect_err("must fail");
        assert!(matches!(err, TestDbError::Statement { message } if message.contains("Login failed")));
    }
}
