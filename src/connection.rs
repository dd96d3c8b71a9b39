use std::fmt;
use std::time::Duration;

use reqwest::{header, StatusCode};
use tokio::time::sleep;

use crate::{
    baton::Baton,
    config,
    decode::decode_statement_result,
    split::split_statements,
    types::first_error,
    wire::{self, ExecuteStatement, PipelineRequest, Request},
    ClientOptions, ConnectionConfig, ExecutionChannel, Result, StatementResult, TestDbError,
};

/// Connection to a SQL Server backend through the gateway pipeline endpoint.
///
/// Every request after the first carries the session baton returned by the
/// gateway, so `USE`, temp tables and session settings persist across
/// [`execute`](ExecutionChannel::execute) calls until the connection is released.
pub struct PipelineConnection {
    http: reqwest::Client,
    pipeline_url: String,
    token: String,
    options: ClientOptions,
    baton: Option<Baton>,
}

impl fmt::Debug for PipelineConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineConnection")
            .field("pipeline_url", &self.pipeline_url)
            .field("token", &"<redacted>")
            .field("options", &self.options)
            .field("baton", &self.baton)
            .finish()
    }
}

impl PipelineConnection {
    /// Opens a connection described by `config`.
    ///
    /// When the config names a database, a `USE` statement is sent right
    /// away; that round trip also establishes the session baton.
    pub async fn open(config: &ConnectionConfig) -> Result<Self> {
        Self::open_with_options(config, ClientOptions::default()).await
    }

    pub async fn open_with_options(
        config: &ConnectionConfig,
        options: ClientOptions,
    ) -> Result<Self> {
        let pipeline_url = config.require(config::PIPELINE_URL)?.to_owned();
        let token = normalize_bearer_authorization(config.require(config::TOKEN)?);

        let mut connection = Self {
            http: reqwest::Client::new(),
            pipeline_url,
            token,
            options,
            baton: None,
        };

        if let Some(database) = config.get(config::DATABASE) {
            let use_db = format!("USE [{}]", database.replace(']', "]]"));
            let results = connection.execute(&use_db).await?;
            if let Some(failed) = first_error(&results) {
                let err = TestDbError::Statement {
                    message: failed.status.clone(),
                };
                if let Err(_release_err) = connection.release().await {
                    #[cfg(feature = "tracing")]
                    tracing::warn!(error = %_release_err, "release after failed USE also failed");
                }
                return Err(err);
            }
        }

        Ok(connection)
    }

    async fn send_pipeline_with_retry(
        &self,
        payload: &PipelineRequest,
    ) -> Result<wire::PipelineResponse> {
        let mut attempt = 0usize;
        loop {
            let response = self
                .http
                .post(&self.pipeline_url)
                .header(header::AUTHORIZATION, &self.token)
                .header(header::CONTENT_TYPE, "application/json")
                .timeout(Duration::from_millis(self.options.timeout_ms))
                .json(payload)
                .send()
                .await;

            match response {
                Ok(response) => {
                    let status = response.status();
                    let body = response.text().await.map_err(TestDbError::Transport)?;

                    if !status.is_success() {
                        if should_retry_status(status) && attempt < self.options.max_retries {
                            self.wait_before_retry(attempt).await;
                            attempt += 1;
                            continue;
                        }

                        return Err(TestDbError::Http {
                            status: status.as_u16(),
                            body,
                        });
                    }

                    return serde_json::from_str::<wire::PipelineResponse>(&body).map_err(|err| {
                        TestDbError::Decode(format!(
                            "invalid pipeline response JSON: {err}; body: {body}"
                        ))
                    });
                }
                Err(err) => {
                    if should_retry_transport(&err) && attempt < self.options.max_retries {
                        self.wait_before_retry(attempt).await;
                        attempt += 1;
                        continue;
                    }
                    return Err(TestDbError::Transport(err));
                }
            }
        }
    }

    /// Waits before the next retry attempt with exponential backoff.
    async fn wait_before_retry(&self, attempt: usize) {
        let exp = attempt.min(16) as u32;
        let multiplier = 1u64 << exp;
        let delay_ms = self.options.retry_backoff_ms.saturating_mul(multiplier);

        #[cfg(feature = "tracing")]
        tracing::debug!(attempt, delay_ms, "retrying pipeline request");

        sleep(Duration::from_millis(delay_ms)).await;
    }
}

impl ExecutionChannel for PipelineConnection {
    async fn execute(&mut self, sql: &str) -> Result<Vec<StatementResult>> {
        let statements = split_statements(sql);
        if statements.is_empty() {
            return Ok(Vec::new());
        }

        let expected = statements.len();
        let requests = statements
            .into_iter()
            .map(|sql| Request::Execute {
                stmt: ExecuteStatement {
                    sql,
                    want_rows: true,
                },
            })
            .collect();
        let payload = PipelineRequest {
            baton: self.baton.as_ref().map(|baton| baton.as_str().to_owned()),
            requests,
        };
        let response = self.send_pipeline_with_retry(&payload).await?;
        self.baton = response.baton.map(Baton);

        if response.results.len() != expected {
            return Err(TestDbError::Decode(format!(
                "result count mismatch: expected {expected}, got {}",
                response.results.len()
            )));
        }

        response
            .results
            .into_iter()
            .enumerate()
            .map(|(index, result)| decode_statement_result(result, index))
            .collect()
    }

    async fn release(self) -> Result<()> {
        let Some(baton) = self.baton.as_ref() else {
            return Ok(());
        };

        let payload = PipelineRequest {
            baton: Some(baton.as_str().to_owned()),
            requests: vec![Request::Close {}],
        };
        let response = self.send_pipeline_with_retry(&payload).await?;
        let close = response
            .results
            .into_iter()
            .next()
            .ok_or_else(|| TestDbError::Decode("missing close result".to_owned()))?;
        ensure_close_success(close)
    }
}

fn ensure_close_success(result: wire::PipelineResult) -> Result<()> {
    match result.kind.as_str() {
        "ok" => {
            let response = result.response.ok_or_else(|| {
                TestDbError::Decode("missing close response payload".to_owned())
            })?;
            if response.kind != "close" {
                return Err(TestDbError::Decode(format!(
                    "expected close response, got '{}'",
                    response.kind
                )));
            }
            Ok(())
        }
        "error" => {
            let error = result.error.ok_or_else(|| {
                TestDbError::Decode("missing error payload for close request".to_owned())
            })?;
            Err(TestDbError::Statement {
                message: error.message,
            })
        }
        other => Err(TestDbError::Decode(format!(
            "unknown pipeline result type '{other}' for close request"
        ))),
    }
}

fn should_retry_status(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::TOO_MANY_REQUESTS
            | StatusCode::INTERNAL_SERVER_ERROR
            | StatusCode::BAD_GATEWAY
            | StatusCode::SERVICE_UNAVAILABLE
            | StatusCode::GATEWAY_TIMEOUT
    )
}

fn should_retry_transport(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_request() || err.is_body() || err.is_connect()
}

fn normalize_bearer_authorization(token: &str) -> String {
    let trimmed = token.trim();
    let prefix = trimmed.get(..7);
    if prefix.is_some_and(|value| value.eq_ignore_ascii_case("bearer ")) {
        trimmed.to_owned()
    } else {
        format!("Bearer {trimmed}")
    }
}
