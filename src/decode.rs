use std::time::Duration;

use crate::{wire, Column, StatementResult, TestDbError, Value};

const COMMANDS_COMPLETED: &str = "Commands completed successfully.";

/// Converts one pipeline result into the per-statement record.
///
/// A statement-level `error` result becomes a `StatementResult` flagged as
/// an error; only malformed envelopes fail the whole batch.
pub(crate) fn decode_statement_result(
    result: wire::PipelineResult,
    request_index: usize,
) -> Result<StatementResult, TestDbError> {
    match result.kind.as_str() {
        "ok" => {
            let response = result.response.ok_or_else(|| {
                TestDbError::Decode(format!(
                    "missing response payload for request {request_index}"
                ))
            })?;
            if response.kind != "execute" {
                return Err(TestDbError::Decode(format!(
                    "expected execute response at request {request_index}, got '{}'",
                    response.kind
                )));
            }
            let execute = response.result.ok_or_else(|| {
                TestDbError::Decode(format!(
                    "missing execute result payload at request {request_index}"
                ))
            })?;
            decode_execute_result(execute)
        }
        "error" => {
            let error = result.error.ok_or_else(|| {
                TestDbError::Decode(format!(
                    "missing error payload for request {request_index}"
                ))
            })?;
            Ok(StatementResult::error(error.message))
        }
        other => Err(TestDbError::Decode(format!(
            "unknown pipeline result type '{other}' at request {request_index}"
        ))),
    }
}

pub(crate) fn decode_execute_result(
    result: wire::ExecuteResult,
) -> Result<StatementResult, TestDbError> {
    let columns = result
        .cols
        .into_iter()
        .map(|col| Column {
            name: col.name,
            decltype: col.decltype,
        })
        .collect();

    let rows = result
        .rows
        .into_iter()
        .map(|row| {
            row.into_iter()
                .map(decode_value)
                .collect::<Result<Vec<_>, TestDbError>>()
        })
        .collect::<Result<Vec<Vec<Value>>, _>>()?;

    let affected = if rows.is_empty() {
        result.affected_row_count
    } else {
        rows.len() as u64
    };
    let status = if affected > 0 {
        format!("({affected} rows affected)")
    } else {
        COMMANDS_COMPLETED.to_owned()
    };

    let elapsed = result
        .query_duration_ms
        .filter(|ms| ms.is_finite() && *ms >= 0.0)
        .map(|ms| Duration::from_secs_f64(ms / 1_000.0))
        .unwrap_or_default();

    Ok(StatementResult {
        rows,
        columns,
        status,
        elapsed,
        is_error: false,
    })
}

pub(crate) fn decode_value(value: wire::Value) -> Result<Value, TestDbError> {
    match value {
        wire::Value::Null {} => Ok(Value::Null),
        wire::Value::Integer { value } => value
            .parse::<i64>()
            .map(Value::Integer)
            .map_err(|err| TestDbError::Decode(format!("invalid integer value '{value}': {err}"))),
        wire::Value::Float { value } => value
            .parse::<f64>()
            .map_err(|err| TestDbError::Decode(format!("invalid float value '{value}': {err}")))
            .and_then(|parsed| {
                if parsed.is_finite() {
                    Ok(Value::Float(parsed))
                } else {
                    Err(TestDbError::Decode(format!(
                        "non-finite float value '{value}' is unsupported"
                    )))
                }
            }),
        wire::Value::Text { value } => Ok(Value::Text(value)),
        wire::Value::Blob { base64 } => Ok(Value::Binary(base64)),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use crate::{decode, wire, TestDbError, Value};

    fn execute_result(rows: Vec<Vec<wire::Value>>, affected: u64) -> wire::ExecuteResult {
        wire::ExecuteResult {
            cols: vec![wire::Col {
                name: "state_desc".to_owned(),
                decltype: Some("nvarchar".to_owned()),
            }],
            rows,
            affected_row_count: affected,
            query_duration_ms: Some(250.0),
        }
    }

    #[test]
    fn decode_integer_parse_error() {
        let value = wire::Value::Integer {
            value: "nope".to_owned(),
        };
        let err = decode::decode_value(value).expect_err("must fail");
        assert!(matches!(err, TestDbError::Decode(_)));
    }

    #[test]
    fn row_returning_statement_reports_row_count() {
        let decoded = decode::decode_execute_result(execute_result(
            vec![vec![wire::Value::Text {
                value: "PROCESSING".to_owned(),
            }]],
            0,
        ))
        .expect("must decode");

        assert_eq!(decoded.status, "(1 rows affected)");
        assert_eq!(decoded.rows[0][0], Value::text("PROCESSING"));
        assert_eq!(decoded.columns[0].name, "state_desc");
        assert_eq!(decoded.elapsed, Duration::from_millis(250));
        assert!(!decoded.is_error);
    }

    #[test]
    fn ddl_statement_reports_completion() {
        let decoded =
            decode::decode_execute_result(execute_result(vec![], 0)).expect("must decode");
        assert_eq!(decoded.status, "Commands completed successfully.");
        assert!(decoded.rows.is_empty());
    }

    #[test]
    fn error_result_becomes_flagged_statement() {
        let decoded = decode::decode_statement_result(
            wire::PipelineResult {
                kind: "error".to_owned(),
                response: None,
                error: Some(wire::PipelineError {
                    message: "Database 'x' already exists.".to_owned(),
                }),
            },
            0,
        )
        .expect("statement errors are not batch errors");

        assert!(decoded.is_error);
        assert_eq!(decoded.status, "Database 'x' already exists.");
    }

    #[test]
    fn unknown_result_kind_is_decode_error() {
        let err = decode::decode_statement_result(
            wire::PipelineResult {
                kind: "weird".to_owned(),
                response: None,
                error: None,
            },
            3,
        )
        .expect_err("must fail");
        assert!(matches!(err, TestDbError::Decode(message) if message.contains("request 3")));
    }
}
