//! In-memory `ExecutionChannel` driven by canned batches.

use std::{
    cell::RefCell,
    collections::VecDeque,
    rc::Rc,
    time::Duration,
};

use tokio::time::Instant;

use crate::{Column, ExecutionChannel, Result, StatementResult, TestDbError, Value};

#[derive(Debug, Default)]
pub(crate) struct Journal {
    pub executed: Vec<(Instant, String)>,
    pub releases: usize,
}

impl Journal {
    pub fn count_prefix(&self, prefix: &str) -> usize {
        self.executed
            .iter()
            .filter(|(_, sql)| sql.starts_with(prefix))
            .count()
    }

    pub fn statements(&self) -> Vec<&str> {
        self.executed.iter().map(|(_, sql)| sql.as_str()).collect()
    }
}

/// Answers each `execute` with the next batch scripted for the first
/// matching SQL prefix. The last batch for a prefix repeats once the queue
/// runs dry.
pub(crate) struct ScriptedChannel {
    script: Vec<(String, VecDeque<Vec<StatementResult>>)>,
    journal: Rc<RefCell<Journal>>,
    fail_release: bool,
}

impl ScriptedChannel {
    pub fn new() -> Self {
        Self {
            script: Vec::new(),
            journal: Rc::default(),
            fail_release: false,
        }
    }

    pub fn on<I>(mut self, prefix: &str, batches: I) -> Self
    where
        I: IntoIterator<Item = Vec<StatementResult>>,
    {
        self.script
            .push((prefix.to_owned(), batches.into_iter().collect()));
        self
    }

    pub fn failing_release(mut self) -> Self {
        self.fail_release = true;
        self
    }

    pub fn journal(&self) -> Rc<RefCell<Journal>> {
        Rc::clone(&self.journal)
    }

    /// Standard SQL Server that accepts any `CREATE`/`DROP DATABASE`.
    pub fn standard() -> Self {
        Self::new()
            .on("CREATE DATABASE", [vec![completed()]])
            .on("DROP DATABASE", [vec![completed()]])
            .on("SELECT @@VERSION", [vec![version(STANDARD_VERSION)]])
    }

    /// Azure SQL answering the status query with `states` in order.
    pub fn cloud(states: &[Option<(&str, Option<&str>)>]) -> Self {
        let batches: Vec<_> = states
            .iter()
            .map(|state| vec![operation_status(*state)])
            .collect();
        Self::new()
            .on("CREATE DATABASE", [vec![completed()]])
            .on("DROP DATABASE", [vec![completed()]])
            .on("SELECT @@VERSION", [vec![version(AZURE_VERSION)]])
            .on("SELECT TOP 1 state_desc", batches)
    }
}

impl ExecutionChannel for ScriptedChannel {
    async fn execute(&mut self, sql: &str) -> Result<Vec<StatementResult>> {
        self.journal
            .borrow_mut()
            .executed
            .push((Instant::now(), sql.to_owned()));

        let (_, queue) = self
            .script
            .iter_mut()
            .find(|(prefix, _)| sql.starts_with(prefix.as_str()))
            .unwrap_or_else(|| panic!("no scripted response for {sql:?}"));
        let batch = if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        };
        Ok(batch.unwrap_or_default())
    }

    async fn release(self) -> Result<()> {
        self.journal.borrow_mut().releases += 1;
        if self.fail_release {
            return Err(TestDbError::Http {
                status: 503,
                body: "gateway unavailable".to_owned(),
            });
        }
        Ok(())
    }
}

pub(crate) const AZURE_VERSION: &str =
    "Microsoft SQL Azure (RTM) - 12.0.2000.8 \n\tJul 3 2024 14:54:21 \n\tCopyright (C) 2022 Microsoft Corporation\n";
pub(crate) const STANDARD_VERSION: &str =
    "Microsoft SQL Server 2019 (RTM-CU27) (KB5040948) - 15.0.4375.4 (X64)";

pub(crate) fn completed() -> StatementResult {
    StatementResult {
        rows: Vec::new(),
        columns: Vec::new(),
        status: "Commands completed successfully.".to_owned(),
        elapsed: Duration::from_millis(3),
        is_error: false,
    }
}

pub(crate) fn rows(columns: &[&str], rows: Vec<Vec<Value>>) -> StatementResult {
    StatementResult {
        status: format!("({} rows affected)", rows.len()),
        rows,
        columns: columns
            .iter()
            .map(|name| Column {
                name: (*name).to_owned(),
                decltype: None,
            })
            .collect(),
        elapsed: Duration::from_millis(1),
        is_error: false,
    }
}

pub(crate) fn version(text: &str) -> StatementResult {
    rows(&[""], vec![vec![Value::text(text)]])
}

/// `None` means the catalog returned no row.
pub(crate) fn operation_status(state: Option<(&str, Option<&str>)>) -> StatementResult {
    let columns = ["state_desc", "error_desc"];
    match state {
        Some((state, error)) => rows(
            &columns,
            vec![vec![
                Value::text(state),
                error.map_or(Value::Null, Value::text),
            ]],
        ),
        None => rows(&columns, Vec::new()),
    }
}

pub(crate) fn failed(message: &str) -> StatementResult {
    StatementResult::error(message)
}
