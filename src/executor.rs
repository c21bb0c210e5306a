use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::error::{KitError, KitResult};
use crate::model::{Row, Value};

/// Summary of a statement that produced no result set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecStatus {
    pub affected_rows: u64,
    pub last_insert_id: Option<u64>,
    pub info: String,
}

/// What an executor hands back, already tagged by the driver adapter.
///
/// `Rows` is a tabular result set (even a one-row one); `Sets` holds every
/// set of a multi-result statement like `CALL`. `Value` is a plain value
/// container that is not a driver row, for adapters whose driver hands back
/// bare values; [`crate::MysqlExecutor`] always reports result sets as `Rows`.
#[derive(Debug, Clone, PartialEq)]
pub enum RawResult {
    None,
    Status(ExecStatus),
    Rows(Vec<Row>),
    Value(Row),
    Sets(Vec<RawResult>),
}

impl RawResult {
    pub fn status(&self) -> Option<&ExecStatus> {
        match self {
            RawResult::Status(status) => Some(status),
            RawResult::Sets(sets) => sets.iter().find_map(RawResult::status),
            _ => None,
        }
    }

    pub fn into_status(self) -> ExecStatus {
        self.status().cloned().unwrap_or_default()
    }
}

/// The injected capability that sends SQL text and positional arguments to the database.
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    async fn execute(&self, sql: &str, args: &[Value]) -> KitResult<RawResult>;
}

#[async_trait]
impl<'a, T> QueryExecutor for &'a T
where
    T: QueryExecutor + ?Sized,
{
    async fn execute(&self, sql: &str, args: &[Value]) -> KitResult<RawResult> {
        (**self).execute(sql, args).await
    }
}

#[async_trait]
impl<T> QueryExecutor for Arc<T>
where
    T: QueryExecutor + ?Sized,
{
    async fn execute(&self, sql: &str, args: &[Value]) -> KitResult<RawResult> {
        (**self).execute(sql, args).await
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Executed {
    pub sql: String,
    pub args: Vec<Value>,
}

/// In-memory executor: replays queued results in order and records every
/// statement it is given. Once the queue is drained it answers with an
/// empty status.
#[derive(Default)]
pub struct ScriptedExecutor {
    script: Mutex<VecDeque<KitResult<RawResult>>>,
    log: Mutex<Vec<Executed>>,
}

impl ScriptedExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, result: RawResult) {
        self.script.lock().push_back(Ok(result));
    }

    pub fn push_rows(&self, rows: Vec<Row>) {
        self.push(RawResult::Rows(rows));
    }

    pub fn push_error(&self, message: impl Into<String>) {
        self.script
            .lock()
            .push_back(Err(KitError::execution(message)));
    }

    pub fn executed(&self) -> Vec<Executed> {
        self.log.lock().clone()
    }

    pub fn statements(&self) -> Vec<String> {
        self.log.lock().iter().map(|e| e.sql.clone()).collect()
    }

    pub fn remaining(&self) -> usize {
        self.script.lock().len()
    }
}

#[async_trait]
impl QueryExecutor for ScriptedExecutor {
    async fn execute(&self, sql: &str, args: &[Value]) -> KitResult<RawResult> {
        self.log.lock().push(Executed {
            sql: sql.to_string(),
            args: args.to_vec(),
        });
        self.script
            .lock()
            .pop_front()
            .unwrap_or_else(|| Ok(RawResult::Status(ExecStatus::default())))
    }
}
