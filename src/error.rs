use thiserror::Error;

use crate::text::clip;

/// Longest SQL fragment carried inside an execution error.
const SQL_CONTEXT_LEN: usize = 240;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Execution,
    Cardinality,
}

#[derive(Debug, Error)]
pub enum KitError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Execution error: {message}{}", sql_suffix(.sql))]
    Execution {
        message: String,
        sql: Option<String>,
    },

    #[error("Cardinality error: {0}")]
    Cardinality(String),
}

fn sql_suffix(sql: &Option<String>) -> String {
    match sql {
        Some(sql) => format!(" [{sql}]"),
        None => String::new(),
    }
}

impl KitError {
    pub fn execution(message: impl Into<String>) -> Self {
        KitError::Execution {
            message: message.into(),
            sql: None,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            KitError::Validation(_) => ErrorKind::Validation,
            KitError::Execution { .. } => ErrorKind::Execution,
            KitError::Cardinality(_) => ErrorKind::Cardinality,
        }
    }

    /// Attach the failing statement to an execution error. Other kinds pass through.
    pub fn with_sql(self, statement: &str) -> Self {
        match self {
            KitError::Execution { message, sql: None } => KitError::Execution {
                message,
                sql: Some(clip(statement, SQL_CONTEXT_LEN).to_string()),
            },
            other => other,
        }
    }

    pub fn sql(&self) -> Option<&str> {
        match self {
            KitError::Execution { sql, .. } => sql.as_deref(),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for KitError {
    fn from(err: serde_json::Error) -> Self {
        KitError::Validation(format!("argument is not JSON encodable: {err}"))
    }
}

impl From<mysql::Error> for KitError {
    fn from(err: mysql::Error) -> Self {
        let message = match &err {
            mysql::Error::MySqlError(server) => server.message.clone(),
            other => other.to_string(),
        };
        KitError::execution(message)
    }
}

pub type KitResult<T> = Result<T, KitError>;
