use crate::executor::RawResult;
use crate::model::{Row, Value};

/// The shapes a caller ever sees from a statement.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryResult {
    Empty,
    Scalar(Value),
    Row(Row),
    RowSet(Vec<Row>),
}

impl QueryResult {
    pub fn is_empty(&self) -> bool {
        matches!(self, QueryResult::Empty)
    }

    /// Every row, whatever the shape. A scalar has no column name and is dropped.
    pub fn into_rows(self) -> Vec<Row> {
        match self {
            QueryResult::RowSet(rows) => rows,
            QueryResult::Row(row) => vec![row],
            QueryResult::Empty | QueryResult::Scalar(_) => Vec::new(),
        }
    }

    /// The single value held, or the first column of the first row.
    pub fn into_scalar(self) -> Option<Value> {
        match self {
            QueryResult::Scalar(value) => Some(value),
            QueryResult::Row(row) => row.into_values().next(),
            QueryResult::RowSet(rows) => rows.into_iter().next()?.into_values().next(),
            QueryResult::Empty => None,
        }
    }
}

pub fn normalize(raw: RawResult) -> QueryResult {
    match raw {
        RawResult::None | RawResult::Status(_) => QueryResult::Empty,
        RawResult::Rows(rows) if rows.is_empty() => QueryResult::Empty,
        RawResult::Rows(rows) => QueryResult::RowSet(rows),
        RawResult::Value(row) => match row.len() {
            0 => QueryResult::Empty,
            1 => row
                .into_values()
                .next()
                .map_or(QueryResult::Empty, QueryResult::Scalar),
            _ => QueryResult::Row(row),
        },
        // A CALL answers with its row sets followed by a status packet.
        RawResult::Sets(sets) => sets
            .into_iter()
            .find(|set| !matches!(set, RawResult::Status(_) | RawResult::None))
            .map_or(QueryResult::Empty, normalize),
    }
}
