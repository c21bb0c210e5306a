//! DDL and DML statements assembled from structured input.
//!
//! Table, column, routine and type names are interpolated straight into the
//! SQL text and must come from trusted schema-management code, never from end
//! users. Data values always travel as positional `?` arguments.

use std::fmt;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::datadef::ColumnSpec;
use crate::error::{KitError, KitResult};
use crate::executor::{ExecStatus, QueryExecutor, RawResult};
use crate::model::{FieldMap, Row, Value};
use crate::normalize::{normalize, QueryResult};
use crate::predicate::{build_key_predicate, build_markers, build_predicate, Predicate};
use crate::schema::SchemaIntrospector;

/// Table alias used by SELECT and DELETE.
const ALIAS: &str = "a";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    Table,
    View,
    Procedure,
    Function,
    Trigger,
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ObjectKind::Table => "TABLE",
            ObjectKind::View => "VIEW",
            ObjectKind::Procedure => "PROCEDURE",
            ObjectKind::Function => "FUNCTION",
            ObjectKind::Trigger => "TRIGGER",
        })
    }
}

/// Runs one statement, attaching the SQL to any execution error.
pub(crate) async fn run_statement<E>(executor: &E, sql: &str, args: &[Value]) -> KitResult<RawResult>
where
    E: QueryExecutor + ?Sized,
{
    debug!(sql, args = args.len(), "executing statement");
    executor
        .execute(sql, args)
        .await
        .map_err(|err| err.with_sql(sql))
}

/// Joins non-empty clause fragments with single spaces.
fn join_clauses(parts: &[&str]) -> String {
    parts
        .iter()
        .map(|p| p.trim())
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn qualified(columns: &[&str]) -> String {
    columns
        .iter()
        .map(|c| format!("{ALIAS}.{c}"))
        .collect::<Vec<_>>()
        .join(",")
}

fn select_sql(table: &str, columns: &[&str], predicate: &Predicate, order_by: &[&str]) -> String {
    let projection = if columns.is_empty() {
        format!("{ALIAS}.*")
    } else {
        qualified(columns)
    };
    let order = if order_by.is_empty() {
        String::new()
    } else {
        format!("order by {}", qualified(order_by))
    };
    join_clauses(&[
        &format!("SELECT {projection} FROM {table} {ALIAS}"),
        &predicate.clause,
        &order,
    ])
}

pub struct StatementBuilder<E> {
    executor: E,
}

impl<E: QueryExecutor> StatementBuilder<E> {
    pub fn new(executor: E) -> Self {
        Self { executor }
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    /// Catalog queries over the same executor.
    pub fn schema(&self) -> SchemaIntrospector<&E> {
        SchemaIntrospector::new(&self.executor)
    }

    async fn run_raw(&self, sql: &str, args: &[Value]) -> KitResult<RawResult> {
        run_statement(&self.executor, sql, args).await
    }

    async fn run(&self, sql: &str, args: &[Value]) -> KitResult<QueryResult> {
        Ok(normalize(self.run_raw(sql, args).await?))
    }

    async fn run_status(&self, sql: &str) -> KitResult<ExecStatus> {
        Ok(self.run_raw(sql, &[]).await?.into_status())
    }

    pub async fn add_column(&self, table: &str, column: &ColumnSpec) -> KitResult<ExecStatus> {
        let sql = format!("ALTER TABLE {table} ADD COLUMN {}", column.add_fragment());
        self.run_status(&sql).await
    }

    /// Rename and/or redefine `current` as `column`.
    pub async fn alter_column(
        &self,
        table: &str,
        current: &str,
        column: &ColumnSpec,
    ) -> KitResult<ExecStatus> {
        let sql = format!(
            "ALTER TABLE {table} CHANGE {current} {}",
            column.change_fragment()
        );
        self.run_status(&sql).await
    }

    /// Creates a table holding only an auto-increment primary key,
    /// `ID int` unless told otherwise.
    pub async fn create_table(
        &self,
        table: &str,
        id_column: Option<&str>,
        id_type: Option<&str>,
    ) -> KitResult<ExecStatus> {
        let id = id_column.filter(|s| !s.is_empty()).unwrap_or("ID");
        let ty = id_type.filter(|s| !s.is_empty()).unwrap_or("int");
        let sql = format!("CREATE TABLE {table} ({id} {ty} AUTO_INCREMENT, PRIMARY KEY ({id}))");
        self.run_status(&sql).await
    }

    pub async fn drop_table(&self, table: &str) -> KitResult<ExecStatus> {
        self.run_status(&format!("DROP TABLE {table}")).await
    }

    pub async fn drop_column(&self, table: &str, column: &str) -> KitResult<ExecStatus> {
        self.run_status(&format!("ALTER TABLE {table} DROP COLUMN {column}"))
            .await
    }

    pub async fn drop_object_if_exists(
        &self,
        kind: ObjectKind,
        name: &str,
    ) -> KitResult<ExecStatus> {
        self.run_status(&format!("DROP {kind} IF EXISTS {name}"))
            .await
    }

    /// Replaces a stored object with `code` and reports where it landed.
    pub async fn create_object(
        &self,
        kind: ObjectKind,
        name: &str,
        code: &str,
    ) -> KitResult<String> {
        self.drop_object_if_exists(kind, name).await?;
        self.run_raw(code, &[]).await?;
        let database = self.current_database().await?.unwrap_or_default();
        info!("{kind} {name} created in database {database}");
        Ok(format!("{kind} {name} created in database {database}"))
    }

    /// Returns the generated row id, 0 when the driver reports none.
    pub async fn insert_row(&self, table: &str, values: &FieldMap) -> KitResult<u64> {
        let columns = values.keys().map(String::as_str).collect::<Vec<_>>();
        let markers = build_markers(values);
        let sql = format!(
            "INSERT INTO {table} ({}) VALUES ({})",
            columns.join(", "),
            markers.text
        );
        let raw = self.run_raw(&sql, &markers.args).await?;
        Ok(raw.status().and_then(|s| s.last_insert_id).unwrap_or(0))
    }

    /// Reads the row, then writes each column whose value differs, one
    /// statement per column and without a transaction: a concurrent writer
    /// between the read and the writes can be overwritten.
    /// Returns how many columns were written.
    pub async fn update_row(
        &self,
        table: &str,
        keys: &FieldMap,
        values: &FieldMap,
    ) -> KitResult<usize> {
        if keys.is_empty() {
            return Err(KitError::Validation(format!(
                "refusing to update {table} without row keys"
            )));
        }
        let columns = values.keys().map(String::as_str).collect::<Vec<_>>();
        // Read through the same predicate the writes use.
        let predicate = build_key_predicate(keys, Some(ALIAS));
        let Some(current) = self.fetch_one(table, &columns, &predicate).await? else {
            warn!(table, "update_row matched no row");
            return Err(KitError::Cardinality(format!(
                "no row matched in {table}"
            )));
        };

        let mut changed = 0;
        for (column, value) in values {
            let current_value = current.get(column).unwrap_or(&Value::Null);
            if !value.loosely_equals(current_value) {
                self.update_row_column(table, keys, column, value.clone())
                    .await?;
                changed += 1;
            }
        }
        Ok(changed)
    }

    /// Every key restricts the write, falsy or not.
    pub async fn update_row_column(
        &self,
        table: &str,
        keys: &FieldMap,
        column: &str,
        value: Value,
    ) -> KitResult<ExecStatus> {
        if keys.is_empty() {
            return Err(KitError::Validation(format!(
                "refusing to update {table}.{column} without row keys"
            )));
        }
        let predicate = build_key_predicate(keys, None);
        let sql = format!("UPDATE {table} SET {column} = ? {}", predicate.clause);
        let mut args = Vec::with_capacity(predicate.args.len() + 1);
        args.push(value);
        args.extend(predicate.args);
        Ok(self.run_raw(&sql, &args).await?.into_status())
    }

    /// Falsy key values do not filter; an all-falsy key map deletes every row.
    pub async fn delete_rows(&self, table: &str, keys: &FieldMap) -> KitResult<ExecStatus> {
        let predicate = build_predicate(keys, Some(ALIAS));
        let sql = join_clauses(&[
            &format!("DELETE {ALIAS} FROM {table} {ALIAS}"),
            &predicate.clause,
        ]);
        Ok(self.run_raw(&sql, &predicate.args).await?.into_status())
    }

    pub async fn select(
        &self,
        table: &str,
        columns: &[&str],
        filter: &FieldMap,
        order_by: &[&str],
    ) -> KitResult<Vec<Row>> {
        let predicate = build_predicate(filter, Some(ALIAS));
        let sql = select_sql(table, columns, &predicate, order_by);
        Ok(self.run(&sql, &predicate.args).await?.into_rows())
    }

    /// `None` when nothing matches; more than one match is an error.
    pub async fn select_row(
        &self,
        table: &str,
        columns: &[&str],
        filter: &FieldMap,
    ) -> KitResult<Option<Row>> {
        let predicate = build_predicate(filter, Some(ALIAS));
        self.fetch_one(table, columns, &predicate).await
    }

    async fn fetch_one(
        &self,
        table: &str,
        columns: &[&str],
        predicate: &Predicate,
    ) -> KitResult<Option<Row>> {
        let sql = select_sql(table, columns, predicate, &[]);
        let mut rows = self.run(&sql, &predicate.args).await?.into_rows();
        match rows.len() {
            0 => Ok(None),
            1 => Ok(rows.pop()),
            n => {
                warn!(table, rows = n, "select_row matched several rows");
                Err(KitError::Cardinality(format!(
                    "multiple rows selected ({n}): {sql}"
                )))
            }
        }
    }

    pub async fn select_count(&self, table: &str, filter: &FieldMap) -> KitResult<u64> {
        let predicate = build_predicate(filter, Some(ALIAS));
        let sql = join_clauses(&[
            &format!("SELECT count(*) rowCount FROM {table} {ALIAS}"),
            &predicate.clause,
        ]);
        let count = self
            .run(&sql, &predicate.args)
            .await?
            .into_scalar()
            .and_then(|v| v.as_i64())
            .ok_or_else(|| KitError::execution("count query returned no value").with_sql(&sql))?;
        Ok(count.max(0) as u64)
    }

    pub async fn show_create_table(&self, table: &str) -> KitResult<String> {
        let sql = format!("SHOW CREATE TABLE {table}");
        self.run(&sql, &[])
            .await?
            .into_rows()
            .first()
            .and_then(|row| row.get_text("Create Table"))
            .ok_or_else(|| KitError::execution("no CREATE TABLE text returned").with_sql(&sql))
    }

    /// `SELECT fn(?, ...)` with one argument per entry, falsy ones included.
    pub async fn call_function(&self, name: &str, args: &FieldMap) -> KitResult<Value> {
        let markers = build_markers(args);
        let sql = format!("SELECT {name}({})", markers.text);
        Ok(self
            .run(&sql, &markers.args)
            .await?
            .into_scalar()
            .unwrap_or(Value::Null))
    }

    /// `SELECT fn(?, ...)` with only the truthy arguments, for routines whose
    /// trailing parameters are optional. Returns the result as read.
    pub async fn run_function(&self, name: &str, args: &FieldMap) -> KitResult<QueryResult> {
        let present = args
            .iter()
            .filter(|(_, value)| value.is_truthy())
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect::<FieldMap>();
        let markers = build_markers(&present);
        let sql = format!("SELECT {name}({})", markers.text);
        self.run(&sql, &markers.args).await
    }

    /// `CALL proc(?)` with `arg` passed as a single JSON document.
    pub async fn call_procedure<A>(&self, name: &str, arg: &A) -> KitResult<QueryResult>
    where
        A: Serialize + ?Sized,
    {
        let json = serde_json::to_string(arg)?;
        let sql = format!("CALL {name}(?)");
        self.run(&sql, &[Value::Text(json)]).await
    }

    /// Runs caller-written SQL without arguments.
    pub async fn run_select(&self, sql: &str) -> KitResult<QueryResult> {
        self.run(sql, &[]).await
    }

    pub async fn current_database(&self) -> KitResult<Option<String>> {
        Ok(self
            .call_function("database", &FieldMap::new())
            .await?
            .to_text())
    }

    /// Only lasts for the executor's server session; see [`crate::MysqlExecutor::session`].
    pub async fn use_database(&self, database: &str) -> KitResult<ExecStatus> {
        self.run_status(&format!("USE {database}")).await
    }

    /// The id generated by the last insert of this executor's server session.
    pub async fn last_insert_id(&self) -> KitResult<u64> {
        let id = self
            .run("SELECT LAST_INSERT_ID()", &[])
            .await?
            .into_scalar()
            .and_then(|v| v.as_i64())
            .unwrap_or(0);
        Ok(id.max(0) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datadef::{ColumnType, DataType};
    use crate::error::ErrorKind;
    use crate::executor::ScriptedExecutor;
    use crate::model::field_map;

    fn builder() -> StatementBuilder<ScriptedExecutor> {
        StatementBuilder::new(ScriptedExecutor::new())
    }

    #[test]
    fn select_text_has_single_spaces() {
        let p = build_predicate(&field_map([("active", 1)]), Some(ALIAS));
        assert_eq!(
            select_sql("users", &["name"], &p, &["name"]),
            "SELECT a.name FROM users a WHERE a.active = ? order by a.name"
        );
        assert_eq!(
            select_sql("users", &[], &Predicate::default(), &[]),
            "SELECT a.* FROM users a"
        );
        assert_eq!(
            select_sql("users", &["id", "name"], &Predicate::default(), &["name", "id"]),
            "SELECT a.id,a.name FROM users a order by a.name,a.id"
        );
    }

    #[tokio::test]
    async fn add_column_builds_alter() {
        let b = builder();
        let spec = ColumnSpec::new("price", ColumnType::decimal(7, 2)).not_null(true);
        b.add_column("items", &spec).await.unwrap();
        assert_eq!(
            b.executor().statements(),
            vec!["ALTER TABLE items ADD COLUMN price DECIMAL(7,2) NOT NULL"]
        );
    }

    #[tokio::test]
    async fn alter_column_uses_change() {
        let b = builder();
        let spec = ColumnSpec::new("title", ColumnType::varchar(80))
            .character_set("utf8mb4")
            .default_value("untitled");
        b.alter_column("posts", "name", &spec).await.unwrap();
        assert_eq!(
            b.executor().statements(),
            vec!["ALTER TABLE posts CHANGE name title VARCHAR(80) CHARACTER SET utf8mb4 DEFAULT 'untitled'"]
        );
    }

    #[tokio::test]
    async fn create_and_drop_statements() {
        let b = builder();
        b.create_table("users", None, None).await.unwrap();
        b.create_table("logs", Some("log_id"), Some("bigint")).await.unwrap();
        b.drop_column("users", "nick").await.unwrap();
        b.drop_table("users").await.unwrap();
        b.drop_object_if_exists(ObjectKind::Procedure, "p_sync")
            .await
            .unwrap();
        assert_eq!(
            b.executor().statements(),
            vec![
                "CREATE TABLE users (ID int AUTO_INCREMENT, PRIMARY KEY (ID))",
                "CREATE TABLE logs (log_id bigint AUTO_INCREMENT, PRIMARY KEY (log_id))",
                "ALTER TABLE users DROP COLUMN nick",
                "DROP TABLE users",
                "DROP PROCEDURE IF EXISTS p_sync",
            ]
        );
    }

    #[tokio::test]
    async fn update_row_column_puts_value_first() {
        let b = builder();
        let keys = field_map([("id", Value::from(0)), ("site", Value::from("eu"))]);
        b.update_row_column("users", &keys, "name", Value::from("Bo"))
            .await
            .unwrap();
        let log = b.executor().executed();
        assert_eq!(log[0].sql, "UPDATE users SET name = ? WHERE id = ? and site = ?");
        assert_eq!(
            log[0].args,
            vec![Value::from("Bo"), Value::from(0), Value::from("eu")]
        );
    }

    #[tokio::test]
    async fn update_row_reads_with_zero_keys() {
        let b = builder();
        b.executor()
            .push_rows(vec![[("name", "Old")].into_iter().collect()]);
        let keys = field_map([("id", 0)]);
        let changed = b
            .update_row("t", &keys, &field_map([("name", "New")]))
            .await
            .unwrap();
        assert_eq!(changed, 1);

        let log = b.executor().executed();
        assert_eq!(log[0].sql, "SELECT a.name FROM t a WHERE a.id = ?");
        assert_eq!(log[0].args, vec![Value::from(0)]);
        assert_eq!(log[1].sql, "UPDATE t SET name = ? WHERE id = ?");
        assert_eq!(log[1].args, vec![Value::from("New"), Value::from(0)]);
    }

    #[tokio::test]
    async fn update_row_needs_keys() {
        let b = builder();
        let err = b
            .update_row("t", &FieldMap::new(), &field_map([("name", "New")]))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(b.executor().statements().is_empty());
    }

    #[tokio::test]
    async fn run_function_skips_falsy_arguments() {
        let b = builder();
        b.executor()
            .push_rows(vec![[("score", 5)].into_iter().collect()]);
        let args = field_map([
            ("a", Value::from(3)),
            ("b", Value::from(0)),
            ("c", Value::from("x")),
        ]);
        let result = b.run_function("f_score", &args).await.unwrap();
        assert_eq!(result.into_scalar(), Some(Value::from(5)));

        let log = b.executor().executed();
        assert_eq!(log[0].sql, "SELECT f_score(?, ?)");
        assert_eq!(log[0].args, vec![Value::from(3), Value::from("x")]);
    }

    #[tokio::test]
    async fn update_row_column_needs_keys() {
        let b = builder();
        let err = b
            .update_row_column("users", &FieldMap::new(), "name", Value::Null)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(b.executor().statements().is_empty());
    }

    #[tokio::test]
    async fn execution_errors_name_the_statement() {
        let b = builder();
        b.executor().push_error("Table 'app.nope' doesn't exist");
        let err = b.drop_table("nope").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Execution);
        assert_eq!(err.sql(), Some("DROP TABLE nope"));
    }

    #[tokio::test]
    async fn create_object_reports_database() {
        let b = builder();
        b.executor().push(RawResult::Status(ExecStatus::default()));
        b.executor().push(RawResult::Status(ExecStatus::default()));
        b.executor()
            .push(RawResult::Rows(vec![[("database()", "app")].into_iter().collect()]));
        let msg = b
            .create_object(
                ObjectKind::Function,
                "f_total",
                "CREATE FUNCTION f_total() RETURNS INT DETERMINISTIC RETURN 1",
            )
            .await
            .unwrap();
        assert_eq!(msg, "FUNCTION f_total created in database app");
        assert_eq!(
            b.executor().statements(),
            vec![
                "DROP FUNCTION IF EXISTS f_total",
                "CREATE FUNCTION f_total() RETURNS INT DETERMINISTIC RETURN 1",
                "SELECT database()",
            ]
        );
    }

    #[tokio::test]
    async fn text_columns_from_options() {
        let b = builder();
        let spec = ColumnSpec::new("notes", ColumnType::plain(DataType::Text))
            .default_value("none")
            .character_set("utf8mb4");
        b.add_column("t", &spec).await.unwrap();
        assert_eq!(
            b.executor().statements(),
            vec!["ALTER TABLE t ADD COLUMN notes TEXT DEFAULT 'none' CHARACTER SET utf8mb4"]
        );
    }
}
