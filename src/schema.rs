//! Read-only queries against `information_schema`.

use tracing::debug;

use crate::datadef::{ColumnSpec, ColumnType, DataType};
use crate::error::KitResult;
use crate::executor::QueryExecutor;
use crate::model::{Row, Value};
use crate::normalize::normalize;
use crate::statement::run_statement;

const LIST_DATABASES: &str = "SELECT schema_name AS schema_name FROM information_schema.schemata";

const LIST_TABLES: &str = "SELECT a.table_name AS table_name, \
     (select count(*) from information_schema.columns b \
      where a.table_schema = b.table_schema and a.table_name = b.table_name) AS column_count \
     FROM information_schema.tables a \
     WHERE a.table_schema = ? \
     order by lower(a.table_name)";

const LIST_COLUMNS: &str = "SELECT a.column_name AS column_name, a.data_type AS data_type, \
     case when a.is_nullable = 'YES' then 'Y' else 'N' end AS is_nullable, \
     a.column_default AS column_default, \
     case when a.data_type = 'decimal' then a.numeric_precision \
          else coalesce(a.character_maximum_length, 0) end AS lgth, \
     coalesce(a.numeric_scale, 0) AS prec, \
     coalesce(a.column_default, 'NULL') AS def, \
     a.character_set_name AS character_set_name \
     FROM information_schema.columns a \
     WHERE a.table_schema = ? and a.table_name = ? \
     order by a.ordinal_position";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSummary {
    pub table_name: String,
    pub column_count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnInfo {
    pub column_name: String,
    /// Lower-case catalog type name, e.g. `varchar`.
    pub data_type: String,
    /// `'Y'` or `'N'`.
    pub is_nullable: char,
    pub column_default: Option<String>,
    /// Numeric precision for decimals, character length otherwise, 0 if neither.
    pub length: u64,
    pub precision: u64,
    /// `column_default`, or the text `NULL`.
    pub default_text: String,
    pub character_set_name: Option<String>,
}

impl ColumnInfo {
    fn from_row(row: &Row) -> Self {
        let nullable = row
            .get_text("is_nullable")
            .is_some_and(|s| s.eq_ignore_ascii_case("Y"));
        Self {
            column_name: row.get_text("column_name").unwrap_or_default(),
            data_type: row.get_text("data_type").unwrap_or_default(),
            is_nullable: if nullable { 'Y' } else { 'N' },
            column_default: row.get_text("column_default"),
            length: unsigned(row.get("lgth")),
            precision: unsigned(row.get("prec")),
            default_text: row
                .get_text("def")
                .unwrap_or_else(|| "NULL".to_string()),
            character_set_name: row.get_text("character_set_name"),
        }
    }

    pub fn nullable(&self) -> bool {
        self.is_nullable == 'Y'
    }

    /// The column's type as a descriptor. Catalog lengths beyond `u32` (LONGTEXT) are dropped,
    /// since only CHAR/VARCHAR/DECIMAL/NUMERIC carry one.
    pub fn column_type(&self) -> KitResult<ColumnType> {
        let data_type = DataType::from_name(&self.data_type.to_uppercase());
        let length = u32::try_from(self.length).ok().filter(|l| *l > 0);
        let precision = u32::try_from(self.precision).ok();
        ColumnType::new(data_type, length, precision)
    }

    /// A definition that re-creates this column with `add_column`.
    pub fn to_column_spec(&self) -> KitResult<ColumnSpec> {
        let mut spec = ColumnSpec::new(self.column_name.clone(), self.column_type()?)
            .not_null(!self.nullable());
        spec.default = self.column_default.clone();
        spec.character_set = self.character_set_name.clone();
        Ok(spec)
    }
}

fn unsigned(value: Option<&Value>) -> u64 {
    value
        .and_then(Value::as_i64)
        .map_or(0, |n| n.max(0) as u64)
}

pub struct SchemaIntrospector<E> {
    executor: E,
}

impl<E: QueryExecutor> SchemaIntrospector<E> {
    pub fn new(executor: E) -> Self {
        Self { executor }
    }

    async fn rows(&self, sql: &str, args: &[Value]) -> KitResult<Vec<Row>> {
        let raw = run_statement(&self.executor, sql, args).await?;
        Ok(normalize(raw).into_rows())
    }

    pub async fn list_databases(&self) -> KitResult<Vec<String>> {
        let rows = self.rows(LIST_DATABASES, &[]).await?;
        Ok(rows
            .iter()
            .filter_map(|row| row.get_text("schema_name"))
            .collect())
    }

    /// Tables of `database` with their column counts, ordered case-insensitively.
    pub async fn list_tables(&self, database: &str) -> KitResult<Vec<TableSummary>> {
        let rows = self.rows(LIST_TABLES, &[Value::from(database)]).await?;
        debug!(database, tables = rows.len(), "listed tables");
        Ok(rows
            .iter()
            .map(|row| TableSummary {
                table_name: row.get_text("table_name").unwrap_or_default(),
                column_count: unsigned(row.get("column_count")),
            })
            .collect())
    }

    /// Columns of `database.table` in physical order.
    pub async fn list_columns(&self, database: &str, table: &str) -> KitResult<Vec<ColumnInfo>> {
        let rows = self
            .rows(LIST_COLUMNS, &[Value::from(database), Value::from(table)])
            .await?;
        Ok(rows.iter().map(ColumnInfo::from_row).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn column_row(pairs: Vec<(&str, Value)>) -> Row {
        pairs.into_iter().collect()
    }

    #[test]
    fn column_info_reads_catalog_row() {
        let row = column_row(vec![
            ("COLUMN_NAME", Value::from("price")),
            ("DATA_TYPE", Value::from("decimal")),
            ("is_nullable", Value::from("N")),
            ("COLUMN_DEFAULT", Value::Null),
            ("lgth", Value::from("7")),
            ("prec", Value::Int(2)),
            ("def", Value::from("NULL")),
            ("CHARACTER_SET_NAME", Value::Null),
        ]);
        let info = ColumnInfo::from_row(&row);
        assert_eq!(info.column_name, "price");
        assert!(!info.nullable());
        assert_eq!(info.column_default, None);
        assert_eq!((info.length, info.precision), (7, 2));
        assert_eq!(info.column_type().unwrap().to_string(), "DECIMAL(7,2)");

        let spec = info.to_column_spec().unwrap();
        assert!(spec.not_null);
        assert_eq!(spec.add_fragment(), "price DECIMAL(7,2) NOT NULL");
    }

    #[test]
    fn longtext_length_does_not_break_the_descriptor() {
        let row = column_row(vec![
            ("column_name", Value::from("body")),
            ("data_type", Value::from("longtext")),
            ("is_nullable", Value::from("Y")),
            ("lgth", Value::Int(4_294_967_295)),
            ("prec", Value::Int(0)),
            ("character_set_name", Value::from("utf8mb4")),
        ]);
        let info = ColumnInfo::from_row(&row);
        assert_eq!(info.default_text, "NULL");
        let spec = info.to_column_spec().unwrap();
        assert_eq!(spec.column_type.to_string(), "LONGTEXT");
        assert_eq!(spec.add_fragment(), "body LONGTEXT CHARACTER SET utf8mb4");
    }
}
