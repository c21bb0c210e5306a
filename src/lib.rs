//! Parameterized MySQL statement building and schema introspection over an
//! injected [`QueryExecutor`].

pub mod config;
pub mod datadef;
pub mod error;
pub mod executor;
pub mod model;
pub mod mysql_exec;
pub mod normalize;
pub mod predicate;
pub mod schema;
pub mod statement;
pub mod text;

pub use datadef::{ColumnOptions, ColumnSpec, ColumnType, DataType, TypeTraits};
pub use error::{ErrorKind, KitError, KitResult};
pub use executor::{ExecStatus, Executed, QueryExecutor, RawResult, ScriptedExecutor};
pub use model::{field_map, FieldMap, Row, Value};
pub use mysql_exec::MysqlExecutor;
pub use normalize::{normalize, QueryResult};
pub use predicate::{build_markers, build_predicate, Markers, Predicate};
pub use schema::{ColumnInfo, SchemaIntrospector, TableSummary};
pub use statement::{ObjectKind, StatementBuilder};
