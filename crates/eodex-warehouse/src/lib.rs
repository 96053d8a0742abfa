//! DuckDB-backed persistence for eodex: the securities registry, append-only
//! EOD bar and corporate-action storage, and a guarded ad-hoc query surface.
//!
//! The import pipeline is a single sequential writer, so the warehouse holds
//! one connection for the life of the process; read-only semantics for the
//! `sql` command are enforced at the query layer.

pub mod migrations;
pub mod registry;

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use ::duckdb::types::Value as DuckValue;
use ::duckdb::Connection;
use ::duckdb::ToSql;
use serde::Serialize;
use serde_json::{Number, Value};
use thiserror::Error;

pub use registry::{SeedDocument, SeedExchange, SeedReport, SeedSecurity};

#[derive(Debug, Error)]
pub enum WarehouseError {
    #[error(transparent)]
    DuckDb(#[from] ::duckdb::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("query rejected: {0}")]
    QueryRejected(String),

    #[error("query timed out after {timeout_ms}ms")]
    QueryTimeout { timeout_ms: u64 },

    #[error("seed rejected: {0}")]
    SeedRejected(String),

    #[error("corrupt row: {0}")]
    Corrupt(String),
}

#[derive(Debug, Clone)]
pub struct WarehouseConfig {
    pub eodex_home: PathBuf,
    pub db_path: PathBuf,
}

impl Default for WarehouseConfig {
    fn default() -> Self {
        let eodex_home = resolve_eodex_home();
        let db_path = eodex_home.join("warehouse.duckdb");
        Self {
            eodex_home,
            db_path,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct QueryGuardrails {
    pub max_rows: usize,
    pub query_timeout_ms: u64,
}

impl Default for QueryGuardrails {
    fn default() -> Self {
        Self {
            max_rows: 10_000,
            query_timeout_ms: 5_000,
        }
    }
}

impl QueryGuardrails {
    fn timeout(self) -> Duration {
        Duration::from_millis(self.query_timeout_ms.max(1))
    }

    fn validate(self) -> Result<(), WarehouseError> {
        if self.max_rows == 0 {
            return Err(WarehouseError::QueryRejected(String::from(
                "--max-rows must be greater than zero",
            )));
        }
        if self.query_timeout_ms == 0 {
            return Err(WarehouseError::QueryRejected(String::from(
                "--query-timeout-ms must be greater than zero",
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SqlColumn {
    pub name: String,
    #[serde(rename = "type")]
    pub r#type: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct QueryResult {
    pub columns: Vec<SqlColumn>,
    pub rows: Vec<Vec<Value>>,
    pub row_count: usize,
    pub truncated: bool,
}

pub struct Warehouse {
    config: WarehouseConfig,
    connection: Connection,
}

impl Warehouse {
    pub fn open_default() -> Result<Self, WarehouseError> {
        Self::open(WarehouseConfig::default())
    }

    /// Open a warehouse at an explicit database path (`--db` override).
    pub fn open_path(path: impl Into<PathBuf>) -> Result<Self, WarehouseError> {
        let db_path: PathBuf = path.into();
        let eodex_home = db_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(resolve_eodex_home);
        Self::open(WarehouseConfig {
            eodex_home,
            db_path,
        })
    }

    pub fn open(config: WarehouseConfig) -> Result<Self, WarehouseError> {
        if let Some(parent) = config.db_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let connection = Connection::open(config.db_path.as_path())?;
        connection.execute_batch("PRAGMA disable_progress_bar;")?;
        migrations::apply_migrations(&connection)?;

        Ok(Self { config, connection })
    }

    pub fn db_path(&self) -> &Path {
        self.config.db_path.as_path()
    }

    pub(crate) fn connection(&self) -> &Connection {
        &self.connection
    }

    /// Execute ad-hoc SQL. Read-only unless `allow_write` is set; result
    /// size and wall time are bounded by `guardrails`.
    pub fn execute_query(
        &self,
        sql: &str,
        guardrails: QueryGuardrails,
        allow_write: bool,
    ) -> Result<QueryResult, WarehouseError> {
        guardrails.validate()?;
        let sql = normalize_sql(sql)?;

        if !allow_write {
            enforce_read_only_query(sql)?;
        }

        let started = Instant::now();
        if is_select_like(sql) {
            self.execute_select_query(sql, guardrails, started)
        } else if allow_write {
            self.connection.execute_batch(sql)?;
            ensure_timeout(started, guardrails.timeout())?;
            Ok(QueryResult {
                columns: Vec::new(),
                rows: Vec::new(),
                row_count: 0,
                truncated: false,
            })
        } else {
            Err(WarehouseError::QueryRejected(String::from(
                "only SELECT/CTE queries are allowed unless --write is provided",
            )))
        }
    }

    fn execute_select_query(
        &self,
        sql: &str,
        guardrails: QueryGuardrails,
        started: Instant,
    ) -> Result<QueryResult, WarehouseError> {
        let mut statement = self.connection.prepare(sql)?;
        let _ = statement.query([] as [&dyn ToSql; 0])?;

        // Column metadata is only populated after execution.
        let column_count = statement.column_count();
        let mut columns = Vec::with_capacity(column_count);
        for index in 0..column_count {
            let name = statement
                .column_name(index)
                .map(ToOwned::to_owned)
                .unwrap_or_else(|_| format!("column_{index}"));
            let dtype = statement.column_type(index);
            columns.push(SqlColumn {
                name,
                r#type: dtype.to_string(),
            });
        }

        let mut rows_cursor = statement.query([] as [&dyn ToSql; 0])?;
        let mut rows = Vec::new();
        let mut truncated = false;

        while let Some(row) = rows_cursor.next()? {
            ensure_timeout(started, guardrails.timeout())?;

            if rows.len() >= guardrails.max_rows {
                truncated = true;
                break;
            }

            let mut output = Vec::with_capacity(column_count);
            for index in 0..column_count {
                let value: DuckValue = row.get(index)?;
                output.push(to_json_value(value));
            }
            rows.push(output);
        }

        ensure_timeout(started, guardrails.timeout())?;

        Ok(QueryResult {
            columns,
            row_count: rows.len(),
            rows,
            truncated,
        })
    }
}

pub(crate) fn finalize_transaction<T>(
    connection: &Connection,
    result: Result<T, WarehouseError>,
) -> Result<T, WarehouseError> {
    match result {
        Ok(value) => {
            connection.execute_batch("COMMIT")?;
            Ok(value)
        }
        Err(error) => {
            let _ = connection.execute_batch("ROLLBACK");
            Err(error)
        }
    }
}

fn to_json_value(value: DuckValue) -> Value {
    match value {
        DuckValue::Null => Value::Null,
        DuckValue::Boolean(value) => Value::Bool(value),
        DuckValue::TinyInt(value) => Value::Number(Number::from(value)),
        DuckValue::SmallInt(value) => Value::Number(Number::from(value)),
        DuckValue::Int(value) => Value::Number(Number::from(value)),
        DuckValue::BigInt(value) => Value::Number(Number::from(value)),
        DuckValue::UTinyInt(value) => Value::Number(Number::from(value)),
        DuckValue::USmallInt(value) => Value::Number(Number::from(value)),
        DuckValue::UInt(value) => Value::Number(Number::from(value)),
        DuckValue::UBigInt(value) => Value::Number(Number::from(value)),
        DuckValue::Float(value) => number_from_f64(value as f64),
        DuckValue::Double(value) => number_from_f64(value),
        DuckValue::Text(value) => Value::String(value),
        DuckValue::Blob(value) => Value::String(hex::encode(value)),
        other => Value::String(format!("{other:?}")),
    }
}

fn number_from_f64(value: f64) -> Value {
    Number::from_f64(value)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

fn normalize_sql(sql: &str) -> Result<&str, WarehouseError> {
    let normalized = sql.trim();
    if normalized.is_empty() {
        return Err(WarehouseError::QueryRejected(String::from(
            "query must not be empty",
        )));
    }
    Ok(normalized.trim_end_matches(';').trim())
}

fn enforce_read_only_query(sql: &str) -> Result<(), WarehouseError> {
    if !is_select_like(sql) {
        return Err(WarehouseError::QueryRejected(String::from(
            "read-only mode accepts only SELECT/CTE queries; use --write for write statements",
        )));
    }
    if has_multiple_statements(sql) {
        return Err(WarehouseError::QueryRejected(String::from(
            "multiple SQL statements are not allowed in read-only mode",
        )));
    }
    Ok(())
}

fn is_select_like(sql: &str) -> bool {
    let first_keyword = sql
        .split_whitespace()
        .next()
        .unwrap_or_default()
        .to_ascii_uppercase();
    matches!(
        first_keyword.as_str(),
        "SELECT" | "WITH" | "EXPLAIN" | "SHOW" | "DESCRIBE"
    )
}

fn has_multiple_statements(sql: &str) -> bool {
    sql.split(';')
        .filter(|part| !part.trim().is_empty())
        .count()
        > 1
}

fn ensure_timeout(started: Instant, timeout: Duration) -> Result<(), WarehouseError> {
    if started.elapsed() > timeout {
        return Err(WarehouseError::QueryTimeout {
            timeout_ms: timeout.as_millis().min(u128::from(u64::MAX)) as u64,
        });
    }
    Ok(())
}

fn resolve_eodex_home() -> PathBuf {
    if let Some(path) = env::var_os("EODEX_HOME") {
        let path = PathBuf::from(path);
        if !path.as_os_str().is_empty() {
            return path;
        }
    }

    if let Some(home) = env::var_os("HOME") {
        return PathBuf::from(home).join(".eodex");
    }

    PathBuf::from(".eodex")
}

pub(crate) fn escape_sql_string(value: &str) -> String {
    value.replace('\'', "''")
}
