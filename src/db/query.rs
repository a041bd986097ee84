//! Raw statements and schema introspection

use rusqlite::types::ValueRef;
use serde_json::Value;
use tracing::debug;

use super::SqliteDatabase;
use crate::error::SchemaError;
use crate::schema::{ColumnInfo, QueryResult};

/// Convert a SQLite cell to JSON
fn value_to_json(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        ValueRef::Text(bytes) => Value::String(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => Value::Array(bytes.iter().map(|b| Value::from(*b)).collect()),
    }
}

impl SqliteDatabase {
    pub(crate) fn run_statement(&self, query: &str, label: &str) -> Result<QueryResult, SchemaError> {
        debug!(label, query, "executing statement");

        let mut stmt = self.conn.prepare(query)?;
        let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();

        if columns.is_empty() {
            let rows_affected = stmt.execute([])?;
            return Ok(QueryResult {
                columns,
                rows: Vec::new(),
                rows_affected,
            });
        }

        let width = columns.len();
        let rows = stmt
            .query_map([], |row| {
                (0..width)
                    .map(|i| row.get_ref(i).map(value_to_json))
                    .collect::<rusqlite::Result<Vec<_>>>()
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(QueryResult {
            columns,
            rows,
            rows_affected: 0,
        })
    }

    pub(crate) fn table_names(&self) -> Result<Vec<String>, SchemaError> {
        let mut stmt = self.conn.prepare(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%'
             UNION
             SELECT name FROM sqlite_temp_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%'
             ORDER BY name",
        )?;
        let names = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(names)
    }

    pub(crate) fn column_info(&self, table: &str) -> Result<Vec<ColumnInfo>, SchemaError> {
        let mut stmt = self.conn.prepare(
            "SELECT name, type, \"notnull\", dflt_value, pk FROM pragma_table_info(?1) ORDER BY cid",
        )?;
        let columns = stmt
            .query_map([table], |row| {
                Ok(ColumnInfo {
                    name: row.get(0)?,
                    sql_type: row.get(1)?,
                    nullable: !row.get::<_, bool>(2)?,
                    default: row.get(3)?,
                    primary_key: row.get::<_, i64>(4)? > 0,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        if columns.is_empty() {
            return Err(SchemaError::MissingTable(table.to_string()));
        }
        Ok(columns)
    }
}
