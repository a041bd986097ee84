//! Schema backends
//!
//! Contexts never talk to a database directly. Everything goes through the
//! [`SchemaLayer`] trait:
//! - `definition`: the table-definition DSL and column metadata
//! - `memory`: an engine-free backend, mostly useful in tests
//!
//! The SQLite implementation lives in [`crate::db`].

mod definition;
mod memory;

pub use definition::{
    ColumnDefinition, ColumnInfo, ColumnType, OnDelete, Reference, TableDefinition, TableOptions,
};
pub use memory::MemorySchema;

use serde::{Deserialize, Serialize};

use crate::error::SchemaError;

/// How a table should be dropped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DropOptions {
    /// Ask the engine to remove dependent objects too, where it supports that
    pub cascade: bool,
    /// Treat an already absent table as success
    pub if_exists: bool,
}

impl Default for DropOptions {
    fn default() -> Self {
        Self {
            cascade: true,
            if_exists: true,
        }
    }
}

/// Result of a raw statement
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<serde_json::Value>>,
    /// Rows changed by a statement that returns no columns
    pub rows_affected: usize,
}

impl QueryResult {
    /// First cell of the first row, for `SELECT COUNT(*)`-style queries
    pub fn scalar(&self) -> Option<&serde_json::Value> {
        self.rows.first().and_then(|row| row.first())
    }
}

/// Operations a database engine must provide for transient tables
pub trait SchemaLayer {
    fn create_table(
        &self,
        name: &str,
        options: &TableOptions,
        definition: &TableDefinition,
    ) -> Result<(), SchemaError>;

    /// Drop a table. A failure caused by another table still referencing
    /// this one must be reported as [`SchemaError::ReferentialDependency`].
    fn drop_table(&self, name: &str, options: DropOptions) -> Result<(), SchemaError>;

    fn list_tables(&self) -> Result<Vec<String>, SchemaError>;

    fn list_columns(&self, table: &str) -> Result<Vec<ColumnInfo>, SchemaError>;

    fn execute_raw(&self, query: &str, label: &str) -> Result<QueryResult, SchemaError>;

    fn table_exists(&self, name: &str) -> Result<bool, SchemaError> {
        Ok(self.list_tables()?.iter().any(|t| t == name))
    }
}
