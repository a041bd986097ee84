//! In-memory schema backend
//!
//! Keeps table definitions in a map instead of a database. Dropping a table
//! that another existing table references fails with a referential
//! dependency error, like a database enforcing foreign keys would.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, BTreeSet};

use super::{
    ColumnDefinition, ColumnInfo, ColumnType, DropOptions, QueryResult, SchemaLayer,
    TableDefinition, TableOptions,
};
use crate::error::SchemaError;

#[derive(Debug, Default)]
pub struct MemorySchema {
    tables: RefCell<BTreeMap<String, TableDefinition>>,
    rejected: RefCell<BTreeSet<String>>,
    drop_attempts: Cell<usize>,
}

impl MemorySchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `drop_table` calls made so far
    pub fn drop_attempts(&self) -> usize {
        self.drop_attempts.get()
    }

    /// Make every drop of `table` fail with a non-referential error
    pub fn reject_drops(&self, table: impl Into<String>) {
        self.rejected.borrow_mut().insert(table.into());
    }

    /// Undo [`MemorySchema::reject_drops`]
    pub fn accept_drops(&self, table: &str) {
        self.rejected.borrow_mut().remove(table);
    }

    /// Existing tables that reference `table`, other than itself
    pub fn referencing_tables(&self, table: &str) -> Vec<String> {
        self.tables
            .borrow()
            .iter()
            .filter(|(name, def)| name.as_str() != table && def.referenced_tables(name).any(|t| t == table))
            .map(|(name, _)| name.clone())
            .collect()
    }
}

impl SchemaLayer for MemorySchema {
    fn create_table(
        &self,
        name: &str,
        options: &TableOptions,
        definition: &TableDefinition,
    ) -> Result<(), SchemaError> {
        let mut tables = self.tables.borrow_mut();
        if tables.contains_key(name) && !options.force {
            return Err(SchemaError::TableExists(name.to_string()));
        }

        let mut stored = TableDefinition::new();
        if options.id {
            let mut id = ColumnDefinition::new("id", ColumnType::Integer);
            id.not_null();
            stored.columns.push(id);
        }
        stored
            .columns
            .extend(definition.columns.iter().filter(|c| !(options.id && c.name == "id")).cloned());
        tables.insert(name.to_string(), stored);
        Ok(())
    }

    fn drop_table(&self, name: &str, options: DropOptions) -> Result<(), SchemaError> {
        self.drop_attempts.set(self.drop_attempts.get() + 1);

        if self.rejected.borrow().contains(name) {
            return Err(SchemaError::Backend(format!("drop of '{name}' rejected")));
        }
        if !self.tables.borrow().contains_key(name) {
            return if options.if_exists {
                Ok(())
            } else {
                Err(SchemaError::MissingTable(name.to_string()))
            };
        }

        let referencing = self.referencing_tables(name);
        if !referencing.is_empty() {
            return Err(SchemaError::ReferentialDependency {
                table: name.to_string(),
                message: format!("referenced by {}", referencing.join(", ")),
            });
        }

        self.tables.borrow_mut().remove(name);
        Ok(())
    }

    fn list_tables(&self) -> Result<Vec<String>, SchemaError> {
        Ok(self.tables.borrow().keys().cloned().collect())
    }

    fn list_columns(&self, table: &str) -> Result<Vec<ColumnInfo>, SchemaError> {
        let tables = self.tables.borrow();
        let def = tables
            .get(table)
            .ok_or_else(|| SchemaError::MissingTable(table.to_string()))?;

        Ok(def
            .columns
            .iter()
            .map(|c| ColumnInfo {
                name: c.name.clone(),
                sql_type: c.column_type.sql_type().to_string(),
                nullable: c.nullable,
                primary_key: c.name == "id" && !c.nullable,
                default: c.default.clone(),
            })
            .collect())
    }

    fn execute_raw(&self, _query: &str, _label: &str) -> Result<QueryResult, SchemaError> {
        Err(SchemaError::Unsupported("raw SQL"))
    }
}
