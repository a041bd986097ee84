//! SQLite schema backend
//!
//! This module is split into focused submodules:
//! - `ddl`: table creation and dropping
//! - `query`: raw statements and schema introspection

mod ddl;
mod query;

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use rusqlite::Connection;
use tracing::debug;

use crate::config::DatabaseConfig;
use crate::error::SchemaError;
use crate::schema::{ColumnInfo, DropOptions, QueryResult, SchemaLayer, TableDefinition, TableOptions};

/// SQLite connection used as a transient-table backend
pub struct SqliteDatabase {
    pub(crate) conn: Connection,
}

impl SqliteDatabase {
    /// Open or create a database file
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_connection(open_file(path.as_ref())?, true)
    }

    /// Open an in-memory database with foreign keys enforced
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory database")?;
        Self::from_connection(conn, true)
    }

    /// Open the database described by a config section
    pub fn open_with(config: &DatabaseConfig) -> Result<Self> {
        let db = match &config.path {
            Some(path) => Self::from_connection(open_file(path)?, config.foreign_keys)?,
            None => Self::from_connection(
                Connection::open_in_memory().context("Failed to open in-memory database")?,
                config.foreign_keys,
            )?,
        };

        db.conn
            .busy_timeout(Duration::from_millis(config.busy_timeout_ms))
            .context("Failed to set busy timeout")?;
        Ok(db)
    }

    /// Wrap an existing connection
    pub fn from_connection(conn: Connection, foreign_keys: bool) -> Result<Self> {
        conn.pragma_update(None, "foreign_keys", foreign_keys)
            .context("Failed to configure foreign keys")?;
        debug!(foreign_keys, "opened SQLite schema backend");
        Ok(Self { conn })
    }

    /// Borrow the underlying connection for direct data access
    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

fn open_file(path: &Path) -> Result<Connection> {
    // Ensure parent directory exists
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).context("Failed to create database directory")?;
    }

    Connection::open(path).with_context(|| format!("Failed to open database at {}", path.display()))
}

impl SchemaLayer for SqliteDatabase {
    fn create_table(
        &self,
        name: &str,
        options: &TableOptions,
        definition: &TableDefinition,
    ) -> Result<(), SchemaError> {
        self.create_table_from(name, options, definition)
    }

    fn drop_table(&self, name: &str, options: DropOptions) -> Result<(), SchemaError> {
        self.drop_table_named(name, options)
    }

    fn list_tables(&self) -> Result<Vec<String>, SchemaError> {
        self.table_names()
    }

    fn list_columns(&self, table: &str) -> Result<Vec<ColumnInfo>, SchemaError> {
        self.column_info(table)
    }

    fn execute_raw(&self, query: &str, label: &str) -> Result<QueryResult, SchemaError> {
        self.run_statement(query, label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::OnDelete;

    fn organizations_and_users(db: &SqliteDatabase) -> Result<()> {
        let mut orgs = TableDefinition::new();
        orgs.string("name").not_null();
        db.create_table("organizations", &TableOptions::default(), &orgs)?;

        let mut users = TableDefinition::new();
        users.string("email").not_null().unique();
        users.references("organization").not_null();
        db.create_table("users", &TableOptions::default(), &users)?;

        db.execute_raw("INSERT INTO organizations (id, name) VALUES (1, 'acme')", "seed")?;
        db.execute_raw(
            "INSERT INTO users (email, organization_id) VALUES ('a@acme.test', 1)",
            "seed",
        )?;
        Ok(())
    }

    #[test]
    fn test_create_and_list() -> Result<()> {
        let db = SqliteDatabase::open_in_memory()?;
        organizations_and_users(&db)?;

        assert_eq!(db.list_tables()?, vec!["organizations", "users"]);
        assert!(db.table_exists("users")?);
        assert!(!db.table_exists("posts")?);

        let columns = db.list_columns("users")?;
        let names: Vec<_> = columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["id", "email", "organization_id"]);
        assert!(columns[0].primary_key);
        assert!(!columns[1].nullable);
        Ok(())
    }

    #[test]
    fn test_drop_referenced_table_is_referential() -> Result<()> {
        let db = SqliteDatabase::open_in_memory()?;
        organizations_and_users(&db)?;

        let err = db
            .drop_table("organizations", DropOptions::default())
            .unwrap_err();
        assert!(err.is_referential(), "unexpected error: {err}");
        assert!(db.table_exists("organizations")?);

        db.drop_table("users", DropOptions::default())?;
        db.drop_table("organizations", DropOptions::default())?;
        assert!(db.list_tables()?.is_empty());
        Ok(())
    }

    #[test]
    fn test_drop_missing_table() -> Result<()> {
        let db = SqliteDatabase::open_in_memory()?;
        db.drop_table("ghosts", DropOptions::default())?;

        let strict = DropOptions {
            if_exists: false,
            ..DropOptions::default()
        };
        let err = db.drop_table("ghosts", strict).unwrap_err();
        assert!(!err.is_referential());
        Ok(())
    }

    #[test]
    fn test_on_delete_cascade_is_emitted() -> Result<()> {
        let db = SqliteDatabase::open_in_memory()?;
        db.create_table("organizations", &TableOptions::default(), &TableDefinition::new())?;
        let mut members = TableDefinition::new();
        members
            .references("organization")
            .on_delete(OnDelete::Cascade);
        db.create_table("members", &TableOptions::default(), &members)?;

        db.execute_raw("INSERT INTO organizations (id) VALUES (7)", "seed")?;
        db.execute_raw("INSERT INTO members (organization_id) VALUES (7)", "seed")?;
        db.execute_raw("DELETE FROM organizations", "purge")?;

        let count = db.execute_raw("SELECT COUNT(*) FROM members", "count")?;
        assert_eq!(count.scalar(), Some(&serde_json::json!(0)));
        Ok(())
    }

    #[test]
    fn test_open_file_backed() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("nested").join("fixtures.db");
        {
            let db = SqliteDatabase::open(&path)?;
            db.create_table("users", &TableOptions::default(), &TableDefinition::new())?;
        }
        let db = SqliteDatabase::open(&path)?;
        assert_eq!(db.list_tables()?, vec!["users"]);
        Ok(())
    }

    #[test]
    fn test_open_with_creates_missing_directories() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("cache").join("transient").join("fixtures.db");
        let config = DatabaseConfig {
            path: Some(path.clone()),
            foreign_keys: false,
            ..DatabaseConfig::default()
        };

        let db = SqliteDatabase::open_with(&config)?;
        assert!(path.exists());
        let enforced: bool = db
            .connection()
            .query_row("PRAGMA foreign_keys", [], |row| row.get(0))?;
        assert!(!enforced);
        Ok(())
    }
}
