//! DDL generation and execution

use rusqlite::ffi;
use tracing::debug;

use super::SqliteDatabase;
use crate::error::SchemaError;
use crate::schema::{ColumnDefinition, DropOptions, TableDefinition, TableOptions};

/// Quote an identifier for use in SQL
pub(crate) fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn column_sql(column: &ColumnDefinition) -> String {
    let mut sql = format!("{} {}", quote_ident(&column.name), column.column_type.sql_type());
    if !column.nullable {
        sql.push_str(" NOT NULL");
    }
    if column.unique {
        sql.push_str(" UNIQUE");
    }
    if let Some(default) = &column.default {
        sql.push_str(" DEFAULT ");
        sql.push_str(default);
    }
    if let Some(reference) = &column.references {
        sql.push_str(&format!(
            " REFERENCES {}({})",
            quote_ident(&reference.table),
            quote_ident(&reference.column)
        ));
        if let Some(action) = reference.on_delete {
            sql.push_str(" ON DELETE ");
            sql.push_str(action.sql());
        }
    }
    sql
}

/// Build the `CREATE TABLE` statement for a definition
pub(crate) fn create_table_sql(name: &str, options: &TableOptions, definition: &TableDefinition) -> String {
    let mut columns = Vec::with_capacity(definition.columns.len() + 1);
    if options.id {
        columns.push(format!("{} INTEGER PRIMARY KEY", quote_ident("id")));
    }
    columns.extend(
        definition
            .columns
            .iter()
            .filter(|c| !(options.id && c.name == "id"))
            .map(column_sql),
    );

    format!(
        "CREATE {}TABLE {} ({})",
        if options.temporary { "TEMP " } else { "" },
        quote_ident(name),
        columns.join(", ")
    )
}

/// Map a failed drop to the schema error taxonomy
fn classify_drop_error(table: &str, err: rusqlite::Error) -> SchemaError {
    if let rusqlite::Error::SqliteFailure(code, message) = &err {
        if code.extended_code == ffi::SQLITE_CONSTRAINT_FOREIGNKEY {
            return SchemaError::ReferentialDependency {
                table: table.to_string(),
                message: message.clone().unwrap_or_else(|| code.to_string()),
            };
        }
    }
    SchemaError::Sqlite(err)
}

impl SqliteDatabase {
    pub(crate) fn create_table_from(
        &self,
        name: &str,
        options: &TableOptions,
        definition: &TableDefinition,
    ) -> Result<(), SchemaError> {
        if options.force {
            self.drop_table_named(name, DropOptions::default())?;
        }

        let sql = create_table_sql(name, options, definition);
        debug!(table = name, %sql, "creating table");
        self.conn.execute(&sql, [])?;
        Ok(())
    }

    /// SQLite has no `DROP TABLE ... CASCADE`, so `options.cascade` is ignored
    pub(crate) fn drop_table_named(&self, name: &str, options: DropOptions) -> Result<(), SchemaError> {
        let sql = format!(
            "DROP TABLE {}{}",
            if options.if_exists { "IF EXISTS " } else { "" },
            quote_ident(name)
        );
        debug!(table = name, %sql, "dropping table");
        self.conn
            .execute(&sql, [])
            .map(|_| ())
            .map_err(|err| classify_drop_error(name, err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::OnDelete;

    #[test]
    fn test_quote_ident_escapes_quotes() {
        assert_eq!(quote_ident("users"), "\"users\"");
        assert_eq!(quote_ident("we\"ird"), "\"we\"\"ird\"");
    }

    #[test]
    fn test_create_table_sql() {
        let mut def = TableDefinition::new();
        def.string("email").not_null().unique();
        def.boolean("active").default_value("1");
        def.references("organization").on_delete(OnDelete::SetNull);

        let sql = create_table_sql("users", &TableOptions::default(), &def);
        assert_eq!(
            sql,
            "CREATE TABLE \"users\" (\"id\" INTEGER PRIMARY KEY, \
             \"email\" VARCHAR NOT NULL UNIQUE, \
             \"active\" BOOLEAN DEFAULT 1, \
             \"organization_id\" INTEGER REFERENCES \"organizations\"(\"id\") ON DELETE SET NULL)"
        );
    }

    #[test]
    fn test_create_temporary_without_id() {
        let mut def = TableDefinition::new();
        def.text("body");
        let options = TableOptions {
            temporary: true,
            ..TableOptions::without_id()
        };
        assert_eq!(
            create_table_sql("notes", &options, &def),
            "CREATE TEMP TABLE \"notes\" (\"body\" TEXT)"
        );
    }
}
