//! Table definition DSL handed to `create_table` callbacks

use serde::{Deserialize, Serialize};

use crate::inflect;

/// Column storage type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Integer,
    BigInt,
    Float,
    Decimal,
    String,
    Text,
    Boolean,
    Date,
    Timestamp,
    Blob,
}

impl ColumnType {
    /// SQL type name used in generated DDL
    pub fn sql_type(&self) -> &'static str {
        match self {
            Self::Integer => "INTEGER",
            Self::BigInt => "BIGINT",
            Self::Float => "REAL",
            Self::Decimal => "DECIMAL",
            Self::String => "VARCHAR",
            Self::Text => "TEXT",
            Self::Boolean => "BOOLEAN",
            Self::Date => "DATE",
            Self::Timestamp => "DATETIME",
            Self::Blob => "BLOB",
        }
    }
}

impl std::fmt::Display for ColumnType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.sql_type())
    }
}

/// Action applied to referencing rows when the referenced row is deleted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnDelete {
    Cascade,
    SetNull,
    Restrict,
}

impl OnDelete {
    pub fn sql(&self) -> &'static str {
        match self {
            Self::Cascade => "CASCADE",
            Self::SetNull => "SET NULL",
            Self::Restrict => "RESTRICT",
        }
    }
}

/// Foreign key target of a column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
    pub table: String,
    pub column: String,
    pub on_delete: Option<OnDelete>,
}

/// A single column in a table definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDefinition {
    pub name: String,
    pub column_type: ColumnType,
    pub nullable: bool,
    pub unique: bool,
    /// SQL literal inserted verbatim after `DEFAULT`
    pub default: Option<String>,
    pub references: Option<Reference>,
}

impl ColumnDefinition {
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
            nullable: true,
            unique: false,
            default: None,
            references: None,
        }
    }

    pub fn not_null(&mut self) -> &mut Self {
        self.nullable = false;
        self
    }

    pub fn unique(&mut self) -> &mut Self {
        self.unique = true;
        self
    }

    pub fn default_value(&mut self, literal: impl Into<String>) -> &mut Self {
        self.default = Some(literal.into());
        self
    }

    /// Reference the `id` column of `table`
    pub fn references(&mut self, table: impl Into<String>) -> &mut Self {
        self.references = Some(Reference {
            table: table.into(),
            column: "id".to_string(),
            on_delete: None,
        });
        self
    }

    /// Set the delete action; has no effect without a reference
    pub fn on_delete(&mut self, action: OnDelete) -> &mut Self {
        if let Some(reference) = self.references.as_mut() {
            reference.on_delete = Some(action);
        }
        self
    }
}

/// Options forwarded to the backend alongside a definition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableOptions {
    /// Add an integer `id` primary key
    pub id: bool,
    /// Drop an existing table of the same name first
    pub force: bool,
    /// Create a connection-local temporary table
    pub temporary: bool,
}

impl Default for TableOptions {
    fn default() -> Self {
        Self {
            id: true,
            force: false,
            temporary: false,
        }
    }
}

impl TableOptions {
    pub fn without_id() -> Self {
        Self {
            id: false,
            ..Self::default()
        }
    }
}

/// Columns of a table to be created
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableDefinition {
    pub columns: Vec<ColumnDefinition>,
}

impl TableDefinition {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a column, replacing any earlier column of the same name
    pub fn column(&mut self, name: impl Into<String>, column_type: ColumnType) -> &mut ColumnDefinition {
        let name = name.into();
        self.columns.retain(|c| c.name != name);
        self.columns.push(ColumnDefinition::new(name, column_type));
        let last = self.columns.len() - 1;
        &mut self.columns[last]
    }

    pub fn integer(&mut self, name: impl Into<String>) -> &mut ColumnDefinition {
        self.column(name, ColumnType::Integer)
    }

    pub fn string(&mut self, name: impl Into<String>) -> &mut ColumnDefinition {
        self.column(name, ColumnType::String)
    }

    pub fn text(&mut self, name: impl Into<String>) -> &mut ColumnDefinition {
        self.column(name, ColumnType::Text)
    }

    pub fn boolean(&mut self, name: impl Into<String>) -> &mut ColumnDefinition {
        self.column(name, ColumnType::Boolean)
    }

    pub fn float(&mut self, name: impl Into<String>) -> &mut ColumnDefinition {
        self.column(name, ColumnType::Float)
    }

    pub fn timestamp(&mut self, name: impl Into<String>) -> &mut ColumnDefinition {
        self.column(name, ColumnType::Timestamp)
    }

    /// `references("organization")` adds `organization_id` pointing at `organizations(id)`
    pub fn references(&mut self, name: &str) -> &mut ColumnDefinition {
        let table = inflect::pluralize(name);
        self.integer(format!("{name}_id")).references(table)
    }

    pub fn timestamps(&mut self) {
        self.timestamp("created_at").not_null();
        self.timestamp("updated_at").not_null();
    }

    /// Tables this definition references, excluding `own_name`
    pub fn referenced_tables<'a>(&'a self, own_name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.columns
            .iter()
            .filter_map(|c| c.references.as_ref())
            .map(|r| r.table.as_str())
            .filter(move |t| *t != own_name)
    }
}

/// Column as reported by a backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub name: String,
    pub sql_type: String,
    pub nullable: bool,
    pub primary_key: bool,
    pub default: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_references_shortcut() {
        let mut def = TableDefinition::new();
        def.references("organization").not_null().on_delete(OnDelete::Cascade);

        let column = &def.columns[0];
        assert_eq!(column.name, "organization_id");
        assert_eq!(column.column_type, ColumnType::Integer);
        assert!(!column.nullable);
        let reference = column.references.as_ref().unwrap();
        assert_eq!(reference.table, "organizations");
        assert_eq!(reference.column, "id");
        assert_eq!(reference.on_delete, Some(OnDelete::Cascade));
    }

    #[test]
    fn test_column_redefinition_replaces() {
        let mut def = TableDefinition::new();
        def.string("name");
        def.text("name").not_null();
        assert_eq!(def.columns.len(), 1);
        assert_eq!(def.columns[0].column_type, ColumnType::Text);
    }

    #[test]
    fn test_referenced_tables_skip_self() {
        let mut def = TableDefinition::new();
        def.integer("parent_id").references("categories");
        def.references("owner");
        let referenced: Vec<_> = def.referenced_tables("categories").collect();
        assert_eq!(referenced, vec!["owners"]);
    }

    #[test]
    fn test_timestamps_and_options() {
        let mut def = TableDefinition::new();
        def.timestamps();
        let names: Vec<_> = def.columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["created_at", "updated_at"]);

        assert!(TableOptions::default().id);
        assert!(!TableOptions::without_id().id);
    }
}
