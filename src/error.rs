//! Error types for transient tables and models

use thiserror::Error;

use crate::models::ModelError;

/// Errors reported by a schema backend
#[derive(Debug, Error)]
pub enum SchemaError {
    /// The target is still referenced by another existing table.
    /// This is the only failure the cleanup engine retries.
    #[error("table '{table}' is referenced by another table: {message}")]
    ReferentialDependency { table: String, message: String },

    #[error("table '{0}' does not exist")]
    MissingTable(String),

    #[error("table '{0}' already exists")]
    TableExists(String),

    #[error("backend error: {0}")]
    Backend(String),

    #[error("unsupported by this backend: {0}")]
    Unsupported(&'static str),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

impl SchemaError {
    pub fn is_referential(&self) -> bool {
        matches!(self, Self::ReferentialDependency { .. })
    }
}

/// Errors surfaced to callers of contexts and the registry
#[derive(Debug, Error)]
pub enum TransientError {
    /// A model base does not descend from the context anchor
    #[error("{base} is not a descendant of {required}; transient models must inherit from it")]
    Configuration { base: String, required: String },

    #[error("failed to create table '{table}': {source}")]
    SchemaOperation {
        table: String,
        #[source]
        source: SchemaError,
    },

    #[error("failed to drop table '{table}': {source}")]
    Drop {
        table: String,
        #[source]
        source: SchemaError,
    },

    #[error(
        "could not drop all tables of {context}, remaining: {}",
        .remaining.join(", ")
    )]
    Cleanup {
        context: String,
        remaining: Vec<String>,
    },

    #[error("query '{label}' failed: {source}")]
    Query {
        label: String,
        #[source]
        source: SchemaError,
    },

    #[error("{anchor} has no database connection")]
    NoConnection { anchor: String },

    #[error("invalid {kind} name: {value:?}")]
    InvalidIdentifier { kind: &'static str, value: String },

    #[error(transparent)]
    Model(#[from] ModelError),
}

pub type Result<T, E = TransientError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cleanup_error_lists_remaining_tables() {
        let err = TransientError::Cleanup {
            context: "Transient::ApplicationRecord".to_string(),
            remaining: vec!["users".to_string(), "organizations".to_string()],
        };
        let message = err.to_string();
        assert!(message.contains("Transient::ApplicationRecord"));
        assert!(message.contains("users, organizations"));
    }

    #[test]
    fn test_configuration_error_names_both_handles() {
        let err = TransientError::Configuration {
            base: "Legacy".to_string(),
            required: "ApplicationRecord".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Legacy is not a descendant of ApplicationRecord; transient models must inherit from it"
        );
    }

    #[test]
    fn test_only_referential_failures_are_referential() {
        let referential = SchemaError::ReferentialDependency {
            table: "organizations".to_string(),
            message: "FOREIGN KEY constraint failed".to_string(),
        };
        assert!(referential.is_referential());
        assert!(!SchemaError::MissingTable("users".to_string()).is_referential());
        assert!(!SchemaError::Unsupported("raw SQL").is_referential());
    }
}
