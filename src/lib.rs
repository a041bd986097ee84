//! Test-scoped database tables and model handles.
//!
//! A [`Registry`] hands out one [`Context`] per anchor model. Tables created
//! through a context, and models defined in it, are tracked and removed by
//! [`Context::cleanup`] or [`Registry::cleanup_all`] without the caller
//! ordering drops around foreign keys.

pub mod builder;
pub mod cleanup;
pub mod config;
pub mod context;
pub mod db;
pub mod error;
pub mod inflect;
pub mod logging;
pub mod models;
pub mod registry;
pub mod schema;

pub use builder::ModelBuilder;
pub use cleanup::{CleanupReport, attempt_budget};
pub use config::{DatabaseConfig, LoggingConfig, TransientConfig};
pub use context::{CleanupGuard, Context};
pub use db::SqliteDatabase;
pub use error::{Result, SchemaError, TransientError};
pub use models::{HandleId, ModelBody, ModelError, ModelRegistry, SharedModels};
pub use registry::Registry;
pub use schema::{
    ColumnInfo, ColumnType, DropOptions, MemorySchema, QueryResult, SchemaLayer, TableDefinition,
    TableOptions,
};
