//! Common test utilities

use std::rc::Rc;

use transient_tables::{HandleId, ModelRegistry, Registry, SharedModels, SqliteDatabase};

/// Test context backed by a fresh in-memory SQLite database
pub struct TestContext {
    pub db: Rc<SqliteDatabase>,
    pub models: SharedModels,
    /// Root model owning the connection
    pub base: HandleId,
    /// `ApplicationRecord`, the anchor most tests register
    pub app: HandleId,
    pub registry: Registry,
}

impl TestContext {
    /// Create a new test context with a fresh in-memory database
    pub fn new() -> Self {
        let db = Rc::new(SqliteDatabase::open_in_memory().expect("Failed to create test database"));
        let models = ModelRegistry::shared();
        let (base, app) = {
            let mut m = models.borrow_mut();
            let base = m.define_root("Base", db.clone());
            let app = m
                .define_subclass("ApplicationRecord", base)
                .expect("Failed to define ApplicationRecord");
            (base, app)
        };
        let registry = Registry::new(models.clone());

        TestContext {
            db,
            models,
            base,
            app,
            registry,
        }
    }

    /// Insert a row with raw SQL
    #[allow(dead_code)]
    pub fn seed(&self, sql: &str) {
        self.db
            .connection()
            .execute(sql, [])
            .expect("Failed to seed test data");
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}
