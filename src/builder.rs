//! Chained model definition for a freshly created table

use crate::context::Context;
use crate::error::Result;
use crate::inflect;
use crate::models::{HandleId, ModelBody};

/// Returned by [`Context::create_table`]. Defines the model for the table
/// that was just created, named after it (`users` -> `User`).
pub struct ModelBuilder<'a> {
    context: &'a mut Context,
    table: String,
}

impl<'a> ModelBuilder<'a> {
    pub(crate) fn new(context: &'a mut Context, table: String) -> Self {
        Self { context, table }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Name the model will be bound under
    pub fn model_name(&self) -> String {
        inflect::model_name_for_table(&self.table)
    }

    /// Define the model with the context anchor as base and no body
    pub fn define_model(self) -> Result<()> {
        self.define_model_with(None, |_| {})
    }

    /// Define the model from `base` (the anchor when `None`), running `body`
    /// after the table name has been set
    pub fn define_model_with<F>(self, base: Option<HandleId>, body: F) -> Result<()>
    where
        F: FnOnce(&mut ModelBody),
    {
        let name = self.model_name();
        self.context
            .define_model_for(&name, base, Some(&self.table), body)
    }
}
