//! Registry of contexts, one per anchor model

use tracing::{debug, warn};

use crate::config::TransientConfig;
use crate::context::Context;
use crate::error::Result;
use crate::models::{HandleId, SharedModels};

pub const DEFAULT_NAMESPACE_PREFIX: &str = "Transient";

/// Owns every context created for a model registry.
///
/// Contexts are created on first use and never removed; cleanup only
/// empties them.
pub struct Registry {
    models: SharedModels,
    namespace_prefix: String,
    contexts: Vec<Context>,
}

impl Registry {
    pub fn new(models: SharedModels) -> Self {
        Self {
            models,
            namespace_prefix: DEFAULT_NAMESPACE_PREFIX.to_string(),
            contexts: Vec::new(),
        }
    }

    pub fn with_config(models: SharedModels, config: &TransientConfig) -> Self {
        Self {
            namespace_prefix: config.namespace_prefix.clone(),
            ..Self::new(models)
        }
    }

    pub fn models(&self) -> &SharedModels {
        &self.models
    }

    /// The context for `anchor`, created empty on first request
    pub fn context_for(&mut self, anchor: HandleId) -> &mut Context {
        let idx = match self.contexts.iter().position(|c| c.anchor == anchor) {
            Some(idx) => idx,
            None => {
                let context = Context::new(anchor, self.models.clone(), &self.namespace_prefix);
                debug!(namespace = %context.namespace, "registered context");
                self.contexts.push(context);
                self.contexts.len() - 1
            }
        };
        &mut self.contexts[idx]
    }

    pub fn get(&self, anchor: HandleId) -> Option<&Context> {
        self.contexts.iter().find(|c| c.anchor == anchor)
    }

    /// Contexts in registration order
    pub fn contexts(&self) -> impl Iterator<Item = &Context> {
        self.contexts.iter()
    }

    pub fn len(&self) -> usize {
        self.contexts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contexts.is_empty()
    }

    /// Clean up every context in registration order.
    ///
    /// A failing context does not stop the others from being cleaned; the
    /// first failure is returned once all have been attempted.
    pub fn cleanup_all(&mut self) -> Result<()> {
        let mut first_error = None;
        for context in &mut self.contexts {
            if let Err(err) = context.cleanup() {
                warn!(context = %context.namespace, "cleanup failed: {err}");
                first_error.get_or_insert(err);
            }
        }

        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::*;
    use crate::error::TransientError;
    use crate::models::ModelRegistry;
    use crate::schema::{MemorySchema, SchemaLayer, TableOptions};

    #[test]
    fn test_same_anchor_same_context() {
        let models = ModelRegistry::shared();
        let (primary, analytics) = {
            let mut m = models.borrow_mut();
            (
                m.define_root("ApplicationRecord", Rc::new(MemorySchema::new())),
                m.define_root("AnalyticsRecord", Rc::new(MemorySchema::new())),
            )
        };
        let mut registry = Registry::new(models);

        let first: *const Context = registry.context_for(primary);
        let again: *const Context = registry.context_for(primary);
        let other: *const Context = registry.context_for(analytics);

        assert!(std::ptr::eq(first, again));
        assert!(!std::ptr::eq(first, other));
        assert_eq!(registry.len(), 2);
        assert_eq!(
            registry.get(analytics).map(Context::namespace),
            Some("Transient::AnalyticsRecord")
        );
    }

    #[test]
    fn test_namespace_prefix_from_config() {
        let models = ModelRegistry::shared();
        let root = models
            .borrow_mut()
            .define_root("ApplicationRecord", Rc::new(MemorySchema::new()));
        let config = TransientConfig {
            namespace_prefix: "Fixtures".to_string(),
            ..TransientConfig::default()
        };
        let mut registry = Registry::with_config(models, &config);
        assert_eq!(
            registry.context_for(root).namespace(),
            "Fixtures::ApplicationRecord"
        );
    }

    #[test]
    fn test_cleanup_all_attempts_every_context() {
        let models = ModelRegistry::shared();
        let broken = Rc::new(MemorySchema::new());
        let healthy = Rc::new(MemorySchema::new());
        let (first, second) = {
            let mut m = models.borrow_mut();
            (
                m.define_root("BrokenRecord", broken.clone()),
                m.define_root("HealthyRecord", healthy.clone()),
            )
        };
        let mut registry = Registry::new(models);

        registry
            .context_for(first)
            .create_table("stuck", TableOptions::default(), |_| {})
            .unwrap();
        broken.reject_drops("stuck");
        registry
            .context_for(second)
            .create_table("users", TableOptions::default(), |_| {})
            .unwrap()
            .define_model()
            .unwrap();

        let err = registry.cleanup_all().unwrap_err();
        assert!(matches!(err, TransientError::Drop { ref table, .. } if table == "stuck"));
        assert!(!healthy.table_exists("users").unwrap());
        assert!(registry.get(second).unwrap().tracked_models().is_empty());
        assert_eq!(registry.get(first).unwrap().tables().collect::<Vec<_>>(), vec!["stuck"]);

        broken.accept_drops("stuck");
        registry.cleanup_all().unwrap();
        assert!(!broken.table_exists("stuck").unwrap());
    }
}
