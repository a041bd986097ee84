//! Contexts: the transient tables and models bound to one anchor model

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::ops::{Deref, DerefMut};
use std::rc::Rc;

use tracing::{debug, error};

use crate::builder::ModelBuilder;
use crate::error::{Result, TransientError};
use crate::inflect;
use crate::models::{HandleId, ModelBody, SharedModels};
use crate::schema::{ColumnInfo, QueryResult, SchemaLayer, TableDefinition, TableOptions};

const DEFAULT_QUERY_LABEL: &str = "SQL";

/// Tables and models created for one anchor, torn down together by
/// [`Context::cleanup`].
///
/// A context is not synchronized. Tests sharing one must run sequentially.
pub struct Context {
    pub(crate) anchor: HandleId,
    pub(crate) namespace: String,
    pub(crate) models: SharedModels,
    pub(crate) tables: VecDeque<String>,
    pub(crate) tracked_models: BTreeMap<String, HandleId>,
    /// Handles this context unbound or displaced, reclaimed after cleanup
    pub(crate) retired: BTreeSet<HandleId>,
}

impl Context {
    pub(crate) fn new(anchor: HandleId, models: SharedModels, namespace_prefix: &str) -> Self {
        let anchor_name = models
            .borrow()
            .qualified_name(anchor)
            .unwrap_or_else(|| anchor.to_string());
        let namespace = if namespace_prefix.is_empty() {
            anchor_name
        } else {
            format!("{namespace_prefix}::{anchor_name}")
        };

        Self {
            anchor,
            namespace,
            models,
            tables: VecDeque::new(),
            tracked_models: BTreeMap::new(),
            retired: BTreeSet::new(),
        }
    }

    pub fn anchor(&self) -> HandleId {
        self.anchor
    }

    /// Namespace transient model names are bound in
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Tracked table names in creation order
    pub fn tables(&self) -> impl Iterator<Item = &str> {
        self.tables.iter().map(String::as_str)
    }

    pub fn tracked_models(&self) -> &BTreeMap<String, HandleId> {
        &self.tracked_models
    }

    /// Handle currently tracked under `name`
    pub fn model(&self, name: &str) -> Option<HandleId> {
        let name = inflect::canonical_model_name(name)?;
        self.tracked_models.get(&name).copied()
    }

    pub fn models(&self) -> &SharedModels {
        &self.models
    }

    pub(crate) fn connection(&self) -> Result<Rc<dyn SchemaLayer>> {
        let models = self.models.borrow();
        models
            .connection_for(self.anchor)
            .ok_or_else(|| TransientError::NoConnection {
                anchor: models.describe(self.anchor),
            })
    }

    /// Create a table and start tracking it.
    ///
    /// `definition` fills in the columns. If the backend fails, nothing is
    /// tracked and the failure is returned as [`TransientError::SchemaOperation`].
    pub fn create_table<F>(
        &mut self,
        name: impl AsRef<str>,
        options: TableOptions,
        definition: F,
    ) -> Result<ModelBuilder<'_>>
    where
        F: FnOnce(&mut TableDefinition),
    {
        let table = inflect::canonical_table_name(name.as_ref()).ok_or_else(|| {
            TransientError::InvalidIdentifier {
                kind: "table",
                value: name.as_ref().to_string(),
            }
        })?;
        let schema = self.connection()?;

        let mut def = TableDefinition::new();
        definition(&mut def);

        schema
            .create_table(&table, &options, &def)
            .map_err(|source| TransientError::SchemaOperation {
                table: table.clone(),
                source,
            })?;

        debug!(context = %self.namespace, %table, columns = def.columns.len(), "created transient table");
        self.tables.push_back(table.clone());
        Ok(ModelBuilder::new(self, table))
    }

    /// Define a model inheriting from `base` (the anchor when `None`) and
    /// bind it as `<namespace>::<name>`. A model already tracked under the
    /// same name is replaced.
    pub fn define_model<F>(&mut self, name: impl AsRef<str>, base: Option<HandleId>, body: F) -> Result<()>
    where
        F: FnOnce(&mut ModelBody),
    {
        self.define_model_for(name.as_ref(), base, None, body)
    }

    pub(crate) fn define_model_for<F>(
        &mut self,
        name: &str,
        base: Option<HandleId>,
        table: Option<&str>,
        body: F,
    ) -> Result<()>
    where
        F: FnOnce(&mut ModelBody),
    {
        let name = inflect::canonical_model_name(name).ok_or_else(|| TransientError::InvalidIdentifier {
            kind: "model",
            value: name.to_string(),
        })?;
        let base = base.unwrap_or(self.anchor);

        let mut models = self.models.borrow_mut();
        if !models.is_descendant(base, self.anchor) {
            return Err(TransientError::Configuration {
                base: models.describe(base),
                required: models.describe(self.anchor),
            });
        }

        let handle = models.new_model_handle(base)?;
        if let Some(displaced) = models.bind_name(handle, &name, &self.namespace)? {
            self.retired.insert(displaced);
        }
        if let Some(previous) = self.tracked_models.insert(name.clone(), handle) {
            self.retired.insert(previous);
        }

        if let Some(table) = table {
            models.evaluate_body(handle, |b| {
                b.set_table_name(table);
            })?;
        }
        models.evaluate_body(handle, body)?;

        debug!(context = %self.namespace, model = %name, %handle, "defined transient model");
        Ok(())
    }

    /// Run a raw statement on the anchor's connection
    pub fn execute(&self, query: &str, label: Option<&str>) -> Result<QueryResult> {
        let label = label.unwrap_or(DEFAULT_QUERY_LABEL);
        self.connection()?
            .execute_raw(query, label)
            .map_err(|source| TransientError::Query {
                label: label.to_string(),
                source,
            })
    }

    /// All tables in the database, tracked or not
    pub fn existing_tables(&self) -> Result<Vec<String>> {
        self.connection()?
            .list_tables()
            .map_err(|source| TransientError::Query {
                label: "list tables".to_string(),
                source,
            })
    }

    pub fn columns(&self, table: &str) -> Result<Vec<ColumnInfo>> {
        self.connection()?
            .list_columns(table)
            .map_err(|source| TransientError::Query {
                label: format!("list columns of {table}"),
                source,
            })
    }

    /// Borrow the context behind a guard that cleans up when dropped
    pub fn guard(&mut self) -> CleanupGuard<'_> {
        CleanupGuard { context: self }
    }
}

/// Runs [`Context::cleanup`] on drop, including during a panic
pub struct CleanupGuard<'a> {
    context: &'a mut Context,
}

impl Deref for CleanupGuard<'_> {
    type Target = Context;

    fn deref(&self) -> &Context {
        self.context
    }
}

impl DerefMut for CleanupGuard<'_> {
    fn deref_mut(&mut self) -> &mut Context {
        self.context
    }
}

impl Drop for CleanupGuard<'_> {
    fn drop(&mut self) {
        if let Err(err) = self.context.cleanup() {
            error!(context = %self.context.namespace, "cleanup on drop failed: {err}");
        }
    }
}
