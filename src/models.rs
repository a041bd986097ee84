//! Model handle registry
//!
//! Models are plain handles in an explicit registry rather than generated
//! types. Each handle records its parent, so ancestry checks are metadata
//! walks. Handles become addressable once a name is bound to them inside a
//! namespace; the global namespace is the empty string.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::inflect;
use crate::schema::SchemaLayer;

pub const GLOBAL_NAMESPACE: &str = "";

/// Registry shared by every context of a process (or test)
pub type SharedModels = Rc<RefCell<ModelRegistry>>;

/// Opaque identity of a model handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct HandleId(u64);

impl std::fmt::Display for HandleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("unknown model handle {0}")]
    UnknownHandle(HandleId),

    #[error("model handle {0} must be bound to a name before its body is evaluated")]
    Unbound(HandleId),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Validation {
    Presence(String),
    Uniqueness(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssociationKind {
    BelongsTo,
    HasMany,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Association {
    pub kind: AssociationKind,
    pub name: String,
    /// Name of the associated model
    pub model: String,
    pub foreign_key: String,
}

/// Definitions installed by a model body callback
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelBody {
    name: String,
    table_name: Option<String>,
    validations: Vec<Validation>,
    associations: Vec<Association>,
}

impl ModelBody {
    /// Name the model was bound to before the body ran
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn table_name(&self) -> Option<&str> {
        self.table_name.as_deref()
    }

    pub fn set_table_name(&mut self, table: impl Into<String>) -> &mut Self {
        self.table_name = Some(table.into());
        self
    }

    pub fn validates_presence_of(&mut self, attribute: impl Into<String>) -> &mut Self {
        self.validations.push(Validation::Presence(attribute.into()));
        self
    }

    pub fn validates_uniqueness_of(&mut self, attribute: impl Into<String>) -> &mut Self {
        self.validations.push(Validation::Uniqueness(attribute.into()));
        self
    }

    /// `belongs_to("organization")` uses `organization_id`
    pub fn belongs_to(&mut self, name: &str) -> &mut Self {
        self.associations.push(Association {
            kind: AssociationKind::BelongsTo,
            name: name.to_string(),
            model: inflect::camelize(name),
            foreign_key: format!("{name}_id"),
        });
        self
    }

    /// `has_many("users")` on `Organization` uses `organization_id`
    pub fn has_many(&mut self, name: &str) -> &mut Self {
        let foreign_key = format!("{}_id", inflect::underscore(&self.name));
        self.associations.push(Association {
            kind: AssociationKind::HasMany,
            name: name.to_string(),
            model: inflect::model_name_for_table(name),
            foreign_key,
        });
        self
    }

    pub fn validations(&self) -> &[Validation] {
        &self.validations
    }

    pub fn associations(&self) -> &[Association] {
        &self.associations
    }
}

struct ModelEntry {
    parent: Option<HandleId>,
    binding: Option<(String, String)>,
    connection: Option<Rc<dyn SchemaLayer>>,
    body: ModelBody,
}

#[derive(Default)]
pub struct ModelRegistry {
    next_id: u64,
    entries: BTreeMap<HandleId, ModelEntry>,
    names: HashMap<(String, String), HandleId>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> SharedModels {
        Rc::new(RefCell::new(Self::new()))
    }

    fn insert(&mut self, parent: Option<HandleId>, connection: Option<Rc<dyn SchemaLayer>>) -> HandleId {
        self.next_id += 1;
        let id = HandleId(self.next_id);
        self.entries.insert(
            id,
            ModelEntry {
                parent,
                binding: None,
                connection,
                body: ModelBody::default(),
            },
        );
        id
    }

    fn entry(&self, handle: HandleId) -> Result<&ModelEntry, ModelError> {
        self.entries
            .get(&handle)
            .ok_or(ModelError::UnknownHandle(handle))
    }

    /// Register a root model owning a database connection
    pub fn define_root(&mut self, name: &str, connection: Rc<dyn SchemaLayer>) -> HandleId {
        let id = self.insert(None, Some(connection));
        self.bind(id, name, GLOBAL_NAMESPACE);
        id
    }

    /// Register a root model that has no connection of its own
    pub fn define_abstract(&mut self, name: &str) -> HandleId {
        let id = self.insert(None, None);
        self.bind(id, name, GLOBAL_NAMESPACE);
        id
    }

    /// Register a named, permanent model in the global namespace
    pub fn define_subclass(&mut self, name: &str, parent: HandleId) -> Result<HandleId, ModelError> {
        let id = self.new_model_handle(parent)?;
        self.bind(id, name, GLOBAL_NAMESPACE);
        Ok(id)
    }

    /// Create an anonymous handle inheriting from `base`
    pub fn new_model_handle(&mut self, base: HandleId) -> Result<HandleId, ModelError> {
        self.entry(base)?;
        Ok(self.insert(Some(base), None))
    }

    /// Bind `name` in `namespace` to `handle`, returning the handle it displaced
    pub fn bind_name(
        &mut self,
        handle: HandleId,
        name: &str,
        namespace: &str,
    ) -> Result<Option<HandleId>, ModelError> {
        self.entry(handle)?;
        Ok(self.bind(handle, name, namespace))
    }

    fn bind(&mut self, handle: HandleId, name: &str, namespace: &str) -> Option<HandleId> {
        let key = (namespace.to_string(), name.to_string());

        let displaced = self.names.insert(key.clone(), handle).filter(|old| *old != handle);
        if let Some(old) = displaced {
            if let Some(entry) = self.entries.get_mut(&old) {
                entry.binding = None;
            }
        }

        if let Some(entry) = self.entries.get_mut(&handle) {
            if let Some(previous) = entry.binding.replace(key) {
                if previous.0 != namespace || previous.1 != name {
                    self.names.remove(&previous);
                }
            }
            entry.body.name = name.to_string();
        }
        displaced
    }

    /// Remove a name binding; the handle itself stays until [`ModelRegistry::reclaim`]
    pub fn unbind(&mut self, namespace: &str, name: &str) -> Option<HandleId> {
        let handle = self
            .names
            .remove(&(namespace.to_string(), name.to_string()))?;
        if let Some(entry) = self.entries.get_mut(&handle) {
            entry.binding = None;
        }
        Some(handle)
    }

    pub fn lookup(&self, namespace: &str, name: &str) -> Option<HandleId> {
        self.names
            .get(&(namespace.to_string(), name.to_string()))
            .copied()
    }

    pub fn contains(&self, handle: HandleId) -> bool {
        self.entries.contains_key(&handle)
    }

    pub fn name(&self, handle: HandleId) -> Option<&str> {
        self.entries
            .get(&handle)?
            .binding
            .as_ref()
            .map(|(_, name)| name.as_str())
    }

    /// `Namespace::Name`, or just `Name` in the global namespace
    pub fn qualified_name(&self, handle: HandleId) -> Option<String> {
        let (namespace, name) = self.entries.get(&handle)?.binding.as_ref()?;
        Some(if namespace.is_empty() {
            name.clone()
        } else {
            format!("{namespace}::{name}")
        })
    }

    /// Human-readable label for error messages
    pub fn describe(&self, handle: HandleId) -> String {
        self.qualified_name(handle)
            .unwrap_or_else(|| format!("anonymous model {handle}"))
    }

    pub fn parent(&self, handle: HandleId) -> Option<HandleId> {
        self.entries.get(&handle)?.parent
    }

    /// True if `handle` is `ancestor` or inherits from it
    pub fn is_descendant(&self, handle: HandleId, ancestor: HandleId) -> bool {
        let mut current = Some(handle);
        while let Some(id) = current {
            if !self.entries.contains_key(&id) {
                return false;
            }
            if id == ancestor {
                return true;
            }
            current = self.parent(id);
        }
        false
    }

    /// Run a body callback against a bound handle
    pub fn evaluate_body<F>(&mut self, handle: HandleId, body: F) -> Result<(), ModelError>
    where
        F: FnOnce(&mut ModelBody),
    {
        let entry = self
            .entries
            .get_mut(&handle)
            .ok_or(ModelError::UnknownHandle(handle))?;
        if entry.binding.is_none() {
            return Err(ModelError::Unbound(handle));
        }
        body(&mut entry.body);
        Ok(())
    }

    pub fn body(&self, handle: HandleId) -> Option<&ModelBody> {
        self.entries.get(&handle).map(|e| &e.body)
    }

    /// Connection of the nearest ancestor (or self) that owns one
    pub fn connection_for(&self, handle: HandleId) -> Option<Rc<dyn SchemaLayer>> {
        let mut current = Some(handle);
        while let Some(id) = current {
            let entry = self.entries.get(&id)?;
            if let Some(conn) = &entry.connection {
                return Some(Rc::clone(conn));
            }
            current = entry.parent;
        }
        None
    }

    /// Live handles inheriting from `handle`, excluding itself
    pub fn descendants(&self, handle: HandleId) -> Vec<HandleId> {
        self.entries
            .keys()
            .copied()
            .filter(|id| *id != handle && self.is_descendant(*id, handle))
            .collect()
    }

    /// Forget the handles in `candidates` that are unbound, own no connection
    /// and have no children. A candidate whose only children were candidates
    /// goes too. Handles outside `candidates` are never touched, whatever
    /// their state. Returns how many were removed.
    pub fn reclaim(&mut self, candidates: &[HandleId]) -> usize {
        let mut removed = 0;
        loop {
            let orphans: Vec<HandleId> = candidates
                .iter()
                .copied()
                .filter(|id| {
                    self.entries.get(id).is_some_and(|entry| {
                        entry.binding.is_none()
                            && entry.connection.is_none()
                            && !self.entries.values().any(|e| e.parent == Some(*id))
                    })
                })
                .collect();
            if orphans.is_empty() {
                return removed;
            }
            for id in orphans {
                if self.entries.remove(&id).is_some() {
                    removed += 1;
                }
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
