//! Teardown of a context's tables and models
//!
//! Tables are dropped without knowing how they reference each other. Each
//! table is tried in turn, and one blocked by a foreign key goes to the back
//! of the queue. While k tables remain, some table in the queue is not
//! referenced by any other (the references are acyclic), so one of the next
//! k attempts succeeds. Dropping n tables therefore takes at most
//! n + (n - 1) + ... + 1 = n(n + 1) / 2 attempts. Anything still queued after
//! that many attempts is part of a reference cycle or fails for a reason the
//! backend misreports as referential.

use std::collections::VecDeque;

use tracing::{debug, info, warn};

use crate::context::Context;
use crate::error::{Result, TransientError};
use crate::models::HandleId;
use crate::schema::{DropOptions, SchemaLayer};

/// Attempts needed to drop `tables` tables in the worst acyclic ordering
pub fn attempt_budget(tables: usize) -> usize {
    tables * (tables + 1) / 2
}

/// Counters from a [`drop_tables`] run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DropOutcome {
    pub dropped: usize,
    pub attempts: usize,
}

/// What a successful [`Context::cleanup`] removed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanupReport {
    pub models_removed: usize,
    pub tables_dropped: usize,
    pub attempts: usize,
    /// Handles this context retired that the registry then forgot
    pub reclaimed: usize,
}

/// Drop every table in `pending`, front to back.
///
/// Tables blocked by a reference are re-queued at the back. Returns once the
/// queue is empty or the attempt budget for its initial length is spent;
/// whatever is left in `pending` could not be dropped. Any other failure
/// stops immediately, leaving the failed table at the front of the queue.
pub fn drop_tables(schema: &dyn SchemaLayer, pending: &mut VecDeque<String>) -> Result<DropOutcome> {
    let budget = attempt_budget(pending.len());
    let mut outcome = DropOutcome::default();

    while outcome.attempts < budget {
        let Some(table) = pending.pop_front() else {
            break;
        };
        outcome.attempts += 1;

        match schema.drop_table(&table, DropOptions::default()) {
            Ok(()) => {
                debug!(%table, attempt = outcome.attempts, "dropped table");
                outcome.dropped += 1;
            }
            Err(err) if err.is_referential() => {
                debug!(%table, attempt = outcome.attempts, "deferring drop: {err}");
                pending.push_back(table);
            }
            Err(source) => {
                pending.push_front(table.clone());
                return Err(TransientError::Drop { table, source });
            }
        }
    }

    Ok(outcome)
}

impl Context {
    /// Remove every tracked model, then drop every tracked table.
    ///
    /// The context stays registered and can be reused. On failure it keeps
    /// tracking the tables that could not be dropped.
    pub fn cleanup(&mut self) -> Result<CleanupReport> {
        let mut report = CleanupReport::default();

        {
            let mut models = self.models.borrow_mut();
            for (name, handle) in std::mem::take(&mut self.tracked_models) {
                if models.lookup(&self.namespace, &name) == Some(handle) {
                    models.unbind(&self.namespace, &name);
                }
                self.retired.insert(handle);
                report.models_removed += 1;
            }
        }

        if !self.tables.is_empty() {
            let schema = self.connection()?;
            let outcome = drop_tables(schema.as_ref(), &mut self.tables)?;
            report.tables_dropped = outcome.dropped;
            report.attempts = outcome.attempts;

            if !self.tables.is_empty() {
                let remaining: Vec<String> = self.tables.iter().cloned().collect();
                warn!(
                    context = %self.namespace,
                    attempts = outcome.attempts,
                    remaining = ?remaining,
                    "attempt budget exhausted"
                );
                return Err(TransientError::Cleanup {
                    context: self.namespace.clone(),
                    remaining,
                });
            }
        }

        {
            let mut models = self.models.borrow_mut();
            let candidates: Vec<HandleId> = self.retired.iter().copied().collect();
            report.reclaimed = models.reclaim(&candidates);
            self.retired.retain(|handle| models.contains(*handle));
        }
        info!(
            context = %self.namespace,
            models = report.models_removed,
            tables = report.tables_dropped,
            attempts = report.attempts,
            "cleaned up transient resources"
        );
        Ok(report)
    }
}
