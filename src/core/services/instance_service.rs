//! User-driven status changes on materialized instances.

use tracing::info;

use crate::core::clock::Clock;
use crate::errors::{RecurringError, Result};
use crate::recurring::RecurringInstance;
use crate::storage::RecurringStore;

pub struct InstanceService;

impl InstanceService {
    pub fn get(store: &dyn RecurringStore, id: &str) -> Result<RecurringInstance> {
        store
            .instance(id)?
            .ok_or_else(|| RecurringError::InstanceNotFound(id.to_string()))
    }

    /// Marks the instance paid, optionally linking the ledger transaction
    /// that settled it.
    pub fn mark_paid(
        store: &dyn RecurringStore,
        clock: &dyn Clock,
        id: &str,
        linked_transaction_id: Option<String>,
    ) -> Result<RecurringInstance> {
        Self::update(store, id, |instance| {
            instance.mark_paid(linked_transaction_id, clock.now())
        })
    }

    pub fn skip(store: &dyn RecurringStore, clock: &dyn Clock, id: &str) -> Result<RecurringInstance> {
        Self::update(store, id, |instance| instance.skip(clock.now()))
    }

    /// Undoes a paid/skipped mark.
    pub fn reset(store: &dyn RecurringStore, clock: &dyn Clock, id: &str) -> Result<RecurringInstance> {
        Self::update(store, id, |instance| instance.reset(clock.now()))
    }

    /// Removes one instance. A later reconcile pass recreates it if it is
    /// still inside the window.
    pub fn delete(store: &dyn RecurringStore, id: &str) -> Result<()> {
        if !store.delete_instance(id)? {
            return Err(RecurringError::InstanceNotFound(id.to_string()));
        }
        info!(id, "deleted recurring instance");
        Ok(())
    }

    fn update<F>(store: &dyn RecurringStore, id: &str, mutator: F) -> Result<RecurringInstance>
    where
        F: FnOnce(&mut RecurringInstance),
    {
        let mut instance = Self::get(store, id)?;
        mutator(&mut instance);
        store.save_instance(&instance)?;
        info!(id, status = %instance.status, "updated recurring instance");
        Ok(instance)
    }
}
