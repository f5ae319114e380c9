//! Validated lifecycle operations for recurring templates.

use tracing::info;
use uuid::Uuid;

use crate::core::clock::Clock;
use crate::errors::{RecurringError, Result};
use crate::recurring::{RecurringTemplate, TemplateDraft, TemplatePatch, TemplateStatus};
use crate::storage::{delete_template_cascade, RecurringStore};

/// Provides validated CRUD helpers for templates. Validation always happens
/// before the store is touched.
pub struct TemplateService;

impl TemplateService {
    /// Creates a template from a draft and returns it with its new id.
    pub fn create(
        store: &dyn RecurringStore,
        clock: &dyn Clock,
        draft: TemplateDraft,
    ) -> Result<RecurringTemplate> {
        let template = draft.into_template(Uuid::new_v4().to_string(), clock.now())?;
        store.save_template(&template)?;
        info!(id = %template.id, name = %template.name, "created recurring template");
        Ok(template)
    }

    pub fn get(store: &dyn RecurringStore, id: &str) -> Result<RecurringTemplate> {
        store
            .template(id)?
            .ok_or_else(|| RecurringError::TemplateNotFound(id.to_string()))
    }

    /// Applies `patch` to the stored template. Already materialized instances
    /// keep their snapshots; only future passes see the new values.
    pub fn update(
        store: &dyn RecurringStore,
        clock: &dyn Clock,
        id: &str,
        patch: &TemplatePatch,
    ) -> Result<RecurringTemplate> {
        if patch.is_empty() {
            return Err(RecurringError::InvalidOperation("nothing to update".into()));
        }
        let current = Self::get(store, id)?;
        let updated = patch.apply(&current, clock.now())?;
        store.save_template(&updated)?;
        Ok(updated)
    }

    /// Stops generation. Existing instances are left in place.
    pub fn pause(store: &dyn RecurringStore, clock: &dyn Clock, id: &str) -> Result<RecurringTemplate> {
        Self::set_status(store, clock, id, TemplateStatus::Paused)
    }

    pub fn resume(store: &dyn RecurringStore, clock: &dyn Clock, id: &str) -> Result<RecurringTemplate> {
        Self::set_status(store, clock, id, TemplateStatus::Active)
    }

    /// Deletes the template and all of its instances, returning how many
    /// instances were removed.
    pub fn delete(store: &dyn RecurringStore, id: &str) -> Result<usize> {
        let exists = store.template(id)?.is_some();
        let removed = delete_template_cascade(store, id)?;
        if !exists && removed == 0 {
            return Err(RecurringError::TemplateNotFound(id.to_string()));
        }
        info!(id, removed, "deleted recurring template");
        Ok(removed)
    }

    fn set_status(
        store: &dyn RecurringStore,
        clock: &dyn Clock,
        id: &str,
        status: TemplateStatus,
    ) -> Result<RecurringTemplate> {
        let mut template = Self::get(store, id)?;
        if template.status == status {
            return Ok(template);
        }
        template.status = status;
        template.updated_at = Some(clock.now());
        store.save_template(&template)?;
        info!(id, %status, "changed template status");
        Ok(template)
    }
}
