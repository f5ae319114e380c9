pub mod json_backend;
pub mod memory;

use crate::{
    errors::StoreError,
    recurring::{RecurringInstance, RecurringTemplate},
};

pub type Result<T> = std::result::Result<T, StoreError>;

/// A stored document that could not be decoded, such as a template whose
/// `startDate` is not a calendar day. Stores skip it on reads and keep it
/// untouched on writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedDocument {
    pub id: Option<String>,
    pub reason: String,
}

impl RejectedDocument {
    pub fn label(&self) -> &str {
        self.id.as_deref().unwrap_or("<missing id>")
    }
}

/// Document-collection view of one user's templates and instances.
///
/// Implementations must be safe to share between threads. The materializer
/// relies on [`RecurringStore::merge_instance`] being a create-if-absent
/// write keyed by instance id: two writers racing on the same id must leave a
/// single record behind and must never overwrite a record that already exists.
pub trait RecurringStore: Send + Sync {
    fn list_templates(&self) -> Result<Vec<RecurringTemplate>>;
    fn list_instances(&self) -> Result<Vec<RecurringInstance>>;

    fn template(&self, id: &str) -> Result<Option<RecurringTemplate>>;
    fn instance(&self, id: &str) -> Result<Option<RecurringInstance>>;

    /// Creates or replaces the template with `template.id`.
    fn save_template(&self, template: &RecurringTemplate) -> Result<()>;

    /// Removes the template document only. Use [`delete_template_cascade`]
    /// to also remove its instances.
    fn delete_template(&self, id: &str) -> Result<bool>;

    /// Writes `instance` only if no record with its id exists yet. Returns
    /// `true` when this call created the record.
    fn merge_instance(&self, instance: &RecurringInstance) -> Result<bool>;

    /// Creates or replaces an instance; used for explicit status changes.
    fn save_instance(&self, instance: &RecurringInstance) -> Result<()>;

    fn delete_instance(&self, id: &str) -> Result<bool>;

    /// Template documents left out of [`RecurringStore::list_templates`]
    /// because they could not be decoded.
    fn rejected_templates(&self) -> Result<Vec<RejectedDocument>> {
        Ok(Vec::new())
    }

    fn instances_for_template(&self, template_id: &str) -> Result<Vec<RecurringInstance>> {
        Ok(self
            .list_instances()?
            .into_iter()
            .filter(|instance| instance.template_id == template_id)
            .collect())
    }
}

/// Deletes a template and every instance that references it.
///
/// Instances go first: if the pass is interrupted the template is still there
/// and a retry finishes the job, so no orphans are left behind.
pub fn delete_template_cascade(store: &dyn RecurringStore, template_id: &str) -> Result<usize> {
    let mut removed = 0usize;
    for instance in store.instances_for_template(template_id)? {
        if store.delete_instance(&instance.id)? {
            removed += 1;
        }
    }
    store.delete_template(template_id)?;
    tracing::debug!(template_id, removed, "cascade-deleted template instances");
    Ok(removed)
}

pub use json_backend::JsonStore;
pub use memory::MemoryStore;
