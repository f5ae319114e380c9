use std::{
    collections::BTreeMap,
    sync::{RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use super::{RecurringStore, Result};
use crate::{
    errors::StoreError,
    recurring::{RecurringInstance, RecurringTemplate},
};

#[derive(Debug, Default)]
struct Collections {
    templates: BTreeMap<String, RecurringTemplate>,
    instances: BTreeMap<String, RecurringInstance>,
}

/// Process-local store. Used by tests and as the working set of the shell.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Collections>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_data(templates: Vec<RecurringTemplate>, instances: Vec<RecurringInstance>) -> Self {
        let collections = Collections {
            templates: templates.into_iter().map(|t| (t.id.clone(), t)).collect(),
            instances: instances.into_iter().map(|i| (i.id.clone(), i)).collect(),
        };
        Self {
            inner: RwLock::new(collections),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Collections>> {
        self.inner
            .read()
            .map_err(|_| StoreError::Transient("memory store lock poisoned".into()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Collections>> {
        self.inner
            .write()
            .map_err(|_| StoreError::Transient("memory store lock poisoned".into()))
    }
}

impl RecurringStore for MemoryStore {
    fn list_templates(&self) -> Result<Vec<RecurringTemplate>> {
        Ok(self.read()?.templates.values().cloned().collect())
    }

    fn list_instances(&self) -> Result<Vec<RecurringInstance>> {
        Ok(self.read()?.instances.values().cloned().collect())
    }

    fn template(&self, id: &str) -> Result<Option<RecurringTemplate>> {
        Ok(self.read()?.templates.get(id).cloned())
    }

    fn instance(&self, id: &str) -> Result<Option<RecurringInstance>> {
        Ok(self.read()?.instances.get(id).cloned())
    }

    fn save_template(&self, template: &RecurringTemplate) -> Result<()> {
        self.write()?
            .templates
            .insert(template.id.clone(), template.clone());
        Ok(())
    }

    fn delete_template(&self, id: &str) -> Result<bool> {
        Ok(self.write()?.templates.remove(id).is_some())
    }

    fn merge_instance(&self, instance: &RecurringInstance) -> Result<bool> {
        let mut guard = self.write()?;
        if guard.instances.contains_key(&instance.id) {
            return Ok(false);
        }
        guard.instances.insert(instance.id.clone(), instance.clone());
        Ok(true)
    }

    fn save_instance(&self, instance: &RecurringInstance) -> Result<()> {
        self.write()?
            .instances
            .insert(instance.id.clone(), instance.clone());
        Ok(())
    }

    fn delete_instance(&self, id: &str) -> Result<bool> {
        Ok(self.write()?.instances.remove(id).is_some())
    }
}
