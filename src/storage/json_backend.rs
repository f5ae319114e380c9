use std::{
    collections::BTreeMap,
    fs::{self, File},
    io::{self, Write},
    path::{Path, PathBuf},
    sync::{Mutex, MutexGuard},
};

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tracing::debug;

use super::{RecurringStore, RejectedDocument, Result};
use crate::{
    core::utils::ensure_dir,
    errors::StoreError,
    recurring::{RecurringInstance, RecurringTemplate},
};

const USERS_DIR: &str = "users";
const TEMPLATES_FILE: &str = "recurringTemplates.json";
const INSTANCES_FILE: &str = "recurringInstances.json";
const TMP_SUFFIX: &str = "tmp";

/// File-backed store holding one user's collections as two JSON documents
/// under `<root>/users/<user>/`.
///
/// Writes are staged to a temporary file and renamed into place. A process
/// wide mutex serializes read-modify-write cycles so `merge_instance` keeps
/// its create-if-absent guarantee for concurrent callers sharing a store.
///
/// Each array entry is decoded on its own. Entries that fail to decode are
/// hidden from reads, written back verbatim, and their ids count as taken.
#[derive(Debug)]
pub struct JsonStore {
    user_dir: PathBuf,
    write_lock: Mutex<()>,
}

/// Decoded documents keyed by id, plus the raw entries that did not decode.
#[derive(Debug)]
struct Collection<T> {
    docs: BTreeMap<String, T>,
    rejected: Vec<RawDocument>,
}

#[derive(Debug)]
struct RawDocument {
    id: Option<String>,
    raw: Value,
    reason: String,
}

impl<T> Collection<T> {
    fn contains(&self, id: &str) -> bool {
        self.docs.contains_key(id) || self.rejected.iter().any(|doc| doc.id.as_deref() == Some(id))
    }

    /// Drops undecodable entries with `id`; returns `true` if any existed.
    fn forget_rejected(&mut self, id: &str) -> bool {
        let before = self.rejected.len();
        self.rejected.retain(|doc| doc.id.as_deref() != Some(id));
        before != self.rejected.len()
    }

    fn remove(&mut self, id: &str) -> bool {
        let removed = self.docs.remove(id).is_some();
        self.forget_rejected(id) || removed
    }
}

/// Serialized form of one array entry.
#[derive(Serialize)]
#[serde(untagged)]
enum Entry<'a, T> {
    Decoded(&'a T),
    Raw(&'a Value),
}

impl JsonStore {
    pub fn open(root: &Path, user: &str) -> Result<Self> {
        let user_dir = root.join(USERS_DIR).join(canonical_name(user));
        ensure_dir(&user_dir)?;
        Ok(Self {
            user_dir,
            write_lock: Mutex::new(()),
        })
    }

    pub fn user_dir(&self) -> &Path {
        &self.user_dir
    }

    fn templates_path(&self) -> PathBuf {
        self.user_dir.join(TEMPLATES_FILE)
    }

    fn instances_path(&self) -> PathBuf {
        self.user_dir.join(INSTANCES_FILE)
    }

    fn lock(&self) -> Result<MutexGuard<'_, ()>> {
        self.write_lock
            .lock()
            .map_err(|_| StoreError::Transient("json store lock poisoned".into()))
    }

    fn load_templates(&self) -> Result<Collection<RecurringTemplate>> {
        read_collection(&self.templates_path(), |t: &RecurringTemplate| t.id.clone())
    }

    fn load_instances(&self) -> Result<Collection<RecurringInstance>> {
        read_collection(&self.instances_path(), |i: &RecurringInstance| i.id.clone())
    }
}

impl RecurringStore for JsonStore {
    fn list_templates(&self) -> Result<Vec<RecurringTemplate>> {
        Ok(self.load_templates()?.docs.into_values().collect())
    }

    fn list_instances(&self) -> Result<Vec<RecurringInstance>> {
        Ok(self.load_instances()?.docs.into_values().collect())
    }

    fn template(&self, id: &str) -> Result<Option<RecurringTemplate>> {
        Ok(self.load_templates()?.docs.remove(id))
    }

    fn instance(&self, id: &str) -> Result<Option<RecurringInstance>> {
        Ok(self.load_instances()?.docs.remove(id))
    }

    fn save_template(&self, template: &RecurringTemplate) -> Result<()> {
        let _guard = self.lock()?;
        let mut collection = self.load_templates()?;
        collection.forget_rejected(&template.id);
        collection.docs.insert(template.id.clone(), template.clone());
        write_collection(&self.templates_path(), &collection)
    }

    fn delete_template(&self, id: &str) -> Result<bool> {
        let _guard = self.lock()?;
        let mut collection = self.load_templates()?;
        let removed = collection.remove(id);
        if removed {
            write_collection(&self.templates_path(), &collection)?;
        }
        Ok(removed)
    }

    fn merge_instance(&self, instance: &RecurringInstance) -> Result<bool> {
        let _guard = self.lock()?;
        let mut collection = self.load_instances()?;
        if collection.contains(&instance.id) {
            return Ok(false);
        }
        collection.docs.insert(instance.id.clone(), instance.clone());
        write_collection(&self.instances_path(), &collection)?;
        Ok(true)
    }

    fn save_instance(&self, instance: &RecurringInstance) -> Result<()> {
        let _guard = self.lock()?;
        let mut collection = self.load_instances()?;
        collection.forget_rejected(&instance.id);
        collection.docs.insert(instance.id.clone(), instance.clone());
        write_collection(&self.instances_path(), &collection)
    }

    fn delete_instance(&self, id: &str) -> Result<bool> {
        let _guard = self.lock()?;
        let mut collection = self.load_instances()?;
        let removed = collection.remove(id);
        if removed {
            write_collection(&self.instances_path(), &collection)?;
        }
        Ok(removed)
    }

    fn rejected_templates(&self) -> Result<Vec<RejectedDocument>> {
        Ok(self
            .load_templates()?
            .rejected
            .into_iter()
            .map(|doc| RejectedDocument {
                id: doc.id,
                reason: doc.reason,
            })
            .collect())
    }
}

/// Reads a JSON array, decoding each entry separately. A file that is not a
/// JSON array at all is `Corrupt`.
fn read_collection<T, F>(path: &Path, key: F) -> Result<Collection<T>>
where
    T: DeserializeOwned,
    F: Fn(&T) -> String,
{
    let mut collection = Collection {
        docs: BTreeMap::new(),
        rejected: Vec::new(),
    };
    let data = match fs::read_to_string(path) {
        Ok(data) => data,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(collection),
        Err(err) => return Err(err.into()),
    };
    if data.trim().is_empty() {
        return Ok(collection);
    }
    let entries: Vec<Value> = serde_json::from_str(&data)
        .map_err(|err| StoreError::Corrupt(format!("{}: {}", path.display(), err)))?;

    for raw in entries {
        match serde_json::from_value::<T>(raw.clone()) {
            Ok(doc) => {
                collection.docs.insert(key(&doc), doc);
            }
            Err(err) => {
                let id = raw.get("id").and_then(Value::as_str).map(str::to_string);
                debug!(path = %path.display(), id = ?id, %err, "skipping undecodable document");
                collection.rejected.push(RawDocument {
                    id,
                    raw,
                    reason: err.to_string(),
                });
            }
        }
    }
    Ok(collection)
}

fn write_collection<T: Serialize>(path: &Path, collection: &Collection<T>) -> Result<()> {
    let entries: Vec<Entry<'_, T>> = collection
        .docs
        .values()
        .map(Entry::Decoded)
        .chain(collection.rejected.iter().map(|doc| Entry::Raw(&doc.raw)))
        .collect();
    let json = serde_json::to_string_pretty(&entries)?;
    let tmp = tmp_path(path);
    write_atomic(&tmp, &json)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

fn canonical_name(name: &str) -> String {
    let sanitized: String = name
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| match c {
            'a'..='z' | '0'..='9' | '-' => c,
            _ => '_',
        })
        .collect();
    if sanitized.trim_matches('_').is_empty() {
        "default".into()
    } else {
        sanitized
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut tmp = path.to_path_buf();
    let ext = match path.extension().and_then(|ext| ext.to_str()) {
        Some(existing) => format!("{}.{}", existing, TMP_SUFFIX),
        None => TMP_SUFFIX.to_string(),
    };
    tmp.set_extension(ext);
    tmp
}

fn write_atomic(path: &Path, data: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }
    let mut file = File::create(path)?;
    file.write_all(data.as_bytes())?;
    file.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recurring::{Frequency, InstanceStatus};
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn store_with_temp_dir() -> (JsonStore, TempDir) {
        let temp = TempDir::new().expect("temp dir");
        let store = JsonStore::open(temp.path(), "Alice Example").expect("json store");
        (store, temp)
    }

    #[test]
    fn missing_files_read_as_empty_collections() {
        let (store, _guard) = store_with_temp_dir();
        assert!(store.list_templates().unwrap().is_empty());
        assert!(store.list_instances().unwrap().is_empty());
        assert!(store.user_dir().ends_with("users/alice_example"));
    }

    #[test]
    fn persists_canonical_field_names() {
        let (store, _guard) = store_with_temp_dir();
        let template =
            RecurringTemplate::new("Water", 35.0, "Utilities", Frequency::Monthly, date(2024, 3, 5))
                .with_id("water");
        store.save_template(&template).unwrap();
        store
            .merge_instance(&RecurringInstance::scheduled(&template, date(2024, 3, 5)))
            .unwrap();

        let raw = fs::read_to_string(store.user_dir().join(INSTANCES_FILE)).unwrap();
        assert!(raw.contains("\"templateId\": \"water\""));
        assert!(raw.contains("\"dueDate\": \"2024-03-05\""));
        assert!(raw.contains("\"amountSnapshot\": 35.0"));

        let reopened = JsonStore::open(_guard.path(), "Alice Example").unwrap();
        assert_eq!(reopened.template("water").unwrap(), Some(template));
    }

    #[test]
    fn merge_keeps_existing_status() {
        let (store, _guard) = store_with_temp_dir();
        let template =
            RecurringTemplate::new("Water", 35.0, "Utilities", Frequency::Monthly, date(2024, 3, 5))
                .with_id("water");
        let mut instance = RecurringInstance::scheduled(&template, date(2024, 3, 5));
        assert!(store.merge_instance(&instance).unwrap());

        instance.status = InstanceStatus::Skipped;
        store.save_instance(&instance).unwrap();
        let regenerated = RecurringInstance::scheduled(&template, date(2024, 3, 5));
        assert!(!store.merge_instance(&regenerated).unwrap());
        assert_eq!(
            store.instance("water_20240305").unwrap().unwrap().status,
            InstanceStatus::Skipped
        );
    }

    #[test]
    fn undecodable_instance_keeps_its_id_and_its_bytes() {
        let (store, _guard) = store_with_temp_dir();
        fs::write(
            store.user_dir().join(INSTANCES_FILE),
            r#"[{"id": "water_20240305", "templateId": "water", "dueDate": "soon"}]"#,
        )
        .unwrap();
        let template =
            RecurringTemplate::new("Water", 35.0, "Utilities", Frequency::Monthly, date(2024, 3, 5))
                .with_id("water");

        assert!(store.list_instances().unwrap().is_empty());
        assert!(!store
            .merge_instance(&RecurringInstance::scheduled(&template, date(2024, 3, 5)))
            .unwrap());
        assert!(store
            .merge_instance(&RecurringInstance::scheduled(&template, date(2024, 4, 5)))
            .unwrap());

        let raw = fs::read_to_string(store.user_dir().join(INSTANCES_FILE)).unwrap();
        assert!(raw.contains("\"dueDate\": \"soon\""));
        assert!(raw.contains("water_20240405"));

        assert!(store.delete_instance("water_20240305").unwrap());
        let raw = fs::read_to_string(store.user_dir().join(INSTANCES_FILE)).unwrap();
        assert!(!raw.contains("soon"));
    }

    #[test]
    fn unreadable_documents_surface_as_corrupt() {
        let (store, _guard) = store_with_temp_dir();
        fs::write(store.user_dir().join(TEMPLATES_FILE), "{ not json").unwrap();
        assert!(matches!(store.list_templates(), Err(StoreError::Corrupt(_))));
    }
}
