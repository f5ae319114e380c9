#![allow(dead_code)]

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex,
    },
};

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use recurring_core::{
    errors::StoreError,
    recurring::{Frequency, RecurringInstance, RecurringTemplate},
    storage::{JsonStore, MemoryStore, RecurringStore, Result as StoreResult},
};
use tempfile::TempDir;

/// Holds TempDir guards so temporary folders live for the duration of the test run.
static TEST_DIRS: Lazy<Mutex<Vec<TempDir>>> = Lazy::new(|| Mutex::new(Vec::new()));

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid calendar date")
}

pub fn template(id: &str, frequency: Frequency, start: NaiveDate) -> RecurringTemplate {
    RecurringTemplate::new(id, 25.0, "Bills", frequency, start).with_id(id)
}

/// JSON store rooted in a fresh directory that outlives the test body.
pub fn temp_json_store(user: &str) -> JsonStore {
    let temp = TempDir::new().expect("create temp dir");
    let store = JsonStore::open(temp.path(), user).expect("open json store");
    TEST_DIRS.lock().expect("lock temp dir registry").push(temp);
    store
}

/// Memory store that fails instance writes for chosen templates, and
/// optionally instance listings after a number of successful reads.
pub struct FaultyStore {
    pub inner: MemoryStore,
    failures: Mutex<HashMap<String, StoreError>>,
    listing_failure: Mutex<Option<(usize, StoreError)>>,
    listings: AtomicUsize,
}

impl FaultyStore {
    pub fn new(templates: Vec<RecurringTemplate>) -> Self {
        Self {
            inner: MemoryStore::with_data(templates, Vec::new()),
            failures: Mutex::new(HashMap::new()),
            listing_failure: Mutex::new(None),
            listings: AtomicUsize::new(0),
        }
    }

    /// Lets `reads` instance listings succeed, then fails every later one.
    pub fn fail_listings_after(&self, reads: usize, error: StoreError) {
        self.listings.store(0, Ordering::SeqCst);
        *self.listing_failure.lock().expect("lock listing failure") = Some((reads, error));
    }

    pub fn fail_template(&self, template_id: &str, error: StoreError) {
        self.failures
            .lock()
            .expect("lock failures")
            .insert(template_id.to_string(), error);
    }

    pub fn heal(&self) {
        self.failures.lock().expect("lock failures").clear();
        *self.listing_failure.lock().expect("lock listing failure") = None;
    }

    fn check(&self, instance: &RecurringInstance) -> StoreResult<()> {
        match self.failures.lock().expect("lock failures").get(&instance.template_id) {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }
}

impl RecurringStore for FaultyStore {
    fn list_templates(&self) -> StoreResult<Vec<RecurringTemplate>> {
        self.inner.list_templates()
    }

    fn list_instances(&self) -> StoreResult<Vec<RecurringInstance>> {
        let served = self.listings.fetch_add(1, Ordering::SeqCst);
        if let Some((reads, error)) = &*self.listing_failure.lock().expect("lock listing failure") {
            if served >= *reads {
                return Err(error.clone());
            }
        }
        self.inner.list_instances()
    }

    fn template(&self, id: &str) -> StoreResult<Option<RecurringTemplate>> {
        self.inner.template(id)
    }

    fn instance(&self, id: &str) -> StoreResult<Option<RecurringInstance>> {
        self.inner.instance(id)
    }

    fn save_template(&self, template: &RecurringTemplate) -> StoreResult<()> {
        self.inner.save_template(template)
    }

    fn delete_template(&self, id: &str) -> StoreResult<bool> {
        self.inner.delete_template(id)
    }

    fn merge_instance(&self, instance: &RecurringInstance) -> StoreResult<bool> {
        self.check(instance)?;
        self.inner.merge_instance(instance)
    }

    fn save_instance(&self, instance: &RecurringInstance) -> StoreResult<()> {
        self.check(instance)?;
        self.inner.save_instance(instance)
    }

    fn delete_instance(&self, id: &str) -> StoreResult<bool> {
        self.inner.delete_instance(id)
    }
}
