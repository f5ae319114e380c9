mod common;

use std::{collections::HashSet, thread};

use common::{date, temp_json_store, template};
use recurring_core::{
    core::{clock::FixedClock, services::Materializer},
    recurring::{Frequency, RecurringTemplate},
    storage::{MemoryStore, RecurringStore},
};

const WORKERS: usize = 6;

fn templates() -> Vec<RecurringTemplate> {
    vec![
        template("rent", Frequency::Monthly, date(2024, 1, 1)),
        template("cleaner", Frequency::Weekly, date(2024, 1, 2)),
        template("payroll", Frequency::Biweekly, date(2023, 12, 29)),
        template("insurance", Frequency::Yearly, date(2023, 3, 1)),
    ]
}

/// Runs the same pass from several threads that all read an empty snapshot.
fn race(store: &dyn RecurringStore) -> usize {
    let clock = FixedClock::new(date(2024, 2, 20));
    thread::scope(|scope| {
        let handles: Vec<_> = (0..WORKERS)
            .map(|_| scope.spawn(|| Materializer::new(store, &clock).run().unwrap()))
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().unwrap().created.len())
            .sum()
    })
}

fn assert_single_copy(store: &dyn RecurringStore, created: usize) {
    let instances = store.list_instances().unwrap();
    let ids: HashSet<_> = instances.iter().map(|i| i.id.as_str()).collect();
    assert_eq!(ids.len(), instances.len());
    assert_eq!(created, instances.len(), "each id is created by exactly one worker");
    // rent 03-01, cleaner weekly from 02-20, payroll biweekly, insurance 03-01
    assert_eq!(instances.len(), 1 + 5 + 2 + 1);
}

#[test]
fn concurrent_passes_on_memory_store_create_each_instance_once() {
    let store = MemoryStore::with_data(templates(), Vec::new());
    let created = race(&store);
    assert_single_copy(&store, created);
}

#[test]
fn concurrent_passes_on_json_store_create_each_instance_once() {
    let store = temp_json_store("race");
    for template in templates() {
        store.save_template(&template).unwrap();
    }
    let created = race(&store);
    assert_single_copy(&store, created);
}
