mod common;

use common::{date, template};
use recurring_core::{
    core::{
        clock::{Clock, FixedClock},
        services::{reconcile, InstanceService, Materializer, MaterializerOptions},
    },
    recurring::{
        classify, generate_due_dates, generate_instances_for_window, instance_id, list_past,
        list_upcoming, DateWindow, DisplayStatus, Frequency, InstanceStatus, RecurringInstance,
    },
    storage::{MemoryStore, RecurringStore},
};

#[test]
fn monthly_window_skips_occurrences_before_window() {
    let rent = template("rent", Frequency::Monthly, date(2024, 1, 1));
    assert_eq!(
        generate_due_dates(&rent, date(2024, 3, 10), date(2024, 5, 10)),
        vec![date(2024, 4, 1), date(2024, 5, 1)]
    );
}

#[test]
fn month_end_start_clamps_without_drifting() {
    let gym = template("gym", Frequency::Monthly, date(2024, 1, 31));
    assert_eq!(
        generate_due_dates(&gym, date(2024, 1, 1), date(2024, 6, 30)),
        vec![
            date(2024, 1, 31),
            date(2024, 2, 29),
            date(2024, 3, 31),
            date(2024, 4, 30),
            date(2024, 5, 31),
            date(2024, 6, 30),
        ]
    );

    let leap = template("leap", Frequency::Yearly, date(2024, 2, 29));
    assert_eq!(
        generate_due_dates(&leap, date(2024, 1, 1), date(2028, 12, 31)),
        vec![
            date(2024, 2, 29),
            date(2025, 2, 28),
            date(2026, 2, 28),
            date(2027, 2, 28),
            date(2028, 2, 29),
        ]
    );
}

#[test]
fn weekly_template_stops_at_end_date() {
    let cleaner =
        template("cleaner", Frequency::Weekly, date(2024, 1, 1)).with_end_date(date(2024, 1, 15));
    assert_eq!(
        generate_due_dates(&cleaner, date(2024, 1, 1), date(2024, 2, 1)),
        vec![date(2024, 1, 1), date(2024, 1, 8), date(2024, 1, 15)]
    );
}

#[test]
fn far_windows_match_stepping_from_start() {
    let biweekly = template("pay", Frequency::Biweekly, date(2000, 1, 3));
    let near = generate_due_dates(&biweekly, date(2000, 1, 1), date(2040, 1, 1));
    let far = generate_due_dates(&biweekly, date(2039, 6, 1), date(2039, 7, 31));
    let expected: Vec<_> = near
        .into_iter()
        .filter(|due| *due >= date(2039, 6, 1) && *due <= date(2039, 7, 31))
        .collect();
    assert!(!far.is_empty());
    assert_eq!(far, expected);
}

#[test]
fn wider_window_contains_narrower_window() {
    let sub = template("sub", Frequency::Monthly, date(2023, 11, 30));
    let narrow_window = DateWindow::new(date(2024, 2, 1), date(2024, 4, 30)).unwrap();
    let wide_window = DateWindow::new(date(2024, 1, 1), date(2024, 12, 31)).unwrap();
    assert!(wide_window.covers(&narrow_window));
    assert!(!narrow_window.covers(&wide_window));

    let narrow = generate_instances_for_window(&sub, narrow_window.start, narrow_window.end);
    let wide = generate_instances_for_window(&sub, wide_window.start, wide_window.end);
    assert_eq!(narrow.len(), 3);
    for instance in &narrow {
        assert!(wide.contains(instance), "missing {}", instance.id);
    }
}

#[test]
fn paused_template_generates_nothing() {
    let paused = template("old", Frequency::Weekly, date(2024, 1, 1)).paused();
    assert!(generate_instances_for_window(&paused, date(2024, 1, 1), date(2024, 12, 31)).is_empty());
}

#[test]
fn second_reconcile_writes_nothing() {
    let templates = vec![
        template("rent", Frequency::Monthly, date(2024, 1, 1)),
        template("cleaner", Frequency::Weekly, date(2024, 1, 3)),
    ];
    let store = MemoryStore::with_data(templates.clone(), Vec::new());
    let window = DateWindow::new(date(2024, 1, 1), date(2024, 1, 31)).unwrap();

    let first = reconcile(&store, &templates, &[], window);
    assert_eq!(first.created.len(), 1 + 5);

    let existing = store.list_instances().unwrap();
    let second = reconcile(&store, &templates, &existing, window);
    assert!(second.created.is_empty());
    assert_eq!(second.already_present, 6);
    assert_eq!(store.list_instances().unwrap(), existing);
}

#[test]
fn paid_instance_survives_reconcile() {
    let rent = template("rent", Frequency::Monthly, date(2024, 1, 1));
    let store = MemoryStore::with_data(vec![rent.clone()], Vec::new());
    let clock = FixedClock::new(date(2024, 1, 1));
    let materializer = Materializer::new(&store, &clock);

    materializer.run().unwrap();
    let id = instance_id("rent", date(2024, 1, 1));
    InstanceService::mark_paid(&store, &clock, &id, Some("txn-1".into())).unwrap();

    // An empty snapshot forces the pass to attempt the write again.
    let window = materializer.window();
    let report = materializer.reconcile(&[rent], &[], window);
    assert!(report.created.is_empty());
    materializer.run().unwrap();

    let stored = store.instance(&id).unwrap().unwrap();
    assert_eq!(stored.status, InstanceStatus::Paid);
    assert_eq!(stored.linked_transaction_id.as_deref(), Some("txn-1"));
}

#[test]
fn classification_follows_day_difference() {
    let rent = template("rent", Frequency::Monthly, date(2024, 1, 1));
    let today = date(2024, 3, 15);
    let due_today = RecurringInstance::scheduled(&rent, today);
    let due_in_two = RecurringInstance::scheduled(&rent, date(2024, 3, 17));
    let overdue = RecurringInstance::scheduled(&rent, date(2024, 3, 5));

    assert_eq!(classify(&due_today, today), DisplayStatus::Due);
    assert_eq!(classify(&due_in_two, today), DisplayStatus::DueSoon);
    assert_eq!(classify(&overdue, today), DisplayStatus::Overdue);
}

#[test]
fn views_split_store_contents_by_today() {
    let rent = template("rent", Frequency::Monthly, date(2024, 1, 1));
    let paused = template("gym", Frequency::Monthly, date(2024, 1, 1)).paused();
    let store = MemoryStore::with_data(vec![rent.clone(), paused.clone()], Vec::new());
    let clock = FixedClock::new(date(2024, 2, 15));

    let options = MaterializerOptions {
        window_days: 60,
        ..MaterializerOptions::default()
    };
    Materializer::new(&store, &clock).with_options(options).run().unwrap();
    for due in [date(2024, 1, 1), date(2024, 2, 1)] {
        store.merge_instance(&RecurringInstance::scheduled(&rent, due)).unwrap();
        store.merge_instance(&RecurringInstance::scheduled(&paused, due)).unwrap();
    }
    store
        .merge_instance(&RecurringInstance::scheduled(&paused, date(2024, 3, 1)))
        .unwrap();

    let templates = store.list_templates().unwrap();
    let instances = store.list_instances().unwrap();
    let upcoming: Vec<_> = list_upcoming(&instances, &templates, clock.today())
        .into_iter()
        .map(|i| i.id.as_str())
        .collect();
    assert_eq!(upcoming, vec!["rent_20240301", "rent_20240401"]);

    let past: Vec<_> = list_past(&instances, clock.today())
        .into_iter()
        .map(|i| i.due_date)
        .collect();
    assert_eq!(
        past,
        vec![date(2024, 2, 1), date(2024, 2, 1), date(2024, 1, 1), date(2024, 1, 1)]
    );
}
