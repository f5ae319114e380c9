mod common;

use std::fs;

use common::{date, temp_json_store};
use recurring_core::{
    core::{
        clock::FixedClock,
        services::{prune_orphans, InstanceService, Materializer, TemplateService},
    },
    errors::{RecurringError, StoreError},
    recurring::{Frequency, InstanceStatus, TemplateDraft},
    storage::{JsonStore, RecurringStore},
};

#[test]
fn lifecycle_persists_across_reopen() {
    let store = temp_json_store("alice");
    let clock = FixedClock::new(date(2024, 5, 1));
    let mut draft = TemplateDraft::parse(
        "Streaming",
        "12.99",
        "Entertainment",
        "monthly",
        "2024-04-20",
        None,
    )
    .unwrap();
    draft.autopost = true;
    let template = TemplateService::create(&store, &clock, draft).unwrap();
    Materializer::new(&store, &clock).run().unwrap();

    let root = store
        .user_dir()
        .parent()
        .and_then(|users| users.parent())
        .unwrap()
        .to_path_buf();
    let reopened = JsonStore::open(&root, "alice").unwrap();
    let instances = reopened.instances_for_template(&template.id).unwrap();
    assert_eq!(instances.len(), 1);
    assert_eq!(instances[0].due_date, date(2024, 5, 20));
    assert_eq!(instances[0].amount_snapshot, 12.99);
}

#[test]
fn documents_written_by_other_clients_are_readable() {
    let store = temp_json_store("shared");
    fs::write(
        store.user_dir().join("recurringTemplates.json"),
        r#"[{
            "id": "tpl1",
            "name": "Rent",
            "amount": 1200,
            "category": "Housing",
            "frequency": "monthly",
            "startDate": "2024-01-01T00:00:00.000Z",
            "endDate": null,
            "autopost": false,
            "status": "active",
            "by": "alice",
            "createdAt": 1704067200000,
            "updatedAt": 1704067200000
        }]"#,
    )
    .unwrap();
    fs::write(
        store.user_dir().join("recurringInstances.json"),
        r#"[{
            "id": "tpl1_20240201",
            "templateId": "tpl1",
            "dueDate": "2024-02-01",
            "amountSnapshot": 1200,
            "categorySnapshot": "Housing",
            "status": "PAID"
        }]"#,
    )
    .unwrap();

    let template = store.template("tpl1").unwrap().unwrap();
    assert_eq!(template.start_date, date(2024, 1, 1));
    assert_eq!(template.frequency, Frequency::Monthly);
    let paid = store.instance("tpl1_20240201").unwrap().unwrap();
    assert_eq!(paid.status, InstanceStatus::Paid);

    let clock = FixedClock::new(date(2024, 1, 25));
    let report = Materializer::new(&store, &clock).run().unwrap();
    assert!(report.created.is_empty());
    assert_eq!(report.already_present, 1);
}

#[test]
fn delete_and_prune_leave_no_orphans() {
    let store = temp_json_store("cleanup");
    let clock = FixedClock::new(date(2024, 3, 1));
    let keep = TemplateService::create(
        &store,
        &clock,
        TemplateDraft::parse("Water", "30", "Utilities", "monthly", "2024-03-05", None).unwrap(),
    )
    .unwrap();
    let drop = TemplateService::create(
        &store,
        &clock,
        TemplateDraft::parse("Club", "15", "Leisure", "weekly", "2024-03-02", None).unwrap(),
    )
    .unwrap();
    Materializer::new(&store, &clock).run().unwrap();

    assert_eq!(TemplateService::delete(&store, &drop.id).unwrap(), 5);
    assert!(store.instances_for_template(&drop.id).unwrap().is_empty());

    // An orphan left behind by a client that removed only the template.
    store.delete_template(&keep.id).unwrap();
    assert_eq!(prune_orphans(&store).unwrap().len(), 1);
    assert!(store.list_instances().unwrap().is_empty());
}

#[test]
fn instance_changes_round_trip() {
    let store = temp_json_store("marks");
    let clock = FixedClock::new(date(2024, 6, 1));
    let template = TemplateService::create(
        &store,
        &clock,
        TemplateDraft::parse("Phone", "20", "Utilities", "monthly", "2024-06-01", None).unwrap(),
    )
    .unwrap();
    Materializer::new(&store, &clock).run().unwrap();
    let id = format!("{}_20240601", template.id);

    InstanceService::skip(&store, &clock, &id).unwrap();
    assert_eq!(store.instance(&id).unwrap().unwrap().status, InstanceStatus::Skipped);
    InstanceService::reset(&store, &clock, &id).unwrap();
    assert_eq!(store.instance(&id).unwrap().unwrap().status, InstanceStatus::Scheduled);
    InstanceService::delete(&store, &id).unwrap();
    assert!(matches!(
        InstanceService::get(&store, &id),
        Err(RecurringError::InstanceNotFound(_))
    ));
}

#[test]
fn corrupt_documents_fail_the_pass() {
    let store = temp_json_store("broken");
    fs::write(store.user_dir().join("recurringTemplates.json"), "{ not json").unwrap();
    let clock = FixedClock::new(date(2024, 6, 1));
    assert!(matches!(
        Materializer::new(&store, &clock).run(),
        Err(RecurringError::Store(StoreError::Corrupt(_)))
    ));
}

#[test]
fn unreadable_template_does_not_stop_the_pass() {
    let store = temp_json_store("mixed");
    let rent = common::template("rent", Frequency::Monthly, date(2024, 1, 5));
    store.save_template(&rent).unwrap();

    let path = store.user_dir().join("recurringTemplates.json");
    let mut docs: Vec<serde_json::Value> =
        serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    let mut broken = docs[0].clone();
    broken["id"] = "gym".into();
    broken["startDate"] = "Jan 5 2024".into();
    docs.push(broken);
    fs::write(&path, serde_json::to_string_pretty(&docs).unwrap()).unwrap();

    let clock = FixedClock::new(date(2024, 1, 1));
    let report = Materializer::new(&store, &clock).run().unwrap();

    assert_eq!(report.created, vec!["rent_20240105"]);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].template_id, "gym");
    assert!(matches!(
        report.failures[0].error,
        StoreError::Corrupt(ref reason) if reason.contains("Jan 5 2024")
    ));
    assert!(!report.should_retry());

    // Later writes keep the unreadable document for whoever can fix it.
    TemplateService::pause(&store, &clock, "rent").unwrap();
    let raw = fs::read_to_string(&path).unwrap();
    assert!(raw.contains("Jan 5 2024"));
    assert_eq!(store.rejected_templates().unwrap()[0].label(), "gym");
}
