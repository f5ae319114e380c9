//! Recurring-payment domain: templates, materialized instances, occurrence
//! generation and display classification. Everything here is pure; writes go
//! through [`crate::storage`] and are driven by [`crate::core::services`].

pub mod classify;
pub mod dates;
pub mod frequency;
pub mod generator;
pub mod instance;
pub mod template;
pub mod views;

pub use classify::{classify, DisplayStatus, StatusClassifier, DEFAULT_DUE_SOON_DAYS};
pub use frequency::Frequency;
pub use generator::{
    generate_due_dates, generate_instances_for_window, next_due_date, DateWindow,
    DateWindowError, Occurrences, STANDARD_WINDOW_DAYS,
};
pub use instance::{instance_id, parse_instance_id, InstanceStatus, RecurringInstance};
pub use template::{RecurringTemplate, TemplateDraft, TemplatePatch, TemplateStatus};
pub use views::{list_past, list_paused, list_upcoming};
