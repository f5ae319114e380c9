use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{dates::days_between, InstanceStatus, RecurringInstance};

pub const DEFAULT_DUE_SOON_DAYS: i64 = 3;

/// Presentation status of an instance. Derived on read, never persisted.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum DisplayStatus {
    Scheduled,
    DueSoon,
    Due,
    Overdue,
    Paid,
    Skipped,
}

impl DisplayStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            DisplayStatus::Scheduled => "scheduled",
            DisplayStatus::DueSoon => "due-soon",
            DisplayStatus::Due => "due",
            DisplayStatus::Overdue => "overdue",
            DisplayStatus::Paid => "paid",
            DisplayStatus::Skipped => "skipped",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            DisplayStatus::Scheduled => "Scheduled",
            DisplayStatus::DueSoon => "Due soon",
            DisplayStatus::Due => "Due today",
            DisplayStatus::Overdue => "Overdue",
            DisplayStatus::Paid => "Paid",
            DisplayStatus::Skipped => "Skipped",
        }
    }
}

impl fmt::Display for DisplayStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Maps stored instances to display statuses relative to a calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusClassifier {
    due_soon_days: i64,
}

impl Default for StatusClassifier {
    fn default() -> Self {
        Self {
            due_soon_days: DEFAULT_DUE_SOON_DAYS,
        }
    }
}

impl StatusClassifier {
    pub fn new(due_soon_days: u32) -> Self {
        Self {
            due_soon_days: i64::from(due_soon_days),
        }
    }

    pub fn classify(&self, instance: &RecurringInstance, today: NaiveDate) -> DisplayStatus {
        match instance.status {
            InstanceStatus::Paid => return DisplayStatus::Paid,
            InstanceStatus::Skipped => return DisplayStatus::Skipped,
            InstanceStatus::Scheduled | InstanceStatus::Due | InstanceStatus::Overdue => {}
        }
        let diff_days = days_between(today, instance.due_date);
        if diff_days < 0 {
            DisplayStatus::Overdue
        } else if diff_days == 0 {
            DisplayStatus::Due
        } else if diff_days <= self.due_soon_days {
            DisplayStatus::DueSoon
        } else {
            DisplayStatus::Scheduled
        }
    }
}

/// Classifies with the default three-day due-soon horizon.
pub fn classify(instance: &RecurringInstance, today: NaiveDate) -> DisplayStatus {
    StatusClassifier::default().classify(instance, today)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recurring::{Frequency, RecurringTemplate};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn instance_due(due: NaiveDate, status: InstanceStatus) -> RecurringInstance {
        let template = RecurringTemplate::new("Phone", 40.0, "Utilities", Frequency::Monthly, due)
            .with_id("phone");
        let mut instance = RecurringInstance::scheduled(&template, due);
        instance.status = status;
        instance
    }

    #[test]
    fn classifies_relative_to_today() {
        let today = date(2024, 6, 10);
        let status = |due| classify(&instance_due(due, InstanceStatus::Scheduled), today);
        assert_eq!(status(today), DisplayStatus::Due);
        assert_eq!(status(date(2024, 6, 12)), DisplayStatus::DueSoon);
        assert_eq!(status(date(2024, 6, 13)), DisplayStatus::DueSoon);
        assert_eq!(status(date(2024, 6, 14)), DisplayStatus::Scheduled);
        assert_eq!(status(date(2024, 5, 31)), DisplayStatus::Overdue);
    }

    #[test]
    fn terminal_statuses_are_authoritative() {
        let today = date(2024, 6, 10);
        let past = date(2024, 5, 1);
        assert_eq!(
            classify(&instance_due(past, InstanceStatus::Paid), today),
            DisplayStatus::Paid
        );
        assert_eq!(
            classify(&instance_due(past, InstanceStatus::Skipped), today),
            DisplayStatus::Skipped
        );
    }

    #[test]
    fn stale_stored_status_is_recomputed() {
        let today = date(2024, 6, 10);
        let stored_due = instance_due(date(2024, 6, 1), InstanceStatus::Due);
        assert_eq!(classify(&stored_due, today), DisplayStatus::Overdue);
        let stored_overdue = instance_due(date(2024, 7, 1), InstanceStatus::Overdue);
        assert_eq!(classify(&stored_overdue, today), DisplayStatus::Scheduled);
    }

    #[test]
    fn custom_horizon_widens_due_soon() {
        let today = date(2024, 6, 10);
        let classifier = StatusClassifier::new(7);
        let instance = instance_due(date(2024, 6, 16), InstanceStatus::Scheduled);
        assert_eq!(classifier.classify(&instance, today), DisplayStatus::DueSoon);
    }

    #[test]
    fn display_status_uses_kebab_case() {
        assert_eq!(serde_json::to_string(&DisplayStatus::DueSoon).unwrap(), "\"due-soon\"");
    }
}
