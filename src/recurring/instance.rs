use std::{fmt, str::FromStr};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{de::Deserializer, Deserialize, Serialize};

use super::{dates, RecurringTemplate};
use crate::errors::ValidationError;

const ID_DATE_LEN: usize = 8;

/// Deterministic id of the occurrence of `template_id` due on `due_date`.
///
/// The suffix is always the eight-digit `YYYYMMDD` form after the final `_`,
/// so two different `(template, date)` pairs never share an id even when
/// template ids themselves contain underscores.
pub fn instance_id(template_id: &str, due_date: NaiveDate) -> String {
    format!("{}_{}", template_id, dates::compact_date(due_date))
}

/// Inverse of [`instance_id`].
pub fn parse_instance_id(id: &str) -> Option<(&str, NaiveDate)> {
    let (template_id, suffix) = id.rsplit_once('_')?;
    if template_id.is_empty()
        || suffix.len() != ID_DATE_LEN
        || !suffix.bytes().all(|b| b.is_ascii_digit())
    {
        return None;
    }
    let due = NaiveDate::parse_from_str(suffix, "%Y%m%d").ok()?;
    Some((template_id, due))
}

/// Stored lifecycle state of an instance.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum InstanceStatus {
    #[default]
    Scheduled,
    Due,
    Overdue,
    Paid,
    Skipped,
}

impl InstanceStatus {
    /// Paid and skipped are set by the user and are never recomputed.
    pub fn is_terminal(self) -> bool {
        matches!(self, InstanceStatus::Paid | InstanceStatus::Skipped)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            InstanceStatus::Scheduled => "scheduled",
            InstanceStatus::Due => "due",
            InstanceStatus::Overdue => "overdue",
            InstanceStatus::Paid => "paid",
            InstanceStatus::Skipped => "skipped",
        }
    }
}

impl fmt::Display for InstanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InstanceStatus {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "scheduled" => Ok(InstanceStatus::Scheduled),
            "due" => Ok(InstanceStatus::Due),
            "overdue" => Ok(InstanceStatus::Overdue),
            "paid" => Ok(InstanceStatus::Paid),
            "skipped" => Ok(InstanceStatus::Skipped),
            _ => Err(ValidationError::InvalidStatus(value.to_string())),
        }
    }
}

impl<'de> Deserialize<'de> for InstanceStatus {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        // Older documents store mixed case or omit the value entirely.
        match Option::<String>::deserialize(deserializer)? {
            Some(raw) if !raw.trim().is_empty() => {
                raw.parse().map_err(serde::de::Error::custom)
            }
            _ => Ok(InstanceStatus::Scheduled),
        }
    }
}

/// One dated occurrence of a template, with amount and category frozen at
/// the time it was materialized.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RecurringInstance {
    pub id: String,
    pub template_id: String,
    #[serde(with = "dates::serde_iso")]
    pub due_date: NaiveDate,
    pub amount_snapshot: f64,
    pub category_snapshot: String,
    #[serde(default)]
    pub status: InstanceStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linked_transaction_id: Option<String>,
    #[serde(
        default,
        with = "chrono::serde::ts_milliseconds_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(
        default,
        with = "chrono::serde::ts_milliseconds_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub updated_at: Option<DateTime<Utc>>,
}

impl RecurringInstance {
    /// Snapshots `template` into a scheduled occurrence on `due_date`.
    pub fn scheduled(template: &RecurringTemplate, due_date: NaiveDate) -> Self {
        Self {
            id: instance_id(&template.id, due_date),
            template_id: template.id.clone(),
            due_date,
            amount_snapshot: template.amount,
            category_snapshot: template.category.clone(),
            status: InstanceStatus::Scheduled,
            linked_transaction_id: None,
            created_at: None,
            updated_at: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    pub fn mark_paid(&mut self, linked_transaction_id: Option<String>, now: DateTime<Utc>) {
        self.status = InstanceStatus::Paid;
        if linked_transaction_id.is_some() {
            self.linked_transaction_id = linked_transaction_id;
        }
        self.updated_at = Some(now);
    }

    pub fn skip(&mut self, now: DateTime<Utc>) {
        self.status = InstanceStatus::Skipped;
        self.updated_at = Some(now);
    }

    /// Returns the instance to `scheduled`, dropping any linked transaction.
    pub fn reset(&mut self, now: DateTime<Utc>) {
        self.status = InstanceStatus::Scheduled;
        self.linked_transaction_id = None;
        self.updated_at = Some(now);
    }
}
