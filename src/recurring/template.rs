use std::{fmt, str::FromStr};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{dates, Frequency};
use crate::errors::ValidationError;

/// Whether a template currently produces new occurrences.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum TemplateStatus {
    #[default]
    Active,
    Paused,
}

impl TemplateStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TemplateStatus::Active => "active",
            TemplateStatus::Paused => "paused",
        }
    }
}

impl fmt::Display for TemplateStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TemplateStatus {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "active" => Ok(TemplateStatus::Active),
            "paused" => Ok(TemplateStatus::Paused),
            _ => Err(ValidationError::InvalidStatus(value.to_string())),
        }
    }
}

/// A user's recurring obligation. Instances are materialized from it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RecurringTemplate {
    pub id: String,
    pub name: String,
    pub amount: f64,
    pub category: String,
    pub frequency: Frequency,
    #[serde(with = "dates::serde_iso")]
    pub start_date: NaiveDate,
    #[serde(default, with = "dates::serde_iso_opt")]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub autopost: bool,
    #[serde(default)]
    pub status: TemplateStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub by: Option<String>,
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

impl RecurringTemplate {
    /// Builds an active template with a freshly generated id.
    pub fn new(
        name: impl Into<String>,
        amount: f64,
        category: impl Into<String>,
        frequency: Frequency,
        start_date: NaiveDate,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            amount,
            category: category.into(),
            frequency,
            start_date,
            end_date: None,
            autopost: false,
            status: TemplateStatus::Active,
            by: None,
            created_at: None,
            updated_at: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_end_date(mut self, end_date: NaiveDate) -> Self {
        self.end_date = Some(end_date);
        self
    }

    pub fn paused(mut self) -> Self {
        self.status = TemplateStatus::Paused;
        self
    }

    pub fn is_paused(&self) -> bool {
        self.status == TemplateStatus::Paused
    }

    /// Checks every field that the engine relies on.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.id.trim().is_empty() {
            return Err(ValidationError::EmptyId);
        }
        if self.name.trim().is_empty() {
            return Err(ValidationError::EmptyName);
        }
        if !self.amount.is_finite() || self.amount <= 0.0 {
            return Err(ValidationError::InvalidAmount(self.amount));
        }
        if self.category.trim().is_empty() {
            return Err(ValidationError::EmptyCategory);
        }
        if let Some(end) = self.end_date {
            if end < self.start_date {
                return Err(ValidationError::EndBeforeStart {
                    start: self.start_date,
                    end,
                });
            }
        }
        Ok(())
    }
}

/// User input for a new template, prior to validation.
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateDraft {
    pub name: String,
    pub amount: f64,
    pub category: String,
    pub frequency: Frequency,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub autopost: bool,
    pub owner: Option<String>,
}

impl TemplateDraft {
    /// Parses raw form fields. Dates accept anything whose first ten
    /// characters are `YYYY-MM-DD`; an empty end date means open ended.
    pub fn parse(
        name: &str,
        amount: &str,
        category: &str,
        frequency: &str,
        start_date: &str,
        end_date: Option<&str>,
    ) -> Result<Self, ValidationError> {
        let amount = amount
            .trim()
            .parse::<f64>()
            .map_err(|_| ValidationError::MalformedAmount(amount.to_string()))?;
        let end_date = match end_date.map(str::trim) {
            Some(raw) if !raw.is_empty() => Some(dates::parse_iso_date(raw)?),
            _ => None,
        };
        Ok(Self {
            name: name.to_string(),
            amount,
            category: category.to_string(),
            frequency: frequency.parse()?,
            start_date: dates::parse_iso_date(start_date)?,
            end_date,
            autopost: false,
            owner: None,
        })
    }

    /// Produces a validated template with trimmed text fields.
    pub fn into_template(
        self,
        id: String,
        now: DateTime<Utc>,
    ) -> Result<RecurringTemplate, ValidationError> {
        let template = RecurringTemplate {
            id,
            name: self.name.trim().to_string(),
            amount: self.amount,
            category: self.category.trim().to_string(),
            frequency: self.frequency,
            start_date: self.start_date,
            end_date: self.end_date,
            autopost: self.autopost,
            status: TemplateStatus::Active,
            by: self.owner,
            created_at: Some(now),
            updated_at: Some(now),
        };
        template.validate()?;
        Ok(template)
    }
}

/// Partial edit of an existing template. `None` leaves a field unchanged;
/// `end_date: Some(None)` clears the end date.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TemplatePatch {
    pub name: Option<String>,
    pub amount: Option<f64>,
    pub category: Option<String>,
    pub frequency: Option<Frequency>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<Option<NaiveDate>>,
    pub autopost: Option<bool>,
    pub status: Option<TemplateStatus>,
}

impl TemplatePatch {
    pub fn is_empty(&self) -> bool {
        *self == TemplatePatch::default()
    }

    /// Applies the patch to a copy of `template` and validates the result.
    pub fn apply(
        &self,
        template: &RecurringTemplate,
        now: DateTime<Utc>,
    ) -> Result<RecurringTemplate, ValidationError> {
        let mut updated = template.clone();
        if let Some(name) = &self.name {
            updated.name = name.trim().to_string();
        }
        if let Some(amount) = self.amount {
            updated.amount = amount;
        }
        if let Some(category) = &self.category {
            updated.category = category.trim().to_string();
        }
        if let Some(frequency) = self.frequency {
            updated.frequency = frequency;
        }
        if let Some(start_date) = self.start_date {
            updated.start_date = start_date;
        }
        if let Some(end_date) = self.end_date {
            updated.end_date = end_date;
        }
        if let Some(autopost) = self.autopost {
            updated.autopost = autopost;
        }
        if let Some(status) = self.status {
            updated.status = status;
        }
        updated.validate()?;
        updated.updated_at = Some(now);
        Ok(updated)
    }
}
