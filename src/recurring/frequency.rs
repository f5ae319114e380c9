use std::{fmt, str::FromStr};

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use super::dates::{add_months, add_years, days_between, months_between};
use crate::errors::ValidationError;

/// Cadence of a recurring template.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Weekly,
    Biweekly,
    Monthly,
    Yearly,
}

impl Frequency {
    pub const ALL: [Frequency; 4] = [
        Frequency::Weekly,
        Frequency::Biweekly,
        Frequency::Monthly,
        Frequency::Yearly,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Frequency::Weekly => "weekly",
            Frequency::Biweekly => "biweekly",
            Frequency::Monthly => "monthly",
            Frequency::Yearly => "yearly",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Frequency::Weekly => "Weekly",
            Frequency::Biweekly => "Every 2 weeks",
            Frequency::Monthly => "Monthly",
            Frequency::Yearly => "Yearly",
        }
    }

    /// Returns the `index`-th occurrence counted from `anchor` (index 0 is the
    /// anchor itself).
    ///
    /// Calendar steps are always taken from the anchor rather than from the
    /// previous occurrence, so a template starting on the 31st lands on the 31st
    /// in every month that has one and on the last day of every month that
    /// doesn't. Returns `None` past the representable date range.
    pub fn nth_occurrence(self, anchor: NaiveDate, index: u32) -> Option<NaiveDate> {
        match self {
            Frequency::Weekly | Frequency::Biweekly => {
                let days = self.step_days()? * i64::from(index);
                anchor.checked_add_signed(Duration::days(days))
            }
            Frequency::Monthly => add_months(anchor, i32::try_from(index).ok()?),
            Frequency::Yearly => add_years(anchor, i32::try_from(index).ok()?),
        }
    }

    /// Smallest occurrence index whose date is on or after `target`.
    ///
    /// The index is derived arithmetically and then corrected by stepping, so
    /// the cost does not grow with the distance between `anchor` and `target`.
    pub fn first_index_on_or_after(self, anchor: NaiveDate, target: NaiveDate) -> Option<u32> {
        if target <= anchor {
            return Some(0);
        }
        let estimate = match self {
            Frequency::Weekly | Frequency::Biweekly => {
                let step = self.step_days()?;
                days_between(anchor, target).div_euclid(step)
            }
            Frequency::Monthly => months_between(anchor, target) - 1,
            Frequency::Yearly => months_between(anchor, target).div_euclid(12) - 1,
        };
        let mut index = u32::try_from(estimate.max(0)).ok()?;
        while self.nth_occurrence(anchor, index)? < target {
            index = index.checked_add(1)?;
        }
        Some(index)
    }

    fn step_days(self) -> Option<i64> {
        match self {
            Frequency::Weekly => Some(7),
            Frequency::Biweekly => Some(14),
            Frequency::Monthly | Frequency::Yearly => None,
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Frequency {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "weekly" => Ok(Frequency::Weekly),
            "biweekly" => Ok(Frequency::Biweekly),
            "monthly" => Ok(Frequency::Monthly),
            "yearly" => Ok(Frequency::Yearly),
            _ => Err(ValidationError::InvalidFrequency(value.to_string())),
        }
    }
}
