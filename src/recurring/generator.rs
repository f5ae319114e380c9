//! Pure occurrence generation: which dates a template produces inside a window.

use chrono::{Duration, NaiveDate};
use thiserror::Error;

use super::{Frequency, RecurringInstance, RecurringTemplate};

/// Default look-ahead of the rolling materialization window, in days.
pub const STANDARD_WINDOW_DAYS: u32 = 30;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("window end {end} is before window start {start}")]
pub struct DateWindowError {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// Inclusive `[start, end]` range of calendar days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, DateWindowError> {
        if end < start {
            return Err(DateWindowError { start, end });
        }
        Ok(Self { start, end })
    }

    /// `[today, today + days]`, the window the materializer keeps filled.
    pub fn rolling(today: NaiveDate, days: u32) -> Self {
        let end = today
            .checked_add_signed(Duration::days(i64::from(days)))
            .unwrap_or(NaiveDate::MAX);
        Self { start: today, end }
    }

    pub fn standard(today: NaiveDate) -> Self {
        Self::rolling(today, STANDARD_WINDOW_DAYS)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }

    pub fn covers(&self, other: &DateWindow) -> bool {
        self.start <= other.start && other.end <= self.end
    }
}

/// Ascending stream of a template's occurrence dates, starting at a chosen
/// occurrence index. Ends when the end date or the calendar range is passed.
#[derive(Debug, Clone)]
pub struct Occurrences {
    anchor: NaiveDate,
    frequency: Frequency,
    end_date: Option<NaiveDate>,
    index: Option<u32>,
}

impl Occurrences {
    pub fn of(template: &RecurringTemplate) -> Self {
        Self {
            anchor: template.start_date,
            frequency: template.frequency,
            end_date: template.end_date,
            index: Some(0),
        }
    }

    /// Moves the cursor to the first occurrence on or after `date`.
    pub fn seek(mut self, date: NaiveDate) -> Self {
        self.index = self.frequency.first_index_on_or_after(self.anchor, date);
        self
    }
}

impl Iterator for Occurrences {
    type Item = NaiveDate;

    fn next(&mut self) -> Option<NaiveDate> {
        let index = self.index?;
        let due = self.frequency.nth_occurrence(self.anchor, index);
        match due {
            Some(due) if self.end_date.map_or(true, |end| due <= end) => {
                self.index = index.checked_add(1);
                Some(due)
            }
            _ => {
                self.index = None;
                None
            }
        }
    }
}

/// Due dates `template` produces within `[from, to]`, ascending.
///
/// Paused templates produce nothing. Occurrences never precede the template's
/// start date nor follow its end date.
pub fn generate_due_dates(
    template: &RecurringTemplate,
    from: NaiveDate,
    to: NaiveDate,
) -> Vec<NaiveDate> {
    if template.is_paused() {
        return Vec::new();
    }
    let effective_start = from.max(template.start_date);
    if template.end_date.is_some_and(|end| end < effective_start) {
        return Vec::new();
    }
    if effective_start > to {
        return Vec::new();
    }

    Occurrences::of(template)
        .seek(effective_start)
        .take_while(|due| *due <= to)
        .collect()
}

/// Instance records that must exist for `template` within `[from, to]`.
pub fn generate_instances_for_window(
    template: &RecurringTemplate,
    from: NaiveDate,
    to: NaiveDate,
) -> Vec<RecurringInstance> {
    generate_due_dates(template, from, to)
        .into_iter()
        .map(|due| RecurringInstance::scheduled(template, due))
        .collect()
}

/// First occurrence on or after `today`, if the template will still produce one.
pub fn next_due_date(template: &RecurringTemplate, today: NaiveDate) -> Option<NaiveDate> {
    if template.is_paused() {
        return None;
    }
    Occurrences::of(template)
        .seek(today.max(template.start_date))
        .next()
}
