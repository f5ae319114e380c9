//! Read-side groupings used by the presentation layer.

use std::collections::HashMap;

use chrono::NaiveDate;

use super::{RecurringInstance, RecurringTemplate};

/// Instances due today or later whose template still exists and is active,
/// earliest first.
pub fn list_upcoming<'a>(
    instances: &'a [RecurringInstance],
    templates: &[RecurringTemplate],
    today: NaiveDate,
) -> Vec<&'a RecurringInstance> {
    let by_id: HashMap<&str, &RecurringTemplate> =
        templates.iter().map(|t| (t.id.as_str(), t)).collect();
    let mut upcoming: Vec<_> = instances
        .iter()
        .filter(|instance| instance.due_date >= today)
        .filter(|instance| {
            by_id
                .get(instance.template_id.as_str())
                .is_some_and(|template| !template.is_paused())
        })
        .collect();
    upcoming.sort_by(|a, b| a.due_date.cmp(&b.due_date).then_with(|| a.id.cmp(&b.id)));
    upcoming
}

/// Instances due before today, most recent first.
pub fn list_past(instances: &[RecurringInstance], today: NaiveDate) -> Vec<&RecurringInstance> {
    let mut past: Vec<_> = instances
        .iter()
        .filter(|instance| instance.due_date < today)
        .collect();
    past.sort_by(|a, b| b.due_date.cmp(&a.due_date).then_with(|| a.id.cmp(&b.id)));
    past
}

pub fn list_paused(templates: &[RecurringTemplate]) -> Vec<&RecurringTemplate> {
    templates.iter().filter(|t| t.is_paused()).collect()
}
