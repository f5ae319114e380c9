use std::collections::HashMap;

use chrono::Duration;

use crate::cli::commands::parse_limit;
use crate::cli::core::{CommandError, CommandResult};
use crate::cli::output;
use crate::cli::registry::CommandEntry;
use crate::cli::shell_context::{instance_ref, ShellContext};
use crate::core::services::InstanceService;
use crate::recurring::{list_past, list_upcoming, RecurringInstance, StatusClassifier};
use crate::storage::RecurringStore;

pub(crate) fn definitions() -> Vec<CommandEntry> {
    vec![
        CommandEntry::new(
            "upcoming",
            "List instances due today or later",
            "upcoming [days]",
            cmd_upcoming,
        ),
        CommandEntry::new(
            "past",
            "List instances due before today, newest first",
            "past [limit]",
            cmd_past,
        ),
        CommandEntry::new(
            "pay",
            "Mark an instance paid",
            "pay <instance> [transaction-id]",
            cmd_pay,
        ),
        CommandEntry::new("skip", "Skip an instance", "skip <instance>", cmd_skip),
        CommandEntry::new(
            "unmark",
            "Return a paid or skipped instance to scheduled",
            "unmark <instance>",
            cmd_unmark,
        ),
        CommandEntry::new(
            "remove-instance",
            "Delete a single instance",
            "remove-instance <instance>",
            cmd_remove_instance,
        ),
    ]
}

fn cmd_upcoming(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let days = parse_limit(args.first(), "days")?;
    let templates = context.store.list_templates()?;
    let instances = context.store.list_instances()?;
    let today = context.clock.today();

    let horizon = days
        .map(|days| {
            i64::try_from(days)
                .ok()
                .and_then(Duration::try_days)
                .and_then(|span| today.checked_add_signed(span))
                .ok_or_else(|| {
                    CommandError::InvalidArguments(format!("days {} reaches past the calendar", days))
                })
        })
        .transpose()?;
    let upcoming: Vec<_> = list_upcoming(&instances, &templates, today)
        .into_iter()
        .filter(|instance| horizon.map_or(true, |end| instance.due_date <= end))
        .collect();
    if upcoming.is_empty() {
        output::info("Nothing upcoming. Run `reconcile` to materialize the next window.");
        return Ok(());
    }

    let names = template_names(context)?;
    let classifier = context.classifier();
    output::section("Upcoming payments");
    for instance in upcoming {
        println!("{}", describe(instance, &names, &classifier, today));
    }
    Ok(())
}

fn cmd_past(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let limit = parse_limit(args.first(), "limit")?;
    let instances = context.store.list_instances()?;
    let today = context.clock.today();
    let past = list_past(&instances, today);
    if past.is_empty() {
        output::info("No past payments.");
        return Ok(());
    }

    let names = template_names(context)?;
    let classifier = context.classifier();
    output::section("Past payments");
    for instance in past.into_iter().take(limit.unwrap_or(usize::MAX)) {
        println!("{}", describe(instance, &names, &classifier, today));
    }
    Ok(())
}

fn cmd_pay(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let (reference, linked) = match args {
        [reference] => (*reference, None),
        [reference, transaction] => (*reference, Some(transaction.to_string())),
        _ => return Err(CommandError::usage("pay <instance> [transaction-id]")),
    };
    let instance = context.resolve_instance(reference)?;
    let paid =
        InstanceService::mark_paid(&context.store, context.clock.as_ref(), &instance.id, linked)?;
    output::success(format!("{} marked paid.", instance_ref(&paid)));
    Ok(())
}

fn cmd_skip(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let instance = single_instance(context, args, "skip <instance>")?;
    let skipped = InstanceService::skip(&context.store, context.clock.as_ref(), &instance.id)?;
    output::success(format!("{} skipped.", instance_ref(&skipped)));
    Ok(())
}

fn cmd_unmark(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let instance = single_instance(context, args, "unmark <instance>")?;
    let reset = InstanceService::reset(&context.store, context.clock.as_ref(), &instance.id)?;
    output::success(format!("{} is scheduled again.", instance_ref(&reset)));
    Ok(())
}

fn cmd_remove_instance(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let instance = single_instance(context, args, "remove-instance <instance>")?;
    InstanceService::delete(&context.store, &instance.id)?;
    output::success(format!("{} removed.", instance_ref(&instance)));
    Ok(())
}

fn single_instance(
    context: &ShellContext,
    args: &[&str],
    usage: &str,
) -> Result<RecurringInstance, CommandError> {
    match args {
        [reference] => context.resolve_instance(reference),
        _ => Err(CommandError::usage(usage)),
    }
}

fn template_names(context: &ShellContext) -> Result<HashMap<String, String>, CommandError> {
    Ok(context
        .store
        .list_templates()?
        .into_iter()
        .map(|template| (template.id, template.name))
        .collect())
}

fn describe(
    instance: &RecurringInstance,
    names: &HashMap<String, String>,
    classifier: &StatusClassifier,
    today: chrono::NaiveDate,
) -> String {
    let name = names
        .get(&instance.template_id)
        .map(String::as_str)
        .unwrap_or("(deleted template)");
    format!(
        "{:<20} {}  {:<20} {} {}",
        instance_ref(instance),
        output::status_pill(classifier.classify(instance, today)),
        name,
        output::amount(instance.amount_snapshot),
        instance.category_snapshot
    )
}
