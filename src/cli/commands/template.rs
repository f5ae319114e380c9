use crate::cli::commands::{reject_unknown_flags, split_flags};
use crate::cli::core::{CommandError, CommandResult};
use crate::cli::output;
use crate::cli::registry::CommandEntry;
use crate::cli::shell_context::{short_id, ShellContext};
use crate::core::services::TemplateService;
use crate::errors::ValidationError;
use crate::recurring::{
    dates::parse_iso_date, list_paused, next_due_date, RecurringTemplate, TemplateDraft,
    TemplatePatch,
};
use crate::storage::RecurringStore;

const ADD_USAGE: &str =
    "add <name> <amount> <category> <weekly|biweekly|monthly|yearly> <start YYYY-MM-DD> [end YYYY-MM-DD] [--autopost]";
const EDIT_USAGE: &str =
    "edit <template> <field>=<value>... (fields: name, amount, category, frequency, start, end, autopost)";

pub(crate) fn definitions() -> Vec<CommandEntry> {
    vec![
        CommandEntry::new("add", "Create a recurring template", ADD_USAGE, cmd_add),
        CommandEntry::new("edit", "Change fields of a template", EDIT_USAGE, cmd_edit),
        CommandEntry::new(
            "pause",
            "Stop generating instances for a template",
            "pause <template>",
            cmd_pause,
        ),
        CommandEntry::new(
            "resume",
            "Resume a paused template",
            "resume <template>",
            cmd_resume,
        ),
        CommandEntry::new(
            "delete",
            "Delete a template and all of its instances",
            "delete <template>",
            cmd_delete,
        ),
        CommandEntry::new(
            "templates",
            "List templates with their next due date",
            "templates",
            cmd_templates,
        ),
        CommandEntry::new("paused", "List paused templates", "paused", cmd_paused),
    ]
}

fn cmd_add(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let (positional, flags) = split_flags(args);
    reject_unknown_flags(&flags, &["--autopost"])?;
    if !(5..=6).contains(&positional.len()) {
        return Err(CommandError::usage(ADD_USAGE));
    }

    let mut draft = TemplateDraft::parse(
        positional[0],
        positional[1],
        positional[2],
        positional[3],
        positional[4],
        positional.get(5).copied(),
    )?;
    draft.autopost = flags.contains(&"--autopost");
    draft.owner = Some(context.config.user.clone());

    let template = TemplateService::create(&context.store, context.clock.as_ref(), draft)?;
    output::success(format!(
        "Template `{}` created ({}).",
        template.name,
        short_id(&template.id)
    ));
    output::hint("Run `reconcile` to materialize upcoming payments.");
    Ok(())
}

fn cmd_edit(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let Some((reference, assignments)) = args.split_first() else {
        return Err(CommandError::usage(EDIT_USAGE));
    };
    if assignments.is_empty() {
        return Err(CommandError::usage(EDIT_USAGE));
    }
    let template = context.resolve_template(reference)?;
    let patch = parse_patch(assignments)?;
    let updated =
        TemplateService::update(&context.store, context.clock.as_ref(), &template.id, &patch)?;
    output::success(format!("Template `{}` updated.", updated.name));
    Ok(())
}

fn cmd_pause(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let template = single_template(context, args, "pause <template>")?;
    TemplateService::pause(&context.store, context.clock.as_ref(), &template.id)?;
    output::success(format!("Template `{}` paused.", template.name));
    Ok(())
}

fn cmd_resume(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let template = single_template(context, args, "resume <template>")?;
    TemplateService::resume(&context.store, context.clock.as_ref(), &template.id)?;
    output::success(format!("Template `{}` resumed.", template.name));
    Ok(())
}

fn cmd_delete(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let template = single_template(context, args, "delete <template>")?;
    let removed = TemplateService::delete(&context.store, &template.id)?;
    output::success(format!(
        "Template `{}` deleted along with {} instance(s).",
        template.name, removed
    ));
    Ok(())
}

fn cmd_templates(context: &mut ShellContext, _args: &[&str]) -> CommandResult {
    let mut templates = context.store.list_templates()?;
    if templates.is_empty() {
        output::info("No recurring templates yet. Use `add` to create one.");
        return Ok(());
    }
    templates.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));

    let today = context.clock.today();
    output::section("Recurring templates");
    for template in &templates {
        let next = if template.is_paused() {
            "-".to_string()
        } else {
            next_due_date(template, today)
                .map(|date| date.to_string())
                .unwrap_or_else(|| "ended".to_string())
        };
        println!("{}  next {:<10}", describe(template), next);
    }
    Ok(())
}

fn cmd_paused(context: &mut ShellContext, _args: &[&str]) -> CommandResult {
    let templates = context.store.list_templates()?;
    let paused = list_paused(&templates);
    if paused.is_empty() {
        output::info("No paused templates.");
        return Ok(());
    }
    output::section("Paused templates");
    for template in paused {
        println!("{}", describe(template));
    }
    Ok(())
}

fn single_template(
    context: &ShellContext,
    args: &[&str],
    usage: &str,
) -> Result<RecurringTemplate, CommandError> {
    match args {
        [reference] => context.resolve_template(reference),
        _ => Err(CommandError::usage(usage)),
    }
}

fn describe(template: &RecurringTemplate) -> String {
    format!(
        "{:<8}  {}  {:<20} {} {:<14} {:<9}{}",
        short_id(&template.id),
        output::template_pill(template.status),
        template.name,
        output::amount(template.amount),
        template.category,
        template.frequency.as_str(),
        if template.autopost { " autopost" } else { "" }
    )
}

/// Builds a patch from `field=value` pairs. `end=none` clears the end date.
pub(crate) fn parse_patch(assignments: &[&str]) -> Result<TemplatePatch, CommandError> {
    let mut patch = TemplatePatch::default();
    for assignment in assignments {
        let Some((field, value)) = assignment.split_once('=') else {
            return Err(CommandError::InvalidArguments(format!(
                "expected <field>=<value>, got `{}`",
                assignment
            )));
        };
        match field.trim().to_ascii_lowercase().as_str() {
            "name" => patch.name = Some(value.to_string()),
            "amount" => {
                let amount = value
                    .trim()
                    .parse::<f64>()
                    .map_err(|_| ValidationError::MalformedAmount(value.to_string()))?;
                patch.amount = Some(amount);
            }
            "category" => patch.category = Some(value.to_string()),
            "frequency" => patch.frequency = Some(value.parse()?),
            "start" => {
                patch.start_date = Some(parse_iso_date(value).map_err(ValidationError::from)?)
            }
            "end" => {
                patch.end_date = match value.trim() {
                    "" | "none" => Some(None),
                    raw => Some(Some(parse_iso_date(raw).map_err(ValidationError::from)?)),
                }
            }
            "autopost" => {
                patch.autopost = Some(match value.trim().to_ascii_lowercase().as_str() {
                    "true" | "yes" | "on" => true,
                    "false" | "no" | "off" => false,
                    _ => {
                        return Err(CommandError::InvalidArguments(
                            "autopost must be true or false".into(),
                        ))
                    }
                })
            }
            other => {
                return Err(CommandError::InvalidArguments(format!(
                    "unknown field `{}`",
                    other
                )))
            }
        }
    }
    Ok(patch)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recurring::Frequency;
    use chrono::NaiveDate;

    #[test]
    fn patch_parses_known_fields() {
        let patch = parse_patch(&["amount=12.50", "frequency=Yearly", "end=none"]).unwrap();
        assert_eq!(patch.amount, Some(12.5));
        assert_eq!(patch.frequency, Some(Frequency::Yearly));
        assert_eq!(patch.end_date, Some(None));

        let patch = parse_patch(&["end=2025-06-30"]).unwrap();
        assert_eq!(
            patch.end_date,
            Some(Some(NaiveDate::from_ymd_opt(2025, 6, 30).unwrap()))
        );
    }

    #[test]
    fn patch_rejects_bad_input() {
        assert!(parse_patch(&["amount"]).is_err());
        assert!(parse_patch(&["colour=red"]).is_err());
        assert!(parse_patch(&["frequency=daily"]).is_err());
        assert!(parse_patch(&["amount=ten"]).is_err());
    }
}
