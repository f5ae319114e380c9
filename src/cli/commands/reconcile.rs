use crate::cli::commands::{reject_unknown_flags, split_flags};
use crate::cli::core::{CommandError, CommandResult};
use crate::cli::output;
use crate::cli::registry::CommandEntry;
use crate::cli::shell_context::ShellContext;
use crate::core::services::{plan_reconcile, prune_orphans, Materializer, MaterializerOptions};
use crate::storage::RecurringStore;

pub(crate) fn definitions() -> Vec<CommandEntry> {
    vec![
        CommandEntry::new(
            "reconcile",
            "Materialize instances for the rolling window",
            "reconcile [--dry-run]",
            cmd_reconcile,
        ),
        CommandEntry::new(
            "prune",
            "Delete instances whose template no longer exists",
            "prune",
            cmd_prune,
        ),
    ]
}

fn cmd_reconcile(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let (positional, flags) = split_flags(args);
    reject_unknown_flags(&flags, &["--dry-run"])?;
    if !positional.is_empty() {
        return Err(CommandError::usage("reconcile [--dry-run]"));
    }

    let materializer = Materializer::new(&context.store, context.clock.as_ref())
        .with_options(MaterializerOptions::from(&context.config));
    let window = materializer.window();

    if flags.contains(&"--dry-run") {
        let templates = context.store.list_templates()?;
        let existing = context.store.list_instances()?;
        let plan = plan_reconcile(&templates, &existing, window);
        output::info(format!(
            "Window {} to {}: {} instance(s) would be created, {} already present.",
            window.start,
            window.end,
            plan.missing_count(),
            plan.already_present
        ));
        return Ok(());
    }

    let report = materializer.run()?;
    output::success(format!(
        "Window {} to {}: created {}, already present {}.",
        window.start,
        window.end,
        report.created.len(),
        report.already_present
    ));
    if !report.auto_paid.is_empty() {
        output::info(format!("Auto-marked {} instance(s) paid.", report.auto_paid.len()));
    }
    for failure in &report.failures {
        output::warning(format!(
            "Template {} was not fully materialized: {}",
            failure.template_id, failure.error
        ));
    }
    if report.has_denied() {
        output::error("The store refused a write. Check permissions on the data directory.");
    } else if report.should_retry() {
        output::hint("Some writes failed temporarily; run `reconcile` again to finish.");
    }
    Ok(())
}

fn cmd_prune(context: &mut ShellContext, _args: &[&str]) -> CommandResult {
    let removed = prune_orphans(&context.store)?;
    if removed.is_empty() {
        output::info("No orphaned instances.");
    } else {
        output::success(format!("Removed {} orphaned instance(s).", removed.len()));
    }
    Ok(())
}
