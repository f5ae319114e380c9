pub mod config;
pub mod instance;
pub mod reconcile;
pub mod system;
pub mod template;

use crate::cli::core::CommandError;
use crate::cli::registry::{CommandEntry, CommandRegistry};

pub(crate) fn all_definitions() -> Vec<CommandEntry> {
    let mut commands = Vec::new();
    commands.extend(template::definitions());
    commands.extend(instance::definitions());
    commands.extend(reconcile::definitions());
    commands.extend(config::definitions());
    commands.extend(system::definitions());
    commands
}

pub(crate) fn register_all(registry: &mut CommandRegistry) {
    for entry in all_definitions() {
        registry.register(entry);
    }
}

/// Splits `--flag` switches from positional arguments.
pub(crate) fn split_flags<'a>(args: &[&'a str]) -> (Vec<&'a str>, Vec<&'a str>) {
    args.iter().copied().partition(|arg| !arg.starts_with("--"))
}

pub(crate) fn reject_unknown_flags(flags: &[&str], allowed: &[&str]) -> Result<(), CommandError> {
    match flags.iter().find(|flag| !allowed.contains(*flag)) {
        Some(flag) => Err(CommandError::InvalidArguments(format!(
            "unknown option `{}`",
            flag
        ))),
        None => Ok(()),
    }
}

pub(crate) fn parse_limit(raw: Option<&&str>, what: &str) -> Result<Option<usize>, CommandError> {
    raw.map(|value| {
        value
            .parse::<usize>()
            .map_err(|_| CommandError::InvalidArguments(format!("{} must be a whole number", what)))
    })
    .transpose()
}
