use crate::cli::core::{CommandError, CommandResult};
use crate::cli::output;
use crate::cli::registry::CommandEntry;
use crate::cli::shell_context::ShellContext;
use crate::config::Config;

pub(crate) fn definitions() -> Vec<CommandEntry> {
    vec![CommandEntry::new(
        "config",
        "Show or change settings",
        "config [key [value]]",
        cmd_config,
    )]
}

fn cmd_config(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    match args {
        [] => {
            output::section("Configuration");
            for key in Config::KEYS {
                let value = context.config.get(key).unwrap_or_default();
                output::info(format!("  {:<16} {}", key, value));
            }
            output::info(format!("  file: {}", context.config_manager.path().display()));
            Ok(())
        }
        [key] => match context.config.get(key) {
            Some(value) => {
                output::info(format!("{} = {}", key, value));
                Ok(())
            }
            None => Err(unknown_key(key)),
        },
        [key, value] => {
            let mut updated = context.config.clone();
            updated.set(key, value)?;
            context.config = updated;
            context.save_config()?;
            output::success(format!("{} set to {}.", key, value));
            Ok(())
        }
        _ => Err(CommandError::usage("config [key [value]]")),
    }
}

fn unknown_key(key: &str) -> CommandError {
    CommandError::InvalidArguments(format!(
        "unknown setting `{}` (known: {})",
        key,
        Config::KEYS.join(", ")
    ))
}
