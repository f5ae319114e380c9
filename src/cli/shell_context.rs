use std::env;

use crate::{
    cli::{
        commands,
        core::{CommandError, CommandResult, LoopControl},
        help, output,
        registry::{CommandEntry, CommandRegistry},
    },
    config::{Config, ConfigManager},
    core::clock::{Clock, FixedClock, SystemClock},
    errors::{CliError, RecurringError},
    recurring::{
        dates::parse_iso_date, instance_id, RecurringInstance, RecurringTemplate,
        StatusClassifier,
    },
    storage::{JsonStore, RecurringStore},
};

/// Pins "today" for reproducible scripted sessions.
pub const TODAY_ENV: &str = "RECURRING_CORE_TODAY";

/// Shortest id prefix accepted when referring to a template.
const MIN_PREFIX_LEN: usize = 4;
const SHORT_ID_LEN: usize = 8;

pub struct ShellContext {
    pub registry: CommandRegistry,
    pub config_manager: ConfigManager,
    pub config: Config,
    pub store: JsonStore,
    pub clock: Box<dyn Clock>,
    pub running: bool,
}

impl ShellContext {
    pub fn new() -> Result<Self, CliError> {
        let config_manager = ConfigManager::new()?;
        let config = config_manager.load()?;
        let store = open_store(&config_manager, &config)?;
        let clock = clock_from_env()?;

        let mut registry = CommandRegistry::new();
        commands::register_all(&mut registry);

        Ok(Self {
            registry,
            config_manager,
            config,
            store,
            clock,
            running: true,
        })
    }

    pub fn prompt(&self) -> String {
        format!("recurring[{}]> ", self.config.user)
    }

    pub fn command_names(&self) -> Vec<&'static str> {
        self.registry.names().collect()
    }

    pub fn command(&self, name: &str) -> Option<&CommandEntry> {
        self.registry.get(name)
    }

    pub fn classifier(&self) -> StatusClassifier {
        StatusClassifier::new(self.config.due_soon_days)
    }

    /// Persists the configuration and reopens the store in case the user or
    /// data root changed.
    pub fn save_config(&mut self) -> CommandResult {
        self.config_manager.save(&self.config)?;
        self.store = open_store(&self.config_manager, &self.config)?;
        Ok(())
    }

    /// Finds a template by full id, unique id prefix, or unique name.
    pub fn resolve_template(&self, reference: &str) -> Result<RecurringTemplate, CommandError> {
        let templates = self.store.list_templates()?;
        if let Some(found) = templates.iter().find(|t| t.id == reference) {
            return Ok(found.clone());
        }

        let mut matches: Vec<&RecurringTemplate> = if reference.len() >= MIN_PREFIX_LEN {
            templates
                .iter()
                .filter(|t| t.id.starts_with(reference))
                .collect()
        } else {
            Vec::new()
        };
        if matches.is_empty() {
            matches = templates
                .iter()
                .filter(|t| t.name.eq_ignore_ascii_case(reference))
                .collect();
        }

        match matches.as_slice() {
            [single] => Ok((*single).clone()),
            [] => Err(RecurringError::TemplateNotFound(reference.to_string()).into()),
            _ => Err(CommandError::InvalidArguments(format!(
                "`{}` matches {} templates; use a longer id",
                reference,
                matches.len()
            ))),
        }
    }

    /// Finds an instance by full id or by `<template>:<YYYY-MM-DD>`.
    pub fn resolve_instance(&self, reference: &str) -> Result<RecurringInstance, CommandError> {
        if let Some(found) = self.store.instance(reference)? {
            return Ok(found);
        }
        let Some((template_ref, date)) = reference.rsplit_once(':') else {
            return Err(RecurringError::InstanceNotFound(reference.to_string()).into());
        };
        let due = parse_iso_date(date).map_err(RecurringError::from)?;
        let template = self.resolve_template(template_ref)?;
        let id = instance_id(&template.id, due);
        self.store
            .instance(&id)?
            .ok_or_else(|| RecurringError::InstanceNotFound(reference.to_string()).into())
    }

    pub(crate) fn dispatch(
        &mut self,
        command: &str,
        raw: &str,
        args: &[&str],
    ) -> Result<LoopControl, CommandError> {
        if let Some(handler) = self.registry.handler(command) {
            match handler(self, args) {
                Ok(()) => Ok(LoopControl::Continue),
                Err(CommandError::ExitRequested) => Ok(LoopControl::Exit),
                Err(err) => Err(err),
            }
        } else {
            self.suggest_command(raw);
            Ok(LoopControl::Continue)
        }
    }

    pub(crate) fn suggest_command(&self, input: &str) {
        output::warning(format!(
            "Unknown command `{}`. Type `help` to see available commands.",
            input
        ));
        if let Some(best) = self.registry.closest(&input.to_lowercase()) {
            output::info(format!("Suggestion: `{}`?", best));
        }
    }

    pub(crate) fn report_error(&self, err: CommandError) {
        match err {
            CommandError::ExitRequested => {}
            CommandError::InvalidArguments(message) => {
                output::error(message);
                output::hint("Use `help <command>` for usage details.");
            }
            other => output::error(other),
        }
    }

    pub(crate) fn print_help(&self, command: Option<&str>) {
        match command {
            Some(name) => match self.command(&name.to_lowercase()) {
                Some(entry) => help::print_command(entry),
                None => self.suggest_command(name),
            },
            None => help::print_overview(&self.registry),
        }
    }
}

/// Short display form of a template id.
pub fn short_id(id: &str) -> &str {
    id.get(..SHORT_ID_LEN).unwrap_or(id)
}

/// Reference accepted by [`ShellContext::resolve_instance`].
pub fn instance_ref(instance: &RecurringInstance) -> String {
    format!("{}:{}", short_id(&instance.template_id), instance.due_date)
}

fn open_store(manager: &ConfigManager, config: &Config) -> Result<JsonStore, RecurringError> {
    let root = config.data_root_or(manager.base_dir());
    Ok(JsonStore::open(&root, &config.user)?)
}

fn clock_from_env() -> Result<Box<dyn Clock>, RecurringError> {
    match env::var(TODAY_ENV) {
        Ok(raw) if !raw.trim().is_empty() => {
            Ok(Box::new(FixedClock::new(parse_iso_date(&raw)?)))
        }
        _ => Ok(Box::new(SystemClock)),
    }
}
