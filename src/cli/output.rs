use colored::{ColoredString, Colorize};
use std::fmt;

use crate::recurring::{DisplayStatus, TemplateStatus};

/// Message categories used by the CLI output helpers.
#[derive(Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Info,
    Success,
    Warning,
    Error,
    Hint,
    Section,
}

fn apply_style(kind: MessageKind, message: impl fmt::Display) -> String {
    let text = message.to_string();
    match kind {
        MessageKind::Info => format!("INFO: [i] {text}"),
        MessageKind::Success => format!("SUCCESS: [✓] {text}").bright_green().to_string(),
        MessageKind::Warning => format!("WARNING: [!] {text}").bright_yellow().to_string(),
        MessageKind::Error => format!("ERROR: [x] {text}").bright_red().to_string(),
        MessageKind::Hint => format!("HINT: {text}").bright_cyan().to_string(),
        MessageKind::Section => format!("=== {} ===", text.trim()).bold().to_string(),
    }
}

pub fn print(kind: MessageKind, message: impl fmt::Display) {
    let formatted = apply_style(kind, message);
    match kind {
        MessageKind::Section => println!("\n{}", formatted),
        MessageKind::Error | MessageKind::Warning => eprintln!("{}", formatted),
        _ => println!("{}", formatted),
    }
}

pub fn info(message: impl fmt::Display) {
    print(MessageKind::Info, message);
}

pub fn success(message: impl fmt::Display) {
    print(MessageKind::Success, message);
}

pub fn warning(message: impl fmt::Display) {
    print(MessageKind::Warning, message);
}

pub fn error(message: impl fmt::Display) {
    print(MessageKind::Error, message);
}

pub fn hint(message: impl fmt::Display) {
    print(MessageKind::Hint, message);
}

pub fn section(title: impl fmt::Display) {
    print(MessageKind::Section, title);
}

/// Fixed-width coloured label for an instance's display status.
pub fn status_pill(status: DisplayStatus) -> ColoredString {
    let text = format!("{:<9}", status.label());
    match status {
        DisplayStatus::Paid => text.green(),
        DisplayStatus::Skipped => text.dimmed(),
        DisplayStatus::Overdue => text.red().bold(),
        DisplayStatus::Due => text.yellow().bold(),
        DisplayStatus::DueSoon => text.yellow(),
        DisplayStatus::Scheduled => text.normal(),
    }
}

pub fn template_pill(status: TemplateStatus) -> ColoredString {
    let text = format!("{:<6}", status.as_str());
    match status {
        TemplateStatus::Active => text.green(),
        TemplateStatus::Paused => text.dimmed(),
    }
}

pub fn amount(value: f64) -> String {
    format!("{:>10.2}", value)
}
