use std::io;

use chrono::NaiveDate;
use thiserror::Error;

/// Raised when a stored or user-supplied calendar date cannot be read.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DateParseError {
    #[error("invalid date `{0}`: expected YYYY-MM-DD")]
    Malformed(String),
    #[error("date `{0}` is not a valid calendar day")]
    OutOfRange(String),
}

/// Template input rejected before any write is attempted.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    #[error("template id must not be empty")]
    EmptyId,
    #[error("name must not be empty")]
    EmptyName,
    #[error("amount must be a finite number greater than zero (got {0})")]
    InvalidAmount(f64),
    #[error("amount `{0}` is not a number")]
    MalformedAmount(String),
    #[error("category must not be empty")]
    EmptyCategory,
    #[error("unknown frequency `{0}` (expected weekly, biweekly, monthly or yearly)")]
    InvalidFrequency(String),
    #[error("unknown status `{0}`")]
    InvalidStatus(String),
    #[error(transparent)]
    InvalidDate(#[from] DateParseError),
    #[error("end date {end} is before start date {start}")]
    EndBeforeStart { start: NaiveDate, end: NaiveDate },
}

/// Failures reported by a template/instance store.
///
/// `Denied` is never retried and must reach the caller. `Transient` failures
/// are safe to retry wholesale because every materializer write is an
/// idempotent merge.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("permission denied: {0}")]
    Denied(String),
    #[error("store temporarily unavailable: {0}")]
    Transient(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("stored data is unreadable: {0}")]
    Corrupt(String),
}

impl StoreError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::Transient(_))
    }

    pub fn is_denied(&self) -> bool {
        matches!(self, StoreError::Denied(_))
    }
}

impl From<io::Error> for StoreError {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::PermissionDenied => StoreError::Denied(err.to_string()),
            io::ErrorKind::NotFound => StoreError::NotFound(err.to_string()),
            _ => StoreError::Transient(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Corrupt(err.to_string())
    }
}

/// Unified error type for the recurring engine and its services.
#[derive(Debug, Error)]
pub enum RecurringError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    DateParse(#[from] DateParseError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("Template not found: {0}")]
    TemplateNotFound(String),
    #[error("Instance not found: {0}")]
    InstanceNotFound(String),
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl RecurringError {
    /// Returns `true` when re-running the failed operation may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, RecurringError::Store(err) if err.is_retryable())
    }
}

pub type Result<T> = std::result::Result<T, RecurringError>;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Serialization error: {0}")]
    Serde(String),
    #[error("Invalid setting `{key}`: {reason}")]
    InvalidValue { key: String, reason: String },
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        ConfigError::Serde(err.to_string())
    }
}

/// User-facing error wrapper for the command shell.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] RecurringError),
    #[error("Command failed: {0}")]
    Command(String),
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl From<ValidationError> for CliError {
    fn from(err: ValidationError) -> Self {
        CliError::Core(err.into())
    }
}

impl From<StoreError> for CliError {
    fn from(err: StoreError) -> Self {
        CliError::Core(err.into())
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        CliError::Core(err.into())
    }
}
