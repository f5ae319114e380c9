use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::{
    core::utils::{app_data_dir, config_file_in, data_dir_in, ensure_dir},
    errors::ConfigError,
    recurring::{DEFAULT_DUE_SOON_DAYS, STANDARD_WINDOW_DAYS},
};

const TMP_SUFFIX: &str = "tmp";
const DEFAULT_USER: &str = "default";
/// Upper bound for the materialization horizon, roughly ten years.
const MAX_WINDOW_DAYS: u32 = 3_660;

pub type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub user: String,
    pub window_days: u32,
    pub due_soon_days: u32,
    pub auto_mark_paid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_root: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            user: DEFAULT_USER.into(),
            window_days: STANDARD_WINDOW_DAYS,
            due_soon_days: DEFAULT_DUE_SOON_DAYS as u32,
            auto_mark_paid: false,
            data_root: None,
        }
    }
}

impl Config {
    /// Keys accepted by [`Config::set`], in display order.
    pub const KEYS: [&'static str; 5] = [
        "user",
        "window_days",
        "due_soon_days",
        "auto_mark_paid",
        "data_root",
    ];

    /// Root directory for store documents, falling back to `<base>/data`.
    pub fn data_root_or(&self, base: &Path) -> PathBuf {
        self.data_root
            .clone()
            .unwrap_or_else(|| data_dir_in(base))
    }

    pub fn get(&self, key: &str) -> Option<String> {
        let value = match key {
            "user" => self.user.clone(),
            "window_days" => self.window_days.to_string(),
            "due_soon_days" => self.due_soon_days.to_string(),
            "auto_mark_paid" => self.auto_mark_paid.to_string(),
            "data_root" => self
                .data_root
                .as_ref()
                .map(|path| path.display().to_string())
                .unwrap_or_default(),
            _ => return None,
        };
        Some(value)
    }

    /// Parses and assigns one setting from its textual form.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let value = value.trim();
        match key {
            "user" => {
                if value.is_empty() {
                    return Err(invalid(key, "must not be empty"));
                }
                self.user = value.to_string();
            }
            "window_days" => {
                let days = parse_u32(key, value)?;
                if days == 0 || days > MAX_WINDOW_DAYS {
                    return Err(invalid(
                        key,
                        &format!("must be between 1 and {}", MAX_WINDOW_DAYS),
                    ));
                }
                self.window_days = days;
            }
            "due_soon_days" => self.due_soon_days = parse_u32(key, value)?,
            "auto_mark_paid" => {
                self.auto_mark_paid = match value.to_ascii_lowercase().as_str() {
                    "true" | "yes" | "on" | "1" => true,
                    "false" | "no" | "off" | "0" => false,
                    _ => return Err(invalid(key, "expected true or false")),
                }
            }
            "data_root" => {
                self.data_root = if value.is_empty() {
                    None
                } else {
                    Some(PathBuf::from(value))
                }
            }
            _ => return Err(invalid(key, "unknown setting")),
        }
        Ok(())
    }
}

fn parse_u32(key: &str, value: &str) -> Result<u32> {
    value
        .parse::<u32>()
        .map_err(|_| invalid(key, "expected a non-negative whole number"))
}

fn invalid(key: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        reason: reason.to_string(),
    }
}

pub struct ConfigManager {
    base: PathBuf,
    path: PathBuf,
}

impl ConfigManager {
    pub fn new() -> Result<Self> {
        Self::with_base_dir(app_data_dir())
    }

    pub fn with_base_dir(base: PathBuf) -> Result<Self> {
        ensure_dir(&base)?;
        Ok(Self {
            path: config_file_in(&base),
            base,
        })
    }

    /// Loads the stored configuration, or the defaults when none was saved.
    pub fn load(&self) -> Result<Config> {
        if self.path.exists() {
            let data = fs::read_to_string(&self.path)?;
            if data.trim().is_empty() {
                return Ok(Config::default());
            }
            Ok(serde_json::from_str(&data)?)
        } else {
            Ok(Config::default())
        }
    }

    pub fn save(&self, config: &Config) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            ensure_dir(parent)?;
        }
        let json = serde_json::to_string_pretty(config)?;
        let tmp = tmp_path(&self.path);
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn base_dir(&self) -> &Path {
        &self.base
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut tmp = path.to_path_buf();
    tmp.set_extension(format!("json.{}", TMP_SUFFIX));
    tmp
}
