//! TOML-based configuration for flatsheet.
//!
//! Supports a config file (flatsheet.toml) with environment variable
//! expansion for connection values.
//!
//! Example configuration:
//! ```toml
//! [source]
//! endpoint = "${ERP_URL}"
//! database = "${ERP_DB}"
//! username = "${ERP_USERNAME}"
//! password = "${ERP_PASSWORD}"
//! page_size = 2000
//!
//! [retry]
//! attempts = 3
//! delay_secs = 5
//!
//! [report]
//! utc_offset = "+06:00"
//!
//! [jobs.oa_item]
//! input = "data/sale_orders.json"
//! output = "out/oa_item.csv"
//! fan_out = ["order_line"]
//! infer_measures = true
//!
//! [[jobs.oa_item.columns]]
//! name = "Order Reference"
//! field = "name"
//!
//! [[jobs.oa_item.columns]]
//! name = "Brand Group"
//! field = "buyer_name"
//! subfield = "brand"
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{FixedOffset, Offset, Utc};

use super::job::JobSettings;
use crate::source::RetryPolicy;

/// Environment variable pointing at an explicit config file.
pub const CONFIG_ENV_VAR: &str = "FLATSHEET_CONFIG";

/// Error type for settings.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Job not found: {0}")]
    JobNotFound(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    /// Upstream connection values.
    pub source: SourceSettings,

    /// Retry behaviour for upstream calls.
    pub retry: RetrySettings,

    /// How run timestamps are reported.
    pub report: ReportSettings,

    /// Named export jobs.
    pub jobs: BTreeMap<String, JobSettings>,
}

/// Upstream connection values.
///
/// These are opaque to the pipeline; they are handed to whatever client
/// implements the page source. All of them support `${VAR}` expansion.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SourceSettings {
    pub endpoint: Option<String>,
    pub database: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,

    /// Records requested per page.
    pub page_size: usize,
}

impl Default for SourceSettings {
    fn default() -> Self {
        Self {
            endpoint: None,
            database: None,
            username: None,
            password: None,
            page_size: 2000,
        }
    }
}

/// Connection values after environment expansion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedSource {
    pub endpoint: Option<String>,
    pub database: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl SourceSettings {
    /// Expand `${VAR}` references in every connection value.
    pub fn resolved(&self) -> Result<ResolvedSource, SettingsError> {
        let expand = |value: &Option<String>| value.as_deref().map(expand_env_vars).transpose();
        Ok(ResolvedSource {
            endpoint: expand(&self.endpoint)?,
            database: expand(&self.database)?,
            username: expand(&self.username)?,
            password: expand(&self.password)?,
        })
    }
}

/// Retry configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetrySettings {
    /// Total attempts per call, including the first.
    pub attempts: u32,

    /// Fixed delay between attempts, in seconds.
    pub delay_secs: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            attempts: 3,
            delay_secs: 5,
        }
    }
}

impl RetrySettings {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.attempts, Duration::from_secs(self.delay_secs))
    }
}

/// Run timestamp settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ReportSettings {
    /// Offset for "Last Updated" times, e.g. `"+06:00"` or `"UTC"`.
    pub utc_offset: String,
}

impl Default for ReportSettings {
    fn default() -> Self {
        Self {
            utc_offset: "+00:00".to_string(),
        }
    }
}

impl ReportSettings {
    pub fn offset(&self) -> Result<FixedOffset, SettingsError> {
        let text = self.utc_offset.trim();
        if text.eq_ignore_ascii_case("utc") || text == "Z" {
            return Ok(Utc.fix());
        }
        text.parse::<FixedOffset>().map_err(|err| {
            SettingsError::InvalidConfig(format!(
                "report.utc_offset '{}' is not an offset like +06:00: {}",
                self.utc_offset, err
            ))
        })
    }
}

impl Settings {
    /// Load settings from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(SettingsError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse and validate settings from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, SettingsError> {
        let settings: Settings = toml::from_str(content)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from the default config file locations.
    ///
    /// Searches in order:
    /// 1. Environment variable `FLATSHEET_CONFIG`
    /// 2. `./flatsheet.toml`
    /// 3. `~/.config/flatsheet/config.toml`
    pub fn load() -> Result<Self, SettingsError> {
        if let Ok(path) = env::var(CONFIG_ENV_VAR) {
            return Self::from_file(&path);
        }

        let local_config = PathBuf::from("flatsheet.toml");
        if local_config.exists() {
            return Self::from_file(&local_config);
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("flatsheet").join("config.toml");
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        Ok(Settings::default())
    }

    /// Get a job by name.
    pub fn get_job(&self, name: &str) -> Result<&JobSettings, SettingsError> {
        self.jobs
            .get(name)
            .ok_or_else(|| SettingsError::JobNotFound(name.to_string()))
    }

    /// Check every job definition and the global values.
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.source.page_size == 0 {
            return Err(SettingsError::InvalidConfig(
                "source.page_size must be greater than zero".to_string(),
            ));
        }
        self.report.offset()?;
        for (name, job) in &self.jobs {
            job.validate()
                .map_err(|err| SettingsError::InvalidConfig(format!("job '{}': {}", name, err)))?;
        }
        Ok(())
    }
}

/// Expand environment variables in a string.
///
/// Supports `${VAR}` and `$VAR` syntax.
pub fn expand_env_vars(s: &str) -> Result<String, SettingsError> {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '$' {
            result.push(c);
            continue;
        }

        if chars.peek() == Some(&'{') {
            chars.next(); // consume '{'
            let mut var_name = String::new();
            let mut closed = false;
            for ch in chars.by_ref() {
                if ch == '}' {
                    closed = true;
                    break;
                }
                var_name.push(ch);
            }
            if !closed {
                return Err(SettingsError::InvalidConfig(format!(
                    "unterminated variable reference in '{}'",
                    s
                )));
            }
            let value =
                env::var(&var_name).map_err(|_| SettingsError::MissingEnvVar(var_name.clone()))?;
            result.push_str(&value);
        } else {
            // $VAR ends at the first non-alphanumeric/underscore
            let mut var_name = String::new();
            while let Some(&ch) = chars.peek() {
                if ch.is_alphanumeric() || ch == '_' {
                    var_name.push(ch);
                    chars.next();
                } else {
                    break;
                }
            }
            if var_name.is_empty() {
                // Just a lone $, keep it
                result.push('$');
            } else {
                let value = env::var(&var_name)
                    .map_err(|_| SettingsError::MissingEnvVar(var_name.clone()))?;
                result.push_str(&value);
            }
        }
    }

    Ok(result)
}
