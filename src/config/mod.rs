//! Configuration module for flatsheet.
//!
//! Handles the TOML settings file, environment variable expansion, and
//! job definitions.

mod job;
mod settings;

pub use job::{ColumnSettings, JobError, JobSettings, ROOT_SCOPE};
pub use settings::{
    expand_env_vars, ReportSettings, RetrySettings, ResolvedSource, Settings, SettingsError,
    SourceSettings, CONFIG_ENV_VAR,
};
