//! Executor configuration.
//!
//! Layers, lowest to highest precedence: defaults, a TOML file, environment
//! variables, then whatever the caller sets explicitly.

use blockflow_core::graph::BuildOptions;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const ENV_STEP_BUDGET: &str = "BLOCKFLOW_STEP_BUDGET";
pub const ENV_MAX_CONTINUATIONS: &str = "BLOCKFLOW_MAX_CONTINUATIONS";
pub const ENV_RECORD_TRACE: &str = "BLOCKFLOW_RECORD_TRACE";
pub const ENV_ALLOW_FAN_OUT: &str = "BLOCKFLOW_ALLOW_FAN_OUT";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("invalid value {value:?} for {key}: expected {expected}")]
    InvalidValue {
        key: String,
        value: String,
        expected: &'static str,
    },
}

/// Limits and switches for one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExecutorConfig {
    /// Maximum number of signal calls across all continuations.
    pub step_budget: Option<u64>,
    /// Maximum number of continuations a run may spawn, root included.
    pub max_continuations: Option<usize>,
    /// Record a [`Trace`](crate::trace::Trace) of the run.
    pub record_trace: bool,
    /// Accept graphs whose blocks fan out. When false, the executor also
    /// refuses to signal a fan-out block.
    pub allow_fan_out: bool,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            step_budget: None,
            max_continuations: None,
            record_trace: true,
            allow_fan_out: true,
        }
    }
}

impl ExecutorConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Apply `BLOCKFLOW_*` environment variables on top of this config.
    pub fn with_env_overrides(self) -> Result<Self, ConfigError> {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from any key lookup. Unset keys leave the field alone;
    /// `none` clears an optional limit.
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup(ENV_STEP_BUDGET) {
            self.step_budget = parse_limit(ENV_STEP_BUDGET, &raw)?;
        }
        if let Some(raw) = lookup(ENV_MAX_CONTINUATIONS) {
            self.max_continuations = parse_limit(ENV_MAX_CONTINUATIONS, &raw)?;
        }
        if let Some(raw) = lookup(ENV_RECORD_TRACE) {
            self.record_trace = parse_flag(ENV_RECORD_TRACE, &raw)?;
        }
        if let Some(raw) = lookup(ENV_ALLOW_FAN_OUT) {
            self.allow_fan_out = parse_flag(ENV_ALLOW_FAN_OUT, &raw)?;
        }
        Ok(self)
    }

    pub fn with_step_budget(mut self, budget: u64) -> Self {
        self.step_budget = Some(budget);
        self
    }

    pub fn with_max_continuations(mut self, limit: usize) -> Self {
        self.max_continuations = Some(limit);
        self
    }

    pub fn with_record_trace(mut self, record: bool) -> Self {
        self.record_trace = record;
        self
    }

    pub fn with_allow_fan_out(mut self, allow: bool) -> Self {
        self.allow_fan_out = allow;
        self
    }

    /// Graph build options implied by this config.
    pub fn build_options(&self) -> BuildOptions {
        BuildOptions {
            allow_fan_out: self.allow_fan_out,
        }
    }
}

fn parse_limit<T: std::str::FromStr>(key: &str, raw: &str) -> Result<Option<T>, ConfigError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("none") {
        return Ok(None);
    }
    trimmed
        .parse()
        .map(Some)
        .map_err(|_| ConfigError::InvalidValue {
            key: key.to_string(),
            value: raw.to_string(),
            expected: "a non-negative integer or `none`",
        })
}

fn parse_flag(key: &str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            value: raw.to_string(),
            expected: "a boolean",
        }),
    }
}
