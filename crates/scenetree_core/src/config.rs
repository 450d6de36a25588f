//! Configuration loading from environment variables.

use crate::constants::{DEFAULT_HISTORY_LIMIT, DEFAULT_SCRIPT_SERVICE};
use serde::Deserialize;
use std::env;

/// Runtime configuration for a SceneTree session.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Config {
    /// Maximum retained history entries; `0` disables the cap.
    pub history_limit: usize,
    /// Service whose scripts a run executes.
    pub script_service: String,
    /// Seed the sample scripts into a fresh session.
    pub seed_samples: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            history_limit: DEFAULT_HISTORY_LIMIT,
            script_service: DEFAULT_SCRIPT_SERVICE.to_string(),
            seed_samples: true,
        }
    }
}

/// Parse a boolean-like environment flag value.
///
/// # Supported Values
/// - Truthy: `1`, `true`, `yes`, `on`
/// - Falsy: `0`, `false`, `no`, `off`, empty string
///
/// Matching is case-insensitive and ignores surrounding whitespace.
///
/// # Returns
/// `Some(bool)` when the value is recognized, otherwise `None`.
pub fn parse_env_flag(value: &str) -> Option<bool> {
    let normalized = value.trim().to_ascii_lowercase();
    match normalized.as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "" | "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Read a boolean flag from the environment, falling back to `default`.
///
/// Missing or unrecognized values yield `default`.
///
/// # Arguments
/// - `name`: Environment variable name.
/// - `default`: Value used when the variable is absent or unparseable.
pub fn env_flag_or(name: &str, default: bool) -> bool {
    env::var(name)
        .ok()
        .and_then(|value| parse_env_flag(&value))
        .unwrap_or(default)
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Returns
    /// A populated [`Config`] with defaults applied when env vars are missing.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            history_limit: env::var("SCENETREE_HISTORY_LIMIT")
                .ok()
                .and_then(|value| value.trim().parse().ok())
                .unwrap_or(defaults.history_limit),
            script_service: env::var("SCENETREE_SCRIPT_SERVICE")
                .ok()
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
                .unwrap_or(defaults.script_service),
            seed_samples: env_flag_or("SCENETREE_SEED_SAMPLES", defaults.seed_samples),
        }
    }
}
