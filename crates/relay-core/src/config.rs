//! Shared configuration for Relay.
//!
//! # Environment Variables
//!
//! - `RELAY_STATE_DIR`: Override the base state directory (`~/.relay`)
//! - `RELAY_ENVIRONMENT`: Application environment (`dev`, `prod`, ...)
//! - `RELAY_DEBUG`: Debug flag (`true`/`false`, `1`/`0`, `yes`/`no`)
//!
//! The binary loads `.env.local` (working directory first, then
//! [`env_file`]) before reading these.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::Result;

/// Environment variable for custom state directory.
pub const STATE_DIR_ENV: &str = "RELAY_STATE_DIR";

/// Environment variable for the application environment.
pub const ENVIRONMENT_ENV: &str = "RELAY_ENVIRONMENT";

/// Environment variable for the debug flag.
pub const DEBUG_ENV: &str = "RELAY_DEBUG";

/// Default state directory name under home.
const DEFAULT_STATE_DIR: &str = ".relay";

/// Default application environment.
pub const DEFAULT_ENVIRONMENT: &str = "dev";

/// Get the Relay state directory.
///
/// The state directory is determined by:
/// 1. `RELAY_STATE_DIR` environment variable if set
/// 2. `~/.relay` if home directory is available
/// 3. `.relay` in current directory as fallback
pub fn state_dir() -> PathBuf {
    std::env::var(STATE_DIR_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            dirs::home_dir()
                .map(|h| h.join(DEFAULT_STATE_DIR))
                .unwrap_or_else(|| PathBuf::from(DEFAULT_STATE_DIR))
        })
}

/// Get the .env.local file path.
pub fn env_file() -> PathBuf {
    state_dir().join(".env.local")
}

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Environment name.
    pub environment: String,
    /// Debug mode.
    pub debug: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            environment: DEFAULT_ENVIRONMENT.to_string(),
            debug: true,
        }
    }
}

impl AppConfig {
    /// Returns this configuration with the set fields of `overrides` applied.
    pub fn merged(mut self, overrides: &AppConfigOverrides) -> Self {
        if let Some(environment) = &overrides.environment {
            self.environment = environment.clone();
        }
        if let Some(debug) = overrides.debug {
            self.debug = debug;
        }
        self
    }
}

/// Partial configuration; unset fields keep their current value when merged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppConfigOverrides {
    pub environment: Option<String>,
    pub debug: Option<bool>,
}

impl AppConfigOverrides {
    /// Loads the environment file (if present) with the process environment
    /// layered on top.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(env_file: &Path) -> Result<Self> {
        let from_file = if env_file.exists() {
            Self::from_env_file(env_file)?
        } else {
            Self::default()
        };
        Ok(from_file.or(Self::from_env()))
    }

    /// Reads overrides from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads overrides from an env file without touching the process
    /// environment.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_env_file(path: &Path) -> Result<Self> {
        let vars = dotenvy::from_path_iter(path)?.collect::<std::result::Result<HashMap<_, _>, _>>()?;
        Ok(Self::from_lookup(|key| vars.get(key).cloned()))
    }

    /// Reads overrides through a variable lookup function.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let environment = lookup(ENVIRONMENT_ENV)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());

        let debug = lookup(DEBUG_ENV).and_then(|raw| {
            let parsed = parse_bool(&raw);
            if parsed.is_none() {
                warn!(var = DEBUG_ENV, value = %raw, "ignoring unrecognized boolean");
            }
            parsed
        });

        Self { environment, debug }
    }

    /// Layers `other` on top of `self`; set fields of `other` win.
    pub fn or(self, other: Self) -> Self {
        Self {
            environment: other.environment.or(self.environment),
            debug: other.debug.or(self.debug),
        }
    }
}

/// Parses the boolean spellings accepted in environment variables.
pub fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
