// SPDX-FileCopyrightText: Copyright (c) 2025-2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Logging configuration for the completion primitives.
//!
//! Sources in priority order (lowest to highest):
//! 1. Code defaults
//! 2. TOML file named by the `VELO_COMPLETION_LOGGING_CONFIG_PATH` environment variable
//! 3. Environment variables prefixed with `VELO_COMPLETION_`
//!
//! Example:
//! ```toml
//! log_level = "debug"
//! jsonl = false
//!
//! [log_filters]
//! "velo_completion::bridge" = "trace"
//! ```

use std::collections::BTreeMap;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Prefix shared by every environment variable read by this crate.
pub const ENV_PREFIX: &str = "VELO_COMPLETION_";

/// Environment variable naming an optional TOML configuration file.
pub const CONFIG_PATH_ENV: &str = "VELO_COMPLETION_LOGGING_CONFIG_PATH";

const DEFAULT_LOG_LEVEL: &str = "info";

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The merged sources could not be deserialized.
    #[error("Failed to extract configuration: {0}")]
    Extraction(#[from] Box<figment::Error>),
}

/// Logging configuration consumed by [`crate::logging::init`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default level for every target not listed in `log_filters`.
    pub log_level: String,

    /// Per-target levels, e.g. `velo_completion::signal = "trace"`.
    pub log_filters: BTreeMap<String, String>,

    /// Emit one JSON object per line instead of human-readable output.
    pub jsonl: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            log_filters: BTreeMap::new(),
            jsonl: false,
        }
    }
}

impl LoggingConfig {
    /// Create a Figment with all configuration sources merged.
    pub fn figment() -> Figment {
        let mut figment = Figment::new().merge(Serialized::defaults(LoggingConfig::default()));
        if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
            figment = figment.merge(Toml::file(path));
        }
        figment.merge(Env::prefixed(ENV_PREFIX).ignore(&["logging_config_path"]))
    }

    /// Extract the configuration from an arbitrary Figment.
    pub fn from_figment(figment: Figment) -> Result<Self, ConfigError> {
        figment.extract().map_err(|e| ConfigError::from(Box::new(e)))
    }

    /// Load the configuration from the default sources.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_figment(Self::figment())
    }

    /// Render the per-target filters as `EnvFilter` directives.
    pub fn filter_directives(&self) -> Vec<String> {
        self.log_filters
            .iter()
            .map(|(target, level)| format!("{target}={level}"))
            .collect()
    }
}
