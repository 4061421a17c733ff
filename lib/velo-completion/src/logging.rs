// SPDX-FileCopyrightText: Copyright (c) 2025-2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! `tracing-subscriber` setup driven by [`LoggingConfig`].
//!
//! The `VELO_COMPLETION_LOG` environment variable accepts `EnvFilter`
//! directives and is applied on top of the configured level; per-target
//! filters from the configuration are added last.

use std::sync::Once;

use anyhow::{Result, anyhow};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::{Directive, LevelFilter};

use crate::config::LoggingConfig;

/// ENV used to set filter directives
const FILTER_ENV: &str = "VELO_COMPLETION_LOG";

static INIT: Once = Once::new();

/// Install a global subscriber from the default configuration sources.
///
/// Only the first call has any effect. If another subscriber is already
/// installed it is left in place.
pub fn init() {
    INIT.call_once(|| {
        let config = LoggingConfig::from_env().unwrap_or_else(|err| {
            eprintln!("Falling back to default logging configuration: {err}");
            LoggingConfig::default()
        });
        if let Err(err) = try_init_with(&config) {
            eprintln!("{err}");
        }
    });
}

/// Install a global subscriber for `config`.
pub fn try_init_with(config: &LoggingConfig) -> Result<()> {
    let filter = filters(config);
    let installed = if config.jsonl {
        tracing_subscriber::fmt()
            .json()
            .with_writer(std::io::stderr)
            .with_env_filter(filter)
            .try_init()
    } else {
        tracing_subscriber::fmt()
            .compact()
            .with_writer(std::io::stderr)
            .with_env_filter(filter)
            .try_init()
    };
    installed.map_err(|err| anyhow!("Failed to install tracing subscriber: {err}"))
}

fn filters(config: &LoggingConfig) -> EnvFilter {
    let default_directive = config
        .log_level
        .parse::<Directive>()
        .unwrap_or_else(|_| LevelFilter::INFO.into());
    let mut filter = EnvFilter::builder()
        .with_default_directive(default_directive)
        .with_env_var(FILTER_ENV)
        .from_env_lossy();

    for directive in config.filter_directives() {
        match directive.parse::<Directive>() {
            Ok(d) => filter = filter.add_directive(d),
            Err(e) => eprintln!("Failed parsing filter '{directive}': {e}"),
        }
    }
    filter
}
