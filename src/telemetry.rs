// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Logging initialization.
//!
//! `RUST_LOG` takes precedence over the configured level. `LOG_FORMAT=json`
//! switches to structured JSON lines, anything else prints human-readable logs.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::error::ClientError;

/// Output format for log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl LogFormat {
    pub fn parse(raw: &str) -> Self {
        if raw.trim().eq_ignore_ascii_case("json") {
            Self::Json
        } else {
            Self::Pretty
        }
    }
}

/// Build the env filter, preferring `RUST_LOG` when set.
fn build_filter(level: &str) -> Result<EnvFilter, ClientError> {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .map_err(|e| ClientError::Config(format!("Invalid log filter '{level}': {e}")))
}

/// Install the global tracing subscriber.
pub fn init_tracing(level: &str, format: LogFormat) -> Result<(), ClientError> {
    let filter = build_filter(level)?;

    let result = match format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init(),
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().compact().with_writer(std::io::stderr))
            .try_init(),
    };

    result.map_err(|e| ClientError::Config(format!("Failed to install logger: {e}")))
}
