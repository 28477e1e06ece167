//! Tracing setup
//!
//! Logging starts before the configuration is read so that config warnings
//! are not lost. Once the config is loaded its `log-level` replaces the
//! initial filter, unless `RUST_LOG` was set.

use anyhow::{Context, Result};
use pedal_mapper_config::LogLevel;
use tracing_subscriber::{fmt, prelude::*, reload, EnvFilter, Registry};

pub struct LogHandle {
    handle: reload::Handle<EnvFilter, Registry>,
    from_env: bool,
}

/// Install the global subscriber.
pub fn init() -> LogHandle {
    let (filter, from_env) = match EnvFilter::try_from_default_env() {
        Ok(filter) => (filter, true),
        Err(_) => (EnvFilter::new(LogLevel::default().as_filter()), false),
    };
    let (filter, handle) = reload::Layer::new(filter);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .init();

    LogHandle { handle, from_env }
}

impl LogHandle {
    /// Switch to the configured level. `RUST_LOG` takes precedence.
    pub fn apply(&self, level: LogLevel) -> Result<()> {
        if self.from_env {
            tracing::debug!("RUST_LOG is set, ignoring log-level {:?}", level);
            return Ok(());
        }
        self.handle
            .reload(EnvFilter::new(level.as_filter()))
            .context("Failed to apply log level")
    }
}
