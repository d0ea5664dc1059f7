//! Logging configuration

use std::env;

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::errors::ConfigError;

/// Logging options
#[derive(Debug, Clone, Default)]
pub struct LogOptions {
    /// Default to debug-level output
    pub verbose: bool,

    /// Enable JSON format
    pub json_format: bool,
}

impl LogOptions {
    /// Options derived from the environment.
    ///
    /// `LOG_FORMAT=json` switches the output format; the verbose flag comes
    /// from the loaded configuration.
    pub fn from_env(verbose: bool) -> Self {
        Self {
            verbose,
            json_format: env::var("LOG_FORMAT").map(|v| v == "json").unwrap_or(false),
        }
    }

    fn default_filter(&self) -> &'static str {
        if self.verbose {
            "debug"
        } else {
            "info"
        }
    }
}

/// Initialize logging
///
/// `RUST_LOG` always wins; without it the level falls back to the verbose
/// flag.
pub fn init_logging(options: LogOptions) -> Result<(), ConfigError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(options.default_filter()));

    let subscriber = tracing_subscriber::registry().with(filter);

    if options.json_format {
        subscriber
            .with(fmt::layer().json())
            .try_init()
            .map_err(|e| ConfigError::Logging(e.to_string()))?;
    } else {
        subscriber
            .with(fmt::layer())
            .try_init()
            .map_err(|e| ConfigError::Logging(e.to_string()))?;
    }

    Ok(())
}
