//! Gateway configuration
//!
//! Everything comes from the environment at startup. The loaded `Config` is
//! immutable and shared read-only for the lifetime of the process; no request
//! handling ever mutates it.

use std::env;
use std::time::Duration;

use url::Url;

use crate::errors::{ConfigError, Service};

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;
const DEFAULT_BACKEND_TIMEOUT_SECS: u64 = 30;
const DEFAULT_HEALTH_TIMEOUT_SECS: u64 = 5;

/// Endpoint URLs for the four backend services.
#[derive(Debug, Clone)]
pub struct Endpoints {
    pub language_context: Url,
    pub codebase_context: Url,
    pub deployment_suggestion: Url,
    pub terraform_generation: Url,
}

impl Endpoints {
    /// The endpoint a given service is called at.
    pub fn url(&self, service: Service) -> &Url {
        match service {
            Service::LanguageContext => &self.language_context,
            Service::CodebaseContext => &self.codebase_context,
            Service::DeploymentSuggestion => &self.deployment_suggestion,
            Service::TerraformGeneration => &self.terraform_generation,
        }
    }
}

/// Server bind options.
#[derive(Debug, Clone)]
pub struct ServerOptions {
    pub host: String,
    pub port: u16,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
        }
    }
}

/// Immutable gateway configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerOptions,
    pub endpoints: Endpoints,
    /// Upper bound for an uploaded request body, enforced at ingress.
    pub max_upload_bytes: usize,
    /// Timeout applied to every pipeline backend call.
    pub backend_timeout: Duration,
    /// Timeout applied to each individual liveness probe.
    pub health_timeout: Duration,
    /// Debug-level logging when the VERBOSE flag is set.
    pub verbose: bool,
}

impl Config {
    /// Load the configuration from the environment.
    ///
    /// The four backend URLs are required; everything else has a default.
    pub fn from_env() -> Result<Self, ConfigError> {
        let endpoints = Endpoints {
            language_context: required_url("LANGUAGE_CONTEXT_URL")?,
            codebase_context: required_url("CODEBASE_CONTEXT_URL")?,
            deployment_suggestion: required_url("DEPLOYMENT_SUGGESTION_URL")?,
            terraform_generation: required_url("GENERATE_TERRAFORM_URL")?,
        };

        let server = ServerOptions {
            host: var_or("HOST", DEFAULT_HOST.to_string())?,
            port: var_or("PORT", DEFAULT_PORT)?,
        };

        Ok(Self {
            server,
            endpoints,
            max_upload_bytes: var_or("MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES)?,
            backend_timeout: Duration::from_secs(var_or(
                "BACKEND_TIMEOUT_SECS",
                DEFAULT_BACKEND_TIMEOUT_SECS,
            )?),
            health_timeout: Duration::from_secs(var_or(
                "HEALTH_TIMEOUT_SECS",
                DEFAULT_HEALTH_TIMEOUT_SECS,
            )?),
            verbose: env::var("VERBOSE").map(|v| v == "true").unwrap_or(false),
        })
    }
}

fn required_url(name: &'static str) -> Result<Url, ConfigError> {
    let raw = env::var(name).map_err(|_| ConfigError::MissingVar(name))?;
    Url::parse(&raw).map_err(|e| ConfigError::Invalid {
        name,
        message: e.to_string(),
    })
}

fn var_or<T>(name: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw.parse().map_err(|e: T::Err| ConfigError::Invalid {
            name,
            message: e.to_string(),
        }),
        Err(_) => Ok(default),
    }
}
