//! Error types for the terragate gateway

use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

/// The four backend services the gateway orchestrates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Service {
    LanguageContext,
    CodebaseContext,
    DeploymentSuggestion,
    TerraformGeneration,
}

impl Service {
    /// Stable name used in health reports, error bodies and logs.
    pub fn name(&self) -> &'static str {
        match self {
            Service::LanguageContext => "language_context",
            Service::CodebaseContext => "codebase_context",
            Service::DeploymentSuggestion => "deployment_suggestion",
            Service::TerraformGeneration => "terraform_generation",
        }
    }

    /// All services, in pipeline order.
    pub fn all() -> [Service; 4] {
        [
            Service::LanguageContext,
            Service::CodebaseContext,
            Service::DeploymentSuggestion,
            Service::TerraformGeneration,
        ]
    }
}

impl std::fmt::Display for Service {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A single backend call failed. Stage failures are never retried.
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("{service} responded with status {status}")]
    Status { service: Service, status: u16 },

    #[error("{service} is unreachable: {message}")]
    Transport { service: Service, message: String },

    #[error("{service} did not respond within {timeout:?}")]
    Timeout { service: Service, timeout: Duration },

    #[error("{service} returned a malformed response: {message}")]
    MalformedResponse { service: Service, message: String },
}

impl ServiceError {
    /// The backend the failure came from.
    pub fn service(&self) -> Service {
        match self {
            ServiceError::Status { service, .. }
            | ServiceError::Transport { service, .. }
            | ServiceError::Timeout { service, .. }
            | ServiceError::MalformedResponse { service, .. } => *service,
        }
    }

    /// Failure category label used in error bodies.
    pub fn cause(&self) -> &'static str {
        match self {
            ServiceError::Status { .. } => "status_code",
            ServiceError::Transport { .. } => "transport",
            ServiceError::Timeout { .. } => "timeout",
            ServiceError::MalformedResponse { .. } => "malformed_response",
        }
    }
}

/// Which of the two merge inputs an archive failure refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveSide {
    /// The archive the caller uploaded.
    Base,
    /// The archive the terraform-generation service produced.
    Overlay,
}

impl std::fmt::Display for ArchiveSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            ArchiveSide::Base => "base",
            ArchiveSide::Overlay => "overlay",
        })
    }
}

/// A zip merge failed.
#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("{which} archive is not a valid zip: {message}")]
    Malformed { which: ArchiveSide, message: String },

    #[error("merge limit exceeded: {0}")]
    LimitExceeded(String),

    #[error("failed to write merged archive: {0}")]
    Write(String),
}

impl ArchiveError {
    /// Failure category label used in error bodies.
    pub fn cause(&self) -> &'static str {
        match self {
            ArchiveError::Malformed { .. } => "malformed_archive",
            ArchiveError::LimitExceeded(_) => "limit_exceeded",
            ArchiveError::Write(_) => "archive_write",
        }
    }
}

/// Top-level failure of one pipeline run, tagged with the stage it came from.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("invalid upload: {0}")]
    Validation(String),

    #[error(transparent)]
    Stage(#[from] ServiceError),

    #[error("archive merge failed: {0}")]
    Merge(#[from] ArchiveError),
}

impl PipelineError {
    /// Stage label used in error bodies and logs.
    pub fn stage(&self) -> &'static str {
        match self {
            PipelineError::Validation(_) => "validation",
            PipelineError::Stage(e) => e.service().name(),
            PipelineError::Merge(_) => "merge",
        }
    }

    /// Failure category label used in error bodies.
    pub fn cause(&self) -> &'static str {
        match self {
            PipelineError::Validation(_) => "validation",
            PipelineError::Stage(e) => e.cause(),
            PipelineError::Merge(e) => e.cause(),
        }
    }
}

/// Startup configuration failure.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    MissingVar(&'static str),

    #[error("invalid value for {name}: {message}")]
    Invalid { name: &'static str, message: String },

    #[error("failed to initialize logging: {0}")]
    Logging(String),
}

/// Failure to bring up or run the HTTP server.
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("failed to initialize HTTP clients: {0}")]
    Init(String),

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("server terminated: {0}")]
    Serve(#[source] std::io::Error),
}
