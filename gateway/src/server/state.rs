//! Server state

use crate::clients::ServiceClient;
use crate::config::Config;
use crate::errors::ServerError;
use crate::health::{probe_targets, HealthProber, ProbeTarget};
use crate::pipeline::Pipeline;

/// Server state shared across handlers
pub struct ServerState {
    pub pipeline: Pipeline,
    pub prober: HealthProber,
    pub probe_targets: Vec<ProbeTarget>,
    pub max_upload_bytes: usize,
}

impl ServerState {
    /// Build the shared state from the loaded configuration.
    pub fn new(config: &Config) -> Result<Self, ServerError> {
        let clients = ServiceClient::new(config.endpoints.clone(), config.backend_timeout)
            .map_err(|e| ServerError::Init(e.to_string()))?;
        let prober =
            HealthProber::new(config.health_timeout).map_err(|e| ServerError::Init(e.to_string()))?;

        Ok(Self {
            pipeline: Pipeline::new(clients),
            prober,
            probe_targets: probe_targets(&config.endpoints),
            max_upload_bytes: config.max_upload_bytes,
        })
    }
}
