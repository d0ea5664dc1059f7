//! Backend liveness probing
//!
//! All probes run concurrently, each with its own timeout, and the report is
//! only assembled once every probe has settled. A slow backend therefore
//! delays the report but can never cause a missing entry.

use std::collections::BTreeMap;
use std::time::Duration;

use futures::future::join_all;
use reqwest::Client;
use serde::Serialize;
use tracing::debug;
use url::Url;

use crate::config::Endpoints;
use crate::errors::Service;

/// Liveness verdict for one backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthState {
    /// Reached and returned a 2xx.
    Healthy,
    /// Reached but returned a non-2xx.
    Unhealthy,
    /// Connection failed or the probe timed out.
    Unreachable,
}

/// A named probe target.
#[derive(Debug, Clone)]
pub struct ProbeTarget {
    pub name: &'static str,
    pub url: Url,
}

/// One probe target per backend, at the origin of its endpoint URL.
///
/// Every backend answers `GET /` at its root as a liveness check, so the
/// endpoint path is stripped and only scheme, host and port are kept.
pub fn probe_targets(endpoints: &Endpoints) -> Vec<ProbeTarget> {
    Service::all()
        .into_iter()
        .map(|service| {
            let mut url = endpoints.url(service).clone();
            url.set_path("/");
            url.set_query(None);
            url.set_fragment(None);
            ProbeTarget {
                name: service.name(),
                url,
            }
        })
        .collect()
}

/// Concurrent liveness prober for the backend services.
#[derive(Debug, Clone)]
pub struct HealthProber {
    client: Client,
    probe_timeout: Duration,
}

impl HealthProber {
    /// Create a new prober. The timeout applies per probe, not to the batch.
    pub fn new(probe_timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().build()?;

        Ok(Self {
            client,
            probe_timeout,
        })
    }

    /// Probe every target and report one verdict per target.
    ///
    /// The map always holds exactly one entry per target; a failed or
    /// timed-out probe is reported as unreachable, never dropped.
    pub async fn probe(&self, targets: &[ProbeTarget]) -> BTreeMap<&'static str, HealthState> {
        let checks = targets.iter().map(|target| async move {
            let state = self.probe_one(&target.url).await;
            debug!("probe {} -> {:?}", target.name, state);
            (target.name, state)
        });

        join_all(checks).await.into_iter().collect()
    }

    async fn probe_one(&self, url: &Url) -> HealthState {
        let request = self
            .client
            .get(url.clone())
            .timeout(self.probe_timeout)
            .send();

        match request.await {
            Ok(response) if response.status().is_success() => HealthState::Healthy,
            Ok(_) => HealthState::Unhealthy,
            Err(_) => HealthState::Unreachable,
        }
    }
}
