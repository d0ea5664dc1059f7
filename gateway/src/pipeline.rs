//! The generation pipeline
//!
//! One upload flows through four backend calls and a merge. The two context
//! extractions are independent and run in parallel; the suggestion and
//! generation stages each consume the previous stage's output and run in
//! sequence. The first failing stage aborts the run: later stages are never
//! attempted and no partial result is ever returned.

use std::future::Future;
use std::time::Instant;

use bytes::Bytes;
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::archive::{merge, MergeLimits};
use crate::clients::ServiceClient;
use crate::errors::PipelineError;

/// One inbound generation request.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    /// Raw bytes of the uploaded archive.
    pub archive: Bytes,
    /// Original filename, forwarded to the codebase-context service.
    pub filename: String,
    /// Free-form deployment instruction, forwarded verbatim when present.
    pub instruction: Option<String>,
}

/// Coordinates the stage sequence for a single upload.
#[derive(Debug, Clone)]
pub struct Pipeline {
    clients: ServiceClient,
    merge_limits: MergeLimits,
}

impl Pipeline {
    pub fn new(clients: ServiceClient) -> Self {
        Self::with_limits(clients, MergeLimits::default())
    }

    pub fn with_limits(clients: ServiceClient, merge_limits: MergeLimits) -> Self {
        Self {
            clients,
            merge_limits,
        }
    }

    /// Run every stage and return the merged archive bytes.
    pub async fn execute(&self, request: UploadRequest) -> Result<Vec<u8>, PipelineError> {
        let span = info_span!("pipeline", request_id = %Uuid::new_v4());
        self.run(request).instrument(span).await
    }

    async fn run(&self, request: UploadRequest) -> Result<Vec<u8>, PipelineError> {
        if request.archive.is_empty() {
            return Err(PipelineError::Validation(
                "uploaded archive is empty".to_string(),
            ));
        }

        info!(
            "pipeline started for {} ({} bytes)",
            request.filename,
            request.archive.len()
        );

        // Neither context depends on the other; both calls run concurrently
        // and the pipeline only continues once both have settled. When both
        // fail, the language-context error is the one reported.
        let (language, codebase) = tokio::join!(
            timed(
                "language_context",
                self.clients
                    .extract_language_context(request.instruction.as_deref()),
            ),
            timed(
                "codebase_context",
                self.clients
                    .extract_codebase_context(&request.filename, request.archive.clone()),
            ),
        );
        let language_context = language?;
        let codebase_context = codebase?;

        let suggestion = timed(
            "deployment_suggestion",
            self.clients
                .suggest_deployment(&language_context, &codebase_context),
        )
        .await?;

        let generated = timed(
            "terraform_generation",
            self.clients.generate_terraform(&suggestion),
        )
        .await?;

        let merged = timed("merge", async {
            merge(&request.archive, &generated, &self.merge_limits)
        })
        .await?;

        info!("pipeline completed ({} bytes merged)", merged.len());
        Ok(merged)
    }
}

/// Await one stage, logging its outcome and duration.
async fn timed<T, E>(stage: &'static str, fut: impl Future<Output = Result<T, E>>) -> Result<T, E>
where
    E: std::fmt::Display,
{
    let started = Instant::now();
    let result = fut.await;
    let elapsed_ms = started.elapsed().as_millis();

    match &result {
        Ok(_) => info!("stage {} completed in {}ms", stage, elapsed_ms),
        Err(e) => warn!("stage {} failed after {}ms: {}", stage, elapsed_ms, e),
    }

    result
}
