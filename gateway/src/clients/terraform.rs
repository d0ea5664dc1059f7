//! Terraform-generation API client

use bytes::Bytes;
use serde::Serialize;

use crate::clients::client::ServiceClient;
use crate::errors::{Service, ServiceError};
use crate::models::DeploymentSuggestion;

/// Generation request body.
#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    suggestion: &'a DeploymentSuggestion,
}

impl ServiceClient {
    /// Produce the generated infrastructure files.
    ///
    /// The response body is a zip archive, returned as raw bytes for the
    /// merge step. Zip validation happens there, not here.
    pub async fn generate_terraform(
        &self,
        suggestion: &DeploymentSuggestion,
    ) -> Result<Bytes, ServiceError> {
        self.post_json_raw(Service::TerraformGeneration, &GenerateRequest { suggestion })
            .await
    }
}
