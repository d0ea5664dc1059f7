//! Deployment-suggestion API client

use serde::Serialize;

use crate::clients::client::ServiceClient;
use crate::errors::{Service, ServiceError};
use crate::models::{CodebaseContext, DeploymentSuggestion, LanguageContext};

/// Suggestion request body: both stage-one contexts, side by side.
#[derive(Debug, Serialize)]
struct SuggestRequest<'a> {
    language_context: &'a LanguageContext,
    codebase_context: &'a CodebaseContext,
}

impl ServiceClient {
    /// Combine both contexts into a deployment plan.
    pub async fn suggest_deployment(
        &self,
        language_context: &LanguageContext,
        codebase_context: &CodebaseContext,
    ) -> Result<DeploymentSuggestion, ServiceError> {
        self.post_json(
            Service::DeploymentSuggestion,
            &SuggestRequest {
                language_context,
                codebase_context,
            },
        )
        .await
    }
}
