//! Language-context API client

use serde::Serialize;

use crate::clients::client::ServiceClient;
use crate::errors::{Service, ServiceError};
use crate::models::LanguageContext;

/// Extraction request body.
///
/// A missing instruction is omitted from the body entirely; the service
/// treats an absent key and an absent instruction the same way.
#[derive(Debug, Serialize)]
struct ExtractRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    instruction: Option<&'a str>,
}

impl ServiceClient {
    /// Turn the free-form deployment instruction into structured intent.
    ///
    /// The instruction is forwarded verbatim, never validated or rewritten.
    pub async fn extract_language_context(
        &self,
        instruction: Option<&str>,
    ) -> Result<LanguageContext, ServiceError> {
        self.post_json(Service::LanguageContext, &ExtractRequest { instruction })
            .await
    }
}
