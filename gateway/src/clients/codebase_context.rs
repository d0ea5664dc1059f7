//! Codebase-context API client

use bytes::Bytes;

use crate::clients::client::ServiceClient;
use crate::errors::{Service, ServiceError};
use crate::models::CodebaseContext;

impl ServiceClient {
    /// Extract structured facts from the uploaded archive.
    ///
    /// The archive travels as a raw `application/zip` body with the original
    /// filename in `X-Filename`; that is the extraction service's contract.
    pub async fn extract_codebase_context(
        &self,
        filename: &str,
        archive: Bytes,
    ) -> Result<CodebaseContext, ServiceError> {
        self.post_zip(Service::CodebaseContext, filename, archive)
            .await
    }
}
