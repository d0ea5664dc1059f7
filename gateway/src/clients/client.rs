//! HTTP client implementation
//!
//! One reqwest client is shared by all four backend adapters. Every failure
//! is classified here, at the boundary, into the `ServiceError` taxonomy: a
//! non-2xx status, a transport fault, a timeout, or a body the gateway cannot
//! decode. Callers never see a raw `reqwest::Error`.

use std::time::Duration;

use bytes::Bytes;
use reqwest::{header, Client, Response};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, error};

use crate::config::Endpoints;
use crate::errors::{Service, ServiceError};

/// HTTP client for backend communication
#[derive(Debug, Clone)]
pub struct ServiceClient {
    client: Client,
    endpoints: Endpoints,
    timeout: Duration,
}

impl ServiceClient {
    /// Create a new client with one timeout applied to every call.
    pub fn new(endpoints: Endpoints, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            endpoints,
            timeout,
        })
    }

    /// POST a JSON body and decode a JSON response.
    pub(crate) async fn post_json<T: DeserializeOwned, B: Serialize>(
        &self,
        service: Service,
        body: &B,
    ) -> Result<T, ServiceError> {
        let url = self.endpoints.url(service).clone();
        debug!("POST {}", url);

        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| self.classify(service, e))?;

        self.decode_json(service, response).await
    }

    /// POST a JSON body and return the raw response bytes.
    pub(crate) async fn post_json_raw<B: Serialize>(
        &self,
        service: Service,
        body: &B,
    ) -> Result<Bytes, ServiceError> {
        let url = self.endpoints.url(service).clone();
        debug!("POST {}", url);

        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| self.classify(service, e))?;

        let response = self.check_status(service, response).await?;
        response.bytes().await.map_err(|e| self.classify(service, e))
    }

    /// POST a zip archive as the raw request body and decode a JSON response.
    pub(crate) async fn post_zip<T: DeserializeOwned>(
        &self,
        service: Service,
        filename: &str,
        archive: Bytes,
    ) -> Result<T, ServiceError> {
        let url = self.endpoints.url(service).clone();
        debug!("POST {} ({} bytes)", url, archive.len());

        let response = self
            .client
            .post(url)
            .header(header::CONTENT_TYPE, "application/zip")
            .header("X-Filename", filename)
            .body(archive)
            .send()
            .await
            .map_err(|e| self.classify(service, e))?;

        self.decode_json(service, response).await
    }

    async fn decode_json<T: DeserializeOwned>(
        &self,
        service: Service,
        response: Response,
    ) -> Result<T, ServiceError> {
        let response = self.check_status(service, response).await?;

        response.json().await.map_err(|e| {
            if e.is_decode() {
                ServiceError::MalformedResponse {
                    service,
                    message: e.to_string(),
                }
            } else {
                self.classify(service, e)
            }
        })
    }

    /// Reject non-2xx responses, logging whatever body the service sent.
    async fn check_status(
        &self,
        service: Service,
        response: Response,
    ) -> Result<Response, ServiceError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("{} request failed: {} - {}", service, status, body);
            return Err(ServiceError::Status {
                service,
                status: status.as_u16(),
            });
        }
        Ok(response)
    }

    fn classify(&self, service: Service, error: reqwest::Error) -> ServiceError {
        if error.is_timeout() {
            ServiceError::Timeout {
                service,
                timeout: self.timeout,
            }
        } else {
            ServiceError::Transport {
                service,
                message: error.to_string(),
            }
        }
    }
}
