#![doc = "reqwest-backed implementation of the Transport contract."]
//
//! # HTTP transport
//!
//! [`HttpTransport`] binds one [`ServerConnection`] to a `reqwest::Client`.
//! It attaches credentials and `Content-Type`, streams file payloads from
//! disk, and hands the response body back as a chunk stream. It never looks
//! at status codes; deciding what a status means is the caller's job.

use std::time::Duration;

use async_trait::async_trait;
use futures::TryStreamExt;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Body, Client};
use tokio_util::io::ReaderStream;

use crate::config::{Credentials, ServerConnection};
use crate::contract::{RequestBody, Transport, TransportRequest, TransportResponse};
use crate::error::TransportError;

/// Per-request limit applied by the HTTP client itself.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5 * 60);

const USER_AGENT: &str = concat!("support-bundle/", env!("CARGO_PKG_VERSION"));

pub struct HttpTransport {
    connection: ServerConnection,
    client: Client,
}

impl HttpTransport {
    pub fn new(connection: ServerConnection) -> Result<Self, TransportError> {
        Self::with_timeout(connection, DEFAULT_REQUEST_TIMEOUT)
    }

    pub fn with_timeout(
        connection: ServerConnection,
        request_timeout: Duration,
    ) -> Result<Self, TransportError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(request_timeout)
            .build()
            .map_err(|e| TransportError::Request {
                url: connection.base_url().to_string(),
                message: format!("failed to build http client: {e}"),
            })?;
        tracing::debug!(base_url = connection.base_url(), "Initialized HttpTransport");
        Ok(Self { connection, client })
    }

    pub fn connection(&self) -> &ServerConnection {
        &self.connection
    }

    async fn body_for(&self, body: RequestBody) -> Result<Option<Body>, TransportError> {
        match body {
            RequestBody::Empty => Ok(None),
            RequestBody::Bytes(bytes) => Ok(Some(Body::from(bytes))),
            RequestBody::File(path) => {
                let file = tokio::fs::File::open(&path)
                    .await
                    .map_err(|source| TransportError::Payload {
                        path: path.clone(),
                        source,
                    })?;
                Ok(Some(Body::wrap_stream(ReaderStream::new(file))))
            }
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    fn base_url(&self) -> String {
        self.connection.base_url().to_string()
    }

    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, TransportError> {
        let url = self.connection.endpoint(&request.path);
        tracing::debug!(method = %request.method, url = %url, "Sending request");

        let mut builder = self.client.request(request.method.clone(), &url);
        builder = match &self.connection.credentials {
            Credentials::None => builder,
            Credentials::Basic { user, password } => builder.basic_auth(user, Some(password)),
            Credentials::Bearer { access_token } => builder.bearer_auth(access_token),
        };
        if let Some(content_type) = request.content_type {
            builder = builder.header(CONTENT_TYPE, content_type);
        }
        if let Some(body) = self.body_for(request.body).await? {
            builder = builder.body(body);
        }

        let response = builder.send().await.map_err(|e| {
            tracing::error!(error = ?e, url = %url, "Request failed before a response arrived");
            TransportError::Request {
                url: url.clone(),
                message: e.to_string(),
            }
        })?;

        let status = response.status();
        tracing::debug!(url = %url, %status, "Received response");
        let body = response
            .bytes_stream()
            .map_ok(|chunk| chunk.to_vec())
            .map_err(|e| TransportError::Body(e.to_string()));
        Ok(TransportResponse {
            status,
            body: Box::pin(body),
        })
    }
}
