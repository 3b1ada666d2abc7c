//! # contract: seams between the pipeline and the outside world
//!
//! - [`Transport`] moves requests to one repository server.
//! - [`ConnectionResolver`] turns server identifiers into [`ServerConnection`]s.
//! - [`OptionsProvider`] supplies creation parameters.
//!
//! Every trait is annotated for `mockall` so tests can script the remote side.

use std::path::PathBuf;

use async_trait::async_trait;
use futures::stream::BoxStream;
#[allow(unused_imports)]
use mockall::{automock, predicate::*};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use reqwest::{Method, StatusCode};

use crate::config::ServerConnection;
use crate::error::{BundleError, ResolveError, TransportError};
use crate::options::BundleParameters;

pub const CONTENT_TYPE_JSON: &str = "application/json";
pub const CONTENT_TYPE_BINARY: &str = "application/octet-stream";

/// Unreserved characters stay literal; everything else is percent-encoded.
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Encodes `value` so that it occupies exactly one segment of a request path.
///
/// Dot-only values are refused: URL parsers fold them (encoded or not) into
/// the parent directory.
pub fn path_segment(value: &str) -> Result<String, BundleError> {
    if value.is_empty() || value.chars().all(|c| c == '.') {
        return Err(BundleError::InvalidPathSegment(value.to_string()));
    }
    Ok(utf8_percent_encode(value, PATH_SEGMENT).to_string())
}

/// Body sent with a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestBody {
    Empty,
    Bytes(Vec<u8>),
    /// Streamed from disk by the transport.
    File(PathBuf),
}

#[derive(Debug, Clone)]
pub struct TransportRequest {
    pub method: Method,
    /// Path relative to the connection's base URL.
    pub path: String,
    pub content_type: Option<&'static str>,
    pub body: RequestBody,
}

impl TransportRequest {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::GET,
            path: path.into(),
            content_type: None,
            body: RequestBody::Empty,
        }
    }

    pub fn post_json(path: impl Into<String>, payload: Vec<u8>) -> Self {
        Self {
            method: Method::POST,
            path: path.into(),
            content_type: Some(CONTENT_TYPE_JSON),
            body: RequestBody::Bytes(payload),
        }
    }

    pub fn put_file(path: impl Into<String>, file: PathBuf, content_type: &'static str) -> Self {
        Self {
            method: Method::PUT,
            path: path.into(),
            content_type: Some(content_type),
            body: RequestBody::File(file),
        }
    }
}

/// Chunked response body.
pub type ByteStream = BoxStream<'static, Result<Vec<u8>, TransportError>>;

pub struct TransportResponse {
    pub status: StatusCode,
    pub body: ByteStream,
}

impl TransportResponse {
    /// A response whose whole body is already in memory.
    pub fn from_bytes(status: StatusCode, body: impl Into<Vec<u8>>) -> Self {
        let body: Vec<u8> = body.into();
        let chunks = if body.is_empty() { vec![] } else { vec![Ok(body)] };
        Self {
            status,
            body: Box::pin(futures::stream::iter(chunks)),
        }
    }

    /// Collects the body into memory. Only for small control responses.
    pub async fn into_bytes(self) -> Result<Vec<u8>, TransportError> {
        use futures::TryStreamExt;
        self.body
            .try_fold(Vec::new(), |mut acc, chunk| async move {
                acc.extend_from_slice(&chunk);
                Ok(acc)
            })
            .await
    }
}

impl std::fmt::Debug for TransportResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportResponse")
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

/// Issues requests against a single repository server.
///
/// A non-2xx answer is a successful transport call; only failures to reach
/// the server or to read its answer are errors.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait Transport: Send + Sync {
    /// Normalized base URL of the server this transport talks to.
    fn base_url(&self) -> String;

    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, TransportError>;
}

/// Resolves a server identifier, or the configured default when `None`.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
pub trait ConnectionResolver: Send + Sync {
    fn resolve<'a>(&self, server_id: Option<&'a str>) -> Result<ServerConnection, ResolveError>;
}

/// Supplies the `parameters` of a creation request.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
pub trait OptionsProvider: Send + Sync {
    fn parameters(&self) -> BundleParameters;
}
