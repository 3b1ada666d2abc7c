//! Error types shared by every pipeline phase.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use reqwest::StatusCode;

use crate::create::BundleId;

/// A request never reliably reached the remote service, or its answer could
/// not be read.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("request to {url} failed: {message}")]
    Request { url: String, message: String },
    #[error("failed to read response body: {0}")]
    Body(String),
    #[error("failed to open request payload {}: {source}", path.display())]
    Payload {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Failure of a single pipeline phase.
#[derive(Debug, thiserror::Error)]
pub enum BundleError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("http request failed with: {status}")]
    UnexpectedStatus { status: StatusCode },
    #[error("malformed response: {0}")]
    MalformedResponse(String),
    #[error("support bundle {bundle_id} was not ready after {elapsed:?}")]
    Timeout {
        elapsed: Duration,
        bundle_id: BundleId,
    },
    #[error("operation cancelled")]
    Cancelled,
    #[error("{0:?} cannot be used as a URL path segment")]
    InvalidPathSegment(String),
    #[error("storage failure at {}: {source}", path.display())]
    Storage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl BundleError {
    pub(crate) fn storage(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        BundleError::Storage {
            path: path.into(),
            source,
        }
    }
}

/// Failure to turn a server identifier into a connection.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("server '{0}' is not configured")]
    UnknownServer(String),
    #[error("no server id given and no default server configured")]
    NoDefault,
    #[error("invalid server configuration: {0}")]
    Invalid(String),
}

/// Pipeline stage that produced an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Resolve,
    Create,
    Download,
    Upload,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Resolve => "resolve",
            Phase::Create => "create",
            Phase::Download => "download",
            Phase::Upload => "upload",
        };
        f.write_str(name)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PhaseFailure {
    #[error(transparent)]
    Bundle(#[from] BundleError),
    #[error(transparent)]
    Resolve(#[from] ResolveError),
}

/// The first error a pipeline run hit, tagged with its phase.
#[derive(Debug, thiserror::Error)]
#[error("{phase} phase failed: {source}")]
pub struct PipelineError {
    pub phase: Phase,
    #[source]
    pub source: PhaseFailure,
}

impl PipelineError {
    pub fn new(phase: Phase, source: impl Into<PhaseFailure>) -> Self {
        Self {
            phase,
            source: source.into(),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self.source, PhaseFailure::Bundle(BundleError::Cancelled))
    }

    /// The underlying bundle error, if this was not a resolution failure.
    pub fn bundle_error(&self) -> Option<&BundleError> {
        match &self.source {
            PhaseFailure::Bundle(e) => Some(e),
            PhaseFailure::Resolve(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unexpected_status_reads_like_http_failure() {
        let err = BundleError::UnexpectedStatus {
            status: StatusCode::NOT_FOUND,
        };
        assert_eq!(err.to_string(), "http request failed with: 404 Not Found");
    }

    #[test]
    fn pipeline_error_names_phase_and_cause() {
        let err = PipelineError::new(Phase::Download, BundleError::Cancelled);
        assert_eq!(err.to_string(), "download phase failed: operation cancelled");
        assert!(err.is_cancelled());
    }
}
