//! Upload of a downloaded archive to the destination repository.

use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use tracing::{debug, info};

use crate::clock::Clock;
use crate::contract::{path_segment, Transport, TransportRequest, CONTENT_TYPE_BINARY};
use crate::download::LocalArchive;
use crate::error::BundleError;

/// Namespace inside the target repository that holds uploaded bundles.
pub const SUPPORT_BUNDLES_NAMESPACE: &str = "support-bundles";

/// Where an archive ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadConfirmation {
    /// Full URL of the uploaded file.
    pub location: String,
    pub status: StatusCode,
}

/// Repository-relative destination for a bundle.
///
/// `<repo>/support-bundles/<case>/<YYYY-MM-DD>/<YYYYMMDD-HHMMSS>.zip`
///
/// The case number is encoded as a single segment, so it can never leave the
/// `support-bundles` namespace.
pub fn upload_path(
    target_repo: &str,
    case_number: &str,
    at: DateTime<Utc>,
) -> Result<String, BundleError> {
    Ok(format!(
        "{}/{}/{}/{}/{}.zip",
        target_repo.trim_matches('/'),
        SUPPORT_BUNDLES_NAMESPACE,
        path_segment(case_number)?,
        at.format("%Y-%m-%d"),
        at.format("%Y%m%d-%H%M%S"),
    ))
}

/// Streams `archive` to the destination. Not retried.
pub async fn upload_bundle<T>(
    transport: &T,
    archive: &LocalArchive,
    case_number: &str,
    target_repo: &str,
    now: &Clock,
) -> Result<UploadConfirmation, BundleError>
where
    T: Transport + ?Sized,
{
    let path = upload_path(target_repo, case_number, now())?;
    let location = format!("{}{}", transport.base_url(), path);
    info!(
        file = %archive.path().display(),
        size = archive.size(),
        destination = %location,
        "Uploading support bundle"
    );

    let response = transport
        .send(TransportRequest::put_file(
            path,
            archive.path().to_path_buf(),
            CONTENT_TYPE_BINARY,
        ))
        .await?;
    let status = response.status;
    if !status.is_success() {
        let body = response.into_bytes().await.unwrap_or_default();
        debug!(%status, body = %String::from_utf8_lossy(&body), "Upload rejected");
        return Err(BundleError::UnexpectedStatus { status });
    }

    info!(%status, location = %location, "Support bundle uploaded");
    Ok(UploadConfirmation { location, status })
}
