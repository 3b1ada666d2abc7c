//! Readiness polling and archive download.
//!
//! The source server generates bundles asynchronously. Until the archive is
//! ready the download endpoint answers `404`, which this module treats as
//! "pending" rather than as a failure. The controller polls immediately,
//! then once per `interval` until either a 2xx arrives, another status is
//! returned, the deadline elapses, or the caller cancels.
//!
//! The deadline is checked after a pending poll and before waiting, so one
//! poll may land at or just past the deadline but never more than one.
//!
//! A ready archive is streamed chunk by chunk into a temporary file that is
//! only persisted once the whole body has been written; on any failure or
//! cancellation the partial file is removed when the temp handle drops.

use std::path::{Path, PathBuf};

use futures::StreamExt;
use reqwest::StatusCode;
use tokio::io::AsyncWriteExt;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::config::RetryBudget;
use crate::contract::{path_segment, ByteStream, Transport, TransportRequest};
use crate::create::{BundleId, SUPPORT_BUNDLE_ENDPOINT};
use crate::error::BundleError;

/// A downloaded support bundle on local disk.
///
/// Dropping the value leaves the file in place; [`LocalArchive::delete`]
/// consumes it, so a path can be removed at most once.
#[derive(Debug, PartialEq, Eq)]
pub struct LocalArchive {
    path: PathBuf,
    size: u64,
}

impl LocalArchive {
    /// Wraps an archive that already exists on disk.
    pub fn new(path: PathBuf, size: u64) -> Self {
        Self { path, size }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    /// Hands the path over to the caller without deleting it.
    pub fn into_path(self) -> PathBuf {
        self.path
    }

    pub async fn delete(self) -> Result<(), BundleError> {
        debug!(path = %self.path.display(), "Deleting local support bundle archive");
        tokio::fs::remove_file(&self.path)
            .await
            .map_err(|e| BundleError::storage(&self.path, e))
    }
}

pub fn archive_endpoint(bundle_id: &BundleId) -> Result<String, BundleError> {
    let id = path_segment(bundle_id.as_str())?;
    Ok(format!("{SUPPORT_BUNDLE_ENDPOINT}/{id}/archive"))
}

/// Polls until the bundle is ready, then writes it into `download_dir`.
pub async fn download_bundle<T>(
    cancel: &CancellationToken,
    transport: &T,
    budget: RetryBudget,
    bundle_id: &BundleId,
    download_dir: &Path,
) -> Result<LocalArchive, BundleError>
where
    T: Transport + ?Sized,
{
    info!(
        bundle_id = %bundle_id,
        timeout = ?budget.timeout,
        interval = ?budget.interval,
        "Waiting for support bundle to become ready"
    );
    let endpoint = archive_endpoint(bundle_id)?;
    let started = Instant::now();
    let mut attempt: u32 = 0;

    loop {
        if cancel.is_cancelled() {
            return Err(BundleError::Cancelled);
        }
        attempt += 1;

        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(BundleError::Cancelled),
            response = transport.send(TransportRequest::get(endpoint.as_str())) => response?,
        };
        if cancel.is_cancelled() {
            return Err(BundleError::Cancelled);
        }

        match response.status {
            status if status.is_success() => {
                info!(bundle_id = %bundle_id, attempt, "Support bundle is ready, downloading");
                return write_archive(cancel, bundle_id, response.body, download_dir).await;
            }
            StatusCode::NOT_FOUND => {
                debug!(bundle_id = %bundle_id, attempt, "Support bundle not ready yet");
            }
            status => return Err(BundleError::UnexpectedStatus { status }),
        }

        let elapsed = started.elapsed();
        if elapsed >= budget.timeout {
            return Err(BundleError::Timeout {
                elapsed,
                bundle_id: bundle_id.clone(),
            });
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(BundleError::Cancelled),
            _ = tokio::time::sleep(budget.interval) => {}
        }
    }
}

async fn write_archive(
    cancel: &CancellationToken,
    bundle_id: &BundleId,
    mut body: ByteStream,
    download_dir: &Path,
) -> Result<LocalArchive, BundleError> {
    let temp = tempfile::Builder::new()
        .prefix(&format!("support-bundle-{}-", sanitize(bundle_id.as_str())))
        .suffix(".zip")
        .tempfile_in(download_dir)
        .map_err(|e| BundleError::storage(download_dir, e))?;
    let temp_path = temp.path().to_path_buf();
    let std_file = temp
        .as_file()
        .try_clone()
        .map_err(|e| BundleError::storage(&temp_path, e))?;
    let mut file = tokio::fs::File::from_std(std_file);

    let mut size: u64 = 0;
    loop {
        let chunk = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(BundleError::Cancelled),
            chunk = body.next() => chunk,
        };
        let Some(chunk) = chunk else { break };
        let chunk = chunk?;
        file.write_all(&chunk)
            .await
            .map_err(|e| BundleError::storage(&temp_path, e))?;
        size += chunk.len() as u64;
    }
    file.flush()
        .await
        .map_err(|e| BundleError::storage(&temp_path, e))?;
    drop(file);

    if size == 0 {
        return Err(BundleError::MalformedResponse(format!(
            "support bundle {bundle_id} archive is empty"
        )));
    }

    let (_, path) = temp
        .keep()
        .map_err(|e| BundleError::storage(&temp_path, e.error))?;
    info!(path = %path.display(), size, "Support bundle archive written");
    Ok(LocalArchive { path, size })
}

/// Keeps ids that contain path separators from escaping the download dir.
fn sanitize(id: &str) -> String {
    id.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn archive_endpoint_embeds_id() {
        assert_eq!(
            archive_endpoint(&BundleId::new("abc")).unwrap(),
            "api/system/support/bundle/abc/archive"
        );
    }

    #[test]
    fn archive_endpoint_keeps_hostile_id_in_one_segment() {
        assert_eq!(
            archive_endpoint(&BundleId::new("a/../b?x#y")).unwrap(),
            "api/system/support/bundle/a%2F..%2Fb%3Fx%23y/archive"
        );
        assert!(matches!(
            archive_endpoint(&BundleId::new("..")),
            Err(BundleError::InvalidPathSegment(_))
        ));
    }

    #[test]
    fn sanitize_strips_separators() {
        assert_eq!(sanitize("../a/b"), "___a_b");
        assert_eq!(sanitize("bundle-1_x"), "bundle-1_x");
    }
}
