//! High-level pipeline: orchestrates create → download → upload for one support case.
//!
//! This module sequences the three phases of a run against a source and a
//! destination server:
//!   - Creates a support bundle on the source server
//!   - Polls the source until the archive is ready and downloads it
//!   - Uploads the archive to the destination repository
//!
//! # Responsibilities
//! - Fail-fast orchestration: the first failing phase ends the run and is
//!   returned tagged with its [`Phase`]
//! - Ownership of the local archive between download and upload, including
//!   cleanup when configured; cleanup problems are logged, never returned
//! - Cancellation: every phase is raced against the token, and a cancelled
//!   upload still cleans up the archive
//! - Deciding which connection is the source and which the destination
//!   ([`resolve_connections`]); the phases themselves only see a transport
//!
//! # Navigation
//! - Main entrypoint: [`run_pipeline`]
//! - Supporting types: [`PipelineReport`], [`Connections`]

use std::path::PathBuf;

use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::clock::Clock;
use crate::config::{PipelineConfig, ServerConnection};
use crate::contract::{ConnectionResolver, OptionsProvider, Transport};
use crate::create::{create_bundle, BundleId};
use crate::download::download_bundle;
use crate::error::{BundleError, Phase, PipelineError};
use crate::upload::{upload_bundle, UploadConfirmation};

/// What a successful run produced.
#[derive(Debug)]
pub struct PipelineReport {
    pub bundle_id: BundleId,
    pub upload: UploadConfirmation,
    /// Path of the local archive when it was kept (cleanup disabled or failed).
    pub retained_archive: Option<PathBuf>,
}

/// The two servers taking part in a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Connections {
    pub source: ServerConnection,
    pub destination: ServerConnection,
}

/// Resolves the source and destination servers for a run.
///
/// The source is `source_id` or the resolver's default. Without a
/// `target_id` the destination is the public support logs service; it never
/// falls back to the source.
pub fn resolve_connections(
    resolver: &dyn ConnectionResolver,
    source_id: Option<&str>,
    target_id: Option<&str>,
) -> Result<Connections, PipelineError> {
    let source = resolver
        .resolve(source_id)
        .map_err(|e| PipelineError::new(Phase::Resolve, e))?;
    let destination = match target_id {
        Some(id) => resolver
            .resolve(Some(id))
            .map_err(|e| PipelineError::new(Phase::Resolve, e))?,
        None => ServerConnection::support_logs(),
    };
    info!(
        source = source.base_url(),
        destination = destination.base_url(),
        "Resolved pipeline servers"
    );
    Ok(Connections {
        source,
        destination,
    })
}

fn log_failure(phase: Phase, err: &BundleError) {
    if matches!(err, BundleError::Cancelled) {
        info!(%phase, "[PIPELINE] Cancelled");
    } else {
        error!(%phase, error = %err, "[PIPELINE][ERROR] Phase failed");
    }
}

/// Runs create → download → upload for `config.case_number`.
pub async fn run_pipeline<S, D>(
    cancel: &CancellationToken,
    config: &PipelineConfig,
    source: &S,
    destination: &D,
    clock: &Clock,
    options: &dyn OptionsProvider,
) -> Result<PipelineReport, PipelineError>
where
    S: Transport + ?Sized,
    D: Transport + ?Sized,
{
    info!(case_number = %config.case_number, "[PIPELINE] Starting support bundle pipeline");

    // --- Step 1: Create ---
    let created = tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(BundleError::Cancelled),
        created = create_bundle(source, &config.case_number, clock, options) => created,
    };
    let bundle_id = created.map_err(|e| {
        log_failure(Phase::Create, &e);
        PipelineError::new(Phase::Create, e)
    })?;

    // --- Step 2: Download ---
    let archive = download_bundle(
        cancel,
        source,
        config.retry,
        &bundle_id,
        &config.download_dir(),
    )
    .await
    .map_err(|e| {
        log_failure(Phase::Download, &e);
        PipelineError::new(Phase::Download, e)
    })?;

    // --- Step 3: Upload ---
    // A token cancelled while the download finished wins over starting the upload.
    let uploaded = tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(BundleError::Cancelled),
        uploaded = upload_bundle(
            destination,
            &archive,
            &config.case_number,
            &config.target_repo,
            clock,
        ) => uploaded,
    };

    let retained_archive = if config.cleanup {
        let path = archive.path().to_path_buf();
        match archive.delete().await {
            Ok(()) => None,
            Err(e) => {
                warn!(error = %e, "[PIPELINE] Could not delete the local support bundle archive");
                Some(path)
            }
        }
    } else {
        info!(path = %archive.path().display(), "[PIPELINE] Keeping local support bundle archive");
        Some(archive.into_path())
    };

    let upload = uploaded.map_err(|e| {
        log_failure(Phase::Upload, &e);
        PipelineError::new(Phase::Upload, e)
    })?;

    info!(
        bundle_id = %bundle_id,
        location = %upload.location,
        "[PIPELINE] Support bundle pipeline complete"
    );
    Ok(PipelineReport {
        bundle_id,
        upload,
        retained_archive,
    })
}
