#![doc = "support-bundle-core: pipeline logic for support-bundle."]

//! This crate contains the transfer pipeline for repository support bundles:
//! creating a bundle on a source server, polling until it is ready, downloading
//! the archive and uploading it to a destination repository.
//!
//! # Usage
//! The CLI crate builds a [`config::PipelineConfig`] once, resolves the two
//! [`config::ServerConnection`]s and hands everything to
//! [`pipeline::run_pipeline`].

pub mod clock;
pub mod config;
pub mod contract;
pub mod create;
pub mod download;
pub mod error;
pub mod options;
pub mod pipeline;
pub mod transport;
pub mod upload;
