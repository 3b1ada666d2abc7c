///
/// This module implements the CLI interface for support-bundle: command parsing,
/// argument validation, the async entrypoint and user-visible output.
///
/// All pipeline logic (creation, polling, download, upload) lives in the
/// [`support-bundle-core`] crate. Flags are read exactly once here and turned
/// into an immutable [`PipelineConfig`] that is passed down.
///
/// ## How To Use
/// - For command-line users: `support-bundle sb <CASE> --help`.
/// - For programmatic/integration use: call [`run`] with a constructed [`Cli`].
///
/// [`support-bundle-core`]: ../../support-bundle-core/
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use support_bundle_core::clock::system_clock;
use support_bundle_core::config::{
    PipelineConfig, RetryBudget, DEFAULT_DOWNLOAD_TIMEOUT, DEFAULT_RETRY_INTERVAL,
    DEFAULT_TARGET_REPO,
};
use support_bundle_core::contract::{path_segment, OptionsProvider};
use support_bundle_core::options::{DefaultOptions, FixedOptions};
use support_bundle_core::pipeline::{resolve_connections, run_pipeline};
use support_bundle_core::transport::HttpTransport;
use tokio_util::sync::CancellationToken;

use crate::load_config::load_config;
use crate::prompt::PromptOptions;

/// CLI for support-bundle: create, download and forward repository support bundles.
#[derive(Parser)]
#[clap(
    name = "support-bundle",
    version,
    about = "Create a support bundle on a repository server and upload it for a support case"
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a support bundle, download it and upload it to the support logs service
    #[clap(alias = "sb")]
    SupportBundle(SupportBundleArgs),
}

#[derive(Args, Debug, Clone)]
pub struct SupportBundleArgs {
    /// Support case number.
    pub case: String,

    /// Server ID from the servers file. If not provided the default server is used.
    #[clap(long)]
    pub server_id: Option<String>,

    /// Server ID to upload the generated bundle to. If not provided the support logs service is used.
    #[clap(long)]
    pub target_server_id: Option<String>,

    /// The timeout for download.
    #[clap(long, default_value = "10m")]
    pub download_timeout: String,

    /// The duration to wait between retries.
    #[clap(long, default_value = "5s")]
    pub retry_interval: String,

    /// Ask for support bundle options instead of using the server defaults.
    #[clap(long)]
    pub prompt_options: bool,

    /// Delete the support bundle local temp file after upload.
    #[clap(long, default_value_t = true, action = ArgAction::Set)]
    pub cleanup: bool,

    /// The target repository key where the support bundle will be uploaded to.
    #[clap(long, default_value = DEFAULT_TARGET_REPO)]
    pub target_repo: String,

    /// Directory for the downloaded archive. Defaults to the system temp dir.
    #[clap(long)]
    pub download_dir: Option<PathBuf>,

    /// Path to the YAML servers file.
    #[clap(long, env = "SUPPORT_BUNDLE_SERVERS", default_value = "servers.yaml")]
    pub servers: PathBuf,
}

impl SupportBundleArgs {
    /// Validates the arguments and builds the run's configuration.
    pub fn pipeline_config(&self) -> Result<PipelineConfig> {
        let mut conf = PipelineConfig::new(self.case.as_str());
        if conf.case_number.is_empty() {
            bail!("a support case number is required");
        }
        if let Err(e) = path_segment(&conf.case_number) {
            bail!("invalid support case number: {e}");
        }
        conf.target_repo = self.target_repo.clone();
        conf.cleanup = self.cleanup;
        conf.download_dir = self.download_dir.clone();
        conf.retry = RetryBudget {
            timeout: duration_or_default(&self.download_timeout, DEFAULT_DOWNLOAD_TIMEOUT),
            interval: duration_or_default(&self.retry_interval, DEFAULT_RETRY_INTERVAL),
        };
        Ok(conf)
    }
}

/// Parses durations such as `300ns`, `20us`, `500ms`, `5s`, `10m`, `1h30m`.
pub fn parse_duration(value: &str) -> Option<Duration> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    let mut total = Duration::ZERO;
    let mut rest = value;
    while !rest.is_empty() {
        let digits = rest
            .find(|c: char| !c.is_ascii_digit() && c != '.')
            .unwrap_or(rest.len());
        if digits == 0 {
            return None;
        }
        let amount: f64 = rest[..digits].parse().ok()?;
        rest = &rest[digits..];
        let unit_len = rest
            .find(|c: char| c.is_ascii_digit())
            .unwrap_or(rest.len());
        let nanos_per_unit: f64 = match &rest[..unit_len] {
            "ns" => 1.0,
            "us" | "\u{b5}s" | "\u{3bc}s" => 1e3,
            "ms" => 1e6,
            "s" => 1e9,
            "m" => 60e9,
            "h" => 3600e9,
            _ => return None,
        };
        rest = &rest[unit_len..];
        let nanos = (amount * nanos_per_unit).round();
        if !nanos.is_finite() || nanos > u64::MAX as f64 {
            return None;
        }
        total = total.checked_add(Duration::from_nanos(nanos as u64))?;
    }
    Some(total)
}

fn duration_or_default(value: &str, default: Duration) -> Duration {
    if value.trim().is_empty() {
        return default;
    }
    match parse_duration(value) {
        Some(duration) => duration,
        None => {
            tracing::warn!(value, ?default, "Error parsing duration, using default");
            default
        }
    }
}

/// Extracted async CLI logic entrypoint for integration tests and main()
pub async fn run(cli: Cli, cancel: CancellationToken) -> Result<()> {
    // Emit a top-level 'trace_initialised' event at the very start
    tracing::info!("trace_initialised");

    match cli.command {
        Commands::SupportBundle(args) => {
            let conf = args.pipeline_config()?;
            conf.trace_loaded();
            println!("Case number is {}", conf.case_number);

            let resolver = load_config(&args.servers)?;
            let connections = resolve_connections(
                &resolver,
                args.server_id.as_deref(),
                args.target_server_id.as_deref(),
            )?;
            let source = HttpTransport::new(connections.source)?;
            let destination = HttpTransport::new(connections.destination)?;

            // Stdin is read on a blocking thread before any request is made.
            let options: Box<dyn OptionsProvider> = if args.prompt_options {
                let parameters =
                    tokio::task::spawn_blocking(|| PromptOptions::stdio().parameters()).await?;
                Box::new(FixedOptions::new(parameters))
            } else {
                Box::new(DefaultOptions)
            };

            tracing::info!(command = "support-bundle", "Starting support bundle pipeline");
            match run_pipeline(
                &cancel,
                &conf,
                &source,
                &destination,
                &system_clock(),
                options.as_ref(),
            )
            .await
            {
                Ok(report) => {
                    tracing::info!(command = "support-bundle", ?report, "Pipeline complete");
                    println!("Support bundle uploaded to {}", report.upload.location);
                    if let Some(kept) = report.retained_archive {
                        println!("Local archive kept at {}", kept.display());
                    }
                    Ok(())
                }
                Err(e) => {
                    eprintln!("[ERROR] {e}");
                    Err(e.into())
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(extra: &[&str]) -> SupportBundleArgs {
        let mut argv = vec!["support-bundle", "sb", "12345"];
        argv.extend_from_slice(extra);
        match Cli::try_parse_from(argv).unwrap().command {
            Commands::SupportBundle(args) => args,
        }
    }

    #[test]
    fn parses_unit_suffixed_durations() {
        assert_eq!(parse_duration("5s"), Some(Duration::from_secs(5)));
        assert_eq!(parse_duration("10m"), Some(Duration::from_secs(600)));
        assert_eq!(parse_duration("250ms"), Some(Duration::from_millis(250)));
        assert_eq!(parse_duration("1h30m"), Some(Duration::from_secs(5400)));
        assert_eq!(parse_duration("1.5s"), Some(Duration::from_millis(1500)));
        assert_eq!(parse_duration("20us"), Some(Duration::from_micros(20)));
        assert_eq!(parse_duration("20\u{b5}s"), Some(Duration::from_micros(20)));
        assert_eq!(parse_duration("20\u{3bc}s"), Some(Duration::from_micros(20)));
        assert_eq!(parse_duration("300ns"), Some(Duration::from_nanos(300)));
        assert_eq!(parse_duration("1s500ms"), Some(Duration::from_millis(1500)));
        assert_eq!(parse_duration("ten"), None);
        assert_eq!(parse_duration("10"), None);
        assert_eq!(parse_duration("5d"), None);
    }

    #[test]
    fn defaults_match_documented_values() {
        let conf = args(&[]).pipeline_config().unwrap();
        assert_eq!(conf.case_number, "12345");
        assert_eq!(conf.retry.timeout, Duration::from_secs(600));
        assert_eq!(conf.retry.interval, Duration::from_secs(5));
        assert!(conf.cleanup);
        assert_eq!(conf.target_repo, "logs");
    }

    #[test]
    fn flags_override_defaults() {
        let conf = args(&[
            "--download-timeout",
            "30s",
            "--retry-interval",
            "100ms",
            "--cleanup",
            "false",
            "--target-repo",
            "support",
        ])
        .pipeline_config()
        .unwrap();
        assert_eq!(conf.retry.timeout, Duration::from_secs(30));
        assert_eq!(conf.retry.interval, Duration::from_millis(100));
        assert!(!conf.cleanup);
        assert_eq!(conf.target_repo, "support");
    }

    #[test]
    fn invalid_duration_falls_back_to_default() {
        let conf = args(&["--download-timeout", "soon"]).pipeline_config().unwrap();
        assert_eq!(conf.retry.timeout, DEFAULT_DOWNLOAD_TIMEOUT);
    }

    #[test]
    fn dot_case_number_is_rejected() {
        let dots = SupportBundleArgs {
            case: "..".into(),
            ..args(&[])
        };
        let err = dots.pipeline_config().unwrap_err();
        assert!(err.to_string().contains("invalid support case number"));
    }

    #[test]
    fn case_number_with_separators_is_accepted() {
        let conf = SupportBundleArgs {
            case: "12/34".into(),
            ..args(&[])
        };
        assert_eq!(conf.pipeline_config().unwrap().case_number, "12/34");
    }

    #[test]
    fn blank_case_number_is_rejected() {
        let blank = SupportBundleArgs {
            case: "   ".into(),
            ..args(&[])
        };
        assert!(blank.pipeline_config().is_err());
    }
}
