//! Sandbox synchronization command.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::broadcast;
use tracing::warn;

use airlift::progress::SyncEvent;
use airlift::sync::{
    HttpFetcher, Sandbox, SessionState, SyncConfig, SyncOrchestrator, SyncRequest,
};

use crate::error::CliError;

use super::common::{compute_plan, load_config, RuleArgs};

/// Arguments for `airlift sync`.
#[derive(Debug, Args)]
pub struct SyncArgs {
    /// Wire manifest file
    #[arg(long, value_name = "FILE")]
    manifest: PathBuf,

    /// Manifest verification key (falls back to keys.public_key)
    #[arg(long, value_name = "FILE")]
    public_key: Option<PathBuf>,

    /// Sandbox root (falls back to the configured scope root)
    #[arg(long, value_name = "DIR")]
    root: Option<PathBuf>,

    /// Base URL content paths are fetched from (falls back to
    /// sync.base_url)
    #[arg(long, value_name = "URL")]
    base_url: Option<String>,

    /// Bearer token for the download channel
    #[arg(long, value_name = "TOKEN")]
    token: Option<String>,

    /// Maximum concurrent downloads (falls back to sync.max_concurrent)
    #[arg(long, value_name = "N")]
    max_concurrent: Option<usize>,

    #[command(flatten)]
    rules: RuleArgs,
}

/// Verify, diff, and execute the plan against the sandbox root.
pub fn run(args: SyncArgs) -> Result<(), CliError> {
    let config = load_config()?;
    let context = compute_plan(
        &args.manifest,
        args.public_key,
        args.root.clone(),
        &args.rules,
        &config,
    )?;

    if context.plan.is_empty() {
        println!("Already up to date.");
        return Ok(());
    }

    let base_url = args
        .base_url
        .or_else(|| {
            if config.sync.base_url.is_empty() {
                None
            } else {
                Some(config.sync.base_url.clone())
            }
        })
        .ok_or_else(|| {
            CliError::MissingSetting("--base-url flag or sync.base_url in config".to_string())
        })?;
    let max_concurrent = args.max_concurrent.unwrap_or(config.sync.max_concurrent);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| CliError::Runtime(e.to_string()))?;

    let summary = runtime.block_on(async move {
        let orchestrator = SyncOrchestrator::with_config(
            Arc::new(HttpFetcher::new()),
            SyncConfig::default().with_max_concurrent(max_concurrent),
        );

        // Ctrl-C cancels the session cooperatively; completed files stay.
        let registry = Arc::clone(orchestrator.registry());
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupt received, cancelling sync");
                registry.cancel_all();
            }
        });

        let events = orchestrator.subscribe();
        let reporter = tokio::spawn(report_progress(events));

        let sandbox = Sandbox::new(&context.root).map_err(|e| CliError::Sync(e.to_string()))?;
        let summary = orchestrator
            .run(SyncRequest {
                plan: context.plan,
                sandbox,
                base_url,
                auth_token: args.token,
                hash_policy: context.policy,
            })
            .await;

        reporter.await.ok();
        Ok::<_, CliError>(summary)
    })?;

    println!();
    println!(
        "{} files synchronized, {} failed, {} deleted, {} bytes downloaded",
        summary.completed, summary.failed, summary.deleted, summary.bytes_downloaded
    );

    match summary.state {
        SessionState::Completed if summary.failed == 0 => Ok(()),
        SessionState::Completed => Err(CliError::Sync(format!(
            "{} files failed; re-run to retry",
            summary.failed
        ))),
        SessionState::Cancelled => Err(CliError::Sync("sync cancelled".to_string())),
        state => Err(CliError::Sync(format!("session ended in state {state:?}"))),
    }
}

/// Drive an indicatif bar from the session's event stream.
async fn report_progress(mut events: broadcast::Receiver<SyncEvent>) {
    let mut bar: Option<ProgressBar> = None;

    loop {
        match events.recv().await {
            Ok(SyncEvent::Queued { files, .. }) => {
                let progress = ProgressBar::new(files as u64);
                if let Ok(style) = ProgressStyle::with_template(
                    "{bar:30.cyan/blue} {pos}/{len} files {msg}",
                ) {
                    progress.set_style(style);
                }
                bar = Some(progress);
            }
            Ok(SyncEvent::DownloadStarted { file }) => {
                if let Some(bar) = &bar {
                    bar.set_message(file.to_string());
                }
            }
            Ok(SyncEvent::FileVerified { .. }) => {
                if let Some(bar) = &bar {
                    bar.inc(1);
                }
            }
            Ok(SyncEvent::FileFailed { file, reason }) => {
                if let Some(bar) = &bar {
                    bar.inc(1);
                    bar.println(format!("failed: {file}: {reason}"));
                }
            }
            Ok(event) if event.is_terminal() => {
                if let Some(bar) = &bar {
                    bar.finish_with_message("done");
                }
                break;
            }
            Ok(_) => {}
            // Dropped progress events are expected under load.
            Err(broadcast::error::RecvError::Lagged(_)) => {}
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}
