//! Plan inspection command (dry run).

use std::path::PathBuf;

use clap::Args;

use crate::error::CliError;

use super::common::{compute_plan, load_config, RuleArgs};

/// How many entries of each kind are listed before truncating.
const LIST_LIMIT: usize = 20;

/// Arguments for `airlift diff`.
#[derive(Debug, Args)]
pub struct DiffArgs {
    /// Wire manifest file
    #[arg(long, value_name = "FILE")]
    manifest: PathBuf,

    /// Manifest verification key (falls back to keys.public_key)
    #[arg(long, value_name = "FILE")]
    public_key: Option<PathBuf>,

    /// Sandbox root (falls back to the configured scope root)
    #[arg(long, value_name = "DIR")]
    root: Option<PathBuf>,

    #[command(flatten)]
    rules: RuleArgs,
}

/// Verify, hash, diff, and print the plan without touching the sandbox.
pub fn run(args: DiffArgs) -> Result<(), CliError> {
    let config = load_config()?;
    let context = compute_plan(
        &args.manifest,
        args.public_key,
        args.root,
        &args.rules,
        &config,
    )?;

    println!(
        "Manifest: {} ({} files, generated {})",
        context.manifest.content_scope,
        context.manifest.root.file_count(),
        context.manifest.generated_at
    );
    println!("Sandbox:  {}", context.root.display());
    println!();

    if context.plan.is_empty() {
        println!("Already up to date.");
        return Ok(());
    }

    let plan = &context.plan;
    println!(
        "Plan: {} to fetch ({} bytes), {} to verify, {} to delete",
        plan.fetch_count(),
        plan.fetch_bytes(),
        plan.to_verify.len(),
        plan.to_delete.len()
    );

    list("fetch", plan.to_fetch.iter().map(|e| e.relative_path.as_str()));
    list("verify", plan.to_verify.iter().map(|e| e.relative_path.as_str()));
    list("delete", plan.to_delete.iter().map(|p| p.as_str()));

    Ok(())
}

fn list<'a>(label: &str, entries: impl ExactSizeIterator<Item = &'a str>) {
    let total = entries.len();
    if total == 0 {
        return;
    }
    println!();
    println!("To {label}:");
    for entry in entries.take(LIST_LIMIT) {
        println!("  {entry}");
    }
    if total > LIST_LIMIT {
        println!("  ... and {} more", total - LIST_LIMIT);
    }
}
