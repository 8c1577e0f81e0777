//! Server-side manifest publishing command.

use std::path::PathBuf;

use clap::Args;

use airlift::hasher::{HashPolicy, PathFilter, TreeHasher};
use airlift::manifest::ContentScope;
use airlift::publisher::ManifestPublisher;
use airlift::signing::ManifestSigner;

use crate::error::CliError;

/// Arguments for `airlift publish`.
#[derive(Debug, Args)]
pub struct PublishArgs {
    /// Content root directory to publish
    root: PathBuf,

    /// Content scope this root describes (game-client, asset-index,
    /// runtime)
    #[arg(long)]
    scope: ContentScope,

    /// Signing key file (32-byte seed)
    #[arg(long, value_name = "FILE")]
    key: PathBuf,

    /// Output path for the wire manifest
    #[arg(long, value_name = "FILE", default_value = "manifest.json")]
    out: PathBuf,

    /// Glob patterns limiting which paths are included
    #[arg(long = "include", value_name = "GLOB")]
    include: Vec<String>,

    /// Glob patterns hashed by size only (fast-check)
    #[arg(long = "fast-check", value_name = "GLOB")]
    fast_check: Vec<String>,
}

/// Hash, sign, and write a wire manifest.
pub fn run(args: PublishArgs) -> Result<(), CliError> {
    let signer = ManifestSigner::from_seed_file(&args.key)?;
    let hasher = TreeHasher::new()
        .with_include(PathFilter::from_patterns(&args.include)?)
        .with_policy(HashPolicy::with_fast_check(&args.fast_check)?);

    let publisher = ManifestPublisher::new(signer).with_hasher(hasher);
    let signed = publisher.publish(&args.root, args.scope)?;
    let manifest = airlift::manifest::parse_manifest(&signed.manifest_bytes)?;

    let wire = signed.to_wire_json()?;
    std::fs::write(&args.out, wire)
        .map_err(|e| CliError::Io(format!("writing {}: {}", args.out.display(), e)))?;

    println!("Published {} manifest: {}", args.scope, args.out.display());
    println!(
        "  {} files, {} bytes",
        manifest.root.file_count(),
        manifest.root.total_bytes()
    );

    Ok(())
}
