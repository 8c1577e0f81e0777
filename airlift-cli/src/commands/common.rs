//! Shared plumbing for the diff and sync commands.

use std::path::PathBuf;

use airlift::config::ConfigFile;
use airlift::diff::{diff_trees, DiffRules, SyncPlan};
use airlift::hasher::{HashPolicy, PathFilter, TreeHasher};
use airlift::manifest::{Manifest, SignedManifest};
use airlift::signing::ManifestVerifier;

use crate::error::CliError;

/// Pattern flags shared by the plan-producing commands. Flags override
/// the corresponding `[rules]` entry in the config file when non-empty.
#[derive(Debug, Clone, clap::Args)]
pub struct RuleArgs {
    /// Glob patterns limiting which local paths are considered
    #[arg(long = "include", value_name = "GLOB")]
    pub include: Vec<String>,

    /// Glob patterns hashed by size only (must match the publisher)
    #[arg(long = "fast-check", value_name = "GLOB")]
    pub fast_check: Vec<String>,

    /// Glob patterns re-verified even when hashes match
    #[arg(long = "verify", value_name = "GLOB")]
    pub verify: Vec<String>,

    /// Glob patterns never deleted (user config, saves)
    #[arg(long = "preserve", value_name = "GLOB")]
    pub preserve: Vec<String>,
}

fn pick(flag: &[String], config: &[String]) -> Vec<String> {
    if flag.is_empty() {
        config.to_vec()
    } else {
        flag.to_vec()
    }
}

/// Everything needed to execute (or print) a plan.
pub struct PlanContext {
    pub manifest: Manifest,
    pub plan: SyncPlan,
    pub policy: HashPolicy,
    pub root: PathBuf,
}

/// Verify a wire manifest, hash the sandbox, and diff the two.
pub fn compute_plan(
    manifest_path: &PathBuf,
    public_key: Option<PathBuf>,
    root: Option<PathBuf>,
    rules: &RuleArgs,
    config: &ConfigFile,
) -> Result<PlanContext, CliError> {
    let wire = std::fs::read_to_string(manifest_path)
        .map_err(|e| CliError::Io(format!("reading {}: {}", manifest_path.display(), e)))?;
    let signed = SignedManifest::from_wire_json(&wire)?;

    let key_path = public_key
        .or_else(|| config.keys.public_key.clone())
        .ok_or_else(|| {
            CliError::MissingSetting("--public-key flag or keys.public_key in config".to_string())
        })?;
    let verifier = ManifestVerifier::from_public_key_file(&key_path)?;
    let manifest = verifier.verify(&signed)?;

    let root = root
        .or_else(|| config.scopes.root_for(manifest.content_scope).cloned())
        .ok_or_else(|| {
            CliError::MissingSetting(format!(
                "--root flag or scopes.{} in config",
                manifest.content_scope.as_str().replace('-', "_")
            ))
        })?;

    let include = pick(&rules.include, &config.rules.include);
    let fast_check = pick(&rules.fast_check, &config.rules.fast_check);
    let verify = pick(&rules.verify, &config.rules.verify);
    let preserve = pick(&rules.preserve, &config.rules.preserve);

    let policy = HashPolicy::with_fast_check(&fast_check)?;
    let hasher = TreeHasher::new()
        .with_include(PathFilter::from_patterns(&include)?)
        .with_policy(policy.clone());
    let local = hasher.hash_tree(&root)?;

    let diff_rules = DiffRules::from_patterns(&verify, &preserve)?;
    let plan = diff_trees(&local, &manifest.root, &diff_rules);

    Ok(PlanContext {
        manifest,
        plan,
        policy,
        root,
    })
}

/// Load the launcher configuration, falling back to defaults.
pub fn load_config() -> Result<ConfigFile, CliError> {
    Ok(ConfigFile::load()?)
}
