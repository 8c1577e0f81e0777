//! Manifest signing key generation.

use std::path::PathBuf;

use clap::Args;
use ed25519_dalek::SigningKey;
use rand::rngs::OsRng;
use rand::RngCore;

use crate::error::CliError;

/// File name of the private seed.
const SEED_FILE: &str = "airlift.key";

/// File name of the public verification key.
const PUBLIC_FILE: &str = "airlift.pub";

/// Arguments for `airlift keygen`.
#[derive(Debug, Args)]
pub struct KeygenArgs {
    /// Directory the key pair is written into (defaults to the Airlift
    /// config directory)
    #[arg(long, value_name = "DIR")]
    out_dir: Option<PathBuf>,

    /// Overwrite existing key files
    #[arg(long)]
    force: bool,
}

/// Generate and write a signing key pair.
pub fn run(args: KeygenArgs) -> Result<(), CliError> {
    let out_dir = match args.out_dir {
        Some(dir) => dir,
        None => dirs::config_dir()
            .map(|dir| dir.join("airlift"))
            .ok_or_else(|| CliError::Key("no config directory on this platform".to_string()))?,
    };
    std::fs::create_dir_all(&out_dir)
        .map_err(|e| CliError::Io(format!("creating {}: {}", out_dir.display(), e)))?;

    let seed_path = out_dir.join(SEED_FILE);
    let public_path = out_dir.join(PUBLIC_FILE);
    if !args.force && (seed_path.exists() || public_path.exists()) {
        return Err(CliError::Key(format!(
            "key files already exist in {} (use --force to overwrite)",
            out_dir.display()
        )));
    }

    let mut seed = [0u8; 32];
    OsRng.fill_bytes(&mut seed);
    let signing = SigningKey::from_bytes(&seed);

    write_private(&seed_path, &seed)?;
    std::fs::write(&public_path, signing.verifying_key().as_bytes())
        .map_err(|e| CliError::Io(format!("writing {}: {}", public_path.display(), e)))?;

    println!("Signing key:      {}", seed_path.display());
    println!("Verification key: {}", public_path.display());
    println!(
        "Public key (hex): {}",
        hex::encode(signing.verifying_key().as_bytes())
    );
    println!();
    println!("Keep the signing key on the publish server only.");

    Ok(())
}

#[cfg(unix)]
fn write_private(path: &std::path::Path, seed: &[u8; 32]) -> Result<(), CliError> {
    use std::io::Write;
    use std::os::unix::fs::OpenOptionsExt;

    let mut file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)
        .map_err(|e| CliError::Io(format!("creating {}: {}", path.display(), e)))?;
    file.write_all(seed)
        .map_err(|e| CliError::Io(format!("writing {}: {}", path.display(), e)))
}

#[cfg(not(unix))]
fn write_private(path: &std::path::Path, seed: &[u8; 32]) -> Result<(), CliError> {
    std::fs::write(path, seed)
        .map_err(|e| CliError::Io(format!("writing {}: {}", path.display(), e)))
}
