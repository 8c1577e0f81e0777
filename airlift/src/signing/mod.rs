//! Manifest signing and verification.
//!
//! This module is the trust boundary between the manifest producer (the
//! update server) and the consumer (the launcher client). The server
//! holds an Ed25519 signing key and publishes [`crate::manifest::SignedManifest`]
//! envelopes; the client pins the matching public key and refuses to
//! hand a manifest to any downstream component until the signature over
//! the canonical payload bytes has been verified.
//!
//! Verification order is deliberate: signature first, structure second.
//! Parsing untrusted bytes before checking the signature would mean
//! acting on an unverified payload.

mod error;
mod signer;
mod verifier;

pub use error::SignatureError;
pub use signer::ManifestSigner;
pub use verifier::ManifestVerifier;
