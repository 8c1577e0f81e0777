//! The signed manifest envelope and its JSON wire form.
//!
//! A [`SignedManifest`] carries the exact canonical payload bytes next to
//! a detached hex signature. The wire form keeps the payload embedded as
//! raw JSON (`{"manifest": {...}, "signature": "..."}`) so parsing the
//! envelope never re-encodes, and therefore never invalidates, the
//! signed bytes.

use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;

use super::error::ManifestError;

/// A canonical manifest payload plus its detached signature.
///
/// Produced once per publish on the server; held by the client only until
/// verification, after which only the verified [`super::Manifest`]
/// survives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedManifest {
    /// Canonical serialized manifest (see [`super::canonical_bytes`]).
    pub manifest_bytes: Vec<u8>,

    /// Hex-encoded Ed25519 signature over `manifest_bytes`.
    pub signature: String,
}

#[derive(Serialize)]
struct WireEnvelopeOut<'a> {
    manifest: &'a RawValue,
    signature: &'a str,
}

#[derive(Deserialize)]
struct WireEnvelopeIn {
    manifest: Box<RawValue>,
    signature: String,
}

impl SignedManifest {
    /// Serialize to the JSON wire form.
    pub fn to_wire_json(&self) -> Result<String, ManifestError> {
        let payload = std::str::from_utf8(&self.manifest_bytes)
            .map_err(|_| ManifestError::MalformedEnvelope("payload is not UTF-8".to_string()))?;
        let raw = RawValue::from_string(payload.to_string())
            .map_err(|_| ManifestError::MalformedEnvelope("payload is not JSON".to_string()))?;
        let envelope = WireEnvelopeOut {
            manifest: &raw,
            signature: &self.signature,
        };
        Ok(serde_json::to_string(&envelope)?)
    }

    /// Parse from the JSON wire form.
    ///
    /// The payload is captured verbatim, without re-encoding, so the
    /// verifier checks the signature over exactly the bytes the server
    /// signed.
    pub fn from_wire_json(json: &str) -> Result<Self, ManifestError> {
        let envelope: WireEnvelopeIn = serde_json::from_str(json)?;
        Ok(Self {
            manifest_bytes: envelope.manifest.get().as_bytes().to_vec(),
            signature: envelope.signature,
        })
    }
}
