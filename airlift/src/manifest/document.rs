//! The manifest document: a content tree plus publish metadata.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Timelike, Utc};
use serde::{Deserialize, Serialize};

use super::error::ManifestError;
use super::tree::DirEntry;

/// Which logical content root a manifest describes.
///
/// Each scope is synchronized independently against its own sandbox root;
/// a manifest never spans scopes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ContentScope {
    /// The game client files themselves (jars, natives, configs).
    GameClient,

    /// The asset index tree (textures, sounds, localization).
    AssetIndex,

    /// The bundled runtime the client is launched with.
    Runtime,
}

impl ContentScope {
    /// Stable string form, matching the wire representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentScope::GameClient => "game-client",
            ContentScope::AssetIndex => "asset-index",
            ContentScope::Runtime => "runtime",
        }
    }
}

impl fmt::Display for ContentScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentScope {
    type Err = ManifestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "game-client" => Ok(ContentScope::GameClient),
            "asset-index" => Ok(ContentScope::AssetIndex),
            "runtime" => Ok(ContentScope::Runtime),
            other => Err(ManifestError::UnknownScope(other.to_string())),
        }
    }
}

/// A published description of one content root.
///
/// Manifests are values: built fresh on every publish, consumed once per
/// sync session, never mutated incrementally. Field order here is the
/// canonical serialization order and must not change (see
/// [`super::canonical_bytes`]).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    /// The content tree, rooted at the sandbox root.
    pub root: DirEntry,

    /// When the manifest was published (UTC, second precision).
    #[serde(with = "timestamp")]
    pub generated_at: DateTime<Utc>,

    /// Which logical content root this manifest describes.
    pub content_scope: ContentScope,
}

impl Manifest {
    /// Build a manifest stamped with the current time.
    ///
    /// The timestamp is truncated to whole seconds so the value
    /// round-trips byte-identically through its canonical form.
    pub fn new(root: DirEntry, content_scope: ContentScope) -> Self {
        let now = Utc::now();
        let generated_at = now.with_nanosecond(0).unwrap_or(now);
        Self {
            root,
            generated_at,
            content_scope,
        }
    }

    /// Validate tree structure (child keys and parent prefixes).
    pub fn validate(&self) -> Result<(), ManifestError> {
        if !self.root.relative_path.is_root() {
            return Err(ManifestError::InconsistentTree {
                path: self.root.relative_path.to_string(),
                reason: "manifest root must have the empty path".to_string(),
            });
        }
        self.root.validate()
    }
}

/// RFC-3339 timestamps with second precision and a `Z` suffix.
///
/// The fixed precision matters: signature verification re-canonicalizes
/// the parsed manifest and compares bytes, so the serialized form must be
/// a pure function of the parsed value.
mod timestamp {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{self, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&value.to_rfc3339_opts(SecondsFormat::Secs, true))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::tree::RelativePath;

    #[test]
    fn test_scope_round_trip() {
        for scope in [
            ContentScope::GameClient,
            ContentScope::AssetIndex,
            ContentScope::Runtime,
        ] {
            let parsed: ContentScope = scope.as_str().parse().unwrap();
            assert_eq!(parsed, scope);
        }
        assert!("desktop-shell".parse::<ContentScope>().is_err());
    }

    #[test]
    fn test_scope_wire_form() {
        let json = serde_json::to_string(&ContentScope::AssetIndex).unwrap();
        assert_eq!(json, "\"asset-index\"");
    }

    #[test]
    fn test_manifest_timestamp_round_trips() {
        let manifest = Manifest::new(DirEntry::new(RelativePath::root()), ContentScope::Runtime);
        let json = serde_json::to_string(&manifest).unwrap();
        let parsed: Manifest = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, manifest);
    }

    #[test]
    fn test_manifest_rejects_non_root_tree() {
        let manifest = Manifest::new(
            DirEntry::new(RelativePath::new("nested").unwrap()),
            ContentScope::GameClient,
        );
        assert!(manifest.validate().is_err());
    }
}
