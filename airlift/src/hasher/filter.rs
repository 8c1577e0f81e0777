//! Path filtering and the pluggable hashing policy.

use globset::{Glob, GlobSet, GlobSetBuilder};

use crate::manifest::RelativePath;

use super::error::HasherError;

/// How a matched file's digest is computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashMode {
    /// Read and hash the full file contents.
    Content,

    /// Trust the file by size; emit a size-only placeholder digest.
    FastCheck,
}

/// A compiled set of glob patterns over relative paths.
///
/// Patterns match against the `/`-separated relative path
/// (`mods/**/*.jar`). An empty set matches nothing; this is the building
/// block for opt-in rule sets (fast-check, verify, preserve).
#[derive(Debug, Clone)]
pub struct PatternSet {
    set: GlobSet,
}

impl PatternSet {
    /// A set matching no path.
    pub fn empty() -> Self {
        Self {
            set: GlobSet::empty(),
        }
    }

    /// Compile a set from glob patterns.
    pub fn from_patterns(patterns: &[impl AsRef<str>]) -> Result<Self, HasherError> {
        let mut builder = GlobSetBuilder::new();
        for pattern in patterns {
            let glob = Glob::new(pattern.as_ref()).map_err(|source| HasherError::InvalidPattern {
                pattern: pattern.as_ref().to_string(),
                source,
            })?;
            builder.add(glob);
        }
        let set = builder.build().map_err(|source| HasherError::InvalidPattern {
            pattern: String::new(),
            source,
        })?;
        Ok(Self { set })
    }

    /// Whether any pattern matches `path`.
    pub fn matches(&self, path: &RelativePath) -> bool {
        self.set.is_match(path.as_str())
    }

    /// Whether the set contains no patterns.
    pub fn is_empty(&self) -> bool {
        self.set.is_empty()
    }
}

impl Default for PatternSet {
    fn default() -> Self {
        Self::empty()
    }
}

/// An inclusion filter over relative paths.
///
/// Unlike [`PatternSet`], an empty filter matches *everything*: the
/// natural default for "which paths are even considered".
#[derive(Debug, Clone)]
pub struct PathFilter {
    patterns: PatternSet,
}

impl PathFilter {
    /// A filter that matches every path.
    pub fn match_all() -> Self {
        Self {
            patterns: PatternSet::empty(),
        }
    }

    /// Build a filter from glob patterns. An empty list matches all.
    pub fn from_patterns(patterns: &[impl AsRef<str>]) -> Result<Self, HasherError> {
        Ok(Self {
            patterns: PatternSet::from_patterns(patterns)?,
        })
    }

    /// Whether the filter admits `path`.
    pub fn matches(&self, path: &RelativePath) -> bool {
        self.patterns.is_empty() || self.patterns.matches(path)
    }
}

impl Default for PathFilter {
    fn default() -> Self {
        Self::match_all()
    }
}

/// Decides, per path, whether a file gets a full content digest or a
/// fast-check placeholder.
///
/// The fast-check set is a deliberate performance/trust trade-off for
/// low-risk paths (large media that never changes without a size change).
/// Publisher and client must configure the same policy for a scope;
/// digests only compare equal under matching modes.
#[derive(Debug, Clone, Default)]
pub struct HashPolicy {
    fast_check: PatternSet,
}

impl HashPolicy {
    /// Hash every file's full contents.
    pub fn full_content() -> Self {
        Self::default()
    }

    /// Fast-check files matching any of `patterns`; hash the rest.
    pub fn with_fast_check(patterns: &[impl AsRef<str>]) -> Result<Self, HasherError> {
        Ok(Self {
            fast_check: PatternSet::from_patterns(patterns)?,
        })
    }

    /// The digest mode for `path`.
    pub fn mode_for(&self, path: &RelativePath) -> HashMode {
        if self.fast_check.matches(path) {
            HashMode::FastCheck
        } else {
            HashMode::Content
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rel(path: &str) -> RelativePath {
        RelativePath::new(path).unwrap()
    }

    #[test]
    fn test_empty_pattern_set_matches_nothing() {
        let set = PatternSet::empty();
        assert!(set.is_empty());
        assert!(!set.matches(&rel("anything")));
    }

    #[test]
    fn test_pattern_set_matches() {
        let set = PatternSet::from_patterns(&["config/**", "saves/**"]).unwrap();
        assert!(set.matches(&rel("config/options.txt")));
        assert!(set.matches(&rel("saves/world/level.dat")));
        assert!(!set.matches(&rel("client.jar")));
    }

    #[test]
    fn test_empty_filter_matches_all() {
        let filter = PathFilter::match_all();
        assert!(filter.matches(&rel("anything/at/all.bin")));
    }

    #[test]
    fn test_filter_patterns() {
        let filter = PathFilter::from_patterns(&["*.jar", "natives/**"]).unwrap();
        assert!(filter.matches(&rel("client.jar")));
        assert!(filter.matches(&rel("natives/linux/libglfw.so")));
        assert!(!filter.matches(&rel("assets/icon.png")));
    }

    #[test]
    fn test_filter_rejects_bad_pattern() {
        assert!(PathFilter::from_patterns(&["a{b"]).is_err());
    }

    #[test]
    fn test_policy_full_content_by_default() {
        let policy = HashPolicy::default();
        assert_eq!(policy.mode_for(&rel("media/intro.ogv")), HashMode::Content);
    }

    #[test]
    fn test_policy_fast_check_patterns() {
        let policy = HashPolicy::with_fast_check(&["media/**", "*.ogv"]).unwrap();
        assert_eq!(
            policy.mode_for(&rel("media/intro.ogv")),
            HashMode::FastCheck
        );
        assert_eq!(policy.mode_for(&rel("client.jar")), HashMode::Content);
    }
}
