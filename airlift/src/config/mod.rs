//! Launcher configuration file (`launcher.ini`).
//!
//! The engine itself takes every setting as an explicit argument; this
//! module is the persistence layer the CLI (and any future shell) reads
//! those arguments from. INI format, one file, four sections:
//!
//! ```ini
//! [sync]
//! base_url = https://updates.example.com/content
//! max_concurrent = 4
//!
//! [scopes]
//! game_client = /home/player/.local/share/airlift/game-client
//! asset_index = /home/player/.local/share/airlift/asset-index
//! runtime = /home/player/.local/share/airlift/runtime
//!
//! [rules]
//! include =
//! fast_check = media/**
//! verify = *.jar
//! preserve = config/**, saves/**
//!
//! [keys]
//! public_key = /home/player/.config/airlift/airlift.pub
//! ```
//!
//! Pattern lists are comma-separated globs. Every key is optional;
//! missing keys fall back to defaults.

use std::path::{Path, PathBuf};

use ini::Ini;
use thiserror::Error;

use crate::manifest::ContentScope;

/// Default maximum concurrent downloads.
const DEFAULT_MAX_CONCURRENT: usize = 4;

/// Errors that can occur loading or saving the configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read or parsed.
    #[error("failed to load configuration from {path}: {reason}")]
    Load { path: PathBuf, reason: String },

    /// The file could not be written.
    #[error("failed to save configuration to {path}: {reason}")]
    Save { path: PathBuf, reason: String },

    /// A value had the wrong shape (e.g. non-numeric `max_concurrent`).
    #[error("invalid configuration value for {key}: {value}")]
    InvalidValue { key: String, value: String },
}

/// `[sync]` section: transport settings.
#[derive(Debug, Clone)]
pub struct SyncSettings {
    /// Base URL content paths are joined onto.
    pub base_url: String,

    /// Maximum concurrent downloads.
    pub max_concurrent: usize,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            max_concurrent: DEFAULT_MAX_CONCURRENT,
        }
    }
}

/// `[scopes]` section: sandbox root per content scope.
#[derive(Debug, Clone, Default)]
pub struct ScopeRoots {
    pub game_client: Option<PathBuf>,
    pub asset_index: Option<PathBuf>,
    pub runtime: Option<PathBuf>,
}

impl ScopeRoots {
    /// The configured sandbox root for a scope, if any.
    pub fn root_for(&self, scope: ContentScope) -> Option<&PathBuf> {
        match scope {
            ContentScope::GameClient => self.game_client.as_ref(),
            ContentScope::AssetIndex => self.asset_index.as_ref(),
            ContentScope::Runtime => self.runtime.as_ref(),
        }
    }
}

/// `[rules]` section: glob pattern lists.
#[derive(Debug, Clone, Default)]
pub struct RuleSettings {
    pub include: Vec<String>,
    pub fast_check: Vec<String>,
    pub verify: Vec<String>,
    pub preserve: Vec<String>,
}

/// `[keys]` section: key file locations.
#[derive(Debug, Clone, Default)]
pub struct KeySettings {
    /// Manifest verification key (client side).
    pub public_key: Option<PathBuf>,
}

/// The launcher configuration file.
#[derive(Debug, Clone, Default)]
pub struct ConfigFile {
    pub sync: SyncSettings,
    pub scopes: ScopeRoots,
    pub rules: RuleSettings,
    pub keys: KeySettings,
}

impl ConfigFile {
    /// The default configuration file path
    /// (`$XDG_CONFIG_HOME/airlift/launcher.ini` or platform equivalent).
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("airlift").join("launcher.ini"))
    }

    /// Load from the default path; missing file yields defaults.
    pub fn load() -> Result<Self, ConfigError> {
        match Self::default_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Load from an explicit path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let ini = Ini::load_from_file(path).map_err(|e| ConfigError::Load {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let mut config = Self::default();

        if let Some(section) = ini.section(Some("sync")) {
            if let Some(base_url) = section.get("base_url") {
                config.sync.base_url = base_url.to_string();
            }
            if let Some(raw) = section.get("max_concurrent") {
                config.sync.max_concurrent =
                    raw.trim()
                        .parse()
                        .map_err(|_| ConfigError::InvalidValue {
                            key: "sync.max_concurrent".to_string(),
                            value: raw.to_string(),
                        })?;
            }
        }

        if let Some(section) = ini.section(Some("scopes")) {
            config.scopes.game_client = section.get("game_client").map(PathBuf::from);
            config.scopes.asset_index = section.get("asset_index").map(PathBuf::from);
            config.scopes.runtime = section.get("runtime").map(PathBuf::from);
        }

        if let Some(section) = ini.section(Some("rules")) {
            config.rules.include = parse_patterns(section.get("include"));
            config.rules.fast_check = parse_patterns(section.get("fast_check"));
            config.rules.verify = parse_patterns(section.get("verify"));
            config.rules.preserve = parse_patterns(section.get("preserve"));
        }

        if let Some(section) = ini.section(Some("keys")) {
            config.keys.public_key = section.get("public_key").map(PathBuf::from);
        }

        Ok(config)
    }

    /// Save to an explicit path, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::Save {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
        }

        let mut ini = Ini::new();
        ini.with_section(Some("sync"))
            .set("base_url", self.sync.base_url.clone())
            .set("max_concurrent", self.sync.max_concurrent.to_string());

        {
            let mut section = ini.with_section(Some("scopes"));
            if let Some(path) = &self.scopes.game_client {
                section.set("game_client", path.display().to_string());
            }
            if let Some(path) = &self.scopes.asset_index {
                section.set("asset_index", path.display().to_string());
            }
            if let Some(path) = &self.scopes.runtime {
                section.set("runtime", path.display().to_string());
            }
        }

        ini.with_section(Some("rules"))
            .set("include", self.rules.include.join(", "))
            .set("fast_check", self.rules.fast_check.join(", "))
            .set("verify", self.rules.verify.join(", "))
            .set("preserve", self.rules.preserve.join(", "));

        if let Some(path) = &self.keys.public_key {
            ini.with_section(Some("keys"))
                .set("public_key", path.display().to_string());
        }

        ini.write_to_file(path).map_err(|e| ConfigError::Save {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }
}

/// Split a comma-separated pattern list, dropping empties.
fn parse_patterns(raw: Option<&str>) -> Vec<String> {
    raw.map(|raw| {
        raw.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    })
    .unwrap_or_default()
}
