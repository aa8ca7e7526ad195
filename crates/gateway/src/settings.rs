//! Gateway settings
//!
//! Settings are read from (in order of priority):
//! 1. An explicit file passed by the caller
//! 2. `gateway.json` in the shared config directory (~/.config/gateway/)
//! 3. Built-in defaults (no persistence, standard retry policy)
//!
//! `GATEWAY_STORAGE_KIND` and `GATEWAY_STORAGE_PATH` override whatever the
//! file says about storage.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

/// Settings filename in the gateway config directory
pub const SETTINGS_FILE: &str = "gateway.json";

pub const STORAGE_KIND_ENV: &str = "GATEWAY_STORAGE_KIND";
pub const STORAGE_PATH_ENV: &str = "GATEWAY_STORAGE_PATH";

/// Which message store backend to run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    #[default]
    None,
    Sqlite,
    Filesystem,
}

impl StorageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageKind::None => "none",
            StorageKind::Sqlite => "sqlite",
            StorageKind::Filesystem => "filesystem",
        }
    }
}

impl fmt::Display for StorageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StorageKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "none" => Ok(StorageKind::None),
            "sqlite" => Ok(StorageKind::Sqlite),
            "filesystem" => Ok(StorageKind::Filesystem),
            other => bail!("Unknown storage kind: {}", other),
        }
    }
}

/// Storage backend selection
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub kind: StorageKind,
    /// Database file for `sqlite`, root directory for `filesystem`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

impl StorageConfig {
    /// Reject persistent kinds that have nowhere to write
    pub fn validate(&self) -> Result<()> {
        let has_path = self.path.as_ref().is_some_and(|p| !p.as_os_str().is_empty());
        if self.kind != StorageKind::None && !has_path {
            bail!("Storage kind {} requires a path", self.kind);
        }
        Ok(())
    }
}

/// Webhook delivery policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchSettings {
    /// Attempts per subscriber, including the first
    pub max_attempts: u32,
    /// Sleep before the second attempt; doubles after each failure
    pub initial_backoff_ms: u64,
    /// Bound on a single HTTP call
    pub timeout_secs: u64,
    /// Size of the delivery worker pool
    pub worker_threads: usize,
    /// Header carrying the hex HMAC of the body
    pub signature_header: String,
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff_ms: 1000,
            timeout_secs: 10,
            worker_threads: 4,
            signature_header: "X-Twilio-Signature".to_string(),
        }
    }
}

impl DispatchSettings {
    pub fn initial_backoff(&self) -> Duration {
        Duration::from_millis(self.initial_backoff_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Sleep after the given failed attempt (1-based)
    pub fn backoff_after(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt.saturating_sub(1)).unwrap_or(u32::MAX);
        self.initial_backoff().saturating_mul(factor)
    }
}

/// Everything the gateway needs at startup
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub storage: StorageConfig,
    pub dispatch: DispatchSettings,
}

impl GatewayConfig {
    /// Load settings using the following priority:
    /// 1. `path`, when given (must exist)
    /// 2. ~/.config/gateway/gateway.json, when present
    /// 3. Defaults
    ///
    /// Environment overrides are applied last, then the result is validated.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut settings = match path {
            Some(path) => Self::from_file(path)?,
            None if config::config_exists(SETTINGS_FILE) => config::load_json(SETTINGS_FILE)?,
            None => Self::default(),
        };
        settings.apply_env(|key| std::env::var(key).ok())?;
        settings.storage.validate()?;
        Ok(settings)
    }

    /// Load settings from an arbitrary JSON file
    pub fn from_file(path: &Path) -> Result<Self> {
        config::load_json_file(path)
    }

    /// Default location of the settings file
    pub fn default_path() -> Option<PathBuf> {
        config::config_path(SETTINGS_FILE)
    }

    /// Write these settings to the default location
    pub fn save_default(&self) -> Result<PathBuf> {
        config::save_json(SETTINGS_FILE, self)?;
        Self::default_path().context("Could not determine config directory")
    }

    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(kind) = lookup(STORAGE_KIND_ENV) {
            self.storage.kind = kind
                .parse()
                .with_context(|| format!("Invalid {}", STORAGE_KIND_ENV))?;
        }
        if let Some(path) = lookup(STORAGE_PATH_ENV) {
            self.storage.path = Some(PathBuf::from(path));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::time::Duration;
    use tempfile::tempdir;

    #[test]
    fn test_defaults() {
        let settings = GatewayConfig::default();
        assert_eq!(settings.storage.kind, StorageKind::None);
        assert_eq!(settings.dispatch.max_attempts, 3);
        assert_eq!(settings.dispatch.initial_backoff(), Duration::from_secs(1));
        assert_eq!(settings.dispatch.timeout(), Duration::from_secs(10));
        assert_eq!(settings.dispatch.signature_header, "X-Twilio-Signature");
    }

    #[test]
    fn test_backoff_doubles() {
        let dispatch = DispatchSettings::default();
        assert_eq!(dispatch.backoff_after(1), Duration::from_secs(1));
        assert_eq!(dispatch.backoff_after(2), Duration::from_secs(2));
        assert_eq!(dispatch.backoff_after(3), Duration::from_secs(4));
    }

    #[test]
    fn test_storage_kind_is_case_insensitive() {
        assert_eq!("SQLite".parse::<StorageKind>().unwrap(), StorageKind::Sqlite);
        assert_eq!("FILESYSTEM".parse::<StorageKind>().unwrap(), StorageKind::Filesystem);
        assert_eq!("".parse::<StorageKind>().unwrap(), StorageKind::None);
        assert!("postgres".parse::<StorageKind>().is_err());
    }

    #[test]
    fn test_persistent_kind_requires_path() {
        let storage = StorageConfig {
            kind: StorageKind::Sqlite,
            path: None,
        };
        assert!(storage.validate().is_err());

        let storage = StorageConfig {
            kind: StorageKind::Filesystem,
            path: Some(PathBuf::new()),
        };
        assert!(storage.validate().is_err());

        assert!(StorageConfig::default().validate().is_ok());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("gateway.json");
        std::fs::write(
            &path,
            r#"{"storage": {"kind": "sqlite", "path": "/tmp/gw.db"}, "dispatch": {"max_attempts": 5}}"#,
        )
        .unwrap();

        let settings = GatewayConfig::load(Some(&path)).unwrap();
        assert_eq!(settings.storage.kind, StorageKind::Sqlite);
        assert_eq!(settings.storage.path, Some(PathBuf::from("/tmp/gw.db")));
        assert_eq!(settings.dispatch.max_attempts, 5);
        assert_eq!(settings.dispatch.timeout_secs, 10);
    }

    #[test]
    fn test_missing_explicit_file_is_error() {
        let dir = tempdir().unwrap();
        assert!(GatewayConfig::load(Some(&dir.path().join("absent.json"))).is_err());
    }

    #[test]
    fn test_env_overrides_storage() {
        let env: HashMap<&str, &str> = [
            (STORAGE_KIND_ENV, "Filesystem"),
            (STORAGE_PATH_ENV, "/var/lib/gateway"),
        ]
        .into_iter()
        .collect();

        let mut settings = GatewayConfig::default();
        settings
            .apply_env(|key| env.get(key).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(settings.storage.kind, StorageKind::Filesystem);
        assert_eq!(settings.storage.path, Some(PathBuf::from("/var/lib/gateway")));
    }

    #[test]
    fn test_bad_env_kind_is_error() {
        let mut settings = GatewayConfig::default();
        let result = settings.apply_env(|key| (key == STORAGE_KIND_ENV).then(|| "mongo".to_string()));
        assert!(result.is_err());
    }
}
