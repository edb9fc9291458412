//! ProgressVault Configuration
//!
//! Configuration lives in `<config_dir>/progressvault/config.toml`.
//! Every field has a serde default so a partial (or missing) file still
//! yields a usable configuration.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Application directory name under the platform config/data dirs
pub const APP_DIR: &str = "progressvault";
const CONFIG_FILE: &str = "config.toml";

/// Backend used by the persistent store adapter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[default]
    File,
    Memory,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::File => "file",
            BackendKind::Memory => "memory",
        }
    }
}

/// Storage settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageSettings {
    /// Directory holding one JSON file per store key
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    #[serde(default)]
    pub backend: BackendKind,
}

fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            backend: BackendKind::default(),
        }
    }
}

/// Authentication settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthSettings {
    /// Store passwords with the reversible demo encoding. Never enable this
    /// outside a classroom.
    #[serde(default)]
    pub demo_mode: bool,

    /// Minimum password length on sign-up (valid: 1-128)
    #[serde(default = "default_min_password_len")]
    pub min_password_len: usize,
}

fn default_min_password_len() -> usize {
    6
}

impl AuthSettings {
    pub fn effective_min_password_len(&self) -> usize {
        self.min_password_len.clamp(1, 128)
    }
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            demo_mode: false,
            min_password_len: default_min_password_len(),
        }
    }
}

/// Progress rules
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressSettings {
    /// Lessons in a freshly created progress record (valid: 1-1000)
    #[serde(default = "default_total_lessons")]
    pub total_lessons: u32,

    /// XP awarded for each completed lesson
    #[serde(default = "default_lesson_xp_bonus")]
    pub lesson_xp_bonus: u32,

    /// XP awarded by a plain "earn XP" action
    #[serde(default = "default_xp_gain")]
    pub default_xp_gain: u32,
}

fn default_total_lessons() -> u32 {
    10
}

fn default_lesson_xp_bonus() -> u32 {
    25
}

fn default_xp_gain() -> u32 {
    10
}

impl ProgressSettings {
    pub fn effective_total_lessons(&self) -> u32 {
        self.total_lessons.clamp(1, 1000)
    }
}

impl Default for ProgressSettings {
    fn default() -> Self {
        Self {
            total_lessons: default_total_lessons(),
            lesson_xp_bonus: default_lesson_xp_bonus(),
            default_xp_gain: default_xp_gain(),
        }
    }
}

/// Simulated round-trip times, in milliseconds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LatencySettings {
    #[serde(default = "default_latency_enabled")]
    pub enabled: bool,

    #[serde(default = "default_session_load_ms")]
    pub session_load_ms: u64,

    #[serde(default = "default_auth_ms")]
    pub auth_ms: u64,

    /// Defaults to 0
    #[serde(default)]
    pub sign_out_ms: u64,

    #[serde(default = "default_fetch_ms")]
    pub fetch_ms: u64,

    #[serde(default = "default_add_xp_ms")]
    pub add_xp_ms: u64,

    #[serde(default = "default_complete_lesson_ms")]
    pub complete_lesson_ms: u64,

    #[serde(default = "default_reset_ms")]
    pub reset_ms: u64,
}

fn default_latency_enabled() -> bool {
    true
}

fn default_session_load_ms() -> u64 {
    300
}

fn default_auth_ms() -> u64 {
    500
}

fn default_fetch_ms() -> u64 {
    400
}

fn default_add_xp_ms() -> u64 {
    300
}

fn default_complete_lesson_ms() -> u64 {
    350
}

fn default_reset_ms() -> u64 {
    400
}

/// Upper bound for any single simulated delay
const MAX_LATENCY_MS: u64 = 5_000;

impl LatencySettings {
    /// Delay as a clamped `Duration` (0-5000 ms)
    pub fn effective(&self, ms: u64) -> Duration {
        Duration::from_millis(ms.min(MAX_LATENCY_MS))
    }
}

impl Default for LatencySettings {
    fn default() -> Self {
        Self {
            enabled: default_latency_enabled(),
            session_load_ms: default_session_load_ms(),
            auth_ms: default_auth_ms(),
            sign_out_ms: 0,
            fetch_ms: default_fetch_ms(),
            add_xp_ms: default_add_xp_ms(),
            complete_lesson_ms: default_complete_lesson_ms(),
            reset_ms: default_reset_ms(),
        }
    }
}

/// Operation log settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpLogSettings {
    /// Entries kept in memory (valid: 1-200)
    #[serde(default = "default_oplog_capacity")]
    pub capacity: usize,
}

fn default_oplog_capacity() -> usize {
    20
}

impl OpLogSettings {
    pub fn effective_capacity(&self) -> usize {
        self.capacity.clamp(1, 200)
    }

    pub fn capacity_was_clamped(&self) -> bool {
        self.capacity != self.effective_capacity()
    }
}

impl Default for OpLogSettings {
    fn default() -> Self {
        Self {
            capacity: default_oplog_capacity(),
        }
    }
}

/// Root configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VaultConfig {
    #[serde(default)]
    pub storage: StorageSettings,

    #[serde(default)]
    pub auth: AuthSettings,

    #[serde(default)]
    pub progress: ProgressSettings,

    #[serde(default)]
    pub latency: LatencySettings,

    #[serde(default)]
    pub oplog: OpLogSettings,
}

impl VaultConfig {
    /// Load from the default location, falling back to defaults
    pub fn load() -> Self {
        Self::load_from(&config_path())
    }

    /// Load from a specific file, falling back to defaults when it is
    /// missing or unparsable
    pub fn load_from(path: &Path) -> Self {
        if path.exists() {
            match fs::read_to_string(path) {
                Ok(content) => match toml::from_str(&content) {
                    Ok(config) => return config,
                    Err(e) => {
                        tracing::warn!(path = %path.display(), error = %e, "invalid config, using defaults")
                    }
                },
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "unreadable config, using defaults")
                }
            }
        }
        Self::default()
    }

    /// Save to a specific file
    pub fn save_to(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        fs::write(path, content)
    }
}

/// Get the default config file path
pub fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
        .join(CONFIG_FILE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = VaultConfig::default();
        assert_eq!(config.storage.backend, BackendKind::File);
        assert!(!config.auth.demo_mode, "demo password encoding must be OFF by default");
        assert_eq!(config.auth.min_password_len, 6);
        assert_eq!(config.progress.total_lessons, 10);
        assert_eq!(config.progress.lesson_xp_bonus, 25);
        assert_eq!(config.progress.default_xp_gain, 10);
        assert_eq!(config.oplog.capacity, 20);
        assert!(config.latency.enabled);
        assert_eq!(config.latency.auth_ms, 500);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: VaultConfig = toml::from_str(
            r#"
            [auth]
            demo_mode = true

            [storage]
            backend = "memory"
            "#,
        )
        .unwrap();
        assert!(config.auth.demo_mode);
        assert_eq!(config.auth.min_password_len, 6);
        assert_eq!(config.storage.backend, BackendKind::Memory);
        assert_eq!(config.progress.total_lessons, 10);
    }

    #[test]
    fn test_clamping() {
        let mut oplog = OpLogSettings { capacity: 0 };
        assert_eq!(oplog.effective_capacity(), 1);
        assert!(oplog.capacity_was_clamped());

        oplog.capacity = 1000;
        assert_eq!(oplog.effective_capacity(), 200);

        oplog.capacity = 20;
        assert!(!oplog.capacity_was_clamped());

        let latency = LatencySettings::default();
        assert_eq!(latency.effective(60_000), Duration::from_millis(5_000));
        assert_eq!(latency.effective(300), Duration::from_millis(300));
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = VaultConfig::default();
        config.progress.total_lessons = 12;
        config.latency.enabled = false;
        config.save_to(&path).unwrap();

        let loaded = VaultConfig::load_from(&path);
        assert_eq!(loaded.progress.total_lessons, 12);
        assert!(!loaded.latency.enabled);
    }

    #[test]
    fn test_invalid_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "this is = = not toml").unwrap();

        let loaded = VaultConfig::load_from(&path);
        assert_eq!(loaded.oplog.capacity, 20);
    }
}
