//! Persistent YAML configuration store.
//!
//! # Storage layout
//!
//! ```text
//! ~/.aifmt/
//!   config.yaml   (mode 0600, created with defaults on first use)
//!   templates/    (optional `.tera` prompt overrides)
//! ```
//!
//! # API pattern
//!
//! Every function touching the filesystem has two forms:
//! - `fn_at(home: &Path, …)`: explicit home, used in tests with `TempDir`
//! - `fn(…)`: derives home from `dirs::home_dir()`, delegates to `_at`
//!
//! Tests must NEVER call the no-arg wrappers; always use `_at`.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{io_err, ConfigError};
use crate::types::DEFAULT_MAX_RETRY;

/// Keys accepted by [`Config::set`], in file order.
pub const CONFIG_KEYS: &[&str] = &[
    "api_key",
    "max_retry",
    "comments_language",
    "channels",
    "model",
    "endpoint",
];

const DEFAULT_COMMENTS_LANGUAGE: &str = "Русский";
const DEFAULT_CHANNELS: u32 = 10;

// ---------------------------------------------------------------------------
// 1. Config document
// ---------------------------------------------------------------------------

/// Contents of `~/.aifmt/config.yaml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Bearer token for the completion endpoint.
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_max_retry")]
    pub max_retry: u32,
    #[serde(default = "default_comments_language")]
    pub comments_language: String,
    /// Reserved; not consumed by the formatter.
    #[serde(default = "default_channels")]
    pub channels: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            max_retry: DEFAULT_MAX_RETRY,
            comments_language: DEFAULT_COMMENTS_LANGUAGE.to_string(),
            channels: DEFAULT_CHANNELS,
            model: None,
            endpoint: None,
        }
    }
}

fn default_max_retry() -> u32 {
    DEFAULT_MAX_RETRY
}

fn default_comments_language() -> String {
    DEFAULT_COMMENTS_LANGUAGE.to_string()
}

fn default_channels() -> u32 {
    DEFAULT_CHANNELS
}

impl Config {
    /// Update one key from its string form.
    ///
    /// An empty value clears the optional keys (`model`, `endpoint`).
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        match key {
            "api_key" => self.api_key = value.trim().to_string(),
            "max_retry" => self.max_retry = parse_u32(key, value)?,
            "comments_language" => self.comments_language = value.to_string(),
            "channels" => self.channels = parse_u32(key, value)?,
            "model" => self.model = non_empty(value),
            "endpoint" => self.endpoint = non_empty(value),
            other => {
                return Err(ConfigError::UnknownKey {
                    key: other.to_string(),
                    known: CONFIG_KEYS.join(", "),
                })
            }
        }
        Ok(())
    }
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value
        .trim()
        .parse::<u32>()
        .map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
            reason: e.to_string(),
        })
}

fn non_empty(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

/// Whether [`load_or_init_at`] found a config file or wrote a fresh one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigOrigin {
    Loaded,
    Created { path: PathBuf },
}

// ---------------------------------------------------------------------------
// 2. Path helpers
// ---------------------------------------------------------------------------

/// `<home>/.aifmt/`. Pure, no I/O.
pub fn config_dir_at(home: &Path) -> PathBuf {
    home.join(".aifmt")
}

/// `<home>/.aifmt/config.yaml`. Pure, no I/O.
pub fn config_path_at(home: &Path) -> PathBuf {
    config_dir_at(home).join("config.yaml")
}

/// `<home>/.aifmt/templates/`. Pure, no I/O.
pub fn templates_dir_at(home: &Path) -> PathBuf {
    config_dir_at(home).join("templates")
}

/// `templates_dir_at` convenience wrapper.
pub fn templates_dir() -> Result<PathBuf, ConfigError> {
    Ok(templates_dir_at(&home()?))
}

// ---------------------------------------------------------------------------
// 3. Load
// ---------------------------------------------------------------------------

/// Load `<home>/.aifmt/config.yaml`.
///
/// Returns `ConfigError::NotFound` if absent,
/// `ConfigError::Parse` (with path + line context) if malformed YAML.
pub fn load_at(home: &Path) -> Result<Config, ConfigError> {
    let path = config_path_at(home);
    if !path.exists() {
        return Err(ConfigError::NotFound { path });
    }
    let contents = std::fs::read_to_string(&path).map_err(|e| io_err(&path, e))?;
    if contents.trim().is_empty() {
        return Ok(Config::default());
    }
    serde_yaml::from_str(&contents).map_err(|e| ConfigError::Parse { path, source: e })
}

/// Load the config, writing a default file first if none exists.
pub fn load_or_init_at(home: &Path) -> Result<(Config, ConfigOrigin), ConfigError> {
    let path = config_path_at(home);
    if path.exists() {
        return Ok((load_at(home)?, ConfigOrigin::Loaded));
    }
    let config = Config::default();
    save_at(home, &config)?;
    Ok((config, ConfigOrigin::Created { path }))
}

/// `load_or_init_at` convenience wrapper.
pub fn load_or_init() -> Result<(Config, ConfigOrigin), ConfigError> {
    load_or_init_at(&home()?)
}

// ---------------------------------------------------------------------------
// 4. Save (atomic)
// ---------------------------------------------------------------------------

/// Atomically save the config to `<home>/.aifmt/config.yaml`.
///
/// Write flow: serialize → `.yaml.tmp` sibling → `chmod 0600` → `rename`.
pub fn save_at(home: &Path, config: &Config) -> Result<(), ConfigError> {
    let dir = config_dir_at(home);
    if !dir.exists() {
        std::fs::create_dir_all(&dir).map_err(|e| io_err(&dir, e))?;
        set_dir_permissions(&dir)?;
    }
    let path = config_path_at(home);
    let tmp_path = path.with_file_name("config.yaml.tmp");

    let yaml = serde_yaml::to_string(config)?;
    std::fs::write(&tmp_path, yaml).map_err(|e| io_err(&tmp_path, e))?;
    set_file_permissions(&tmp_path)?;
    std::fs::rename(&tmp_path, &path).map_err(|e| io_err(&path, e))?;
    Ok(())
}

// ---------------------------------------------------------------------------
// 5. Set
// ---------------------------------------------------------------------------

/// Set one key and persist the result. Creates the file if needed.
pub fn set_value_at(home: &Path, key: &str, value: &str) -> Result<Config, ConfigError> {
    let (mut config, _) = load_or_init_at(home)?;
    config.set(key, value)?;
    save_at(home, &config)?;
    Ok(config)
}

/// `set_value_at` convenience wrapper.
pub fn set_value(key: &str, value: &str) -> Result<Config, ConfigError> {
    set_value_at(&home()?, key, value)
}

// ---------------------------------------------------------------------------
// Private helpers
// ---------------------------------------------------------------------------

fn home() -> Result<PathBuf, ConfigError> {
    dirs::home_dir().ok_or(ConfigError::HomeNotFound)
}

#[cfg(unix)]
fn set_dir_permissions(path: &Path) -> Result<(), ConfigError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o700))
        .map_err(|e| io_err(path, e))
}
#[cfg(not(unix))]
fn set_dir_permissions(_path: &Path) -> Result<(), ConfigError> {
    Ok(())
}

#[cfg(unix)]
fn set_file_permissions(path: &Path) -> Result<(), ConfigError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
        .map_err(|e| io_err(path, e))
}
#[cfg(not(unix))]
fn set_file_permissions(_path: &Path) -> Result<(), ConfigError> {
    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn make_home() -> TempDir {
        TempDir::new().expect("tempdir")
    }

    #[test]
    fn config_path_is_correct() {
        let home = make_home();
        assert!(config_path_at(home.path()).ends_with(".aifmt/config.yaml"));
        assert!(templates_dir_at(home.path()).ends_with(".aifmt/templates"));
    }

    #[test]
    fn load_missing_config_returns_not_found() {
        let home = make_home();
        let err = load_at(home.path()).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound { .. }));
    }

    #[test]
    fn first_load_writes_defaults() {
        let home = make_home();
        let (config, origin) = load_or_init_at(home.path()).expect("init");
        assert_eq!(config, Config::default());
        assert!(matches!(origin, ConfigOrigin::Created { .. }));
        assert!(config_path_at(home.path()).exists());

        let (_, origin) = load_or_init_at(home.path()).expect("reload");
        assert_eq!(origin, ConfigOrigin::Loaded);
    }

    #[test]
    fn defaults_match_original_tool() {
        let config = Config::default();
        assert_eq!(config.max_retry, 5);
        assert_eq!(config.channels, 10);
        assert_eq!(config.comments_language, "Русский");
        assert!(config.api_key.is_empty());
    }

    #[test]
    fn config_file_and_dir_permissions() {
        let home = make_home();
        save_at(home.path(), &Config::default()).expect("save");
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let dir_mode = std::fs::metadata(config_dir_at(home.path()))
                .unwrap()
                .permissions()
                .mode()
                & 0o777;
            let file_mode = std::fs::metadata(config_path_at(home.path()))
                .unwrap()
                .permissions()
                .mode()
                & 0o777;
            assert_eq!(dir_mode, 0o700);
            assert_eq!(file_mode, 0o600);
        }
    }

    #[test]
    fn atomic_write_cleans_up_tmp() {
        let home = make_home();
        save_at(home.path(), &Config::default()).expect("save");
        let tmp = config_path_at(home.path()).with_file_name("config.yaml.tmp");
        assert!(!tmp.exists(), ".tmp must be gone after successful save");
    }

    #[test]
    fn set_value_persists() {
        let home = make_home();
        set_value_at(home.path(), "api_key", "sk-test").expect("set api_key");
        set_value_at(home.path(), "max_retry", "3").expect("set max_retry");
        let loaded = load_at(home.path()).expect("load");
        assert_eq!(loaded.api_key, "sk-test");
        assert_eq!(loaded.max_retry, 3);
    }

    #[test]
    fn set_unknown_key_is_rejected() {
        let mut config = Config::default();
        let err = config.set("api_token", "x").unwrap_err();
        match err {
            ConfigError::UnknownKey { key, known } => {
                assert_eq!(key, "api_token");
                assert!(known.contains("api_key"));
            }
            other => panic!("expected unknown key, got {other:?}"),
        }
    }

    #[test]
    fn set_non_numeric_retry_is_rejected() {
        let mut config = Config::default();
        let err = config.set("max_retry", "many").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn empty_value_clears_optional_key() {
        let mut config = Config::default();
        config.set("model", "openai/gpt-4o").unwrap();
        assert_eq!(config.model.as_deref(), Some("openai/gpt-4o"));
        config.set("model", "").unwrap();
        assert!(config.model.is_none());
    }

    #[test]
    fn partial_file_fills_defaults() {
        let home = make_home();
        let path = config_path_at(home.path());
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "api_key: abc\n").unwrap();
        let config = load_at(home.path()).expect("load");
        assert_eq!(config.api_key, "abc");
        assert_eq!(config.max_retry, 5);
    }

    #[test]
    fn malformed_file_reports_path() {
        let home = make_home();
        let path = config_path_at(home.path());
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "max_retry: [unterminated\n").unwrap();
        let err = load_at(home.path()).unwrap_err();
        match err {
            ConfigError::Parse { path: p, .. } => assert_eq!(p, path),
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn home_not_found_error_message() {
        assert!(ConfigError::HomeNotFound.to_string().contains("home directory"));
    }
}
