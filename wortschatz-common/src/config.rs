//! Configuration loading
//!
//! Settings are resolved once at startup in priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default (fallback)
//!
//! The binary's argument parser covers (1) and (2) and hands the result over
//! as [`ConfigOverrides`]; this module merges in the TOML file and defaults.

use crate::{Error, Result};
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};

pub const DEFAULT_PORT: u16 = 5000;
pub const DEFAULT_DATA_DIR: &str = "data";
pub const DEFAULT_BRANCH: &str = "main";
pub const DEFAULT_REMOTE_PATH: &str = "data/progress.json";
pub const DEFAULT_API_BASE: &str = "https://api.github.com";
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_SECRET_KEY: &str = "wortschatz-dev-secret";

/// Bootstrap configuration file contents
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlConfig {
    /// Directory holding verbs.csv, nouns.csv and progress.json
    #[serde(default)]
    pub data_dir: Option<PathBuf>,

    /// HTTP listen port
    #[serde(default)]
    pub port: Option<u16>,

    #[serde(default)]
    pub secret_key: Option<String>,

    #[serde(default)]
    pub logging: LoggingConfig,

    /// Remote progress mirror (GitHub contents API)
    #[serde(default)]
    pub mirror: TomlMirrorConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level or filter directive (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlMirrorConfig {
    pub token: Option<String>,
    pub repository: Option<String>,
    pub branch: Option<String>,
    pub path: Option<String>,
    pub api_base: Option<String>,
    pub max_attempts: Option<u32>,
    pub timeout_secs: Option<u64>,
}

/// Values taken from the command line or environment
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub data_dir: Option<PathBuf>,
    pub port: Option<u16>,
    pub secret_key: Option<String>,
    pub github_token: Option<String>,
    pub github_repo: Option<String>,
    pub github_branch: Option<String>,
}

/// Remote progress mirror settings; present only when a token is configured
#[derive(Clone)]
pub struct MirrorConfig {
    pub token: String,
    /// `owner/name`
    pub repository: String,
    pub branch: String,
    /// Path of the progress document inside the repository
    pub path: String,
    pub api_base: String,
    /// Upload attempts before a revision conflict is given up on
    pub max_attempts: u32,
    pub timeout_secs: u64,
}

impl fmt::Debug for MirrorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MirrorConfig")
            .field("token", &"<redacted>")
            .field("repository", &self.repository)
            .field("branch", &self.branch)
            .field("path", &self.path)
            .field("api_base", &self.api_base)
            .field("max_attempts", &self.max_attempts)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

/// Fully resolved application configuration
#[derive(Clone)]
pub struct AppConfig {
    pub data_dir: PathBuf,
    pub port: u16,
    /// Session signing key; carried for completeness, not used functionally
    pub secret_key: String,
    pub log_level: String,
    pub mirror: Option<MirrorConfig>,
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("data_dir", &self.data_dir)
            .field("port", &self.port)
            .field("secret_key", &"<redacted>")
            .field("log_level", &self.log_level)
            .field("mirror", &self.mirror)
            .finish()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            port: DEFAULT_PORT,
            secret_key: DEFAULT_SECRET_KEY.to_string(),
            log_level: default_log_level(),
            mirror: None,
        }
    }
}

impl AppConfig {
    /// Merge overrides over the TOML file over compiled defaults
    pub fn resolve(overrides: ConfigOverrides, toml: TomlConfig) -> Result<Self> {
        let mirror_toml = toml.mirror;

        let token = overrides
            .github_token
            .or(mirror_toml.token)
            .filter(|t| !t.trim().is_empty());

        let mirror = match token {
            Some(token) => {
                let repository = overrides
                    .github_repo
                    .or(mirror_toml.repository)
                    .ok_or_else(|| {
                        Error::Config(
                            "A GitHub token is set but no repository (GITHUB_REPO) is configured"
                                .to_string(),
                        )
                    })?;
                if !repository.contains('/') {
                    return Err(Error::Config(format!(
                        "Repository must be in owner/name form, got '{}'",
                        repository
                    )));
                }

                let max_attempts = mirror_toml.max_attempts.unwrap_or(DEFAULT_MAX_ATTEMPTS);
                if max_attempts == 0 {
                    return Err(Error::Config("mirror.max_attempts must be at least 1".to_string()));
                }

                Some(MirrorConfig {
                    token,
                    repository,
                    branch: overrides
                        .github_branch
                        .or(mirror_toml.branch)
                        .unwrap_or_else(|| DEFAULT_BRANCH.to_string()),
                    path: mirror_toml
                        .path
                        .unwrap_or_else(|| DEFAULT_REMOTE_PATH.to_string()),
                    api_base: mirror_toml
                        .api_base
                        .unwrap_or_else(|| DEFAULT_API_BASE.to_string())
                        .trim_end_matches('/')
                        .to_string(),
                    max_attempts,
                    timeout_secs: mirror_toml.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS),
                })
            }
            None => None,
        };

        Ok(Self {
            data_dir: overrides
                .data_dir
                .or(toml.data_dir)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR)),
            port: overrides.port.or(toml.port).unwrap_or(DEFAULT_PORT),
            secret_key: overrides
                .secret_key
                .or(toml.secret_key)
                .unwrap_or_else(|| DEFAULT_SECRET_KEY.to_string()),
            log_level: toml.logging.level,
            mirror,
        })
    }

    /// Local cache of the progress document
    pub fn progress_cache_path(&self) -> PathBuf {
        self.data_dir.join("progress.json")
    }
}

/// Load the TOML config file
///
/// An explicit path must exist. Without one the platform config file
/// (`~/.config/wortschatz/config.toml` on Linux) is used if present,
/// otherwise an empty configuration.
pub fn load_toml_config(explicit: Option<&Path>) -> Result<TomlConfig> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => match default_config_path() {
            Some(path) if path.exists() => path,
            _ => return Ok(TomlConfig::default()),
        },
    };

    let content = std::fs::read_to_string(&path)
        .map_err(|e| Error::Config(format!("Failed to read {}: {}", path.display(), e)))?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Failed to parse {}: {}", path.display(), e)))
}

/// Platform config file location
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("wortschatz").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.port, 5000);
        assert_eq!(config.data_dir, PathBuf::from("data"));
        assert_eq!(config.progress_cache_path(), PathBuf::from("data/progress.json"));
        assert!(config.mirror.is_none());
    }

    #[test]
    fn test_overrides_beat_toml() {
        let toml: TomlConfig = toml::from_str(
            r#"
            data_dir = "/srv/words"
            port = 8080

            [mirror]
            token = "from-file"
            repository = "someone/words"
            "#,
        )
        .unwrap();
        let overrides = ConfigOverrides {
            port: Some(9000),
            github_token: Some("from-env".to_string()),
            ..Default::default()
        };

        let config = AppConfig::resolve(overrides, toml).unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.data_dir, PathBuf::from("/srv/words"));

        let mirror = config.mirror.unwrap();
        assert_eq!(mirror.token, "from-env");
        assert_eq!(mirror.repository, "someone/words");
        assert_eq!(mirror.branch, "main");
        assert_eq!(mirror.path, "data/progress.json");
        assert_eq!(mirror.max_attempts, 3);
    }

    #[test]
    fn test_token_without_repository_is_rejected() {
        let overrides = ConfigOverrides {
            github_token: Some("abc".to_string()),
            ..Default::default()
        };
        let err = AppConfig::resolve(overrides, TomlConfig::default()).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_blank_token_disables_mirror() {
        let overrides = ConfigOverrides {
            github_token: Some("  ".to_string()),
            ..Default::default()
        };
        let config = AppConfig::resolve(overrides, TomlConfig::default()).unwrap();
        assert!(config.mirror.is_none());
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let overrides = ConfigOverrides {
            secret_key: Some("hunter2".to_string()),
            github_token: Some("ghp_secret".to_string()),
            github_repo: Some("a/b".to_string()),
            ..Default::default()
        };
        let config = AppConfig::resolve(overrides, TomlConfig::default()).unwrap();
        let printed = format!("{:?}", config);
        assert!(!printed.contains("hunter2"));
        assert!(!printed.contains("ghp_secret"));
    }

    #[test]
    fn test_load_explicit_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(&path, "port = 7000\n[logging]\nlevel = \"debug\"\n").unwrap();

        let toml = load_toml_config(Some(&path)).unwrap();
        assert_eq!(toml.port, Some(7000));
        assert_eq!(toml.logging.level, "debug");
    }

    #[test]
    fn test_load_missing_explicit_file_fails() {
        let temp_dir = TempDir::new().unwrap();
        let result = load_toml_config(Some(&temp_dir.path().join("nope.toml")));
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
