//! Engine configuration.
//!
//! Two locations are read:
//! - Global: `~/.keel/config.toml` - user-wide defaults
//! - Workspace: `<meta-dir>/config.toml` - per-workspace overrides
//!
//! Workspace config takes precedence over global config. Command line
//! flags take precedence over both.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

pub const CONFIG_FILE_NAME: &str = "config.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub build: BuildConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct BuildConfig {
    /// Maximum number of actions running at once.
    pub jobs: Option<usize>,

    /// Stop at the first failed action.
    pub fail_fast: Option<bool>,

    /// `human` or `json`.
    pub message_format: Option<String>,
}

/// How build events are reported.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum MessageFormat {
    #[default]
    Human,
    /// One JSON object per event on stdout.
    Json,
}

impl FromStr for MessageFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "human" => Ok(MessageFormat::Human),
            "json" => Ok(MessageFormat::Json),
            other => Err(format!(
                "unknown message format `{}`, expected `human` or `json`",
                other
            )),
        }
    }
}

impl fmt::Display for MessageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageFormat::Human => f.write_str("human"),
            MessageFormat::Json => f.write_str("json"),
        }
    }
}

pub fn global_config_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|b| b.home_dir().join(".keel"))
}

pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join(CONFIG_FILE_NAME))
}

pub fn workspace_config_path(meta_dir: &Path) -> PathBuf {
    meta_dir.join(CONFIG_FILE_NAME)
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("failed to parse config file: {}", path.display()))
    }

    /// Load `path`, falling back to defaults when it is missing or broken.
    pub fn load_or_default(path: &Path) -> Self {
        if path.exists() {
            Self::load(path).unwrap_or_else(|e| {
                tracing::warn!("failed to load config from {}: {:#}", path.display(), e);
                Self::default()
            })
        } else {
            Self::default()
        }
    }

    /// Merge another config into this one (other takes precedence).
    pub fn merge(&mut self, other: Config) {
        if other.build.jobs.is_some() {
            self.build.jobs = other.build.jobs;
        }
        if other.build.fail_fast.is_some() {
            self.build.fail_fast = other.build.fail_fast;
        }
        if other.build.message_format.is_some() {
            self.build.message_format = other.build.message_format;
        }
    }

    pub fn jobs(&self) -> Option<usize> {
        self.build.jobs.filter(|jobs| *jobs > 0)
    }

    pub fn fail_fast(&self) -> bool {
        self.build.fail_fast.unwrap_or(false)
    }

    /// The configured message format. Unknown values fall back to
    /// `human` with a warning.
    pub fn message_format(&self) -> MessageFormat {
        match self.build.message_format.as_deref().map(str::parse) {
            Some(Ok(format)) => format,
            Some(Err(message)) => {
                tracing::warn!("{}", message);
                MessageFormat::Human
            }
            None => MessageFormat::Human,
        }
    }
}

/// Global config overridden by workspace config; either may be absent.
pub fn load_config(global_path: Option<&Path>, workspace_path: &Path) -> Config {
    let mut config = Config::default();

    if let Some(global_path) = global_path {
        config.merge(Config::load_or_default(global_path));
    }
    config.merge(Config::load_or_default(workspace_path));

    config
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert!(config.jobs().is_none());
        assert!(!config.fail_fast());
        assert_eq!(config.message_format(), MessageFormat::Human);
    }

    #[test]
    fn test_config_load() {
        let tmp = TempDir::new().unwrap();
        let config_path = tmp.path().join("config.toml");

        std::fs::write(
            &config_path,
            r#"
[build]
jobs = 8
fail-fast = true
message-format = "json"
"#,
        )
        .unwrap();

        let config = Config::load(&config_path).unwrap();
        assert_eq!(config.jobs(), Some(8));
        assert!(config.fail_fast());
        assert_eq!(config.message_format(), MessageFormat::Json);
    }

    #[test]
    fn test_workspace_overrides_global() {
        let tmp = TempDir::new().unwrap();
        let global = tmp.path().join("global.toml");
        let workspace = tmp.path().join("workspace.toml");
        std::fs::write(&global, "[build]\njobs = 4\nfail-fast = true\n").unwrap();
        std::fs::write(&workspace, "[build]\njobs = 2\n").unwrap();

        let config = load_config(Some(&global), &workspace);
        assert_eq!(config.jobs(), Some(2));
        assert!(config.fail_fast());
    }

    #[test]
    fn test_broken_config_falls_back() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        std::fs::write(&path, "[build\njobs = ").unwrap();

        let config = load_config(None, &path);
        assert!(config.jobs().is_none());
    }

    #[test]
    fn test_zero_jobs_means_default() {
        let mut config = Config::default();
        config.build.jobs = Some(0);
        assert!(config.jobs().is_none());
    }

    #[test]
    fn test_message_format_parse() {
        assert_eq!("json".parse::<MessageFormat>(), Ok(MessageFormat::Json));
        assert!("xml".parse::<MessageFormat>().is_err());
    }
}
