//! Organizer configuration, persisted as TOML.
//!
//! Every field has a default, so a missing file or a partial file both work.
//! The API key is deliberately not part of the file.

use std::path::{Path, PathBuf};

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::llm::CompletionConfig;

/// Errors from configuration operations.
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("failed to read config: {path}")]
    #[diagnostic(
        code(shelver::config::read),
        help("Ensure the config file exists and is readable.")
    )]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {path}")]
    #[diagnostic(
        code(shelver::config::parse),
        help("Check the TOML syntax in the config file. {message}")
    )]
    Parse { path: String, message: String },

    #[error("failed to write config: {path}")]
    #[diagnostic(
        code(shelver::config::write),
        help("Ensure you have write permissions to the config directory.")
    )]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Organizer configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganizerConfig {
    /// Chat-completions endpoint.
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// Model identifier.
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_read_timeout_secs")]
    pub read_timeout_secs: u64,
    /// Extension of the documents to organize, without the dot.
    #[serde(default = "default_extension")]
    pub extension: String,
    /// Run log, appended every run and replayed on start. Relative paths are
    /// resolved against the working directory.
    #[serde(default = "default_log_file")]
    pub log_file: PathBuf,
    /// `HTTP-Referer` header.
    #[serde(default = "default_referer")]
    pub referer: String,
    /// `X-Title` header.
    #[serde(default = "default_app_title")]
    pub app_title: String,
}

fn default_api_url() -> String {
    CompletionConfig::default().api_url
}
fn default_model() -> String {
    CompletionConfig::default().model
}
fn default_connect_timeout_secs() -> u64 {
    CompletionConfig::default().connect_timeout_secs
}
fn default_read_timeout_secs() -> u64 {
    CompletionConfig::default().read_timeout_secs
}
fn default_extension() -> String {
    "pdf".into()
}
fn default_log_file() -> PathBuf {
    PathBuf::from("bibliography_organizer.log")
}
fn default_referer() -> String {
    CompletionConfig::default().referer
}
fn default_app_title() -> String {
    CompletionConfig::default().app_title
}

impl Default for OrganizerConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            model: default_model(),
            connect_timeout_secs: default_connect_timeout_secs(),
            read_timeout_secs: default_read_timeout_secs(),
            extension: default_extension(),
            log_file: default_log_file(),
            referer: default_referer(),
            app_title: default_app_title(),
        }
    }
}

impl OrganizerConfig {
    /// Settings for the HTTP completion client.
    pub fn completion_config(&self) -> CompletionConfig {
        CompletionConfig {
            api_url: self.api_url.clone(),
            model: self.model.clone(),
            connect_timeout_secs: self.connect_timeout_secs,
            read_timeout_secs: self.read_timeout_secs,
            referer: self.referer.clone(),
            app_title: self.app_title.clone(),
        }
    }

    /// Load from a TOML file.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            source: e,
        })?;
        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    /// Load from a TOML file, or defaults when it does not exist.
    pub fn load_or_default(path: &Path) -> ConfigResult<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Save to a TOML file.
    pub fn save(&self, path: &Path) -> ConfigResult<()> {
        let content = toml::to_string_pretty(self).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::Write {
                path: parent.display().to_string(),
                source: e,
            })?;
        }
        std::fs::write(path, content).map_err(|e| ConfigError::Write {
            path: path.display().to_string(),
            source: e,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_fills_defaults() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "model = \"local/llama\"\nread_timeout_secs = 90\n").unwrap();

        let config = OrganizerConfig::load(&path).unwrap();
        assert_eq!(config.model, "local/llama");
        assert_eq!(config.read_timeout_secs, 90);
        assert_eq!(config.connect_timeout_secs, 15);
        assert_eq!(config.extension, "pdf");
        assert_eq!(config.log_file, PathBuf::from("bibliography_organizer.log"));
    }

    #[test]
    fn save_and_reload() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("nested/config.toml");
        let config = OrganizerConfig {
            extension: "djvu".into(),
            ..Default::default()
        };
        config.save(&path).unwrap();
        assert_eq!(OrganizerConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn missing_file_is_default() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = OrganizerConfig::load_or_default(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, OrganizerConfig::default());
    }

    #[test]
    fn invalid_toml_is_a_parse_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "model = [").unwrap();
        assert!(matches!(
            OrganizerConfig::load(&path),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn completion_config_mirrors_fields() {
        let config = OrganizerConfig {
            api_url: "http://localhost:8080/v1/chat/completions".into(),
            ..Default::default()
        };
        let completion = config.completion_config();
        assert_eq!(completion.api_url, config.api_url);
        assert_eq!(completion.model, config.model);
    }
}
