//! XDG-compliant path resolution for shelver.

use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

/// Errors from path resolution.
#[derive(Debug, Error, Diagnostic)]
pub enum PathError {
    #[error("cannot determine home directory")]
    #[diagnostic(
        code(shelver::paths::no_home),
        help("Set the HOME environment variable, or pass --config explicitly.")
    )]
    NoHome,
}

pub type PathResult<T> = std::result::Result<T, PathError>;

/// Global XDG-compliant directories for shelver.
#[derive(Debug, Clone)]
pub struct ShelverPaths {
    /// `$XDG_CONFIG_HOME/shelver/`
    pub config_dir: PathBuf,
}

impl ShelverPaths {
    /// Resolve XDG directories from environment variables with standard fallbacks.
    pub fn resolve() -> PathResult<Self> {
        let home = std::env::var("HOME")
            .map(PathBuf::from)
            .map_err(|_| PathError::NoHome)?;
        Ok(Self::from_env(home, std::env::var("XDG_CONFIG_HOME").ok()))
    }

    fn from_env(home: PathBuf, config_home: Option<String>) -> Self {
        let config_dir = config_home
            .map(PathBuf::from)
            .unwrap_or_else(|| home.join(".config"))
            .join("shelver");
        Self { config_dir }
    }

    /// `config.toml` in the config directory.
    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join("config.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallbacks_under_home() {
        let paths = ShelverPaths::from_env(PathBuf::from("/home/u"), None);
        assert_eq!(paths.config_dir, PathBuf::from("/home/u/.config/shelver"));
        assert_eq!(
            paths.config_file(),
            PathBuf::from("/home/u/.config/shelver/config.toml")
        );
    }

    #[test]
    fn xdg_overrides() {
        let paths = ShelverPaths::from_env(PathBuf::from("/home/u"), Some("/cfg".into()));
        assert_eq!(paths.config_dir, PathBuf::from("/cfg/shelver"));
    }
}
