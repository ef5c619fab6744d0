//! Locating and loading the `AppConfig` TOML file.
//!
//! An explicit `--config` path wins. Otherwise `tessera/config.toml` in the
//! working directory is tried, then the platform config directory. With no
//! file anywhere the defaults apply: an unseeded generator, the system
//! clock, and date-quote escaping switched on.

use std::{
    fmt, fs,
    path::{Path, PathBuf},
};

use directories::ProjectDirs;
use log::{debug, info};

use tessera::{TesseraError, config::AppConfig};

const LOCAL_CONFIG: &str = "tessera/config.toml";

/// Where the configuration came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    Explicit(PathBuf),
    Local(PathBuf),
    System(PathBuf),
    Default,
}

impl ConfigSource {
    /// Pick the first source that applies, without reading it.
    ///
    /// An explicit path is returned even when it does not exist, so that
    /// [`ConfigSource::load`] can report it.
    pub fn locate(explicit_path: Option<impl AsRef<Path>>) -> Self {
        if let Some(path) = explicit_path {
            return Self::Explicit(path.as_ref().to_path_buf());
        }

        let local = PathBuf::from(LOCAL_CONFIG);
        if local.exists() {
            return Self::Local(local);
        }

        match ProjectDirs::from("com", "tessera", "tessera") {
            Some(dirs) => {
                let system = dirs.config_dir().join("config.toml");
                if system.exists() {
                    return Self::System(system);
                }
                debug!(path = system.display().to_string(); "No system configuration file");
            }
            None => debug!("Platform configuration directory unknown"),
        }

        Self::Default
    }

    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Explicit(path) | Self::Local(path) | Self::System(path) => Some(path),
            Self::Default => None,
        }
    }

    /// Read and deserialize the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`TesseraError::ConfigFile`] when the file is missing,
    /// unreadable or not a valid configuration.
    pub fn load(&self) -> Result<AppConfig, TesseraError> {
        let Some(path) = self.path() else {
            debug!("Using default configuration");
            return Ok(AppConfig::default());
        };
        info!(source = self.to_string(), path = path.display().to_string(); "Loading configuration");

        let file_error = |reason: String| TesseraError::ConfigFile {
            path: path.to_path_buf(),
            reason,
        };
        if !path.exists() {
            return Err(file_error("file not found".to_string()));
        }
        let content = fs::read_to_string(path).map_err(|err| file_error(err.to_string()))?;
        toml::from_str(&content).map_err(|err| file_error(err.message().to_string()))
    }
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Explicit(_) => write!(f, "explicit"),
            Self::Local(_) => write!(f, "local"),
            Self::System(_) => write!(f, "system"),
            Self::Default => write!(f, "default"),
        }
    }
}

/// Locate and load the configuration in one step.
///
/// # Errors
///
/// See [`ConfigSource::load`].
pub fn load_config(explicit_path: Option<impl AsRef<Path>>) -> Result<AppConfig, TesseraError> {
    ConfigSource::locate(explicit_path).load()
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn test_explicit_path_wins() {
        let source = ConfigSource::locate(Some("somewhere/else.toml"));
        assert_eq!(
            source,
            ConfigSource::Explicit(PathBuf::from("somewhere/else.toml"))
        );
        assert_eq!(source.to_string(), "explicit");
    }

    #[test]
    fn test_missing_explicit_file_names_the_path() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("absent.toml");

        let err = ConfigSource::locate(Some(&path))
            .load()
            .expect_err("missing file");
        match err {
            TesseraError::ConfigFile { path: reported, reason } => {
                assert_eq!(reported, path);
                assert_eq!(reason, "file not found");
            }
            other => panic!("expected a config file error, got {other:?}"),
        }
    }

    #[test]
    fn test_invalid_toml_is_a_config_file_error() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("config.toml");
        fs::write(&path, "[evaluation]\nseed = \"seven\"\n").expect("write config");

        let err = load_config(Some(&path)).expect_err("invalid seed");
        assert!(matches!(err, TesseraError::ConfigFile { .. }));
        assert!(err.to_string().contains("config.toml"));
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("config.toml");
        fs::write(&path, "[evaluation]\nseed = 7\n").expect("write config");

        let config = load_config(Some(&path)).expect("valid config");
        assert_eq!(config.evaluation().seed(), Some(7));
        assert!(config.migration().escape_date_quotes());
    }

    #[test]
    fn test_default_source_has_no_path() {
        assert_eq!(ConfigSource::Default.path(), None);
        assert!(ConfigSource::Default.load().is_ok());
    }
}
