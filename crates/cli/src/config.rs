//! Startup configuration
//!
//! Settings come from an optional TOML file and from command line
//! arguments; arguments win. Validation happens once, before logging is set
//! up or any pass runs.

use anyhow::{Context, Result};
use mirror_core::SyncError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Settings as read from a config file; every key is optional
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigFile {
    pub source: Option<PathBuf>,
    pub replica: Option<PathBuf>,
    pub interval_secs: Option<u64>,
    pub log_file: Option<PathBuf>,
}

impl ConfigFile {
    /// Load from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let parsed: ConfigFile = toml::from_str(&text)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        Ok(parsed)
    }

    /// Fill unset keys from `fallback`
    pub fn or(self, fallback: ConfigFile) -> ConfigFile {
        ConfigFile {
            source: self.source.or(fallback.source),
            replica: self.replica.or(fallback.replica),
            interval_secs: self.interval_secs.or(fallback.interval_secs),
            log_file: self.log_file.or(fallback.log_file),
        }
    }
}

/// Validated synchronization settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncConfig {
    pub source: PathBuf,
    pub replica: PathBuf,
    pub interval_secs: u64,
    pub log_file: PathBuf,
}

impl SyncConfig {
    /// Check presence and sanity of every setting
    pub fn from_layers(layers: ConfigFile) -> Result<Self, SyncError> {
        let source = layers.source.ok_or_else(|| missing("source folder"))?;
        let replica = layers.replica.ok_or_else(|| missing("replica folder"))?;
        let interval_secs = layers
            .interval_secs
            .ok_or_else(|| missing("synchronization interval"))?;
        let log_file = layers.log_file.ok_or_else(|| missing("log file path"))?;

        let config = SyncConfig {
            source,
            replica,
            interval_secs,
            log_file,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), SyncError> {
        if !self.source.is_dir() {
            return Err(SyncError::Configuration(format!(
                "Source folder does not exist or is not a directory: {}",
                self.source.display()
            )));
        }
        if self.interval_secs == 0 {
            return Err(SyncError::Configuration(
                "Synchronization interval must be a positive number of seconds".to_string(),
            ));
        }
        if self.log_file.as_os_str().is_empty() || self.log_file.file_name().is_none() {
            return Err(SyncError::Configuration(format!(
                "Log file path must name a file: {}",
                self.log_file.display()
            )));
        }
        if self.log_file.is_dir() {
            return Err(SyncError::Configuration(format!(
                "Log file path is a directory: {}",
                self.log_file.display()
            )));
        }
        Ok(())
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    /// The replica root will be created by the first pass
    pub fn replica_missing(&self) -> bool {
        !self.replica.is_dir()
    }
}

fn missing(what: &str) -> SyncError {
    SyncError::Configuration(format!("No {} given (argument or config file)", what))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn layers(dir: &Path) -> ConfigFile {
        ConfigFile {
            source: Some(dir.to_path_buf()),
            replica: Some(dir.join("replica")),
            interval_secs: Some(60),
            log_file: Some(dir.join("sync.log")),
        }
    }

    #[test]
    fn test_valid_config() {
        let temp_dir = TempDir::new().unwrap();
        let config = SyncConfig::from_layers(layers(temp_dir.path())).unwrap();
        assert_eq!(config.interval(), Duration::from_secs(60));
        assert!(config.replica_missing());
    }

    #[test]
    fn test_missing_source_dir_is_configuration_error() {
        let temp_dir = TempDir::new().unwrap();
        let mut l = layers(temp_dir.path());
        l.source = Some(temp_dir.path().join("nope"));

        let err = SyncConfig::from_layers(l).unwrap_err();
        assert!(matches!(err, SyncError::Configuration(_)));
        assert!(err.to_string().contains("nope"));
    }

    #[test]
    fn test_zero_interval_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let mut l = layers(temp_dir.path());
        l.interval_secs = Some(0);
        assert!(SyncConfig::from_layers(l).is_err());
    }

    #[test]
    fn test_log_file_must_not_be_directory() {
        let temp_dir = TempDir::new().unwrap();
        let mut l = layers(temp_dir.path());
        l.log_file = Some(temp_dir.path().to_path_buf());
        assert!(SyncConfig::from_layers(l).is_err());
    }

    #[test]
    fn test_missing_value_named_in_error() {
        let err = SyncConfig::from_layers(ConfigFile::default()).unwrap_err();
        assert!(err.to_string().contains("source folder"));
    }

    #[test]
    fn test_arguments_override_file() {
        let from_file = ConfigFile {
            source: Some("/file/source".into()),
            replica: Some("/file/replica".into()),
            interval_secs: Some(10),
            log_file: None,
        };
        let from_args = ConfigFile {
            replica: Some("/args/replica".into()),
            ..ConfigFile::default()
        };

        let merged = from_args.or(from_file);
        assert_eq!(merged.source, Some(PathBuf::from("/file/source")));
        assert_eq!(merged.replica, Some(PathBuf::from("/args/replica")));
        assert_eq!(merged.interval_secs, Some(10));
        assert_eq!(merged.log_file, None);
    }

    #[test]
    fn test_load_toml_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("foldersync.toml");
        std::fs::write(
            &path,
            "source = \"/data/src\"\nreplica = \"/data/dst\"\ninterval_secs = 30\n",
        )
        .unwrap();

        let loaded = ConfigFile::load(&path).unwrap();
        assert_eq!(loaded.source, Some(PathBuf::from("/data/src")));
        assert_eq!(loaded.interval_secs, Some(30));
        assert_eq!(loaded.log_file, None);
    }

    #[test]
    fn test_unknown_keys_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("bad.toml");
        std::fs::write(&path, "sauce = \"/typo\"\n").unwrap();
        assert!(ConfigFile::load(&path).is_err());
    }
}
