//! Optional YAML defaults file.
//!
//! Looked up at `$DBSAFE_CONFIG`, `./.dbsafe.yaml`, then `~/.dbsafe.yaml`.
//! CLI flags always win over the file; the file wins over built-in
//! defaults. A missing file is not an error.

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::Deserialize;

/// Environment variable overriding the config file location.
const CONFIG_ENV: &str = "DBSAFE_CONFIG";
/// File name searched in the working directory and home directory.
const CONFIG_FILE_NAME: &str = ".dbsafe.yaml";

/// Contents of the defaults file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    /// Connection defaults.
    #[serde(default)]
    pub connection: ConnectionDefaults,

    /// Default batch size for chunked execution scripts.
    #[serde(default)]
    pub chunk_size: Option<u64>,
}

/// Connection defaults section.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConnectionDefaults {
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub socket: Option<PathBuf>,
    #[serde(default)]
    pub database: Option<String>,
    #[serde(default)]
    pub tls: Option<String>,
    #[serde(default)]
    pub tls_ca: Option<PathBuf>,
}

/// Loads the first config file found, or defaults when there is none.
pub fn load() -> Result<FileConfig> {
    let Some(path) = find_config_file() else {
        return Ok(FileConfig::default());
    };
    let contents = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    let config: FileConfig = serde_yaml::from_str(&contents)
        .with_context(|| format!("failed to parse config file {}", path.display()))?;
    tracing::debug!(path = %path.display(), "loaded config file");
    Ok(config)
}

fn find_config_file() -> Option<PathBuf> {
    if let Some(env_path) = std::env::var_os(CONFIG_ENV) {
        let p = PathBuf::from(env_path);
        if p.is_file() {
            return Some(p);
        }
    }
    let local = PathBuf::from(CONFIG_FILE_NAME);
    if local.is_file() {
        return Some(local);
    }
    if let Some(home) = std::env::var_os("HOME") {
        let p = PathBuf::from(home).join(CONFIG_FILE_NAME);
        if p.is_file() {
            return Some(p);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_config() {
        let yaml = "
connection:
  host: db.internal
  port: 3307
  user: migrator
  database: app
  tls: required
chunk_size: 5000
";
        let config: FileConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.connection.host.as_deref(), Some("db.internal"));
        assert_eq!(config.connection.port, Some(3307));
        assert_eq!(config.connection.tls.as_deref(), Some("required"));
        assert_eq!(config.chunk_size, Some(5000));
    }

    #[test]
    fn empty_config_is_all_defaults() {
        let config: FileConfig = serde_yaml::from_str("{}").unwrap();
        assert!(config.connection.host.is_none());
        assert!(config.chunk_size.is_none());
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(serde_yaml::from_str::<FileConfig>("chunksize: 10").is_err());
    }
}
