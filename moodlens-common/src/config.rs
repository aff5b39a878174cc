//! Configuration loading and root folder resolution

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// OAuth application credentials for one platform
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlatformCredentials {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub redirect_uri: Option<String>,
}

/// Logging section of the TOML config
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// EnvFilter directive, e.g. "moodlens_pa=debug,tower_http=debug"
    pub filter: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { filter: None }
    }
}

/// TOML configuration file contents
///
/// Lowest-priority configuration tier; database settings and environment
/// variables override these values.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Root folder for the database and other durable state
    pub root_folder: Option<String>,
    /// Frontend base URL for OAuth callback redirects
    pub frontend_url: Option<String>,
    /// Base URL of the external per-item analysis service
    pub analysis_service_url: Option<String>,
    #[serde(default)]
    pub spotify: PlatformCredentials,
    #[serde(default)]
    pub youtube: PlatformCredentials,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Load the TOML config from the given path, or defaults if it is absent
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    if !path.exists() {
        return Ok(TomlConfig::default());
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read TOML failed: {}", e)))?;
    toml::from_str(&content).map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))
}

/// Write the TOML config, creating parent directories as needed
///
/// Writes to a temp file in the same directory then renames, so readers
/// never observe a half-written config.
pub fn write_toml_config(config: &TomlConfig, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config)
        .map_err(|e| Error::Config(format!("Serialize TOML failed: {}", e)))?;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let tmp = path.with_extension("toml.tmp");
    std::fs::write(&tmp, content)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}

/// Default config file path for the platform (~/.config/moodlens/config.toml)
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .map(|d| d.join("moodlens").join("config.toml"))
        .unwrap_or_else(|| PathBuf::from("./moodlens-config.toml"))
}

/// Root folder resolution priority order:
/// 1. Command-line argument (highest priority)
/// 2. Environment variable
/// 3. TOML config file
/// 4. OS-dependent compiled default (fallback)
pub fn resolve_root_folder(
    cli_arg: Option<&str>,
    env_var_name: &str,
    toml_config: &TomlConfig,
) -> PathBuf {
    if let Some(path) = cli_arg {
        return PathBuf::from(path);
    }

    if let Ok(path) = std::env::var(env_var_name) {
        return PathBuf::from(path);
    }

    if let Some(path) = &toml_config.root_folder {
        return PathBuf::from(path);
    }

    get_default_root_folder()
}

/// Get OS-dependent default root folder path
fn get_default_root_folder() -> PathBuf {
    if cfg!(target_os = "linux") {
        dirs::data_local_dir()
            .map(|d| d.join("moodlens"))
            .unwrap_or_else(|| PathBuf::from("/var/lib/moodlens"))
    } else if cfg!(target_os = "macos") {
        dirs::data_dir()
            .map(|d| d.join("moodlens"))
            .unwrap_or_else(|| PathBuf::from("/Library/Application Support/moodlens"))
    } else if cfg!(target_os = "windows") {
        dirs::data_local_dir()
            .map(|d| d.join("moodlens"))
            .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\moodlens"))
    } else {
        PathBuf::from("./moodlens_data")
    }
}

/// Ensure the root folder directory exists, and return the database path
pub fn prepare_root_folder(root_folder: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(root_folder)?;
    Ok(root_folder.join("moodlens.db"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_toml_yields_defaults() {
        let config = load_toml_config(Path::new("/nonexistent/moodlens.toml")).unwrap();
        assert!(config.frontend_url.is_none());
        assert!(config.spotify.client_id.is_none());
    }

    #[test]
    fn toml_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = TomlConfig::default();
        config.frontend_url = Some("http://localhost:3000".into());
        config.spotify.client_id = Some("abc123".into());

        write_toml_config(&config, &path).unwrap();
        let loaded = load_toml_config(&path).unwrap();

        assert_eq!(loaded.frontend_url.as_deref(), Some("http://localhost:3000"));
        assert_eq!(loaded.spotify.client_id.as_deref(), Some("abc123"));
        assert!(loaded.youtube.client_id.is_none());
    }

    #[test]
    fn cli_arg_wins_root_folder() {
        let mut config = TomlConfig::default();
        config.root_folder = Some("/from/toml".into());

        let resolved = resolve_root_folder(
            Some("/from/cli"),
            "MOODLENS_TEST_UNSET_ROOT_FOLDER",
            &config,
        );
        assert_eq!(resolved, PathBuf::from("/from/cli"));
    }

    #[test]
    fn toml_used_when_cli_and_env_absent() {
        let mut config = TomlConfig::default();
        config.root_folder = Some("/from/toml".into());

        let resolved =
            resolve_root_folder(None, "MOODLENS_TEST_UNSET_ROOT_FOLDER", &config);
        assert_eq!(resolved, PathBuf::from("/from/toml"));
    }

    #[test]
    fn prepare_root_folder_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("nested").join("root");

        let db_path = prepare_root_folder(&root).unwrap();
        assert!(root.is_dir());
        assert_eq!(db_path, root.join("moodlens.db"));
    }
}
