use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Default API root of the remote plant store.
pub const DEFAULT_SERVER_URL: &str = "http://localhost:5000/api";

/// Source of a configuration value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigSource {
    Default,
    File,
    Environment,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigSource::Default => write!(f, "default"),
            ConfigSource::File => write!(f, "file"),
            ConfigSource::Environment => write!(f, "environment"),
        }
    }
}

/// A configuration value with its source
#[derive(Debug, Clone, Serialize)]
pub struct ConfigValue<T> {
    pub value: T,
    pub source: ConfigSource,
}

impl<T> ConfigValue<T> {
    pub fn new(value: T, source: ConfigSource) -> Self {
        Self { value, source }
    }
}

/// Application configuration with source tracking
#[derive(Debug, Clone, Serialize)]
pub struct Config {
    /// Directory holding the local plant cache
    pub data_dir: ConfigValue<PathBuf>,
    /// API root of the remote plant store
    pub server_url: ConfigValue<String>,
    /// Refresh from the remote store before each plant command
    pub auto_sync: ConfigValue<bool>,
    /// Give up on remote requests after this many seconds (unset: never)
    pub request_timeout_secs: ConfigValue<Option<u64>>,
    /// Config file path used (if any)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_file: Option<PathBuf>,
}

/// Internal struct for deserializing config file
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct ConfigFile {
    data_dir: Option<PathBuf>,
    server_url: Option<String>,
    auto_sync: Option<bool>,
    request_timeout_secs: Option<u64>,
}

impl Config {
    /// Load configuration with priority: env vars > config file > defaults
    pub fn load(config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        // Start with defaults
        let mut data_dir = ConfigValue::new(Self::default_data_dir(), ConfigSource::Default);
        let mut server_url =
            ConfigValue::new(DEFAULT_SERVER_URL.to_string(), ConfigSource::Default);
        let mut auto_sync = ConfigValue::new(true, ConfigSource::Default);
        let mut request_timeout_secs = ConfigValue::new(None, ConfigSource::Default);
        let mut config_file = None;

        // Try to load from config file
        let path = config_path.unwrap_or_else(Self::default_config_path);
        if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .map_err(|e| ConfigError::ReadError(path.clone(), e))?;
            let file_config: ConfigFile = serde_yaml::from_str(&contents)
                .map_err(|e| ConfigError::ParseError(path.clone(), e))?;

            config_file = Some(path.clone());

            if let Some(dir) = file_config.data_dir {
                // Resolve relative paths against config file's directory
                let resolved = if dir.is_relative() {
                    path.parent().map(|p| p.join(&dir)).unwrap_or(dir)
                } else {
                    dir
                };
                data_dir = ConfigValue::new(resolved, ConfigSource::File);
            }
            if let Some(url) = file_config.server_url {
                server_url = ConfigValue::new(url, ConfigSource::File);
            }
            if let Some(enabled) = file_config.auto_sync {
                auto_sync = ConfigValue::new(enabled, ConfigSource::File);
            }
            if let Some(secs) = file_config.request_timeout_secs {
                request_timeout_secs = ConfigValue::new(Some(secs), ConfigSource::File);
            }
        }

        // Apply environment variable overrides
        if let Ok(dir) = std::env::var("PLANTA_DATA_DIR") {
            data_dir = ConfigValue::new(PathBuf::from(dir), ConfigSource::Environment);
        }
        if let Ok(url) = std::env::var("PLANTA_SERVER_URL") {
            server_url = ConfigValue::new(url, ConfigSource::Environment);
        }
        if let Ok(value) = std::env::var("PLANTA_AUTO_SYNC") {
            let enabled = parse_bool(&value)
                .ok_or_else(|| ConfigError::InvalidEnv("PLANTA_AUTO_SYNC", value.clone()))?;
            auto_sync = ConfigValue::new(enabled, ConfigSource::Environment);
        }
        if let Ok(value) = std::env::var("PLANTA_REQUEST_TIMEOUT") {
            let secs = value
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidEnv("PLANTA_REQUEST_TIMEOUT", value.clone()))?;
            request_timeout_secs = ConfigValue::new(Some(secs), ConfigSource::Environment);
        }

        Ok(Self {
            data_dir,
            server_url,
            auto_sync,
            request_timeout_secs,
            config_file,
        })
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.value.map(Duration::from_secs)
    }

    /// Default config directory (platform-specific):
    /// - Linux: ~/.config/planta/
    /// - macOS: ~/Library/Application Support/planta/
    /// - Windows: %APPDATA%/planta/
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("planta")
    }

    /// Default data directory (platform-specific):
    /// - Linux: ~/.local/share/planta/
    /// - macOS: ~/Library/Application Support/planta/
    /// - Windows: %APPDATA%/planta/
    pub fn default_data_dir() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("planta")
    }

    /// Default config file path (platform-specific config dir + config.yaml)
    pub fn default_config_path() -> PathBuf {
        Self::default_config_dir().join("config.yaml")
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[derive(Debug)]
pub enum ConfigError {
    ReadError(PathBuf, std::io::Error),
    ParseError(PathBuf, serde_yaml::Error),
    InvalidEnv(&'static str, String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::ReadError(path, e) => {
                write!(f, "Failed to read config file '{}': {}", path.display(), e)
            }
            ConfigError::ParseError(path, e) => {
                write!(f, "Failed to parse config file '{}': {}", path.display(), e)
            }
            ConfigError::InvalidEnv(name, value) => {
                write!(f, "Invalid value for {}: '{}'", name, value)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("nonexistent.yaml");

        let config = Config::load(Some(config_path)).unwrap();
        assert!(config.data_dir.value.ends_with("planta"));
        assert_eq!(config.data_dir.source, ConfigSource::Default);
        assert_eq!(config.server_url.value, DEFAULT_SERVER_URL);
        assert!(config.auto_sync.value);
        assert!(config.request_timeout().is_none());
        assert!(config.config_file.is_none());
    }

    #[test]
    fn test_load_from_file() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("config.yaml");

        let mut file = std::fs::File::create(&config_path).unwrap();
        writeln!(file, "data_dir: /custom/plants").unwrap();
        writeln!(file, "server_url: http://plants.local:8080/api").unwrap();
        writeln!(file, "auto_sync: false").unwrap();
        writeln!(file, "request_timeout_secs: 5").unwrap();

        let config = Config::load(Some(config_path.clone())).unwrap();
        assert_eq!(config.data_dir.value, PathBuf::from("/custom/plants"));
        assert_eq!(config.data_dir.source, ConfigSource::File);
        assert_eq!(config.server_url.value, "http://plants.local:8080/api");
        assert!(!config.auto_sync.value);
        assert_eq!(config.request_timeout(), Some(Duration::from_secs(5)));
        assert_eq!(config.config_file, Some(config_path));
    }

    #[test]
    fn test_relative_data_dir_resolves_against_config_file() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("config.yaml");

        let mut file = std::fs::File::create(&config_path).unwrap();
        writeln!(file, "data_dir: data").unwrap();

        let config = Config::load(Some(config_path)).unwrap();
        assert_eq!(config.data_dir.value, temp_dir.path().join("data"));
    }

    #[test]
    #[ignore] // Run with --ignored; env vars can pollute parallel tests
    fn test_env_var_overrides_file() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("config.yaml");

        let mut file = std::fs::File::create(&config_path).unwrap();
        writeln!(file, "server_url: http://fromfile/api").unwrap();

        std::env::set_var("PLANTA_SERVER_URL", "http://fromenv/api");

        let config = Config::load(Some(config_path)).unwrap();
        assert_eq!(config.server_url.value, "http://fromenv/api");
        assert_eq!(config.server_url.source, ConfigSource::Environment);

        std::env::remove_var("PLANTA_SERVER_URL");
    }

    #[test]
    fn test_invalid_yaml_error() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("config.yaml");

        let mut file = std::fs::File::create(&config_path).unwrap();
        writeln!(file, "invalid: yaml: content: [").unwrap();

        let result = Config::load(Some(config_path));
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }

    #[test]
    fn test_partial_file_config() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("config.yaml");

        let mut file = std::fs::File::create(&config_path).unwrap();
        writeln!(file, "auto_sync: false").unwrap();

        let config = Config::load(Some(config_path)).unwrap();
        assert_eq!(config.server_url.source, ConfigSource::Default);
        assert_eq!(config.auto_sync.source, ConfigSource::File);
    }

    #[test]
    fn test_parse_bool() {
        assert_eq!(parse_bool("TRUE"), Some(true));
        assert_eq!(parse_bool(" off "), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }
}
