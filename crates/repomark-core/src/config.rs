use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::{Error, Result};

/// Main configuration structure
///
/// Loaded from the config file, then environment variables, then CLI flags.
/// Priority: CLI > Env > File > Defaults
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub github: GitHubConfig,
    #[serde(default)]
    pub client: ClientConfig,
}

impl Config {
    /// Load config from default location, falling back to defaults
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        Self::load_from(&config_path)
    }

    pub fn load_from(config_path: &std::path::Path) -> Result<Self> {
        if config_path.exists() {
            let contents = std::fs::read_to_string(config_path)?;
            Self::from_toml(&contents)
        } else {
            Ok(Self::default())
        }
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        toml::from_str(contents)
            .map_err(|e| Error::ConfigError(format!("Failed to parse config: {}", e)))
    }

    /// Save config to disk
    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| Error::ConfigError(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(&config_path, contents)?;
        Ok(())
    }

    /// `<config dir>/repomark/config.toml`
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| Error::ConfigError("Could not find config directory".into()))?
            .join("repomark");

        Ok(config_dir.join("config.toml"))
    }

    /// Directory for the database and log files
    pub fn data_dir() -> Result<PathBuf> {
        Ok(dirs::data_dir()
            .ok_or_else(|| Error::ConfigError("Could not find data directory".into()))?
            .join("repomark"))
    }

    /// Overlay `REPOMARK_*` / `GITHUB_*` environment variables
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_env_with(|key| std::env::var(key).ok())
    }

    pub fn apply_env_with<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("REPOMARK_HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("REPOMARK_PORT") {
            self.server.port = port
                .parse()
                .map_err(|_| Error::ConfigError(format!("REPOMARK_PORT is not a port: {}", port)))?;
        }
        if let Some(path) = lookup("REPOMARK_DB_PATH") {
            self.server.database_path = Some(PathBuf::from(path));
        }
        if let Some(secret) = lookup("REPOMARK_JWT_SECRET") {
            self.server.jwt_secret = Some(secret);
        }
        if let Some(token) = lookup("GITHUB_TOKEN") {
            self.github.token = Some(token);
        }
        if let Some(url) = lookup("GITHUB_API_URL") {
            self.github.api_url = url;
        }
        if let Some(url) = lookup("REPOMARK_API_URL") {
            self.client.api_url = url;
        }
        if let Some(token) = lookup("REPOMARK_TOKEN") {
            self.client.token = Some(token);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Defaults to `<data dir>/repomark/bookmarks.db`
    pub database_path: Option<PathBuf>,

    /// HS256 secret shared with whatever issues the bearer tokens
    pub jwt_secret: Option<String>,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    5000
}

impl ServerConfig {
    pub fn database_path(&self) -> Result<PathBuf> {
        match &self.database_path {
            Some(path) => Ok(path.clone()),
            None => Ok(Config::data_dir()?.join("bookmarks.db")),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            database_path: None,
            jwt_secret: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubConfig {
    /// Optional personal access token; raises the search rate limit
    pub token: Option<String>,

    /// API URL (for GitHub Enterprise)
    #[serde(default = "default_github_url")]
    pub api_url: String,
}

fn default_github_url() -> String {
    "https://api.github.com".to_string()
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            token: None,
            api_url: default_github_url(),
        }
    }
}

/// Settings for the terminal front end talking to a repomark server
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Bearer token for the bookmark API
    pub token: Option<String>,

    /// Quiet period before a note/tag edit is saved
    #[serde(default = "default_debounce")]
    pub annotation_debounce_ms: u64,
}

fn default_api_url() -> String {
    "http://127.0.0.1:5000".to_string()
}

fn default_debounce() -> u64 {
    750
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            token: None,
            annotation_debounce_ms: default_debounce(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.github.api_url, "https://api.github.com");
        assert_eq!(config.client.annotation_debounce_ms, 750);
        assert!(config.server.jwt_secret.is_none());
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let toml = toml::to_string(&config).unwrap();
        assert!(toml.contains("api_url"));
        assert!(toml.contains("annotation_debounce_ms"));
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config = Config::from_toml(
            r#"
            [server]
            port = 8080

            [github]
            token = "ghp_x"
            "#,
        )
        .unwrap();

        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.github.token.as_deref(), Some("ghp_x"));
        assert_eq!(config.github.api_url, "https://api.github.com");
        assert_eq!(config.client.api_url, "http://127.0.0.1:5000");
    }

    #[test]
    fn test_bad_toml_is_config_error() {
        let err = Config::from_toml("[server\nport = ").unwrap_err();
        assert!(matches!(err, Error::ConfigError(_)));
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("REPOMARK_PORT", "7000"),
            ("REPOMARK_JWT_SECRET", "s3cret"),
            ("REPOMARK_DB_PATH", "/tmp/marks.db"),
            ("REPOMARK_TOKEN", "tok"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config
            .apply_env_with(|k| env.get(k).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.server.port, 7000);
        assert_eq!(config.server.jwt_secret.as_deref(), Some("s3cret"));
        assert_eq!(
            config.server.database_path().unwrap(),
            PathBuf::from("/tmp/marks.db")
        );
        assert_eq!(config.client.token.as_deref(), Some("tok"));
    }

    #[test]
    fn test_bad_port_in_env() {
        let mut config = Config::default();
        let err = config
            .apply_env_with(|k| (k == "REPOMARK_PORT").then(|| "not-a-port".to_string()))
            .unwrap_err();
        assert!(matches!(err, Error::ConfigError(_)));
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let config = Config::load_from(std::path::Path::new("/definitely/not/here.toml")).unwrap();
        assert_eq!(config.server.port, 5000);
    }
}
