use std::fs;
use std::path::PathBuf;

use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const DEFAULT_SERVER_URL: &str = "http://localhost:8000";
const CONFIG_FILE: &str = "credentials.json";

/// Server selection and the current session's tokens
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CliConfig {
    pub server_url: String,
    pub email: Option<String>,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub logged_in_at: Option<DateTime<Utc>>,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            email: None,
            access_token: None,
            refresh_token: None,
            logged_in_at: None,
        }
    }
}

impl CliConfig {
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(&get_config_dir()?)
    }

    pub fn save(&self) -> anyhow::Result<()> {
        self.save_to(&get_config_dir()?)
    }

    pub fn load_from(dir: &std::path::Path) -> anyhow::Result<Self> {
        let path = dir.join(CONFIG_FILE);
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        serde_json::from_str(&raw).with_context(|| format!("failed to parse {}", path.display()))
    }

    pub fn save_to(&self, dir: &std::path::Path) -> anyhow::Result<()> {
        fs::create_dir_all(dir).with_context(|| format!("failed to create {}", dir.display()))?;
        let path = dir.join(CONFIG_FILE);
        let raw = serde_json::to_string_pretty(self)?;
        fs::write(&path, raw).with_context(|| format!("failed to write {}", path.display()))
    }

    pub fn set_session(&mut self, email: &str, access_token: String, refresh_token: String) {
        self.email = Some(email.to_string());
        self.access_token = Some(access_token);
        self.refresh_token = Some(refresh_token);
        self.logged_in_at = Some(Utc::now());
    }

    pub fn clear_session(&mut self) {
        self.email = None;
        self.access_token = None;
        self.refresh_token = None;
        self.logged_in_at = None;
    }
}

pub fn get_config_dir() -> anyhow::Result<PathBuf> {
    let config_dir = if let Ok(custom_dir) = std::env::var("CONTACTS_CLI_CONFIG_DIR") {
        PathBuf::from(custom_dir)
    } else {
        let home = std::env::var("HOME")
            .map_err(|_| anyhow::anyhow!("HOME environment variable not set"))?;
        PathBuf::from(home).join(".config").join("contacts").join("cli")
    };
    Ok(config_dir)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn save_and_load_round_trip() {
        let dir = std::env::temp_dir().join(format!("contacts-cli-test-{}", std::process::id()));
        let mut config = CliConfig::default();
        config.server_url = "http://example.test:9000".to_string();
        config.set_session("ann@x.com", "a".to_string(), "r".to_string());
        config.save_to(&dir).unwrap();

        let loaded = CliConfig::load_from(&dir).unwrap();
        assert_eq!(loaded, config);

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn missing_file_gives_defaults() {
        let dir = std::env::temp_dir().join("contacts-cli-test-missing-dir");
        let loaded = CliConfig::load_from(&dir).unwrap();
        assert_eq!(loaded.server_url, DEFAULT_SERVER_URL);
        assert!(loaded.access_token.is_none());
    }

    #[test]
    fn clear_session_drops_tokens() {
        let mut config = CliConfig::default();
        config.set_session("ann@x.com", "a".to_string(), "r".to_string());
        config.clear_session();
        let expected = CliConfig {
            server_url: config.server_url.clone(),
            ..CliConfig::default()
        };
        assert_eq!(config, expected);
    }
}
