use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

pub const DEFAULT_SERVER_URL: &str = "http://localhost:5000";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerInfo {
    pub url: String,
    pub added_at: DateTime<Utc>,
    pub last_ping: Option<DateTime<Utc>>,
    pub status: ServerStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServerStatus {
    Up,
    Down,
    Unknown,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerConfig {
    pub server: Option<ServerInfo>,
}

impl ServerInfo {
    pub fn new(url: String) -> Self {
        Self {
            url,
            added_at: Utc::now(),
            last_ping: None,
            status: ServerStatus::Unknown,
        }
    }

    pub fn update_ping(&mut self, status: ServerStatus) {
        self.last_ping = Some(Utc::now());
        self.status = status;
    }
}

impl ServerConfig {
    pub fn url(&self) -> &str {
        self.server
            .as_ref()
            .map(|s| s.url.as_str())
            .unwrap_or(DEFAULT_SERVER_URL)
    }
}

pub fn get_config_dir() -> anyhow::Result<PathBuf> {
    let config_dir = if let Ok(custom_dir) = std::env::var("NOTES_CLI_CONFIG_DIR") {
        PathBuf::from(custom_dir)
    } else {
        let home = std::env::var("HOME").map_err(|_| anyhow::anyhow!("HOME environment variable not set"))?;
        PathBuf::from(home).join(".config").join("notes").join("cli")
    };

    if !config_dir.exists() {
        fs::create_dir_all(&config_dir)?;
    }

    Ok(config_dir)
}

pub fn load_server_config() -> anyhow::Result<ServerConfig> {
    let server_file = get_config_dir()?.join("server.json");

    if !server_file.exists() {
        return Ok(ServerConfig::default());
    }

    let content = fs::read_to_string(server_file)?;
    Ok(serde_json::from_str(&content)?)
}

pub fn save_server_config(config: &ServerConfig) -> anyhow::Result<()> {
    let server_file = get_config_dir()?.join("server.json");
    fs::write(server_file, serde_json::to_string_pretty(config)?)?;
    Ok(())
}
