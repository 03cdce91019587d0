use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::network::ReconnectPolicy;

pub const DEFAULT_CONFIG_PATH: &str = "config/chat.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Socket.IO server; the websocket endpoint is derived from it.
    pub server_url: String,
    /// Room history lives at `<history_endpoint>/<room id>`.
    pub history_endpoint: String,
    pub session_file: PathBuf,
    pub request_timeout_secs: u64,
    pub reconnect_delay_ms: u64,
    pub reconnect_delay_max_ms: u64,
    pub event_buffer: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server_url: "http://localhost:5000".to_string(),
            history_endpoint: "http://localhost:5000/api/chat/messages".to_string(),
            session_file: PathBuf::from("data/session.json"),
            request_timeout_secs: 10,
            reconnect_delay_ms: 1000,
            reconnect_delay_max_ms: 5000,
            event_buffer: 256,
        }
    }
}

impl AppConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn reconnect_policy(&self) -> ReconnectPolicy {
        let initial_delay = Duration::from_millis(self.reconnect_delay_ms);
        ReconnectPolicy {
            initial_delay,
            max_delay: Duration::from_millis(self.reconnect_delay_max_ms).max(initial_delay),
        }
    }
}

pub fn load_config(path: &Path) -> AppConfig {
    match fs::read_to_string(path) {
        Ok(content) => match serde_json::from_str::<AppConfig>(&content) {
            Ok(config) => config,
            Err(err) => {
                log::warn!("Failed to parse config file {}: {err}", path.display());
                AppConfig::default()
            }
        },
        Err(err) => {
            log::info!(
                "Config file {} not found ({err}); using defaults",
                path.display()
            );
            AppConfig::default()
        }
    }
}
