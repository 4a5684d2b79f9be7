use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{info, error};

use crate::ws::mutation::MessagePolicy;
use crate::ws::session::ExpiryPolicy;

/// Application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Server host address
    #[serde(default = "default_host", alias = "backend_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port", alias = "backend_port")]
    pub port: u16,

    /// CORS allowed origins, comma separated
    #[serde(default = "default_cors_origins", alias = "client_origin")]
    pub cors_origins: String,

    /// Sessions older than this are evicted regardless of activity
    #[serde(default = "default_session_max_age_secs")]
    pub session_max_age_secs: u64,

    /// Sessions without connections are evicted after this much inactivity
    #[serde(default = "default_session_idle_timeout_secs")]
    pub session_idle_timeout_secs: u64,

    /// How often the reaper sweeps for expired sessions
    #[serde(default = "default_reaper_interval_secs")]
    pub reaper_interval_secs: u64,

    /// Answer unknown or malformed messages with an error instead of relaying them
    #[serde(default)]
    pub strict_messages: bool,
}

impl Config {
    /// Load configuration from environment variables or app.env file
    pub fn load() -> Result<Self, ConfigError> {
        // Try to load from app.env file first
        if std::path::Path::new("app.env").exists() {
            dotenvy::from_filename("app.env").ok();
        } else {
            // Fallback to .env file
            dotenvy::dotenv().ok();
        }

        match envy::from_env::<Config>() {
            Ok(config) => {
                info!("✅ Configuration loaded successfully");
                Ok(config)
            }
            Err(e) => {
                error!("❌ Failed to load configuration: {}", e);
                Err(ConfigError::EnvError(e))
            }
        }
    }

    /// Get the full server address
    pub fn server_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn allowed_origins(&self) -> Vec<String> {
        self.cors_origins
            .split(',')
            .map(str::trim)
            .filter(|o| !o.is_empty())
            .map(str::to_string)
            .collect()
    }

    pub fn expiry_policy(&self) -> ExpiryPolicy {
        ExpiryPolicy {
            max_age: chrono::Duration::seconds(self.session_max_age_secs as i64),
            idle_timeout: chrono::Duration::seconds(self.session_idle_timeout_secs as i64),
        }
    }

    pub fn reaper_interval(&self) -> Duration {
        Duration::from_secs(self.reaper_interval_secs.max(1))
    }

    pub fn message_policy(&self) -> MessagePolicy {
        MessagePolicy::from_strict(self.strict_messages)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: default_cors_origins(),
            session_max_age_secs: default_session_max_age_secs(),
            session_idle_timeout_secs: default_session_idle_timeout_secs(),
            reaper_interval_secs: default_reaper_interval_secs(),
            strict_messages: false,
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    EnvError(envy::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::EnvError(e) => write!(f, "Environment variable error: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {}

// Default value functions
fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_cors_origins() -> String {
    "http://localhost:5173".to_string()
}

fn default_session_max_age_secs() -> u64 {
    2 * 60 * 60
}

fn default_session_idle_timeout_secs() -> u64 {
    5 * 60
}

fn default_reaper_interval_secs() -> u64 {
    60
}
