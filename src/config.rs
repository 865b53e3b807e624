//! Configuration
//!
//! Environment-driven configuration for the locker client and the
//! headless locker service. Every field has a sensible default so the
//! CLI works out of the box against a local server.

use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

const DEFAULT_STUDIO: &str = "Starfall_Games";

/// Client-side configuration shared by the CLI and the orchestrator.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LockerConfig {
    /// Base URL of the locker service
    pub api_url: String,
    /// Studio-scoped directory name for the shared identity registry
    pub studio_name: String,
    /// Request timeout in seconds
    pub request_timeout_secs: u64,
}

impl Default for LockerConfig {
    fn default() -> Self {
        Self {
            api_url: "http://127.0.0.1:7842".to_string(),
            studio_name: DEFAULT_STUDIO.to_string(),
            request_timeout_secs: 15,
        }
    }
}

impl LockerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            api_url: env::var("LOCKER_API_URL").unwrap_or(defaults.api_url),
            studio_name: env::var("LOCKER_STUDIO").unwrap_or(defaults.studio_name),
            request_timeout_secs: env::var("LOCKER_REQUEST_TIMEOUT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.request_timeout_secs),
        }
    }

    /// Shared studio directory holding the identity registry file.
    pub fn shared_dir(&self) -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(&self.studio_name)
    }
}

/// Configuration for the headless locker service.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Directory for the sled store
    pub data_dir: PathBuf,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 7842,
            data_dir: dirs::data_dir()
                .unwrap_or_default()
                .join("party-locker"),
        }
    }
}

impl ServiceConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            host: env::var("LOCKER_HOST").unwrap_or(defaults.host),
            port: env::var("LOCKER_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            data_dir: env::var("LOCKER_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
        }
    }
}
