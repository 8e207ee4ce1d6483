//! Configuration management
//!
//! The instance is configured by `server.json` in the base directory.
//! Unknown keys are preserved across a load/store round trip so the
//! layout upgrader can rewrite the file without losing anything a
//! newer (or older) build may have put there.

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Result, StoreError};

/// Server configuration (`server.json`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Public host name (e.g. "social.example.com")
    pub host: String,
    /// URL path prefix; may be empty
    pub prefix: String,
    /// Debug level; overridable via the DEBUG environment variable
    #[serde(default)]
    pub dbglevel: i32,
    /// Maximum number of entries returned by a timeline listing
    #[serde(default)]
    pub max_timeline_entries: usize,
    /// Base delay unit, in minutes, between output delivery retries
    #[serde(default)]
    pub query_retry_minutes: u64,
    /// On-disk layout version, managed by the upgrader
    #[serde(default)]
    pub layout: f64,

    /// Keys this build does not interpret, kept verbatim
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

impl ServerConfig {
    /// Load and validate `server.json` from a file.
    ///
    /// Distinguishes the three fatal conditions: the file is missing,
    /// the file is not parseable JSON, or a required key (`host`,
    /// `prefix`) is absent.
    pub fn load(path: &Path) -> Result<ServerConfig> {
        let data = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                StoreError::ConfigMissing(path.to_path_buf())
            } else {
                StoreError::Io(e)
            }
        })?;

        let raw: Value = serde_json::from_str(&data)
            .map_err(|_| StoreError::ConfigParse(path.to_path_buf()))?;

        if raw.get("host").is_none() {
            return Err(StoreError::ConfigIncomplete("host"));
        }
        if raw.get("prefix").is_none() {
            return Err(StoreError::ConfigIncomplete("prefix"));
        }

        serde_json::from_value(raw).map_err(|_| StoreError::ConfigParse(path.to_path_buf()))
    }

    /// Write the configuration back to `server.json`, pretty-printed.
    pub fn store(&self, path: &Path) -> Result<()> {
        crate::json::write_file(path, self)?;
        Ok(())
    }

    /// Base URL of the instance: `https://<host><prefix>`
    pub fn base_url(&self) -> String {
        format!("https://{}{}", self.host, self.prefix)
    }
}
