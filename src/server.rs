//! Server context
//!
//! One `Server` is opened per process at startup, from the instance
//! base directory, and is read-only thereafter except for the debug
//! level and the running flag (both atomic, so a signal handler may
//! flip them while workers read).
//!
//! Log messages that mention paths inside the base directory print the
//! base directory as `~`, keeping log lines short and free of local
//! filesystem detail.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};

use crate::config::ServerConfig;
use crate::error::Result;
use crate::store::ActorCache;

/// Process-wide server context
pub struct Server {
    base_dir: PathBuf,
    base_url: String,
    config: ServerConfig,
    debug_level: AtomicI32,
    running: AtomicBool,
}

impl Server {
    /// Open a server base directory.
    ///
    /// Parses `server.json` and derives the instance base URL. The
    /// debug level comes from the `dbglevel` config key, overridden by
    /// the `DEBUG` environment variable (a decimal integer) when set.
    ///
    /// # Errors
    /// `ConfigMissing` if `server.json` is absent, `ConfigParse` if it
    /// is invalid, `ConfigIncomplete` if `host` or `prefix` is missing.
    pub fn open(base_dir: impl AsRef<Path>) -> Result<Server> {
        let mut dir = base_dir.as_ref().display().to_string();
        while dir.len() > 1 && dir.ends_with('/') {
            dir.pop();
        }
        let base_dir = PathBuf::from(dir);

        let config = ServerConfig::load(&base_dir.join("server.json"))?;
        let base_url = config.base_url();

        let mut debug_level = config.dbglevel;
        if let Ok(value) = std::env::var("DEBUG") {
            if let Ok(level) = value.trim().parse::<i32>() {
                debug_level = level;
                tracing::info!("DEBUG level set to {} from environment", level);
            }
        }

        Ok(Server {
            base_dir,
            base_url,
            config,
            debug_level: AtomicI32::new(debug_level),
            running: AtomicBool::new(false),
        })
    }

    /// Instance base directory (no trailing slash)
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Instance base URL: `https://<host><prefix>`
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Mutable configuration access; only the startup-time layout
    /// upgrader uses this, before the context is shared.
    pub(crate) fn config_mut(&mut self) -> &mut ServerConfig {
        &mut self.config
    }

    /// Rewrite `server.json` from the in-memory configuration.
    pub(crate) fn store_config(&self) -> Result<()> {
        self.config.store(&self.base_dir.join("server.json"))
    }

    pub fn debug_level(&self) -> i32 {
        self.debug_level.load(Ordering::Relaxed)
    }

    pub fn set_debug_level(&self, level: i32) {
        self.debug_level.store(level, Ordering::Relaxed);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    pub fn set_running(&self, running: bool) {
        self.running.store(running, Ordering::Relaxed);
    }

    /// The server-wide cached-actor store (`object/`)
    pub fn actors(&self) -> ActorCache<'_> {
        ActorCache::new(self)
    }

    /// List user ids: the directory basenames under `user/`, sorted.
    pub fn user_list(&self) -> Vec<String> {
        let mut users = Vec::new();

        if let Ok(entries) = std::fs::read_dir(self.base_dir.join("user")) {
            for entry in entries.flatten() {
                if entry.file_type().map(|t| t.is_dir()).unwrap_or(false) {
                    if let Ok(name) = entry.file_name().into_string() {
                        users.push(name);
                    }
                }
            }
        }

        users.sort();
        users
    }

    /// Log a message, with the base directory shortened to `~`.
    pub fn log(&self, msg: &str) {
        tracing::info!("{}", self.scrub(msg));
    }

    /// Log a debug message, shown when the dynamic debug level is at
    /// least `level`.
    pub fn debug(&self, level: i32, msg: &str) {
        if self.debug_level() >= level {
            tracing::debug!("{}", self.scrub(msg));
        }
    }

    pub(crate) fn scrub(&self, msg: &str) -> String {
        msg.replace(&self.base_dir.display().to_string(), "~")
    }
}
