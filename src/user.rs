//! User context
//!
//! A `User` bundles a user id, its base directory under `user/<uid>`,
//! the parsed `user.json` and `key.json` payloads, and the user's
//! actor URL. All per-user stores are reached through it. The context
//! is released by dropping it.

use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::error::{Result, StoreError};
use crate::paths;
use crate::server::Server;
use crate::store::{FollowerStore, FollowingStore, MuteStore, Queue, Timeline};

/// Per-user context
pub struct User<'a> {
    server: &'a Server,
    uid: String,
    base_dir: PathBuf,
    config: Value,
    key: Value,
    actor_url: String,
}

impl<'a> User<'a> {
    /// Open a user by id.
    ///
    /// The id must match `[A-Za-z0-9_]+`. A missing `user.json` is
    /// only mentioned at debug level 2 (probing for non-existent users
    /// is routine); every other failure is logged.
    pub fn open(server: &'a Server, uid: &str) -> Result<User<'a>> {
        if !paths::validate_uid(uid) {
            server.log(&format!("invalid user '{}'", uid));
            return Err(StoreError::UserNotFound(uid.to_string()));
        }

        let base_dir = server.base_dir().join("user").join(uid);

        let cfg_file = base_dir.join("user.json");
        let config = match std::fs::read_to_string(&cfg_file) {
            Ok(data) => match serde_json::from_str(&data) {
                Ok(config) => config,
                Err(_) => {
                    server.log(&format!("cannot parse '{}'", cfg_file.display()));
                    return Err(StoreError::UserNotFound(uid.to_string()));
                }
            },
            Err(_) => {
                server.debug(2, &format!("error opening '{}'", cfg_file.display()));
                return Err(StoreError::UserNotFound(uid.to_string()));
            }
        };

        let key_file = base_dir.join("key.json");
        let key = match std::fs::read_to_string(&key_file) {
            Ok(data) => match serde_json::from_str(&data) {
                Ok(key) => key,
                Err(_) => {
                    server.log(&format!("cannot parse '{}'", key_file.display()));
                    return Err(StoreError::KeyParse(uid.to_string()));
                }
            },
            Err(_) => {
                server.log(&format!("error opening '{}'", key_file.display()));
                return Err(StoreError::KeyMissing(uid.to_string()));
            }
        };

        let actor_url = format!("{}/{}", server.base_url(), uid);

        Ok(User {
            server,
            uid: uid.to_string(),
            base_dir,
            config,
            key,
            actor_url,
        })
    }

    pub fn server(&self) -> &'a Server {
        self.server
    }

    pub fn uid(&self) -> &str {
        &self.uid
    }

    /// `<server base>/user/<uid>`
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Parsed `user.json`
    pub fn config(&self) -> &Value {
        &self.config
    }

    /// Parsed `key.json` (the user's keypair)
    pub fn key(&self) -> &Value {
        &self.key
    }

    /// The user's actor URL: `<base url>/<uid>`
    pub fn actor_url(&self) -> &str {
        &self.actor_url
    }

    pub fn followers(&self) -> FollowerStore<'_> {
        FollowerStore::new(self)
    }

    pub fn following(&self) -> FollowingStore<'_> {
        FollowingStore::new(self)
    }

    pub fn muted(&self) -> MuteStore<'_> {
        MuteStore::new(self)
    }

    pub fn timeline(&self) -> Timeline<'_> {
        Timeline::new(self)
    }

    pub fn queue(&self) -> Queue<'_> {
        Queue::new(self)
    }

    /// Log a message prefixed with the user id.
    pub fn log(&self, msg: &str) {
        self.server.log(&format!("[{}] {}", self.uid, self.scrub(msg)));
    }

    /// Log a debug message prefixed with the user id.
    pub fn debug(&self, level: i32, msg: &str) {
        self.server
            .debug(level, &format!("[{}] {}", self.uid, self.scrub(msg)));
    }

    fn scrub(&self, msg: &str) -> String {
        msg.replace(&self.base_dir.display().to_string(), "~")
    }
}
