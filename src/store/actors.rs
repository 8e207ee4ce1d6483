//! Actor-keyed stores
//!
//! Followers, followings and mutes are per-user directories with one
//! file per actor, named by the actor URL's fingerprint. The actor
//! cache is server-wide (`object/`, sharded by the first two
//! fingerprint characters) and tracks staleness through the file
//! mtime alone: entries older than 36 hours are still served, but
//! with a "reset content" status so the caller knows to refresh.
//!
//! Operations report HTTP-style status codes to the HTTP-handling
//! collaborators.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

use chrono::Utc;
use http::StatusCode;
use serde_json::Value;

use crate::server::Server;
use crate::user::User;
use crate::{json, paths};

/// Cached actor data older than this is considered stale.
const ACTOR_MAX_AGE_SECONDS: f64 = 36.0 * 3600.0;

/// Followers of a user (`followers/<md5(actor)>.json`)
pub struct FollowerStore<'a> {
    user: &'a User<'a>,
}

impl<'a> FollowerStore<'a> {
    pub(crate) fn new(user: &'a User<'a>) -> Self {
        Self { user }
    }

    fn path(&self, actor: &str) -> PathBuf {
        paths::follower_path(self.user.base_dir(), actor)
    }

    /// Store the follow activity for an actor. `201` on success,
    /// `500` when the file cannot be written.
    pub fn add(&self, actor: &str, msg: &Value) -> StatusCode {
        let path = self.path(actor);
        let status = match json::write_file(&path, msg) {
            Ok(()) => StatusCode::CREATED,
            Err(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        self.user
            .debug(2, &format!("follower_add {} {}", actor, path.display()));

        status
    }

    /// Delete a follower. Always `200`; a missing file is fine.
    pub fn del(&self, actor: &str) -> StatusCode {
        let path = self.path(actor);
        let _ = std::fs::remove_file(&path);

        self.user
            .debug(2, &format!("follower_del {} {}", actor, path.display()));

        StatusCode::OK
    }

    /// Is this actor a follower?
    pub fn check(&self, actor: &str) -> bool {
        paths::mtime(&self.path(actor)) > 0.0
    }

    /// All stored follow activities. Unreadable files are skipped.
    pub fn list(&self) -> Vec<Value> {
        let mut files = Vec::new();

        if let Ok(entries) = std::fs::read_dir(self.user.base_dir().join("followers")) {
            for entry in entries.flatten() {
                let path = entry.path();
                if path.extension().is_some_and(|e| e == "json") {
                    files.push(path);
                }
            }
        }

        files.sort();
        files.iter().filter_map(|p| json::read_file(p)).collect()
    }
}

/// Actors a user follows (`following/<md5(actor)>.json`)
pub struct FollowingStore<'a> {
    user: &'a User<'a>,
}

impl<'a> FollowingStore<'a> {
    pub(crate) fn new(user: &'a User<'a>) -> Self {
        Self { user }
    }

    fn path(&self, actor: &str) -> PathBuf {
        paths::following_path(self.user.base_dir(), actor)
    }

    pub fn add(&self, actor: &str, msg: &Value) -> StatusCode {
        let path = self.path(actor);
        let status = match json::write_file(&path, msg) {
            Ok(()) => StatusCode::CREATED,
            Err(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        self.user
            .debug(2, &format!("following_add {} {}", actor, path.display()));

        status
    }

    pub fn del(&self, actor: &str) -> StatusCode {
        let path = self.path(actor);
        let _ = std::fs::remove_file(&path);

        self.user
            .debug(2, &format!("following_del {} {}", actor, path.display()));

        StatusCode::OK
    }

    pub fn check(&self, actor: &str) -> bool {
        paths::mtime(&self.path(actor)) > 0.0
    }
}

/// Muted actors (`muted/<md5(actor)>`, one text line per file)
pub struct MuteStore<'a> {
    user: &'a User<'a>,
}

impl<'a> MuteStore<'a> {
    pub(crate) fn new(user: &'a User<'a>) -> Self {
        Self { user }
    }

    fn path(&self, actor: &str) -> PathBuf {
        paths::muted_path(self.user.base_dir(), actor)
    }

    /// Mute an actor. The file holds the actor URL as plain text, not
    /// JSON.
    pub fn add(&self, actor: &str) -> StatusCode {
        let path = self.path(actor);
        let status = match std::fs::write(&path, format!("{}\n", actor)) {
            Ok(()) => StatusCode::CREATED,
            Err(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        self.user
            .debug(2, &format!("muted {} {}", actor, path.display()));

        status
    }

    pub fn del(&self, actor: &str) -> StatusCode {
        let path = self.path(actor);
        let _ = std::fs::remove_file(&path);

        self.user
            .debug(2, &format!("unmuted {} {}", actor, path.display()));

        StatusCode::OK
    }

    pub fn check(&self, actor: &str) -> bool {
        paths::mtime(&self.path(actor)) > 0.0
    }
}

/// Server-wide cache of remote actor profiles
/// (`object/<ab>/<md5(actor)>.json`)
pub struct ActorCache<'a> {
    server: &'a Server,
}

impl<'a> ActorCache<'a> {
    pub(crate) fn new(server: &'a Server) -> Self {
        Self { server }
    }

    fn path(&self, actor: &str) -> PathBuf {
        paths::actor_cache_path(self.server.base_dir(), actor)
    }

    /// Cache an actor profile, creating its shard directory on demand.
    pub fn add(&self, actor: &str, msg: &Value) -> StatusCode {
        let path = self.path(actor);

        if let Some(shard) = path.parent() {
            if std::fs::create_dir_all(shard).is_err() {
                return StatusCode::INTERNAL_SERVER_ERROR;
            }
        }

        let status = match json::write_file(&path, msg) {
            Ok(()) => StatusCode::CREATED,
            Err(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        self.server
            .debug(2, &format!("actor_add {} {}", actor, path.display()));

        status
    }

    pub fn del(&self, actor: &str) -> StatusCode {
        let _ = std::fs::remove_file(self.path(actor));
        StatusCode::OK
    }

    pub fn check(&self, actor: &str) -> bool {
        paths::mtime(&self.path(actor)) > 0.0
    }

    /// Fetch a cached actor profile.
    ///
    /// - `404` and no payload when the actor was never cached.
    /// - `205` plus the payload when the entry is older than 36 hours;
    ///   the file's mtime is advanced (a single space is appended) so
    ///   the stale hint fires once per refresh window.
    /// - `200` plus the payload when the entry is fresh.
    /// - `500` when the file exists but cannot be read or parsed.
    pub fn get(&self, actor: &str) -> (StatusCode, Option<Value>) {
        let path = self.path(actor);

        let t = paths::mtime(&path);
        if t == 0.0 {
            return (StatusCode::NOT_FOUND, None);
        }

        let status = if t + ACTOR_MAX_AGE_SECONDS < Utc::now().timestamp() as f64 {
            // touch the file by appending a blank; trailing whitespace
            // is invisible to the JSON parser
            if let Ok(mut file) = OpenOptions::new().append(true).open(&path) {
                let _ = file.write_all(b" ");
            }

            StatusCode::RESET_CONTENT
        } else {
            StatusCode::OK
        };

        match json::read_file(&path) {
            Some(payload) => (status, Some(payload)),
            None => (StatusCode::INTERNAL_SERVER_ERROR, None),
        }
    }
}
