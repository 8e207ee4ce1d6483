//! Common test utilities for E2E tests

// Each test binary uses a subset of these helpers.
#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tidepool::Server;

/// An on-disk instance rooted in a temporary directory.
pub struct TestInstance {
    pub server: Server,
    pub _temp_dir: TempDir,
}

impl TestInstance {
    /// Create an instance tree at the current layout and open it.
    pub fn new() -> Self {
        let temp_dir = TempDir::new().unwrap();

        write_server_json(temp_dir.path(), 2.4);
        fs::create_dir_all(temp_dir.path().join("user")).unwrap();
        fs::create_dir_all(temp_dir.path().join("object")).unwrap();

        let server = Server::open(temp_dir.path()).unwrap();

        Self {
            server,
            _temp_dir: temp_dir,
        }
    }

    /// Create the directory tree and minimal config for a user.
    pub fn create_user(&self, uid: &str) {
        create_user_tree(self.server.base_dir(), uid);
    }
}

/// Write a `server.json` at the given layout version.
pub fn write_server_json(base: &Path, layout: f64) {
    fs::write(
        base.join("server.json"),
        format!(
            r#"{{
    "host": "test.example.com",
    "prefix": "",
    "dbglevel": 0,
    "max_timeline_entries": 64,
    "query_retry_minutes": 2,
    "layout": {}
}}"#,
            layout
        ),
    )
    .unwrap();
}

/// Create a user directory tree at the current layout.
pub fn create_user_tree(base: &Path, uid: &str) -> PathBuf {
    let dir = base.join("user").join(uid);

    for sub in [
        "followers",
        "following",
        "muted",
        "hidden",
        "public",
        "private",
        "timeline",
        "local",
        "queue",
    ] {
        fs::create_dir_all(dir.join(sub)).unwrap();
    }

    fs::write(
        dir.join("user.json"),
        format!(r#"{{"name": "{}", "bio": ""}}"#, uid),
    )
    .unwrap();
    fs::write(
        dir.join("key.json"),
        r#"{"public_key": "pk", "private_key": "sk"}"#,
    )
    .unwrap();

    dir
}
