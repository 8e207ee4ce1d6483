//! Shared on-disk fixtures for store tests

use std::fs;
use std::path::Path;

use tempfile::TempDir;

use crate::server::Server;

/// Create a minimal instance tree at the current layout and open it.
pub(crate) fn test_server() -> (TempDir, Server) {
    test_server_with_max_entries(50)
}

/// Same, with a chosen timeline listing cap.
pub(crate) fn test_server_with_max_entries(max: usize) -> (TempDir, Server) {
    let dir = TempDir::new().unwrap();

    fs::write(
        dir.path().join("server.json"),
        format!(
            r#"{{
    "host": "example.com",
    "prefix": "",
    "dbglevel": 0,
    "max_timeline_entries": {},
    "query_retry_minutes": 2,
    "layout": 2.4
}}"#,
            max
        ),
    )
    .unwrap();

    fs::create_dir_all(dir.path().join("user")).unwrap();
    fs::create_dir_all(dir.path().join("object")).unwrap();

    let server = Server::open(dir.path()).unwrap();
    (dir, server)
}

/// Create the directory tree and config files for a user.
pub(crate) fn create_user(server: &Server, uid: &str) {
    let dir = server.base_dir().join("user").join(uid);

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

    fs::write(dir.join("user.json"), r#"{"name": "Test User"}"#).unwrap();
    fs::write(
        dir.join("key.json"),
        r#"{"public_key": "pk", "private_key": "sk"}"#,
    )
    .unwrap();
}

/// Count the timeline files whose name ends in `-<md5(id)>.json`.
pub(crate) fn timeline_file_count(user_dir: &Path, id: &str) -> usize {
    let suffix = format!("-{}.json", crate::paths::fingerprint(id));

    fs::read_dir(user_dir.join("timeline"))
        .map(|entries| {
            entries
                .flatten()
                .filter(|e| e.file_name().to_string_lossy().ends_with(&suffix))
                .count()
        })
        .unwrap_or(0)
}
