//! On-disk layout upgrader
//!
//! The layout version lives in the `layout` key of `server.json` and
//! only ever moves forward. Each step is idempotent: re-running it
//! over an already-upgraded tree changes nothing. The upgrader runs at
//! startup, before any other component services requests.

use crate::error::{Result, StoreError};
use crate::server::Server;
use crate::user::User;

/// The on-disk layout this build reads and writes
pub const DB_LAYOUT: f64 = 2.4;

/// Bring the on-disk layout up to [`DB_LAYOUT`].
///
/// # Errors
/// `UnsupportedLayout` for trees older than 2.0; `FutureLayout` when
/// the tree was written by a newer build.
pub fn db_upgrade(server: &mut Server) -> Result<()> {
    let mut changed = 0;

    loop {
        let layout = server.config().layout;
        if layout >= DB_LAYOUT {
            break;
        }

        server.log(&format!("db_upgrade {:.1} < {:.1}", layout, DB_LAYOUT));

        let next = if layout < 2.0 {
            return Err(StoreError::UnsupportedLayout(layout));
        } else if layout < 2.1 {
            create_object_dir(server)?;
            2.1
        } else if layout < 2.2 {
            shard_actor_cache(server)?;
            2.2
        } else if layout < 2.3 {
            add_hidden_fix_muted(server)?;
            2.3
        } else {
            add_public_private(server)?;
            2.4
        };

        server.config_mut().layout = next;
        server.log(&format!("db_upgrade converted to version {:.1}", next));
        changed += 1;
    }

    let layout = server.config().layout;
    if layout > DB_LAYOUT {
        return Err(StoreError::FutureLayout(layout));
    }

    if changed > 0 {
        server.store_config()?;
        server.log(&format!("upgraded db after {} changes", changed));
    }

    Ok(())
}

/// 2.0 → 2.1: the server-wide `object/` directory appears.
fn create_object_dir(server: &Server) -> Result<()> {
    std::fs::create_dir_all(server.base_dir().join("object"))?;
    Ok(())
}

/// 2.1 → 2.2: per-user `actors/` caches move to the server-wide
/// `object/` store, sharded by the first two fingerprint characters.
fn shard_actor_cache(server: &Server) -> Result<()> {
    for uid in server.user_list() {
        let Ok(user) = User::open(server, &uid) else {
            continue;
        };

        let actors_dir = user.base_dir().join("actors");
        let Ok(entries) = std::fs::read_dir(&actors_dir) else {
            continue;
        };

        for entry in entries.flatten() {
            let path = entry.path();
            if !path.extension().is_some_and(|e| e == "json") {
                continue;
            }
            let Some(name) = path.file_name().and_then(|n| n.to_str()).map(String::from)
            else {
                continue;
            };
            let Some(prefix) = name.get(..2) else {
                continue;
            };

            let shard = server.base_dir().join("object").join(prefix);
            std::fs::create_dir_all(&shard)?;
            let _ = std::fs::rename(&path, shard.join(&name));
        }

        let _ = std::fs::remove_dir(&actors_dir);
    }

    Ok(())
}

/// 2.2 → 2.3: `hidden/` appears; muted entries lose their stray
/// `.json` extension (they are plain text, not JSON).
fn add_hidden_fix_muted(server: &Server) -> Result<()> {
    for uid in server.user_list() {
        let Ok(user) = User::open(server, &uid) else {
            continue;
        };

        std::fs::create_dir_all(user.base_dir().join("hidden"))?;

        let muted_dir = user.base_dir().join("muted");
        let Ok(entries) = std::fs::read_dir(&muted_dir) else {
            continue;
        };

        for entry in entries.flatten() {
            let path = entry.path();
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if let Some(stripped) = name.strip_suffix(".json") {
                let _ = std::fs::rename(&path, muted_dir.join(stripped));
            }
        }
    }

    Ok(())
}

/// 2.3 → 2.4: `public/` and `private/` appear for outbound and
/// inbound artifacts.
fn add_public_private(server: &Server) -> Result<()> {
    for uid in server.user_list() {
        let Ok(user) = User::open(server, &uid) else {
            continue;
        };

        std::fs::create_dir_all(user.base_dir().join("public"))?;
        std::fs::create_dir_all(user.base_dir().join("private"))?;
    }

    Ok(())
}
