//! Timeline store
//!
//! Received objects are stored one file per object id, named
//! `<tid>-<md5(id)>.json` so that a directory listing sorted by name
//! is the timeline sorted by last interaction. Reply threading lives
//! in a reserved `_snac` member merged into each stored object; when a
//! descendant arrives, every ancestor is moved to a fresh tid so the
//! whole thread surfaces together.
//!
//! `local/` mirrors the subset of the timeline that concerns the
//! owning user (own posts, replies to them) as hard links, so a
//! mirror entry survives with the canonical mtime and content even
//! while the timeline file is being replaced.
//!
//! Writes are plain (not atomic); readers glob, parse, and skip
//! anything unreadable.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};

use crate::user::User;
use crate::{json, paths};

/// Version tag recorded in each entry's `_snac` metadata
const META_VERSION: &str = "snac/2.x";

/// A like or an announce (boost) of a timeline entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admiration {
    Like,
    Announce,
}

impl Admiration {
    fn meta_key(self) -> &'static str {
        match self {
            Admiration::Like => "liked_by",
            Admiration::Announce => "announced_by",
        }
    }

    fn label(self) -> &'static str {
        match self {
            Admiration::Like => "Like",
            Admiration::Announce => "Announce",
        }
    }
}

/// Per-user timeline of received objects
pub struct Timeline<'a> {
    user: &'a User<'a>,
}

impl<'a> Timeline<'a> {
    pub(crate) fn new(user: &'a User<'a>) -> Self {
        Self { user }
    }

    fn dir(&self) -> PathBuf {
        self.user.base_dir().join("timeline")
    }

    /// The file holding an object id, if any.
    ///
    /// There is at most one per id ([`Timeline::add`] refuses
    /// duplicates); if a race ever leaves two, the first in name order
    /// wins.
    pub fn find_file(&self, id: &str) -> Option<PathBuf> {
        let suffix = format!("-{}.json", paths::fingerprint(id));
        let mut matches = Vec::new();

        if let Ok(entries) = std::fs::read_dir(self.dir()) {
            for entry in entries.flatten() {
                if entry.file_name().to_string_lossy().ends_with(&suffix) {
                    matches.push(entry.path());
                }
            }
        }

        matches.sort();
        matches.into_iter().next()
    }

    /// Is this object already stored?
    pub fn here(&self, id: &str) -> bool {
        self.find_file(id).is_some()
    }

    /// Read an entry by object id.
    pub fn find(&self, id: &str) -> Option<Value> {
        self.find_file(id).and_then(|path| json::read_file(&path))
    }

    /// Read an entry by file name (used when iterating [`Timeline::list`]).
    pub fn get(&self, path: &Path) -> Option<Value> {
        json::read_file(path)
    }

    /// The newest entry filenames, most recent first, capped by the
    /// `max_timeline_entries` config key.
    pub fn list(&self) -> Vec<PathBuf> {
        let max = self.user.server().config().max_timeline_entries;
        let mut files = Vec::new();

        if let Ok(entries) = std::fs::read_dir(self.dir()) {
            for entry in entries.flatten() {
                let path = entry.path();
                if path.extension().is_some_and(|e| e == "json") {
                    files.push(path);
                }
            }
        }

        files.sort();
        files.into_iter().rev().take(max).collect()
    }

    /// Add a received object to the timeline.
    ///
    /// Attaches fresh `_snac` metadata carrying the threading links,
    /// then runs the write-and-relink protocol. Returns false (and
    /// logs) when the id is already stored; an entry is never
    /// rewritten through this path.
    pub fn add(
        &self,
        id: &str,
        msg: &Value,
        parent: Option<&str>,
        referrer: Option<&str>,
    ) -> bool {
        if let Some(existing) = self.find_file(id) {
            self.user.log(&format!(
                "timeline_add refusing rewrite {} {}",
                id,
                existing.display()
            ));
            return false;
        }

        let mut entry = msg.clone();
        let Some(obj) = entry.as_object_mut() else {
            self.user
                .log(&format!("timeline_add refusing non-object {}", id));
            return false;
        };

        let mut meta = Map::new();
        meta.insert("children".into(), Value::Array(Vec::new()));
        meta.insert("liked_by".into(), Value::Array(Vec::new()));
        meta.insert("announced_by".into(), Value::Array(Vec::new()));
        meta.insert("version".into(), META_VERSION.into());
        meta.insert(
            "referrer".into(),
            referrer.map_or(Value::Null, Value::from),
        );
        meta.insert("parent".into(), parent.map_or(Value::Null, Value::from));
        obj.insert("_snac".into(), Value::Object(meta));

        self.write_entry(id, &entry, parent, referrer);

        self.user.log(&format!("timeline_add {}", id));

        true
    }

    /// Record a like or announce on a stored entry.
    ///
    /// The admirer is appended to the corresponding `_snac` list if
    /// not already present and becomes the entry's referrer; the entry
    /// is then re-written under a fresh tid. Unknown ids are logged
    /// and ignored.
    pub fn admire(&self, id: &str, admirer: &str, kind: Admiration) {
        let Some(old_path) = self.find_file(id) else {
            self.user
                .log(&format!("timeline_admire ignored for unknown object {}", id));
            return;
        };
        let Some(mut entry) = json::read_file(&old_path) else {
            self.user
                .log(&format!("timeline_admire ignored for unknown object {}", id));
            return;
        };

        let parent;
        {
            let Some(meta) = entry.get_mut("_snac").and_then(Value::as_object_mut) else {
                self.user
                    .log(&format!("timeline_admire ignored for unknown object {}", id));
                return;
            };

            let list = meta
                .entry(kind.meta_key())
                .or_insert_with(|| Value::Array(Vec::new()));
            if let Some(list) = list.as_array_mut() {
                if !list.iter().any(|v| v == admirer) {
                    list.push(admirer.into());
                }
            }

            meta.insert("referrer".into(), admirer.into());
            parent = meta.get("parent").and_then(Value::as_str).map(String::from);
        }

        let _ = std::fs::remove_file(&old_path);
        if let Some(local) = paths::local_mirror(&old_path) {
            let _ = std::fs::remove_file(local);
        }

        self.write_entry(id, &entry, parent.as_deref(), Some(admirer));

        self.user.log(&format!(
            "timeline_admire ({}) {} {}",
            kind.label(),
            id,
            admirer
        ));
    }

    /// Delete an entry and its local mirror.
    ///
    /// Ancestors are not rewritten: a dangling child id is tolerated
    /// by readers, and a delete should stay cheap.
    pub fn del(&self, id: &str) {
        let Some(path) = self.find_file(id) else {
            return;
        };

        let _ = std::fs::remove_file(&path);
        self.user.debug(1, &format!("timeline_del {}", id));

        if let Some(local) = paths::local_mirror(&path) {
            if std::fs::remove_file(local).is_ok() {
                self.user.debug(1, &format!("timeline_del (local) {}", id));
            }
        }
    }

    /// The write-and-relink protocol.
    ///
    /// 1. Write the entry under a fresh tid.
    /// 2. Mirror it into `local/` when the id, parent or referrer is
    ///    the user's own.
    /// 3. Add the id to the parent's children and move the parent to a
    ///    fresh tid (new file, then unlink of the old one).
    /// 4. Walk the remaining ancestors, renaming each to a fresh tid.
    ///
    /// The parent is replaced only after the child's file exists, so a
    /// crash cannot leave a newer child pointing at a vanished parent.
    fn write_entry(&self, id: &str, msg: &Value, parent: Option<&str>, referrer: Option<&str>) {
        let actor = self.user.actor_url();

        let path = paths::timeline_new_path(self.user.base_dir(), id);
        if json::write_file(&path, msg).is_ok() {
            self.user
                .debug(1, &format!("timeline write {} {}", id, path.display()));
        }

        // related to this user? link into the local timeline
        if id.starts_with(actor)
            || parent.is_some_and(|p| p.starts_with(actor))
            || referrer.is_some_and(|r| r.starts_with(actor))
        {
            if let Some(local) = paths::local_mirror(&path) {
                let _ = std::fs::hard_link(&path, &local);
                self.user.debug(
                    1,
                    &format!("timeline write (local) {} {}", id, local.display()),
                );
            }
        }

        let Some(parent_id) = parent else {
            return;
        };

        // add this id to the parent's children list
        let Some(old_parent_path) = self.find_file(parent_id) else {
            return;
        };
        let Some(mut parent_msg) = json::read_file(&old_parent_path) else {
            return;
        };

        let grandparent;
        {
            let Some(meta) = parent_msg.get_mut("_snac").and_then(Value::as_object_mut) else {
                return;
            };

            if let Some(children) = meta.get_mut("children").and_then(Value::as_array_mut) {
                if !children.iter().any(|c| c == id) {
                    children.push(id.into());
                }
            }

            grandparent = meta.get("parent").and_then(Value::as_str).map(String::from);
        }

        let new_parent_path = paths::timeline_new_path(self.user.base_dir(), parent_id);
        if json::write_file(&new_parent_path, &parent_msg).is_err() {
            return;
        }
        let _ = std::fs::remove_file(&old_parent_path);

        self.user.debug(
            1,
            &format!(
                "timeline write updated parent {} {}",
                parent_id,
                new_parent_path.display()
            ),
        );

        // relink the mirror when the old parent file was mirrored, or
        // when the new child is the user's own
        let was_local = paths::local_mirror(&old_parent_path)
            .map(|p| std::fs::remove_file(p).is_ok())
            .unwrap_or(false);
        if was_local || id.starts_with(actor) {
            if let Some(local) = paths::local_mirror(&new_parent_path) {
                let _ = std::fs::hard_link(&new_parent_path, &local);
                self.user.debug(
                    1,
                    &format!(
                        "timeline write updated parent (local) {} {}",
                        parent_id,
                        local.display()
                    ),
                );
            }
        }

        // walk the remaining ancestors, renaming each to a fresh tid
        // (content unchanged; only the sort key moves)
        let mut seen: HashSet<String> = HashSet::new();
        seen.insert(id.to_string());
        seen.insert(parent_id.to_string());

        let mut next = grandparent;
        while let Some(ancestor) = next {
            // hostile threads can link objects into a cycle
            if !seen.insert(ancestor.clone()) {
                break;
            }

            let Some(old_path) = self.find_file(&ancestor) else {
                break;
            };
            let new_path = paths::timeline_new_path(self.user.base_dir(), &ancestor);
            if std::fs::rename(&old_path, &new_path).is_err() {
                break;
            }

            self.user.debug(
                1,
                &format!(
                    "timeline write updated ancestor {} {}",
                    ancestor,
                    new_path.display()
                ),
            );

            let was_local = paths::local_mirror(&old_path)
                .map(|p| std::fs::remove_file(p).is_ok())
                .unwrap_or(false);
            if was_local {
                if let Some(local) = paths::local_mirror(&new_path) {
                    let _ = std::fs::hard_link(&new_path, &local);
                    self.user.debug(
                        1,
                        &format!(
                            "timeline write updated ancestor (local) {} {}",
                            ancestor,
                            local.display()
                        ),
                    );
                }
            }

            next = json::read_file(&new_path).and_then(|entry| {
                entry
                    .get("_snac")?
                    .get("parent")?
                    .as_str()
                    .map(String::from)
            });
        }
    }
}
