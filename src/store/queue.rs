//! Work queue
//!
//! Pending federation work lives in `queue/<tid>.json`, one item per
//! file, where the tid names the moment the item becomes eligible.
//! Items are published by writing a `.tmp` sibling and renaming it
//! into place, so a consumer never observes a half-written item;
//! consumption unlinks before reading, so a contended item is
//! delivered at most once.

use std::path::{Path, PathBuf};

use chrono::Utc;
use serde_json::{Map, Value};

use crate::user::User;
use crate::{json, paths};

/// Per-user queue of deferred input/output work items
pub struct Queue<'a> {
    user: &'a User<'a>,
}

impl<'a> Queue<'a> {
    pub(crate) fn new(user: &'a User<'a>) -> Self {
        Self { user }
    }

    fn dir(&self) -> PathBuf {
        self.user.base_dir().join("queue")
    }

    /// Enqueue a received message for processing, eligible now.
    pub fn enqueue_input(&self, msg: &Value, req: &Value) {
        let path = paths::queue_path(self.user.base_dir(), &paths::tid(0));

        let mut item = Map::new();
        item.insert("type".into(), "input".into());
        item.insert("object".into(), msg.clone());
        item.insert("req".into(), req.clone());

        if self.publish(&path, &Value::Object(item)) {
            self.user
                .debug(1, &format!("enqueue_input {}", path.display()));
        }
    }

    /// Enqueue an outgoing message for an actor.
    ///
    /// Delivery attempt `retries` is deferred by
    /// `retries * 60 * query_retry_minutes` seconds, encoded in the
    /// file name. Messages addressed to the user themselves are
    /// refused.
    pub fn enqueue_output(&self, msg: &Value, actor: &str, retries: u32) {
        if actor == self.user.actor_url() {
            self.user.debug(1, "enqueue refused to myself");
            return;
        }

        let minutes = self.user.server().config().query_retry_minutes;
        let delay = retries as i64 * 60 * minutes as i64;
        let path = paths::queue_path(self.user.base_dir(), &paths::tid(delay));

        let mut item = Map::new();
        item.insert("type".into(), "output".into());
        item.insert("actor".into(), actor.into());
        item.insert("object".into(), msg.clone());
        item.insert("retries".into(), retries.into());

        if self.publish(&path, &Value::Object(item)) {
            self.user.debug(
                1,
                &format!("enqueue_output {} {} {}", actor, path.display(), retries),
            );
        }
    }

    fn publish(&self, path: &Path, item: &Value) -> bool {
        let tmp = PathBuf::from(format!("{}.tmp", path.display()));

        if json::write_file(&tmp, item).is_err() {
            return false;
        }

        std::fs::rename(&tmp, path).is_ok()
    }

    /// Queue files whose eligibility time has arrived, in name order.
    pub fn ready(&self) -> Vec<PathBuf> {
        let now = Utc::now().timestamp();
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

        files
            .into_iter()
            .filter(|path| match paths::tid_seconds(path) {
                Some(t) if t <= now => {
                    self.user
                        .debug(2, &format!("queue ready for {}", path.display()));
                    true
                }
                _ => {
                    self.user
                        .debug(2, &format!("queue not yet time for {}", path.display()));
                    false
                }
            })
            .collect()
    }

    /// Take an item off the queue.
    ///
    /// The file is unlinked before its content is returned; when
    /// several workers contend for the same path, the one whose unlink
    /// succeeds gets the item and the rest get `None`.
    pub fn dequeue(&self, path: &Path) -> Option<Value> {
        let file = std::fs::File::open(path).ok()?;

        // claim the item; the open handle keeps the content readable
        std::fs::remove_file(path).ok()?;

        serde_json::from_reader(std::io::BufReader::new(file)).ok()
    }
}
