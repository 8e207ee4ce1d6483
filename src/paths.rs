//! Identifiers and the on-disk path scheme
//!
//! Everything federated is addressed by an opaque URL, and URLs cannot
//! be used as filenames. The stores therefore embed a fixed-width hex
//! MD5 fingerprint of the key in every filename (MD5 is used as a
//! non-cryptographic hash only). Time-ordered files additionally carry
//! a `tid` prefix, a zero-padded seconds-plus-microseconds stamp whose
//! lexicographic order equals its chronological order.
//!
//! All functions here are pure path arithmetic except [`mtime`].

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::UNIX_EPOCH;

use chrono::Utc;
use md5::{Digest, Md5};

/// A user id must be a short printable token: `[A-Za-z0-9_]+`.
pub fn validate_uid(uid: &str) -> bool {
    !uid.is_empty()
        && uid
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Hex MD5 of a string, used as a filesystem-safe fingerprint.
pub fn fingerprint(s: &str) -> String {
    hex::encode(Md5::digest(s.as_bytes()))
}

// Last tid issued by this process, in microseconds since the epoch.
static LAST_TID_MICROS: AtomicU64 = AtomicU64::new(0);

/// Returns a time-based id: `"SSSSSSSSSS.UUUUUU"` of epoch seconds plus
/// `offset` and microseconds, zero-padded so lexicographic order matches
/// chronological order.
///
/// Strictly monotonic within a process: concurrent or back-to-back
/// calls never yield an equal or smaller id (before the offset).
pub fn tid(offset_seconds: i64) -> String {
    let now = Utc::now();
    let micros =
        now.timestamp() as u64 * 1_000_000 + now.timestamp_subsec_micros() as u64;

    let mut stamped = micros;
    let _ = LAST_TID_MICROS.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
        stamped = micros.max(last + 1);
        Some(stamped)
    });

    let seconds = (stamped / 1_000_000) as i64 + offset_seconds;
    format!("{:010}.{:06}", seconds, stamped % 1_000_000)
}

/// The integer-seconds prefix of a tid-named file, decoded from the
/// decimal digits before the first `.` of its basename.
pub fn tid_seconds(path: &Path) -> Option<i64> {
    let name = path.file_name()?.to_str()?;
    name.split('.').next()?.parse().ok()
}

/// Modification time of a file as seconds since the epoch, or `0.0` if
/// the file does not exist (or its mtime cannot be read).
pub fn mtime(path: &Path) -> f64 {
    std::fs::metadata(path)
        .and_then(|m| m.modified())
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}

/// `<user>/followers/<md5(actor)>.json`
pub fn follower_path(user_dir: &Path, actor: &str) -> PathBuf {
    user_dir
        .join("followers")
        .join(format!("{}.json", fingerprint(actor)))
}

/// `<user>/following/<md5(actor)>.json`
pub fn following_path(user_dir: &Path, actor: &str) -> PathBuf {
    user_dir
        .join("following")
        .join(format!("{}.json", fingerprint(actor)))
}

/// `<user>/muted/<md5(actor)>` (no extension)
pub fn muted_path(user_dir: &Path, actor: &str) -> PathBuf {
    user_dir.join("muted").join(fingerprint(actor))
}

/// `<base>/object/<ab>/<md5(actor)>.json`, sharded by the first two
/// fingerprint characters
pub fn actor_cache_path(base_dir: &Path, actor: &str) -> PathBuf {
    let md5 = fingerprint(actor);
    base_dir
        .join("object")
        .join(&md5[..2])
        .join(format!("{}.json", md5))
}

/// `<user>/timeline/<tid>-<md5(id)>.json` for a fresh tid
pub fn timeline_new_path(user_dir: &Path, id: &str) -> PathBuf {
    user_dir
        .join("timeline")
        .join(format!("{}-{}.json", tid(0), fingerprint(id)))
}

/// The `local/` mirror of a `timeline/` path (same basename).
pub fn local_mirror(timeline_path: &Path) -> Option<PathBuf> {
    let name = timeline_path.file_name()?;
    let user_dir = timeline_path.parent()?.parent()?;
    Some(user_dir.join("local").join(name))
}

/// `<user>/queue/<tid>.json`
pub fn queue_path(user_dir: &Path, tid: &str) -> PathBuf {
    user_dir.join("queue").join(format!("{}.json", tid))
}
