//! On-disk stores
//!
//! The filesystem is the database: every store is a directory of
//! small files whose names embed a fingerprint of the key (and, for
//! time-ordered stores, a sortable `tid` prefix). Atomic `rename`,
//! `link` and `unlink` are the only coordination primitives.

mod actors;
mod queue;
mod timeline;

pub use actors::{ActorCache, FollowerStore, FollowingStore, MuteStore};
pub use queue::Queue;
pub use timeline::{Admiration, Timeline};

#[cfg(test)]
pub(crate) mod testutil;

#[cfg(test)]
mod timeline_test;
