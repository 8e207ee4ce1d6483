//! Tidepool - flat-file persistence and queue core for a single-host
//! ActivityPub instance
//!
//! The HTTP handlers, the web UI, HTTP signatures and the delivery
//! worker pool are external collaborators; this crate owns everything
//! they persist. There is no database server: every store is a
//! directory of small pretty-printed JSON files, coordinated only by
//! the atomic filesystem primitives (`rename`, `link`, `unlink`).
//!
//! # On-disk layout
//!
//! ```text
//! server.json                            server config ("layout" number)
//! object/<ab>/<md5(actor)>.json          server-wide actor cache
//! user/<uid>/user.json                   user config
//! user/<uid>/key.json                    key material
//! user/<uid>/followers/<md5(actor)>.json one follow activity per actor
//! user/<uid>/following/<md5(actor)>.json
//! user/<uid>/muted/<md5(actor)>          plain text, one actor URL
//! user/<uid>/timeline/<tid>-<md5(id)>.json
//! user/<uid>/local/<tid>-<md5(id)>.json  hard links into timeline/
//! user/<uid>/queue/<tid>.json            pending work (atomic via .tmp)
//! user/<uid>/hidden/  public/  private/
//! ```
//!
//! # Modules
//!
//! - `server`: process-wide context opened from the base directory
//! - `user`: per-user context and store handles
//! - `store`: followers/following/muted/actor stores, timeline, queue
//! - `upgrade`: forward-only layout migrations
//! - `config`: `server.json` parsing
//! - `paths`: fingerprints, tids, the path scheme
//! - `auth`: legacy password hashing
//! - `json`: pretty-printed JSON file helpers
//! - `error`: error types

pub mod auth;
pub mod config;
pub mod error;
pub mod json;
pub mod paths;
pub mod server;
pub mod store;
pub mod upgrade;
pub mod user;

pub use config::ServerConfig;
pub use error::{Result, StoreError};
pub use server::Server;
pub use store::{
    ActorCache, Admiration, FollowerStore, FollowingStore, MuteStore, Queue, Timeline,
};
pub use upgrade::{DB_LAYOUT, db_upgrade};
pub use user::User;
