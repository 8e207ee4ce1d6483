//! Tidepool binary entry point
//!
//! Opens an instance base directory, brings its on-disk layout up to
//! date and reports the instance status. The HTTP server and the
//! queue workers are separate programs built on the library.

use anyhow::Context;
use tidepool::{Server, User, db_upgrade};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> anyhow::Result<()> {
    // 1. Initialize tracing/logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tidepool=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().pretty())
        .init();

    let base_dir = std::env::args()
        .nth(1)
        .context("usage: tidepool <basedir>")?;

    // 2. Open the instance
    let mut server = Server::open(&base_dir)?;
    tracing::info!("Base URL: {}", server.base_url());

    // 3. Bring the on-disk layout up to date before anything else
    //    touches the tree
    db_upgrade(&mut server)?;
    tracing::info!(layout = server.config().layout, "Layout up to date");

    // 4. Report per-user status
    let users = server.user_list();
    tracing::info!(users = users.len(), "Instance opened");

    for uid in &users {
        match User::open(&server, uid) {
            Ok(user) => {
                let pending = user.queue().ready().len();
                let followers = user.followers().list().len();
                tracing::info!(user = %uid, pending, followers, "user ok");
            }
            Err(err) => {
                tracing::warn!(user = %uid, error = %err, "cannot open user");
            }
        }
    }

    Ok(())
}
