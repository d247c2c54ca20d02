//! # CLI Module
//!
//! User-facing commands of the `liquidglass` binary. Each command builds
//! the pieces it needs from the environment configuration, runs, and
//! reports through the colored output macros.
//!
//! ## Commands
//!
//! - [`auth`] - PKCE login through the browser and the local callback server
//! - [`logout`] - Forgets the stored session
//! - [`status`] - Shows session and profile details as a table
//! - [`token`] - Prints a valid access token, refreshing it if needed
//! - [`remote`] - Sends a playback command to the active Spotify device
//!
//! ```bash
//! liquidglass auth
//! liquidglass remote play spotify:track:4uLU6hMCjMI75M1A2tKUQC
//! liquidglass remote seek 0.5
//! ```

mod auth;
mod remote;
mod session;

use std::{sync::Arc, time::Duration};

use indicatif::{ProgressBar, ProgressStyle};

use crate::{
    Res,
    clock::SystemClock,
    config::Config,
    http::ReqwestClient,
    management::SessionManager,
    store::FileStore,
};

pub use auth::auth;
pub use remote::{RemoteAction, remote};
pub use session::{logout, status, token};

/// Builds a session manager over the on-disk credential store and restores
/// the last session from it.
async fn open_session() -> Res<Arc<SessionManager>> {
    let config = Config::from_env()?;
    let session = SessionManager::new(
        config,
        Arc::new(ReqwestClient::new()),
        Arc::new(FileStore::default_location()),
        Arc::new(SystemClock),
    );
    session.restore().await?;
    Ok(Arc::new(session))
}

fn spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb.set_style(
        ProgressStyle::with_template("{spinner:.blue} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"),
    );
    pb
}
