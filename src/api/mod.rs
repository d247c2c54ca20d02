//! # API Module
//!
//! HTTP endpoints of the local server that receives the OAuth redirect.
//!
//! - [`callback`] - Completes the PKCE login by handing the redirect to
//!   [`crate::callback::dispatch`]. The outcome is left in [`CallbackState`]
//!   for the CLI waiting on it.
//! - [`health`] - Returns status and version for quick checks.
//!
//! ```rust,ignore
//! use axum::{Extension, Router, routing::get};
//! use liquidglass::api::{callback, health};
//!
//! let app = Router::new()
//!     .route("/callback", get(callback).layer(Extension(state)))
//!     .route("/health", get(health));
//! ```

mod callback;
mod health;

pub use callback::{CallbackState, callback};
pub use health::health;
