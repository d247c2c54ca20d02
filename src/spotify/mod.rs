//! # Spotify Integration Module
//!
//! Thin wrappers around the two Spotify services the session manager talks
//! to. Every call goes through [`crate::http::HttpClient`], so tests can
//! script the responses.
//!
//! ```text
//! SessionManager
//!      ↓
//! Spotify Integration Layer
//!     ├── auth     (accounts service: authorize URL, code exchange, refresh)
//!     └── profile  (Web API: GET /me)
//!      ↓
//! HttpClient (reqwest in production)
//! ```
//!
//! Failures are reported as [`crate::error::AuthError`]; the session manager
//! decides which of them the user gets to see.

pub mod auth;
pub mod profile;
