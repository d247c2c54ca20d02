//! Error taxonomy.
//!
//! Every external call site converts its failure into one of these kinds and
//! applies the documented state transition. Nothing here is allowed to carry
//! raw remote-surface error text up to the user: [`SurfaceError`] is logged,
//! and only a boolean "remote unavailable" signal leaves the controller.

use thiserror::Error;

/// Failures of the login flow. These are the only errors shown to the user
/// as text.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// The authorization request could not be built, e.g. the OS entropy
    /// source failed while generating the PKCE verifier.
    #[error("cannot start authorization: {0}")]
    AuthStart(String),

    /// The token endpoint answered with a non-200 status or a malformed body.
    #[error("token exchange failed: {0}")]
    TokenExchangeFailed(String),

    /// The profile endpoint failed. Swallowed by the session manager.
    #[error("profile fetch failed: {0}")]
    ProfileFetchFailed(String),

    /// The identity provider redirected back with an error instead of a code.
    #[error("authorization denied: {0}")]
    AuthorizationDenied(String),
}

/// Transport level failures of the [`crate::http::HttpClient`] abstraction.
#[derive(Error, Debug)]
pub enum HttpError {
    #[error("request failed: {0}")]
    Transport(String),

    #[error("unexpected status {status}")]
    Status { status: u16, body: String },

    #[error("decoding response failed: {0}")]
    Decode(#[from] serde_json::Error),
}

impl From<reqwest::Error> for HttpError {
    fn from(e: reqwest::Error) -> Self {
        HttpError::Transport(e.to_string())
    }
}

/// Failures of a [`crate::store::CredentialStore`].
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("credential store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("credential store is corrupt: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Failures reported by a [`crate::remote::RemoteSurface`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SurfaceError {
    /// The handshake was refused because the surface wants the user to
    /// authorize first.
    #[error("authorization required")]
    AuthorizationRequired,

    /// The surface (or its host application) cannot be reached.
    #[error("surface unavailable: {0}")]
    Unavailable(String),

    /// A command round trip failed.
    #[error("command failed: {0}")]
    Command(String),
}

impl From<HttpError> for SurfaceError {
    fn from(e: HttpError) -> Self {
        match e {
            HttpError::Status { status: 401, .. } => SurfaceError::AuthorizationRequired,
            HttpError::Transport(msg) => SurfaceError::Unavailable(msg),
            other => SurfaceError::Command(other.to_string()),
        }
    }
}

/// Missing or malformed configuration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing environment variables: {}", .0.join(", "))]
    Missing(Vec<String>),

    #[error("cannot load environment file: {0}")]
    EnvFile(String),
}

/// Failures of the playback coordinator.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlaybackError {
    /// Remote playback was unavailable and no preview could be resolved.
    #[error("no playable source for \"{0}\"")]
    NoPlayableSource(String),

    #[error("local player failed: {0}")]
    LocalPlayer(String),
}
