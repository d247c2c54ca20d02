use async_trait::async_trait;

use crate::{error::SurfaceError, remote::SurfaceEvents};

/// Player state as reported by the remote surface.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlayerState {
    pub track_uri: Option<String>,
    pub track_name: Option<String>,
    pub artist_name: Option<String>,
    /// Identifier handed back to [`RemoteSurface::fetch_image`].
    pub image: Option<String>,
    pub is_paused: bool,
    pub position_ms: u64,
    pub duration_ms: u64,
}

/// Requested artwork dimensions in pixels. Surfaces that only serve
/// fixed renditions may ignore it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageSize {
    pub width: u32,
    pub height: u32,
}

impl ImageSize {
    pub const ARTWORK: ImageSize = ImageSize {
        width: 300,
        height: 300,
    };
}

/// The external application or device that actually plays audio.
///
/// Every call is asynchronous and may fail on its own. Implementations push
/// telemetry and disconnect notifications through the [`SurfaceEvents`]
/// handed to [`RemoteSurface::connect`]; pushes only flow between
/// [`RemoteSurface::subscribe`] and [`RemoteSurface::unsubscribe`].
#[async_trait]
pub trait RemoteSurface: Send + Sync {
    /// Capability probe: can the host application be reached at all?
    /// This must not open a connection.
    async fn is_available(&self) -> bool;

    /// Performs the connection handshake.
    ///
    /// Fails with [`SurfaceError::AuthorizationRequired`] when the surface
    /// wants the user to authorize through its own flow first.
    async fn connect(&self, access_token: &str, events: SurfaceEvents) -> Result<(), SurfaceError>;

    async fn disconnect(&self);

    /// Hands off to the surface's own authorization flow. The outcome comes
    /// back later as a redirect (see [`crate::callback`]).
    async fn authorize(&self, play_uri: &str) -> Result<(), SurfaceError>;

    async fn subscribe(&self) -> Result<(), SurfaceError>;

    async fn unsubscribe(&self) -> Result<(), SurfaceError>;

    async fn play(&self, uri: &str) -> Result<(), SurfaceError>;

    async fn pause(&self) -> Result<(), SurfaceError>;

    async fn resume(&self) -> Result<(), SurfaceError>;

    async fn skip_next(&self) -> Result<(), SurfaceError>;

    async fn skip_previous(&self) -> Result<(), SurfaceError>;

    async fn seek(&self, position_ms: u64) -> Result<(), SurfaceError>;

    async fn player_state(&self) -> Result<PlayerState, SurfaceError>;

    async fn fetch_image(&self, image: &str, size: ImageSize) -> Result<Vec<u8>, SurfaceError>;
}
