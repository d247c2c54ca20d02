//! Remote playback controller.
//!
//! Drives an external playback surface (the Spotify app or a Spotify Connect
//! device) through a small connection state machine. Commands issued before
//! the connection is up are queued and replayed in order once it is.
//!
//! Use [`spawn`] to start the controller and talk to it through the returned
//! [`RemoteHandle`].

mod actor;
mod controller;
mod pending;
mod surface;
pub mod web_api;

pub use actor::{RemoteHandle, RemoteNotice, Snapshot, SurfaceEvents, spawn};
pub use controller::{
    ARTWORK_CACHE_CAPACITY, Artwork, AuthorizationCallback, ConnectionState, Controller, Effect,
    Telemetry,
};
pub use pending::{PendingAction, PendingActions};
pub use surface::{ImageSize, PlayerState, RemoteSurface};
