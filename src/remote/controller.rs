//! Connection state machine of the remote playback controller.
//!
//! [`Controller`] performs no I/O. Every handler mutates state and records
//! [`Effect`]s; the actor in [`crate::remote::actor`] takes them with
//! [`Controller::take_effects`] and executes them against the surface.
//! Completions come back through the `*_succeeded`/`*_failed`/`*_received`
//! handlers tagged with the connection generation they were issued under,
//! and anything from an older generation is dropped.

use std::{
    collections::{HashSet, VecDeque},
    fmt,
    sync::Arc,
};

use crate::{
    error::SurfaceError,
    remote::{PendingAction, PendingActions, PlayerState},
    types::Song,
};

/// Raw image bytes shared between the cache and the telemetry.
pub type Artwork = Arc<Vec<u8>>;

/// Artwork of this many recent tracks is kept.
pub const ARTWORK_CACHE_CAPACITY: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    AwaitingAuthorization,
    Connected,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::AwaitingAuthorization => "awaiting authorization",
            ConnectionState::Connected => "connected",
        };
        f.write_str(name)
    }
}

/// Live playback state mirrored from whichever playback path is active.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Telemetry {
    pub song_uri: Option<String>,
    pub song_name: Option<String>,
    pub is_playing: bool,
    pub position_secs: f64,
    pub duration_secs: f64,
    pub artwork: Option<Artwork>,
}

/// Outcome of the surface's own authorization flow, routed here from the
/// redirect URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthorizationCallback {
    Token(String),
    Denied(String),
}

/// Work the actor must carry out on behalf of the state machine.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    Connect { generation: u64, access_token: String },
    Authorize { play_uri: String },
    Disconnect,
    Subscribe,
    Unsubscribe,
    Play(String),
    Pause,
    Resume,
    SkipNext,
    SkipPrevious,
    /// `duration_ms` is `None` when no telemetry is known yet; the actor
    /// then asks the surface for the duration before seeking.
    Seek { fraction: f64, duration_ms: Option<u64> },
    RequestPlayerState { generation: u64 },
    FetchArtwork { key: String, image: String },
    /// A play attempt that was accepted earlier did not make it to the
    /// surface. The caller should fall back to local playback.
    ReportUnavailable { play_uri: String },
}

#[derive(Debug, Default)]
pub struct Controller {
    state: ConnectionState,
    generation: u64,
    access_token: Option<String>,
    play_intent: Option<String>,
    pending: PendingActions,
    telemetry: Telemetry,
    artwork_key: Option<String>,
    /// Most recently used last.
    artwork_cache: VecDeque<(String, Artwork)>,
    artwork_requested: HashSet<String>,
    /// The one authorization handoff of the current play attempt is spent.
    handoff_used: bool,
    /// Telemetry holds a push from the current connection.
    synced: bool,
    effects: Vec<Effect>,
}

impl Controller {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn telemetry(&self) -> &Telemetry {
        &self.telemetry
    }

    pub fn pending(&self) -> &PendingActions {
        &self.pending
    }

    pub fn is_synced(&self) -> bool {
        self.synced
    }

    pub fn play_intent(&self) -> Option<&str> {
        self.play_intent.as_deref()
    }

    pub fn access_token(&self) -> Option<&str> {
        self.access_token.as_deref()
    }

    pub fn take_effects(&mut self) -> Vec<Effect> {
        std::mem::take(&mut self.effects)
    }

    /// Token pushed down by the session layer. Used by the next handshake.
    pub fn update_access_token(&mut self, access_token: impl Into<String>) {
        self.access_token = Some(access_token.into());
    }

    /// Asks for `song` to be played remotely.
    ///
    /// Returns `false` without touching any state when the song has no
    /// platform URI, no access token is available or the surface host is
    /// unreachable. `true` only means the attempt was accepted: the track
    /// plays now (connected), after the handshake (disconnected) or is
    /// reported unavailable later through [`Effect::ReportUnavailable`].
    pub fn attempt_remote_playback(
        &mut self,
        song: &Song,
        access_token: Option<&str>,
        host_reachable: bool,
    ) -> bool {
        let Some(uri) = song.platform_uri.as_deref().filter(|uri| !uri.is_empty()) else {
            log::debug!("\"{}\" has no platform uri", song.title);
            return false;
        };
        let Some(access_token) = access_token.filter(|token| !token.is_empty()) else {
            log::debug!("no access token for remote playback");
            return false;
        };
        if !host_reachable {
            log::debug!("remote surface host not reachable");
            return false;
        }

        self.access_token = Some(access_token.to_string());
        match self.state {
            ConnectionState::Connected => self.play_now(uri.to_string()),
            ConnectionState::Connecting | ConnectionState::AwaitingAuthorization => {
                self.play_intent = Some(uri.to_string());
            }
            ConnectionState::Disconnected => {
                self.play_intent = Some(uri.to_string());
                self.handoff_used = false;
                self.begin_connect();
            }
        }
        true
    }

    /// Opens a connection without queueing anything, so that telemetry
    /// can be read before a command depends on it. No-op unless
    /// disconnected.
    pub fn connect(&mut self) {
        if self.state == ConnectionState::Disconnected {
            self.begin_connect();
        }
    }

    pub fn toggle_play_pause(&mut self) {
        let action = PendingAction::SetPlaying(!self.telemetry.is_playing);
        self.command(action);
    }

    pub fn skip_next(&mut self) {
        self.command(PendingAction::SkipNext);
    }

    pub fn skip_previous(&mut self) {
        self.command(PendingAction::SkipPrevious);
    }

    /// Seeks to `fraction` of the current track, clamped to `0.0..=1.0`.
    pub fn seek(&mut self, fraction: f64) {
        let fraction = if fraction.is_nan() {
            0.0
        } else {
            fraction.clamp(0.0, 1.0)
        };
        self.command(PendingAction::Seek(fraction));
    }

    /// Ends the session: any state goes to `Disconnected`, the queue, the
    /// play-intent and the telemetry are discarded.
    pub fn disconnect(&mut self) {
        match self.state {
            ConnectionState::Connected => {
                self.effects.push(Effect::Unsubscribe);
                self.effects.push(Effect::Disconnect);
            }
            ConnectionState::Connecting => self.effects.push(Effect::Disconnect),
            _ => {}
        }
        self.reset();
    }

    /// Drops a live connection when the app goes to the background.
    ///
    /// A handshake or authorization in flight is left alone, otherwise the
    /// authorization callback would have nothing to come back to.
    pub fn enter_background(&mut self) {
        match self.state {
            ConnectionState::Connected => self.disconnect(),
            ConnectionState::Connecting | ConnectionState::AwaitingAuthorization => {
                log::debug!("keeping {} handshake across background", self.state);
            }
            ConnectionState::Disconnected => {}
        }
    }

    pub fn connect_succeeded(&mut self, generation: u64) {
        if generation != self.generation || self.state != ConnectionState::Connecting {
            log::debug!("ignoring stale connect success ({generation})");
            return;
        }

        self.state = ConnectionState::Connected;
        self.handoff_used = false;
        self.effects.push(Effect::Subscribe);

        match self.play_intent.take() {
            Some(uri) => self.play_now(uri),
            None => self.effects.push(Effect::RequestPlayerState { generation }),
        }

        for action in self.pending.drain() {
            self.execute(action);
        }
    }

    pub fn connect_failed(&mut self, generation: u64, error: &SurfaceError) {
        if generation != self.generation {
            log::debug!("ignoring stale connect failure ({generation}): {error}");
            return;
        }

        match self.state {
            ConnectionState::Connecting => {}
            ConnectionState::AwaitingAuthorization => {
                log::debug!("connect failed while awaiting authorization: {error}");
                return;
            }
            _ => return,
        }

        log::debug!("connect failed: {error}");
        match self.play_intent.clone() {
            Some(uri) if !self.handoff_used => {
                self.handoff_used = true;
                self.state = ConnectionState::AwaitingAuthorization;
                self.effects.push(Effect::Authorize { play_uri: uri });
            }
            Some(uri) => {
                // The handoff was already spent on this attempt; give up.
                self.state = ConnectionState::Disconnected;
                self.play_intent = None;
                self.handoff_used = false;
                self.effects.push(Effect::ReportUnavailable { play_uri: uri });
            }
            None => self.reset(),
        }
    }

    pub fn authorization_callback(&mut self, callback: AuthorizationCallback) {
        match callback {
            AuthorizationCallback::Token(token) => {
                self.access_token = Some(token);
                if self.state == ConnectionState::AwaitingAuthorization {
                    self.begin_connect();
                }
            }
            AuthorizationCallback::Denied(reason) => {
                if self.state != ConnectionState::AwaitingAuthorization {
                    log::debug!("ignoring authorization error while {}: {reason}", self.state);
                    return;
                }
                log::debug!("authorization denied: {reason}");

                // The queue survives: the user did not cancel those commands.
                self.state = ConnectionState::Disconnected;
                self.handoff_used = false;
                if let Some(uri) = self.play_intent.take() {
                    self.effects.push(Effect::ReportUnavailable { play_uri: uri });
                }
            }
        }
    }

    pub fn remote_disconnected(&mut self, generation: u64, reason: &str) {
        if generation != self.generation {
            return;
        }
        match self.state {
            ConnectionState::Connected | ConnectionState::Connecting => {
                log::debug!("remote surface disconnected: {reason}");
                self.reset();
            }
            _ => {}
        }
    }

    /// Overwrites the telemetry wholesale with a push from the surface.
    ///
    /// Last write wins, including over optimistic updates of commands still
    /// in flight.
    pub fn player_state_received(&mut self, generation: u64, player: PlayerState) {
        if generation != self.generation || self.state != ConnectionState::Connected {
            return;
        }

        let key = player.track_uri.clone().or_else(|| player.track_name.clone());
        let artwork = key.as_deref().and_then(|key| self.cached_artwork(key));

        if let (None, Some(key), Some(image)) = (&artwork, &key, &player.image) {
            if self.artwork_requested.insert(key.clone()) {
                self.effects.push(Effect::FetchArtwork {
                    key: key.clone(),
                    image: image.clone(),
                });
            }
        }

        self.telemetry = Telemetry {
            song_uri: player.track_uri,
            song_name: player.track_name,
            is_playing: !player.is_paused,
            position_secs: player.position_ms as f64 / 1000.0,
            duration_secs: player.duration_ms as f64 / 1000.0,
            artwork,
        };
        self.artwork_key = key;
        self.synced = true;
    }

    /// Artwork fetch finished. `None` means it failed and may be retried by
    /// the next telemetry push.
    pub fn artwork_received(&mut self, key: &str, artwork: Option<Artwork>) {
        self.artwork_requested.remove(key);
        let Some(artwork) = artwork else {
            return;
        };

        self.artwork_cache.retain(|(cached, _)| cached != key);
        if self.artwork_cache.len() >= ARTWORK_CACHE_CAPACITY {
            self.artwork_cache.pop_front();
        }
        self.artwork_cache
            .push_back((key.to_string(), Arc::clone(&artwork)));
        if self.artwork_key.as_deref() == Some(key) {
            self.telemetry.artwork = Some(artwork);
        }
    }

    pub fn has_artwork(&self, key: &str) -> bool {
        self.artwork_cache.iter().any(|(cached, _)| cached == key)
    }

    /// Looks `key` up and marks it as most recently used.
    fn cached_artwork(&mut self, key: &str) -> Option<Artwork> {
        let index = self.artwork_cache.iter().position(|(cached, _)| cached == key)?;
        let entry = self.artwork_cache.remove(index)?;
        let artwork = Arc::clone(&entry.1);
        self.artwork_cache.push_back(entry);
        Some(artwork)
    }

    fn begin_connect(&mut self) {
        let Some(access_token) = self.access_token.clone() else {
            log::debug!("no access token, not connecting");
            return;
        };

        self.generation += 1;
        self.state = ConnectionState::Connecting;
        self.synced = false;
        self.effects.push(Effect::Connect {
            generation: self.generation,
            access_token,
        });
    }

    fn command(&mut self, action: PendingAction) {
        if self.state == ConnectionState::Connected {
            self.execute(action);
            return;
        }

        self.pending.push(action);
        if self.state == ConnectionState::Disconnected {
            self.begin_connect();
        }
    }

    /// Applies `action` against the live connection, updating the
    /// telemetry optimistically before the round trip.
    fn execute(&mut self, action: PendingAction) {
        match action {
            PendingAction::SetPlaying(playing) => {
                self.telemetry.is_playing = playing;
                self.effects
                    .push(if playing { Effect::Resume } else { Effect::Pause });
            }
            PendingAction::SkipNext => self.effects.push(Effect::SkipNext),
            PendingAction::SkipPrevious => self.effects.push(Effect::SkipPrevious),
            PendingAction::Seek(fraction) => {
                let duration_ms = if self.telemetry.duration_secs > 0.0 {
                    self.telemetry.position_secs = fraction * self.telemetry.duration_secs;
                    Some((self.telemetry.duration_secs * 1000.0) as u64)
                } else {
                    None
                };
                self.effects.push(Effect::Seek {
                    fraction,
                    duration_ms,
                });
            }
        }
    }

    fn play_now(&mut self, uri: String) {
        // Name, duration and artwork arrive with the next push.
        self.telemetry = Telemetry {
            song_uri: Some(uri.clone()),
            is_playing: true,
            ..Telemetry::default()
        };
        self.artwork_key = None;
        self.effects.push(Effect::Play(uri));
    }

    fn reset(&mut self) {
        self.generation += 1;
        self.state = ConnectionState::Disconnected;
        self.play_intent = None;
        self.handoff_used = false;
        self.pending.clear();
        self.telemetry = Telemetry::default();
        self.artwork_key = None;
        self.synced = false;
    }
}
