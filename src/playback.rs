//! Playback coordinator.
//!
//! Decides per song whether audio comes from the remote surface or from a
//! local player fed with a preview clip, and routes transport commands to
//! whichever path is active.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, mpsc};

use crate::{
    error::PlaybackError,
    management::{PreviewResolver, SessionManager},
    remote::{RemoteHandle, RemoteNotice, Telemetry},
    types::Song,
};

/// Plays audio from a URL on this machine.
#[async_trait]
pub trait LocalPlayer: Send + Sync {
    async fn play(&self, url: &str) -> Result<(), PlaybackError>;

    async fn pause(&self) -> Result<(), PlaybackError>;

    async fn resume(&self) -> Result<(), PlaybackError>;

    /// `fraction` of the current clip, in `0.0..=1.0`.
    async fn seek(&self, fraction: f64) -> Result<(), PlaybackError>;

    async fn stop(&self) -> Result<(), PlaybackError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ActivePath {
    #[default]
    Idle,
    Remote,
    Local,
}

#[derive(Debug, Default)]
struct State {
    path: ActivePath,
    current: Option<Song>,
    local: Telemetry,
}

pub struct Playback {
    session: Arc<SessionManager>,
    remote: Option<RemoteHandle>,
    local: Arc<dyn LocalPlayer>,
    previews: PreviewResolver,
    state: Mutex<State>,
}

impl Playback {
    pub fn new(
        session: Arc<SessionManager>,
        remote: Option<RemoteHandle>,
        local: Arc<dyn LocalPlayer>,
        previews: PreviewResolver,
    ) -> Self {
        Playback {
            session,
            remote,
            local,
            previews,
            state: Mutex::new(State::default()),
        }
    }

    pub async fn active_path(&self) -> ActivePath {
        self.state.lock().await.path
    }

    pub async fn current(&self) -> Option<Song> {
        self.state.lock().await.current.clone()
    }

    /// Plays `song` remotely if the controller accepts it, otherwise plays
    /// its preview locally.
    pub async fn play(&self, song: &Song) -> Result<ActivePath, PlaybackError> {
        if let Some(remote) = &self.remote {
            let token = self.session.valid_access_token().await;
            if let Some(token) = &token {
                remote.update_access_token(token.clone());
            }

            if remote.attempt_remote_playback(song, token.as_deref()).await {
                let mut state = self.state.lock().await;
                if state.path == ActivePath::Local {
                    if let Err(e) = self.local.stop().await {
                        log::warn!("{e}");
                    }
                }
                state.path = ActivePath::Remote;
                state.current = Some(song.clone());
                state.local = Telemetry::default();
                return Ok(ActivePath::Remote);
            }
            log::debug!("remote playback refused for {}", song.title);
        }

        self.play_local(song).await?;
        Ok(ActivePath::Local)
    }

    async fn play_local(&self, song: &Song) -> Result<(), PlaybackError> {
        let url = self
            .previews
            .resolve(song)
            .await
            .ok_or_else(|| PlaybackError::NoPlayableSource(song.title.clone()))?;

        let mut state = self.state.lock().await;
        if state.path == ActivePath::Remote {
            // Only one path may own playback.
            self.with_remote(RemoteHandle::disconnect);
        }
        self.local.play(&url).await?;

        state.path = ActivePath::Local;
        state.current = Some(song.clone());
        state.local = Telemetry {
            song_uri: Some(url),
            song_name: Some(song.title.clone()),
            is_playing: true,
            ..Telemetry::default()
        };
        Ok(())
    }

    /// Falls back to the local player when the remote side gives up on the
    /// song that is currently supposed to play. Returns the path now active,
    /// or `None` when the notice was about something else.
    pub async fn handle_notice(
        &self,
        notice: RemoteNotice,
    ) -> Result<Option<ActivePath>, PlaybackError> {
        let RemoteNotice::Unavailable { play_uri } = notice;
        let song = {
            let state = self.state.lock().await;
            match &state.current {
                Some(song)
                    if state.path == ActivePath::Remote
                        && song.platform_uri.as_deref() == Some(play_uri.as_str()) =>
                {
                    song.clone()
                }
                _ => return Ok(None),
            }
        };

        log::info!("remote playback unavailable, playing preview of {}", song.title);
        self.play_local(&song).await?;
        Ok(Some(ActivePath::Local))
    }

    /// Feeds controller notices into [`Self::handle_notice`] until the
    /// channel closes.
    pub async fn run_notices(self: Arc<Self>, mut notices: mpsc::UnboundedReceiver<RemoteNotice>) {
        while let Some(notice) = notices.recv().await {
            if let Err(e) = self.handle_notice(notice).await {
                log::warn!("{e}");
            }
        }
    }

    pub async fn toggle_play_pause(&self) -> Result<(), PlaybackError> {
        let mut state = self.state.lock().await;
        match state.path {
            ActivePath::Remote => self.with_remote(RemoteHandle::toggle_play_pause),
            ActivePath::Local => {
                if state.local.is_playing {
                    self.local.pause().await?;
                } else {
                    self.local.resume().await?;
                }
                state.local.is_playing = !state.local.is_playing;
            }
            ActivePath::Idle => {}
        }
        Ok(())
    }

    pub async fn skip_next(&self) -> Result<(), PlaybackError> {
        let mut state = self.state.lock().await;
        match state.path {
            ActivePath::Remote => self.with_remote(RemoteHandle::skip_next),
            // A preview is a single clip; there is nothing to skip to.
            ActivePath::Local => {
                self.local.stop().await?;
                state.local.is_playing = false;
                state.local.position_secs = 0.0;
            }
            ActivePath::Idle => {}
        }
        Ok(())
    }

    pub async fn skip_previous(&self) -> Result<(), PlaybackError> {
        let mut state = self.state.lock().await;
        match state.path {
            ActivePath::Remote => self.with_remote(RemoteHandle::skip_previous),
            ActivePath::Local => {
                self.local.seek(0.0).await?;
                state.local.position_secs = 0.0;
            }
            ActivePath::Idle => {}
        }
        Ok(())
    }

    pub async fn seek(&self, fraction: f64) -> Result<(), PlaybackError> {
        let fraction = if fraction.is_nan() {
            0.0
        } else {
            fraction.clamp(0.0, 1.0)
        };

        let mut state = self.state.lock().await;
        match state.path {
            ActivePath::Remote => self.with_remote(|remote| remote.seek(fraction)),
            ActivePath::Local => {
                self.local.seek(fraction).await?;
                state.local.position_secs = fraction * state.local.duration_secs;
            }
            ActivePath::Idle => {}
        }
        Ok(())
    }

    /// Progress report from the local player. Ignored unless the local
    /// path is active.
    pub async fn local_tick(&self, position_secs: f64, duration_secs: f64, is_playing: bool) {
        let mut state = self.state.lock().await;
        if state.path != ActivePath::Local {
            return;
        }
        state.local.position_secs = position_secs;
        state.local.duration_secs = duration_secs;
        state.local.is_playing = is_playing;
    }

    /// Telemetry of whichever path is active.
    pub async fn telemetry(&self) -> Telemetry {
        let state = self.state.lock().await;
        match (state.path, &self.remote) {
            (ActivePath::Remote, Some(remote)) => remote.snapshot().telemetry,
            (ActivePath::Local, _) => state.local.clone(),
            _ => Telemetry::default(),
        }
    }

    fn with_remote(&self, command: impl FnOnce(&RemoteHandle)) {
        if let Some(remote) = &self.remote {
            command(remote);
        }
    }
}
