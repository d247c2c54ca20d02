use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, watch};

use crate::{
    error::SurfaceError,
    remote::{
        Artwork, AuthorizationCallback, ConnectionState, Controller, Effect, ImageSize,
        PendingAction, PlayerState, RemoteSurface, Telemetry,
    },
    types::Song,
};

/// What the rest of the application can observe of the controller.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub state: ConnectionState,
    pub telemetry: Telemetry,
    pub pending: Vec<PendingAction>,
    pub play_intent: Option<String>,
    /// `telemetry` reflects the device rather than defaults or guesses.
    pub synced: bool,
}

/// Asynchronous signals for the playback layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteNotice {
    /// A play attempt accepted earlier could not be carried out remotely.
    Unavailable { play_uri: String },
}

enum Message {
    Attempt {
        song: Song,
        access_token: Option<String>,
        reply: oneshot::Sender<bool>,
    },
    UpdateAccessToken(String),
    Connect,
    TogglePlayPause,
    SkipNext,
    SkipPrevious,
    Seek(f64),
    Disconnect,
    EnterBackground,
    Authorization(AuthorizationCallback),
    ConnectFinished {
        generation: u64,
        result: Result<(), SurfaceError>,
    },
    PlayerState {
        generation: u64,
        state: PlayerState,
    },
    SurfaceDisconnected {
        generation: u64,
        reason: String,
    },
    ArtworkFetched {
        key: String,
        artwork: Option<Artwork>,
    },
    Shutdown(oneshot::Sender<()>),
}

enum LaneItem {
    Command(Effect),
    /// Answered once every command queued before it has run.
    Flush(oneshot::Sender<()>),
}

/// Sink through which a [`RemoteSurface`] reports pushes for one
/// connection. Pushes from a connection that has since been replaced are
/// dropped by the controller.
#[derive(Clone)]
pub struct SurfaceEvents {
    generation: u64,
    tx: mpsc::UnboundedSender<Message>,
}

impl SurfaceEvents {
    /// Returns `false` once the controller is gone.
    pub fn player_state(&self, state: PlayerState) -> bool {
        self.tx
            .send(Message::PlayerState {
                generation: self.generation,
                state,
            })
            .is_ok()
    }

    pub fn disconnected(&self, reason: impl Into<String>) -> bool {
        self.tx
            .send(Message::SurfaceDisconnected {
                generation: self.generation,
                reason: reason.into(),
            })
            .is_ok()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// Cloneable handle to the controller actor.
///
/// Dropping every handle stops the actor, which disconnects the surface on
/// its way out.
#[derive(Clone)]
pub struct RemoteHandle {
    tx: mpsc::UnboundedSender<Message>,
    snapshot: watch::Receiver<Snapshot>,
}

impl RemoteHandle {
    /// See [`Controller::attempt_remote_playback`]. Also `false` when the
    /// actor has stopped.
    pub async fn attempt_remote_playback(&self, song: &Song, access_token: Option<&str>) -> bool {
        let (reply, response) = oneshot::channel();
        let message = Message::Attempt {
            song: song.clone(),
            access_token: access_token.map(str::to_string),
            reply,
        };
        if self.tx.send(message).is_err() {
            return false;
        }
        response.await.unwrap_or(false)
    }

    pub fn update_access_token(&self, access_token: impl Into<String>) {
        self.send(Message::UpdateAccessToken(access_token.into()));
    }

    /// See [`Controller::connect`].
    pub fn connect(&self) {
        self.send(Message::Connect);
    }

    pub fn toggle_play_pause(&self) {
        self.send(Message::TogglePlayPause);
    }

    pub fn skip_next(&self) {
        self.send(Message::SkipNext);
    }

    pub fn skip_previous(&self) {
        self.send(Message::SkipPrevious);
    }

    pub fn seek(&self, fraction: f64) {
        self.send(Message::Seek(fraction));
    }

    pub fn disconnect(&self) {
        self.send(Message::Disconnect);
    }

    pub fn enter_background(&self) {
        self.send(Message::EnterBackground);
    }

    pub fn authorization_callback(&self, callback: AuthorizationCallback) {
        self.send(Message::Authorization(callback));
    }

    /// Disconnects and stops the actor, returning once the surface has seen
    /// every command issued so far. Other handles stop working as well.
    pub async fn shutdown(self) {
        let (reply, done) = oneshot::channel();
        if self.tx.send(Message::Shutdown(reply)).is_ok() {
            let _ = done.await;
        }
    }

    pub fn snapshot(&self) -> Snapshot {
        self.snapshot.borrow().clone()
    }

    pub fn watch(&self) -> watch::Receiver<Snapshot> {
        self.snapshot.clone()
    }

    /// Waits until `predicate` holds for the published snapshot. `None` when
    /// the actor stopped first.
    pub async fn wait_until(&self, predicate: impl FnMut(&Snapshot) -> bool) -> Option<Snapshot> {
        let mut rx = self.snapshot.clone();
        rx.wait_for(predicate).await.ok().map(|s| s.clone())
    }

    fn send(&self, message: Message) {
        if self.tx.send(message).is_err() {
            log::debug!("remote controller has stopped");
        }
    }
}

/// Starts the controller actor on the current tokio runtime.
///
/// `surface` is `None` when no remote playback surface exists on this
/// platform; every play attempt then returns `false`. Notices about play
/// attempts that fail after being accepted arrive on the returned receiver.
pub fn spawn(
    surface: Option<Arc<dyn RemoteSurface>>,
) -> (RemoteHandle, mpsc::UnboundedReceiver<RemoteNotice>) {
    let (tx, commands) = mpsc::unbounded_channel();
    let (internal_tx, internal) = mpsc::unbounded_channel();
    let (lane_tx, lane) = mpsc::unbounded_channel();
    let (notices_tx, notices) = mpsc::unbounded_channel();
    let (snapshot_tx, snapshot) = watch::channel(Snapshot::default());

    if let Some(surface) = &surface {
        tokio::spawn(run_lane(Arc::clone(surface), lane, internal_tx.clone()));
    }

    let actor = Actor {
        controller: Controller::new(),
        surface,
        internal_tx,
        lane_tx,
        notices: notices_tx,
        snapshot: snapshot_tx,
    };
    tokio::spawn(actor.run(commands, internal));

    (RemoteHandle { tx, snapshot }, notices)
}

struct Actor {
    controller: Controller,
    surface: Option<Arc<dyn RemoteSurface>>,
    internal_tx: mpsc::UnboundedSender<Message>,
    lane_tx: mpsc::UnboundedSender<LaneItem>,
    notices: mpsc::UnboundedSender<RemoteNotice>,
    snapshot: watch::Sender<Snapshot>,
}

impl Actor {
    async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<Message>,
        mut internal: mpsc::UnboundedReceiver<Message>,
    ) {
        loop {
            let message = tokio::select! {
                message = commands.recv() => match message {
                    Some(message) => message,
                    None => break,
                },
                Some(message) = internal.recv() => message,
            };

            if let Message::Shutdown(reply) = message {
                self.stop(Some(reply));
                return;
            }

            self.handle(message).await;
            self.execute_effects();
            self.publish();
        }

        self.stop(None);
    }

    fn stop(&mut self, reply: Option<oneshot::Sender<()>>) {
        log::debug!("remote controller stopping");
        self.controller.disconnect();
        self.execute_effects();
        self.publish();

        if let Some(reply) = reply {
            // Without a lane there is nothing to wait for.
            if let Err(mpsc::error::SendError(LaneItem::Flush(reply))) =
                self.lane_tx.send(LaneItem::Flush(reply))
            {
                let _ = reply.send(());
            }
        }
    }

    async fn handle(&mut self, message: Message) {
        match message {
            Message::Attempt {
                song,
                access_token,
                reply,
            } => {
                let reachable = match &self.surface {
                    Some(surface) => surface.is_available().await,
                    None => false,
                };
                let accepted = self.controller.attempt_remote_playback(
                    &song,
                    access_token.as_deref(),
                    reachable,
                );
                let _ = reply.send(accepted);
            }
            Message::UpdateAccessToken(token) => self.controller.update_access_token(token),
            Message::Connect => self.controller.connect(),
            Message::TogglePlayPause => self.controller.toggle_play_pause(),
            Message::SkipNext => self.controller.skip_next(),
            Message::SkipPrevious => self.controller.skip_previous(),
            Message::Seek(fraction) => self.controller.seek(fraction),
            Message::Disconnect => self.controller.disconnect(),
            Message::EnterBackground => self.controller.enter_background(),
            Message::Authorization(callback) => self.controller.authorization_callback(callback),
            Message::ConnectFinished { generation, result } => match result {
                Ok(()) => self.controller.connect_succeeded(generation),
                Err(e) => self.controller.connect_failed(generation, &e),
            },
            Message::PlayerState { generation, state } => {
                self.controller.player_state_received(generation, state)
            }
            Message::SurfaceDisconnected { generation, reason } => {
                self.controller.remote_disconnected(generation, &reason)
            }
            Message::ArtworkFetched { key, artwork } => {
                self.controller.artwork_received(&key, artwork)
            }
            Message::Shutdown(_) => {}
        }
    }

    fn execute_effects(&mut self) {
        for effect in self.controller.take_effects() {
            log::trace!("effect: {effect:?}");
            match effect {
                Effect::Connect {
                    generation,
                    access_token,
                } => self.connect(generation, access_token),
                Effect::Authorize { play_uri } => {
                    if let Some(surface) = &self.surface {
                        let surface = Arc::clone(surface);
                        tokio::spawn(async move {
                            if let Err(e) = surface.authorize(&play_uri).await {
                                log::warn!("authorization handoff failed: {e}");
                            }
                        });
                    }
                }
                Effect::FetchArtwork { key, image } => {
                    if let Some(surface) = &self.surface {
                        let surface = Arc::clone(surface);
                        let tx = self.internal_tx.clone();
                        tokio::spawn(async move {
                            let artwork = match surface.fetch_image(&image, ImageSize::ARTWORK).await {
                                Ok(bytes) => Some(Arc::new(bytes)),
                                Err(e) => {
                                    log::debug!("artwork fetch for {key} failed: {e}");
                                    None
                                }
                            };
                            let _ = tx.send(Message::ArtworkFetched { key, artwork });
                        });
                    }
                }
                Effect::ReportUnavailable { play_uri } => {
                    let _ = self.notices.send(RemoteNotice::Unavailable { play_uri });
                }
                ordered => {
                    if self.lane_tx.send(LaneItem::Command(ordered)).is_err() {
                        log::debug!("command lane closed");
                    }
                }
            }
        }
    }

    fn connect(&self, generation: u64, access_token: String) {
        let tx = self.internal_tx.clone();
        let Some(surface) = &self.surface else {
            let _ = tx.send(Message::ConnectFinished {
                generation,
                result: Err(SurfaceError::Unavailable("no remote surface".to_string())),
            });
            return;
        };

        let surface = Arc::clone(surface);
        let events = SurfaceEvents {
            generation,
            tx: tx.clone(),
        };
        tokio::spawn(async move {
            let result = surface.connect(&access_token, events).await;
            let _ = tx.send(Message::ConnectFinished { generation, result });
        });
    }

    fn publish(&self) {
        let next = Snapshot {
            state: self.controller.state(),
            telemetry: self.controller.telemetry().clone(),
            pending: self.controller.pending().to_vec(),
            play_intent: self.controller.play_intent().map(str::to_string),
            synced: self.controller.is_synced(),
        };
        self.snapshot.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        });
    }
}

/// Executes surface commands one at a time, in the order the controller
/// issued them, so a flushed queue reaches the surface in FIFO order.
async fn run_lane(
    surface: Arc<dyn RemoteSurface>,
    mut lane: mpsc::UnboundedReceiver<LaneItem>,
    internal_tx: mpsc::UnboundedSender<Message>,
) {
    while let Some(item) = lane.recv().await {
        let effect = match item {
            LaneItem::Command(effect) => effect,
            LaneItem::Flush(reply) => {
                let _ = reply.send(());
                continue;
            }
        };

        let result = match effect {
            Effect::Subscribe => surface.subscribe().await,
            Effect::Unsubscribe => surface.unsubscribe().await,
            Effect::Disconnect => {
                surface.disconnect().await;
                Ok(())
            }
            Effect::Play(uri) => surface.play(&uri).await,
            Effect::Pause => surface.pause().await,
            Effect::Resume => surface.resume().await,
            Effect::SkipNext => surface.skip_next().await,
            Effect::SkipPrevious => surface.skip_previous().await,
            Effect::Seek {
                fraction,
                duration_ms,
            } => seek(surface.as_ref(), fraction, duration_ms).await,
            Effect::RequestPlayerState { generation } => match surface.player_state().await {
                Ok(state) => {
                    let _ = internal_tx.send(Message::PlayerState { generation, state });
                    Ok(())
                }
                Err(e) => Err(e),
            },
            other => {
                log::debug!("unexpected effect on command lane: {other:?}");
                Ok(())
            }
        };

        if let Err(e) = result {
            log::warn!("remote command failed: {e}");
        }
    }
}

async fn seek(
    surface: &dyn RemoteSurface,
    fraction: f64,
    duration_ms: Option<u64>,
) -> Result<(), SurfaceError> {
    let duration_ms = match duration_ms {
        Some(duration_ms) => duration_ms,
        None => surface.player_state().await?.duration_ms,
    };
    surface
        .seek((fraction * duration_ms as f64).round() as u64)
        .await
}
