use std::{sync::Arc, time::Duration};

use clap::Subcommand;

use crate::{
    cli::{open_session, spinner},
    error,
    http::ReqwestClient,
    info,
    remote::{
        self, AuthorizationCallback, ConnectionState, RemoteHandle, RemoteNotice, Snapshot,
        web_api::WebApiSurface,
    },
    success,
    types::Song,
    warning,
};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(15);
/// Time given to the Spotify app to come up after the handoff.
const HANDOFF_GRACE: Duration = Duration::from_secs(5);

#[derive(Subcommand, Debug, Clone)]
pub enum RemoteAction {
    /// Play a track, e.g. spotify:track:4uLU6hMCjMI75M1A2tKUQC
    Play { uri: String },
    /// Toggle between play and pause
    Toggle,
    /// Skip to the next track
    Next,
    /// Skip to the previous track
    Previous,
    /// Seek to a fraction of the current track (0.0 - 1.0)
    Seek { fraction: f64 },
}

/// Sends one command through the remote controller to the active Spotify
/// Connect device and reports what ended up playing.
pub async fn remote(action: RemoteAction) {
    let session = match open_session().await {
        Ok(session) => session,
        Err(e) => error!("Cannot open session: {}", e),
    };
    let Some(token) = session.valid_access_token().await else {
        error!("Not logged in. Run `liquidglass auth` first.");
    };

    let surface = WebApiSurface::new(Arc::new(ReqwestClient::new()), &session.config().api_url);
    let (handle, mut notices) = remote::spawn(Some(Arc::new(surface)));
    handle.update_access_token(token.clone());

    // Transport commands depend on what the device is doing, so they wait
    // for a connection and the first telemetry before being issued.
    let command = match action {
        RemoteAction::Play { uri } => {
            let song = Song {
                id: uri.clone(),
                title: uri.clone(),
                artist: String::new(),
                platform_uri: Some(uri),
            };
            if !handle.attempt_remote_playback(&song, Some(token.as_str())).await {
                handle.shutdown().await;
                error!("Remote playback is unavailable.");
            }
            None
        }
        command => {
            handle.connect();
            Some(command)
        }
    };

    let pb = spinner("Connecting to Spotify...");
    let outcome = tokio::time::timeout(
        CONNECT_TIMEOUT,
        wait_for_connection(&handle, &mut notices, &token),
    )
    .await;
    pb.finish_and_clear();

    match outcome {
        Ok(Ok(snapshot)) => {
            match command {
                Some(command) => issue(&handle, command, &snapshot),
                None => report(&snapshot),
            }
            handle.shutdown().await;
        }
        Ok(Err(reason)) => {
            handle.shutdown().await;
            warning!("{}", reason);
        }
        Err(_) => {
            let state = handle.snapshot().state;
            handle.shutdown().await;
            warning!("Gave up waiting for Spotify ({}).", state);
        }
    }
}

/// Sends `command` against a connection whose telemetry is `snapshot`.
fn issue(handle: &RemoteHandle, command: RemoteAction, snapshot: &Snapshot) {
    let telemetry = &snapshot.telemetry;
    let name = telemetry.song_name.as_deref().unwrap_or("nothing");
    match command {
        RemoteAction::Toggle => {
            handle.toggle_play_pause();
            if telemetry.is_playing {
                success!("Paused {}", name);
            } else {
                success!("Playing {}", name);
            }
        }
        RemoteAction::Next => {
            handle.skip_next();
            success!("Skipped to the next track.");
        }
        RemoteAction::Previous => {
            handle.skip_previous();
            success!("Skipped to the previous track.");
        }
        RemoteAction::Seek { fraction } => {
            handle.seek(fraction);
            success!(
                "Seeked {} to {:.0}s",
                name,
                fraction.clamp(0.0, 1.0) * telemetry.duration_secs
            );
        }
        RemoteAction::Play { .. } => {}
    }
}

/// Resolves once the controller is connected, has nothing left to replay
/// and has heard from the device.
async fn wait_for_connection(
    handle: &RemoteHandle,
    notices: &mut tokio::sync::mpsc::UnboundedReceiver<RemoteNotice>,
    token: &str,
) -> Result<Snapshot, String> {
    let mut snapshots = handle.watch();
    let mut handed_off = false;
    // The controller starts out disconnected; only a disconnect after an
    // update means the connection attempt failed.
    let mut updated = false;

    loop {
        updated |= snapshots.has_changed().unwrap_or(false);
        let snapshot = snapshots.borrow_and_update().clone();
        match snapshot.state {
            ConnectionState::Connected if snapshot.pending.is_empty() && snapshot.synced => {
                return Ok(snapshot);
            }
            ConnectionState::Disconnected if updated => {
                return Err("No active Spotify device found.".to_string());
            }
            ConnectionState::AwaitingAuthorization if !handed_off => {
                // The Web API handoff opens Spotify; a device shows up once it
                // runs, and the same bearer token stays valid.
                handed_off = true;
                info!("Opened Spotify, retrying shortly...");
                tokio::time::sleep(HANDOFF_GRACE).await;
                handle.authorization_callback(AuthorizationCallback::Token(token.to_string()));
            }
            _ => {}
        }

        tokio::select! {
            changed = snapshots.changed() => {
                if changed.is_err() {
                    return Err("Remote controller stopped.".to_string());
                }
            }
            Some(RemoteNotice::Unavailable { play_uri }) = notices.recv() => {
                return Err(format!("Cannot play {play_uri} on any Spotify device."));
            }
        }
    }
}

fn report(snapshot: &Snapshot) {
    let telemetry = &snapshot.telemetry;
    match &telemetry.song_name {
        Some(name) => success!(
            "{} {} ({:.0}s / {:.0}s)",
            if telemetry.is_playing { "Playing" } else { "Paused" },
            name,
            telemetry.position_secs,
            telemetry.duration_secs
        ),
        None => success!("Done."),
    }
}
