mod common;

use std::{sync::Arc, time::Duration};

use common::{FakeSurface, song};
use liquidglass::{
    error::SurfaceError,
    remote::{
        self, AuthorizationCallback, ConnectionState, PlayerState, RemoteHandle, RemoteNotice,
        Snapshot,
    },
};

const URI: &str = "spotify:track:4uLU6hMCjMI75M1A2tKUQC";
const WAIT: Duration = Duration::from_secs(2);

async fn wait(handle: &RemoteHandle, predicate: impl FnMut(&Snapshot) -> bool) -> Snapshot {
    tokio::time::timeout(WAIT, handle.wait_until(predicate))
        .await
        .expect("timed out waiting for snapshot")
        .expect("controller stopped")
}

fn playing(uri: &str, image: Option<&str>) -> PlayerState {
    PlayerState {
        track_uri: Some(uri.to_string()),
        track_name: Some("Glass Heart".to_string()),
        artist_name: Some("The Panes".to_string()),
        image: image.map(str::to_string),
        is_paused: false,
        position_ms: 42_000,
        duration_ms: 200_000,
    }
}

#[tokio::test]
async fn test_no_surface_refuses_every_attempt() {
    let (handle, _notices) = remote::spawn(None);

    assert!(!handle.attempt_remote_playback(&song(Some(URI)), Some("token")).await);
    assert_eq!(handle.snapshot().state, ConnectionState::Disconnected);
}

#[tokio::test]
async fn test_unreachable_host_refuses_attempt() {
    let surface = Arc::new(FakeSurface::unavailable());
    let (handle, _notices) = remote::spawn(Some(surface.clone()));

    assert!(!handle.attempt_remote_playback(&song(Some(URI)), Some("token")).await);
    assert!(surface.calls().is_empty());
}

#[tokio::test]
async fn test_attempt_connects_and_plays() {
    let surface = Arc::new(FakeSurface::new());
    let (handle, _notices) = remote::spawn(Some(surface.clone()));

    assert!(handle.attempt_remote_playback(&song(Some(URI)), Some("token")).await);
    let snapshot = wait(&handle, |s| s.state == ConnectionState::Connected).await;
    assert_eq!(snapshot.telemetry.song_uri.as_deref(), Some(URI));
    handle.shutdown().await;

    assert_eq!(
        surface.calls(),
        vec![
            "connect:token".to_string(),
            "subscribe".to_string(),
            format!("play:{URI}"),
            "unsubscribe".to_string(),
            "disconnect".to_string(),
        ]
    );
}

#[tokio::test]
async fn test_queued_commands_reach_surface_in_order() {
    let surface = Arc::new(FakeSurface::new());
    surface.set_player_state(playing(URI, None));
    let (handle, _notices) = remote::spawn(Some(surface.clone()));
    handle.update_access_token("token");

    handle.skip_next();
    handle.seek(0.5);
    handle.toggle_play_pause();

    wait(&handle, |s| s.state == ConnectionState::Connected && s.pending.is_empty()).await;
    handle.shutdown().await;

    assert_eq!(
        surface.commands(),
        vec!["next", "seek:100000", "resume", "unsubscribe", "disconnect"]
    );
}

#[tokio::test]
async fn test_handoff_then_failure_reports_unavailable() {
    let surface = Arc::new(FakeSurface::new());
    surface.script_connects(vec![
        Err(SurfaceError::AuthorizationRequired),
        Err(SurfaceError::Unavailable("no device".to_string())),
    ]);
    let (handle, mut notices) = remote::spawn(Some(surface.clone()));

    assert!(handle.attempt_remote_playback(&song(Some(URI)), Some("token")).await);
    wait(&handle, |s| s.state == ConnectionState::AwaitingAuthorization).await;

    handle.authorization_callback(AuthorizationCallback::Token("fresh".to_string()));
    let notice = tokio::time::timeout(WAIT, notices.recv()).await.unwrap();

    assert_eq!(
        notice,
        Some(RemoteNotice::Unavailable {
            play_uri: URI.to_string(),
        })
    );
    wait(&handle, |s| s.state == ConnectionState::Disconnected).await;
    let calls = surface.calls();
    assert!(calls.contains(&format!("authorize:{URI}")));
    assert!(calls.contains(&"connect:fresh".to_string()));
}

#[tokio::test]
async fn test_pushed_telemetry_and_artwork_are_published() {
    let surface = Arc::new(FakeSurface::new());
    let (handle, _notices) = remote::spawn(Some(surface.clone()));
    assert!(handle.attempt_remote_playback(&song(Some(URI)), Some("token")).await);
    wait(&handle, |s| s.state == ConnectionState::Connected).await;

    assert!(surface.push_state(playing(URI, Some("cover-1"))));
    let snapshot = wait(&handle, |s| s.telemetry.artwork.is_some()).await;

    assert_eq!(snapshot.telemetry.song_name.as_deref(), Some("Glass Heart"));
    assert_eq!(snapshot.telemetry.position_secs, 42.0);
    assert_eq!(
        snapshot.telemetry.artwork.as_deref(),
        Some(&b"cover-1".to_vec())
    );
}

#[tokio::test]
async fn test_remote_disconnect_clears_state() {
    let surface = Arc::new(FakeSurface::new());
    let (handle, _notices) = remote::spawn(Some(surface.clone()));
    assert!(handle.attempt_remote_playback(&song(Some(URI)), Some("token")).await);
    wait(&handle, |s| s.state == ConnectionState::Connected).await;

    assert!(surface.drop_connection());
    let snapshot = wait(&handle, |s| s.state == ConnectionState::Disconnected).await;

    assert_eq!(snapshot.telemetry.song_uri, None);
    assert_eq!(snapshot.play_intent, None);
}

#[tokio::test]
async fn test_disconnect_discards_queue() {
    let surface = Arc::new(FakeSurface::new());
    surface.script_connects(vec![Err(SurfaceError::AuthorizationRequired)]);
    let (handle, _notices) = remote::spawn(Some(surface.clone()));
    assert!(handle.attempt_remote_playback(&song(Some(URI)), Some("token")).await);
    wait(&handle, |s| s.state == ConnectionState::AwaitingAuthorization).await;
    handle.skip_next();
    wait(&handle, |s| !s.pending.is_empty()).await;

    handle.disconnect();
    let snapshot = wait(&handle, |s| s.state == ConnectionState::Disconnected).await;

    assert!(snapshot.pending.is_empty());
}
