//! [`RemoteSurface`] over the Spotify Web API player endpoints.
//!
//! Playback happens on whatever Spotify Connect device the account has
//! active. There is no push channel, so player state is polled while
//! subscribed. The authorization handoff opens the track in the Spotify app
//! (or its web player), which activates a device for the next attempt.

use std::{
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tokio::task::JoinHandle;

use crate::{
    error::SurfaceError,
    http::{HttpBody, HttpClient, HttpRequest, HttpResponse},
    remote::{ImageSize, PlayerState, RemoteSurface, SurfaceEvents},
};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

const OPEN_SPOTIFY_URL: &str = "https://open.spotify.com";

#[derive(Debug, Deserialize)]
struct DevicesResponse {
    #[serde(default)]
    devices: Vec<Device>,
}

#[derive(Debug, Deserialize)]
struct Device {
    name: String,
    #[serde(default)]
    is_active: bool,
}

#[derive(Debug, Deserialize)]
struct CurrentlyPlaying {
    #[serde(default)]
    is_playing: bool,
    progress_ms: Option<u64>,
    item: Option<Item>,
}

#[derive(Debug, Deserialize)]
struct Item {
    uri: String,
    name: String,
    #[serde(default)]
    duration_ms: u64,
    #[serde(default)]
    artists: Vec<Named>,
    album: Option<Album>,
}

#[derive(Debug, Deserialize)]
struct Named {
    name: String,
}

#[derive(Debug, Deserialize)]
struct Album {
    #[serde(default)]
    images: Vec<Image>,
}

#[derive(Debug, Deserialize)]
struct Image {
    url: String,
}

impl From<CurrentlyPlaying> for PlayerState {
    fn from(current: CurrentlyPlaying) -> Self {
        let Some(item) = current.item else {
            return PlayerState {
                is_paused: !current.is_playing,
                ..PlayerState::default()
            };
        };

        PlayerState {
            track_uri: Some(item.uri),
            track_name: Some(item.name),
            artist_name: item.artists.into_iter().next().map(|a| a.name),
            // Widest first.
            image: item
                .album
                .and_then(|a| a.images.into_iter().next())
                .map(|i| i.url),
            is_paused: !current.is_playing,
            position_ms: current.progress_ms.unwrap_or(0),
            duration_ms: item.duration_ms,
        }
    }
}

struct Api {
    http: Arc<dyn HttpClient>,
    base_url: String,
    access_token: Mutex<Option<String>>,
}

impl Api {
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    async fn call(&self, request: HttpRequest) -> Result<HttpResponse, SurfaceError> {
        let token = self
            .access_token
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or_else(|| SurfaceError::Unavailable("not connected".to_string()))?;

        let response = self.http.send(request.bearer(token)).await?;
        Ok(response.error_for_status()?)
    }

    async fn player_state(&self) -> Result<PlayerState, SurfaceError> {
        let response = self.call(HttpRequest::get(self.url("/me/player"))).await?;
        // 204: nothing is playing on any device.
        if response.status == 204 || response.body.is_empty() {
            return Ok(PlayerState {
                is_paused: true,
                ..PlayerState::default()
            });
        }

        let current: CurrentlyPlaying = response.json().map_err(SurfaceError::from)?;
        Ok(current.into())
    }
}

/// Remote playback through the Spotify Web API.
pub struct WebApiSurface {
    api: Arc<Api>,
    poll_interval: Duration,
    events: Mutex<Option<SurfaceEvents>>,
    poller: Mutex<Option<JoinHandle<()>>>,
}

impl WebApiSurface {
    pub fn new(http: Arc<dyn HttpClient>, api_url: impl Into<String>) -> Self {
        WebApiSurface {
            api: Arc::new(Api {
                http,
                base_url: api_url.into(),
                access_token: Mutex::new(None),
            }),
            poll_interval: DEFAULT_POLL_INTERVAL,
            events: Mutex::new(None),
            poller: Mutex::new(None),
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    fn stop_polling(&self) {
        if let Some(poller) = self
            .poller
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            poller.abort();
        }
    }
}

impl Drop for WebApiSurface {
    fn drop(&mut self) {
        self.stop_polling();
    }
}

/// Turns `spotify:track:<id>` into an `open.spotify.com` link.
pub fn open_link(uri: &str) -> Option<String> {
    let mut parts = uri.split(':');
    match (parts.next(), parts.next(), parts.next()) {
        (Some("spotify"), Some(kind), Some(id)) if !id.is_empty() => {
            Some(format!("{OPEN_SPOTIFY_URL}/{kind}/{id}"))
        }
        _ => None,
    }
}

#[async_trait]
impl RemoteSurface for WebApiSurface {
    async fn is_available(&self) -> bool {
        true
    }

    async fn connect(&self, access_token: &str, events: SurfaceEvents) -> Result<(), SurfaceError> {
        let response = self
            .api
            .http
            .send(HttpRequest::get(self.api.url("/me/player/devices")).bearer(access_token))
            .await?
            .error_for_status()?;
        let devices: DevicesResponse = response.json().map_err(SurfaceError::from)?;

        if devices.devices.is_empty() {
            return Err(SurfaceError::AuthorizationRequired);
        }
        if let Some(active) = devices.devices.iter().find(|d| d.is_active) {
            log::debug!("connected to device {}", active.name);
        }

        *self
            .api
            .access_token
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(access_token.to_string());
        *self.events.lock().unwrap_or_else(PoisonError::into_inner) = Some(events);
        Ok(())
    }

    async fn disconnect(&self) {
        self.stop_polling();
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        self.api
            .access_token
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }

    async fn authorize(&self, play_uri: &str) -> Result<(), SurfaceError> {
        let link = open_link(play_uri).unwrap_or_else(|| OPEN_SPOTIFY_URL.to_string());
        log::info!("opening {link} to activate a Spotify device");
        webbrowser::open(&link).map_err(|e| SurfaceError::Unavailable(e.to_string()))
    }

    async fn subscribe(&self) -> Result<(), SurfaceError> {
        let events = self
            .events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or_else(|| SurfaceError::Unavailable("not connected".to_string()))?;

        self.stop_polling();
        let api = Arc::clone(&self.api);
        let interval = self.poll_interval;
        let poller = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                match api.player_state().await {
                    Ok(state) => {
                        if !events.player_state(state) {
                            break;
                        }
                    }
                    Err(SurfaceError::AuthorizationRequired) => {
                        events.disconnected("access token rejected");
                        break;
                    }
                    Err(e) => log::debug!("polling player state failed: {e}"),
                }
            }
        });
        *self.poller.lock().unwrap_or_else(PoisonError::into_inner) = Some(poller);
        Ok(())
    }

    async fn unsubscribe(&self) -> Result<(), SurfaceError> {
        self.stop_polling();
        Ok(())
    }

    async fn play(&self, uri: &str) -> Result<(), SurfaceError> {
        let body = HttpBody::Json(json!({ "uris": [uri] }));
        self.api
            .call(HttpRequest::put(self.api.url("/me/player/play"), body))
            .await?;
        Ok(())
    }

    async fn pause(&self) -> Result<(), SurfaceError> {
        self.api
            .call(HttpRequest::put(self.api.url("/me/player/pause"), HttpBody::Empty))
            .await?;
        Ok(())
    }

    async fn resume(&self) -> Result<(), SurfaceError> {
        self.api
            .call(HttpRequest::put(self.api.url("/me/player/play"), HttpBody::Empty))
            .await?;
        Ok(())
    }

    async fn skip_next(&self) -> Result<(), SurfaceError> {
        self.api
            .call(HttpRequest::post(self.api.url("/me/player/next")))
            .await?;
        Ok(())
    }

    async fn skip_previous(&self) -> Result<(), SurfaceError> {
        self.api
            .call(HttpRequest::post(self.api.url("/me/player/previous")))
            .await?;
        Ok(())
    }

    async fn seek(&self, position_ms: u64) -> Result<(), SurfaceError> {
        let url = self
            .api
            .url(&format!("/me/player/seek?position_ms={position_ms}"));
        self.api.call(HttpRequest::put(url, HttpBody::Empty)).await?;
        Ok(())
    }

    async fn player_state(&self) -> Result<PlayerState, SurfaceError> {
        self.api.player_state().await
    }

    /// `image` is the artwork URL. The Web API hands out fixed renditions,
    /// so `size` is ignored.
    async fn fetch_image(&self, image: &str, _size: ImageSize) -> Result<Vec<u8>, SurfaceError> {
        let response = self
            .api
            .http
            .send(HttpRequest::get(image))
            .await?
            .error_for_status()?;
        Ok(response.body)
    }
}
