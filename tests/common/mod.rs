#![allow(dead_code)]

use std::{collections::VecDeque, sync::Mutex, time::Duration};

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};

use liquidglass::{
    clock::Clock,
    config::Config,
    error::{HttpError, PlaybackError, SurfaceError},
    http::{HttpClient, HttpRequest, HttpResponse},
    playback::LocalPlayer,
    remote::{ImageSize, PlayerState, RemoteSurface, SurfaceEvents},
    types::Song,
};

pub fn test_config() -> Config {
    let mut config = Config::new("test-client");
    config.token_url = "https://accounts.test/api/token".to_string();
    config.auth_url = "https://accounts.test/authorize".to_string();
    config.api_url = "https://api.test/v1".to_string();
    config
}

pub fn song(uri: Option<&str>) -> Song {
    Song {
        id: "song-1".to_string(),
        title: "Glass Heart".to_string(),
        artist: "The Panes".to_string(),
        platform_uri: uri.map(str::to_string),
    }
}

pub fn token_body(access_token: &str, expires_in: i64, refresh_token: Option<&str>) -> String {
    match refresh_token {
        Some(refresh) => format!(
            r#"{{"access_token":"{access_token}","token_type":"Bearer","expires_in":{expires_in},"refresh_token":"{refresh}"}}"#
        ),
        None => format!(
            r#"{{"access_token":"{access_token}","token_type":"Bearer","expires_in":{expires_in}}}"#
        ),
    }
}

#[derive(Clone)]
enum Scripted {
    Response(HttpResponse),
    Transport(String),
}

struct Route {
    fragment: String,
    responses: VecDeque<Scripted>,
    last: Option<Scripted>,
}

/// HTTP client answering from scripted routes. A route matches when its
/// fragment occurs in the request URL. Responses are used up in order and
/// the last one used keeps repeating.
#[derive(Default)]
pub struct FakeHttp {
    routes: Mutex<Vec<Route>>,
    requests: Mutex<Vec<HttpRequest>>,
    delay: Option<Duration>,
}

impl FakeHttp {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(delay: Duration) -> Self {
        FakeHttp {
            delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn respond(&self, fragment: &str, status: u16, body: impl Into<String>) {
        self.push(fragment, Scripted::Response(HttpResponse::new(status, body.into())));
    }

    pub fn fail(&self, fragment: &str, message: &str) {
        self.push(fragment, Scripted::Transport(message.to_string()));
    }

    fn push(&self, fragment: &str, scripted: Scripted) {
        let mut routes = self.routes.lock().unwrap();
        match routes.iter_mut().find(|r| r.fragment == fragment) {
            Some(route) => route.responses.push_back(scripted),
            None => routes.push(Route {
                fragment: fragment.to_string(),
                responses: VecDeque::from([scripted]),
                last: None,
            }),
        }
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn count(&self, fragment: &str) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.url.contains(fragment))
            .count()
    }
}

#[async_trait]
impl HttpClient for FakeHttp {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, HttpError> {
        let url = request.url.clone();
        self.requests.lock().unwrap().push(request);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let mut routes = self.routes.lock().unwrap();
        let Some(route) = routes.iter_mut().find(|r| url.contains(&r.fragment)) else {
            return Err(HttpError::Transport(format!("no route for {url}")));
        };
        if let Some(next) = route.responses.pop_front() {
            route.last = Some(next);
        }
        let scripted = route.last.clone();

        match scripted {
            Some(Scripted::Response(response)) => Ok(response),
            Some(Scripted::Transport(message)) => Err(HttpError::Transport(message)),
            None => Err(HttpError::Transport(format!("no response for {url}"))),
        }
    }
}

pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new() -> Self {
        ManualClock {
            now: Mutex::new(Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()),
        }
    }

    pub fn advance(&self, seconds: i64) {
        *self.now.lock().unwrap() += chrono::Duration::seconds(seconds);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

/// Remote surface recording every call as a short string.
pub struct FakeSurface {
    pub available: bool,
    connect_results: Mutex<VecDeque<Result<(), SurfaceError>>>,
    calls: Mutex<Vec<String>>,
    events: Mutex<Option<SurfaceEvents>>,
    state: Mutex<PlayerState>,
}

impl FakeSurface {
    pub fn new() -> Self {
        FakeSurface {
            available: true,
            connect_results: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
            events: Mutex::new(None),
            state: Mutex::new(PlayerState::default()),
        }
    }

    pub fn unavailable() -> Self {
        FakeSurface {
            available: false,
            ..Self::new()
        }
    }

    /// Results for the next connects, in order. Connects succeed once the
    /// script runs out.
    pub fn script_connects(&self, results: Vec<Result<(), SurfaceError>>) {
        self.connect_results.lock().unwrap().extend(results);
    }

    pub fn set_player_state(&self, state: PlayerState) {
        *self.state.lock().unwrap() = state;
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Calls other than the connection bookkeeping.
    pub fn commands(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|c| !c.starts_with("connect") && c != "subscribe" && c != "player_state")
            .collect()
    }

    pub fn push_state(&self, state: PlayerState) -> bool {
        match self.events.lock().unwrap().as_ref() {
            Some(events) => events.player_state(state),
            None => false,
        }
    }

    pub fn drop_connection(&self) -> bool {
        match self.events.lock().unwrap().as_ref() {
            Some(events) => events.disconnected("remote went away"),
            None => false,
        }
    }

    fn record(&self, call: impl Into<String>) {
        self.calls.lock().unwrap().push(call.into());
    }
}

#[async_trait]
impl RemoteSurface for FakeSurface {
    async fn is_available(&self) -> bool {
        self.available
    }

    async fn connect(&self, access_token: &str, events: SurfaceEvents) -> Result<(), SurfaceError> {
        self.record(format!("connect:{access_token}"));
        let result = self
            .connect_results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(()));
        if result.is_ok() {
            *self.events.lock().unwrap() = Some(events);
        }
        result
    }

    async fn disconnect(&self) {
        self.record("disconnect");
        self.events.lock().unwrap().take();
    }

    async fn authorize(&self, play_uri: &str) -> Result<(), SurfaceError> {
        self.record(format!("authorize:{play_uri}"));
        Ok(())
    }

    async fn subscribe(&self) -> Result<(), SurfaceError> {
        self.record("subscribe");
        Ok(())
    }

    async fn unsubscribe(&self) -> Result<(), SurfaceError> {
        self.record("unsubscribe");
        Ok(())
    }

    async fn play(&self, uri: &str) -> Result<(), SurfaceError> {
        self.record(format!("play:{uri}"));
        Ok(())
    }

    async fn pause(&self) -> Result<(), SurfaceError> {
        self.record("pause");
        Ok(())
    }

    async fn resume(&self) -> Result<(), SurfaceError> {
        self.record("resume");
        Ok(())
    }

    async fn skip_next(&self) -> Result<(), SurfaceError> {
        self.record("next");
        Ok(())
    }

    async fn skip_previous(&self) -> Result<(), SurfaceError> {
        self.record("previous");
        Ok(())
    }

    async fn seek(&self, position_ms: u64) -> Result<(), SurfaceError> {
        self.record(format!("seek:{position_ms}"));
        Ok(())
    }

    async fn player_state(&self) -> Result<PlayerState, SurfaceError> {
        self.record("player_state");
        Ok(self.state.lock().unwrap().clone())
    }

    async fn fetch_image(&self, image: &str, _size: ImageSize) -> Result<Vec<u8>, SurfaceError> {
        self.record(format!("image:{image}"));
        Ok(image.as_bytes().to_vec())
    }
}

#[derive(Default)]
pub struct FakeLocalPlayer {
    calls: Mutex<Vec<String>>,
}

impl FakeLocalPlayer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: impl Into<String>) {
        self.calls.lock().unwrap().push(call.into());
    }
}

#[async_trait]
impl LocalPlayer for FakeLocalPlayer {
    async fn play(&self, url: &str) -> Result<(), PlaybackError> {
        self.record(format!("play:{url}"));
        Ok(())
    }

    async fn pause(&self) -> Result<(), PlaybackError> {
        self.record("pause");
        Ok(())
    }

    async fn resume(&self) -> Result<(), PlaybackError> {
        self.record("resume");
        Ok(())
    }

    async fn seek(&self, fraction: f64) -> Result<(), PlaybackError> {
        self.record(format!("seek:{fraction}"));
        Ok(())
    }

    async fn stop(&self) -> Result<(), PlaybackError> {
        self.record("stop");
        Ok(())
    }
}
