mod common;

use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use chrono::Utc;

use common::{FakeHttp, ManualClock, test_config, token_body};
use liquidglass::{
    clock::{Clock, SystemClock},
    error::{AuthError, StoreError},
    management::SessionManager,
    store::{
        CredentialStore, KEY_ACCESS_TOKEN, KEY_AVATAR_URL, KEY_DISPLAY_NAME, KEY_EXPIRES_AT,
        KEY_REFRESH_TOKEN, MemoryStore,
    },
};

const TOKEN_URL: &str = "/api/token";
const PROFILE_URL: &str = "/v1/me";

fn manager(
    http: Arc<FakeHttp>,
    store: Arc<dyn CredentialStore>,
    clock: Arc<dyn Clock>,
) -> SessionManager {
    SessionManager::new(test_config(), http, store, clock)
}

async fn logged_in(http: &Arc<FakeHttp>, clock: &Arc<ManualClock>) -> (SessionManager, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let session = manager(Arc::clone(http), store.clone(), clock.clone());
    http.respond(TOKEN_URL, 200, token_body("T1", 3600, Some("R1")));
    session.complete_login("code", "verifier").await.unwrap();
    (session, store)
}

#[tokio::test]
async fn test_cold_login_stores_token() {
    let http = Arc::new(FakeHttp::new());
    http.respond(TOKEN_URL, 200, token_body("T1", 3600, Some("R1")));
    let store = Arc::new(MemoryStore::new());
    let session = manager(Arc::clone(&http), store.clone(), Arc::new(SystemClock));

    let request = session.start_login().await.unwrap();
    let verifier = session.pending_verifier().await.unwrap();
    assert_eq!(request.verifier, verifier);

    let token = session.complete_login("abc123", &verifier).await.unwrap();

    assert_eq!(token.access_token, "T1");
    let expected = Utc::now() + chrono::Duration::seconds(3600);
    assert!((token.expires_at - expected).num_seconds().abs() <= 1);
    assert_eq!(store.get(KEY_ACCESS_TOKEN).await.unwrap().as_deref(), Some("T1"));
    assert_eq!(store.get(KEY_REFRESH_TOKEN).await.unwrap().as_deref(), Some("R1"));
    assert!(store.contains(KEY_EXPIRES_AT));

    let exchange = &http.requests()[0];
    assert_eq!(exchange.form_value("grant_type"), Some("authorization_code"));
    assert_eq!(exchange.form_value("code"), Some("abc123"));
    assert_eq!(exchange.form_value("code_verifier"), Some(verifier.as_str()));
    assert_eq!(exchange.form_value("client_id"), Some("test-client"));
}

#[tokio::test]
async fn test_authorization_url_carries_pkce_parameters() {
    let http = Arc::new(FakeHttp::new());
    let session = manager(http, Arc::new(MemoryStore::new()), Arc::new(SystemClock));

    let request = session.start_login().await.unwrap();
    let challenge = liquidglass::utils::generate_code_challenge(&request.verifier);

    assert!(request.url.starts_with("https://accounts.test/authorize?"));
    assert!(request.url.contains("response_type=code"));
    assert!(request.url.contains("code_challenge_method=S256"));
    assert!(request.url.contains(&format!("code_challenge={challenge}")));
    assert!(request.url.contains("show_dialog=true"));
    assert!(request.url.contains("scope=user-read-playback-state+"));
}

#[tokio::test]
async fn test_failed_exchange_keeps_previous_token() {
    let http = Arc::new(FakeHttp::new());
    let clock = Arc::new(ManualClock::new());
    let (session, store) = logged_in(&http, &clock).await;

    http.respond(TOKEN_URL, 400, r#"{"error":"invalid_grant"}"#);
    let result = session.complete_login("again", "verifier").await;

    assert!(matches!(result, Err(AuthError::TokenExchangeFailed(_))));
    assert_eq!(session.token().await.unwrap().access_token, "T1");
    assert_eq!(store.get(KEY_ACCESS_TOKEN).await.unwrap().as_deref(), Some("T1"));
}

#[tokio::test]
async fn test_malformed_token_response_is_exchange_failure() {
    let http = Arc::new(FakeHttp::new());
    http.respond(TOKEN_URL, 200, r#"{"token_type":"Bearer"}"#);
    let session = manager(
        Arc::clone(&http),
        Arc::new(MemoryStore::new()),
        Arc::new(ManualClock::new()),
    );

    let result = session.complete_login("abc123", "verifier").await;

    assert!(matches!(result, Err(AuthError::TokenExchangeFailed(_))));
    assert!(!session.is_logged_in().await);
}

#[tokio::test]
async fn test_out_of_range_expiry_is_exchange_failure() {
    let http = Arc::new(FakeHttp::new());
    http.respond(
        TOKEN_URL,
        200,
        token_body("T1", 1_000_000_000_000_000, Some("R1")),
    );
    let session = manager(
        Arc::clone(&http),
        Arc::new(MemoryStore::new()),
        Arc::new(ManualClock::new()),
    );

    let result = session.complete_login("abc123", "verifier").await;

    assert!(matches!(result, Err(AuthError::TokenExchangeFailed(_))));
    assert!(!session.is_logged_in().await);
}

#[tokio::test]
async fn test_out_of_range_expiry_on_refresh_returns_stale_token() {
    let http = Arc::new(FakeHttp::new());
    let clock = Arc::new(ManualClock::new());
    let (session, store) = logged_in(&http, &clock).await;

    clock.advance(3600);
    http.respond(TOKEN_URL, 200, token_body("T2", i64::MAX, None));

    assert_eq!(session.valid_access_token().await.as_deref(), Some("T1"));
    assert_eq!(session.token().await.unwrap().access_token, "T1");
    assert_eq!(store.get(KEY_ACCESS_TOKEN).await.unwrap().as_deref(), Some("T1"));

    // The state lock was released: the next call can refresh normally.
    http.respond(TOKEN_URL, 200, token_body("T3", 3600, None));
    assert_eq!(session.valid_access_token().await.as_deref(), Some("T3"));
}

#[tokio::test]
async fn test_token_within_margin_is_refreshed() {
    let http = Arc::new(FakeHttp::new());
    let clock = Arc::new(ManualClock::new());
    let (session, store) = logged_in(&http, &clock).await;

    // 3600 - 3541 = 59 seconds left, inside the 60 second margin.
    clock.advance(3541);
    http.respond(TOKEN_URL, 200, token_body("T2", 3600, None));

    assert_eq!(session.valid_access_token().await.as_deref(), Some("T2"));
    let refresh = http.requests().pop().unwrap();
    assert_eq!(refresh.form_value("grant_type"), Some("refresh_token"));
    assert_eq!(refresh.form_value("refresh_token"), Some("R1"));

    // The response had no refresh token, the old one is kept.
    let token = session.token().await.unwrap();
    assert_eq!(token.refresh_token.as_deref(), Some("R1"));
    assert_eq!(store.get(KEY_ACCESS_TOKEN).await.unwrap().as_deref(), Some("T2"));
}

#[tokio::test]
async fn test_token_outside_margin_is_not_refreshed() {
    let http = Arc::new(FakeHttp::new());
    let clock = Arc::new(ManualClock::new());
    let (session, _) = logged_in(&http, &clock).await;

    clock.advance(3539);

    assert_eq!(session.valid_access_token().await.as_deref(), Some("T1"));
    assert_eq!(http.count(TOKEN_URL), 1);
}

#[tokio::test]
async fn test_failed_refresh_returns_stale_token() {
    let http = Arc::new(FakeHttp::new());
    let clock = Arc::new(ManualClock::new());
    let (session, _) = logged_in(&http, &clock).await;

    clock.advance(4000);
    http.fail(TOKEN_URL, "connection reset");

    assert_eq!(session.valid_access_token().await.as_deref(), Some("T1"));
    assert_eq!(session.token().await.unwrap().access_token, "T1");
}

#[tokio::test]
async fn test_no_session_has_no_token() {
    let http = Arc::new(FakeHttp::new());
    let session = manager(
        Arc::clone(&http),
        Arc::new(MemoryStore::new()),
        Arc::new(ManualClock::new()),
    );

    assert_eq!(session.valid_access_token().await, None);
    assert!(http.requests().is_empty());
}

#[tokio::test]
async fn test_concurrent_refreshes_share_one_request() {
    let http = Arc::new(FakeHttp::with_delay(Duration::from_millis(20)));
    let clock = Arc::new(ManualClock::new());
    let (session, _) = logged_in(&http, &clock).await;

    clock.advance(3600);
    http.respond(TOKEN_URL, 200, token_body("T2", 3600, Some("R2")));

    let (a, b) = tokio::join!(session.valid_access_token(), session.valid_access_token());

    assert_eq!(a.as_deref(), Some("T2"));
    assert_eq!(b.as_deref(), Some("T2"));
    // One login exchange plus exactly one refresh.
    assert_eq!(http.count(TOKEN_URL), 2);
}

#[tokio::test]
async fn test_logout_clears_everything() {
    let http = Arc::new(FakeHttp::new());
    let clock = Arc::new(ManualClock::new());
    let (session, store) = logged_in(&http, &clock).await;
    http.respond(PROFILE_URL, 200, r#"{"display_name":"Ada","images":[{"url":"https://img/ada.png"}]}"#);
    session.ensure_profile_loaded().await;
    assert!(store.contains(KEY_DISPLAY_NAME));

    session.logout().await.unwrap();

    assert!(store.is_empty());
    assert!(session.token().await.is_none());
    assert_eq!(session.profile().await.display_name, None);
    assert_eq!(session.valid_access_token().await, None);
}

/// Store whose writes can be switched off.
struct BrokenStore {
    inner: MemoryStore,
    broken: AtomicBool,
}

#[async_trait]
impl CredentialStore for BrokenStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.inner.get(key).await
    }

    async fn apply(&self, changes: Vec<(String, Option<String>)>) -> Result<(), StoreError> {
        if self.broken.load(Ordering::SeqCst) {
            return Err(StoreError::Io(std::io::Error::other("disk full")));
        }
        self.inner.apply(changes).await
    }
}

#[tokio::test]
async fn test_failed_logout_leaves_session_intact() {
    let http = Arc::new(FakeHttp::new());
    http.respond(TOKEN_URL, 200, token_body("T1", 3600, Some("R1")));
    let store = Arc::new(BrokenStore {
        inner: MemoryStore::new(),
        broken: AtomicBool::new(false),
    });
    let session = manager(Arc::clone(&http), store.clone(), Arc::new(ManualClock::new()));
    session.complete_login("code", "verifier").await.unwrap();

    store.broken.store(true, Ordering::SeqCst);
    assert!(session.logout().await.is_err());

    assert_eq!(session.token().await.unwrap().access_token, "T1");
    assert!(store.inner.contains(KEY_ACCESS_TOKEN));
}

#[tokio::test]
async fn test_profile_loaded_once() {
    let http = Arc::new(FakeHttp::new());
    let clock = Arc::new(ManualClock::new());
    let (session, store) = logged_in(&http, &clock).await;
    http.respond(PROFILE_URL, 200, r#"{"display_name":"Ada","images":[{"url":"https://img/ada.png"},{"url":"https://img/small.png"}]}"#);

    session.ensure_profile_loaded().await;
    session.ensure_profile_loaded().await;

    let profile = session.profile().await;
    assert_eq!(profile.display_name.as_deref(), Some("Ada"));
    assert_eq!(profile.avatar_url.as_deref(), Some("https://img/ada.png"));
    assert_eq!(store.get(KEY_AVATAR_URL).await.unwrap().as_deref(), Some("https://img/ada.png"));
    assert_eq!(http.count(PROFILE_URL), 1);

    let request = http.requests().pop().unwrap();
    assert_eq!(request.bearer.as_deref(), Some("T1"));
}

#[tokio::test]
async fn test_profile_failure_is_swallowed_and_retried() {
    let http = Arc::new(FakeHttp::new());
    let clock = Arc::new(ManualClock::new());
    let (session, _) = logged_in(&http, &clock).await;
    http.respond(PROFILE_URL, 500, "oops");
    http.respond(PROFILE_URL, 200, r#"{"display_name":"Ada"}"#);

    session.ensure_profile_loaded().await;
    assert_eq!(session.profile().await.display_name, None);
    assert!(session.is_logged_in().await);

    session.ensure_profile_loaded().await;
    assert_eq!(session.profile().await.display_name.as_deref(), Some("Ada"));
}

#[tokio::test]
async fn test_restore_rebuilds_session() {
    let store = Arc::new(MemoryStore::new());
    store.set(KEY_ACCESS_TOKEN, "T9").await.unwrap();
    store.set(KEY_REFRESH_TOKEN, "R9").await.unwrap();
    store.set(KEY_EXPIRES_AT, "2024-05-01T13:00:00+00:00").await.unwrap();
    store.set(KEY_DISPLAY_NAME, "Ada").await.unwrap();
    let session = manager(Arc::new(FakeHttp::new()), store, Arc::new(ManualClock::new()));

    session.restore().await.unwrap();

    let token = session.token().await.unwrap();
    assert_eq!(token.access_token, "T9");
    assert_eq!(token.refresh_token.as_deref(), Some("R9"));
    assert_eq!(session.profile().await.display_name.as_deref(), Some("Ada"));
    assert_eq!(session.valid_access_token().await.as_deref(), Some("T9"));
}

#[tokio::test]
async fn test_restore_without_expiry_stays_logged_out() {
    let store = Arc::new(MemoryStore::new());
    store.set(KEY_ACCESS_TOKEN, "T9").await.unwrap();
    let session = manager(Arc::new(FakeHttp::new()), store, Arc::new(ManualClock::new()));

    session.restore().await.unwrap();

    assert!(!session.is_logged_in().await);
}
