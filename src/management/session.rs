use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use crate::{
    clock::Clock,
    config::Config,
    error::{AuthError, StoreError},
    http::HttpClient,
    spotify,
    store::{
        CredentialStore, KEY_ACCESS_TOKEN, KEY_AVATAR_URL, KEY_DISPLAY_NAME, KEY_EXPIRES_AT,
        KEY_REFRESH_TOKEN, SESSION_KEYS,
    },
    types::{AuthorizationRequest, Profile, Token},
    utils,
};

#[derive(Debug, Default)]
struct SessionState {
    token: Option<Token>,
    profile: Profile,
    profile_loaded: bool,
    verifier: Option<String>,
    /// Bumped on login and logout. A refresh or profile fetch that started
    /// under an older epoch must not write its result back.
    epoch: u64,
    /// Number of finished refresh attempts.
    refreshes: u64,
}

/// Owns the user's OAuth token and profile.
///
/// All state sits behind one async mutex, so no two mutations interleave.
/// Refreshes are single-flight: a second caller that finds the token
/// expired while a refresh is running waits for it and takes its outcome
/// instead of issuing another request.
pub struct SessionManager {
    config: Config,
    http: Arc<dyn HttpClient>,
    store: Arc<dyn CredentialStore>,
    clock: Arc<dyn Clock>,
    state: Mutex<SessionState>,
    refresh_gate: Mutex<()>,
}

impl SessionManager {
    pub fn new(
        config: Config,
        http: Arc<dyn HttpClient>,
        store: Arc<dyn CredentialStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        SessionManager {
            config,
            http,
            store,
            clock,
            state: Mutex::new(SessionState::default()),
            refresh_gate: Mutex::new(()),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Rebuilds token and profile from the credential store.
    ///
    /// A token is only restored when both the access token and a parseable
    /// expiry are present. Missing keys leave the session logged out.
    pub async fn restore(&self) -> Result<(), StoreError> {
        let access_token = self.store.get(KEY_ACCESS_TOKEN).await?;
        let refresh_token = self.store.get(KEY_REFRESH_TOKEN).await?;
        let expires_at = self
            .store
            .get(KEY_EXPIRES_AT)
            .await?
            .and_then(|raw| DateTime::parse_from_rfc3339(&raw).ok())
            .map(|at| at.with_timezone(&Utc));
        let profile = Profile {
            display_name: self.store.get(KEY_DISPLAY_NAME).await?,
            avatar_url: self.store.get(KEY_AVATAR_URL).await?,
        };

        let mut state = self.state.lock().await;
        state.token = match (access_token, expires_at) {
            (Some(access_token), Some(expires_at)) => Some(Token {
                access_token,
                refresh_token,
                expires_at,
            }),
            _ => None,
        };
        state.profile = profile;
        log::debug!("session restored (logged in: {})", state.token.is_some());
        Ok(())
    }

    /// Starts a PKCE login.
    ///
    /// Generates a fresh verifier/challenge pair and returns the
    /// authorization URL to open. The verifier is retained and also returned
    /// so that the caller can hand it to [`Self::complete_login`].
    pub async fn start_login(&self) -> Result<AuthorizationRequest, AuthError> {
        let verifier = utils::generate_code_verifier()?;
        let challenge = utils::generate_code_challenge(&verifier);
        let url = spotify::auth::build_authorization_url(&self.config, &challenge)?;

        self.state.lock().await.verifier = Some(verifier.clone());
        Ok(AuthorizationRequest { url, verifier })
    }

    /// Verifier retained by the last [`Self::start_login`].
    pub async fn pending_verifier(&self) -> Option<String> {
        self.state.lock().await.verifier.clone()
    }

    /// Exchanges `code` and `verifier` for a token, stores and returns it.
    ///
    /// On failure nothing changes: a previously held token stays in place.
    pub async fn complete_login(&self, code: &str, verifier: &str) -> Result<Token, AuthError> {
        let response =
            spotify::auth::exchange_code_pkce(self.http.as_ref(), &self.config, code, verifier)
                .await?;
        let token = Token::from_response(response, None, self.clock.now())?;

        let mut state = self.state.lock().await;
        let mut changes = token_changes(&token);
        changes.push((KEY_DISPLAY_NAME.to_string(), None));
        changes.push((KEY_AVATAR_URL.to_string(), None));
        if let Err(e) = self.store.apply(changes).await {
            log::warn!("cannot persist token: {e}");
        }

        state.token = Some(token.clone());
        state.profile = Profile::default();
        state.profile_loaded = false;
        state.verifier = None;
        state.epoch += 1;
        log::debug!("login completed, token expires at {}", token.expires_at);

        Ok(token)
    }

    /// Returns an access token, refreshing it first when it is within 60
    /// seconds of expiry.
    ///
    /// This is best effort. When the refresh fails, or there is no refresh
    /// token, the last known (possibly expired) access token is returned so
    /// that callers can still try their request and deal with a 401
    /// themselves. `None` means there is no session at all.
    pub async fn valid_access_token(&self) -> Option<String> {
        let seen_refreshes = {
            let state = self.state.lock().await;
            let token = state.token.as_ref()?;
            if token.is_valid_at(self.clock.now()) {
                return Some(token.access_token.clone());
            }
            state.refreshes
        };

        let _gate = self.refresh_gate.lock().await;

        let (token, epoch) = {
            let state = self.state.lock().await;
            let token = state.token.clone()?;
            if state.refreshes != seen_refreshes || token.is_valid_at(self.clock.now()) {
                // Somebody else refreshed while we waited; take their outcome.
                return Some(token.access_token);
            }
            (token, state.epoch)
        };

        let Some(refresh_token) = token.refresh_token.clone() else {
            log::debug!("token expired and no refresh token, returning stale token");
            return Some(token.access_token);
        };

        let result =
            spotify::auth::refresh_token(self.http.as_ref(), &self.config, &refresh_token).await;

        let mut state = self.state.lock().await;
        state.refreshes += 1;
        if state.epoch != epoch {
            log::debug!("session changed during refresh, discarding result");
            return state.token.as_ref().map(|t| t.access_token.clone());
        }

        let refreshed = result.and_then(|response| {
            Token::from_response(response, Some(refresh_token), self.clock.now())
        });
        match refreshed {
            Ok(refreshed) => {
                if let Err(e) = self.store.apply(token_changes(&refreshed)).await {
                    log::warn!("cannot persist refreshed token: {e}");
                }
                let access_token = refreshed.access_token.clone();
                state.token = Some(refreshed);
                Some(access_token)
            }
            Err(e) => {
                log::warn!("token refresh failed, returning stale token: {e}");
                Some(token.access_token)
            }
        }
    }

    /// Clears token and profile, in memory and in the store, as one unit.
    ///
    /// If the store cannot be cleared the in-memory session is left as it
    /// was and the error is returned, so the two never disagree.
    pub async fn logout(&self) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        self.store.remove_all(&SESSION_KEYS).await?;

        let epoch = state.epoch + 1;
        *state = SessionState {
            epoch,
            ..SessionState::default()
        };
        log::debug!("logged out");
        Ok(())
    }

    /// Fetches the profile once if it is incomplete and a session exists.
    ///
    /// Failures are logged and swallowed; the next call tries again.
    pub async fn ensure_profile_loaded(&self) {
        let epoch = {
            let state = self.state.lock().await;
            if state.token.is_none() || state.profile_loaded || state.profile.is_complete() {
                return;
            }
            state.epoch
        };

        let Some(access_token) = self.valid_access_token().await else {
            return;
        };

        match spotify::profile::fetch_profile(self.http.as_ref(), &self.config.api_url, &access_token)
            .await
        {
            Ok(profile) => {
                let mut state = self.state.lock().await;
                if state.epoch != epoch {
                    return;
                }
                let changes = vec![
                    (KEY_DISPLAY_NAME.to_string(), profile.display_name.clone()),
                    (KEY_AVATAR_URL.to_string(), profile.avatar_url.clone()),
                ];
                if let Err(e) = self.store.apply(changes).await {
                    log::warn!("cannot persist profile: {e}");
                }
                state.profile = profile;
                state.profile_loaded = true;
            }
            Err(e) => log::debug!("{e}; will retry later"),
        }
    }

    pub async fn profile(&self) -> Profile {
        self.state.lock().await.profile.clone()
    }

    pub async fn token(&self) -> Option<Token> {
        self.state.lock().await.token.clone()
    }

    pub async fn is_logged_in(&self) -> bool {
        self.state.lock().await.token.is_some()
    }
}

fn token_changes(token: &Token) -> Vec<(String, Option<String>)> {
    vec![
        (KEY_ACCESS_TOKEN.to_string(), Some(token.access_token.clone())),
        (KEY_REFRESH_TOKEN.to_string(), token.refresh_token.clone()),
        (KEY_EXPIRES_AT.to_string(), Some(token.expires_at.to_rfc3339())),
    ]
}
