use std::sync::Arc;

use axum::{Extension, extract::RawQuery, response::Html};
use tokio::sync::Mutex;

use crate::{
    callback::{self, Dispatched},
    error::AuthError,
    management::SessionManager,
    remote::RemoteHandle,
    types::Token,
    warning,
};

/// Shared between the `/callback` handler and whoever waits for the login.
pub struct CallbackState {
    pub session: Arc<SessionManager>,
    pub remote: Option<RemoteHandle>,
    /// Set once a login redirect has been handled.
    pub outcome: Mutex<Option<Result<Token, AuthError>>>,
}

impl CallbackState {
    pub fn new(session: Arc<SessionManager>, remote: Option<RemoteHandle>) -> Self {
        CallbackState {
            session,
            remote,
            outcome: Mutex::new(None),
        }
    }
}

pub async fn callback(
    RawQuery(query): RawQuery,
    Extension(state): Extension<Arc<CallbackState>>,
) -> Html<&'static str> {
    let redirect = format!(
        "{}?{}",
        state.session.config().redirect_uri,
        query.unwrap_or_default()
    );

    let result = callback::dispatch(&redirect, &state.session, state.remote.as_ref()).await;
    let page = match &result {
        Ok(Dispatched::LoggedIn(_)) => {
            "<h2>Authentication successful.</h2><p>Close this browser window.</p>"
        }
        Ok(Dispatched::RemoteAuthorization) => "<h4>Remote playback authorized.</h4>",
        Ok(Dispatched::Ignored) => return Html("<h4>Missing authorization code.</h4>"),
        Err(e) => {
            warning!("Login failed: {}", e);
            "<h4>Login failed.</h4>"
        }
    };

    let outcome = match result {
        Ok(Dispatched::LoggedIn(token)) => Some(Ok(token)),
        Err(e) => Some(Err(e)),
        _ => None,
    };
    if outcome.is_some() {
        *state.outcome.lock().await = outcome;
    }

    Html(page)
}
