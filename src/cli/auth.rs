use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use crate::{
    api::CallbackState,
    cli::{open_session, spinner},
    error,
    error::AuthError,
    info,
    server::start_api_server,
    success,
    types::Token,
    warning,
};

const LOGIN_TIMEOUT: Duration = Duration::from_secs(120);

/// Runs the PKCE login: starts the callback server, opens the authorization
/// page in the browser and waits for the redirect to come back.
pub async fn auth() {
    let session = match open_session().await {
        Ok(session) => session,
        Err(e) => error!("Cannot start session: {}", e),
    };

    let request = match session.start_login().await {
        Ok(request) => request,
        Err(e) => error!("{}", e),
    };

    let state = Arc::new(CallbackState::new(Arc::clone(&session), None));
    let server_state = Arc::clone(&state);
    let address = session.config().server_address.clone();
    let server = tokio::spawn(async move {
        if let Err(e) = start_api_server(&address, server_state).await {
            warning!("Callback server stopped: {}", e);
        }
    });

    if webbrowser::open(&request.url).is_err() {
        warning!(
            "Failed to open browser. Please navigate to the following URL manually:\n{}",
            request.url
        );
    } else {
        info!("Waiting for authorization in the browser...");
    }

    let outcome = wait_for_login(&state).await;
    server.abort();

    match outcome {
        Some(Ok(_)) => {
            session.ensure_profile_loaded().await;
            match session.profile().await.display_name {
                Some(name) => success!("Logged in as {}", name),
                None => success!("Authentication successful!"),
            }
        }
        Some(Err(e)) => error!("Authentication failed: {}", e),
        None => error!("Authentication timed out."),
    }
}

async fn wait_for_login(state: &CallbackState) -> Option<Result<Token, AuthError>> {
    let pb = spinner("Waiting for the authorization callback...");
    let start = Instant::now();

    while start.elapsed() < LOGIN_TIMEOUT {
        if let Some(outcome) = state.outcome.lock().await.take() {
            pb.finish_and_clear();
            return Some(outcome);
        }
        tokio::time::sleep(Duration::from_millis(500)).await;
    }

    pb.finish_and_clear();
    None
}
