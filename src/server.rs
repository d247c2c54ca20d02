use std::{net::SocketAddr, str::FromStr, sync::Arc};

use axum::{Extension, Router, routing::get};

use crate::{Res, api};

/// Serves `/health` and `/callback` on `address` until the task is dropped.
pub async fn start_api_server(address: &str, state: Arc<api::CallbackState>) -> Res<()> {
    let app = Router::new()
        .route("/health", get(api::health))
        .route("/callback", get(api::callback))
        .layer(Extension(state));

    let addr = SocketAddr::from_str(address)
        .map_err(|e| format!("Failed to parse server address {address}: {e}"))?;

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    log::debug!("callback server listening on {addr}");
    axum::serve(listener, app).await?;
    Ok(())
}
