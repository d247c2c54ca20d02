use std::sync::Arc;

use axum::{Extension, response::Json};
use serde_json::{Value, json};

use crate::api::CallbackState;

pub async fn health(Extension(state): Extension<Arc<CallbackState>>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "logged_in": state.session.is_logged_in().await,
        "login_finished": state.outcome.lock().await.is_some(),
    }))
}
