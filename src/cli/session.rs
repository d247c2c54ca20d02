use chrono::Utc;
use tabled::Table;

use crate::{cli::open_session, error, success, types::StatusTableRow, warning};

pub async fn status() {
    let session = match open_session().await {
        Ok(session) => session,
        Err(e) => error!("Cannot open session: {}", e),
    };

    let Some(token) = session.token().await else {
        warning!("Not logged in. Run `liquidglass auth` first.");
        return;
    };

    session.ensure_profile_loaded().await;
    let profile = session.profile().await;

    let rows = vec![
        row("display name", profile.display_name.as_deref().unwrap_or("-")),
        row("avatar", profile.avatar_url.as_deref().unwrap_or("-")),
        row("token expires", &token.expires_at.to_rfc3339()),
        row(
            "token valid",
            if token.is_valid_at(Utc::now()) { "yes" } else { "no" },
        ),
        row(
            "refresh token",
            if token.refresh_token.is_some() { "present" } else { "missing" },
        ),
    ];
    println!("{}", Table::new(rows));
}

pub async fn logout() {
    let session = match open_session().await {
        Ok(session) => session,
        Err(e) => error!("Cannot open session: {}", e),
    };

    match session.logout().await {
        Ok(()) => success!("Logged out."),
        Err(e) => error!("Failed to clear credentials: {}", e),
    }
}

/// Prints an access token for use with other tools.
pub async fn token() {
    let session = match open_session().await {
        Ok(session) => session,
        Err(e) => error!("Cannot open session: {}", e),
    };

    match session.valid_access_token().await {
        Some(token) => println!("{token}"),
        None => error!("Not logged in. Run `liquidglass auth` first."),
    }
}

fn row(field: &str, value: &str) -> StatusTableRow {
    StatusTableRow {
        field: field.to_string(),
        value: value.to_string(),
    }
}
