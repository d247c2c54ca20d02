use crate::{
    error::AuthError,
    http::{HttpClient, HttpRequest},
    types::{Profile, ProfileResponse},
};

/// Fetches the current user's profile from `GET {api_url}/me`.
///
/// Only the display name and the first image URL are kept.
pub async fn fetch_profile(
    http: &dyn HttpClient,
    api_url: &str,
    access_token: &str,
) -> Result<Profile, AuthError> {
    let request = HttpRequest::get(format!("{api_url}/me")).bearer(access_token);

    let response = http
        .send(request)
        .await
        .and_then(|response| response.error_for_status())
        .map_err(|e| AuthError::ProfileFetchFailed(e.to_string()))?;

    let profile: ProfileResponse = response
        .json()
        .map_err(|e| AuthError::ProfileFetchFailed(e.to_string()))?;

    Ok(profile.into())
}
