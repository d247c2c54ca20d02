use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use tabled::Tabled;

use crate::error::AuthError;

/// Seconds before `expires_at` at which a token stops being handed out.
pub const TOKEN_EXPIRY_MARGIN_SECS: i64 = 60;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: DateTime<Utc>,
}

impl Token {
    /// Builds a token from a token endpoint response issued at `now`.
    ///
    /// A response without `refresh_token` keeps `previous_refresh` so that a
    /// refresh grant never loses the ability to refresh again. An
    /// `expires_in` that does not fit the calendar is a malformed response.
    pub fn from_response(
        response: TokenResponse,
        previous_refresh: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Self, AuthError> {
        let expires_at = TimeDelta::try_seconds(response.expires_in)
            .and_then(|lifetime| now.checked_add_signed(lifetime))
            .ok_or_else(|| {
                AuthError::TokenExchangeFailed(format!(
                    "malformed token response: expires_in {} out of range",
                    response.expires_in
                ))
            })?;

        Ok(Token {
            access_token: response.access_token,
            refresh_token: response.refresh_token.or(previous_refresh),
            expires_at,
        })
    }

    /// Valid only while `expires_at > now + 60s`.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now.checked_add_signed(TimeDelta::seconds(TOKEN_EXPIRY_MARGIN_SECS))
            .is_some_and(|limit| self.expires_at > limit)
    }
}

/// Token endpoint response for both the authorization-code and the
/// refresh-token grant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: String,
    pub expires_in: i64,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
}

impl Profile {
    pub fn is_complete(&self) -> bool {
        self.display_name.is_some() && self.avatar_url.is_some()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileResponse {
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub images: Option<Vec<ProfileImage>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileImage {
    pub url: String,
}

impl From<ProfileResponse> for Profile {
    fn from(response: ProfileResponse) -> Self {
        Profile {
            display_name: response.display_name,
            avatar_url: response
                .images
                .and_then(|images| images.into_iter().next())
                .map(|image| image.url),
        }
    }
}

/// The URL to send the user to, plus the PKCE verifier that must accompany
/// the code exchange afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationRequest {
    pub url: String,
    pub verifier: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Song {
    pub id: String,
    pub title: String,
    pub artist: String,
    /// Platform-native URI, e.g. `spotify:track:4uLU6hMCjMI75M1A2tKUQC`.
    pub platform_uri: Option<String>,
}

impl Song {
    /// Search term used for preview lookups.
    pub fn search_term(&self) -> String {
        format!("{} {}", self.artist, self.title)
    }
}

#[derive(Tabled)]
pub struct StatusTableRow {
    pub field: String,
    pub value: String,
}
