use reqwest::Url;

use crate::{
    config::Config,
    error::AuthError,
    http::{HttpClient, HttpRequest, HttpResponse},
    types::TokenResponse,
};

/// Builds the Spotify authorization URL for the PKCE flow.
///
/// The URL carries `client_id`, `response_type=code`, `redirect_uri`, the
/// space-separated `scope`, `code_challenge_method=S256`, the
/// `code_challenge` and `show_dialog=true` so that switching accounts is
/// always possible. Query values are percent-encoded.
///
/// # Errors
///
/// Returns [`AuthError::AuthStart`] when the configured authorization
/// endpoint is not a valid URL.
///
/// # Example
///
/// ```
/// let challenge = utils::generate_code_challenge(&verifier);
/// let url = build_authorization_url(&config, &challenge)?;
/// webbrowser::open(&url)?;
/// ```
pub fn build_authorization_url(config: &Config, code_challenge: &str) -> Result<String, AuthError> {
    let url = Url::parse_with_params(
        &config.auth_url,
        &[
            ("client_id", config.client_id.as_str()),
            ("response_type", "code"),
            ("redirect_uri", config.redirect_uri.as_str()),
            ("scope", config.scope.as_str()),
            ("code_challenge_method", "S256"),
            ("code_challenge", code_challenge),
            ("show_dialog", "true"),
        ],
    )
    .map_err(|e| AuthError::AuthStart(format!("invalid authorization endpoint: {e}")))?;

    Ok(url.into())
}

/// Exchanges an authorization code for a token using PKCE.
///
/// Completes the authorization-code grant by posting the code together with
/// the verifier that produced the challenge of the original request.
///
/// # Returns
///
/// - `Ok(TokenResponse)` - the raw grant, still relative to the time of the call
/// - `Err(AuthError::TokenExchangeFailed)` - transport failure, non-200 status
///   or a body that is not a token response
///
/// # Security Note
///
/// The authorization code is single-use and expires quickly. The exchange
/// should happen immediately after receiving the code.
pub async fn exchange_code_pkce(
    http: &dyn HttpClient,
    config: &Config,
    code: &str,
    verifier: &str,
) -> Result<TokenResponse, AuthError> {
    let request = HttpRequest::post_form(
        &config.token_url,
        &[
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", &config.redirect_uri),
            ("client_id", &config.client_id),
            ("code_verifier", verifier),
        ],
    );

    let response = http
        .send(request)
        .await
        .map_err(|e| AuthError::TokenExchangeFailed(e.to_string()))?;
    parse_token_response(&response)
}

/// Refreshes an access token with the refresh-token grant.
///
/// The response may omit `refresh_token`; the caller keeps the prior one
/// in that case (see [`crate::types::Token::from_response`]).
pub async fn refresh_token(
    http: &dyn HttpClient,
    config: &Config,
    refresh_token: &str,
) -> Result<TokenResponse, AuthError> {
    let request = HttpRequest::post_form(
        &config.token_url,
        &[
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", &config.client_id),
        ],
    );

    let response = http
        .send(request)
        .await
        .map_err(|e| AuthError::TokenExchangeFailed(e.to_string()))?;
    parse_token_response(&response)
}

fn parse_token_response(response: &HttpResponse) -> Result<TokenResponse, AuthError> {
    if response.status != 200 {
        return Err(AuthError::TokenExchangeFailed(format!(
            "token endpoint answered {}",
            response.status
        )));
    }

    let token: TokenResponse = response
        .json()
        .map_err(|e| AuthError::TokenExchangeFailed(format!("malformed token response: {e}")))?;

    if token.access_token.is_empty() || token.expires_in <= 0 {
        return Err(AuthError::TokenExchangeFailed(
            "malformed token response: empty access token or expiry".to_string(),
        ));
    }

    Ok(token)
}
