//! Routing of redirect URLs back into the application.
//!
//! Two flows come back through a redirect: the PKCE login (authorization
//! code in the query string) and the remote surface's own authorization
//! (implicit-grant style token in the fragment). [`route`] tells them apart;
//! [`dispatch`] hands each one to its owner.

use reqwest::Url;

use crate::{
    error::AuthError,
    management::SessionManager,
    remote::{AuthorizationCallback, RemoteHandle},
    types::Token,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Redirect {
    /// `?code=...` of the PKCE login.
    AuthorizationCode(String),
    /// `?error=...` of the PKCE login.
    LoginDenied(String),
    /// `#access_token=...` or `#error=...` of the surface authorization.
    Remote(AuthorizationCallback),
    Unrecognized,
}

/// Classifies a redirect URL. Unparseable input is [`Redirect::Unrecognized`].
pub fn route(url: &str) -> Redirect {
    let Ok(url) = Url::parse(url) else {
        return Redirect::Unrecognized;
    };

    let mut query = url.query_pairs();
    if let Some((_, code)) = query.clone().find(|(k, _)| k == "code") {
        return Redirect::AuthorizationCode(code.into_owned());
    }
    if let Some((_, error)) = query.find(|(k, _)| k == "error") {
        return Redirect::LoginDenied(error.into_owned());
    }

    let Some(fragment) = url.fragment() else {
        return Redirect::Unrecognized;
    };
    let fields = fragment_pairs(fragment);
    if let Some((_, token)) = fields.iter().find(|(k, _)| k == "access_token") {
        return Redirect::Remote(AuthorizationCallback::Token(token.clone()));
    }
    if let Some((_, error)) = fields.iter().find(|(k, _)| k == "error") {
        return Redirect::Remote(AuthorizationCallback::Denied(error.clone()));
    }

    Redirect::Unrecognized
}

/// What [`dispatch`] did with a redirect.
#[derive(Debug, Clone, PartialEq)]
pub enum Dispatched {
    LoggedIn(Token),
    RemoteAuthorization,
    Ignored,
}

/// Routes `url` and forwards it: login codes are exchanged with the
/// session's pending verifier, surface authorizations go to the remote
/// controller.
pub async fn dispatch(
    url: &str,
    session: &SessionManager,
    remote: Option<&RemoteHandle>,
) -> Result<Dispatched, AuthError> {
    match route(url) {
        Redirect::AuthorizationCode(code) => {
            let verifier = session.pending_verifier().await.ok_or_else(|| {
                AuthError::TokenExchangeFailed("no login in progress".to_string())
            })?;
            let token = session.complete_login(&code, &verifier).await?;
            Ok(Dispatched::LoggedIn(token))
        }
        Redirect::LoginDenied(reason) => Err(AuthError::AuthorizationDenied(reason)),
        Redirect::Remote(callback) => match remote {
            Some(remote) => {
                remote.authorization_callback(callback);
                Ok(Dispatched::RemoteAuthorization)
            }
            None => Ok(Dispatched::Ignored),
        },
        Redirect::Unrecognized => Ok(Dispatched::Ignored),
    }
}

/// Fragments use the same `k=v&k=v` encoding as query strings.
fn fragment_pairs(fragment: &str) -> Vec<(String, String)> {
    Url::parse(&format!("http://localhost/?{fragment}"))
        .map(|u| u.query_pairs().into_owned().collect())
        .unwrap_or_default()
}
