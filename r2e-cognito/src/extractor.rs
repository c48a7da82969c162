use http::header::{AUTHORIZATION, COOKIE};
use http::HeaderMap;
use tracing::debug;

/// Prefix shared by the cookies the Cognito hosted UI and Amplify set.
pub const COOKIE_PREFIX: &str = "CognitoIdentityServiceProvider";

/// Request surface a token can be read from.
pub trait TokenSource {
    /// Credential of an `Authorization: Bearer <token>` header, if any.
    fn bearer_token(&self) -> Option<String>;

    /// Value of the named cookie, if any.
    fn cookie(&self, name: &str) -> Option<String>;
}

impl TokenSource for HeaderMap {
    fn bearer_token(&self) -> Option<String> {
        let value = self.get(AUTHORIZATION)?.to_str().ok()?;
        extract_bearer_token(value).map(str::to_string)
    }

    fn cookie(&self, name: &str) -> Option<String> {
        self.get_all(COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .find_map(|header| find_cookie(header, name))
            .map(str::to_string)
    }
}

/// Extract a Bearer token from an Authorization header value.
pub fn extract_bearer_token(header_value: &str) -> Option<&str> {
    let (scheme, token) = header_value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("Bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

/// Look up `name` in a `Cookie` header value (`a=1; b=2`).
pub fn find_cookie<'a>(header_value: &'a str, name: &str) -> Option<&'a str> {
    header_value
        .split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.trim_matches('"'))
}

/// Name of the cookie holding the last signed-in username of `client_id`.
pub fn last_auth_user_cookie(client_id: &str) -> String {
    format!("{COOKIE_PREFIX}.{client_id}.LastAuthUser")
}

/// Name of the cookie holding the access token of `username`.
pub fn access_token_cookie(client_id: &str, username: &str) -> String {
    format!("{COOKIE_PREFIX}.{client_id}.{username}.accessToken")
}

/// Pull a candidate token out of a request.
///
/// The bearer credential wins; otherwise the Cognito cookie pair is used,
/// where `LastAuthUser` names the user whose `accessToken` cookie is read.
/// `None` means the request is unauthenticated, not that it is invalid.
pub fn extract_token<S: TokenSource + ?Sized>(source: &S, client_id: &str) -> Option<String> {
    if let Some(token) = source.bearer_token() {
        debug!("Token found in Authorization header");
        return Some(token);
    }

    let username = source
        .cookie(&last_auth_user_cookie(client_id))
        .filter(|u| !u.is_empty())?;
    let token = source
        .cookie(&access_token_cookie(client_id, &username))
        .filter(|t| !t.is_empty())?;
    debug!("Token found in Cognito session cookies");
    Some(token)
}
