use axum::response::{IntoResponse, Response};
use axum::Json;
use http::StatusCode;

/// Errors raised while verifying a Cognito token.
#[derive(Debug, Clone)]
pub enum CognitoError {
    /// The token was rejected. Every header, signature, temporal and claim
    /// failure collapses into this variant; the reason is for logs only.
    InvalidToken(String),

    /// The JWKS could not be fetched (network failure, timeout, non-2xx).
    JwksFetch(String),

    /// The fetched JWKS document could not be parsed.
    JwksParse(String),

    /// The configuration is unusable.
    Config(String),
}

impl CognitoError {
    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        CognitoError::InvalidToken(reason.into())
    }

    /// True when the token itself was judged invalid, as opposed to the
    /// verification being impossible to perform.
    pub fn is_rejection(&self) -> bool {
        matches!(self, CognitoError::InvalidToken(_))
    }

    pub fn public_message(&self) -> &'static str {
        "Unauthorized"
    }
}

impl std::fmt::Display for CognitoError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CognitoError::InvalidToken(msg) => write!(f, "Invalid token: {msg}"),
            CognitoError::JwksFetch(msg) => write!(f, "JWKS fetch error: {msg}"),
            CognitoError::JwksParse(msg) => write!(f, "JWKS parse error: {msg}"),
            CognitoError::Config(msg) => write!(f, "Invalid Cognito configuration: {msg}"),
        }
    }
}

impl std::error::Error for CognitoError {}

impl IntoResponse for CognitoError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({ "error": self.public_message() });
        (StatusCode::UNAUTHORIZED, Json(body)).into_response()
    }
}
