use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use serde_json::{Map, Value};

/// The only signing algorithm Cognito uses, and the only one accepted.
pub const SUPPORTED_ALGORITHM: &str = "RS256";

/// Claim names holding the Cognito username (access and id tokens respectively).
pub const USERNAME_CLAIMS: [&str; 2] = ["username", "cognito:username"];

/// Decoded JOSE header of a token.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TokenHeader {
    #[serde(default)]
    pub kid: Option<String>,
    #[serde(default)]
    pub alg: Option<String>,
}

/// Purpose of a Cognito token, from the `token_use` claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenUse {
    Id,
    Access,
}

impl TokenUse {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenUse::Id => "id",
            TokenUse::Access => "access",
        }
    }
}

impl FromStr for TokenUse {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "id" => Ok(TokenUse::Id),
            "access" => Ok(TokenUse::Access),
            other => Err(format!("unknown token_use: {other}")),
        }
    }
}

impl fmt::Display for TokenUse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Claims carried by a verified token.
///
/// Access is by claim name so the identity claim can be configured at
/// runtime; type checks happen at the accessor.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TokenPayload {
    claims: Map<String, Value>,
}

impl TokenPayload {
    pub fn new(claims: Map<String, Value>) -> Self {
        Self { claims }
    }

    /// Raw value of a claim.
    pub fn claim(&self, name: &str) -> Option<&Value> {
        self.claims.get(name)
    }

    /// Value of a claim when it is a string.
    pub fn claim_str(&self, name: &str) -> Option<&str> {
        self.claims.get(name).and_then(Value::as_str)
    }

    pub fn has_claim(&self, name: &str) -> bool {
        self.claims.contains_key(name)
    }

    pub fn issuer(&self) -> Option<&str> {
        self.claim_str("iss")
    }

    /// Parsed `token_use`, `None` when absent or not one of the known purposes.
    pub fn token_use(&self) -> Option<TokenUse> {
        self.claim_str("token_use")?.parse().ok()
    }

    /// Cognito username, from `username` or `cognito:username`.
    pub fn username(&self) -> Option<&str> {
        USERNAME_CLAIMS.iter().find_map(|name| self.claim_str(name))
    }

    pub fn claims(&self) -> &Map<String, Value> {
        &self.claims
    }

    pub fn into_inner(self) -> Map<String, Value> {
        self.claims
    }
}

impl From<Map<String, Value>> for TokenPayload {
    fn from(claims: Map<String, Value>) -> Self {
        Self::new(claims)
    }
}

/// Identity extracted from a fully verified token.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ValidatedIdentity(String);

impl ValidatedIdentity {
    pub(crate) fn new(identity: String) -> Self {
        Self(identity)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for ValidatedIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ValidatedIdentity {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
