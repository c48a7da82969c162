use serde::Deserialize;

use crate::error::CognitoError;

/// Claim read as the caller's identity when none is configured.
pub const DEFAULT_IDENTITY_CLAIM: &str = "sub";

/// Cognito user pool configuration for token verification and JWKS cache.
///
/// Built once at startup and shared by the [`KeySetProvider`](crate::KeySetProvider)
/// and the [`TokenVerifier`](crate::TokenVerifier).
#[derive(Clone, Debug, Deserialize)]
pub struct CognitoConfig {
    /// AWS region hosting the user pool (e.g. `us-east-1`)
    pub region: String,

    /// User pool identifier (e.g. `us-east-1_ABC123`)
    pub user_pool_id: String,

    /// App client identifier, used to name the Cognito session cookies
    #[serde(default)]
    pub client_id: String,

    /// Custom discovery endpoint. When set, keys are fetched from
    /// `{endpoint}/{user_pool_id}/.well-known/jwks.json`.
    #[serde(default)]
    pub jwks_endpoint: Option<String>,

    /// Claim holding the caller's identity (default: `sub`)
    #[serde(default = "default_identity_claim")]
    pub identity_claim: String,

    /// Check `iss` against the pool's issuer URL (default: true)
    #[serde(default = "default_true")]
    pub validate_issuer: bool,

    /// Require the identity claim to be a UUID (default: true)
    #[serde(default = "default_true")]
    pub require_uuid_identity: bool,

    /// JWKS cache TTL in seconds (default: 3600)
    #[serde(default = "default_cache_ttl")]
    pub jwks_cache_ttl_secs: u64,

    /// Clock skew tolerated on `exp`/`nbf` in seconds (default: 60)
    #[serde(default = "default_leeway")]
    pub leeway_secs: u64,

    /// Upper bound on a JWKS fetch in seconds (default: 5)
    #[serde(default = "default_fetch_timeout")]
    pub jwks_fetch_timeout_secs: u64,
}

fn default_identity_claim() -> String {
    DEFAULT_IDENTITY_CLAIM.to_string()
}

fn default_true() -> bool {
    true
}

fn default_cache_ttl() -> u64 {
    3600
}

fn default_leeway() -> u64 {
    60
}

fn default_fetch_timeout() -> u64 {
    5
}

impl CognitoConfig {
    /// Create a new CognitoConfig for the given pool with default settings.
    pub fn new(
        region: impl Into<String>,
        user_pool_id: impl Into<String>,
        client_id: impl Into<String>,
    ) -> Self {
        Self {
            region: region.into(),
            user_pool_id: user_pool_id.into(),
            client_id: client_id.into(),
            jwks_endpoint: None,
            identity_claim: default_identity_claim(),
            validate_issuer: true,
            require_uuid_identity: true,
            jwks_cache_ttl_secs: default_cache_ttl(),
            leeway_secs: default_leeway(),
            jwks_fetch_timeout_secs: default_fetch_timeout(),
        }
    }

    /// Load the configuration from a YAML document.
    ///
    /// ```yaml
    /// region: eu-west-1
    /// user_pool_id: eu-west-1_AbCdEf
    /// client_id: 3n4b5urk1ft4fl3mg5e62d9ado
    /// identity_claim: custom:user_uuid
    /// ```
    pub fn from_yaml_str(content: &str) -> Result<Self, CognitoError> {
        let config: Self =
            serde_yaml::from_str(content).map_err(|e| CognitoError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check that the pool coordinates are usable.
    pub fn validate(&self) -> Result<(), CognitoError> {
        if self.region.trim().is_empty() {
            return Err(CognitoError::Config("region must not be empty".into()));
        }
        if self.user_pool_id.trim().is_empty() {
            return Err(CognitoError::Config("user_pool_id must not be empty".into()));
        }
        if self.identity_claim.trim().is_empty() {
            return Err(CognitoError::Config("identity_claim must not be empty".into()));
        }
        Ok(())
    }

    /// Fetch keys from a custom discovery endpoint instead of Cognito.
    pub fn with_jwks_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.jwks_endpoint = Some(endpoint.into());
        self
    }

    /// Read the identity from another claim (e.g. `custom:user_uuid`).
    pub fn with_identity_claim(mut self, claim: impl Into<String>) -> Self {
        self.identity_claim = claim.into();
        self
    }

    /// Enable or disable the `iss` check.
    pub fn with_issuer_validation(mut self, enabled: bool) -> Self {
        self.validate_issuer = enabled;
        self
    }

    /// Enable or disable the UUID format check on the identity claim.
    pub fn with_uuid_identity(mut self, required: bool) -> Self {
        self.require_uuid_identity = required;
        self
    }

    /// Set the JWKS cache TTL in seconds.
    pub fn with_cache_ttl(mut self, ttl_secs: u64) -> Self {
        self.jwks_cache_ttl_secs = ttl_secs;
        self
    }

    /// Set the leeway applied to temporal claims.
    pub fn with_leeway(mut self, leeway_secs: u64) -> Self {
        self.leeway_secs = leeway_secs;
        self
    }

    /// Set the JWKS fetch timeout in seconds.
    pub fn with_fetch_timeout(mut self, timeout_secs: u64) -> Self {
        self.jwks_fetch_timeout_secs = timeout_secs;
        self
    }

    /// Issuer URL Cognito writes into the `iss` claim of this pool's tokens.
    pub fn issuer(&self) -> String {
        format!(
            "https://cognito-idp.{}.amazonaws.com/{}",
            self.region, self.user_pool_id
        )
    }

    /// URL of the pool's JSON Web Key Set.
    pub fn jwks_url(&self) -> String {
        jwks_url(&self.region, &self.user_pool_id, self.jwks_endpoint.as_deref())
    }
}

/// Compose the well-known JWKS URL for a pool, honouring an endpoint override.
pub fn jwks_url(region: &str, user_pool_id: &str, endpoint: Option<&str>) -> String {
    match endpoint {
        Some(endpoint) => format!(
            "{}/{user_pool_id}/.well-known/jwks.json",
            endpoint.trim_end_matches('/')
        ),
        None => format!(
            "https://cognito-idp.{region}.amazonaws.com/{user_pool_id}/.well-known/jwks.json"
        ),
    }
}
