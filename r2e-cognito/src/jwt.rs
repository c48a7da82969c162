use std::sync::Arc;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, Algorithm, Validation};
use serde_json::{Map, Value};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::claims::{TokenHeader, TokenPayload, ValidatedIdentity, SUPPORTED_ALGORITHM};
use crate::config::CognitoConfig;
use crate::error::CognitoError;
use crate::extractor::{self, TokenSource};
use crate::jwks::KeySetProvider;

/// Verifies Cognito-issued JWTs and extracts the caller's identity.
///
/// Verification runs in stages and stops at the first failure:
///
/// 1. Header: three segments, a `kid`, and `alg` pinned to RS256
/// 2. Signature and temporal claims (`exp`, `nbf`) against the pool's JWKS
/// 3. Payload: issuer, `token_use`, and the identity claim
///
/// Every rejection is a [`CognitoError::InvalidToken`]. A JWKS that cannot be
/// fetched surfaces as [`CognitoError::JwksFetch`] or
/// [`CognitoError::JwksParse`] instead; callers must not trust the token in
/// either case.
///
/// # Example
///
/// ```ignore
/// let config = CognitoConfig::new("eu-west-1", "eu-west-1_AbCdEf", "client-id");
/// let verifier = TokenVerifier::new(config)?;
///
/// match verifier.authenticate(request.headers()).await? {
///     Some(identity) => println!("hello {identity}"),
///     None => println!("anonymous"),
/// }
/// ```
pub struct TokenVerifier {
    key_sets: Arc<KeySetProvider>,
    config: CognitoConfig,
}

impl TokenVerifier {
    /// Create a verifier with its own in-memory JWKS cache.
    pub fn new(config: CognitoConfig) -> Result<Self, CognitoError> {
        config.validate()?;
        let key_sets = KeySetProvider::new(&config)?;
        Ok(Self {
            key_sets: Arc::new(key_sets),
            config,
        })
    }

    /// Create a verifier sharing an existing key set provider.
    pub fn with_provider(key_sets: Arc<KeySetProvider>, config: CognitoConfig) -> Self {
        Self { key_sets, config }
    }

    pub fn config(&self) -> &CognitoConfig {
        &self.config
    }

    pub fn key_sets(&self) -> &Arc<KeySetProvider> {
        &self.key_sets
    }

    /// Read a candidate token from the request, bearer header first, then
    /// the Cognito session cookies.
    pub fn extract_token<S: TokenSource + ?Sized>(&self, source: &S) -> Option<String> {
        extractor::extract_token(source, &self.config.client_id)
    }

    /// Decode and check the token header without touching the network.
    pub fn validate_header(&self, token: &str) -> Result<TokenHeader, CognitoError> {
        let segments: Vec<&str> = token.split('.').collect();
        if segments.len() != 3 {
            return Err(CognitoError::invalid("wrong number of segments"));
        }

        let raw = URL_SAFE_NO_PAD
            .decode(segments[0])
            .map_err(|e| CognitoError::invalid(format!("failed to decode header: {e}")))?;
        let header: TokenHeader = serde_json::from_slice(&raw)
            .map_err(|e| CognitoError::invalid(format!("failed to decode header: {e}")))?;

        if header.kid.as_deref().is_none_or(str::is_empty) {
            return Err(CognitoError::invalid("no kid present"));
        }
        match header.alg.as_deref() {
            None | Some("") => return Err(CognitoError::invalid("no alg present")),
            Some(SUPPORTED_ALGORITHM) => {}
            Some(_) => return Err(CognitoError::invalid("alg is not supported")),
        }

        debug!(alg = ?header.alg, kid = ?header.kid, "Decoded JWT header");
        Ok(header)
    }

    /// Verify the signature and temporal claims of a token.
    ///
    /// The header is checked first, so a token with a foreign algorithm never
    /// causes a JWKS fetch.
    pub async fn verify_signature_and_claims(
        &self,
        token: &str,
    ) -> Result<TokenPayload, CognitoError> {
        let header = self.validate_header(token)?;
        self.verify_with_header(token, &header).await
    }

    async fn verify_with_header(
        &self,
        token: &str,
        header: &TokenHeader,
    ) -> Result<TokenPayload, CognitoError> {
        let key_set = self
            .key_sets
            .get_key_set(
                &self.config.region,
                &self.config.user_pool_id,
                self.config.jwks_endpoint.as_deref(),
            )
            .await?;

        let kid = header.kid.as_deref().unwrap_or_default();
        let key = key_set
            .get(kid)
            .ok_or_else(|| CognitoError::invalid(format!("no signing key found for kid {kid}")))?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.leeway = self.config.leeway_secs;
        validation.validate_exp = true;
        validation.validate_nbf = true;
        // Cognito access tokens carry `client_id` rather than `aud`.
        validation.validate_aud = false;

        let token_data = decode::<Map<String, Value>>(token, key, &validation)
            .map_err(|e| CognitoError::InvalidToken(rejection_reason(&e)))?;

        Ok(TokenPayload::new(token_data.claims))
    }

    /// Check the Cognito-specific claims of a signature-verified payload.
    pub fn validate_payload(
        &self,
        payload: &TokenPayload,
        region: &str,
        user_pool_id: &str,
        validate_issuer: bool,
    ) -> Result<(), CognitoError> {
        if validate_issuer {
            let expected = format!("https://cognito-idp.{region}.amazonaws.com/{user_pool_id}");
            if payload.issuer() != Some(expected.as_str()) {
                return Err(CognitoError::invalid(format!(
                    "invalid issuer, expected {expected}"
                )));
            }
        }

        if payload.token_use().is_none() {
            return Err(CognitoError::invalid("token_use must be one of: id, access"));
        }

        let claim = self.config.identity_claim.as_str();
        if payload.username().is_none() && !payload.has_claim(claim) {
            return Err(CognitoError::invalid(format!(
                "token must include a column which contains the UUID ({claim} or username)"
            )));
        }

        if self.config.require_uuid_identity {
            if let Some(value) = payload.claim(claim) {
                let is_uuid = value.as_str().is_some_and(|s| Uuid::parse_str(s).is_ok());
                if !is_uuid {
                    return Err(CognitoError::invalid(format!(
                        "{claim} claim is not a valid UUID"
                    )));
                }
            }
        }

        Ok(())
    }

    /// Run every verification stage and return the token's claims.
    pub async fn decode(&self, token: &str) -> Result<TokenPayload, CognitoError> {
        let result = async {
            let header = self.validate_header(token)?;
            let payload = self.verify_with_header(token, &header).await?;
            self.validate_payload(
                &payload,
                &self.config.region,
                &self.config.user_pool_id,
                self.config.validate_issuer,
            )?;
            Ok::<_, CognitoError>(payload)
        }
        .await;

        match &result {
            Ok(payload) => debug!(token_use = ?payload.token_use(), "JWT validated"),
            Err(e) => warn!(error = %e, "JWT validation failed"),
        }
        result
    }

    /// Verify a token and return the value of the configured identity claim.
    pub async fn extract_identity(&self, token: &str) -> Result<ValidatedIdentity, CognitoError> {
        let payload = self.decode(token).await?;
        let identity = payload
            .claim_str(&self.config.identity_claim)
            .filter(|value| !value.is_empty())
            .ok_or_else(|| {
                warn!(claim = %self.config.identity_claim, "Identity claim missing from verified token");
                CognitoError::invalid("identity claim not found")
            })?;
        Ok(ValidatedIdentity::new(identity.to_string()))
    }

    /// Extract and verify the request's token.
    ///
    /// - No token → `Ok(None)`
    /// - Valid token → `Ok(Some(identity))`
    /// - Invalid token or unreachable JWKS → `Err(..)`
    pub async fn authenticate<S: TokenSource + ?Sized>(
        &self,
        source: &S,
    ) -> Result<Option<ValidatedIdentity>, CognitoError> {
        match self.extract_token(source) {
            Some(token) => self.extract_identity(&token).await.map(Some),
            None => {
                debug!("No Cognito token on request");
                Ok(None)
            }
        }
    }
}

fn rejection_reason(err: &jsonwebtoken::errors::Error) -> String {
    match err.kind() {
        ErrorKind::ExpiredSignature => "token has expired".into(),
        ErrorKind::ImmatureSignature => "token is not yet valid".into(),
        ErrorKind::InvalidSignature => "signature verification failed".into(),
        ErrorKind::InvalidAlgorithm => "alg is not supported".into(),
        ErrorKind::InvalidToken => "malformed token".into(),
        ErrorKind::MissingRequiredClaim(claim) => format!("missing required claim: {claim}"),
        _ => err.to_string(),
    }
}
