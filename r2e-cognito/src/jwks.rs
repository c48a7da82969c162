use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use dashmap::DashMap;
use jsonwebtoken::DecodingKey;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::cache::{InMemoryKeySetStore, KeySetStore};
use crate::config::{self, CognitoConfig};
use crate::error::CognitoError;
use crate::fetch::{JwksFetcher, ReqwestJwksFetcher};

/// Raw JWK structure as published by a Cognito JWKS endpoint.
/// Unknown fields are ignored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Jwk {
    /// Key ID
    #[serde(default)]
    pub kid: Option<String>,
    /// Key type (e.g. "RSA")
    pub kty: String,
    /// Algorithm (e.g. "RS256")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alg: Option<String>,
    /// Intended use ("sig" for signature keys)
    #[serde(default, rename = "use", skip_serializing_if = "Option::is_none")]
    pub key_use: Option<String>,
    /// RSA modulus (base64url)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub n: Option<String>,
    /// RSA exponent (base64url)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub e: Option<String>,
}

/// JWKS document envelope (`{"keys": [...]}`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwksDocument {
    pub keys: Vec<Jwk>,
}

impl JwksDocument {
    pub fn from_slice(bytes: &[u8]) -> Result<Self, CognitoError> {
        serde_json::from_slice(bytes)
            .map_err(|e| CognitoError::JwksParse(format!("Failed to parse JWKS: {e}")))
    }
}

/// Verification keys of one user pool, indexed by `kid`.
///
/// A key set is immutable once built; a refresh produces a new one.
pub struct KeySet {
    keys: HashMap<String, DecodingKey>,
}

impl KeySet {
    /// Build a key set from a JWKS document.
    ///
    /// Keys without a `kid`, non-RSA keys, encryption keys and keys with
    /// missing or invalid components are skipped.
    pub fn from_document(document: &JwksDocument) -> Self {
        let mut keys = HashMap::new();
        for jwk in &document.keys {
            let Some(kid) = jwk.kid.as_deref().filter(|kid| !kid.is_empty()) else {
                warn!(kty = %jwk.kty, "Skipping JWK without kid");
                continue;
            };
            if jwk.key_use.as_deref().is_some_and(|u| u != "sig") {
                debug!(%kid, "Skipping non-signature JWK");
                continue;
            }
            match decoding_key(jwk) {
                Ok(key) => {
                    keys.insert(kid.to_string(), key);
                }
                Err(reason) => warn!(%kid, %reason, "Skipping unusable JWK"),
            }
        }
        Self { keys }
    }

    /// Parse a serialized JWKS document into a key set.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, CognitoError> {
        Ok(Self::from_document(&JwksDocument::from_slice(bytes)?))
    }

    pub fn get(&self, kid: &str) -> Option<&DecodingKey> {
        self.keys.get(kid)
    }

    pub fn contains(&self, kid: &str) -> bool {
        self.keys.contains_key(kid)
    }

    pub fn kids(&self) -> impl Iterator<Item = &str> {
        self.keys.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

impl std::fmt::Debug for KeySet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeySet")
            .field("kids", &self.keys.keys().collect::<Vec<_>>())
            .finish()
    }
}

fn decoding_key(jwk: &Jwk) -> Result<DecodingKey, String> {
    if jwk.kty != "RSA" {
        return Err(format!("unsupported key type: {}", jwk.kty));
    }
    if let Some(alg) = jwk.alg.as_deref() {
        if alg != "RS256" {
            return Err(format!("unsupported algorithm: {alg}"));
        }
    }
    let n = jwk.n.as_deref().ok_or("RSA key missing 'n' component")?;
    let e = jwk.e.as_deref().ok_or("RSA key missing 'e' component")?;
    DecodingKey::from_rsa_components(n, e)
        .map_err(|err| format!("failed to construct RSA decoding key: {err}"))
}

/// Cache key under which a pool's key set is stored.
pub fn cache_key(user_pool_id: &str) -> String {
    format!("jwks-{user_pool_id}")
}

/// Per-pool refresh coordination.
///
/// `attempts` counts finished fetches. A caller that waited on `lock` while
/// an attempt finished takes that attempt's failure instead of fetching again.
#[derive(Default)]
struct RefreshSlot {
    attempts: AtomicU64,
    lock: Mutex<Option<CognitoError>>,
}

/// Resolves the current [`KeySet`] of a user pool through a TTL cache.
///
/// On a miss the JWKS is fetched once per pool even under concurrent load:
/// callers queue on a per-pool lock and share the outcome of the fetch that
/// was in flight while they waited. Failed fetches are never cached, so the
/// next call retries.
pub struct KeySetProvider {
    store: Arc<dyn KeySetStore>,
    fetcher: Arc<dyn JwksFetcher>,
    ttl: Duration,
    refresh_slots: DashMap<String, Arc<RefreshSlot>>,
    parsed: DashMap<String, (Bytes, Arc<KeySet>)>,
}

impl KeySetProvider {
    /// Create a provider with an in-memory store and a `reqwest` fetcher
    /// bounded by the configured timeout.
    pub fn new(config: &CognitoConfig) -> Result<Self, CognitoError> {
        let fetcher = ReqwestJwksFetcher::new(Duration::from_secs(config.jwks_fetch_timeout_secs))?;
        Ok(Self::with_capabilities(
            Arc::new(InMemoryKeySetStore::new()),
            Arc::new(fetcher),
            Duration::from_secs(config.jwks_cache_ttl_secs),
        ))
    }

    /// Create a provider from explicit store and fetcher capabilities.
    pub fn with_capabilities(
        store: Arc<dyn KeySetStore>,
        fetcher: Arc<dyn JwksFetcher>,
        ttl: Duration,
    ) -> Self {
        Self {
            store,
            fetcher,
            ttl,
            refresh_slots: DashMap::new(),
            parsed: DashMap::new(),
        }
    }

    /// Return the key set of `user_pool_id`, fetching it when the cached
    /// copy is missing or older than the TTL.
    pub async fn get_key_set(
        &self,
        region: &str,
        user_pool_id: &str,
        endpoint: Option<&str>,
    ) -> Result<Arc<KeySet>, CognitoError> {
        let key = cache_key(user_pool_id);

        if let Some(key_set) = self.cached(&key).await {
            debug!(%user_pool_id, "JWKS cache hit");
            return Ok(key_set);
        }

        let slot = self.refresh_slot(&key);
        let seen = slot.attempts.load(Ordering::Acquire);
        let mut last_failure = slot.lock.lock().await;

        // Another caller may have refreshed while we waited.
        if let Some(key_set) = self.cached(&key).await {
            debug!(%user_pool_id, "JWKS refreshed by a concurrent caller");
            return Ok(key_set);
        }
        if slot.attempts.load(Ordering::Acquire) != seen {
            if let Some(err) = last_failure.as_ref() {
                debug!(%user_pool_id, error = %err, "Sharing failed JWKS fetch with waiting caller");
                return Err(err.clone());
            }
        }

        let url = config::jwks_url(region, user_pool_id, endpoint);
        debug!(%user_pool_id, %url, "JWKS cache miss, fetching");
        let result = self.fetch(&key, &url).await;
        *last_failure = result.as_ref().err().cloned();
        slot.attempts.fetch_add(1, Ordering::AcqRel);

        let key_set = result?;
        info!(%user_pool_id, keys = key_set.len(), "JWKS refreshed");
        Ok(key_set)
    }

    /// Drop the cached key set of `user_pool_id` so the next call refetches.
    pub async fn invalidate(&self, user_pool_id: &str) {
        let key = cache_key(user_pool_id);
        self.store.remove(&key).await;
        self.parsed.remove(&key);
    }

    async fn fetch(&self, key: &str, url: &str) -> Result<Arc<KeySet>, CognitoError> {
        let body = self.fetcher.fetch(url).await?;
        let key_set = Arc::new(KeySet::from_slice(&body).inspect_err(|e| {
            warn!(%url, error = %e, "Rejecting malformed JWKS");
        })?);

        self.store.set(key, body.clone(), self.ttl).await;
        self.parsed.insert(key.to_string(), (body, key_set.clone()));
        Ok(key_set)
    }

    /// Cached key set of `key`. The parsed form is reused while the stored
    /// bytes are unchanged.
    async fn cached(&self, key: &str) -> Option<Arc<KeySet>> {
        let bytes: Bytes = self.store.get(key).await?;
        if let Some(entry) = self.parsed.get(key) {
            let (parsed_from, key_set) = entry.value();
            if *parsed_from == bytes {
                return Some(key_set.clone());
            }
        }

        match KeySet::from_slice(&bytes) {
            Ok(key_set) => {
                let key_set = Arc::new(key_set);
                self.parsed.insert(key.to_string(), (bytes, key_set.clone()));
                Some(key_set)
            }
            Err(e) => {
                warn!(%key, error = %e, "Discarding unreadable cached JWKS");
                None
            }
        }
    }

    fn refresh_slot(&self, key: &str) -> Arc<RefreshSlot> {
        self.refresh_slots
            .entry(key.to_string())
            .or_default()
            .clone()
    }
}
