#![allow(dead_code)]

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, OnceLock};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use bytes::Bytes;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use r2e_cognito::{CognitoConfig, CognitoError, InMemoryKeySetStore, JwksFetcher, KeySetProvider, TokenVerifier};
use rand::rngs::OsRng;
use rsa::pkcs8::EncodePrivateKey;
use rsa::traits::PublicKeyParts;
use rsa::{RsaPrivateKey, RsaPublicKey};

pub const REGION: &str = "us-east-1";
pub const POOL_ID: &str = "us-east-1_ABC123";
pub const CLIENT_ID: &str = "3n4b5urk1ft4fl3mg5e62d9ado";
pub const KID: &str = "test-key-1";
pub const USER_UUID: &str = "0f8fad5b-d9cb-469f-a165-70867728950e";

pub fn issuer() -> String {
    format!("https://cognito-idp.{REGION}.amazonaws.com/{POOL_ID}")
}

/// RSA-2048 key pair published in the test JWKS.
pub struct TestKey {
    pub encoding_key: EncodingKey,
    pub n: String,
    pub e: String,
}

impl TestKey {
    fn generate() -> Self {
        let private_key =
            RsaPrivateKey::new(&mut OsRng, 2048).expect("failed to generate RSA-2048 key");
        let public_key = RsaPublicKey::from(&private_key);
        let pem = private_key
            .to_pkcs8_pem(rsa::pkcs8::LineEnding::LF)
            .expect("failed to export RSA key as PKCS8 PEM");
        Self {
            encoding_key: EncodingKey::from_rsa_pem(pem.as_bytes())
                .expect("failed to create EncodingKey from RSA PEM"),
            n: URL_SAFE_NO_PAD.encode(public_key.n().to_bytes_be()),
            e: URL_SAFE_NO_PAD.encode(public_key.e().to_bytes_be()),
        }
    }
}

/// Key whose public half is served by the JWKS.
pub fn signing_key() -> &'static TestKey {
    static KEY: OnceLock<TestKey> = OnceLock::new();
    KEY.get_or_init(TestKey::generate)
}

/// Key unknown to the JWKS, for forged signatures.
pub fn rogue_key() -> &'static TestKey {
    static KEY: OnceLock<TestKey> = OnceLock::new();
    KEY.get_or_init(TestKey::generate)
}

pub fn jwks_json() -> String {
    let key = signing_key();
    serde_json::json!({
        "keys": [{
            "kid": KID,
            "kty": "RSA",
            "alg": "RS256",
            "use": "sig",
            "n": key.n,
            "e": key.e,
        }]
    })
    .to_string()
}

pub fn now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs()
}

/// Claims of a valid Cognito access token.
pub fn access_claims() -> serde_json::Value {
    let now = now();
    serde_json::json!({
        "sub": USER_UUID,
        "iss": issuer(),
        "client_id": CLIENT_ID,
        "token_use": "access",
        "username": "alice",
        "iat": now,
        "exp": now + 3600,
    })
}

pub fn sign_with(key: &TestKey, kid: &str, claims: &serde_json::Value) -> String {
    let mut header = Header::new(Algorithm::RS256);
    header.kid = Some(kid.to_string());
    encode(&header, claims, &key.encoding_key).unwrap()
}

pub fn sign(claims: &serde_json::Value) -> String {
    sign_with(signing_key(), KID, claims)
}

/// Assemble a token from a raw header, keeping a real payload and signature.
pub fn with_raw_header(token: &str, header: &str) -> String {
    let mut parts = token.splitn(2, '.');
    let _ = parts.next();
    format!("{}.{}", URL_SAFE_NO_PAD.encode(header), parts.next().unwrap())
}

/// Fetcher serving a fixed body and recording every requested URL.
pub struct FakeFetcher {
    response: Mutex<Result<Bytes, String>>,
    calls: AtomicUsize,
    urls: Mutex<Vec<String>>,
    delay: Duration,
}

impl FakeFetcher {
    pub fn serving(body: impl Into<Bytes>) -> Arc<Self> {
        Arc::new(Self {
            response: Mutex::new(Ok(body.into())),
            calls: AtomicUsize::new(0),
            urls: Mutex::new(Vec::new()),
            delay: Duration::ZERO,
        })
    }

    pub fn failing(message: &str) -> Arc<Self> {
        Arc::new(Self {
            response: Mutex::new(Err(message.to_string())),
            calls: AtomicUsize::new(0),
            urls: Mutex::new(Vec::new()),
            delay: Duration::ZERO,
        })
    }

    pub fn slow(body: impl Into<Bytes>, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            response: Mutex::new(Ok(body.into())),
            calls: AtomicUsize::new(0),
            urls: Mutex::new(Vec::new()),
            delay,
        })
    }

    pub fn set_response(&self, response: Result<Bytes, String>) {
        *self.response.lock().unwrap() = response;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn urls(&self) -> Vec<String> {
        self.urls.lock().unwrap().clone()
    }
}

impl JwksFetcher for FakeFetcher {
    fn fetch<'a>(&'a self, url: &'a str) -> Pin<Box<dyn Future<Output = Result<Bytes, CognitoError>> + Send + 'a>> {
        Box::pin(async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.urls.lock().unwrap().push(url.to_string());
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            let response = self.response.lock().unwrap().clone();
            response.map_err(CognitoError::JwksFetch)
        })
    }
}

pub fn config() -> CognitoConfig {
    CognitoConfig::new(REGION, POOL_ID, CLIENT_ID)
}

pub fn provider(fetcher: Arc<FakeFetcher>) -> Arc<KeySetProvider> {
    Arc::new(KeySetProvider::with_capabilities(
        Arc::new(InMemoryKeySetStore::new()),
        fetcher,
        Duration::from_secs(3600),
    ))
}

/// Verifier backed by a fake JWKS serving the signing key.
pub fn verifier_with(config: CognitoConfig) -> (TokenVerifier, Arc<FakeFetcher>) {
    let fetcher = FakeFetcher::serving(jwks_json());
    let verifier = TokenVerifier::with_provider(provider(fetcher.clone()), config);
    (verifier, fetcher)
}

pub fn verifier() -> (TokenVerifier, Arc<FakeFetcher>) {
    verifier_with(config())
}
