pub mod cache;
pub mod claims;
pub mod config;
pub mod error;
pub mod extractor;
pub mod fetch;
pub mod jwks;
pub mod jwt;

// Re-export primary public types for convenience.
pub use cache::{InMemoryKeySetStore, KeySetStore};
pub use claims::{TokenHeader, TokenPayload, TokenUse, ValidatedIdentity};
pub use config::CognitoConfig;
pub use error::CognitoError;
pub use extractor::{extract_token, TokenSource};
pub use fetch::{JwksFetcher, ReqwestJwksFetcher};
pub use jwks::{KeySet, KeySetProvider};
pub use jwt::TokenVerifier;

pub mod prelude {
    //! Re-exports of the most commonly used Cognito types.
    pub use crate::{CognitoConfig, CognitoError, TokenVerifier, ValidatedIdentity};
}
