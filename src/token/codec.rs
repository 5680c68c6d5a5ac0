//! Claims encoding and signature verification.
//!
//! [`TokenCodec`] is the only place that knows the token wire format.
//! [`HmacCodec`] produces compact JWTs signed with an HMAC-SHA2 key and
//! rejects anything outside the HMAC family on decode. Temporal checks are
//! left to the caller so they can run against an injected clock.

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use zeroize::Zeroizing;

/// The claim set carried by every token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject id.
    pub sub: String,
    /// Application-defined view/tenant scope.
    #[serde(default)]
    pub view: String,
    pub iat: i64,
    pub exp: i64,
    pub nbf: i64,
    /// Unique token id.
    pub jti: String,
}

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("unsupported signing method: {0}")]
    UnsupportedMethod(String),
    #[error("signing failed: {0}")]
    Sign(String),
    #[error("malformed token: {0}")]
    Malformed(String),
    #[error("signature or algorithm rejected: {0}")]
    Rejected(String),
}

pub trait TokenCodec: Send + Sync {
    fn encode(&self, claims: &Claims) -> Result<String, CodecError>;

    /// Verify the signature and structure of `token` and return its claims.
    fn decode(&self, token: &str) -> Result<Claims, CodecError>;
}

/// HMAC-SHA2 JWT codec.
pub struct HmacCodec {
    algorithm: Algorithm,
    key: Zeroizing<Vec<u8>>,
    validation: Validation,
}

impl HmacCodec {
    const FAMILY: [Algorithm; 3] = [Algorithm::HS256, Algorithm::HS384, Algorithm::HS512];

    pub fn new(algorithm: Algorithm, key: &[u8]) -> Result<Self, CodecError> {
        if !Self::FAMILY.contains(&algorithm) {
            return Err(CodecError::UnsupportedMethod(format!("{algorithm:?}")));
        }

        let mut validation = Validation::new(algorithm);
        validation.algorithms = Self::FAMILY.to_vec();
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.set_required_spec_claims(&["sub", "exp", "nbf", "iat"]);

        Ok(Self {
            algorithm,
            key: Zeroizing::new(key.to_vec()),
            validation,
        })
    }

    /// Build a codec from a method name such as `"HS512"`.
    pub fn from_method(method: &str, key: &[u8]) -> Result<Self, CodecError> {
        Self::new(parse_method(method)?, key)
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }
}

/// Parse an HMAC signing method name.
pub fn parse_method(method: &str) -> Result<Algorithm, CodecError> {
    match method.to_ascii_uppercase().as_str() {
        "HS256" => Ok(Algorithm::HS256),
        "HS384" => Ok(Algorithm::HS384),
        "HS512" => Ok(Algorithm::HS512),
        _ => Err(CodecError::UnsupportedMethod(method.to_string())),
    }
}

impl TokenCodec for HmacCodec {
    fn encode(&self, claims: &Claims) -> Result<String, CodecError> {
        jsonwebtoken::encode(
            &Header::new(self.algorithm),
            claims,
            &EncodingKey::from_secret(&self.key),
        )
        .map_err(|e| CodecError::Sign(e.to_string()))
    }

    fn decode(&self, token: &str) -> Result<Claims, CodecError> {
        use jsonwebtoken::errors::ErrorKind;

        jsonwebtoken::decode::<Claims>(token, &DecodingKey::from_secret(&self.key), &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => {
                    CodecError::Rejected(e.to_string())
                }
                _ => CodecError::Malformed(e.to_string()),
            })
    }
}
