//! JWT Token Service
//!
//! Issues and validates access and refresh tokens. Each kind has its own
//! asymmetric key pair and TTL; the private half signs, the public half
//! verifies. Nothing is persisted: a token is valid when its signature
//! checks out, its kind matches and it has not expired.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::config::{TokenConfig, TokenSettings};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

impl std::fmt::Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenKind::Access => f.write_str("access"),
            TokenKind::Refresh => f.write_str("refresh"),
        }
    }
}

/// JWT Claims structure
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Claims {
    /// Account identifier
    pub sub: Uuid,
    /// Issued at (unix seconds)
    pub iat: i64,
    /// Expiration (unix seconds)
    pub exp: i64,
    /// Unique token identifier
    pub jti: Uuid,
    pub kind: TokenKind,
}

/// Why a token was rejected. Only ever used for logging and messages.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("Token is missing")]
    Missing,

    #[error("Token is malformed")]
    Malformed(String),

    #[error("Token is expired")]
    Expired,

    #[error("Token signature is invalid")]
    InvalidSignature,

    #[error("Token is not a {expected} token")]
    WrongKind { expected: TokenKind, found: TokenKind },

    #[error("failed to sign token: {0}")]
    Signing(String),

    #[error("invalid key material: {0}")]
    KeyMaterial(String),
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => {
                TokenError::InvalidSignature
            }
            ErrorKind::ExpiredSignature => TokenError::Expired,
            _ => TokenError::Malformed(err.to_string()),
        }
    }
}

/// Signing and verification halves of one key pair.
#[derive(Clone)]
pub struct TokenKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl TokenKeys {
    pub fn from_pem(algorithm: Algorithm, private_pem: &[u8], public_pem: &[u8]) -> Result<Self, TokenError> {
        let key_err = |e: jsonwebtoken::errors::Error| TokenError::KeyMaterial(e.to_string());
        let (encoding, decoding) = match algorithm {
            Algorithm::RS256 | Algorithm::RS384 | Algorithm::RS512 => (
                EncodingKey::from_rsa_pem(private_pem).map_err(key_err)?,
                DecodingKey::from_rsa_pem(public_pem).map_err(key_err)?,
            ),
            Algorithm::ES256 | Algorithm::ES384 => (
                EncodingKey::from_ec_pem(private_pem).map_err(key_err)?,
                DecodingKey::from_ec_pem(public_pem).map_err(key_err)?,
            ),
            Algorithm::EdDSA => (
                EncodingKey::from_ed_pem(private_pem).map_err(key_err)?,
                DecodingKey::from_ed_pem(public_pem).map_err(key_err)?,
            ),
            other => {
                return Err(TokenError::KeyMaterial(format!(
                    "{other:?} is not an asymmetric algorithm"
                )));
            }
        };
        Ok(Self { encoding, decoding })
    }

    /// Ed25519 keys from a PKCS#8 document and the raw 32-byte public key.
    pub fn from_ed_der(private_pkcs8: &[u8], public_key: &[u8]) -> Self {
        Self {
            encoding: EncodingKey::from_ed_der(private_pkcs8),
            decoding: DecodingKey::from_ed_der(public_key),
        }
    }
}

/// Key pair plus lifetime for one token kind.
#[derive(Clone)]
pub struct TokenPolicy {
    pub keys: TokenKeys,
    pub ttl: Duration,
}

impl TokenPolicy {
    pub fn new(keys: TokenKeys, ttl: Duration) -> Self {
        Self { keys, ttl }
    }

    fn from_settings(algorithm: Algorithm, settings: &TokenSettings) -> Result<Self, TokenError> {
        let keys = TokenKeys::from_pem(algorithm, &settings.keys.private_pem, &settings.keys.public_pem)?;
        Ok(Self::new(keys, settings.expires_in))
    }
}

/// Source of "now" for issuance and expiry checks.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A freshly signed token and the claims inside it.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub claims: Claims,
}

/// JWT Service for token operations
#[derive(Clone)]
pub struct TokenService {
    algorithm: Algorithm,
    access: TokenPolicy,
    refresh: TokenPolicy,
    validation: Validation,
    clock: Arc<dyn Clock>,
}

impl TokenService {
    pub fn new(algorithm: Algorithm, access: TokenPolicy, refresh: TokenPolicy) -> Self {
        let mut validation = Validation::new(algorithm);
        // expiry is checked against our own clock in `decode_claims_at`
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.leeway = 0;
        validation.required_spec_claims = HashSet::from(["exp".to_string(), "sub".to_string()]);

        Self {
            algorithm,
            access,
            refresh,
            validation,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn from_config(config: &TokenConfig) -> Result<Self, TokenError> {
        Ok(Self::new(
            config.algorithm,
            TokenPolicy::from_settings(config.algorithm, &config.access)?,
            TokenPolicy::from_settings(config.algorithm, &config.refresh)?,
        ))
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    fn policy(&self, kind: TokenKind) -> &TokenPolicy {
        match kind {
            TokenKind::Access => &self.access,
            TokenKind::Refresh => &self.refresh,
        }
    }

    pub fn ttl(&self, kind: TokenKind) -> Duration {
        self.policy(kind).ttl
    }

    /// Sign a new token of `kind` for `account_id`.
    pub fn issue(&self, kind: TokenKind, account_id: Uuid) -> Result<IssuedToken, TokenError> {
        self.issue_at(kind, account_id, self.clock.now())
    }

    pub fn issue_at(
        &self,
        kind: TokenKind,
        account_id: Uuid,
        issued_at: DateTime<Utc>,
    ) -> Result<IssuedToken, TokenError> {
        let policy = self.policy(kind);
        let iat = issued_at.timestamp();
        let exp = i64::try_from(policy.ttl.as_secs())
            .ok()
            .and_then(|ttl| iat.checked_add(ttl))
            .ok_or_else(|| TokenError::Signing(format!("{kind} token ttl of {:?} is out of range", policy.ttl)))?;
        let claims = Claims {
            sub: account_id,
            iat,
            exp,
            jti: Uuid::new_v4(),
            kind,
        };

        let token = encode(&Header::new(self.algorithm), &claims, &policy.keys.encoding)
            .map_err(|e| TokenError::Signing(e.to_string()))?;
        Ok(IssuedToken { token, claims })
    }

    /// Validate a token of `kind` and return its subject.
    pub fn validate(&self, token: &str, kind: TokenKind) -> Result<Uuid, TokenError> {
        self.decode_claims(token, kind).map(|claims| claims.sub)
    }

    pub fn decode_claims(&self, token: &str, kind: TokenKind) -> Result<Claims, TokenError> {
        self.decode_claims_at(token, kind, self.clock.now())
    }

    /// Full check against `now`: shape, signature, kind, then expiry.
    pub fn decode_claims_at(
        &self,
        token: &str,
        kind: TokenKind,
        now: DateTime<Utc>,
    ) -> Result<Claims, TokenError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(TokenError::Missing);
        }

        let data = decode::<Claims>(token, &self.policy(kind).keys.decoding, &self.validation)?;
        let claims = data.claims;

        if claims.kind != kind {
            return Err(TokenError::WrongKind {
                expected: kind,
                found: claims.kind,
            });
        }
        if now.timestamp() >= claims.exp {
            return Err(TokenError::Expired);
        }
        Ok(claims)
    }
}
