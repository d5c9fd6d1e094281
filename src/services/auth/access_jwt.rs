//! Access token (JWT) verification.
//!
//! The verifier accepts exactly one asymmetric algorithm, fixed when it is built.
//! The `alg` declared inside a token is only compared against that algorithm; it never
//! selects the key or the verification method.

use std::collections::HashSet;
use std::fmt;

use jsonwebtoken::{Algorithm, DecodingKey, Validation, errors::ErrorKind};
use serde_json::{Map, Value};

use crate::error::ConfigError;

/// Claims of a verified token, in payload order.
pub type ClaimSet = Map<String, Value>;

/// `Ok(claims)` for a valid token, `Err(reason)` otherwise.
pub type VerificationResult = Result<ClaimSet, InvalidToken>;

/// Why a credential was refused.
///
/// These are expected per-request outcomes. The filter maps every variant to the same
/// 403 response, so the distinction only shows up in logs.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidToken {
    #[error("missing or unparseable bearer credential")]
    MissingCredential,
    #[error("malformed token")]
    Malformed,
    #[error("signature mismatch")]
    SignatureMismatch,
    #[error("algorithm mismatch: expected {expected:?}, found {found:?}")]
    AlgorithmMismatch {
        expected: Algorithm,
        found: Algorithm,
    },
    /// Stricter than plain jwt-go `MapClaims`, which lets a token without `exp` through.
    #[error("missing or non-numeric 'exp' claim")]
    MissingExpiration,
    #[error("token expired")]
    Expired,
}

/// Public-key JWT verifier.
///
/// - Key material is not printable via Debug.
/// - Immutable after construction; share it behind an `Arc`.
#[derive(Clone)]
pub struct AccessVerifier {
    algorithm: Algorithm,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl fmt::Debug for AccessVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Do not print key material
        f.debug_struct("AccessVerifier")
            .field("algorithm", &self.algorithm)
            .finish()
    }
}

impl AccessVerifier {
    /// Parse `public_key_pem` for `algorithm`.
    ///
    /// Fails on empty key material, a key that does not parse for the algorithm's family,
    /// or a symmetric (`HS*`) algorithm.
    pub fn new(public_key_pem: &[u8], algorithm: Algorithm) -> Result<Self, ConfigError> {
        if public_key_pem.is_empty() {
            return Err(ConfigError::MissingPublicKey);
        }

        let decoding_key = decoding_key(public_key_pem, algorithm)?;

        let mut validation = Validation::new(algorithm);
        // `exp` is checked in `verify_at` against the caller's clock, with no leeway.
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.validate_aud = false;
        validation.required_spec_claims = HashSet::new();

        Ok(Self {
            algorithm,
            decoding_key,
            validation,
        })
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    /// Verify `token` against the wall clock.
    pub fn verify(&self, token: &str) -> VerificationResult {
        self.verify_at(token, chrono::Utc::now().timestamp())
    }

    /// Verify `token` as of `now` (Unix seconds, UTC).
    ///
    /// Order: structure, algorithm, signature, payload, then expiration. A token whose
    /// `exp` is at or before `now` is `Expired` even when its signature is good.
    pub fn verify_at(&self, token: &str, now: i64) -> VerificationResult {
        let header = jsonwebtoken::decode_header(token).map_err(|_| InvalidToken::Malformed)?;

        if header.alg != self.algorithm {
            return Err(InvalidToken::AlgorithmMismatch {
                expected: self.algorithm,
                found: header.alg,
            });
        }

        let data = jsonwebtoken::decode::<ClaimSet>(token, &self.decoding_key, &self.validation)
            .map_err(|e| self.classify(&e, header.alg))?;
        let claims = data.claims;

        let exp = claims
            .get("exp")
            .and_then(Value::as_f64)
            .ok_or(InvalidToken::MissingExpiration)?;

        if exp <= now as f64 {
            return Err(InvalidToken::Expired);
        }

        Ok(claims)
    }

    fn classify(&self, err: &jsonwebtoken::errors::Error, found: Algorithm) -> InvalidToken {
        match err.kind() {
            ErrorKind::InvalidSignature => InvalidToken::SignatureMismatch,
            ErrorKind::InvalidAlgorithm => InvalidToken::AlgorithmMismatch {
                expected: self.algorithm,
                found,
            },
            ErrorKind::ExpiredSignature => InvalidToken::Expired,
            _ => InvalidToken::Malformed,
        }
    }
}

fn decoding_key(pem: &[u8], algorithm: Algorithm) -> Result<DecodingKey, ConfigError> {
    let key = match algorithm {
        Algorithm::RS256
        | Algorithm::RS384
        | Algorithm::RS512
        | Algorithm::PS256
        | Algorithm::PS384
        | Algorithm::PS512 => DecodingKey::from_rsa_pem(pem),
        Algorithm::ES256 | Algorithm::ES384 => DecodingKey::from_ec_pem(pem),
        Algorithm::EdDSA => DecodingKey::from_ed_pem(pem),
        // HS*: a shared secret is never accepted as verification key
        _ => return Err(ConfigError::UnsupportedAlgorithm(algorithm)),
    };

    key.map_err(ConfigError::InvalidPublicKey)
}
