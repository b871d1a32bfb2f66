use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use std::{error::Error as StdError, fmt};

use crate::services::auth::claims::Claims;

// Errors returned by gateway token verification.
#[derive(Debug)]
pub enum VerifyError {
    Jwt(jsonwebtoken::errors::Error),
    Claims(serde_json::Error),
}

impl fmt::Display for VerifyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Jwt(e) => write!(f, "jwt verification failed: {}", e),
            Self::Claims(e) => write!(f, "unexpected claim shape: {}", e),
        }
    }
}

impl StdError for VerifyError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Self::Jwt(e) => Some(e),
            Self::Claims(e) => Some(e),
        }
    }
}

impl From<jsonwebtoken::errors::Error> for VerifyError {
    fn from(e: jsonwebtoken::errors::Error) -> Self {
        Self::Jwt(e)
    }
}

/// Decodes and validates a token string into claims.
///
/// - `Ok(Some(claims))`: valid
/// - `Ok(None)`: signature is valid but the payload carries nothing
/// - `Err(_)`: malformed, expired, bad signature, ...
///
/// Callers treat `Ok(None)` and `Err(_)` the same way.
pub trait TokenVerifier: Send + Sync {
    fn verify(&self, token: &str) -> Result<Option<Claims>, VerifyError>;
}

/// Key material for `JwtVerifier`.
#[derive(Clone)]
pub enum VerificationKey {
    /// HS512 shared secret (same secret the login service signs with)
    Secret(String),
    /// Ed25519 public key, PKCS#8 / SPKI PEM
    Ed25519Pem(String),
}

impl fmt::Debug for VerificationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Do not print key material
        match self {
            Self::Secret(_) => f.write_str("Secret(..)"),
            Self::Ed25519Pem(_) => f.write_str("Ed25519Pem(..)"),
        }
    }
}

/// JWT verifier backed by `jsonwebtoken`.
///
/// `exp`/`nbf` are checked when present but not required: session tokens issued by
/// the login service usually carry no `exp`, the session store decides liveness.
#[derive(Clone)]
pub struct JwtVerifier {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl std::fmt::Debug for JwtVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Do not print key material
        f.debug_struct("JwtVerifier")
            .field("validation", &self.validation)
            .finish()
    }
}

impl JwtVerifier {
    pub fn new(
        key: &VerificationKey,
        issuer: Option<&str>,
        audience: Option<&str>,
        leeway_seconds: u64,
    ) -> Result<Self, String> {
        let (decoding_key, algorithm) = match key {
            VerificationKey::Secret(secret) => {
                (DecodingKey::from_secret(secret.as_bytes()), Algorithm::HS512)
            }
            VerificationKey::Ed25519Pem(pem) => (
                DecodingKey::from_ed_pem(pem.as_bytes())
                    .map_err(|e| format!("invalid ed25519 public key pem: {}", e))?,
                Algorithm::EdDSA,
            ),
        };

        let mut validation = Validation::new(algorithm);
        validation.required_spec_claims.clear();
        validation.leeway = leeway_seconds;
        validation.validate_nbf = true;

        if let Some(issuer) = issuer {
            validation.set_issuer(&[issuer]);
        }
        match audience {
            Some(audience) => validation.set_audience(&[audience]),
            None => validation.validate_aud = false,
        }

        Ok(Self {
            decoding_key,
            validation,
        })
    }
}

impl TokenVerifier for JwtVerifier {
    fn verify(&self, token: &str) -> Result<Option<Claims>, VerifyError> {
        let data = jsonwebtoken::decode::<serde_json::Value>(
            token,
            &self.decoding_key,
            &self.validation,
        )?;

        let is_empty = match &data.claims {
            serde_json::Value::Null => true,
            serde_json::Value::Object(map) => map.is_empty(),
            _ => false,
        };
        if is_empty {
            return Ok(None);
        }

        let claims = serde_json::from_value::<Claims>(data.claims).map_err(VerifyError::Claims)?;
        Ok(Some(claims))
    }
}
