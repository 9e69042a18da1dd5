//! Bearer token validation.
//!
//! The validator checks the signature with a configured symmetric key,
//! requires an unexpired `exp` claim and a subject (`user_id` or `sub`), and
//! normalizes `roles` into a list. Every failure collapses into the one
//! opaque [`AuthError`]: callers never learn why a token was rejected.

use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Deserializer};
use thiserror::Error;

/// The single rejection surfaced for any bad token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("invalid or expired token")]
pub struct AuthError;

/// Validated claim set handed to the rest of the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Claims {
    pub subject: String,
    pub tenant: Option<String>,
    pub roles: Vec<String>,
    /// Unix timestamp of the `exp` claim.
    pub expires_at: i64,
}

#[derive(Debug, Deserialize)]
struct RawClaims {
    user_id: Option<String>,
    sub: Option<String>,
    tenant_id: Option<String>,
    #[serde(default, deserialize_with = "one_or_many")]
    roles: Vec<String>,
    exp: i64,
}

/// A single role arrives as a bare string; promote it to a one-element list.
fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match Option::<OneOrMany>::deserialize(deserializer)? {
        None => Vec::new(),
        Some(OneOrMany::One(role)) => vec![role],
        Some(OneOrMany::Many(roles)) => roles,
    })
}

/// Verifies compact signed tokens against a symmetric key.
pub struct TokenValidator {
    key: DecodingKey,
    validation: Validation,
}

impl TokenValidator {
    pub fn new(secret: &str, algorithm: Algorithm) -> Self {
        let mut validation = Validation::new(algorithm);
        validation.set_required_spec_claims(&["exp"]);
        validation.leeway = 0;
        Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    /// Validates a token and extracts its claims.
    pub fn validate(&self, token: &str) -> Result<Claims, AuthError> {
        let data = decode::<RawClaims>(token, &self.key, &self.validation).map_err(|_| AuthError)?;
        let raw = data.claims;

        let subject = raw
            .user_id
            .or(raw.sub)
            .filter(|s| !s.is_empty())
            .ok_or(AuthError)?;

        Ok(Claims {
            subject,
            tenant: raw.tenant_id,
            roles: raw.roles,
            expires_at: raw.exp,
        })
    }
}
