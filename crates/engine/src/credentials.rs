//! Credential primitives: password hashing and access tokens.
//!
//! Passwords are hashed with argon2 (PHC string format). Access tokens are
//! HS256 JWTs whose `sub` claim is the user id.

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, ResultEngine};

/// Minimum accepted length of the token signing secret, in bytes.
pub const MIN_SECRET_LEN: usize = 32;

/// Default access token lifetime.
pub const DEFAULT_TOKEN_TTL_MINUTES: i64 = 30;

/// Hashes `password` with a fresh random salt.
pub fn hash_password(password: &str) -> ResultEngine<String> {
    if password.is_empty() {
        return Err(EngineError::InvalidInput(
            "password must not be empty".to_string(),
        ));
    }
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| EngineError::InvalidInput(format!("failed to hash password: {err}")))
}

/// Returns `true` if `password` matches the stored `hash`.
///
/// A malformed hash never verifies.
pub fn verify_password(password: &str, hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    iat: i64,
    exp: i64,
}

/// Issues and validates signed access tokens.
#[derive(Clone)]
pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl TokenIssuer {
    /// Builds an issuer from a shared secret.
    ///
    /// The secret must be at least [`MIN_SECRET_LEN`] bytes long and the
    /// lifetime must be positive.
    pub fn new(secret: &str, ttl: Duration) -> ResultEngine<Self> {
        if secret.len() < MIN_SECRET_LEN {
            return Err(EngineError::InvalidInput(format!(
                "token secret must be at least {MIN_SECRET_LEN} characters long"
            )));
        }
        if ttl <= Duration::zero() {
            return Err(EngineError::InvalidInput(
                "token lifetime must be positive".to_string(),
            ));
        }
        Ok(Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
        })
    }

    /// Creates a token for `user_id` expiring after the configured lifetime.
    pub fn create_token(&self, user_id: Uuid) -> ResultEngine<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id.to_string(),
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };
        encode(&Header::default(), &claims, &self.encoding)
            .map_err(|err| EngineError::Unauthorized(format!("failed to sign token: {err}")))
    }

    /// Validates signature and expiry and returns the embedded user id.
    pub fn decode_token(&self, token: &str) -> ResultEngine<Uuid> {
        let data = decode::<Claims>(token, &self.decoding, &Validation::default())
            .map_err(|_| EngineError::Unauthorized("invalid token".to_string()))?;
        Uuid::parse_str(&data.claims.sub)
            .map_err(|_| EngineError::Unauthorized("invalid token".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret-key-for-testing-at-least-32-characters";

    #[test]
    fn password_roundtrip() {
        let hash = hash_password("testpassword123").unwrap();
        assert_ne!(hash, "testpassword123");
        assert!(verify_password("testpassword123", &hash));
        assert!(!verify_password("wrongpassword", &hash));
        assert!(!verify_password("testpassword123", "not-a-hash"));
    }

    #[test]
    fn token_carries_user_id() {
        let issuer = TokenIssuer::new(SECRET, Duration::minutes(30)).unwrap();
        let user_id = Uuid::new_v4();
        let token = issuer.create_token(user_id).unwrap();
        assert_eq!(issuer.decode_token(&token).unwrap(), user_id);
    }

    #[test]
    fn token_from_other_secret_is_rejected() {
        let issuer = TokenIssuer::new(SECRET, Duration::minutes(30)).unwrap();
        let other = TokenIssuer::new(&"x".repeat(MIN_SECRET_LEN), Duration::minutes(30)).unwrap();
        let token = other.create_token(Uuid::new_v4()).unwrap();
        assert!(matches!(
            issuer.decode_token(&token),
            Err(EngineError::Unauthorized(_))
        ));
        assert!(issuer.decode_token("invalid_token").is_err());
    }

    #[test]
    fn short_secret_is_rejected() {
        assert!(TokenIssuer::new("short", Duration::minutes(30)).is_err());
    }
}
