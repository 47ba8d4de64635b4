use chrono::{DateTime, Utc};
use jsonwebtoken::errors::ErrorKind as JwtErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::{rngs::OsRng, RngCore};
use serde::{Deserialize, Serialize};

use crate::auth::{AuthError, Result};
use crate::config::AuthConfig;
use crate::models::Role;

/// Bytes of entropy in a session id
const SESSION_ID_BYTES: usize = 32;

/// Claim set carried by every bearer token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// account id
    pub sub: String,
    pub role: Role,
    pub iat: i64,
    pub nbf: i64,
    pub iss: String,
    pub exp: i64,
}

/// Freshly signed token plus the instant it stops being accepted
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Signs and verifies HS256 bearer tokens.
///
/// The secret is injected at construction; the issuer holds no other state
/// and is cheap to clone into every worker.
#[derive(Clone)]
pub struct TokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    issuer: String,
    ttl: chrono::Duration,
    validation: Validation,
}

impl TokenIssuer {
    pub fn new(secret: &[u8], issuer: impl Into<String>, ttl: chrono::Duration) -> Self {
        let issuer = issuer.into();

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.validate_exp = true;
        validation.validate_nbf = true;
        validation.set_issuer(&[issuer.as_str()]);
        validation.set_required_spec_claims(&["exp", "sub", "iss"]);

        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            issuer,
            ttl,
            validation,
        }
    }

    pub fn from_config(config: &AuthConfig) -> Self {
        Self::new(config.jwt_secret.as_bytes(), config.jwt_issuer.clone(), config.token_ttl())
    }

    /// Sign a token for `account_id` valid from `now` for the configured ttl
    pub fn issue(&self, account_id: &str, role: Role, now: DateTime<Utc>) -> Result<IssuedToken> {
        let expires_at = now + self.ttl;
        let claims = Claims {
            sub: account_id.to_string(),
            role,
            iat: now.timestamp(),
            nbf: now.timestamp(),
            iss: self.issuer.clone(),
            exp: expires_at.timestamp(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AuthError::Internal(format!("JWT encoding error: {}", e)))?;

        Ok(IssuedToken { token, expires_at })
    }

    /// Check signature, algorithm, issuer and time bounds
    pub fn verify(&self, token: &str) -> Result<Claims> {
        self.verify_at(token, Utc::now())
    }

    /// Like `verify`, with `now` as the reference instant for expiry.
    /// A token is accepted only while `exp > now`.
    pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<Claims> {
        let claims = decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                JwtErrorKind::ExpiredSignature => AuthError::TokenExpired,
                JwtErrorKind::InvalidSignature | JwtErrorKind::InvalidAlgorithm => {
                    AuthError::TokenSignatureInvalid
                }
                _ => AuthError::TokenMalformed,
            })?;

        // jsonwebtoken only rejects once exp < now
        if claims.exp <= now.timestamp() {
            return Err(AuthError::TokenExpired);
        }
        Ok(claims)
    }
}

/// Random, unguessable session id (256 bits, hex encoded)
pub fn generate_session_id() -> String {
    let mut buffer = [0u8; SESSION_ID_BYTES];
    OsRng.fill_bytes(&mut buffer);
    hex::encode(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"0123456789abcdef0123456789abcdef";

    fn issuer() -> TokenIssuer {
        TokenIssuer::new(SECRET, "auth-service", chrono::Duration::hours(24))
    }

    #[test]
    fn issued_token_verifies_with_claims() {
        let now = Utc::now();
        let issued = issuer().issue("customer_abc", Role::Customer, now).unwrap();
        let claims = issuer().verify(&issued.token).unwrap();

        assert_eq!(claims.sub, "customer_abc");
        assert_eq!(claims.role, Role::Customer);
        assert_eq!(claims.iss, "auth-service");
        assert_eq!(claims.exp, (now + chrono::Duration::hours(24)).timestamp());
        assert_eq!(claims.exp, issued.expires_at.timestamp());
    }

    #[test]
    fn expired_token_is_rejected() {
        let issued = issuer()
            .issue("customer_abc", Role::Customer, Utc::now() - chrono::Duration::hours(25))
            .unwrap();
        assert!(matches!(issuer().verify(&issued.token), Err(AuthError::TokenExpired)));
    }

    #[test]
    fn token_is_expired_at_its_exact_expiry_instant() {
        let issued = issuer()
            .issue("customer_abc", Role::Customer, Utc::now())
            .unwrap();
        let expiry = issued.expires_at;

        assert!(issuer()
            .verify_at(&issued.token, expiry - chrono::Duration::seconds(1))
            .is_ok());
        assert!(matches!(
            issuer().verify_at(&issued.token, expiry),
            Err(AuthError::TokenExpired)
        ));
    }

    #[test]
    fn token_expiring_now_is_rejected() {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: "customer_abc".into(),
            role: Role::Customer,
            iat: now - 60,
            nbf: now - 60,
            iss: "auth-service".into(),
            exp: now,
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(SECRET),
        )
        .unwrap();
        assert!(matches!(issuer().verify(&token), Err(AuthError::TokenExpired)));
    }

    #[test]
    fn foreign_key_is_rejected() {
        let other = TokenIssuer::new(b"ffffffffffffffffffffffffffffffff", "auth-service", chrono::Duration::hours(1));
        let issued = other.issue("admin_x", Role::Admin, Utc::now()).unwrap();
        assert!(matches!(
            issuer().verify(&issued.token),
            Err(AuthError::TokenSignatureInvalid)
        ));
    }

    #[test]
    fn mismatched_algorithm_is_rejected() {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: "admin_x".into(),
            role: Role::Admin,
            iat: now,
            nbf: now,
            iss: "auth-service".into(),
            exp: now + 3600,
        };
        let token = encode(
            &Header::new(Algorithm::HS512),
            &claims,
            &EncodingKey::from_secret(SECRET),
        )
        .unwrap();
        assert!(matches!(
            issuer().verify(&token),
            Err(AuthError::TokenSignatureInvalid)
        ));
    }

    #[test]
    fn unsigned_token_is_rejected() {
        // header {"alg":"none","typ":"JWT"}, admin claims expiring in 2100
        let token = concat!(
            "eyJhbGciOiJub25lIiwidHlwIjoiSldUIn0.",
            "eyJzdWIiOiJhZG1pbl94Iiwicm9sZSI6ImFkbWluIiwiaWF0IjoxNzAwMDAwMDAwLCJuYmYiOjE3MDAwMDAwMDAsImlzcyI6ImF1dGgtc2VydmljZSIsImV4cCI6NDEwMjQ0NDgwMH0."
        );
        let err = issuer().verify(token).unwrap_err();
        assert_eq!(err.kind(), crate::auth::ErrorKind::Session);
    }

    #[test]
    fn wrong_issuer_is_rejected() {
        let other = TokenIssuer::new(SECRET, "someone-else", chrono::Duration::hours(1));
        let issued = other.issue("customer_abc", Role::Customer, Utc::now()).unwrap();
        assert!(issuer().verify(&issued.token).is_err());
    }

    #[test]
    fn garbage_is_malformed() {
        assert!(matches!(issuer().verify("not.a.jwt"), Err(AuthError::TokenMalformed)));
        assert!(matches!(issuer().verify(""), Err(AuthError::TokenMalformed)));
    }

    #[test]
    fn session_ids_are_long_and_unique() {
        let a = generate_session_id();
        let b = generate_session_id();
        assert_eq!(a.len(), SESSION_ID_BYTES * 2);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }
}
