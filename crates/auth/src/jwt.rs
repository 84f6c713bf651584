//! Bearer token verification.

use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};

use crate::claims::{JwtClaims, TokenValidationError, validate_claims};

/// Verifies a raw bearer token and returns its claims.
pub trait JwtValidator: Send + Sync {
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<JwtClaims, TokenValidationError>;
}

/// HS256 shared-secret validator.
///
/// Time-window checks use the RFC3339 `issued_at`/`expires_at` claims through
/// [`validate_claims`], so the registered numeric `exp` claim is not required.
pub struct Hs256JwtValidator {
    key: DecodingKey,
    validation: Validation,
}

impl Hs256JwtValidator {
    pub fn new(secret: Vec<u8>) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.required_spec_claims.clear();
        validation.validate_exp = false;
        Self {
            key: DecodingKey::from_secret(&secret),
            validation,
        }
    }
}

impl JwtValidator for Hs256JwtValidator {
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<JwtClaims, TokenValidationError> {
        let data = decode::<JwtClaims>(token, &self.key, &self.validation)
            .map_err(|e| TokenValidationError::Malformed(e.to_string()))?;
        validate_claims(&data.claims, now)?;
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Role;
    use chrono::Duration;
    use estore_core::UserId;
    use jsonwebtoken::{EncodingKey, Header, encode};

    fn mint(secret: &str, claims: &JwtClaims) -> String {
        encode(
            &Header::new(Algorithm::HS256),
            claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    fn fresh_claims() -> JwtClaims {
        let now = Utc::now();
        JwtClaims {
            sub: UserId::new(),
            email: "ops@example.com".to_string(),
            role: Role::Admin,
            issued_at: now - Duration::seconds(5),
            expires_at: now + Duration::minutes(5),
        }
    }

    #[test]
    fn validates_token_signed_with_same_secret() {
        let claims = fresh_claims();
        let token = mint("s3cret", &claims);
        let v = Hs256JwtValidator::new(b"s3cret".to_vec());
        assert_eq!(v.validate(&token, Utc::now()).unwrap(), claims);
    }

    #[test]
    fn rejects_token_signed_with_other_secret() {
        let token = mint("other", &fresh_claims());
        let v = Hs256JwtValidator::new(b"s3cret".to_vec());
        assert!(matches!(
            v.validate(&token, Utc::now()),
            Err(TokenValidationError::Malformed(_))
        ));
    }
}
