use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};

use crate::models::auth::{Claims, TokenValidation};

/// Default lifetime below which a credential should be refreshed.
pub const DEFAULT_REFRESH_BUFFER_SECONDS: i64 = 300;

/// Decodes access tokens and checks their expiry.
///
/// Every failure (bad signature, malformed token, missing or past `exp`,
/// issuer mismatch) comes back as an invalid result, never as an error.
#[derive(Clone)]
pub struct TokenValidator {
    key: DecodingKey,
    validation: Validation,
}

impl TokenValidator {
    pub fn new(secret: &str, issuer: Option<&str>) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is compared against an injectable clock in `validate_at`.
        validation.validate_exp = false;
        validation.leeway = 0;
        let mut required = vec!["exp"];
        if let Some(iss) = issuer {
            validation.set_issuer(&[iss]);
            required.push("iss");
        }
        validation.set_required_spec_claims(required.as_slice());

        Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    pub fn validate(&self, token: &str) -> TokenValidation {
        self.validate_at(token, Utc::now().timestamp())
    }

    pub fn validate_at(&self, token: &str, now: i64) -> TokenValidation {
        let claims = match decode::<Claims>(token, &self.key, &self.validation) {
            Ok(data) => data.claims,
            Err(e) => {
                tracing::debug!("token rejected: {}", e);
                return TokenValidation::invalid();
            }
        };

        if claims.exp <= now {
            tracing::debug!("token rejected: expired at {}", claims.exp);
            return TokenValidation::invalid();
        }

        TokenValidation::valid(claims.into())
    }

    /// True when the credential has less than `buffer_seconds` left, or is not
    /// valid at all. Callers use this to kick off a refresh before expiry.
    pub fn is_expiring_soon(&self, token: &str, buffer_seconds: i64) -> bool {
        self.is_expiring_soon_at(token, buffer_seconds, Utc::now().timestamp())
    }

    pub fn is_expiring_soon_at(&self, token: &str, buffer_seconds: i64, now: i64) -> bool {
        match self.validate_at(token, now).payload {
            Some(payload) => expires_within(payload.expires_at, buffer_seconds, now),
            None => true,
        }
    }
}

/// Whether an expiry instant falls inside the refresh buffer.
pub fn expires_within(expires_at: i64, buffer_seconds: i64, now: i64) -> bool {
    expires_at - now < buffer_seconds
}

/// Signs access tokens. Session creation after an OAuth callback happens in
/// the identity backend; this is the same signing it performs.
pub struct TokenIssuer {
    key: EncodingKey,
}

impl TokenIssuer {
    pub fn new(secret: &str) -> Self {
        Self {
            key: EncodingKey::from_secret(secret.as_bytes()),
        }
    }

    pub fn issue(&self, claims: &Claims) -> Result<String, jsonwebtoken::errors::Error> {
        encode(&Header::new(Algorithm::HS256), claims, &self.key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::user::Role;

    const SECRET: &str = "test-secret";
    const NOW: i64 = 1_700_000_000;

    fn claims(exp: i64) -> Claims {
        Claims {
            sub: "user-1".into(),
            email: Some("ana@example.com".into()),
            role: Some(Role::Host),
            name: Some("Ana".into()),
            sid: "sess-1".into(),
            iss: None,
            exp,
            iat: NOW - 60,
        }
    }

    fn token(exp: i64) -> String {
        TokenIssuer::new(SECRET).issue(&claims(exp)).unwrap()
    }

    #[test]
    fn test_valid_token_decodes_payload() {
        let validator = TokenValidator::new(SECRET, None);
        let result = validator.validate_at(&token(NOW + 600), NOW);

        assert!(result.valid);
        let payload = result.payload.unwrap();
        assert_eq!(payload.subject, "user-1");
        assert_eq!(payload.role, Role::Host);
        assert_eq!(payload.session_id, "sess-1");
        assert_eq!(payload.expires_at, NOW + 600);
    }

    #[test]
    fn test_expired_one_second_ago_is_invalid() {
        let validator = TokenValidator::new(SECRET, None);
        let result = validator.validate_at(&token(NOW - 1), NOW);
        assert_eq!(result, TokenValidation::invalid());
    }

    #[test]
    fn test_expiry_at_now_is_invalid() {
        let validator = TokenValidator::new(SECRET, None);
        assert!(!validator.validate_at(&token(NOW), NOW).valid);
    }

    #[test]
    fn test_wrong_secret_is_invalid() {
        let validator = TokenValidator::new("another-secret", None);
        assert!(!validator.validate_at(&token(NOW + 600), NOW).valid);
    }

    #[test]
    fn test_garbage_is_invalid() {
        let validator = TokenValidator::new(SECRET, None);
        assert!(!validator.validate_at("", NOW).valid);
        assert!(!validator.validate_at("not.a.jwt", NOW).valid);
    }

    #[test]
    fn test_missing_exp_is_invalid() {
        let body = serde_json::json!({ "sub": "user-1", "sid": "s", "iat": NOW });
        let raw = encode(
            &Header::new(Algorithm::HS256),
            &body,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap();
        let validator = TokenValidator::new(SECRET, None);
        assert!(!validator.validate_at(&raw, NOW).valid);
    }

    #[test]
    fn test_missing_role_defaults_to_user() {
        let mut c = claims(NOW + 600);
        c.role = None;
        let raw = TokenIssuer::new(SECRET).issue(&c).unwrap();
        let payload = TokenValidator::new(SECRET, None).validate_at(&raw, NOW).payload.unwrap();
        assert_eq!(payload.role, Role::User);
    }

    #[test]
    fn test_issuer_is_enforced_when_configured() {
        let validator = TokenValidator::new(SECRET, Some("portal"));
        assert!(!validator.validate_at(&token(NOW + 600), NOW).valid);

        let mut c = claims(NOW + 600);
        c.iss = Some("portal".into());
        let raw = TokenIssuer::new(SECRET).issue(&c).unwrap();
        assert!(validator.validate_at(&raw, NOW).valid);
    }

    #[test]
    fn test_expiring_soon_respects_buffer() {
        let validator = TokenValidator::new(SECRET, None);
        let t = token(NOW + 600);
        assert!(!validator.is_expiring_soon_at(&t, 300, NOW));
        assert!(validator.is_expiring_soon_at(&t, 700, NOW));
    }

    #[test]
    fn test_expiring_soon_against_wall_clock() {
        let validator = TokenValidator::new(SECRET, None);
        let fresh = token(Utc::now().timestamp() + 3600);
        assert!(!validator.is_expiring_soon(&fresh, DEFAULT_REFRESH_BUFFER_SECONDS));
        let stale = token(Utc::now().timestamp() + 60);
        assert!(validator.is_expiring_soon(&stale, DEFAULT_REFRESH_BUFFER_SECONDS));
    }

    #[test]
    fn test_invalid_token_is_expiring_soon() {
        let validator = TokenValidator::new(SECRET, None);
        assert!(validator.is_expiring_soon_at("garbage", DEFAULT_REFRESH_BUFFER_SECONDS, NOW));
    }
}
