use rand::RngCore;
use subtle::ConstantTimeEq;

use crate::services::cookies::{build_cookie, SameSite};

pub const CSRF_COOKIE: &str = "csrf_token";
pub const CSRF_HEADER: &str = "x-csrf-token";
pub const CSRF_FIELD: &str = "csrf_token";

/// A freshly issued token and the `Set-Cookie` value carrying its twin.
#[derive(Debug, Clone)]
pub struct IssuedCsrf {
    pub token: String,
    pub set_cookie: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum CsrfRejection {
    #[error("CSRF cookie missing")]
    MissingCookie,
    #[error("CSRF token missing")]
    MissingToken,
    #[error("CSRF token mismatch")]
    Mismatch,
}

impl CsrfRejection {
    pub fn reason(self) -> &'static str {
        match self {
            CsrfRejection::MissingCookie => "missing_cookie",
            CsrfRejection::MissingToken => "missing_token",
            CsrfRejection::Mismatch => "mismatch",
        }
    }
}

/// Double-submit CSRF protection: the token lives in a cookie and must be
/// echoed back in a header or form field. A token stays valid for as long as
/// its cookie does, across any number of requests.
#[derive(Debug, Clone)]
pub struct CsrfGuard {
    max_age: u64,
    secure: bool,
}

impl CsrfGuard {
    pub fn new(max_age: u64, secure: bool) -> Self {
        Self { max_age, secure }
    }

    pub fn issue(&self) -> IssuedCsrf {
        let mut bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);
        let token = hex::encode(bytes);
        let set_cookie = build_cookie(CSRF_COOKIE, &token, self.max_age, SameSite::Strict, self.secure);
        IssuedCsrf { token, set_cookie }
    }

    pub fn verify(&self, cookie: Option<&str>, supplied: Option<&str>) -> Result<(), CsrfRejection> {
        let cookie = cookie.filter(|c| !c.is_empty()).ok_or(CsrfRejection::MissingCookie)?;
        let supplied = supplied.filter(|s| !s.is_empty()).ok_or(CsrfRejection::MissingToken)?;

        if bool::from(cookie.as_bytes().ct_eq(supplied.as_bytes())) {
            Ok(())
        } else {
            Err(CsrfRejection::Mismatch)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issue_produces_matching_cookie() {
        let issued = CsrfGuard::new(3600, false).issue();
        assert_eq!(issued.token.len(), 64);
        assert!(issued.set_cookie.starts_with(&format!("csrf_token={};", issued.token)));
        assert!(issued.set_cookie.contains("SameSite=Strict"));
        assert!(issued.set_cookie.contains("Max-Age=3600"));
    }

    #[test]
    fn test_issued_tokens_differ() {
        let guard = CsrfGuard::new(3600, false);
        assert_ne!(guard.issue().token, guard.issue().token);
    }

    #[test]
    fn test_verify_accepts_exact_match_repeatedly() {
        let guard = CsrfGuard::new(3600, false);
        let issued = guard.issue();
        assert!(guard.verify(Some(&issued.token), Some(&issued.token)).is_ok());
        assert!(guard.verify(Some(&issued.token), Some(&issued.token)).is_ok());
    }

    #[test]
    fn test_verify_rejects_tampered_token() {
        let guard = CsrfGuard::new(3600, false);
        let issued = guard.issue();
        let mut tampered = issued.token.clone();
        tampered.replace_range(0..1, if tampered.starts_with('a') { "b" } else { "a" });

        assert_eq!(
            guard.verify(Some(&issued.token), Some(&tampered)),
            Err(CsrfRejection::Mismatch)
        );
        assert_eq!(
            guard.verify(Some(&issued.token), Some(&issued.token[..10])),
            Err(CsrfRejection::Mismatch)
        );
    }

    #[test]
    fn test_verify_rejects_missing_sides() {
        let guard = CsrfGuard::new(3600, false);
        assert_eq!(guard.verify(None, Some("abc")), Err(CsrfRejection::MissingCookie));
        assert_eq!(guard.verify(Some("abc"), None), Err(CsrfRejection::MissingToken));
        assert_eq!(guard.verify(Some(""), Some("")), Err(CsrfRejection::MissingCookie));
    }
}
