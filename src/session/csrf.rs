use subtle::ConstantTimeEq;

use super::policy::AccessError;
use super::token::generate_token;

/// Issues per-session anti-forgery tokens and checks submitted ones.
#[derive(Debug, Clone, Copy, Default)]
pub struct CsrfGuard;

impl CsrfGuard {
    pub fn issue(&self) -> anyhow::Result<String> {
        generate_token()
    }

    /// Constant-time comparison of the submitted token with the session's.
    pub fn verify(&self, expected: &str, submitted: Option<&str>) -> Result<(), AccessError> {
        let Some(submitted) = submitted.filter(|s| !s.is_empty()) else {
            return Err(AccessError::CsrfInvalid);
        };
        let expected = expected.as_bytes();
        let submitted = submitted.as_bytes();
        if expected.is_empty()
            || expected.len() != submitted.len()
            || expected.ct_eq(submitted).unwrap_u8() != 1
        {
            return Err(AccessError::CsrfInvalid);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_only_the_exact_token() {
        let guard = CsrfGuard;
        let token = guard.issue().unwrap();
        assert!(guard.verify(&token, Some(&token)).is_ok());
        // Repeated submissions within the session stay valid.
        assert!(guard.verify(&token, Some(&token)).is_ok());

        let mut tampered = token.clone();
        tampered.pop();
        tampered.push('#');
        assert_eq!(guard.verify(&token, Some(&tampered)), Err(AccessError::CsrfInvalid));
        assert_eq!(guard.verify(&token, Some("wrongToken")), Err(AccessError::CsrfInvalid));
    }

    #[test]
    fn missing_or_empty_tokens_are_rejected() {
        let guard = CsrfGuard;
        let token = guard.issue().unwrap();
        assert_eq!(guard.verify(&token, None), Err(AccessError::CsrfInvalid));
        assert_eq!(guard.verify(&token, Some("")), Err(AccessError::CsrfInvalid));
        assert_eq!(guard.verify("", Some("")), Err(AccessError::CsrfInvalid));
    }
}
