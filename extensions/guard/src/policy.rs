use crate::signature::SignatureValidator;
use callflow_core::EngineError;
use callflow_core::config::{EngineConfig, SignaturePolicy};

/// Outcome of a request that the guard let through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// The signature matched.
    Verified,
    /// The signature did not match (or was absent) and the policy is `LogOnly`.
    Unverified,
    /// No auth token is configured; nothing could be checked.
    Unchecked,
}

/// Applies the signature policy to incoming webhooks.
#[derive(Debug, Clone)]
pub struct SignatureGuard {
    validator: Option<SignatureValidator>,
    policy: SignaturePolicy,
}

impl SignatureGuard {
    pub fn new(policy: SignaturePolicy, auth_token: Option<&str>) -> Self {
        let validator = auth_token
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .map(SignatureValidator::new);
        Self { validator, policy }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(
            config.signature_policy(),
            config.carrier.auth_token.as_deref(),
        )
    }

    pub fn policy(&self) -> SignaturePolicy {
        self.policy
    }

    /// Decide whether the webhook may be processed.
    ///
    /// Under `Enforce` an invalid signature (or a missing auth token) is an
    /// [`EngineError::AuthenticationFailure`]; under `LogOnly` it is logged
    /// and admitted.
    pub fn admit(
        &self,
        signature: Option<&str>,
        url: &str,
        params: &[(String, String)],
    ) -> Result<Verdict, EngineError> {
        let Some(validator) = &self.validator else {
            return match self.policy {
                SignaturePolicy::Enforce => {
                    tracing::error!(url, "no auth token configured; rejecting webhook");
                    Err(EngineError::AuthenticationFailure)
                }
                SignaturePolicy::LogOnly => Ok(Verdict::Unchecked),
            };
        };

        if validator.validate(signature, url, params) {
            return Ok(Verdict::Verified);
        }

        match self.policy {
            SignaturePolicy::Enforce => {
                tracing::warn!(url, has_signature = signature.is_some(), "webhook signature rejected");
                Err(EngineError::AuthenticationFailure)
            }
            SignaturePolicy::LogOnly => {
                tracing::warn!(
                    url,
                    has_signature = signature.is_some(),
                    "webhook signature invalid; serving anyway (log_only)"
                );
                Ok(Verdict::Unverified)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const URL: &str = "https://ivr.example.com/voice";

    fn params() -> Vec<(String, String)> {
        vec![("CallSid".to_string(), "CA1".to_string())]
    }

    fn signed() -> String {
        SignatureValidator::new("token").expected_signature(URL, &params())
    }

    #[test]
    fn test_enforce() {
        let guard = SignatureGuard::new(SignaturePolicy::Enforce, Some("token"));

        assert_eq!(
            guard.admit(Some(&signed()), URL, &params()).unwrap(),
            Verdict::Verified
        );
        assert!(matches!(
            guard.admit(Some("bogus"), URL, &params()),
            Err(EngineError::AuthenticationFailure)
        ));
        assert!(matches!(
            guard.admit(None, URL, &params()),
            Err(EngineError::AuthenticationFailure)
        ));
    }

    #[test]
    fn test_log_only_admits_bad_signatures() {
        let guard = SignatureGuard::new(SignaturePolicy::LogOnly, Some("token"));

        assert_eq!(
            guard.admit(Some("bogus"), URL, &params()).unwrap(),
            Verdict::Unverified
        );
        assert_eq!(
            guard.admit(Some(&signed()), URL, &params()).unwrap(),
            Verdict::Verified
        );
    }

    #[test]
    fn test_missing_token() {
        let log_only = SignatureGuard::new(SignaturePolicy::LogOnly, None);
        assert_eq!(
            log_only.admit(None, URL, &params()).unwrap(),
            Verdict::Unchecked
        );

        let enforce = SignatureGuard::new(SignaturePolicy::Enforce, Some("   "));
        assert!(enforce.admit(Some(&signed()), URL, &params()).is_err());
    }

    #[test]
    fn test_from_config_follows_mode() {
        let config = EngineConfig::from_toml(
            r#"
            mode = "prod"
            [carrier]
            auth_token = "token"
            "#,
        )
        .unwrap();
        let guard = SignatureGuard::from_config(&config);

        assert_eq!(guard.policy(), SignaturePolicy::Enforce);
        assert!(guard.admit(Some(&signed()), URL, &params()).is_ok());
    }
}
