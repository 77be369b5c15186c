use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use hmac::{Hmac, Mac};
use sha1::Sha1;
use subtle::ConstantTimeEq;

type HmacSha1 = Hmac<Sha1>;

/// Header carrying the carrier's request signature.
pub const SIGNATURE_HEADER: &str = "X-Twilio-Signature";

/// Verifies carrier webhook signatures.
///
/// The signed payload is the full request URL (scheme, host, path and query)
/// followed by every POST parameter, sorted by name, as `name` + `value` with
/// no separators. The signature is the base64 HMAC-SHA1 of that payload keyed
/// by the auth token.
#[derive(Clone)]
pub struct SignatureValidator {
    auth_token: String,
}

impl std::fmt::Debug for SignatureValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignatureValidator")
            .field("auth_token", &"<redacted>")
            .finish()
    }
}

impl SignatureValidator {
    pub fn new(auth_token: impl Into<String>) -> Self {
        Self {
            auth_token: auth_token.into(),
        }
    }

    /// The signature the carrier should have sent for this request.
    pub fn expected_signature(&self, url: &str, params: &[(String, String)]) -> String {
        let mut sorted: Vec<&(String, String)> = params.iter().collect();
        sorted.sort();

        let mut payload = String::from(url);
        for (name, value) in sorted {
            payload.push_str(name);
            payload.push_str(value);
        }

        // HMAC accepts keys of any length; the error arm is unreachable.
        let Ok(mut mac) = HmacSha1::new_from_slice(self.auth_token.as_bytes()) else {
            return String::new();
        };
        mac.update(payload.as_bytes());
        STANDARD.encode(mac.finalize().into_bytes())
    }

    /// Constant-time comparison against the presented signature. A missing
    /// or empty signature never validates.
    pub fn validate(&self, signature: Option<&str>, url: &str, params: &[(String, String)]) -> bool {
        let Some(presented) = signature.map(str::trim).filter(|s| !s.is_empty()) else {
            return false;
        };
        let expected = self.expected_signature(url, params);
        if expected.is_empty() {
            return false;
        }
        expected.as_bytes().ct_eq(presented.as_bytes()).into()
    }
}
