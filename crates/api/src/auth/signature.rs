//! Twilio webhook signature validation.
//!
//! Twilio signs each webhook request with HMAC-SHA1 over the full
//! request URL followed by every POST parameter, sorted alphabetically
//! by name, with name and value concatenated. The base64-encoded digest
//! arrives in the `X-Twilio-Signature` header.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use hmac::{Hmac, Mac};
use sha1::Sha1;

type HmacSha1 = Hmac<Sha1>;

/// Compute the expected signature for a request.
pub fn expected_signature(auth_token: &str, url: &str, params: &[(String, String)]) -> String {
    let mut sorted: Vec<(&str, &str)> = params
        .iter()
        .map(|(name, value)| (name.as_str(), value.as_str()))
        .collect();
    sorted.sort();

    let mut payload = url.to_string();
    for (name, value) in sorted {
        payload.push_str(name);
        payload.push_str(value);
    }

    // HMAC accepts keys of any length, so this cannot fail.
    let mut mac = HmacSha1::new_from_slice(auth_token.as_bytes()).expect("HMAC key");
    mac.update(payload.as_bytes());
    BASE64.encode(mac.finalize().into_bytes())
}

/// Whether `provided` matches the expected signature for this request.
pub fn validate_signature(
    auth_token: &str,
    url: &str,
    params: &[(String, String)],
    provided: &str,
) -> bool {
    expected_signature(auth_token, url, params) == provided
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
