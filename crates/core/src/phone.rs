//! Phone number normalization for inbound SMS matching.
//!
//! Carriers and users write the same number many ways: `+17704018565`,
//! `17704018565`, `(770) 401-8565`. We canonicalize to the bare
//! ten-digit national form before comparing, so a reply from any of
//! those spellings matches a user stored under any other.

/// Canonicalize a phone number to its ten-digit national form.
///
/// Strips every non-digit character, then drops a leading country code
/// `1` from eleven-digit numbers. Returns `None` when the remainder is
/// not exactly ten digits; such numbers cannot be matched safely.
pub fn normalize_phone(raw: &str) -> Option<String> {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    match digits.len() {
        10 => Some(digits),
        11 if digits.starts_with('1') => Some(digits[1..].to_string()),
        _ => None,
    }
}

/// Format a canonical ten-digit number as E.164 for outbound dispatch.
///
/// Accepts anything [`normalize_phone`] accepts and fails on the same
/// inputs it fails on.
pub fn to_e164(raw: &str) -> Option<String> {
    normalize_phone(raw).map(|digits| format!("+1{digits}"))
}
