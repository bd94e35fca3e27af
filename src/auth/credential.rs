//! Presented credential parsing

use crate::types::*;

/// Scheme marker expected in front of the API key
pub const DEFAULT_SCHEME: &str = "Bearer";

/// Extract the token from a `<scheme> <token>` credential.
///
/// The scheme is matched case-insensitively and exactly one token segment
/// must follow it.
pub fn parse_presented_credential<'a>(presented: &'a str, scheme: &str) -> LedgerResult<&'a str> {
    let trimmed = presented.trim();
    if trimmed.is_empty() {
        return Err(LedgerError::MalformedCredential(
            "credential not provided".to_string(),
        ));
    }

    let mut segments = trimmed.split_whitespace();
    match (segments.next(), segments.next(), segments.next()) {
        (Some(marker), Some(token), None) if marker.eq_ignore_ascii_case(scheme) => Ok(token),
        _ => Err(LedgerError::MalformedCredential(
            "malformed credential".to_string(),
        )),
    }
}
