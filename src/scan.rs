//! Per-visit scan tokens.
//!
//! A scan token correlates one visitor's journey across page transitions and
//! analytics events. There is no server-side session: the token is minted when
//! a request arrives without one and is otherwise passed along verbatim.

use rand::distributions::Alphanumeric;
use rand::Rng;
use url::Url;

const SCAN_TOKEN_LEN: usize = 21;

/// Mint a fresh random token.
pub fn mint() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(SCAN_TOKEN_LEN)
        .map(char::from)
        .collect()
}

/// Reuse the caller's token verbatim; mint one only when it is absent or empty.
pub fn resolve(supplied: Option<&str>) -> String {
    match supplied {
        Some(token) if !token.is_empty() => token.to_string(),
        _ => mint(),
    }
}

/// Landing page link encoded into in-store QR codes: `<base>/?c=<campaign>&u=<scan>`.
pub fn landing_url(base: &str, campaign_id: &str, scan: &str) -> Result<String, url::ParseError> {
    let mut url = Url::parse(base)?.join("/")?;
    url.query_pairs_mut()
        .append_pair("c", campaign_id)
        .append_pair("u", scan);
    Ok(url.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minted_tokens_are_url_safe_and_unique() {
        let a = mint();
        let b = mint();
        assert_eq!(a.len(), SCAN_TOKEN_LEN);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(a, b);
    }

    #[test]
    fn resolve_propagates_supplied_token() {
        assert_eq!(resolve(Some("scan-demo")), "scan-demo");
        assert_eq!(resolve(Some("  spaced ")), "  spaced ");
    }

    #[test]
    fn resolve_keeps_long_tokens_intact() {
        let long = "a".repeat(200);
        assert_eq!(resolve(Some(&long)), long);
    }

    #[test]
    fn resolve_mints_when_missing_or_empty() {
        assert_eq!(resolve(None).len(), SCAN_TOKEN_LEN);
        assert_eq!(resolve(Some("")).len(), SCAN_TOKEN_LEN);
    }

    #[test]
    fn landing_url_encodes_parameters() {
        let url = landing_url("http://192.168.1.20:4000", "spring sale", "abc&d").unwrap();
        assert_eq!(url, "http://192.168.1.20:4000/?c=spring+sale&u=abc%26d");
    }
}
