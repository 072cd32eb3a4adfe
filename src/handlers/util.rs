//! Shared helpers for request handlers.

use axum::http::HeaderMap;

/// Header naming the acting user on provisioning requests.
pub(crate) const REQUESTED_BY_HEADER: &str = "x-requested-by";

/// Actor recorded when `X-Requested-By` is absent or blank.
pub(crate) const DEFAULT_ACTOR: &str = "admin";

/// Resolve the acting user from the `X-Requested-By` header.
pub(crate) fn requested_by(headers: &HeaderMap) -> String {
    headers
        .get(REQUESTED_BY_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .unwrap_or(DEFAULT_ACTOR)
        .to_string()
}

/// Trim an optional request field down to its non-blank content.
pub(crate) fn trimmed(value: &Option<String>) -> Option<&str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    #[test]
    fn test_requested_by_reads_header() {
        let mut headers = HeaderMap::new();
        headers.insert(REQUESTED_BY_HEADER, HeaderValue::from_static("ops-user"));

        assert_eq!(requested_by(&headers), "ops-user");
    }

    #[test]
    fn test_requested_by_trims_whitespace() {
        let mut headers = HeaderMap::new();
        headers.insert(REQUESTED_BY_HEADER, HeaderValue::from_static("  ops-user  "));

        assert_eq!(requested_by(&headers), "ops-user");
    }

    #[test]
    fn test_requested_by_defaults_to_admin() {
        assert_eq!(requested_by(&HeaderMap::new()), DEFAULT_ACTOR);

        let mut headers = HeaderMap::new();
        headers.insert(REQUESTED_BY_HEADER, HeaderValue::from_static("   "));
        assert_eq!(requested_by(&headers), DEFAULT_ACTOR);
    }

    #[test]
    fn test_trimmed_strips_whitespace() {
        let value = Some("  Retail  ".to_string());
        assert_eq!(trimmed(&value), Some("Retail"));
    }

    #[test]
    fn test_trimmed_rejects_blank_and_none() {
        assert_eq!(trimmed(&Some("   ".to_string())), None);
        assert_eq!(trimmed(&Some(String::new())), None);
        assert_eq!(trimmed(&None), None);
    }
}
