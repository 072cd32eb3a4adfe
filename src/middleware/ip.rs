//! Client IP extraction for the audit trail.
//!
//! The audit recorder attributes each exchange to the first `X-Forwarded-For`
//! hop, falling back to `X-Real-IP`, falling back to [`UNKNOWN_IP`].
//!
//! Both headers are client-controlled. Deploy behind a reverse proxy that
//! overwrites them, or the recorded IP is whatever the caller claims. The
//! value is recorded for attribution only; no security decision reads it.

use std::borrow::Cow;

use axum::http::Request;

/// Fallback value when no client IP can be determined.
pub const UNKNOWN_IP: &str = "unknown";

/// Extract the client IP from request headers.
///
/// Checks in order (first non-empty match wins):
/// 1. `X-Forwarded-For`, first entry of the comma-separated list
/// 2. `X-Real-IP`
/// 3. [`UNKNOWN_IP`]
pub fn extract_client_ip<B>(req: &Request<B>) -> Cow<'static, str> {
    match ip_from_headers(req) {
        Some(ip) => Cow::Owned(ip.to_string()),
        None => Cow::Borrowed(UNKNOWN_IP),
    }
}

fn ip_from_headers<B>(req: &Request<B>) -> Option<&str> {
    // X-Forwarded-For carries "client, proxy1, proxy2"; the first hop is the client
    if let Some(forwarded) = req.headers().get("x-forwarded-for")
        && let Ok(value) = forwarded.to_str()
        && let Some(first) = value.split(',').next()
    {
        let first = first.trim();
        if !first.is_empty() {
            return Some(first);
        }
    }

    if let Some(real_ip) = req.headers().get("x-real-ip")
        && let Ok(value) = real_ip.to_str()
    {
        let value = value.trim();
        if !value.is_empty() {
            return Some(value);
        }
    }

    None
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use axum::body::Body;

    #[test]
    fn test_forwarded_for_first_hop_wins() {
        let req = Request::builder()
            .header("x-forwarded-for", "203.0.113.50, 70.41.3.18, 150.172.238.178")
            .header("x-real-ip", "10.0.0.9")
            .body(Body::empty())
            .unwrap();

        assert_eq!(extract_client_ip(&req), "203.0.113.50");
    }

    #[test]
    fn test_forwarded_for_single_value_trimmed() {
        let req = Request::builder()
            .header("x-forwarded-for", "  203.0.113.50  ")
            .body(Body::empty())
            .unwrap();

        assert_eq!(extract_client_ip(&req), "203.0.113.50");
    }

    #[test]
    fn test_real_ip_fallback() {
        let req = Request::builder()
            .header("x-real-ip", "192.168.1.7")
            .body(Body::empty())
            .unwrap();

        assert_eq!(extract_client_ip(&req), "192.168.1.7");
    }

    #[test]
    fn test_empty_forwarded_for_falls_through() {
        let req = Request::builder()
            .header("x-forwarded-for", "")
            .header("x-real-ip", "192.168.1.7")
            .body(Body::empty())
            .unwrap();

        assert_eq!(extract_client_ip(&req), "192.168.1.7");
    }

    #[test]
    fn test_unknown_without_headers() {
        let req = Request::builder().body(Body::empty()).unwrap();
        assert_eq!(extract_client_ip(&req), UNKNOWN_IP);
    }
}
