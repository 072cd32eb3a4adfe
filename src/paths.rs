//! Route classification for the request pipeline.
//!
//! The route table is fixed and hand-enumerated; there is no dynamic
//! registration. Guards and the audit recorder consult these predicates, so
//! the mapping from path to treatment lives in exactly one place.

/// Prefix shared by all audited business routes.
pub const API_PREFIX: &str = "/api/v1";

/// Token issuance (public, audited).
pub const GENERATE_TOKEN: &str = "/api/v1/generate-token";

/// Vendor webhook callback (public, audited).
pub const WEBHOOK: &str = "/api/v1/webhook";

/// Account provisioning (admin key, audited).
pub const CREATE_ACCOUNT: &str = "/api/v1/create-account";

/// Account update/rotation; the account id follows the prefix (admin key, audited).
pub const UPDATE_ACCOUNT_PREFIX: &str = "/api/v1/update-account";

/// Face-match submission (caller key + token, audited).
pub const FACE_MATCH: &str = "/api/v1/face-match";

/// Whether requests to this path are recorded in the audit trail.
///
/// Health and readiness probes stay out of the trail by design of the route
/// table, not by configuration.
pub fn is_audited(path: &str) -> bool {
    path.starts_with(API_PREFIX)
}

/// Whether this path requires the shared admin key.
pub fn requires_admin_key(path: &str) -> bool {
    path.starts_with(CREATE_ACCOUNT) || path.starts_with(UPDATE_ACCOUNT_PREFIX)
}

/// Whether this path requires caller key + bearer token authentication.
pub fn requires_caller_auth(path: &str) -> bool {
    path.starts_with(FACE_MATCH)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_routes_are_unaudited() {
        assert!(!is_audited("/health"));
        assert!(!is_audited("/ready"));
    }

    #[test]
    fn test_api_routes_are_audited() {
        assert!(is_audited(GENERATE_TOKEN));
        assert!(is_audited(WEBHOOK));
        assert!(is_audited(CREATE_ACCOUNT));
        assert!(is_audited("/api/v1/update-account/123456789"));
        assert!(is_audited(FACE_MATCH));
    }

    #[test]
    fn test_admin_classification() {
        assert!(requires_admin_key(CREATE_ACCOUNT));
        assert!(requires_admin_key("/api/v1/update-account/123456789"));
        assert!(!requires_admin_key(GENERATE_TOKEN));
        assert!(!requires_admin_key(FACE_MATCH));
        assert!(!requires_admin_key(WEBHOOK));
    }

    #[test]
    fn test_caller_classification() {
        assert!(requires_caller_auth(FACE_MATCH));
        assert!(!requires_caller_auth(GENERATE_TOKEN));
        assert!(!requires_caller_auth(CREATE_ACCOUNT));
        assert!(!requires_caller_auth("/health"));
    }
}
