//! Fuzz testing for input validation and payload truncation.
//!
//! This fuzz target tests the robustness of the validation and audit
//! truncation helpers against arbitrary input strings. It ensures they:
//!
//! - Never panic on any input
//! - Always return a valid Result (Ok or Err) or a well-formed string
//! - Handle edge cases like empty strings, long strings, and multi-byte
//!   characters landing on a truncation boundary
//!
//! # Running the Fuzz Tests
//!
//! ```bash
//! # Install cargo-fuzz (requires nightly)
//! cargo +nightly install cargo-fuzz
//!
//! # Run the validation fuzz target
//! cargo +nightly fuzz run fuzz_validation
//!
//! # Run with a time limit (e.g., 60 seconds)
//! cargo +nightly fuzz run fuzz_validation -- -max_total_time=60
//!
//! # View coverage
//! cargo +nightly fuzz coverage fuzz_validation
//! ```
//!
//! # What This Tests
//!
//! - `validate_api_key`: API key shape validation
//! - `validate_account_id`: Account identifier shape validation
//! - `validate_portfolio`: Portfolio label validation
//! - `validate_is_active`: Numeric toggle validation
//! - `truncate_payload` / `truncate_error_message`: Audit snapshot truncation

#![no_main]

use fm_gateway::models::{
    MAX_PAYLOAD_CHARS, TRUNCATION_MARKER, truncate_error_message, truncate_payload,
};
use fm_gateway::validation::{
    is_valid_account_id, is_valid_api_key, is_valid_portfolio, validate_account_id,
    validate_api_key, validate_is_active, validate_portfolio,
};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Try to interpret the bytes as a UTF-8 string for string validation
    if let Ok(s) = std::str::from_utf8(data) {
        // Shape checks (shouldn't panic; predicate and Result forms agree)
        assert_eq!(is_valid_api_key(s), validate_api_key(s).is_ok());
        assert_eq!(is_valid_account_id(s), validate_account_id(s).is_ok());
        assert_eq!(is_valid_portfolio(s), validate_portfolio(s).is_ok());

        // Truncation either keeps the input verbatim or cuts it to exactly
        // the cap plus the marker, never splitting a multi-byte character
        let truncated = truncate_payload(s);
        assert!(
            truncated == s
                || truncated.chars().count()
                    == MAX_PAYLOAD_CHARS + TRUNCATION_MARKER.chars().count()
        );
        let _ = truncate_error_message(s);
    }

    // Test numeric validation with bytes interpreted as i32
    // This tests boundary conditions and all possible i32 values
    if data.len() >= 4 {
        let value = i32::from_le_bytes([data[0], data[1], data[2], data[3]]);

        // Only 0 and 1 are acceptable toggle values (shouldn't panic)
        let result = validate_is_active(value);
        assert_eq!(result.is_ok(), value == 0 || value == 1);
    }
});
