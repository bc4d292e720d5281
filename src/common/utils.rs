//! Utility functions for replica-client

/// Current Unix timestamp in nanoseconds.
pub fn timestamp_now_nanos() -> i64 {
    // Only out of range past the year 2262.
    chrono::Utc::now().timestamp_nanos_opt().unwrap_or(i64::MAX)
}

/// Render a body for a diagnostic dump: UTF-8 text is escaped, anything
/// else is shown as a byte count.
pub fn quote_body(body: &[u8]) -> String {
    match std::str::from_utf8(body) {
        Ok(text) => format!("{:?}", text),
        Err(_) => format!("<{} bytes of binary data>", body.len()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamp_is_monotonic_enough() {
        let a = timestamp_now_nanos();
        let b = timestamp_now_nanos();
        assert!(a > 0);
        assert!(b >= a);
    }

    #[test]
    fn test_quote_body() {
        assert_eq!(quote_body(b"v1"), "\"v1\"");
        assert_eq!(quote_body(b"a\nb"), "\"a\\nb\"");
        assert_eq!(quote_body(&[0xff, 0xfe]), "<2 bytes of binary data>");
        assert_eq!(quote_body(b""), "\"\"");
    }
}
