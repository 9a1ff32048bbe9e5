//! Common utilities shared by the harness, suites and CLI

pub mod config;
pub mod error;
pub mod logging;
pub mod paths;

pub use error::{Error, FaultKind, Result};

/// Shorten a response body for console messages
pub fn truncate_body(body: &str, max: usize) -> String {
    if body.chars().count() > max {
        let cut: String = body.chars().take(max).collect();
        format!("{}...", cut)
    } else {
        body.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_body() {
        assert_eq!(truncate_body("short", 10), "short");
        assert_eq!(truncate_body("abcdefghij", 4), "abcd...");
        // Multi-byte characters are not split
        assert_eq!(truncate_body("inválido", 5), "invál...");
    }
}
