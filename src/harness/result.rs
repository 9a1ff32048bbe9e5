//! Result records produced by scenarios

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::fmt;

/// Outcome of one logical assertion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Outcome {
    Pass,
    Fail,
    /// Expected-but-undesirable condition that does not count as failure
    Warn,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Pass => write!(f, "PASS"),
            Outcome::Fail => write!(f, "FAIL"),
            Outcome::Warn => write!(f, "WARN"),
        }
    }
}

/// A single recorded assertion
///
/// Immutable once created: fields are only readable.
#[derive(Debug, Clone, Serialize)]
pub struct TestResult {
    test_name: String,
    outcome: Outcome,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    detail: Option<Value>,
    timestamp: DateTime<Utc>,
}

impl TestResult {
    pub fn new(
        test_name: impl Into<String>,
        outcome: Outcome,
        message: impl Into<String>,
        detail: Option<Value>,
    ) -> Self {
        Self {
            test_name: test_name.into(),
            outcome,
            message: message.into(),
            detail,
            timestamp: Utc::now(),
        }
    }

    pub fn test_name(&self) -> &str {
        &self.test_name
    }

    pub fn outcome(&self) -> Outcome {
        self.outcome
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn detail(&self) -> Option<&Value> {
        self.detail.as_ref()
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

/// Declarative verdict of a check, before it is recorded
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    Pass(String),
    Fail(String),
    Warn(String),
}

impl Verdict {
    pub fn outcome(&self) -> Outcome {
        match self {
            Verdict::Pass(_) => Outcome::Pass,
            Verdict::Fail(_) => Outcome::Fail,
            Verdict::Warn(_) => Outcome::Warn,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Verdict::Pass(m) | Verdict::Fail(m) | Verdict::Warn(m) => m,
        }
    }

    pub fn is_pass(&self) -> bool {
        matches!(self, Verdict::Pass(_))
    }

    /// Replace the message of a passing verdict, keep failures as they are
    pub fn or_pass_with(self, message: impl Into<String>) -> Self {
        match self {
            Verdict::Pass(_) => Verdict::Pass(message.into()),
            other => other,
        }
    }
}

/// Counts reduced from the ledger
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub warned: usize,
}

impl Summary {
    /// True iff nothing failed; warnings never affect the flag
    pub fn success(&self) -> bool {
        self.failed == 0
    }

    /// Percentage of passed assertions
    pub fn success_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.passed as f64 / self.total as f64 * 100.0
        }
    }

    /// Process exit code for this summary
    pub fn exit_code(&self) -> i32 {
        if self.success() {
            0
        } else {
            1
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_warn_does_not_affect_success() {
        let summary = Summary {
            total: 5,
            passed: 2,
            failed: 0,
            warned: 3,
        };
        assert!(summary.success());
        assert_eq!(summary.exit_code(), 0);

        let summary = Summary {
            total: 5,
            passed: 4,
            failed: 1,
            warned: 0,
        };
        assert!(!summary.success());
        assert_eq!(summary.exit_code(), 1);
    }

    #[test]
    fn test_success_rate() {
        assert_eq!(Summary::default().success_rate(), 0.0);
        let summary = Summary {
            total: 4,
            passed: 3,
            failed: 1,
            warned: 0,
        };
        assert!((summary.success_rate() - 75.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_verdict_or_pass_with() {
        let v = Verdict::Pass("status 200".into()).or_pass_with("Checkout created");
        assert_eq!(v, Verdict::Pass("Checkout created".into()));

        let v = Verdict::Fail("Expected 200, got 500".into()).or_pass_with("ignored");
        assert_eq!(v.outcome(), Outcome::Fail);
        assert_eq!(v.message(), "Expected 200, got 500");
    }

    #[test]
    fn test_outcome_serializes_uppercase() {
        let result = TestResult::new("GET /me", Outcome::Warn, "skipped", None);
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["outcome"], "WARN");
        assert!(json.get("detail").is_none());
        assert!(json["timestamp"].is_string());
    }
}
