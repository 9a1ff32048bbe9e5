//! Ordered, append-only log of recorded results

use colored::Colorize;
use serde_json::Value;

use super::result::{Outcome, Summary, TestResult};

/// Result ledger owned by a run
#[derive(Debug, Default)]
pub struct Ledger {
    results: Vec<TestResult>,
    /// Print each record to stdout as it is appended
    echo: bool,
}

impl Ledger {
    pub fn new(echo: bool) -> Self {
        Self {
            results: Vec::new(),
            echo,
        }
    }

    /// Append one result. Never fails.
    pub fn record(
        &mut self,
        name: impl Into<String>,
        outcome: Outcome,
        message: impl Into<String>,
        detail: Option<Value>,
    ) {
        let result = TestResult::new(name, outcome, message, detail);

        match outcome {
            Outcome::Pass => {
                tracing::debug!(test = result.test_name(), "pass");
            }
            Outcome::Fail => {
                tracing::debug!(test = result.test_name(), message = result.message(), "fail");
            }
            Outcome::Warn => {
                tracing::debug!(test = result.test_name(), message = result.message(), "warn");
            }
        }

        if self.echo {
            print_result(&result);
        }

        self.results.push(result);
    }

    pub fn results(&self) -> &[TestResult] {
        &self.results
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Results with the given outcome, in recording order
    pub fn with_outcome(&self, outcome: Outcome) -> impl Iterator<Item = &TestResult> {
        self.results.iter().filter(move |r| r.outcome() == outcome)
    }

    /// Reduce the ledger into counts
    pub fn summarize(&self) -> Summary {
        self.results
            .iter()
            .fold(Summary::default(), |mut summary, result| {
                summary.total += 1;
                match result.outcome() {
                    Outcome::Pass => summary.passed += 1,
                    Outcome::Fail => summary.failed += 1,
                    Outcome::Warn => summary.warned += 1,
                }
                summary
            })
    }
}

fn print_result(result: &TestResult) {
    let badge = match result.outcome() {
        Outcome::Pass => "✓ PASS".green(),
        Outcome::Fail => "✗ FAIL".red(),
        Outcome::Warn => "! WARN".yellow(),
    };
    println!("  {} {}: {}", badge, result.test_name(), result.message());
    if let Some(detail) = result.detail() {
        println!("     {} {}", "Details:".dimmed(), detail.to_string().dimmed());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_record_preserves_order() {
        let mut ledger = Ledger::new(false);
        ledger.record("first", Outcome::Pass, "ok", None);
        ledger.record("second", Outcome::Fail, "boom", Some(json!({"status": 500})));
        ledger.record("third", Outcome::Warn, "sandbox", None);

        let names: Vec<&str> = ledger.results().iter().map(|r| r.test_name()).collect();
        assert_eq!(names, ["first", "second", "third"]);
        assert_eq!(ledger.results()[1].detail(), Some(&json!({"status": 500})));
    }

    #[test]
    fn test_summarize_counts() {
        let mut ledger = Ledger::new(false);
        assert_eq!(ledger.summarize(), Summary::default());

        ledger.record("a", Outcome::Pass, "", None);
        ledger.record("b", Outcome::Pass, "", None);
        ledger.record("c", Outcome::Warn, "", None);
        ledger.record("d", Outcome::Fail, "", None);

        let summary = ledger.summarize();
        assert_eq!(summary.total, 4);
        assert_eq!(summary.passed, 2);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.warned, 1);
        assert!(!summary.success());
    }

    #[test]
    fn test_with_outcome_filters() {
        let mut ledger = Ledger::new(false);
        ledger.record("a", Outcome::Fail, "x", None);
        ledger.record("b", Outcome::Pass, "", None);
        ledger.record("c", Outcome::Fail, "y", None);

        let failed: Vec<&str> = ledger
            .with_outcome(Outcome::Fail)
            .map(|r| r.message())
            .collect();
        assert_eq!(failed, ["x", "y"]);
    }
}
