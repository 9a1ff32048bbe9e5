//! Scenario harness
//!
//! Drives an ordered list of independent procedures against a remote HTTP
//! API over a single session, one request at a time, and reduces the
//! recorded results into a pass/fail/warn summary.

pub mod client;
pub mod context;
pub mod expect;
pub mod ledger;
pub mod procedure;
pub mod result;

use chrono::Utc;
use colored::Colorize;
use serde::Serialize;

use crate::common::config::Config;
use crate::common::Result;

pub use client::{ApiClient, ApiRequest, ApiResponse, RequestBody, ResponseBody};
pub use context::ScenarioContext;
pub use expect::{Expectation, FieldCheck, StatusExpectation};
pub use ledger::Ledger;
pub use procedure::{run_procedure, Check, Procedure};
pub use result::{Outcome, Summary, TestResult, Verdict};

/// Procedures run under one heading
pub struct ProcedureGroup {
    pub title: Option<String>,
    pub procedures: Vec<Box<dyn Procedure>>,
}

impl ProcedureGroup {
    pub fn new(title: impl Into<String>, procedures: Vec<Box<dyn Procedure>>) -> Self {
        Self {
            title: Some(title.into()),
            procedures,
        }
    }

    pub fn untitled(procedures: Vec<Box<dyn Procedure>>) -> Self {
        Self {
            title: None,
            procedures,
        }
    }
}

/// Harness bound to one target configuration
pub struct Harness {
    config: Config,
    echo: bool,
}

impl Harness {
    pub fn new(config: Config) -> Self {
        Self { config, echo: true }
    }

    /// Do not print results while recording
    pub fn quiet(mut self) -> Self {
        self.echo = false;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Whether results and banners are printed while running
    pub fn echo(&self) -> bool {
        self.echo
    }

    /// Open the HTTP session for a run
    ///
    /// The session is released when the returned context is finished or
    /// dropped.
    pub fn acquire(&self) -> Result<ScenarioContext> {
        let client = ApiClient::from_config(&self.config)?;
        Ok(ScenarioContext::new(
            client,
            self.config.params.clone(),
            self.echo,
        ))
    }

    /// Run procedures in listed order
    pub async fn run_all(&self, procedures: Vec<Box<dyn Procedure>>) -> Result<Ledger> {
        self.run_groups(vec![ProcedureGroup::untitled(procedures)])
            .await
    }

    /// Run groups in order over a single session
    pub async fn run_groups(&self, groups: Vec<ProcedureGroup>) -> Result<Ledger> {
        let mut ctx = self.acquire()?;

        for group in &groups {
            if let Some(title) = &group.title {
                tracing::info!(group = %title, procedures = group.procedures.len(), "starting group");
                if self.echo {
                    println!("\n{}", format!("{}:", title).cyan());
                }
            }
            for procedure in &group.procedures {
                run_procedure(&mut ctx, procedure.as_ref()).await;
            }
        }

        Ok(ctx.finish())
    }
}

/// Reduce a ledger into counts
pub fn summarize(ledger: &Ledger) -> Summary {
    ledger.summarize()
}

/// Print the run header
pub fn print_header(title: &str, api_base: &str) {
    let rule = "=".repeat(80);
    println!("{}", rule);
    println!("{}", title.blue().bold());
    println!("{}", rule);
    println!("Backend URL: {}", api_base);
    println!("Started at: {}", Utc::now().to_rfc3339());
}

/// Print the summary block with failures and warnings listed
pub fn print_summary(ledger: &Ledger) {
    let summary = ledger.summarize();
    let rule = "=".repeat(80);

    println!("\n{}", rule);
    println!("{}", "TEST SUMMARY".bold());
    println!("{}", rule);
    println!("Total Tests: {}", summary.total);
    println!("Passed: {}", summary.passed.to_string().green());
    println!("Failed: {}", summary.failed.to_string().red());
    println!("Warnings: {}", summary.warned.to_string().yellow());
    println!("Success Rate: {:.1}%", summary.success_rate());

    if summary.failed > 0 {
        println!("\n{}", "FAILED TESTS:".red().bold());
        for result in ledger.with_outcome(Outcome::Fail) {
            println!("  {} {}: {}", "✗".red(), result.test_name(), result.message());
        }
    }

    if summary.warned > 0 {
        println!("\n{}", "WARNINGS:".yellow().bold());
        for result in ledger.with_outcome(Outcome::Warn) {
            println!("  {} {}: {}", "!".yellow(), result.test_name(), result.message());
        }
    }

    println!("\nCompleted at: {}", Utc::now().to_rfc3339());

    if summary.success() {
        println!("\n{} {}\n", "✓".green().bold(), "All checks passed".green().bold());
    } else {
        println!("\n{} {}\n", "✗".red().bold(), "Some checks failed".red().bold());
    }
}

/// Machine-readable report of a run
#[derive(Debug, Serialize)]
pub struct Report<'a> {
    pub summary: Summary,
    pub success: bool,
    pub results: &'a [TestResult],
}

impl<'a> Report<'a> {
    pub fn new(ledger: &'a Ledger) -> Self {
        let summary = ledger.summarize();
        Self {
            summary,
            success: summary.success(),
            results: ledger.results(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::Error;
    use async_trait::async_trait;

    struct Records(&'static str, Outcome);

    #[async_trait]
    impl Procedure for Records {
        fn name(&self) -> &str {
            self.0
        }

        async fn run(&self, ctx: &mut ScenarioContext) -> Result<()> {
            ctx.record(self.0, self.1, "recorded", None);
            Ok(())
        }
    }

    #[test]
    fn test_quiet_disables_echo() {
        assert!(Harness::new(Config::default()).echo());
        assert!(!Harness::new(Config::default()).quiet().echo());
    }

    struct Faults;

    #[async_trait]
    impl Procedure for Faults {
        fn name(&self) -> &str {
            "faulty procedure"
        }

        async fn run(&self, ctx: &mut ScenarioContext) -> Result<()> {
            ctx.record("faulty procedure - first sub-case", Outcome::Pass, "ok", None);
            Err(Error::Expectation("body had no session_id".into()))
        }
    }

    struct Panics;

    #[async_trait]
    impl Procedure for Panics {
        fn name(&self) -> &str {
            "panicking procedure"
        }

        async fn run(&self, _ctx: &mut ScenarioContext) -> Result<()> {
            panic!("index out of bounds");
        }
    }

    struct NeedsAuth;

    #[async_trait]
    impl Procedure for NeedsAuth {
        fn name(&self) -> &str {
            "GET /me"
        }

        fn requires_auth(&self) -> bool {
            true
        }

        async fn run(&self, ctx: &mut ScenarioContext) -> Result<()> {
            ctx.record("GET /me", Outcome::Pass, "should not run", None);
            Ok(())
        }
    }

    fn harness() -> Harness {
        let mut config = Config::default();
        config.target.base_url = "http://127.0.0.1:9".into();
        Harness::new(config).quiet()
    }

    #[tokio::test]
    async fn test_faults_are_isolated() {
        let procedures: Vec<Box<dyn Procedure>> = vec![
            Box::new(Records("before", Outcome::Pass)),
            Box::new(Faults),
            Box::new(Panics),
            Box::new(Records("after", Outcome::Warn)),
        ];

        let ledger = harness().run_all(procedures).await.unwrap();
        let names: Vec<&str> = ledger.results().iter().map(|r| r.test_name()).collect();
        assert_eq!(
            names,
            [
                "before",
                "faulty procedure - first sub-case",
                "faulty procedure",
                "panicking procedure",
                "after"
            ]
        );

        let faulty = &ledger.results()[2];
        assert_eq!(faulty.outcome(), Outcome::Fail);
        assert!(faulty.message().contains("body had no session_id"));

        let panicked = &ledger.results()[3];
        assert_eq!(panicked.outcome(), Outcome::Fail);
        assert!(panicked.message().contains("index out of bounds"));

        let summary = summarize(&ledger);
        assert_eq!(summary.failed, 2);
        assert!(!summary.success());
    }

    #[tokio::test]
    async fn test_auth_procedures_skipped_without_credential() {
        let procedures: Vec<Box<dyn Procedure>> = vec![Box::new(NeedsAuth)];
        let ledger = harness().run_all(procedures).await.unwrap();

        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger.results()[0].outcome(), Outcome::Warn);
        assert!(ledger.results()[0].message().starts_with("Skipped"));
        assert!(summarize(&ledger).success());
    }

    #[tokio::test]
    async fn test_unreachable_server_is_recorded_as_fail() {
        let procedures: Vec<Box<dyn Procedure>> = vec![
            Box::new(Check::new(
                "GET /payments/packages",
                ApiRequest::get("/payments/packages"),
                Expectation::status(200),
            )),
            Box::new(Records("after", Outcome::Pass)),
        ];

        let ledger = harness().run_all(procedures).await.unwrap();
        assert_eq!(ledger.len(), 2);
        let first = &ledger.results()[0];
        assert_eq!(first.outcome(), Outcome::Fail);
        assert!(first.message().starts_with("Request failed"));
        assert_eq!(
            first.detail().and_then(|d| d.get("fault")),
            Some(&serde_json::json!("transport"))
        );
        assert_eq!(ledger.results()[1].outcome(), Outcome::Pass);
    }

    #[tokio::test]
    async fn test_invalid_base_url_is_setup_fault() {
        let mut config = Config::default();
        config.target.base_url = "::not a url".into();
        let result = Harness::new(config).quiet().run_all(Vec::new()).await;
        assert!(matches!(result, Err(Error::InvalidBaseUrl { .. })));
    }

    #[test]
    fn test_report_serialization() {
        let mut ledger = Ledger::new(false);
        ledger.record("a", Outcome::Pass, "ok", None);
        ledger.record("b", Outcome::Warn, "sandbox", None);

        let json = serde_json::to_value(Report::new(&ledger)).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["summary"]["warned"], 1);
        assert_eq!(json["results"][1]["test_name"], "b");
    }
}
