//! Scenario procedures and the fault-to-result adapter

use async_trait::async_trait;
use futures_util::FutureExt;
use serde_json::Value;
use std::any::Any;
use std::panic::AssertUnwindSafe;

use crate::common::Result;

use super::client::ApiRequest;
use super::context::ScenarioContext;
use super::expect::Expectation;
use super::result::Outcome;

/// One independently runnable scenario
///
/// A procedure records one result per logical assertion through the
/// context. Returning `Err` (or panicking) records a single FAIL named after
/// the procedure; results recorded before the fault are kept.
#[async_trait]
pub trait Procedure: Send + Sync {
    /// Display name, used for results recorded on the procedure's behalf
    fn name(&self) -> &str;

    /// Whether the procedure needs the bearer credential from setup
    fn requires_auth(&self) -> bool {
        false
    }

    async fn run(&self, ctx: &mut ScenarioContext) -> Result<()>;
}

/// Run one procedure with failure isolation
pub async fn run_procedure(ctx: &mut ScenarioContext, procedure: &dyn Procedure) {
    let name = procedure.name().to_string();

    if procedure.requires_auth() && !ctx.has_credential() {
        ctx.record(
            name,
            Outcome::Warn,
            "Skipped: requires a credential and setup did not obtain one",
            None,
        );
        return;
    }

    tracing::debug!(procedure = %name, "running");

    let outcome = AssertUnwindSafe(procedure.run(ctx)).catch_unwind().await;
    match outcome {
        Ok(Ok(())) => {}
        Ok(Err(e)) => ctx.record_error(name, &e),
        Err(payload) => ctx.record(
            name,
            Outcome::Fail,
            format!("Procedure panicked: {}", panic_message(payload.as_ref())),
            None,
        ),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// Single request, single assertion procedure
#[derive(Debug, Clone)]
pub struct Check {
    name: String,
    request: ApiRequest,
    expectation: Expectation,
    pass_message: String,
    captures: Vec<(String, String)>,
}

impl Check {
    pub fn new(name: impl Into<String>, request: ApiRequest, expectation: Expectation) -> Self {
        Self {
            name: name.into(),
            request,
            expectation,
            pass_message: String::new(),
            captures: Vec::new(),
        }
    }

    /// Message recorded on PASS instead of the bare status line
    pub fn pass_message(mut self, message: impl Into<String>) -> Self {
        self.pass_message = message.into();
        self
    }

    /// Store the field at `path` as variable `var` when the check passes
    pub fn capture(mut self, var: impl Into<String>, path: impl Into<String>) -> Self {
        self.captures.push((var.into(), path.into()));
        self
    }

    pub fn request(&self) -> &ApiRequest {
        &self.request
    }

    pub fn expectation(&self) -> &Expectation {
        &self.expectation
    }
}

#[async_trait]
impl Procedure for Check {
    fn name(&self) -> &str {
        &self.name
    }

    fn requires_auth(&self) -> bool {
        self.request.auth
    }

    async fn run(&self, ctx: &mut ScenarioContext) -> Result<()> {
        let request = ctx.interpolate_request(&self.request);
        let pass_message = if self.pass_message.is_empty() {
            String::new()
        } else {
            ctx.interpolate(&self.pass_message)
        };

        let response = ctx
            .check(&self.name, &request, &self.expectation, &pass_message)
            .await;

        // A failed check already recorded its FAIL; leave captures unset so
        // later steps fall back to the placeholder.
        if let Some(response) = response {
            for (var, path) in &self.captures {
                match response.field(path) {
                    Some(Value::String(s)) => ctx.capture(var, s.clone()),
                    Some(Value::Null) | None => {
                        tracing::warn!(%var, %path, "nothing to capture");
                    }
                    Some(other) => ctx.capture(var, other.to_string()),
                }
            }
        }

        Ok(())
    }
}
