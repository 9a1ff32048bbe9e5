//! Per-run scenario context
//!
//! Owns the HTTP client for the duration of a run, the optional bearer
//! credential obtained during setup, values captured from earlier responses,
//! and the result ledger.

use serde_json::{json, Value};
use std::collections::HashMap;

use crate::common::config::ScenarioParams;
use crate::common::{Error, FaultKind, Result};

use super::client::{ApiClient, ApiRequest, ApiResponse, RequestBody};
use super::expect::Expectation;
use super::ledger::Ledger;
use super::result::{Outcome, Verdict};

/// Value substituted for a variable that was never captured
pub const PLACEHOLDER: &str = "null";

pub struct ScenarioContext {
    client: ApiClient,
    token: Option<String>,
    vars: HashMap<String, String>,
    ledger: Ledger,
    params: ScenarioParams,
    closed: bool,
}

impl ScenarioContext {
    pub(crate) fn new(client: ApiClient, params: ScenarioParams, echo: bool) -> Self {
        tracing::debug!(api_base = client.api_base(), "HTTP session opened");
        Self {
            client,
            token: None,
            vars: HashMap::new(),
            ledger: Ledger::new(echo),
            params,
            closed: false,
        }
    }

    pub fn params(&self) -> &ScenarioParams {
        &self.params
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    // === Credential ===

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn set_token(&mut self, token: impl Into<String>) {
        self.token = Some(token.into());
    }

    pub fn has_credential(&self) -> bool {
        self.token.is_some()
    }

    // === Captured variables ===

    pub fn capture(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        tracing::debug!(%name, %value, "captured");
        self.vars.insert(name, value);
    }

    pub fn var(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    /// Captured value, or `fallback` when an earlier step produced none
    pub fn var_or(&self, name: &str, fallback: &str) -> String {
        self.var(name).unwrap_or(fallback).to_string()
    }

    /// Substitute `${name}` references with captured values
    ///
    /// Unknown names become the placeholder `null`; an unterminated `${` is
    /// kept literally.
    pub fn interpolate(&self, input: &str) -> String {
        let mut out = String::with_capacity(input.len());
        let mut rest = input;

        while let Some(start) = rest.find("${") {
            out.push_str(&rest[..start]);
            let after = &rest[start + 2..];
            match after.find('}') {
                Some(end) => {
                    let name = after[..end].trim();
                    out.push_str(self.var(name).unwrap_or(PLACEHOLDER));
                    rest = &after[end + 1..];
                }
                None => {
                    out.push_str(&rest[start..]);
                    rest = "";
                }
            }
        }
        out.push_str(rest);
        out
    }

    fn interpolate_value(&self, value: &Value) -> Value {
        match value {
            Value::String(s) => Value::String(self.interpolate(s)),
            Value::Array(items) => {
                Value::Array(items.iter().map(|v| self.interpolate_value(v)).collect())
            }
            Value::Object(map) => Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), self.interpolate_value(v)))
                    .collect(),
            ),
            other => other.clone(),
        }
    }

    /// Copy of `request` with every string interpolated
    pub fn interpolate_request(&self, request: &ApiRequest) -> ApiRequest {
        let mut resolved = request.clone();
        resolved.path = self.interpolate(&request.path);
        for (_, value) in resolved.query.iter_mut() {
            *value = self.interpolate(value);
        }
        for (_, value) in resolved.headers.iter_mut() {
            *value = self.interpolate(value);
        }
        resolved.body = match &request.body {
            RequestBody::Empty => RequestBody::Empty,
            RequestBody::Json(v) => RequestBody::Json(self.interpolate_value(v)),
            RequestBody::Raw(s) => RequestBody::Raw(self.interpolate(s)),
        };
        resolved
    }

    // === Requests ===

    /// Issue a request, attaching the credential when the request asks for it
    pub async fn send(&self, request: &ApiRequest) -> Result<ApiResponse> {
        if request.auth && self.token.is_none() {
            return Err(Error::MissingCredential(request.to_string()));
        }
        self.client.send(request, self.token.as_deref()).await
    }

    /// Send, evaluate and record exactly one result
    ///
    /// Returns the response when the expectation passed. Transport faults
    /// are recorded as FAIL and yield `None`.
    pub async fn check(
        &mut self,
        name: &str,
        request: &ApiRequest,
        expectation: &Expectation,
        pass_message: &str,
    ) -> Option<ApiResponse> {
        match self.send(request).await {
            Ok(response) => {
                let mut verdict = expectation.evaluate(&response);
                if !pass_message.is_empty() {
                    verdict = verdict.or_pass_with(pass_message);
                }
                let passed = verdict.is_pass();
                let detail = (!passed).then(|| response.detail()).filter(|d| !d.is_null());
                self.record_verdict(name, verdict, detail);
                passed.then_some(response)
            }
            Err(e) => {
                self.record_error(name, &e);
                None
            }
        }
    }

    // === Recording ===

    pub fn record(
        &mut self,
        name: impl Into<String>,
        outcome: Outcome,
        message: impl Into<String>,
        detail: Option<Value>,
    ) {
        self.ledger.record(name, outcome, message, detail);
    }

    pub fn record_verdict(&mut self, name: impl Into<String>, verdict: Verdict, detail: Option<Value>) {
        self.ledger
            .record(name, verdict.outcome(), verdict.message(), detail);
    }

    /// Record a fault as FAIL with its classification
    pub fn record_error(&mut self, name: impl Into<String>, error: &Error) {
        let kind = error.kind();
        let message = match kind {
            FaultKind::Transport => format!("Request failed: {}", error),
            _ => error.to_string(),
        };
        self.ledger
            .record(name, Outcome::Fail, message, Some(json!({ "fault": kind })));
    }

    // === Teardown ===

    /// Release the HTTP session. Idempotent.
    pub fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            tracing::debug!(api_base = self.client.api_base(), "HTTP session released");
        }
    }

    /// Close the session and hand back the ledger
    pub fn finish(mut self) -> Ledger {
        self.close();
        std::mem::take(&mut self.ledger)
    }
}

impl Drop for ScenarioContext {
    fn drop(&mut self) {
        self.close();
    }
}
