//! Scenario file runner
//!
//! Compiles a YAML scenario into harness procedures, so file-based runs get
//! the same failure isolation, ledger and summary as the built-in suites.

use async_trait::async_trait;
use colored::Colorize;
use reqwest::Method;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};

use crate::common::paths::scenarios_dir;
use crate::common::{Error, Result};
use crate::harness::{
    ApiRequest, Check, Expectation, FieldCheck, Harness, Ledger, Outcome, Procedure,
    ProcedureGroup, ScenarioContext, StatusExpectation,
};

use super::config::{LoginStep, StepExpectation, TestScenario, TestStep};

/// Resolve a scenario argument to a file
///
/// Existing paths are used as given; a bare name is looked up in the
/// scenarios directory with a `.yaml` or `.yml` extension.
pub fn resolve_path(arg: &Path) -> Result<PathBuf> {
    if arg.exists() {
        return Ok(arg.to_path_buf());
    }

    if arg.components().count() == 1 {
        if let Some(dir) = scenarios_dir() {
            for ext in ["yaml", "yml"] {
                let candidate = dir.join(arg).with_extension(ext);
                if candidate.exists() {
                    return Ok(candidate);
                }
            }
        }
    }

    Err(Error::FileRead {
        path: arg.display().to_string(),
        error: "no such scenario file".to_string(),
    })
}

/// Load and parse a scenario file
pub fn load_scenario(path: &Path) -> Result<TestScenario> {
    let content = std::fs::read_to_string(path).map_err(|e| Error::FileRead {
        path: path.display().to_string(),
        error: e.to_string(),
    })?;
    parse_scenario(&content)
}

/// Parse scenario YAML
pub fn parse_scenario(content: &str) -> Result<TestScenario> {
    let scenario: TestScenario =
        serde_yaml::from_str(content).map_err(|e| Error::ScenarioParse(e.to_string()))?;
    if scenario.steps.is_empty() {
        return Err(Error::ScenarioParse(format!(
            "Scenario '{}' has no steps",
            scenario.name
        )));
    }
    Ok(scenario)
}

/// Turn a scenario into an ordered procedure list
pub fn compile(scenario: &TestScenario) -> Result<Vec<Box<dyn Procedure>>> {
    let mut procedures: Vec<Box<dyn Procedure>> = Vec::new();

    if let Some(login) = &scenario.login {
        procedures.push(Box::new(Login::new(login.clone())));
    }

    for (i, step) in scenario.steps.iter().enumerate() {
        let check = compile_step(step)
            .map_err(|e| Error::ScenarioParse(format!("Step {} ('{}'): {}", i + 1, step.name, e)))?;
        procedures.push(Box::new(check));
    }

    Ok(procedures)
}

fn compile_step(step: &TestStep) -> std::result::Result<Check, String> {
    let method = Method::from_bytes(step.method.to_uppercase().as_bytes())
        .map_err(|_| format!("invalid method '{}'", step.method))?;

    let mut request = ApiRequest::new(method, step.path.clone());
    for (key, value) in &step.query {
        request = request.query(key.clone(), scalar_to_string(value));
    }
    for (name, value) in &step.headers {
        request = request.header(name.clone(), value.clone());
    }
    request = match (&step.json, &step.raw) {
        (Some(_), Some(_)) => return Err("'json' and 'raw' are mutually exclusive".to_string()),
        (Some(body), None) => request.json(body.clone()),
        (None, Some(raw)) => request.raw(raw.clone()),
        (None, None) => request,
    };
    if step.auth {
        request = request.authenticated();
    }

    let mut check = Check::new(step.name.clone(), request, compile_expectation(&step.expect)?);
    for (var, path) in &step.capture {
        check = check.capture(var.clone(), path.clone());
    }
    Ok(check)
}

fn compile_expectation(expect: &StepExpectation) -> std::result::Result<Expectation, String> {
    let status = match (expect.status, &expect.status_in) {
        (Some(_), Some(_)) => {
            return Err("'status' and 'status_in' are mutually exclusive".to_string())
        }
        (Some(code), None) => StatusExpectation::Exact(code),
        (None, Some(codes)) if codes.is_empty() => {
            return Err("'status_in' must list at least one code".to_string())
        }
        (None, Some(codes)) => StatusExpectation::AnyOf(codes.clone()),
        (None, None) => StatusExpectation::Exact(200),
    };

    let mut expectation = Expectation::with_status(status);
    expectation.required_fields = expect.required_fields.clone();
    for (path, value) in &expect.equals {
        expectation = expectation.field(path.clone(), FieldCheck::Equals(value.clone()));
    }
    for (path, prefix) in &expect.starts_with {
        expectation = expectation.field(path.clone(), FieldCheck::StartsWith(prefix.clone()));
    }
    for (path, needle) in &expect.contains {
        expectation = expectation.field(path.clone(), FieldCheck::Contains(needle.clone()));
    }
    for path in &expect.non_empty {
        expectation = expectation.field(path.clone(), FieldCheck::NonEmpty);
    }
    Ok(expectation)
}

fn scalar_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Exchange credentials for a bearer token
pub struct Login {
    step: LoginStep,
    name: String,
}

impl Login {
    pub fn new(step: LoginStep) -> Self {
        let name = format!("POST {} - Login", step.path);
        Self { step, name }
    }
}

#[async_trait]
impl Procedure for Login {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, ctx: &mut ScenarioContext) -> Result<()> {
        let request = ApiRequest::post(self.step.path.clone()).json(json!({
            "email": ctx.interpolate(&self.step.email),
            "password": ctx.interpolate(&self.step.password),
        }));

        let response = ctx.send(&request).await?;
        if response.status != 200 {
            ctx.record(
                &self.name,
                Outcome::Fail,
                format!("Expected 200, got {}", response.describe()),
                Some(response.detail()),
            );
            return Ok(());
        }

        match response.str_field(&self.step.token_field) {
            Some(token) if !token.is_empty() => {
                ctx.set_token(token.to_string());
                ctx.record(&self.name, Outcome::Pass, "Credential obtained", None);
            }
            _ => ctx.record(
                &self.name,
                Outcome::Fail,
                format!("No '{}' in login response", self.step.token_field),
                Some(response.detail()),
            ),
        }
        Ok(())
    }
}

/// Run a scenario file through the harness
pub async fn run_scenario(path: &Path, harness: &Harness) -> Result<Ledger> {
    let scenario = load_scenario(path)?;
    let procedures = compile(&scenario)?;

    if harness.echo() {
        println!(
            "\n{} {}",
            "Running Scenario:".blue().bold(),
            scenario.name.white().bold()
        );
        if let Some(desc) = &scenario.description {
            println!("  {}", desc.dimmed());
        }
    }

    harness
        .run_groups(vec![ProcedureGroup::new("Steps", procedures)])
        .await
}
