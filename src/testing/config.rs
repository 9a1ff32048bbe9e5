//! Scenario file configuration types
//!
//! Defines the data structures for deserializing YAML scenario files.

use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// A complete scenario loaded from a YAML file
#[derive(Deserialize, Debug)]
#[serde(deny_unknown_fields)]
pub struct TestScenario {
    /// Name of the scenario
    pub name: String,
    /// Optional description of what the scenario verifies
    pub description: Option<String>,
    /// Optional login performed before the steps
    pub login: Option<LoginStep>,
    /// The sequence of requests to issue
    pub steps: Vec<TestStep>,
}

/// Credentials exchanged for a bearer token before the steps run
#[derive(Deserialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct LoginStep {
    pub email: String,
    pub password: String,
    /// Login endpoint (default: /login)
    #[serde(default = "default_login_path")]
    pub path: String,
    /// Response field carrying the token (default: access_token)
    #[serde(default = "default_token_field")]
    pub token_field: String,
}

fn default_login_path() -> String {
    "/login".to_string()
}

fn default_token_field() -> String {
    "access_token".to_string()
}

/// A single request and its expectations
#[derive(Deserialize, Debug)]
#[serde(deny_unknown_fields)]
pub struct TestStep {
    /// Name recorded for the step's result
    pub name: String,
    /// HTTP method (default: GET)
    #[serde(default = "default_method")]
    pub method: String,
    /// Endpoint path below the API prefix; may reference `${var}`
    pub path: String,
    /// Query parameters
    #[serde(default)]
    pub query: BTreeMap<String, Value>,
    /// JSON body
    pub json: Option<Value>,
    /// Raw body sent with a JSON content type (for malformed payloads)
    pub raw: Option<String>,
    /// Extra request headers
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    /// Attach the bearer token obtained by `login`
    #[serde(default)]
    pub auth: bool,
    /// Expected response
    #[serde(default)]
    pub expect: StepExpectation,
    /// Variables to capture from the response: name -> dotted path
    #[serde(default)]
    pub capture: BTreeMap<String, String>,
}

fn default_method() -> String {
    "GET".to_string()
}

/// Expectations for a step's response
#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
pub struct StepExpectation {
    /// Exact status code (default: 200 when neither status nor status_in is set)
    pub status: Option<u16>,
    /// Set of acceptable status codes
    pub status_in: Option<Vec<u16>>,
    /// Keys that must be present in the JSON body
    #[serde(default)]
    pub required_fields: Vec<String>,
    /// Field equality checks: dotted path -> value
    #[serde(default)]
    pub equals: BTreeMap<String, Value>,
    /// Prefix checks: dotted path -> prefix
    #[serde(default)]
    pub starts_with: BTreeMap<String, String>,
    /// Substring checks: dotted path -> substring
    #[serde(default)]
    pub contains: BTreeMap<String, String>,
    /// Fields that must be present and non-empty
    #[serde(default)]
    pub non_empty: Vec<String>,
}
