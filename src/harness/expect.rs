//! Declarative expectations on a response
//!
//! Evaluation order is status first, then required keys, then field checks.
//! The first mismatch decides the verdict.

use serde_json::Value;
use std::fmt;

use super::client::ApiResponse;
use super::result::Verdict;

/// Resolve a dotted path (`a.b.0.c`) inside a JSON value
///
/// Numeric segments index into arrays.
pub fn lookup<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    if path.is_empty() {
        return Some(value);
    }
    path.split('.').try_fold(value, |current, segment| match current {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

/// Acceptable status codes
#[derive(Debug, Clone, PartialEq)]
pub enum StatusExpectation {
    Exact(u16),
    AnyOf(Vec<u16>),
    /// Any status below 500
    NotServerError,
}

impl StatusExpectation {
    pub fn matches(&self, status: u16) -> bool {
        match self {
            StatusExpectation::Exact(code) => *code == status,
            StatusExpectation::AnyOf(codes) => codes.contains(&status),
            StatusExpectation::NotServerError => status < 500,
        }
    }
}

impl fmt::Display for StatusExpectation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusExpectation::Exact(code) => write!(f, "{}", code),
            StatusExpectation::AnyOf(codes) => {
                let codes: Vec<String> = codes.iter().map(|c| c.to_string()).collect();
                write!(f, "{}", codes.join("/"))
            }
            StatusExpectation::NotServerError => write!(f, "<500"),
        }
    }
}

/// Check applied to one body field
#[derive(Debug, Clone, PartialEq)]
pub enum FieldCheck {
    Equals(Value),
    StartsWith(String),
    Contains(String),
    /// Non-null, and non-empty when a string, array or object
    NonEmpty,
}

impl FieldCheck {
    fn check(&self, path: &str, actual: Option<&Value>) -> Result<(), String> {
        let actual = match actual {
            Some(v) => v,
            None => return Err(format!("Field '{}' is missing", path)),
        };

        match self {
            FieldCheck::Equals(expected) => {
                if actual == expected {
                    Ok(())
                } else {
                    Err(format!(
                        "Field '{}': expected {}, got {}",
                        path, expected, actual
                    ))
                }
            }
            FieldCheck::StartsWith(prefix) => match actual.as_str() {
                Some(s) if s.starts_with(prefix.as_str()) => Ok(()),
                _ => Err(format!(
                    "Field '{}': expected a value starting with '{}', got {}",
                    path, prefix, actual
                )),
            },
            FieldCheck::Contains(needle) => {
                let haystack = match actual {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                if haystack.contains(needle.as_str()) {
                    Ok(())
                } else {
                    Err(format!(
                        "Field '{}': expected a value containing '{}', got {}",
                        path, needle, actual
                    ))
                }
            }
            FieldCheck::NonEmpty => {
                let empty = match actual {
                    Value::Null => true,
                    Value::String(s) => s.is_empty(),
                    Value::Array(a) => a.is_empty(),
                    Value::Object(o) => o.is_empty(),
                    _ => false,
                };
                if empty {
                    Err(format!("Field '{}' is empty", path))
                } else {
                    Ok(())
                }
            }
        }
    }
}

/// Everything a scenario expects from one response
#[derive(Debug, Clone, PartialEq)]
pub struct Expectation {
    pub status: StatusExpectation,
    pub required_fields: Vec<String>,
    pub fields: Vec<(String, FieldCheck)>,
}

impl Expectation {
    pub fn status(code: u16) -> Self {
        Self::with_status(StatusExpectation::Exact(code))
    }

    pub fn status_in(codes: &[u16]) -> Self {
        Self::with_status(StatusExpectation::AnyOf(codes.to_vec()))
    }

    pub fn with_status(status: StatusExpectation) -> Self {
        Self {
            status,
            required_fields: Vec::new(),
            fields: Vec::new(),
        }
    }

    pub fn require(mut self, fields: &[&str]) -> Self {
        self.required_fields
            .extend(fields.iter().map(|f| f.to_string()));
        self
    }

    pub fn field(mut self, path: impl Into<String>, check: FieldCheck) -> Self {
        self.fields.push((path.into(), check));
        self
    }

    pub fn equals(self, path: impl Into<String>, value: Value) -> Self {
        self.field(path, FieldCheck::Equals(value))
    }

    pub fn starts_with(self, path: impl Into<String>, prefix: impl Into<String>) -> Self {
        self.field(path, FieldCheck::StartsWith(prefix.into()))
    }

    pub fn contains(self, path: impl Into<String>, needle: impl Into<String>) -> Self {
        self.field(path, FieldCheck::Contains(needle.into()))
    }

    pub fn non_empty(self, path: impl Into<String>) -> Self {
        self.field(path, FieldCheck::NonEmpty)
    }

    fn needs_body(&self) -> bool {
        !self.required_fields.is_empty() || !self.fields.is_empty()
    }

    /// Evaluate a response against this expectation
    pub fn evaluate(&self, response: &ApiResponse) -> Verdict {
        if !self.status.matches(response.status) {
            return Verdict::Fail(format!(
                "Expected {}, got {}",
                self.status,
                response.describe()
            ));
        }

        if !self.needs_body() {
            return Verdict::Pass(format!("HTTP {}", response.status));
        }

        let body = match response.json() {
            Some(body) => body,
            None => {
                return Verdict::Fail(format!(
                    "Expected a JSON body, got {}",
                    response.describe()
                ))
            }
        };

        let missing: Vec<&str> = self
            .required_fields
            .iter()
            .filter(|f| lookup(body, f).is_none())
            .map(|f| f.as_str())
            .collect();
        if !missing.is_empty() {
            return Verdict::Fail(format!("Missing response fields: {:?}", missing));
        }

        for (path, check) in &self.fields {
            if let Err(reason) = check.check(path, lookup(body, path)) {
                return Verdict::Fail(reason);
            }
        }

        Verdict::Pass(format!("HTTP {}", response.status))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::harness::client::ResponseBody;
    use serde_json::json;

    fn json_response(status: u16, body: Value) -> ApiResponse {
        ApiResponse::new(status, ResponseBody::Json(body))
    }

    #[test]
    fn test_lookup_paths() {
        let value = json!({"a": {"b": [10, {"c": "x"}]}});
        assert_eq!(lookup(&value, "a.b.0"), Some(&json!(10)));
        assert_eq!(lookup(&value, "a.b.1.c"), Some(&json!("x")));
        assert_eq!(lookup(&value, "a.z"), None);
        assert_eq!(lookup(&value, "a.b.x"), None);
        assert_eq!(lookup(&value, ""), Some(&value));
    }

    #[test]
    fn test_status_mismatch_fails_with_body() {
        let expectation = Expectation::status(422);
        let verdict = expectation.evaluate(&json_response(200, json!({"success": true})));
        match verdict {
            Verdict::Fail(msg) => {
                assert!(msg.starts_with("Expected 422, got HTTP 200"));
                assert!(msg.contains("success"));
            }
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[test]
    fn test_status_sets() {
        let expectation = Expectation::status_in(&[400, 422]);
        assert!(expectation
            .evaluate(&ApiResponse::new(400, ResponseBody::Empty))
            .is_pass());
        assert!(expectation
            .evaluate(&ApiResponse::new(422, ResponseBody::Empty))
            .is_pass());
        let verdict = expectation.evaluate(&ApiResponse::new(500, ResponseBody::Empty));
        assert_eq!(verdict, Verdict::Fail("Expected 400/422, got HTTP 500".into()));

        assert!(StatusExpectation::NotServerError.matches(404));
        assert!(!StatusExpectation::NotServerError.matches(503));
    }

    #[test]
    fn test_checkout_shape() {
        let expectation = Expectation::status(200)
            .require(&["success", "checkout_url", "session_id"])
            .equals("success", json!(true))
            .starts_with("checkout_url", "http");

        let ok = json_response(
            200,
            json!({
                "success": true,
                "checkout_url": "https://checkout.stripe.com/pay/cs_test_1",
                "session_id": "cs_test_1"
            }),
        );
        assert!(expectation.evaluate(&ok).is_pass());

        let missing = json_response(200, json!({"success": true}));
        assert_eq!(
            expectation.evaluate(&missing),
            Verdict::Fail(r#"Missing response fields: ["checkout_url", "session_id"]"#.into())
        );

        let bad_url = json_response(
            200,
            json!({"success": true, "checkout_url": "ftp://x", "session_id": "s"}),
        );
        assert!(!expectation.evaluate(&bad_url).is_pass());
    }

    #[test]
    fn test_body_checks_need_json() {
        let expectation = Expectation::status(400).contains("detail", "Plano inválido");
        let verdict = expectation.evaluate(&ApiResponse::new(
            400,
            ResponseBody::Text("Bad Request".into()),
        ));
        assert_eq!(
            verdict,
            Verdict::Fail("Expected a JSON body, got HTTP 400: Bad Request".into())
        );

        let verdict = expectation.evaluate(&json_response(
            400,
            json!({"detail": "Plano inválido. Escolha: starter, business, enterprise"}),
        ));
        assert!(verdict.is_pass());
    }

    #[test]
    fn test_non_empty() {
        let expectation = Expectation::status(200).non_empty("packages");
        assert!(!expectation
            .evaluate(&json_response(200, json!({"packages": []})))
            .is_pass());
        assert!(expectation
            .evaluate(&json_response(200, json!({"packages": [{"id": "a"}]})))
            .is_pass());
    }
}
