//! Session-scoped HTTP client for the system under test

use reqwest::Method;
use serde_json::Value;
use std::fmt;
use std::time::Duration;

use crate::common::config::Config;
use crate::common::{truncate_body, Error, Result};

use super::expect::lookup;

/// Body attached to an outgoing request
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Empty,
    Json(Value),
    /// Sent verbatim with a JSON content type, used for malformed payloads
    Raw(String),
}

/// A request described independently of the client
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub body: RequestBody,
    /// Attach the bearer credential from the scenario context
    pub auth: bool,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            headers: Vec::new(),
            body: RequestBody::Empty,
            auth: false,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn json(mut self, body: Value) -> Self {
        self.body = RequestBody::Json(body);
        self
    }

    pub fn raw(mut self, body: impl Into<String>) -> Self {
        self.body = RequestBody::Raw(body.into());
        self
    }

    pub fn query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn authenticated(mut self) -> Self {
        self.auth = true;
        self
    }
}

impl fmt::Display for ApiRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.path)
    }
}

/// Decoded response body
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    Empty,
    Json(Value),
    /// Body that did not decode as JSON, kept verbatim
    Text(String),
}

impl ResponseBody {
    /// Decode as JSON, falling back to the raw text
    pub fn from_bytes(bytes: &[u8]) -> Self {
        if bytes.iter().all(|b| b.is_ascii_whitespace()) {
            return ResponseBody::Empty;
        }
        match serde_json::from_slice::<Value>(bytes) {
            Ok(value) => ResponseBody::Json(value),
            Err(_) => ResponseBody::Text(String::from_utf8_lossy(bytes).into_owned()),
        }
    }
}

/// Status and body of a completed request
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    pub body: ResponseBody,
}

impl ApiResponse {
    pub fn new(status: u16, body: ResponseBody) -> Self {
        Self { status, body }
    }

    pub fn json(&self) -> Option<&Value> {
        match &self.body {
            ResponseBody::Json(v) => Some(v),
            _ => None,
        }
    }

    /// Field addressed by a dotted path, e.g. `data.items.0.id`
    pub fn field(&self, path: &str) -> Option<&Value> {
        self.json().and_then(|v| lookup(v, path))
    }

    /// String field, if present and a string
    pub fn str_field(&self, path: &str) -> Option<&str> {
        self.field(path).and_then(Value::as_str)
    }

    /// Body rendered as text for messages
    pub fn text(&self) -> String {
        match &self.body {
            ResponseBody::Empty => String::new(),
            ResponseBody::Json(v) => v.to_string(),
            ResponseBody::Text(t) => t.clone(),
        }
    }

    /// Body as a detail payload for the ledger
    pub fn detail(&self) -> Value {
        match &self.body {
            ResponseBody::Json(v) => v.clone(),
            ResponseBody::Text(t) => serde_json::json!({ "body": truncate_body(t, 500) }),
            ResponseBody::Empty => Value::Null,
        }
    }

    /// Short `HTTP <status>: <body>` description
    pub fn describe(&self) -> String {
        let text = self.text();
        if text.is_empty() {
            format!("HTTP {}", self.status)
        } else {
            format!("HTTP {}: {}", self.status, truncate_body(&text, 200))
        }
    }
}

/// HTTP client bound to the API base of one target
pub struct ApiClient {
    http: reqwest::Client,
    api_base: String,
    timeout_secs: u64,
}

impl ApiClient {
    /// Build a client from configuration
    pub fn from_config(config: &Config) -> Result<Self> {
        let api_base = config.api_base()?;
        let timeout_secs = config.http.request_timeout_secs;

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(config.http.user_agent.clone())
            .build()
            .map_err(|e| Error::Setup(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            api_base,
            timeout_secs,
        })
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    pub fn timeout_secs(&self) -> u64 {
        self.timeout_secs
    }

    /// Absolute URL of an endpoint path
    pub fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.api_base, path)
        } else {
            format!("{}/{}", self.api_base, path)
        }
    }

    /// Issue one request and wait for the full response
    pub async fn send(&self, request: &ApiRequest, token: Option<&str>) -> Result<ApiResponse> {
        let url = self.url(&request.path);

        let mut builder = self.http.request(request.method.clone(), &url);
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if request.auth {
            if let Some(token) = token {
                builder = builder.bearer_auth(token);
            }
        }
        builder = match &request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(value) => builder.json(value),
            RequestBody::Raw(text) => builder
                .header(reqwest::header::CONTENT_TYPE, "application/json")
                .body(text.clone()),
        };

        tracing::debug!(method = %request.method, %url, "sending request");

        let response = builder
            .send()
            .await
            .map_err(|e| Error::from_reqwest(&url, e, self.timeout_secs))?;
        let status = response.status().as_u16();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::from_reqwest(&url, e, self.timeout_secs))?;

        let body = ResponseBody::from_bytes(&bytes);
        tracing::debug!(status, bytes = bytes.len(), "response received");

        Ok(ApiResponse::new(status, body))
    }
}

impl fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiClient")
            .field("api_base", &self.api_base)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_body_decode_falls_back_to_text() {
        assert_eq!(
            ResponseBody::from_bytes(br#"{"success": true}"#),
            ResponseBody::Json(json!({"success": true}))
        );
        assert_eq!(
            ResponseBody::from_bytes(b"Internal Server Error"),
            ResponseBody::Text("Internal Server Error".to_string())
        );
        assert_eq!(ResponseBody::from_bytes(b"  \n"), ResponseBody::Empty);
    }

    #[test]
    fn test_response_field_access() {
        let response = ApiResponse::new(
            200,
            ResponseBody::Json(json!({
                "success": true,
                "checkout_url": "https://checkout.stripe.com/c/pay/cs_1",
                "items": [{"id": "mindfulness"}]
            })),
        );
        assert_eq!(response.field("success"), Some(&json!(true)));
        assert_eq!(response.str_field("items.0.id"), Some("mindfulness"));
        assert!(response.field("session_id").is_none());
    }

    #[test]
    fn test_text_body_detail_and_describe() {
        let response = ApiResponse::new(502, ResponseBody::Text("Bad Gateway".into()));
        assert!(response.json().is_none());
        assert_eq!(response.detail(), json!({"body": "Bad Gateway"}));
        assert_eq!(response.describe(), "HTTP 502: Bad Gateway");

        let empty = ApiResponse::new(204, ResponseBody::Empty);
        assert_eq!(empty.describe(), "HTTP 204");
    }

    #[test]
    fn test_url_joining() {
        let mut config = Config::default();
        config.target.base_url = "http://127.0.0.1:9999".into();
        let client = ApiClient::from_config(&config).unwrap();
        assert_eq!(
            client.url("/corporate/checkout"),
            "http://127.0.0.1:9999/api/corporate/checkout"
        );
        assert_eq!(client.url("me"), "http://127.0.0.1:9999/api/me");
    }

    #[test]
    fn test_request_builder_display() {
        let request = ApiRequest::get("/corporate/quotes")
            .query("limit", 5)
            .authenticated();
        assert_eq!(request.to_string(), "GET /corporate/quotes");
        assert_eq!(request.query, vec![("limit".to_string(), "5".to_string())]);
        assert!(request.auth);
    }
}
