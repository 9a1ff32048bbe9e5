//! Configuration file handling
//!
//! Values are layered: built-in defaults, then the TOML file, then
//! environment variables, then command-line flags.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use super::paths::config_path;
use super::{Error, Result};

/// Environment variable naming the backend base URL
pub const BASE_URL_ENV: &str = "SCENARIOS_BASE_URL";

/// Fallback variable used by the frontend `.env` files
pub const FRONTEND_BASE_URL_ENV: &str = "EXPO_PUBLIC_BACKEND_URL";

/// Main configuration structure
#[derive(Debug, Deserialize, Serialize, Default, Clone)]
pub struct Config {
    /// Where the system under test lives
    #[serde(default)]
    pub target: TargetConfig,

    /// HTTP client settings
    #[serde(default)]
    pub http: HttpConfig,

    /// Values the built-in suites send and compare against
    #[serde(default)]
    pub params: ScenarioParams,
}

/// Location of the system under test
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct TargetConfig {
    /// Base URL of the backend, without the API prefix
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Path prefix prepended to every endpoint
    #[serde(default = "default_api_prefix")]
    pub api_prefix: String,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_prefix: default_api_prefix(),
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:8001".to_string()
}
fn default_api_prefix() -> String {
    "/api".to_string()
}

/// HTTP client settings
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct HttpConfig {
    /// Deadline for a single request, in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// User-Agent header sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: default_request_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_request_timeout() -> u64 {
    30
}
fn default_user_agent() -> String {
    format!("backend-scenarios/{}", env!("CARGO_PKG_VERSION"))
}

/// Pricing of a corporate plan as the backend is expected to apply it
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct PlanParams {
    /// Monthly price per employee, in BRL
    pub price_per_employee: u32,
    /// Employee count used by the price calculation scenario
    #[serde(default = "default_sample_employees")]
    pub sample_employees: u32,
}

fn default_sample_employees() -> u32 {
    50
}

/// Scenario parameters shared by the built-in suites
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ScenarioParams {
    /// `origin_url` sent to checkout endpoints
    #[serde(default = "default_origin_url")]
    pub origin_url: String,

    /// Substring expected in the `detail` of an invalid plan rejection
    #[serde(default = "default_invalid_plan_marker")]
    pub invalid_plan_marker: String,

    /// Checkout session id that the backend has never issued
    #[serde(default = "default_dummy_session_id")]
    pub dummy_session_id: String,

    /// Ebook used when the package listing yields no id
    #[serde(default = "default_ebook_id")]
    pub default_ebook_id: String,

    /// Password used for the throwaway test account
    #[serde(default = "default_test_password")]
    pub test_password: String,

    /// Corporate plans keyed by plan id
    #[serde(default = "default_plans")]
    pub plans: BTreeMap<String, PlanParams>,
}

impl Default for ScenarioParams {
    fn default() -> Self {
        Self {
            origin_url: default_origin_url(),
            invalid_plan_marker: default_invalid_plan_marker(),
            dummy_session_id: default_dummy_session_id(),
            default_ebook_id: default_ebook_id(),
            test_password: default_test_password(),
            plans: default_plans(),
        }
    }
}

fn default_origin_url() -> String {
    "http://localhost:8080".to_string()
}
fn default_invalid_plan_marker() -> String {
    "Plano inválido".to_string()
}
fn default_dummy_session_id() -> String {
    "cs_test_dummy_session_id".to_string()
}
fn default_ebook_id() -> String {
    "mindfulness".to_string()
}
fn default_test_password() -> String {
    "Scenario#2024".to_string()
}
fn default_plans() -> BTreeMap<String, PlanParams> {
    let mut plans = BTreeMap::new();
    plans.insert(
        "starter".to_string(),
        PlanParams {
            price_per_employee: 15,
            sample_employees: 10,
        },
    );
    plans.insert(
        "business".to_string(),
        PlanParams {
            price_per_employee: 12,
            sample_employees: 50,
        },
    );
    plans.insert(
        "enterprise".to_string(),
        PlanParams {
            price_per_employee: 8,
            sample_employees: 100,
        },
    );
    plans
}

/// Overrides collected from the command line
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub base_url: Option<String>,
    pub request_timeout_secs: Option<u64>,
}

impl Config {
    /// Load configuration from `path`, or from the default config file
    ///
    /// Returns default configuration if no file exists. An explicit path that
    /// does not exist is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path: Option<PathBuf> = match path {
            Some(p) => {
                if !p.exists() {
                    return Err(Error::Config(format!(
                        "Config file '{}' does not exist",
                        p.display()
                    )));
                }
                Some(p.to_path_buf())
            }
            None => config_path().filter(|p| p.exists()),
        };

        match path {
            Some(path) => {
                let content = std::fs::read_to_string(&path).map_err(|e| Error::FileRead {
                    path: path.display().to_string(),
                    error: e.to_string(),
                })?;
                Self::from_toml(&content)
            }
            None => Ok(Self::default()),
        }
    }

    /// Parse configuration from TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::ConfigParse(e.to_string()))
    }

    /// Render the configuration as TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::Internal(e.to_string()))
    }

    /// Apply environment variables through `lookup`
    ///
    /// `SCENARIOS_BASE_URL` wins over `EXPO_PUBLIC_BACKEND_URL`.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let base_url = lookup(BASE_URL_ENV)
            .or_else(|| lookup(FRONTEND_BASE_URL_ENV))
            .filter(|v| !v.trim().is_empty());
        if let Some(url) = base_url {
            tracing::debug!(%url, "base URL taken from environment");
            self.target.base_url = url;
        }
    }

    /// Apply command-line overrides
    pub fn apply_overrides(&mut self, overrides: &Overrides) {
        if let Some(url) = &overrides.base_url {
            self.target.base_url = url.clone();
        }
        if let Some(secs) = overrides.request_timeout_secs {
            self.http.request_timeout_secs = secs;
        }
    }

    /// Full URL prefix every endpoint path is appended to
    pub fn api_base(&self) -> Result<String> {
        let base = self.target.base_url.trim().trim_end_matches('/');
        let parsed = reqwest::Url::parse(base).map_err(|e| Error::InvalidBaseUrl {
            url: base.to_string(),
            reason: e.to_string(),
        })?;
        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return Err(Error::InvalidBaseUrl {
                url: base.to_string(),
                reason: format!("unsupported scheme '{}'", parsed.scheme()),
            });
        }

        let prefix = self.target.api_prefix.trim().trim_end_matches('/');
        if prefix.is_empty() {
            Ok(base.to_string())
        } else if prefix.starts_with('/') {
            Ok(format!("{}{}", base, prefix))
        } else {
            Ok(format!("{}/{}", base, prefix))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_match_published_pricing() {
        let config = Config::default();
        assert_eq!(config.params.plans["starter"].price_per_employee, 15);
        assert_eq!(config.params.plans["business"].price_per_employee, 12);
        assert_eq!(config.params.plans["enterprise"].price_per_employee, 8);
        assert_eq!(config.http.request_timeout_secs, 30);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = Config::from_toml(
            r#"
[target]
base_url = "https://staging.example.com"

[params.plans.starter]
price_per_employee = 20
"#,
        )
        .unwrap();

        assert_eq!(config.target.base_url, "https://staging.example.com");
        assert_eq!(config.target.api_prefix, "/api");
        assert_eq!(config.params.plans.len(), 1);
        assert_eq!(config.params.plans["starter"].sample_employees, 50);
        assert_eq!(config.params.dummy_session_id, "cs_test_dummy_session_id");
    }

    #[test]
    fn test_invalid_toml_is_parse_error() {
        let err = Config::from_toml("[target\nbase_url = 1").unwrap_err();
        assert!(matches!(err, Error::ConfigParse(_)));
    }

    #[test]
    fn test_env_precedence() {
        let env: HashMap<&str, &str> = [
            (BASE_URL_ENV, "http://primary:9000"),
            (FRONTEND_BASE_URL_ENV, "http://frontend:9001"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.apply_env(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(config.target.base_url, "http://primary:9000");

        let mut config = Config::default();
        config.apply_env(|k| {
            (k == FRONTEND_BASE_URL_ENV).then(|| "http://frontend:9001".to_string())
        });
        assert_eq!(config.target.base_url, "http://frontend:9001");
    }

    #[test]
    fn test_overrides_win_over_env() {
        let mut config = Config::default();
        config.apply_env(|_| Some("http://env:1".to_string()));
        config.apply_overrides(&Overrides {
            base_url: Some("http://flag:2".to_string()),
            request_timeout_secs: Some(4),
        });
        assert_eq!(config.target.base_url, "http://flag:2");
        assert_eq!(config.http.request_timeout_secs, 4);
    }

    #[test]
    fn test_api_base_joins_prefix() {
        let mut config = Config::default();
        config.target.base_url = "http://localhost:8001/".to_string();
        assert_eq!(config.api_base().unwrap(), "http://localhost:8001/api");

        config.target.api_prefix = "v2/".to_string();
        assert_eq!(config.api_base().unwrap(), "http://localhost:8001/v2");

        config.target.api_prefix = String::new();
        assert_eq!(config.api_base().unwrap(), "http://localhost:8001");
    }

    #[test]
    fn test_api_base_rejects_bad_urls() {
        let mut config = Config::default();
        config.target.base_url = "not a url".to_string();
        assert!(matches!(
            config.api_base(),
            Err(Error::InvalidBaseUrl { .. })
        ));

        config.target.base_url = "ftp://files.example.com".to_string();
        assert!(matches!(
            config.api_base(),
            Err(Error::InvalidBaseUrl { .. })
        ));
    }

    #[test]
    fn test_toml_roundtrip_of_defaults() {
        let rendered = Config::default().to_toml().unwrap();
        let parsed = Config::from_toml(&rendered).unwrap();
        assert_eq!(parsed.params.plans, Config::default().params.plans);
    }
}
