//! Built-in scenario suites
//!
//! Each suite targets one endpoint family of the backend and expands into
//! ordered procedure groups sharing the run's session.

pub mod corporate_checkout;
pub mod corporate_quotes;
pub mod payments;

use serde::Serialize;

use crate::common::config::ScenarioParams;
use crate::common::{Error, Result};
use crate::harness::ProcedureGroup;

/// An endpoint exercised by a suite
#[derive(Debug, Clone, Serialize)]
pub struct Endpoint {
    pub method: &'static str,
    pub path: &'static str,
    /// Whether the endpoint needs the bearer credential
    pub auth: bool,
}

/// Information about a suite
#[derive(Debug, Clone, Serialize)]
pub struct SuiteInfo {
    /// Unique identifier used on the command line
    pub id: &'static str,
    /// Display name
    pub name: &'static str,
    pub description: &'static str,
    pub endpoints: &'static [Endpoint],
}

/// All available suites, in default run order
static SUITES: &[SuiteInfo] = &[
    SuiteInfo {
        id: "corporate-checkout",
        name: "CORPORATE CHECKOUT",
        description: "Checkout creation, field validation, plans and pricing",
        endpoints: &[Endpoint {
            method: "POST",
            path: "/corporate/checkout",
            auth: false,
        }],
    },
    SuiteInfo {
        id: "corporate-quotes",
        name: "CORPORATE QUOTES",
        description: "Quote requests and the quote listing with filters",
        endpoints: &[
            Endpoint {
                method: "POST",
                path: "/corporate/quote",
                auth: false,
            },
            Endpoint {
                method: "GET",
                path: "/corporate/quotes",
                auth: false,
            },
        ],
    },
    SuiteInfo {
        id: "payments",
        name: "PAYMENTS",
        description: "Account setup, ebook packages, Stripe checkout sessions and webhook",
        endpoints: &[
            Endpoint {
                method: "POST",
                path: "/register",
                auth: false,
            },
            Endpoint {
                method: "POST",
                path: "/login",
                auth: false,
            },
            Endpoint {
                method: "GET",
                path: "/me",
                auth: true,
            },
            Endpoint {
                method: "GET",
                path: "/payments/packages",
                auth: false,
            },
            Endpoint {
                method: "POST",
                path: "/payments/checkout/session",
                auth: true,
            },
            Endpoint {
                method: "GET",
                path: "/payments/checkout/status/{id}",
                auth: true,
            },
            Endpoint {
                method: "POST",
                path: "/webhook/stripe",
                auth: false,
            },
        ],
    },
];

/// Get all suites
pub fn all() -> &'static [SuiteInfo] {
    SUITES
}

/// Find a suite by id
pub fn find(id: &str) -> Option<&'static SuiteInfo> {
    SUITES.iter().find(|s| s.id == id)
}

/// Resolve requested ids into suites, keeping request order
///
/// An empty request selects every suite. Duplicates are dropped.
pub fn resolve(ids: &[String]) -> Result<Vec<&'static SuiteInfo>> {
    if ids.is_empty() {
        return Ok(SUITES.iter().collect());
    }

    let mut selected: Vec<&'static SuiteInfo> = Vec::new();
    for id in ids {
        let suite = find(id).ok_or_else(|| {
            let available: Vec<&str> = SUITES.iter().map(|s| s.id).collect();
            Error::unknown_suite(id, &available)
        })?;
        if !selected.iter().any(|s| s.id == suite.id) {
            selected.push(suite);
        }
    }
    Ok(selected)
}

/// Expand a suite into its procedure groups
pub fn build(suite: &SuiteInfo, params: &ScenarioParams) -> Vec<ProcedureGroup> {
    let groups = match suite.id {
        "corporate-checkout" => corporate_checkout::groups(params),
        "corporate-quotes" => corporate_quotes::groups(params),
        "payments" => payments::groups(params),
        _ => Vec::new(),
    };

    groups
        .into_iter()
        .map(|mut g| {
            g.title = g.title.map(|t| format!("{} / {}", suite.name, t));
            g
        })
        .collect()
}

/// Suffix that makes generated identities unique per run
pub(crate) fn run_suffix() -> String {
    chrono::Utc::now().format("%Y%m%d%H%M%S%3f").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_suite_ids_are_unique() {
        let mut ids: Vec<&str> = all().iter().map(|s| s.id).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), all().len());
    }

    #[test]
    fn test_resolve_defaults_to_all() {
        let suites = resolve(&[]).unwrap();
        assert_eq!(suites.len(), all().len());
        assert_eq!(suites[0].id, "corporate-checkout");
    }

    #[test]
    fn test_resolve_keeps_order_and_dedups() {
        let ids = vec![
            "payments".to_string(),
            "corporate-quotes".to_string(),
            "payments".to_string(),
        ];
        let suites = resolve(&ids).unwrap();
        let ids: Vec<&str> = suites.iter().map(|s| s.id).collect();
        assert_eq!(ids, ["payments", "corporate-quotes"]);
    }

    #[test]
    fn test_resolve_unknown() {
        let err = resolve(&["billing".to_string()]).unwrap_err();
        assert!(matches!(err, Error::UnknownSuite { .. }));
    }

    #[test]
    fn test_every_suite_builds_procedures() {
        let params = ScenarioParams::default();
        for suite in all() {
            let groups = build(suite, &params);
            assert!(!groups.is_empty(), "suite {} has no groups", suite.id);
            for group in &groups {
                assert!(group.title.as_deref().unwrap_or("").starts_with(suite.name));
                assert!(!group.procedures.is_empty());
            }
        }
    }
}
