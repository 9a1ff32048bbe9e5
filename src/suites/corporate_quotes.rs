//! Corporate quote scenarios (`POST /corporate/quote`, `GET /corporate/quotes`)

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::common::config::ScenarioParams;
use crate::common::Result;
use crate::harness::{
    ApiRequest, Check, Expectation, Outcome, Procedure, ProcedureGroup, ScenarioContext, Verdict,
};

use super::run_suffix;

const QUOTE_PATH: &str = "/corporate/quote";
const LIST_PATH: &str = "/corporate/quotes";

/// Fields the quote endpoint rejects with 422 when absent
pub const REQUIRED_FIELDS: &[&str] = &["company", "name", "email", "employees"];

/// Filters applied to the quote listing
#[derive(Debug, Clone, PartialEq)]
pub struct ListFilters {
    pub status: String,
    pub skip: u32,
    pub limit: u32,
}

impl Default for ListFilters {
    fn default() -> Self {
        Self {
            status: "pending".to_string(),
            skip: 0,
            limit: 5,
        }
    }
}

impl ListFilters {
    fn request(&self) -> ApiRequest {
        ApiRequest::get(LIST_PATH)
            .query("status", &self.status)
            .query("skip", self.skip)
            .query("limit", self.limit)
    }
}

/// Complete quote payload, including the optional fields the website sends
pub fn payload(company: &str, email: &str, employees: u32) -> Value {
    json!({
        "company": company,
        "name": "Mariana Costa",
        "email": email,
        "phone": "(11) 98765-4321",
        "employees": employees,
        "message": "Gostaríamos de uma demonstração para o time de RH.",
        "selectedPlan": "BUSINESS",
        "source": "corporate_website",
    })
}

fn post_name(case: &str) -> String {
    format!("POST {} - {}", QUOTE_PATH, case)
}

fn get_name(case: &str) -> String {
    format!("GET {} - {}", LIST_PATH, case)
}

fn listing() -> Expectation {
    Expectation::status(200).require(&["quotes", "total"])
}

pub fn groups(_params: &ScenarioParams) -> Vec<ProcedureGroup> {
    let base = payload("Quote Test Corp", "rh@quotetest.com", 120);

    let valid: Box<dyn Procedure> = Box::new(
        Check::new(
            post_name("Valid Request"),
            ApiRequest::post(QUOTE_PATH).json(payload(
                &format!("Quote Corp {}", run_suffix()),
                "contato@quotecorp.com",
                120,
            )),
            Expectation::status(200),
        )
        .pass_message("Quote request accepted"),
    );

    let mut validation: Vec<Box<dyn Procedure>> = REQUIRED_FIELDS
        .iter()
        .map(|field| {
            let mut body = base.clone();
            if let Some(map) = body.as_object_mut() {
                map.remove(*field);
            }
            Box::new(
                Check::new(
                    post_name(&format!("Missing Required Fields - Missing {}", field)),
                    ApiRequest::post(QUOTE_PATH).json(body),
                    Expectation::status(422),
                )
                .pass_message("Correctly rejected missing field"),
            ) as Box<dyn Procedure>
        })
        .collect();

    let mut bad_email = base.clone();
    bad_email["email"] = json!("not-an-email");
    validation.push(Box::new(
        Check::new(
            post_name("Invalid Email"),
            ApiRequest::post(QUOTE_PATH).json(bad_email),
            Expectation::status(422),
        )
        .pass_message("Correctly rejected invalid email format"),
    ));

    let listing_procedures: Vec<Box<dyn Procedure>> = vec![
        Box::new(
            Check::new(get_name("List"), ApiRequest::get(LIST_PATH), listing())
                .pass_message("Quote listing returned"),
        ),
        Box::new(FilteredListing::new(ListFilters::default())),
        Box::new(ConsistentTotals::new(ListFilters::default())),
    ];

    vec![
        ProcedureGroup::new("Quote requests", {
            let mut v = vec![valid];
            v.extend(validation);
            v
        }),
        ProcedureGroup::new("Quote listing", listing_procedures),
    ]
}

/// Listing with filters; the page must not exceed `limit`
pub struct FilteredListing {
    name: String,
    filters: ListFilters,
}

impl FilteredListing {
    pub fn new(filters: ListFilters) -> Self {
        Self {
            name: get_name("Filters"),
            filters,
        }
    }
}

#[async_trait]
impl Procedure for FilteredListing {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, ctx: &mut ScenarioContext) -> Result<()> {
        let response = ctx.send(&self.filters.request()).await?;

        let verdict = match listing().evaluate(&response) {
            Verdict::Pass(_) => {
                let count = response
                    .field("quotes")
                    .and_then(Value::as_array)
                    .map(|q| q.len());
                match count {
                    None => Verdict::Fail("Field 'quotes' is not an array".to_string()),
                    Some(n) if n > self.filters.limit as usize => Verdict::Fail(format!(
                        "Returned {} quotes with limit={}",
                        n, self.filters.limit
                    )),
                    Some(n) => Verdict::Pass(format!(
                        "Returned {} quotes for status={}, skip={}, limit={}",
                        n, self.filters.status, self.filters.skip, self.filters.limit
                    )),
                }
            }
            other => other,
        };

        let detail = (verdict.outcome() == Outcome::Fail).then(|| response.detail());
        ctx.record_verdict(&self.name, verdict, detail);
        Ok(())
    }
}

/// Two identical listings should report the same total
///
/// A difference is a warning: another client may have written in between.
pub struct ConsistentTotals {
    name: String,
    filters: ListFilters,
}

impl ConsistentTotals {
    pub fn new(filters: ListFilters) -> Self {
        Self {
            name: get_name("Consistent Totals"),
            filters,
        }
    }

    async fn total(&self, ctx: &ScenarioContext) -> Result<std::result::Result<Value, Verdict>> {
        let response = ctx.send(&self.filters.request()).await?;
        Ok(match listing().evaluate(&response) {
            Verdict::Pass(_) => Ok(response.field("total").cloned().unwrap_or(Value::Null)),
            other => Err(other),
        })
    }
}

#[async_trait]
impl Procedure for ConsistentTotals {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, ctx: &mut ScenarioContext) -> Result<()> {
        let first = self.total(ctx).await?;
        let second = self.total(ctx).await?;

        let verdict = match (first, second) {
            (Ok(a), Ok(b)) if a == b => Verdict::Pass(format!("Total stable across repeated queries ({})", a)),
            (Ok(a), Ok(b)) => Verdict::Warn(format!(
                "Total changed between identical queries ({} -> {})",
                a, b
            )),
            (Err(v), _) | (_, Err(v)) => v,
        };

        ctx.record_verdict(&self.name, verdict, None);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filters_become_query_parameters() {
        let request = ListFilters::default().request();
        assert_eq!(request.path, LIST_PATH);
        assert_eq!(
            request.query,
            vec![
                ("status".to_string(), "pending".to_string()),
                ("skip".to_string(), "0".to_string()),
                ("limit".to_string(), "5".to_string()),
            ]
        );
    }

    #[test]
    fn test_groups_cover_each_missing_field() {
        let groups = groups(&ScenarioParams::default());
        let names: Vec<&str> = groups[0].procedures.iter().map(|p| p.name()).collect();
        for field in REQUIRED_FIELDS {
            assert!(
                names.iter().any(|n| n.ends_with(&format!("Missing {}", field))),
                "no sub-case for {}",
                field
            );
        }
    }
}
