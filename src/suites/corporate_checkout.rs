//! Corporate checkout scenarios (`POST /corporate/checkout`)

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::common::config::{PlanParams, ScenarioParams};
use crate::common::Result;
use crate::harness::{
    ApiRequest, Check, Expectation, Outcome, Procedure, ProcedureGroup, ScenarioContext, Verdict,
};

use super::run_suffix;

const PATH: &str = "/corporate/checkout";

/// Fields the endpoint rejects with 422 when absent
pub const REQUIRED_FIELDS: &[&str] = &["company", "name", "email", "employees", "plan", "origin_url"];

fn test_name(case: &str) -> String {
    format!("POST {} - {}", PATH, case)
}

/// Complete checkout payload
pub fn payload(company: &str, name: &str, email: &str, employees: u32, plan: &str, origin_url: &str) -> Value {
    json!({
        "company": company,
        "name": name,
        "email": email,
        "phone": "(11) 99887-7665",
        "employees": employees,
        "plan": plan,
        "origin_url": origin_url,
    })
}

/// Copy of `payload` without `field`
pub fn without(payload: &Value, field: &str) -> Value {
    let mut copy = payload.clone();
    if let Some(map) = copy.as_object_mut() {
        map.remove(field);
    }
    copy
}

fn reference_payload(params: &ScenarioParams) -> Value {
    payload(
        "Tech Solutions Inc",
        "Carlos Silva",
        "carlos@techsolutions.com",
        75,
        "business",
        &params.origin_url,
    )
}

fn created() -> Expectation {
    Expectation::status(200)
        .require(&["success", "checkout_url", "session_id"])
        .equals("success", json!(true))
        .starts_with("checkout_url", "http")
}

fn accepted() -> Expectation {
    Expectation::status(200).equals("success", json!(true))
}

pub fn groups(params: &ScenarioParams) -> Vec<ProcedureGroup> {
    vec![
        ProcedureGroup::new("Basic functionality", vec![valid_request(params)]),
        ProcedureGroup::new("Validation", validation(params)),
        ProcedureGroup::new("Business logic", price_calculation(params)),
        ProcedureGroup::new("Database integration", vec![persistence(params)]),
        ProcedureGroup::new("Error handling", error_handling()),
    ]
}

fn valid_request(params: &ScenarioParams) -> Box<dyn Procedure> {
    Box::new(
        Check::new(
            test_name("Valid Request"),
            ApiRequest::post(PATH).json(reference_payload(params)),
            created(),
        )
        .pass_message("Corporate checkout created successfully")
        .capture("corporate_session_id", "session_id"),
    )
}

fn validation(params: &ScenarioParams) -> Vec<Box<dyn Procedure>> {
    let mut procedures: Vec<Box<dyn Procedure>> = Vec::new();

    let base = payload(
        "Test Corp",
        "Carlos Silva",
        "carlos@test.com",
        75,
        "business",
        &params.origin_url,
    );
    for field in REQUIRED_FIELDS {
        procedures.push(Box::new(
            Check::new(
                test_name(&format!("Missing Required Fields - Missing {}", field)),
                ApiRequest::post(PATH).json(without(&base, field)),
                Expectation::status(422),
            )
            .pass_message("Correctly rejected missing field"),
        ));
    }

    let mut invalid_plan = reference_payload(params);
    invalid_plan["plan"] = json!("invalid_plan");
    procedures.push(Box::new(
        Check::new(
            test_name("Invalid Plan"),
            ApiRequest::post(PATH).json(invalid_plan),
            Expectation::status(400).contains("detail", params.invalid_plan_marker.clone()),
        )
        .pass_message("Correctly rejected invalid plan"),
    ));

    for plan in params.plans.keys() {
        procedures.push(Box::new(
            Check::new(
                test_name(&format!("Valid Plans - {}", plan)),
                ApiRequest::post(PATH).json(payload(
                    &format!("Test Company {}", plan),
                    "Test User",
                    &format!("test.{}@company.com", plan),
                    50,
                    plan,
                    &params.origin_url,
                )),
                accepted(),
            )
            .pass_message(format!("Plan '{}' accepted successfully", plan)),
        ));
    }

    let mut bad_email = reference_payload(params);
    bad_email["email"] = json!("invalid-email");
    procedures.push(Box::new(
        Check::new(
            test_name("Invalid Data Types - Invalid Email"),
            ApiRequest::post(PATH).json(bad_email),
            Expectation::status(422),
        )
        .pass_message("Correctly rejected invalid email format"),
    ));

    let mut bad_employees = reference_payload(params);
    bad_employees["employees"] = json!("not-a-number");
    procedures.push(Box::new(
        Check::new(
            test_name("Invalid Data Types - Invalid Employees"),
            ApiRequest::post(PATH).json(bad_employees),
            Expectation::status(422),
        )
        .pass_message("Correctly rejected invalid employee count"),
    ));

    procedures.push(Box::new(
        Check::new(
            test_name("Optional Phone Field"),
            ApiRequest::post(PATH).json(without(&reference_payload(params), "phone")),
            accepted(),
        )
        .pass_message("Successfully handled missing optional phone field"),
    ));

    procedures
}

/// Checkout for one plan, compared against the configured price
pub struct PriceCalculation {
    name: String,
    plan: String,
    pricing: PlanParams,
    origin_url: String,
}

impl PriceCalculation {
    pub fn new(plan: &str, pricing: PlanParams, origin_url: &str) -> Self {
        Self {
            name: format!("Price Calculation - {}", plan),
            plan: plan.to_string(),
            pricing,
            origin_url: origin_url.to_string(),
        }
    }

    /// Expected monthly total in BRL
    pub fn expected_total(&self) -> u64 {
        u64::from(self.pricing.sample_employees) * u64::from(self.pricing.price_per_employee)
    }
}

/// Amount reported by the backend, if any, in BRL
///
/// `total` is always BRL. An integer `amount` is Stripe-style cents; a
/// fractional one is taken as BRL.
fn reported_total(body: &Value) -> Option<f64> {
    if let Some(total) = body.get("total").and_then(Value::as_f64) {
        return Some(total);
    }
    match body.get("amount")? {
        Value::Number(n) if n.is_i64() || n.is_u64() => n.as_f64().map(|cents| cents / 100.0),
        Value::Number(n) => n.as_f64(),
        _ => None,
    }
}

#[async_trait]
impl Procedure for PriceCalculation {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, ctx: &mut ScenarioContext) -> Result<()> {
        let request = ApiRequest::post(PATH).json(payload(
            &format!("Price Test {}", self.plan),
            "Test User",
            &format!("test@{}.com", self.plan),
            self.pricing.sample_employees,
            &self.plan,
            &self.origin_url,
        ));

        let response = ctx.send(&request).await?;
        let expected = self.expected_total();

        let verdict = match accepted().evaluate(&response) {
            Verdict::Pass(_) => match response.json().and_then(reported_total) {
                Some(reported) if (reported - expected as f64).abs() > 0.01 => Verdict::Warn(format!(
                    "Backend reports {:.2} BRL for {} employees, expected {} BRL",
                    reported, self.pricing.sample_employees, expected
                )),
                _ => Verdict::Pass(format!(
                    "Price calculation appears correct for {} employees (expected total: {} BRL)",
                    self.pricing.sample_employees, expected
                )),
            },
            other => other,
        };

        let detail = (verdict.outcome() != Outcome::Pass).then(|| response.detail());
        ctx.record_verdict(&self.name, verdict, detail);
        Ok(())
    }
}

fn price_calculation(params: &ScenarioParams) -> Vec<Box<dyn Procedure>> {
    params
        .plans
        .iter()
        .map(|(plan, pricing)| {
            Box::new(PriceCalculation::new(plan, pricing.clone(), &params.origin_url))
                as Box<dyn Procedure>
        })
        .collect()
}

fn persistence(params: &ScenarioParams) -> Box<dyn Procedure> {
    let mut body = payload(
        &format!("DB Test Corp {}", run_suffix()),
        "DB Test User",
        "dbtest@company.com",
        25,
        "starter",
        &params.origin_url,
    );
    body["phone"] = json!("(11) 99999-9999");

    Box::new(
        Check::new(
            "Database Persistence - Corporate Transactions",
            ApiRequest::post(PATH).json(body),
            accepted().non_empty("session_id"),
        )
        .pass_message("Corporate transaction appears to be saved (checkout successful)"),
    )
}

fn error_handling() -> Vec<Box<dyn Procedure>> {
    vec![
        Box::new(
            Check::new(
                "Error Handling - Malformed JSON",
                ApiRequest::post(PATH).raw("invalid json"),
                Expectation::status_in(&[400, 422]),
            )
            .pass_message("Correctly rejected malformed JSON"),
        ),
        Box::new(
            Check::new(
                "Error Handling - Empty Body",
                ApiRequest::post(PATH).json(json!({})),
                Expectation::status(422),
            )
            .pass_message("Correctly rejected empty request body"),
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_without_removes_only_one_field() {
        let full = payload("Acme", "Ana", "ana@acme.com", 10, "starter", "http://localhost:8080");
        let missing = without(&full, "plan");
        assert!(missing.get("plan").is_none());
        assert_eq!(missing["company"], "Acme");
        assert_eq!(full["plan"], "starter");
    }

    #[test]
    fn test_expected_totals_follow_params() {
        let params = ScenarioParams::default();
        let totals: Vec<(String, u64)> = params
            .plans
            .iter()
            .map(|(plan, pricing)| {
                let calc = PriceCalculation::new(plan, pricing.clone(), &params.origin_url);
                (plan.clone(), calc.expected_total())
            })
            .collect();
        assert!(totals.contains(&("starter".to_string(), 150)));
        assert!(totals.contains(&("business".to_string(), 600)));
        assert!(totals.contains(&("enterprise".to_string(), 800)));
    }

    #[test]
    fn test_reported_total() {
        assert_eq!(reported_total(&json!({"total": 600.0})), Some(600.0));
        assert_eq!(reported_total(&json!({"amount": 60000})), Some(600.0));
        assert_eq!(reported_total(&json!({"amount": 600.5})), Some(600.5));
        assert_eq!(reported_total(&json!({"amount": "600"})), None);
        assert_eq!(reported_total(&json!({"success": true})), None);
    }

    #[test]
    fn test_validation_has_one_check_per_sub_case() {
        let params = ScenarioParams::default();
        let procedures = validation(&params);
        // six missing fields, invalid plan, three plans, two bad types, optional phone
        assert_eq!(procedures.len(), 6 + 1 + 3 + 2 + 1);
        assert!(procedures[0].name().ends_with("Missing company"));
    }
}
