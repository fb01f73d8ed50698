use napi::Result as NapiResult;
use napi_derive::napi;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use finplan_core::loan::{amortization, analysis, summary};
use finplan_core::sip::{goal, planner, projection, xirr};

/// Convert any Display error into a napi::Error.
fn to_napi_error(e: impl std::fmt::Display) -> napi::Error {
    napi::Error::from_reason(e.to_string())
}

// ---------------------------------------------------------------------------
// Loan
// ---------------------------------------------------------------------------

#[napi]
pub fn analyze_loan(input_json: String) -> NapiResult<String> {
    let input: analysis::LoanInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = analysis::analyze_loan(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn simulate_loan(input_json: String) -> NapiResult<String> {
    let input: analysis::LoanInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let schedule = amortization::simulate(
        input.principal,
        input.annual_rate,
        input.tenure_months,
        &input.prepayments,
    )
    .map_err(to_napi_error)?;
    serde_json::to_string(&schedule).map_err(to_napi_error)
}

#[napi]
pub fn summarize_loan(input_json: String) -> NapiResult<String> {
    let input: analysis::LoanInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let schedule = amortization::simulate(
        input.principal,
        input.annual_rate,
        input.tenure_months,
        &input.prepayments,
    )
    .map_err(to_napi_error)?;
    let output = summary::summarize(
        input.principal,
        input.annual_rate,
        input.tenure_months,
        &schedule.payments,
        &schedule.impacts,
    )
    .map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// SIP
// ---------------------------------------------------------------------------

#[napi]
pub fn plan_sip(input_json: String) -> NapiResult<String> {
    let input: planner::SipInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = planner::plan_sip(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn project_sip(input_json: String) -> NapiResult<String> {
    let params: projection::SipParams = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = projection::project(&params).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[derive(Deserialize)]
struct GoalBindingInput {
    #[serde(flatten)]
    params: projection::SipParams,
    target_corpus: Decimal,
}

#[napi]
pub fn find_required_monthly_investment(input_json: String) -> NapiResult<String> {
    let binding_input: GoalBindingInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = goal::find_required_monthly_investment(binding_input.target_corpus, &binding_input.params)
        .map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[derive(Deserialize)]
struct XirrBindingInput {
    #[serde(flatten)]
    params: projection::SipParams,
    final_corpus: Decimal,
}

#[derive(Serialize)]
struct XirrBindingOutput {
    xirr: Decimal,
}

#[napi]
pub fn compute_xirr(input_json: String) -> NapiResult<String> {
    let binding_input: XirrBindingInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let xirr = xirr::compute_xirr(&binding_input.params, binding_input.final_corpus).map_err(to_napi_error)?;
    let output = XirrBindingOutput { xirr };
    serde_json::to_string(&output).map_err(to_napi_error)
}
