//! SIP planning: wealth or goal mode, with a flat comparison, XIRR and the
//! cost of starting late.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use super::goal::{find_required_monthly_investment, GoalSeek};
use super::projection::{project, SipParams, SipYearProjection, StepUpMode};
use super::xirr::compute_xirr;
use crate::error::FinPlanError;
use crate::time_value::round_cents;
use crate::types::{with_metadata, ComputationOutput, Money, Percent};
use crate::FinPlanResult;

/// Start delays (years) compared in the delay-cost table.
const DELAY_YEARS: [u32; 6] = [0, 1, 2, 3, 5, 10];

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Whether the monthly contribution is given or solved for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlannerMode {
    /// Project the given monthly contribution.
    #[default]
    Wealth,
    /// Find the monthly contribution that reaches `target_corpus`.
    Goal,
}

/// Input parameters for SIP planning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SipInput {
    pub monthly_investment: Money,
    pub tenure_years: Decimal,
    /// Expected annual return in percent.
    pub annual_return: Percent,
    #[serde(default)]
    pub lumpsum_amount: Money,
    #[serde(default)]
    pub step_up_mode: StepUpMode,
    #[serde(default)]
    pub step_up_value: Decimal,
    #[serde(default)]
    pub inflation_enabled: bool,
    #[serde(default)]
    pub inflation_rate: Percent,
    #[serde(default)]
    pub mode: PlannerMode,
    #[serde(default)]
    pub target_corpus: Money,
}

/// Cost of starting the SIP later.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DelayCostEntry {
    pub delay_years: u32,
    pub corpus: Money,
    pub total_invested: Money,
    /// Corpus given up versus starting now.
    pub loss: Money,
}

/// Top-level output from `plan_sip`. Money figures are in cents.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SipPlan {
    pub estimated_corpus: Money,
    pub total_invested: Money,
    pub wealth_gained: Money,
    /// Final corpus in today's money.
    pub purchasing_power: Money,
    /// Solved contribution in goal mode, zero otherwise.
    pub required_monthly_investment: Money,
    pub final_monthly_investment: Money,
    pub goal_gap: Money,
    pub yearly_breakdown: Vec<SipYearProjection>,
    /// The same plan without step-up, for comparison.
    pub flat_yearly_breakdown: Vec<SipYearProjection>,
    pub flat_corpus: Money,
    pub flat_wealth_gained: Money,
    /// Annualized return in percent.
    pub xirr: Percent,
    /// Wealth gained as a percent of total invested.
    pub absolute_return: Percent,
    pub delay_cost: Vec<DelayCostEntry>,
}

// ---------------------------------------------------------------------------
// Core function
// ---------------------------------------------------------------------------

impl SipInput {
    /// Projection parameters for a given monthly contribution.
    pub fn params(&self, monthly_investment: Money) -> SipParams {
        SipParams {
            monthly_investment,
            tenure_years: self.tenure_years,
            annual_return: self.annual_return,
            lumpsum: self.lumpsum_amount,
            step_up_mode: self.step_up_mode,
            step_up_value: self.step_up_value,
            inflation_rate: self.inflation_rate,
            inflation_enabled: self.inflation_enabled,
        }
    }
}

/// Project a SIP (or solve for its contribution in goal mode) with a flat
/// comparison, XIRR and delay-cost table.
pub fn plan_sip(input: &SipInput) -> FinPlanResult<ComputationOutput<SipPlan>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    validate(input)?;

    let required_monthly_investment = match input.mode {
        PlannerMode::Wealth => Decimal::ZERO,
        PlannerMode::Goal => {
            if input.target_corpus <= Decimal::ZERO {
                warnings.push("Target corpus is not positive; no monthly investment is required".into());
            }
            match find_required_monthly_investment(input.target_corpus, &input.params(input.monthly_investment))? {
                GoalSeek::Found(required) => required,
                GoalSeek::Unreachable { ceiling, best_corpus } => {
                    return Err(FinPlanError::GoalUnreachable {
                        target: input.target_corpus,
                        ceiling,
                        best_corpus: round_cents(best_corpus),
                    });
                }
            }
        }
    };
    let monthly = match input.mode {
        PlannerMode::Wealth => input.monthly_investment,
        PlannerMode::Goal => required_monthly_investment,
    };

    let params = input.params(monthly);
    let projection = project(&params)?;

    let mut flat_params = params.clone();
    flat_params.step_up_value = Decimal::ZERO;
    let flat = project(&flat_params)?;

    let estimated_corpus = projection.estimated_corpus;
    let wealth_gained = (estimated_corpus - projection.total_invested).max(Decimal::ZERO);
    let flat_wealth_gained = (flat.estimated_corpus - flat.total_invested).max(Decimal::ZERO);
    let purchasing_power = projection
        .yearly_breakdown
        .last()
        .map(|y| y.real_corpus)
        .unwrap_or(estimated_corpus);

    let xirr = compute_xirr(&params, estimated_corpus)?;
    let absolute_return = if projection.total_invested > Decimal::ZERO {
        wealth_gained
            .checked_div(projection.total_invested)
            .and_then(|ratio| ratio.checked_mul(dec!(100)))
            .map(round_cents)
            .ok_or_else(|| FinPlanError::overflow("absolute return"))?
    } else {
        Decimal::ZERO
    };

    let delay_cost = delay_costs(input, monthly, estimated_corpus)?;

    if input.inflation_enabled && input.inflation_rate >= input.annual_return {
        warnings.push(format!(
            "Inflation ({}%) meets or exceeds the expected return ({}%); real corpus does not grow",
            input.inflation_rate, input.annual_return
        ));
    }

    let output = SipPlan {
        estimated_corpus: round_cents(estimated_corpus),
        total_invested: round_cents(projection.total_invested),
        wealth_gained: round_cents(wealth_gained),
        purchasing_power,
        required_monthly_investment,
        final_monthly_investment: round_cents(projection.final_monthly_investment),
        goal_gap: round_cents((input.target_corpus - estimated_corpus).max(Decimal::ZERO)),
        yearly_breakdown: projection.yearly_breakdown,
        flat_yearly_breakdown: flat.yearly_breakdown,
        flat_corpus: round_cents(flat.estimated_corpus),
        flat_wealth_gained: round_cents(flat_wealth_gained),
        xirr,
        absolute_return,
        delay_cost,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Monthly-compounded SIP with annual step-up; XIRR by Newton-Raphson on monthly flows",
        input,
        warnings,
        elapsed,
        output,
    ))
}

/// Corpus lost by starting 1, 2, 3, 5 or 10 years late (delays shorter than the tenure).
///
/// The 0-year row is the reference point: the base corpus with zero invested
/// and zero loss.
fn delay_costs(input: &SipInput, monthly: Money, base_corpus: Money) -> FinPlanResult<Vec<DelayCostEntry>> {
    DELAY_YEARS
        .iter()
        .filter(|&&d| Decimal::from(d) < input.tenure_years)
        .map(|&delay| {
            if delay == 0 {
                return Ok(DelayCostEntry {
                    delay_years: 0,
                    corpus: round_cents(base_corpus),
                    total_invested: Decimal::ZERO,
                    loss: Decimal::ZERO,
                });
            }
            let mut params = input.params(monthly);
            params.tenure_years = (input.tenure_years - Decimal::from(delay)).max(Decimal::ONE);
            let proj = project(&params)?;
            Ok(DelayCostEntry {
                delay_years: delay,
                corpus: round_cents(proj.estimated_corpus),
                total_invested: round_cents(proj.total_invested),
                loss: round_cents(base_corpus - proj.estimated_corpus),
            })
        })
        .collect()
}

fn validate(input: &SipInput) -> FinPlanResult<()> {
    if input.tenure_years <= Decimal::ZERO {
        return Err(FinPlanError::InvalidInput {
            field: "tenure_years".into(),
            reason: "Tenure must be > 0".into(),
        });
    }
    if input.monthly_investment < Decimal::ZERO {
        return Err(FinPlanError::InvalidInput {
            field: "monthly_investment".into(),
            reason: "Monthly investment must be >= 0".into(),
        });
    }
    if input.lumpsum_amount < Decimal::ZERO {
        return Err(FinPlanError::InvalidInput {
            field: "lumpsum_amount".into(),
            reason: "Lumpsum must be >= 0".into(),
        });
    }
    if input.annual_return <= dec!(-100) {
        return Err(FinPlanError::InvalidInput {
            field: "annual_return".into(),
            reason: "Annual return must be greater than -100%".into(),
        });
    }
    if input.inflation_enabled && input.inflation_rate <= dec!(-100) {
        return Err(FinPlanError::InvalidInput {
            field: "inflation_rate".into(),
            reason: "Inflation rate must be greater than -100%".into(),
        });
    }
    Ok(())
}
