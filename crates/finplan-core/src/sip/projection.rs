//! Month-by-month SIP growth with annual step-up and inflation-adjusted corpus.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::FinPlanError;
use crate::time_value::{checked_compound, monthly_rate, round_cents};
use crate::types::{Money, Percent, Rate};
use crate::FinPlanResult;

/// Upper bound on the up-front allocation for yearly rows.
const MAX_PREALLOCATED_YEARS: u32 = 100;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// How the monthly contribution grows at each anniversary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepUpMode {
    /// Grow by `step_up_value` percent.
    #[default]
    Percent,
    /// Grow by a fixed `step_up_value` amount.
    Fixed,
}

/// Parameters shared by projection, goal-seek and XIRR.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SipParams {
    pub monthly_investment: Money,
    /// Fractional years allowed; the run lasts `round(years * 12)` months, at least one.
    pub tenure_years: Decimal,
    pub annual_return: Percent,
    #[serde(default)]
    pub lumpsum: Money,
    #[serde(default)]
    pub step_up_mode: StepUpMode,
    #[serde(default)]
    pub step_up_value: Decimal,
    #[serde(default)]
    pub inflation_rate: Percent,
    #[serde(default)]
    pub inflation_enabled: bool,
}

/// Snapshot at the end of each year (a partial final year included).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SipYearProjection {
    pub year: u32,
    pub yearly_investment: Money,
    pub total_invested: Money,
    /// Cumulative interest earned to date.
    pub interest_earned: Money,
    pub yearly_interest_earned: Money,
    pub total_corpus: Money,
    /// Corpus deflated by `(1 + inflation)^year`; equals `total_corpus` when
    /// inflation is disabled.
    pub real_corpus: Money,
    /// Monthly contribution in effect during the year.
    pub monthly_sip: Money,
}

/// Result of `project`. Corpus and totals are unrounded; yearly rows are in cents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SipProjection {
    pub yearly_breakdown: Vec<SipYearProjection>,
    pub estimated_corpus: Money,
    pub total_invested: Money,
    pub final_monthly_investment: Money,
}

// ---------------------------------------------------------------------------
// Core functions
// ---------------------------------------------------------------------------

/// Number of monthly contributions for a tenure in years.
pub fn total_months(tenure_years: Decimal) -> u32 {
    (tenure_years * dec!(12))
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_u32()
        .unwrap_or(0)
        .max(1)
}

/// Contribution after one anniversary step-up. Non-positive step-ups do nothing.
pub fn apply_step_up(current: Money, mode: StepUpMode, value: Decimal) -> FinPlanResult<Money> {
    if value <= Decimal::ZERO {
        return Ok(current);
    }
    let stepped = match mode {
        StepUpMode::Percent => current.checked_mul(Decimal::ONE + value / dec!(100)),
        StepUpMode::Fixed => current.checked_add(value),
    };
    stepped.ok_or_else(|| FinPlanError::overflow("step-up contribution"))
}

/// Project the corpus month by month.
///
/// Each month the contribution is added and then one month of interest at
/// `annual_return / 12` is credited. The contribution steps up at the start of
/// months 13, 25, ... The lumpsum is invested at the start.
///
/// Fails with `NumericOverflow` once the corpus or contribution leaves the
/// decimal range.
pub fn project(params: &SipParams) -> FinPlanResult<SipProjection> {
    let months = total_months(params.tenure_years);
    let rate = monthly_rate(params.annual_return);
    let inflation = params.inflation_rate / dec!(100);
    let overflow = || FinPlanError::overflow("SIP projection");

    let lumpsum = params.lumpsum.max(Decimal::ZERO);
    let mut corpus = lumpsum;
    let mut total_invested = lumpsum;
    let mut running_interest = Decimal::ZERO;
    let mut sip = params.monthly_investment.max(Decimal::ZERO);
    let mut yearly_investment = Decimal::ZERO;
    let mut yearly_interest = Decimal::ZERO;
    let mut yearly_breakdown = Vec::with_capacity(months.div_ceil(12).min(MAX_PREALLOCATED_YEARS) as usize);

    for month in 1..=months {
        if month > 1 && (month - 1) % 12 == 0 {
            sip = apply_step_up(sip, params.step_up_mode, params.step_up_value)?;
        }

        corpus = corpus.checked_add(sip).ok_or_else(overflow)?;
        total_invested = total_invested.checked_add(sip).ok_or_else(overflow)?;
        yearly_investment += sip;

        let interest = corpus.checked_mul(rate).ok_or_else(overflow)?;
        corpus = corpus.checked_add(interest).ok_or_else(overflow)?;
        running_interest = running_interest.checked_add(interest).ok_or_else(overflow)?;
        yearly_interest += interest;

        if month % 12 == 0 || month == months {
            let year = month.div_ceil(12);
            let real_corpus = if params.inflation_enabled {
                deflate(corpus, inflation, year)?
            } else {
                corpus
            };
            yearly_breakdown.push(SipYearProjection {
                year,
                yearly_investment: round_cents(yearly_investment),
                total_invested: round_cents(total_invested),
                interest_earned: round_cents(running_interest),
                yearly_interest_earned: round_cents(yearly_interest),
                total_corpus: round_cents(corpus),
                real_corpus: round_cents(real_corpus),
                monthly_sip: round_cents(sip),
            });
            yearly_investment = Decimal::ZERO;
            yearly_interest = Decimal::ZERO;
        }
    }

    Ok(SipProjection {
        yearly_breakdown,
        estimated_corpus: corpus,
        total_invested,
        final_monthly_investment: sip,
    })
}

/// Corpus in today's money after `year` years of inflation.
fn deflate(corpus: Money, inflation: Rate, year: u32) -> FinPlanResult<Money> {
    match checked_compound(inflation, year) {
        Some(deflator) if deflator > Decimal::ZERO => corpus
            .checked_div(deflator)
            .ok_or_else(|| FinPlanError::overflow("real corpus")),
        Some(_) => Err(FinPlanError::InvalidInput {
            field: "inflation_rate".into(),
            reason: "Inflation rate must be greater than -100%".into(),
        }),
        // Price level beyond the decimal range: nothing survives in today's money.
        None => Ok(Decimal::ZERO),
    }
}
