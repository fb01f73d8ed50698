//! Month-by-month loan amortization with discrete prepayments.
//!
//! Each prepayment either keeps the installment and shortens the loan
//! (`ReduceTenure`) or keeps the remaining term and lowers the installment
//! (`ReduceEmi`). Every applied prepayment yields a `PrepaymentImpact` with a
//! local estimate of the interest it saves; `summary::summarize` later rescales
//! those estimates so they add up to the exact saving against a no-prepayment
//! baseline. All math in `rust_decimal::Decimal`.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::FinPlanError;
use crate::time_value::{installment, monthly_rate, months_to_amortize};
use crate::types::{Money, Percent, Rate};
use crate::FinPlanResult;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Balance at or below which the loan is considered fully paid.
pub const BALANCE_EPSILON: Decimal = dec!(0.01);

/// The simulation never runs longer than this multiple of the original tenure.
pub const SAFETY_TENURE_MULTIPLE: u32 = 3;

/// Upper bound on the schedule buffer reserved up front.
const MAX_PREALLOCATED_MONTHS: usize = 1200;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// How a prepayment is absorbed by the loan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PrepaymentStrategy {
    /// Keep the installment, finish the loan earlier.
    ReduceTenure,
    /// Keep the remaining term, lower the installment.
    ReduceEmi,
}

/// A one-off payment towards principal on top of the scheduled installment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prepayment {
    /// Caller-assigned identifier, echoed back on the impact record.
    pub id: String,
    /// 1-indexed month in which the prepayment is made.
    pub month: u32,
    pub amount: Money,
    pub strategy: PrepaymentStrategy,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// One simulated month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentRecord {
    pub month: u32,
    pub principal_portion: Money,
    pub interest_portion: Money,
    /// Total prepaid this month, if any prepayment was applied.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prepayment_applied: Option<Money>,
    pub remaining_balance: Money,
    /// Installment that was due for this month.
    pub installment: Money,
}

impl PaymentRecord {
    /// Principal, interest and prepayment paid this month.
    pub fn total_paid(&self) -> Money {
        self.principal_portion + self.interest_portion + self.prepayment_applied.unwrap_or_default()
    }
}

/// Effect of one applied prepayment on the loan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrepaymentImpact {
    pub prepayment_id: String,
    pub month: u32,
    pub strategy: PrepaymentStrategy,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Amount actually applied, capped at the outstanding balance.
    pub amount_applied: Money,
    pub old_installment: Money,
    pub new_installment: Money,
    pub old_remaining_months: u32,
    pub new_remaining_months: u32,
    /// Raw local estimate from the simulation; rescaled and rounded to whole
    /// currency units by `summarize`.
    pub interest_saved: Money,
    /// Running total of `interest_saved`, filled in by `summarize`.
    pub cumulative_interest_saved: Money,
}

/// Full output of `simulate`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanSchedule {
    /// Installment at the start of the loan.
    pub installment: Money,
    pub payments: Vec<PaymentRecord>,
    pub impacts: Vec<PrepaymentImpact>,
    /// True when the run stopped at the safety bound with a balance left.
    pub hit_safety_bound: bool,
}

impl LoanSchedule {
    fn empty() -> Self {
        LoanSchedule {
            installment: Decimal::ZERO,
            payments: Vec::new(),
            impacts: Vec::new(),
            hit_safety_bound: false,
        }
    }
}

/// Loan position at the end of a month.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoanState {
    /// Months completed so far.
    pub month: u32,
    pub balance: Money,
    pub installment: Money,
}

/// Result of advancing a `LoanState` by one month.
#[derive(Debug, Clone, PartialEq)]
pub struct MonthStep {
    pub state: LoanState,
    pub record: PaymentRecord,
    pub impacts: Vec<PrepaymentImpact>,
}

// ---------------------------------------------------------------------------
// Core functions
// ---------------------------------------------------------------------------

/// Returns true when the loan parameters describe a loan that can be simulated.
pub fn is_valid_loan(principal: Money, annual_rate: Percent, tenure_months: u32) -> bool {
    principal > Decimal::ZERO && annual_rate >= Decimal::ZERO && tenure_months > 0
}

/// Simulate the loan month by month, applying prepayments in trigger-month order.
///
/// Invalid loan parameters (principal <= 0, negative rate, zero tenure) give an
/// empty schedule with a zero installment rather than an error. Prepayments
/// due after the loan is paid off are skipped. Several prepayments in the same
/// month are applied in the order supplied.
pub fn simulate(
    principal: Money,
    annual_rate: Percent,
    tenure_months: u32,
    prepayments: &[Prepayment],
) -> FinPlanResult<LoanSchedule> {
    validate_prepayments(prepayments)?;

    if !is_valid_loan(principal, annual_rate, tenure_months) {
        log::warn!(
            "invalid loan parameters (principal {principal}, rate {annual_rate}%, tenure {tenure_months}); returning an empty schedule"
        );
        return Ok(LoanSchedule::empty());
    }

    let rate = monthly_rate(annual_rate);
    let emi = installment(principal, rate, tenure_months)?;
    let limit = tenure_months.saturating_mul(SAFETY_TENURE_MULTIPLE);

    let mut ordered: Vec<&Prepayment> = prepayments.iter().collect();
    ordered.sort_by_key(|p| p.month);

    log::debug!(
        "simulating loan: principal {principal}, rate {annual_rate}%, tenure {tenure_months}, installment {emi}, {} prepayment(s)",
        ordered.len()
    );

    let mut state = LoanState {
        month: 0,
        balance: principal,
        installment: emi,
    };
    let mut payments = Vec::with_capacity((tenure_months as usize).min(MAX_PREALLOCATED_MONTHS));
    let mut impacts = Vec::new();

    while state.balance > BALANCE_EPSILON && state.month < limit {
        let month = state.month + 1;
        let due: Vec<&Prepayment> = ordered.iter().copied().filter(|p| p.month == month).collect();
        let step = step_month(&state, rate, &due)?;
        payments.push(step.record);
        impacts.extend(step.impacts);
        state = step.state;
    }

    let hit_safety_bound = state.balance > BALANCE_EPSILON;
    if hit_safety_bound {
        log::warn!(
            "loan not repaid after {} months (safety bound); remaining balance {}",
            state.month,
            state.balance
        );
    }
    log::debug!(
        "loan simulation finished after {} months with {} prepayment impact(s)",
        payments.len(),
        impacts.len()
    );

    Ok(LoanSchedule {
        installment: emi,
        payments,
        impacts,
        hit_safety_bound,
    })
}

/// Advance the loan by one month: accrue interest, pay the installment, then
/// apply any prepayments due this month.
pub fn step_month(state: &LoanState, rate: Rate, due: &[&Prepayment]) -> FinPlanResult<MonthStep> {
    let month = state.month + 1;
    let interest = state
        .balance
        .checked_mul(rate)
        .ok_or_else(|| FinPlanError::overflow("monthly interest"))?;
    let principal_portion = (state.installment - interest)
        .min(state.balance)
        .max(Decimal::ZERO);

    let mut balance = state.balance - principal_portion;
    let mut current_installment = state.installment;
    let mut prepaid = Decimal::ZERO;
    let mut impacts = Vec::new();

    for prepayment in due {
        if balance <= BALANCE_EPSILON {
            log::debug!(
                "prepayment '{}' in month {month} skipped: loan already repaid",
                prepayment.id
            );
            continue;
        }
        let impact = apply_prepayment(balance, current_installment, rate, month, prepayment)?;
        balance -= impact.amount_applied;
        prepaid += impact.amount_applied;
        if impact.new_remaining_months > 0 {
            current_installment = impact.new_installment;
        }
        impacts.push(impact);
    }

    if balance <= BALANCE_EPSILON {
        balance = Decimal::ZERO;
    }

    let record = PaymentRecord {
        month,
        principal_portion,
        interest_portion: interest,
        prepayment_applied: if impacts.is_empty() { None } else { Some(prepaid) },
        remaining_balance: balance,
        installment: state.installment,
    };

    Ok(MonthStep {
        state: LoanState {
            month,
            balance,
            installment: current_installment,
        },
        record,
        impacts,
    })
}

/// Apply one prepayment to `balance` and estimate the interest it saves.
///
/// The estimate is local: it compares installments left to pay before and
/// after, less the amount prepaid. It is never negative.
pub fn apply_prepayment(
    balance: Money,
    current_installment: Money,
    rate: Rate,
    month: u32,
    prepayment: &Prepayment,
) -> FinPlanResult<PrepaymentImpact> {
    let non_amortizing = || FinPlanError::NonAmortizingInstallment {
        month,
        prepayment_id: Some(prepayment.id.clone()),
    };

    let old_remaining = months_to_amortize(balance, current_installment, rate).ok_or_else(non_amortizing)?;
    let applied = prepayment.amount.min(balance);
    let new_balance = balance - applied;
    let old_remaining_dec = Decimal::from(old_remaining);

    let overflow = || FinPlanError::overflow("prepayment interest estimate");
    let (new_installment, new_remaining, estimate) = if new_balance <= BALANCE_EPSILON {
        let remaining_due = current_installment.checked_mul(old_remaining_dec).ok_or_else(overflow)?;
        (Decimal::ZERO, 0, remaining_due - applied)
    } else {
        match prepayment.strategy {
            PrepaymentStrategy::ReduceEmi => {
                let new_installment = installment(new_balance, rate, old_remaining)?;
                if new_installment <= new_balance * rate {
                    return Err(non_amortizing());
                }
                let lowered = (current_installment - new_installment)
                    .checked_mul(old_remaining_dec)
                    .ok_or_else(overflow)?;
                (new_installment, old_remaining, lowered - applied)
            }
            PrepaymentStrategy::ReduceTenure => {
                let new_remaining =
                    months_to_amortize(new_balance, current_installment, rate).ok_or_else(non_amortizing)?;
                let months_saved = Decimal::from(old_remaining.saturating_sub(new_remaining));
                let skipped = current_installment.checked_mul(months_saved).ok_or_else(overflow)?;
                (current_installment, new_remaining, skipped - applied)
            }
        }
    };

    log::debug!(
        "month {month}: prepayment '{}' of {applied} ({:?}), installment {current_installment} -> {new_installment}, remaining {old_remaining} -> {new_remaining} months",
        prepayment.id,
        prepayment.strategy
    );

    Ok(PrepaymentImpact {
        prepayment_id: prepayment.id.clone(),
        month,
        strategy: prepayment.strategy,
        description: prepayment.description.clone(),
        amount_applied: applied,
        old_installment: current_installment,
        new_installment,
        old_remaining_months: old_remaining,
        new_remaining_months: new_remaining,
        interest_saved: estimate.max(Decimal::ZERO),
        cumulative_interest_saved: Decimal::ZERO,
    })
}

fn validate_prepayments(prepayments: &[Prepayment]) -> FinPlanResult<()> {
    for p in prepayments {
        if p.month == 0 {
            return Err(FinPlanError::InvalidInput {
                field: format!("prepayments[{}].month", p.id),
                reason: "Prepayment month is 1-indexed and must be >= 1".into(),
            });
        }
        if p.amount <= Decimal::ZERO {
            return Err(FinPlanError::InvalidInput {
                field: format!("prepayments[{}].amount", p.id),
                reason: "Prepayment amount must be > 0".into(),
            });
        }
    }
    Ok(())
}
