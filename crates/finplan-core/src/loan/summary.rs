//! Loan totals and reconciliation of per-prepayment interest savings.
//!
//! The per-prepayment figures produced by the simulation are cheap local
//! estimates. Here they are rescaled by a single factor so that, after rounding
//! to whole currency units, they add up exactly to the rounded difference
//! between a no-prepayment baseline and the actual schedule. Relative weights
//! between prepayments are preserved; exact per-event savings would need a
//! counterfactual re-simulation per prepayment, which is not attempted.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::amortization::{simulate, PaymentRecord, PrepaymentImpact};
use crate::time_value::{checked_sum, installment, monthly_rate, round_units};
use crate::types::{Money, Percent};
use crate::FinPlanResult;

/// Aggregate view of a simulated loan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanSummary {
    /// Installment for the original principal, rate and tenure.
    pub monthly_installment: Money,
    pub total_interest_paid: Money,
    /// Principal, interest and prepayments across the schedule.
    pub total_amount_paid: Money,
    pub actual_tenure_months: u32,
    pub interest_saved_vs_no_prepayment: Money,
    /// Impacts in trigger-month order with reconciled savings.
    pub prepayment_impacts: Vec<PrepaymentImpact>,
}

/// Derive totals from `payments` and reconcile the `impacts` against a
/// freshly simulated no-prepayment baseline.
pub fn summarize(
    principal: Money,
    annual_rate: Percent,
    tenure_months: u32,
    payments: &[PaymentRecord],
    impacts: &[PrepaymentImpact],
) -> FinPlanResult<LoanSummary> {
    let total_interest_paid = checked_sum(payments.iter().map(|p| p.interest_portion), "total interest")?;
    let total_amount_paid = checked_sum(payments.iter().map(PaymentRecord::total_paid), "total amount paid")?;

    let baseline = simulate(principal, annual_rate, tenure_months, &[])?;
    let baseline_interest =
        checked_sum(baseline.payments.iter().map(|p| p.interest_portion), "baseline interest")?;
    let interest_saved = (baseline_interest - total_interest_paid).max(Decimal::ZERO);

    log::debug!(
        "loan summary: interest {total_interest_paid} vs baseline {baseline_interest}, saved {interest_saved}"
    );

    Ok(LoanSummary {
        monthly_installment: installment(principal, monthly_rate(annual_rate), tenure_months)?,
        total_interest_paid,
        total_amount_paid,
        actual_tenure_months: payments.len() as u32,
        interest_saved_vs_no_prepayment: interest_saved,
        prepayment_impacts: normalize_impacts(impacts, interest_saved),
    })
}

/// Rescale raw interest-saved estimates so their rounded sum equals
/// `round_units(total_saved)`.
///
/// Each impact gets `raw * total_saved / sum(raw)`, apportioned to whole units
/// by largest remainder: floor every share, then hand the leftover units one
/// each to the shares with the largest fractional parts. When every raw
/// estimate is zero the amounts applied are used as weights.
pub fn normalize_impacts(impacts: &[PrepaymentImpact], total_saved: Money) -> Vec<PrepaymentImpact> {
    let mut ordered: Vec<PrepaymentImpact> = impacts.to_vec();
    ordered.sort_by_key(|i| i.month);

    let raw_sum: Decimal = ordered.iter().map(|i| i.interest_saved).sum();
    let weights: Vec<Decimal> = if raw_sum > Decimal::ZERO {
        ordered.iter().map(|i| i.interest_saved).collect()
    } else {
        ordered.iter().map(|i| i.amount_applied).collect()
    };
    let weight_sum: Decimal = weights.iter().copied().sum();

    let target = round_units(total_saved.max(Decimal::ZERO));
    let factor = if weight_sum > Decimal::ZERO {
        total_saved.max(Decimal::ZERO) / weight_sum
    } else {
        Decimal::ZERO
    };

    let shares: Vec<Decimal> = weights.iter().map(|w| *w * factor).collect();
    let mut allotted: Vec<Decimal> = shares.iter().map(|s| s.floor()).collect();

    if factor > Decimal::ZERO {
        let floored: Decimal = allotted.iter().copied().sum();
        let leftover = (target - floored).to_usize().unwrap_or(0);

        let mut by_remainder: Vec<usize> = (0..shares.len()).collect();
        // Stable: ties go to the earlier prepayment.
        by_remainder.sort_by(|&a, &b| (shares[b] - allotted[b]).cmp(&(shares[a] - allotted[a])));
        for &idx in by_remainder.iter().take(leftover) {
            allotted[idx] += Decimal::ONE;
        }
    }

    let mut cumulative = Decimal::ZERO;
    for (impact, saved) in ordered.iter_mut().zip(allotted) {
        cumulative += saved;
        impact.interest_saved = saved;
        impact.cumulative_interest_saved = cumulative;
    }
    ordered
}
