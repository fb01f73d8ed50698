use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use super::amortization::{is_valid_loan, simulate, PaymentRecord, Prepayment};
use super::summary::{summarize, LoanSummary};
use crate::types::{with_metadata, ComputationOutput, Money, Percent};
use crate::FinPlanResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Input parameters for a loan analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoanInput {
    pub principal: Money,
    /// Annual interest rate in percent (8.5 = 8.5%).
    pub annual_rate: Percent,
    pub tenure_months: u32,
    #[serde(default)]
    pub prepayments: Vec<Prepayment>,
}

/// One calendar year of the loan, counted from the first installment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearlyLoanRow {
    pub year: u32,
    pub principal_paid: Money,
    pub interest_paid: Money,
    pub prepayments: Money,
    pub closing_balance: Money,
}

/// Top-level output from `analyze_loan`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoanAnalysis {
    pub installment: Money,
    pub summary: LoanSummary,
    pub yearly: Vec<YearlyLoanRow>,
    pub schedule: Vec<PaymentRecord>,
}

// ---------------------------------------------------------------------------
// Core function
// ---------------------------------------------------------------------------

/// Simulate the loan, summarize it, and roll the schedule up by year.
pub fn analyze_loan(input: &LoanInput) -> FinPlanResult<ComputationOutput<LoanAnalysis>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    if !is_valid_loan(input.principal, input.annual_rate, input.tenure_months) {
        warnings.push(
            "Loan parameters are invalid (principal must be > 0, rate >= 0, tenure >= 1 month); schedule is empty"
                .into(),
        );
    }

    let schedule = simulate(
        input.principal,
        input.annual_rate,
        input.tenure_months,
        &input.prepayments,
    )?;

    if schedule.hit_safety_bound {
        warnings.push(format!(
            "Loan not repaid within {} months; schedule truncated",
            schedule.payments.len()
        ));
    }

    for p in &input.prepayments {
        let applied = schedule
            .impacts
            .iter()
            .any(|i| i.prepayment_id == p.id && i.month == p.month);
        if !applied && !schedule.payments.is_empty() {
            warnings.push(format!(
                "Prepayment '{}' in month {} falls after the loan is repaid and was skipped",
                p.id, p.month
            ));
        }
    }

    let summary = summarize(
        input.principal,
        input.annual_rate,
        input.tenure_months,
        &schedule.payments,
        &schedule.impacts,
    )?;

    let output = LoanAnalysis {
        installment: schedule.installment,
        summary,
        yearly: yearly_rollup(&schedule.payments),
        schedule: schedule.payments,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Reducing-balance amortization with prepayment impacts normalized to baseline",
        input,
        warnings,
        elapsed,
        output,
    ))
}

/// Aggregate monthly records into 12-month buckets.
pub fn yearly_rollup(payments: &[PaymentRecord]) -> Vec<YearlyLoanRow> {
    payments
        .chunks(12)
        .enumerate()
        .map(|(i, months)| YearlyLoanRow {
            year: i as u32 + 1,
            principal_paid: months.iter().map(|p| p.principal_portion).sum(),
            interest_paid: months.iter().map(|p| p.interest_portion).sum(),
            prepayments: months
                .iter()
                .filter_map(|p| p.prepayment_applied)
                .sum(),
            closing_balance: months
                .last()
                .map(|p| p.remaining_balance)
                .unwrap_or(Decimal::ZERO),
        })
        .collect()
}
