//! Goal-seek: the smallest monthly contribution whose projection reaches a
//! target corpus.

use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use super::projection::{project, SipParams};
use crate::error::FinPlanError;
use crate::types::Money;
use crate::FinPlanResult;

/// Highest monthly contribution the goal search will consider.
pub const MAX_MONTHLY_CONTRIBUTION: Decimal = dec!(50_000_000);

/// Smallest starting upper bound for the search.
const MIN_INITIAL_BOUND: Decimal = dec!(1000);

const BISECTION_ITERATIONS: u32 = 50;

/// Outcome of a goal search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GoalSeek {
    /// Smallest monthly contribution (rounded up to the cent) meeting the target.
    Found(Money),
    /// Even the ceiling contribution falls short.
    Unreachable { ceiling: Money, best_corpus: Money },
}

/// Binary-search the monthly contribution whose projected corpus meets `target`.
///
/// The upper bound starts at `max(params.monthly_investment, 1000)` and doubles,
/// capped at `MAX_MONTHLY_CONTRIBUTION`, until it meets the target; fifty
/// bisections then narrow it. All other parameters (lumpsum, step-up, return)
/// are taken from `params`. A non-positive target needs no contribution.
///
/// A trial whose corpus overflows the decimal range counts as meeting the
/// target. Any other projection error is returned.
pub fn find_required_monthly_investment(target: Money, params: &SipParams) -> FinPlanResult<GoalSeek> {
    if target <= Decimal::ZERO {
        return Ok(GoalSeek::Found(Decimal::ZERO));
    }

    // None: the corpus is past the decimal range, so past any target.
    let corpus_for = |monthly: Money| -> FinPlanResult<Option<Money>> {
        let mut trial = params.clone();
        trial.monthly_investment = monthly;
        match project(&trial) {
            Ok(projection) => Ok(Some(projection.estimated_corpus)),
            Err(FinPlanError::NumericOverflow { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    };
    let meets = |corpus: Option<Money>| corpus.map_or(true, |c| c >= target);

    let mut low = Decimal::ZERO;
    let mut high = params.monthly_investment.max(MIN_INITIAL_BOUND).min(MAX_MONTHLY_CONTRIBUTION);

    loop {
        let Some(corpus) = corpus_for(high)? else {
            break;
        };
        if corpus >= target {
            break;
        }
        if high >= MAX_MONTHLY_CONTRIBUTION {
            log::warn!("goal {target} unreachable: ceiling contribution {high} only reaches {corpus}");
            return Ok(GoalSeek::Unreachable {
                ceiling: high,
                best_corpus: corpus,
            });
        }
        high = (high * dec!(2)).min(MAX_MONTHLY_CONTRIBUTION);
    }

    for _ in 0..BISECTION_ITERATIONS {
        let mid = (low + high) / dec!(2);
        if meets(corpus_for(mid)?) {
            high = mid;
        } else {
            low = mid;
        }
    }

    let required = high.round_dp_with_strategy(2, RoundingStrategy::ToPositiveInfinity);
    log::debug!("goal {target} needs a monthly contribution of {required}");
    Ok(GoalSeek::Found(required))
}
