//! Shared time-value math: level installments, amortization length, periodic
//! rate solving and rounding. Arithmetic that can leave the decimal range on
//! extreme inputs is checked.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, MathematicalOps, RoundingStrategy};
use rust_decimal_macros::dec;

use crate::error::FinPlanError;
use crate::types::{Money, Percent, Rate};
use crate::FinPlanResult;

/// Below this magnitude the NPV slope is treated as zero.
const SLOPE_EPSILON: Decimal = dec!(0.000000000000001);
const STEP_TOLERANCE: Decimal = dec!(0.0000000001);

/// Newton iterations keep the periodic rate inside this open interval.
const RATE_FLOOR: Decimal = dec!(-0.5);
const RATE_CEILING: Decimal = dec!(2);

/// Convert an annual percentage (8.5 = 8.5%) to a nominal monthly rate.
pub fn monthly_rate(annual_percent: Percent) -> Rate {
    annual_percent / dec!(12) / dec!(100)
}

/// Compute (1 + r)^n via iterative multiplication (avoids Decimal::powd drift).
pub fn compound(rate: Rate, n: u32) -> Decimal {
    let mut result = Decimal::ONE;
    let factor = Decimal::ONE + rate;
    for _ in 0..n {
        result *= factor;
    }
    result
}

/// Level installment that amortizes `principal` over `months` periods.
///
/// `EMI = P * r * (1 + r)^n / ((1 + r)^n - 1)`, with `P / n` at a zero rate.
/// Returns zero for a non-positive principal or a zero term, and
/// `NumericOverflow` when the payment itself is out of range.
pub fn installment(principal: Money, rate: Rate, months: u32) -> FinPlanResult<Money> {
    if principal <= Decimal::ZERO || months == 0 {
        return Ok(Decimal::ZERO);
    }
    if rate.is_zero() {
        return Ok(principal / Decimal::from(months));
    }

    let interest = principal
        .checked_mul(rate)
        .ok_or_else(|| FinPlanError::overflow("installment"))?;
    match (Decimal::ONE + rate).checked_powu(u64::from(months)) {
        Some(factor) if factor > Decimal::ONE => interest
            .checked_mul(factor / (factor - Decimal::ONE))
            .ok_or_else(|| FinPlanError::overflow("installment")),
        // (1 + r)^n too large to represent: the payment tends to pure interest.
        _ => Ok(interest),
    }
}

/// Months needed to clear `balance` paying `payment` each month at `rate`.
///
/// `n = ln(E / (E - B * r)) / ln(1 + r)`, rounded up. Returns `None` when the
/// payment does not exceed the interest accruing on the balance.
pub fn months_to_amortize(balance: Money, payment: Money, rate: Rate) -> Option<u32> {
    if balance <= Decimal::ZERO {
        return Some(0);
    }
    if payment <= Decimal::ZERO {
        return None;
    }

    let months = if rate.is_zero() {
        balance / payment
    } else {
        // Interest beyond the decimal range cannot be covered by any payment.
        let interest = balance.checked_mul(rate)?;
        if payment <= interest || rate <= dec!(-1) {
            return None;
        }
        (payment / (payment - interest)).ln() / (Decimal::ONE + rate).ln()
    };

    // Trim ln noise so an exact integer term does not ceil up by one.
    months.round_dp(4).ceil().to_u32()
}

/// `(1 + r)^n`, or `None` when it leaves the decimal range.
pub fn checked_compound(rate: Rate, n: u32) -> Option<Decimal> {
    let factor = Decimal::ONE + rate;
    (0..n).try_fold(Decimal::ONE, |acc, _| acc.checked_mul(factor))
}

/// Sum that reports overflow instead of panicking.
pub fn checked_sum<I: IntoIterator<Item = Decimal>>(values: I, context: &str) -> FinPlanResult<Decimal> {
    values
        .into_iter()
        .try_fold(Decimal::ZERO, |acc, v| acc.checked_add(v))
        .ok_or_else(|| FinPlanError::overflow(context))
}

/// Net present value of periodic flows and its derivative with respect to the rate.
///
/// `flows[t]` is discounted by `(1 + rate)^t`. Terms whose discount factor
/// overflows are negligible and dropped. Returns `None` when a term cannot be
/// represented.
pub fn npv_with_slope(rate: Rate, flows: &[Money]) -> Option<(Decimal, Decimal)> {
    let one_plus_r = Decimal::ONE + rate;
    if one_plus_r <= Decimal::ZERO {
        return None;
    }

    let mut npv = Decimal::ZERO;
    let mut slope = Decimal::ZERO;
    let mut discount = Decimal::ONE;

    for (t, cf) in flows.iter().enumerate() {
        if t > 0 {
            discount = match discount.checked_mul(one_plus_r) {
                Some(d) => d,
                None => break,
            };
        }
        if cf.is_zero() {
            continue;
        }
        npv = npv.checked_add(cf.checked_div(discount)?)?;
        if t > 0 {
            let weighted = Decimal::from(t as u64).checked_mul(*cf)?;
            slope = slope.checked_sub(weighted.checked_div(discount.checked_mul(one_plus_r)?)?)?;
        }
    }

    Some((npv, slope))
}

/// Outcome of the periodic-rate Newton solve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateSolution {
    pub rate: Rate,
    pub iterations: u32,
    pub converged: bool,
}

/// Solve for the periodic rate with NPV = 0 using Newton-Raphson.
///
/// A step landing at or beyond -50% halves the current rate, and one at or
/// beyond 200% moves halfway to 200%. This is a divergence heuristic, not a
/// bracketed root finder. Hitting `max_iterations` is not an error: the last
/// rate is returned with `converged = false`.
pub fn solve_periodic_rate(flows: &[Money], guess: Rate, max_iterations: u32) -> RateSolution {
    let mut rate = guess;

    for i in 0..max_iterations {
        let Some((npv, slope)) = npv_with_slope(rate, flows) else {
            return RateSolution { rate, iterations: i, converged: false };
        };
        if slope.abs() < SLOPE_EPSILON {
            return RateSolution { rate, iterations: i, converged: false };
        }

        let step = npv / slope;
        let next = rate - step;
        rate = if next <= RATE_FLOOR {
            rate / dec!(2)
        } else if next >= RATE_CEILING {
            (rate + RATE_CEILING) / dec!(2)
        } else {
            next
        };

        if step.abs() < STEP_TOLERANCE {
            return RateSolution { rate, iterations: i + 1, converged: true };
        }
    }

    RateSolution {
        rate,
        iterations: max_iterations,
        converged: false,
    }
}

/// Effective annual rate of a monthly rate: `(1 + r)^12 - 1`.
pub fn annualize_monthly(rate: Rate) -> Rate {
    compound(rate.max(dec!(-0.99)), 12) - Decimal::ONE
}

/// Round to whole currency units, half away from zero.
pub fn round_units(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
}

/// Round to cents, half away from zero.
pub fn round_cents(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_monthly_rate() {
        assert_eq!(monthly_rate(dec!(12)), dec!(0.01));
    }

    #[test]
    fn test_installment_standard_home_loan() {
        // 5M at 8.5% over 20 years: ~43,391.16
        let emi = installment(dec!(5_000_000), monthly_rate(dec!(8.5)), 240).unwrap();
        assert!((emi - dec!(43391.16)).abs() < dec!(0.01), "emi = {emi}");
    }

    #[test]
    fn test_installment_zero_rate_is_straight_line() {
        let emi = installment(dec!(120_000), Decimal::ZERO, 24).unwrap();
        assert_eq!(emi, dec!(5000));
    }

    #[test]
    fn test_installment_degenerate_inputs() {
        assert_eq!(installment(Decimal::ZERO, dec!(0.01), 12).unwrap(), Decimal::ZERO);
        assert_eq!(installment(dec!(-10), dec!(0.01), 12).unwrap(), Decimal::ZERO);
        assert_eq!(installment(dec!(1000), dec!(0.01), 0).unwrap(), Decimal::ZERO);
    }

    #[test]
    fn test_months_to_amortize_inverts_installment() {
        let rate = monthly_rate(dec!(8.5));
        let emi = installment(dec!(5_000_000), rate, 240).unwrap();
        assert_eq!(months_to_amortize(dec!(5_000_000), emi, rate), Some(240));
    }

    #[test]
    fn test_installment_large_factor_stays_in_range() {
        // 1.02^2400 is ~4e20: P * r * factor alone would pass the decimal maximum
        let emi = installment(dec!(10_000_000_000), dec!(0.02), 2400).unwrap();
        assert!((emi - dec!(200_000_000)).abs() < dec!(0.01), "emi = {emi}");
    }

    #[test]
    fn test_installment_overflow_is_error() {
        let err = installment(Decimal::MAX, dec!(2), 12).unwrap_err();
        assert!(matches!(err, FinPlanError::NumericOverflow { .. }));
    }

    #[test]
    fn test_checked_helpers() {
        assert_eq!(checked_compound(dec!(0.1), 2), Some(dec!(1.21)));
        assert_eq!(checked_compound(dec!(9), 40), None);
        assert_eq!(checked_sum([dec!(1), dec!(2)], "sum").unwrap(), dec!(3));
        assert!(checked_sum([Decimal::MAX, Decimal::ONE], "sum").is_err());
    }

    #[test]
    fn test_months_to_amortize_zero_rate() {
        assert_eq!(months_to_amortize(dec!(1000), dec!(300), Decimal::ZERO), Some(4));
    }

    #[test]
    fn test_months_to_amortize_non_amortizing() {
        // Interest on 100,000 at 1% is 1,000; paying exactly that never amortizes
        assert_eq!(months_to_amortize(dec!(100_000), dec!(1000), dec!(0.01)), None);
        assert_eq!(months_to_amortize(dec!(100_000), dec!(999), dec!(0.01)), None);
        assert_eq!(months_to_amortize(dec!(100_000), Decimal::ZERO, Decimal::ZERO), None);
    }

    #[test]
    fn test_npv_with_slope_zero_rate() {
        let flows = vec![dec!(-100), dec!(50), dec!(50), dec!(50)];
        let (npv, slope) = npv_with_slope(Decimal::ZERO, &flows).unwrap();
        assert_eq!(npv, dec!(50));
        // -(1*50 + 2*50 + 3*50)
        assert_eq!(slope, dec!(-300));
    }

    #[test]
    fn test_solve_periodic_rate_basic() {
        let flows = vec![dec!(-1000), dec!(400), dec!(400), dec!(400)];
        let solution = solve_periodic_rate(&flows, dec!(0.10), 300);
        assert!(solution.converged);
        // IRR ~9.7%
        assert!((solution.rate - dec!(0.097)).abs() < dec!(0.001));
    }

    #[test]
    fn test_solve_periodic_rate_flat_slope_short_circuits() {
        let flows = vec![dec!(100)];
        let solution = solve_periodic_rate(&flows, dec!(0.01), 300);
        assert!(!solution.converged);
        assert_eq!(solution.iterations, 0);
        assert_eq!(solution.rate, dec!(0.01));
    }

    #[test]
    fn test_annualize_monthly() {
        // 1% a month compounds to ~12.68% a year
        let annual = annualize_monthly(dec!(0.01));
        assert!((annual - dec!(0.126825)).abs() < dec!(0.000001));
    }

    #[test]
    fn test_rounding_helpers() {
        assert_eq!(round_units(dec!(2.5)), dec!(3));
        assert_eq!(round_units(dec!(-2.5)), dec!(-3));
        assert_eq!(round_cents(dec!(1.005)), dec!(1.01));
    }
}
