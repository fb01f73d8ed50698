//! Annualized internal rate of return of a SIP's monthly cash flows.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use super::projection::{apply_step_up, total_months, SipParams};
use crate::time_value::{annualize_monthly, round_cents, solve_periodic_rate};
use crate::types::{Money, Percent};
use crate::FinPlanResult;

pub const MAX_XIRR_ITERATIONS: u32 = 300;

/// Starting monthly rate, roughly 10% a year.
const INITIAL_MONTHLY_GUESS: Decimal = dec!(0.008);

/// Monthly cash flows of a SIP from the investor's side.
///
/// `flows[0]` is the lumpsum outflow, `flows[m]` the contribution of month `m`
/// (stepped up like the projection), and the final month also receives
/// `final_corpus`.
pub fn sip_cash_flows(params: &SipParams, final_corpus: Money) -> FinPlanResult<Vec<Money>> {
    let months = total_months(params.tenure_years) as usize;
    let mut flows = vec![Decimal::ZERO; months + 1];
    flows[0] = -params.lumpsum.max(Decimal::ZERO);

    let mut sip = params.monthly_investment;
    for (m, flow) in flows.iter_mut().enumerate().skip(1) {
        if m > 1 && (m - 1) % 12 == 0 {
            sip = apply_step_up(sip, params.step_up_mode, params.step_up_value)?;
        }
        *flow = -sip;
    }
    flows[months] += final_corpus;
    Ok(flows)
}

/// Annualized return (percent, 2 dp) that equates contributions with
/// `final_corpus`.
///
/// Solved for a monthly rate by Newton-Raphson and annualized as
/// `(1 + r)^12 - 1`. Returns zero when `final_corpus <= 0`. Stopping at the
/// iteration cap is accepted; the last rate is used.
pub fn compute_xirr(params: &SipParams, final_corpus: Money) -> FinPlanResult<Percent> {
    if final_corpus <= Decimal::ZERO {
        return Ok(Decimal::ZERO);
    }

    let flows = sip_cash_flows(params, final_corpus)?;
    let solution = solve_periodic_rate(&flows, INITIAL_MONTHLY_GUESS, MAX_XIRR_ITERATIONS);
    if !solution.converged {
        log::warn!(
            "XIRR did not converge after {} iterations; using monthly rate {}",
            solution.iterations,
            solution.rate
        );
    }

    Ok(round_cents(annualize_monthly(solution.rate) * dec!(100)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sip::projection::{project, StepUpMode};
    use rust_decimal_macros::dec;

    fn params(annual_return: Decimal, years: Decimal) -> SipParams {
        SipParams {
            monthly_investment: dec!(10_000),
            tenure_years: years,
            annual_return,
            lumpsum: Decimal::ZERO,
            step_up_mode: StepUpMode::Percent,
            step_up_value: Decimal::ZERO,
            inflation_rate: Decimal::ZERO,
            inflation_enabled: false,
        }
    }

    #[test]
    fn test_cash_flows_shape() {
        let mut p = params(dec!(12), dec!(2));
        p.lumpsum = dec!(50_000);
        p.step_up_value = dec!(10);
        let flows = sip_cash_flows(&p, dec!(400_000)).unwrap();

        assert_eq!(flows.len(), 25);
        assert_eq!(flows[0], dec!(-50_000));
        assert_eq!(flows[1], dec!(-10_000));
        assert_eq!(flows[12], dec!(-10_000));
        assert_eq!(flows[13], dec!(-11_000));
        assert_eq!(flows[24], dec!(400_000) - dec!(11_000));
    }

    #[test]
    fn test_xirr_close_to_flat_return() {
        for (ret, years) in [(dec!(6), dec!(20)), (dec!(8), dec!(10))] {
            let p = params(ret, years);
            let corpus = project(&p).unwrap().estimated_corpus;
            let xirr = compute_xirr(&p, corpus).unwrap();
            assert!((xirr - ret).abs() <= dec!(0.5), "return {ret}% over {years}y gave XIRR {xirr}%");
        }
    }

    #[test]
    fn test_xirr_with_lumpsum_only_is_effective_rate() {
        let mut p = params(dec!(12), dec!(5));
        p.monthly_investment = Decimal::ZERO;
        p.lumpsum = dec!(100_000);
        let corpus = project(&p).unwrap().estimated_corpus;
        // 1% a month compounds to 12.68% a year
        assert_eq!(compute_xirr(&p, corpus).unwrap(), dec!(12.68));
    }

    #[test]
    fn test_xirr_zero_corpus() {
        let p = params(dec!(12), dec!(5));
        assert_eq!(compute_xirr(&p, Decimal::ZERO).unwrap(), Decimal::ZERO);
        assert_eq!(compute_xirr(&p, dec!(-10)).unwrap(), Decimal::ZERO);
    }

    #[test]
    fn test_xirr_loss_is_negative() {
        // Getting back less than was put in
        let p = params(dec!(0), dec!(3));
        let xirr = compute_xirr(&p, dec!(300_000)).unwrap();
        assert!(xirr < Decimal::ZERO);
    }

    #[test]
    fn test_cash_flows_step_up_overflow_is_error() {
        let mut p = params(dec!(12), dec!(100));
        p.monthly_investment = dec!(1_000_000_000_000);
        p.step_up_value = dec!(100);
        let err = sip_cash_flows(&p, dec!(1)).unwrap_err();
        assert!(matches!(err, crate::FinPlanError::NumericOverflow { .. }));
    }
}
