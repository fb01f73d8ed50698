use finplan_core::loan::amortization::{self, Prepayment, PrepaymentStrategy, BALANCE_EPSILON};
use finplan_core::loan::analysis::{self, LoanInput};
use finplan_core::loan::summary::{self, LoanSummary};
use finplan_core::time_value::round_units;
use pretty_assertions::assert_eq;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

// ===========================================================================
// Helpers
// ===========================================================================

fn prepayment(id: &str, month: u32, amount: Decimal, strategy: PrepaymentStrategy) -> Prepayment {
    Prepayment {
        id: id.into(),
        month,
        amount,
        strategy,
        description: None,
    }
}

fn summarize(principal: Decimal, rate: Decimal, tenure: u32, prepayments: &[Prepayment]) -> LoanSummary {
    let schedule = amortization::simulate(principal, rate, tenure, prepayments).unwrap();
    summary::summarize(principal, rate, tenure, &schedule.payments, &schedule.impacts).unwrap()
}

fn mixed_prepayments() -> Vec<Prepayment> {
    vec![
        prepayment("bonus-1", 12, dec!(500_000), PrepaymentStrategy::ReduceTenure),
        prepayment("bonus-2", 24, dec!(300_000), PrepaymentStrategy::ReduceEmi),
        prepayment("bonus-3", 36, dec!(200_000), PrepaymentStrategy::ReduceTenure),
    ]
}

// ===========================================================================
// Schedule shape
// ===========================================================================

#[test]
fn test_balance_is_monotonic_and_non_negative() {
    let scenarios: Vec<(Decimal, Decimal, u32, Vec<Prepayment>)> = vec![
        (dec!(5_000_000), dec!(8.5), 240, vec![]),
        (dec!(5_000_000), dec!(8.5), 240, mixed_prepayments()),
        (dec!(250_000), dec!(0), 36, vec![prepayment("p", 10, dec!(40_000), PrepaymentStrategy::ReduceEmi)]),
        (dec!(1_000_000), dec!(18), 60, vec![prepayment("p", 59, dec!(999_999), PrepaymentStrategy::ReduceTenure)]),
    ];

    for (principal, rate, tenure, prepayments) in scenarios {
        let schedule = amortization::simulate(principal, rate, tenure, &prepayments).unwrap();
        let mut previous = principal;
        for payment in &schedule.payments {
            assert!(payment.remaining_balance >= Decimal::ZERO);
            assert!(
                payment.remaining_balance <= previous,
                "balance rose in month {}",
                payment.month
            );
            previous = payment.remaining_balance;
        }
        assert_eq!(previous, Decimal::ZERO);
    }
}

#[test]
fn test_payoff_converges_at_full_tenure() {
    let schedule = amortization::simulate(dec!(5_000_000), dec!(8.5), 240, &[]).unwrap();
    assert_eq!(schedule.payments.len(), 240);
    let last = schedule.payments.last().unwrap();
    assert!(last.remaining_balance <= BALANCE_EPSILON);
    let months: Vec<u32> = schedule.payments.iter().map(|p| p.month).collect();
    assert_eq!(months, (1..=240).collect::<Vec<u32>>());
}

#[test]
fn test_emi_formula() {
    let schedule = amortization::simulate(dec!(5_000_000), dec!(8.5), 240, &[]).unwrap();
    assert!(
        (schedule.installment - dec!(43391)).abs() <= dec!(1),
        "installment {}",
        schedule.installment
    );
    assert!(schedule.payments.iter().all(|p| p.installment == schedule.installment));
}

#[test]
fn test_zero_rate_loan() {
    let schedule = amortization::simulate(dec!(600_000), Decimal::ZERO, 48, &[]).unwrap();
    assert_eq!(schedule.installment, dec!(600_000) / dec!(48));
    assert_eq!(schedule.payments.len(), 48);
    assert!(schedule.payments.iter().all(|p| p.interest_portion.is_zero()));

    let summary = summarize(dec!(600_000), Decimal::ZERO, 48, &[]);
    assert_eq!(summary.total_interest_paid, Decimal::ZERO);
}

#[test]
fn test_zero_rate_reduce_tenure() {
    let p = prepayment("p", 12, dec!(120_000), PrepaymentStrategy::ReduceTenure);
    let schedule = amortization::simulate(dec!(480_000), Decimal::ZERO, 48, &[p]).unwrap();
    // 10k a month: 360k left after month 12, 240k after the prepayment
    let impact = &schedule.impacts[0];
    assert_eq!(impact.old_remaining_months, 36);
    assert_eq!(impact.new_remaining_months, 24);
    assert_eq!(schedule.payments.len(), 36);
}

// ===========================================================================
// Prepayment reconciliation
// ===========================================================================

#[test]
fn test_impacts_reconcile_with_total_savings() {
    let cases = vec![
        mixed_prepayments(),
        vec![prepayment("one", 12, dec!(500_000), PrepaymentStrategy::ReduceTenure)],
        vec![prepayment("one", 12, dec!(500_000), PrepaymentStrategy::ReduceEmi)],
        vec![
            prepayment("a", 6, dec!(100_000), PrepaymentStrategy::ReduceEmi),
            prepayment("b", 6, dec!(100_000), PrepaymentStrategy::ReduceTenure),
            prepayment("c", 200, dec!(1), PrepaymentStrategy::ReduceEmi),
        ],
        vec![prepayment("payoff", 30, dec!(10_000_000), PrepaymentStrategy::ReduceEmi)],
    ];

    for prepayments in cases {
        let summary = summarize(dec!(5_000_000), dec!(8.5), 240, &prepayments);
        let total: Decimal = summary.prepayment_impacts.iter().map(|i| i.interest_saved).sum();
        assert_eq!(total, round_units(summary.interest_saved_vs_no_prepayment));

        let last = summary.prepayment_impacts.last().unwrap();
        assert_eq!(last.cumulative_interest_saved, total);
        assert!(summary.prepayment_impacts.iter().all(|i| i.interest_saved >= Decimal::ZERO));
    }
}

#[test]
fn test_savings_against_baseline() {
    let baseline = summarize(dec!(5_000_000), dec!(8.5), 240, &[]);
    let with_prepayments = summarize(dec!(5_000_000), dec!(8.5), 240, &mixed_prepayments());

    assert!(with_prepayments.actual_tenure_months < baseline.actual_tenure_months);
    let expected = baseline.total_interest_paid - with_prepayments.total_interest_paid;
    assert_eq!(with_prepayments.interest_saved_vs_no_prepayment, expected);
    assert_eq!(with_prepayments.monthly_installment, baseline.monthly_installment);
}

#[test]
fn test_reduce_tenure_never_worse_than_reduce_emi() {
    for (month, amount) in [(1, dec!(100_000)), (12, dec!(500_000)), (60, dec!(1_000_000)), (180, dec!(250_000))] {
        let tenure = summarize(
            dec!(5_000_000),
            dec!(8.5),
            240,
            &[prepayment("p", month, amount, PrepaymentStrategy::ReduceTenure)],
        );
        let emi = summarize(
            dec!(5_000_000),
            dec!(8.5),
            240,
            &[prepayment("p", month, amount, PrepaymentStrategy::ReduceEmi)],
        );
        assert!(
            tenure.interest_saved_vs_no_prepayment >= emi.interest_saved_vs_no_prepayment,
            "month {month}, amount {amount}"
        );
    }
}

#[test]
fn test_earlier_prepayment_saves_more() {
    for strategy in [PrepaymentStrategy::ReduceTenure, PrepaymentStrategy::ReduceEmi] {
        let savings: Vec<Decimal> = [6, 12, 60, 120, 200]
            .iter()
            .map(|&m| {
                summarize(dec!(5_000_000), dec!(8.5), 240, &[prepayment("p", m, dec!(500_000), strategy)])
                    .interest_saved_vs_no_prepayment
            })
            .collect();
        for pair in savings.windows(2) {
            assert!(pair[0] >= pair[1], "{strategy:?}: {savings:?}");
        }
    }
}

#[test]
fn test_prepayment_larger_than_balance_is_capped() {
    let p = prepayment("huge", 6, dec!(2_000_000), PrepaymentStrategy::ReduceTenure);
    let summary = summarize(dec!(1_000_000), dec!(9), 120, &[p]);
    assert_eq!(summary.actual_tenure_months, 6);
    let impact = &summary.prepayment_impacts[0];
    assert!(impact.amount_applied < dec!(1_000_000));
    // Nothing beyond the outstanding balance is counted as paid
    assert!((summary.total_amount_paid - (dec!(1_000_000) + summary.total_interest_paid)).abs() < dec!(0.01));
}

// ===========================================================================
// Analysis envelope
// ===========================================================================

#[test]
fn test_analyze_loan_from_json() {
    let json = r#"{
        "principal": "5000000",
        "annual_rate": "8.5",
        "tenure_months": 240,
        "prepayments": [
            {"id": "bonus", "month": 12, "amount": "500000", "strategy": "ReduceTenure", "description": "Year-end bonus"}
        ]
    }"#;
    let input: LoanInput = serde_json::from_str(json).unwrap();
    let output = analysis::analyze_loan(&input).unwrap();

    assert_eq!(output.result.summary.actual_tenure_months, 192);
    let impact = &output.result.summary.prepayment_impacts[0];
    assert_eq!(impact.description.as_deref(), Some("Year-end bonus"));
    assert_eq!(
        impact.interest_saved,
        round_units(output.result.summary.interest_saved_vs_no_prepayment)
    );
    assert_eq!(output.metadata.precision, "rust_decimal_128bit");
}
