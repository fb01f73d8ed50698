use clap::{Args, ValueEnum};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use finplan_core::sip::goal::{self, GoalSeek};
use finplan_core::sip::planner::{self, PlannerMode, SipInput};
use finplan_core::sip::projection::{self, StepUpMode};
use finplan_core::sip::xirr;
use finplan_core::time_value::round_cents;
use finplan_core::FinPlanError;

use crate::input;

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum StepUpArg {
    Percent,
    Fixed,
}

impl From<StepUpArg> for StepUpMode {
    fn from(arg: StepUpArg) -> Self {
        match arg {
            StepUpArg::Percent => StepUpMode::Percent,
            StepUpArg::Fixed => StepUpMode::Fixed,
        }
    }
}

/// SIP parameters shared by every sip subcommand
#[derive(Args)]
pub struct SipParamArgs {
    /// Path to a JSON/YAML file with the SIP parameters
    #[arg(long)]
    pub input: Option<String>,

    /// Monthly contribution
    #[arg(long)]
    pub monthly: Option<Decimal>,

    /// Investment horizon in years (fractions allowed)
    #[arg(long)]
    pub years: Option<Decimal>,

    /// Expected annual return in percent
    #[arg(long = "return", allow_hyphen_values = true)]
    pub annual_return: Option<Decimal>,

    /// One-time amount invested at the start
    #[arg(long, default_value = "0")]
    pub lumpsum: Decimal,

    /// How the contribution grows each year
    #[arg(long, value_enum, default_value = "percent")]
    pub step_up_mode: StepUpArg,

    /// Yearly step-up: a percent or a fixed amount, per --step-up-mode
    #[arg(long, default_value = "0")]
    pub step_up: Decimal,

    /// Annual inflation in percent; enables the inflation-adjusted corpus
    #[arg(long)]
    pub inflation: Option<Decimal>,
}

/// Arguments for a full SIP plan
#[derive(Args)]
pub struct SipArgs {
    #[command(flatten)]
    pub params: SipParamArgs,

    /// Solve for the monthly contribution that reaches this corpus
    #[arg(long)]
    pub target: Option<Decimal>,
}

/// Arguments for the goal search
#[derive(Args)]
pub struct GoalArgs {
    #[command(flatten)]
    pub params: SipParamArgs,

    /// Corpus to reach
    #[arg(long)]
    pub target: Option<Decimal>,
}

/// Arguments for SIP XIRR
#[derive(Args)]
pub struct XirrArgs {
    #[command(flatten)]
    pub params: SipParamArgs,

    /// Final corpus received; defaults to the projected corpus
    #[arg(long, allow_hyphen_values = true)]
    pub final_corpus: Option<Decimal>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GoalOutput {
    target_corpus: Decimal,
    required_monthly_investment: Decimal,
    projected_corpus: Decimal,
    total_invested: Decimal,
}

#[derive(Debug, Serialize, Deserialize)]
struct XirrOutput {
    xirr: Decimal,
    final_corpus: Decimal,
    total_invested: Decimal,
    months: u32,
}

pub fn run_sip(args: SipArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let mut sip_input = resolve_input(args.params)?;
    if let Some(target) = args.target {
        sip_input.mode = PlannerMode::Goal;
        sip_input.target_corpus = target;
    }
    let result = planner::plan_sip(&sip_input)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_goal(args: GoalArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let sip_input = resolve_input(args.params)?;
    let target = match args.target {
        Some(t) => t,
        None if sip_input.target_corpus > Decimal::ZERO => sip_input.target_corpus,
        None => return Err("--target is required (or set target_corpus in --input)".into()),
    };

    let params = sip_input.params(sip_input.monthly_investment);
    match goal::find_required_monthly_investment(target, &params)? {
        GoalSeek::Found(required) => {
            let mut check = params.clone();
            check.monthly_investment = required;
            let projection = projection::project(&check)?;
            Ok(serde_json::to_value(GoalOutput {
                target_corpus: target,
                required_monthly_investment: required,
                projected_corpus: round_cents(projection.estimated_corpus),
                total_invested: round_cents(projection.total_invested),
            })?)
        }
        GoalSeek::Unreachable { ceiling, best_corpus } => Err(Box::new(FinPlanError::GoalUnreachable {
            target,
            ceiling,
            best_corpus: round_cents(best_corpus),
        })),
    }
}

pub fn run_xirr(args: XirrArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let sip_input = resolve_input(args.params)?;
    let params = sip_input.params(sip_input.monthly_investment);
    let projected = projection::project(&params)?;
    let final_corpus = args.final_corpus.unwrap_or(projected.estimated_corpus);

    Ok(serde_json::to_value(XirrOutput {
        xirr: xirr::compute_xirr(&params, final_corpus)?,
        final_corpus: round_cents(final_corpus),
        total_invested: round_cents(projected.total_invested),
        months: projection::total_months(params.tenure_years),
    })?)
}

fn resolve_input(args: SipParamArgs) -> Result<SipInput, Box<dyn std::error::Error>> {
    if let Some(ref path) = args.input {
        return Ok(serde_json::from_value(input::file::read_value(path)?)?);
    }
    if args.monthly.is_none() && args.years.is_none() {
        if let Some(data) = input::stdin::read_stdin()? {
            return Ok(serde_json::from_value(data)?);
        }
    }

    Ok(SipInput {
        monthly_investment: args.monthly.unwrap_or(Decimal::ZERO),
        tenure_years: args.years.ok_or("--years is required (or provide --input)")?,
        annual_return: args
            .annual_return
            .ok_or("--return is required (or provide --input)")?,
        lumpsum_amount: args.lumpsum,
        step_up_mode: args.step_up_mode.into(),
        step_up_value: args.step_up,
        inflation_enabled: args.inflation.is_some(),
        inflation_rate: args.inflation.unwrap_or(Decimal::ZERO),
        mode: PlannerMode::Wealth,
        target_corpus: Decimal::ZERO,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn param_args() -> SipParamArgs {
        SipParamArgs {
            input: None,
            monthly: Some(dec!(10_000)),
            years: Some(dec!(10)),
            annual_return: Some(dec!(12)),
            lumpsum: Decimal::ZERO,
            step_up_mode: StepUpArg::Percent,
            step_up: Decimal::ZERO,
            inflation: None,
        }
    }

    #[test]
    fn test_sip_from_flags() {
        let value = run_sip(SipArgs {
            params: param_args(),
            target: None,
        })
        .unwrap();
        assert_eq!(value["result"]["yearly_breakdown"].as_array().unwrap().len(), 10);
        assert_eq!(value["result"]["required_monthly_investment"], "0");
    }

    #[test]
    fn test_goal_requires_target() {
        let err = run_goal(GoalArgs {
            params: param_args(),
            target: None,
        })
        .unwrap_err();
        assert!(err.to_string().contains("--target"));
    }

    #[test]
    fn test_xirr_defaults_to_projected_corpus() {
        let value = run_xirr(XirrArgs {
            params: param_args(),
            final_corpus: None,
        })
        .unwrap();
        assert_eq!(value["months"], 120);
        assert!(value["xirr"].is_string());
    }

    #[test]
    fn test_xirr_overflowing_projection_is_error() {
        let mut params = param_args();
        params.years = Some(dec!(500));
        let err = run_xirr(XirrArgs {
            params,
            final_corpus: None,
        })
        .unwrap_err();
        assert!(err.to_string().contains("Numeric overflow"));
    }
}
