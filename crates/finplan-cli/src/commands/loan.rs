use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;

use finplan_core::loan::amortization::{self, Prepayment, PrepaymentStrategy};
use finplan_core::loan::analysis::{self, LoanInput};

use crate::input;

/// Arguments for loan analysis
#[derive(Args)]
pub struct LoanArgs {
    /// Path to a JSON/YAML file with the loan and its prepayments
    #[arg(long)]
    pub input: Option<String>,

    /// Amount borrowed
    #[arg(long)]
    pub principal: Option<Decimal>,

    /// Annual interest rate in percent (e.g. 8.5)
    #[arg(long)]
    pub rate: Option<Decimal>,

    /// Original tenure in months
    #[arg(long)]
    pub tenure_months: Option<u32>,

    /// Prepayment as month:amount:strategy[:description], strategy is
    /// reduce-tenure or reduce-emi (repeatable)
    #[arg(long = "prepayment", value_parser = parse_prepayment)]
    pub prepayments: Vec<Prepayment>,
}

/// Arguments for the bare amortization schedule
#[derive(Args)]
pub struct ScheduleArgs {
    #[command(flatten)]
    pub loan: LoanArgs,
}

pub fn run_loan(args: LoanArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let loan_input = resolve_input(args)?;
    let result = analysis::analyze_loan(&loan_input)?;
    Ok(serde_json::to_value(result)?)
}

/// Month-by-month rows only, so table and csv output print one row per month.
pub fn run_schedule(args: ScheduleArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let loan_input = resolve_input(args.loan)?;
    let schedule = amortization::simulate(
        loan_input.principal,
        loan_input.annual_rate,
        loan_input.tenure_months,
        &loan_input.prepayments,
    )?;
    if schedule.hit_safety_bound {
        log::warn!("schedule stopped at the safety bound with a balance outstanding");
    }
    Ok(serde_json::to_value(schedule.payments)?)
}

fn resolve_input(args: LoanArgs) -> Result<LoanInput, Box<dyn std::error::Error>> {
    if let Some(ref path) = args.input {
        return Ok(serde_json::from_value(input::file::read_value(path)?)?);
    }
    if args.principal.is_none() {
        if let Some(data) = input::stdin::read_stdin()? {
            return Ok(serde_json::from_value(data)?);
        }
    }

    Ok(LoanInput {
        principal: args
            .principal
            .ok_or("--principal is required (or provide --input)")?,
        annual_rate: args.rate.ok_or("--rate is required (or provide --input)")?,
        tenure_months: args
            .tenure_months
            .ok_or("--tenure-months is required (or provide --input)")?,
        prepayments: number_prepayments(args.prepayments),
    })
}

/// Give flag-supplied prepayments stable ids in the order they were given.
fn number_prepayments(prepayments: Vec<Prepayment>) -> Vec<Prepayment> {
    prepayments
        .into_iter()
        .enumerate()
        .map(|(i, mut p)| {
            p.id = format!("prepayment-{}", i + 1);
            p
        })
        .collect()
}

fn parse_prepayment(raw: &str) -> Result<Prepayment, String> {
    let mut parts = raw.splitn(4, ':');
    let month = parts
        .next()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| format!("'{raw}': expected month:amount:strategy"))?;
    let amount = parts
        .next()
        .ok_or_else(|| format!("'{raw}': missing amount"))?;
    let strategy = parts
        .next()
        .ok_or_else(|| format!("'{raw}': missing strategy"))?;

    let month: u32 = month
        .trim()
        .parse()
        .map_err(|e| format!("'{raw}': invalid month: {e}"))?;
    let amount: Decimal = amount
        .trim()
        .parse()
        .map_err(|e| format!("'{raw}': invalid amount: {e}"))?;
    let strategy = match strategy.trim().to_lowercase().replace('_', "-").as_str() {
        "reduce-tenure" | "tenure" => PrepaymentStrategy::ReduceTenure,
        "reduce-emi" | "emi" => PrepaymentStrategy::ReduceEmi,
        other => {
            return Err(format!(
                "'{raw}': unknown strategy '{other}'. Use: reduce-tenure, reduce-emi"
            ))
        }
    };

    Ok(Prepayment {
        id: String::new(),
        month,
        amount,
        strategy,
        description: parts.next().map(str::to_string).filter(|d| !d.is_empty()),
    })
}
