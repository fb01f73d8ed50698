mod commands;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use simplelog::{ColorChoice, ConfigBuilder, LevelFilter, TermLogger, TerminalMode};
use std::process;

use commands::loan::{LoanArgs, ScheduleArgs};
use commands::sip::{GoalArgs, SipArgs, XirrArgs};

/// Loan prepayment and SIP wealth planning
#[derive(Parser)]
#[command(
    name = "finplan",
    version,
    about = "Loan prepayment and SIP wealth planning",
    long_about = "A CLI for amortizing loans with prepayments and projecting systematic \
                  investment plans with decimal precision. Supports EMI schedules, \
                  prepayment impact analysis, SIP projections, goal seeking and XIRR."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,

    /// Minimum log level written to stderr
    #[arg(long, default_value_t = LevelFilter::Warn, global = true)]
    log_level: LevelFilter,

    /// Log at debug level or finer, with timestamps and source locations
    #[arg(long, default_value_t = false, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a loan with optional prepayments (summary, yearly rollup, schedule)
    Loan(LoanArgs),
    /// Print the month-by-month amortization schedule only
    Schedule(ScheduleArgs),
    /// Plan a SIP: projection, flat comparison, XIRR and delay cost
    Sip(SipArgs),
    /// Find the monthly SIP contribution that reaches a target corpus
    SipGoal(GoalArgs),
    /// Annualized return of a SIP for a given final corpus
    SipXirr(XirrArgs),
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

fn init_logging(log_level: LevelFilter, debug: bool) {
    let level = if debug {
        log_level.max(LevelFilter::Debug)
    } else {
        log_level
    };

    let mut config = ConfigBuilder::new();
    if debug {
        config.set_time_level(LevelFilter::Error);
        config.set_time_format_rfc3339();
        config.set_target_level(LevelFilter::Error);
        config.set_location_level(LevelFilter::Error);
    } else {
        config.set_time_level(LevelFilter::Off);
        config.set_thread_level(LevelFilter::Off);
        config.set_target_level(LevelFilter::Off);
        config.set_location_level(LevelFilter::Off);
    }

    // Results go to stdout, so logs stay on stderr
    if let Err(e) = TermLogger::init(level, config.build(), TerminalMode::Stderr, ColorChoice::Auto) {
        eprintln!("{}: failed to initialise logging: {}", "warning".yellow().bold(), e);
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_level, cli.debug);

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Loan(args) => commands::loan::run_loan(args),
        Commands::Schedule(args) => commands::loan::run_schedule(args),
        Commands::Sip(args) => commands::sip::run_sip(args),
        Commands::SipGoal(args) => commands::sip::run_goal(args),
        Commands::SipXirr(args) => commands::sip::run_xirr(args),
        Commands::Version => {
            println!("finplan {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            log::debug!("command failed: {e:?}");
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
