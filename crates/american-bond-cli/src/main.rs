mod commands;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;
use tracing_subscriber::EnvFilter;

use commands::bond::{BatchArgs, ScheduleArgs, ValueArgs};
use commands::rates::PeriodRateArgs;

/// American-method bond valuation
#[derive(Parser)]
#[command(
    name = "abond",
    version,
    about = "American-method bond schedules and valuation metrics",
    long_about = "Generates period-by-period cash-flow schedules for bullet (American-method) \
                  bonds with grace periods and inflation indexation, and derives issuer and \
                  investor metrics: price, NPV, TCEA/TREA, duration and convexity."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,

    /// Log progress to stderr (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Value a bond: schedule, TCEA/TREA, price, duration and convexity
    Value(ValueArgs),
    /// Generate the cash-flow schedule only
    Schedule(ScheduleArgs),
    /// Convert a quoted annual rate to the effective coupon-period rate
    PeriodRate(PeriodRateArgs),
    /// Value an array of bonds with bounded concurrency
    Batch(BatchArgs),
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

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "info" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Value(args) => commands::bond::run_value(args),
        Commands::Schedule(args) => commands::bond::run_schedule(args),
        Commands::PeriodRate(args) => commands::rates::run_period_rate(args),
        Commands::Batch(args) => commands::bond::run_batch(args),
        Commands::Version => {
            println!("abond {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
