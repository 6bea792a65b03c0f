mod commands;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use commands::financing::{IrrArgs, MortgageArgs};
use commands::property::{AnalyzeArgs, PortfolioArgs};

/// Real-estate investment financial modelling
#[derive(Parser)]
#[command(
    name = "pfm",
    version,
    about = "Real-estate investment financial modelling",
    long_about = "A CLI for modelling levered real-estate investments with decimal precision. \
                  Projects rent, expenses and debt service over the hold period, sizes the \
                  exit sale and reports DSCR, cash-on-cash, equity multiple and IRR."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,

    /// Log computation details to stderr
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Model one property from a stored record (JSON)
    Analyze(AnalyzeArgs),
    /// Model a list of properties in parallel and roll up totals
    Portfolio(PortfolioArgs),
    /// Solve the internal rate of return of a cash-flow series
    Irr(IrrArgs),
    /// Level monthly payment and remaining balance of a fixed-rate loan
    Mortgage(MortgageArgs),
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

/// Logs go to stderr so stdout stays clean for piped output.
fn init_tracing(verbose: bool) {
    let fallback = if verbose {
        "property_finance_core=debug,pfm=debug"
    } else {
        "property_finance_core=warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .compact(),
        )
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Analyze(args) => commands::property::run_analyze(args),
        Commands::Portfolio(args) => commands::property::run_portfolio(args),
        Commands::Irr(args) => commands::financing::run_irr(args),
        Commands::Mortgage(args) => commands::financing::run_mortgage(args),
        Commands::Version => {
            println!("pfm {}", env!("CARGO_PKG_VERSION"));
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
