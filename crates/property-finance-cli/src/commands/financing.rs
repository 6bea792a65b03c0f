use clap::Args;
use rust_decimal::Decimal;
use serde_json::{json, Value};

use property_finance_core::real_estate::amortization;
use property_finance_core::time_value::{self, DEFAULT_IRR_GUESS};

/// Arguments for IRR calculation
#[derive(Args)]
pub struct IrrArgs {
    /// Periodic cash flows, outlay first (comma-separated, e.g. "-100,0,0,133.1")
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true, required = true)]
    pub cash_flows: Vec<Decimal>,

    /// Starting estimate for Newton-Raphson
    #[arg(long)]
    pub guess: Option<Decimal>,
}

/// Arguments for loan payment and balance
#[derive(Args)]
pub struct MortgageArgs {
    /// Loan principal
    #[arg(long)]
    pub principal: Decimal,

    /// Annual interest rate as a decimal (0.05 = 5%)
    #[arg(long)]
    pub rate: Decimal,

    /// Amortization period in years
    #[arg(long, default_value_t = 30)]
    pub amortization_years: u32,

    /// Years of payments already made
    #[arg(long)]
    pub years_paid: Option<u32>,
}

pub fn run_irr(args: IrrArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let guess = args.guess.unwrap_or(DEFAULT_IRR_GUESS);
    let solution = time_value::irr(&args.cash_flows, guess);
    let npv_at_rate = solution
        .rate
        .value()
        .map(|rate| time_value::npv(rate, &args.cash_flows));

    Ok(json!({
        "result": {
            "irr": solution.rate,
            "converged": solution.converged,
            "iterations": solution.iterations,
            "npv_at_irr": npv_at_rate,
        },
        "methodology": "Newton-Raphson IRR",
    }))
}

pub fn run_mortgage(args: MortgageArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let payment = amortization::monthly_payment(args.principal, args.rate, args.amortization_years);
    let remaining = args.years_paid.map(|years| {
        amortization::remaining_balance(args.principal, args.rate, args.amortization_years, years)
    });

    Ok(json!({
        "result": {
            "monthly_payment": payment,
            "annual_debt_service": payment * Decimal::from(12),
            "remaining_balance": remaining,
        },
        "methodology": "Fixed-rate level-payment amortization",
    }))
}
