use clap::Args;
use serde_json::Value;
use tracing::debug;

use property_finance_core::real_estate::inputs::{self, AssumptionDefaults, PropertyRecord};
use property_finance_core::real_estate::portfolio;

use crate::input;

/// Arguments for single-property analysis
#[derive(Args)]
pub struct AnalyzeArgs {
    /// Path to JSON property record (stdin if omitted)
    #[arg(long)]
    pub input: Option<String>,

    /// Path to JSON assumption defaults for absent record fields
    #[arg(long)]
    pub defaults: Option<String>,
}

/// Arguments for portfolio analysis
#[derive(Args)]
pub struct PortfolioArgs {
    /// Path to JSON array of property records (stdin if omitted)
    #[arg(long)]
    pub input: Option<String>,

    /// Path to JSON assumption defaults for absent record fields
    #[arg(long)]
    pub defaults: Option<String>,
}

fn load_defaults(path: Option<&str>) -> Result<AssumptionDefaults, Box<dyn std::error::Error>> {
    match path {
        Some(path) => {
            debug!(path, "loading assumption defaults");
            let contents = input::file::read_text(path)?;
            Ok(AssumptionDefaults::from_json(&contents)?)
        }
        None => Ok(AssumptionDefaults::default()),
    }
}

pub fn run_analyze(args: AnalyzeArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let record: PropertyRecord = if let Some(ref path) = args.input {
        input::file::read_json(path)?
    } else if let Some(record) = input::stdin::read_stdin()? {
        record
    } else {
        return Err("--input <record.json> or stdin required for property analysis".into());
    };
    let defaults = load_defaults(args.defaults.as_deref())?;
    let result = inputs::analyze_property(&record, &defaults)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_portfolio(args: PortfolioArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let records: Vec<PropertyRecord> = if let Some(ref path) = args.input {
        input::file::read_json(path)?
    } else if let Some(records) = input::stdin::read_stdin()? {
        records
    } else {
        return Err("--input <records.json> or stdin required for portfolio analysis".into());
    };
    let defaults = load_defaults(args.defaults.as_deref())?;
    let result = portfolio::analyze_portfolio(&records, &defaults)?;
    Ok(serde_json::to_value(result)?)
}
