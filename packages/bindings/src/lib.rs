use napi::Result as NapiResult;
use napi_derive::napi;
use rust_decimal::Decimal;

use property_finance_core::real_estate::inputs::{AssumptionDefaults, PropertyFinancialInputs, PropertyRecord};
use property_finance_core::time_value::DEFAULT_IRR_GUESS;

/// Convert any Display error into a napi::Error.
fn to_napi_error(e: impl std::fmt::Display) -> napi::Error {
    napi::Error::from_reason(e.to_string())
}

fn parse_defaults(defaults_json: Option<String>) -> NapiResult<AssumptionDefaults> {
    match defaults_json {
        Some(json) => AssumptionDefaults::from_json(&json).map_err(to_napi_error),
        None => Ok(AssumptionDefaults::default()),
    }
}

fn parse_decimal(field: &str, raw: &str) -> NapiResult<Decimal> {
    raw.parse::<Decimal>()
        .map_err(|e| to_napi_error(format!("{field}: {e}")))
}

// ---------------------------------------------------------------------------
// Property model
// ---------------------------------------------------------------------------

/// Run the engine on fully resolved inputs.
#[napi]
pub fn compute_financials(input_json: String) -> NapiResult<String> {
    let input: PropertyFinancialInputs = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = property_finance_core::real_estate::projection::compute_financials(&input);
    serde_json::to_string(&output).map_err(to_napi_error)
}

/// Resolve a stored record against defaults, gate it, and run the engine.
#[napi]
pub fn analyze_property(record_json: String, defaults_json: Option<String>) -> NapiResult<String> {
    let record: PropertyRecord = serde_json::from_str(&record_json).map_err(to_napi_error)?;
    let defaults = parse_defaults(defaults_json)?;
    let output = property_finance_core::real_estate::inputs::analyze_property(&record, &defaults)
        .map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn analyze_portfolio(records_json: String, defaults_json: Option<String>) -> NapiResult<String> {
    let records: Vec<PropertyRecord> = serde_json::from_str(&records_json).map_err(to_napi_error)?;
    let defaults = parse_defaults(defaults_json)?;
    let output = property_finance_core::real_estate::portfolio::analyze_portfolio(&records, &defaults)
        .map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Financing primitives
// ---------------------------------------------------------------------------

#[napi]
pub fn compute_irr(cash_flows_json: String, guess: Option<String>) -> NapiResult<String> {
    let cash_flows: Vec<Decimal> = serde_json::from_str(&cash_flows_json).map_err(to_napi_error)?;
    let guess = match guess {
        Some(raw) => parse_decimal("guess", &raw)?,
        None => DEFAULT_IRR_GUESS,
    };
    let solution = property_finance_core::time_value::irr(&cash_flows, guess);
    serde_json::to_string(&solution).map_err(to_napi_error)
}

/// Decimal arguments arrive as strings to keep full precision across the JS boundary.
#[napi]
pub fn monthly_payment(principal: String, annual_rate: String, amortization_years: u32) -> NapiResult<String> {
    let principal = parse_decimal("principal", &principal)?;
    let annual_rate = parse_decimal("annual_rate", &annual_rate)?;
    let payment = property_finance_core::real_estate::amortization::monthly_payment(
        principal,
        annual_rate,
        amortization_years,
    );
    Ok(payment.to_string())
}
