use rayon::prelude::*;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::debug;

use super::inputs::{analyze_property, AssumptionDefaults, PropertyRecord};
use super::operating::guarded_ratio;
use super::projection::CalculatedFinancials;
use crate::error::PropertyFinanceError;
use crate::types::{with_metadata, ComputationOutput, Money, Multiple};
use crate::PropertyFinanceResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Model outcome for one property of the batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioEntry {
    pub property_id: String,
    pub label: String,
    /// Present when the property passed the readiness gate
    #[serde(skip_serializing_if = "Option::is_none")]
    pub financials: Option<CalculatedFinancials>,
    /// Why the property was skipped
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub warnings: Vec<String>,
}

/// Totals across the analysed properties.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioTotals {
    pub properties_analyzed: usize,
    pub properties_skipped: usize,
    pub total_project_cost: Money,
    pub total_equity_invested: Money,
    pub total_debt: Money,
    pub total_net_operating_income: Money,
    pub total_annual_debt_service: Money,
    /// Aggregate NOI / aggregate debt service
    pub portfolio_dscr: Multiple,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioAnalysis {
    /// One entry per input record, in input order
    pub entries: Vec<PortfolioEntry>,
    pub totals: PortfolioTotals,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Model every property independently and in parallel, then aggregate the
/// ones that passed the readiness gate.
pub fn analyze_portfolio(
    records: &[PropertyRecord],
    defaults: &AssumptionDefaults,
) -> PropertyFinanceResult<ComputationOutput<PortfolioAnalysis>> {
    let start = Instant::now();

    if records.is_empty() {
        return Err(PropertyFinanceError::InsufficientData(
            "Portfolio must contain at least one property".into(),
        ));
    }

    let entries: Vec<PortfolioEntry> = records
        .par_iter()
        .map(|record| {
            let mut entry = PortfolioEntry {
                property_id: record.property_id.clone(),
                label: record.label().to_string(),
                financials: None,
                error: None,
                warnings: Vec::new(),
            };
            match analyze_property(record, defaults) {
                Ok(output) => {
                    entry.financials = Some(output.result);
                    entry.warnings = output.warnings;
                }
                Err(e) => entry.error = Some(e.to_string()),
            }
            entry
        })
        .collect();

    let totals = aggregate(records, defaults, &entries);

    let mut warnings = Vec::new();
    if totals.properties_skipped > 0 {
        warnings.push(format!(
            "{} of {} properties skipped for insufficient data",
            totals.properties_skipped,
            entries.len()
        ));
    }

    debug!(
        analyzed = totals.properties_analyzed,
        skipped = totals.properties_skipped,
        "portfolio analysis complete"
    );

    let elapsed = start.elapsed().as_micros() as u64;

    Ok(with_metadata(
        "Portfolio Roll-Up of Property Projections",
        &records,
        warnings,
        elapsed,
        PortfolioAnalysis { entries, totals },
    ))
}

fn aggregate(
    records: &[PropertyRecord],
    defaults: &AssumptionDefaults,
    entries: &[PortfolioEntry],
) -> PortfolioTotals {
    let mut totals = PortfolioTotals {
        properties_analyzed: 0,
        properties_skipped: 0,
        total_project_cost: Decimal::ZERO,
        total_equity_invested: Decimal::ZERO,
        total_debt: Decimal::ZERO,
        total_net_operating_income: Decimal::ZERO,
        total_annual_debt_service: Decimal::ZERO,
        portfolio_dscr: Decimal::ZERO,
    };

    for (record, entry) in records.iter().zip(entries) {
        let Some(financials) = &entry.financials else {
            totals.properties_skipped += 1;
            continue;
        };
        let inputs = record.resolve(defaults);
        totals.properties_analyzed += 1;
        totals.total_project_cost += financials.total_project_cost;
        totals.total_equity_invested += inputs.equity_invested;
        totals.total_debt += inputs.debt_amount;
        totals.total_net_operating_income += financials.net_operating_income;
        totals.total_annual_debt_service += financials.annual_debt_service;
    }

    totals.portfolio_dscr = guarded_ratio(
        totals.total_net_operating_income,
        totals.total_annual_debt_service,
    );
    totals
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn record(id: &str, units: u32, equity: Decimal, debt: Decimal) -> PropertyRecord {
        PropertyRecord {
            property_id: id.into(),
            purchase_price: Some(equity + debt),
            equity_invested: Some(equity),
            debt_amount: Some(debt),
            units: Some(units),
            avg_monthly_rent_per_unit: Some(dec!(1500)),
            vacancy_rate: Some(dec!(0.05)),
            expense_ratio: Some(dec!(0.40)),
            exit_cap_rate: Some(dec!(0.06)),
            sale_cost_percentage: Some(dec!(0.05)),
            hold_period_years: Some(5),
            ..Default::default()
        }
    }

    #[test]
    fn test_entries_keep_input_order() {
        let records = vec![
            record("a", 10, dec!(300000), dec!(700000)),
            record("b", 0, dec!(300000), dec!(700000)),
            record("c", 20, dec!(600000), dec!(1400000)),
        ];
        let output = analyze_portfolio(&records, &AssumptionDefaults::default()).unwrap();
        let ids: Vec<&str> = output
            .result
            .entries
            .iter()
            .map(|e| e.property_id.as_str())
            .collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_skipped_properties_reported() {
        let records = vec![
            record("a", 10, dec!(300000), dec!(700000)),
            record("b", 0, dec!(300000), dec!(700000)),
        ];
        let output = analyze_portfolio(&records, &AssumptionDefaults::default()).unwrap();
        let totals = &output.result.totals;

        assert_eq!(totals.properties_analyzed, 1);
        assert_eq!(totals.properties_skipped, 1);
        assert!(output.result.entries[1].error.is_some());
        assert!(output.result.entries[1].financials.is_none());
        assert!(output.warnings.iter().any(|w| w.contains("1 of 2")));
    }

    #[test]
    fn test_totals_sum_analysed_properties() {
        let records = vec![
            record("a", 10, dec!(300000), dec!(700000)),
            record("c", 20, dec!(600000), dec!(1400000)),
        ];
        let output = analyze_portfolio(&records, &AssumptionDefaults::default()).unwrap();
        let totals = &output.result.totals;

        assert_eq!(totals.total_project_cost, dec!(3000000));
        assert_eq!(totals.total_equity_invested, dec!(900000));
        assert_eq!(totals.total_debt, dec!(2100000));
        // NOI: 102,600 + 205,200
        assert_eq!(totals.total_net_operating_income, dec!(307800));
        assert_eq!(
            totals.portfolio_dscr,
            totals.total_net_operating_income / totals.total_annual_debt_service
        );
    }

    #[test]
    fn test_empty_portfolio_rejected() {
        let result = analyze_portfolio(&[], &AssumptionDefaults::default());
        assert!(matches!(result, Err(PropertyFinanceError::InsufficientData(_))));
    }
}
