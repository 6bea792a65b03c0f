use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::projection::{compute_financials, CalculatedFinancials};
use crate::error::PropertyFinanceError;
use crate::types::{ComputationOutput, Money, Rate};
use crate::PropertyFinanceResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Fully resolved deal assumptions for one property.
///
/// No invariants are enforced: equity and debt need not sum to the project
/// cost, and rates outside [0, 1] are accepted as given.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyFinancialInputs {
    /// Acquisition price
    pub purchase_price: Money,
    /// Construction / renovation hard costs
    pub hard_costs: Money,
    /// Fees, permits, design and other soft costs
    pub soft_costs: Money,
    /// Loan fees and closing costs of the financing
    pub financing_costs: Money,
    /// Contingency reserve
    pub contingency: Money,
    /// Cash equity contributed
    pub equity_invested: Money,
    /// Senior loan amount
    pub debt_amount: Money,
    /// Annual nominal interest rate (0.05 = 5%)
    pub debt_interest_rate: Rate,
    /// Loan term in years (balloon date)
    pub debt_term_years: u32,
    /// Amortization period in years (may exceed term)
    pub debt_amortization_years: u32,
    /// Number of rentable units
    pub units: u32,
    /// Average in-place monthly rent per unit
    pub avg_monthly_rent_per_unit: Money,
    /// Parking, laundry, storage etc. per month
    pub other_income_monthly: Money,
    /// Vacancy and collection loss (0.05 = 5%)
    pub vacancy_rate: Rate,
    /// Operating expenses as a share of effective gross income
    pub expense_ratio: Rate,
    /// Annual rent growth (may be negative)
    pub annual_rent_growth_rate: Rate,
    /// Annual expense growth (may be negative)
    pub annual_expense_growth_rate: Rate,
    /// Exit capitalisation rate applied to final-year NOI
    pub exit_cap_rate: Rate,
    /// Broker and closing costs at sale as a share of gross price
    pub sale_cost_percentage: Rate,
    /// Investment holding period in years
    pub hold_period_years: u32,
}

/// A property as held by the storage layer: every assumption is optional and
/// must be resolved against [`AssumptionDefaults`] before modelling.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PropertyRecord {
    pub property_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub purchase_price: Option<Money>,
    pub hard_costs: Option<Money>,
    pub soft_costs: Option<Money>,
    pub financing_costs: Option<Money>,
    pub contingency: Option<Money>,
    pub equity_invested: Option<Money>,
    pub debt_amount: Option<Money>,
    pub debt_interest_rate: Option<Rate>,
    pub debt_term_years: Option<u32>,
    pub debt_amortization_years: Option<u32>,
    pub units: Option<u32>,
    pub avg_monthly_rent_per_unit: Option<Money>,
    pub other_income_monthly: Option<Money>,
    pub vacancy_rate: Option<Rate>,
    pub expense_ratio: Option<Rate>,
    pub annual_rent_growth_rate: Option<Rate>,
    pub annual_expense_growth_rate: Option<Rate>,
    pub exit_cap_rate: Option<Rate>,
    pub sale_cost_percentage: Option<Rate>,
    pub hold_period_years: Option<u32>,
}

/// Values substituted for absent [`PropertyRecord`] fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssumptionDefaults {
    pub debt_interest_rate: Rate,
    pub debt_term_years: u32,
    pub debt_amortization_years: u32,
    pub vacancy_rate: Rate,
    pub expense_ratio: Rate,
    pub annual_rent_growth_rate: Rate,
    pub annual_expense_growth_rate: Rate,
    pub exit_cap_rate: Rate,
    pub sale_cost_percentage: Rate,
    pub hold_period_years: u32,
}

impl Default for AssumptionDefaults {
    fn default() -> Self {
        Self {
            debt_interest_rate: dec!(0.05),
            debt_term_years: 30,
            debt_amortization_years: 30,
            vacancy_rate: Decimal::ZERO,
            expense_ratio: Decimal::ZERO,
            annual_rent_growth_rate: Decimal::ZERO,
            annual_expense_growth_rate: Decimal::ZERO,
            exit_cap_rate: Decimal::ZERO,
            sale_cost_percentage: Decimal::ZERO,
            hold_period_years: 0,
        }
    }
}

impl AssumptionDefaults {
    /// Parse a (possibly partial) defaults document. Missing keys keep their
    /// built-in values.
    pub fn from_json(json: &str) -> PropertyFinanceResult<Self> {
        let defaults: AssumptionDefaults = serde_json::from_str(json)?;
        defaults.validate()?;
        Ok(defaults)
    }

    /// Rates must be decimals; a default of 5 almost certainly meant 5%.
    pub fn validate(&self) -> PropertyFinanceResult<()> {
        let rates = [
            ("debt_interest_rate", self.debt_interest_rate),
            ("vacancy_rate", self.vacancy_rate),
            ("expense_ratio", self.expense_ratio),
            ("annual_rent_growth_rate", self.annual_rent_growth_rate),
            ("annual_expense_growth_rate", self.annual_expense_growth_rate),
            ("exit_cap_rate", self.exit_cap_rate),
            ("sale_cost_percentage", self.sale_cost_percentage),
        ];
        for (field, rate) in rates {
            if rate.abs() > Decimal::ONE {
                return Err(PropertyFinanceError::InvalidInput {
                    field: field.into(),
                    reason: format!("{rate} looks like a percentage; rates are decimals (0.05 = 5%)"),
                });
            }
        }
        Ok(())
    }
}

impl PropertyRecord {
    /// Substitute defaults for every absent field. Amounts without a default
    /// resolve to zero.
    pub fn resolve(&self, defaults: &AssumptionDefaults) -> PropertyFinancialInputs {
        PropertyFinancialInputs {
            purchase_price: self.purchase_price.unwrap_or_default(),
            hard_costs: self.hard_costs.unwrap_or_default(),
            soft_costs: self.soft_costs.unwrap_or_default(),
            financing_costs: self.financing_costs.unwrap_or_default(),
            contingency: self.contingency.unwrap_or_default(),
            equity_invested: self.equity_invested.unwrap_or_default(),
            debt_amount: self.debt_amount.unwrap_or_default(),
            debt_interest_rate: self.debt_interest_rate.unwrap_or(defaults.debt_interest_rate),
            debt_term_years: self.debt_term_years.unwrap_or(defaults.debt_term_years),
            debt_amortization_years: self
                .debt_amortization_years
                .unwrap_or(defaults.debt_amortization_years),
            units: self.units.unwrap_or_default(),
            avg_monthly_rent_per_unit: self.avg_monthly_rent_per_unit.unwrap_or_default(),
            other_income_monthly: self.other_income_monthly.unwrap_or_default(),
            vacancy_rate: self.vacancy_rate.unwrap_or(defaults.vacancy_rate),
            expense_ratio: self.expense_ratio.unwrap_or(defaults.expense_ratio),
            annual_rent_growth_rate: self
                .annual_rent_growth_rate
                .unwrap_or(defaults.annual_rent_growth_rate),
            annual_expense_growth_rate: self
                .annual_expense_growth_rate
                .unwrap_or(defaults.annual_expense_growth_rate),
            exit_cap_rate: self.exit_cap_rate.unwrap_or(defaults.exit_cap_rate),
            sale_cost_percentage: self
                .sale_cost_percentage
                .unwrap_or(defaults.sale_cost_percentage),
            hold_period_years: self.hold_period_years.unwrap_or(defaults.hold_period_years),
        }
    }

    /// Display label: the name if present, otherwise the identifier.
    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.property_id)
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Gate applied before modelling: without units, equity and a hold period
/// there is not enough data for a meaningful result.
pub fn check_readiness(inputs: &PropertyFinancialInputs) -> PropertyFinanceResult<()> {
    if inputs.units == 0 {
        return Err(PropertyFinanceError::InsufficientData(
            "Unit count must be greater than zero".into(),
        ));
    }

    if inputs.equity_invested <= Decimal::ZERO {
        return Err(PropertyFinanceError::InsufficientData(
            "Equity invested must be greater than zero".into(),
        ));
    }

    if inputs.hold_period_years == 0 {
        return Err(PropertyFinanceError::InsufficientData(
            "Hold period must be at least 1 year".into(),
        ));
    }

    Ok(())
}

/// Resolve a stored record, gate it, and run the financial model.
pub fn analyze_property(
    record: &PropertyRecord,
    defaults: &AssumptionDefaults,
) -> PropertyFinanceResult<ComputationOutput<CalculatedFinancials>> {
    let inputs = record.resolve(defaults);
    check_readiness(&inputs)?;
    debug!(property = record.label(), "analysing property");
    Ok(compute_financials(&inputs))
}
