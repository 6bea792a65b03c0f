use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use super::amortization::monthly_payment;
use super::inputs::PropertyFinancialInputs;
use crate::types::{Money, Rate};

/// Year-one income, expense and coverage figures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearOneOperations {
    pub gross_potential_rent_annual: Money,
    pub effective_gross_income: Money,
    pub operating_expenses: Money,
    pub net_operating_income: Money,
    /// Collected income per month (EGI / 12)
    pub monthly_rent_income: Money,
    pub monthly_operating_expenses: Money,
    pub monthly_debt_service: Money,
    pub annual_debt_service: Money,
    pub monthly_net_cash_flow: Money,
    pub annual_net_cash_flow: Money,
    pub break_even_occupancy: Rate,
    pub dscr: Decimal,
    pub cash_on_cash_return: Rate,
    pub yield_on_cost: Rate,
}

/// `numerator / denominator`, or exactly zero when the denominator is zero.
pub(crate) fn guarded_ratio(numerator: Decimal, denominator: Decimal) -> Decimal {
    numerator.checked_div(denominator).unwrap_or(Decimal::ZERO)
}

/// Convert static rent-roll assumptions into first-year operating metrics.
pub fn analyze_year_one(
    inputs: &PropertyFinancialInputs,
    total_project_cost: Money,
) -> YearOneOperations {
    let months = dec!(12);

    let gross_potential_rent_annual =
        inputs.avg_monthly_rent_per_unit * Decimal::from(inputs.units) * months;
    let effective_gross_income = (gross_potential_rent_annual
        + inputs.other_income_monthly * months)
        * (Decimal::ONE - inputs.vacancy_rate);
    let operating_expenses = effective_gross_income * inputs.expense_ratio;
    let net_operating_income = effective_gross_income - operating_expenses;

    let monthly_rent_income = effective_gross_income / months;
    let monthly_operating_expenses = operating_expenses / months;
    let monthly_debt_service = monthly_payment(
        inputs.debt_amount,
        inputs.debt_interest_rate,
        inputs.debt_amortization_years,
    );
    let annual_debt_service = monthly_debt_service * months;

    let monthly_net_cash_flow =
        monthly_rent_income - monthly_operating_expenses - monthly_debt_service;
    let annual_net_cash_flow = monthly_net_cash_flow * months;

    YearOneOperations {
        gross_potential_rent_annual,
        effective_gross_income,
        operating_expenses,
        net_operating_income,
        monthly_rent_income,
        monthly_operating_expenses,
        monthly_debt_service,
        annual_debt_service,
        monthly_net_cash_flow,
        annual_net_cash_flow,
        break_even_occupancy: guarded_ratio(
            monthly_operating_expenses + monthly_debt_service,
            monthly_rent_income,
        ),
        dscr: guarded_ratio(net_operating_income, annual_debt_service),
        cash_on_cash_return: guarded_ratio(annual_net_cash_flow, inputs.equity_invested),
        yield_on_cost: guarded_ratio(net_operating_income, total_project_cost),
    }
}
