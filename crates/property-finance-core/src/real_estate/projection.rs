use rust_decimal::Decimal;
use rust_decimal::MathematicalOps;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, warn};

use super::amortization::remaining_balance;
use super::inputs::PropertyFinancialInputs;
use super::operating::{analyze_year_one, guarded_ratio};
use crate::time_value::{irr, DEFAULT_IRR_GUESS};
use crate::types::{with_metadata, ComputationOutput, Money, Multiple, Outcome, Rate};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// One year of the hold-period projection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearlyProjection {
    /// 1-based year of the hold period
    pub year: u32,
    pub gross_potential_rent: Money,
    pub effective_gross_income: Money,
    pub operating_expenses: Money,
    pub net_operating_income: Money,
    pub debt_service: Money,
    /// NOI less debt service
    pub cash_flow: Money,
    /// Loan payoff amount at year end
    pub remaining_loan_balance: Money,
}

/// Complete investment model for one property.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalculatedFinancials {
    // --- Capital stack ---
    pub total_project_cost: Money,
    pub equity_percentage: Rate,
    /// Loan-to-cost
    pub ltv: Rate,

    // --- Year 1 operations ---
    pub gross_potential_rent_annual: Money,
    pub effective_gross_income: Money,
    pub operating_expenses: Money,
    pub net_operating_income: Money,

    // --- Year 1 cash flow ---
    pub monthly_rent_income: Money,
    pub monthly_operating_expenses: Money,
    pub monthly_debt_service: Money,
    pub annual_debt_service: Money,
    pub monthly_net_cash_flow: Money,
    pub annual_net_cash_flow: Money,

    // --- Performance ---
    pub break_even_occupancy: Rate,
    pub dscr: Decimal,
    pub cash_on_cash_return: Rate,
    pub yield_on_cost: Rate,

    // --- Exit ---
    /// Final-year NOI capitalised at the exit cap rate
    pub gross_sale_price: Outcome,
    pub sale_costs: Outcome,
    /// Loan payoff at the end of the hold period
    pub remaining_loan_balance: Money,
    pub net_sale_proceeds: Outcome,
    pub total_profit: Outcome,
    pub equity_multiple: Outcome,

    // --- Returns ---
    pub projections: Vec<YearlyProjection>,
    /// Annualised levered return on equity
    pub irr: Outcome,
    pub irr_converged: bool,
    pub irr_iterations: u32,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Build the full investment model: capital stack, year-one operations,
/// hold-period projections, exit sale and return metrics.
///
/// The model never fails. Zero denominators in ratios produce zero; a zero
/// exit cap rate or an unsolvable IRR produce [`Outcome::Undefined`]. Growth
/// that compounds past the decimal range leaves the projection empty and the
/// exit and return figures undefined.
pub fn compute_financials(inputs: &PropertyFinancialInputs) -> ComputationOutput<CalculatedFinancials> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    // --- Capital stack ---
    let total_project_cost = inputs.purchase_price
        + inputs.hard_costs
        + inputs.soft_costs
        + inputs.financing_costs
        + inputs.contingency;
    let equity_percentage = guarded_ratio(inputs.equity_invested, total_project_cost);
    let ltv = guarded_ratio(inputs.debt_amount, total_project_cost);

    // --- Year 1 ---
    let year_one = analyze_year_one(inputs, total_project_cost);

    // --- Hold-period projection ---
    let projections = project_hold_period(
        inputs,
        year_one.gross_potential_rent_annual,
        year_one.operating_expenses,
        year_one.annual_debt_service,
    );
    let projection_overflow = projections.is_none();
    if projection_overflow {
        warn!(
            rent_growth = %inputs.annual_rent_growth_rate,
            expense_growth = %inputs.annual_expense_growth_rate,
            hold_period_years = inputs.hold_period_years,
            "hold-period projection exceeds decimal range"
        );
    }

    // --- Exit ---
    let (projections, remaining_loan_balance, exit) = match projections {
        Some(projections) => {
            let final_year_noi = projections
                .last()
                .map(|p| p.net_operating_income)
                .unwrap_or(year_one.net_operating_income);
            let remaining_loan_balance = projections
                .last()
                .map(|p| p.remaining_loan_balance)
                .unwrap_or(Decimal::ZERO);
            let exit = compute_exit(
                final_year_noi,
                inputs.exit_cap_rate,
                inputs.sale_cost_percentage,
                remaining_loan_balance,
            );
            (projections, remaining_loan_balance, exit)
        }
        None => {
            let remaining_loan_balance = remaining_balance(
                inputs.debt_amount,
                inputs.debt_interest_rate,
                inputs.debt_amortization_years,
                inputs.hold_period_years,
            );
            (Vec::new(), remaining_loan_balance, ExitAnalysis::undefined())
        }
    };

    let cumulative_cash_flow: Option<Money> = projections
        .iter()
        .try_fold(-inputs.equity_invested, |acc, p| acc.checked_add(p.cash_flow));

    let equity_multiple = if inputs.equity_invested.is_zero() {
        Outcome::Finite(Decimal::ZERO)
    } else {
        exit.net_sale_proceeds.and_then(|proceeds| {
            cumulative_cash_flow?
                .checked_add(proceeds)?
                .checked_div(inputs.equity_invested)
        })
    };
    let total_profit = exit.net_sale_proceeds.and_then(|proceeds| {
        cumulative_cash_flow?
            .checked_add(proceeds)?
            .checked_sub(inputs.equity_invested)
    });

    // --- IRR: sale proceeds fold into the final operating period ---
    let flows = exit
        .net_sale_proceeds
        .value()
        .and_then(|proceeds| equity_cash_flows(inputs.equity_invested, &projections, proceeds));
    let (irr_rate, irr_converged, irr_iterations) = match flows {
        Some(flows) => {
            let solution = irr(&flows, DEFAULT_IRR_GUESS);
            (solution.rate, solution.converged, solution.iterations)
        }
        None => (Outcome::Undefined, false, 0),
    };

    // --- Warnings ---
    collect_warnings(
        inputs,
        total_project_cost,
        ltv,
        year_one.dscr,
        year_one.net_operating_income,
        &exit,
        projection_overflow,
        irr_rate,
        irr_converged,
        &mut warnings,
    );

    debug!(
        years = projections.len(),
        %total_project_cost,
        noi = %year_one.net_operating_income,
        irr_converged,
        "computed property financials"
    );

    let output = CalculatedFinancials {
        total_project_cost,
        equity_percentage,
        ltv,
        gross_potential_rent_annual: year_one.gross_potential_rent_annual,
        effective_gross_income: year_one.effective_gross_income,
        operating_expenses: year_one.operating_expenses,
        net_operating_income: year_one.net_operating_income,
        monthly_rent_income: year_one.monthly_rent_income,
        monthly_operating_expenses: year_one.monthly_operating_expenses,
        monthly_debt_service: year_one.monthly_debt_service,
        annual_debt_service: year_one.annual_debt_service,
        monthly_net_cash_flow: year_one.monthly_net_cash_flow,
        annual_net_cash_flow: year_one.annual_net_cash_flow,
        break_even_occupancy: year_one.break_even_occupancy,
        dscr: year_one.dscr,
        cash_on_cash_return: year_one.cash_on_cash_return,
        yield_on_cost: year_one.yield_on_cost,
        gross_sale_price: exit.gross_sale_price,
        sale_costs: exit.sale_costs,
        remaining_loan_balance,
        net_sale_proceeds: exit.net_sale_proceeds,
        total_profit,
        equity_multiple,
        projections,
        irr: irr_rate,
        irr_converged,
        irr_iterations,
    };

    let elapsed = start.elapsed().as_micros() as u64;

    with_metadata(
        "Levered Hold-Period Projection with Direct-Cap Exit",
        inputs,
        warnings,
        elapsed,
        output,
    )
}

// ---------------------------------------------------------------------------
// Projection
// ---------------------------------------------------------------------------

/// Grow rent from the year-one gross potential rent and expenses from the
/// year-one expense baseline on independent curves. Other income is not grown.
///
/// `None` when a grown figure leaves the decimal range.
fn project_hold_period(
    inputs: &PropertyFinancialInputs,
    base_gross_rent: Money,
    base_operating_expenses: Money,
    annual_debt_service: Money,
) -> Option<Vec<YearlyProjection>> {
    let other_income_annual = inputs.other_income_monthly.checked_mul(dec!(12))?;
    let occupancy = Decimal::ONE.checked_sub(inputs.vacancy_rate)?;
    let rent_growth = Decimal::ONE.checked_add(inputs.annual_rent_growth_rate)?;
    let expense_growth = Decimal::ONE.checked_add(inputs.annual_expense_growth_rate)?;

    (1..=inputs.hold_period_years)
        .map(|year| {
            let elapsed = i64::from(year - 1);
            let gross_potential_rent =
                base_gross_rent.checked_mul(rent_growth.checked_powi(elapsed)?)?;
            let effective_gross_income = gross_potential_rent
                .checked_add(other_income_annual)?
                .checked_mul(occupancy)?;
            let operating_expenses =
                base_operating_expenses.checked_mul(expense_growth.checked_powi(elapsed)?)?;
            let net_operating_income = effective_gross_income.checked_sub(operating_expenses)?;

            Some(YearlyProjection {
                year,
                gross_potential_rent,
                effective_gross_income,
                operating_expenses,
                net_operating_income,
                debt_service: annual_debt_service,
                cash_flow: net_operating_income.checked_sub(annual_debt_service)?,
                remaining_loan_balance: remaining_balance(
                    inputs.debt_amount,
                    inputs.debt_interest_rate,
                    inputs.debt_amortization_years,
                    year,
                ),
            })
        })
        .collect()
}

/// Equity cash flows for the IRR: the outlay at t=0, then each year's cash
/// flow with the net sale proceeds added to the last year.
fn equity_cash_flows(
    equity_invested: Money,
    projections: &[YearlyProjection],
    net_sale_proceeds: Money,
) -> Option<Vec<Money>> {
    let mut flows = Vec::with_capacity(projections.len() + 1);
    flows.push(-equity_invested);
    flows.extend(projections.iter().map(|p| p.cash_flow));
    if let Some(last) = flows.last_mut() {
        *last = last.checked_add(net_sale_proceeds)?;
    }
    Some(flows)
}

// ---------------------------------------------------------------------------
// Exit
// ---------------------------------------------------------------------------

struct ExitAnalysis {
    gross_sale_price: Outcome,
    sale_costs: Outcome,
    net_sale_proceeds: Outcome,
}

impl ExitAnalysis {
    fn undefined() -> Self {
        ExitAnalysis {
            gross_sale_price: Outcome::Undefined,
            sale_costs: Outcome::Undefined,
            net_sale_proceeds: Outcome::Undefined,
        }
    }
}

fn compute_exit(
    final_year_noi: Money,
    exit_cap_rate: Rate,
    sale_cost_percentage: Rate,
    loan_payoff: Money,
) -> ExitAnalysis {
    let gross_sale_price = Outcome::from_checked(final_year_noi.checked_div(exit_cap_rate));
    let sale_costs = gross_sale_price.and_then(|price| price.checked_mul(sale_cost_percentage));
    let net_sale_proceeds = match (gross_sale_price, sale_costs) {
        (Outcome::Finite(price), Outcome::Finite(costs)) => {
            Outcome::from_checked(price.checked_sub(costs).and_then(|net| net.checked_sub(loan_payoff)))
        }
        _ => Outcome::Undefined,
    };

    ExitAnalysis {
        gross_sale_price,
        sale_costs,
        net_sale_proceeds,
    }
}

// ---------------------------------------------------------------------------
// Warnings
// ---------------------------------------------------------------------------

#[allow(clippy::too_many_arguments)]
fn collect_warnings(
    inputs: &PropertyFinancialInputs,
    total_project_cost: Money,
    ltv: Rate,
    dscr: Multiple,
    year_one_noi: Money,
    exit: &ExitAnalysis,
    projection_overflow: bool,
    irr_rate: Outcome,
    irr_converged: bool,
    warnings: &mut Vec<String>,
) {
    if dscr < dec!(1.2) && dscr > Decimal::ZERO {
        warnings.push(format!(
            "DSCR of {dscr:.2} is below 1.20x — lender covenant risk"
        ));
    }

    if ltv > dec!(0.80) {
        warnings.push(format!(
            "Loan-to-cost of {:.1}% exceeds 80% — high leverage",
            ltv * dec!(100)
        ));
    }

    let capital_raised = inputs.equity_invested + inputs.debt_amount;
    if capital_raised != total_project_cost {
        warnings.push(format!(
            "Equity plus debt ({capital_raised}) does not match total project cost ({total_project_cost})"
        ));
    }

    if !inputs.debt_amount.is_zero() && inputs.hold_period_years > inputs.debt_term_years {
        warnings.push(format!(
            "Hold period of {} years extends past the {}-year loan term — balloon refinancing not modelled",
            inputs.hold_period_years, inputs.debt_term_years
        ));
    }

    if year_one_noi < Decimal::ZERO {
        warnings.push("Year 1 NOI is negative — property does not cover operating expenses".into());
    }

    if projection_overflow {
        warnings.push(format!(
            "Growth over {} years exceeds representable amounts — projections, sale price, proceeds, profit, multiple and IRR are undefined",
            inputs.hold_period_years
        ));
    } else if inputs.exit_cap_rate.is_zero() {
        warn!(exit_cap_rate = %inputs.exit_cap_rate, "sale price undefined");
        warnings.push(
            "Exit cap rate is zero — sale price, proceeds, profit, multiple and IRR are undefined"
                .into(),
        );
    } else if !exit.net_sale_proceeds.is_finite() {
        warnings.push("Sale proceeds exceed representable amounts — profit, multiple and IRR are undefined".into());
    } else if !irr_rate.is_finite() {
        warnings.push("IRR is undefined for this cash-flow sequence".into());
    } else if !irr_converged {
        warnings.push("IRR did not converge within 100 iterations — value is a best estimate".into());
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    /// 10-unit apartment building, 70% loan-to-cost
    fn sample_inputs() -> PropertyFinancialInputs {
        PropertyFinancialInputs {
            purchase_price: dec!(1000000),
            hard_costs: Decimal::ZERO,
            soft_costs: Decimal::ZERO,
            financing_costs: Decimal::ZERO,
            contingency: Decimal::ZERO,
            equity_invested: dec!(300000),
            debt_amount: dec!(700000),
            debt_interest_rate: dec!(0.05),
            debt_term_years: 30,
            debt_amortization_years: 30,
            units: 10,
            avg_monthly_rent_per_unit: dec!(1500),
            other_income_monthly: Decimal::ZERO,
            vacancy_rate: dec!(0.05),
            expense_ratio: dec!(0.40),
            annual_rent_growth_rate: dec!(0.03),
            annual_expense_growth_rate: dec!(0.03),
            exit_cap_rate: dec!(0.06),
            sale_cost_percentage: dec!(0.05),
            hold_period_years: 5,
        }
    }

    #[test]
    fn test_capital_stack_ratios() {
        let mut inputs = sample_inputs();
        inputs.hard_costs = dec!(150000);
        inputs.soft_costs = dec!(50000);
        let out = compute_financials(&inputs).result;

        assert_eq!(out.total_project_cost, dec!(1200000));
        assert_eq!(out.equity_percentage, dec!(0.25));
        assert_eq!(out.ltv, dec!(700000) / dec!(1200000));
    }

    #[test]
    fn test_year_two_growth() {
        let out = compute_financials(&sample_inputs()).result;
        let y2 = &out.projections[1];

        // GPR_Y2 = 180,000 * 1.03 = 185,400
        assert_eq!(y2.gross_potential_rent, dec!(185400));
        // EGI_Y2 = 185,400 * 0.95 = 176,130
        assert_eq!(y2.effective_gross_income, dec!(176130));
        // OpEx_Y2 = 68,400 * 1.03 = 70,452
        assert_eq!(y2.operating_expenses, dec!(70452));
        assert_eq!(y2.net_operating_income, dec!(105678));
    }

    #[test]
    fn test_expenses_grow_from_year_one_baseline() {
        let mut inputs = sample_inputs();
        inputs.annual_rent_growth_rate = dec!(0.05);
        inputs.annual_expense_growth_rate = Decimal::ZERO;
        let out = compute_financials(&inputs).result;

        // Flat expenses despite rising income: realised expense ratio drifts down
        for p in &out.projections {
            assert_eq!(p.operating_expenses, dec!(68400));
        }
        let last = out.projections.last().unwrap();
        assert!(last.operating_expenses / last.effective_gross_income < dec!(0.40));
    }

    #[test]
    fn test_other_income_not_grown() {
        let mut inputs = sample_inputs();
        inputs.other_income_monthly = dec!(1000);
        inputs.vacancy_rate = Decimal::ZERO;
        let out = compute_financials(&inputs).result;
        let y3 = &out.projections[2];

        // EGI_Y3 = 180,000 * 1.03^2 + 12,000
        assert_eq!(y3.effective_gross_income, dec!(190962) + dec!(12000));
    }

    #[test]
    fn test_debt_service_constant_and_cash_flow() {
        let out = compute_financials(&sample_inputs()).result;
        for p in &out.projections {
            assert_eq!(p.debt_service, out.annual_debt_service);
            assert_eq!(p.cash_flow, p.net_operating_income - p.debt_service);
        }
    }

    #[test]
    fn test_exit_waterfall() {
        let out = compute_financials(&sample_inputs()).result;
        let last = out.projections.last().unwrap();

        let price = last.net_operating_income / dec!(0.06);
        assert_eq!(out.gross_sale_price, Outcome::Finite(price));
        assert_eq!(out.sale_costs, Outcome::Finite(price * dec!(0.05)));
        assert_eq!(out.remaining_loan_balance, last.remaining_loan_balance);
        assert_eq!(
            out.net_sale_proceeds,
            Outcome::Finite(price - price * dec!(0.05) - last.remaining_loan_balance)
        );
    }

    #[test]
    fn test_profit_and_multiple_agree() {
        let out = compute_financials(&sample_inputs()).result;
        let profit = out.total_profit.value().unwrap();
        let multiple = out.equity_multiple.value().unwrap();

        // multiple * equity - equity == profit
        let implied = multiple * dec!(300000) - dec!(300000);
        assert!((implied - profit).abs() < dec!(0.0001));
        assert!(multiple > Decimal::ONE);
    }

    #[test]
    fn test_zero_exit_cap_rate_undefined() {
        let mut inputs = sample_inputs();
        inputs.exit_cap_rate = Decimal::ZERO;
        let output = compute_financials(&inputs);
        let out = &output.result;

        assert_eq!(out.gross_sale_price, Outcome::Undefined);
        assert_eq!(out.net_sale_proceeds, Outcome::Undefined);
        assert_eq!(out.total_profit, Outcome::Undefined);
        assert_eq!(out.equity_multiple, Outcome::Undefined);
        assert_eq!(out.irr, Outcome::Undefined);
        assert!(!out.irr_converged);
        // Operating figures are unaffected
        assert_eq!(out.net_operating_income, dec!(102600));
        assert!(output.warnings.iter().any(|w| w.contains("Exit cap rate is zero")));
    }

    #[test]
    fn test_runaway_rent_growth_undefined() {
        // 2^99 is beyond the 96-bit mantissa
        let mut inputs = sample_inputs();
        inputs.annual_rent_growth_rate = Decimal::ONE;
        inputs.hold_period_years = 100;
        let output = compute_financials(&inputs);
        let out = &output.result;

        assert!(out.projections.is_empty());
        assert_eq!(out.gross_sale_price, Outcome::Undefined);
        assert_eq!(out.net_sale_proceeds, Outcome::Undefined);
        assert_eq!(out.total_profit, Outcome::Undefined);
        assert_eq!(out.equity_multiple, Outcome::Undefined);
        assert_eq!(out.irr, Outcome::Undefined);
        assert!(!out.irr_converged);
        // Loan is fully amortized long before year 100
        assert_eq!(out.remaining_loan_balance, Decimal::ZERO);
        assert_eq!(out.net_operating_income, dec!(102600));
        assert!(output
            .warnings
            .iter()
            .any(|w| w.contains("exceeds representable amounts")));
    }

    #[test]
    fn test_runaway_expense_growth_undefined() {
        let mut inputs = sample_inputs();
        inputs.annual_expense_growth_rate = Decimal::ONE;
        inputs.hold_period_years = 100;
        let out = compute_financials(&inputs).result;

        assert!(out.projections.is_empty());
        assert_eq!(out.irr, Outcome::Undefined);
    }

    #[test]
    fn test_steep_growth_within_range_projects_every_year() {
        let mut inputs = sample_inputs();
        inputs.annual_rent_growth_rate = Decimal::ONE;
        inputs.hold_period_years = 20;
        let out = compute_financials(&inputs).result;

        assert_eq!(out.projections.len(), 20);
        // 180,000 * 2^19
        assert_eq!(out.projections[19].gross_potential_rent, dec!(94371840000));
        assert!(out.gross_sale_price.is_finite());
    }

    #[test]
    fn test_zero_equity_guards() {
        let mut inputs = sample_inputs();
        inputs.equity_invested = Decimal::ZERO;
        let out = compute_financials(&inputs).result;

        assert_eq!(out.equity_multiple, Outcome::Finite(Decimal::ZERO));
        assert_eq!(out.cash_on_cash_return, Decimal::ZERO);
        assert_eq!(out.equity_percentage, Decimal::ZERO);
    }

    #[test]
    fn test_zero_hold_period_falls_back_to_year_one() {
        let mut inputs = sample_inputs();
        inputs.hold_period_years = 0;
        let out = compute_financials(&inputs).result;

        assert!(out.projections.is_empty());
        assert_eq!(out.remaining_loan_balance, Decimal::ZERO);
        assert_eq!(out.gross_sale_price, Outcome::Finite(dec!(102600) / dec!(0.06)));
    }

    #[test]
    fn test_equity_cash_flows_fold_exit_into_last_year() {
        let out = compute_financials(&sample_inputs()).result;
        let proceeds = out.net_sale_proceeds.value().unwrap();
        let flows = equity_cash_flows(dec!(300000), &out.projections, proceeds).unwrap();

        assert_eq!(flows.len(), 6);
        assert_eq!(flows[0], dec!(-300000));
        assert_eq!(flows[1], out.projections[0].cash_flow);
        assert_eq!(flows[5], out.projections[4].cash_flow + proceeds);
    }

    #[test]
    fn test_high_leverage_warning() {
        let mut inputs = sample_inputs();
        inputs.debt_amount = dec!(850000);
        inputs.equity_invested = dec!(150000);
        let output = compute_financials(&inputs);
        assert!(output.warnings.iter().any(|w| w.contains("exceeds 80%")));
    }

    #[test]
    fn test_capital_mismatch_warning() {
        let mut inputs = sample_inputs();
        inputs.equity_invested = dec!(250000);
        let output = compute_financials(&inputs);
        assert!(output.warnings.iter().any(|w| w.contains("does not match")));
    }

    #[test]
    fn test_balloon_warning() {
        let mut inputs = sample_inputs();
        inputs.debt_term_years = 3;
        let output = compute_financials(&inputs);
        assert!(output.warnings.iter().any(|w| w.contains("balloon")));
    }

    #[test]
    fn test_methodology_string() {
        let output = compute_financials(&sample_inputs());
        assert_eq!(
            output.methodology,
            "Levered Hold-Period Projection with Direct-Cap Exit"
        );
    }
}
