use rust_decimal::Decimal;
use rust_decimal::MathematicalOps;
use rust_decimal_macros::dec;
use tracing::warn;

use crate::types::{Money, Rate};

/// Standard fixed-rate level payment: P * r(1+r)^n / ((1+r)^n - 1), with
/// r the monthly rate and n the number of monthly payments.
///
/// A zero principal or zero rate means no debt service. Negative inputs are
/// not rejected and flow straight through the formula. When (1+r)^n is past
/// the decimal range the payment is its limit, the monthly interest P * r.
pub fn monthly_payment(principal: Money, annual_rate: Rate, amortization_years: u32) -> Money {
    if principal.is_zero() || annual_rate.is_zero() {
        return Decimal::ZERO;
    }

    let monthly_rate = annual_rate / dec!(12);
    let total_months = i64::from(amortization_years) * 12;
    let Some(interest) = principal.checked_mul(monthly_rate) else {
        warn!(%principal, %annual_rate, "monthly interest exceeds decimal range");
        return Decimal::ZERO;
    };

    let Some(compound) = (Decimal::ONE + monthly_rate).checked_powi(total_months) else {
        warn!(
            %principal,
            %annual_rate,
            amortization_years,
            "compound factor exceeds decimal range, using interest-only payment"
        );
        return interest;
    };

    // P*r*c / (c-1), or P*r / (1 - 1/c) when the numerator overflows
    let payment = compound
        .checked_sub(Decimal::ONE)
        .and_then(|denominator| interest.checked_mul(compound)?.checked_div(denominator))
        .or_else(|| {
            let discount = Decimal::ONE.checked_div(compound)?;
            interest.checked_div(Decimal::ONE - discount)
        });

    // Zero-length schedule
    payment.unwrap_or(Decimal::ZERO)
}

/// Outstanding balance after `years_paid` years of level monthly payments:
/// the present value of the payments still to come.
pub fn remaining_balance(
    principal: Money,
    annual_rate: Rate,
    amortization_years: u32,
    years_paid: u32,
) -> Money {
    if principal.is_zero() || annual_rate.is_zero() || years_paid >= amortization_years {
        return Decimal::ZERO;
    }

    let payment = monthly_payment(principal, annual_rate, amortization_years);
    let monthly_rate = annual_rate / dec!(12);
    let total_payments = i64::from(amortization_years) * 12;
    let payments_made = i64::from(years_paid) * 12;
    let payments_remaining = total_payments - payments_made;

    let discount = match (Decimal::ONE + monthly_rate).checked_powi(payments_remaining) {
        Some(compound) => Decimal::ONE.checked_div(compound),
        // Compounding past the decimal range discounts the tail to nothing
        None => Some(Decimal::ZERO),
    };
    let balance = discount
        .and_then(|discount| payment.checked_mul(Decimal::ONE - discount))
        .and_then(|annuity| annuity.checked_div(monthly_rate));

    balance.unwrap_or_else(|| {
        warn!(%principal, %annual_rate, years_paid, "loan balance exceeds decimal range");
        Decimal::ZERO
    })
}
