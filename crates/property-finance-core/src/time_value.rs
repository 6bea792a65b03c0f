use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::types::{Money, Outcome, Rate};

const CONVERGENCE_THRESHOLD: Decimal = dec!(0.0001);
const MAX_IRR_ITERATIONS: u32 = 100;

/// Starting estimate for the IRR solver when the caller has no better one.
pub const DEFAULT_IRR_GUESS: Rate = dec!(0.10);

/// Result of a Newton-Raphson IRR solve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IrrSolution {
    /// Last estimate of the periodic rate, or undefined if the iteration hit
    /// a zero derivative or a discount factor it could not represent
    pub rate: Outcome,
    /// Newton steps taken
    pub iterations: u32,
    /// Whether successive estimates moved by less than 0.0001
    pub converged: bool,
}

/// Net Present Value of a series of cash flows. Period 0 is undiscounted.
pub fn npv(rate: Rate, cash_flows: &[Money]) -> Outcome {
    Outcome::from_checked(npv_and_derivative(cash_flows, rate).map(|(value, _)| value))
}

/// Internal Rate of Return using Newton-Raphson.
///
/// `cash_flows[0]` is the initial outlay; the final entry already includes any
/// terminal proceeds. The solver runs at most 100 steps and stops once the
/// estimate moves by less than 0.0001. It does not clamp the estimate and does
/// not check for a sign change in the flows: a non-converged estimate is still
/// returned, flagged with `converged = false`.
pub fn irr(cash_flows: &[Money], guess: Rate) -> IrrSolution {
    let mut rate = guess;

    for i in 1..=MAX_IRR_ITERATIONS {
        let next = npv_and_derivative(cash_flows, rate)
            .and_then(|(npv_val, dnpv)| npv_val.checked_div(dnpv))
            .and_then(|step| rate.checked_sub(step));

        let Some(next) = next else {
            warn!(iterations = i, %rate, "IRR undefined: zero derivative or unrepresentable discount factor");
            return IrrSolution {
                rate: Outcome::Undefined,
                iterations: i,
                converged: false,
            };
        };

        let delta = (next - rate).abs();
        rate = next;

        if delta < CONVERGENCE_THRESHOLD {
            debug!(iterations = i, %rate, "IRR converged");
            return IrrSolution {
                rate: Outcome::Finite(rate),
                iterations: i,
                converged: true,
            };
        }
    }

    warn!(
        iterations = MAX_IRR_ITERATIONS,
        %rate,
        "IRR did not converge, returning last estimate"
    );
    IrrSolution {
        rate: Outcome::Finite(rate),
        iterations: MAX_IRR_ITERATIONS,
        converged: false,
    }
}

/// NPV(r) = sum CF_t / (1+r)^t and its derivative d(NPV)/dr.
/// `None` when 1+r is zero or an intermediate value overflows.
fn npv_and_derivative(cash_flows: &[Money], rate: Rate) -> Option<(Decimal, Decimal)> {
    let one_plus_r = Decimal::ONE.checked_add(rate)?;
    let mut npv = Decimal::ZERO;
    let mut dnpv = Decimal::ZERO;
    let mut discount = Decimal::ONE; // (1+r)^-0

    for (t, cf) in cash_flows.iter().enumerate() {
        let discounted = cf.checked_mul(discount)?;
        npv = npv.checked_add(discounted)?;
        if t > 0 {
            // d/dr of CF_t / (1+r)^t = -t * CF_t / (1+r)^(t+1)
            let term = Decimal::from(-(t as i64))
                .checked_mul(discounted)?
                .checked_div(one_plus_r)?;
            dnpv = dnpv.checked_add(term)?;
        }
        discount = discount.checked_div(one_plus_r)?;
    }

    Some((npv, dnpv))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_npv_basic() {
        let cfs = vec![dec!(-1000), dec!(300), dec!(400), dec!(500)];
        let result = npv(dec!(0.10), &cfs).value().unwrap();
        // NPV at 10%: -1000 + 300/1.1 + 400/1.21 + 500/1.331 ≈ -21.04
        assert!((result - dec!(-21.04)).abs() < dec!(1.0));
    }

    #[test]
    fn test_npv_zero_rate() {
        let cfs = vec![dec!(-100), dec!(50), dec!(50), dec!(50)];
        assert_eq!(npv(Decimal::ZERO, &cfs), Outcome::Finite(dec!(50)));
    }

    #[test]
    fn test_npv_at_minus_one_is_undefined() {
        let cfs = vec![dec!(-100), dec!(110)];
        assert_eq!(npv(dec!(-1), &cfs), Outcome::Undefined);
    }

    #[test]
    fn test_irr_basic() {
        let cfs = vec![dec!(-1000), dec!(400), dec!(400), dec!(400)];
        let solution = irr(&cfs, DEFAULT_IRR_GUESS);
        assert!(solution.converged);
        // IRR should be ~9.7%
        let rate = solution.rate.value().unwrap();
        assert!((rate - dec!(0.097)).abs() < dec!(0.01));
    }

    #[test]
    fn test_irr_zero_coupon_round_trip() {
        let cfs = vec![dec!(-100), dec!(0), dec!(0), dec!(133.1)];
        let rate = irr(&cfs, DEFAULT_IRR_GUESS).rate.value().unwrap();
        assert!((rate - dec!(0.10)).abs() < dec!(0.001), "got {rate}");
    }

    #[test]
    fn test_irr_all_zero_flows_undefined() {
        // Derivative is zero everywhere
        let solution = irr(&[Decimal::ZERO, Decimal::ZERO, Decimal::ZERO], DEFAULT_IRR_GUESS);
        assert_eq!(solution.rate, Outcome::Undefined);
        assert!(!solution.converged);
        assert_eq!(solution.iterations, 1);
    }

    #[test]
    fn test_irr_empty_flows_undefined() {
        assert_eq!(irr(&[], DEFAULT_IRR_GUESS).rate, Outcome::Undefined);
    }

    #[test]
    fn test_irr_guess_at_minus_one_undefined() {
        let solution = irr(&[dec!(-100), dec!(110)], dec!(-1));
        assert_eq!(solution.rate, Outcome::Undefined);
    }
}
