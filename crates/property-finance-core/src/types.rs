use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// All monetary values. Wraps Decimal to prevent accidental f64 usage.
pub type Money = Decimal;

/// Rates expressed as decimals (0.05 = 5%). Never as percentages.
pub type Rate = Decimal;

/// Multiples (e.g., 1.8x equity multiple)
pub type Multiple = Decimal;

/// A figure that may not be representable, e.g. a sale price capitalised at a
/// zero cap rate. Serialises as the decimal itself or `null`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Outcome {
    Finite(Decimal),
    Undefined,
}

impl Outcome {
    /// Wrap a checked arithmetic result.
    pub fn from_checked(value: Option<Decimal>) -> Self {
        match value {
            Some(v) => Outcome::Finite(v),
            None => Outcome::Undefined,
        }
    }

    pub fn value(&self) -> Option<Decimal> {
        match self {
            Outcome::Finite(v) => Some(*v),
            Outcome::Undefined => None,
        }
    }

    pub fn is_finite(&self) -> bool {
        matches!(self, Outcome::Finite(_))
    }

    pub fn map(self, f: impl FnOnce(Decimal) -> Decimal) -> Self {
        match self {
            Outcome::Finite(v) => Outcome::Finite(f(v)),
            Outcome::Undefined => Outcome::Undefined,
        }
    }

    /// Apply a fallible step to a finite value; undefined stays undefined.
    pub fn and_then(self, f: impl FnOnce(Decimal) -> Option<Decimal>) -> Self {
        match self {
            Outcome::Finite(v) => Outcome::from_checked(f(v)),
            Outcome::Undefined => Outcome::Undefined,
        }
    }
}

impl From<Decimal> for Outcome {
    fn from(value: Decimal) -> Self {
        Outcome::Finite(value)
    }
}

/// Standard computation output envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationOutput<T: Serialize> {
    pub result: T,
    pub methodology: String,
    pub assumptions: serde_json::Value,
    pub warnings: Vec<String>,
    pub metadata: ComputationMetadata,
}

/// Metadata for every computation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationMetadata {
    pub version: String,
    pub computation_time_us: u64,
    pub precision: String,
}

/// Helper to wrap computation results with metadata
pub fn with_metadata<T: Serialize>(
    methodology: &str,
    assumptions: &impl Serialize,
    warnings: Vec<String>,
    elapsed_us: u64,
    result: T,
) -> ComputationOutput<T> {
    ComputationOutput {
        result,
        methodology: methodology.to_string(),
        assumptions: serde_json::to_value(assumptions).unwrap_or_default(),
        warnings,
        metadata: ComputationMetadata {
            version: env!("CARGO_PKG_VERSION").to_string(),
            computation_time_us: elapsed_us,
            precision: "rust_decimal_128bit".to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_outcome_serialises_as_number_or_null() {
        let finite = serde_json::to_value(Outcome::Finite(dec!(1.5))).unwrap();
        assert_eq!(finite, serde_json::json!("1.5"));

        let undefined = serde_json::to_value(Outcome::Undefined).unwrap();
        assert!(undefined.is_null());
    }

    #[test]
    fn test_outcome_and_then_propagates_undefined() {
        let halved = Outcome::Finite(dec!(10)).and_then(|v| v.checked_div(dec!(2)));
        assert_eq!(halved, Outcome::Finite(dec!(5)));

        let by_zero = Outcome::Finite(dec!(10)).and_then(|v| v.checked_div(Decimal::ZERO));
        assert_eq!(by_zero, Outcome::Undefined);

        let still_undefined = Outcome::Undefined.and_then(|v| Some(v + Decimal::ONE));
        assert_eq!(still_undefined, Outcome::Undefined);
    }
}
