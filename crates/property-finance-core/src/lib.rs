pub mod error;
pub mod time_value;
pub mod types;

#[cfg(feature = "real_estate")]
pub mod real_estate;

pub use error::PropertyFinanceError;
pub use types::*;

/// Standard result type for all property-finance operations
pub type PropertyFinanceResult<T> = Result<T, PropertyFinanceError>;
