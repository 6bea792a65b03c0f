pub mod amortization;
pub mod inputs;
pub mod operating;
pub mod projection;

#[cfg(feature = "portfolio")]
pub mod portfolio;
