//! Loan repayment simulation with prepayment-impact accounting, and SIP
//! (systematic investment plan) projection with goal-seek and XIRR.
//!
//! Every computation is pure and synchronous: plain inputs in, plain data out.
//! Money and rates are `rust_decimal::Decimal`.

pub mod error;
pub mod time_value;
pub mod types;

#[cfg(feature = "loan")]
pub mod loan;

#[cfg(feature = "sip")]
pub mod sip;

pub use error::FinPlanError;
pub use types::*;

/// Standard result type for all finplan operations
pub type FinPlanResult<T> = Result<T, FinPlanError>;
