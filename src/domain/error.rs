//! Domain validation errors for core domain types.
//!
//! This module defines errors that occur when domain invariants are violated.
//! These errors are returned by `try_new` constructors that validate inputs.
//!
//! # Examples
//!
//! ```
//! use riskguard::domain::error::DomainError;
//! use riskguard::domain::risk::RiskParams;
//! use rust_decimal::Decimal;
//!
//! let result = RiskParams::try_new(
//!     Decimal::from(5),
//!     Decimal::from(-10), // negative limit
//!     Decimal::from(20),
//!     3,
//! );
//!
//! assert!(matches!(result, Err(DomainError::NegativeRiskLimit { .. })));
//! ```

use thiserror::Error;

/// Errors that occur when domain invariants are violated.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Risk limits are magnitudes and must not be negative.
    #[error("risk limit {field} must be non-negative, got {value}")]
    NegativeRiskLimit {
        /// Name of the offending limit.
        field: &'static str,
        /// The invalid value that was provided.
        value: rust_decimal::Decimal,
    },

    /// Symbols are used as map keys and must not be blank.
    #[error("symbol cannot be empty")]
    EmptySymbol,

    /// Account identifiers must not be blank.
    #[error("account id cannot be empty")]
    EmptyAccountId,

    /// A side string did not name a known position side.
    #[error("unknown position side '{0}'")]
    UnknownSide(String),
}
