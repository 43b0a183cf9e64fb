//! # Validation Module
//!
//! Checks a form runs before it submits receipt lines.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Form (TypeScript)                                             │
//! │  └── Immediate feedback while typing                                    │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Deserialisation (serde)                                       │
//! │  └── Shape and number parsing                                           │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: THIS MODULE                                                   │
//! │  └── Ranges, required keys, over-receipt                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Field names in errors are the camelCase keys the form binds to, so the UI
//! can attach the message to the right input.
//!
//! ## Usage
//! ```rust
//! use procura_core::validation::{validate_percentage, validate_search_query};
//! use rust_decimal::Decimal;
//!
//! assert!(validate_percentage("tax", Decimal::from(7)).is_ok());
//! assert_eq!(validate_search_query("  rice ").unwrap(), "rice");
//! ```

use rust_decimal::Decimal;
use tracing::debug;

use crate::config::CoreConfig;
use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::pricing::{Adjustment, PricingInput};
use crate::types::{non_blank, ReceiptLine};
use crate::MAX_SEARCH_QUERY_LEN;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a table search query.
///
/// ## Rules
/// - Can be empty (matches every row)
/// - At most 100 characters after trimming
///
/// ## Returns
/// The trimmed query string.
pub fn validate_search_query(query: &str) -> ValidationResult<String> {
    let query = query.trim();

    if query.chars().count() > MAX_SEARCH_QUERY_LEN {
        return Err(ValidationError::TooLong {
            field: "search".to_string(),
            max: MAX_SEARCH_QUERY_LEN,
        });
    }

    Ok(query.to_string())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Quantities may be zero (nothing received yet) but never negative.
pub fn validate_quantity(field: &str, qty: Decimal) -> ValidationResult<()> {
    if qty < Decimal::ZERO {
        return Err(ValidationError::MustNotBeNegative {
            field: field.to_string(),
        });
    }
    Ok(())
}

/// Percentage rates lie within 0..=100.
///
/// ## Example
/// ```rust
/// use procura_core::validation::validate_percentage;
/// use rust_decimal::Decimal;
///
/// assert!(validate_percentage("discount", Decimal::ZERO).is_ok());
/// assert!(validate_percentage("discount", Decimal::ONE_HUNDRED).is_ok());
/// assert!(validate_percentage("discount", Decimal::from(101)).is_err());
/// ```
pub fn validate_percentage(field: &str, rate: Decimal) -> ValidationResult<()> {
    if rate < Decimal::ZERO || rate > Decimal::ONE_HUNDRED {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: Decimal::ZERO,
            max: Decimal::ONE_HUNDRED,
        });
    }
    Ok(())
}

pub fn validate_exchange_rate(rate: Decimal) -> ValidationResult<()> {
    if rate <= Decimal::ZERO {
        return Err(ValidationError::MustBePositive {
            field: "exchangeRate".to_string(),
        });
    }
    Ok(())
}

pub fn validate_money_non_negative(field: &str, amount: Money) -> ValidationResult<()> {
    if amount.is_negative() {
        return Err(ValidationError::MustNotBeNegative {
            field: field.to_string(),
        });
    }
    Ok(())
}

/// A rate must be a percentage; an override amount must not be negative.
pub fn validate_adjustment(field: &str, adjustment: &Adjustment) -> ValidationResult<()> {
    match adjustment {
        Adjustment::Rate { percent } => validate_percentage(field, *percent),
        Adjustment::Override { amount } => validate_money_non_negative(field, *amount),
    }
}

pub fn validate_pricing(input: &PricingInput) -> ValidationResult<()> {
    validate_money_non_negative("unitPrice", input.unit_price)?;
    validate_adjustment("discount", &input.discount)?;
    validate_adjustment("tax", &input.tax)?;
    validate_exchange_rate(input.exchange_rate)?;
    Ok(())
}

// =============================================================================
// Receipt Lines
// =============================================================================

/// Validates one receipt line.
///
/// When `allow_over_receipt` is false, a line that references an ordered
/// quantity may receive at most what is still open on it.
///
/// ## User Workflow
/// ```text
/// Ordered 10, previously received 6
///      │
///      ▼
/// User enters received quantity: 5
///      │
///      ├── over-receipt allowed?  → OK
///      │
///      └── not allowed            → "receivedQuantity cannot exceed 4"
/// ```
pub fn validate_receipt_line(line: &ReceiptLine, allow_over_receipt: bool) -> ValidationResult<()> {
    if non_blank(line.product_id.as_deref()).is_none() {
        return Err(ValidationError::Required {
            field: "productId".to_string(),
        });
    }

    validate_quantity("orderedQuantity", line.ordered_quantity)?;
    validate_quantity("previouslyReceived", line.previously_received)?;
    validate_quantity("receivedQuantity", line.received_quantity)?;
    validate_quantity("focQuantity", line.foc_quantity)?;
    validate_pricing(&line.pricing)?;

    if !allow_over_receipt && line.ordered_quantity > Decimal::ZERO {
        let open = (line.ordered_quantity - line.previously_received).max(Decimal::ZERO);
        if line.received_quantity > open {
            return Err(ValidationError::ExceedsLimit {
                field: "receivedQuantity".to_string(),
                limit: open,
            });
        }
    }

    Ok(())
}

/// Validates every line of a GRN, stopping at the first failure.
pub fn validate_receipt_lines(lines: &[ReceiptLine], config: &CoreConfig) -> CoreResult<()> {
    for line in lines {
        validate_receipt_line(line, config.allow_over_receipt).map_err(|source| {
            CoreError::InvalidLine {
                item_id: line.id.clone(),
                source,
            }
        })?;
    }

    debug!(lines = lines.len(), "Receipt lines validated");
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
