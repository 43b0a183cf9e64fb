//! # Error Types
//!
//! Domain-specific error types for procura-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  procura-core errors (this file)                                        │
//! │  ├── CoreError        - Configuration and form-submission failures      │
//! │  └── ValidationError  - Single-field input failures                     │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → host command → Frontend            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Grouping, pricing and the report pipelines never fail: malformed data
//! degrades to sentinels and zeros. Errors only come out of configuration
//! loading and the validators a form runs before submitting.

use rust_decimal::Decimal;
use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

#[derive(Debug, Error)]
pub enum CoreError {
    /// Configuration document could not be parsed or is inconsistent.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A receipt line failed validation.
    ///
    /// ## User Workflow
    /// ```text
    /// Save GRN
    ///      │
    ///      ▼
    /// validate_receipt_lines(...)
    ///      │
    ///      ▼
    /// InvalidLine { item_id: "grn-line-3", source: ExceedsLimit { .. } }
    ///      │
    ///      ▼
    /// UI highlights the row and shows the message
    /// ```
    #[error("Line {item_id}: {source}")]
    InvalidLine {
        item_id: String,
        #[source]
        source: ValidationError,
    },

    /// A table query or standalone field failed validation.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range (inclusive bounds).
    #[error("{field} must be between {min} and {max}")]
    OutOfRange {
        field: String,
        min: Decimal,
        max: Decimal,
    },

    #[error("{field} must be greater than zero")]
    MustBePositive { field: String },

    #[error("{field} cannot be negative")]
    MustNotBeNegative { field: String },

    /// Value goes past a limit derived from other data, such as the
    /// quantity still open on a PO line.
    #[error("{field} cannot exceed {limit}")]
    ExceedsLimit { field: String, limit: Decimal },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;
