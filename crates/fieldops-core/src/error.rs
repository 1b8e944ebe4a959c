//! # Error Types
//!
//! Domain-specific error types for fieldops-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  fieldops-core errors (this file)                                      │
//! │  ├── CoreError        - Business rule / state machine violations       │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  fieldops-db errors (separate crate)                                   │
//! │  ├── DbError          - Database operation failures                    │
//! │  └── WorkflowError    - What the REST layer sees                       │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → WorkflowError → REST response     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Propagation
//! The calculators (`discount`, `settlement`) are total and never return an
//! error. Only the order state machine, split construction, the strict
//! discount parser, stock allocation and the ledger produce `CoreError`.

use thiserror::Error;

use crate::money::Money;
use crate::order::OrderAction;
use crate::types::OrderStatus;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CoreError {
    /// An action was attempted from a status that does not permit it.
    ///
    /// ## When This Occurs
    /// - Completing an order that is not a draft
    /// - Approving/rejecting a discount on an order not pending approval
    /// - Deleting anything but a draft
    ///
    /// Surfaced to the caller, never retried automatically.
    #[error("Order {order_id} is {from}, cannot {action}")]
    InvalidStateTransition {
        order_id: String,
        from: OrderStatus,
        action: OrderAction,
    },

    /// Owner and technician percentages do not add up to 100%, or one of
    /// them lies outside `[0, 100]`. Carries the values as entered.
    ///
    /// ## User Workflow
    /// ```text
    /// Approver drags split slider: owner 70, technician 40
    ///      │
    ///      ▼
    /// DiscountSplit::from_percentages(70.0, 40.0)
    ///      │
    ///      ▼
    /// InvalidSplit { owner: 70.0, technician: 40.0 }
    ///      │
    ///      ▼
    /// UI re-prompts for a valid split
    /// ```
    #[error("Discount split must total 100%: owner {owner}% + technician {technician}%")]
    InvalidSplit { owner: f64, technician: f64 },

    /// Unrecognized discount type.
    ///
    /// Only the strict parser returns this. Order completion reads discounts
    /// leniently and treats a malformed one as no discount.
    #[error("Unrecognized discount type: {kind:?}")]
    MalformedDiscount { kind: String },

    /// Order cannot be found.
    #[error("Order not found: {0}")]
    OrderNotFound(String),

    /// Product cannot be found in the catalog.
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    /// Technician cannot be found.
    #[error("Technician not found: {0}")]
    TechnicianNotFound(String),

    /// Company cannot be found.
    #[error("Company not found: {0}")]
    CompanyNotFound(String),

    /// Blocked technicians cannot be assigned new orders.
    #[error("Technician {0} is blocked")]
    TechnicianBlocked(String),

    /// An allocation asks for more units than are left unallocated.
    #[error("Cannot allocate {requested} of product {product_id}: only {available} available")]
    InsufficientStock {
        product_id: String,
        requested: i64,
        available: i64,
    },

    /// A payment larger than the technician's outstanding balance.
    #[error("Payment of {requested} exceeds outstanding balance of {balance}")]
    PaymentExceedsBalance { requested: Money, balance: Money },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Used for early validation before business logic runs.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., invalid UUID, phone number).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Duplicate value (e.g., the same product twice on one order).
    #[error("{field} '{value}' already exists")]
    Duplicate { field: String, value: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::InvalidStateTransition {
            order_id: "ord-1".to_string(),
            from: OrderStatus::Completed,
            action: OrderAction::ApproveDiscount,
        };
        assert_eq!(
            err.to_string(),
            "Order ord-1 is completed, cannot approve discount"
        );

        let err = CoreError::PaymentExceedsBalance {
            requested: Money::from_cents(5_000),
            balance: Money::from_cents(2_000),
        };
        assert_eq!(
            err.to_string(),
            "Payment of ₹50.00 exceeds outstanding balance of ₹20.00"
        );
    }

    #[test]
    fn test_insufficient_stock_message() {
        let err = CoreError::InsufficientStock {
            product_id: "p1".to_string(),
            requested: 4,
            available: 3,
        };
        assert_eq!(
            err.to_string(),
            "Cannot allocate 4 of product p1: only 3 available"
        );
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::Required {
            field: "tcr_number".to_string(),
        };
        assert_eq!(err.to_string(), "tcr_number is required");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "customer.name".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
