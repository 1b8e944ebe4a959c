//! # Validation Module
//!
//! Input validation for drafts, completions, catalog records and payments.
//!
//! ## Where It Runs
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Browser client                                               │
//! │  ├── Form checks (required fields, digit counts)                       │
//! │  └── Immediate user feedback                                           │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: OrderWorkflow (fieldops-db)                                  │
//! │  ├── Type validation (deserialization)                                 │
//! │  └── THIS MODULE: field and line rules                                 │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: SQLite                                                       │
//! │  ├── NOT NULL / UNIQUE (tcr_number, sku)                               │
//! │  └── Foreign keys                                                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Validation is separate from the state machine: transitions assume their
//! input already passed these checks.
//!
//! ## Usage
//! ```rust
//! use fieldops_core::validation::{validate_phone, validate_quantity};
//!
//! validate_phone("customer.phone", "9876543210").unwrap();
//! validate_quantity(5).unwrap();
//! ```

use std::collections::HashSet;

use crate::error::ValidationError;
use crate::money::Money;
use crate::order::{Completion, DraftOrder};
use crate::types::{Customer, OrderLine};
use crate::{MAX_ITEM_QUANTITY, MAX_ORDER_LINES};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

fn required<'a>(field: &str, value: &'a str, max: usize) -> ValidationResult<&'a str> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if value.chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }

    Ok(value)
}

fn digits(field: &str, value: &str, count: usize, what: &str) -> ValidationResult<()> {
    let value = required(field, value, count)?;

    if value.len() != count || !value.chars().all(|c| c.is_ascii_digit()) {
        return Err(ValidationError::InvalidFormat {
            field: field.to_string(),
            reason: format!("{what} must be exactly {count} digits"),
        });
    }

    Ok(())
}

/// Validates a TCR (technician completion report) number.
///
/// ## Rules
/// - Must not be empty
/// - At most 50 characters
/// - Letters, digits, hyphens, slashes and underscores only
///
/// ## Example
/// ```rust
/// use fieldops_core::validation::validate_tcr_number;
///
/// assert!(validate_tcr_number("TCR-2024/0042").is_ok());
/// assert!(validate_tcr_number("").is_err());
/// assert!(validate_tcr_number("TCR 42").is_err());
/// ```
pub fn validate_tcr_number(tcr: &str) -> ValidationResult<()> {
    let tcr = required("tcr_number", tcr, 50)?;

    if !tcr
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '-' | '/' | '_'))
    {
        return Err(ValidationError::InvalidFormat {
            field: "tcr_number".to_string(),
            reason: "must contain only letters, numbers, '-', '/' and '_'".to_string(),
        });
    }

    Ok(())
}

/// Validates a SKU.
pub fn validate_sku(sku: &str) -> ValidationResult<()> {
    let sku = required("sku", sku, 50)?;

    if !sku
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ValidationError::InvalidFormat {
            field: "sku".to_string(),
            reason: "must contain only letters, numbers, hyphens, and underscores".to_string(),
        });
    }

    Ok(())
}

/// Validates a person, company or product name (1-200 characters).
pub fn validate_name(field: &str, name: &str) -> ValidationResult<()> {
    required(field, name, 200).map(|_| ())
}

/// Validates a 10-digit phone number.
pub fn validate_phone(field: &str, phone: &str) -> ValidationResult<()> {
    digits(field, phone, 10, "phone number")
}

/// Validates a 6-digit postal pincode.
///
/// ## Example
/// ```rust
/// use fieldops_core::validation::validate_pincode;
///
/// assert!(validate_pincode("560001").is_ok());
/// assert!(validate_pincode("5600").is_err());
/// ```
pub fn validate_pincode(pincode: &str) -> ValidationResult<()> {
    digits("customer.pincode", pincode, 6, "pincode")
}

/// Validates the customer block of a draft.
///
/// The alternate phone is optional, but must be well-formed when present.
pub fn validate_customer(customer: &Customer) -> ValidationResult<()> {
    validate_name("customer.name", &customer.name)?;
    validate_phone("customer.phone", &customer.phone)?;
    if let Some(alt) = customer.alternate_phone.as_deref().filter(|s| !s.trim().is_empty()) {
        validate_phone("customer.alternate_phone", alt)?;
    }
    validate_pincode(&customer.pincode)
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a line quantity.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed MAX_ITEM_QUANTITY (999)
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_ITEM_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_ITEM_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a non-negative amount (prices, charges, costs). Zero is allowed.
pub fn validate_amount(field: &str, amount: Money) -> ValidationResult<()> {
    if amount.is_negative() {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: i64::MAX,
        });
    }

    Ok(())
}

/// Validates a payment or commission amount. Must be positive.
pub fn validate_positive_amount(field: &str, amount: Money) -> ValidationResult<()> {
    if !amount.is_positive() {
        return Err(ValidationError::MustBePositive {
            field: field.to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Order Validators
// =============================================================================

/// Validates the product lines of an order.
///
/// ## Rules
/// - At most MAX_ORDER_LINES (100) lines
/// - Each product at most once
/// - Valid quantity, non-negative sale price
pub fn validate_order_lines(lines: &[OrderLine]) -> ValidationResult<()> {
    if lines.len() > MAX_ORDER_LINES {
        return Err(ValidationError::OutOfRange {
            field: "products".to_string(),
            min: 0,
            max: MAX_ORDER_LINES as i64,
        });
    }

    let mut seen = HashSet::new();
    for line in lines {
        required("product_id", &line.product_id, 64)?;
        if !seen.insert(line.product_id.as_str()) {
            return Err(ValidationError::Duplicate {
                field: "product".to_string(),
                value: line.product_id.clone(),
            });
        }
        validate_quantity(line.quantity)?;
        if let Some(price) = line.sale_price {
            validate_amount("sale_price", price)?;
        }
    }

    Ok(())
}

/// Validates a draft before create or edit.
pub fn validate_draft(draft: &DraftOrder) -> ValidationResult<()> {
    validate_tcr_number(&draft.tcr_number)?;
    required("company_id", &draft.company_id, 64)?;
    required("technician_id", &draft.technician_id, 64)?;
    validate_customer(&draft.customer)?;
    validate_order_lines(&draft.products)
}

/// Validates a completion report.
///
/// A completed order has at least one product line.
pub fn validate_completion(completion: &Completion) -> ValidationResult<()> {
    if completion.products.is_empty() {
        return Err(ValidationError::Required {
            field: "products".to_string(),
        });
    }
    validate_order_lines(&completion.products)?;
    validate_amount("miscellaneous_cost", completion.miscellaneous_cost)?;
    validate_amount("fitting_cost", completion.fitting_cost)
}

// =============================================================================
// UUID Validators
// =============================================================================

/// Validates a UUID string.
///
/// ## Example
/// ```rust
/// use fieldops_core::validation::validate_uuid;
///
/// assert!(validate_uuid("550e8400-e29b-41d4-a716-446655440000").is_ok());
/// assert!(validate_uuid("not-a-uuid").is_err());
/// ```
pub fn validate_uuid(id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "id".to_string(),
        });
    }

    uuid::Uuid::parse_str(id).map_err(|_| ValidationError::InvalidFormat {
        field: "id".to_string(),
        reason: "must be a valid UUID".to_string(),
    })?;

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
