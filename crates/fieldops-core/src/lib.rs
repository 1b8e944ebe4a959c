//! # fieldops-core: Pure Business Logic for FieldOps
//!
//! Order pricing, discount approval and technician settlement, as pure
//! functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        FieldOps Architecture                            │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    Browser client                               │   │
//! │  │    Drafts ──► Completion ──► Discount approval ──► Payments     │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ REST                                   │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │              fieldops-db (OrderWorkflow, SQLite)                │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ fieldops-core (THIS CRATE) ★                    │   │
//! │  │                                                                 │   │
//! │  │   ┌──────────┐ ┌──────────┐ ┌────────────┐ ┌───────────────┐   │   │
//! │  │   │  money   │ │ discount │ │ settlement │ │ order (state  │   │   │
//! │  │   │  Money   │ │ gross,   │ │ cuts,      │ │  machine)     │   │   │
//! │  │   │  Percent │ │ cap      │ │ outstanding│ │ ledger        │   │   │
//! │  │   └──────────┘ └──────────┘ └────────────┘ └───────────────┘   │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`money`] - Money (integer paise) and Percentage (basis points)
//! - [`types`] - Domain types (Order, Technician, Discount, ...)
//! - [`discount`] - Discount Calculator
//! - [`settlement`] - Settlement Calculator
//! - [`order`] - Order State Machine
//! - [`ledger`] - Technician balances and payment checks
//! - [`inventory`] - Stock allocation to technicians
//! - [`validation`] - Input validation
//! - [`error`] - Domain error types
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: same input, same output; timestamps are passed in
//! 2. **Integer Money**: paise and basis points, one half-up rounding per figure
//! 3. **Explicit Errors**: typed errors, never strings or panics
//!
//! ## Example Usage
//!
//! ```rust
//! use fieldops_core::discount::{calculate_discount, OrderCharges};
//! use fieldops_core::money::Money;
//! use fieldops_core::settlement::{settle, TechnicianEarnings};
//! use fieldops_core::types::{Discount, DiscountSplit, OrderLine};
//!
//! let lines = vec![OrderLine::new("p1", 1).with_catalog_price(Money::from_cents(25_000))];
//! let charges = OrderCharges {
//!     lines: &lines,
//!     installation_charge: Money::zero(),
//!     miscellaneous_cost: Money::zero(),
//!     fitting_cost: Money::from_cents(20_000),
//!     discount: Discount::FixedAmount(Money::from_cents(2_500)),
//! };
//!
//! let breakdown = calculate_discount(&charges);
//! let split = DiscountSplit::from_percentages(60.0, 40.0).unwrap();
//! let settlement = settle(&breakdown, &split, &TechnicianEarnings::fitting_only(charges.fitting_cost));
//!
//! assert_eq!(settlement.technician_cut.cents(), 19_000);
//! assert_eq!(settlement.outstanding_amount.cents(), 0);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod discount;
pub mod error;
pub mod inventory;
pub mod ledger;
pub mod money;
pub mod order;
pub mod settlement;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use discount::{calculate_discount, DiscountBreakdown, OrderCharges};
pub use error::{CoreError, CoreResult, ValidationError};
pub use inventory::{allocate, InventoryAllocation};
pub use ledger::{technician_balance, validate_payment, TechnicianBalance};
pub use money::{Money, Percentage};
pub use order::{Completion, DraftOrder, OrderAction};
pub use settlement::{settle, EarningsPolicy, Settlement, TechnicianEarnings};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum product lines on a single order.
pub const MAX_ORDER_LINES: usize = 100;

/// Maximum quantity of a single product line
///
/// ## Business Reason
/// Catches typing 1000 instead of 10 on the completion form.
pub const MAX_ITEM_QUANTITY: i64 = 999;
