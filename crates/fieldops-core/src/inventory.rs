//! # Inventory Allocation
//!
//! Stock handed from the warehouse to a technician's van.
//!
//! ```text
//! total_count ─┬─ allocated_count   (out with technicians)
//!              └─ available         (can still be allocated)
//!
//! allocate(q) is valid for 1 ≤ q ≤ available
//! ```
//!
//! The check here is against the product as read. The storage layer repeats
//! it in the same statement that bumps `allocated_count`, so two allocations
//! racing for the last units cannot both succeed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::types::{Product, Technician};

/// One entry in the allocation log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct InventoryAllocation {
    pub id: String,
    pub product_id: String,
    pub technician_id: String,
    pub quantity: i64,
    #[ts(as = "String")]
    pub allocated_at: DateTime<Utc>,
}

/// Checks an allocation against the product's free stock and builds the log
/// entry.
///
/// ## Errors
/// - `Validation(MustBePositive)` for a zero or negative quantity
/// - `TechnicianBlocked` when the technician may not take stock
/// - `InsufficientStock` when `quantity` exceeds what is left unallocated
pub fn allocate(
    id: impl Into<String>,
    product: &Product,
    technician: &Technician,
    quantity: i64,
    now: DateTime<Utc>,
) -> CoreResult<InventoryAllocation> {
    if quantity <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        }
        .into());
    }
    if technician.is_blocked {
        return Err(CoreError::TechnicianBlocked(technician.id.clone()));
    }

    let available = product.available_count();
    if quantity > available {
        return Err(CoreError::InsufficientStock {
            product_id: product.id.clone(),
            requested: quantity,
            available,
        });
    }

    Ok(InventoryAllocation {
        id: id.into(),
        product_id: product.id.clone(),
        technician_id: technician.id.clone(),
        quantity,
        allocated_at: now,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================
