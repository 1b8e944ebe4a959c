//! # Settlement Calculator
//!
//! Divides a settled order between the technician and the company.
//!
//! ## Money Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          gross_subtotal                                 │
//! │   ┌────────────────────────────┬───────────────────────────────────┐    │
//! │   │   technician earnings      │          company share            │    │
//! │   │   fitting + service rate   │                                   │    │
//! │   │   + misc share + commission│                                   │    │
//! │   └─────────────┬──────────────┴──────────────────┬────────────────┘    │
//! │                 │                                 │                     │
//! │   − technician discount share        − owner discount share             │
//! │                 │                                 │                     │
//! │                 ▼                                 ▼                     │
//! │           technician_cut                     company_cut                │
//! │                                                                         │
//! │   technician_cut + company_cut + discount_amount == gross_subtotal      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Rounding
//! The technician's discount share is the only rounded figure
//! (`Money::percent_of`, half-up). The owner's share is the remainder, so the
//! two shares always add back to the discount exactly.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use ts_rs::TS;

use crate::discount::{DiscountBreakdown, OrderCharges};
use crate::money::{Money, Percentage};
use crate::types::{Commission, DiscountSplit, Technician};

// =============================================================================
// Earnings Policy
// =============================================================================

/// Fixed earnings a technician receives on every settled order.
///
/// The default policy credits nothing beyond the fitting cost.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EarningsPolicy {
    pub service_rate: Money,
    pub misc_share: Percentage,
    /// Per-unit commission keyed by product id.
    pub commissions: BTreeMap<String, Money>,
}

impl EarningsPolicy {
    /// Builds the policy for a technician from their commission records.
    ///
    /// Commissions belonging to other technicians are ignored.
    pub fn for_technician(technician: &Technician, commissions: &[Commission]) -> Self {
        let commissions = commissions
            .iter()
            .filter(|c| c.technician_id == technician.id)
            .map(|c| (c.product_id.clone(), c.amount.non_negative()))
            .collect();

        EarningsPolicy {
            service_rate: technician.service_rate.non_negative(),
            misc_share: technician.misc_share,
            commissions,
        }
    }

    /// Itemized earnings for an order's charges.
    pub fn earnings_for(&self, charges: &OrderCharges<'_>) -> TechnicianEarnings {
        let commission = charges
            .lines
            .iter()
            .filter_map(|line| {
                self.commissions
                    .get(&line.product_id)
                    .map(|per_unit| per_unit.saturating_mul(line.quantity.max(0)))
            })
            .fold(Money::zero(), Money::saturating_add);

        TechnicianEarnings {
            fitting: charges.fitting_cost.non_negative(),
            service_rate: self.service_rate,
            misc_credit: charges.miscellaneous_cost.non_negative().percent_of(self.misc_share),
            commission,
        }
    }
}

/// A technician's fixed earnings on one order, before any discount liability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct TechnicianEarnings {
    pub fitting: Money,
    pub service_rate: Money,
    pub misc_credit: Money,
    pub commission: Money,
}

impl TechnicianEarnings {
    /// Fitting only.
    pub const fn fitting_only(fitting: Money) -> Self {
        TechnicianEarnings {
            fitting,
            service_rate: Money::zero(),
            misc_credit: Money::zero(),
            commission: Money::zero(),
        }
    }

    pub fn total(&self) -> Money {
        self.fitting
            .saturating_add(self.service_rate)
            .saturating_add(self.misc_credit)
            .saturating_add(self.commission)
    }
}

// =============================================================================
// Settlement
// =============================================================================

/// Final division of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Settlement {
    pub technician_discount_share: Money,
    pub owner_discount_share: Money,
    pub technician_earnings: Money,
    /// Negative when the technician's discount share exceeds their earnings.
    pub technician_cut: Money,
    pub company_cut: Money,
    /// `max(0, −technician_cut)`.
    pub outstanding_amount: Money,
}

/// Settles an order.
///
/// ## Example
/// ```rust
/// use fieldops_core::discount::DiscountBreakdown;
/// use fieldops_core::money::Money;
/// use fieldops_core::settlement::{settle, TechnicianEarnings};
/// use fieldops_core::types::DiscountSplit;
///
/// let breakdown = DiscountBreakdown {
///     product_total: Money::from_cents(20_000),
///     gross_subtotal: Money::from_cents(25_500),
///     fitting_cost: Money::from_cents(500),
///     discount_amount: Money::from_cents(2_500),
///     final_amount: Money::from_cents(23_000),
/// };
/// let split = DiscountSplit::from_percentages(0.0, 100.0).unwrap();
/// let earnings = TechnicianEarnings::fitting_only(Money::from_cents(500));
///
/// let s = settle(&breakdown, &split, &earnings);
/// assert_eq!(s.technician_cut.cents(), -2_000);
/// assert_eq!(s.outstanding_amount.cents(), 2_000);
/// ```
pub fn settle(
    breakdown: &DiscountBreakdown,
    split: &DiscountSplit,
    earnings: &TechnicianEarnings,
) -> Settlement {
    let discount = breakdown.discount_amount;
    let technician_discount_share = discount.percent_of(split.technician());
    let owner_discount_share = discount - technician_discount_share;

    let technician_earnings = earnings.total();
    let technician_cut = technician_earnings - technician_discount_share;
    let company_cut = breakdown.gross_subtotal - technician_earnings - owner_discount_share;

    Settlement {
        technician_discount_share,
        owner_discount_share,
        technician_earnings,
        technician_cut,
        company_cut,
        outstanding_amount: (-technician_cut).non_negative(),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
