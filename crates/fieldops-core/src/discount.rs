//! # Discount Calculator
//!
//! Turns an order's charges into a gross subtotal, a discount amount and the
//! amount the customer pays.
//!
//! ## Calculation Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   lines ──► Σ unit_price × qty ──► product_total                        │
//! │                                        │                                │
//! │   installation + misc + fitting ───────┤                                │
//! │                                        ▼                                │
//! │                                  gross_subtotal                         │
//! │                                        │                                │
//! │   Discount::Percentage(p) ──► gross × p                                 │
//! │   Discount::FixedAmount(a) ─► min(gross, a)                             │
//! │   Discount::None ───────────► 0                                         │
//! │                                        │                                │
//! │                        cap at gross − fitting                           │
//! │                                        │                                │
//! │                                        ▼                                │
//! │                     discount_amount, final_amount                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Fitting Cost
//! Fitting is part of the gross figure the customer sees, but the discount is
//! capped at `gross − fitting`. Whatever the discount, the fitting charge is
//! still collected in full and passed to the technician.
//!
//! The calculator is total: every input produces a breakdown, and the same
//! input always produces the same breakdown.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;
use crate::types::{Discount, Order, OrderLine};

/// Everything the discount calculation reads from an order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrderCharges<'a> {
    pub lines: &'a [OrderLine],
    pub installation_charge: Money,
    pub miscellaneous_cost: Money,
    pub fitting_cost: Money,
    pub discount: Discount,
}

impl<'a> OrderCharges<'a> {
    /// Charges as currently recorded on the order.
    pub fn from_order(order: &'a Order) -> Self {
        OrderCharges {
            lines: &order.products,
            installation_charge: order.installation_charge,
            miscellaneous_cost: order.miscellaneous_cost,
            fitting_cost: order.fitting_cost,
            discount: order.discount,
        }
    }

    /// The same charges with the discount replaced.
    pub fn with_discount(self, discount: Discount) -> Self {
        OrderCharges { discount, ..self }
    }

    /// Σ unit price × quantity over all lines.
    pub fn product_total(&self) -> Money {
        self.lines
            .iter()
            .fold(Money::zero(), |acc, line| acc.saturating_add(line.line_total()))
    }

    /// Product total plus installation, misc and fitting.
    pub fn gross_subtotal(&self) -> Money {
        self.product_total()
            .saturating_add(self.installation_charge.non_negative())
            .saturating_add(self.miscellaneous_cost.non_negative())
            .saturating_add(self.fitting_cost.non_negative())
    }
}

/// Result of the discount calculation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct DiscountBreakdown {
    pub product_total: Money,
    pub gross_subtotal: Money,
    pub fitting_cost: Money,
    /// Effective discount, `0 ≤ discount_amount ≤ gross_subtotal − fitting_cost`.
    pub discount_amount: Money,
    /// `gross_subtotal − discount_amount`.
    pub final_amount: Money,
}

impl DiscountBreakdown {
    /// Checks whether the order needs an approver.
    #[inline]
    pub const fn has_discount(&self) -> bool {
        self.discount_amount.is_positive()
    }

    /// The same figures with the discount removed.
    pub fn without_discount(&self) -> Self {
        DiscountBreakdown {
            discount_amount: Money::zero(),
            final_amount: self.gross_subtotal,
            ..*self
        }
    }
}

/// Computes the discount breakdown for a set of charges.
///
/// ## Example
/// ```rust
/// use fieldops_core::discount::{calculate_discount, OrderCharges};
/// use fieldops_core::money::{Money, Percentage};
/// use fieldops_core::types::{Discount, OrderLine};
///
/// let lines = vec![OrderLine::new("p1", 2).with_catalog_price(Money::from_cents(10_000))];
/// let charges = OrderCharges {
///     lines: &lines,
///     installation_charge: Money::from_cents(5_000),
///     miscellaneous_cost: Money::zero(),
///     fitting_cost: Money::zero(),
///     discount: Discount::Percentage(Percentage::from_bps(1_000)),
/// };
///
/// let breakdown = calculate_discount(&charges);
/// assert_eq!(breakdown.gross_subtotal.cents(), 25_000);
/// assert_eq!(breakdown.discount_amount.cents(), 2_500);
/// assert_eq!(breakdown.final_amount.cents(), 22_500);
/// ```
pub fn calculate_discount(charges: &OrderCharges<'_>) -> DiscountBreakdown {
    let product_total = charges.product_total();
    let gross_subtotal = charges.gross_subtotal();
    let fitting_cost = charges.fitting_cost.non_negative();

    let requested = match charges.discount {
        Discount::None => Money::zero(),
        Discount::Percentage(pct) => gross_subtotal.percent_of(pct),
        Discount::FixedAmount(amount) => amount.non_negative().min(gross_subtotal),
    };

    let discountable = (gross_subtotal - fitting_cost).non_negative();
    let discount_amount = requested.min(discountable);

    DiscountBreakdown {
        product_total,
        gross_subtotal,
        fitting_cost,
        discount_amount,
        final_amount: gross_subtotal - discount_amount,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::money::Percentage;

    fn rupees(r: i64) -> Money {
        Money::from_cents(r * 100)
    }

    fn lines() -> Vec<OrderLine> {
        vec![OrderLine::new("p1", 2).with_catalog_price(rupees(100))]
    }

    fn charges(lines: &[OrderLine], fitting: Money, discount: Discount) -> OrderCharges<'_> {
        OrderCharges {
            lines,
            installation_charge: rupees(50),
            miscellaneous_cost: Money::zero(),
            fitting_cost: fitting,
            discount,
        }
    }

    #[test]
    fn test_percentage_discount() {
        let lines = lines();
        let b = calculate_discount(&charges(
            &lines,
            Money::zero(),
            Discount::Percentage(Percentage::from_bps(1_000)),
        ));

        assert_eq!(b.product_total, rupees(200));
        assert_eq!(b.gross_subtotal, rupees(250));
        assert_eq!(b.discount_amount, rupees(25));
        assert_eq!(b.final_amount, rupees(225));
    }

    #[test]
    fn test_fixed_amount_clamped_to_gross() {
        let lines = lines();
        let b = calculate_discount(&charges(&lines, Money::zero(), Discount::FixedAmount(rupees(300))));

        assert_eq!(b.discount_amount, rupees(250));
        assert_eq!(b.final_amount, Money::zero());
    }

    #[test]
    fn test_fitting_never_discounted() {
        let lines = lines();
        let b = calculate_discount(&charges(&lines, rupees(100), Discount::FixedAmount(rupees(1_000))));

        assert_eq!(b.gross_subtotal, rupees(350));
        assert_eq!(b.discount_amount, rupees(250));
        assert_eq!(b.final_amount, rupees(100));

        let b = calculate_discount(&charges(
            &lines,
            rupees(100),
            Discount::Percentage(Percentage::full()),
        ));
        assert_eq!(b.discount_amount, rupees(250));
    }

    #[test]
    fn test_no_discount() {
        let lines = lines();
        let b = calculate_discount(&charges(&lines, rupees(10), Discount::None));

        assert_eq!(b.discount_amount, Money::zero());
        assert_eq!(b.final_amount, b.gross_subtotal);
        assert!(!b.has_discount());
    }

    #[test]
    fn test_missing_prices_and_empty_orders() {
        let priceless = vec![OrderLine::new("ghost", 4)];
        let b = calculate_discount(&OrderCharges {
            lines: &priceless,
            installation_charge: Money::zero(),
            miscellaneous_cost: Money::zero(),
            fitting_cost: Money::zero(),
            discount: Discount::Percentage(Percentage::from_bps(5_000)),
        });

        assert_eq!(b, DiscountBreakdown::default());
    }

    #[test]
    fn test_negative_charges_clamp_to_zero() {
        let lines = lines();
        let b = calculate_discount(&OrderCharges {
            lines: &lines,
            installation_charge: Money::from_cents(-5_000),
            miscellaneous_cost: Money::from_cents(-1),
            fitting_cost: Money::from_cents(-300),
            discount: Discount::FixedAmount(Money::from_cents(-100)),
        });

        assert_eq!(b.gross_subtotal, rupees(200));
        assert_eq!(b.fitting_cost, Money::zero());
        assert_eq!(b.discount_amount, Money::zero());
    }

    #[test]
    fn test_sale_price_overrides_catalog() {
        let lines = vec![OrderLine::new("p1", 1)
            .with_catalog_price(rupees(100))
            .with_sale_price(rupees(80))];
        let b = calculate_discount(&charges(&lines, Money::zero(), Discount::None));

        assert_eq!(b.product_total, rupees(80));
    }

    #[test]
    fn test_without_discount() {
        let lines = lines();
        let b = calculate_discount(&charges(&lines, Money::zero(), Discount::FixedAmount(rupees(30))));
        let zeroed = b.without_discount();

        assert_eq!(zeroed.discount_amount, Money::zero());
        assert_eq!(zeroed.final_amount, rupees(250));
        assert_eq!(zeroed.gross_subtotal, b.gross_subtotal);
    }
}
