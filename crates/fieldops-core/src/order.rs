//! # Order State Machine
//!
//! Gates every change to an order and the moment its money is settled.
//!
//! ## Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   new_draft ──► ┌───────┐ ◄── edit_draft                                │
//! │                 │ draft │                                               │
//! │                 └───┬───┘ ──── delete (draft only)                      │
//! │                     │ complete                                          │
//! │          ┌──────────┴───────────┐                                       │
//! │   discount > 0            discount == 0                                 │
//! │          ▼                      │                                       │
//! │  ┌──────────────────┐           │                                       │
//! │  │ pending-approval │           │                                       │
//! │  └───┬──────────┬───┘           │                                       │
//! │      │ approve  │ reject        │                                       │
//! │      ▼          ▼               ▼                                       │
//! │  ┌──────────┐ ┌──────────┐ ┌───────────┐                                │
//! │  │completed │ │ rejected │ │ completed │   terminal                     │
//! │  └──────────┘ └──────────┘ └───────────┘                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Transitions are methods on [`Order`] over already-fetched data (catalog,
//! company, technician policy) and an explicit timestamp, so they never touch
//! I/O. A failed transition leaves the order unchanged.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

use crate::discount::{calculate_discount, DiscountBreakdown, OrderCharges};
use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::settlement::{settle, EarningsPolicy, Settlement};
use crate::types::{
    Company, Customer, Discount, DiscountSplit, Order, OrderLine, OrderStatus, Product,
    RawDiscount, Technician,
};

// =============================================================================
// Actions & Inputs
// =============================================================================

/// Something a caller asks an order to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OrderAction {
    Edit,
    Complete,
    ApproveDiscount,
    RejectDiscount,
    Delete,
}

impl fmt::Display for OrderAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OrderAction::Edit => "edit",
            OrderAction::Complete => "complete",
            OrderAction::ApproveDiscount => "approve discount",
            OrderAction::RejectDiscount => "reject discount",
            OrderAction::Delete => "delete",
        })
    }
}

/// Fields a supervisor enters when creating or editing a draft.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct DraftOrder {
    pub tcr_number: String,
    pub company_id: String,
    pub technician_id: String,
    pub customer: Customer,
    #[serde(default)]
    pub free_installation: bool,
    #[serde(default)]
    pub products: Vec<OrderLine>,
}

/// What the technician reports when the job is done.
///
/// ## Units
/// The two costs are [`Money`] and travel as integer paise, like every other
/// amount on the wire. The discount is the form input as typed: an `amount`
/// value is rupees (`{"type": "amount", "value": 25}` is ₹25.00) and a
/// `percentage` value is whole percent. [`Discount::from_raw`] converts it.
///
/// ```json
/// { "fittingCost": 20000, "discount": { "type": "amount", "value": 25 } }
/// ```
/// is ₹200.00 fitting with a ₹25.00 discount.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Completion {
    pub products: Vec<OrderLine>,
    /// Paise.
    #[serde(default)]
    pub miscellaneous_cost: Money,
    /// Paise.
    #[serde(default)]
    pub fitting_cost: Money,
    /// Rupees or whole percent, loosely typed; see [`Completion::discount`].
    #[serde(default)]
    pub discount: RawDiscount,
}

impl Completion {
    /// Strict reading of the requested discount.
    ///
    /// `complete` itself reads leniently; callers use this to notice and log
    /// a discount that is about to be ignored.
    pub fn discount(&self) -> CoreResult<Discount> {
        Discount::parse(self.discount.kind.as_deref(), &self.discount.value)
    }
}

// =============================================================================
// Transitions
// =============================================================================

impl Order {
    /// Creates a draft order.
    ///
    /// The installation charge comes from the company unless installation is
    /// free. Blocked technicians cannot receive new orders.
    pub fn new_draft(
        id: impl Into<String>,
        draft: DraftOrder,
        company: &Company,
        technician: &Technician,
        now: DateTime<Utc>,
    ) -> CoreResult<Order> {
        if technician.is_blocked {
            return Err(CoreError::TechnicianBlocked(technician.id.clone()));
        }

        Ok(Order {
            id: id.into(),
            installation_charge: installation_charge_for(company, draft.free_installation),
            tcr_number: draft.tcr_number,
            company_id: draft.company_id,
            technician_id: draft.technician_id,
            customer: draft.customer,
            free_installation: draft.free_installation,
            products: draft.products,
            miscellaneous_cost: Money::zero(),
            fitting_cost: Money::zero(),
            discount: Discount::None,
            discount_split: None,
            status: OrderStatus::Draft,
            gross_subtotal: Money::zero(),
            discount_amount: Money::zero(),
            net_amount: Money::zero(),
            technician_cut: Money::zero(),
            company_cut: Money::zero(),
            outstanding_amount: Money::zero(),
            created_at: now,
            updated_at: now,
            completed_at: None,
        })
    }

    /// Replaces the editable fields of a draft.
    pub fn edit_draft(
        &mut self,
        draft: DraftOrder,
        company: &Company,
        technician: &Technician,
        now: DateTime<Utc>,
    ) -> CoreResult<()> {
        self.ensure_status(OrderStatus::Draft, OrderAction::Edit)?;
        if technician.is_blocked && technician.id != self.technician_id {
            return Err(CoreError::TechnicianBlocked(technician.id.clone()));
        }

        self.installation_charge = installation_charge_for(company, draft.free_installation);
        self.tcr_number = draft.tcr_number;
        self.company_id = draft.company_id;
        self.technician_id = draft.technician_id;
        self.customer = draft.customer;
        self.free_installation = draft.free_installation;
        self.products = draft.products;
        self.updated_at = now;
        Ok(())
    }

    /// Completes a draft.
    ///
    /// ## Behavior
    /// - Freezes each line's catalog price (unknown products price at 0)
    /// - Computes the discount breakdown
    /// - `discount_amount > 0` → `pending-approval`, cuts stay zero
    /// - otherwise → `completed`, settled with no discount
    ///
    /// A malformed discount counts as no discount.
    pub fn complete(
        &mut self,
        completion: Completion,
        catalog: &[Product],
        policy: &EarningsPolicy,
        now: DateTime<Utc>,
    ) -> CoreResult<()> {
        self.ensure_status(OrderStatus::Draft, OrderAction::Complete)?;

        self.products = completion
            .products
            .into_iter()
            .map(|line| {
                let catalog_price = catalog
                    .iter()
                    .find(|p| p.id == line.product_id)
                    .map(|p| p.price);
                OrderLine {
                    catalog_price,
                    ..line
                }
            })
            .collect();
        self.miscellaneous_cost = completion.miscellaneous_cost.non_negative();
        self.fitting_cost = completion.fitting_cost.non_negative();
        self.discount = Discount::from_raw(&completion.discount);
        self.discount_split = None;
        self.updated_at = now;

        let breakdown = self.discount_breakdown();
        self.record_breakdown(&breakdown);

        if breakdown.has_discount() {
            self.status = OrderStatus::PendingApproval;
            self.clear_cuts();
        } else {
            let settlement = settle(
                &breakdown,
                &DiscountSplit::owner_only(),
                &policy.earnings_for(&self.charges()),
            );
            self.record_settlement(&settlement);
            self.status = OrderStatus::Completed;
            self.completed_at = Some(now);
        }
        Ok(())
    }

    /// Approves the pending discount with an owner/technician split.
    pub fn approve_discount(
        &mut self,
        split: DiscountSplit,
        policy: &EarningsPolicy,
        now: DateTime<Utc>,
    ) -> CoreResult<()> {
        self.ensure_status(OrderStatus::PendingApproval, OrderAction::ApproveDiscount)?;

        let breakdown = self.discount_breakdown();
        let settlement = settle(&breakdown, &split, &policy.earnings_for(&self.charges()));

        self.record_breakdown(&breakdown);
        self.record_settlement(&settlement);
        self.discount_split = Some(split);
        self.status = OrderStatus::Completed;
        self.updated_at = now;
        self.completed_at = Some(now);
        Ok(())
    }

    /// Rejects the pending discount.
    ///
    /// The requested discount stays on the order for audit, but the
    /// effective amount is zero and settlement runs without it.
    pub fn reject_discount(&mut self, policy: &EarningsPolicy, now: DateTime<Utc>) -> CoreResult<()> {
        self.ensure_status(OrderStatus::PendingApproval, OrderAction::RejectDiscount)?;

        let breakdown = self.discount_breakdown().without_discount();
        let settlement = settle(
            &breakdown,
            &DiscountSplit::owner_only(),
            &policy.earnings_for(&self.charges()),
        );

        self.record_breakdown(&breakdown);
        self.record_settlement(&settlement);
        self.discount_split = None;
        self.status = OrderStatus::Rejected;
        self.updated_at = now;
        self.completed_at = Some(now);
        Ok(())
    }

    /// What approving with `split` would settle to. Does not change the order.
    pub fn settlement_preview(&self, split: &DiscountSplit, policy: &EarningsPolicy) -> Settlement {
        settle(
            &self.discount_breakdown(),
            split,
            &policy.earnings_for(&self.charges()),
        )
    }

    /// Only drafts can be deleted.
    pub fn ensure_deletable(&self) -> CoreResult<()> {
        self.ensure_status(OrderStatus::Draft, OrderAction::Delete)
    }

    /// The charges the calculators read.
    pub fn charges(&self) -> OrderCharges<'_> {
        OrderCharges::from_order(self)
    }

    /// Discount breakdown of the order's current charges.
    pub fn discount_breakdown(&self) -> DiscountBreakdown {
        calculate_discount(&self.charges())
    }

    fn ensure_status(&self, expected: OrderStatus, action: OrderAction) -> CoreResult<()> {
        if self.status != expected {
            return Err(CoreError::InvalidStateTransition {
                order_id: self.id.clone(),
                from: self.status,
                action,
            });
        }
        Ok(())
    }

    fn record_breakdown(&mut self, breakdown: &DiscountBreakdown) {
        self.gross_subtotal = breakdown.gross_subtotal;
        self.discount_amount = breakdown.discount_amount;
        self.net_amount = breakdown.final_amount;
    }

    fn record_settlement(&mut self, settlement: &Settlement) {
        self.technician_cut = settlement.technician_cut;
        self.company_cut = settlement.company_cut;
        self.outstanding_amount = settlement.outstanding_amount;
    }

    fn clear_cuts(&mut self) {
        self.technician_cut = Money::zero();
        self.company_cut = Money::zero();
        self.outstanding_amount = Money::zero();
    }
}

fn installation_charge_for(company: &Company, free_installation: bool) -> Money {
    if free_installation {
        Money::zero()
    } else {
        company.installation_charge.non_negative()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::money::Percentage;
    use serde_json::json;

    fn rupees(r: i64) -> Money {
        Money::from_cents(r * 100)
    }

    fn company() -> Company {
        Company {
            id: "co-1".to_string(),
            name: "Aqua Filters".to_string(),
            installation_charge: rupees(50),
            is_active: true,
            created_at: Utc::now(),
        }
    }

    fn technician(blocked: bool) -> Technician {
        Technician {
            id: "tech-1".to_string(),
            name: "Ravi".to_string(),
            phone: "9876543210".to_string(),
            company_ids: vec!["co-1".to_string()],
            service_rate: Money::zero(),
            misc_share: Percentage::zero(),
            is_blocked: blocked,
            created_at: Utc::now(),
        }
    }

    fn catalog() -> Vec<Product> {
        vec![Product {
            id: "p1".to_string(),
            sku: "RO-100".to_string(),
            name: "RO Purifier".to_string(),
            description: None,
            price: rupees(100),
            is_active: true,
            total_count: 0,
            allocated_count: 0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }]
    }

    fn draft(free_installation: bool) -> DraftOrder {
        DraftOrder {
            tcr_number: "TCR-001".to_string(),
            company_id: "co-1".to_string(),
            technician_id: "tech-1".to_string(),
            customer: Customer {
                name: "Asha".to_string(),
                phone: "9123456780".to_string(),
                pincode: "560001".to_string(),
                ..Default::default()
            },
            free_installation,
            products: vec![OrderLine::new("p1", 2)],
        }
    }

    fn completion(fitting: i64, discount: RawDiscount) -> Completion {
        Completion {
            products: vec![OrderLine::new("p1", 2)],
            miscellaneous_cost: Money::zero(),
            fitting_cost: rupees(fitting),
            discount,
        }
    }

    fn percent(value: i64) -> RawDiscount {
        RawDiscount {
            kind: Some("percentage".to_string()),
            value: json!(value),
        }
    }

    fn new_order() -> Order {
        Order::new_draft("ord-1", draft(false), &company(), &technician(false), Utc::now()).unwrap()
    }

    #[test]
    fn test_new_draft() {
        let order = new_order();
        assert_eq!(order.status, OrderStatus::Draft);
        assert_eq!(order.installation_charge, rupees(50));

        let free =
            Order::new_draft("ord-2", draft(true), &company(), &technician(false), Utc::now()).unwrap();
        assert_eq!(free.installation_charge, Money::zero());
    }

    #[test]
    fn test_blocked_technician_rejected() {
        let result = Order::new_draft("ord-1", draft(false), &company(), &technician(true), Utc::now());
        assert_eq!(result, Err(CoreError::TechnicianBlocked("tech-1".to_string())));
    }

    #[test]
    fn test_edit_draft() {
        let mut order = new_order();
        let mut edited = draft(true);
        edited.tcr_number = "TCR-002".to_string();

        order.edit_draft(edited, &company(), &technician(false), Utc::now()).unwrap();
        assert_eq!(order.tcr_number, "TCR-002");
        assert_eq!(order.installation_charge, Money::zero());
    }

    #[test]
    fn test_complete_with_discount_needs_approval() {
        let mut order = new_order();
        order
            .complete(completion(0, percent(10)), &catalog(), &EarningsPolicy::default(), Utc::now())
            .unwrap();

        assert_eq!(order.status, OrderStatus::PendingApproval);
        assert_eq!(order.products[0].catalog_price, Some(rupees(100)));
        assert_eq!(order.gross_subtotal, rupees(250));
        assert_eq!(order.discount_amount, rupees(25));
        assert_eq!(order.net_amount, rupees(225));
        assert_eq!(order.technician_cut, Money::zero());
        assert!(order.completed_at.is_none());
    }

    #[test]
    fn test_complete_without_discount_settles_directly() {
        let mut order = new_order();
        order
            .complete(
                completion(20, RawDiscount::default()),
                &catalog(),
                &EarningsPolicy::default(),
                Utc::now(),
            )
            .unwrap();

        assert_eq!(order.status, OrderStatus::Completed);
        assert_eq!(order.gross_subtotal, rupees(270));
        assert_eq!(order.technician_cut, rupees(20));
        assert_eq!(order.company_cut, rupees(250));
        assert!(order.completed_at.is_some());
    }

    #[test]
    fn test_explicit_zero_discount_settles_directly() {
        let zeros = [
            RawDiscount {
                kind: Some("percentage".to_string()),
                value: json!(0),
            },
            RawDiscount {
                kind: Some("amount".to_string()),
                value: json!(0),
            },
        ];

        for discount in zeros {
            let mut order = new_order();
            order
                .complete(completion(20, discount), &catalog(), &EarningsPolicy::default(), Utc::now())
                .unwrap();

            assert_eq!(order.status, OrderStatus::Completed);
            assert_eq!(order.discount_amount, Money::zero());
            assert_eq!(order.net_amount, rupees(270));
            assert_eq!(order.technician_cut, rupees(20));
            assert_eq!(order.company_cut, rupees(250));
            assert!(order.completed_at.is_some());
        }
    }

    #[test]
    fn test_completion_wire_units() {
        let completion: Completion = serde_json::from_value(json!({
            "products": [],
            "fittingCost": 20_000,
            "discount": { "type": "amount", "value": 25 }
        }))
        .unwrap();

        assert_eq!(completion.fitting_cost, rupees(200));
        assert_eq!(completion.discount(), Ok(Discount::FixedAmount(rupees(25))));
    }

    #[test]
    fn test_malformed_discount_completes_as_no_discount() {
        let mut order = new_order();
        let bad = RawDiscount {
            kind: Some("coupon".to_string()),
            value: json!(50),
        };
        let completion = completion(0, bad);
        assert!(completion.discount().is_err());

        order
            .complete(completion, &catalog(), &EarningsPolicy::default(), Utc::now())
            .unwrap();
        assert_eq!(order.status, OrderStatus::Completed);
        assert_eq!(order.discount_amount, Money::zero());
    }

    #[test]
    fn test_unknown_product_prices_at_zero() {
        let mut order = new_order();
        let mut c = completion(0, RawDiscount::default());
        c.products.push(OrderLine::new("missing", 3));

        order
            .complete(c, &catalog(), &EarningsPolicy::default(), Utc::now())
            .unwrap();
        assert_eq!(order.products[1].catalog_price, None);
        assert_eq!(order.gross_subtotal, rupees(250));
    }

    #[test]
    fn test_approve_discount() {
        let mut order = new_order();
        order
            .complete(completion(200, percent(10)), &catalog(), &EarningsPolicy::default(), Utc::now())
            .unwrap();
        let split = DiscountSplit::from_percentages(60.0, 40.0).unwrap();

        let preview = order.settlement_preview(&split, &EarningsPolicy::default());
        order
            .approve_discount(split, &EarningsPolicy::default(), Utc::now())
            .unwrap();

        assert_eq!(order.status, OrderStatus::Completed);
        assert_eq!(order.discount_split, Some(split));
        assert_eq!(order.technician_cut, preview.technician_cut);
        assert_eq!(
            order.technician_cut + order.company_cut + order.discount_amount,
            order.gross_subtotal
        );
    }

    #[test]
    fn test_reject_discount_keeps_request_for_audit() {
        let mut order = new_order();
        order
            .complete(completion(5, percent(10)), &catalog(), &EarningsPolicy::default(), Utc::now())
            .unwrap();
        order
            .reject_discount(&EarningsPolicy::default(), Utc::now())
            .unwrap();

        assert_eq!(order.status, OrderStatus::Rejected);
        assert_eq!(order.discount_amount, Money::zero());
        assert_eq!(order.net_amount, order.gross_subtotal);
        assert_eq!(order.discount, Discount::Percentage(Percentage::from_bps(1_000)));
        assert_eq!(order.technician_cut, rupees(5));
        assert_eq!(order.outstanding_amount, Money::zero());
    }

    #[test]
    fn test_invalid_transitions() {
        let mut order = new_order();
        let split = DiscountSplit::owner_only();

        let err = order
            .approve_discount(split, &EarningsPolicy::default(), Utc::now())
            .unwrap_err();
        assert_eq!(
            err,
            CoreError::InvalidStateTransition {
                order_id: "ord-1".to_string(),
                from: OrderStatus::Draft,
                action: OrderAction::ApproveDiscount,
            }
        );

        order
            .complete(completion(0, percent(10)), &catalog(), &EarningsPolicy::default(), Utc::now())
            .unwrap();
        assert!(order.ensure_deletable().is_err());
        assert!(order
            .edit_draft(draft(false), &company(), &technician(false), Utc::now())
            .is_err());

        order
            .approve_discount(split, &EarningsPolicy::default(), Utc::now())
            .unwrap();
        let before = order.clone();
        assert!(order
            .reject_discount(&EarningsPolicy::default(), Utc::now())
            .is_err());
        assert_eq!(order, before);
    }

    #[test]
    fn test_legacy_approved_is_terminal() {
        let mut order = new_order();
        order.status = OrderStatus::Approved;

        assert!(order.ensure_deletable().is_err());
        assert!(order
            .complete(completion(0, percent(5)), &catalog(), &EarningsPolicy::default(), Utc::now())
            .is_err());
    }
}
