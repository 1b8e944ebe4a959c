//! # Technician Ledger
//!
//! Running balance between a technician and the company.
//!
//! ```text
//! settled orders ──► Σ technician_cut > 0     = total_earned
//!                └─► Σ outstanding_amount     = total_outstanding
//! payments ────────► Σ amount                 = total_paid
//!
//! balance = total_outstanding − total_paid    (what the technician still owes)
//! ```
//!
//! Only settled orders count. Draft and pending orders carry no cuts yet.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::types::{Order, OrderStatus, TechnicianPayment};

/// Summary of a technician's account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct TechnicianBalance {
    pub technician_id: String,
    pub settled_orders: u32,
    pub total_earned: Money,
    pub total_outstanding: Money,
    pub total_paid: Money,
    /// Positive while the technician owes the company.
    pub balance: Money,
}

impl TechnicianBalance {
    /// What can still be collected; never negative.
    pub fn collectable(&self) -> Money {
        self.balance.non_negative()
    }
}

/// Settled orders count toward the ledger.
fn is_settled(status: OrderStatus) -> bool {
    matches!(
        status,
        OrderStatus::Completed | OrderStatus::Rejected | OrderStatus::Approved
    )
}

/// Computes a technician's balance from their orders and payments.
///
/// Records belonging to other technicians are skipped, so callers may pass
/// unfiltered lists.
pub fn technician_balance(
    technician_id: &str,
    orders: &[Order],
    payments: &[TechnicianPayment],
) -> TechnicianBalance {
    let settled: Vec<&Order> = orders
        .iter()
        .filter(|o| o.technician_id == technician_id && is_settled(o.status))
        .collect();

    let total_earned = settled
        .iter()
        .map(|o| o.technician_cut.non_negative())
        .fold(Money::zero(), Money::saturating_add);
    let total_outstanding = settled
        .iter()
        .map(|o| o.outstanding_amount)
        .fold(Money::zero(), Money::saturating_add);
    let total_paid = payments
        .iter()
        .filter(|p| p.technician_id == technician_id)
        .map(|p| p.amount.non_negative())
        .fold(Money::zero(), Money::saturating_add);

    TechnicianBalance {
        technician_id: technician_id.to_string(),
        settled_orders: settled.len() as u32,
        total_earned,
        total_outstanding,
        total_paid,
        balance: total_outstanding - total_paid,
    }
}

/// Checks a payment against the balance before it is recorded.
///
/// ## Errors
/// - `Validation(MustBePositive)` for zero or negative amounts
/// - `PaymentExceedsBalance` when the amount is more than is owed
pub fn validate_payment(balance: &TechnicianBalance, amount: Money) -> CoreResult<()> {
    if !amount.is_positive() {
        return Err(ValidationError::MustBePositive {
            field: "amount".to_string(),
        }
        .into());
    }

    let collectable = balance.collectable();
    if amount > collectable {
        return Err(CoreError::PaymentExceedsBalance {
            requested: amount,
            balance: collectable,
        });
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Customer, Discount, PaymentMethod};
    use chrono::Utc;

    fn rupees(r: i64) -> Money {
        Money::from_cents(r * 100)
    }

    fn order(technician_id: &str, status: OrderStatus, cut: i64, outstanding: i64) -> Order {
        Order {
            id: uuid::Uuid::new_v4().to_string(),
            tcr_number: "TCR-1".to_string(),
            company_id: "co-1".to_string(),
            technician_id: technician_id.to_string(),
            customer: Customer::default(),
            free_installation: false,
            products: vec![],
            installation_charge: Money::zero(),
            miscellaneous_cost: Money::zero(),
            fitting_cost: Money::zero(),
            discount: Discount::None,
            discount_split: None,
            status,
            gross_subtotal: Money::zero(),
            discount_amount: Money::zero(),
            net_amount: Money::zero(),
            technician_cut: rupees(cut),
            company_cut: Money::zero(),
            outstanding_amount: rupees(outstanding),
            created_at: Utc::now(),
            updated_at: Utc::now(),
            completed_at: None,
        }
    }

    fn payment(technician_id: &str, amount: i64) -> TechnicianPayment {
        TechnicianPayment {
            id: uuid::Uuid::new_v4().to_string(),
            technician_id: technician_id.to_string(),
            amount: rupees(amount),
            method: PaymentMethod::Cash,
            reference: None,
            notes: None,
            collected_at: Utc::now(),
        }
    }

    #[test]
    fn test_balance() {
        let orders = vec![
            order("t1", OrderStatus::Completed, 190, 0),
            order("t1", OrderStatus::Completed, -20, 20),
            order("t1", OrderStatus::Rejected, 15, 0),
            order("t1", OrderStatus::PendingApproval, -99, 99),
            order("t2", OrderStatus::Completed, -50, 50),
        ];
        let payments = vec![payment("t1", 5), payment("t2", 50)];

        let b = technician_balance("t1", &orders, &payments);
        assert_eq!(b.settled_orders, 3);
        assert_eq!(b.total_earned, rupees(205));
        assert_eq!(b.total_outstanding, rupees(20));
        assert_eq!(b.total_paid, rupees(5));
        assert_eq!(b.balance, rupees(15));
    }

    #[test]
    fn test_validate_payment() {
        let orders = vec![order("t1", OrderStatus::Completed, -20, 20)];
        let b = technician_balance("t1", &orders, &[]);

        assert!(validate_payment(&b, rupees(20)).is_ok());
        assert!(matches!(
            validate_payment(&b, rupees(21)),
            Err(CoreError::PaymentExceedsBalance { .. })
        ));
        assert!(matches!(
            validate_payment(&b, Money::zero()),
            Err(CoreError::Validation(ValidationError::MustBePositive { .. }))
        ));
    }

    #[test]
    fn test_overpaid_balance_collects_nothing() {
        let b = technician_balance("t1", &[], &[payment("t1", 10)]);
        assert_eq!(b.balance, rupees(-10));
        assert_eq!(b.collectable(), Money::zero());
        assert!(validate_payment(&b, rupees(1)).is_err());
    }
}
