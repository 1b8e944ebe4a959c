//! # Order Workflow
//!
//! The operations the REST layer exposes: each one loads what it needs,
//! runs one `fieldops-core` transition and persists the result.
//!
//! ## Operation Shape
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  complete_order(id, completion)                                         │
//! │       │                                                                 │
//! │       ├── validate_completion           (fieldops-core, pure)           │
//! │       ├── orders.get_by_id              (SQLite read)                   │
//! │       ├── products.list_catalog                                         │
//! │       ├── technicians + commissions ──► EarningsPolicy                  │
//! │       ├── order.complete(...)           (fieldops-core, pure)           │
//! │       └── orders.save_if_status(order, draft)                           │
//! │                 │                                                       │
//! │                 └── status moved meanwhile? → DbError::Conflict         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::DbError;
use crate::pool::Database;
use crate::repository::inventory::AllocationPage;
use fieldops_core::ledger::{technician_balance, validate_payment, TechnicianBalance};
use fieldops_core::validation::{validate_completion, validate_draft, validate_positive_amount};
use fieldops_core::{
    allocate, Completion, CoreError, DiscountSplit, DraftOrder, EarningsPolicy,
    InventoryAllocation, Money, Order, OrderStatus, PaymentMethod, Settlement, TechnicianPayment,
    ValidationError,
};

/// Allocation log page size when the caller gives none.
pub const DEFAULT_LOG_PAGE_SIZE: u32 = 10;

/// Largest allocation log page served.
pub const MAX_LOG_PAGE_SIZE: u32 = 100;

// =============================================================================
// Errors
// =============================================================================

/// Everything a workflow operation can fail with.
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// Business rule or state machine violation.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Storage failure, including concurrent modification.
    #[error(transparent)]
    Db(#[from] DbError),
}

impl From<ValidationError> for WorkflowError {
    fn from(err: ValidationError) -> Self {
        WorkflowError::Core(CoreError::Validation(err))
    }
}

impl WorkflowError {
    /// Checks whether the caller asked for something that doesn't exist.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            WorkflowError::Core(
                CoreError::OrderNotFound(_)
                    | CoreError::ProductNotFound(_)
                    | CoreError::TechnicianNotFound(_)
                    | CoreError::CompanyNotFound(_)
            ) | WorkflowError::Db(DbError::NotFound { .. })
        )
    }
}

/// Result type for workflow operations.
pub type WorkflowResult<T> = Result<T, WorkflowError>;

// =============================================================================
// Inputs
// =============================================================================

/// A payment as entered on the payment screen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPayment {
    pub technician_id: String,
    pub amount: Money,
    pub method: PaymentMethod,
    #[serde(default)]
    pub reference: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

// =============================================================================
// Workflow
// =============================================================================

/// Order lifecycle and technician ledger operations, plus stock allocation.
#[derive(Debug, Clone)]
pub struct OrderWorkflow {
    db: Database,
}

impl OrderWorkflow {
    pub fn new(db: Database) -> Self {
        OrderWorkflow { db }
    }

    /// Creates a draft order.
    pub async fn create_draft(&self, draft: DraftOrder) -> WorkflowResult<Order> {
        validate_draft(&draft)?;

        let company = self
            .db
            .companies()
            .get_by_id(&draft.company_id)
            .await?
            .ok_or_else(|| CoreError::CompanyNotFound(draft.company_id.clone()))?;
        let technician = self
            .db
            .technicians()
            .get_by_id(&draft.technician_id)
            .await?
            .ok_or_else(|| CoreError::TechnicianNotFound(draft.technician_id.clone()))?;

        let order = Order::new_draft(
            Uuid::new_v4().to_string(),
            draft,
            &company,
            &technician,
            Utc::now(),
        )?;
        self.db.orders().save(&order).await?;

        info!(
            order_id = %order.id,
            tcr_number = %order.tcr_number,
            technician_id = %order.technician_id,
            "Draft order created"
        );
        Ok(order)
    }

    /// Replaces the editable fields of a draft.
    pub async fn update_draft(&self, id: &str, draft: DraftOrder) -> WorkflowResult<Order> {
        validate_draft(&draft)?;

        let mut order = self.load(id).await?;
        let company = self
            .db
            .companies()
            .get_by_id(&draft.company_id)
            .await?
            .ok_or_else(|| CoreError::CompanyNotFound(draft.company_id.clone()))?;
        let technician = self
            .db
            .technicians()
            .get_by_id(&draft.technician_id)
            .await?
            .ok_or_else(|| CoreError::TechnicianNotFound(draft.technician_id.clone()))?;

        order.edit_draft(draft, &company, &technician, Utc::now())?;
        self.db
            .orders()
            .save_if_status(&order, OrderStatus::Draft)
            .await?;

        info!(order_id = %order.id, "Draft order updated");
        Ok(order)
    }

    /// Completes a draft; see [`Order::complete`].
    ///
    /// Ends in `pending-approval` when a discount was requested, otherwise
    /// in `completed`.
    pub async fn complete_order(&self, id: &str, completion: Completion) -> WorkflowResult<Order> {
        validate_completion(&completion)?;

        if let Err(err) = completion.discount() {
            warn!(order_id = %id, error = %err, "Ignoring malformed discount");
        }

        let mut order = self.load(id).await?;
        let catalog = self.db.products().list_catalog().await?;
        let policy = self.earnings_policy(&order.technician_id).await?;

        order.complete(completion, &catalog, &policy, Utc::now())?;
        self.db
            .orders()
            .save_if_status(&order, OrderStatus::Draft)
            .await?;

        info!(
            order_id = %order.id,
            status = %order.status,
            gross = %order.gross_subtotal,
            discount = %order.discount_amount,
            "Order completed"
        );
        Ok(order)
    }

    /// Approves a pending discount with an owner/technician split.
    pub async fn approve_discount(&self, id: &str, split: DiscountSplit) -> WorkflowResult<Order> {
        let mut order = self.load(id).await?;
        let policy = self.earnings_policy(&order.technician_id).await?;

        order.approve_discount(split, &policy, Utc::now())?;
        self.db
            .orders()
            .save_if_status(&order, OrderStatus::PendingApproval)
            .await?;

        info!(
            order_id = %order.id,
            owner_share = %split.owner(),
            technician_share = %split.technician(),
            technician_cut = %order.technician_cut,
            outstanding = %order.outstanding_amount,
            "Discount approved"
        );
        Ok(order)
    }

    /// Rejects a pending discount; the order settles without it.
    pub async fn reject_discount(&self, id: &str) -> WorkflowResult<Order> {
        let mut order = self.load(id).await?;
        let policy = self.earnings_policy(&order.technician_id).await?;

        order.reject_discount(&policy, Utc::now())?;
        self.db
            .orders()
            .save_if_status(&order, OrderStatus::PendingApproval)
            .await?;

        info!(order_id = %order.id, "Discount rejected");
        Ok(order)
    }

    /// What approving with `split` would settle to, without changing anything.
    pub async fn settlement_preview(
        &self,
        id: &str,
        split: DiscountSplit,
    ) -> WorkflowResult<Settlement> {
        let order = self.load(id).await?;
        let policy = self.earnings_policy(&order.technician_id).await?;
        Ok(order.settlement_preview(&split, &policy))
    }

    /// Deletes a draft order.
    pub async fn delete_draft(&self, id: &str) -> WorkflowResult<()> {
        let order = self.load(id).await?;
        order.ensure_deletable()?;
        self.db.orders().delete_draft(id).await?;

        info!(order_id = %id, "Draft order deleted");
        Ok(())
    }

    /// A technician's running balance.
    pub async fn technician_balance(&self, technician_id: &str) -> WorkflowResult<TechnicianBalance> {
        if self.db.technicians().get_by_id(technician_id).await?.is_none() {
            return Err(CoreError::TechnicianNotFound(technician_id.to_string()).into());
        }

        let orders = self.db.orders().list_for_technician(technician_id).await?;
        let payments = self.db.payments().for_technician(technician_id).await?;
        Ok(technician_balance(technician_id, &orders, &payments))
    }

    /// Records a payment collected from a technician.
    ///
    /// Rejected when it exceeds what the technician owes. The insert only
    /// lands if no other payment was recorded since the balance was read;
    /// otherwise `DbError::BalanceChanged`.
    pub async fn record_payment(&self, input: NewPayment) -> WorkflowResult<TechnicianPayment> {
        validate_positive_amount("amount", input.amount)?;

        let balance = self.technician_balance(&input.technician_id).await?;
        validate_payment(&balance, input.amount)?;

        let payment = TechnicianPayment {
            id: Uuid::new_v4().to_string(),
            technician_id: input.technician_id,
            amount: input.amount,
            method: input.method,
            reference: input.reference,
            notes: input.notes,
            collected_at: Utc::now(),
        };
        self.db
            .payments()
            .insert_if_paid_total(&payment, balance.total_paid)
            .await?;

        info!(
            technician_id = %payment.technician_id,
            amount = %payment.amount,
            remaining = %(balance.collectable() - payment.amount),
            "Payment recorded"
        );
        Ok(payment)
    }

    /// Hands `quantity` units of a product to a technician.
    ///
    /// Accepts `1..=available` where available is `total_count − allocated_count`.
    /// If another allocation takes the stock between the read and the write,
    /// fails with `DbError::StockChanged`.
    pub async fn allocate_inventory(
        &self,
        product_id: &str,
        technician_id: &str,
        quantity: i64,
    ) -> WorkflowResult<InventoryAllocation> {
        let product = self
            .db
            .products()
            .get_by_id(product_id)
            .await?
            .ok_or_else(|| CoreError::ProductNotFound(product_id.to_string()))?;
        let technician = self
            .db
            .technicians()
            .get_by_id(technician_id)
            .await?
            .ok_or_else(|| CoreError::TechnicianNotFound(technician_id.to_string()))?;

        let allocation = allocate(
            Uuid::new_v4().to_string(),
            &product,
            &technician,
            quantity,
            Utc::now(),
        )?;
        self.db.inventory().allocate(&allocation).await?;

        info!(
            product_id = %allocation.product_id,
            technician_id = %allocation.technician_id,
            quantity,
            remaining = product.available_count() - quantity,
            "Stock allocated"
        );
        Ok(allocation)
    }

    /// A page of the allocation log, newest first.
    ///
    /// `limit` 0 means [`DEFAULT_LOG_PAGE_SIZE`]; larger limits are capped at
    /// [`MAX_LOG_PAGE_SIZE`].
    pub async fn allocation_logs(&self, page: u32, limit: u32) -> WorkflowResult<AllocationPage> {
        let limit = match limit {
            0 => DEFAULT_LOG_PAGE_SIZE,
            n => n.min(MAX_LOG_PAGE_SIZE),
        };
        Ok(self.db.inventory().list_page(page, limit).await?)
    }

    async fn load(&self, id: &str) -> WorkflowResult<Order> {
        self.db
            .orders()
            .get_by_id(id)
            .await?
            .ok_or_else(|| CoreError::OrderNotFound(id.to_string()).into())
    }

    async fn earnings_policy(&self, technician_id: &str) -> WorkflowResult<EarningsPolicy> {
        let technician = self
            .db
            .technicians()
            .get_by_id(technician_id)
            .await?
            .ok_or_else(|| CoreError::TechnicianNotFound(technician_id.to_string()))?;
        let commissions = self.db.commissions().for_technician(technician_id).await?;

        Ok(EarningsPolicy::for_technician(&technician, &commissions))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
