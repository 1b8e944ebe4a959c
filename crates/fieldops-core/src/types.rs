//! # Domain Types
//!
//! Core domain types used throughout FieldOps.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Company      │   │   Technician    │   │    Product      │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  installation_  │   │  service_rate   │   │  price          │       │
//! │  │    charge       │   │  misc_share     │   │                 │       │
//! │  └────────┬────────┘   └────────┬────────┘   └────────┬────────┘       │
//! │           │                     │                     │                 │
//! │           └──────────┬──────────┴──────────┬──────────┘                 │
//! │                      ▼                     ▼                            │
//! │             ┌─────────────────┐   ┌─────────────────┐                   │
//! │             │     Order       │   │   OrderLine     │                   │
//! │             │  ─────────────  │◄──│  ─────────────  │                   │
//! │             │  status         │   │  quantity       │                   │
//! │             │  discount       │   │  sale_price     │                   │
//! │             │  discount_split │   │  catalog_price  │                   │
//! │             │  settlement     │   └─────────────────┘                   │
//! │             └─────────────────┘                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Wire Format
//! Records serialize camelCase. `Money` is integer paise and `Percentage` is
//! integer basis points, except in the two approver-entered records,
//! [`Discount`] and [`DiscountSplit`], which keep the plain numbers the
//! approver typed (`{"type": "percentage", "value": 10}`,
//! `{"ownerPercentage": 60, "technicianPercentage": 40}`).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::money::{
    clamp_percentage, exact_decimal, to_amount, Money, Percentage, EXACT_HUNDRED, FULL_BPS,
};

// =============================================================================
// Catalog Entities
// =============================================================================

/// A product in the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Product {
    pub id: String,
    pub sku: String,
    pub name: String,
    pub description: Option<String>,
    /// Catalog price. An order line may override it with a sale price.
    pub price: Money,
    /// Inactive products stay resolvable for old orders.
    pub is_active: bool,
    /// Units in stock, allocated or not.
    #[serde(default)]
    pub total_count: i64,
    /// Units already handed out to technicians.
    #[serde(default)]
    pub allocated_count: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Units that can still be allocated.
    pub fn available_count(&self) -> i64 {
        (self.total_count - self.allocated_count).max(0)
    }
}

/// A client company that technicians install for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Company {
    pub id: String,
    pub name: String,
    /// Default installation charge applied to new orders unless free installation.
    pub installation_charge: Money,
    pub is_active: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// A field technician.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Technician {
    pub id: String,
    pub name: String,
    pub phone: String,
    /// Companies this technician works for.
    pub company_ids: Vec<String>,
    /// Fixed per-order earning, never discounted.
    pub service_rate: Money,
    /// Share of the miscellaneous cost credited to the technician.
    pub misc_share: Percentage,
    /// Blocked technicians cannot take new orders.
    pub is_blocked: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// Per-unit commission a technician earns for installing a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Commission {
    pub id: String,
    pub technician_id: String,
    pub product_id: String,
    pub amount: Money,
}

// =============================================================================
// Order Status
// =============================================================================

/// Lifecycle status of an order.
///
/// ```text
///  draft ──complete──► pending-approval ──approve──► completed
///    │                        │
///    │ (zero discount)        └──reject──► rejected
///    └───────────────────────────────────► completed
/// ```
///
/// `approved` only appears on legacy records and is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "kebab-case"))]
#[ts(export)]
#[serde(rename_all = "kebab-case")]
pub enum OrderStatus {
    /// Created by a supervisor, still editable.
    Draft,
    /// Completed with a discount that needs an approver's split.
    PendingApproval,
    /// Legacy status from older records.
    Approved,
    /// Settled.
    Completed,
    /// Discount rejected; settled without it.
    Rejected,
}

impl OrderStatus {
    /// The wire/database spelling.
    pub const fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Draft => "draft",
            OrderStatus::PendingApproval => "pending-approval",
            OrderStatus::Approved => "approved",
            OrderStatus::Completed => "completed",
            OrderStatus::Rejected => "rejected",
        }
    }

    /// No transition leaves a terminal status.
    pub const fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderStatus::Approved | OrderStatus::Completed | OrderStatus::Rejected
        )
    }
}

impl Default for OrderStatus {
    fn default() -> Self {
        OrderStatus::Draft
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Discount
// =============================================================================

/// The discount requested on an order.
///
/// A sum type instead of a loosely typed `{type, value}` record: every
/// calculation matches exhaustively over the three cases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawDiscount", into = "RawDiscount")]
pub enum Discount {
    /// No discount.
    None,
    /// Percentage of the gross subtotal, already clamped to [0, 100].
    Percentage(Percentage),
    /// Fixed amount, already non-negative. Capped by the calculator.
    FixedAmount(Money),
}

impl Discount {
    /// Strict reading of a `{type, value}` pair.
    ///
    /// ## Rules
    /// - `"percentage"` → value coerced to a number and clamped to [0, 100]
    /// - `"amount"` → value coerced with [`to_amount`]
    /// - missing, `""` or `"none"` → `Discount::None`
    /// - anything else → `CoreError::MalformedDiscount`
    ///
    /// ## Example
    /// ```rust
    /// use fieldops_core::types::Discount;
    /// use serde_json::json;
    ///
    /// let d = Discount::parse(Some("percentage"), &json!(150)).unwrap();
    /// assert!(matches!(d, Discount::Percentage(p) if p.bps() == 10_000));
    /// assert!(Discount::parse(Some("bogus"), &json!(5)).is_err());
    /// ```
    pub fn parse(kind: Option<&str>, value: &Value) -> CoreResult<Discount> {
        match kind.map(str::trim) {
            None | Some("") | Some("none") => Ok(Discount::None),
            Some("percentage") => Ok(Discount::Percentage(clamp_percentage(percent_number(value)))),
            Some("amount") => Ok(Discount::FixedAmount(to_amount(value))),
            Some(other) => Err(CoreError::MalformedDiscount {
                kind: other.to_string(),
            }),
        }
    }

    /// Lenient reading: a malformed discount is no discount.
    ///
    /// Keeps order completion non-blocking.
    pub fn from_raw(raw: &RawDiscount) -> Discount {
        Discount::parse(raw.kind.as_deref(), &raw.value).unwrap_or_default()
    }

    /// Checks whether this discount can produce a non-zero amount.
    pub const fn is_none(&self) -> bool {
        match self {
            Discount::None => true,
            Discount::Percentage(p) => p.is_zero(),
            Discount::FixedAmount(m) => m.is_zero(),
        }
    }
}

impl Default for Discount {
    fn default() -> Self {
        Discount::None
    }
}

/// Loosely typed wire form of [`Discount`].
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct RawDiscount {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    #[ts(type = "number | string | null")]
    pub value: Value,
}

impl From<RawDiscount> for Discount {
    fn from(raw: RawDiscount) -> Self {
        Discount::from_raw(&raw)
    }
}

impl From<Discount> for RawDiscount {
    fn from(discount: Discount) -> Self {
        match discount {
            Discount::None => RawDiscount::default(),
            Discount::Percentage(p) => RawDiscount {
                kind: Some("percentage".to_string()),
                value: Value::from(p.as_percent()),
            },
            Discount::FixedAmount(m) => RawDiscount {
                kind: Some("amount".to_string()),
                value: Value::from(m.to_major()),
            },
        }
    }
}

/// Coerces a percentage field to a number; unreadable values are 0.
fn percent_number(value: &Value) -> f64 {
    match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => s.trim().parse::<f64>().unwrap_or(0.0),
        _ => 0.0,
    }
}

// =============================================================================
// Discount Split
// =============================================================================

/// How discount liability is divided between the owner and the technician.
///
/// The two halves always add up to exactly 100%: the only constructors check
/// it, and deserialization goes through the same check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawDiscountSplit", into = "RawDiscountSplit")]
pub struct DiscountSplit {
    owner: Percentage,
    technician: Percentage,
}

impl DiscountSplit {
    /// Creates a split, rejecting halves that do not sum to 100%.
    pub fn new(owner: Percentage, technician: Percentage) -> CoreResult<Self> {
        if owner.bps() + technician.bps() != FULL_BPS {
            return Err(CoreError::InvalidSplit {
                owner: owner.as_percent(),
                technician: technician.as_percent(),
            });
        }
        Ok(DiscountSplit { owner, technician })
    }

    /// Creates a split from plain percentages such as `(60.0, 40.0)`.
    ///
    /// Both values must lie in `[0, 100]` and their decimal sum, as written,
    /// must be exactly 100. Nothing is clamped. The technician half rounds
    /// half-up to a basis point and the owner takes the rest, so
    /// `(33.335, 66.665)` becomes 3333 / 6667 bps.
    ///
    /// ## Example
    /// ```rust
    /// use fieldops_core::types::DiscountSplit;
    ///
    /// let split = DiscountSplit::from_percentages(60.0, 40.0).unwrap();
    /// assert_eq!(split.technician().bps(), 4_000);
    /// assert!(DiscountSplit::from_percentages(70.0, 40.0).is_err());
    /// assert!(DiscountSplit::from_percentages(120.0, 0.0).is_err());
    /// ```
    pub fn from_percentages(owner: f64, technician: f64) -> CoreResult<Self> {
        let in_range = |pct: f64| (0.0..=100.0).contains(&pct);
        let total = exact_decimal(owner)
            .zip(exact_decimal(technician))
            .map(|(o, t)| o + t);

        if !in_range(owner) || !in_range(technician) || total != Some(EXACT_HUNDRED) {
            return Err(CoreError::InvalidSplit { owner, technician });
        }

        let technician = clamp_percentage(technician);
        Ok(DiscountSplit {
            owner: technician.complement(),
            technician,
        })
    }

    /// The owner absorbs the whole discount.
    pub const fn owner_only() -> Self {
        DiscountSplit {
            owner: Percentage::full(),
            technician: Percentage::zero(),
        }
    }

    #[inline]
    pub const fn owner(&self) -> Percentage {
        self.owner
    }

    #[inline]
    pub const fn technician(&self) -> Percentage {
        self.technician
    }
}

/// Wire form of [`DiscountSplit`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct RawDiscountSplit {
    pub owner_percentage: f64,
    pub technician_percentage: f64,
}

impl TryFrom<RawDiscountSplit> for DiscountSplit {
    type Error = CoreError;

    fn try_from(raw: RawDiscountSplit) -> Result<Self, Self::Error> {
        DiscountSplit::from_percentages(raw.owner_percentage, raw.technician_percentage)
    }
}

impl From<DiscountSplit> for RawDiscountSplit {
    fn from(split: DiscountSplit) -> Self {
        RawDiscountSplit {
            owner_percentage: split.owner.as_percent(),
            technician_percentage: split.technician.as_percent(),
        }
    }
}

// =============================================================================
// Order
// =============================================================================

/// End customer of an installation.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Customer {
    pub name: String,
    pub phone: String,
    #[serde(default)]
    pub alternate_phone: Option<String>,
    #[serde(default)]
    pub street: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub state: String,
    pub pincode: String,
}

/// A product line on an order.
///
/// Uses the snapshot pattern: `catalog_price` freezes the catalog price when
/// the order is completed, so later price changes never alter a settled order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct OrderLine {
    pub product_id: String,
    pub quantity: i64,
    /// Price override agreed with the customer.
    #[serde(default)]
    pub sale_price: Option<Money>,
    /// Catalog price at completion time (frozen).
    #[serde(default)]
    pub catalog_price: Option<Money>,
}

impl OrderLine {
    /// Creates a line at catalog price.
    pub fn new(product_id: impl Into<String>, quantity: i64) -> Self {
        OrderLine {
            product_id: product_id.into(),
            quantity,
            sale_price: None,
            catalog_price: None,
        }
    }

    /// Sets a sale price override.
    pub fn with_sale_price(mut self, price: Money) -> Self {
        self.sale_price = Some(price);
        self
    }

    /// Sets the catalog price snapshot.
    pub fn with_catalog_price(mut self, price: Money) -> Self {
        self.catalog_price = Some(price);
        self
    }

    /// `sale_price ?? catalog_price ?? 0`, never negative.
    #[inline]
    pub fn unit_price(&self) -> Money {
        self.sale_price
            .or(self.catalog_price)
            .unwrap_or_default()
            .non_negative()
    }

    /// Unit price × quantity; a non-positive quantity counts as 0.
    #[inline]
    pub fn line_total(&self) -> Money {
        self.unit_price().saturating_mul(self.quantity.max(0))
    }
}

/// An installation order, the aggregate root.
///
/// Monetary outputs (`gross_subtotal` … `outstanding_amount`) are written
/// only by the state machine in [`crate::order`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Order {
    pub id: String,
    /// Technician completion report number (business identifier).
    pub tcr_number: String,
    pub company_id: String,
    pub technician_id: String,
    pub customer: Customer,
    pub free_installation: bool,
    pub products: Vec<OrderLine>,
    pub installation_charge: Money,
    pub miscellaneous_cost: Money,
    /// Paid 100% to the technician, never reduced by the discount.
    pub fitting_cost: Money,
    #[serde(default)]
    #[ts(as = "RawDiscount")]
    pub discount: Discount,
    #[serde(default)]
    #[ts(as = "Option<RawDiscountSplit>")]
    pub discount_split: Option<DiscountSplit>,
    pub status: OrderStatus,
    pub gross_subtotal: Money,
    pub discount_amount: Money,
    /// What the customer pays: gross minus the effective discount.
    pub net_amount: Money,
    pub technician_cut: Money,
    pub company_cut: Money,
    /// What the technician owes when their discount share exceeds earnings.
    pub outstanding_amount: Money,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub completed_at: Option<DateTime<Utc>>,
}

// =============================================================================
// Payments
// =============================================================================

/// How a technician paid back an outstanding balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    BankTransfer,
    Check,
    DigitalWallet,
}

impl PaymentMethod {
    /// Human-readable label.
    pub const fn label(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "Cash",
            PaymentMethod::BankTransfer => "Bank Transfer",
            PaymentMethod::Check => "Check",
            PaymentMethod::DigitalWallet => "Digital Wallet",
        }
    }
}

/// A payment collected from a technician against their outstanding balance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct TechnicianPayment {
    pub id: String,
    pub technician_id: String,
    pub amount: Money,
    pub method: PaymentMethod,
    /// External reference (transfer id, cheque number).
    pub reference: Option<String>,
    pub notes: Option<String>,
    #[ts(as = "String")]
    pub collected_at: DateTime<Utc>,
}

// =============================================================================
// Unit Tests
// =============================================================================
