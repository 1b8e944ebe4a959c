//! # Order Repository
//!
//! Persists the order aggregate: one `orders` row plus its `order_lines`.
//!
//! ## Writes
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  save(order)                    save_if_status(order, expected)        │
//! │       │                                  │                              │
//! │       ▼                                  ▼                              │
//! │  BEGIN                           BEGIN                                  │
//! │  upsert orders row               UPDATE … WHERE id = ? AND status = ?   │
//! │                                  0 rows? → ROLLBACK, DbError::Conflict  │
//! │  replace order_lines             replace order_lines                    │
//! │  COMMIT                          COMMIT                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The conditional form is what the workflow uses: a transition computed from
//! a `pending-approval` read only lands if the row is still
//! `pending-approval`, so two approvers cannot both settle one order. It never
//! inserts, so an order deleted after the read stays deleted.

use chrono::{DateTime, Utc};
use sqlx::sqlite::{Sqlite, SqliteArguments};
use sqlx::query::Query;
use sqlx::{FromRow, SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use fieldops_core::{
    Customer, Discount, DiscountSplit, Money, Order, OrderLine, OrderStatus, Percentage,
};

// =============================================================================
// Row Mapping
// =============================================================================

#[derive(Debug, FromRow)]
struct OrderRow {
    id: String,
    tcr_number: String,
    company_id: String,
    technician_id: String,
    customer_name: String,
    customer_phone: String,
    customer_alternate_phone: Option<String>,
    customer_street: String,
    customer_city: String,
    customer_state: String,
    customer_pincode: String,
    free_installation: bool,
    installation_charge: i64,
    miscellaneous_cost: i64,
    fitting_cost: i64,
    discount: Option<String>,
    split_owner_bps: Option<i64>,
    split_technician_bps: Option<i64>,
    status: OrderStatus,
    gross_subtotal: i64,
    discount_amount: i64,
    net_amount: i64,
    technician_cut: i64,
    company_cut: i64,
    outstanding_amount: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, FromRow)]
struct OrderLineRow {
    product_id: String,
    quantity: i64,
    sale_price: Option<i64>,
    catalog_price: Option<i64>,
}

impl From<OrderLineRow> for OrderLine {
    fn from(row: OrderLineRow) -> Self {
        OrderLine {
            product_id: row.product_id,
            quantity: row.quantity,
            sale_price: row.sale_price.map(Money::from_cents),
            catalog_price: row.catalog_price.map(Money::from_cents),
        }
    }
}

fn decode_bps(column: &str, value: i64) -> DbResult<Percentage> {
    let bps = u32::try_from(value).map_err(|e| DbError::decode(column, e))?;
    Percentage::try_from(bps).map_err(|e| DbError::decode(column, e))
}

impl OrderRow {
    fn into_order(self, products: Vec<OrderLine>) -> DbResult<Order> {
        let discount = match self.discount.as_deref() {
            Some(json) => {
                serde_json::from_str::<Discount>(json).map_err(|e| DbError::decode("discount", e))?
            }
            None => Discount::None,
        };

        let discount_split = match (self.split_owner_bps, self.split_technician_bps) {
            (Some(owner), Some(technician)) => Some(
                DiscountSplit::new(
                    decode_bps("split_owner_bps", owner)?,
                    decode_bps("split_technician_bps", technician)?,
                )
                .map_err(|e| DbError::decode("discount_split", e))?,
            ),
            _ => None,
        };

        Ok(Order {
            id: self.id,
            tcr_number: self.tcr_number,
            company_id: self.company_id,
            technician_id: self.technician_id,
            customer: Customer {
                name: self.customer_name,
                phone: self.customer_phone,
                alternate_phone: self.customer_alternate_phone,
                street: self.customer_street,
                city: self.customer_city,
                state: self.customer_state,
                pincode: self.customer_pincode,
            },
            free_installation: self.free_installation,
            products,
            installation_charge: Money::from_cents(self.installation_charge),
            miscellaneous_cost: Money::from_cents(self.miscellaneous_cost),
            fitting_cost: Money::from_cents(self.fitting_cost),
            discount,
            discount_split,
            status: self.status,
            gross_subtotal: Money::from_cents(self.gross_subtotal),
            discount_amount: Money::from_cents(self.discount_amount),
            net_amount: Money::from_cents(self.net_amount),
            technician_cut: Money::from_cents(self.technician_cut),
            company_cut: Money::from_cents(self.company_cut),
            outstanding_amount: Money::from_cents(self.outstanding_amount),
            created_at: self.created_at,
            updated_at: self.updated_at,
            completed_at: self.completed_at,
        })
    }
}

const ORDER_COLUMNS: &str = r#"
    id, tcr_number, company_id, technician_id,
    customer_name, customer_phone, customer_alternate_phone,
    customer_street, customer_city, customer_state, customer_pincode,
    free_installation, installation_charge, miscellaneous_cost, fitting_cost,
    discount, split_owner_bps, split_technician_bps, status,
    gross_subtotal, discount_amount, net_amount,
    technician_cut, company_cut, outstanding_amount,
    created_at, updated_at, completed_at
"#;

const UPSERT_ORDER: &str = r#"
    INSERT INTO orders (
        id, tcr_number, company_id, technician_id,
        customer_name, customer_phone, customer_alternate_phone,
        customer_street, customer_city, customer_state, customer_pincode,
        free_installation, installation_charge, miscellaneous_cost, fitting_cost,
        discount, split_owner_bps, split_technician_bps, status,
        gross_subtotal, discount_amount, net_amount,
        technician_cut, company_cut, outstanding_amount,
        created_at, updated_at, completed_at
    ) VALUES (
        ?1, ?2, ?3, ?4,
        ?5, ?6, ?7,
        ?8, ?9, ?10, ?11,
        ?12, ?13, ?14, ?15,
        ?16, ?17, ?18, ?19,
        ?20, ?21, ?22,
        ?23, ?24, ?25,
        ?26, ?27, ?28
    )
    ON CONFLICT(id) DO UPDATE SET
        tcr_number = excluded.tcr_number,
        company_id = excluded.company_id,
        technician_id = excluded.technician_id,
        customer_name = excluded.customer_name,
        customer_phone = excluded.customer_phone,
        customer_alternate_phone = excluded.customer_alternate_phone,
        customer_street = excluded.customer_street,
        customer_city = excluded.customer_city,
        customer_state = excluded.customer_state,
        customer_pincode = excluded.customer_pincode,
        free_installation = excluded.free_installation,
        installation_charge = excluded.installation_charge,
        miscellaneous_cost = excluded.miscellaneous_cost,
        fitting_cost = excluded.fitting_cost,
        discount = excluded.discount,
        split_owner_bps = excluded.split_owner_bps,
        split_technician_bps = excluded.split_technician_bps,
        status = excluded.status,
        gross_subtotal = excluded.gross_subtotal,
        discount_amount = excluded.discount_amount,
        net_amount = excluded.net_amount,
        technician_cut = excluded.technician_cut,
        company_cut = excluded.company_cut,
        outstanding_amount = excluded.outstanding_amount,
        updated_at = excluded.updated_at,
        completed_at = excluded.completed_at
"#;

/// Same parameter numbering as [`UPSERT_ORDER`] plus ?29, the expected
/// status. `created_at` (?26) is bound but never rewritten.
const UPDATE_ORDER_IF_STATUS: &str = r#"
    UPDATE orders SET
        tcr_number = ?2,
        company_id = ?3,
        technician_id = ?4,
        customer_name = ?5,
        customer_phone = ?6,
        customer_alternate_phone = ?7,
        customer_street = ?8,
        customer_city = ?9,
        customer_state = ?10,
        customer_pincode = ?11,
        free_installation = ?12,
        installation_charge = ?13,
        miscellaneous_cost = ?14,
        fitting_cost = ?15,
        discount = ?16,
        split_owner_bps = ?17,
        split_technician_bps = ?18,
        status = ?19,
        gross_subtotal = ?20,
        discount_amount = ?21,
        net_amount = ?22,
        technician_cut = ?23,
        company_cut = ?24,
        outstanding_amount = ?25,
        updated_at = ?27,
        completed_at = ?28
    WHERE id = ?1 AND status = ?29
"#;

/// Binds ?1..?28 of [`UPSERT_ORDER`] and [`UPDATE_ORDER_IF_STATUS`].
fn bind_order<'q>(
    query: Query<'q, Sqlite, SqliteArguments<'q>>,
    order: &'q Order,
    discount_json: Option<String>,
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    let split = order.discount_split;
    query
        .bind(&order.id)
        .bind(&order.tcr_number)
        .bind(&order.company_id)
        .bind(&order.technician_id)
        .bind(&order.customer.name)
        .bind(&order.customer.phone)
        .bind(&order.customer.alternate_phone)
        .bind(&order.customer.street)
        .bind(&order.customer.city)
        .bind(&order.customer.state)
        .bind(&order.customer.pincode)
        .bind(order.free_installation)
        .bind(order.installation_charge.cents())
        .bind(order.miscellaneous_cost.cents())
        .bind(order.fitting_cost.cents())
        .bind(discount_json)
        .bind(split.map(|s| i64::from(s.owner().bps())))
        .bind(split.map(|s| i64::from(s.technician().bps())))
        .bind(order.status)
        .bind(order.gross_subtotal.cents())
        .bind(order.discount_amount.cents())
        .bind(order.net_amount.cents())
        .bind(order.technician_cut.cents())
        .bind(order.company_cut.cents())
        .bind(order.outstanding_amount.cents())
        .bind(order.created_at)
        .bind(order.updated_at)
        .bind(order.completed_at)
}

fn discount_json(discount: &Discount) -> DbResult<Option<String>> {
    match discount {
        Discount::None => Ok(None),
        other => serde_json::to_string(other)
            .map(Some)
            .map_err(|e| DbError::decode("discount", e)),
    }
}

async fn replace_lines(conn: &mut SqliteConnection, order: &Order) -> DbResult<()> {
    sqlx::query("DELETE FROM order_lines WHERE order_id = ?1")
        .bind(&order.id)
        .execute(&mut *conn)
        .await?;

    for (position, line) in order.products.iter().enumerate() {
        sqlx::query(
            r#"
            INSERT INTO order_lines (order_id, position, product_id, quantity, sale_price, catalog_price)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&order.id)
        .bind(position as i64)
        .bind(&line.product_id)
        .bind(line.quantity)
        .bind(line.sale_price.map(|m| m.cents()))
        .bind(line.catalog_price.map(|m| m.cents()))
        .execute(&mut *conn)
        .await?;
    }

    Ok(())
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for orders and their lines.
#[derive(Debug, Clone)]
pub struct OrderRepository {
    pool: SqlitePool,
}

impl OrderRepository {
    pub fn new(pool: SqlitePool) -> Self {
        OrderRepository { pool }
    }

    /// Inserts or replaces an order and its lines.
    pub async fn save(&self, order: &Order) -> DbResult<()> {
        debug!(id = %order.id, status = %order.status, "Saving order");

        let json = discount_json(&order.discount)?;
        let mut tx = self.pool.begin().await?;

        bind_order(sqlx::query(UPSERT_ORDER), order, json)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_tcr_conflict(e, order))?;
        replace_lines(&mut tx, order).await?;

        tx.commit().await?;
        Ok(())
    }

    /// Updates an existing order only if its stored status is still `expected`.
    ///
    /// ## Returns
    /// * `Err(DbError::Conflict)` - Another writer moved or deleted the order first
    pub async fn save_if_status(&self, order: &Order, expected: OrderStatus) -> DbResult<()> {
        debug!(
            id = %order.id,
            from = %expected,
            to = %order.status,
            "Saving order transition"
        );

        let json = discount_json(&order.discount)?;
        let mut tx = self.pool.begin().await?;

        let result = bind_order(sqlx::query(UPDATE_ORDER_IF_STATUS), order, json)
            .bind(expected)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_tcr_conflict(e, order))?;

        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Err(DbError::Conflict {
                id: order.id.clone(),
                expected: expected.to_string(),
            });
        }

        replace_lines(&mut tx, order).await?;
        tx.commit().await?;
        Ok(())
    }

    /// Gets an order with its lines.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Order>> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => {
                let lines = self.get_lines(&row.id).await?;
                row.into_order(lines).map(Some)
            }
            None => Ok(None),
        }
    }

    /// Lines of an order, in entry order.
    pub async fn get_lines(&self, order_id: &str) -> DbResult<Vec<OrderLine>> {
        let rows = sqlx::query_as::<_, OrderLineRow>(
            r#"
            SELECT product_id, quantity, sale_price, catalog_price
            FROM order_lines
            WHERE order_id = ?1
            ORDER BY position
            "#,
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(OrderLine::from).collect())
    }

    /// All orders of a technician, newest first.
    pub async fn list_for_technician(&self, technician_id: &str) -> DbResult<Vec<Order>> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE technician_id = ?1 ORDER BY created_at DESC"
        ))
        .bind(technician_id)
        .fetch_all(&self.pool)
        .await?;

        self.attach_lines(rows).await
    }

    /// All orders in a status, oldest first (approval queue order).
    pub async fn list_by_status(&self, status: OrderStatus) -> DbResult<Vec<Order>> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE status = ?1 ORDER BY created_at"
        ))
        .bind(status)
        .fetch_all(&self.pool)
        .await?;

        self.attach_lines(rows).await
    }

    /// Deletes an order if it is still a draft. Lines cascade.
    pub async fn delete_draft(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Deleting draft order");

        let result = sqlx::query("DELETE FROM orders WHERE id = ?1 AND status = ?2")
            .bind(id)
            .bind(OrderStatus::Draft)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::Conflict {
                id: id.to_string(),
                expected: OrderStatus::Draft.to_string(),
            });
        }
        Ok(())
    }

    async fn attach_lines(&self, rows: Vec<OrderRow>) -> DbResult<Vec<Order>> {
        let mut orders = Vec::with_capacity(rows.len());
        for row in rows {
            let lines = self.get_lines(&row.id).await?;
            orders.push(row.into_order(lines)?);
        }
        Ok(orders)
    }
}

fn map_tcr_conflict(err: sqlx::Error, order: &Order) -> DbError {
    match DbError::from(err) {
        DbError::UniqueViolation { field, .. } if field.contains("tcr_number") => {
            DbError::duplicate("tcr_number", &order.tcr_number)
        }
        other => other,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use crate::testing;

    async fn setup() -> Database {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        testing::seed_reference_data(&db).await;
        db
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let db = setup().await;
        let mut order = testing::draft_order("ord-1", "TCR-1");
        order.products = vec![
            OrderLine::new("p1", 2).with_catalog_price(Money::from_cents(10_000)),
            OrderLine::new("p2", 1).with_sale_price(Money::from_cents(4_500)),
        ];
        order.discount = Discount::Percentage(Percentage::from_bps(1_000));
        order.discount_split = Some(DiscountSplit::from_percentages(60.0, 40.0).unwrap());

        db.orders().save(&order).await.unwrap();
        let loaded = db.orders().get_by_id("ord-1").await.unwrap().unwrap();

        assert_eq!(loaded.products, order.products);
        assert_eq!(loaded.discount, order.discount);
        assert_eq!(loaded.discount_split, order.discount_split);
        assert_eq!(loaded.customer, order.customer);
        assert_eq!(loaded.status, OrderStatus::Draft);
    }

    #[tokio::test]
    async fn test_save_replaces_lines() {
        let db = setup().await;
        let mut order = testing::draft_order("ord-1", "TCR-1");
        db.orders().save(&order).await.unwrap();

        order.products = vec![OrderLine::new("p2", 5)];
        db.orders().save(&order).await.unwrap();

        let lines = db.orders().get_lines("ord-1").await.unwrap();
        assert_eq!(lines, vec![OrderLine::new("p2", 5)]);
    }

    #[tokio::test]
    async fn test_duplicate_tcr_number() {
        let db = setup().await;
        db.orders().save(&testing::draft_order("ord-1", "TCR-1")).await.unwrap();

        let err = db
            .orders()
            .save(&testing::draft_order("ord-2", "TCR-1"))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { ref field, .. } if field == "tcr_number"));
    }

    #[tokio::test]
    async fn test_conditional_save() {
        let db = setup().await;
        let mut order = testing::draft_order("ord-1", "TCR-1");
        db.orders().save(&order).await.unwrap();

        order.status = OrderStatus::PendingApproval;
        db.orders()
            .save_if_status(&order, OrderStatus::Draft)
            .await
            .unwrap();

        order.status = OrderStatus::Completed;
        let err = db
            .orders()
            .save_if_status(&order, OrderStatus::Draft)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Conflict { .. }));

        let stored = db.orders().get_by_id("ord-1").await.unwrap().unwrap();
        assert_eq!(stored.status, OrderStatus::PendingApproval);
    }

    #[tokio::test]
    async fn test_conditional_save_does_not_resurrect_deleted_order() {
        let db = setup().await;
        let mut order = testing::draft_order("ord-1", "TCR-1");
        db.orders().save(&order).await.unwrap();
        db.orders().delete_draft("ord-1").await.unwrap();

        order.status = OrderStatus::Completed;
        let err = db
            .orders()
            .save_if_status(&order, OrderStatus::Draft)
            .await
            .unwrap_err();

        assert!(matches!(err, DbError::Conflict { ref id, .. } if id == "ord-1"));
        assert!(db.orders().get_by_id("ord-1").await.unwrap().is_none());
        assert!(db.orders().get_lines("ord-1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_conditional_save_rewrites_lines() {
        let db = setup().await;
        let mut order = testing::draft_order("ord-1", "TCR-1");
        db.orders().save(&order).await.unwrap();

        order.products = vec![OrderLine::new("p2", 3).with_catalog_price(Money::from_cents(4_500))];
        order.status = OrderStatus::Completed;
        db.orders()
            .save_if_status(&order, OrderStatus::Draft)
            .await
            .unwrap();

        let stored = db.orders().get_by_id("ord-1").await.unwrap().unwrap();
        assert_eq!(stored.status, OrderStatus::Completed);
        assert_eq!(stored.products, order.products);
        assert_eq!(stored.created_at.timestamp(), order.created_at.timestamp());
    }

    #[tokio::test]
    async fn test_delete_only_drafts() {
        let db = setup().await;
        let mut order = testing::draft_order("ord-1", "TCR-1");
        order.status = OrderStatus::Completed;
        db.orders().save(&order).await.unwrap();
        assert!(db.orders().delete_draft("ord-1").await.is_err());

        db.orders().save(&testing::draft_order("ord-2", "TCR-2")).await.unwrap();
        db.orders().delete_draft("ord-2").await.unwrap();
        assert!(db.orders().get_by_id("ord-2").await.unwrap().is_none());
        assert!(db.orders().get_lines("ord-2").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_queries() {
        let db = setup().await;
        db.orders().save(&testing::draft_order("ord-1", "TCR-1")).await.unwrap();
        let mut pending = testing::draft_order("ord-2", "TCR-2");
        pending.status = OrderStatus::PendingApproval;
        db.orders().save(&pending).await.unwrap();

        assert_eq!(db.orders().list_for_technician(testing::TECHNICIAN_ID).await.unwrap().len(), 2);
        let queue = db.orders().list_by_status(OrderStatus::PendingApproval).await.unwrap();
        assert_eq!(queue.len(), 1);
        assert_eq!(queue[0].id, "ord-2");
    }
}
