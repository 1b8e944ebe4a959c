//! # Inventory Allocation Repository
//!
//! The allocation log and the product counters it moves.
//!
//! ```text
//! allocate(entry)
//!   BEGIN
//!   UPDATE products SET allocated_count += q
//!     WHERE allocated_count + q <= total_count   ── 0 rows ──► StockChanged
//!   INSERT INTO inventory_allocations
//!   COMMIT
//! ```

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use fieldops_core::InventoryAllocation;

#[derive(Debug, FromRow)]
struct AllocationRow {
    id: String,
    product_id: String,
    technician_id: String,
    quantity: i64,
    allocated_at: DateTime<Utc>,
}

impl From<AllocationRow> for InventoryAllocation {
    fn from(row: AllocationRow) -> Self {
        InventoryAllocation {
            id: row.id,
            product_id: row.product_id,
            technician_id: row.technician_id,
            quantity: row.quantity,
            allocated_at: row.allocated_at,
        }
    }
}

/// One page of the allocation log, newest first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AllocationPage {
    pub entries: Vec<InventoryAllocation>,
    /// 1-based.
    pub page: u32,
    pub limit: u32,
    /// Entries across all pages.
    pub total: i64,
}

/// Repository for stock allocations.
#[derive(Debug, Clone)]
pub struct InventoryRepository {
    pool: SqlitePool,
}

impl InventoryRepository {
    pub fn new(pool: SqlitePool) -> Self {
        InventoryRepository { pool }
    }

    /// Records an allocation and moves the product's `allocated_count`.
    ///
    /// ## Returns
    /// * `Err(DbError::StockChanged)` - The free stock no longer covers the
    ///   quantity, or the product is gone
    pub async fn allocate(&self, allocation: &InventoryAllocation) -> DbResult<()> {
        debug!(
            id = %allocation.id,
            product_id = %allocation.product_id,
            technician_id = %allocation.technician_id,
            quantity = allocation.quantity,
            "Allocating stock"
        );

        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE products
            SET allocated_count = allocated_count + ?1, updated_at = ?2
            WHERE id = ?3 AND allocated_count + ?1 <= total_count
            "#,
        )
        .bind(allocation.quantity)
        .bind(allocation.allocated_at)
        .bind(&allocation.product_id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Err(DbError::StockChanged {
                product_id: allocation.product_id.clone(),
            });
        }

        sqlx::query(
            r#"
            INSERT INTO inventory_allocations (id, product_id, technician_id, quantity, allocated_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(&allocation.id)
        .bind(&allocation.product_id)
        .bind(&allocation.technician_id)
        .bind(allocation.quantity)
        .bind(allocation.allocated_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    /// One page of the log. `page` starts at 1; 0 reads as 1.
    pub async fn list_page(&self, page: u32, limit: u32) -> DbResult<AllocationPage> {
        let page = page.max(1);
        let offset = i64::from(page - 1) * i64::from(limit);

        let rows = sqlx::query_as::<_, AllocationRow>(
            r#"
            SELECT id, product_id, technician_id, quantity, allocated_at
            FROM inventory_allocations
            ORDER BY allocated_at DESC, id
            LIMIT ?1 OFFSET ?2
            "#,
        )
        .bind(i64::from(limit))
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM inventory_allocations")
            .fetch_one(&self.pool)
            .await?;

        debug!(page, limit, count = rows.len(), total, "Loaded allocation log page");
        Ok(AllocationPage {
            entries: rows.into_iter().map(InventoryAllocation::from).collect(),
            page,
            limit,
            total,
        })
    }

    /// Everything a technician has been handed, oldest first.
    pub async fn for_technician(&self, technician_id: &str) -> DbResult<Vec<InventoryAllocation>> {
        let rows = sqlx::query_as::<_, AllocationRow>(
            r#"
            SELECT id, product_id, technician_id, quantity, allocated_at
            FROM inventory_allocations
            WHERE technician_id = ?1
            ORDER BY allocated_at, id
            "#,
        )
        .bind(technician_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(InventoryAllocation::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use crate::testing;
    use chrono::Duration;

    fn entry(id: &str, quantity: i64, minutes_ago: i64) -> InventoryAllocation {
        InventoryAllocation {
            id: id.to_string(),
            product_id: "p1".to_string(),
            technician_id: testing::TECHNICIAN_ID.to_string(),
            quantity,
            allocated_at: Utc::now() - Duration::minutes(minutes_ago),
        }
    }

    async fn stocked_db(total: i64) -> Database {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        testing::seed_reference_data(&db).await;
        db.products().set_total_count("p1", total).await.unwrap();
        db
    }

    #[tokio::test]
    async fn test_allocate_moves_counter() {
        let db = stocked_db(10).await;

        db.inventory().allocate(&entry("a-1", 4, 0)).await.unwrap();
        db.inventory().allocate(&entry("a-2", 6, 0)).await.unwrap();

        let product = db.products().get_by_id("p1").await.unwrap().unwrap();
        assert_eq!(product.allocated_count, 10);
        assert_eq!(product.available_count(), 0);
    }

    #[tokio::test]
    async fn test_allocate_past_stock_leaves_no_trace() {
        let db = stocked_db(5).await;
        db.inventory().allocate(&entry("a-1", 3, 0)).await.unwrap();

        let err = db.inventory().allocate(&entry("a-2", 3, 0)).await.unwrap_err();
        assert!(matches!(err, DbError::StockChanged { ref product_id } if product_id == "p1"));

        let product = db.products().get_by_id("p1").await.unwrap().unwrap();
        assert_eq!(product.allocated_count, 3);
        assert_eq!(db.inventory().list_page(1, 10).await.unwrap().total, 1);
    }

    #[tokio::test]
    async fn test_allocate_unknown_product() {
        let db = stocked_db(5).await;
        let mut missing = entry("a-1", 1, 0);
        missing.product_id = "nope".to_string();

        assert!(matches!(
            db.inventory().allocate(&missing).await,
            Err(DbError::StockChanged { .. })
        ));
    }

    #[tokio::test]
    async fn test_log_pages_newest_first() {
        let db = stocked_db(100).await;
        for (i, minutes_ago) in [30, 10, 20].into_iter().enumerate() {
            db.inventory()
                .allocate(&entry(&format!("a-{i}"), 1, minutes_ago))
                .await
                .unwrap();
        }

        let first = db.inventory().list_page(1, 2).await.unwrap();
        assert_eq!(first.total, 3);
        let ids: Vec<_> = first.entries.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["a-1", "a-2"]);

        let second = db.inventory().list_page(2, 2).await.unwrap();
        assert_eq!(second.entries.len(), 1);
        assert_eq!(second.entries[0].id, "a-0");

        assert_eq!(db.inventory().list_page(0, 2).await.unwrap().page, 1);
        assert!(db.inventory().list_page(3, 2).await.unwrap().entries.is_empty());

        let mine = db.inventory().for_technician(testing::TECHNICIAN_ID).await.unwrap();
        assert_eq!(mine.first().map(|e| e.id.as_str()), Some("a-0"));
    }
}
