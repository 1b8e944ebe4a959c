//! # Catalog Repositories
//!
//! Companies, products, technicians and commissions: the reference data an
//! order is priced and settled against.
//!
//! ## Row Mapping
//! ```text
//! ┌──────────────────┐   FromRow    ┌──────────────────┐   into()   ┌────────────┐
//! │  SQLite row      │ ───────────► │  *Row struct     │ ─────────► │ core type  │
//! │  INTEGER paise   │              │  i64 / String    │            │ Money      │
//! │  INTEGER bps     │              │                  │            │ Percentage │
//! └──────────────────┘              └──────────────────┘            └────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use fieldops_core::{Commission, Company, Money, Percentage, Product, Technician};

// =============================================================================
// Companies
// =============================================================================

#[derive(Debug, FromRow)]
struct CompanyRow {
    id: String,
    name: String,
    installation_charge: i64,
    is_active: bool,
    created_at: DateTime<Utc>,
}

impl From<CompanyRow> for Company {
    fn from(row: CompanyRow) -> Self {
        Company {
            id: row.id,
            name: row.name,
            installation_charge: Money::from_cents(row.installation_charge),
            is_active: row.is_active,
            created_at: row.created_at,
        }
    }
}

/// Repository for client companies.
#[derive(Debug, Clone)]
pub struct CompanyRepository {
    pool: SqlitePool,
}

impl CompanyRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CompanyRepository { pool }
    }

    pub async fn insert(&self, company: &Company) -> DbResult<()> {
        debug!(id = %company.id, name = %company.name, "Inserting company");

        sqlx::query(
            r#"
            INSERT INTO companies (id, name, installation_charge, is_active, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(&company.id)
        .bind(&company.name)
        .bind(company.installation_charge.cents())
        .bind(company.is_active)
        .bind(company.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Company>> {
        let row = sqlx::query_as::<_, CompanyRow>(
            "SELECT id, name, installation_charge, is_active, created_at FROM companies WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Company::from))
    }

    pub async fn list(&self) -> DbResult<Vec<Company>> {
        let rows = sqlx::query_as::<_, CompanyRow>(
            "SELECT id, name, installation_charge, is_active, created_at FROM companies ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Company::from).collect())
    }
}

// =============================================================================
// Products
// =============================================================================

#[derive(Debug, FromRow)]
struct ProductRow {
    id: String,
    sku: String,
    name: String,
    description: Option<String>,
    price: i64,
    is_active: bool,
    total_count: i64,
    allocated_count: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Product {
            id: row.id,
            sku: row.sku,
            name: row.name,
            description: row.description,
            price: Money::from_cents(row.price),
            is_active: row.is_active,
            total_count: row.total_count,
            allocated_count: row.allocated_count,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

const PRODUCT_COLUMNS: &str = "id, sku, name, description, price, is_active, \
     total_count, allocated_count, created_at, updated_at";

/// Repository for the product catalog.
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    pub async fn insert(&self, product: &Product) -> DbResult<()> {
        debug!(id = %product.id, sku = %product.sku, "Inserting product");

        sqlx::query(
            r#"
            INSERT INTO products (
                id, sku, name, description, price, is_active,
                total_count, allocated_count, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&product.id)
        .bind(&product.sku)
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price.cents())
        .bind(product.is_active)
        .bind(product.total_count)
        .bind(product.allocated_count)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { field, .. } => DbError::duplicate(field, &product.sku),
            other => other,
        })?;

        Ok(())
    }

    /// Changes a product's catalog price.
    ///
    /// Completed orders keep the price frozen on their lines.
    pub async fn update_price(&self, id: &str, price: Money) -> DbResult<()> {
        debug!(id = %id, price = %price, "Updating product price");

        let result = sqlx::query("UPDATE products SET price = ?1, updated_at = ?2 WHERE id = ?3")
            .bind(price.cents())
            .bind(Utc::now())
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }
        Ok(())
    }

    /// Sets the units in stock.
    ///
    /// Fails with `StockChanged` when `total_count` is below what is already
    /// allocated.
    pub async fn set_total_count(&self, id: &str, total_count: i64) -> DbResult<()> {
        debug!(id = %id, total_count, "Updating product stock");

        let result = sqlx::query(
            r#"
            UPDATE products SET total_count = ?1, updated_at = ?2
            WHERE id = ?3 AND allocated_count <= ?1
            "#,
        )
        .bind(total_count)
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return match self.get_by_id(id).await? {
                None => Err(DbError::not_found("Product", id)),
                Some(product) => Err(DbError::StockChanged {
                    product_id: product.id,
                }),
            };
        }
        Ok(())
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Product::from))
    }

    /// The whole catalog, inactive products included.
    ///
    /// Order completion resolves prices against this list; an inactive
    /// product still prices an order that already carries it.
    pub async fn list_catalog(&self) -> DbResult<Vec<Product>> {
        let rows = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products ORDER BY name"
        ))
        .fetch_all(&self.pool)
        .await?;

        debug!(count = rows.len(), "Loaded product catalog");
        Ok(rows.into_iter().map(Product::from).collect())
    }
}

// =============================================================================
// Technicians
// =============================================================================

#[derive(Debug, FromRow)]
struct TechnicianRow {
    id: String,
    name: String,
    phone: String,
    service_rate: i64,
    misc_share_bps: i64,
    is_blocked: bool,
    created_at: DateTime<Utc>,
}

impl TechnicianRow {
    fn into_technician(self, company_ids: Vec<String>) -> DbResult<Technician> {
        let misc_share = u32::try_from(self.misc_share_bps)
            .map_err(|e| DbError::decode("misc_share_bps", e))
            .and_then(|bps| {
                Percentage::try_from(bps).map_err(|e| DbError::decode("misc_share_bps", e))
            })?;

        Ok(Technician {
            id: self.id,
            name: self.name,
            phone: self.phone,
            company_ids,
            service_rate: Money::from_cents(self.service_rate),
            misc_share,
            is_blocked: self.is_blocked,
            created_at: self.created_at,
        })
    }
}

/// Repository for technicians and their company assignments.
#[derive(Debug, Clone)]
pub struct TechnicianRepository {
    pool: SqlitePool,
}

impl TechnicianRepository {
    pub fn new(pool: SqlitePool) -> Self {
        TechnicianRepository { pool }
    }

    /// Inserts a technician and their company links in one transaction.
    pub async fn insert(&self, technician: &Technician) -> DbResult<()> {
        debug!(id = %technician.id, name = %technician.name, "Inserting technician");

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO technicians (id, name, phone, service_rate, misc_share_bps, is_blocked, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&technician.id)
        .bind(&technician.name)
        .bind(&technician.phone)
        .bind(technician.service_rate.cents())
        .bind(i64::from(technician.misc_share.bps()))
        .bind(technician.is_blocked)
        .bind(technician.created_at)
        .execute(&mut *tx)
        .await?;

        for company_id in &technician.company_ids {
            sqlx::query("INSERT INTO technician_companies (technician_id, company_id) VALUES (?1, ?2)")
                .bind(&technician.id)
                .bind(company_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Blocks or unblocks a technician.
    pub async fn set_blocked(&self, id: &str, blocked: bool) -> DbResult<()> {
        debug!(id = %id, blocked, "Setting technician blocked status");

        let result = sqlx::query("UPDATE technicians SET is_blocked = ?1 WHERE id = ?2")
            .bind(blocked)
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Technician", id));
        }
        Ok(())
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Technician>> {
        let row = sqlx::query_as::<_, TechnicianRow>(
            r#"
            SELECT id, name, phone, service_rate, misc_share_bps, is_blocked, created_at
            FROM technicians
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let company_ids: Vec<String> = sqlx::query_scalar(
            "SELECT company_id FROM technician_companies WHERE technician_id = ?1 ORDER BY company_id",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        row.into_technician(company_ids).map(Some)
    }
}

// =============================================================================
// Commissions
// =============================================================================

#[derive(Debug, FromRow)]
struct CommissionRow {
    id: String,
    technician_id: String,
    product_id: String,
    amount: i64,
}

impl From<CommissionRow> for Commission {
    fn from(row: CommissionRow) -> Self {
        Commission {
            id: row.id,
            technician_id: row.technician_id,
            product_id: row.product_id,
            amount: Money::from_cents(row.amount),
        }
    }
}

/// Repository for per-product technician commissions.
#[derive(Debug, Clone)]
pub struct CommissionRepository {
    pool: SqlitePool,
}

impl CommissionRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CommissionRepository { pool }
    }

    pub async fn insert(&self, commission: &Commission) -> DbResult<()> {
        debug!(
            technician_id = %commission.technician_id,
            product_id = %commission.product_id,
            amount = %commission.amount,
            "Inserting commission"
        );

        sqlx::query(
            r#"
            INSERT INTO commissions (id, technician_id, product_id, amount)
            VALUES (?1, ?2, ?3, ?4)
            "#,
        )
        .bind(&commission.id)
        .bind(&commission.technician_id)
        .bind(&commission.product_id)
        .bind(commission.amount.cents())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn for_technician(&self, technician_id: &str) -> DbResult<Vec<Commission>> {
        let rows = sqlx::query_as::<_, CommissionRow>(
            r#"
            SELECT id, technician_id, product_id, amount
            FROM commissions
            WHERE technician_id = ?1
            ORDER BY product_id
            "#,
        )
        .bind(technician_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Commission::from).collect())
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

    #[tokio::test]
    async fn test_company_round_trip() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let company = testing::company("co-1", 5_000);
        db.companies().insert(&company).await.unwrap();

        let loaded = db.companies().get_by_id("co-1").await.unwrap().unwrap();
        assert_eq!(loaded.installation_charge, Money::from_cents(5_000));
        assert!(db.companies().get_by_id("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_sku_rejected() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.products().insert(&testing::product("p1", "RO-100", 10_000)).await.unwrap();

        let err = db
            .products()
            .insert(&testing::product("p2", "RO-100", 12_000))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { ref value, .. } if value == "RO-100"));
    }

    #[tokio::test]
    async fn test_catalog_and_price_update() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.products().insert(&testing::product("p1", "RO-100", 10_000)).await.unwrap();
        db.products().update_price("p1", Money::from_cents(11_000)).await.unwrap();

        let catalog = db.products().list_catalog().await.unwrap();
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog[0].price, Money::from_cents(11_000));

        assert!(matches!(
            db.products().update_price("missing", Money::zero()).await,
            Err(DbError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_stock_counts_round_trip() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut product = testing::product("p1", "RO-100", 10_000);
        product.total_count = 12;
        product.allocated_count = 4;
        db.products().insert(&product).await.unwrap();

        let loaded = db.products().get_by_id("p1").await.unwrap().unwrap();
        assert_eq!(loaded.total_count, 12);
        assert_eq!(loaded.allocated_count, 4);
        assert_eq!(loaded.available_count(), 8);

        db.products().set_total_count("p1", 4).await.unwrap();
        assert!(matches!(
            db.products().set_total_count("p1", 3).await,
            Err(DbError::StockChanged { .. })
        ));
        assert!(matches!(
            db.products().set_total_count("missing", 3).await,
            Err(DbError::NotFound { .. })
        ));
        assert_eq!(db.products().get_by_id("p1").await.unwrap().unwrap().total_count, 4);
    }

    #[tokio::test]
    async fn test_technician_with_companies() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.companies().insert(&testing::company("co-1", 0)).await.unwrap();
        db.companies().insert(&testing::company("co-2", 0)).await.unwrap();

        let mut tech = testing::technician("tech-1");
        tech.company_ids = vec!["co-1".to_string(), "co-2".to_string()];
        tech.misc_share = Percentage::from_bps(2_500);
        db.technicians().insert(&tech).await.unwrap();

        let loaded = db.technicians().get_by_id("tech-1").await.unwrap().unwrap();
        assert_eq!(loaded.company_ids, vec!["co-1", "co-2"]);
        assert_eq!(loaded.misc_share.bps(), 2_500);

        db.technicians().set_blocked("tech-1", true).await.unwrap();
        assert!(db.technicians().get_by_id("tech-1").await.unwrap().unwrap().is_blocked);
    }

    #[tokio::test]
    async fn test_commissions() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.technicians().insert(&testing::technician("tech-1")).await.unwrap();
        db.products().insert(&testing::product("p1", "RO-100", 10_000)).await.unwrap();

        let commission = testing::commission("tech-1", "p1", 1_500);
        db.commissions().insert(&commission).await.unwrap();

        let found = db.commissions().for_technician("tech-1").await.unwrap();
        assert_eq!(found, vec![commission]);

        let dupe = testing::commission("tech-1", "p1", 2_000);
        assert!(matches!(
            db.commissions().insert(&dupe).await,
            Err(DbError::UniqueViolation { .. })
        ));
    }
}
