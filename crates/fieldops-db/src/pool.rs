//! # SQLite Pool
//!
//! Opens the FieldOps database and hands out repositories.
//!
//! ```text
//!   AppConfig ──► DbConfig ──► Database::new ──► SqlitePool ──► migrations
//!                                   │
//!          ┌────────────┬───────────┼────────────┬─────────────┬──────────┐
//!          ▼            ▼           ▼            ▼             ▼          ▼
//!     companies()  products()  technicians() commissions()  orders()  payments()
//! ```
//!
//! Every connection gets the same pragmas:
//! - `journal_mode = WAL` for file databases, so order lists stay readable during a settlement write
//! - `synchronous = NORMAL`
//! - `foreign_keys = ON`, so order lines go away with their order
//! - a busy timeout, so two approvers racing on one order wait for the lock
//!   and then hit the status check instead of `SQLITE_BUSY`

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::migrations;
use crate::repository::catalog::{
    CommissionRepository, CompanyRepository, ProductRepository, TechnicianRepository,
};
use crate::repository::inventory::InventoryRepository;
use crate::repository::order::OrderRepository;
use crate::repository::payment::PaymentRepository;

const IN_MEMORY: &str = ":memory:";

/// Where the database lives and how the pool behaves.
///
/// ```rust
/// use fieldops_db::DbConfig;
///
/// let config = DbConfig::new("/var/lib/fieldops/fieldops.db").max_connections(8);
/// assert_eq!(config.max_connections, 8);
/// assert!(config.run_migrations);
/// ```
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// SQLite file, created on first open. `:memory:` for a throwaway database.
    pub database_path: PathBuf,
    pub max_connections: u32,
    pub min_connections: u32,
    /// How long a caller waits for a free pooled connection.
    pub acquire_timeout: Duration,
    /// How long a connection waits on another writer's lock.
    pub busy_timeout: Duration,
    pub idle_timeout: Duration,
    /// Apply embedded migrations when the pool opens.
    pub run_migrations: bool,
}

impl DbConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DbConfig {
            database_path: path.into(),
            max_connections: 5,
            min_connections: 1,
            acquire_timeout: Duration::from_secs(30),
            busy_timeout: Duration::from_secs(5),
            idle_timeout: Duration::from_secs(600),
            run_migrations: true,
        }
    }

    /// A private in-memory database, migrated and empty.
    ///
    /// Pinned to one connection that never idles out: each SQLite
    /// `:memory:` connection is a separate database.
    pub fn in_memory() -> Self {
        DbConfig {
            max_connections: 1,
            acquire_timeout: Duration::from_secs(5),
            ..DbConfig::new(IN_MEMORY)
        }
    }

    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    pub fn min_connections(mut self, min: u32) -> Self {
        self.min_connections = min;
        self
    }

    pub fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    pub fn run_migrations(mut self, run: bool) -> Self {
        self.run_migrations = run;
        self
    }

    fn is_in_memory(&self) -> bool {
        self.database_path.as_os_str() == IN_MEMORY
    }

    fn connect_options(&self) -> DbResult<SqliteConnectOptions> {
        let options = if self.is_in_memory() {
            SqliteConnectOptions::from_str("sqlite::memory:")
                .map_err(|e| DbError::ConnectionFailed(e.to_string()))?
        } else {
            SqliteConnectOptions::new()
                .filename(&self.database_path)
                .create_if_missing(true)
                .journal_mode(SqliteJournalMode::Wal)
        };

        Ok(options
            .synchronous(SqliteSynchronous::Normal)
            .foreign_keys(true)
            .busy_timeout(self.busy_timeout))
    }

    fn pool_options(&self) -> SqlitePoolOptions {
        let min_connections = self.min_connections.min(self.max_connections);
        let options = SqlitePoolOptions::new()
            .max_connections(self.max_connections)
            .min_connections(min_connections)
            .acquire_timeout(self.acquire_timeout);

        if self.is_in_memory() {
            // dropping the only connection would drop the database
            options.idle_timeout(None).max_lifetime(None)
        } else {
            options.idle_timeout(Some(self.idle_timeout))
        }
    }
}

/// Handle to the FieldOps database.
///
/// Clones share one pool, so a REST layer can give each handler its own.
///
/// ```rust,ignore
/// let db = Database::new(DbConfig::new("./fieldops.db")).await?;
/// let pending = db.orders().list_by_status(OrderStatus::PendingApproval).await?;
/// ```
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Opens the pool and, unless disabled, brings the schema up to date.
    pub async fn new(config: DbConfig) -> DbResult<Self> {
        info!(
            path = %config.database_path.display(),
            max_connections = config.max_connections,
            "Opening database"
        );

        let pool = config
            .pool_options()
            .connect_with(config.connect_options()?)
            .await
            .map_err(|e| {
                DbError::ConnectionFailed(format!("{}: {e}", config.database_path.display()))
            })?;
        debug!("Pool connected");

        let db = Database { pool };
        if config.run_migrations {
            db.run_migrations().await?;
        }
        Ok(db)
    }

    /// Applies pending migrations. Safe to call on an up-to-date schema.
    pub async fn run_migrations(&self) -> DbResult<()> {
        migrations::run_migrations(&self.pool).await?;
        info!("Schema up to date");
        Ok(())
    }

    /// Raw pool access for ad-hoc queries.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn companies(&self) -> CompanyRepository {
        CompanyRepository::new(self.pool.clone())
    }

    pub fn products(&self) -> ProductRepository {
        ProductRepository::new(self.pool.clone())
    }

    pub fn technicians(&self) -> TechnicianRepository {
        TechnicianRepository::new(self.pool.clone())
    }

    pub fn commissions(&self) -> CommissionRepository {
        CommissionRepository::new(self.pool.clone())
    }

    pub fn orders(&self) -> OrderRepository {
        OrderRepository::new(self.pool.clone())
    }

    pub fn payments(&self) -> PaymentRepository {
        PaymentRepository::new(self.pool.clone())
    }

    pub fn inventory(&self) -> InventoryRepository {
        InventoryRepository::new(self.pool.clone())
    }

    /// Waits for checked-out connections to return, then closes the pool.
    pub async fn close(&self) {
        self.pool.close().await;
        info!("Database closed");
    }

    /// `true` when a round trip to SQLite succeeds.
    pub async fn health_check(&self) -> bool {
        sqlx::query_scalar::<_, i64>("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map(|one| one == 1)
            .unwrap_or(false)
    }
}
