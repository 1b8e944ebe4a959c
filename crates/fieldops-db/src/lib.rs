//! # fieldops-db: Database Layer and Order Workflow for FieldOps
//!
//! SQLite persistence for the FieldOps domain, plus the workflow that ties a
//! storage read, a `fieldops-core` transition and a storage write together.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        FieldOps Data Flow                               │
//! │                                                                         │
//! │  REST handler (approve discount)                                       │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                   fieldops-db (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐   ┌───────────────┐   ┌──────────────┐     │   │
//! │  │   │ OrderWorkflow │──►│ Repositories  │──►│   Database   │     │   │
//! │  │   │ (workflow.rs) │   │ orders,       │   │  (pool.rs)   │     │   │
//! │  │   │               │   │ catalog,      │   │  SqlitePool  │     │   │
//! │  │   │               │   │ payments      │   │  migrations  │     │   │
//! │  │   └───────┬───────┘   └───────────────┘   └──────────────┘     │   │
//! │  │           │ pure transitions                                    │   │
//! │  │           ▼                                                     │   │
//! │  │     fieldops-core                                               │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`config`] - Environment configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations
//! - [`workflow`] - Order lifecycle and ledger operations, plus stock allocation
//!
//! ## Usage
//!
//! ```rust,ignore
//! use fieldops_db::{AppConfig, Database, OrderWorkflow};
//!
//! let config = AppConfig::load()?;
//! let db = Database::new(config.db_config()).await?;
//! let workflow = OrderWorkflow::new(db);
//!
//! let order = workflow.approve_discount(&order_id, split).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;
pub mod workflow;

#[cfg(test)]
pub(crate) mod testing;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::{AppConfig, ConfigError};
pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};
pub use workflow::{NewPayment, OrderWorkflow, WorkflowError, WorkflowResult};

pub use repository::catalog::{
    CommissionRepository, CompanyRepository, ProductRepository, TechnicianRepository,
};
pub use repository::inventory::{AllocationPage, InventoryRepository};
pub use repository::order::OrderRepository;
pub use repository::payment::PaymentRepository;
