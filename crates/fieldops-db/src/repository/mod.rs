//! # Repository Module
//!
//! Database repository implementations for FieldOps.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  OrderWorkflow                                                         │
//! │       │                                                                 │
//! │       │  db.orders().get_by_id("…")                                    │
//! │       ▼                                                                 │
//! │  OrderRepository                                                       │
//! │  ├── get_by_id(&self, id)                                              │
//! │  ├── save(&self, order)                                                │
//! │  └── save_if_status(&self, order, expected)                            │
//! │       │                                                                 │
//! │       │  SQL Query                                                      │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`catalog::CompanyRepository`] - Client companies
//! - [`catalog::ProductRepository`] - Product catalog
//! - [`catalog::TechnicianRepository`] - Technicians and company links
//! - [`catalog::CommissionRepository`] - Per-product commissions
//! - [`order::OrderRepository`] - Orders and order lines
//! - [`payment::PaymentRepository`] - Technician payments
//! - [`inventory::InventoryRepository`] - Stock allocation log

pub mod catalog;
pub mod inventory;
pub mod order;
pub mod payment;
