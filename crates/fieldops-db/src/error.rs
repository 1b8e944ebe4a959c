//! # Storage Errors
//!
//! What can go wrong between a repository call and SQLite.
//!
//! ```text
//! sqlx::Error ──► DbError ──► WorkflowError::Db ──► REST status
//!                   │
//!                   ├── NotFound / UniqueViolation / ForeignKeyViolation  caller's fault
//!                   ├── Conflict / BalanceChanged / StockChanged         lost a race, reload
//!                   ├── Decode                                           bad row on disk
//!                   └── Connection / Migration / Query / Pool / Internal  infrastructure
//! ```
//!
//! SQLite reports constraint failures only as message text, so
//! [`From<sqlx::Error>`] classifies them by prefix.

use thiserror::Error;

const UNIQUE_PREFIX: &str = "UNIQUE constraint failed: ";
const FOREIGN_KEY_MESSAGE: &str = "FOREIGN KEY constraint failed";

#[derive(Debug, Error)]
pub enum DbError {
    /// No row with this id.
    #[error("No {entity} with id {id}")]
    NotFound { entity: String, id: String },

    /// A UNIQUE index rejected the row: TCR number, product SKU, or a
    /// second commission for the same technician and product.
    ///
    /// `field` is `table.column` as SQLite names it; repositories that know
    /// the offending value replace the placeholder.
    #[error("{field} '{value}' is already taken")]
    UniqueViolation { field: String, value: String },

    /// The row points at a company, technician or product that isn't there.
    #[error("Reference check failed: {message}")]
    ForeignKeyViolation { message: String },

    /// The order left `expected` between the read and the conditional write.
    #[error("Order {id} is no longer {expected}; reload and retry")]
    Conflict { id: String, expected: String },

    /// Another payment for this technician landed after the balance was read.
    #[error("Balance of technician {technician_id} changed; reload and retry")]
    BalanceChanged { technician_id: String },

    /// The product's free stock no longer covers the write.
    #[error("Stock of product {product_id} changed; reload and retry")]
    StockChanged { product_id: String },

    #[error("Cannot open database: {0}")]
    ConnectionFailed(String),

    #[error("Schema migration failed: {0}")]
    MigrationFailed(String),

    #[error("SQL error: {0}")]
    QueryFailed(String),

    /// A stored value doesn't fit its domain type (bad discount JSON,
    /// split outside 0..=10000 bps).
    #[error("Column {column} holds an unreadable value: {message}")]
    Decode { column: String, message: String },

    /// Every pooled connection stayed busy past the acquire timeout.
    #[error("No database connection available")]
    PoolExhausted,

    #[error("Database error: {0}")]
    Internal(String),
}

impl DbError {
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    pub fn duplicate(field: impl Into<String>, value: impl Into<String>) -> Self {
        DbError::UniqueViolation {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn decode(column: impl Into<String>, message: impl ToString) -> Self {
        DbError::Decode {
            column: column.into(),
            message: message.to_string(),
        }
    }

    /// Sorts a SQLite error message into a constraint variant.
    fn from_sqlite_message(message: &str) -> Self {
        if let Some(field) = message.strip_prefix(UNIQUE_PREFIX) {
            return DbError::duplicate(field, "?");
        }
        if message.contains(FOREIGN_KEY_MESSAGE) {
            return DbError::ForeignKeyViolation {
                message: message.to_string(),
            };
        }
        DbError::QueryFailed(message.to_string())
    }
}

impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Database(db_err) => DbError::from_sqlite_message(db_err.message()),
            sqlx::Error::RowNotFound => DbError::not_found("row", "?"),
            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,
            sqlx::Error::PoolClosed => DbError::ConnectionFailed("pool closed".to_string()),
            sqlx::Error::ColumnDecode { index, source } => DbError::decode(index, source),
            other => DbError::Internal(other.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

pub type DbResult<T> = Result<T, DbError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unique_message_keeps_column() {
        let err = DbError::from_sqlite_message("UNIQUE constraint failed: orders.tcr_number");
        assert!(matches!(err, DbError::UniqueViolation { ref field, .. } if field == "orders.tcr_number"));
    }

    #[test]
    fn test_foreign_key_message() {
        let err = DbError::from_sqlite_message("FOREIGN KEY constraint failed");
        assert!(matches!(err, DbError::ForeignKeyViolation { .. }));
    }

    #[test]
    fn test_other_messages_are_query_failures() {
        let err = DbError::from_sqlite_message("CHECK constraint failed: status");
        assert!(matches!(err, DbError::QueryFailed(_)));
    }

    #[test]
    fn test_conflict_message() {
        let err = DbError::Conflict {
            id: "o-1".to_string(),
            expected: "pending-approval".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Order o-1 is no longer pending-approval; reload and retry"
        );
    }
}
