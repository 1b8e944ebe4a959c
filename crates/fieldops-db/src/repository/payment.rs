//! # Technician Payment Repository
//!
//! Payments collected from technicians against their outstanding balance.
//! Rows are append-only; a payment is never edited once recorded.
//!
//! A technician's collectable balance only shrinks when a payment is added:
//! settled orders are terminal and only drafts can be deleted. So
//! [`PaymentRepository::insert_if_paid_total`] guards on the total already
//! paid, which makes "read balance, check, insert" safe against a second
//! payment racing in between.

use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use fieldops_core::{Money, PaymentMethod, TechnicianPayment};

#[derive(Debug, FromRow)]
struct PaymentRow {
    id: String,
    technician_id: String,
    amount: i64,
    method: PaymentMethod,
    reference: Option<String>,
    notes: Option<String>,
    collected_at: DateTime<Utc>,
}

impl From<PaymentRow> for TechnicianPayment {
    fn from(row: PaymentRow) -> Self {
        TechnicianPayment {
            id: row.id,
            technician_id: row.technician_id,
            amount: Money::from_cents(row.amount),
            method: row.method,
            reference: row.reference,
            notes: row.notes,
            collected_at: row.collected_at,
        }
    }
}

/// Repository for technician payments.
#[derive(Debug, Clone)]
pub struct PaymentRepository {
    pool: SqlitePool,
}

impl PaymentRepository {
    pub fn new(pool: SqlitePool) -> Self {
        PaymentRepository { pool }
    }

    pub async fn insert(&self, payment: &TechnicianPayment) -> DbResult<()> {
        debug!(
            id = %payment.id,
            technician_id = %payment.technician_id,
            amount = %payment.amount,
            method = payment.method.label(),
            "Inserting payment"
        );

        sqlx::query(
            r#"
            INSERT INTO technician_payments (
                id, technician_id, amount, method, reference, notes, collected_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&payment.id)
        .bind(&payment.technician_id)
        .bind(payment.amount.cents())
        .bind(payment.method)
        .bind(&payment.reference)
        .bind(&payment.notes)
        .bind(payment.collected_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Inserts a payment only if the technician's payments still total
    /// `expected_paid`, the figure the balance check was made against.
    ///
    /// ## Returns
    /// * `Err(DbError::BalanceChanged)` - Another payment was recorded meanwhile
    pub async fn insert_if_paid_total(
        &self,
        payment: &TechnicianPayment,
        expected_paid: Money,
    ) -> DbResult<()> {
        debug!(
            id = %payment.id,
            technician_id = %payment.technician_id,
            amount = %payment.amount,
            expected_paid = %expected_paid,
            "Inserting payment against checked balance"
        );

        // one statement: SQLite holds the write lock across the subquery
        let result = sqlx::query(
            r#"
            INSERT INTO technician_payments (
                id, technician_id, amount, method, reference, notes, collected_at
            )
            SELECT ?1, ?2, ?3, ?4, ?5, ?6, ?7
            WHERE (
                SELECT COALESCE(SUM(amount), 0)
                FROM technician_payments
                WHERE technician_id = ?2
            ) = ?8
            "#,
        )
        .bind(&payment.id)
        .bind(&payment.technician_id)
        .bind(payment.amount.cents())
        .bind(payment.method)
        .bind(&payment.reference)
        .bind(&payment.notes)
        .bind(payment.collected_at)
        .bind(expected_paid.cents())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::BalanceChanged {
                technician_id: payment.technician_id.clone(),
            });
        }
        Ok(())
    }

    /// Payments of a technician, oldest first.
    pub async fn for_technician(&self, technician_id: &str) -> DbResult<Vec<TechnicianPayment>> {
        let rows = sqlx::query_as::<_, PaymentRow>(
            r#"
            SELECT id, technician_id, amount, method, reference, notes, collected_at
            FROM technician_payments
            WHERE technician_id = ?1
            ORDER BY collected_at
            "#,
        )
        .bind(technician_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(TechnicianPayment::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use crate::testing;

    #[tokio::test]
    async fn test_insert_and_list() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        testing::seed_reference_data(&db).await;

        let payment = TechnicianPayment {
            id: "pay-1".to_string(),
            technician_id: testing::TECHNICIAN_ID.to_string(),
            amount: Money::from_cents(2_000),
            method: PaymentMethod::BankTransfer,
            reference: Some("UTR123".to_string()),
            notes: None,
            collected_at: Utc::now(),
        };
        db.payments().insert(&payment).await.unwrap();

        let found = db.payments().for_technician(testing::TECHNICIAN_ID).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].method, PaymentMethod::BankTransfer);
        assert_eq!(found[0].amount, Money::from_cents(2_000));
        assert!(db.payments().for_technician("other").await.unwrap().is_empty());
    }

    fn payment(id: &str, cents: i64) -> TechnicianPayment {
        TechnicianPayment {
            id: id.to_string(),
            technician_id: testing::TECHNICIAN_ID.to_string(),
            amount: Money::from_cents(cents),
            method: PaymentMethod::Cash,
            reference: None,
            notes: None,
            collected_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_guarded_insert_rejects_stale_paid_total() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        testing::seed_reference_data(&db).await;

        // both callers checked their amount against nothing paid yet
        db.payments()
            .insert_if_paid_total(&payment("pay-a", 1_500), Money::zero())
            .await
            .unwrap();
        let err = db
            .payments()
            .insert_if_paid_total(&payment("pay-b", 1_500), Money::zero())
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::BalanceChanged { .. }));

        let found = db.payments().for_technician(testing::TECHNICIAN_ID).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, "pay-a");

        db.payments()
            .insert_if_paid_total(&payment("pay-c", 500), Money::from_cents(1_500))
            .await
            .unwrap();
    }
}
