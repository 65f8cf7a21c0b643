// SQLite PaymentRepository Implementation

use crate::error::{corrupt, map_sqlx_error};
use crate::scope::push_scope;
use async_trait::async_trait;
use kissan_core::domain::{ApplicationId, Payment, PaymentMode};
use kissan_core::error::{AppError, Result};
use kissan_core::port::{PaymentRepository, RecordScope};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

pub struct SqlitePaymentRepository {
    pool: SqlitePool,
}

impl SqlitePaymentRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PaymentRepository for SqlitePaymentRepository {
    async fn insert_within_demand(&self, payment: &Payment, demand_paise: i64) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;

        // Guarded insert: the balance check and the write are one statement
        let result = sqlx::query(
            r#"
            INSERT INTO payments (
                id, receipt_no, application_id, amount_paise, mode, reference, recorded_by, paid_at
            )
            SELECT ?, ?, ?, ?, ?, ?, ?, ?
            WHERE (
                SELECT COALESCE(SUM(amount_paise), 0) FROM payments WHERE application_id = ?
            ) + ? <= ?
            "#,
        )
        .bind(&payment.id)
        .bind(&payment.receipt_no)
        .bind(&payment.application_id)
        .bind(payment.amount_paise)
        .bind(payment.mode.to_string())
        .bind(&payment.reference)
        .bind(&payment.recorded_by)
        .bind(payment.paid_at)
        .bind(&payment.application_id)
        .bind(payment.amount_paise)
        .bind(demand_paise)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            let paid: i64 = sqlx::query_scalar(
                "SELECT COALESCE(SUM(amount_paise), 0) FROM payments WHERE application_id = ?",
            )
            .bind(&payment.application_id)
            .fetch_one(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;

            return Err(AppError::Conflict(format!(
                "Payment of {} paise exceeds the outstanding balance of {} paise",
                payment.amount_paise,
                (demand_paise - paid).max(0)
            )));
        }

        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn list_by_application(&self, application_id: &ApplicationId) -> Result<Vec<Payment>> {
        let rows: Vec<PaymentRow> = sqlx::query_as(
            "SELECT * FROM payments WHERE application_id = ? ORDER BY paid_at ASC, receipt_no ASC",
        )
        .bind(application_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        rows.into_iter().map(PaymentRow::into_payment).collect()
    }

    async fn total_paid(&self, application_id: &ApplicationId) -> Result<i64> {
        sqlx::query_scalar(
            "SELECT COALESCE(SUM(amount_paise), 0) FROM payments WHERE application_id = ?",
        )
        .bind(application_id)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_error)
    }

    async fn list(&self, scope: &RecordScope) -> Result<Vec<Payment>> {
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(
            "SELECT p.* FROM payments p JOIN applications a ON a.id = p.application_id WHERE 1 = 1",
        );
        push_scope(&mut qb, "a", scope);
        qb.push(" ORDER BY p.paid_at ASC, p.receipt_no ASC");

        let rows: Vec<PaymentRow> = qb
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        rows.into_iter().map(PaymentRow::into_payment).collect()
    }

    async fn total_collected(&self, scope: &RecordScope) -> Result<i64> {
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(
            "SELECT COALESCE(SUM(p.amount_paise), 0) FROM payments p \
             JOIN applications a ON a.id = p.application_id WHERE 1 = 1",
        );
        push_scope(&mut qb, "a", scope);

        qb.build_query_scalar()
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_error)
    }
}

/// SQLite row representation
#[derive(Debug, sqlx::FromRow)]
struct PaymentRow {
    id: String,
    receipt_no: String,
    application_id: String,
    amount_paise: i64,
    mode: String,
    reference: Option<String>,
    recorded_by: String,
    paid_at: i64,
}

impl PaymentRow {
    fn into_payment(self) -> Result<Payment> {
        let mode = self
            .mode
            .parse::<PaymentMode>()
            .map_err(|_| corrupt("payments.mode", &self.mode))?;

        Ok(Payment {
            id: self.id,
            receipt_no: self.receipt_no,
            application_id: self.application_id,
            amount_paise: self.amount_paise,
            mode,
            reference: self.reference,
            recorded_by: self.recorded_by,
            paid_at: self.paid_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{seed_application, seed_farmer, seed_village, setup_pool};

    fn cash(id: &str, amount: i64, paid_at: i64) -> Payment {
        Payment::new(
            id,
            format!("RCPT/2025/{}", id),
            paid_at,
            "a1",
            amount,
            PaymentMode::Cash,
            None,
            "f1",
        )
        .unwrap()
    }

    async fn setup() -> SqlitePaymentRepository {
        let pool = setup_pool().await;
        seed_village(&pool, "v1").await;
        seed_farmer(&pool, "f1", "v1").await;
        seed_application(&pool, "a1", "f1", "v1").await;
        SqlitePaymentRepository::new(pool)
    }

    #[tokio::test]
    async fn test_insert_within_demand() {
        let repo = setup().await;

        repo.insert_within_demand(&cash("p1", 600, 1000), 1000)
            .await
            .unwrap();
        repo.insert_within_demand(&cash("p2", 400, 2000), 1000)
            .await
            .unwrap();

        let err = repo
            .insert_within_demand(&cash("p3", 1, 3000), 1000)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        assert_eq!(repo.total_paid(&"a1".to_string()).await.unwrap(), 1000);
        let ids: Vec<_> = repo
            .list_by_application(&"a1".to_string())
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.id)
            .collect();
        assert_eq!(ids, vec!["p1", "p2"]);
    }

    #[tokio::test]
    async fn test_scoped_listing() {
        let repo = setup().await;
        repo.insert_within_demand(&cash("p1", 500, 1000), 1000)
            .await
            .unwrap();

        assert_eq!(repo.list(&RecordScope::All).await.unwrap().len(), 1);
        assert_eq!(
            repo.total_collected(&RecordScope::Villages(vec!["v1".into()]))
                .await
                .unwrap(),
            500
        );
        assert_eq!(
            repo.total_collected(&RecordScope::Applicant("someone-else".into()))
                .await
                .unwrap(),
            0
        );
        assert!(repo
            .list(&RecordScope::Villages(vec![]))
            .await
            .unwrap()
            .is_empty());
    }
}
