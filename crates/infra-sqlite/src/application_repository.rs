// SQLite ApplicationRepository Implementation

use crate::error::{corrupt, map_sqlx_error};
use crate::scope::push_scope;
use async_trait::async_trait;
use kissan_core::domain::{
    Application, ApplicationId, ApplicationKind, ApplicationStatus, ReviewStep,
};
use kissan_core::error::{AppError, Result};
use kissan_core::port::{ApplicationQuery, ApplicationRepository, ApplicationStats, RecordScope};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

pub struct SqliteApplicationRepository {
    pool: SqlitePool,
}

impl SqliteApplicationRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn push_filters(qb: &mut QueryBuilder<'_, Sqlite>, query: &ApplicationQuery) {
    push_scope(qb, "a", &query.scope);
    if let Some(kind) = query.kind {
        qb.push(" AND a.kind = ").push_bind(kind.to_string());
    }
    if let Some(status) = query.status {
        qb.push(" AND a.status = ").push_bind(status.to_string());
    }
    if let Some(village_id) = &query.village_id {
        qb.push(" AND a.village_id = ").push_bind(village_id.clone());
    }
    if let Some(role) = query.pending_role {
        qb.push(" AND a.pending_role = ").push_bind(role.to_string());
    }
}

#[async_trait]
impl ApplicationRepository for SqliteApplicationRepository {
    async fn insert(&self, app: &Application) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO applications (
                id, reference_no, kind, applicant_id, village_id, survey_number,
                area_hectares, details, reviews, withdrawn,
                rate_per_hectare_paise, demand_paise, status, pending_role,
                version, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&app.id)
        .bind(&app.reference_no)
        .bind(app.kind.to_string())
        .bind(&app.applicant_id)
        .bind(&app.village_id)
        .bind(&app.survey_number)
        .bind(app.area_hectares)
        .bind(app.details.to_string())
        .bind(serde_json::to_string(&app.reviews)?)
        .bind(app.withdrawn)
        .bind(app.rate_per_hectare_paise)
        .bind(app.demand_paise)
        .bind(app.status().to_string())
        .bind(app.pending_role().map(|r| r.to_string()))
        .bind(app.version)
        .bind(app.created_at)
        .bind(app.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn find_by_id(&self, id: &ApplicationId) -> Result<Option<Application>> {
        let row = sqlx::query_as::<_, ApplicationRow>("SELECT * FROM applications WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        row.map(ApplicationRow::into_application).transpose()
    }

    async fn update(&self, app: &Application, expected_version: i64) -> Result<()> {
        // Compare-and-swap on version: a concurrent reviewer loses the race
        let result = sqlx::query(
            r#"
            UPDATE applications
            SET reviews = ?, withdrawn = ?, rate_per_hectare_paise = ?, demand_paise = ?,
                status = ?, pending_role = ?, version = ?, updated_at = ?
            WHERE id = ? AND version = ?
            "#,
        )
        .bind(serde_json::to_string(&app.reviews)?)
        .bind(app.withdrawn)
        .bind(app.rate_per_hectare_paise)
        .bind(app.demand_paise)
        .bind(app.status().to_string())
        .bind(app.pending_role().map(|r| r.to_string()))
        .bind(app.version)
        .bind(app.updated_at)
        .bind(&app.id)
        .bind(expected_version)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            let current: Option<i64> =
                sqlx::query_scalar("SELECT version FROM applications WHERE id = ?")
                    .bind(&app.id)
                    .fetch_optional(&self.pool)
                    .await
                    .map_err(map_sqlx_error)?;

            return match current {
                None => Err(AppError::not_found("Application", &app.id)),
                Some(version) => Err(AppError::Conflict(format!(
                    "Application {} was modified concurrently (version {}, expected {})",
                    app.reference_no, version, expected_version
                ))),
            };
        }
        Ok(())
    }

    async fn list(&self, query: &ApplicationQuery) -> Result<Vec<Application>> {
        let mut qb: QueryBuilder<Sqlite> =
            QueryBuilder::new("SELECT a.* FROM applications a WHERE 1 = 1");
        push_filters(&mut qb, query);
        qb.push(" ORDER BY a.created_at DESC, a.id DESC LIMIT ")
            .push_bind(query.limit)
            .push(" OFFSET ")
            .push_bind(query.offset);

        let rows: Vec<ApplicationRow> = qb
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        rows.into_iter()
            .map(ApplicationRow::into_application)
            .collect()
    }

    async fn count(&self, query: &ApplicationQuery) -> Result<i64> {
        let mut qb: QueryBuilder<Sqlite> =
            QueryBuilder::new("SELECT COUNT(*) FROM applications a WHERE 1 = 1");
        push_filters(&mut qb, query);

        qb.build_query_scalar()
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_error)
    }

    async fn stats(&self, scope: &RecordScope) -> Result<ApplicationStats> {
        let mut stats = ApplicationStats::default();

        let mut qb: QueryBuilder<Sqlite> =
            QueryBuilder::new("SELECT a.status, COUNT(*) FROM applications a WHERE 1 = 1");
        push_scope(&mut qb, "a", scope);
        qb.push(" GROUP BY a.status");
        let rows: Vec<(String, i64)> = qb
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        for (status, n) in rows {
            let status = status
                .parse::<ApplicationStatus>()
                .map_err(|_| corrupt("applications.status", &status))?;
            stats.by_status.insert(status, n);
        }

        let mut qb: QueryBuilder<Sqlite> =
            QueryBuilder::new("SELECT a.kind, COUNT(*) FROM applications a WHERE 1 = 1");
        push_scope(&mut qb, "a", scope);
        qb.push(" GROUP BY a.kind");
        let rows: Vec<(String, i64)> = qb
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        for (kind, n) in rows {
            let kind = kind
                .parse::<ApplicationKind>()
                .map_err(|_| corrupt("applications.kind", &kind))?;
            stats.by_kind.insert(kind, n);
        }

        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(
            "SELECT COALESCE(SUM(a.demand_paise), 0) FROM applications a WHERE 1 = 1",
        );
        push_scope(&mut qb, "a", scope);
        stats.total_demand_paise = qb
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        Ok(stats)
    }
}

/// SQLite row representation
#[derive(Debug, sqlx::FromRow)]
struct ApplicationRow {
    id: String,
    reference_no: String,
    kind: String,
    applicant_id: String,
    village_id: String,
    survey_number: String,
    area_hectares: f64,
    details: String,
    reviews: String,
    withdrawn: bool,
    rate_per_hectare_paise: Option<i64>,
    demand_paise: Option<i64>,
    version: i64,
    created_at: i64,
    updated_at: i64,
}

impl ApplicationRow {
    /// `status` and `pending_role` columns are derived; the entity recomputes them
    fn into_application(self) -> Result<Application> {
        let kind = self
            .kind
            .parse::<ApplicationKind>()
            .map_err(|_| corrupt("applications.kind", &self.kind))?;
        let details: serde_json::Value = serde_json::from_str(&self.details)
            .map_err(|e| corrupt("applications.details", e))?;
        let reviews: Vec<ReviewStep> = serde_json::from_str(&self.reviews)
            .map_err(|e| corrupt("applications.reviews", e))?;

        Ok(Application {
            id: self.id,
            reference_no: self.reference_no,
            kind,
            applicant_id: self.applicant_id,
            village_id: self.village_id,
            survey_number: self.survey_number,
            area_hectares: self.area_hectares,
            details,
            reviews,
            withdrawn: self.withdrawn,
            rate_per_hectare_paise: self.rate_per_hectare_paise,
            demand_paise: self.demand_paise,
            version: self.version,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{seed_farmer, seed_village, setup_pool};
    use kissan_core::domain::{Decision, ReviewInput, Role};
    use serde_json::json;

    fn noc(id: &str, applicant: &str, village: &str, created_at: i64) -> Application {
        Application::new(
            id,
            format!("NOC/2025/{}", id),
            created_at,
            ApplicationKind::Noc,
            applicant,
            village,
            "12/1",
            0.8,
            json!({"purpose": "Pipeline"}),
        )
        .unwrap()
    }

    fn approve() -> ReviewInput {
        ReviewInput {
            decision: Decision::Approved,
            remark: None,
            rate_per_hectare_paise: None,
            expected_version: None,
        }
    }

    #[tokio::test]
    async fn test_insert_find_roundtrips_reviews() {
        let pool = setup_pool().await;
        seed_village(&pool, "v1").await;
        seed_farmer(&pool, "f1", "v1").await;
        let repo = SqliteApplicationRepository::new(pool);

        let mut app = noc("a1", "f1", "v1", 1000);
        app.record_decision(Role::Karkoon, "k1", &approve(), 2000)
            .unwrap();
        repo.insert(&app).await.unwrap();

        let found = repo.find_by_id(&"a1".to_string()).await.unwrap().unwrap();
        assert_eq!(found.reviews, app.reviews);
        assert_eq!(found.status(), ApplicationStatus::UnderReview);
        assert_eq!(found.pending_role(), Some(Role::Engineer));
        assert_eq!(found.details, json!({"purpose": "Pipeline"}));
    }

    #[tokio::test]
    async fn test_update_detects_stale_version() {
        let pool = setup_pool().await;
        seed_village(&pool, "v1").await;
        seed_farmer(&pool, "f1", "v1").await;
        let repo = SqliteApplicationRepository::new(pool);

        let app = noc("a1", "f1", "v1", 1000);
        repo.insert(&app).await.unwrap();

        let mut first = app.clone();
        first.record_decision(Role::Karkoon, "k1", &approve(), 2000)
            .unwrap();
        repo.update(&first, 1).await.unwrap();

        let mut second = app.clone();
        second.withdraw(2100).unwrap();
        let err = repo.update(&second, 1).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        let stored = repo.find_by_id(&"a1".to_string()).await.unwrap().unwrap();
        assert_eq!(stored.version, 2);
        assert!(!stored.withdrawn);
    }

    #[tokio::test]
    async fn test_list_scope_filters_and_paging() {
        let pool = setup_pool().await;
        seed_village(&pool, "v1").await;
        seed_village(&pool, "v2").await;
        seed_farmer(&pool, "f1", "v1").await;
        seed_farmer(&pool, "f2", "v2").await;
        let repo = SqliteApplicationRepository::new(pool);

        repo.insert(&noc("a1", "f1", "v1", 1000)).await.unwrap();
        repo.insert(&noc("a2", "f1", "v1", 2000)).await.unwrap();
        let mut reviewed = noc("a3", "f2", "v2", 3000);
        reviewed
            .record_decision(Role::Karkoon, "k1", &approve(), 3500)
            .unwrap();
        repo.insert(&reviewed).await.unwrap();

        let all = repo
            .list(&ApplicationQuery::new(RecordScope::All))
            .await
            .unwrap();
        let ids: Vec<_> = all.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["a3", "a2", "a1"]);

        let v1 = ApplicationQuery::new(RecordScope::Villages(vec!["v1".into()]));
        assert_eq!(repo.count(&v1).await.unwrap(), 2);

        let none = ApplicationQuery::new(RecordScope::Villages(vec![]));
        assert_eq!(repo.count(&none).await.unwrap(), 0);

        let mut own = ApplicationQuery::new(RecordScope::Applicant("f2".into()));
        own.pending_role = Some(Role::Engineer);
        assert_eq!(repo.list(&own).await.unwrap().len(), 1);

        let mut page = ApplicationQuery::new(RecordScope::All);
        page.limit = 1;
        page.offset = 1;
        assert_eq!(repo.list(&page).await.unwrap()[0].id, "a2");

        let stats = repo.stats(&RecordScope::All).await.unwrap();
        assert_eq!(stats.by_status[&ApplicationStatus::Submitted], 2);
        assert_eq!(stats.by_status[&ApplicationStatus::UnderReview], 1);
        assert_eq!(stats.by_kind[&ApplicationKind::Noc], 3);
        assert_eq!(stats.total_demand_paise, 0);
    }
}
