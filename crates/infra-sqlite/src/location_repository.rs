// SQLite LocationRepository Implementation

use crate::error::{corrupt, map_sqlx_error};
use async_trait::async_trait;
use kissan_core::domain::{Location, LocationId, LocationLevel};
use kissan_core::error::{AppError, Result};
use kissan_core::port::{LocationRepository, LocationUsage};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use std::collections::BTreeMap;

pub struct SqliteLocationRepository {
    pool: SqlitePool,
}

impl SqliteLocationRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LocationRepository for SqliteLocationRepository {
    async fn insert(&self, location: &Location) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO locations (id, name, level, parent_id, code, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&location.id)
        .bind(&location.name)
        .bind(location.level.to_string())
        .bind(&location.parent_id)
        .bind(&location.code)
        .bind(location.created_at)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn update(&self, location: &Location) -> Result<()> {
        let result = sqlx::query("UPDATE locations SET name = ?, code = ? WHERE id = ?")
            .bind(&location.name)
            .bind(&location.code)
            .bind(&location.id)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found("Location", &location.id));
        }
        Ok(())
    }

    async fn delete(&self, id: &LocationId) -> Result<()> {
        sqlx::query("DELETE FROM locations WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn find_by_id(&self, id: &LocationId) -> Result<Option<Location>> {
        let row = sqlx::query_as::<_, LocationRow>("SELECT * FROM locations WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        row.map(LocationRow::into_location).transpose()
    }

    async fn find_child_by_name(
        &self,
        parent_id: Option<&LocationId>,
        name: &str,
    ) -> Result<Option<Location>> {
        let row = sqlx::query_as::<_, LocationRow>(
            "SELECT * FROM locations WHERE parent_id IS ? AND lower(name) = lower(?)",
        )
        .bind(parent_id)
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        row.map(LocationRow::into_location).transpose()
    }

    async fn list(
        &self,
        parent_id: Option<&LocationId>,
        level: Option<LocationLevel>,
    ) -> Result<Vec<Location>> {
        let mut qb: QueryBuilder<Sqlite> =
            QueryBuilder::new("SELECT * FROM locations WHERE 1 = 1");
        if let Some(parent_id) = parent_id {
            qb.push(" AND parent_id = ").push_bind(parent_id.clone());
        }
        if let Some(level) = level {
            qb.push(" AND level = ").push_bind(level.to_string());
        }
        qb.push(" ORDER BY name COLLATE NOCASE ASC");

        let rows: Vec<LocationRow> = qb
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        rows.into_iter().map(LocationRow::into_location).collect()
    }

    async fn path(&self, id: &LocationId) -> Result<Vec<Location>> {
        let rows: Vec<LocationRow> = sqlx::query_as(
            r#"
            WITH RECURSIVE chain(id, name, level, parent_id, code, created_at, depth) AS (
                SELECT id, name, level, parent_id, code, created_at, 0
                FROM locations WHERE id = ?
                UNION ALL
                SELECT l.id, l.name, l.level, l.parent_id, l.code, l.created_at, c.depth + 1
                FROM locations l JOIN chain c ON l.id = c.parent_id
            )
            SELECT id, name, level, parent_id, code, created_at
            FROM chain ORDER BY depth DESC
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        rows.into_iter().map(LocationRow::into_location).collect()
    }

    async fn village_ids_under(&self, id: &LocationId) -> Result<Vec<LocationId>> {
        sqlx::query_scalar(
            r#"
            WITH RECURSIVE subtree(id, level) AS (
                SELECT id, level FROM locations WHERE id = ?
                UNION ALL
                SELECT l.id, l.level FROM locations l JOIN subtree s ON l.parent_id = s.id
            )
            SELECT id FROM subtree WHERE level = 'VILLAGE' ORDER BY id
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)
    }

    async fn usage(&self, id: &LocationId) -> Result<LocationUsage> {
        let (children, users, applications): (i64, i64, i64) = sqlx::query_as(
            r#"
            SELECT
                (SELECT COUNT(*) FROM locations WHERE parent_id = ?1),
                (SELECT COUNT(*) FROM users WHERE location_id = ?1),
                (SELECT COUNT(*) FROM applications WHERE village_id = ?1)
            "#,
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(LocationUsage {
            children,
            users,
            applications,
        })
    }

    async fn count_by_level(&self) -> Result<BTreeMap<LocationLevel, i64>> {
        let rows: Vec<(String, i64)> =
            sqlx::query_as("SELECT level, COUNT(*) FROM locations GROUP BY level")
                .fetch_all(&self.pool)
                .await
                .map_err(map_sqlx_error)?;

        rows.into_iter()
            .map(|(level, n)| {
                let level = level
                    .parse::<LocationLevel>()
                    .map_err(|_| corrupt("locations.level", &level))?;
                Ok((level, n))
            })
            .collect()
    }
}

/// SQLite row representation
#[derive(Debug, sqlx::FromRow)]
struct LocationRow {
    id: String,
    name: String,
    level: String,
    parent_id: Option<String>,
    code: Option<String>,
    created_at: i64,
}

impl LocationRow {
    fn into_location(self) -> Result<Location> {
        let level = self
            .level
            .parse::<LocationLevel>()
            .map_err(|_| corrupt("locations.level", &self.level))?;

        Ok(Location {
            id: self.id,
            name: self.name,
            level,
            parent_id: self.parent_id,
            code: self.code,
            created_at: self.created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{create_pool, run_migrations};

    async fn setup_test_repo() -> SqliteLocationRepository {
        let pool = create_pool("sqlite::memory:").await.unwrap();
        run_migrations(&pool).await.unwrap();
        SqliteLocationRepository::new(pool)
    }

    async fn add(
        repo: &SqliteLocationRepository,
        id: &str,
        name: &str,
        level: LocationLevel,
        parent: Option<&str>,
    ) {
        let loc = Location::new(id, 0, name, level, parent.map(String::from), None).unwrap();
        repo.insert(&loc).await.unwrap();
    }

    /// Maharashtra > Pune > Haveli > {Wagholi, Lohegaon}; Pune > Mulshi > Paud
    async fn seeded() -> SqliteLocationRepository {
        let repo = setup_test_repo().await;
        add(&repo, "mh", "Maharashtra", LocationLevel::State, None).await;
        add(&repo, "pune", "Pune", LocationLevel::District, Some("mh")).await;
        add(&repo, "haveli", "Haveli", LocationLevel::Subdistrict, Some("pune")).await;
        add(&repo, "mulshi", "Mulshi", LocationLevel::Subdistrict, Some("pune")).await;
        add(&repo, "wagholi", "Wagholi", LocationLevel::Village, Some("haveli")).await;
        add(&repo, "lohegaon", "Lohegaon", LocationLevel::Village, Some("haveli")).await;
        add(&repo, "paud", "Paud", LocationLevel::Village, Some("mulshi")).await;
        repo
    }

    #[tokio::test]
    async fn test_path_from_state_down() {
        let repo = seeded().await;
        let path = repo.path(&"wagholi".to_string()).await.unwrap();
        let ids: Vec<_> = path.iter().map(|l| l.id.as_str()).collect();
        assert_eq!(ids, vec!["mh", "pune", "haveli", "wagholi"]);

        assert!(repo.path(&"missing".to_string()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_village_ids_under() {
        let repo = seeded().await;
        assert_eq!(
            repo.village_ids_under(&"pune".to_string()).await.unwrap(),
            vec!["lohegaon", "paud", "wagholi"]
        );
        assert_eq!(
            repo.village_ids_under(&"haveli".to_string()).await.unwrap(),
            vec!["lohegaon", "wagholi"]
        );
        assert_eq!(
            repo.village_ids_under(&"paud".to_string()).await.unwrap(),
            vec!["paud"]
        );
    }

    #[tokio::test]
    async fn test_sibling_names_unique_case_insensitive() {
        let repo = seeded().await;
        let found = repo
            .find_child_by_name(Some(&"haveli".to_string()), "WAGHOLI")
            .await
            .unwrap();
        assert_eq!(found.map(|l| l.id), Some("wagholi".to_string()));

        let dup = Location::new(
            "dup",
            0,
            "wagholi",
            LocationLevel::Village,
            Some("haveli".into()),
            None,
        )
        .unwrap();
        assert!(matches!(repo.insert(&dup).await, Err(AppError::Conflict(_))));

        let states = repo.find_child_by_name(None, "maharashtra").await.unwrap();
        assert!(states.is_some());
    }

    #[tokio::test]
    async fn test_list_usage_and_counts() {
        let repo = seeded().await;
        let villages = repo
            .list(Some(&"haveli".to_string()), None)
            .await
            .unwrap();
        let names: Vec<_> = villages.iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, vec!["Lohegaon", "Wagholi"]);

        let usage = repo.usage(&"haveli".to_string()).await.unwrap();
        assert_eq!(usage.children, 2);
        assert!(!usage.is_unused());
        assert!(repo.usage(&"paud".to_string()).await.unwrap().is_unused());

        let counts = repo.count_by_level().await.unwrap();
        assert_eq!(counts[&LocationLevel::Village], 3);
        assert_eq!(counts[&LocationLevel::State], 1);
    }
}
