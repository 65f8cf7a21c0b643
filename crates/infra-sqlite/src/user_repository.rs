// SQLite UserRepository Implementation

use crate::error::{corrupt, map_sqlx_error};
use async_trait::async_trait;
use chrono::NaiveDate;
use kissan_core::domain::{Role, User, UserId};
use kissan_core::error::Result;
use kissan_core::port::{UserFilter, UserRepository};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use std::collections::BTreeMap;

pub struct SqliteUserRepository {
    pool: SqlitePool,
}

impl SqliteUserRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for SqliteUserRepository {
    async fn insert(&self, user: &User) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO users (
                id, full_name, email, mobile, role, date_of_birth, location_id,
                password_hash, must_change_password, active, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&user.id)
        .bind(&user.full_name)
        .bind(&user.email)
        .bind(&user.mobile)
        .bind(user.role.to_string())
        .bind(user.date_of_birth)
        .bind(&user.location_id)
        .bind(&user.password_hash)
        .bind(user.must_change_password)
        .bind(user.active)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn update(&self, user: &User) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE users
            SET full_name = ?, email = ?, mobile = ?, location_id = ?,
                password_hash = ?, must_change_password = ?, active = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&user.full_name)
        .bind(&user.email)
        .bind(&user.mobile)
        .bind(&user.location_id)
        .bind(&user.password_hash)
        .bind(user.must_change_password)
        .bind(user.active)
        .bind(user.updated_at)
        .bind(&user.id)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        row.map(UserRow::into_user).transpose()
    }

    async fn find_by_login(&self, identifier: &str) -> Result<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE email = ? OR mobile = ?")
            .bind(identifier)
            .bind(identifier)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        row.map(UserRow::into_user).transpose()
    }

    async fn list(&self, filter: &UserFilter) -> Result<Vec<User>> {
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new("SELECT * FROM users WHERE 1 = 1");
        if let Some(role) = filter.role {
            qb.push(" AND role = ").push_bind(role.to_string());
        }
        if let Some(location_id) = &filter.location_id {
            qb.push(" AND location_id = ").push_bind(location_id.clone());
        }
        if let Some(active) = filter.active {
            qb.push(" AND active = ").push_bind(active);
        }
        qb.push(" ORDER BY full_name COLLATE NOCASE ASC, id ASC");

        let rows: Vec<UserRow> = qb
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        rows.into_iter().map(UserRow::into_user).collect()
    }

    async fn count(&self) -> Result<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_error)
    }

    async fn count_by_role(&self) -> Result<BTreeMap<Role, i64>> {
        let rows: Vec<(String, i64)> =
            sqlx::query_as("SELECT role, COUNT(*) FROM users GROUP BY role")
                .fetch_all(&self.pool)
                .await
                .map_err(map_sqlx_error)?;

        rows.into_iter()
            .map(|(role, n)| {
                let role = role.parse::<Role>().map_err(|_| corrupt("users.role", &role))?;
                Ok((role, n))
            })
            .collect()
    }
}

/// SQLite row representation
#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: String,
    full_name: String,
    email: String,
    mobile: String,
    role: String,
    date_of_birth: NaiveDate,
    location_id: Option<String>,
    password_hash: String,
    must_change_password: bool,
    active: bool,
    created_at: i64,
    updated_at: i64,
}

impl UserRow {
    fn into_user(self) -> Result<User> {
        let role = self
            .role
            .parse::<Role>()
            .map_err(|_| corrupt("users.role", &self.role))?;

        Ok(User {
            id: self.id,
            full_name: self.full_name,
            email: self.email,
            mobile: self.mobile,
            role,
            date_of_birth: self.date_of_birth,
            location_id: self.location_id,
            password_hash: self.password_hash,
            must_change_password: self.must_change_password,
            active: self.active,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}
