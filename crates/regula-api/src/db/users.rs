//! User persistence operations.
//!
//! All functions take a `&PgPool` and operate on the `users` table.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::Role;
use crate::state::UserRecord;

/// Insert a new user.
pub async fn insert(pool: &PgPool, record: &UserRecord) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO users (id, email, name, password_hash, role, token_version,
         created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
    )
    .bind(record.id)
    .bind(&record.email)
    .bind(&record.name)
    .bind(&record.password_hash)
    .bind(record.role.as_str())
    .bind(version_to_db(record.token_version))
    .bind(record.created_at)
    .bind(record.updated_at)
    .execute(pool)
    .await?;

    Ok(())
}

/// Change a user's role.
pub async fn update_role(
    pool: &PgPool,
    id: Uuid,
    role: Role,
    updated_at: DateTime<Utc>,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE users SET role = $1, updated_at = $2 WHERE id = $3")
        .bind(role.as_str())
        .bind(updated_at)
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Persist a bumped token version.
pub async fn update_token_version(
    pool: &PgPool,
    id: Uuid,
    token_version: u32,
    updated_at: DateTime<Utc>,
) -> Result<bool, sqlx::Error> {
    let result =
        sqlx::query("UPDATE users SET token_version = $1, updated_at = $2 WHERE id = $3")
            .bind(version_to_db(token_version))
            .bind(updated_at)
            .bind(id)
            .execute(pool)
            .await?;

    Ok(result.rows_affected() > 0)
}

/// Load all users from the database into the in-memory store on startup.
pub async fn load_all(pool: &PgPool) -> Result<Vec<UserRecord>, sqlx::Error> {
    let rows = sqlx::query_as::<_, UserRow>(
        "SELECT id, email, name, password_hash, role, token_version, created_at, updated_at
         FROM users ORDER BY created_at",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(UserRow::into_record).collect())
}

fn version_to_db(version: u32) -> i32 {
    i32::try_from(version).unwrap_or(i32::MAX)
}

fn parse_role(s: &str) -> Role {
    s.parse().unwrap_or_else(|_| {
        tracing::warn!(role = s, "unknown role in database, defaulting to user");
        Role::User
    })
}

/// Internal row type for SQLx mapping.
#[derive(sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    email: String,
    name: String,
    password_hash: String,
    role: String,
    token_version: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl UserRow {
    fn into_record(self) -> UserRecord {
        UserRecord {
            id: self.id,
            email: self.email,
            name: self.name,
            password_hash: self.password_hash,
            role: parse_role(&self.role),
            token_version: u32::try_from(self.token_version).unwrap_or(0),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}
