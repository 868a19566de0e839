//! Waiter Repository

use super::{RepoError, RepoResult};
use shared::models::{Waiter, WaiterCreate, WaiterUpdate};
use shared::util::snowflake_id;
use sqlx::SqlitePool;

pub async fn find_all(pool: &SqlitePool) -> RepoResult<Vec<Waiter>> {
    let waiters = sqlx::query_as::<_, Waiter>(
        "SELECT id, name, is_active, shift_start, section FROM waiter WHERE is_active = 1 ORDER BY name",
    )
    .fetch_all(pool)
    .await?;
    Ok(waiters)
}

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> RepoResult<Option<Waiter>> {
    let waiter = sqlx::query_as::<_, Waiter>(
        "SELECT id, name, is_active, shift_start, section FROM waiter WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(waiter)
}

/// Waiters eligible for new assignments: active, on shift, section
/// assigned. Ordered by section — the deterministic candidate order the
/// selector's tie-breaks rely on.
pub async fn find_eligible(pool: &SqlitePool) -> RepoResult<Vec<Waiter>> {
    let waiters = sqlx::query_as::<_, Waiter>(
        "SELECT id, name, is_active, shift_start, section FROM waiter WHERE is_active = 1 AND shift_start IS NOT NULL AND section IS NOT NULL ORDER BY section",
    )
    .fetch_all(pool)
    .await?;
    Ok(waiters)
}

pub async fn create(pool: &SqlitePool, data: WaiterCreate) -> RepoResult<Waiter> {
    let id = snowflake_id();
    sqlx::query("INSERT INTO waiter (id, name) VALUES (?, ?)")
        .bind(id)
        .bind(data.name)
        .execute(pool)
        .await?;
    find_by_id(pool, id)
        .await?
        .ok_or_else(|| RepoError::Database("Failed to create waiter".into()))
}

pub async fn update(pool: &SqlitePool, id: i64, data: WaiterUpdate) -> RepoResult<Waiter> {
    let rows = sqlx::query(
        "UPDATE waiter SET name = COALESCE(?1, name), is_active = COALESCE(?2, is_active) WHERE id = ?3",
    )
    .bind(data.name)
    .bind(data.is_active)
    .bind(id)
    .execute(pool)
    .await?;
    if rows.rows_affected() == 0 {
        return Err(RepoError::NotFound(format!("Waiter {id} not found")));
    }
    find_by_id(pool, id)
        .await?
        .ok_or_else(|| RepoError::NotFound(format!("Waiter {id} not found")))
}

/// Put a waiter on shift with a section. A section belongs to exactly
/// one on-shift waiter at a time.
pub async fn start_shift(
    pool: &SqlitePool,
    id: i64,
    section: i64,
    now: i64,
) -> RepoResult<Waiter> {
    let holder = sqlx::query_as::<_, Waiter>(
        "SELECT id, name, is_active, shift_start, section FROM waiter WHERE section = ? AND shift_start IS NOT NULL AND id != ? LIMIT 1",
    )
    .bind(section)
    .bind(id)
    .fetch_optional(pool)
    .await?;
    if let Some(holder) = holder {
        return Err(RepoError::Duplicate(format!(
            "Section {section} is already staffed by '{}'",
            holder.name
        )));
    }

    let rows = sqlx::query(
        "UPDATE waiter SET shift_start = ?, section = ? WHERE id = ? AND is_active = 1",
    )
    .bind(now)
    .bind(section)
    .bind(id)
    .execute(pool)
    .await?;
    if rows.rows_affected() == 0 {
        return Err(RepoError::NotFound(format!(
            "Waiter {id} not found or inactive"
        )));
    }
    find_by_id(pool, id)
        .await?
        .ok_or_else(|| RepoError::NotFound(format!("Waiter {id} not found")))
}

/// Take a waiter off shift, releasing their section.
pub async fn end_shift(pool: &SqlitePool, id: i64) -> RepoResult<Waiter> {
    let rows = sqlx::query("UPDATE waiter SET shift_start = NULL, section = NULL WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    if rows.rows_affected() == 0 {
        return Err(RepoError::NotFound(format!("Waiter {id} not found")));
    }
    find_by_id(pool, id)
        .await?
        .ok_or_else(|| RepoError::NotFound(format!("Waiter {id} not found")))
}
