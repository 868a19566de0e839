//! Dining Table Repository

use super::{RepoError, RepoResult};
use shared::models::{DiningTable, DiningTableCreate, DiningTableUpdate};
use shared::util::{now_millis, snowflake_id};
use sqlx::{SqliteConnection, SqlitePool};

pub async fn find_all(pool: &SqlitePool) -> RepoResult<Vec<DiningTable>> {
    let tables = sqlx::query_as::<_, DiningTable>(
        "SELECT id, name, capacity, state, section, party_size, state_changed_at, is_active FROM dining_table WHERE is_active = 1 ORDER BY name",
    )
    .fetch_all(pool)
    .await?;
    Ok(tables)
}

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> RepoResult<Option<DiningTable>> {
    let table = sqlx::query_as::<_, DiningTable>(
        "SELECT id, name, capacity, state, section, party_size, state_changed_at, is_active FROM dining_table WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(table)
}

/// Tables that can receive a new party: available, staffed (section
/// assigned) and active. Ordered by id for deterministic selection.
pub async fn find_available(pool: &SqlitePool) -> RepoResult<Vec<DiningTable>> {
    let tables = sqlx::query_as::<_, DiningTable>(
        "SELECT id, name, capacity, state, section, party_size, state_changed_at, is_active FROM dining_table WHERE state = 'available' AND section IS NOT NULL AND is_active = 1 ORDER BY id",
    )
    .fetch_all(pool)
    .await?;
    Ok(tables)
}

pub async fn find_by_name(pool: &SqlitePool, name: &str) -> RepoResult<Option<DiningTable>> {
    let table = sqlx::query_as::<_, DiningTable>(
        "SELECT id, name, capacity, state, section, party_size, state_changed_at, is_active FROM dining_table WHERE name = ? LIMIT 1",
    )
    .bind(name.to_string())
    .fetch_optional(pool)
    .await?;
    Ok(table)
}

pub async fn create(pool: &SqlitePool, data: DiningTableCreate) -> RepoResult<DiningTable> {
    let capacity = data.capacity.unwrap_or(4);
    if !(2..=15).contains(&capacity) {
        return Err(RepoError::Validation(format!(
            "Table capacity must be between 2 and 15, got {capacity}"
        )));
    }
    if find_by_name(pool, &data.name).await?.is_some() {
        return Err(RepoError::Duplicate(format!(
            "Table '{}' already exists",
            data.name
        )));
    }

    let id = snowflake_id();
    let now = now_millis();
    sqlx::query(
        "INSERT INTO dining_table (id, name, capacity, state, section, state_changed_at) VALUES (?, ?, ?, 'available', ?, ?)",
    )
    .bind(id)
    .bind(data.name)
    .bind(capacity)
    .bind(data.section)
    .bind(now)
    .execute(pool)
    .await?;

    find_by_id(pool, id)
        .await?
        .ok_or_else(|| RepoError::Database("Failed to create dining table".into()))
}

pub async fn update(pool: &SqlitePool, id: i64, data: DiningTableUpdate) -> RepoResult<DiningTable> {
    if let Some(capacity) = data.capacity
        && !(2..=15).contains(&capacity)
    {
        return Err(RepoError::Validation(format!(
            "Table capacity must be between 2 and 15, got {capacity}"
        )));
    }
    let rows = sqlx::query(
        "UPDATE dining_table SET name = COALESCE(?1, name), capacity = COALESCE(?2, capacity), is_active = COALESCE(?3, is_active) WHERE id = ?4",
    )
    .bind(data.name)
    .bind(data.capacity)
    .bind(data.is_active)
    .bind(id)
    .execute(pool)
    .await?;
    if rows.rows_affected() == 0 {
        return Err(RepoError::NotFound(format!("Dining table {id} not found")));
    }
    find_by_id(pool, id)
        .await?
        .ok_or_else(|| RepoError::NotFound(format!("Dining table {id} not found")))
}

/// Reassign section ownership (shift staffing change); `None` detaches
/// the table from the current shift configuration.
pub async fn set_section(pool: &SqlitePool, id: i64, section: Option<i64>) -> RepoResult<()> {
    let rows = sqlx::query("UPDATE dining_table SET section = ? WHERE id = ?")
        .bind(section)
        .bind(id)
        .execute(pool)
        .await?;
    if rows.rows_affected() == 0 {
        return Err(RepoError::NotFound(format!("Dining table {id} not found")));
    }
    Ok(())
}

/// Optimistic reservation: occupy the table only if it is still
/// available. Returns the number of affected rows — 0 means another
/// request won the race and the caller must abort.
pub async fn reserve(
    conn: &mut SqliteConnection,
    id: i64,
    party_size: i32,
    now: i64,
) -> RepoResult<u64> {
    let rows = sqlx::query(
        "UPDATE dining_table SET state = 'occupied', party_size = ?, state_changed_at = ? WHERE id = ? AND state = 'available'",
    )
    .bind(party_size)
    .bind(now)
    .bind(id)
    .execute(conn)
    .await?;
    Ok(rows.rows_affected())
}

/// Hold a table (`available → assigned`) while the party walks over.
pub async fn hold(pool: &SqlitePool, id: i64, now: i64) -> RepoResult<u64> {
    let rows = sqlx::query(
        "UPDATE dining_table SET state = 'assigned', state_changed_at = ? WHERE id = ? AND state = 'available'",
    )
    .bind(now)
    .bind(id)
    .execute(pool)
    .await?;
    Ok(rows.rows_affected())
}

/// Return a table to the floor (`occupied | assigned → available`),
/// conditional on its current state for the same optimistic guarantee
/// as [`reserve`].
pub async fn release(conn: &mut SqliteConnection, id: i64, now: i64) -> RepoResult<u64> {
    let rows = sqlx::query(
        "UPDATE dining_table SET state = 'available', party_size = NULL, state_changed_at = ? WHERE id = ? AND state IN ('occupied', 'assigned')",
    )
    .bind(now)
    .bind(id)
    .execute(conn)
    .await?;
    Ok(rows.rows_affected())
}
