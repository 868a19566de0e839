//! Waitlist Repository

use super::{RepoError, RepoResult};
use shared::models::{WaitlistCreate, WaitlistEntry};
use shared::util::{now_millis, snowflake_id};
use sqlx::{SqliteConnection, SqlitePool};
use validator::Validate;

/// Parties still waiting, FIFO by creation time.
pub async fn find_waiting(pool: &SqlitePool) -> RepoResult<Vec<WaitlistEntry>> {
    let entries = sqlx::query_as::<_, WaitlistEntry>(
        "SELECT id, party_name, party_size, priority, status, table_id, waiter_id, seated_at, created_at FROM waitlist WHERE status = 'waiting' ORDER BY created_at",
    )
    .fetch_all(pool)
    .await?;
    Ok(entries)
}

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> RepoResult<Option<WaitlistEntry>> {
    let entry = sqlx::query_as::<_, WaitlistEntry>(
        "SELECT id, party_name, party_size, priority, status, table_id, waiter_id, seated_at, created_at FROM waitlist WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(entry)
}

pub async fn create(pool: &SqlitePool, data: WaitlistCreate) -> RepoResult<WaitlistEntry> {
    data.validate()
        .map_err(|e| RepoError::Validation(e.to_string()))?;

    let id = snowflake_id();
    let now = now_millis();
    sqlx::query(
        "INSERT INTO waitlist (id, party_name, party_size, priority, created_at) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(id)
    .bind(data.party_name)
    .bind(data.party_size)
    .bind(data.priority)
    .bind(now)
    .execute(pool)
    .await?;

    find_by_id(pool, id)
        .await?
        .ok_or_else(|| RepoError::Database("Failed to create waitlist entry".into()))
}

/// Advance a party to `seated`, conditional on it still waiting.
/// Returns the number of affected rows — 0 means the party was already
/// processed by a concurrent request.
pub async fn mark_seated(
    conn: &mut SqliteConnection,
    id: i64,
    table_id: i64,
    waiter_id: i64,
    now: i64,
) -> RepoResult<u64> {
    let rows = sqlx::query(
        "UPDATE waitlist SET status = 'seated', table_id = ?, waiter_id = ?, seated_at = ? WHERE id = ? AND status = 'waiting'",
    )
    .bind(table_id)
    .bind(waiter_id)
    .bind(now)
    .bind(id)
    .execute(conn)
    .await?;
    Ok(rows.rows_affected())
}

pub async fn cancel(pool: &SqlitePool, id: i64) -> RepoResult<WaitlistEntry> {
    set_terminal_status(pool, id, "cancelled").await
}

pub async fn mark_no_show(pool: &SqlitePool, id: i64) -> RepoResult<WaitlistEntry> {
    set_terminal_status(pool, id, "no_show").await
}

async fn set_terminal_status(
    pool: &SqlitePool,
    id: i64,
    status: &str,
) -> RepoResult<WaitlistEntry> {
    let rows = sqlx::query("UPDATE waitlist SET status = ? WHERE id = ? AND status = 'waiting'")
        .bind(status.to_string())
        .bind(id)
        .execute(pool)
        .await?;
    if rows.rows_affected() == 0 {
        return Err(RepoError::NotFound(format!(
            "Waitlist entry {id} not found or already processed"
        )));
    }
    find_by_id(pool, id)
        .await?
        .ok_or_else(|| RepoError::NotFound(format!("Waitlist entry {id} not found")))
}
