use sqlx::PgPool;

use crate::db::models::OutboxRow;

pub(crate) async fn append(
    executor: impl sqlx::PgExecutor<'_>,
    fact_type: &str,
    payload: serde_json::Value,
    created_at: time::PrimitiveDateTime,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>(
        "INSERT INTO fact_outbox (fact_type, payload, created_at)
         VALUES ($1,$2,$3)
         RETURNING id",
    )
    .bind(fact_type)
    .bind(sqlx::types::Json(payload))
    .bind(created_at)
    .fetch_one(executor)
    .await
}

/// Locks up to `limit` undispatched rows in insertion order. Rows held by another worker
/// are skipped, and so are rows that already used up their attempts.
pub(crate) async fn claim_batch(
    executor: impl sqlx::PgExecutor<'_>,
    limit: i64,
    max_attempts: i32,
) -> Result<Vec<OutboxRow>, sqlx::Error> {
    sqlx::query_as::<_, OutboxRow>(
        "SELECT id, fact_type, payload, attempts
         FROM fact_outbox
         WHERE dispatched_at IS NULL AND attempts < $1
         ORDER BY id
         FOR UPDATE SKIP LOCKED
         LIMIT $2",
    )
    .bind(max_attempts)
    .bind(limit)
    .fetch_all(executor)
    .await
}

pub(crate) async fn mark_dispatched(
    executor: impl sqlx::PgExecutor<'_>,
    id: i64,
    dispatched_at: time::PrimitiveDateTime,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE fact_outbox
         SET dispatched_at = $1, attempts = attempts + 1, last_error = NULL
         WHERE id = $2",
    )
    .bind(dispatched_at)
    .bind(id)
    .execute(executor)
    .await?;
    Ok(())
}

pub(crate) async fn record_failure(
    executor: impl sqlx::PgExecutor<'_>,
    id: i64,
    error: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE fact_outbox SET attempts = attempts + 1, last_error = $1 WHERE id = $2")
        .bind(error)
        .bind(id)
        .execute(executor)
        .await?;
    Ok(())
}

pub(crate) async fn prune_dispatched_before(
    pool: &PgPool,
    cutoff: time::PrimitiveDateTime,
) -> Result<u64, sqlx::Error> {
    let result =
        sqlx::query("DELETE FROM fact_outbox WHERE dispatched_at IS NOT NULL AND dispatched_at < $1")
            .bind(cutoff)
            .execute(pool)
            .await?;
    Ok(result.rows_affected())
}

#[cfg(test)]
pub(crate) async fn list_types(pool: &PgPool) -> Result<Vec<String>, sqlx::Error> {
    sqlx::query_scalar::<_, String>("SELECT fact_type FROM fact_outbox ORDER BY id")
        .fetch_all(pool)
        .await
}

/// (fact_type, attempts) of rows still waiting for delivery.
#[cfg(test)]
pub(crate) async fn list_pending(pool: &PgPool) -> Result<Vec<(String, i32)>, sqlx::Error> {
    sqlx::query_as::<_, (String, i32)>(
        "SELECT fact_type, attempts FROM fact_outbox WHERE dispatched_at IS NULL ORDER BY id",
    )
    .fetch_all(pool)
    .await
}
