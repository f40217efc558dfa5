use crate::db::models::CourseCompletion;

/// Serializes completion checks for one (user, course) until the surrounding transaction
/// ends, so counts taken after the lock see every lesson committed before it.
pub(crate) async fn lock_pair(
    executor: impl sqlx::PgExecutor<'_>,
    user_id: &str,
    course_id: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1, 0))")
        .bind(format!("course_completion:{user_id}:{course_id}"))
        .execute(executor)
        .await?;
    Ok(())
}

/// Race-safe create: concurrent callers for the same (user, course) get exactly one row
/// back between them; everyone else gets `None`.
pub(crate) async fn insert_if_absent(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
    user_id: &str,
    course_id: &str,
    completed_at: time::PrimitiveDateTime,
) -> Result<Option<CourseCompletion>, sqlx::Error> {
    sqlx::query_as::<_, CourseCompletion>(
        "INSERT INTO course_completions (id, user_id, course_id, completed_at)
         VALUES ($1,$2,$3,$4)
         ON CONFLICT ON CONSTRAINT uq_course_completions_user_course DO NOTHING
         RETURNING id, user_id, course_id, completed_at",
    )
    .bind(id)
    .bind(user_id)
    .bind(course_id)
    .bind(completed_at)
    .fetch_optional(executor)
    .await
}

pub(crate) async fn find_for_user_course(
    executor: impl sqlx::PgExecutor<'_>,
    user_id: &str,
    course_id: &str,
) -> Result<Option<CourseCompletion>, sqlx::Error> {
    sqlx::query_as::<_, CourseCompletion>(
        "SELECT id, user_id, course_id, completed_at
         FROM course_completions
         WHERE user_id = $1 AND course_id = $2",
    )
    .bind(user_id)
    .bind(course_id)
    .fetch_optional(executor)
    .await
}

#[cfg(test)]
pub(crate) async fn count_for_user_course(
    executor: impl sqlx::PgExecutor<'_>,
    user_id: &str,
    course_id: &str,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM course_completions WHERE user_id = $1 AND course_id = $2",
    )
    .bind(user_id)
    .bind(course_id)
    .fetch_one(executor)
    .await
}
