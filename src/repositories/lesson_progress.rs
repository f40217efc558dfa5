use crate::db::models::LessonProgress;

const COLUMNS: &str = "id, user_id, lesson_id, watched_percentage, last_position_seconds, \
     last_watched_at, created_at";

pub(crate) struct ProgressWrite<'a> {
    pub(crate) id: &'a str,
    pub(crate) user_id: &'a str,
    pub(crate) lesson_id: &'a str,
    pub(crate) watched_percentage: i32,
    pub(crate) last_position_seconds: i32,
    pub(crate) watched_at: time::PrimitiveDateTime,
}

/// Inserts the first row for (user, lesson). Returns `None` when a row already exists,
/// in which case the caller must lock and update it instead. A concurrent uncommitted
/// insert for the same pair blocks here until it resolves.
pub(crate) async fn insert_if_absent(
    executor: impl sqlx::PgExecutor<'_>,
    params: &ProgressWrite<'_>,
) -> Result<Option<LessonProgress>, sqlx::Error> {
    sqlx::query_as::<_, LessonProgress>(&format!(
        "INSERT INTO lesson_progress (
            id, user_id, lesson_id, watched_percentage, last_position_seconds,
            last_watched_at, created_at
         ) VALUES ($1,$2,$3,$4,$5,$6,$6)
         ON CONFLICT ON CONSTRAINT uq_lesson_progress_user_lesson DO NOTHING
         RETURNING {COLUMNS}"
    ))
    .bind(params.id)
    .bind(params.user_id)
    .bind(params.lesson_id)
    .bind(params.watched_percentage)
    .bind(params.last_position_seconds)
    .bind(params.watched_at)
    .fetch_optional(executor)
    .await
}

pub(crate) async fn lock_for_user_lesson(
    executor: impl sqlx::PgExecutor<'_>,
    user_id: &str,
    lesson_id: &str,
) -> Result<Option<LessonProgress>, sqlx::Error> {
    sqlx::query_as::<_, LessonProgress>(&format!(
        "SELECT {COLUMNS} FROM lesson_progress
         WHERE user_id = $1 AND lesson_id = $2
         FOR UPDATE"
    ))
    .bind(user_id)
    .bind(lesson_id)
    .fetch_optional(executor)
    .await
}

pub(crate) async fn find_for_user_lesson(
    executor: impl sqlx::PgExecutor<'_>,
    user_id: &str,
    lesson_id: &str,
) -> Result<Option<LessonProgress>, sqlx::Error> {
    sqlx::query_as::<_, LessonProgress>(&format!(
        "SELECT {COLUMNS} FROM lesson_progress WHERE user_id = $1 AND lesson_id = $2"
    ))
    .bind(user_id)
    .bind(lesson_id)
    .fetch_optional(executor)
    .await
}

pub(crate) async fn update(
    executor: impl sqlx::PgExecutor<'_>,
    progress_id: &str,
    watched_percentage: i32,
    last_position_seconds: i32,
    watched_at: time::PrimitiveDateTime,
) -> Result<LessonProgress, sqlx::Error> {
    sqlx::query_as::<_, LessonProgress>(&format!(
        "UPDATE lesson_progress
         SET watched_percentage = $1, last_position_seconds = $2, last_watched_at = $3
         WHERE id = $4
         RETURNING {COLUMNS}"
    ))
    .bind(watched_percentage)
    .bind(last_position_seconds)
    .bind(watched_at)
    .bind(progress_id)
    .fetch_one(executor)
    .await
}

/// Published lessons of the course on which the user reached `threshold`.
pub(crate) async fn count_completed_in_course(
    executor: impl sqlx::PgExecutor<'_>,
    user_id: &str,
    course_id: &str,
    threshold: i32,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*)
         FROM lesson_progress lp
         JOIN lessons l ON l.id = lp.lesson_id
         WHERE lp.user_id = $1
           AND l.course_id = $2
           AND l.is_published = TRUE
           AND lp.watched_percentage >= $3",
    )
    .bind(user_id)
    .bind(course_id)
    .bind(threshold)
    .fetch_one(executor)
    .await
}
