use sqlx::PgPool;

use crate::db::models::Lesson;

const LESSON_COLUMNS: &str = "id, course_id, title, order_index, duration_seconds, \
     is_published, is_free_preview, created_at, updated_at";

pub(crate) struct CreateLesson<'a> {
    pub(crate) id: &'a str,
    pub(crate) course_id: &'a str,
    pub(crate) title: &'a str,
    pub(crate) order_index: i32,
    pub(crate) duration_seconds: i32,
    pub(crate) is_free_preview: bool,
    pub(crate) created_at: time::PrimitiveDateTime,
}

pub(crate) async fn create(pool: &PgPool, params: CreateLesson<'_>) -> Result<Lesson, sqlx::Error> {
    sqlx::query_as::<_, Lesson>(&format!(
        "INSERT INTO lessons (
            id, course_id, title, order_index, duration_seconds,
            is_published, is_free_preview, created_at, updated_at
         ) VALUES ($1,$2,$3,$4,$5,FALSE,$6,$7,$7)
         RETURNING {LESSON_COLUMNS}",
    ))
    .bind(params.id)
    .bind(params.course_id)
    .bind(params.title)
    .bind(params.order_index)
    .bind(params.duration_seconds)
    .bind(params.is_free_preview)
    .bind(params.created_at)
    .fetch_one(pool)
    .await
}

pub(crate) async fn find_by_id(
    executor: impl sqlx::PgExecutor<'_>,
    lesson_id: &str,
) -> Result<Option<Lesson>, sqlx::Error> {
    sqlx::query_as::<_, Lesson>(&format!("SELECT {LESSON_COLUMNS} FROM lessons WHERE id = $1"))
        .bind(lesson_id)
        .fetch_optional(executor)
        .await
}

pub(crate) async fn list_for_course(
    pool: &PgPool,
    course_id: &str,
    include_unpublished: bool,
) -> Result<Vec<Lesson>, sqlx::Error> {
    sqlx::query_as::<_, Lesson>(&format!(
        "SELECT {LESSON_COLUMNS} FROM lessons
         WHERE course_id = $1 AND ($2 OR is_published = TRUE)
         ORDER BY order_index, created_at"
    ))
    .bind(course_id)
    .bind(include_unpublished)
    .fetch_all(pool)
    .await
}

pub(crate) async fn set_published(
    executor: impl sqlx::PgExecutor<'_>,
    lesson_id: &str,
    updated_at: time::PrimitiveDateTime,
) -> Result<bool, sqlx::Error> {
    let result =
        sqlx::query("UPDATE lessons SET is_published = TRUE, updated_at = $1 WHERE id = $2")
            .bind(updated_at)
            .bind(lesson_id)
            .execute(executor)
            .await?;
    Ok(result.rows_affected() > 0)
}

pub(crate) async fn count_published(
    executor: impl sqlx::PgExecutor<'_>,
    course_id: &str,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM lessons WHERE course_id = $1 AND is_published = TRUE",
    )
    .bind(course_id)
    .fetch_one(executor)
    .await
}
