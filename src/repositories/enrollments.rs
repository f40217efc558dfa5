use sqlx::PgPool;

use crate::db::models::Enrollment;
use crate::db::types::EnrollmentStatus;

const COLUMNS: &str = "id, user_id, course_id, status, paid_amount_cents, currency, payment_id, \
     enrolled_at, canceled_at, updated_at";

pub(crate) struct CreateEnrollment<'a> {
    pub(crate) id: &'a str,
    pub(crate) user_id: &'a str,
    pub(crate) course_id: &'a str,
    pub(crate) paid_amount_cents: Option<i64>,
    pub(crate) currency: Option<&'a str>,
    pub(crate) payment_id: Option<&'a str>,
    pub(crate) enrolled_at: time::PrimitiveDateTime,
}

/// Inserts an active enrollment. A concurrent active row for the same pair surfaces as a
/// unique violation on `uq_enrollments_active`.
pub(crate) async fn create(
    executor: impl sqlx::PgExecutor<'_>,
    params: CreateEnrollment<'_>,
) -> Result<Enrollment, sqlx::Error> {
    sqlx::query_as::<_, Enrollment>(&format!(
        "INSERT INTO enrollments (
            id, user_id, course_id, status, paid_amount_cents, currency, payment_id,
            enrolled_at, updated_at
         ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$8)
         RETURNING {COLUMNS}"
    ))
    .bind(params.id)
    .bind(params.user_id)
    .bind(params.course_id)
    .bind(EnrollmentStatus::Active)
    .bind(params.paid_amount_cents)
    .bind(params.currency)
    .bind(params.payment_id)
    .bind(params.enrolled_at)
    .fetch_one(executor)
    .await
}

pub(crate) async fn has_active(
    executor: impl sqlx::PgExecutor<'_>,
    user_id: &str,
    course_id: &str,
) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS (
            SELECT 1 FROM enrollments
            WHERE user_id = $1 AND course_id = $2 AND status = $3
         )",
    )
    .bind(user_id)
    .bind(course_id)
    .bind(EnrollmentStatus::Active)
    .fetch_one(executor)
    .await
}

pub(crate) async fn find_by_id(
    executor: impl sqlx::PgExecutor<'_>,
    enrollment_id: &str,
) -> Result<Option<Enrollment>, sqlx::Error> {
    sqlx::query_as::<_, Enrollment>(&format!("SELECT {COLUMNS} FROM enrollments WHERE id = $1"))
        .bind(enrollment_id)
        .fetch_optional(executor)
        .await
}

pub(crate) async fn lock_by_id(
    executor: impl sqlx::PgExecutor<'_>,
    enrollment_id: &str,
) -> Result<Option<Enrollment>, sqlx::Error> {
    sqlx::query_as::<_, Enrollment>(&format!(
        "SELECT {COLUMNS} FROM enrollments WHERE id = $1 FOR UPDATE"
    ))
    .bind(enrollment_id)
    .fetch_optional(executor)
    .await
}

pub(crate) async fn mark_canceled(
    executor: impl sqlx::PgExecutor<'_>,
    enrollment_id: &str,
    canceled_at: time::PrimitiveDateTime,
) -> Result<Enrollment, sqlx::Error> {
    sqlx::query_as::<_, Enrollment>(&format!(
        "UPDATE enrollments
         SET status = $1, canceled_at = $2, updated_at = $2
         WHERE id = $3
         RETURNING {COLUMNS}"
    ))
    .bind(EnrollmentStatus::Canceled)
    .bind(canceled_at)
    .bind(enrollment_id)
    .fetch_one(executor)
    .await
}

pub(crate) async fn list_for_user(
    pool: &PgPool,
    user_id: &str,
) -> Result<Vec<Enrollment>, sqlx::Error> {
    sqlx::query_as::<_, Enrollment>(&format!(
        "SELECT {COLUMNS} FROM enrollments WHERE user_id = $1 ORDER BY enrolled_at DESC"
    ))
    .bind(user_id)
    .fetch_all(pool)
    .await
}

#[cfg(test)]
pub(crate) async fn count_active(
    executor: impl sqlx::PgExecutor<'_>,
    user_id: &str,
    course_id: &str,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM enrollments WHERE user_id = $1 AND course_id = $2 AND status = $3",
    )
    .bind(user_id)
    .bind(course_id)
    .bind(EnrollmentStatus::Active)
    .fetch_one(executor)
    .await
}
