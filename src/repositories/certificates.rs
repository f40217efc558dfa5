use crate::db::models::Certificate;

pub(crate) struct IssueCertificate<'a> {
    pub(crate) id: &'a str,
    pub(crate) user_id: &'a str,
    pub(crate) course_id: &'a str,
    pub(crate) verification_code: &'a str,
    pub(crate) issued_at: time::PrimitiveDateTime,
}

/// Returns the new certificate, or `None` when one already exists for the pair.
pub(crate) async fn insert_if_absent(
    executor: impl sqlx::PgExecutor<'_>,
    params: IssueCertificate<'_>,
) -> Result<Option<Certificate>, sqlx::Error> {
    sqlx::query_as::<_, Certificate>(
        "INSERT INTO certificates (id, user_id, course_id, verification_code, issued_at)
         VALUES ($1,$2,$3,$4,$5)
         ON CONFLICT ON CONSTRAINT uq_certificates_user_course DO NOTHING
         RETURNING id, user_id, course_id, verification_code, issued_at",
    )
    .bind(params.id)
    .bind(params.user_id)
    .bind(params.course_id)
    .bind(params.verification_code)
    .bind(params.issued_at)
    .fetch_optional(executor)
    .await
}

pub(crate) async fn find_for_user_course(
    executor: impl sqlx::PgExecutor<'_>,
    user_id: &str,
    course_id: &str,
) -> Result<Option<Certificate>, sqlx::Error> {
    sqlx::query_as::<_, Certificate>(
        "SELECT id, user_id, course_id, verification_code, issued_at
         FROM certificates
         WHERE user_id = $1 AND course_id = $2",
    )
    .bind(user_id)
    .bind(course_id)
    .fetch_optional(executor)
    .await
}
