use uuid::Uuid;

use crate::core::state::AppState;
use crate::db::models::{Course, Enrollment, User};
use crate::db::types::EnrollmentStatus;
use crate::repositories;
use crate::repositories::enrollments::CreateEnrollment;
use crate::services::access;
use crate::services::errors::LearningError;
use crate::services::facts::{self, Fact, Outcome};

/// Externally verified "payment succeeded" indicator. Authenticity is the caller's concern.
#[derive(Debug, Clone)]
pub(crate) struct PaymentConfirmation {
    pub(crate) payment_id: String,
    pub(crate) amount_cents: i64,
    pub(crate) currency: String,
}

impl PaymentConfirmation {
    /// True when the reported charge equals what was recorded. A free enrollment records no
    /// charge and matches any report.
    pub(crate) fn matches_charge(
        &self,
        amount_cents: Option<i64>,
        currency: Option<&str>,
    ) -> bool {
        let Some(amount) = amount_cents else {
            return true;
        };
        amount == self.amount_cents
            && currency.is_some_and(|currency| currency.eq_ignore_ascii_case(&self.currency))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct EnrollmentTerms {
    pub(crate) paid_amount_cents: Option<i64>,
    pub(crate) currency: Option<String>,
    pub(crate) payment_id: Option<String>,
}

impl EnrollmentTerms {
    fn free() -> Self {
        Self { paid_amount_cents: None, currency: None, payment_id: None }
    }

    pub(crate) fn is_paid(&self) -> bool {
        self.paid_amount_cents.is_some()
    }
}

/// What the enrollment row records. The amount always comes from the course price, never
/// from the payment report.
pub(crate) fn enrollment_terms(
    course: &Course,
    payment: Option<&PaymentConfirmation>,
    default_currency: &str,
) -> Result<EnrollmentTerms, LearningError> {
    if course.is_free() {
        return Ok(EnrollmentTerms::free());
    }

    let payment = payment.ok_or(LearningError::NotFree)?;

    Ok(EnrollmentTerms {
        paid_amount_cents: course.price_cents,
        currency: Some(course.currency.clone().unwrap_or_else(|| default_currency.to_string())),
        payment_id: Some(payment.payment_id.clone()),
    })
}

/// Creates an active enrollment. Without a payment only free courses are accepted.
pub(crate) async fn enroll(
    state: &AppState,
    user: &User,
    course_id: &str,
    payment: Option<&PaymentConfirmation>,
) -> Result<Outcome<Enrollment>, LearningError> {
    let course = repositories::courses::find_by_id(state.db(), course_id)
        .await?
        .ok_or(LearningError::NotFound("course"))?;

    if !course.is_available() {
        return Err(LearningError::CourseUnavailable);
    }

    if repositories::enrollments::has_active(state.db(), &user.id, &course.id).await? {
        return Err(LearningError::AlreadyEnrolled);
    }

    let terms =
        enrollment_terms(&course, payment, &state.settings().learning().default_currency)?;
    let now = state.clock().now();

    let mut tx = state.db().begin().await?;

    let enrollment = repositories::enrollments::create(
        &mut *tx,
        CreateEnrollment {
            id: &Uuid::new_v4().to_string(),
            user_id: &user.id,
            course_id: &course.id,
            paid_amount_cents: terms.paid_amount_cents,
            currency: terms.currency.as_deref(),
            payment_id: terms.payment_id.as_deref(),
            enrolled_at: now,
        },
    )
    .await
    .map_err(|err| {
        if crate::db::is_unique_violation(&err) {
            LearningError::AlreadyEnrolled
        } else {
            LearningError::Storage(err)
        }
    })?;

    let produced = vec![Fact::EnrollmentCreated {
        user_id: enrollment.user_id.clone(),
        enrollment_id: enrollment.id.clone(),
        course_id: enrollment.course_id.clone(),
    }];
    facts::record(&mut tx, &produced, now).await?;
    tx.commit().await?;

    let kind = if terms.is_paid() { "paid" } else { "free" };
    metrics::counter!(crate::core::metrics::ENROLLMENTS_TOTAL, "kind" => kind).increment(1);

    Ok(Outcome::new(enrollment, produced))
}

/// Free-enrollment entry point; a priced course fails with `NotFree`.
pub(crate) async fn enroll_free(
    state: &AppState,
    user: &User,
    course_id: &str,
) -> Result<Outcome<Enrollment>, LearningError> {
    enroll(state, user, course_id, None).await
}

/// Moves an active enrollment to canceled. Payment state is left alone.
pub(crate) async fn cancel(
    state: &AppState,
    actor: &User,
    enrollment_id: &str,
) -> Result<Enrollment, LearningError> {
    let mut tx = state.db().begin().await?;

    let enrollment = repositories::enrollments::lock_by_id(&mut *tx, enrollment_id)
        .await?
        .ok_or(LearningError::NotFound("enrollment"))?;

    if !access::can_cancel(actor, &enrollment) {
        return Err(LearningError::Unauthorized);
    }
    if enrollment.status != EnrollmentStatus::Active {
        return Err(LearningError::NotActive);
    }

    let canceled =
        repositories::enrollments::mark_canceled(&mut *tx, &enrollment.id, state.clock().now())
            .await?;
    tx.commit().await?;

    Ok(canceled)
}
