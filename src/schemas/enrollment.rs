use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::core::time::format_primitive;
use crate::db::models::Enrollment;
use crate::db::types::EnrollmentStatus;

/// Confirmed payment forwarded by the payment boundary.
#[derive(Debug, Deserialize, Validate)]
pub(crate) struct PaidEnrollmentCreate {
    #[serde(alias = "userId")]
    pub(crate) user_id: String,
    #[serde(alias = "courseId")]
    pub(crate) course_id: String,
    #[serde(alias = "paymentId")]
    #[validate(length(min = 1, message = "payment_id must not be empty"))]
    pub(crate) payment_id: String,
    #[serde(alias = "amountCents")]
    #[validate(range(min = 0, message = "amount_cents must be non-negative"))]
    pub(crate) amount_cents: i64,
    #[validate(length(equal = 3, message = "currency must be a 3-letter code"))]
    pub(crate) currency: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct EnrollmentResponse {
    pub(crate) id: String,
    pub(crate) user_id: String,
    pub(crate) course_id: String,
    pub(crate) status: EnrollmentStatus,
    pub(crate) paid_amount_cents: Option<i64>,
    pub(crate) currency: Option<String>,
    pub(crate) payment_id: Option<String>,
    pub(crate) enrolled_at: String,
    pub(crate) canceled_at: Option<String>,
}

impl EnrollmentResponse {
    pub(crate) fn from_db(enrollment: Enrollment) -> Self {
        Self {
            id: enrollment.id,
            user_id: enrollment.user_id,
            course_id: enrollment.course_id,
            status: enrollment.status,
            paid_amount_cents: enrollment.paid_amount_cents,
            currency: enrollment.currency,
            payment_id: enrollment.payment_id,
            enrolled_at: format_primitive(enrollment.enrolled_at),
            canceled_at: enrollment.canceled_at.map(format_primitive),
        }
    }
}
