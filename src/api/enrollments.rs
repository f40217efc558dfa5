use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::guards::{CurrentAdmin, CurrentUser};
use crate::api::handlers::trace_facts;
use crate::core::state::AppState;
use crate::repositories;
use crate::schemas::enrollment::{EnrollmentResponse, PaidEnrollmentCreate};
use crate::services::enrollment::{self, PaymentConfirmation};

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_own))
        .route("/paid", post(enroll_paid))
        .route("/:enrollment_id/cancel", post(cancel))
}

async fn list_own(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<Vec<EnrollmentResponse>>, ApiError> {
    let enrollments = repositories::enrollments::list_for_user(state.db(), &user.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list enrollments"))?;

    Ok(Json(enrollments.into_iter().map(EnrollmentResponse::from_db).collect()))
}

/// Called by the payment boundary once a payment has been verified.
async fn enroll_paid(
    State(state): State<AppState>,
    CurrentAdmin(admin): CurrentAdmin,
    Json(payload): Json<PaidEnrollmentCreate>,
) -> Result<(StatusCode, Json<EnrollmentResponse>), ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let student = repositories::users::find_by_id(state.db(), &payload.user_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load user"))?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    let payment = PaymentConfirmation {
        payment_id: payload.payment_id,
        amount_cents: payload.amount_cents,
        currency: payload.currency.to_ascii_lowercase(),
    };

    let outcome = enrollment::enroll(&state, &student, &payload.course_id, Some(&payment)).await?;
    let recorded = &outcome.value;

    if !payment.matches_charge(recorded.paid_amount_cents, recorded.currency.as_deref()) {
        tracing::warn!(
            enrollment_id = %recorded.id,
            payment_id = %payment.payment_id,
            reported_amount_cents = payment.amount_cents,
            reported_currency = %payment.currency,
            recorded_amount_cents = ?recorded.paid_amount_cents,
            "Payment amount differs from course price"
        );
    }

    tracing::info!(
        action = "enrollment.paid",
        actor_id = %admin.id,
        enrollment_id = %recorded.id,
        user_id = %recorded.user_id,
        "Paid enrollment recorded"
    );
    trace_facts(&outcome.facts);

    Ok((StatusCode::CREATED, Json(EnrollmentResponse::from_db(outcome.value))))
}

async fn cancel(
    Path(enrollment_id): Path<String>,
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<EnrollmentResponse>, ApiError> {
    let canceled = enrollment::cancel(&state, &user, &enrollment_id).await?;

    tracing::info!(
        action = "enrollment.cancel",
        actor_id = %user.id,
        enrollment_id = %canceled.id,
        course_id = %canceled.course_id,
        "Enrollment canceled"
    );

    Ok(Json(EnrollmentResponse::from_db(canceled)))
}
