use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::guards::{CurrentAdmin, CurrentUser};
use crate::api::handlers::trace_facts;
use crate::api::pagination::{clamp_limit, PaginatedResponse};
use crate::core::state::AppState;
use crate::repositories;
use crate::schemas::moderation::{
    ReviewApprove, ReviewListQuery, ReviewReject, ReviewResponse, ReviewSubmit,
};
use crate::services::moderation::{self, ModerationSubject};

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/reviews", post(submit).get(list_reviews))
        .route("/reviews/:review_id", get(get_review))
        .route("/reviews/:review_id/approve", post(approve))
        .route("/reviews/:review_id/reject", post(reject))
}

async fn submit(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(payload): Json<ReviewSubmit>,
) -> Result<(StatusCode, Json<ReviewResponse>), ApiError> {
    let subject = ModerationSubject::from_parts(payload.subject_type, payload.subject_id);
    let outcome =
        moderation::submit(&state, &user, &subject, payload.notes.as_deref()).await?;

    tracing::info!(
        action = "moderation.submit",
        actor_id = %user.id,
        review_id = %outcome.value.id,
        subject_type = subject.subject_type().as_str(),
        subject_id = %subject.id(),
        "Submitted for review"
    );

    Ok((StatusCode::CREATED, Json(ReviewResponse::from_db(outcome.value))))
}

async fn list_reviews(
    State(state): State<AppState>,
    CurrentAdmin(_admin): CurrentAdmin,
    Query(query): Query<ReviewListQuery>,
) -> Result<Json<PaginatedResponse<ReviewResponse>>, ApiError> {
    let skip = query.skip.max(0);
    let limit = clamp_limit(query.limit);

    let reviews =
        repositories::moderation_reviews::list_by_status(state.db(), query.status, skip, limit)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to list reviews"))?;
    let total_count = repositories::moderation_reviews::count_by_status(state.db(), query.status)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to count reviews"))?;

    Ok(Json(PaginatedResponse {
        items: reviews.into_iter().map(ReviewResponse::from_db).collect(),
        total_count,
        skip,
        limit,
    }))
}

async fn get_review(
    Path(review_id): Path<String>,
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<ReviewResponse>, ApiError> {
    let review = repositories::moderation_reviews::find_by_id(state.db(), &review_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load review"))?
        .ok_or_else(|| ApiError::NotFound("Review not found".to_string()))?;

    if !(user.is_admin() || review.submitted_by == user.id) {
        return Err(ApiError::NotFound("Review not found".to_string()));
    }

    Ok(Json(ReviewResponse::from_db(review)))
}

async fn approve(
    Path(review_id): Path<String>,
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    payload: Option<Json<ReviewApprove>>,
) -> Result<Json<ReviewResponse>, ApiError> {
    let Json(payload) = payload.unwrap_or_default();
    let outcome =
        moderation::approve(&state, &user, &review_id, payload.notes.as_deref()).await?;

    tracing::info!(
        action = "moderation.approve",
        actor_id = %user.id,
        review_id = %outcome.value.id,
        subject_type = outcome.value.subject_type.as_str(),
        subject_id = %outcome.value.subject_id,
        "Review approved"
    );
    trace_facts(&outcome.facts);

    Ok(Json(ReviewResponse::from_db(outcome.value)))
}

async fn reject(
    Path(review_id): Path<String>,
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(payload): Json<ReviewReject>,
) -> Result<Json<ReviewResponse>, ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let outcome = moderation::reject(&state, &user, &review_id, payload.reason.trim()).await?;

    tracing::info!(
        action = "moderation.reject",
        actor_id = %user.id,
        review_id = %outcome.value.id,
        subject_type = outcome.value.subject_type.as_str(),
        subject_id = %outcome.value.subject_id,
        "Review rejected"
    );
    trace_facts(&outcome.facts);

    Ok(Json(ReviewResponse::from_db(outcome.value)))
}
