use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::core::time::format_primitive;
use crate::db::models::ModerationReview;
use crate::db::types::{ReviewStatus, SubjectType};

#[derive(Debug, Deserialize)]
pub(crate) struct ReviewSubmit {
    #[serde(alias = "subjectType")]
    pub(crate) subject_type: SubjectType,
    #[serde(alias = "subjectId")]
    pub(crate) subject_id: String,
    #[serde(default)]
    pub(crate) notes: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ReviewApprove {
    #[serde(default)]
    pub(crate) notes: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct ReviewReject {
    #[validate(length(min = 1, message = "reason must not be empty"))]
    pub(crate) reason: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ReviewListQuery {
    #[serde(default = "default_status")]
    pub(crate) status: ReviewStatus,
    #[serde(default)]
    pub(crate) skip: i64,
    #[serde(default = "crate::api::pagination::default_limit")]
    pub(crate) limit: i64,
}

fn default_status() -> ReviewStatus {
    ReviewStatus::Pending
}

#[derive(Debug, Serialize)]
pub(crate) struct ReviewResponse {
    pub(crate) id: String,
    pub(crate) subject_type: SubjectType,
    pub(crate) subject_id: String,
    pub(crate) status: ReviewStatus,
    pub(crate) submitted_by: String,
    pub(crate) reviewer_id: Option<String>,
    pub(crate) notes: Option<String>,
    pub(crate) updated_at: String,
}

impl ReviewResponse {
    pub(crate) fn from_db(review: ModerationReview) -> Self {
        Self {
            id: review.id,
            subject_type: review.subject_type,
            subject_id: review.subject_id,
            status: review.status,
            submitted_by: review.submitted_by,
            reviewer_id: review.reviewer_id,
            notes: review.notes,
            updated_at: format_primitive(review.updated_at),
        }
    }
}
