use serde::{Deserialize, Serialize};
use sqlx::PgConnection;

use crate::db::types::{ReviewStatus, SubjectType};
use crate::repositories;

/// Something that happened in the learning core, handed to the notifier through the outbox.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub(crate) enum Fact {
    EnrollmentCreated {
        user_id: String,
        enrollment_id: String,
        course_id: String,
    },
    ProgressUpdated {
        user_id: String,
        lesson_id: String,
        course_id: String,
        percentage: i32,
        position: i32,
    },
    CourseCompleted {
        user_id: String,
        course_id: String,
        course_title: String,
        /// RFC 3339, UTC.
        completed_at: String,
    },
    CertificateIssued {
        certificate_id: String,
        user_id: String,
    },
    ReviewResolved {
        review_id: String,
        subject_type: SubjectType,
        subject_id: String,
        status: ReviewStatus,
        submitted_by: String,
    },
}

impl Fact {
    pub(crate) fn kind(&self) -> &'static str {
        match self {
            Self::EnrollmentCreated { .. } => "enrollment_created",
            Self::ProgressUpdated { .. } => "progress_updated",
            Self::CourseCompleted { .. } => "course_completed",
            Self::CertificateIssued { .. } => "certificate_issued",
            Self::ReviewResolved { .. } => "review_resolved",
        }
    }
}

/// Result of a core operation together with the facts it produced.
#[derive(Debug)]
pub(crate) struct Outcome<T> {
    pub(crate) value: T,
    pub(crate) facts: Vec<Fact>,
}

impl<T> Outcome<T> {
    pub(crate) fn new(value: T, facts: Vec<Fact>) -> Self {
        Self { value, facts }
    }
}

/// Appends facts to the outbox on the caller's connection, normally an open transaction, so
/// they commit or roll back together with the state change that produced them.
pub(crate) async fn record(
    conn: &mut PgConnection,
    facts: &[Fact],
    recorded_at: time::PrimitiveDateTime,
) -> Result<(), sqlx::Error> {
    for fact in facts {
        let payload =
            serde_json::to_value(fact).map_err(|err| sqlx::Error::Encode(Box::new(err)))?;
        repositories::fact_outbox::append(&mut *conn, fact.kind(), payload, recorded_at).await?;
    }
    Ok(())
}
