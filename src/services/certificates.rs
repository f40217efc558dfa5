use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::core::state::AppState;
use crate::db::models::Certificate;
use crate::repositories;
use crate::repositories::certificates::IssueCertificate;
use crate::services::facts::{self, Fact, Outcome};

const VERIFICATION_CODE_LEN: usize = 16;

/// Stable per completion: the same (user, course, completed_at) always yields the same code.
pub(crate) fn verification_code(user_id: &str, course_id: &str, completed_at: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(format!("{user_id}:{course_id}:{completed_at}").as_bytes());
    let mut code = hex::encode(hasher.finalize());
    code.truncate(VERIFICATION_CODE_LEN);
    code
}

/// Issues the certificate for a recorded course completion. Re-processing the same completion
/// returns `None` and records nothing.
pub(crate) async fn issue_for_completion(
    state: &AppState,
    user_id: &str,
    course_id: &str,
    completed_at: &str,
) -> Result<Outcome<Option<Certificate>>, sqlx::Error> {
    let now = state.clock().now();
    let code = verification_code(user_id, course_id, completed_at);

    let mut tx = state.db().begin().await?;
    let issued = repositories::certificates::insert_if_absent(
        &mut *tx,
        IssueCertificate {
            id: &Uuid::new_v4().to_string(),
            user_id,
            course_id,
            verification_code: &code,
            issued_at: now,
        },
    )
    .await?;

    let produced = match &issued {
        Some(certificate) => vec![Fact::CertificateIssued {
            certificate_id: certificate.id.clone(),
            user_id: certificate.user_id.clone(),
        }],
        None => Vec::new(),
    };
    facts::record(&mut tx, &produced, now).await?;
    tx.commit().await?;

    Ok(Outcome::new(issued, produced))
}
