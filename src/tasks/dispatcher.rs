use anyhow::{Context, Result};
use time::Duration;

use crate::core::metrics::FACTS_DISPATCHED_TOTAL;
use crate::core::state::AppState;
use crate::db::models::OutboxRow;
use crate::repositories;
use crate::services::certificates;
use crate::services::facts::Fact;

const OUTBOX_RETENTION_DAYS: i64 = 7;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct DispatchReport {
    pub(crate) claimed: usize,
    pub(crate) dispatched: usize,
    pub(crate) failed: usize,
}

/// Delivers one batch of outbox facts. Rows stay locked until the batch commits, so parallel
/// workers never deliver the same row twice. A failure is recorded on the row and retried on a
/// later tick; the producing transaction is never involved.
pub(crate) async fn dispatch_pending_facts(state: &AppState) -> Result<DispatchReport> {
    let notifier = state.settings().notifier();

    let mut tx = state.db().begin().await.context("Failed to open outbox transaction")?;
    let rows = repositories::fact_outbox::claim_batch(
        &mut *tx,
        notifier.dispatch_batch,
        notifier.max_attempts,
    )
    .await
    .context("Failed to claim outbox facts")?;

    let mut report = DispatchReport { claimed: rows.len(), ..DispatchReport::default() };

    for row in &rows {
        match deliver(state, row).await {
            Ok(()) => {
                repositories::fact_outbox::mark_dispatched(&mut *tx, row.id, state.clock().now())
                    .await
                    .context("Failed to mark fact dispatched")?;
                metrics::counter!(FACTS_DISPATCHED_TOTAL, "fact" => row.fact_type.clone())
                    .increment(1);
                report.dispatched += 1;
            }
            Err(err) => {
                tracing::warn!(
                    outbox_id = row.id,
                    fact = %row.fact_type,
                    attempts = row.attempts + 1,
                    error = %err,
                    "Fact delivery failed"
                );
                repositories::fact_outbox::record_failure(&mut *tx, row.id, &format!("{err:#}"))
                    .await
                    .context("Failed to record fact delivery failure")?;
                report.failed += 1;
            }
        }
    }

    tx.commit().await.context("Failed to commit outbox batch")?;

    if report.claimed > 0 {
        tracing::info!(
            dispatched = report.dispatched,
            failed = report.failed,
            "Dispatched outbox facts"
        );
    }

    Ok(report)
}

/// Runs the worker-side reaction to a fact, then publishes it. Reactions are idempotent, so a
/// retry after a failed publish repeats nothing.
async fn deliver(state: &AppState, row: &OutboxRow) -> Result<()> {
    let fact: Fact =
        serde_json::from_value(row.payload.0.clone()).context("Malformed fact payload")?;

    if let Fact::CourseCompleted { user_id, course_id, completed_at, .. } = &fact {
        let issued =
            certificates::issue_for_completion(state, user_id, course_id, completed_at)
                .await
                .context("Failed to issue certificate")?;
        if let Some(certificate) = issued.value {
            tracing::info!(
                certificate_id = %certificate.id,
                user_id = %certificate.user_id,
                course_id = %certificate.course_id,
                "Certificate issued"
            );
        }
    }

    let payload = serde_json::to_string(&fact).context("Failed to encode fact")?;
    let receivers = state
        .redis()
        .publish(&state.settings().notifier().facts_channel, &payload)
        .await
        .context("Failed to publish fact")?;
    tracing::debug!(outbox_id = row.id, fact = fact.kind(), receivers, "Fact published");

    Ok(())
}

pub(crate) async fn prune_dispatched_facts(state: &AppState) -> Result<u64> {
    let cutoff = state.clock().now() - Duration::days(OUTBOX_RETENTION_DAYS);
    let removed = repositories::fact_outbox::prune_dispatched_before(state.db(), cutoff)
        .await
        .context("Failed to prune dispatched facts")?;

    if removed > 0 {
        tracing::info!(removed, "Pruned dispatched outbox facts");
    }

    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::types::UserRole;
    use crate::services::{enrollment, progress};
    use crate::test_support;

    #[tokio::test]
    async fn completion_fact_issues_certificate_once() {
        let ctx = test_support::setup_test_context().await;
        let pool = ctx.state.db();

        let author = test_support::insert_user(pool, "author80", UserRole::Instructor).await;
        let student = test_support::insert_user(pool, "student80", UserRole::Student).await;
        let course = test_support::insert_course(pool, &author.id, None, true).await;
        let lesson = test_support::insert_lesson(pool, &course.id, 1, true, false).await;
        enrollment::enroll_free(&ctx.state, &student, &course.id).await.expect("enroll");
        progress::record_progress(&ctx.state, &student, &lesson.id, 100, 600)
            .await
            .expect("progress");

        let first = dispatch_pending_facts(&ctx.state).await.expect("dispatch");
        assert_eq!(first, DispatchReport { claimed: 3, dispatched: 3, failed: 0 });

        let certificate =
            repositories::certificates::find_for_user_course(pool, &student.id, &course.id)
                .await
                .expect("find")
                .expect("certificate");
        assert_eq!(certificate.verification_code.len(), 16);

        let pending = repositories::fact_outbox::list_pending(pool).await.expect("pending");
        assert_eq!(pending, vec![("certificate_issued".to_string(), 0)]);

        let second = dispatch_pending_facts(&ctx.state).await.expect("dispatch again");
        assert_eq!(second, DispatchReport { claimed: 1, dispatched: 1, failed: 0 });

        let idle = dispatch_pending_facts(&ctx.state).await.expect("idle dispatch");
        assert_eq!(idle, DispatchReport::default());
    }

    #[tokio::test]
    async fn publish_failure_leaves_fact_for_retry() {
        let ctx = test_support::setup_test_context().await;
        let pool = ctx.state.db();

        let author = test_support::insert_user(pool, "author81", UserRole::Instructor).await;
        let student = test_support::insert_user(pool, "student81", UserRole::Student).await;
        let course = test_support::insert_course(pool, &author.id, None, true).await;
        enrollment::enroll_free(&ctx.state, &student, &course.id).await.expect("enroll");

        ctx.state.redis().disconnect().await;
        let report = dispatch_pending_facts(&ctx.state).await.expect("dispatch");
        assert_eq!(report, DispatchReport { claimed: 1, dispatched: 0, failed: 1 });

        let pending = repositories::fact_outbox::list_pending(pool).await.expect("pending");
        assert_eq!(pending, vec![("enrollment_created".to_string(), 1)]);

        let active = repositories::enrollments::count_active(pool, &student.id, &course.id)
            .await
            .expect("count");
        assert_eq!(active, 1);
    }

    #[tokio::test]
    async fn exhausted_rows_are_skipped() {
        let ctx = test_support::setup_test_context().await;
        let pool = ctx.state.db();

        let author = test_support::insert_user(pool, "author82", UserRole::Instructor).await;
        let student = test_support::insert_user(pool, "student82", UserRole::Student).await;
        let course = test_support::insert_course(pool, &author.id, None, true).await;
        enrollment::enroll_free(&ctx.state, &student, &course.id).await.expect("enroll");

        ctx.state.redis().disconnect().await;
        let max_attempts = ctx.state.settings().notifier().max_attempts;
        for _ in 0..max_attempts {
            dispatch_pending_facts(&ctx.state).await.expect("dispatch");
        }

        let report = dispatch_pending_facts(&ctx.state).await.expect("dispatch");
        assert_eq!(report.claimed, 0);
        let pending = repositories::fact_outbox::list_pending(pool).await.expect("pending");
        assert_eq!(pending, vec![("enrollment_created".to_string(), max_attempts)]);
    }
}
