use std::sync::OnceLock;

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::core::config::Settings;

static PROM_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

pub(crate) const ENROLLMENTS_TOTAL: &str = "enrollments_total";
pub(crate) const LESSON_COMPLETIONS_TOTAL: &str = "lesson_completions_total";
pub(crate) const COURSE_COMPLETIONS_TOTAL: &str = "course_completions_total";
pub(crate) const MODERATION_DECISIONS_TOTAL: &str = "moderation_decisions_total";
pub(crate) const FACTS_DISPATCHED_TOTAL: &str = "facts_dispatched_total";

pub(crate) fn init(settings: &Settings) -> anyhow::Result<()> {
    if !settings.telemetry().prometheus_enabled {
        return Ok(());
    }

    if PROM_HANDLE.get().is_some() {
        return Ok(());
    }

    let handle = PrometheusBuilder::new().install_recorder()?;
    let _ = PROM_HANDLE.set(handle);
    describe();
    Ok(())
}

pub(crate) fn render() -> Option<String> {
    PROM_HANDLE.get().map(|handle| handle.render())
}

fn describe() {
    metrics::describe_counter!(ENROLLMENTS_TOTAL, "Enrollments created, by kind (free|paid)");
    metrics::describe_counter!(
        LESSON_COMPLETIONS_TOTAL,
        "Lessons that crossed the completion threshold"
    );
    metrics::describe_counter!(COURSE_COMPLETIONS_TOTAL, "Course completion rows created");
    metrics::describe_counter!(
        MODERATION_DECISIONS_TOTAL,
        "Moderation reviews resolved, by decision"
    );
    metrics::describe_counter!(FACTS_DISPATCHED_TOTAL, "Outbox facts handed to the notifier");
}
