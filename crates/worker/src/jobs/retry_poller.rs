//! Local retry poller.
//!
//! A device that is awake schedules its own 10- and 30-minute retry
//! reminders when a dose fires. This poller is the server-side
//! backstop: it scans for pending doses inside the local retry window
//! whose due tier has not been recorded and pushes the reminder
//! through the device trigger relay.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio_util::sync::CancellationToken;

use careloop_core::escalation::{local_retry_due, local_retry_window, LocalRetry};
use careloop_core::messages::{self, ReminderKind};
use careloop_core::types::Timestamp;
use careloop_db::models::dose_event::{Guard, RetryCandidate};
use careloop_db::repositories::DoseEventRepo;
use careloop_db::DbPool;
use careloop_notify::{DeviceNotifier, ReminderTrigger};

use super::{JobError, Outcome, RunSummary};

// ---------------------------------------------------------------------------
// RetryPoller
// ---------------------------------------------------------------------------

/// Background service that schedules missed-dose retry reminders.
pub struct RetryPoller {
    pool: DbPool,
    notifier: Arc<dyn DeviceNotifier>,
    interval: Duration,
}

impl RetryPoller {
    pub fn new(pool: DbPool, notifier: Arc<dyn DeviceNotifier>, interval: Duration) -> Self {
        Self {
            pool,
            notifier,
            interval,
        }
    }

    /// Run the poller loop.
    ///
    /// Scans on every tick and exits when the provided
    /// [`CancellationToken`] is cancelled.
    pub async fn run(&self, cancel: CancellationToken) {
        let mut interval = tokio::time::interval(self.interval);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Retry poller cancelled");
                    break;
                }
                _ = interval.tick() => {
                    match self.run_once(Utc::now()).await {
                        Ok(summary) if summary.sent + summary.failed > 0 => {
                            tracing::info!(
                                sent = summary.sent,
                                failed = summary.failed,
                                "Retry scan complete"
                            );
                        }
                        Ok(_) => {}
                        Err(e) => tracing::error!(error = %e, "Retry scan failed"),
                    }
                }
            }
        }
    }

    /// Scan once at `now` and schedule every retry tier that is due.
    pub async fn run_once(&self, now: Timestamp) -> Result<RunSummary, sqlx::Error> {
        let (start, end) = local_retry_window(now);
        let candidates = DoseEventRepo::list_retry_candidates(&self.pool, start, end).await?;

        let mut summary = RunSummary::default();
        for candidate in &candidates {
            match self.process(candidate, now).await {
                Ok(Outcome::Sent) => summary.sent += 1,
                Ok(Outcome::Skipped) => summary.skipped += 1,
                Err(e) => {
                    tracing::warn!(
                        dose_id = candidate.dose_id,
                        error = %e,
                        "Retry reminder failed"
                    );
                    summary.failed += 1;
                }
            }
        }
        Ok(summary)
    }

    /// Schedule the due retry tier for one candidate.
    async fn process(
        &self,
        candidate: &RetryCandidate,
        now: Timestamp,
    ) -> Result<Outcome, JobError> {
        let Some(tier) = local_retry_due(candidate.scheduled_at, now) else {
            return Ok(Outcome::Skipped);
        };

        let (guard, kind, already_sent) = match tier {
            LocalRetry::First => (Guard::Retry1, ReminderKind::Retry1, candidate.retry_1_sent_at),
            LocalRetry::Second => {
                (Guard::Retry2, ReminderKind::Retry2, candidate.retry_2_sent_at)
            }
        };
        if already_sent.is_some() {
            return Ok(Outcome::Skipped);
        }

        let Some(device_token) = &candidate.device_token else {
            tracing::debug!(
                dose_id = candidate.dose_id,
                "Skipping retry: user has no registered device"
            );
            return Ok(Outcome::Skipped);
        };

        let trigger = ReminderTrigger {
            id: candidate.dose_id,
            device_token: device_token.clone(),
            title: messages::reminder_title(kind).to_string(),
            body: messages::reminder_body(kind, &candidate.medication_name, &candidate.dosage),
            fire_at: now,
            kind,
        };
        self.notifier.schedule(&trigger).await?;

        // The guard CAS re-checks that the dose is still pending and the
        // column unset. Losing it means a concurrent resolution or worker
        // got there first; the reminder went out either way.
        if !DoseEventRepo::mark_sent(&self.pool, candidate.dose_id, guard).await? {
            tracing::debug!(dose_id = candidate.dose_id, "Retry tier already recorded");
        }
        Ok(Outcome::Sent)
    }
}
