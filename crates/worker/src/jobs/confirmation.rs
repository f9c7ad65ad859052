//! Confirmation SMS dispatcher.
//!
//! Critical doses get one SMS shortly after their scheduled time asking
//! the patient to reply TAKEN or SKIP. The scan window reaches a few
//! minutes behind and ahead of now so whichever run lands inside it
//! picks the dose up; the sent guard keeps the message to one per dose.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio_util::sync::CancellationToken;

use careloop_core::escalation::confirmation_window;
use careloop_core::messages;
use careloop_core::phone::to_e164;
use careloop_core::types::Timestamp;
use careloop_db::models::dose_event::{ConfirmationCandidate, Guard};
use careloop_db::repositories::DoseEventRepo;
use careloop_db::DbPool;
use careloop_notify::SmsGateway;

use super::{JobError, Outcome, RunSummary};

// ---------------------------------------------------------------------------
// ConfirmationDispatcher
// ---------------------------------------------------------------------------

/// Background service that sends reply-to-confirm SMS for critical doses.
pub struct ConfirmationDispatcher {
    pool: DbPool,
    sms: Arc<dyn SmsGateway>,
    interval: Duration,
}

impl ConfirmationDispatcher {
    pub fn new(pool: DbPool, sms: Arc<dyn SmsGateway>, interval: Duration) -> Self {
        Self {
            pool,
            sms,
            interval,
        }
    }

    /// Run the dispatcher loop until cancelled.
    pub async fn run(&self, cancel: CancellationToken) {
        let mut interval = tokio::time::interval(self.interval);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Confirmation dispatcher cancelled");
                    break;
                }
                _ = interval.tick() => {
                    match self.run_once(Utc::now()).await {
                        Ok(summary) if summary.sent + summary.failed > 0 => {
                            tracing::info!(
                                sent = summary.sent,
                                failed = summary.failed,
                                "Confirmation scan complete"
                            );
                        }
                        Ok(_) => {}
                        Err(e) => tracing::error!(error = %e, "Confirmation scan failed"),
                    }
                }
            }
        }
    }

    /// Scan once at `now` and send every outstanding confirmation SMS.
    pub async fn run_once(&self, now: Timestamp) -> Result<RunSummary, sqlx::Error> {
        let (start, end) = confirmation_window(now);
        let candidates =
            DoseEventRepo::list_confirmation_candidates(&self.pool, start, end).await?;

        let mut summary = RunSummary::default();
        for candidate in &candidates {
            match self.process(candidate).await {
                Ok(Outcome::Sent) => summary.sent += 1,
                Ok(Outcome::Skipped) => summary.skipped += 1,
                Err(e) => {
                    tracing::warn!(
                        dose_id = candidate.dose_id,
                        error = %e,
                        "Confirmation SMS failed"
                    );
                    summary.failed += 1;
                }
            }
        }
        Ok(summary)
    }

    /// Send the confirmation SMS for one candidate.
    ///
    /// A user without a resolvable phone number is logged and skipped;
    /// the guard stays unset and the dose simply ages out of the window.
    async fn process(&self, candidate: &ConfirmationCandidate) -> Result<Outcome, JobError> {
        let Some(phone) = &candidate.phone else {
            tracing::warn!(
                dose_id = candidate.dose_id,
                "Skipping confirmation SMS: user has no phone number"
            );
            return Ok(Outcome::Skipped);
        };
        let Some(to) = to_e164(phone) else {
            tracing::warn!(
                dose_id = candidate.dose_id,
                "Skipping confirmation SMS: stored phone number is unparseable"
            );
            return Ok(Outcome::Skipped);
        };

        let body = messages::confirmation_sms(&candidate.medication_name, &candidate.dosage);
        self.sms.send_sms(&to, &body).await?;

        if !DoseEventRepo::mark_sent(&self.pool, candidate.dose_id, Guard::ConfirmationSms).await? {
            tracing::debug!(dose_id = candidate.dose_id, "Confirmation already recorded");
        }
        Ok(Outcome::Sent)
    }
}
