//! Caregiver escalation.
//!
//! Once a critical dose has sat unconfirmed past the escalation cutoff
//! and the caregiver has consented, every configured channel that has
//! not yet gone out is attempted: SMS, email, and (when enabled) a
//! voice call. Channels fail independently; an SMS outage never blocks
//! the email. Caregiver copy deliberately names only the patient's
//! first name, never the medication.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio_util::sync::CancellationToken;

use careloop_core::escalation::EscalationPolicy;
use careloop_core::messages;
use careloop_core::phone::to_e164;
use careloop_core::types::{DbId, Timestamp};
use careloop_db::models::dose_event::{CaregiverCandidate, Guard};
use careloop_db::repositories::DoseEventRepo;
use careloop_db::DbPool;
use careloop_notify::{EmailGateway, SmsGateway, VoiceGateway};

use super::{JobError, Outcome, RunSummary};

// ---------------------------------------------------------------------------
// CaregiverEscalation
// ---------------------------------------------------------------------------

/// Background service that notifies caregivers about overdue critical doses.
///
/// Channels are optional; a gateway that is not attached simply never
/// sends. Voice additionally requires `voice_calls_enabled` on the
/// policy.
pub struct CaregiverEscalation {
    pool: DbPool,
    policy: EscalationPolicy,
    sms: Option<Arc<dyn SmsGateway>>,
    email: Option<Arc<dyn EmailGateway>>,
    voice: Option<Arc<dyn VoiceGateway>>,
    interval: Duration,
}

impl CaregiverEscalation {
    pub fn new(pool: DbPool, policy: EscalationPolicy, interval: Duration) -> Self {
        Self {
            pool,
            policy,
            sms: None,
            email: None,
            voice: None,
            interval,
        }
    }

    pub fn with_sms(mut self, gateway: Arc<dyn SmsGateway>) -> Self {
        self.sms = Some(gateway);
        self
    }

    pub fn with_email(mut self, gateway: Arc<dyn EmailGateway>) -> Self {
        self.email = Some(gateway);
        self
    }

    pub fn with_voice(mut self, gateway: Arc<dyn VoiceGateway>) -> Self {
        self.voice = Some(gateway);
        self
    }

    /// Run the escalation loop until cancelled.
    pub async fn run(&self, cancel: CancellationToken) {
        let mut interval = tokio::time::interval(self.interval);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Caregiver escalation cancelled");
                    break;
                }
                _ = interval.tick() => {
                    match self.run_once(Utc::now()).await {
                        Ok(summary) if summary.sent + summary.failed > 0 => {
                            tracing::info!(
                                sent = summary.sent,
                                failed = summary.failed,
                                "Caregiver scan complete"
                            );
                        }
                        Ok(_) => {}
                        Err(e) => tracing::error!(error = %e, "Caregiver scan failed"),
                    }
                }
            }
        }
    }

    /// Scan once at `now` and notify every outstanding channel.
    pub async fn run_once(&self, now: Timestamp) -> Result<RunSummary, sqlx::Error> {
        let cutoff = self.policy.caregiver_cutoff(now);
        let candidates = DoseEventRepo::list_caregiver_candidates(
            &self.pool,
            cutoff,
            self.policy.voice_calls_enabled,
        )
        .await?;

        let mut summary = RunSummary::default();
        for candidate in &candidates {
            self.escalate(candidate, &mut summary).await;
        }
        Ok(summary)
    }

    /// Attempt every outstanding channel for one overdue dose.
    async fn escalate(&self, candidate: &CaregiverCandidate, summary: &mut RunSummary) {
        if candidate.caregiver_sms_sent_at.is_none() {
            tally(
                self.send_sms(candidate).await,
                candidate.dose_id,
                "sms",
                summary,
            );
        }
        if candidate.caregiver_email_sent_at.is_none() {
            tally(
                self.send_email(candidate).await,
                candidate.dose_id,
                "email",
                summary,
            );
        }
        if self.policy.voice_calls_enabled && candidate.caregiver_call_sent_at.is_none() {
            tally(
                self.place_call(candidate).await,
                candidate.dose_id,
                "voice",
                summary,
            );
        }
    }

    async fn send_sms(&self, candidate: &CaregiverCandidate) -> Result<Outcome, JobError> {
        let (Some(gateway), Some(phone)) = (&self.sms, &candidate.caregiver_phone) else {
            return Ok(Outcome::Skipped);
        };
        let Some(to) = to_e164(phone) else {
            tracing::warn!(
                dose_id = candidate.dose_id,
                "Skipping caregiver SMS: stored phone number is unparseable"
            );
            return Ok(Outcome::Skipped);
        };

        gateway
            .send_sms(&to, &messages::caregiver_sms(&candidate.first_name))
            .await?;

        if !DoseEventRepo::mark_sent(&self.pool, candidate.dose_id, Guard::CaregiverSms).await? {
            tracing::debug!(dose_id = candidate.dose_id, "Caregiver SMS already recorded");
        }
        Ok(Outcome::Sent)
    }

    async fn send_email(&self, candidate: &CaregiverCandidate) -> Result<Outcome, JobError> {
        let (Some(gateway), Some(address)) = (&self.email, &candidate.caregiver_email) else {
            return Ok(Outcome::Skipped);
        };

        let subject = messages::caregiver_email_subject(&candidate.first_name);
        let body = messages::caregiver_email_body(&candidate.first_name);
        gateway.send_email(address, &subject, &body).await?;

        if !DoseEventRepo::mark_sent(&self.pool, candidate.dose_id, Guard::CaregiverEmail).await? {
            tracing::debug!(dose_id = candidate.dose_id, "Caregiver email already recorded");
        }
        Ok(Outcome::Sent)
    }

    async fn place_call(&self, candidate: &CaregiverCandidate) -> Result<Outcome, JobError> {
        let (Some(gateway), Some(phone)) = (&self.voice, &candidate.caregiver_phone) else {
            return Ok(Outcome::Skipped);
        };
        let Some(to) = to_e164(phone) else {
            tracing::warn!(
                dose_id = candidate.dose_id,
                "Skipping caregiver call: stored phone number is unparseable"
            );
            return Ok(Outcome::Skipped);
        };

        gateway
            .place_call(&to, &messages::caregiver_call_script(&candidate.first_name))
            .await?;

        if !DoseEventRepo::mark_sent(&self.pool, candidate.dose_id, Guard::CaregiverCall).await? {
            tracing::debug!(dose_id = candidate.dose_id, "Caregiver call already recorded");
        }
        Ok(Outcome::Sent)
    }
}

/// Fold one channel attempt into the scan counters.
fn tally(
    outcome: Result<Outcome, JobError>,
    dose_id: DbId,
    channel: &'static str,
    summary: &mut RunSummary,
) {
    match outcome {
        Ok(Outcome::Sent) => summary.sent += 1,
        Ok(Outcome::Skipped) => summary.skipped += 1,
        Err(e) => {
            tracing::warn!(dose_id, channel, error = %e, "Caregiver notification failed");
            summary.failed += 1;
        }
    }
}
