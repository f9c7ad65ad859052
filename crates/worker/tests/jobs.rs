//! Integration tests for the escalation jobs.
//!
//! Each job runs against a real database with recording gateway
//! doubles, driven through `run_once` at a fixed instant so the window
//! arithmetic is deterministic.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use sqlx::PgPool;

use careloop_core::escalation::EscalationPolicy;
use careloop_core::messages::ReminderKind;
use careloop_core::types::DbId;
use careloop_db::models::dose_event::{CreateDoseEvent, DoseEvent};
use careloop_db::models::medication::CreateMedication;
use careloop_db::models::user::CreateUser;
use careloop_db::repositories::{DoseEventRepo, MedicationRepo, UserRepo};
use careloop_notify::{
    DeviceNotifier, EmailGateway, NotifyError, ReminderTrigger, SmsGateway, VoiceGateway,
};
use careloop_worker::jobs::{CaregiverEscalation, ConfirmationDispatcher, RetryPoller};

// ---------------------------------------------------------------------------
// Recording gateway doubles
// ---------------------------------------------------------------------------

fn gateway_down(detail: &str) -> NotifyError {
    NotifyError::Gateway {
        status: 503,
        detail: detail.to_string(),
    }
}

#[derive(Default)]
struct RecordingNotifier {
    scheduled: Mutex<Vec<ReminderTrigger>>,
    fail: AtomicBool,
}

#[async_trait]
impl DeviceNotifier for RecordingNotifier {
    async fn schedule(&self, trigger: &ReminderTrigger) -> Result<(), NotifyError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(gateway_down("relay down"));
        }
        self.scheduled.lock().unwrap().push(trigger.clone());
        Ok(())
    }

    async fn cancel(&self, _dose_id: DbId) -> Result<(), NotifyError> {
        Ok(())
    }
}

#[derive(Default)]
struct RecordingSms {
    sent: Mutex<Vec<(String, String)>>,
    fail: AtomicBool,
}

#[async_trait]
impl SmsGateway for RecordingSms {
    async fn send_sms(&self, to: &str, body: &str) -> Result<(), NotifyError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(gateway_down("sms down"));
        }
        self.sent
            .lock()
            .unwrap()
            .push((to.to_string(), body.to_string()));
        Ok(())
    }
}

#[derive(Default)]
struct RecordingEmail {
    sent: Mutex<Vec<(String, String, String)>>,
}

#[async_trait]
impl EmailGateway for RecordingEmail {
    async fn send_email(&self, to: &str, subject: &str, body: &str) -> Result<(), NotifyError> {
        self.sent
            .lock()
            .unwrap()
            .push((to.to_string(), subject.to_string(), body.to_string()));
        Ok(())
    }
}

#[derive(Default)]
struct RecordingVoice {
    calls: Mutex<Vec<(String, String)>>,
}

#[async_trait]
impl VoiceGateway for RecordingVoice {
    async fn place_call(&self, to: &str, script: &str) -> Result<(), NotifyError> {
        self.calls
            .lock()
            .unwrap()
            .push((to.to_string(), script.to_string()));
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Seed helpers
// ---------------------------------------------------------------------------

const TICK: StdDuration = StdDuration::from_secs(60);

async fn seed_user(pool: &PgPool, phone: Option<&str>, device_token: Option<&str>) -> i64 {
    UserRepo::create(
        pool,
        &CreateUser {
            first_name: "Ada".to_string(),
            phone: phone.map(str::to_string),
            device_token: device_token.map(str::to_string),
        },
    )
    .await
    .unwrap()
    .id
}

async fn seed_medication(
    pool: &PgPool,
    user_id: i64,
    is_critical: bool,
    caregiver_consent: bool,
) -> i64 {
    MedicationRepo::create(
        pool,
        &CreateMedication {
            user_id,
            name: "Metformin".to_string(),
            dosage: "500mg".to_string(),
            is_critical: Some(is_critical),
            caregiver_phone: Some("4045550100".to_string()),
            caregiver_email: Some("caregiver@example.com".to_string()),
            caregiver_consent: Some(caregiver_consent),
        },
    )
    .await
    .unwrap()
    .id
}

async fn seed_dose(
    pool: &PgPool,
    user_id: i64,
    medication_id: i64,
    scheduled_at: DateTime<Utc>,
) -> DoseEvent {
    DoseEventRepo::create(
        pool,
        &CreateDoseEvent {
            user_id,
            medication_id,
            scheduled_at,
        },
    )
    .await
    .unwrap()
}

async fn reload(pool: &PgPool, id: i64) -> DoseEvent {
    DoseEventRepo::find_by_id(pool, id).await.unwrap().unwrap()
}

// ---------------------------------------------------------------------------
// Retry poller
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_retry_poller_sends_first_then_second_tier(pool: PgPool) {
    let now = Utc::now();
    let user = seed_user(&pool, None, Some("tok-ada")).await;
    let med = seed_medication(&pool, user, false, false).await;
    let dose = seed_dose(&pool, user, med, now - Duration::minutes(15)).await;

    let notifier = Arc::new(RecordingNotifier::default());
    let poller = RetryPoller::new(pool.clone(), notifier.clone(), TICK);

    let summary = poller.run_once(now).await.unwrap();
    assert_eq!(summary.sent, 1);

    let scheduled = notifier.scheduled.lock().unwrap().clone();
    assert_eq!(scheduled.len(), 1);
    assert_eq!(scheduled[0].id, dose.id);
    assert_eq!(scheduled[0].kind, ReminderKind::Retry1);
    assert_eq!(scheduled[0].device_token, "tok-ada");
    assert!(scheduled[0].body.contains("Metformin"));

    let row = reload(&pool, dose.id).await;
    assert!(row.retry_1_sent_at.is_some());
    assert!(row.retry_2_sent_at.is_none());

    // Twenty minutes later the same dose crosses into the second tier.
    let summary = poller.run_once(now + Duration::minutes(20)).await.unwrap();
    assert_eq!(summary.sent, 1);

    let scheduled = notifier.scheduled.lock().unwrap().clone();
    assert_eq!(scheduled.len(), 2);
    assert_eq!(scheduled[1].kind, ReminderKind::Retry2);

    let row = reload(&pool, dose.id).await;
    assert!(row.retry_2_sent_at.is_some());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_retry_poller_second_run_is_noop(pool: PgPool) {
    let now = Utc::now();
    let user = seed_user(&pool, None, Some("tok-ada")).await;
    let med = seed_medication(&pool, user, false, false).await;
    seed_dose(&pool, user, med, now - Duration::minutes(15)).await;

    let notifier = Arc::new(RecordingNotifier::default());
    let poller = RetryPoller::new(pool.clone(), notifier.clone(), TICK);

    assert_eq!(poller.run_once(now).await.unwrap().sent, 1);
    let rerun = poller.run_once(now).await.unwrap();
    assert_eq!(rerun.sent, 0);
    assert_eq!(rerun.skipped, 1);
    assert_eq!(notifier.scheduled.lock().unwrap().len(), 1);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_retry_poller_respects_window_edges(pool: PgPool) {
    let now = Utc::now();
    let user = seed_user(&pool, None, Some("tok-ada")).await;
    let med = seed_medication(&pool, user, false, false).await;
    // Too fresh for any retry, and past the local cutoff.
    seed_dose(&pool, user, med, now - Duration::minutes(5)).await;
    let user2 = seed_user(&pool, None, Some("tok-two")).await;
    let med2 = seed_medication(&pool, user2, false, false).await;
    seed_dose(&pool, user2, med2, now - Duration::minutes(75)).await;

    let notifier = Arc::new(RecordingNotifier::default());
    let poller = RetryPoller::new(pool.clone(), notifier.clone(), TICK);

    let summary = poller.run_once(now).await.unwrap();
    assert_eq!(summary.sent, 0);
    assert!(notifier.scheduled.lock().unwrap().is_empty());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_retry_poller_skips_users_without_device(pool: PgPool) {
    let now = Utc::now();
    let user = seed_user(&pool, None, None).await;
    let med = seed_medication(&pool, user, false, false).await;
    let dose = seed_dose(&pool, user, med, now - Duration::minutes(15)).await;

    let notifier = Arc::new(RecordingNotifier::default());
    let poller = RetryPoller::new(pool.clone(), notifier.clone(), TICK);

    let summary = poller.run_once(now).await.unwrap();
    assert_eq!(summary.sent, 0);
    assert_eq!(summary.skipped, 1);
    assert!(reload(&pool, dose.id).await.retry_1_sent_at.is_none());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_retry_poller_failure_leaves_guard_unset(pool: PgPool) {
    let now = Utc::now();
    let user = seed_user(&pool, None, Some("tok-ada")).await;
    let med = seed_medication(&pool, user, false, false).await;
    let dose = seed_dose(&pool, user, med, now - Duration::minutes(15)).await;

    let notifier = Arc::new(RecordingNotifier::default());
    notifier.fail.store(true, Ordering::SeqCst);
    let poller = RetryPoller::new(pool.clone(), notifier.clone(), TICK);

    let summary = poller.run_once(now).await.unwrap();
    assert_eq!(summary.failed, 1);
    assert!(reload(&pool, dose.id).await.retry_1_sent_at.is_none());

    // Relay recovers; the next scan picks the dose up again.
    notifier.fail.store(false, Ordering::SeqCst);
    let summary = poller.run_once(now).await.unwrap();
    assert_eq!(summary.sent, 1);
    assert!(reload(&pool, dose.id).await.retry_1_sent_at.is_some());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_retry_poller_ignores_resolved_doses(pool: PgPool) {
    let now = Utc::now();
    let user = seed_user(&pool, None, Some("tok-ada")).await;
    let med = seed_medication(&pool, user, false, false).await;
    let dose = seed_dose(&pool, user, med, now - Duration::minutes(15)).await;
    DoseEventRepo::resolve(&pool, dose.id, careloop_core::dose::DoseStatus::Taken)
        .await
        .unwrap()
        .unwrap();

    let notifier = Arc::new(RecordingNotifier::default());
    let poller = RetryPoller::new(pool.clone(), notifier.clone(), TICK);

    let summary = poller.run_once(now).await.unwrap();
    assert_eq!(summary.sent + summary.skipped + summary.failed, 0);
    assert!(notifier.scheduled.lock().unwrap().is_empty());
}

// ---------------------------------------------------------------------------
// Confirmation dispatcher
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_confirmation_sms_sent_once(pool: PgPool) {
    let now = Utc::now();
    let user = seed_user(&pool, Some("7704018565"), None).await;
    let med = seed_medication(&pool, user, true, false).await;
    let dose = seed_dose(&pool, user, med, now - Duration::minutes(1)).await;

    let sms = Arc::new(RecordingSms::default());
    let dispatcher = ConfirmationDispatcher::new(pool.clone(), sms.clone(), TICK);

    let summary = dispatcher.run_once(now).await.unwrap();
    assert_eq!(summary.sent, 1);

    let sent = sms.sent.lock().unwrap().clone();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, "+17704018565");
    assert!(sent[0].1.contains("Metformin"));
    assert!(sent[0].1.contains("TAKEN"));
    assert!(sent[0].1.contains("SKIP"));
    assert!(reload(&pool, dose.id).await.confirmation_sms_sent_at.is_some());

    let rerun = dispatcher.run_once(now).await.unwrap();
    assert_eq!(rerun.sent, 0);
    assert_eq!(sms.sent.lock().unwrap().len(), 1);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_confirmation_skips_users_without_phone(pool: PgPool) {
    let now = Utc::now();
    let user = seed_user(&pool, None, None).await;
    let med = seed_medication(&pool, user, true, false).await;
    let dose = seed_dose(&pool, user, med, now - Duration::minutes(1)).await;

    let sms = Arc::new(RecordingSms::default());
    let dispatcher = ConfirmationDispatcher::new(pool.clone(), sms.clone(), TICK);

    let summary = dispatcher.run_once(now).await.unwrap();
    assert_eq!(summary.sent, 0);
    assert_eq!(summary.skipped, 1);
    assert!(sms.sent.lock().unwrap().is_empty());
    assert!(reload(&pool, dose.id).await.confirmation_sms_sent_at.is_none());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_confirmation_only_for_critical_medications(pool: PgPool) {
    let now = Utc::now();
    let user = seed_user(&pool, Some("7704018565"), None).await;
    let med = seed_medication(&pool, user, false, false).await;
    seed_dose(&pool, user, med, now - Duration::minutes(1)).await;

    let sms = Arc::new(RecordingSms::default());
    let dispatcher = ConfirmationDispatcher::new(pool.clone(), sms.clone(), TICK);

    let summary = dispatcher.run_once(now).await.unwrap();
    assert_eq!(summary.sent, 0);
    assert!(sms.sent.lock().unwrap().is_empty());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_confirmation_failure_retried_next_run(pool: PgPool) {
    let now = Utc::now();
    let user = seed_user(&pool, Some("7704018565"), None).await;
    let med = seed_medication(&pool, user, true, false).await;
    let dose = seed_dose(&pool, user, med, now - Duration::minutes(1)).await;

    let sms = Arc::new(RecordingSms::default());
    sms.fail.store(true, Ordering::SeqCst);
    let dispatcher = ConfirmationDispatcher::new(pool.clone(), sms.clone(), TICK);

    let summary = dispatcher.run_once(now).await.unwrap();
    assert_eq!(summary.failed, 1);
    assert!(reload(&pool, dose.id).await.confirmation_sms_sent_at.is_none());

    sms.fail.store(false, Ordering::SeqCst);
    let summary = dispatcher.run_once(now).await.unwrap();
    assert_eq!(summary.sent, 1);
    assert!(reload(&pool, dose.id).await.confirmation_sms_sent_at.is_some());
}

// ---------------------------------------------------------------------------
// Caregiver escalation
// ---------------------------------------------------------------------------

fn full_escalation(
    pool: &PgPool,
    policy: EscalationPolicy,
    sms: &Arc<RecordingSms>,
    email: &Arc<RecordingEmail>,
    voice: &Arc<RecordingVoice>,
) -> CaregiverEscalation {
    CaregiverEscalation::new(pool.clone(), policy, TICK)
        .with_sms(sms.clone())
        .with_email(email.clone())
        .with_voice(voice.clone())
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_caregiver_due_at_sixty_five_not_forty_five(pool: PgPool) {
    let now = Utc::now();
    let user = seed_user(&pool, None, None).await;
    let med = seed_medication(&pool, user, true, true).await;
    let dose = seed_dose(&pool, user, med, now - Duration::minutes(45)).await;

    let sms = Arc::new(RecordingSms::default());
    let email = Arc::new(RecordingEmail::default());
    let voice = Arc::new(RecordingVoice::default());
    let escalation = full_escalation(&pool, EscalationPolicy::default(), &sms, &email, &voice);

    // At forty-five minutes the dose is still in local retry territory.
    let summary = escalation.run_once(now).await.unwrap();
    assert_eq!(summary.sent, 0);
    assert!(sms.sent.lock().unwrap().is_empty());

    // Twenty minutes later it is past the hour cutoff.
    let summary = escalation.run_once(now + Duration::minutes(20)).await.unwrap();
    assert_eq!(summary.sent, 2); // SMS + email; voice disabled by default policy

    let sent = sms.sent.lock().unwrap().clone();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, "+14045550100");
    let emails = email.sent.lock().unwrap().clone();
    assert_eq!(emails.len(), 1);
    assert_eq!(emails[0].0, "caregiver@example.com");
    assert!(voice.calls.lock().unwrap().is_empty());

    let row = reload(&pool, dose.id).await;
    assert!(row.caregiver_sms_sent_at.is_some());
    assert!(row.caregiver_email_sent_at.is_some());
    assert!(row.caregiver_call_sent_at.is_none());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_caregiver_requires_consent(pool: PgPool) {
    let now = Utc::now();
    let user = seed_user(&pool, None, None).await;
    let med = seed_medication(&pool, user, true, false).await;
    seed_dose(&pool, user, med, now - Duration::minutes(90)).await;

    let sms = Arc::new(RecordingSms::default());
    let email = Arc::new(RecordingEmail::default());
    let voice = Arc::new(RecordingVoice::default());
    let escalation = full_escalation(&pool, EscalationPolicy::default(), &sms, &email, &voice);

    let summary = escalation.run_once(now).await.unwrap();
    assert_eq!(summary.sent, 0);
    assert!(sms.sent.lock().unwrap().is_empty());
    assert!(email.sent.lock().unwrap().is_empty());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_caregiver_channels_fail_independently(pool: PgPool) {
    let now = Utc::now();
    let user = seed_user(&pool, None, None).await;
    let med = seed_medication(&pool, user, true, true).await;
    let dose = seed_dose(&pool, user, med, now - Duration::minutes(90)).await;

    let sms = Arc::new(RecordingSms::default());
    sms.fail.store(true, Ordering::SeqCst);
    let email = Arc::new(RecordingEmail::default());
    let voice = Arc::new(RecordingVoice::default());
    let escalation = full_escalation(&pool, EscalationPolicy::default(), &sms, &email, &voice);

    let summary = escalation.run_once(now).await.unwrap();
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.sent, 1);

    let row = reload(&pool, dose.id).await;
    assert!(row.caregiver_sms_sent_at.is_none());
    assert!(row.caregiver_email_sent_at.is_some());

    // SMS recovers on the next pass; email is not re-sent.
    sms.fail.store(false, Ordering::SeqCst);
    let summary = escalation.run_once(now).await.unwrap();
    assert_eq!(summary.sent, 1);
    assert_eq!(email.sent.lock().unwrap().len(), 1);
    assert!(reload(&pool, dose.id).await.caregiver_sms_sent_at.is_some());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_caregiver_voice_gated_by_policy(pool: PgPool) {
    let now = Utc::now();
    let user = seed_user(&pool, None, None).await;
    let med = seed_medication(&pool, user, true, true).await;
    let dose = seed_dose(&pool, user, med, now - Duration::minutes(90)).await;

    let policy = EscalationPolicy {
        voice_calls_enabled: true,
        ..EscalationPolicy::default()
    };
    let sms = Arc::new(RecordingSms::default());
    let email = Arc::new(RecordingEmail::default());
    let voice = Arc::new(RecordingVoice::default());
    let escalation = full_escalation(&pool, policy, &sms, &email, &voice);

    let summary = escalation.run_once(now).await.unwrap();
    assert_eq!(summary.sent, 3);

    let calls = voice.calls.lock().unwrap().clone();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, "+14045550100");
    assert!(calls[0].1.contains("Ada"));
    assert!(reload(&pool, dose.id).await.caregiver_call_sent_at.is_some());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_caregiver_copy_stays_generic(pool: PgPool) {
    let now = Utc::now();
    let user = seed_user(&pool, None, None).await;
    let med = seed_medication(&pool, user, true, true).await;
    seed_dose(&pool, user, med, now - Duration::minutes(90)).await;

    let sms = Arc::new(RecordingSms::default());
    let email = Arc::new(RecordingEmail::default());
    let voice = Arc::new(RecordingVoice::default());
    let escalation = full_escalation(&pool, EscalationPolicy::default(), &sms, &email, &voice);
    escalation.run_once(now).await.unwrap();

    let (_, sms_body) = sms.sent.lock().unwrap()[0].clone();
    let (_, subject, email_body) = email.sent.lock().unwrap()[0].clone();
    for text in [&sms_body, &subject, &email_body] {
        assert!(text.contains("Ada"));
        assert!(!text.contains("Metformin"));
        assert!(!text.contains("500mg"));
    }
}
