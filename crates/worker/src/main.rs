use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use careloop_notify::email::{EmailConfig, SmtpEmail};
use careloop_notify::push::{HttpPush, PushConfig};
use careloop_notify::twilio::{TwilioConfig, TwilioSms, TwilioVoice};
use careloop_notify::{DeviceNotifier, EmailGateway, SmsGateway, VoiceGateway};
use careloop_worker::jobs::{CaregiverEscalation, ConfirmationDispatcher, RetryPoller};
use careloop_worker::WorkerConfig;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "careloop_worker=debug,careloop_db=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = WorkerConfig::from_env();
    tracing::info!(
        escalation_minutes = config.escalation_minutes,
        voice_calls_enabled = config.voice_calls_enabled,
        "Loaded worker configuration"
    );

    // --- Database ---
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = careloop_db::create_pool(&database_url)
        .await
        .expect("Failed to connect to database");
    tracing::info!("Database connection pool created");

    careloop_db::health_check(&pool)
        .await
        .expect("Database health check failed");

    careloop_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database migrations applied");

    // --- Delivery gateways ---
    let notifier: Option<Arc<dyn DeviceNotifier>> = match PushConfig::from_env() {
        Some(push_config) => Some(Arc::new(HttpPush::new(push_config))),
        None => {
            tracing::warn!("PUSH_GATEWAY_URL not set, device retry reminders disabled");
            None
        }
    };

    let twilio = TwilioConfig::from_env();
    if twilio.is_none() {
        tracing::warn!("Twilio not configured, SMS and voice disabled");
    }
    let sms: Option<Arc<dyn SmsGateway>> = twilio
        .clone()
        .map(|c| Arc::new(TwilioSms::new(c)) as Arc<dyn SmsGateway>);
    let voice: Option<Arc<dyn VoiceGateway>> =
        twilio.map(|c| Arc::new(TwilioVoice::new(c)) as Arc<dyn VoiceGateway>);

    let email: Option<Arc<dyn EmailGateway>> = match EmailConfig::from_env() {
        Some(email_config) => Some(Arc::new(SmtpEmail::new(email_config))),
        None => {
            tracing::warn!("SMTP_HOST not set, caregiver email disabled");
            None
        }
    };

    // --- Jobs ---
    let cancel = CancellationToken::new();
    let mut handles = Vec::new();

    if let Some(notifier) = notifier {
        let poller = RetryPoller::new(
            pool.clone(),
            notifier,
            Duration::from_secs(config.retry_interval_secs),
        );
        let token = cancel.clone();
        handles.push(tokio::spawn(async move { poller.run(token).await }));
        tracing::info!("Retry poller started");
    }

    if let Some(gateway) = &sms {
        let dispatcher = ConfirmationDispatcher::new(
            pool.clone(),
            Arc::clone(gateway),
            Duration::from_secs(config.confirmation_interval_secs),
        );
        let token = cancel.clone();
        handles.push(tokio::spawn(async move { dispatcher.run(token).await }));
        tracing::info!("Confirmation dispatcher started");
    }

    if sms.is_some() || email.is_some() {
        let mut escalation = CaregiverEscalation::new(
            pool.clone(),
            config.escalation_policy(),
            Duration::from_secs(config.caregiver_interval_secs),
        );
        if let Some(gateway) = sms {
            escalation = escalation.with_sms(gateway);
        }
        if let Some(gateway) = email {
            escalation = escalation.with_email(gateway);
        }
        if config.voice_calls_enabled {
            if let Some(gateway) = voice {
                escalation = escalation.with_voice(gateway);
            }
        }
        let token = cancel.clone();
        handles.push(tokio::spawn(async move { escalation.run(token).await }));
        tracing::info!("Caregiver escalation started");
    }

    if handles.is_empty() {
        tracing::error!("No delivery gateways configured, nothing to run");
        return;
    }

    tracing::info!(jobs = handles.len(), "Escalation worker running");

    shutdown_signal().await;

    // --- Graceful shutdown ---
    cancel.cancel();
    for handle in handles {
        let _ = tokio::time::timeout(Duration::from_secs(5), handle).await;
    }
    tracing::info!("Graceful shutdown complete");
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix) so the worker
/// shuts down cleanly whether stopped interactively or by a process
/// manager (e.g. systemd, Docker, Kubernetes).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
