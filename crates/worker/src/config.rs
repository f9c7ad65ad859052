use careloop_core::escalation::{EscalationPolicy, DEFAULT_ESCALATION_MINUTES};

/// Worker configuration loaded from environment variables.
///
/// All fields have sensible defaults suitable for local development.
/// In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// How often the retry poller scans, in seconds (default: `120`).
    pub retry_interval_secs: u64,
    /// How often the confirmation dispatcher scans, in seconds (default: `900`).
    pub confirmation_interval_secs: u64,
    /// How often caregiver escalation scans, in seconds (default: `900`).
    pub caregiver_interval_secs: u64,
    /// Minutes a critical dose may sit unconfirmed before caregivers are
    /// notified (default: `60`).
    pub escalation_minutes: i64,
    /// Whether caregiver voice calls are placed (default: `false`).
    pub voice_calls_enabled: bool,
}

impl WorkerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                      | Default |
    /// |------------------------------|---------|
    /// | `RETRY_INTERVAL_SECS`        | `120`   |
    /// | `CONFIRMATION_INTERVAL_SECS` | `900`   |
    /// | `CAREGIVER_INTERVAL_SECS`    | `900`   |
    /// | `ESCALATION_MINUTES`         | `60`    |
    /// | `VOICE_CALLS_ENABLED`        | `false` |
    pub fn from_env() -> Self {
        let retry_interval_secs: u64 = std::env::var("RETRY_INTERVAL_SECS")
            .unwrap_or_else(|_| "120".into())
            .parse()
            .expect("RETRY_INTERVAL_SECS must be a valid u64");

        let confirmation_interval_secs: u64 = std::env::var("CONFIRMATION_INTERVAL_SECS")
            .unwrap_or_else(|_| "900".into())
            .parse()
            .expect("CONFIRMATION_INTERVAL_SECS must be a valid u64");

        let caregiver_interval_secs: u64 = std::env::var("CAREGIVER_INTERVAL_SECS")
            .unwrap_or_else(|_| "900".into())
            .parse()
            .expect("CAREGIVER_INTERVAL_SECS must be a valid u64");

        let escalation_minutes: i64 = std::env::var("ESCALATION_MINUTES")
            .unwrap_or_else(|_| DEFAULT_ESCALATION_MINUTES.to_string())
            .parse()
            .expect("ESCALATION_MINUTES must be a valid i64");

        let voice_calls_enabled: bool = std::env::var("VOICE_CALLS_ENABLED")
            .unwrap_or_else(|_| "false".into())
            .parse()
            .expect("VOICE_CALLS_ENABLED must be true or false");

        Self {
            retry_interval_secs,
            confirmation_interval_secs,
            caregiver_interval_secs,
            escalation_minutes,
            voice_calls_enabled,
        }
    }

    /// The escalation policy this configuration describes.
    pub fn escalation_policy(&self) -> EscalationPolicy {
        EscalationPolicy {
            escalation_minutes: self.escalation_minutes,
            voice_calls_enabled: self.voice_calls_enabled,
        }
    }
}
