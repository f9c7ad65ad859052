/// Server configuration loaded from environment variables.
///
/// All fields have sensible defaults suitable for local development.
/// In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Static bearer token required on `/api/v1` routes (except the SMS
    /// webhook). Unset disables the check for local development.
    pub service_token: Option<String>,
    /// Twilio auth token used to validate `X-Twilio-Signature` on the
    /// inbound SMS webhook. Unset disables validation.
    pub twilio_auth_token: Option<String>,
    /// Public URL of the SMS webhook as Twilio sees it (signatures are
    /// computed over the full URL). Unset disables validation.
    pub webhook_public_url: Option<String>,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default                 |
    /// |------------------------|-------------------------|
    /// | `HOST`                 | `0.0.0.0`               |
    /// | `PORT`                 | `3000`                  |
    /// | `CORS_ORIGINS`         | `http://localhost:5173` |
    /// | `REQUEST_TIMEOUT_SECS` | `30`                    |
    /// | `SERVICE_TOKEN`        | unset (auth disabled)   |
    /// | `TWILIO_AUTH_TOKEN`    | unset (no signature check) |
    /// | `WEBHOOK_PUBLIC_URL`   | unset (no signature check) |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let service_token = std::env::var("SERVICE_TOKEN").ok();
        let twilio_auth_token = std::env::var("TWILIO_AUTH_TOKEN").ok();
        let webhook_public_url = std::env::var("WEBHOOK_PUBLIC_URL").ok();

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            service_token,
            twilio_auth_token,
            webhook_public_url,
        }
    }
}
