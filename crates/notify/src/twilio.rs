//! Twilio-backed SMS and voice delivery.
//!
//! Both gateways POST form-encoded requests to the Twilio REST API
//! with HTTP basic auth. Voice calls carry their script as inline
//! TwiML. Configuration is loaded from environment variables; if
//! `TWILIO_ACCOUNT_SID` is not set, [`TwilioConfig::from_env`] returns
//! `None` and neither gateway should be constructed.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::NotifyError;
use crate::gateway::{SmsGateway, VoiceGateway};

/// HTTP request timeout for a single delivery attempt.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Default API base; overridable for self-hosted test stand-ins.
const DEFAULT_API_BASE: &str = "https://api.twilio.com";

// ---------------------------------------------------------------------------
// TwilioConfig
// ---------------------------------------------------------------------------

/// Configuration shared by the SMS and voice gateways.
#[derive(Debug, Clone)]
pub struct TwilioConfig {
    /// Twilio account SID, also the basic-auth username.
    pub account_sid: String,
    /// Auth token, the basic-auth password.
    pub auth_token: String,
    /// E.164 number sends originate from.
    pub from_number: String,
    /// API base URL (defaults to the public Twilio API).
    pub api_base: String,
}

impl TwilioConfig {
    /// Load configuration from environment variables.
    ///
    /// Returns `None` if `TWILIO_ACCOUNT_SID` is not set, signalling
    /// that SMS and voice delivery are not configured.
    ///
    /// | Variable             | Required | Default                  |
    /// |----------------------|----------|--------------------------|
    /// | `TWILIO_ACCOUNT_SID` | yes      | —                        |
    /// | `TWILIO_AUTH_TOKEN`  | yes      | —                        |
    /// | `TWILIO_FROM_NUMBER` | yes      | —                        |
    /// | `TWILIO_API_BASE`    | no       | `https://api.twilio.com` |
    pub fn from_env() -> Option<Self> {
        let account_sid = std::env::var("TWILIO_ACCOUNT_SID").ok()?;
        let auth_token = std::env::var("TWILIO_AUTH_TOKEN").ok()?;
        let from_number = std::env::var("TWILIO_FROM_NUMBER").ok()?;
        Some(Self {
            account_sid,
            auth_token,
            from_number,
            api_base: std::env::var("TWILIO_API_BASE")
                .unwrap_or_else(|_| DEFAULT_API_BASE.to_string()),
        })
    }
}

// ---------------------------------------------------------------------------
// TwiML
// ---------------------------------------------------------------------------

/// Escape text for embedding in a TwiML element.
fn xml_escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            other => out.push(other),
        }
    }
    out
}

/// TwiML document replying to an inbound SMS with `body`.
pub fn twiml_message_response(body: &str) -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\
         <Response><Message>{}</Message></Response>",
        xml_escape(body)
    )
}

/// TwiML document that reads `script` aloud on an outbound call.
pub fn twiml_say_response(script: &str) -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\
         <Response><Say>{}</Say></Response>",
        xml_escape(script)
    )
}

// ---------------------------------------------------------------------------
// Gateways
// ---------------------------------------------------------------------------

/// Sends SMS through the Twilio Messages API.
pub struct TwilioSms {
    config: TwilioConfig,
    client: reqwest::Client,
}

impl TwilioSms {
    pub fn new(config: TwilioConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("Failed to build reqwest HTTP client");
        Self { config, client }
    }
}

#[async_trait]
impl SmsGateway for TwilioSms {
    async fn send_sms(&self, to: &str, body: &str) -> Result<(), NotifyError> {
        let url = format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.config.api_base, self.config.account_sid
        );
        let params = [
            ("To", to),
            ("From", self.config.from_number.as_str()),
            ("Body", body),
        ];

        let response = self
            .client
            .post(&url)
            .basic_auth(&self.config.account_sid, Some(&self.config.auth_token))
            .form(&params)
            .send()
            .await?;

        check_status(response).await?;
        tracing::info!(to, "SMS dispatched");
        Ok(())
    }
}

/// Places calls through the Twilio Calls API with an inline TwiML script.
pub struct TwilioVoice {
    config: TwilioConfig,
    client: reqwest::Client,
}

impl TwilioVoice {
    pub fn new(config: TwilioConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("Failed to build reqwest HTTP client");
        Self { config, client }
    }
}

#[async_trait]
impl VoiceGateway for TwilioVoice {
    async fn place_call(&self, to: &str, script: &str) -> Result<(), NotifyError> {
        let url = format!(
            "{}/2010-04-01/Accounts/{}/Calls.json",
            self.config.api_base, self.config.account_sid
        );
        let twiml = twiml_say_response(script);
        let params = [
            ("To", to),
            ("From", self.config.from_number.as_str()),
            ("Twiml", twiml.as_str()),
        ];

        let response = self
            .client
            .post(&url)
            .basic_auth(&self.config.account_sid, Some(&self.config.auth_token))
            .form(&params)
            .send()
            .await?;

        check_status(response).await?;
        tracing::info!(to, "Voice call placed");
        Ok(())
    }
}

/// Map a non-2xx provider response to an error carrying the body as
/// the diagnostic payload.
async fn check_status(response: reqwest::Response) -> Result<(), NotifyError> {
    let status = response.status();
    if status.is_success() {
        return Ok(());
    }
    let detail = response.text().await.unwrap_or_default();
    Err(NotifyError::Gateway {
        status: status.as_u16(),
        detail,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
