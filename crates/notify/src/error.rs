//! Shared error type for all delivery gateways.

/// Error type for outbound delivery failures.
///
/// One type across channels so the escalation jobs can treat any
/// failure uniformly: log it, leave the guard unset, move on.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    /// The underlying HTTP request failed (network, DNS, timeout, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The provider returned a non-2xx status code.
    #[error("Gateway returned HTTP {status}: {detail}")]
    Gateway { status: u16, detail: String },

    /// SMTP transport-level failure (authentication, connection, etc.).
    #[error("SMTP transport error: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),

    /// The recipient or sender address could not be parsed.
    #[error("Email address parse error: {0}")]
    Address(#[from] lettre::address::AddressError),

    /// The outbound message could not be assembled.
    #[error("Message build error: {0}")]
    Build(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gateway_error_display() {
        let err = NotifyError::Gateway {
            status: 401,
            detail: "authentication failed".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Gateway returned HTTP 401: authentication failed"
        );
    }

    #[test]
    fn build_error_display() {
        let err = NotifyError::Build("missing body".to_string());
        assert_eq!(err.to_string(), "Message build error: missing body");
    }
}
