//! Completion errors. A failed completion is reported once and never retried.

/// What went wrong with a completion request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmErrorKind {
    /// 429 from the provider
    RateLimited,
    /// 5xx, or any other unexpected status
    ServerError,
    /// 4xx: bad key, unknown model, malformed request
    ClientError,
    /// Connection refused, DNS, timeout
    NetworkError,
    /// Unreadable body, or a reply without any text
    ParseError,
}

impl LlmErrorKind {
    /// Kind for a non-success HTTP status.
    pub fn for_status(status: u16) -> Self {
        match status {
            429 => LlmErrorKind::RateLimited,
            400..=499 => LlmErrorKind::ClientError,
            _ => LlmErrorKind::ServerError,
        }
    }
}

impl std::fmt::Display for LlmErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            LlmErrorKind::RateLimited => "Rate limited",
            LlmErrorKind::ServerError => "Server error",
            LlmErrorKind::ClientError => "Client error",
            LlmErrorKind::NetworkError => "Network error",
            LlmErrorKind::ParseError => "Parse error",
        };
        f.write_str(label)
    }
}

/// Error from a chat completion call.
#[derive(Debug, Clone, thiserror::Error)]
#[error(
    "{kind}{}: {message}",
    .status_code.map(|code| format!(" (HTTP {})", code)).unwrap_or_default()
)]
pub struct LlmError {
    pub kind: LlmErrorKind,
    /// Set for HTTP failures
    pub status_code: Option<u16>,
    /// The provider's body for HTTP failures, otherwise a description
    pub message: String,
}

impl LlmError {
    /// Non-success HTTP response, classified by status.
    pub fn http(status_code: u16, body: String) -> Self {
        Self {
            kind: LlmErrorKind::for_status(status_code),
            status_code: Some(status_code),
            message: body,
        }
    }

    pub fn network(message: String) -> Self {
        Self {
            kind: LlmErrorKind::NetworkError,
            status_code: None,
            message,
        }
    }

    pub fn parse(message: String) -> Self {
        Self {
            kind: LlmErrorKind::ParseError,
            status_code: None,
            message,
        }
    }
}
