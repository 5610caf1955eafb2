use thiserror::Error;

pub type Result<T> = std::result::Result<T, AdapterError>;

#[derive(Debug, Error)]
pub enum AdapterError {
    /// Connection-level failure before any status line was received.
    #[error("failed to {phase}: {source}")]
    Transport {
        phase: String,
        #[source]
        source: reqwest::Error,
    },

    /// Credential, organization or project rejected, or an unknown session token.
    #[error("{0}")]
    AuthRejected(String),

    #[error("failed to {phase}: {status}")]
    UpstreamStatus { phase: String, status: String },

    #[error("failed to decode response to {phase}: {message}")]
    Decode { phase: String, message: String },

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("timed out after {seconds}s waiting to {phase}")]
    Timeout { phase: String, seconds: u64 },

    #[error("request to {phase} was cancelled")]
    Cancelled { phase: String },
}

impl AdapterError {
    pub fn auth(message: impl Into<String>) -> Self {
        Self::AuthRejected(message.into())
    }

    pub fn upstream(phase: impl Into<String>, status: impl Into<String>) -> Self {
        Self::UpstreamStatus {
            phase: phase.into(),
            status: status.into(),
        }
    }

    pub fn decode(phase: impl Into<String>, err: serde_json::Error) -> Self {
        Self::Decode {
            phase: phase.into(),
            message: err.to_string(),
        }
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    /// The upstream status code, when the error carries one.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::UpstreamStatus { status, .. } => status
                .split_whitespace()
                .next()
                .and_then(|code| code.parse().ok()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upstream_status_keeps_status_line() {
        let err = AdapterError::upstream("update work item", "400 Bad Request");
        assert_eq!(err.to_string(), "failed to update work item: 400 Bad Request");
        assert_eq!(err.status_code(), Some(400));
    }

    #[test]
    fn auth_rejected_message_is_verbatim() {
        let err = AdapterError::auth("invalid Personal Access Token");
        assert_eq!(err.to_string(), "invalid Personal Access Token");
        assert_eq!(err.status_code(), None);
    }

    #[test]
    fn decode_names_phase() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = AdapterError::decode("list area paths", json_err);
        assert!(err.to_string().starts_with("failed to decode response to list area paths"));
    }
}
