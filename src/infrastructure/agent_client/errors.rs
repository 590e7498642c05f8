use thiserror::Error;

use crate::domain::errors::ControllerError;

/// Raw transport/HTTP-level failure from a single agent call, before
/// classification into a [`ControllerError`]. Grounded on
/// `infrastructure/claude/errors.rs`'s `ClaudeApiError`.
#[derive(Debug, Error)]
pub enum AgentApiError {
    #[error("connection refused: {0}")]
    ConnectionRefused(String),

    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("dns resolution failed: {0}")]
    Dns(String),

    #[error("http {status}: {body}")]
    Http { status: u16, body: String },

    #[error("response decode failed: {0}")]
    Decode(String),
}

impl AgentApiError {
    /// Transient classes are retried by [`super::retry::RetryPolicy`]; HTTP
    /// status errors and decode failures are not, per spec.md §4.1.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::ConnectionRefused(_) | Self::Timeout(_) | Self::Dns(_))
    }

    /// Classifies this transport error into the abstract kinds of spec.md §7.
    /// A 404 during an in-progress operation means the agent forgot the job
    /// (`agent_restart`); any other non-2xx is an agent job error carrying no
    /// stdout/stderr (the caller attaches those when the body parses).
    #[must_use]
    pub fn classify(self) -> ControllerError {
        match self {
            Self::ConnectionRefused(msg) => ControllerError::ConnectionRefused(msg),
            Self::Timeout(msg) | Self::Dns(msg) => ControllerError::NetworkTimeout(msg),
            Self::Http { status: 404, body } => ControllerError::AgentRestart(body),
            Self::Http { status, body } => ControllerError::AgentJobError {
                message: format!("agent returned HTTP {status}"),
                stdout: None,
                stderr: Some(body),
            },
            Self::Decode(msg) => ControllerError::Internal(msg),
        }
    }
}

impl From<reqwest::Error> for AgentApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(err.to_string())
        } else if err.is_connect() {
            Self::ConnectionRefused(err.to_string())
        } else if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::Dns(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_classification() {
        assert!(AgentApiError::ConnectionRefused("x".into()).is_transient());
        assert!(AgentApiError::Timeout("x".into()).is_transient());
        assert!(!AgentApiError::Http { status: 500, body: String::new() }.is_transient());
    }

    #[test]
    fn not_found_classifies_as_agent_restart() {
        let err = AgentApiError::Http { status: 404, body: "unknown job".into() };
        assert!(matches!(err.classify(), ControllerError::AgentRestart(_)));
    }
}
