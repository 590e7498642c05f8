use thiserror::Error;

/// Repository-layer failures. Grounded on the teacher's `domain/errors.rs`
/// (`DomainError`), kept to the same shape: not-found/conflict are
/// distinguished from opaque storage failures so callers can branch on them.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("{entity} conflict: {reason}")]
    Conflict { entity: &'static str, reason: String },

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type DomainResult<T> = Result<T, DomainError>;

/// The abstract error kinds of spec.md §7. Not all variants are raised by
/// every component; the Agent Client raises the agent/network kinds, the
/// Job Engine raises job kinds, everything funnels unexpected failures into
/// `Internal`.
#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("agent unavailable: {0}")]
    AgentUnavailable(String),

    #[error("agent restart detected (lost job state): {0}")]
    AgentRestart(String),

    #[error("agent is offline")]
    AgentOffline,

    #[error("network timeout: {0}")]
    NetworkTimeout(String),

    #[error("connection refused: {0}")]
    ConnectionRefused(String),

    #[error("agent job error: {message}")]
    AgentJobError {
        message: String,
        stdout: Option<String>,
        stderr: Option<String>,
    },

    #[error("job timed out")]
    JobTimeout,

    #[error("job not found: {0}")]
    JobNotFound(String),

    #[error("job was cancelled")]
    JobCancelled,

    #[error("image not found: {0}")]
    ImageNotFound(String),

    #[error("resource not found: {0}")]
    ResourceNotFound(String),

    #[error("race condition detected: {0}")]
    RaceCondition(String),

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("per-user concurrency limit exceeded")]
    ConcurrencyLimit,

    #[error("internal error: {0}")]
    Internal(String),

    #[error("configuration error: {0}")]
    Configuration(String),
}

impl ControllerError {
    /// Whether the Job Engine should treat this as retriable-with-failover
    /// (spec.md §7 propagation policy).
    #[must_use]
    pub const fn is_retriable(&self) -> bool {
        matches!(
            self,
            Self::AgentUnavailable(_) | Self::NetworkTimeout(_) | Self::ConnectionRefused(_)
        )
    }

    /// Folds a transport failure that survived every retry attempt into
    /// `AgentUnavailable`, spec.md §4.1: "Exhaustion raises AgentUnavailable".
    /// Leaves anything that wasn't a transport error untouched.
    #[must_use]
    pub fn into_agent_unavailable(self) -> Self {
        match self {
            Self::ConnectionRefused(msg) | Self::NetworkTimeout(msg) => Self::AgentUnavailable(msg),
            other => other,
        }
    }
}

impl From<DomainError> for ControllerError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::NotFound { entity, id } => Self::ResourceNotFound(format!("{entity}:{id}")),
            other => Self::Internal(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn agent_unavailable_is_retriable() {
        assert!(ControllerError::AgentUnavailable("x".into()).is_retriable());
    }

    #[test]
    fn agent_job_error_is_not_retriable() {
        let err = ControllerError::AgentJobError {
            message: "boom".into(),
            stdout: None,
            stderr: None,
        };
        assert!(!err.is_retriable());
    }

    #[test]
    fn transport_failures_fold_into_agent_unavailable() {
        let connect = ControllerError::ConnectionRefused("x".into());
        assert!(matches!(connect.into_agent_unavailable(), ControllerError::AgentUnavailable(_)));
        let timeout = ControllerError::NetworkTimeout("x".into());
        assert!(matches!(timeout.into_agent_unavailable(), ControllerError::AgentUnavailable(_)));
    }

    #[test]
    fn non_transport_failures_are_unaffected() {
        let err = ControllerError::JobTimeout;
        assert!(matches!(err.into_agent_unavailable(), ControllerError::JobTimeout));
    }
}
