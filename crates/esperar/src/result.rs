//! Result and error types for Esperar.

use thiserror::Error;

/// Result type for Esperar operations
pub type EsperarResult<T> = Result<T, EsperarError>;

/// Errors that can occur in Esperar
#[derive(Debug, Error)]
pub enum EsperarError {
    /// A wait deadline elapsed in a context expecting success
    #[error("Wait for {action} timed out after {ms}ms")]
    TimeoutExceeded {
        /// What was being waited for
        action: String,
        /// Deadline in milliseconds
        ms: u64,
    },

    /// An explicit failure indicator was observed after an action
    #[error("Action failure detected: {message}")]
    ActionFailureDetected {
        /// Action label combined with the captured diagnostic text
        message: String,
    },

    /// Invalid wait configuration (e.g., zero poll interval)
    #[error("Invalid configuration: {message}")]
    InvalidConfiguration {
        /// Error message
        message: String,
    },

    /// A probe observation or action failed
    #[error("Probe error: {message}")]
    ProbeError {
        /// Error message
        message: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl EsperarError {
    /// Construct a probe error from any displayable cause
    pub fn probe(message: impl Into<String>) -> Self {
        Self::ProbeError {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_display() {
        let err = EsperarError::TimeoutExceeded {
            action: "login spinner".to_string(),
            ms: 5000,
        };
        let msg = err.to_string();
        assert!(msg.contains("login spinner"));
        assert!(msg.contains("5000"));
    }

    #[test]
    fn test_action_failure_display() {
        let err = EsperarError::ActionFailureDetected {
            message: "Submit signup: Email already exists".to_string(),
        };
        assert!(err.to_string().contains("Email already exists"));
    }

    #[test]
    fn test_invalid_configuration_display() {
        let err = EsperarError::InvalidConfiguration {
            message: "poll interval must be positive".to_string(),
        };
        assert!(err.to_string().contains("poll interval"));
    }

    #[test]
    fn test_probe_helper() {
        let err = EsperarError::probe("element detached");
        assert!(matches!(err, EsperarError::ProbeError { .. }));
        assert!(err.to_string().contains("element detached"));
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe");
        let err: EsperarError = io.into();
        assert!(matches!(err, EsperarError::Io(_)));
    }
}
