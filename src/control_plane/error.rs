use crate::backoff::Throttling;

/// Error codes the control plane uses for rate limiting
const THROTTLING_CODES: &[&str] = &[
    "ThrottlingException",
    "Throttling",
    "TooManyRequestsException",
    "RequestLimitExceeded",
    "Rate exceeded",
];

/// Errors returned by control-plane calls
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ControlPlaneError {
    #[error("Throttled: {0}")]
    Throttled(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Remote error ({status}): {message}")]
    Remote { status: u16, message: String },

    #[error("Deserialization error: {0}")]
    Deserialization(String),
}

impl ControlPlaneError {
    /// Classify an error response by HTTP status and remote error code
    pub fn from_response(status: u16, code: Option<&str>, message: String) -> Self {
        let throttling_code = code
            .map(|c| THROTTLING_CODES.iter().any(|t| c.eq_ignore_ascii_case(t)))
            .unwrap_or(false);

        if status == 429 || throttling_code {
            return ControlPlaneError::Throttled(message);
        }

        match status {
            404 => ControlPlaneError::NotFound(message),
            400..=499 => ControlPlaneError::InvalidRequest(message),
            _ => ControlPlaneError::Remote { status, message },
        }
    }
}

impl Throttling for ControlPlaneError {
    fn is_throttling(&self) -> bool {
        matches!(self, ControlPlaneError::Throttled(_))
    }
}
