use std::fmt;

use crate::backend::BackendError;

/// Reserved payload prefix marking an application-level stream error
pub const ERROR_SENTINEL: &str = "Error:";

/// User-visible errors. Each is recovered where it happens and surfaced in
/// a single current-error slot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ClientError {
    /// Missing filename or host; start is blocked locally
    Validation { message: String },
    /// Pre-flight `/alive` failed; start is blocked
    Connectivity { message: String },
    /// File list could not be loaded; autocomplete degrades
    Fetch { message: String },
    /// Transport failure or an in-band `Error:` line
    Stream { message: String },
}

impl ClientError {
    pub fn missing_file() -> Self {
        ClientError::Validation {
            message: "Please specify a log file.".into(),
        }
    }

    pub fn missing_host() -> Self {
        ClientError::Validation {
            message: "Please select a host.".into(),
        }
    }

    /// Pre-flight failure, worded by whether the host answered at all
    pub fn from_preflight(error: &BackendError) -> Self {
        let message = match error {
            BackendError::Status { .. } => "Backend is unreachable. Please check the connection.",
            _ => "Failed to connect to backend. Please make sure the server is running.",
        };
        ClientError::Connectivity {
            message: message.into(),
        }
    }

    /// File-list failure, worded by whether the host answered at all
    pub fn from_fetch(error: &BackendError) -> Self {
        let message = match error {
            BackendError::Status { .. } => "Failed to load log files from backend.",
            _ => "Error fetching log files.",
        };
        ClientError::Fetch {
            message: message.into(),
        }
    }

    pub fn stream_failed() -> Self {
        ClientError::Stream {
            message: "Log stream failed.".into(),
        }
    }

    /// In-band sentinel, surfaced verbatim
    pub fn sentinel(payload: &str) -> Self {
        ClientError::Stream {
            message: payload.to_string(),
        }
    }

    pub fn message(&self) -> &str {
        match self {
            ClientError::Validation { message }
            | ClientError::Connectivity { message }
            | ClientError::Fetch { message }
            | ClientError::Stream { message } => message,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ClientError::Validation { .. } => "validation",
            ClientError::Connectivity { .. } => "connectivity",
            ClientError::Fetch { .. } => "fetch",
            ClientError::Stream { .. } => "stream",
        }
    }
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

impl std::error::Error for ClientError {}

/// True when a stream payload is an error sentinel rather than a log line
pub fn is_sentinel(payload: &str) -> bool {
    payload.starts_with(ERROR_SENTINEL)
}
