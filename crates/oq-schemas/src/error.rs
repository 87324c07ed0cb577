use thiserror::Error;

/// Usage error — malformed input, missing required field, no active
/// profile, conflicting flags. Surfaced verbatim; no retry (spec §7).
#[derive(Debug, Error)]
#[error("{0}")]
pub struct UsageError(pub String);

/// Exit codes for the CLI surface (spec §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    Success = 0,
    Internal = 1,
    Usage = 2,
    PolicyDenial = 3,
    RuntimeError = 4,
}

impl ExitCode {
    pub fn code(&self) -> i32 {
        *self as i32
    }
}

/// JSON error envelope for machine-readable CLI output (spec §6).
#[derive(Debug, Clone, serde::Serialize)]
pub struct ErrorEnvelope {
    pub ok: bool,
    pub code: i32,
    pub message: String,
    pub details: Option<String>,
}

impl ErrorEnvelope {
    pub fn new(exit: ExitCode, message: impl Into<String>) -> Self {
        Self {
            ok: false,
            code: exit.code(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}
