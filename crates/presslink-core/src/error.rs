//! Service error types with host-facing wire codes

use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Service error types organized by layer/domain
#[derive(Debug, Error)]
pub enum Error {
    // ─────────────────────────────────────────────────────────────
    // Common/Infrastructure Errors
    // ─────────────────────────────────────────────────────────────
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON encoding error: {0}")]
    Json(#[from] serde_json::Error),

    // ─────────────────────────────────────────────────────────────
    // Lifecycle Errors
    // ─────────────────────────────────────────────────────────────
    #[error("button service has not been initialized")]
    NotInitialized,

    #[error("button service is already initialized")]
    AlreadyInitialized,

    #[error("critical environment failure: {message}")]
    CriticalEnvironment { message: String },

    // ─────────────────────────────────────────────────────────────
    // Command Errors
    // ─────────────────────────────────────────────────────────────
    #[error("invalid arguments: {message}")]
    InvalidArguments { message: String, detail: String },

    #[error("unknown button: {uuid}")]
    UnknownButton { uuid: String },

    // ─────────────────────────────────────────────────────────────
    // Driver Errors
    // ─────────────────────────────────────────────────────────────
    #[error("driver failure (result {code}, sub code {sub_code})")]
    Driver { code: i32, sub_code: i32 },

    // ─────────────────────────────────────────────────────────────
    // Configuration Errors
    // ─────────────────────────────────────────────────────────────
    #[error("configuration error: {message}")]
    Config { message: String },
}

// ─────────────────────────────────────────────────────────────────
// Convenience Constructors
// ─────────────────────────────────────────────────────────────────

impl Error {
    pub fn critical(message: impl Into<String>) -> Self {
        Self::CriticalEnvironment {
            message: message.into(),
        }
    }

    pub fn invalid_arguments(message: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::InvalidArguments {
            message: message.into(),
            detail: detail.into(),
        }
    }

    pub fn unknown_button(uuid: impl Into<String>) -> Self {
        Self::UnknownButton { uuid: uuid.into() }
    }

    pub fn driver(code: i32, sub_code: i32) -> Self {
        Self::Driver { code, sub_code }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// The short code reported to the host alongside the error message.
    pub fn code(&self) -> &'static str {
        match self {
            Error::NotInitialized => "NOT_STARTED",
            Error::AlreadyInitialized => "ALREADY_STARTED",
            Error::InvalidArguments { .. } => "INVALID_ARGUMENTS",
            Error::UnknownButton { .. } => "UNKNOWN_DEVICE",
            Error::Driver { .. } => "DRIVER_FAILURE",
            Error::CriticalEnvironment { .. } | Error::Io(_) | Error::Json(_) | Error::Config { .. } => {
                "CRITICAL"
            }
        }
    }

    /// Check if this is a recoverable error (the session stays usable)
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::NotInitialized
                | Error::AlreadyInitialized
                | Error::InvalidArguments { .. }
                | Error::UnknownButton { .. }
                | Error::Driver { .. }
        )
    }

    /// Check if this error means the environment cannot host a session at all
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::CriticalEnvironment { .. })
    }
}

// ─────────────────────────────────────────────────────────────────
// Error Context Extensions
// ─────────────────────────────────────────────────────────────────

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context with a closure (lazy evaluation)
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E: Into<Error>> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| {
            let err = e.into();
            tracing::error!("{}: {:?}", context.into(), err);
            err
        })
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| {
            let err = e.into();
            tracing::error!("{}: {:?}", f(), err);
            err
        })
    }
}
