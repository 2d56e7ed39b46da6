/// Result alias that carries the custom [`HandCursorError`] type.
pub type Result<T> = std::result::Result<T, HandCursorError>;

/// Common error type for the core crate.
#[derive(Debug, thiserror::Error)]
pub enum HandCursorError {
    /// Free-form message for conditions that do not warrant their own variant.
    #[error("{0}")]
    Message(String),
    /// Wrapper around standard IO errors.
    #[error("{0}")]
    Io(#[from] std::io::Error),
    /// A configuration file or replay line could not be (de)serialised.
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
    /// Rejected configuration value or argument.
    #[error("invalid input: {0}")]
    InvalidInput(&'static str),
    /// A frame could not be obtained from the capture source. The broadcast
    /// loop treats this as transient and retries after a short delay.
    #[error("frame acquisition failed: {0}")]
    Acquisition(String),
    /// A shared lock was poisoned by a panicking holder.
    #[error("{0} has been poisoned")]
    Poisoned(&'static str),
}

impl HandCursorError {
    /// Creates a new error that simply wraps the provided message.
    pub fn msg<T: Into<String>>(msg: T) -> Self {
        Self::Message(msg.into())
    }

    /// Creates an acquisition failure with the provided reason.
    pub fn acquisition<T: Into<String>>(reason: T) -> Self {
        Self::Acquisition(reason.into())
    }

    /// Returns `true` when the error is a transient acquisition failure.
    pub fn is_acquisition(&self) -> bool {
        matches!(self, Self::Acquisition(_))
    }
}

impl From<&str> for HandCursorError {
    fn from(value: &str) -> Self {
        Self::msg(value)
    }
}

impl From<String> for HandCursorError {
    fn from(value: String) -> Self {
        Self::Message(value)
    }
}
