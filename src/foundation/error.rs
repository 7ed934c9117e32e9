/// Convenience result type used across the crate.
pub type ConvertResult<T> = Result<T, ConvertError>;

/// Error taxonomy shared by converters, the library store and the editor session.
#[derive(thiserror::Error, Debug)]
pub enum ConvertError {
    /// Invalid caller-provided parameters (ranges, resolutions, config values).
    #[error("validation error: {0}")]
    Validation(String),

    /// The source media is missing something the operation needs, or cannot be decoded.
    #[error("input error: {0}")]
    Input(String),

    /// File open/copy/write failures.
    #[error("io error: {0}")]
    Io(String),

    /// An export session finished unsuccessfully.
    #[error("export failed: {0}")]
    Export(String),

    /// An export session was cancelled through its token.
    #[error("export cancelled")]
    Cancelled,

    /// The requested output cannot be produced by this build.
    #[error("unsupported: {0}")]
    Unsupported(String),

    /// Editor state machine violation.
    #[error("invalid transition: cannot {action} while {state}")]
    InvalidTransition {
        action: &'static str,
        state: &'static str,
    },

    /// Errors when serializing or deserializing persisted data.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ConvertError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn input(msg: impl Into<String>) -> Self {
        Self::Input(msg.into())
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self::Io(msg.into())
    }

    pub fn export(msg: impl Into<String>) -> Self {
        Self::Export(msg.into())
    }

    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::Unsupported(msg.into())
    }

    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }

    pub fn invalid_transition(action: &'static str, state: &'static str) -> Self {
        Self::InvalidTransition { action, state }
    }

    /// `true` for errors that mean "the user stopped it" rather than "it broke".
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
