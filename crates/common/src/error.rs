//! Error types shared across burnsub crates.

use std::path::PathBuf;

/// Top-level error type for burnsub operations.
#[derive(Debug, thiserror::Error)]
pub enum BurnsubError {
    #[error("Unsupported environment: {message}")]
    UnsupportedEnvironment { message: String },

    #[error("Seek to {target_secs:.3}s did not complete within {timeout_ms}ms")]
    SeekTimeout { target_secs: f64, timeout_ms: u64 },

    #[error("Caption font was not ready within {timeout_ms}ms")]
    FontLoadTimeout { timeout_ms: u64 },

    #[error("Encoder finished without producing any output bytes")]
    EmptyArtifact,

    #[error("Encoder fault: {message}")]
    EncoderFault { message: String },

    #[error("An export session is already running")]
    SessionBusy,

    #[error("Export cancelled")]
    Cancelled,

    #[error("Transcript error: {message}")]
    Transcript { message: String },

    #[error("Render error: {message}")]
    Render { message: String },

    #[error("Font error: {message}")]
    Font { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using BurnsubError.
pub type BurnsubResult<T> = Result<T, BurnsubError>;

/// Machine-readable classification of a [`BurnsubError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    UnsupportedEnvironment,
    SeekTimeout,
    FontLoadTimeout,
    EmptyArtifact,
    EncoderFault,
    SessionBusy,
    Cancelled,
    InvalidInput,
    Render,
    Io,
    Other,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::UnsupportedEnvironment => "unsupported_environment",
            ErrorKind::SeekTimeout => "seek_timeout",
            ErrorKind::FontLoadTimeout => "font_load_timeout",
            ErrorKind::EmptyArtifact => "empty_artifact",
            ErrorKind::EncoderFault => "encoder_fault",
            ErrorKind::SessionBusy => "session_busy",
            ErrorKind::Cancelled => "cancelled",
            ErrorKind::InvalidInput => "invalid_input",
            ErrorKind::Render => "render",
            ErrorKind::Io => "io",
            ErrorKind::Other => "other",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl BurnsubError {
    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::UnsupportedEnvironment {
            message: msg.into(),
        }
    }

    pub fn encoder(msg: impl Into<String>) -> Self {
        Self::EncoderFault {
            message: msg.into(),
        }
    }

    pub fn transcript(msg: impl Into<String>) -> Self {
        Self::Transcript {
            message: msg.into(),
        }
    }

    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render {
            message: msg.into(),
        }
    }

    pub fn font(msg: impl Into<String>) -> Self {
        Self::Font {
            message: msg.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Classify this error for callers that branch on failure type.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UnsupportedEnvironment { .. } => ErrorKind::UnsupportedEnvironment,
            Self::SeekTimeout { .. } => ErrorKind::SeekTimeout,
            Self::FontLoadTimeout { .. } => ErrorKind::FontLoadTimeout,
            Self::EmptyArtifact => ErrorKind::EmptyArtifact,
            Self::EncoderFault { .. } => ErrorKind::EncoderFault,
            Self::SessionBusy => ErrorKind::SessionBusy,
            Self::Cancelled => ErrorKind::Cancelled,
            Self::Transcript { .. } | Self::Config { .. } | Self::Json(_) => {
                ErrorKind::InvalidInput
            }
            Self::Render { .. } | Self::Font { .. } => ErrorKind::Render,
            Self::FileNotFound { .. } | Self::Io(_) => ErrorKind::Io,
            Self::Other(_) => ErrorKind::Other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_classification() {
        assert_eq!(BurnsubError::EmptyArtifact.kind(), ErrorKind::EmptyArtifact);
        assert_eq!(
            BurnsubError::unsupported("no codec").kind(),
            ErrorKind::UnsupportedEnvironment
        );
        assert_eq!(
            BurnsubError::transcript("bad json").kind(),
            ErrorKind::InvalidInput
        );
        assert_eq!(BurnsubError::font("missing").kind(), ErrorKind::Render);
    }

    #[test]
    fn test_messages_are_human_readable() {
        let err = BurnsubError::SeekTimeout {
            target_secs: 0.0,
            timeout_ms: 5000,
        };
        assert_eq!(
            err.to_string(),
            "Seek to 0.000s did not complete within 5000ms"
        );
        assert_eq!(ErrorKind::EncoderFault.to_string(), "encoder_fault");
    }
}
