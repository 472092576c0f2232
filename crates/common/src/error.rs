//! Error types shared across StreemWeever crates.

use std::path::PathBuf;

/// Top-level error type for StreemWeever operations.
///
/// Unknown layer ids and transiently missing frame dimensions are not
/// errors and never surface through this type.
#[derive(Debug, thiserror::Error)]
pub enum WeeverError {
    /// The host refused or could not provide a capture source.
    #[error("Capture acquisition failed: {message}")]
    Acquisition { message: String },

    #[error("Capture error: {message}")]
    Capture { message: String },

    #[error("Content error: {message}")]
    Content { message: String },

    #[error("Render error: {message}")]
    Render { message: String },

    #[error("Layer error: {message}")]
    Layer { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("Unsupported operation: {message}")]
    Unsupported { message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using WeeverError.
pub type WeeverResult<T> = Result<T, WeeverError>;

impl WeeverError {
    pub fn acquisition(msg: impl Into<String>) -> Self {
        Self::Acquisition {
            message: msg.into(),
        }
    }

    pub fn capture(msg: impl Into<String>) -> Self {
        Self::Capture {
            message: msg.into(),
        }
    }

    pub fn content(msg: impl Into<String>) -> Self {
        Self::Content {
            message: msg.into(),
        }
    }

    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render {
            message: msg.into(),
        }
    }

    pub fn layer(msg: impl Into<String>) -> Self {
        Self::Layer {
            message: msg.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::Unsupported {
            message: msg.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acquisition_error_message_is_user_facing() {
        let err = WeeverError::acquisition("permission denied");
        assert_eq!(
            err.to_string(),
            "Capture acquisition failed: permission denied"
        );
    }

    #[test]
    fn io_errors_convert() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: WeeverError = io.into();
        assert!(matches!(err, WeeverError::Io(_)));
    }
}
