//! Error types shared across Splicer crates.

use std::path::PathBuf;

/// Top-level error type for Splicer pipeline operations.
///
/// Engine failures arrive here through the `Composition` variant; the
/// original error stays reachable through `source()`.
#[derive(Debug, thiserror::Error)]
pub enum SplicerError {
    #[error("Composition error: {source}")]
    Composition {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
    },

    #[error("{stage} collaborator failed: {message}")]
    Collaborator { stage: String, message: String },

    #[error("Clip not found for break kind '{kind}'")]
    ClipNotFound { kind: String },

    #[error("Render error: {message}")]
    Render { message: String },

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

/// Result type alias using SplicerError.
pub type SplicerResult<T> = Result<T, SplicerError>;

impl SplicerError {
    pub fn composition(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Composition {
            source: Box::new(err),
        }
    }

    pub fn collaborator(stage: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Collaborator {
            stage: stage.into(),
            message: msg.into(),
        }
    }

    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render {
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

    #[derive(Debug, thiserror::Error)]
    #[error("window too short")]
    struct Inner;

    #[test]
    fn test_composition_keeps_source() {
        let err = SplicerError::composition(Inner);
        assert_eq!(err.to_string(), "Composition error: window too short");
        let source = std::error::Error::source(&err).unwrap();
        assert_eq!(source.to_string(), "window too short");
    }

    #[test]
    fn test_collaborator_message() {
        let err = SplicerError::collaborator("speech", "quota exhausted");
        assert_eq!(err.to_string(), "speech collaborator failed: quota exhausted");
    }
}
