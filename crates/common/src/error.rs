//! Error types shared across Gonio crates.

use std::path::PathBuf;

/// Top-level error type for Gonio operations.
#[derive(Debug, thiserror::Error)]
pub enum GonioError {
    /// Unrecognized movement kind, side, or otherwise unusable run parameters.
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// The points of an angle computation collapse into a zero-length segment.
    #[error("Degenerate geometry: {message}")]
    DegenerateGeometry { message: String },

    /// Input could not be opened or output could not be created.
    #[error("Resource error: {message}")]
    Resource { message: String },

    #[error("Landmark provider error: {message}")]
    Landmark { message: String },

    #[error("Video error: {message}")]
    Video { message: String },

    #[error("Processing error: {message}")]
    Processing { message: String },

    /// No valid samples were observed for a requested range.
    #[error("No data observed for {category}")]
    NoData { category: String },

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

/// Result type alias using GonioError.
pub type GonioResult<T> = Result<T, GonioError>;

impl GonioError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    pub fn degenerate(msg: impl Into<String>) -> Self {
        Self::DegenerateGeometry {
            message: msg.into(),
        }
    }

    pub fn resource(msg: impl Into<String>) -> Self {
        Self::Resource {
            message: msg.into(),
        }
    }

    pub fn landmark(msg: impl Into<String>) -> Self {
        Self::Landmark {
            message: msg.into(),
        }
    }

    pub fn video(msg: impl Into<String>) -> Self {
        Self::Video {
            message: msg.into(),
        }
    }

    pub fn processing(msg: impl Into<String>) -> Self {
        Self::Processing {
            message: msg.into(),
        }
    }

    pub fn no_data(category: impl Into<String>) -> Self {
        Self::NoData {
            category: category.into(),
        }
    }

    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::Unsupported {
            message: msg.into(),
        }
    }

    /// Whether this error only invalidates a single frame's sample.
    pub fn is_frame_local(&self) -> bool {
        matches!(self, Self::DegenerateGeometry { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_message() {
        let err = GonioError::config("Unknown side 'up'");
        assert_eq!(err.to_string(), "Configuration error: Unknown side 'up'");

        let err = GonioError::no_data("supination");
        assert_eq!(err.to_string(), "No data observed for supination");
    }

    #[test]
    fn test_only_degenerate_geometry_is_frame_local() {
        assert!(GonioError::degenerate("a == b").is_frame_local());
        assert!(!GonioError::resource("cannot open").is_frame_local());
        assert!(!GonioError::config("bad kind").is_frame_local());
    }

    #[test]
    fn test_io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: GonioError = io.into();
        assert!(matches!(err, GonioError::Io(_)));
    }
}
