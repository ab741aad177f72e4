//! Errors raised while parsing or validating model data.

use std::path::PathBuf;

/// Errors that can occur when working with model types.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("Unknown movement kind '{value}' (expected abduction, flexion, or pronation-supination)")]
    UnknownMovement { value: String },

    #[error("Unknown side '{value}' (expected left/izquierda or right/derecha)")]
    UnknownSide { value: String },

    #[error("Unknown hand landmark '{value}'")]
    UnknownLandmark { value: String },

    #[error("Invalid movement configuration: {message}")]
    InvalidConfig { message: String },

    #[error("No data observed for {category}")]
    NoData { category: String },

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Parse error in {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Parse error on line {line}: {source}")]
    ParseLine {
        line: usize,
        source: serde_json::Error,
    },
}
