//! Error types for the QDC converter core.

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur while converting QDC tiles.
#[derive(Debug, Error)]
pub enum QdcError {
    /// Layer selector outside the six known layers.
    #[error("Invalid layer {0} (must be 0-5)")]
    InvalidLayer(u8),

    /// Output path extension is neither `.csv` nor `.grd`.
    #[error("Unsupported output format {}: extension must be *.csv (CSV table) or *.grd (ESRI ASCII grid)", .0.display())]
    UnsupportedOutputFormat(PathBuf),

    /// Input directory is missing or is not a directory.
    #[error("Input folder not found: {}", .0.display())]
    InputNotFound(PathBuf),

    /// No file in the input folder matched a size variant of the layer.
    #[error("No valid QDC files found for layer {0}")]
    NoValidTiles(u8),

    /// I/O error reading a tile or writing an output file.
    #[error("I/O error during {operation} of {}: {source}", .path.display())]
    IoFailure {
        /// What was being done when the error occurred.
        operation: &'static str,
        /// File or folder involved.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The tile extent needs more grid cells than can be allocated.
    #[error("Grid of {columns}x{rows} cells is too large to allocate; check for tiles with stray origin codes")]
    GridTooLarge {
        /// Requested columns.
        columns: usize,
        /// Requested rows.
        rows: usize,
    },

    /// The run was aborted through the cancellation flag.
    #[error("Conversion cancelled")]
    Cancelled,
}

impl QdcError {
    /// Wrap an I/O error with the operation and path it belongs to.
    pub fn io(operation: &'static str, path: impl AsRef<Path>, source: std::io::Error) -> Self {
        QdcError::IoFailure {
            operation,
            path: path.as_ref().to_path_buf(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_failure_message_names_operation_and_path() {
        let err = QdcError::io(
            "read",
            "/data/tile.qdc",
            std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "short file"),
        );
        let msg = err.to_string();
        assert!(msg.contains("read"));
        assert!(msg.contains("/data/tile.qdc"));
        assert!(msg.contains("short file"));
    }

    #[test]
    fn test_unsupported_format_message() {
        let err = QdcError::UnsupportedOutputFormat(PathBuf::from("out.txt"));
        assert!(err.to_string().contains("out.txt"));
    }
}
