//! Error types for defrag
//!
//! This module defines the error hierarchy for a reassembly run:
//! - Chunk registration and assembly errors
//! - Collector worker errors
//! - Configuration and CLI errors
//!
//! Design philosophy:
//! - Use thiserror for structured error types in library code
//! - Errors should be actionable - include the index or path involved
//! - Preserve error chains for debugging

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for the defrag application
#[derive(Error, Debug)]
pub enum DefragError {
    /// Input root does not exist or cannot be opened
    #[error("Input directory '{path}' does not exist or cannot be opened: {reason}")]
    MissingInputDirectory { path: PathBuf, reason: String },

    /// Output file could not be created
    #[error("Failed to create output file '{path}': {reason}")]
    OutputCreate { path: PathBuf, reason: String },

    /// Chunk registration or assembly errors
    #[error("Chunk error")]
    Chunk(#[from] ChunkError),

    /// Collector worker errors
    #[error("Worker error")]
    Worker(#[from] WorkerError),

    /// Configuration errors
    #[error("Configuration error")]
    Config(#[from] ConfigError),

    /// I/O errors (output writes, etc.)
    #[error("I/O error")]
    Io(#[from] std::io::Error),

    /// A worker kept its registry reference past the collection barrier
    #[error("Chunk registry still shared after all collectors joined")]
    RegistryStillShared,
}

impl DefragError {
    /// Check if this error should be reported as a usage problem
    pub fn is_usage(&self) -> bool {
        matches!(
            self,
            DefragError::MissingInputDirectory { .. } | DefragError::Config(_)
        )
    }
}

/// Errors tied to a single chunk index or chunk file
#[derive(Error, Debug, Clone)]
pub enum ChunkError {
    /// Gap in the index space below the highest registered index
    #[error("Missing chunk {index}: indices 0..{expected} must all be present")]
    MissingChunk { index: usize, expected: usize },

    /// Two files mapped to the same index under the reject policy
    #[error("Duplicate chunk {index}: '{existing}' and '{duplicate}'")]
    DuplicateChunk {
        index: u64,
        existing: PathBuf,
        duplicate: PathBuf,
    },

    /// Index larger than the configured ceiling
    #[error("Chunk index {index} from '{path}' exceeds maximum {max}")]
    IndexOutOfRange { index: u64, max: u64, path: PathBuf },

    /// Registry could not grow far enough to hold an index
    #[error("Cannot allocate registry slots up to chunk {index} from '{path}'")]
    RegistryTooLarge { index: u64, path: PathBuf },

    /// Chunk file could not be opened for reading
    #[error("Failed to open chunk '{path}': {reason}")]
    OpenFailed { path: PathBuf, reason: String },

    /// Chunk contents could not be read during assembly
    #[error("Failed to read chunk {index} from '{path}': {reason}")]
    ReadFailed {
        index: u64,
        path: PathBuf,
        reason: String,
    },
}

/// Collector worker errors
#[derive(Error, Debug)]
pub enum WorkerError {
    /// Worker thread could not be started
    #[error("Failed to launch collector {id} for '{root}': {reason}")]
    LaunchFailed {
        id: usize,
        root: PathBuf,
        reason: String,
    },

    /// Worker panicked
    #[error("Collector {id} panicked: {message}")]
    Panicked { id: usize, message: String },

    /// Directory inside a subtree could not be opened or read
    #[error("Failed to read directory '{path}': {reason}")]
    SubtreeOpenFailed { path: PathBuf, reason: String },

    /// Chunk error raised inside a worker
    #[error("Collector {id}: {chunk}")]
    Chunk { id: usize, chunk: ChunkError },
}

impl WorkerError {
    /// Check if this error only reduces coverage rather than invalidating the run
    ///
    /// Recoverable errors are tolerated unless the run is strict.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            WorkerError::LaunchFailed { .. } | WorkerError::SubtreeOpenFailed { .. }
        )
    }
}

/// Configuration and CLI errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Invalid exclude pattern
    #[error("Invalid exclude pattern '{pattern}': {reason}")]
    InvalidExcludePattern { pattern: String, reason: String },

    /// Output path error
    #[error("Invalid output path '{path}': {reason}")]
    InvalidOutputPath { path: PathBuf, reason: String },

}

/// Result type alias for DefragError
pub type Result<T> = std::result::Result<T, DefragError>;

/// Result type alias for ChunkError
pub type ChunkResult<T> = std::result::Result<T, ChunkError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_worker_error_recoverable() {
        let skipped = WorkerError::SubtreeOpenFailed {
            path: "/tree/a".into(),
            reason: "permission denied".into(),
        };
        assert!(skipped.is_recoverable());

        let panicked = WorkerError::Panicked {
            id: 3,
            message: "boom".into(),
        };
        assert!(!panicked.is_recoverable());
    }

    #[test]
    fn test_error_conversion() {
        let gap = ChunkError::MissingChunk {
            index: 4,
            expected: 9,
        };
        let err: DefragError = gap.into();
        assert!(matches!(err, DefragError::Chunk(ChunkError::MissingChunk { index: 4, .. })));
        assert!(!err.is_usage());
    }

    #[test]
    fn test_error_chain_names_each_cause_once() {
        let open_failed = ChunkError::OpenFailed {
            path: "/tree/b/2".into(),
            reason: "Permission denied".into(),
        };
        let err: DefragError = WorkerError::Chunk {
            id: 1,
            chunk: open_failed,
        }
        .into();

        let rendered = format!("{:#}", anyhow::Error::from(err));
        assert_eq!(
            rendered,
            "Worker error: Collector 1: Failed to open chunk '/tree/b/2': Permission denied"
        );
    }

    #[test]
    fn test_missing_chunk_message() {
        let gap = ChunkError::MissingChunk {
            index: 2,
            expected: 5,
        };
        assert_eq!(
            gap.to_string(),
            "Missing chunk 2: indices 0..5 must all be present"
        );
    }
}
