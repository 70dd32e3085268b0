//! Store error types.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur when reading or writing attempt records.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The underlying file could not be read or written.
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A stored line is not a valid attempt record.
    #[error("corrupt record at {path}:{line}: {message}")]
    Corrupt {
        path: PathBuf,
        line: usize,
        message: String,
    },

    /// A record could not be encoded.
    #[error("failed to serialize record: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    /// Whether retrying the same operation cannot succeed.
    pub fn is_permanent(&self) -> bool {
        !matches!(self, StoreError::Io { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn corrupt_is_permanent() {
        let err = StoreError::Corrupt {
            path: "a.jsonl".into(),
            line: 3,
            message: "expected value".into(),
        };
        assert!(err.is_permanent());
        assert_eq!(err.to_string(), "corrupt record at a.jsonl:3: expected value");
    }

    #[test]
    fn io_is_transient() {
        let err = StoreError::Io {
            path: "a.jsonl".into(),
            source: std::io::Error::new(std::io::ErrorKind::Interrupted, "interrupted"),
        };
        assert!(!err.is_permanent());
    }
}
