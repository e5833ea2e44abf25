//! Error types for index construction, lookup and serialization

use thiserror::Error;

/// Errors that can occur while building, loading or querying a range index
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IndexError {
    /// The queried value is not a 128-bit IPv6 address
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    /// A bound cannot be expressed in the 48-bit record format
    ///
    /// The binary format keeps only the 48 most significant bits of each
    /// bound. Bounds that need more precision are rejected instead of being
    /// silently widened.
    #[error("Bound {bound} cannot be stored in 48 bits")]
    Unrepresentable {
        /// Rendering of the offending bound
        bound: String,
    },

    /// An ASN is not a decimal 32-bit number
    #[error("Invalid ASN: {0:?}")]
    InvalidAsn(String),

    /// Serialized input is not a whole number of records
    #[error("Truncated index: {len} bytes is not a multiple of {record_len}")]
    Truncated {
        /// Length of the input in bytes
        len: usize,
        /// Size of one record in bytes
        record_len: usize,
    },

    /// Ranges are not strictly increasing and disjoint
    #[error("Range {index} overlaps or precedes its predecessor")]
    Unordered {
        /// Position of the first offending range
        index: usize,
    },

    /// Reading or writing a persisted index failed
    #[error("I/O error: {0}")]
    Io(String),

    /// The JSON form of an index could not be read or written
    #[error("JSON error: {0}")]
    Json(String),

    /// A deferred index build failed
    #[error("Index build failed: {0}")]
    Load(String),
}

impl From<std::io::Error> for IndexError {
    fn from(err: std::io::Error) -> Self {
        IndexError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for IndexError {
    fn from(err: serde_json::Error) -> Self {
        IndexError::Json(err.to_string())
    }
}
