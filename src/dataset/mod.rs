//! Turning a raw mapping table into a range index
//!
//! Two strategies are available. [`BuildStrategy::Merge`] truncates every
//! row to 64-bit prefixes, resolves overlaps with the fixed-point merge in
//! [`merge`] and widens the result to whole /48 blocks, so its output always
//! fits the binary format. [`BuildStrategy::Trie`] decomposes rows into CIDR
//! blocks, inserts them into a [`Trie`] and flattens it, keeping full
//! precision.

pub mod ingest;
pub mod merge;

pub use ingest::{parse_mapping, read_mapping_file, MappingRow};
pub use merge::{coarsen_intervals, merge_intervals, verify_sequence, Interval};

use crate::config::{BuildStrategy, IndexConfig};
use crate::index::{IndexError, RangeIndex, Trie};
use log::info;
use thiserror::Error;

/// Errors that can occur while building an index from a mapping table
#[derive(Debug, Error)]
pub enum DatasetError {
    /// The mapping table could not be opened
    #[error("Cannot read {path}: {source}")]
    Io {
        /// Path of the table
        path: String,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// A line of the mapping table is malformed
    #[error("Invalid record on line {line}: {reason}")]
    InvalidRecord {
        /// 1-based line number
        line: usize,
        /// What is wrong with the line
        reason: String,
    },

    /// Overlap resolution was still changing the data after the pass limit
    #[error("Merge did not converge after {passes} passes")]
    NotConverged {
        /// Number of passes attempted
        passes: usize,
    },

    /// The merged intervals are not strictly increasing and disjoint
    #[error("Inconsistent interval at position {index}: {reason}")]
    Inconsistent {
        /// Position of the offending interval
        index: usize,
        /// What is wrong with it
        reason: String,
    },

    /// Building the final index failed
    #[error(transparent)]
    Index(#[from] IndexError),

    /// The build configuration is unusable
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Read the configured source table and build an index from it
pub fn build_index(config: &IndexConfig) -> Result<RangeIndex, DatasetError> {
    config.validate().map_err(DatasetError::Config)?;
    let source = config.resolve_source()?;
    info!("Reading mapping table {}", source.display());
    let rows = read_mapping_file(&source)?;
    build_from_rows(&rows, config)
}

/// Build an index from already parsed rows
pub fn build_from_rows(
    rows: &[MappingRow],
    config: &IndexConfig,
) -> Result<RangeIndex, DatasetError> {
    let index = match config.strategy {
        BuildStrategy::Merge => {
            let intervals = rows.iter().map(MappingRow::to_interval).collect();
            let merged = merge_intervals(intervals, config.max_merge_passes)?;
            let blocks = coarsen_intervals(&merged, config.max_merge_passes)?;
            RangeIndex::from_intervals(&blocks)?
        }
        BuildStrategy::Trie => {
            let trie: Trie = rows.iter().flat_map(MappingRow::prefixes).collect();
            info!("Trie holds {} prefixes", trie.len());
            RangeIndex::from_trie(&trie)
        }
    };
    info!(
        "Built index with {} ranges from {} rows ({:?} strategy)",
        index.len(),
        rows.len(),
        config.strategy
    );
    Ok(index)
}
