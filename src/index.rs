//! Index construction and lookup engine
//!
//! Prefixes go into a [`Trie`], which resolves duplicates and nesting. The
//! trie is flattened into a [`RangeIndex`] of sorted, disjoint ranges that
//! answers longest-prefix-match queries with a binary search. The index can
//! be persisted with the fixed-width [`codec`] or as JSON through serde.

pub mod bits;
pub mod bound;
pub mod codec;
pub mod error;
pub mod extract;
pub mod range;
pub mod trie;

// Re-export commonly used types
pub use bits::BitNumber;
pub use bound::{lower_less, lower_upper_less, upper_less, upper_lower_less, Lower, Upper};
pub use error::IndexError;
pub use extract::{is_monotonic, sort_ranges};
pub use range::{Range, RangeIndex};
pub use trie::{Insertion, PrefixEntry, Trie};
