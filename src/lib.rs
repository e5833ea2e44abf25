//! asn6 - IPv6 address to ASN lookup
//!
//! This library maps IPv6 addresses to the Autonomous System that
//! originates them. Prefix tables are flattened into a sorted list of
//! disjoint address ranges, so every lookup is a single binary search.
//!
//! # Examples
//!
//! ```
//! use asn6::{AsnStore, RangeIndex, Trie};
//!
//! let mut trie = Trie::new();
//! trie.insert_net("2403:8080::/32".parse().unwrap(), "17964");
//! trie.insert_net("2403:8080:101::/48".parse().unwrap(), "4847");
//!
//! let store = AsnStore::new(RangeIndex::from_trie(&trie));
//! assert_eq!(store.asn_for_ipv6("2403:8080:101::5".parse().unwrap()).unwrap(), "4847");
//! assert_eq!(store.asn_for_ipv6("2403:8080:1::5".parse().unwrap()).unwrap(), "17964");
//! ```

pub mod asn;
pub mod config;
pub mod dataset;
pub mod index;

// Re-export core types for library users
pub use asn::AsnStore;
pub use config::{BuildStrategy, IndexConfig, IndexConfigBuilder};
pub use dataset::{build_index, DatasetError, Interval, MappingRow};
pub use index::{BitNumber, IndexError, PrefixEntry, Range, RangeIndex, Trie};

/// Get the version string for asn6
pub fn get_version() -> &'static str {
    if cfg!(debug_assertions) {
        concat!(env!("CARGO_PKG_VERSION"), "-UNRELEASED")
    } else {
        env!("CARGO_PKG_VERSION")
    }
}
