//! ASN lookup service
//!
//! [`AsnStore`] owns a [`RangeIndex`] that is built at most once, on first
//! use. Readers share the store by reference; after initialization every
//! query is a lock-free binary search.

use crate::config::IndexConfig;
use crate::dataset::build_index;
use crate::index::{codec, IndexError, RangeIndex};
use log::{debug, info, warn};
use once_cell::sync::OnceCell;
use std::fmt;
use std::fs::File;
use std::io::BufReader;
use std::net::{IpAddr, Ipv6Addr};
use std::path::PathBuf;

type Loader = Box<dyn Fn() -> Result<RangeIndex, IndexError> + Send + Sync>;

/// Once-initialized holder of an IPv6 range index
///
/// The loader runs exactly once even when many threads ask for the index
/// at the same time; the others block until it finishes. Its outcome is
/// kept, so a failed build is reported to every caller instead of being
/// retried or replaced by an empty index.
///
/// # Examples
///
/// ```
/// use asn6::asn::AsnStore;
/// use asn6::index::{RangeIndex, Trie};
///
/// let mut trie = Trie::new();
/// trie.insert_net("2001:4860::/32".parse().unwrap(), "15169");
/// let store = AsnStore::new(RangeIndex::from_trie(&trie));
///
/// let asn = store.asn_for_ipv6("2001:4860:4860::8888".parse().unwrap()).unwrap();
/// assert_eq!(asn, "15169");
/// ```
pub struct AsnStore {
    cell: OnceCell<Result<RangeIndex, IndexError>>,
    loader: Option<Loader>,
}

impl AsnStore {
    /// Create a store around an index that is already built
    pub fn new(index: RangeIndex) -> Self {
        Self {
            cell: OnceCell::with_value(Ok(index)),
            loader: None,
        }
    }

    /// Create a store that builds its index on first use
    pub fn lazy<F>(loader: F) -> Self
    where
        F: Fn() -> Result<RangeIndex, IndexError> + Send + Sync + 'static,
    {
        Self {
            cell: OnceCell::new(),
            loader: Some(Box::new(loader)),
        }
    }

    /// Create a store that reads a binary index file on first use
    pub fn from_file(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self::lazy(move || {
            debug!("Loading index from {}", path.display());
            let file = File::open(&path)?;
            codec::read_from(BufReader::new(file))
        })
    }

    /// Create a store that builds its index from a mapping table on first use
    pub fn from_config(config: IndexConfig) -> Self {
        Self::lazy(move || build_index(&config).map_err(|e| IndexError::Load(e.to_string())))
    }

    /// The index, building it first if needed
    pub fn index(&self) -> Result<&RangeIndex, IndexError> {
        let outcome = self.cell.get_or_init(|| {
            let outcome = match &self.loader {
                Some(load) => load(),
                None => Err(IndexError::Load("no index loader configured".to_string())),
            };
            match &outcome {
                Ok(index) => info!("Index ready with {} ranges", index.len()),
                Err(e) => warn!("Index build failed: {}", e),
            }
            outcome
        });
        outcome.as_ref().map_err(Clone::clone)
    }

    /// Look up the ASN for an IPv6 address
    ///
    /// Returns an empty string when no range covers the address and an
    /// error for IPv4 input or when the index could not be built.
    pub fn asn_for_ipv6(&self, ip: IpAddr) -> Result<String, IndexError> {
        self.index()?.asn_for_ipv6(ip)
    }

    /// The ASN covering `addr`, if any
    pub fn lookup(&self, addr: Ipv6Addr) -> Result<Option<&str>, IndexError> {
        Ok(self.index()?.lookup(addr))
    }

    /// Whether the loader has already run
    pub fn is_initialized(&self) -> bool {
        self.cell.get().is_some()
    }
}

impl fmt::Debug for AsnStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match self.cell.get() {
            None => "pending".to_string(),
            Some(Ok(index)) => format!("{} ranges", index.len()),
            Some(Err(e)) => format!("failed: {}", e),
        };
        f.debug_struct("AsnStore").field("index", &state).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::Trie;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn google_index() -> RangeIndex {
        let mut trie = Trie::new();
        trie.insert_net("2001:4860::/32".parse().unwrap(), "15169");
        RangeIndex::from_trie(&trie)
    }

    #[test]
    fn test_ready_store() {
        let store = AsnStore::new(google_index());
        assert!(store.is_initialized());
        assert_eq!(
            store.asn_for_ipv6("2001:4860::1".parse().unwrap()).unwrap(),
            "15169"
        );
        assert_eq!(store.asn_for_ipv6("2001:db8::1".parse().unwrap()).unwrap(), "");
        assert!(store.asn_for_ipv6("8.8.8.8".parse().unwrap()).is_err());
    }

    #[test]
    fn test_loader_runs_once_under_contention() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let store = AsnStore::lazy(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            std::thread::sleep(std::time::Duration::from_millis(20));
            Ok(google_index())
        });
        assert!(!store.is_initialized());

        std::thread::scope(|s| {
            for _ in 0..8 {
                s.spawn(|| {
                    let asn = store.lookup("2001:4860:4860::8888".parse().unwrap());
                    assert_eq!(asn, Ok(Some("15169")));
                });
            }
        });
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(store.is_initialized());
    }

    #[test]
    fn test_failure_is_cached_and_reported() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let store = AsnStore::lazy(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(IndexError::Load("table unavailable".to_string()))
        });
        for _ in 0..3 {
            let err = store.asn_for_ipv6("2001:4860::1".parse().unwrap()).unwrap_err();
            assert_eq!(err, IndexError::Load("table unavailable".to_string()));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(format!("{:?}", store).contains("failed"));
    }

    #[test]
    fn test_missing_index_file() {
        let store = AsnStore::from_file("/nonexistent/asn6.idx");
        assert!(matches!(store.index(), Err(IndexError::Io(_))));
    }

    #[test]
    fn test_from_config_missing_table() {
        let config = IndexConfig {
            source: Some("/nonexistent/ip2asn-v6.tsv".into()),
            ..IndexConfig::default()
        };
        let store = AsnStore::from_config(config);
        assert!(matches!(store.index(), Err(IndexError::Load(_))));
    }
}
