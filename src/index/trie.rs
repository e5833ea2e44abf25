//! Binary trie of CIDR prefixes
//!
//! Every node may hold one [`PrefixEntry`]. A childless node may hold an
//! entry of any length at or below its depth; a node with children only
//! ever holds an entry whose length equals its depth, which then covers
//! the whole subtree. More specific prefixes therefore always live deeper
//! than the prefixes that contain them.

use super::bits::BitNumber;
use ipnet::Ipv6Net;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::Ipv6Addr;

/// One CIDR-to-ASN association as ingested
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrefixEntry {
    /// Network bits of the prefix
    pub prefix: BitNumber,
    /// Autonomous System Number (e.g., "15169")
    pub asn: String,
}

impl PrefixEntry {
    /// Create an entry from a network prefix; host bits are ignored
    pub fn new(net: Ipv6Net, asn: impl Into<String>) -> Self {
        Self {
            prefix: BitNumber::from_net(net),
            asn: asn.into(),
        }
    }

    /// Prefix length in bits
    pub fn len(&self) -> usize {
        self.prefix.len()
    }

    /// Whether this is the zero-length prefix covering everything
    pub fn is_empty(&self) -> bool {
        self.prefix.is_empty()
    }

    /// Whether the prefix covers `addr`
    pub fn contains(&self, addr: &BitNumber) -> bool {
        self.prefix.is_prefix_of(addr)
    }
}

impl fmt::Display for PrefixEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> AS{}", self.prefix, self.asn)
    }
}

/// Outcome of [`Trie::insert`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Insertion {
    /// The entry was stored at this depth
    Inserted {
        /// Depth of the node that holds the entry after insertion
        depth: usize,
    },
    /// An entry for the same prefix already exists; the trie is unchanged
    Duplicate {
        /// Depth of the node holding the existing entry
        depth: usize,
    },
}

impl Insertion {
    /// Whether the entry was stored
    pub fn is_inserted(&self) -> bool {
        matches!(self, Insertion::Inserted { .. })
    }
}

/// A trie node, owned exclusively by its parent
#[derive(Debug, Default)]
pub(crate) struct Node {
    entry: Option<PrefixEntry>,
    children: Option<Box<[Node; 2]>>,
}

impl Node {
    pub(crate) fn entry(&self) -> Option<&PrefixEntry> {
        self.entry.as_ref()
    }

    pub(crate) fn children(&self) -> Option<&[Node; 2]> {
        self.children.as_deref()
    }

    fn insert_at(&mut self, depth: usize, mut entry: PrefixEntry) -> Insertion {
        if entry.len() == depth {
            match self.entry.as_mut() {
                None => {
                    self.entry = Some(entry);
                    return Insertion::Inserted { depth };
                }
                Some(existing) if existing.prefix == entry.prefix => {
                    return Insertion::Duplicate { depth };
                }
                // The stored entry is longer; the new one covers it and
                // takes its place while the old one moves down
                Some(existing) => std::mem::swap(existing, &mut entry),
            }
        }

        let bit = usize::from(entry.prefix.bit_at(depth));
        if let Some(children) = self.children.as_mut() {
            return children[bit].insert_at(depth + 1, entry);
        }

        match self.entry.take() {
            None => {
                self.entry = Some(entry);
                Insertion::Inserted { depth }
            }
            Some(existing) if existing.prefix == entry.prefix => {
                self.entry = Some(existing);
                Insertion::Duplicate { depth }
            }
            Some(existing) => {
                let mut children = Box::<[Node; 2]>::default();
                if existing.len() == depth {
                    self.entry = Some(existing);
                } else {
                    let existing_bit = usize::from(existing.prefix.bit_at(depth));
                    children[existing_bit].entry = Some(existing);
                }
                let inserted = children[bit].insert_at(depth + 1, entry);
                self.children = Some(children);
                inserted
            }
        }
    }

    fn find(&self, depth: usize, prefix: &BitNumber) -> Option<&PrefixEntry> {
        if let Some(entry) = &self.entry {
            if entry.prefix == *prefix {
                return Some(entry);
            }
        }
        if depth >= prefix.len() {
            return None;
        }
        let children = self.children.as_ref()?;
        children[usize::from(prefix.bit_at(depth))].find(depth + 1, prefix)
    }
}

/// A binary trie mapping IPv6 prefixes to ASNs
#[derive(Debug, Default)]
pub struct Trie {
    root: Node,
    len: usize,
}

impl Trie {
    /// Create an empty trie
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an entry
    ///
    /// The first entry stored for a prefix wins; later entries for the same
    /// prefix are reported as [`Insertion::Duplicate`] and dropped.
    pub fn insert(&mut self, entry: PrefixEntry) -> Insertion {
        let prefix = entry.prefix;
        let asn = entry.asn.clone();
        let outcome = self.root.insert_at(0, entry);
        match outcome {
            Insertion::Inserted { .. } => self.len += 1,
            Insertion::Duplicate { depth } => {
                match self.get(&prefix) {
                    Some(existing) if existing.asn != asn => warn!(
                        "Conflicting ASN for {}: keeping AS{}, dropping AS{}",
                        prefix, existing.asn, asn
                    ),
                    _ => debug!("Duplicate prefix {} at depth {}", prefix, depth),
                }
            }
        }
        outcome
    }

    /// Insert a network prefix with its ASN
    pub fn insert_net(&mut self, net: Ipv6Net, asn: impl Into<String>) -> Insertion {
        self.insert(PrefixEntry::new(net, asn))
    }

    /// The entry stored for exactly this prefix
    pub fn get(&self, prefix: &BitNumber) -> Option<&PrefixEntry> {
        self.root.find(0, prefix)
    }

    /// The most specific stored prefix covering `addr`
    pub fn longest_match(&self, addr: Ipv6Addr) -> Option<&PrefixEntry> {
        let addr = BitNumber::from_addr(addr);
        let mut best = None;
        let mut node = &self.root;
        let mut depth = 0;
        loop {
            if let Some(entry) = &node.entry {
                if entry.contains(&addr) {
                    best = Some(entry);
                }
            }
            match &node.children {
                Some(children) if depth < addr.len() => {
                    node = &children[usize::from(addr.bit_at(depth))];
                    depth += 1;
                }
                _ => return best,
            }
        }
    }

    /// Number of stored entries
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the trie holds no entries
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub(crate) fn root(&self) -> &Node {
        &self.root
    }
}

impl FromIterator<PrefixEntry> for Trie {
    fn from_iter<I: IntoIterator<Item = PrefixEntry>>(iter: I) -> Self {
        let mut trie = Trie::new();
        for entry in iter {
            trie.insert(entry);
        }
        trie
    }
}
