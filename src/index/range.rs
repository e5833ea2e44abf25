//! Sorted disjoint ranges and the binary-search lookup over them

use super::bits::{BitNumber, ADDRESS_BITS};
use super::bound::{lower_less, upper_less, Lower, Upper};
use super::error::IndexError;
use super::extract::{precedes, sort_ranges};
use super::trie::{PrefixEntry, Trie};
use crate::dataset::Interval;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::{IpAddr, Ipv6Addr};

/// A closed address interval tagged with the ASN that originates it
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Range {
    /// First address of the range
    pub lower: Lower,
    /// Last address of the range
    pub upper: Upper,
    /// Autonomous System Number (e.g., "15169")
    pub asn: String,
}

impl Range {
    /// Create a range from its bounds
    pub fn new(lower: Lower, upper: Upper, asn: impl Into<String>) -> Self {
        Self {
            lower,
            upper,
            asn: asn.into(),
        }
    }

    /// The range covering exactly one prefix
    pub fn exact(entry: &PrefixEntry) -> Self {
        Self::new(Lower(entry.prefix), Upper(entry.prefix), entry.asn.clone())
    }

    /// Whether `addr` lies within the range, both ends included
    pub fn contains(&self, addr: &BitNumber) -> bool {
        !lower_less(&Lower(*addr), &self.lower) && !upper_less(&self.upper, &Upper(*addr))
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {} AS{}", self.lower, self.upper, self.asn)
    }
}

impl From<&Interval> for Range {
    fn from(interval: &Interval) -> Self {
        Range::new(
            Lower(BitNumber::from_u64(interval.start)),
            Upper(BitNumber::from_u64(interval.end)),
            interval.asn.to_string(),
        )
    }
}

/// An immutable, sorted sequence of disjoint ranges
///
/// Built once and then shared freely: every lookup is a read-only binary
/// search, so concurrent readers need no synchronization.
///
/// # Examples
///
/// ```
/// use asn6::index::{RangeIndex, Trie};
///
/// let mut trie = Trie::new();
/// trie.insert_net("2001:4860:4860::/48".parse().unwrap(), "15169");
/// let index = RangeIndex::from_trie(&trie);
///
/// assert_eq!(index.lookup("2001:4860:4860::8888".parse().unwrap()), Some("15169"));
/// assert_eq!(index.lookup("2001:4860:4861::1".parse().unwrap()), None);
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Range>", into = "Vec<Range>")]
pub struct RangeIndex {
    ranges: Vec<Range>,
}

impl RangeIndex {
    /// Wrap an already sorted sequence, validating its order
    pub fn new(ranges: Vec<Range>) -> Result<Self, IndexError> {
        if let Some(index) = ranges
            .windows(2)
            .position(|pair| !precedes(&pair[0], &pair[1]))
        {
            return Err(IndexError::Unordered { index: index + 1 });
        }
        Ok(Self { ranges })
    }

    /// Flatten a trie into an index
    pub fn from_trie(trie: &Trie) -> Self {
        Self {
            ranges: sort_ranges(trie),
        }
    }

    /// Build an index from merged 64-bit intervals
    pub fn from_intervals(intervals: &[Interval]) -> Result<Self, IndexError> {
        Self::new(intervals.iter().map(Range::from).collect())
    }

    /// The ASN of the range containing `addr`, if any
    pub fn lookup(&self, addr: Ipv6Addr) -> Option<&str> {
        self.find(&BitNumber::from_addr(addr))
            .map(|range| range.asn.as_str())
    }

    /// Like [`lookup`](Self::lookup) for a raw bit string, which must be a
    /// full 128-bit address
    pub fn lookup_bits(&self, addr: &BitNumber) -> Result<Option<&str>, IndexError> {
        if addr.len() != ADDRESS_BITS {
            return Err(IndexError::InvalidAddress(format!(
                "expected {ADDRESS_BITS} bits, got {}",
                addr.len()
            )));
        }
        Ok(self.find(addr).map(|range| range.asn.as_str()))
    }

    /// The range containing `addr`, if any
    pub fn find(&self, addr: &BitNumber) -> Option<&Range> {
        let point = Lower(*addr);
        // Ranges before `j` start at or below the address
        let j = self
            .ranges
            .partition_point(|range| !lower_less(&point, &range.lower));
        let j = j.checked_sub(1)?;
        let candidate = &self.ranges[j];
        if upper_less(&candidate.upper, &Upper(*addr)) {
            None
        } else {
            Some(candidate)
        }
    }

    /// ASN originating `ip`, or an empty string when nothing covers it
    ///
    /// Only IPv6 addresses are accepted; an IPv4 address is an error, not
    /// a miss.
    pub fn asn_for_ipv6(&self, ip: IpAddr) -> Result<String, IndexError> {
        match ip {
            IpAddr::V6(v6) => Ok(self.lookup(v6).unwrap_or_default().to_string()),
            IpAddr::V4(v4) => Err(IndexError::InvalidAddress(format!(
                "{v4} is not an IPv6 address"
            ))),
        }
    }

    /// Same as [`asn_for_ipv6`](Self::asn_for_ipv6) for a raw 16-byte address
    pub fn asn_for_ipv6_bytes(&self, ip: &[u8]) -> Result<String, IndexError> {
        let octets: [u8; 16] = ip.try_into().map_err(|_| {
            IndexError::InvalidAddress(format!("expected 16 bytes, got {}", ip.len()))
        })?;
        self.asn_for_ipv6(IpAddr::V6(Ipv6Addr::from(octets)))
    }

    /// The ranges in ascending order
    pub fn ranges(&self) -> &[Range] {
        &self.ranges
    }

    /// Iterate over the ranges in ascending order
    pub fn iter(&self) -> std::slice::Iter<'_, Range> {
        self.ranges.iter()
    }

    /// Number of ranges
    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    /// Whether the index maps no address at all
    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }
}

impl TryFrom<Vec<Range>> for RangeIndex {
    type Error = IndexError;

    fn try_from(ranges: Vec<Range>) -> Result<Self, Self::Error> {
        Self::new(ranges)
    }
}

impl From<RangeIndex> for Vec<Range> {
    fn from(index: RangeIndex) -> Self {
        index.ranges
    }
}

impl<'a> IntoIterator for &'a RangeIndex {
    type Item = &'a Range;
    type IntoIter = std::slice::Iter<'a, Range>;

    fn into_iter(self) -> Self::IntoIter {
        self.ranges.iter()
    }
}
