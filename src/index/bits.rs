//! Fixed-capacity bit strings for IPv6 prefixes and addresses
//!
//! A [`BitNumber`] is the first `len` bits of a 128-bit big-endian value.
//! Bit 0 is the most significant bit of the address. Bits at positions
//! `>= len` are always zero, so two numbers are equal exactly when their
//! bits and lengths are equal.

use ipnet::Ipv6Net;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::Ipv6Addr;

/// Number of bits in an IPv6 address
pub const ADDRESS_BITS: usize = 128;

/// Mask selecting the first `len` bits of a 128-bit value
pub(crate) fn prefix_mask(len: usize) -> u128 {
    match len {
        0 => 0,
        l if l >= ADDRESS_BITS => u128::MAX,
        l => u128::MAX << (ADDRESS_BITS - l),
    }
}

/// A big-endian bit string of at most 128 bits
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BitNumber {
    bits: u128,
    len: u8,
}

impl BitNumber {
    /// Create a bit string from the first `len` bits of `bits`
    ///
    /// Lengths above 128 are clamped; bits past `len` are discarded.
    pub fn new(bits: u128, len: usize) -> Self {
        let len = len.min(ADDRESS_BITS);
        Self {
            bits: bits & prefix_mask(len),
            len: len as u8,
        }
    }

    /// The full 128-bit string of an address
    pub fn from_addr(addr: Ipv6Addr) -> Self {
        Self::new(u128::from(addr), ADDRESS_BITS)
    }

    /// The network bits of a CIDR prefix
    pub fn from_net(net: Ipv6Net) -> Self {
        Self::new(u128::from(net.network()), usize::from(net.prefix_len()))
    }

    /// A 64-bit value treated as the most significant half of an address
    pub fn from_u64(value: u64) -> Self {
        Self::new(u128::from(value) << 64, 64)
    }

    /// Number of significant bits
    pub fn len(&self) -> usize {
        usize::from(self.len)
    }

    /// Whether the string has no bits at all
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The raw 128-bit value, zero past `len`
    pub fn bits(&self) -> u128 {
        self.bits
    }

    /// The 128-bit value with every position past `len` set to `fill`
    pub fn padded(&self, fill: bool) -> u128 {
        if fill {
            self.bits | !prefix_mask(self.len())
        } else {
            self.bits
        }
    }

    /// Bit at position `i`, which must be below `len`
    pub fn bit_at(&self, i: usize) -> bool {
        debug_assert!(i < self.len(), "bit {i} out of range for length {}", self.len);
        (self.bits >> (ADDRESS_BITS - 1 - i)) & 1 == 1
    }

    /// Set bit `i` in place
    pub fn set_bit(&mut self, i: usize, value: bool) {
        debug_assert!(i < self.len(), "bit {i} out of range for length {}", self.len);
        let bit = 1u128 << (ADDRESS_BITS - 1 - i);
        if value {
            self.bits |= bit;
        } else {
            self.bits &= !bit;
        }
    }

    /// A copy with bit `i` set to `value`
    #[must_use]
    pub fn with_bit(mut self, i: usize, value: bool) -> Self {
        self.set_bit(i, value);
        self
    }

    /// A copy shortened to `len` bits
    #[must_use]
    pub fn truncated(self, len: usize) -> Self {
        Self::new(self.bits, len.min(self.len()))
    }

    /// Length of the longest common prefix, capped at the shorter length
    pub fn common_prefix_len(&self, other: &BitNumber) -> usize {
        let diff = (self.bits ^ other.bits).leading_zeros() as usize;
        diff.min(self.len()).min(other.len())
    }

    /// Whether `self` is a prefix of (or equal to) `other`
    pub fn is_prefix_of(&self, other: &BitNumber) -> bool {
        self.len() <= other.len() && self.common_prefix_len(other) == self.len()
    }

    /// Whether any bit in `from..len` equals `value`
    pub fn any_bit_after(&self, from: usize, value: bool) -> bool {
        if from >= self.len() {
            return false;
        }
        let window = prefix_mask(self.len()) & !prefix_mask(from);
        let bits = if value { self.bits } else { !self.bits };
        bits & window != 0
    }

    /// Index of the last bit equal to `value`, if any
    pub fn least_significant(&self, value: bool) -> Option<usize> {
        let candidates = if value {
            self.bits
        } else {
            !self.bits & prefix_mask(self.len())
        };
        if candidates == 0 {
            None
        } else {
            Some(ADDRESS_BITS - 1 - candidates.trailing_zeros() as usize)
        }
    }

    /// The bits rendered as an address (zero-padded)
    pub fn to_addr(&self) -> Ipv6Addr {
        Ipv6Addr::from(self.bits)
    }
}

impl From<Ipv6Addr> for BitNumber {
    fn from(addr: Ipv6Addr) -> Self {
        Self::from_addr(addr)
    }
}

impl From<Ipv6Net> for BitNumber {
    fn from(net: Ipv6Net) -> Self {
        Self::from_net(net)
    }
}

impl fmt::Display for BitNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.to_addr(), self.len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bits(s: &str) -> BitNumber {
        let mut n = BitNumber::new(0, s.len());
        for (i, c) in s.chars().enumerate() {
            n.set_bit(i, c == '1');
        }
        n
    }

    #[test]
    fn test_new_masks_trailing_bits() {
        let n = BitNumber::new(u128::MAX, 4);
        assert_eq!(n.len(), 4);
        assert_eq!(n.bits(), 0xFu128 << 124);
        assert_eq!(n, bits("1111"));
    }

    #[test]
    fn test_from_net_drops_host_bits() {
        let a: Ipv6Net = "2001:db8::1/32".parse().unwrap();
        let b: Ipv6Net = "2001:db8::/32".parse().unwrap();
        assert_eq!(BitNumber::from_net(a), BitNumber::from_net(b));
        assert_eq!(BitNumber::from_net(b).to_string(), "2001:db8::/32");
    }

    #[test]
    fn test_bit_access() {
        let n = bits("10110");
        let read: Vec<bool> = (0..n.len()).map(|i| n.bit_at(i)).collect();
        assert_eq!(read, vec![true, false, true, true, false]);

        let copy = n.with_bit(1, true);
        assert_eq!(copy, bits("11110"));
        // The original is untouched
        assert_eq!(n, bits("10110"));
    }

    #[test]
    fn test_common_prefix_len() {
        assert_eq!(bits("1011").common_prefix_len(&bits("1001")), 2);
        assert_eq!(bits("1011").common_prefix_len(&bits("101100")), 4);
        assert_eq!(bits("").common_prefix_len(&bits("1")), 0);
        assert_eq!(bits("0").common_prefix_len(&bits("1")), 0);

        // Across byte boundaries
        let a = BitNumber::from_addr("2001:db8::".parse().unwrap());
        let b = BitNumber::from_addr("2001:db9::".parse().unwrap());
        assert_eq!(a.common_prefix_len(&b), 31);
        assert_eq!(a.common_prefix_len(&a), 128);
    }

    #[test]
    fn test_least_significant() {
        assert_eq!(bits("0110").least_significant(true), Some(2));
        assert_eq!(bits("0110").least_significant(false), Some(3));
        assert_eq!(bits("0000").least_significant(true), None);
        assert_eq!(bits("111").least_significant(false), None);
        assert_eq!(bits("").least_significant(true), None);
    }

    #[test]
    fn test_any_bit_after() {
        let n = bits("100100");
        assert!(n.any_bit_after(1, true));
        assert!(!n.any_bit_after(4, true));
        assert!(n.any_bit_after(4, false));
        assert!(!n.any_bit_after(6, false));
    }

    #[test]
    fn test_padded() {
        let n = bits("01");
        assert_eq!(n.padded(false), 1u128 << 126);
        assert_eq!(n.padded(true), u128::MAX >> 1);
    }

    #[test]
    fn test_from_u64() {
        let n = BitNumber::from_u64(0x2001_0db8_0000_0000);
        assert_eq!(n.len(), 64);
        assert_eq!(n.to_addr(), "2001:db8::".parse::<Ipv6Addr>().unwrap());
    }
}
