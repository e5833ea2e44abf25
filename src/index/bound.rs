//! Exact interval bounds over bit strings
//!
//! A bit string `b0 b1 ... bn` names a real number in `[0, 1]`. Read as a
//! [`Lower`] bound it continues with infinitely many zeros: the smallest
//! address carrying that prefix. Read as an [`Upper`] bound it continues
//! with infinitely many ones: the largest such address. Comparing bounds
//! this way orders prefixes and addresses without any floating point and
//! without ever materializing the padding.

use super::bits::BitNumber;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A bit string read as a lower bound (implicit zero padding)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Lower(pub BitNumber);

/// A bit string read as an upper bound (implicit one padding)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Upper(pub BitNumber);

impl Lower {
    /// The underlying bit string
    pub fn number(&self) -> &BitNumber {
        &self.0
    }

    /// The largest upper bound strictly below this one
    ///
    /// Clears the least significant one bit and cuts the string there.
    /// Returns `None` for a bound made only of zeros, which is the bottom
    /// of the address space.
    pub fn prev(&self) -> Option<Upper> {
        let i = self.0.least_significant(true)?;
        Some(Upper(self.0.with_bit(i, false).truncated(i + 1)))
    }
}

impl Upper {
    /// The underlying bit string
    pub fn number(&self) -> &BitNumber {
        &self.0
    }

    /// The smallest lower bound strictly above this one
    ///
    /// Sets the least significant zero bit and cuts the string there.
    /// Returns `None` for a bound made only of ones, which is the top of
    /// the address space.
    pub fn next(&self) -> Option<Lower> {
        let i = self.0.least_significant(false)?;
        Some(Lower(self.0.with_bit(i, true).truncated(i + 1)))
    }
}

/// `a < b` for two lower bounds
pub fn lower_less(a: &Lower, b: &Lower) -> bool {
    let (a, b) = (&a.0, &b.0);
    let cpl = a.common_prefix_len(b);
    if cpl < a.len().min(b.len()) {
        return !a.bit_at(cpl);
    }
    if a.len() < b.len() {
        // a is a proper prefix of b; its zero tail is smaller only if b
        // has a one somewhere past the shared part
        return b.any_bit_after(cpl, true);
    }
    false
}

/// `a < b` for two upper bounds
pub fn upper_less(a: &Upper, b: &Upper) -> bool {
    let (a, b) = (&a.0, &b.0);
    let cpl = a.common_prefix_len(b);
    if cpl < a.len().min(b.len()) {
        return !a.bit_at(cpl);
    }
    if a.len() > b.len() {
        // b is a proper prefix of a; b's one tail wins unless a has a zero
        // somewhere past the shared part
        return a.any_bit_after(cpl, false);
    }
    false
}

/// `sup < sub`: is there a non-empty gap between an upper and a lower bound
pub fn upper_lower_less(sup: &Upper, sub: &Lower) -> bool {
    let (x, y) = (&sup.0, &sub.0);
    let cpl = x.common_prefix_len(y);
    if cpl < x.len().min(y.len()) {
        // `x0111...` and `y1000...` touch without leaving room between them
        return !x.bit_at(cpl) && (x.any_bit_after(cpl + 1, false) || y.any_bit_after(cpl + 1, true));
    }
    false
}

/// `sub < sup`: does a lower bound start before an upper bound ends
pub fn lower_upper_less(sub: &Lower, sup: &Upper) -> bool {
    let (x, y) = (&sub.0, &sup.0);
    let cpl = x.common_prefix_len(y);
    if cpl < x.len().min(y.len()) {
        return !x.bit_at(cpl);
    }
    true
}

impl fmt::Display for Lower {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.to_addr())
    }
}

impl fmt::Display for Upper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", std::net::Ipv6Addr::from(self.0.padded(true)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cmp::Ordering;

    fn bits(s: &str) -> BitNumber {
        let mut n = BitNumber::new(0, s.len());
        for (i, c) in s.chars().enumerate() {
            n.set_bit(i, c == '1');
        }
        n
    }

    /// Every bit string up to `max_len` bits, the empty string included
    fn all_strings(max_len: usize) -> Vec<BitNumber> {
        let mut out = Vec::new();
        for len in 0..=max_len {
            for v in 0..(1u128 << len) {
                let bits = if len == 0 { 0 } else { v << (128 - len) };
                out.push(BitNumber::new(bits, len));
            }
        }
        out
    }

    /// Reference order for lower/lower, upper/upper and lower/upper pairs:
    /// expand both bounds to 128 bits, then compare the tails past bit 128.
    /// Not valid for upper/lower, where a one tail carries into bit 127.
    fn reference(a: &BitNumber, a_fill: bool, b: &BitNumber, b_fill: bool) -> Ordering {
        a.padded(a_fill)
            .cmp(&b.padded(b_fill))
            .then(a_fill.cmp(&b_fill))
    }

    #[test]
    fn test_lower_less_edge_cases() {
        assert!(lower_less(&Lower(bits("01")), &Lower(bits("10"))));
        assert!(!lower_less(&Lower(bits("10")), &Lower(bits("01"))));
        // A trailing run of zeros is the same number
        assert!(!lower_less(&Lower(bits("01")), &Lower(bits("0100"))));
        assert!(!lower_less(&Lower(bits("0100")), &Lower(bits("01"))));
        assert!(lower_less(&Lower(bits("01")), &Lower(bits("0101"))));
        assert!(!lower_less(&Lower(bits("011")), &Lower(bits("011"))));
    }

    #[test]
    fn test_upper_less_edge_cases() {
        assert!(upper_less(&Upper(bits("01")), &Upper(bits("10"))));
        // A trailing run of ones is the same number
        assert!(!upper_less(&Upper(bits("0111")), &Upper(bits("01"))));
        assert!(!upper_less(&Upper(bits("01")), &Upper(bits("0111"))));
        // The longer string is smaller once it has a zero past the prefix
        assert!(upper_less(&Upper(bits("0110")), &Upper(bits("01"))));
        assert!(!upper_less(&Upper(bits("01")), &Upper(bits("0110"))));
    }

    #[test]
    fn test_upper_lower_less_edge_cases() {
        // Adjacent: 0111... meets 1000...
        assert!(!upper_lower_less(&Upper(bits("0")), &Lower(bits("1"))));
        assert!(!upper_lower_less(&Upper(bits("011")), &Lower(bits("100"))));
        // One free address range in between
        assert!(upper_lower_less(&Upper(bits("010")), &Lower(bits("1"))));
        assert!(upper_lower_less(&Upper(bits("0")), &Lower(bits("11"))));
        // Never when one is a prefix of the other
        assert!(!upper_lower_less(&Upper(bits("01")), &Lower(bits("0110"))));
        assert!(!upper_lower_less(&Upper(bits("0110")), &Lower(bits("01"))));
    }

    #[test]
    fn test_predicates_match_real_order() {
        let strings = all_strings(5);
        for a in &strings {
            for b in &strings {
                assert_eq!(
                    lower_less(&Lower(*a), &Lower(*b)),
                    reference(a, false, b, false) == Ordering::Less,
                    "lower_less({a}, {b})"
                );
                assert_eq!(
                    upper_less(&Upper(*a), &Upper(*b)),
                    reference(a, true, b, true) == Ordering::Less,
                    "upper_less({a}, {b})"
                );
                assert_eq!(
                    lower_upper_less(&Lower(*a), &Upper(*b)),
                    reference(a, false, b, true) == Ordering::Less,
                    "lower_upper_less({a}, {b})"
                );
            }
        }
    }

    #[test]
    fn test_gap_predicate_matches_neighbors() {
        // A gap between sup and sub is non-empty exactly when the first
        // address after sup is not past the last address before sub
        let strings = all_strings(5);
        for a in &strings {
            for b in &strings {
                let sup = Upper(*a);
                let sub = Lower(*b);
                let expected = match (sup.next(), sub.prev()) {
                    (Some(from), Some(to)) => lower_upper_less(&from, &to),
                    _ => false,
                };
                assert_eq!(upper_lower_less(&sup, &sub), expected, "gap({a}, {b})");
            }
        }
    }

    #[test]
    fn test_prev() {
        assert_eq!(Lower(bits("0110")).prev(), Some(Upper(bits("010"))));
        assert_eq!(Lower(bits("1")).prev(), Some(Upper(bits("0"))));
        assert_eq!(Lower(bits("000")).prev(), None);
        assert_eq!(Lower(bits("")).prev(), None);
    }

    #[test]
    fn test_next() {
        assert_eq!(Upper(bits("0101")).next(), Some(Lower(bits("011"))));
        assert_eq!(Upper(bits("0")).next(), Some(Lower(bits("1"))));
        assert_eq!(Upper(bits("111")).next(), None);
    }

    #[test]
    fn test_prefix_bounds_are_extreme_addresses() {
        let net: ipnet::Ipv6Net = "2001:db8::/32".parse().unwrap();
        let prefix = BitNumber::from_net(net);
        let first = BitNumber::from_addr(net.network());
        let last = BitNumber::from_addr(net.broadcast());

        assert!(!lower_less(&Lower(prefix), &Lower(first)));
        assert!(!lower_less(&Lower(first), &Lower(prefix)));
        assert!(!upper_less(&Upper(prefix), &Upper(last)));
        assert!(!upper_less(&Upper(last), &Upper(prefix)));
        assert_eq!(Upper(prefix).to_string(), "2001:db8:ffff:ffff:ffff:ffff:ffff:ffff");
    }
}
