//! Flattening a trie into sorted, disjoint ranges
//!
//! Each subtree is turned into the ranges it answers for, left to right.
//! A node carrying a covering entry then claims every address of its prefix
//! that none of its descendants claimed, producing gap ranges between the
//! descendant ranges. Because the left subtree holds strictly smaller
//! addresses than the right one, concatenation keeps the output sorted.

use super::bound::{lower_less, lower_upper_less, upper_lower_less, Lower, Upper};
use super::range::Range;
use super::trie::{Node, PrefixEntry, Trie};

/// Sorted, disjoint ranges answering longest-prefix-match for `trie`
pub fn sort_ranges(trie: &Trie) -> Vec<Range> {
    let ranges = sort_node(trie.root());
    debug_assert!(is_monotonic(&ranges), "extracted ranges out of order");
    ranges
}

fn sort_node(node: &Node) -> Vec<Range> {
    let Some(children) = node.children() else {
        return node.entry().map(Range::exact).into_iter().collect();
    };

    let mut ranges = sort_node(&children[0]);
    ranges.extend(sort_node(&children[1]));
    match node.entry() {
        Some(covering) => fill_gaps(covering, ranges),
        None => ranges,
    }
}

/// Interleave `inner` with ranges for the parts of `covering` it leaves open
fn fill_gaps(covering: &PrefixEntry, inner: Vec<Range>) -> Vec<Range> {
    let top = Upper(covering.prefix);
    let mut out = Vec::with_capacity(inner.len() * 2 + 1);
    // First address of `covering` not yet accounted for; None once the top
    // of the address space has been reached
    let mut open = Some(Lower(covering.prefix));

    for range in inner {
        if let Some(from) = open {
            if lower_less(&from, &range.lower) {
                if let Some(to) = range.lower.prev() {
                    out.push(Range::new(from, to, covering.asn.clone()));
                }
            }
        }
        open = range.upper.next();
        out.push(range);
    }

    if let Some(from) = open {
        if lower_upper_less(&from, &top) {
            out.push(Range::new(from, top, covering.asn.clone()));
        }
    }
    out
}

/// Whether every range ends strictly before the next one begins
pub fn is_monotonic(ranges: &[Range]) -> bool {
    ranges.windows(2).all(|pair| precedes(&pair[0], &pair[1]))
}

/// Whether `a` ends before `b` starts, with no shared address
pub(crate) fn precedes(a: &Range, b: &Range) -> bool {
    !lower_upper_less(&b.lower, &a.upper)
}

/// Whether there is unmapped space between `a` and `b`
pub fn has_gap(a: &Range, b: &Range) -> bool {
    upper_lower_less(&a.upper, &b.lower)
}
