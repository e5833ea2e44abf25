//! Offline overlap resolution for raw ASN intervals
//!
//! Source tables list address ranges that may overlap, nest, repeat or
//! touch. This module rewrites them into a strictly increasing sequence of
//! non-overlapping intervals by alternating a sort with a single left-to-right
//! merge sweep until a sweep changes nothing. One sweep is not always enough
//! because splitting a range can expose a new neighbor for the next range.

use super::DatasetError;
use crate::index::codec::BOUND_BITS;
use log::debug;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::net::Ipv6Addr;

/// An inclusive range of 64-bit address prefixes tagged with an ASN
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Interval {
    /// First prefix of the range (top 64 bits of the first address)
    pub start: u64,
    /// Last prefix of the range (top 64 bits of the last address)
    pub end: u64,
    /// Autonomous System Number; 0 means unassigned
    pub asn: u32,
}

impl Interval {
    /// Create an interval
    pub fn new(start: u64, end: u64, asn: u32) -> Self {
        Self { start, end, asn }
    }
}

fn prefix_to_addr(prefix: u64) -> Ipv6Addr {
    Ipv6Addr::from(u128::from(prefix) << 64)
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{{}, {}, {}}}",
            prefix_to_addr(self.start),
            prefix_to_addr(self.end),
            self.asn
        )
    }
}

/// Scan order: start ascending, then the wider range first
fn scan_order(a: &Interval, b: &Interval) -> Ordering {
    a.start.cmp(&b.start).then(b.end.cmp(&a.end))
}

/// Sort intervals into scan order, keeping the input order of exact ties
pub fn sort_intervals(intervals: &mut [Interval]) {
    intervals.sort_by(scan_order);
}

/// One left-to-right sweep over intervals already in scan order
///
/// Pieces owned by ASN 0 are dropped, leaving a hole in the output.
pub fn merge_pass(intervals: &[Interval]) -> Vec<Interval> {
    let mut out = Vec::with_capacity(intervals.len());
    let mut open: Option<Interval> = None;

    for &next in intervals {
        let Some(mut acc) = open else {
            open = Some(next);
            continue;
        };

        if next.start > acc.end.saturating_add(1) {
            emit(&mut out, acc);
            open = Some(next);
            continue;
        }

        if next.asn == acc.asn {
            acc.end = acc.end.max(next.end);
            open = Some(acc);
            continue;
        }

        // Overlapping or touching ranges owned by different networks
        let (mut new, mut old) = (next, acc);
        if new.start < old.start {
            std::mem::swap(&mut new, &mut old);
        }
        // After the swap `new` never starts before `old`
        let later_start = new.start > old.start;
        match (later_start, new.end.cmp(&old.end)) {
            // |   old   |
            //   | new |
            (true, Ordering::Less) => {
                emit(&mut out, Interval::new(old.start, new.start - 1, old.asn));
                emit(&mut out, new);
                old.start = new.end + 1;
            }
            // |   old   |          |   old   |
            //     | new |    or          | new |
            (true, _) => {
                emit(&mut out, Interval::new(old.start, new.start - 1, old.asn));
                old = new;
            }
            // |   old   |
            // |    new    |
            (false, Ordering::Greater) => {
                emit(&mut out, old);
                new.start = old.end + 1;
                old = new;
            }
            // |   old   |
            // | new |
            (false, Ordering::Less) => {
                emit(&mut out, new);
                old.start = new.end + 1;
            }
            // |   old   |
            // |   new   |
            // No principled winner exists; the later one replaces the earlier
            (false, Ordering::Equal) => {
                old = new;
            }
        }
        open = Some(old);
    }

    if let Some(acc) = open {
        emit(&mut out, acc);
    }
    out
}

fn emit(out: &mut Vec<Interval>, interval: Interval) {
    if interval.asn != 0 {
        out.push(interval);
    }
}

/// Resolve overlaps until the sequence stops changing
///
/// Gives up with [`DatasetError::NotConverged`] after `max_passes` sweeps,
/// and checks the result with [`verify_sequence`] before returning it.
pub fn merge_intervals(
    mut intervals: Vec<Interval>,
    max_passes: usize,
) -> Result<Vec<Interval>, DatasetError> {
    for pass in 1..=max_passes {
        let before = intervals.clone();
        sort_intervals(&mut intervals);
        intervals = merge_pass(&intervals);
        debug!(
            "Merge pass {}: {} intervals -> {}",
            pass,
            before.len(),
            intervals.len()
        );
        if intervals == before {
            verify_sequence(&intervals)?;
            return Ok(intervals);
        }
    }
    Err(DatasetError::NotConverged { passes: max_passes })
}

/// Low prefix bits the binary index format drops
const FINE_BITS: u32 = 64 - BOUND_BITS as u32;
const FINE_MASK: u64 = (1 << FINE_BITS) - 1;

/// Widen merged intervals to whole /48 blocks and resolve them again
///
/// Binary index records keep 48 bits per bound, so a piece that starts or
/// ends inside a /48 is stretched to cover all of it. Pieces of different
/// networks that then share a /48 go through the same overlap rules: a
/// contained piece keeps its block, and of two pieces with the same span
/// the one at the higher address wins.
pub fn coarsen_intervals(
    intervals: &[Interval],
    max_passes: usize,
) -> Result<Vec<Interval>, DatasetError> {
    let widened: Vec<Interval> = intervals
        .iter()
        .map(|iv| Interval::new(iv.start & !FINE_MASK, iv.end | FINE_MASK, iv.asn))
        .collect();
    if widened == intervals {
        return Ok(widened);
    }
    debug!("Coarsening {} intervals to /48 blocks", intervals.len());
    merge_intervals(widened, max_passes)
}

/// Check that intervals are well formed, strictly increasing and disjoint
pub fn verify_sequence(intervals: &[Interval]) -> Result<(), DatasetError> {
    let mut previous: Option<&Interval> = None;
    for (index, interval) in intervals.iter().enumerate() {
        if interval.start > interval.end {
            return Err(DatasetError::Inconsistent {
                index,
                reason: format!("AS{} has backward range {}", interval.asn, interval),
            });
        }
        if let Some(prev) = previous {
            if interval.start <= prev.end {
                return Err(DatasetError::Inconsistent {
                    index,
                    reason: format!("{} is not ordered after {}", interval, prev),
                });
            }
        }
        previous = Some(interval);
    }
    Ok(())
}
