//! Fixed-width binary form of a range index
//!
//! The file is a flat list of 16-byte records, one per range, in ascending
//! order:
//!
//! | bytes  | content                                        |
//! |--------|------------------------------------------------|
//! | 0..6   | lower bound, top 48 bits, big-endian           |
//! | 6..12  | upper bound, top 48 bits, big-endian           |
//! | 12..16 | ASN, little-endian `u32`                       |
//!
//! Public routing prefixes are never longer than /48, so 48 bits are enough
//! for every bound in a real table.

use super::bits::BitNumber;
use super::bound::{Lower, Upper};
use super::error::IndexError;
use super::range::{Range, RangeIndex};
use std::io::{Read, Write};

/// Size of one serialized range
pub const RECORD_LEN: usize = 16;

/// Significant bits stored per bound
pub const BOUND_BITS: usize = 48;

const BOUND_BYTES: usize = BOUND_BITS / 8;
const DROPPED_BITS: u32 = 128 - BOUND_BITS as u32;
const DROPPED_MASK: u128 = (1u128 << DROPPED_BITS) - 1;

/// Top 48 bits of a lower bound, if nothing below them is set
fn lower_to_u48(lower: &Lower) -> Result<u64, IndexError> {
    let value = lower.number().padded(false);
    if value & DROPPED_MASK != 0 {
        return Err(IndexError::Unrepresentable {
            bound: lower.number().to_string(),
        });
    }
    Ok((value >> DROPPED_BITS) as u64)
}

/// Top 48 bits of an upper bound, if everything below them is set
fn upper_to_u48(upper: &Upper) -> Result<u64, IndexError> {
    let value = upper.number().padded(true);
    if value & DROPPED_MASK != DROPPED_MASK {
        return Err(IndexError::Unrepresentable {
            bound: upper.number().to_string(),
        });
    }
    Ok((value >> DROPPED_BITS) as u64)
}

fn u48_to_number(value: u64) -> BitNumber {
    BitNumber::new(u128::from(value) << DROPPED_BITS, BOUND_BITS)
}

fn put_u48(out: &mut Vec<u8>, value: u64) {
    out.extend_from_slice(&value.to_be_bytes()[8 - BOUND_BYTES..]);
}

fn get_u48(bytes: &[u8]) -> u64 {
    let mut buf = [0u8; 8];
    buf[8 - BOUND_BYTES..].copy_from_slice(bytes);
    u64::from_be_bytes(buf)
}

/// Serialize an index into its record list
pub fn encode(index: &RangeIndex) -> Result<Vec<u8>, IndexError> {
    let mut out = Vec::with_capacity(index.len() * RECORD_LEN);
    for range in index {
        let asn: u32 = range
            .asn
            .parse()
            .map_err(|_| IndexError::InvalidAsn(range.asn.clone()))?;
        put_u48(&mut out, lower_to_u48(&range.lower)?);
        put_u48(&mut out, upper_to_u48(&range.upper)?);
        out.extend_from_slice(&asn.to_le_bytes());
    }
    Ok(out)
}

/// Rebuild an index from its record list
///
/// The whole input must decode; a short trailing record or an out-of-order
/// pair rejects the entire file.
pub fn decode(bytes: &[u8]) -> Result<RangeIndex, IndexError> {
    if bytes.len() % RECORD_LEN != 0 {
        return Err(IndexError::Truncated {
            len: bytes.len(),
            record_len: RECORD_LEN,
        });
    }
    let ranges = bytes
        .chunks_exact(RECORD_LEN)
        .map(|record| {
            let lower = get_u48(&record[..BOUND_BYTES]);
            let upper = get_u48(&record[BOUND_BYTES..2 * BOUND_BYTES]);
            let mut asn = [0u8; 4];
            asn.copy_from_slice(&record[2 * BOUND_BYTES..]);
            Range::new(
                Lower(u48_to_number(lower)),
                Upper(u48_to_number(upper)),
                u32::from_le_bytes(asn).to_string(),
            )
        })
        .collect();
    RangeIndex::new(ranges)
}

/// Write the binary form of `index` to `writer`
pub fn write_to<W: Write>(index: &RangeIndex, mut writer: W) -> Result<(), IndexError> {
    writer.write_all(&encode(index)?)?;
    writer.flush()?;
    Ok(())
}

/// Read a binary index from `reader` until end of input
pub fn read_from<R: Read>(mut reader: R) -> Result<RangeIndex, IndexError> {
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;
    decode(&bytes)
}
