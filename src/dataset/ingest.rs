//! Reading tab-separated IPv6-to-ASN tables
//!
//! Each line holds `start_ip<TAB>end_ip<TAB>asn`, optionally followed by
//! more columns (country, registry name) that are ignored. Rows for ASN 0
//! mark unrouted space and are skipped.

use super::merge::Interval;
use super::DatasetError;
use crate::index::PrefixEntry;
use ipnet::Ipv6Subnets;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::net::Ipv6Addr;
use std::path::Path;

/// One row of a mapping table
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MappingRow {
    /// First address of the block
    pub start: Ipv6Addr,
    /// Last address of the block
    pub end: Ipv6Addr,
    /// Originating AS
    pub asn: u32,
}

impl MappingRow {
    /// The row as a range of 64-bit prefixes
    pub fn to_interval(&self) -> Interval {
        Interval::new(top_half(self.start), top_half(self.end), self.asn)
    }

    /// The smallest set of CIDR blocks covering exactly `start..=end`
    pub fn prefixes(&self) -> impl Iterator<Item = PrefixEntry> + '_ {
        Ipv6Subnets::new(self.start, self.end, 0)
            .map(move |net| PrefixEntry::new(net, self.asn.to_string()))
    }
}

fn top_half(addr: Ipv6Addr) -> u64 {
    (u128::from(addr) >> 64) as u64
}

fn parse_addr(field: &str, line: usize) -> Result<Ipv6Addr, DatasetError> {
    field.trim().parse().map_err(|_| DatasetError::InvalidRecord {
        line,
        reason: format!("{:?} is not an IPv6 address", field),
    })
}

/// Parse one line; `Ok(None)` for lines that carry no mapping
fn parse_line(text: &str, line: usize) -> Result<Option<MappingRow>, DatasetError> {
    if text.trim().is_empty() {
        return Ok(None);
    }
    let fields: Vec<&str> = text.trim_end_matches('\r').split('\t').collect();
    if fields.len() < 3 {
        return Err(DatasetError::InvalidRecord {
            line,
            reason: format!("expected at least 3 columns, found {}", fields.len()),
        });
    }

    let asn_field = fields[2].trim();
    if asn_field == "0" {
        return Ok(None);
    }

    let start = parse_addr(fields[0], line)?;
    let end = parse_addr(fields[1], line)?;
    let asn = asn_field
        .parse::<u32>()
        .map_err(|_| DatasetError::InvalidRecord {
            line,
            reason: format!("{:?} is not a valid ASN", asn_field),
        })?;
    if start > end {
        return Err(DatasetError::InvalidRecord {
            line,
            reason: format!("start {} is after end {}", start, end),
        });
    }
    Ok(Some(MappingRow { start, end, asn }))
}

/// Parse a whole mapping table
///
/// Any malformed line aborts the parse; line numbers in errors are 1-based.
pub fn parse_mapping<R: BufRead>(reader: R) -> Result<Vec<MappingRow>, DatasetError> {
    let mut rows = Vec::new();
    for (i, text) in reader.lines().enumerate() {
        let line = i + 1;
        let text = text.map_err(|e| DatasetError::InvalidRecord {
            line,
            reason: e.to_string(),
        })?;
        if let Some(row) = parse_line(&text, line)? {
            rows.push(row);
        }
    }
    Ok(rows)
}

/// Open and parse a mapping table from disk
pub fn read_mapping_file(path: &Path) -> Result<Vec<MappingRow>, DatasetError> {
    let file = File::open(path).map_err(|source| DatasetError::Io {
        path: path.display().to_string(),
        source,
    })?;
    parse_mapping(BufReader::new(file))
}
