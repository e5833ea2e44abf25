//! asn6 - IPv6 to ASN lookup
//!
//! This is the command-line interface for the asn6 library.

#![allow(clippy::uninlined_format_args)]

use anyhow::{bail, Context, Result};
use asn6::index::codec;
use asn6::{build_index, AsnStore, BuildStrategy, IndexConfig, IndexError, RangeIndex};
use clap::{Parser, Subcommand};
use log::{info, LevelFilter};
use std::fs::File;
use std::io::BufReader;
use std::net::{IpAddr, Ipv6Addr};
use std::path::{Path, PathBuf};

/// Command-line arguments for the lookup tool.
#[derive(Parser, Debug)]
#[clap(author, version = asn6::get_version(), about = "IPv6 to ASN lookup with a compact range index", long_about = None)]
struct Args {
    /// Enable verbose output (repeat for more detail)
    #[clap(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build an index from a tab-separated mapping table
    Build {
        /// Mapping table (start, end, asn per line); defaults to $ASN_IPV6_FILE
        #[clap(short, long)]
        source: Option<PathBuf>,

        /// Where to write the index
        #[clap(short, long)]
        output: PathBuf,

        /// How overlapping rows are resolved
        #[clap(long, value_enum, default_value_t = StrategyArg::Merge)]
        strategy: StrategyArg,

        /// Index file format
        #[clap(long, value_enum, default_value_t = FormatArg::Binary)]
        format: FormatArg,

        /// Maximum number of merge passes
        #[clap(long, default_value_t = asn6::config::DEFAULT_MAX_MERGE_PASSES)]
        max_passes: usize,
    },

    /// Look up the ASN of one or more IPv6 addresses
    Lookup {
        /// Index file produced by `build`
        #[clap(short, long)]
        index: PathBuf,

        /// Index file format
        #[clap(long, value_enum, default_value_t = FormatArg::Binary)]
        format: FormatArg,

        /// Output results in JSON format
        #[clap(long)]
        json: bool,

        /// Addresses to look up
        #[clap(required = true)]
        addresses: Vec<String>,
    },

    /// Show what an index contains
    Inspect {
        /// Index file produced by `build`
        #[clap(short, long)]
        index: PathBuf,

        /// Index file format
        #[clap(long, value_enum, default_value_t = FormatArg::Binary)]
        format: FormatArg,

        /// List every range in JSON format
        #[clap(long)]
        json: bool,
    },
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum StrategyArg {
    Merge,
    Trie,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum FormatArg {
    Binary,
    Json,
}

/// JSON output structure for a single lookup
#[derive(Debug, serde::Serialize)]
struct JsonLookup {
    address: String,
    asn: Option<String>,
}

/// JSON output structure for a single range
#[derive(Debug, serde::Serialize)]
struct JsonRange {
    lower: String,
    upper: String,
    asn: String,
}

fn main() {
    let args = Args::parse();

    if let Err(e) = init_logging(args.verbose) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }

    if let Err(e) = run(args) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

/// Install a stderr logger whose level follows the number of `-v` flags
fn init_logging(verbose: u8) -> Result<()> {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    let show_target = level >= LevelFilter::Debug;
    fern::Dispatch::new()
        .format(move |out, message, record| {
            if show_target {
                out.finish(format_args!(
                    "[{}] [{}] {}",
                    record.level(),
                    record.target(),
                    message
                ))
            } else {
                out.finish(format_args!("[{}] {}", record.level(), message))
            }
        })
        .level(level)
        .chain(std::io::stderr())
        .apply()
        .map_err(|e| anyhow::anyhow!("Failed to init stderr logging: {}", e))
}

fn run(args: Args) -> Result<()> {
    match args.command {
        Command::Build {
            source,
            output,
            strategy,
            format,
            max_passes,
        } => {
            let strategy = match strategy {
                StrategyArg::Merge => BuildStrategy::Merge,
                StrategyArg::Trie => BuildStrategy::Trie,
            };
            let mut builder = IndexConfig::builder()
                .strategy(strategy)
                .max_merge_passes(max_passes);
            if let Some(path) = source {
                builder = builder.source(path);
            }
            let config = builder.build().map_err(anyhow::Error::msg)?;
            let index = build_index(&config)?;
            write_index(&index, &output, format)?;
            info!("Wrote {} ranges to {}", index.len(), output.display());
            Ok(())
        }
        Command::Lookup {
            index,
            format,
            json,
            addresses,
        } => {
            let addrs = addresses
                .iter()
                .map(|s| parse_ipv6(s))
                .collect::<Result<Vec<_>>>()?;
            let store = open_store(&index, format);
            let mut results = Vec::with_capacity(addrs.len());
            for addr in addrs {
                let asn = store.lookup(addr)?.map(str::to_string);
                results.push(JsonLookup {
                    address: addr.to_string(),
                    asn,
                });
            }
            if json {
                println!("{}", serde_json::to_string_pretty(&results)?);
            } else {
                for result in &results {
                    println!(
                        "{}\t{}",
                        result.address,
                        result.asn.as_deref().unwrap_or("-")
                    );
                }
            }
            Ok(())
        }
        Command::Inspect {
            index,
            format,
            json,
        } => {
            let store = open_store(&index, format);
            let index = store.index()?;
            if json {
                let ranges: Vec<JsonRange> = index
                    .iter()
                    .map(|r| JsonRange {
                        lower: r.lower.to_string(),
                        upper: r.upper.to_string(),
                        asn: r.asn.clone(),
                    })
                    .collect();
                println!("{}", serde_json::to_string_pretty(&ranges)?);
            } else {
                println!("{} ranges", index.len());
            }
            Ok(())
        }
    }
}

/// Parse a command-line address, accepting IPv6 only
fn parse_ipv6(s: &str) -> Result<Ipv6Addr> {
    match s.parse::<IpAddr>() {
        Ok(IpAddr::V6(addr)) => Ok(addr),
        Ok(IpAddr::V4(_)) => bail!("{} is not an IPv6 address", s),
        Err(_) => bail!("Invalid IP address: {}", s),
    }
}

/// Encode the whole index before touching `path`, so a failed encode
/// leaves no file behind
fn write_index(index: &RangeIndex, path: &Path, format: FormatArg) -> Result<()> {
    let bytes = match format {
        FormatArg::Binary => codec::encode(index)?,
        FormatArg::Json => serde_json::to_vec(index)?,
    };
    std::fs::write(path, bytes).with_context(|| format!("Cannot write {}", path.display()))
}

fn open_store(path: &Path, format: FormatArg) -> AsnStore {
    match format {
        FormatArg::Binary => AsnStore::from_file(path),
        FormatArg::Json => {
            let path = path.to_path_buf();
            AsnStore::lazy(move || {
                let file = File::open(&path)?;
                let index: RangeIndex = serde_json::from_reader(BufReader::new(file))
                    .map_err(IndexError::from)?;
                Ok(index)
            })
        }
    }
}
