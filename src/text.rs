//! Reading IP sets from address-list text files.
//!
//! The input format is one address per line, optionally followed by
//! `/cidr`. A leading `!` marks the entry for removal; removals are
//! applied after all insertions, so a file can say "this network, except
//! these addresses" regardless of line order. Lines starting with `#` or
//! whitespace are ignored.
//!
//! Offending lines do not abort the read: each failure is collected with
//! its line number and parsing continues. Only a failure of the
//! underlying stream is returned as an error.

use std::fmt;
use std::io::BufRead;
use std::net::IpAddr;

use log::warn;

use crate::bdd::Bdd;
use crate::bits::{mask_host_bits, IPV4_BITS, IPV6_BITS};
use crate::error::Error;
use crate::ipset::IpSet;

/// A failure to parse or apply one input line.
#[derive(Debug)]
pub struct LineError {
    pub line: usize,
    pub message: String,
}

impl fmt::Display for LineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {}", self.line, self.message)
    }
}

/// One parsed entry: an address, or a network when a prefix is present.
struct Entry {
    addr: IpAddr,
    cidr: Option<u8>,
}

/// A removal deferred until all insertions are done.
struct Removal {
    line: usize,
    entry: Entry,
}

/// Reads an address list from `reader` into `set`, returning the
/// per-line failures.
///
/// With `loose_cidr`, a network whose host bits are set is silently
/// masked down to its prefix; otherwise it is reported as an error.
pub fn read_into<R: BufRead>(bdd: &mut Bdd, set: &mut IpSet, reader: R, loose_cidr: bool) -> Result<Vec<LineError>, Error> {
    let mut errors = Vec::new();
    let mut removals: Vec<Removal> = Vec::new();

    for (number, line) in reader.lines().enumerate() {
        let line = line?;
        let line_number = number + 1;

        // Comments start with '#' in the first column; indented lines and
        // blank lines are skipped too.
        if line.is_empty() || line.starts_with('#') || line.starts_with(|c: char| c.is_whitespace()) {
            continue;
        }

        let (is_removal, entry_text) = match line.strip_prefix('!') {
            Some(rest) => (true, rest),
            None => (false, line.as_str()),
        };

        match parse_entry(entry_text.trim_end(), loose_cidr) {
            Ok(entry) => {
                if is_removal {
                    removals.push(Removal { line: line_number, entry });
                } else {
                    let unchanged = match entry.cidr {
                        Some(cidr) => match set.add_network(bdd, entry.addr, cidr) {
                            Ok(unchanged) => unchanged,
                            Err(e) => {
                                errors.push(LineError { line: line_number, message: e.to_string() });
                                continue;
                            }
                        },
                        None => set.add(bdd, entry.addr),
                    };
                    if unchanged {
                        warn!("line {}: {} is a duplicate", line_number, entry_text.trim_end());
                    }
                }
            }
            Err(e) => errors.push(LineError { line: line_number, message: e.to_string() }),
        }
    }

    for removal in removals {
        let unchanged = match removal.entry.cidr {
            Some(cidr) => match set.remove_network(bdd, removal.entry.addr, cidr) {
                Ok(unchanged) => unchanged,
                Err(e) => {
                    errors.push(LineError { line: removal.line, message: e.to_string() });
                    continue;
                }
            },
            None => set.remove(bdd, removal.entry.addr),
        };
        if unchanged {
            warn!("line {}: removal of an entry that is not in the set", removal.line);
        }
    }

    Ok(errors)
}

/// Reads an address list into a fresh set.
pub fn read_set<R: BufRead>(bdd: &mut Bdd, reader: R, loose_cidr: bool) -> Result<(IpSet, Vec<LineError>), Error> {
    let mut set = IpSet::new();
    let errors = read_into(bdd, &mut set, reader, loose_cidr)?;
    Ok((set, errors))
}

fn parse_entry(text: &str, loose_cidr: bool) -> Result<Entry, Error> {
    let Some((addr_text, cidr_text)) = text.split_once('/') else {
        let addr: IpAddr = text.parse().map_err(|_| Error::InvalidAddress(text.to_string()))?;
        return Ok(Entry { addr, cidr: None });
    };

    let addr: IpAddr = addr_text.parse().map_err(|_| Error::InvalidAddress(addr_text.to_string()))?;
    let cidr: u8 = cidr_text
        .parse()
        .map_err(|_| Error::InvalidAddress(format!("invalid CIDR prefix \"{}\"", cidr_text)))?;

    let bits = match addr {
        IpAddr::V4(_) => IPV4_BITS,
        IpAddr::V6(_) => IPV6_BITS,
    };
    if cidr as u32 > bits {
        return Err(Error::InvalidNetwork { addr, cidr });
    }

    if loose_cidr {
        // Drop the host bits instead of rejecting them.
        let addr = match addr {
            IpAddr::V4(v4) => {
                let mut octets = v4.octets();
                mask_host_bits(&mut octets, cidr as u32);
                IpAddr::from(octets)
            }
            IpAddr::V6(v6) => {
                let mut octets = v6.octets();
                mask_host_bits(&mut octets, cidr as u32);
                IpAddr::from(octets)
            }
        };
        return Ok(Entry { addr, cidr: Some(cidr) });
    }

    Ok(Entry { addr, cidr: Some(cidr) })
}
