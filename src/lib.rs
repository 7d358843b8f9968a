//! # ipset-rs: IP sets and maps backed by binary decision diagrams
//!
//! **`ipset-rs`** stores sets of IPv4 and IPv6 addresses — and integer-valued
//! maps keyed by address — as **Reduced Ordered Binary Decision Diagrams
//! (ROBDDs)**. Inserting a CIDR network touches only as many nodes as the
//! prefix has bits, membership tests walk one path of the diagram, and the
//! whole structure serializes to a compact, portable binary form.
//!
//! ## Why a BDD?
//!
//! A set of addresses is a Boolean function of the address bits. Stored as a
//! BDD with a fixed variable order, that function is **canonical**: two sets
//! with the same members share the same root node, so equality is a pointer
//! comparison and common substructure is shared automatically. Variable 0
//! selects the address family, so one diagram holds IPv4 and IPv6 members
//! side by side.
//!
//! ## Key pieces
//!
//! - **Manager-centric architecture**: all construction goes through the
//!   [`Bdd`][crate::bdd::Bdd] manager, which interns nodes and memoizes the
//!   AND/OR/ITE operators.
//! - **Explicit reference counting**: nodes are reclaimed as soon as nothing
//!   names them; sets and maps hold exactly one reference on their root.
//! - **Portable persistence**: a versioned big-endian format with
//!   renumbered node ids, identical across platforms.
//!
//! ## Basic usage
//!
//! ```rust
//! use ipset_rs::bdd::Bdd;
//! use ipset_rs::ipset::IpSet;
//!
//! // One manager owns the nodes of any number of sets.
//! let mut bdd = Bdd::new();
//! let mut set = IpSet::new();
//!
//! set.add_ipv4(&mut bdd, "192.168.1.1".parse().unwrap());
//! set.add_ipv4_network(&mut bdd, "10.0.0.0".parse().unwrap(), 8).unwrap();
//!
//! assert!(set.contains_ipv4(&bdd, "192.168.1.1".parse().unwrap()));
//! assert!(set.contains_ipv4(&bdd, "10.20.30.40".parse().unwrap()));
//! assert!(!set.contains_ipv4(&bdd, "172.16.0.1".parse().unwrap()));
//!
//! // Round-trip through the binary format.
//! let mut buffer = Vec::new();
//! set.save(&bdd, &mut buffer).unwrap();
//! let loaded = IpSet::load(&mut bdd, &mut buffer.as_slice()).unwrap();
//! assert!(set.is_equal(&loaded));
//!
//! set.done(&mut bdd);
//! ```
//!
//! ## Core components
//!
//! - **[`bdd`]**: the node store and the memoized operators.
//! - **[`ipset`] / [`ipmap`]**: the address-level facades.
//! - **[`iter`]**: enumeration of members as addresses or CIDR networks.
//! - **[`io`]**: the binary file format.
//! - **[`text`]**: the address-list text front-end used by the CLI tools.

pub mod assignment;
pub mod bdd;
pub mod bits;
pub mod cache;
pub mod dot;
pub mod error;
pub mod io;
pub mod ipmap;
pub mod ipset;
pub mod iter;
pub mod node;
pub mod paths;
pub mod reference;
pub mod storage;
pub mod text;
pub mod types;
pub mod utils;
