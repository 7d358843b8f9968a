//! Iteration over the addresses and networks of an IP set.
//!
//! A [`SetIter`] walks the paths of the set's diagram, keeps the ones that
//! reach the desired value, and expands each path assignment into IP
//! networks. In address mode every EITHER bit is expanded, so each yielded
//! network carries a full-length prefix. In summarize mode the expansion
//! stops at the last constrained bit, emitting one CIDR network per
//! subtree whose remaining address bits are all "don't care".
//!
//! The family bit makes one subtlety: a path that is EITHER at variable 0
//! covers both address families, and the variables to turn into address
//! bits differ between them. Such a path is expanded twice, IPv4 first and
//! then IPv6.

use std::net::{Ipv4Addr, Ipv6Addr};

use ipnet::{IpNet, Ipv4Net, Ipv6Net};

use crate::assignment::{Assignment, ExpandedAssignment, Tribool};
use crate::bdd::Bdd;
use crate::bits::{bit_set, IPV4_BITS, IPV6_BITS};
use crate::paths::BddPaths;
use crate::reference::Ref;
use crate::types::Var;

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
enum Family {
    V4,
    V6,
}

impl Family {
    fn address_bits(self) -> u32 {
        match self {
            Family::V4 => IPV4_BITS,
            Family::V6 => IPV6_BITS,
        }
    }
}

/// One family's expansion of a path assignment.
struct Expansion {
    family: Family,
    cidr: u8,
    inner: ExpandedAssignment,
}

/// An iterator over the networks of an IP set, created by
/// [`IpSet::iter`][crate::ipset::IpSet::iter] and
/// [`IpSet::iter_networks`][crate::ipset::IpSet::iter_networks].
pub struct SetIter<'a> {
    paths: BddPaths<'a>,
    desired_value: bool,
    summarize: bool,
    expansion: Option<Expansion>,
    /// An assignment that still needs its IPv6 pass (variable 0 EITHER).
    second_family: Option<Assignment>,
}

impl<'a> SetIter<'a> {
    pub(crate) fn new(bdd: &'a Bdd, root: Ref, desired_value: bool, summarize: bool) -> Self {
        Self {
            paths: BddPaths::new(bdd, root),
            desired_value,
            summarize,
            expansion: None,
            second_family: None,
        }
    }

    /// Starts expanding `assignment` for one address family.
    fn start_family(&mut self, assignment: &Assignment, family: Family) {
        let mut pinned = assignment.clone();
        pinned.set(Var::new(0), Tribool::from_bool(family == Family::V4));

        let var_count = if self.summarize {
            // Expand up to the last constrained variable; everything after
            // it stays "don't care" and is summarized by the prefix.
            let mut last = 0;
            for index in 1..=family.address_bits() {
                if pinned.get(Var::new(index)) != Tribool::Either {
                    last = index;
                }
            }
            last + 1
        } else {
            family.address_bits() + 1
        };

        self.expansion = Some(Expansion {
            family,
            cidr: (var_count - 1) as u8,
            inner: ExpandedAssignment::new(&pinned, var_count),
        });
    }

    /// Builds the network for the current concrete assignment.
    fn current_network(expansion: &Expansion) -> IpNet {
        let cidr = expansion.cidr;
        match expansion.family {
            Family::V4 => {
                let mut octets = [0u8; 4];
                for i in 0..cidr as u32 {
                    bit_set(&mut octets, i, expansion.inner.bit(i + 1));
                }
                IpNet::V4(Ipv4Net::new(Ipv4Addr::from(octets), cidr).expect("prefix fits the address length"))
            }
            Family::V6 => {
                let mut octets = [0u8; 16];
                for i in 0..cidr as u32 {
                    bit_set(&mut octets, i, expansion.inner.bit(i + 1));
                }
                IpNet::V6(Ipv6Net::new(Ipv6Addr::from(octets), cidr).expect("prefix fits the address length"))
            }
        }
    }
}

impl Iterator for SetIter<'_> {
    type Item = IpNet;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(expansion) = &mut self.expansion {
                if !expansion.inner.is_finished() {
                    let network = Self::current_network(expansion);
                    expansion.inner.advance();
                    return Some(network);
                }
                self.expansion = None;
            }

            if let Some(assignment) = self.second_family.take() {
                self.start_family(&assignment, Family::V6);
                continue;
            }

            let (assignment, value) = self.paths.next()?;
            if (value != 0) != self.desired_value {
                continue;
            }

            match assignment.get(Var::new(0)) {
                Tribool::True => self.start_family(&assignment, Family::V4),
                Tribool::False => self.start_family(&assignment, Family::V6),
                Tribool::Either => {
                    // Both families: IPv4 now, IPv6 on the next round.
                    self.start_family(&assignment, Family::V4);
                    self.second_family = Some(assignment);
                }
            }
        }
    }
}
