//! IP sets.
//!
//! An [`IpSet`] owns a single root reference into a [`Bdd`] manager: the
//! diagram of the function that is 1 exactly on the member addresses.
//! Every operation borrows the manager the set was built in; a set must
//! not be used with a different manager, and it must not outlive its
//! manager. Release the root with [`IpSet::done`] when the set is no
//! longer needed.
//!
//! Membership is encoded over variables: variable 0 is the IP family
//! (true = IPv4, false = IPv6), and variables 1.. are the address bits in
//! big-endian order. Inserting a network of prefix `n` constrains only the
//! family bit and the first `n` address bits, leaving the rest as
//! "don't care".

use std::io::{Read, Write};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use crate::bdd::Bdd;
use crate::bits::{host_bits_clear, ipv4_assignment, ipv6_assignment, IPV4_BITS, IPV4_VAR_COUNT, IPV6_BITS, IPV6_VAR_COUNT};
use crate::error::Error;
use crate::iter::SetIter;
use crate::reference::Ref;

#[derive(Debug)]
pub struct IpSet {
    root: Ref,
}

impl Default for IpSet {
    fn default() -> Self {
        Self::new()
    }
}

impl IpSet {
    /// Creates an empty set. The empty root is a terminal, so no manager
    /// is needed until the first mutation.
    pub fn new() -> Self {
        Self { root: Ref::ZERO }
    }

    /// Releases the set's reference on its root. The set is empty
    /// afterwards and may be reused.
    pub fn done(&mut self, bdd: &mut Bdd) {
        bdd.decref(self.root);
        self.root = Ref::ZERO;
    }

    /// Returns a second set over the same contents.
    pub fn clone_in(&self, bdd: &mut Bdd) -> IpSet {
        IpSet { root: bdd.incref(self.root) }
    }

    /// The set's root reference.
    pub fn root(&self) -> Ref {
        self.root
    }

    /// Replaces the root, releasing the previous one. Returns whether the
    /// set was left unchanged.
    fn update_root(&mut self, bdd: &mut Bdd, new_root: Ref) -> bool {
        let unchanged = new_root == self.root;
        bdd.decref(self.root);
        self.root = new_root;
        unchanged
    }

    /// Adds a single IPv4 address. Returns whether the address was already
    /// in the set.
    pub fn add_ipv4(&mut self, bdd: &mut Bdd, addr: Ipv4Addr) -> bool {
        let element = ipv4_assignment(addr.octets());
        let new_root = bdd.insert(self.root, &element, IPV4_VAR_COUNT, 1);
        self.update_root(bdd, new_root)
    }

    /// Adds a network of IPv4 addresses: every address sharing the first
    /// `cidr` bits of `addr`. Returns whether the network was already in
    /// the set.
    pub fn add_ipv4_network(&mut self, bdd: &mut Bdd, addr: Ipv4Addr, cidr: u8) -> Result<bool, Error> {
        check_ipv4_network(addr, cidr)?;
        let element = ipv4_assignment(addr.octets());
        let new_root = bdd.insert(self.root, &element, 1 + cidr as u32, 1);
        Ok(self.update_root(bdd, new_root))
    }

    /// Removes a single IPv4 address. Returns whether the address was
    /// absent to begin with.
    pub fn remove_ipv4(&mut self, bdd: &mut Bdd, addr: Ipv4Addr) -> bool {
        let element = ipv4_assignment(addr.octets());
        let new_root = bdd.remove(self.root, &element, IPV4_VAR_COUNT);
        self.update_root(bdd, new_root)
    }

    /// Removes a network of IPv4 addresses. Returns whether the set was
    /// left unchanged.
    pub fn remove_ipv4_network(&mut self, bdd: &mut Bdd, addr: Ipv4Addr, cidr: u8) -> Result<bool, Error> {
        check_ipv4_network(addr, cidr)?;
        let element = ipv4_assignment(addr.octets());
        let new_root = bdd.remove(self.root, &element, 1 + cidr as u32);
        Ok(self.update_root(bdd, new_root))
    }

    /// Returns whether the set contains the IPv4 address.
    pub fn contains_ipv4(&self, bdd: &Bdd, addr: Ipv4Addr) -> bool {
        bdd.evaluate(self.root, ipv4_assignment(addr.octets())) != 0
    }

    /// Adds a single IPv6 address. Returns whether the address was already
    /// in the set.
    pub fn add_ipv6(&mut self, bdd: &mut Bdd, addr: Ipv6Addr) -> bool {
        let element = ipv6_assignment(addr.octets());
        let new_root = bdd.insert(self.root, &element, IPV6_VAR_COUNT, 1);
        self.update_root(bdd, new_root)
    }

    /// Adds a network of IPv6 addresses. Returns whether the network was
    /// already in the set.
    pub fn add_ipv6_network(&mut self, bdd: &mut Bdd, addr: Ipv6Addr, cidr: u8) -> Result<bool, Error> {
        check_ipv6_network(addr, cidr)?;
        let element = ipv6_assignment(addr.octets());
        let new_root = bdd.insert(self.root, &element, 1 + cidr as u32, 1);
        Ok(self.update_root(bdd, new_root))
    }

    /// Removes a single IPv6 address. Returns whether the address was
    /// absent to begin with.
    pub fn remove_ipv6(&mut self, bdd: &mut Bdd, addr: Ipv6Addr) -> bool {
        let element = ipv6_assignment(addr.octets());
        let new_root = bdd.remove(self.root, &element, IPV6_VAR_COUNT);
        self.update_root(bdd, new_root)
    }

    /// Removes a network of IPv6 addresses. Returns whether the set was
    /// left unchanged.
    pub fn remove_ipv6_network(&mut self, bdd: &mut Bdd, addr: Ipv6Addr, cidr: u8) -> Result<bool, Error> {
        check_ipv6_network(addr, cidr)?;
        let element = ipv6_assignment(addr.octets());
        let new_root = bdd.remove(self.root, &element, 1 + cidr as u32);
        Ok(self.update_root(bdd, new_root))
    }

    /// Returns whether the set contains the IPv6 address.
    pub fn contains_ipv6(&self, bdd: &Bdd, addr: Ipv6Addr) -> bool {
        bdd.evaluate(self.root, ipv6_assignment(addr.octets())) != 0
    }

    /// Adds a single address of either family.
    pub fn add(&mut self, bdd: &mut Bdd, addr: IpAddr) -> bool {
        match addr {
            IpAddr::V4(v4) => self.add_ipv4(bdd, v4),
            IpAddr::V6(v6) => self.add_ipv6(bdd, v6),
        }
    }

    /// Adds a network of either family.
    pub fn add_network(&mut self, bdd: &mut Bdd, addr: IpAddr, cidr: u8) -> Result<bool, Error> {
        match addr {
            IpAddr::V4(v4) => self.add_ipv4_network(bdd, v4, cidr),
            IpAddr::V6(v6) => self.add_ipv6_network(bdd, v6, cidr),
        }
    }

    /// Removes a single address of either family.
    pub fn remove(&mut self, bdd: &mut Bdd, addr: IpAddr) -> bool {
        match addr {
            IpAddr::V4(v4) => self.remove_ipv4(bdd, v4),
            IpAddr::V6(v6) => self.remove_ipv6(bdd, v6),
        }
    }

    /// Removes a network of either family.
    pub fn remove_network(&mut self, bdd: &mut Bdd, addr: IpAddr, cidr: u8) -> Result<bool, Error> {
        match addr {
            IpAddr::V4(v4) => self.remove_ipv4_network(bdd, v4, cidr),
            IpAddr::V6(v6) => self.remove_ipv6_network(bdd, v6, cidr),
        }
    }

    /// Returns whether the set contains the address.
    pub fn contains(&self, bdd: &Bdd, addr: IpAddr) -> bool {
        match addr {
            IpAddr::V4(v4) => self.contains_ipv4(bdd, v4),
            IpAddr::V6(v6) => self.contains_ipv6(bdd, v6),
        }
    }

    /// Returns whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.root == Ref::ZERO
    }

    /// Returns whether two sets over the same manager are equal. Roots are
    /// canonical, so this is a constant-time id comparison.
    pub fn is_equal(&self, other: &IpSet) -> bool {
        self.root == other.root
    }

    /// The number of bytes used by the nodes of this set. Storage can be
    /// shared between sets, so the sizes of two sets don't simply add.
    pub fn memory_size(&self, bdd: &Bdd) -> usize {
        bdd.memory_size(self.root)
    }

    /// Saves the set in the binary format.
    pub fn save(&self, bdd: &Bdd, stream: &mut impl Write) -> Result<(), Error> {
        bdd.save(stream, self.root)
    }

    /// Loads a set from the binary format.
    pub fn load(bdd: &mut Bdd, stream: &mut impl Read) -> Result<IpSet, Error> {
        let root = bdd.load(stream)?;
        Ok(IpSet { root })
    }

    /// Returns an iterator over the addresses that are in the set (if
    /// `desired_value` is true) or not in it (if false). Every yielded
    /// network has a full-length prefix (32 or 128).
    pub fn iter<'a>(&self, bdd: &'a Bdd, desired_value: bool) -> SetIter<'a> {
        SetIter::new(bdd, self.root, desired_value, false)
    }

    /// Returns an iterator that summarizes the set as CIDR networks where
    /// possible, yielding IPv4 networks before IPv6 ones whenever an
    /// assignment covers both families.
    pub fn iter_networks<'a>(&self, bdd: &'a Bdd, desired_value: bool) -> SetIter<'a> {
        SetIter::new(bdd, self.root, desired_value, true)
    }
}

fn check_ipv4_network(addr: Ipv4Addr, cidr: u8) -> Result<(), Error> {
    if cidr as u32 > IPV4_BITS || !host_bits_clear(&addr.octets(), cidr as u32) {
        return Err(Error::InvalidNetwork { addr: addr.into(), cidr });
    }
    Ok(())
}

fn check_ipv6_network(addr: Ipv6Addr, cidr: u8) -> Result<(), Error> {
    if cidr as u32 > IPV6_BITS || !host_bits_clear(&addr.octets(), cidr as u32) {
        return Err(Error::InvalidNetwork { addr: addr.into(), cidr });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use test_log::test;

    fn v4(s: &str) -> Ipv4Addr {
        s.parse().unwrap()
    }

    fn v6(s: &str) -> Ipv6Addr {
        s.parse().unwrap()
    }

    #[test]
    fn test_empty_set() {
        let bdd = Bdd::new();
        let set = IpSet::new();
        assert!(set.is_empty());
        assert!(!set.contains_ipv4(&bdd, v4("1.2.3.4")));
        assert!(!set.contains_ipv6(&bdd, v6("::1")));
    }

    #[test]
    fn test_add_and_contains() {
        let mut bdd = Bdd::new();
        let mut set = IpSet::new();
        assert!(!set.add_ipv4(&mut bdd, v4("1.2.3.4")));
        assert!(!set.is_empty());
        assert!(set.contains_ipv4(&bdd, v4("1.2.3.4")));
        assert!(!set.contains_ipv4(&bdd, v4("1.2.3.5")));
        // The family bit keeps the IPv4 and IPv6 spaces apart.
        assert!(!set.contains_ipv6(&bdd, v6("::102:304")));
        set.done(&mut bdd);
    }

    #[test]
    fn test_add_reports_duplicates() {
        let mut bdd = Bdd::new();
        let mut set = IpSet::new();
        assert!(!set.add_ipv4(&mut bdd, v4("10.0.0.1")));
        assert!(set.add_ipv4(&mut bdd, v4("10.0.0.1")));
        set.done(&mut bdd);
    }

    #[test]
    fn test_add_network_covers_prefix() {
        let mut bdd = Bdd::new();
        let mut set = IpSet::new();
        set.add_ipv4_network(&mut bdd, v4("10.0.0.0"), 8).unwrap();
        assert!(set.contains_ipv4(&bdd, v4("10.0.0.0")));
        assert!(set.contains_ipv4(&bdd, v4("10.255.255.255")));
        assert!(set.contains_ipv4(&bdd, v4("10.1.2.3")));
        assert!(!set.contains_ipv4(&bdd, v4("11.0.0.0")));
        assert!(!set.contains_ipv4(&bdd, v4("9.255.255.255")));
        set.done(&mut bdd);
    }

    #[test]
    fn test_add_network_rejects_host_bits() {
        let mut bdd = Bdd::new();
        let mut set = IpSet::new();
        let err = set.add_ipv4_network(&mut bdd, v4("10.0.0.1"), 8).unwrap_err();
        assert!(matches!(err, Error::InvalidNetwork { cidr: 8, .. }));
        assert!(set.is_empty());

        let err = set.add_ipv4_network(&mut bdd, v4("10.0.0.0"), 33).unwrap_err();
        assert!(matches!(err, Error::InvalidNetwork { cidr: 33, .. }));
    }

    #[test]
    fn test_remove_network_carves_hole() {
        let mut bdd = Bdd::new();
        let mut set = IpSet::new();
        set.add_ipv4_network(&mut bdd, v4("10.0.0.0"), 8).unwrap();
        set.remove_ipv4_network(&mut bdd, v4("10.0.0.0"), 16).unwrap();
        assert!(!set.contains_ipv4(&bdd, v4("10.0.0.1")));
        assert!(set.contains_ipv4(&bdd, v4("10.1.0.0")));
        set.done(&mut bdd);
    }

    #[test]
    fn test_add_then_remove_restores_root() {
        let mut bdd = Bdd::new();
        let mut set = IpSet::new();
        set.add_ipv4(&mut bdd, v4("172.16.0.1"));
        let before = set.root();
        set.add_ipv4(&mut bdd, v4("192.168.1.1"));
        set.remove_ipv4(&mut bdd, v4("192.168.1.1"));
        assert_eq!(set.root(), before);
        set.done(&mut bdd);
    }

    #[test]
    fn test_remove_absent_reports_unchanged() {
        let mut bdd = Bdd::new();
        let mut set = IpSet::new();
        set.add_ipv4(&mut bdd, v4("10.0.0.1"));
        assert!(set.remove_ipv4(&mut bdd, v4("10.0.0.2")));
        assert!(!set.remove_ipv4(&mut bdd, v4("10.0.0.1")));
        assert!(set.is_empty());
        set.done(&mut bdd);
    }

    #[test]
    fn test_canonical_equality() {
        let mut bdd = Bdd::new();
        let mut a = IpSet::new();
        let mut b = IpSet::new();
        a.add_ipv4(&mut bdd, v4("1.1.1.1"));
        a.add_ipv4(&mut bdd, v4("2.2.2.2"));
        b.add_ipv4(&mut bdd, v4("2.2.2.2"));
        b.add_ipv4(&mut bdd, v4("1.1.1.1"));
        assert!(a.is_equal(&b));
        a.done(&mut bdd);
        b.done(&mut bdd);
    }

    #[test]
    fn test_clone_in_shares_contents() {
        let mut bdd = Bdd::new();
        let mut a = IpSet::new();
        a.add_ipv4(&mut bdd, v4("10.0.0.1"));
        let mut b = a.clone_in(&mut bdd);
        assert!(a.is_equal(&b));
        b.add_ipv4(&mut bdd, v4("10.0.0.2"));
        assert!(!a.is_equal(&b));
        assert!(!a.contains_ipv4(&bdd, v4("10.0.0.2")));
        a.done(&mut bdd);
        b.done(&mut bdd);
    }

    #[test]
    fn test_full_family_networks_collapse_to_one() {
        let mut bdd = Bdd::new();
        let mut set = IpSet::new();
        set.add_ipv4_network(&mut bdd, v4("0.0.0.0"), 0).unwrap();
        assert!(set.contains_ipv4(&bdd, v4("255.255.255.255")));
        assert!(!set.contains_ipv6(&bdd, v6("::1")));

        set.add_ipv6_network(&mut bdd, v6("::"), 0).unwrap();
        // Both families together cover everything: the root is TRUE.
        assert_eq!(set.root(), Ref::ONE);
        assert!(set.contains_ipv6(&bdd, v6("ffff::1")));
        set.done(&mut bdd);
    }

    #[test]
    fn test_ipv6_add_and_network() {
        let mut bdd = Bdd::new();
        let mut set = IpSet::new();
        set.add_ipv6(&mut bdd, v6("2001:db8::1"));
        assert!(set.contains_ipv6(&bdd, v6("2001:db8::1")));
        assert!(!set.contains_ipv6(&bdd, v6("2001:db8::2")));

        set.add_ipv6_network(&mut bdd, v6("fe80::"), 10).unwrap();
        assert!(set.contains_ipv6(&bdd, v6("fe80::1234")));
        assert!(!set.contains_ipv6(&bdd, v6("fc00::1")));
        set.done(&mut bdd);
    }

    #[test]
    fn test_memory_size_of_single_address() {
        let mut bdd = Bdd::new();
        let mut set = IpSet::new();
        assert_eq!(set.memory_size(&bdd), 0);
        set.add_ipv4(&mut bdd, v4("1.2.3.4"));
        // One node for the family bit plus one per address bit.
        assert_eq!(set.memory_size(&bdd), 33 * std::mem::size_of::<crate::node::Node>());
        set.done(&mut bdd);
    }

    #[test]
    fn test_generic_address_dispatch() {
        let mut bdd = Bdd::new();
        let mut set = IpSet::new();
        set.add(&mut bdd, "10.0.0.1".parse().unwrap());
        set.add(&mut bdd, "::1".parse().unwrap());
        assert!(set.contains(&bdd, "10.0.0.1".parse().unwrap()));
        assert!(set.contains(&bdd, "::1".parse().unwrap()));
        assert!(!set.contains(&bdd, "10.0.0.2".parse().unwrap()));
        set.done(&mut bdd);
    }
}
