//! IP maps.
//!
//! An [`IpMap`] associates a non-negative integer value with every address,
//! starting from a configured default. It owns two references: the root of
//! the map's diagram and the terminal for the default value, which makes
//! the emptiness test a constant-time comparison. Maps support `set` and
//! `get`; there is no removal, but setting a range back to the default
//! value has the same effect on lookups.

use std::io::{Read, Write};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use crate::bdd::Bdd;
use crate::bits::{host_bits_clear, ipv4_assignment, ipv6_assignment, IPV4_BITS, IPV4_VAR_COUNT, IPV6_BITS, IPV6_VAR_COUNT};
use crate::error::Error;
use crate::reference::Ref;
use crate::types::Value;

#[derive(Debug)]
pub struct IpMap {
    root: Ref,
    default: Ref,
}

impl IpMap {
    /// Creates a map where every address is mapped to `default_value`.
    pub fn new(default_value: Value) -> Self {
        let default = Ref::terminal(default_value);
        Self { root: default, default }
    }

    /// Releases the map's reference on its root. The map is reset to its
    /// default value and may be reused.
    pub fn done(&mut self, bdd: &mut Bdd) {
        bdd.decref(self.root);
        self.root = self.default;
    }

    /// The map's root reference.
    pub fn root(&self) -> Ref {
        self.root
    }

    fn update_root(&mut self, bdd: &mut Bdd, new_root: Ref) {
        bdd.decref(self.root);
        self.root = new_root;
    }

    /// Maps a single IPv4 address to `value`.
    pub fn set_ipv4(&mut self, bdd: &mut Bdd, addr: Ipv4Addr, value: Value) {
        let element = ipv4_assignment(addr.octets());
        let new_root = bdd.insert(self.root, &element, IPV4_VAR_COUNT, value);
        self.update_root(bdd, new_root);
    }

    /// Maps a network of IPv4 addresses to `value`.
    pub fn set_ipv4_network(&mut self, bdd: &mut Bdd, addr: Ipv4Addr, cidr: u8, value: Value) -> Result<(), Error> {
        if cidr as u32 > IPV4_BITS || !host_bits_clear(&addr.octets(), cidr as u32) {
            return Err(Error::InvalidNetwork { addr: addr.into(), cidr });
        }
        let element = ipv4_assignment(addr.octets());
        let new_root = bdd.insert(self.root, &element, 1 + cidr as u32, value);
        self.update_root(bdd, new_root);
        Ok(())
    }

    /// Returns the value an IPv4 address is mapped to.
    pub fn get_ipv4(&self, bdd: &Bdd, addr: Ipv4Addr) -> Value {
        bdd.evaluate(self.root, ipv4_assignment(addr.octets()))
    }

    /// Maps a single IPv6 address to `value`.
    pub fn set_ipv6(&mut self, bdd: &mut Bdd, addr: Ipv6Addr, value: Value) {
        let element = ipv6_assignment(addr.octets());
        let new_root = bdd.insert(self.root, &element, IPV6_VAR_COUNT, value);
        self.update_root(bdd, new_root);
    }

    /// Maps a network of IPv6 addresses to `value`.
    pub fn set_ipv6_network(&mut self, bdd: &mut Bdd, addr: Ipv6Addr, cidr: u8, value: Value) -> Result<(), Error> {
        if cidr as u32 > IPV6_BITS || !host_bits_clear(&addr.octets(), cidr as u32) {
            return Err(Error::InvalidNetwork { addr: addr.into(), cidr });
        }
        let element = ipv6_assignment(addr.octets());
        let new_root = bdd.insert(self.root, &element, 1 + cidr as u32, value);
        self.update_root(bdd, new_root);
        Ok(())
    }

    /// Returns the value an IPv6 address is mapped to.
    pub fn get_ipv6(&self, bdd: &Bdd, addr: Ipv6Addr) -> Value {
        bdd.evaluate(self.root, ipv6_assignment(addr.octets()))
    }

    /// Maps a single address of either family to `value`.
    pub fn set(&mut self, bdd: &mut Bdd, addr: IpAddr, value: Value) {
        match addr {
            IpAddr::V4(v4) => self.set_ipv4(bdd, v4, value),
            IpAddr::V6(v6) => self.set_ipv6(bdd, v6, value),
        }
    }

    /// Maps a network of either family to `value`.
    pub fn set_network(&mut self, bdd: &mut Bdd, addr: IpAddr, cidr: u8, value: Value) -> Result<(), Error> {
        match addr {
            IpAddr::V4(v4) => self.set_ipv4_network(bdd, v4, cidr, value),
            IpAddr::V6(v6) => self.set_ipv6_network(bdd, v6, cidr, value),
        }
    }

    /// Returns the value an address is mapped to.
    pub fn get(&self, bdd: &Bdd, addr: IpAddr) -> Value {
        match addr {
            IpAddr::V4(v4) => self.get_ipv4(bdd, v4),
            IpAddr::V6(v6) => self.get_ipv6(bdd, v6),
        }
    }

    /// Returns whether every address is mapped to the default value.
    pub fn is_empty(&self) -> bool {
        self.root == self.default
    }

    /// Returns whether two maps over the same manager are equal.
    pub fn is_equal(&self, other: &IpMap) -> bool {
        self.root == other.root && self.default == other.default
    }

    /// The number of bytes used by the nodes of this map.
    pub fn memory_size(&self, bdd: &Bdd) -> usize {
        bdd.memory_size(self.root)
    }

    /// Saves the map in the binary format.
    pub fn save(&self, bdd: &Bdd, stream: &mut impl Write) -> Result<(), Error> {
        bdd.save(stream, self.root)
    }

    /// Loads a map from the binary format. The default value is not part
    /// of the stream and must be supplied again.
    pub fn load(bdd: &mut Bdd, stream: &mut impl Read, default_value: Value) -> Result<IpMap, Error> {
        let root = bdd.load(stream)?;
        Ok(IpMap { root, default: Ref::terminal(default_value) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use test_log::test;

    fn v4(s: &str) -> Ipv4Addr {
        s.parse().unwrap()
    }

    #[test]
    fn test_default_value() {
        let bdd = Bdd::new();
        let map = IpMap::new(3);
        assert!(map.is_empty());
        assert_eq!(map.get_ipv4(&bdd, v4("1.2.3.4")), 3);
        assert_eq!(map.memory_size(&bdd), 0);
    }

    #[test]
    fn test_set_and_get() {
        let mut bdd = Bdd::new();
        let mut map = IpMap::new(0);
        map.set_ipv4(&mut bdd, v4("10.0.0.1"), 7);
        assert!(!map.is_empty());
        assert_eq!(map.get_ipv4(&bdd, v4("10.0.0.1")), 7);
        assert_eq!(map.get_ipv4(&bdd, v4("10.0.0.2")), 0);
        map.done(&mut bdd);
    }

    #[test]
    fn test_later_set_overrides_network() {
        let mut bdd = Bdd::new();
        let mut map = IpMap::new(0);
        map.set_ipv4_network(&mut bdd, v4("192.168.0.0"), 16, 7).unwrap();
        map.set_ipv4(&mut bdd, v4("192.168.1.1"), 42);
        assert_eq!(map.get_ipv4(&bdd, v4("192.168.0.1")), 7);
        assert_eq!(map.get_ipv4(&bdd, v4("192.168.1.1")), 42);
        assert_eq!(map.get_ipv4(&bdd, v4("10.0.0.1")), 0);
        map.done(&mut bdd);
    }

    #[test]
    fn test_set_network_rejects_host_bits() {
        let mut bdd = Bdd::new();
        let mut map = IpMap::new(0);
        let err = map.set_ipv4_network(&mut bdd, v4("192.168.0.1"), 16, 7).unwrap_err();
        assert!(matches!(err, Error::InvalidNetwork { .. }));
        assert!(map.is_empty());
    }

    #[test]
    fn test_ipv6_values() {
        let mut bdd = Bdd::new();
        let mut map = IpMap::new(0);
        map.set_ipv6_network(&mut bdd, "2001:db8::".parse().unwrap(), 32, 9).unwrap();
        assert_eq!(map.get_ipv6(&bdd, "2001:db8::1".parse().unwrap()), 9);
        assert_eq!(map.get_ipv6(&bdd, "2001:db9::1".parse().unwrap()), 0);
        // The family bit keeps IPv4 lookups on their own side.
        assert_eq!(map.get_ipv4(&bdd, v4("32.1.13.184")), 0);
        map.done(&mut bdd);
    }

    #[test]
    fn test_maps_with_same_entries_are_equal() {
        let mut bdd = Bdd::new();
        let mut a = IpMap::new(0);
        let mut b = IpMap::new(0);
        a.set_ipv4(&mut bdd, v4("1.1.1.1"), 5);
        b.set_ipv4(&mut bdd, v4("1.1.1.1"), 5);
        assert!(a.is_equal(&b));
        assert!(!a.is_equal(&IpMap::new(1)));
        a.done(&mut bdd);
        b.done(&mut bdd);
    }

    #[test]
    fn test_round_trip() {
        let mut bdd = Bdd::new();
        let mut map = IpMap::new(0);
        map.set_ipv4_network(&mut bdd, v4("10.0.0.0"), 8, 4).unwrap();
        map.set_ipv4(&mut bdd, v4("10.1.2.3"), 9);

        let mut buffer = Vec::new();
        map.save(&bdd, &mut buffer).unwrap();
        let loaded = IpMap::load(&mut bdd, &mut buffer.as_slice(), 0).unwrap();
        assert!(map.is_equal(&loaded));
        map.done(&mut bdd);
    }
}
