//! Binary serialization of diagrams.
//!
//! # File format (version 1, big-endian throughout)
//!
//! ```text
//! offset  size    field
//!  0      6       magic = "IP set"
//!  6      2       version = 0x0001
//!  8      8       total length in bytes, including this header
//! 16      4       nonterminal count N
//! 20      9·N     N nonterminal records:
//!                   1B  variable
//!                   4B  low  (signed)
//!                   4B  high (signed)
//! end-4   4       root id (signed)
//! ```
//!
//! On disk, node ids differ from the in-memory tagged form: a non-negative
//! id is a terminal value, and negative ids −1, −2, … number the
//! nonterminals in stream order. A record may only reference earlier
//! nonterminals, which the writer guarantees by emitting nodes children
//! first; the reader exploits it by resolving children in a single pass.

use std::collections::HashSet;
use std::io::{ErrorKind, Read, Write};

use hashbrown::HashMap;
use log::debug;

use crate::bdd::Bdd;
use crate::error::Error;
use crate::reference::Ref;
use crate::types::Var;

const MAGIC: &[u8; 6] = b"IP set";
const VERSION: u16 = 0x0001;
/// Magic, version, and the length field itself.
const HEADER_BYTES: u64 = 6 + 2 + 8;
const RECORD_BYTES: u64 = 1 + 4 + 4;

fn fill(stream: &mut impl Read, buf: &mut [u8]) -> Result<(), Error> {
    stream.read_exact(buf).map_err(|e| {
        if e.kind() == ErrorKind::UnexpectedEof {
            Error::parse("unexpected end of stream")
        } else {
            Error::Io(e)
        }
    })
}

fn read_u8(stream: &mut impl Read) -> Result<u8, Error> {
    let mut buf = [0u8; 1];
    fill(stream, &mut buf)?;
    Ok(buf[0])
}

fn read_u16(stream: &mut impl Read) -> Result<u16, Error> {
    let mut buf = [0u8; 2];
    fill(stream, &mut buf)?;
    Ok(u16::from_be_bytes(buf))
}

fn read_u32(stream: &mut impl Read) -> Result<u32, Error> {
    let mut buf = [0u8; 4];
    fill(stream, &mut buf)?;
    Ok(u32::from_be_bytes(buf))
}

fn read_u64(stream: &mut impl Read) -> Result<u64, Error> {
    let mut buf = [0u8; 8];
    fill(stream, &mut buf)?;
    Ok(u64::from_be_bytes(buf))
}

fn read_i32(stream: &mut impl Read) -> Result<i32, Error> {
    let mut buf = [0u8; 4];
    fill(stream, &mut buf)?;
    Ok(i32::from_be_bytes(buf))
}

impl Bdd {
    /// Loads a diagram from `stream`, returning a new reference on its
    /// root.
    ///
    /// On any failure every partially constructed node is released, so no
    /// partial diagram is exposed.
    pub fn load(&mut self, stream: &mut impl Read) -> Result<Ref, Error> {
        debug!("reading IP set magic number");
        let mut magic = [0u8; 6];
        fill(stream, &mut magic)?;
        if &magic != MAGIC {
            return Err(Error::parse("magic number mismatch: this is not an IP set"));
        }

        debug!("reading IP set version");
        let version = read_u16(stream)?;
        match version {
            0x0001 => self.load_v1(stream),
            _ => Err(Error::parse(format!("unknown version number {}", version))),
        }
    }

    fn load_v1(&mut self, stream: &mut impl Read) -> Result<Ref, Error> {
        let mut created: Vec<Ref> = Vec::new();
        let result = self.load_v1_records(stream, &mut created);
        // The result (on success) was acquired separately, so the ids in
        // stream order can be released on both paths.
        for id in created {
            self.decref(id);
        }
        result
    }

    fn load_v1_records(&mut self, stream: &mut impl Read, created: &mut Vec<Ref>) -> Result<Ref, Error> {
        debug!("stream contains a v1 IP set");

        let length = read_u64(stream)?;
        // The length field covers the magic, version, and length itself.
        let cap = length
            .checked_sub(HEADER_BYTES)
            .ok_or_else(|| Error::parse("length field is too small"))?;
        let mut bytes_read: u64 = 0;

        let count = read_u32(stream)?;
        bytes_read += 4;
        debug!("stream holds {} nonterminals", count);

        for i in 0..count {
            let variable = read_u8(stream)?;
            let low = read_i32(stream)?;
            let high = read_i32(stream)?;
            bytes_read += RECORD_BYTES;
            debug!("read serialized node {} = ({}, {}, {})", -((i as i64) + 1), variable, low, high);

            let low_id = self.resolve_child(low, created)?;
            let high_id = self.resolve_child(high, created)?;
            // The node takes over one reference on each child.
            self.incref(low_id);
            self.incref(high_id);
            let id = self.nonterminal(Var::new(variable as u32), low_id, high_id);
            created.push(id);
        }

        let root = read_i32(stream)?;
        bytes_read += 4;
        let root_id = self.resolve_child(root, created)?;

        if bytes_read < cap {
            return Err(Error::parse("malformed set: extra data at end of stream"));
        }
        if bytes_read > cap {
            return Err(Error::parse("malformed set: read too much data"));
        }

        Ok(self.incref(root_id))
    }

    /// Maps a disk id to an in-memory id. Children always precede their
    /// parents in the stream, so a valid negative id resolves against the
    /// nodes read so far.
    fn resolve_child(&self, disk_id: i32, created: &[Ref]) -> Result<Ref, Error> {
        if disk_id >= 0 {
            return Ok(self.terminal(disk_id));
        }
        let index = (-(disk_id as i64) - 1) as usize;
        created
            .get(index)
            .copied()
            .ok_or_else(|| Error::parse(format!("child reference {} is out of range", disk_id)))
    }

    /// Saves the diagram rooted at `root` to `stream`, encoding only the
    /// nodes reachable from the root.
    pub fn save(&self, stream: &mut impl Write, root: Ref) -> Result<(), Error> {
        let order = self.reverse_postorder(root);
        let count = order.len() as u64;
        let length = HEADER_BYTES + 4 + RECORD_BYTES * count + 4;
        debug!("saving {} nonterminals, {} bytes total", count, length);

        stream.write_all(MAGIC)?;
        stream.write_all(&VERSION.to_be_bytes())?;
        stream.write_all(&length.to_be_bytes())?;
        stream.write_all(&(count as u32).to_be_bytes())?;

        // Nodes are written children first; each gets the next disk id
        // -1, -2, ... as it is emitted.
        let mut disk_ids: HashMap<Ref, i32> = HashMap::new();
        for (position, &id) in order.iter().enumerate() {
            let node = self.node(id);
            let variable = node.variable.index();
            debug_assert!(variable <= u8::MAX as u32);
            stream.write_all(&[variable as u8])?;
            stream.write_all(&self.disk_id(node.low, &disk_ids).to_be_bytes())?;
            stream.write_all(&self.disk_id(node.high, &disk_ids).to_be_bytes())?;
            disk_ids.insert(id, -((position as i32) + 1));
        }

        stream.write_all(&self.disk_id(root, &disk_ids).to_be_bytes())?;
        Ok(())
    }

    fn disk_id(&self, id: Ref, disk_ids: &HashMap<Ref, i32>) -> i32 {
        if id.is_terminal() {
            id.value()
        } else {
            disk_ids[&id]
        }
    }

    /// The nonterminals reachable from `root`, ordered so that every node
    /// appears after both of its children.
    fn reverse_postorder(&self, root: Ref) -> Vec<Ref> {
        let mut order: Vec<Ref> = Vec::new();
        let mut visited: HashSet<u32> = HashSet::new();
        let mut stack: Vec<(Ref, bool)> = Vec::new();
        if root.is_nonterminal() {
            stack.push((root, false));
        }

        while let Some((id, expanded)) = stack.pop() {
            if expanded {
                order.push(id);
                continue;
            }
            if !visited.insert(id.index()) {
                continue;
            }
            stack.push((id, true));
            let node = self.node(id);
            if node.low.is_nonterminal() {
                stack.push((node.low, false));
            }
            if node.high.is_nonterminal() {
                stack.push((node.high, false));
            }
        }
        order
    }
}
