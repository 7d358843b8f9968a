//! GraphViz rendering of a diagram.

use std::collections::{BTreeMap, BTreeSet};

use crate::bdd::Bdd;
use crate::reference::Ref;

impl Bdd {
    /// Renders the diagram rooted at `root` as a GraphViz graph.
    ///
    /// Terminals are drawn as squares labelled with their value,
    /// nonterminals as circles grouped per variable. Solid edges lead to
    /// the high child, dashed edges to the low child.
    pub fn to_dot(&self, root: Ref) -> Result<String, std::fmt::Error> {
        use std::fmt::Write as _;

        let mut nonterminals: Vec<Ref> = Vec::new();
        let mut terminals: BTreeSet<i32> = BTreeSet::new();
        let mut visited: BTreeSet<u32> = BTreeSet::new();
        let mut queue = vec![root];
        while let Some(id) = queue.pop() {
            if id.is_terminal() {
                terminals.insert(id.value());
                continue;
            }
            if !visited.insert(id.index()) {
                continue;
            }
            nonterminals.push(id);
            let node = self.node(id);
            queue.push(node.low);
            queue.push(node.high);
        }

        let mut dot = String::new();
        writeln!(dot, "digraph bdd {{")?;
        writeln!(dot, "node [shape=circle, fixedsize=true];")?;

        writeln!(dot, "{{ rank=sink")?;
        for value in &terminals {
            writeln!(dot, "t{} [shape=square, label=\"{}\"];", value, value)?;
        }
        writeln!(dot, "}}")?;

        // Nodes per variable.
        let mut levels = BTreeMap::<u32, Vec<Ref>>::new();
        for &id in nonterminals.iter() {
            levels.entry(self.variable(id).index()).or_default().push(id);
        }
        for (variable, level) in &levels {
            writeln!(dot, "{{ rank=same")?;
            for &id in level.iter() {
                writeln!(dot, "n{} [label=<x<SUB>{}</SUB>>];", id.index(), variable)?;
            }
            writeln!(dot, "}}")?;
        }

        let name = |id: Ref| {
            if id.is_terminal() {
                format!("t{}", id.value())
            } else {
                format!("n{}", id.index())
            }
        };

        // Edges.
        for &id in nonterminals.iter() {
            let node = self.node(id);
            writeln!(dot, "{} -> {};", name(id), name(node.high))?;
            writeln!(dot, "{} -> {} [style=dashed];", name(id), name(node.low))?;
        }

        // Root marker.
        writeln!(dot, "root [shape=rect, label=\"{}\"];", root)?;
        writeln!(dot, "root -> {};", name(root))?;

        writeln!(dot, "}}")?;
        Ok(dot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ipset::IpSet;

    #[test]
    fn test_dot_of_terminal() {
        let bdd = Bdd::new();
        let dot = bdd.to_dot(Ref::ZERO).unwrap();
        assert!(dot.starts_with("digraph bdd {"));
        assert!(dot.contains("t0 [shape=square"));
        assert!(dot.contains("root -> t0;"));
    }

    #[test]
    fn test_dot_lists_every_reachable_node() {
        let mut bdd = Bdd::new();
        let mut set = IpSet::new();
        set.add_ipv4_network(&mut bdd, "10.0.0.0".parse().unwrap(), 8).unwrap();
        let dot = bdd.to_dot(set.root()).unwrap();
        // The family bit and eight address bits, plus both terminals.
        assert_eq!(dot.matches("[label=<x<SUB>").count(), 9);
        assert!(dot.contains("t0 [shape=square"));
        assert!(dot.contains("t1 [shape=square"));
        set.done(&mut bdd);
    }
}
