//! Iterator over the root-to-terminal paths of a diagram.
//!
//! Each path corresponds to one partial assignment: the variables on the
//! path are true or false according to the branch taken, and every skipped
//! variable is EITHER. The iterator yields the assignment together with
//! the terminal value the path reaches, one pair per distinct path.
//!
//! Traversal is depth-first, low branch first, so paths come out in
//! ascending order of their bit strings. The number of paths can be
//! exponential in the number of variables, so use with caution on large
//! diagrams.

use crate::assignment::{Assignment, Tribool};
use crate::bdd::Bdd;
use crate::reference::Ref;
use crate::types::Value;

impl Bdd {
    /// Returns an iterator over all root-to-terminal paths of `root`,
    /// yielding `(assignment, terminal_value)` pairs.
    pub fn paths(&self, root: Ref) -> BddPaths<'_> {
        BddPaths::new(self, root)
    }
}

/// An iterator over the paths of a diagram.
///
/// Created by [`Bdd::paths()`].
///
/// The stack holds the nonterminals along the current path, and the
/// assignment mirrors it: the cell of a stacked node's variable records
/// which branch was taken. Advancing pops until it finds a node whose high
/// branch is unexplored, flips that cell to true, and descends low-first
/// to the next terminal.
pub struct BddPaths<'a> {
    bdd: &'a Bdd,
    root: Ref,
    stack: Vec<Ref>,
    assignment: Assignment,
    value: Value,
    started: bool,
    finished: bool,
}

impl<'a> BddPaths<'a> {
    pub fn new(bdd: &'a Bdd, root: Ref) -> Self {
        BddPaths {
            bdd,
            root,
            stack: Vec::new(),
            assignment: Assignment::new(),
            value: 0,
            started: false,
            finished: false,
        }
    }

    /// Descends low-first from `node` until a terminal is reached.
    fn descend(&mut self, mut node: Ref) {
        while node.is_nonterminal() {
            let n = self.bdd.node(node);
            self.stack.push(node);
            self.assignment.set(n.variable, Tribool::False);
            node = n.low;
        }
        self.value = node.value();
    }
}

impl Iterator for BddPaths<'_> {
    type Item = (Assignment, Value);

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        if !self.started {
            self.started = true;
            if self.root.is_terminal() {
                // A lone terminal has a single path: the all-EITHER
                // assignment.
                self.finished = true;
                return Some((Assignment::new(), self.root.value()));
            }
            self.descend(self.root);
            return Some((self.assignment.clone(), self.value));
        }

        // Backtrack to the deepest node whose high branch is unexplored.
        while let Some(node) = self.stack.pop() {
            let var = self.bdd.variable(node);
            let taken = self.assignment.get(var);
            self.assignment.cut(var);
            if taken == Tribool::False {
                self.assignment.set(var, Tribool::True);
                self.stack.push(node);
                let high = self.bdd.high(node);
                self.descend(high);
                return Some((self.assignment.clone(), self.value));
            }
        }

        self.finished = true;
        None
    }
}
