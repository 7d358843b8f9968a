//! The BDD manager: node interning, reference counting, and the memoized
//! AND / OR / ITE operators.
//!
//! All diagram construction goes through the [`Bdd`] manager. Interning
//! through [`Bdd::nonterminal`] keeps every diagram reduced (no node with
//! equal children), ordered (variables strictly increase towards the
//! terminals), and unique (one stored node per `(variable, low, high)`
//! triple). Because of canonicity, two diagrams over the same manager
//! represent the same function iff their root [`Ref`]s are equal.
//!
//! # Reference discipline
//!
//! Every operation that returns a `Ref` transfers exactly one reference to
//! the caller; operands are borrowed. A caller that discards a returned
//! `Ref` must [`Bdd::decref`] it. Operator-cache entries own references on
//! their operands and results, which are released when the caches are
//! flushed (at the latest when the manager is dropped).

use std::collections::HashSet;
use std::fmt::Debug;
use std::hash::BuildHasherDefault;

use hashbrown::HashMap;
use log::debug;

use crate::cache::OpCache;
use crate::node::Node;
use crate::reference::Ref;
use crate::storage::Storage;
use crate::types::{Value, Var};
use crate::utils::{HashableKey, MyHasher};

/// How a binary operator combines two terminal values.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
enum BinaryOp {
    And,
    Or,
}

impl BinaryOp {
    fn apply(self, lhs: Value, rhs: Value) -> Value {
        match self {
            BinaryOp::And => lhs & rhs,
            BinaryOp::Or => lhs | rhs,
        }
    }

    fn name(self) -> &'static str {
        match self {
            BinaryOp::And => "AND",
            BinaryOp::Or => "OR",
        }
    }
}

pub struct Bdd {
    storage: Storage,
    index: HashMap<HashableKey<Node>, u32, BuildHasherDefault<MyHasher>>,
    and_cache: OpCache<(Ref, Ref), Ref>,
    or_cache: OpCache<(Ref, Ref), Ref>,
    ite_cache: OpCache<(Ref, Ref, Ref), Ref>,
}

impl Default for Bdd {
    fn default() -> Self {
        Self::new()
    }
}

impl Debug for Bdd {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bdd")
            .field("num_nodes", &self.num_nodes())
            .field("and_cache", &self.and_cache.len())
            .field("or_cache", &self.or_cache.len())
            .field("ite_cache", &self.ite_cache.len())
            .finish()
    }
}

impl Bdd {
    pub fn new() -> Self {
        Self {
            storage: Storage::new(),
            index: HashMap::with_hasher(BuildHasherDefault::default()),
            and_cache: OpCache::new(),
            or_cache: OpCache::new(),
            ite_cache: OpCache::new(),
        }
    }

    /// The FALSE terminal.
    pub fn zero(&self) -> Ref {
        Ref::ZERO
    }

    /// The TRUE terminal.
    pub fn one(&self) -> Ref {
        Ref::ONE
    }

    /// Returns the terminal with the given value.
    ///
    /// Terminals are packed directly into the [`Ref`]; they are not stored
    /// in the arena and reference counting does not apply to them.
    pub fn terminal(&self, value: Value) -> Ref {
        Ref::terminal(value)
    }

    /// Returns a copy of the node named by `id`.
    ///
    /// # Panics
    ///
    /// Panics if `id` is a terminal or has been freed.
    pub fn node(&self, id: Ref) -> Node {
        *self.storage.node(id.index())
    }

    pub fn variable(&self, id: Ref) -> Var {
        self.node(id).variable
    }

    pub fn low(&self, id: Ref) -> Ref {
        self.node(id).low
    }

    pub fn high(&self, id: Ref) -> Ref {
        self.node(id).high
    }

    /// Number of live nonterminal nodes in the store.
    pub fn num_nodes(&self) -> usize {
        self.storage.len()
    }

    #[cfg(test)]
    pub(crate) fn refcount(&self, id: Ref) -> u32 {
        self.storage.refcount(id.index())
    }

    /// Acquires an additional reference on `id` and returns it.
    /// A no-op for terminals.
    pub fn incref(&mut self, id: Ref) -> Ref {
        if id.is_nonterminal() {
            self.storage.incref(id.index());
        }
        id
    }

    /// Releases one reference on `id`. A no-op for terminals.
    ///
    /// When the last reference is released, the node is removed from the
    /// content index, its children are released recursively, and its slot
    /// is returned to the free list.
    pub fn decref(&mut self, id: Ref) {
        if id.is_terminal() {
            return;
        }
        let index = id.index();
        if self.storage.decref(index) == 0 {
            debug!("free {}", id);
            let node = *self.storage.node(index);
            self.index.remove(&HashableKey(node));
            self.storage.free(index);
            self.decref(node.low);
            self.decref(node.high);
        }
    }

    /// Interns the nonterminal `(variable, low, high)` and returns its id.
    ///
    /// The caller's references on `low` and `high` are consumed, and one
    /// reference on the result is transferred back. A request with
    /// `low == high` yields the child directly, keeping diagrams reduced.
    pub fn nonterminal(&mut self, variable: Var, low: Ref, high: Ref) -> Ref {
        // A node with equal children would be redundant.
        if low == high {
            self.decref(high);
            return low;
        }

        debug_assert!(
            low.is_terminal() || variable < self.variable(low),
            "Nonterminal would be out of order: {} !< {}",
            variable,
            self.variable(low)
        );
        debug_assert!(
            high.is_terminal() || variable < self.variable(high),
            "Nonterminal would be out of order: {} !< {}",
            variable,
            self.variable(high)
        );

        let node = Node::new(variable, low, high);
        if let Some(&index) = self.index.get(&HashableKey(node)) {
            self.storage.incref(index);
            let id = Ref::nonterminal(index);
            debug!("reuse {} = ({}? {}: {})", id, variable, high, low);
            self.decref(low);
            self.decref(high);
            return id;
        }

        let index = self.storage.alloc(node);
        self.index.insert(HashableKey(node), index);
        let id = Ref::nonterminal(index);
        debug!("new {} = ({}? {}: {})", id, variable, high, low);
        id
    }

    /// The cofactors of `id` with respect to `v`: the node's children when
    /// its variable is `v`, and the node itself otherwise.
    fn cofactors(&self, id: Ref, v: Var) -> (Ref, Ref) {
        if id.is_nonterminal() {
            let node = self.node(id);
            if node.variable == v {
                return (node.low, node.high);
            }
        }
        (id, id)
    }

    /// Calculates the logical AND (∧) of two diagrams.
    ///
    /// On terminals the operator is bitwise, so set diagrams (range {0, 1})
    /// behave as intersection.
    pub fn apply_and(&mut self, lhs: Ref, rhs: Ref) -> Ref {
        self.cached_binary(BinaryOp::And, lhs, rhs)
    }

    /// Calculates the logical OR (∨) of two diagrams.
    pub fn apply_or(&mut self, lhs: Ref, rhs: Ref) -> Ref {
        self.cached_binary(BinaryOp::Or, lhs, rhs)
    }

    fn cached_binary(&mut self, op: BinaryOp, lhs: Ref, rhs: Ref) -> Ref {
        debug!("apply {}({}, {})", op.name(), lhs, rhs);

        // The operators are commutative, so normalize the key.
        let key = if lhs.bits() <= rhs.bits() { (lhs, rhs) } else { (rhs, lhs) };
        let cache = match op {
            BinaryOp::And => &self.and_cache,
            BinaryOp::Or => &self.or_cache,
        };
        if let Some(&result) = cache.get(&key) {
            debug!("cached {}({}, {}) -> {}", op.name(), lhs, rhs, result);
            return self.incref(result);
        }

        let result = self.binary_op(op, lhs, rhs);

        // The cache owns one reference on each operand and on the result.
        self.incref(key.0);
        self.incref(key.1);
        self.incref(result);
        let cache = match op {
            BinaryOp::And => &mut self.and_cache,
            BinaryOp::Or => &mut self.or_cache,
        };
        let evicted = cache.insert(key, result);
        debug_assert!(evicted.is_none());

        debug!("computed {}({}, {}) -> {}", op.name(), lhs, rhs, result);
        result
    }

    fn binary_op(&mut self, op: BinaryOp, lhs: Ref, rhs: Ref) -> Ref {
        match (lhs.is_terminal(), rhs.is_terminal()) {
            (true, true) => {
                // Note that the result of the operator is not checked for
                // staying within the terminal range.
                self.terminal(op.apply(lhs.value(), rhs.value()))
            }
            (true, false) => self.binary_recurse_left(op, rhs, lhs),
            (false, true) => self.binary_recurse_left(op, lhs, rhs),
            (false, false) => {
                // Always recurse down the nonterminal(s) with the smaller
                // variable, keeping the result ordered.
                let lhs_var = self.variable(lhs);
                let rhs_var = self.variable(rhs);
                if lhs_var == rhs_var {
                    self.binary_recurse_both(op, lhs, rhs)
                } else if lhs_var < rhs_var {
                    self.binary_recurse_left(op, lhs, rhs)
                } else {
                    self.binary_recurse_left(op, rhs, lhs)
                }
            }
        }
    }

    /// Recurses down the subtrees of `node`, combining each with `other`.
    fn binary_recurse_left(&mut self, op: BinaryOp, node: Ref, other: Ref) -> Ref {
        let n = self.node(node);
        let low = self.cached_binary(op, n.low, other);
        let high = self.cached_binary(op, n.high, other);
        self.nonterminal(n.variable, low, high)
    }

    /// Recurses down both subtrees in lockstep (equal top variables).
    fn binary_recurse_both(&mut self, op: BinaryOp, lhs: Ref, rhs: Ref) -> Ref {
        let l = self.node(lhs);
        let r = self.node(rhs);
        let low = self.cached_binary(op, l.low, r.low);
        let high = self.cached_binary(op, l.high, r.high);
        self.nonterminal(l.variable, low, high)
    }

    /// Calculates the IF-THEN-ELSE of three diagrams. `f` should only have
    /// 0 and 1 in its range.
    ///
    /// ```text
    /// ITE(F, G, H) = (F ∧ G) ∨ (¬F ∧ H)
    /// ```
    pub fn apply_ite(&mut self, f: Ref, g: Ref, h: Ref) -> Ref {
        debug!("apply ITE({}, {}, {})", f, g, h);

        // Trivial cases:
        //   ITE(1,G,H) => G
        //   ITE(0,G,H) => H
        if f.is_terminal() {
            let result = if f.value() == 0 { h } else { g };
            return self.incref(result);
        }

        // ITE(F,G,G) => G
        if g == h {
            return self.incref(g);
        }

        // ITE(F,1,0) => F
        if g == Ref::ONE && h == Ref::ZERO {
            return self.incref(f);
        }

        let key = (f, g, h);
        if let Some(&result) = self.ite_cache.get(&key) {
            debug!("cached ITE({}, {}, {}) -> {}", f, g, h, result);
            return self.incref(result);
        }

        // The lowest variable among the nonterminal operands; terminals
        // count as infinite.
        let mut v = self.variable(f);
        if g.is_nonterminal() {
            v = v.min(self.variable(g));
        }
        if h.is_nonterminal() {
            v = v.min(self.variable(h));
        }

        let (f0, f1) = self.cofactors(f, v);
        let (g0, g1) = self.cofactors(g, v);
        let (h0, h1) = self.cofactors(h, v);

        let low = self.apply_ite(f0, g0, h0);
        let high = self.apply_ite(f1, g1, h1);
        let result = self.nonterminal(v, low, high);

        self.incref(f);
        self.incref(g);
        self.incref(h);
        self.incref(result);
        let evicted = self.ite_cache.insert(key, result);
        debug_assert!(evicted.is_none());

        debug!("computed ITE({}, {}, {}) -> {}", f, g, h, result);
        result
    }

    /// Evaluates the diagram rooted at `root` against a concrete variable
    /// assignment, returning the terminal value reached.
    ///
    /// This is a tight loop with no allocation and no recursion.
    pub fn evaluate<F>(&self, root: Ref, assignment: F) -> Value
    where
        F: Fn(Var) -> bool,
    {
        let mut current = root;
        while current.is_nonterminal() {
            let node = self.node(current);
            current = if assignment(node.variable) { node.high } else { node.low };
        }
        current.value()
    }

    /// Ors the single element described by `assignment` into `root`.
    ///
    /// The element is the function that is `value` exactly on the first
    /// `var_count` variables of the assignment (and 0 elsewhere); the
    /// result is `element || root`, where the element's value takes
    /// precedence on its own paths (short-circuit OR). This avoids building
    /// a temporary diagram for the element.
    ///
    /// Returns a new reference on the result; `root` is borrowed.
    pub fn insert<F>(&mut self, root: Ref, assignment: &F, var_count: u32, value: Value) -> Ref
    where
        F: Fn(Var) -> bool,
    {
        debug!("insert element of {} variables with value {}", var_count, value);
        self.insert_or(assignment, var_count, value, 0, root)
    }

    /// One step of the element-insertion recursion: the left operand is the
    /// implicit element diagram restricted to variables `current..`, the
    /// right operand is a real node.
    fn insert_or<F>(&mut self, assignment: &F, var_count: u32, value: Value, current: u32, rhs: Ref) -> Ref
    where
        F: Fn(Var) -> bool,
    {
        // Past the element's last variable the left operand is a terminal:
        //   0 || Y = Y
        //   X || Y = X
        if current == var_count {
            if value == 0 {
                return self.incref(rhs);
            }
            return self.terminal(value);
        }

        if rhs.is_terminal() {
            return self.insert_recurse_left(assignment, var_count, value, current, rhs);
        }

        let rhs_var = self.variable(rhs).index();
        if current == rhs_var {
            self.insert_recurse_both(assignment, var_count, value, current, rhs)
        } else if current < rhs_var {
            self.insert_recurse_left(assignment, var_count, value, current, rhs)
        } else {
            self.insert_recurse_right(assignment, var_count, value, current, rhs)
        }
    }

    /// The element has the smaller variable: only the branch selected by
    /// the assignment continues the recursion.
    fn insert_recurse_left<F>(&mut self, assignment: &F, var_count: u32, value: Value, current: u32, rhs: Ref) -> Ref
    where
        F: Fn(Var) -> bool,
    {
        let var = Var::new(current);
        let taken = self.insert_or(assignment, var_count, value, current + 1, rhs);
        let other = self.incref(rhs);
        let (low, high) = if assignment(var) { (other, taken) } else { (taken, other) };
        self.nonterminal(var, low, high)
    }

    /// Both operands branch on the same variable.
    fn insert_recurse_both<F>(&mut self, assignment: &F, var_count: u32, value: Value, current: u32, rhs: Ref) -> Ref
    where
        F: Fn(Var) -> bool,
    {
        let node = self.node(rhs);
        let (taken_child, other_child) = if assignment(node.variable) {
            (node.high, node.low)
        } else {
            (node.low, node.high)
        };
        let taken = self.insert_or(assignment, var_count, value, current + 1, taken_child);
        // Off the element's path the left operand is 0, and 0 || Y = Y.
        let other = self.incref(other_child);
        let (low, high) = if assignment(node.variable) { (other, taken) } else { (taken, other) };
        self.nonterminal(node.variable, low, high)
    }

    /// The right operand has the smaller variable: recurse down both of its
    /// subtrees against the unchanged element.
    fn insert_recurse_right<F>(&mut self, assignment: &F, var_count: u32, value: Value, current: u32, rhs: Ref) -> Ref
    where
        F: Fn(Var) -> bool,
    {
        let node = self.node(rhs);
        let low = self.insert_or(assignment, var_count, value, current, node.low);
        let high = self.insert_or(assignment, var_count, value, current, node.high);
        self.nonterminal(node.variable, low, high)
    }

    /// Removes the single element described by `assignment` from `root` by
    /// anding with the complement of the element's path: the function that
    /// is 0 exactly on the assignment and 1 everywhere else.
    ///
    /// Returns a new reference on the result; `root` is borrowed.
    pub fn remove<F>(&mut self, root: Ref, assignment: &F, var_count: u32) -> Ref
    where
        F: Fn(Var) -> bool,
    {
        debug!("remove element of {} variables", var_count);

        // Build the linear complement diagram bottom-up: along the path the
        // off-path branch is TRUE, and the path itself ends in FALSE.
        let mut complement = self.zero();
        for index in (0..var_count).rev() {
            let var = Var::new(index);
            complement = if assignment(var) {
                self.nonterminal(var, self.one(), complement)
            } else {
                self.nonterminal(var, complement, self.one())
            };
        }

        let result = self.apply_and(complement, root);
        self.decref(complement);
        result
    }

    /// Number of distinct nodes reachable from `root`, the root included.
    /// Terminals are not counted.
    pub fn reachable_count(&self, root: Ref) -> usize {
        let mut visited: HashSet<u32> = HashSet::new();
        let mut queue: Vec<Ref> = Vec::new();
        if root.is_nonterminal() {
            queue.push(root);
        }

        let mut count = 0;
        while let Some(id) = queue.pop() {
            if !visited.insert(id.index()) {
                continue;
            }
            count += 1;
            let node = self.node(id);
            if node.low.is_nonterminal() {
                queue.push(node.low);
            }
            if node.high.is_nonterminal() {
                queue.push(node.high);
            }
        }
        count
    }

    /// The amount of memory used by the nodes reachable from `root`.
    pub fn memory_size(&self, root: Ref) -> usize {
        self.reachable_count(root) * std::mem::size_of::<Node>()
    }

    /// Structural equality of two diagrams, possibly from different
    /// managers. Within one manager this is equivalent to `id == other_id`
    /// because of canonicity.
    pub fn nodes_equal(&self, id: Ref, other: &Bdd, other_id: Ref) -> bool {
        if id.is_terminal() != other_id.is_terminal() {
            return false;
        }
        if id.is_terminal() {
            return id == other_id;
        }
        let a = self.node(id);
        let b = other.node(other_id);
        a.variable == b.variable
            && self.nodes_equal(a.low, other, b.low)
            && self.nodes_equal(a.high, other, b.high)
    }

    /// Drops all memoized operator results, releasing the references the
    /// caches hold on operands and results.
    pub fn flush_caches(&mut self) {
        debug!(
            "flushing operator caches ({} AND, {} OR, {} ITE entries)",
            self.and_cache.len(),
            self.or_cache.len(),
            self.ite_cache.len()
        );
        let binary: Vec<(Ref, Ref, Ref)> = self
            .and_cache
            .drain()
            .chain(self.or_cache.drain())
            .map(|((a, b), r)| (a, b, r))
            .collect();
        for (a, b, r) in binary {
            self.decref(a);
            self.decref(b);
            self.decref(r);
        }
        let trinary: Vec<((Ref, Ref, Ref), Ref)> = self.ite_cache.drain().collect();
        for ((f, g, h), r) in trinary {
            self.decref(f);
            self.decref(g);
            self.decref(h);
            self.decref(r);
        }
    }
}

impl Drop for Bdd {
    fn drop(&mut self) {
        // Operator caches are flushed before the arenas go away.
        self.flush_caches();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use test_log::test;

    fn assignment(bits: &[bool]) -> impl Fn(Var) -> bool + '_ {
        move |var: Var| bits[var.index() as usize]
    }

    #[test]
    fn test_nonterminal_is_interned() {
        let mut bdd = Bdd::new();
        let a = bdd.nonterminal(Var::new(0), Ref::ZERO, Ref::ONE);
        let b = bdd.nonterminal(Var::new(0), Ref::ZERO, Ref::ONE);
        assert_eq!(a, b);
        assert_eq!(bdd.num_nodes(), 1);
        assert_eq!(bdd.refcount(a), 2);
        bdd.decref(a);
        bdd.decref(b);
        assert_eq!(bdd.num_nodes(), 0);
    }

    #[test]
    fn test_nonterminal_collapses_equal_children() {
        let mut bdd = Bdd::new();
        let child = bdd.nonterminal(Var::new(1), Ref::ZERO, Ref::ONE);
        bdd.incref(child);
        let parent = bdd.nonterminal(Var::new(0), child, child);
        assert_eq!(parent, child);
        assert_eq!(bdd.num_nodes(), 1);
        assert_eq!(bdd.refcount(child), 1);
        bdd.decref(child);
    }

    #[test]
    fn test_decref_releases_children() {
        let mut bdd = Bdd::new();
        let child = bdd.nonterminal(Var::new(1), Ref::ZERO, Ref::ONE);
        let parent = bdd.nonterminal(Var::new(0), child, Ref::ONE);
        assert_eq!(bdd.num_nodes(), 2);
        bdd.decref(parent);
        assert_eq!(bdd.num_nodes(), 0);
    }

    #[test]
    fn test_binary_on_terminals_is_bitwise() {
        let mut bdd = Bdd::new();
        let a = bdd.terminal(6);
        let b = bdd.terminal(3);
        assert_eq!(bdd.apply_and(a, b), bdd.terminal(2));
        assert_eq!(bdd.apply_or(a, b), bdd.terminal(7));
    }

    #[test]
    fn test_apply_or_builds_union() {
        let mut bdd = Bdd::new();
        let x0 = bdd.nonterminal(Var::new(0), Ref::ZERO, Ref::ONE);
        let x1 = bdd.nonterminal(Var::new(1), Ref::ZERO, Ref::ONE);
        let union = bdd.apply_or(x0, x1);

        assert_eq!(bdd.evaluate(union, assignment(&[false, false])), 0);
        assert_eq!(bdd.evaluate(union, assignment(&[true, false])), 1);
        assert_eq!(bdd.evaluate(union, assignment(&[false, true])), 1);
        assert_eq!(bdd.evaluate(union, assignment(&[true, true])), 1);
    }

    #[test]
    fn test_apply_and_builds_intersection() {
        let mut bdd = Bdd::new();
        let x0 = bdd.nonterminal(Var::new(0), Ref::ZERO, Ref::ONE);
        let x1 = bdd.nonterminal(Var::new(1), Ref::ZERO, Ref::ONE);
        let inter = bdd.apply_and(x0, x1);

        assert_eq!(bdd.evaluate(inter, assignment(&[true, true])), 1);
        assert_eq!(bdd.evaluate(inter, assignment(&[true, false])), 0);
        assert_eq!(bdd.evaluate(inter, assignment(&[false, true])), 0);
    }

    #[test]
    fn test_binary_results_are_cached() {
        let mut bdd = Bdd::new();
        let x0 = bdd.nonterminal(Var::new(0), Ref::ZERO, Ref::ONE);
        let x1 = bdd.nonterminal(Var::new(1), Ref::ZERO, Ref::ONE);
        let first = bdd.apply_or(x0, x1);
        let second = bdd.apply_or(x0, x1);
        let commuted = bdd.apply_or(x1, x0);
        assert_eq!(first, second);
        assert_eq!(first, commuted);
    }

    #[test]
    fn test_apply_ite() {
        let mut bdd = Bdd::new();
        let g = bdd.nonterminal(Var::new(1), Ref::ZERO, Ref::ONE);
        let h = bdd.nonterminal(Var::new(2), Ref::ZERO, Ref::ONE);

        // Terminal selectors.
        assert_eq!(bdd.apply_ite(Ref::ONE, g, h), g);
        assert_eq!(bdd.apply_ite(Ref::ZERO, g, h), h);

        let f = bdd.nonterminal(Var::new(0), Ref::ZERO, Ref::ONE);

        // ITE(F,G,G) => G and ITE(F,1,0) => F.
        assert_eq!(bdd.apply_ite(f, g, g), g);
        assert_eq!(bdd.apply_ite(f, Ref::ONE, Ref::ZERO), f);

        // The general case agrees with (F ∧ G) ∨ (¬F ∧ H) pointwise.
        let ite = bdd.apply_ite(f, g, h);
        for bits in 0..8u32 {
            let values = [bits & 4 != 0, bits & 2 != 0, bits & 1 != 0];
            let expected = if values[0] { values[1] } else { values[2] };
            assert_eq!(bdd.evaluate(ite, assignment(&values)), expected as Value);
        }
    }

    #[test]
    fn test_insert_and_evaluate() {
        let mut bdd = Bdd::new();
        let bits = [true, false, true];
        let root = bdd.insert(Ref::ZERO, &assignment(&bits), 3, 1);

        for probe in 0..8u32 {
            let values = [probe & 4 != 0, probe & 2 != 0, probe & 1 != 0];
            let expected = (values == bits) as Value;
            assert_eq!(bdd.evaluate(root, assignment(&values)), expected);
        }
        // A 3-variable path yields exactly 3 nodes.
        assert_eq!(bdd.reachable_count(root), 3);
        bdd.decref(root);
    }

    #[test]
    fn test_insert_is_idempotent() {
        let mut bdd = Bdd::new();
        let bits = [true, true, false];
        let once = bdd.insert(Ref::ZERO, &assignment(&bits), 3, 1);
        let twice = bdd.insert(once, &assignment(&bits), 3, 1);
        assert_eq!(once, twice);
        bdd.decref(once);
        bdd.decref(twice);
    }

    #[test]
    fn test_insert_shorter_element_covers_subtree() {
        let mut bdd = Bdd::new();
        // An element over the first 2 of 3 variables leaves the third as
        // "don't care".
        let bits = [true, false, false];
        let root = bdd.insert(Ref::ZERO, &assignment(&bits), 2, 1);
        assert_eq!(bdd.evaluate(root, assignment(&[true, false, false])), 1);
        assert_eq!(bdd.evaluate(root, assignment(&[true, false, true])), 1);
        assert_eq!(bdd.evaluate(root, assignment(&[true, true, false])), 0);
        bdd.decref(root);
    }

    #[test]
    fn test_insert_value_takes_precedence() {
        let mut bdd = Bdd::new();
        let bits = [true, false];
        let first = bdd.insert(Ref::ZERO, &assignment(&bits), 2, 7);
        let second = bdd.insert(first, &assignment(&bits), 2, 42);
        assert_eq!(bdd.evaluate(second, assignment(&bits)), 42);
        bdd.decref(first);
        bdd.decref(second);
    }

    #[test]
    fn test_remove_restores_original_root() {
        let mut bdd = Bdd::new();
        let base_bits = [false, true, false];
        let base = bdd.insert(Ref::ZERO, &assignment(&base_bits), 3, 1);

        let extra_bits = [true, true, false];
        let grown = bdd.insert(base, &assignment(&extra_bits), 3, 1);
        assert_ne!(grown, base);

        let shrunk = bdd.remove(grown, &assignment(&extra_bits), 3);
        assert_eq!(shrunk, base);

        bdd.decref(base);
        bdd.decref(grown);
        bdd.decref(shrunk);
    }

    #[test]
    fn test_flush_caches_releases_nodes() {
        let mut bdd = Bdd::new();
        let bits = [true, false, true];
        let root = bdd.insert(Ref::ZERO, &assignment(&bits), 3, 1);
        let gone = bdd.remove(root, &assignment(&bits), 3);
        assert_eq!(gone, Ref::ZERO);
        bdd.decref(root);

        // Only cache-held references remain.
        bdd.flush_caches();
        assert_eq!(bdd.num_nodes(), 0);
    }

    #[test]
    fn test_reachable_count_shares_nodes() {
        let mut bdd = Bdd::new();
        let shared = bdd.nonterminal(Var::new(2), Ref::ZERO, Ref::ONE);
        bdd.incref(shared);
        let left = bdd.nonterminal(Var::new(1), shared, Ref::ONE);
        let root = bdd.nonterminal(Var::new(0), left, shared);
        // `shared` is reachable on two paths but counted once.
        assert_eq!(bdd.reachable_count(root), 3);
        assert_eq!(bdd.memory_size(root), 3 * std::mem::size_of::<Node>());
        assert_eq!(bdd.reachable_count(Ref::ZERO), 0);
        bdd.decref(root);
    }

    #[test]
    fn test_nodes_equal_across_managers() {
        let mut bdd1 = Bdd::new();
        let mut bdd2 = Bdd::new();
        let bits = [true, false, true];
        let a = bdd1.insert(Ref::ZERO, &assignment(&bits), 3, 1);
        let b = bdd2.insert(Ref::ZERO, &assignment(&bits), 3, 1);
        assert!(bdd1.nodes_equal(a, &bdd2, b));

        let other_bits = [true, true, true];
        let c = bdd2.insert(Ref::ZERO, &assignment(&other_bits), 3, 1);
        assert!(!bdd1.nodes_equal(a, &bdd2, c));
    }
}
