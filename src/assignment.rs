//! Variable assignments with three-valued cells.
//!
//! An [`Assignment`] maps variables to [`Tribool`] values. A variable can
//! be true or false, or it can be EITHER, meaning that both values lead to
//! the same result. EITHER is a first-class value, not an "unset" marker:
//! the iterators expand EITHER cells into both concrete values.

use crate::bits::{bit_get, bit_set};
use crate::types::Var;

/// The value of one variable in an assignment.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Tribool {
    False,
    True,
    Either,
}

impl Tribool {
    pub fn from_bool(value: bool) -> Self {
        if value {
            Tribool::True
        } else {
            Tribool::False
        }
    }
}

/// A mapping of variables to [`Tribool`] values.
///
/// The cells are stored in a vector indexed by variable; variables beyond
/// the vector's length are implicitly EITHER. Equality compares up to the
/// longer of the two assignments, treating missing cells as EITHER.
#[derive(Debug, Clone, Default)]
pub struct Assignment {
    values: Vec<Tribool>,
}

impl Assignment {
    /// Creates an assignment where every variable is EITHER.
    pub fn new() -> Self {
        Self { values: Vec::new() }
    }

    /// Returns the value assigned to `var`.
    pub fn get(&self, var: Var) -> Tribool {
        self.values.get(var.index() as usize).copied().unwrap_or(Tribool::Either)
    }

    /// Sets the value assigned to `var`, padding any gap with EITHER.
    pub fn set(&mut self, var: Var, value: Tribool) {
        let index = var.index() as usize;
        if index >= self.values.len() {
            self.values.resize(index + 1, Tribool::Either);
        }
        self.values[index] = value;
    }

    /// Sets `var`, and every variable above it, to EITHER.
    pub fn cut(&mut self, var: Var) {
        self.values.truncate(var.index() as usize);
    }

    /// Resets every variable to EITHER.
    pub fn clear(&mut self) {
        self.values.clear();
    }
}

impl PartialEq for Assignment {
    fn eq(&self, other: &Self) -> bool {
        let longer = self.values.len().max(other.values.len());
        (0..longer as u32).all(|i| self.get(Var::new(i)) == other.get(Var::new(i)))
    }
}

impl Eq for Assignment {}

/// An iterator state expanding an assignment into concrete assignments.
///
/// For each variable that is EITHER in the source (within the requested
/// variable count), the expansion enumerates both values: `2^k` concrete
/// assignments in total, produced by a binary counter over the EITHER
/// positions. The counter's least significant bit is the EITHER position
/// with the highest variable, so the expansions come out in ascending
/// order of the bit string.
#[derive(Debug)]
pub struct ExpandedAssignment {
    finished: bool,
    /// The current concrete assignment, one bit per variable.
    values: Vec<u8>,
    /// The variables that are EITHER in the source, ascending.
    eithers: Vec<u32>,
}

impl ExpandedAssignment {
    /// Starts an expansion giving concrete values to the first `var_count`
    /// variables of `assignment`.
    pub fn new(assignment: &Assignment, var_count: u32) -> Self {
        let mut values = vec![0u8; var_count.div_ceil(8) as usize];
        let mut eithers = Vec::new();
        for index in 0..var_count {
            match assignment.get(Var::new(index)) {
                Tribool::True => bit_set(&mut values, index, true),
                Tribool::False => {}
                Tribool::Either => eithers.push(index),
            }
        }
        Self { finished: false, values, eithers }
    }

    /// Whether the expansion has run out of concrete assignments.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// The current value of variable `index`.
    pub fn bit(&self, index: u32) -> bool {
        bit_get(&self.values, index)
    }

    /// Advances to the next concrete assignment.
    pub fn advance(&mut self) {
        if self.finished {
            return;
        }
        // Increment the binary counter formed by the EITHER positions.
        for &index in self.eithers.iter().rev() {
            if !bit_get(&self.values, index) {
                bit_set(&mut self.values, index, true);
                return;
            }
            // Carry.
            bit_set(&mut self.values, index, false);
        }
        self.finished = true;
    }
}
