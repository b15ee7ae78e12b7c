// src/lexer/tables/mod.rs
pub mod build;
pub mod dfa;
pub mod io;
pub mod tokens;

// Re-exports to keep the external API small.
pub use build::{ParallelState, build_tables};
pub use io::{load_tables_bin_bytes, load_tables_json_bytes, save_tables_bin, save_tables_json};
pub use tokens::{TokenId, TokenMap};

use std::io::Write;

/// Index of a DFA state, or of an interned parallel state.
pub type StateIndex = u32;

/// Sentinel for "no transition"; never a valid state index.
pub const REJECT: StateIndex = StateIndex::MAX;

/// The distinguished DFA start state.
pub const START: StateIndex = 0;

/// Largest input byte, inclusive.
pub const MAX_SYM: usize = 255;

/// Initial merge-table capacity.
pub const MIN_SIZE: usize = 8;
/// Geometric growth factor for merge-table reallocation.
pub const GROW_FACTOR: usize = 2;

/// A `(result state, produces lexeme)` pair. The `produces_lexeme` flag means
/// the transition crosses a lexeme boundary when taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Transition {
    pub result_state: StateIndex,
    pub produces_lexeme: bool,
}

impl Transition {
    pub fn new(result_state: StateIndex, produces_lexeme: bool) -> Self {
        Self {
            result_state,
            produces_lexeme,
        }
    }
}

impl Default for Transition {
    fn default() -> Self {
        Self {
            result_state: REJECT,
            produces_lexeme: false,
        }
    }
}

/// Growable dense square matrix of [`Transition`]s addressed by a pair of
/// parallel state indices, stored as `first + second * capacity`.
pub struct MergeTable {
    num_states: usize,
    capacity: usize,
    cells: Vec<Transition>,
}

impl MergeTable {
    pub fn new() -> Self {
        Self {
            num_states: 0,
            capacity: 0,
            cells: Vec::new(),
        }
    }

    /// Grows the logical side length to `new_num_states`. Reallocates with
    /// geometric growth when the capacity is exceeded, rehoming existing
    /// entries to their `(first, second)` coordinates under the new stride.
    pub fn resize(&mut self, new_num_states: usize) {
        if new_num_states <= self.capacity {
            self.num_states = new_num_states;
            return;
        }

        let mut new_capacity = self.capacity.max(MIN_SIZE);
        while new_capacity < new_num_states {
            new_capacity *= GROW_FACTOR;
        }

        let mut new_cells = vec![Transition::default(); new_capacity * new_capacity];
        for second in 0..self.num_states {
            for first in 0..self.num_states {
                new_cells[first + second * new_capacity] =
                    self.cells[first + second * self.capacity];
            }
        }

        self.num_states = new_num_states;
        self.capacity = new_capacity;
        self.cells = new_cells;
    }

    fn index(&self, first: StateIndex, second: StateIndex) -> usize {
        let (first, second) = (first as usize, second as usize);
        assert!(first < self.num_states, "first index {first} out of range");
        assert!(second < self.num_states, "second index {second} out of range");
        first + second * self.capacity
    }

    pub fn get(&self, first: StateIndex, second: StateIndex) -> Transition {
        self.cells[self.index(first, second)]
    }

    pub fn set(&mut self, first: StateIndex, second: StateIndex, transition: Transition) {
        let index = self.index(first, second);
        self.cells[index] = transition;
    }

    /// Logical side length (the number of interned parallel states).
    pub fn states(&self) -> usize {
        self.num_states
    }
}

impl Default for MergeTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Immutable parallel-scan lexing tables. Built once by [`build_tables`];
/// consumed by a data-parallel prefix-scan kernel (or its sequential
/// reference, [`crate::lexer::cpu::lex_with_tables`]).
pub struct ParallelLexer {
    /// Per input byte: the interned parallel state index, plus whether that
    /// byte's transition out of [`START`] completes a lexeme.
    pub initial_states: Vec<Transition>,
    pub merge_table: MergeTable,
    pub identity_state_index: StateIndex,
    /// Per parallel state: the lexeme recognized when the DFA, started at
    /// [`START`], ends in the state that parallel state maps `START` to.
    pub final_states: Vec<Option<TokenId>>,
}

impl ParallelLexer {
    /// Reports table cardinalities for diagnostics.
    pub fn dump_sizes(&self, out: &mut dyn Write) -> std::io::Result<()> {
        let k = self.merge_table.states();
        writeln!(out, "Initial states table: {} elements", self.initial_states.len())?;
        writeln!(out, "Merge table: {k}² elements = {} elements", k * k)?;
        writeln!(out, "Final states table: {} elements", self.final_states.len())
    }
}
