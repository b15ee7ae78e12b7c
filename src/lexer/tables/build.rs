// src/lexer/tables/build.rs
use hashbrown::{HashMap, hash_map::Entry};
use log::{debug, info};

use super::{
    MAX_SYM, MergeTable, ParallelLexer, REJECT, START, StateIndex, Transition,
    dfa::Dfa,
    tokens::TokenId,
};

/// A parallel state: the DFA's behavior under one character class (or a
/// composed run of them), as a total map from DFA state to [`Transition`].
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct ParallelState {
    transitions: Vec<Transition>,
}

impl ParallelState {
    /// All entries default to `(REJECT, false)`.
    pub fn new(num_states: usize) -> Self {
        Self {
            transitions: vec![Transition::default(); num_states],
        }
    }

    /// The identity mapping: every state to itself, no lexeme boundary.
    pub fn identity(num_states: usize) -> Self {
        let mut ps = Self::new(num_states);
        for (s, t) in ps.transitions.iter_mut().enumerate() {
            t.result_state = s as StateIndex;
        }
        ps
    }

    /// Lifts the DFA's transition relation under `sym` into a parallel state.
    pub fn from_symbol(dfa: &Dfa, sym: u8) -> Self {
        let mut ps = Self::new(dfa.num_states());
        for src in 0..dfa.num_states() {
            if let Some(edge) = dfa.step(src as StateIndex, sym) {
                ps.transitions[src] = Transition::new(edge.dst, edge.produces_lexeme);
            }
        }
        ps
    }

    pub fn get(&self, state: StateIndex) -> Transition {
        self.transitions[state as usize]
    }

    /// In-place left composition: apply `self` first, then `other`.
    /// REJECT is absorbing, so entries already rejecting stay rejecting.
    pub fn merge(&mut self, other: &ParallelState) {
        for t in &mut self.transitions {
            if t.result_state == REJECT {
                *t = Transition::default();
            } else {
                *t = other.transitions[t.result_state as usize];
            }
        }
    }
}

/// Assigns dense first-seen indices to distinct parallel states. Dedup goes
/// through the hash map; `states` keeps an index-ordered copy for O(1)
/// lookup during saturation.
struct Interner {
    seen: HashMap<ParallelState, StateIndex>,
    states: Vec<ParallelState>,
}

impl Interner {
    fn new() -> Self {
        Self {
            seen: HashMap::new(),
            states: Vec::new(),
        }
    }

    fn len(&self) -> usize {
        self.states.len()
    }

    fn get(&self, index: StateIndex) -> &ParallelState {
        &self.states[index as usize]
    }

    /// Returns the index for `ps`, plus whether it was newly inserted.
    fn intern(&mut self, ps: ParallelState) -> (StateIndex, bool) {
        match self.seen.entry(ps) {
            Entry::Occupied(entry) => (*entry.get(), false),
            Entry::Vacant(entry) => {
                let index = self.states.len() as StateIndex;
                self.states.push(entry.key().clone());
                entry.insert(index);
                (index, true)
            }
        }
    }
}

struct TableBuilder<'a> {
    dfa: &'a Dfa,
    interner: Interner,
    merge_table: MergeTable,
    identity_state_index: StateIndex,
}

impl<'a> TableBuilder<'a> {
    fn new(dfa: &'a Dfa) -> Self {
        Self {
            dfa,
            interner: Interner::new(),
            merge_table: MergeTable::new(),
            identity_state_index: 0,
        }
    }

    fn enqueue(&mut self, ps: ParallelState) -> StateIndex {
        let (index, inserted) = self.interner.intern(ps);
        if inserted {
            self.merge_table.resize(index as usize + 1);
        }
        index
    }

    /// One parallel state per input byte, encoding the DFA's per-character
    /// transition relation. Returns the per-symbol `(index, produces)` table.
    fn seed_initial_states(&mut self) -> Vec<Transition> {
        let n = self.dfa.num_states();
        let mut per_symbol: Vec<ParallelState> =
            (0..=MAX_SYM).map(|_| ParallelState::new(n)).collect();
        for src in 0..n {
            for edge in self.dfa.transitions_from(src as StateIndex) {
                per_symbol[edge.sym as usize].transitions[src] =
                    Transition::new(edge.dst, edge.produces_lexeme);
            }
        }

        let mut initial_states = Vec::with_capacity(MAX_SYM + 1);
        for ps in per_symbol {
            let produces_lexeme = ps.get(START).produces_lexeme;
            let index = self.enqueue(ps);
            initial_states.push(Transition::new(index, produces_lexeme));
        }
        initial_states
    }

    // The identity mapping is required so the scan operator has a unit.
    fn seed_identity(&mut self) {
        let identity = ParallelState::identity(self.dfa.num_states());
        self.identity_state_index = self.enqueue(identity);
    }

    fn merge(&mut self, i: StateIndex, j: StateIndex) {
        // Identity operands pass the other side through. Composing naively
        // would read produces_lexeme from the identity's START slot, which is
        // always false, erasing the boundary flag.
        let result = if i == self.identity_state_index {
            j
        } else if j == self.identity_state_index {
            i
        } else {
            let mut scratch = self.interner.get(i).clone();
            scratch.merge(self.interner.get(j));
            self.enqueue(scratch)
        };

        let produces_lexeme = self.interner.get(result).get(START).produces_lexeme;
        self.merge_table.set(i, j, Transition::new(result, produces_lexeme));
    }

    /// Pairwise merges until the interned set is closed. Interning appends,
    /// so both loop bounds are re-read every iteration; the outer index
    /// chasing the appended tail guarantees every pair is merged in both
    /// orders before termination. Termination is bounded by the finite
    /// monoid of maps over DFA states.
    fn saturate(&mut self) {
        let mut i: StateIndex = 0;
        while (i as usize) < self.interner.len() {
            if i % 64 == 0 {
                debug!(
                    "[tables] saturating merge table: {} of {} states",
                    i,
                    self.interner.len()
                );
            }
            let mut j: StateIndex = 0;
            while (j as usize) < self.interner.len() {
                self.merge(i, j);
                self.merge(j, i);
                j += 1;
            }
            i += 1;
        }
    }

    fn final_states(&self) -> Vec<Option<TokenId>> {
        let mut finals = Vec::with_capacity(self.interner.len());
        for ps in &self.interner.states {
            let start_target = ps.get(START).result_state;
            finals.push(if start_target == REJECT {
                None
            } else {
                self.dfa.lexeme_at(start_target)
            });
        }
        finals
    }
}

/// Builds the complete parallel-scan artifact for `dfa`.
pub fn build_tables(dfa: &Dfa) -> ParallelLexer {
    let (lexer, _) = build_tables_inner(dfa);
    lexer
}

fn build_tables_inner(dfa: &Dfa) -> (ParallelLexer, Vec<ParallelState>) {
    assert!(dfa.num_states() > 0, "DFA has no states");

    let mut builder = TableBuilder::new(dfa);
    let initial_states = builder.seed_initial_states();
    builder.seed_identity();
    builder.saturate();
    let final_states = builder.final_states();

    info!(
        "[tables] built parallel lexer tables: {} parallel states, merge table {}²",
        builder.interner.len(),
        builder.merge_table.states()
    );

    let lexer = ParallelLexer {
        initial_states,
        merge_table: builder.merge_table,
        identity_state_index: builder.identity_state_index,
        final_states,
    };
    (lexer, builder.interner.states)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tables::{GROW_FACTOR, MIN_SIZE};

    #[test]
    fn merge_treats_reject_as_absorbing() {
        let mut left = ParallelState::new(2);
        left.transitions[0] = Transition::new(1, true);
        // left.transitions[1] stays (REJECT, false)
        let mut right = ParallelState::new(2);
        right.transitions[0] = Transition::new(0, false);
        right.transitions[1] = Transition::new(1, true);

        left.merge(&right);
        assert_eq!(left.get(0), Transition::new(1, true));
        assert_eq!(left.get(1), Transition::default());
    }

    #[test]
    fn merge_applies_left_then_right() {
        // left: 0 -> 1; right: 1 -> 0 with a boundary
        let mut left = ParallelState::new(2);
        left.transitions[0] = Transition::new(1, false);
        let mut right = ParallelState::new(2);
        right.transitions[1] = Transition::new(0, true);

        left.merge(&right);
        assert_eq!(left.get(0), Transition::new(0, true));
    }

    #[test]
    fn merge_table_resize_preserves_coordinates() {
        let mut table = MergeTable::new();
        table.resize(3);
        for second in 0..3u32 {
            for first in 0..3u32 {
                table.set(first, second, Transition::new(first * 3 + second, false));
            }
        }

        // Force a reallocation past the initial capacity.
        let grown = MIN_SIZE * GROW_FACTOR + 1;
        table.resize(grown);
        assert_eq!(table.states(), grown);
        for second in 0..3u32 {
            for first in 0..3u32 {
                assert_eq!(table.get(first, second), Transition::new(first * 3 + second, false));
            }
        }
        // New cells are default-initialized.
        assert_eq!(table.get(7, 7), Transition::default());
    }

    #[test]
    fn interner_assigns_stable_first_seen_indices() {
        let mut interner = Interner::new();
        let a = ParallelState::identity(3);
        let mut b = ParallelState::new(3);
        b.transitions[0] = Transition::new(2, false);

        assert_eq!(interner.intern(a.clone()), (0, true));
        assert_eq!(interner.intern(b.clone()), (1, true));
        assert_eq!(interner.intern(a), (0, false));
        assert_eq!(interner.len(), 2);
        assert_eq!(interner.get(1).get(0), Transition::new(2, false));
    }

    fn two_token_dfa() -> Dfa {
        // 0 --a--> 1 (accept), 1 --b--> 2 (accept), restart edges on 'a'
        let mut dfa = Dfa::new(3);
        dfa.add_transition(0, b'a', 1, false);
        dfa.add_transition(1, b'b', 2, false);
        dfa.add_transition(1, b'a', 1, true);
        dfa.add_transition(2, b'a', 1, true);
        dfa
    }

    #[test]
    fn saturation_is_closed_under_recomposition() {
        let dfa = two_token_dfa();
        let (lexer, states) = build_tables_inner(&dfa);
        let k = states.len();
        assert_eq!(lexer.merge_table.states(), k);

        for i in 0..k as StateIndex {
            for j in 0..k as StateIndex {
                let cell = lexer.merge_table.get(i, j);
                assert!((cell.result_state as usize) < k);

                if i == lexer.identity_state_index {
                    assert_eq!(cell.result_state, j);
                } else if j == lexer.identity_state_index {
                    assert_eq!(cell.result_state, i);
                } else {
                    let mut scratch = states[i as usize].clone();
                    scratch.merge(&states[j as usize]);
                    assert!(states[cell.result_state as usize] == scratch);
                }
            }
        }
    }
}
