// src/lexer/cpu.rs
// Sequential lexers: a streaming-DFA oracle, and a fold over the parallel
// tables that mirrors what the scan kernel computes.

use crate::lexer::tables::{
    ParallelLexer, START, StateIndex,
    dfa::Dfa,
    tokens::TokenId,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenId,
    pub start: usize,
    pub len: usize,
}

fn slice_dbg(src: &[u8], i: usize) -> (usize, String) {
    let lo = i.saturating_sub(16);
    let hi = (i + 16).min(src.len());
    let mut s = String::new();
    for &b in &src[lo..hi] {
        s.push(
            if b.is_ascii_graphic() || b == b' ' || b == b'\n' || b == b'\t' || b == b'\r' {
                b as char
            } else {
                '·'
            },
        );
    }
    (lo, s)
}

/// Streaming-DFA lexer that walks `dfa` byte by byte. A token ends when the
/// consumed edge crosses a lexeme boundary, and at end-of-input when the
/// final state carries a lexeme.
pub fn lex_on_cpu(dfa: &Dfa, input: &[u8]) -> Result<Vec<Token>, String> {
    let mut out = Vec::new();
    let mut state: StateIndex = START;
    let mut tok_start = 0usize;

    for (i, &b) in input.iter().enumerate() {
        let Some(edge) = dfa.step(state, b) else {
            let (ctx_lo, ctx) = slice_dbg(input, i);
            return Err(format!(
                "no transition on byte {i} (char {:?}, 0x{:02X}) from state {state}; \
                 context [{}..{}):\n{}",
                b as char,
                b,
                ctx_lo,
                ctx_lo + ctx.len(),
                ctx
            ));
        };

        // A boundary edge ends the token BEFORE consuming b; the edge itself
        // already transitions as if b started the next token.
        if edge.produces_lexeme {
            let kind = dfa.lexeme_at(state).ok_or_else(|| {
                format!("lexeme boundary out of non-accepting state {state} at byte {i}")
            })?;
            out.push(Token {
                kind,
                start: tok_start,
                len: i - tok_start,
            });
            tok_start = i;
        }

        state = edge.dst;
    }

    if input.is_empty() {
        return Ok(out);
    }
    match dfa.lexeme_at(state) {
        Some(kind) => {
            out.push(Token {
                kind,
                start: tok_start,
                len: input.len() - tok_start,
            });
            Ok(out)
        }
        None => Err(format!(
            "ended in non-accepting state {state} (unterminated token?)"
        )),
    }
}

/// Sequential reference for the parallel scan: folds the per-byte initial
/// states through the merge table from the identity, cutting a token
/// whenever the composed cell crosses a lexeme boundary at START.
pub fn lex_with_tables(lexer: &ParallelLexer, input: &[u8]) -> Result<Vec<Token>, String> {
    let mut out = Vec::new();
    let mut acc = lexer.identity_state_index;
    let mut tok_start = 0usize;

    for (i, &b) in input.iter().enumerate() {
        let step = lexer.initial_states[b as usize];
        let cell = lexer.merge_table.get(acc, step.result_state);

        if cell.produces_lexeme {
            let kind = lexer.final_states[acc as usize].ok_or_else(|| {
                format!("lexeme boundary out of non-accepting prefix at byte {i}")
            })?;
            out.push(Token {
                kind,
                start: tok_start,
                len: i - tok_start,
            });
            tok_start = i;
        }

        acc = cell.result_state;
    }

    if input.is_empty() {
        return Ok(out);
    }
    match lexer.final_states[acc as usize] {
        Some(kind) => {
            out.push(Token {
                kind,
                start: tok_start,
                len: input.len() - tok_start,
            });
            Ok(out)
        }
        None => Err("ended in non-accepting state (unterminated or rejected input?)".into()),
    }
}
