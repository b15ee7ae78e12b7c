// src/lexer/grammar.rs
// Hand-built demo grammar: identifiers, integers, whitespace, punctuation,
// line and block comments. Streaming form: accepting states borrow Start's
// edges as lexeme-completing edges wherever they have none of their own.

use super::tables::{
    StateIndex,
    dfa::Dfa,
    tokens::TokenMap,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum S {
    Start,
    Ident,
    Int,
    White,

    MaybeSlash,   // accepting as a bare slash; '/' or '*' continues into comments
    LineComment,  // consumes until '\n'
    BlockComment, // inside /* ... */
    BlockStar,    // saw '*' inside a block comment
    BlockDone,    // accepting; completes on the next character

    AfterLParen,
    AfterRParen,
    AfterPlus,
    AfterMinus,
    AfterStar,
    AfterAssign,
}

const N_STATES: usize = 15;

impl S {
    fn idx(self) -> StateIndex {
        self as StateIndex
    }
}

const ALL_STATES: &[S] = &[
    S::Start,
    S::Ident,
    S::Int,
    S::White,
    S::MaybeSlash,
    S::LineComment,
    S::BlockComment,
    S::BlockStar,
    S::BlockDone,
    S::AfterLParen,
    S::AfterRParen,
    S::AfterPlus,
    S::AfterMinus,
    S::AfterStar,
    S::AfterAssign,
];

fn token_name(s: S) -> Option<&'static str> {
    use S::*;
    match s {
        Ident => Some("ident"),
        Int => Some("int"),
        White => Some("white"),
        MaybeSlash => Some("slash"),
        LineComment => Some("line_comment"),
        BlockDone => Some("block_comment"),
        AfterLParen => Some("lparen"),
        AfterRParen => Some("rparen"),
        AfterPlus => Some("plus"),
        AfterMinus => Some("minus"),
        AfterStar => Some("star"),
        AfterAssign => Some("assign"),
        _ => None,
    }
}

fn is_alpha(b: u8) -> bool {
    matches!(b, b'a'..=b'z' | b'A'..=b'Z' | b'_')
}
fn is_digit(b: u8) -> bool {
    b.is_ascii_digit()
}
fn is_alnum(b: u8) -> bool {
    is_alpha(b) || is_digit(b)
}
fn is_white(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\r' | b'\n')
}

type Edges = [[Option<S>; 256]; N_STATES];

fn set(edges: &mut Edges, from: S, bytes: &[u8], to: S) {
    for &b in bytes {
        edges[from.idx() as usize][b as usize] = Some(to);
    }
}

fn set_all_except(edges: &mut Edges, from: S, except: &[u8], to: S) {
    let mut skip = [false; 256];
    for &e in except {
        skip[e as usize] = true;
    }
    for b in 0usize..=255 {
        if !skip[b] {
            edges[from.idx() as usize][b] = Some(to);
        }
    }
}

/// Builds the demo DFA and its token registry.
pub fn demo_grammar() -> (Dfa, TokenMap) {
    let mut edges: Edges = [[None; 256]; N_STATES];

    // Start
    for b in 0u8..=255 {
        let to = if is_alpha(b) {
            Some(S::Ident)
        } else if is_digit(b) {
            Some(S::Int)
        } else if is_white(b) {
            Some(S::White)
        } else {
            match b {
                b'(' => Some(S::AfterLParen),
                b')' => Some(S::AfterRParen),
                b'+' => Some(S::AfterPlus),
                b'-' => Some(S::AfterMinus),
                b'*' => Some(S::AfterStar),
                b'=' => Some(S::AfterAssign),
                b'/' => Some(S::MaybeSlash),
                _ => None,
            }
        };
        edges[S::Start.idx() as usize][b as usize] = to;
    }

    // Ident: stay on [A-Za-z0-9_]
    for b in 0u8..=255 {
        if is_alnum(b) {
            edges[S::Ident.idx() as usize][b as usize] = Some(S::Ident);
        }
    }

    // Int
    for b in b'0'..=b'9' {
        edges[S::Int.idx() as usize][b as usize] = Some(S::Int);
    }

    // Whitespace
    for &b in b" \t\r\n" {
        edges[S::White.idx() as usize][b as usize] = Some(S::White);
    }

    // Slash / comments
    set(&mut edges, S::MaybeSlash, b"/", S::LineComment);
    set(&mut edges, S::MaybeSlash, b"*", S::BlockComment);

    // LineComment: consume until '\n'; the '\n' edge comes from the
    // streaming transform so leaving the comment completes it
    set_all_except(&mut edges, S::LineComment, b"\n", S::LineComment);

    // BlockComment
    set_all_except(&mut edges, S::BlockComment, &[], S::BlockComment);
    set(&mut edges, S::BlockComment, b"*", S::BlockStar);

    // BlockStar
    set(&mut edges, S::BlockStar, b"*", S::BlockStar);
    set(&mut edges, S::BlockStar, b"/", S::BlockDone);
    set_all_except(&mut edges, S::BlockStar, b"*/", S::BlockComment);

    // Single-char acceptors have no explicit edges; the streaming transform
    // below fills them in.

    let mut tokens = TokenMap::new();
    let mut dfa = Dfa::new(N_STATES);

    // Base edges never complete a lexeme.
    for s in ALL_STATES {
        for b in 0u8..=255 {
            if let Some(to) = edges[s.idx() as usize][b as usize] {
                dfa.add_transition(s.idx(), b, to.idx(), false);
            }
        }
    }

    // Streaming transform: accepting states take Start's edges, marked as
    // lexeme-completing, wherever they have no explicit edge.
    for s in ALL_STATES {
        let Some(name) = token_name(*s) else { continue };
        dfa.set_lexeme(s.idx(), tokens.insert(name));
        for b in 0u8..=255 {
            if edges[s.idx() as usize][b as usize].is_some() {
                continue;
            }
            if let Some(to) = edges[S::Start.idx() as usize][b as usize] {
                dfa.add_transition(s.idx(), b, to.idx(), true);
            }
        }
    }

    (dfa, tokens)
}
