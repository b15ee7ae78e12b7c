// src/dev/generator.rs
// Seeded generator of valid demo-grammar source for sweep and fuzz tests.

use rand::Rng;

const OPS: &[&str] = &["+", "-", "*", "=", "(", ")"];
const IDENT_FIRST: &[u8] = b"abcdefghijklmnopqrstuvwxyz_";
const IDENT_REST: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789_";

fn push_ident(rng: &mut impl Rng, out: &mut String) {
    out.push(IDENT_FIRST[rng.gen_range(0..IDENT_FIRST.len())] as char);
    for _ in 0..rng.gen_range(0..7) {
        out.push(IDENT_REST[rng.gen_range(0..IDENT_REST.len())] as char);
    }
}

fn push_int(rng: &mut impl Rng, out: &mut String) {
    for _ in 0..rng.gen_range(1..8) {
        out.push((b'0' + rng.gen_range(0..10) as u8) as char);
    }
}

/// Produces at least `target_len` bytes of source the demo grammar accepts,
/// always ending with a trailer that closes the final token. Comments are
/// emitted as complete units so a bare '/' never opens one by accident.
pub fn gen_valid_source(rng: &mut impl Rng, target_len: usize) -> String {
    let mut out = String::new();
    while out.len() < target_len {
        match rng.gen_range(0..10) {
            0..=2 => push_ident(rng, &mut out),
            3..=4 => push_int(rng, &mut out),
            5 => out.push_str(OPS[rng.gen_range(0..OPS.len())]),
            6 => out.push(' '),
            7 => out.push('\n'),
            8 => {
                out.push_str("// ");
                push_ident(rng, &mut out);
                out.push('\n');
            }
            _ => {
                out.push_str("/* ");
                push_int(rng, &mut out);
                out.push_str(" */");
            }
        }
        out.push(' ');
    }
    out.push('x');
    out
}
