// src/bin/gen_lex_tables.rs
// Build parallel lexer tables for the demo grammar and write them to disk.
// Usage:
//   cargo run --bin gen_lex_tables                  # writes tables/lexer_tables.json
//   cargo run --bin gen_lex_tables -- out/path.bin  # extension selects the format

use std::{env, fs, io, path::Path};

use anyhow::{Context, Result};
use scanlex::lexer::{
    grammar::demo_grammar,
    tables::{build_tables, save_tables_bin, save_tables_json},
};

fn main() -> Result<()> {
    env_logger::init();

    let out = env::args()
        .nth(1)
        .unwrap_or_else(|| "tables/lexer_tables.json".to_string());
    let out_path = Path::new(&out);

    if let Some(parent) = out_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
    }

    let (dfa, tokens) = demo_grammar();
    println!(
        "[gen_lex_tables] building parallel tables for {} DFA states, {} token kinds…",
        dfa.num_states(),
        tokens.num_tokens()
    );
    let lexer = build_tables(&dfa);
    lexer.dump_sizes(&mut io::stdout())?;

    match out_path.extension().and_then(|e| e.to_str()) {
        Some("bin") => save_tables_bin(out_path, &lexer),
        _ => save_tables_json(out_path, &lexer),
    }
    .with_context(|| format!("failed to write {}", out_path.display()))?;

    println!("[gen_lex_tables] wrote {}", out_path.display());
    Ok(())
}
