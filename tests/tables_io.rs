//! Round-trip tests for the JSON and compact-binary table formats.

use std::{env, fs, path::PathBuf, process};

use scanlex::lexer::{
    grammar::demo_grammar,
    tables::{
        ParallelLexer, StateIndex, build_tables, load_tables_bin_bytes, load_tables_json_bytes,
        save_tables_bin, save_tables_json,
    },
};

fn scratch_path(name: &str) -> PathBuf {
    env::temp_dir().join(format!("scanlex_{}_{name}", process::id()))
}

fn assert_tables_equal(a: &ParallelLexer, b: &ParallelLexer) {
    assert_eq!(a.initial_states, b.initial_states);
    assert_eq!(a.identity_state_index, b.identity_state_index);
    assert_eq!(a.final_states, b.final_states);

    let k = a.merge_table.states();
    assert_eq!(k, b.merge_table.states());
    for second in 0..k as StateIndex {
        for first in 0..k as StateIndex {
            assert_eq!(
                a.merge_table.get(first, second),
                b.merge_table.get(first, second),
                "merge cell ({first}, {second})"
            );
        }
    }
}

#[test]
fn json_round_trip() {
    let (dfa, _) = demo_grammar();
    let lexer = build_tables(&dfa);

    let path = scratch_path("tables.json");
    save_tables_json(&path, &lexer).expect("save failed");
    let data = fs::read(&path).expect("read failed");
    let _ = fs::remove_file(&path);

    let loaded = load_tables_json_bytes(&data).expect("load failed");
    assert_tables_equal(&lexer, &loaded);
}

#[test]
fn bin_round_trip() {
    let (dfa, _) = demo_grammar();
    let lexer = build_tables(&dfa);

    let path = scratch_path("tables.bin");
    save_tables_bin(&path, &lexer).expect("save failed");
    let data = fs::read(&path).expect("read failed");
    let _ = fs::remove_file(&path);

    let loaded = load_tables_bin_bytes(&data).expect("load failed");
    assert_tables_equal(&lexer, &loaded);
}

#[test]
fn bin_rejects_bad_magic() {
    let mut data = b"NOTMAGIC".to_vec();
    data.extend_from_slice(&[0u8; 8]);
    assert!(load_tables_bin_bytes(&data).is_err());
}

#[test]
fn bin_rejects_truncation() {
    let (dfa, _) = demo_grammar();
    let lexer = build_tables(&dfa);

    let path = scratch_path("tables_trunc.bin");
    save_tables_bin(&path, &lexer).expect("save failed");
    let data = fs::read(&path).expect("read failed");
    let _ = fs::remove_file(&path);

    assert!(load_tables_bin_bytes(&data[..data.len() / 2]).is_err());
}
