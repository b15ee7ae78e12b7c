// src/lexer/tables/io.rs
use std::{
    io::{BufWriter, Write},
    time::Instant,
};

use log::info;
use serde::{Deserialize, Serialize};
use serde_with::serde_as;

use super::{
    MergeTable, ParallelLexer, StateIndex, Transition,
    tokens::{INVALID_LEXEME, TokenId},
};

// A merge cell's produces_lexeme always equals the flag of its result state
// (the identity shortcut makes that hold on identity rows too), so both
// formats store one flag per state and rebuild the cells on load.

// -------------------- JSON (de)serialization --------------------

#[serde_as]
#[derive(Serialize, Deserialize)]
struct TablesDisk {
    #[serde_as(as = "[_; 256]")]
    initial_state: [u32; 256],
    #[serde_as(as = "[_; 256]")]
    initial_produces: [u32; 256],
    merge: Vec<u32>,          // k*k, offset first + second * k
    produces_on_start: Vec<u32>, // k -> 0/1
    final_states: Vec<u32>,   // k -> TokenId or INVALID_LEXEME
    k: u32,
    identity: u32,
}

impl From<&ParallelLexer> for TablesDisk {
    fn from(lexer: &ParallelLexer) -> Self {
        let k = lexer.merge_table.states();

        let mut initial_state = [0u32; 256];
        let mut initial_produces = [0u32; 256];
        for (sym, t) in lexer.initial_states.iter().enumerate() {
            initial_state[sym] = t.result_state;
            initial_produces[sym] = t.produces_lexeme as u32;
        }

        let mut merge = Vec::with_capacity(k * k);
        for second in 0..k {
            for first in 0..k {
                merge.push(lexer.merge_table.get(first as StateIndex, second as StateIndex).result_state);
            }
        }

        // The identity row passes every state through, so its cells carry
        // each state's own START flag.
        let produces_on_start = (0..k)
            .map(|s| {
                lexer
                    .merge_table
                    .get(lexer.identity_state_index, s as StateIndex)
                    .produces_lexeme as u32
            })
            .collect();

        let final_states = lexer
            .final_states
            .iter()
            .map(|lexeme| lexeme.map_or(INVALID_LEXEME, TokenId::as_u32))
            .collect();

        Self {
            initial_state,
            initial_produces,
            merge,
            produces_on_start,
            final_states,
            k: k as u32,
            identity: lexer.identity_state_index,
        }
    }
}

impl TablesDisk {
    fn into_tables(self) -> Result<ParallelLexer, String> {
        let k = self.k as usize;
        if self.merge.len() != k * k {
            return Err(format!("merge table has {} cells, expected {}", self.merge.len(), k * k));
        }
        if self.produces_on_start.len() != k || self.final_states.len() != k {
            return Err("per-state table length does not match k".into());
        }
        if (self.identity as usize) >= k {
            return Err(format!("identity index {} out of range", self.identity));
        }

        let mut merge_table = MergeTable::new();
        merge_table.resize(k);
        for second in 0..k {
            for first in 0..k {
                let id = self.merge[first + second * k];
                if (id as usize) >= k {
                    return Err(format!("merge cell ({first}, {second}) -> {id} out of range"));
                }
                merge_table.set(
                    first as StateIndex,
                    second as StateIndex,
                    Transition::new(id, self.produces_on_start[id as usize] != 0),
                );
            }
        }

        let initial_states = self
            .initial_state
            .iter()
            .zip(self.initial_produces.iter())
            .map(|(&id, &produces)| Transition::new(id, produces != 0))
            .collect();

        let final_states = self
            .final_states
            .into_iter()
            .map(|raw| (raw != INVALID_LEXEME).then(|| TokenId::from_u32(raw)))
            .collect();

        Ok(ParallelLexer {
            initial_states,
            merge_table,
            identity_state_index: self.identity,
            final_states,
        })
    }
}

pub fn save_tables_json(path: &std::path::Path, lexer: &ParallelLexer) -> std::io::Result<()> {
    // Stream to disk to avoid giant intermediate strings.
    let f = std::fs::File::create(path)?;
    let mut w = BufWriter::new(f);
    serde_json::to_writer(&mut w, &TablesDisk::from(lexer))?;
    w.flush()
}

pub fn load_tables_json_bytes(data: &[u8]) -> Result<ParallelLexer, String> {
    serde_json::from_slice::<TablesDisk>(data)
        .map_err(|e| format!("Failed to parse tables JSON: {e}"))
        .and_then(TablesDisk::into_tables)
}

// -------------------- Compact binary (u16 packing) --------------------

const BIN_MAGIC: &[u8; 8] = b"PSLXTB01";
const INVALID_LEXEME_U16: u16 = 0xFFFF;

fn pack_u16(id: u32, what: &str) -> std::io::Result<u16> {
    u16::try_from(id).map_err(|_| {
        std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("{what} id {id} > u16::MAX; cannot pack"),
        )
    })
}

pub fn save_tables_bin(path: &std::path::Path, lexer: &ParallelLexer) -> std::io::Result<()> {
    let instant = Instant::now();
    let k = lexer.merge_table.states();
    if k > u16::MAX as usize {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("k={k} exceeds u16::MAX; cannot pack to u16"),
        ));
    }

    let f = std::fs::File::create(path)?;

    // header (8 + 4 + 4) + initial ids (256*2) + initial bits (32)
    // + merge (k*k*2) + produces bits ((k+7)/8) + final states (k*2)
    let size_merge = k
        .checked_mul(k)
        .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::InvalidData, "k*k overflow"))?
        * 2;
    let total_len = (8 + 4 + 4) + 256 * 2 + 32 + size_merge + (k + 7) / 8 + k * 2;

    // Pre-allocate (best effort).
    let _ = f.set_len(total_len as u64);

    let mut w = BufWriter::new(f);

    // Header
    w.write_all(BIN_MAGIC)?;
    w.write_all(&(k as u32).to_le_bytes())?;
    w.write_all(&lexer.identity_state_index.to_le_bytes())?;

    // initial states: 256 x u16 ids, then 256 produce bits
    {
        let mut buf = [0u8; 256 * 2];
        let mut bits = [0u8; 32];
        for (sym, t) in lexer.initial_states.iter().enumerate() {
            let v = pack_u16(t.result_state, "initial state")?;
            buf[sym * 2..sym * 2 + 2].copy_from_slice(&v.to_le_bytes());
            if t.produces_lexeme {
                bits[sym / 8] |= 1 << (sym % 8);
            }
        }
        w.write_all(&buf)?;
        w.write_all(&bits)?;
    }

    // merge: k*k x u16 — stream row by row to bound the buffer
    {
        let mut bytes = vec![0u8; k * 2];
        for second in 0..k {
            for first in 0..k {
                let cell = lexer.merge_table.get(first as StateIndex, second as StateIndex);
                let v = pack_u16(cell.result_state, "merge")?;
                bytes[first * 2..first * 2 + 2].copy_from_slice(&v.to_le_bytes());
            }
            w.write_all(&bytes)?;
        }
    }

    // produces_on_start: k bits packed into bytes, read off the identity row
    {
        let mut bits = vec![0u8; (k + 7) / 8];
        for s in 0..k {
            let produces = lexer
                .merge_table
                .get(lexer.identity_state_index, s as StateIndex)
                .produces_lexeme;
            if produces {
                bits[s / 8] |= 1 << (s % 8);
            }
        }
        w.write_all(&bits)?;
    }

    // final states: k x u16
    {
        let mut bytes = vec![0u8; k * 2];
        for (s, lexeme) in lexer.final_states.iter().enumerate() {
            let v = match lexeme {
                Some(id) => pack_u16(id.as_u32(), "final state")?,
                None => INVALID_LEXEME_U16,
            };
            bytes[s * 2..s * 2 + 2].copy_from_slice(&v.to_le_bytes());
        }
        w.write_all(&bytes)?;
    }

    let flush = w.flush();
    info!(
        "[tables] saved tables to {} in {} ms",
        path.display(),
        instant.elapsed().as_millis()
    );
    flush
}

pub fn load_tables_bin_bytes(mut data: &[u8]) -> Result<ParallelLexer, String> {
    if data.len() < 8 + 4 + 4 {
        return Err("bin too short".into());
    }
    let mut magic = [0u8; 8];
    magic.copy_from_slice(&data[..8]);
    if &magic != BIN_MAGIC {
        return Err("bad magic in tables .bin".into());
    }
    data = &data[8..];

    let read_u32 = |buf: &mut &[u8]| -> Result<u32, String> {
        if buf.len() < 4 {
            return Err("truncated u32".into());
        }
        let mut le = [0u8; 4];
        le.copy_from_slice(&buf[..4]);
        *buf = &buf[4..];
        Ok(u32::from_le_bytes(le))
    };
    let read_u16 = |buf: &mut &[u8]| -> Result<u16, String> {
        if buf.len() < 2 {
            return Err("truncated u16".into());
        }
        let mut le = [0u8; 2];
        le.copy_from_slice(&buf[..2]);
        *buf = &buf[2..];
        Ok(u16::from_le_bytes(le))
    };
    let read_bits = |buf: &mut &[u8], count: usize| -> Result<Vec<bool>, String> {
        let bytes = (count + 7) / 8;
        if buf.len() < bytes {
            return Err("truncated bit table".into());
        }
        let (bit_slice, rest) = buf.split_at(bytes);
        *buf = rest;
        Ok((0..count).map(|i| bit_slice[i / 8] >> (i % 8) & 1 != 0).collect())
    };

    let k = read_u32(&mut data)? as usize;
    let identity = read_u32(&mut data)?;
    if identity as usize >= k {
        return Err(format!("identity index {identity} out of range"));
    }

    // initial states
    let mut initial_ids = [0u32; 256];
    for id in initial_ids.iter_mut() {
        *id = read_u16(&mut data)? as u32;
    }
    let initial_bits = read_bits(&mut data, 256)?;

    // merge k*k
    let kk = k.checked_mul(k).ok_or("k*k overflow")?;
    let mut merge_ids = Vec::with_capacity(kk);
    for _ in 0..kk {
        let id = read_u16(&mut data)? as u32;
        if id as usize >= k {
            return Err(format!("merge cell id {id} out of range"));
        }
        merge_ids.push(id);
    }

    let produces_on_start = read_bits(&mut data, k)?;

    let mut final_states = Vec::with_capacity(k);
    for _ in 0..k {
        let v = read_u16(&mut data)?;
        final_states.push((v != INVALID_LEXEME_U16).then(|| TokenId::from_u32(v as u32)));
    }

    let mut merge_table = MergeTable::new();
    merge_table.resize(k);
    for second in 0..k {
        for first in 0..k {
            let id = merge_ids[first + second * k];
            merge_table.set(
                first as StateIndex,
                second as StateIndex,
                Transition::new(id, produces_on_start[id as usize]),
            );
        }
    }

    let initial_states = initial_ids
        .iter()
        .zip(initial_bits.iter())
        .map(|(&id, &produces)| Transition::new(id, produces))
        .collect();

    Ok(ParallelLexer {
        initial_states,
        merge_table,
        identity_state_index: identity,
        final_states,
    })
}
