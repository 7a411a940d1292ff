//! Import pipeline: chunks, classification, ambiguity resolution, interpretation

use std::collections::BTreeMap;
use std::path::Path;

use crate::chunk::{Chunk, ChunkType, read_chunks};
use crate::classify::{classify, resolve_ambiguity};
use crate::error::AbinError;
use crate::model::{AudioBinData, AudioBinFile, Diagnostic};
use crate::table::{AudioTable, interpret_table};

/// Import an Audio BIN file from disk
///
/// The model is named after the file stem.
pub fn import_file(path: impl AsRef<Path>) -> Result<AudioBinFile, AbinError> {
    let path = path.as_ref();
    let data = std::fs::read(path)?;
    let name = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    import_bytes(name, &data)
}

/// Import an Audio BIN from memory
///
/// Chunk-local problems (empty chunks, unresolved tables, malformed sample
/// tables) are recorded in `diagnostics` and the chunk is left out of the model.
///
/// # Errors
/// * `AbinError::TruncatedStream` - the chunk stream is corrupt
pub fn import_bytes(file_name: impl Into<String>, data: &[u8]) -> Result<AudioBinFile, AbinError> {
    let mut file = AudioBinFile::new(file_name);
    let chunks = read_chunks(data)?;
    tracing::debug!("{}: {} chunks", file.file_name, chunks.len());

    // Pass 1: byte signatures
    let classified: Vec<Chunk> = chunks
        .iter()
        .enumerate()
        .map(|(index, chunk)| match classify(chunk, data) {
            Ok(chunk_type) => {
                tracing::debug!(
                    "Chunk {} at ${:04X} ({} bytes): {:?}",
                    index,
                    chunk.spc_address,
                    chunk.length,
                    chunk_type
                );
                chunk.classified(chunk_type)
            }
            Err(error) => {
                record(&mut file.diagnostics, index, chunk, error);
                *chunk
            }
        })
        .collect();

    // Pass 2: neighbours settle ambiguous tables
    let resolved: Vec<Chunk> = classified
        .iter()
        .enumerate()
        .map(|(index, chunk)| {
            if chunk.chunk_type != ChunkType::AmbiguousTables {
                return *chunk;
            }
            match resolve_ambiguity(chunk, &classified) {
                Some(chunk_type) => {
                    tracing::debug!(
                        "Ambiguous table at ${:04X} resolved to {:?}",
                        chunk.spc_address,
                        chunk_type
                    );
                    chunk.classified(chunk_type)
                }
                None => {
                    let error = AbinError::UnresolvedAmbiguity {
                        address: chunk.spc_address,
                    };
                    record(&mut file.diagnostics, index, chunk, error);
                    *chunk
                }
            }
        })
        .collect();

    // Pass 3: interpret in file order so data chunks see the tables before them
    for (index, chunk) in resolved.iter().enumerate() {
        match chunk.chunk_type {
            ChunkType::SongTable | ChunkType::SampleTable => {
                match interpret_table(chunk, index, data) {
                    Ok(table) => add_table(&mut file, table),
                    Err(error) => record(&mut file.diagnostics, index, chunk, error),
                }
            }
            ChunkType::SongData => {
                let payload = chunk.payload(data)?;
                let splits = song_splits(chunk, &file.song_tables);
                file.songs.extend(split_chunk(chunk, index, payload, splits));
            }
            ChunkType::SampleData => {
                let payload = chunk.payload(data)?;
                let splits = sample_splits(chunk, &file.sample_tables);
                file.samples.extend(split_chunk(chunk, index, payload, splits));
            }
            ChunkType::InstrumentParameters => {
                let payload = chunk.payload(data)?;
                file.instruments.push(AudioBinData {
                    spc_address: chunk.spc_address,
                    file_position: chunk.payload_start(),
                    data: payload.to_vec(),
                    is_default_item0: false,
                    loop_address: None,
                    source_chunk: index,
                });
            }
            ChunkType::NotCalculated | ChunkType::AmbiguousTables => {}
        }
    }

    // Stable, so pieces of one chunk keep their relative order
    file.songs.sort_by_key(|song| song.spc_address);
    file.samples.sort_by_key(|sample| sample.spc_address);

    file.chunks = resolved;
    tracing::debug!(
        "{}: {} songs, {} samples, {} song tables, {} sample tables",
        file.file_name,
        file.songs.len(),
        file.samples.len(),
        file.song_tables.len(),
        file.sample_tables.len()
    );
    Ok(file)
}

fn record(diagnostics: &mut Vec<Diagnostic>, index: usize, chunk: &Chunk, error: AbinError) {
    tracing::warn!("Chunk {} at ${:04X}: {}", index, chunk.spc_address, error);
    diagnostics.push(Diagnostic {
        chunk_index: index,
        spc_address: chunk.spc_address,
        error,
    });
}

fn add_table(file: &mut AudioBinFile, table: AudioTable) {
    let tables = if table.is_sample_table() {
        &mut file.sample_tables
    } else {
        &mut file.song_tables
    };

    let duplicate = tables
        .iter()
        .any(|t| t.spc_address == table.spc_address && t.entries == table.entries);
    if duplicate {
        tracing::debug!("Skipping duplicate table at ${:04X}", table.spc_address);
        return;
    }
    tables.push(table);
}

/// Song start addresses inside `chunk`, from tables read so far
fn song_splits(chunk: &Chunk, tables: &[AudioTable]) -> BTreeMap<u16, Option<u16>> {
    tables
        .iter()
        .flat_map(AudioTable::pointers)
        .filter(|&address| address != 0 && chunk.contains_address(address))
        .map(|address| (address, None))
        .collect()
}

/// Sample start addresses inside `chunk` with their loop addresses
fn sample_splits(chunk: &Chunk, tables: &[AudioTable]) -> BTreeMap<u16, Option<u16>> {
    let mut splits = BTreeMap::new();
    for (start, end) in tables.iter().flat_map(AudioTable::ranges) {
        if chunk.contains_address(start) {
            splits.entry(start).or_insert(Some(end));
        }
    }
    splits
}

/// Cut a data chunk at the given addresses so the pieces tile it exactly
fn split_chunk(
    chunk: &Chunk,
    index: usize,
    payload: &[u8],
    mut splits: BTreeMap<u16, Option<u16>>,
) -> Vec<AudioBinData> {
    if splits.is_empty() {
        tracing::debug!(
            "No table points into ${:04X}, using it as default item 0",
            chunk.spc_address
        );
        return vec![AudioBinData {
            spc_address: chunk.spc_address,
            file_position: chunk.payload_start(),
            data: payload.to_vec(),
            is_default_item0: true,
            loop_address: None,
            source_chunk: index,
        }];
    }

    splits.entry(chunk.spc_address).or_insert(None);

    let starts: Vec<(u16, Option<u16>)> = splits.into_iter().collect();
    starts
        .iter()
        .enumerate()
        .map(|(i, &(address, loop_address))| {
            let from = (address - chunk.spc_address) as usize;
            let to = starts
                .get(i + 1)
                .map_or(payload.len(), |&(next, _)| (next - chunk.spc_address) as usize);
            AudioBinData {
                spc_address: address,
                file_position: chunk.payload_start() + from as u64,
                data: payload[from..to].to_vec(),
                is_default_item0: false,
                loop_address,
                source_chunk: index,
            }
        })
        .collect()
}
