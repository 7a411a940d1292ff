//! Chunk classification heuristics
//!
//! Audio BIN chunks carry no type tag. The role of each chunk is inferred from
//! a handful of byte signatures observed in the sound driver's compiled output,
//! then table chunks that could go either way are settled by looking at which
//! data chunk follows them in SPC memory.

use std::ops::ControlFlow;

use crate::chunk::{Chunk, ChunkType};
use crate::error::AbinError;
use crate::{INSTRUMENT_SIGNATURE, SAMPLE_DATA_SIGNATURE, SONG_PROBE_OFFSETS};

/// Infer a chunk's role from its payload bytes
///
/// `data` is the whole source container; the payload is read at
/// `chunk.payload_start()`. The song probe bytes are read from the source at
/// fixed payload offsets even when they lie past the payload. A probe byte
/// past the end of the source counts as non-zero.
///
/// # Errors
/// * `AbinError::UnexpectedEndOfStream` - the payload is empty or runs past the data
pub fn classify(chunk: &Chunk, data: &[u8]) -> Result<ChunkType, AbinError> {
    let start = chunk.payload_start() as usize;
    let length = chunk.length as usize;

    if length == 0 {
        return Err(AbinError::UnexpectedEndOfStream {
            offset: chunk.payload_start(),
        });
    }

    if length >= 2 {
        let signature = byte_at(data, start)
            .zip(byte_at(data, start + 1))
            .map(|(b0, b1)| [b0, b1])
            .ok_or(AbinError::UnexpectedEndOfStream {
                offset: chunk.payload_start(),
            })?;

        if signature == SAMPLE_DATA_SIGNATURE {
            return Ok(ChunkType::SampleData);
        }
        if signature == INSTRUMENT_SIGNATURE {
            return Ok(ChunkType::InstrumentParameters);
        }
    }

    let last_offset = start + length - 1;
    let last = byte_at(data, last_offset).ok_or(AbinError::UnexpectedEndOfStream {
        offset: last_offset as u64,
    })?;

    if last != 0 {
        return Ok(ChunkType::AmbiguousTables);
    }
    if length % 2 == 1 {
        return Ok(ChunkType::SongData);
    }

    let probes_clear = SONG_PROBE_OFFSETS
        .iter()
        .all(|&offset| byte_at(data, start + offset) == Some(0));

    Ok(if probes_clear {
        ChunkType::SongData
    } else {
        ChunkType::AmbiguousTables
    })
}

fn byte_at(data: &[u8], offset: usize) -> Option<u8> {
    data.get(offset).copied()
}

/// Settle an ambiguous table by the data chunk that follows it in SPC memory
///
/// `chunks` is the classified chunk list; order does not matter, it is sorted
/// by address here. Returns the table counterpart of the first data chunk
/// above `chunk` (other tables in between are skipped). When `chunk` is the
/// highest table with no data above it, the nearest data chunk at or below its
/// address decides. `None` means nothing decides.
pub fn resolve_ambiguity(chunk: &Chunk, chunks: &[Chunk]) -> Option<ChunkType> {
    if chunk.chunk_type != ChunkType::AmbiguousTables {
        return None;
    }

    let mut by_address: Vec<&Chunk> = chunks.iter().collect();
    by_address.sort_by_key(|c| c.spc_address);

    let scan = by_address
        .into_iter()
        .filter(|c| c.file_position != chunk.file_position)
        .try_fold(None, |previous: Option<ChunkType>, other| {
            let kind = other.chunk_type;
            if other.spc_address <= chunk.spc_address {
                return ControlFlow::Continue(if kind.is_data() { Some(kind) } else { previous });
            }
            match kind.table_counterpart() {
                Some(table) => ControlFlow::Break(table),
                None => ControlFlow::Continue(previous),
            }
        });

    match scan {
        ControlFlow::Break(table) => Some(table),
        ControlFlow::Continue(previous) => previous.and_then(ChunkType::table_counterpart),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Wrap one payload as a container with a single chunk at file offset 0
    fn single(payload: &[u8]) -> (Chunk, Vec<u8>) {
        let mut data = Vec::new();
        data.extend_from_slice(&(payload.len() as u16).to_le_bytes());
        data.extend_from_slice(&0x3000u16.to_le_bytes());
        data.extend_from_slice(payload);
        data.extend_from_slice(&[0x00, 0x00, 0x00, 0x04]);
        (Chunk::new(0x3000, 0, payload.len() as u16), data)
    }

    fn classify_payload(payload: &[u8]) -> ChunkType {
        let (chunk, data) = single(payload);
        classify(&chunk, &data).unwrap()
    }

    #[test]
    fn test_sample_data_signature() {
        assert_eq!(classify_payload(&[0x02, 0x00, 0x55, 0x66]), ChunkType::SampleData);
    }

    #[test]
    fn test_instrument_signature() {
        assert_eq!(
            classify_payload(&[0x00, 0xFF, 0xE0, 0xB8, 0x02, 0x30]),
            ChunkType::InstrumentParameters
        );
    }

    #[test]
    fn test_nonzero_last_byte_is_ambiguous() {
        assert_eq!(classify_payload(&[0x00, 0x31, 0x40, 0x31]), ChunkType::AmbiguousTables);
    }

    #[test]
    fn test_odd_length_zero_tail_is_song() {
        assert_eq!(classify_payload(&[0xE7, 0x20, 0x00]), ChunkType::SongData);
    }

    #[test]
    fn test_even_length_probes() {
        let mut payload = vec![0x11u8; 16];
        payload[0x09] = 0;
        payload[0x0C] = 0;
        payload[15] = 0;
        assert_eq!(classify_payload(&payload), ChunkType::SongData);

        payload[0x0C] = 0x01;
        assert_eq!(classify_payload(&payload), ChunkType::AmbiguousTables);
    }

    #[test]
    fn test_short_even_chunk_probes_read_past_payload() {
        // Both probe offsets run off the end of the data
        let (chunk, data) = single(&[0x10, 0x00]);
        assert_eq!(data.len(), 10);
        assert_eq!(classify(&chunk, &data).unwrap(), ChunkType::AmbiguousTables);
    }

    #[test]
    fn test_one_byte_payload_skips_signatures() {
        assert_eq!(classify_payload(&[0x00]), ChunkType::SongData);
        assert_eq!(classify_payload(&[0x02]), ChunkType::AmbiguousTables);
    }

    #[test]
    fn test_empty_payload_fails() {
        let (chunk, data) = single(&[]);
        assert!(matches!(
            classify(&chunk, &data),
            Err(AbinError::UnexpectedEndOfStream { offset: 4 })
        ));
    }

    #[test]
    fn test_classify_is_repeatable() {
        let (chunk, data) = single(&[0x00, 0x31, 0x40, 0x31]);
        let first = classify(&chunk, &data).unwrap();
        let again = classify(&chunk.classified(first), &data).unwrap();
        assert_eq!(first, again);
    }

    fn typed(address: u16, position: u64, chunk_type: ChunkType) -> Chunk {
        Chunk::new(address, position, 16).classified(chunk_type)
    }

    #[test]
    fn test_resolve_by_following_data() {
        let table = typed(0x3000, 0, ChunkType::AmbiguousTables);
        let chunks = [
            table,
            typed(0x3100, 20, ChunkType::SongData),
            typed(0x2000, 40, ChunkType::SampleData),
        ];
        assert_eq!(resolve_ambiguity(&table, &chunks), Some(ChunkType::SongTable));
    }

    #[test]
    fn test_resolve_skips_stacked_tables() {
        let table = typed(0x3000, 0, ChunkType::AmbiguousTables);
        let chunks = [
            typed(0x5000, 60, ChunkType::SongData),
            typed(0x4000, 40, ChunkType::SampleData),
            typed(0x3050, 20, ChunkType::AmbiguousTables),
            table,
            typed(0x3040, 80, ChunkType::InstrumentParameters),
        ];
        assert_eq!(resolve_ambiguity(&table, &chunks), Some(ChunkType::SampleTable));
    }

    #[test]
    fn test_resolve_highest_falls_back_to_previous() {
        let table = typed(0x8000, 0, ChunkType::AmbiguousTables);
        let chunks = [
            typed(0x1000, 20, ChunkType::SongData),
            typed(0x2000, 40, ChunkType::SampleData),
            typed(0x9000, 60, ChunkType::SongTable),
            table,
        ];
        assert_eq!(resolve_ambiguity(&table, &chunks), Some(ChunkType::SampleTable));
    }

    #[test]
    fn test_resolve_without_data_fails() {
        let table = typed(0x3000, 0, ChunkType::AmbiguousTables);
        let chunks = [table, typed(0x4000, 20, ChunkType::AmbiguousTables)];
        assert_eq!(resolve_ambiguity(&table, &chunks), None);
    }

    #[test]
    fn test_resolve_ignores_non_ambiguous() {
        let table = typed(0x3000, 0, ChunkType::SongTable);
        let chunks = [table, typed(0x4000, 20, ChunkType::SampleData)];
        assert_eq!(resolve_ambiguity(&table, &chunks), None);
    }
}
