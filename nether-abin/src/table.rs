//! Song and sample table interpretation

use crate::chunk::{Chunk, ChunkType};
use crate::error::AbinError;

/// One entry of a song or sample table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableEntry {
    /// Address of a song or subroutine
    Pointer { address: u16 },
    /// Sample extent: start address and loop address
    Range { start: u16, end: u16 },
}

impl TableEntry {
    /// The address this entry points at (start of a range)
    pub fn address(&self) -> u16 {
        match *self {
            Self::Pointer { address } => address,
            Self::Range { start, .. } => start,
        }
    }

    /// Extent of a range entry; pointers have no length
    pub fn length(&self) -> u16 {
        match *self {
            Self::Pointer { .. } => 0,
            Self::Range { start, end } => end.saturating_sub(start),
        }
    }
}

/// A decoded song or sample table chunk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioTable {
    /// `SongTable` or `SampleTable`
    pub table_type: ChunkType,
    /// Where the table itself is loaded in SPC memory
    pub spc_address: u16,
    /// Index of the source chunk in file order
    pub source_chunk: usize,
    pub entries: Vec<TableEntry>,
    /// Odd final byte of a pointer table
    pub trailing: Option<u8>,
}

impl AudioTable {
    pub fn is_sample_table(&self) -> bool {
        self.table_type == ChunkType::SampleTable
    }

    /// Pointer addresses in table order
    pub fn pointers(&self) -> impl Iterator<Item = u16> + '_ {
        self.entries.iter().filter_map(|entry| match *entry {
            TableEntry::Pointer { address } => Some(address),
            TableEntry::Range { .. } => None,
        })
    }

    /// `(start, end)` pairs in table order
    pub fn ranges(&self) -> impl Iterator<Item = (u16, u16)> + '_ {
        self.entries.iter().filter_map(|entry| match *entry {
            TableEntry::Range { start, end } => Some((start, end)),
            TableEntry::Pointer { .. } => None,
        })
    }

    /// Serialized payload, identical to the chunk it was read from
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.entries.len() * 4 + 1);
        for entry in &self.entries {
            match *entry {
                TableEntry::Pointer { address } => out.extend_from_slice(&address.to_le_bytes()),
                TableEntry::Range { start, end } => {
                    out.extend_from_slice(&start.to_le_bytes());
                    out.extend_from_slice(&end.to_le_bytes());
                }
            }
        }
        out.extend(self.trailing);
        out
    }
}

/// Decode a table chunk's payload
///
/// Song tables hold one little-endian word per pointer. Sample tables hold
/// `(start, loop)` word pairs.
///
/// # Errors
/// * `AbinError::NotATable` - the chunk is not typed `SongTable`/`SampleTable`
/// * `AbinError::OddEntryCount` - a sample table is not whole pairs
/// * `AbinError::TruncatedStream` - the payload runs past the data
pub fn interpret_table(
    chunk: &Chunk,
    source_chunk: usize,
    data: &[u8],
) -> Result<AudioTable, AbinError> {
    let payload = chunk.payload(data)?;

    let (entries, trailing) = match chunk.chunk_type {
        ChunkType::SongTable => {
            let words = payload.chunks_exact(2);
            let trailing = words.remainder().first().copied();
            let entries = words
                .map(|w| TableEntry::Pointer {
                    address: u16::from_le_bytes([w[0], w[1]]),
                })
                .collect();
            (entries, trailing)
        }
        ChunkType::SampleTable => {
            if payload.len() % 4 != 0 {
                return Err(AbinError::OddEntryCount {
                    address: chunk.spc_address,
                    count: payload.len().div_ceil(2),
                });
            }
            let entries = payload
                .chunks_exact(4)
                .map(|p| TableEntry::Range {
                    start: u16::from_le_bytes([p[0], p[1]]),
                    end: u16::from_le_bytes([p[2], p[3]]),
                })
                .collect();
            (entries, None)
        }
        other => {
            return Err(AbinError::NotATable {
                address: chunk.spc_address,
                chunk_type: other,
            });
        }
    };

    Ok(AudioTable {
        table_type: chunk.chunk_type,
        spc_address: chunk.spc_address,
        source_chunk,
        entries,
        trailing,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table_chunk(chunk_type: ChunkType, payload: &[u8]) -> (Chunk, Vec<u8>) {
        let mut data = Vec::new();
        data.extend_from_slice(&(payload.len() as u16).to_le_bytes());
        data.extend_from_slice(&0x2F00u16.to_le_bytes());
        data.extend_from_slice(payload);
        let chunk = Chunk::new(0x2F00, 0, payload.len() as u16).classified(chunk_type);
        (chunk, data)
    }

    #[test]
    fn test_song_table_pointers() {
        let (chunk, data) = table_chunk(ChunkType::SongTable, &[0x00, 0x30, 0x40, 0x31, 0x00, 0x00]);
        let table = interpret_table(&chunk, 3, &data).unwrap();

        assert_eq!(table.spc_address, 0x2F00);
        assert_eq!(table.source_chunk, 3);
        assert_eq!(table.pointers().collect::<Vec<_>>(), vec![0x3000, 0x3140, 0x0000]);
        assert_eq!(table.trailing, None);
        assert_eq!(table.to_bytes(), &data[4..]);
    }

    #[test]
    fn test_song_table_keeps_trailing_byte() {
        let (chunk, data) = table_chunk(ChunkType::SongTable, &[0x00, 0x30, 0x7F]);
        let table = interpret_table(&chunk, 0, &data).unwrap();

        assert_eq!(table.entries.len(), 1);
        assert_eq!(table.trailing, Some(0x7F));
        assert_eq!(table.to_bytes(), vec![0x00, 0x30, 0x7F]);
    }

    #[test]
    fn test_sample_table_ranges() {
        let (chunk, data) = table_chunk(
            ChunkType::SampleTable,
            &[0x00, 0x40, 0x24, 0x40, 0x2D, 0x40, 0x2D, 0x40],
        );
        let table = interpret_table(&chunk, 0, &data).unwrap();

        assert!(table.is_sample_table());
        assert_eq!(
            table.entries,
            vec![
                TableEntry::Range { start: 0x4000, end: 0x4024 },
                TableEntry::Range { start: 0x402D, end: 0x402D },
            ]
        );
        assert_eq!(table.entries[0].length(), 0x24);
        assert_eq!(table.entries[1].length(), 0);
    }

    #[test]
    fn test_sample_table_odd_entry_count() {
        let (chunk, data) = table_chunk(ChunkType::SampleTable, &[0x00, 0x40, 0x24, 0x40, 0x2D, 0x40]);
        assert!(matches!(
            interpret_table(&chunk, 0, &data),
            Err(AbinError::OddEntryCount { address: 0x2F00, count: 3 })
        ));
    }

    #[test]
    fn test_not_a_table() {
        let (chunk, data) = table_chunk(ChunkType::SongData, &[0x00, 0x40]);
        assert!(matches!(
            interpret_table(&chunk, 0, &data),
            Err(AbinError::NotATable { chunk_type: ChunkType::SongData, .. })
        ));
    }

    #[test]
    fn test_range_length_saturates() {
        let entry = TableEntry::Range { start: 0x5000, end: 0x4000 };
        assert_eq!(entry.length(), 0);
        assert_eq!(entry.address(), 0x5000);
        assert_eq!(TableEntry::Pointer { address: 0x1234 }.length(), 0);
    }
}
