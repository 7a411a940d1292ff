//! Chunk records and the chunk reader
//!
//! An Audio BIN is a flat list of `{u16 length, u16 address, payload}` records
//! terminated by `{0x0000, 0x0400}`. The reader only slices the stream; chunk
//! roles are assigned later by [`crate::classify`].

use std::io::{Cursor, Read, Seek, SeekFrom};

use crate::error::AbinError;
use crate::{CHUNK_HEADER_SIZE, END_OF_DATA_ADDRESS};

/// Role of a chunk in the sound bank
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ChunkType {
    /// Not classified yet
    #[default]
    NotCalculated,
    /// Table of sample start/loop address pairs
    SampleTable,
    /// BRR sample data
    SampleData,
    /// Instrument parameter block
    InstrumentParameters,
    /// Table of song pointers
    SongTable,
    /// Sequence data for one or more songs
    SongData,
    /// Table-shaped chunk whose kind is not known yet
    AmbiguousTables,
}

impl ChunkType {
    pub fn is_table(self) -> bool {
        matches!(
            self,
            Self::SongTable | Self::SampleTable | Self::AmbiguousTables
        )
    }

    pub fn is_data(self) -> bool {
        matches!(self, Self::SongData | Self::SampleData)
    }

    /// The table kind that indexes this data kind
    pub fn table_counterpart(self) -> Option<Self> {
        match self {
            Self::SampleData => Some(Self::SampleTable),
            Self::SongData => Some(Self::SongTable),
            _ => None,
        }
    }
}

/// One `{length, address, payload}` record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunk {
    /// Where the payload is loaded in SPC memory
    pub spc_address: u16,
    /// Offset of the 4-byte chunk head in the file
    pub file_position: u64,
    /// Payload length in bytes
    pub length: u16,
    pub chunk_type: ChunkType,
}

impl Chunk {
    pub fn new(spc_address: u16, file_position: u64, length: u16) -> Self {
        Self {
            spc_address,
            file_position,
            length,
            chunk_type: ChunkType::NotCalculated,
        }
    }

    /// Same chunk with a new classification
    #[must_use]
    pub fn classified(self, chunk_type: ChunkType) -> Self {
        Self { chunk_type, ..self }
    }

    /// File offset of the first payload byte
    pub fn payload_start(&self) -> u64 {
        self.file_position + CHUNK_HEADER_SIZE as u64
    }

    /// One past the last SPC address covered by the payload
    pub fn spc_end(&self) -> u32 {
        self.spc_address as u32 + self.length as u32
    }

    /// Whether `address` lies inside this chunk's SPC range
    pub fn contains_address(&self, address: u16) -> bool {
        address >= self.spc_address && (address as u32) < self.spc_end()
    }

    /// The payload bytes within the source data
    pub fn payload<'a>(&self, data: &'a [u8]) -> Result<&'a [u8], AbinError> {
        let start = self.payload_start() as usize;
        data.get(start..start + self.length as usize)
            .ok_or(AbinError::TruncatedStream {
                offset: self.file_position,
            })
    }
}

/// Slice `data` into chunk records up to the end-of-data marker
///
/// The marker itself is never returned.
///
/// # Errors
/// * `AbinError::TruncatedStream` - a chunk head or payload runs past the end
pub fn read_chunks(data: &[u8]) -> Result<Vec<Chunk>, AbinError> {
    let mut cursor = Cursor::new(data);
    let mut chunks = Vec::new();

    loop {
        let file_position = cursor.position();
        let length = read_u16(&mut cursor).map_err(|_| truncated_at(file_position))?;
        let spc_address = read_u16(&mut cursor).map_err(|_| truncated_at(file_position))?;

        if length == 0 && spc_address == END_OF_DATA_ADDRESS {
            break;
        }

        let payload_end = cursor.position() + length as u64;
        if payload_end > data.len() as u64 {
            return Err(truncated_at(file_position));
        }

        tracing::trace!(
            "Chunk at 0x{:X}: ${:04X}, {} bytes",
            file_position,
            spc_address,
            length
        );
        chunks.push(Chunk::new(spc_address, file_position, length));
        cursor.seek(SeekFrom::Start(payload_end))?;
    }

    Ok(chunks)
}

fn truncated_at(offset: u64) -> AbinError {
    AbinError::TruncatedStream { offset }
}

/// Read a 16-bit little-endian integer
fn read_u16(cursor: &mut Cursor<&[u8]>) -> Result<u16, AbinError> {
    let mut buf = [0u8; 2];
    cursor
        .read_exact(&mut buf)
        .map_err(|_| AbinError::UnexpectedEndOfStream {
            offset: cursor.position(),
        })?;
    Ok(u16::from_le_bytes(buf))
}
