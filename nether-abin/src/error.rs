//! Error types for Audio BIN parsing and export

use std::io;

use crate::chunk::ChunkType;

/// Errors that can occur when importing or exporting an Audio BIN
#[derive(Debug, thiserror::Error)]
pub enum AbinError {
    /// A chunk header or payload runs past the end of the data
    #[error("Truncated stream: chunk at 0x{offset:X} runs past end of data")]
    TruncatedStream { offset: u64 },

    /// A payload byte needed for classification is missing
    #[error("Unexpected end of stream at 0x{offset:X}")]
    UnexpectedEndOfStream { offset: u64 },

    /// A sample table does not hold whole start/loop pairs
    #[error("Sample table at ${address:04X} has {count} words, not whole start/loop pairs")]
    OddEntryCount { address: u16, count: usize },

    /// Neither the chunk's bytes nor its neighbours identify the table kind
    #[error("Could not resolve ambiguous table at ${address:04X}")]
    UnresolvedAmbiguity { address: u16 },

    /// Table interpretation was requested for a non-table chunk
    #[error("Chunk at ${address:04X} is {chunk_type:?}, not a table")]
    NotATable { address: u16, chunk_type: ChunkType },

    /// A snapshot is smaller than a v0.30 `.SPC` file
    #[error("SPC file too short: {length} bytes")]
    SpcTooShort { length: usize },

    /// A snapshot does not start with the v0.30 header text
    #[error("Not an SPC v0.30 file (header {found:?})")]
    InvalidSpcHeader { found: String },

    /// Injected data would not fit in SPC sound RAM
    #[error("{length} bytes at ${address:04X} do not fit in SPC RAM")]
    SpcOutOfRange { address: u16, length: usize },

    /// Song index past the end of the song list
    #[error("No song {index} (bank has {count})")]
    NoSuchSong { index: usize, count: usize },

    /// IO error while reading or writing files
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}
