//! Nether-ABIN: Audio BIN sound bank parser and assembler exporter
//!
//! An Audio BIN is the compiled sound bank uploaded to the SPC700 sound
//! co-processor: song tables, sequence data, sample tables, BRR sample data and
//! instrument parameters, each in its own chunk. Chunks carry no type tag, so
//! this crate infers them from byte signatures and from where they land in SPC
//! memory relative to each other.
//!
//! # Container Format
//!
//! ```text
//! repeat:
//!   u16 length      (little-endian)
//!   u16 spc_address (little-endian)
//!   u8  payload[length]
//! end:  length = 0x0000, spc_address = 0x0400
//! ```
//!
//! # Pipeline
//!
//! 1. [`read_chunks`] slices the stream
//! 2. [`classify`] assigns each chunk a [`ChunkType`] from its bytes
//! 3. [`resolve_ambiguity`] settles table chunks that could be either kind
//! 4. [`interpret_table`] decodes tables; data chunks are split at table addresses
//!
//! [`import_bytes`] runs all of it and returns an [`AudioBinFile`].
//! [`export`] produces assembler source that rebuilds the container.
//! [`inject_song`] places one song into an `.SPC` snapshot for emulator playback.
//!
//! # Usage
//!
//! ```ignore
//! use nether_abin::{import_file, export_to_directory, ExportOptions};
//!
//! let bank = import_file("SPC_1.BIN").unwrap();
//! for diagnostic in &bank.diagnostics {
//!     eprintln!("{}", diagnostic);
//! }
//! export_to_directory("out", &bank, &ExportOptions::default()).unwrap();
//! ```

mod chunk;
mod classify;
mod error;
mod export;
mod import;
mod model;
mod spc;
mod table;
mod writer;

pub use chunk::{Chunk, ChunkType, read_chunks};
pub use classify::{classify, resolve_ambiguity};
pub use error::AbinError;
pub use export::{
    AsmExport, ExportDescriptor, ExportOptions, ExportedBinary, asm_file_name, export,
    export_to_directory, instrument_file_name, sample_file_name, song_file_name, song_label,
};
pub use import::{import_bytes, import_file};
pub use model::{AudioBinData, AudioBinFile, ChunkContent, Diagnostic, Section};
pub use spc::{
    DEFAULT_DSP_REGISTERS, Id666, SONG_LOOP_POINTER_ADDRESS, SONG_TABLE_MARKER,
    SONG_TABLE_POINTER_ADDRESS, SPC_FILE_LENGTH, SPC_HEADER_TEXT, SpcFile, SpcRegisters,
    inject_song, parse_spc, read_spc_file, write_spc_file,
};
pub use table::{AudioTable, TableEntry, interpret_table};
pub use writer::{write_container, write_container_file};

// =============================================================================
// Constants
// =============================================================================

/// Size of the `{length, address}` head before every payload
pub const CHUNK_HEADER_SIZE: usize = 4;

/// Address field of the end-of-data marker (its length field is zero)
pub const END_OF_DATA_ADDRESS: u16 = 0x0400;

/// First two payload bytes of a BRR sample data chunk
pub const SAMPLE_DATA_SIGNATURE: [u8; 2] = [0x02, 0x00];

/// First two payload bytes of an instrument parameter chunk
pub const INSTRUMENT_SIGNATURE: [u8; 2] = [0x00, 0xFF];

/// Payload offsets that must be zero for an even-length chunk to be song data
pub const SONG_PROBE_OFFSETS: [usize; 2] = [0x09, 0x0C];

/// Default comment column in exported assembler source
pub const DEFAULT_PAD_WIDTH: usize = 50;
