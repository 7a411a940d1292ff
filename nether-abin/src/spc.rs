//! SPC v0.30 snapshots and song injection
//!
//! An `.SPC` file is a full SPC700 state dump: CPU registers, an ID666 text
//! tag, the 64 KiB sound RAM, the 128 DSP registers and the 64-byte extra RAM.
//! [`inject_song`] places one song of an Audio BIN (plus the song table that
//! points at it) into such a snapshot so an emulator can play it.
//!
//! # Layout
//!
//! ```text
//! 0x00000  33  header text "SNES-SPC700 Sound File Data v0.30"
//! 0x00021   2  26, 26
//! 0x00023   1  26 = ID666 tag present, 27 = absent
//! 0x00024   1  minor version
//! 0x00025   7  PC (u16), A, X, Y, PSW, SP
//! 0x0002E 163  ID666 tag (text format)
//! 0x00100 64K  sound RAM
//! 0x10100 128  DSP registers
//! 0x101C0  64  extra RAM
//! ```

use std::path::Path;

use crate::error::AbinError;
use crate::model::AudioBinFile;
use crate::table::TableEntry;

// =============================================================================
// Constants
// =============================================================================

/// Header text every v0.30 snapshot starts with
pub const SPC_HEADER_TEXT: &str = "SNES-SPC700 Sound File Data v0.30";

/// Size of a snapshot without extended ID666 data
pub const SPC_FILE_LENGTH: usize = EXTRA_RAM_OFFSET + SPC_EXTRA_RAM_SIZE;

pub const SPC_RAM_SIZE: usize = 0x10000;
pub const SPC_DSP_REGISTER_COUNT: usize = 128;
pub const SPC_EXTRA_RAM_SIZE: usize = 64;

/// Byte written just before an injected song table
pub const SONG_TABLE_MARKER: u8 = 0x83;

/// Driver variable holding the address of the active song table (minus 2)
pub const SONG_TABLE_POINTER_ADDRESS: usize = 0x0871;

/// Driver variable holding the song's loop pointer
pub const SONG_LOOP_POINTER_ADDRESS: usize = 0x0040;

/// DSP register file the sound driver leaves behind after boot
pub const DEFAULT_DSP_REGISTERS: [u8; SPC_DSP_REGISTER_COUNT] = [
    0x29, 0x29, 0xF7, 0x02, 0x1A, 0xFF, 0xE0, 0xB8, 0x00, 0x00, 0x00, 0x00, 0x60, 0x32, 0x00, 0x34,
    0x29, 0x29, 0xBC, 0x02, 0x1A, 0xFF, 0xE0, 0xB8, 0x00, 0x00, 0x00, 0x00, 0x60, 0x00, 0x00, 0x33,
    0x0D, 0x0D, 0x4F, 0x1A, 0x25, 0xFF, 0xE0, 0xB8, 0x00, 0x00, 0x00, 0x00, 0x32, 0x00, 0x00, 0x00,
    0x06, 0x06, 0x93, 0x0B, 0x25, 0xFF, 0xE0, 0xB8, 0x00, 0x00, 0x00, 0x00, 0x32, 0x00, 0x00, 0xD9,
    0x03, 0x03, 0xE2, 0x0F, 0x17, 0xFF, 0xE0, 0xB8, 0x00, 0x00, 0x00, 0x00, 0x05, 0x3F, 0x00, 0xE5,
    0x1F, 0x1F, 0x93, 0x0B, 0x25, 0xFF, 0xE0, 0xB8, 0x00, 0x00, 0x00, 0x00, 0x00, 0x3C, 0x00, 0x01,
    0x00, 0xC8, 0xD0, 0xCB, 0x06, 0xFA, 0x08, 0xA5, 0x00, 0x00, 0x00, 0x00, 0x00, 0x2C, 0x00, 0xFC,
    0x00, 0x00, 0xAD, 0x47, 0x00, 0xFF, 0xE0, 0xB8, 0x00, 0x00, 0x00, 0x00, 0x02, 0x02, 0x00, 0xEB,
];

const HEADER_LEN: usize = 33;
const TAG_MARKER_OFFSET: usize = 0x21;
const ID666_FLAG_OFFSET: usize = 0x23;
const MINOR_VERSION_OFFSET: usize = 0x24;
const PC_OFFSET: usize = 0x25;
const A_OFFSET: usize = 0x27;
const X_OFFSET: usize = 0x28;
const Y_OFFSET: usize = 0x29;
const PSW_OFFSET: usize = 0x2A;
const SP_OFFSET: usize = 0x2B;

const SONG_TITLE: (usize, usize) = (0x2E, 32);
const GAME_TITLE: (usize, usize) = (0x4E, 32);
const DUMPER_NAME: (usize, usize) = (0x6E, 16);
const COMMENTS: (usize, usize) = (0x7E, 32);
const DUMP_DATE: (usize, usize) = (0x9E, 11);
const FADE_OUT_SECONDS: (usize, usize) = (0xA9, 3);
const FADE_IN_MILLIS: (usize, usize) = (0xAC, 5);
const ARTIST: (usize, usize) = (0xB1, 32);
const CHANNEL_DISABLES_OFFSET: usize = 0xD1;
const EMULATOR_OFFSET: usize = 0xD2;

const RAM_OFFSET: usize = 0x100;
const DSP_OFFSET: usize = 0x10100;
const EXTRA_RAM_OFFSET: usize = 0x101C0;

const ID666_PRESENT: u8 = 26;
const ID666_ABSENT: u8 = 27;

// =============================================================================
// Snapshot
// =============================================================================

/// SPC700 CPU registers at snapshot time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SpcRegisters {
    pub pc: u16,
    pub a: u8,
    pub x: u8,
    pub y: u8,
    pub psw: u8,
    pub sp: u8,
}

/// ID666 tag, text format
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Id666 {
    pub song_title: String,
    pub game_title: String,
    pub dumper_name: String,
    pub comments: String,
    /// Free-form date text, usually `MM/DD/YYYY`
    pub dump_date: String,
    /// Seconds to play before fading out (0-999)
    pub fade_out_seconds: u32,
    /// Fade length in milliseconds (0-99999)
    pub fade_in_millis: u32,
    pub artist: String,
    pub default_channel_disables: u8,
    pub emulator: u8,
}

impl Default for Id666 {
    fn default() -> Self {
        Self {
            song_title: "Untitled".to_string(),
            game_title: "Unknown".to_string(),
            dumper_name: "No one".to_string(),
            comments: String::new(),
            dump_date: String::new(),
            fade_out_seconds: 0,
            fade_in_millis: 0,
            artist: "Unknown".to_string(),
            default_channel_disables: 0,
            emulator: 0,
        }
    }
}

/// A parsed `.SPC` snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpcFile {
    pub has_id666: bool,
    pub minor_version: u8,
    pub registers: SpcRegisters,
    pub tag: Id666,
    /// 64 KiB of sound RAM
    pub ram: Vec<u8>,
    pub dsp_registers: [u8; SPC_DSP_REGISTER_COUNT],
    pub extra_ram: [u8; SPC_EXTRA_RAM_SIZE],
}

impl Default for SpcFile {
    fn default() -> Self {
        Self {
            has_id666: true,
            minor_version: 30,
            registers: SpcRegisters::default(),
            tag: Id666::default(),
            ram: vec![0; SPC_RAM_SIZE],
            dsp_registers: [0; SPC_DSP_REGISTER_COUNT],
            extra_ram: [0; SPC_EXTRA_RAM_SIZE],
        }
    }
}

impl SpcFile {
    /// Serialize to a v0.30 snapshot of exactly [`SPC_FILE_LENGTH`] bytes
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = vec![0u8; SPC_FILE_LENGTH];

        write_string(&mut out, (0, HEADER_LEN), SPC_HEADER_TEXT);
        out[TAG_MARKER_OFFSET] = 26;
        out[TAG_MARKER_OFFSET + 1] = 26;
        out[ID666_FLAG_OFFSET] = if self.has_id666 {
            ID666_PRESENT
        } else {
            ID666_ABSENT
        };
        out[MINOR_VERSION_OFFSET] = self.minor_version;

        let regs = &self.registers;
        out[PC_OFFSET..PC_OFFSET + 2].copy_from_slice(&regs.pc.to_le_bytes());
        out[A_OFFSET] = regs.a;
        out[X_OFFSET] = regs.x;
        out[Y_OFFSET] = regs.y;
        out[PSW_OFFSET] = regs.psw;
        out[SP_OFFSET] = regs.sp;

        let tag = &self.tag;
        write_string(&mut out, SONG_TITLE, &tag.song_title);
        write_string(&mut out, GAME_TITLE, &tag.game_title);
        write_string(&mut out, DUMPER_NAME, &tag.dumper_name);
        write_string(&mut out, COMMENTS, &tag.comments);
        write_string(&mut out, DUMP_DATE, &tag.dump_date);
        write_string(&mut out, FADE_OUT_SECONDS, &tag.fade_out_seconds.min(999).to_string());
        write_string(&mut out, FADE_IN_MILLIS, &tag.fade_in_millis.min(99_999).to_string());
        write_string(&mut out, ARTIST, &tag.artist);
        out[CHANNEL_DISABLES_OFFSET] = tag.default_channel_disables;
        out[EMULATOR_OFFSET] = tag.emulator;

        let ram_len = self.ram.len().min(SPC_RAM_SIZE);
        out[RAM_OFFSET..RAM_OFFSET + ram_len].copy_from_slice(&self.ram[..ram_len]);
        out[DSP_OFFSET..DSP_OFFSET + SPC_DSP_REGISTER_COUNT].copy_from_slice(&self.dsp_registers);
        out[EXTRA_RAM_OFFSET..EXTRA_RAM_OFFSET + SPC_EXTRA_RAM_SIZE].copy_from_slice(&self.extra_ram);
        out
    }
}

/// Parse a v0.30 snapshot
///
/// # Errors
/// * `AbinError::SpcTooShort` - fewer than [`SPC_FILE_LENGTH`] bytes
/// * `AbinError::InvalidSpcHeader` - the header text does not match
pub fn parse_spc(data: &[u8]) -> Result<SpcFile, AbinError> {
    if data.len() < SPC_FILE_LENGTH {
        return Err(AbinError::SpcTooShort { length: data.len() });
    }

    let header = read_string(&data[..HEADER_LEN]);
    if header != SPC_HEADER_TEXT {
        return Err(AbinError::InvalidSpcHeader { found: header });
    }

    let field = |(offset, len): (usize, usize)| read_string(&data[offset..offset + len]);
    let number = |range: (usize, usize)| field(range).trim().parse::<u32>().unwrap_or(0);

    let mut dsp_registers = [0u8; SPC_DSP_REGISTER_COUNT];
    dsp_registers.copy_from_slice(&data[DSP_OFFSET..DSP_OFFSET + SPC_DSP_REGISTER_COUNT]);
    let mut extra_ram = [0u8; SPC_EXTRA_RAM_SIZE];
    extra_ram.copy_from_slice(&data[EXTRA_RAM_OFFSET..EXTRA_RAM_OFFSET + SPC_EXTRA_RAM_SIZE]);

    Ok(SpcFile {
        has_id666: data[ID666_FLAG_OFFSET] != ID666_ABSENT,
        minor_version: data[MINOR_VERSION_OFFSET],
        registers: SpcRegisters {
            pc: u16::from_le_bytes([data[PC_OFFSET], data[PC_OFFSET + 1]]),
            a: data[A_OFFSET],
            x: data[X_OFFSET],
            y: data[Y_OFFSET],
            psw: data[PSW_OFFSET],
            sp: data[SP_OFFSET],
        },
        tag: Id666 {
            song_title: field(SONG_TITLE),
            game_title: field(GAME_TITLE),
            dumper_name: field(DUMPER_NAME),
            comments: field(COMMENTS),
            dump_date: field(DUMP_DATE),
            fade_out_seconds: number(FADE_OUT_SECONDS),
            fade_in_millis: number(FADE_IN_MILLIS),
            artist: field(ARTIST),
            default_channel_disables: data[CHANNEL_DISABLES_OFFSET],
            emulator: data[EMULATOR_OFFSET],
        },
        ram: data[RAM_OFFSET..RAM_OFFSET + SPC_RAM_SIZE].to_vec(),
        dsp_registers,
        extra_ram,
    })
}

pub fn read_spc_file(path: impl AsRef<Path>) -> Result<SpcFile, AbinError> {
    parse_spc(&std::fs::read(path)?)
}

pub fn write_spc_file(path: impl AsRef<Path>, spc: &SpcFile) -> Result<(), AbinError> {
    std::fs::write(path, spc.to_bytes())?;
    Ok(())
}

// =============================================================================
// Song injection
// =============================================================================

/// Place song `index` of `file` into `spc` sound RAM
///
/// Copies the song bytes to their SPC address. Every song table pointing at
/// the song is rewritten as plain address words, tagged with
/// [`SONG_TABLE_MARKER`] two bytes before it, and registered at
/// [`SONG_TABLE_POINTER_ADDRESS`]. The loop pointer at
/// [`SONG_LOOP_POINTER_ADDRESS`] is set to the song address plus 2. With
/// `default_dsp`, the DSP registers are replaced by [`DEFAULT_DSP_REGISTERS`].
///
/// # Errors
/// * `AbinError::NoSuchSong` - `index` is past the end of `file.songs`
/// * `AbinError::SpcOutOfRange` - a table would land outside sound RAM
pub fn inject_song(
    spc: &mut SpcFile,
    file: &AudioBinFile,
    index: usize,
    default_dsp: bool,
) -> Result<(), AbinError> {
    let song = file.songs.get(index).ok_or(AbinError::NoSuchSong {
        index,
        count: file.songs.len(),
    })?;
    spc.ram.resize(SPC_RAM_SIZE, 0);

    let start = song.spc_address as usize;
    let copied = song.len().min(SPC_RAM_SIZE - start);
    if copied < song.len() {
        tracing::warn!(
            "Song at ${:04X} runs past the end of SPC RAM, {} byte(s) dropped",
            song.spc_address,
            song.len() - copied
        );
    }
    spc.ram[start..start + copied].copy_from_slice(&song.data[..copied]);

    let entry = TableEntry::Pointer {
        address: song.spc_address,
    };
    for table in file.song_tables.iter().filter(|t| t.entries.contains(&entry)) {
        let words: Vec<u8> = table.pointers().flat_map(u16::to_le_bytes).collect();
        let address = table.spc_address as usize;
        if address < 2 || address + words.len() > SPC_RAM_SIZE {
            return Err(AbinError::SpcOutOfRange {
                address: table.spc_address,
                length: words.len(),
            });
        }

        spc.ram[address..address + words.len()].copy_from_slice(&words);
        spc.ram[address - 2] = SONG_TABLE_MARKER;
        let pointer = (table.spc_address - 2).to_le_bytes();
        spc.ram[SONG_TABLE_POINTER_ADDRESS..SONG_TABLE_POINTER_ADDRESS + 2].copy_from_slice(&pointer);
        tracing::debug!(
            "Injected song table at ${:04X} ({} entries)",
            table.spc_address,
            table.entries.len()
        );
    }

    let loop_pointer = song.spc_address.wrapping_add(2).to_le_bytes();
    spc.ram[SONG_LOOP_POINTER_ADDRESS..SONG_LOOP_POINTER_ADDRESS + 2].copy_from_slice(&loop_pointer);

    if default_dsp {
        spc.dsp_registers = DEFAULT_DSP_REGISTERS;
    }
    Ok(())
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Read a fixed-width text field, stopping at the first NUL
fn read_string(bytes: &[u8]) -> String {
    let len = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..len]).trim_end().to_string()
}

/// Write a NUL-padded text field, truncating to its width
fn write_string(out: &mut [u8], (offset, len): (usize, usize), s: &str) {
    let bytes = s.as_bytes();
    let copy_len = bytes.len().min(len);
    out[offset..offset + copy_len].copy_from_slice(&bytes[..copy_len]);
}

// =============================================================================
// Tests
// =============================================================================
