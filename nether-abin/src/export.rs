//! Assembler exporter
//!
//! Turns an [`AudioBinFile`] back into assembler source plus the raw binaries
//! it `incbin`s. Assembling the source reproduces the container: each chunk
//! becomes a `dw length` / `dw address` head followed by its payload, and the
//! file ends with the `$0000`/`$0400` end-of-data marker.

use std::path::{Path, PathBuf};

use crate::model::{AudioBinFile, ChunkContent, Section};
use crate::table::{AudioTable, TableEntry};
use crate::{DEFAULT_PAD_WIDTH, END_OF_DATA_ADDRESS};

/// Exporter configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportOptions {
    /// Column at which `//` comments start
    pub pad_width: usize,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            pad_width: DEFAULT_PAD_WIDTH,
        }
    }
}

/// A binary file referenced by the assembler source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedBinary {
    pub file_name: String,
    pub spc_address: u16,
    pub data: Vec<u8>,
}

/// Assembler source and the binaries it includes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AsmExport {
    pub asm_file_name: String,
    pub asm_text: String,
    /// One per song
    pub song_binaries: Vec<ExportedBinary>,
    /// One per sample data chunk
    pub sample_binaries: Vec<ExportedBinary>,
    /// One per instrument parameter chunk
    pub instrument_binaries: Vec<ExportedBinary>,
}

impl AsmExport {
    /// Every binary, songs first
    pub fn binaries(&self) -> impl Iterator<Item = &ExportedBinary> {
        self.song_binaries
            .iter()
            .chain(&self.sample_binaries)
            .chain(&self.instrument_binaries)
    }
}

/// Paths written by [`export_to_directory`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportDescriptor {
    pub directory: PathBuf,
    pub asm_path: PathBuf,
    pub song_paths: Vec<PathBuf>,
    pub sample_paths: Vec<PathBuf>,
    pub instrument_paths: Vec<PathBuf>,
    /// Per-sample BRR dumps for audition tools
    pub brr_paths: Vec<PathBuf>,
}

impl ExportDescriptor {
    /// Every path written, assembler source first
    pub fn all_paths(&self) -> impl Iterator<Item = &PathBuf> {
        std::iter::once(&self.asm_path)
            .chain(&self.song_paths)
            .chain(&self.sample_paths)
            .chain(&self.instrument_paths)
            .chain(&self.brr_paths)
    }
}

// =============================================================================
// Naming
// =============================================================================

pub fn song_file_name(base: &str, address: u16) -> String {
    format!("SONG_DATA_{}_{:04X}.BIN", base, address)
}

pub fn sample_file_name(base: &str, address: u16) -> String {
    format!("SMPL_DATA_{}_{:04X}.BIN", base, address)
}

pub fn instrument_file_name(base: &str, address: u16) -> String {
    format!("INST_DATA_{}_{:04X}.BIN", base, address)
}

pub fn asm_file_name(base: &str) -> String {
    format!("{}.ASM", base)
}

/// Assembler label of the song at `index` in `AudioBinFile::songs`
///
/// The first fallback song is `defaultSong0`; later ones carry their address
/// so every label stays unique.
pub fn song_label(file: &AudioBinFile, index: usize) -> String {
    match file.songs.get(index) {
        Some(song) if song.is_default_item0 => {
            if file.songs[..index].iter().any(|s| s.is_default_item0) {
                format!("defaultSong0_{:04X}", song.spc_address)
            } else {
                "defaultSong0".to_string()
            }
        }
        _ => format!("song{}", index),
    }
}

// =============================================================================
// Assembler text
// =============================================================================

struct AsmWriter {
    out: String,
    pad_width: usize,
}

impl AsmWriter {
    fn new(pad_width: usize) -> Self {
        Self {
            out: String::new(),
            pad_width,
        }
    }

    fn line(&mut self, text: &str) {
        self.out.push_str(text);
        self.out.push('\n');
    }

    fn blank(&mut self) {
        self.out.push('\n');
    }

    fn comment(&mut self, text: &str) {
        self.out.push_str("//");
        self.line(text);
    }

    /// Directive padded to the comment column
    fn commented(&mut self, text: &str, comment: &str) {
        let padded = format!("{:<width$}", text, width = self.pad_width);
        self.out.push_str(&padded);
        self.comment(comment);
    }

    fn header(&mut self, heading: &str) {
        self.comment(&format!("===== {} =====", heading));
        self.blank();
    }

    fn chunk_head(&mut self, length: &str, address: u16, what: &str) {
        self.commented(&format!("dw {}", length), &format!("{} length (in bytes)", what));
        self.commented(
            &format!("dw ${:04X}", address),
            &format!("{} SPC destination address", what),
        );
    }
}

/// Build the assembler source and binaries for `file`
///
/// Chunks without a section (see [`AudioBinFile::sections`]) are left out.
pub fn export(file: &AudioBinFile, options: &ExportOptions) -> AsmExport {
    let base = file.file_name.as_str();
    let mut asm = AsmWriter::new(options.pad_width);
    let mut result = AsmExport {
        asm_file_name: asm_file_name(base),
        asm_text: String::new(),
        song_binaries: Vec::new(),
        sample_binaries: Vec::new(),
        instrument_binaries: Vec::new(),
    };

    asm.comment(&format!(
        "Exported from {} by nether-abin v{}",
        base,
        env!("CARGO_PKG_VERSION")
    ));
    asm.blank();

    let mut table_number = 0usize;
    for section in file.sections() {
        match &section.content {
            ChunkContent::Table(table) => {
                write_table(&mut asm, file, table, table_number);
                table_number += 1;
            }
            ChunkContent::Songs(_) => write_songs(&mut asm, file, &section, &mut result),
            ChunkContent::Samples(_) => {
                let binary = ExportedBinary {
                    file_name: sample_file_name(base, section.chunk.spc_address),
                    spc_address: section.chunk.spc_address,
                    data: section.payload(),
                };
                write_blob(&mut asm, "SAMPLE DATA", "Sample(s)", &binary);
                result.sample_binaries.push(binary);
            }
            ChunkContent::Instrument(item) => {
                let binary = ExportedBinary {
                    file_name: instrument_file_name(base, item.spc_address),
                    spc_address: item.spc_address,
                    data: item.data.clone(),
                };
                write_blob(&mut asm, "INSTRUMENT PARAMETERS", "Instrument(s)", &binary);
                result.instrument_binaries.push(binary);
            }
        }
        asm.blank();
    }

    asm.header("EXECUTE");
    asm.line("dw $0000");
    asm.line(&format!("dw ${:04X}", END_OF_DATA_ADDRESS));

    result.asm_text = asm.out;
    result
}

fn write_table(asm: &mut AsmWriter, file: &AudioBinFile, table: &AudioTable, number: usize) {
    let start = format!("start_table{}", number);
    let end = format!("end_table{}", number);

    asm.header(if table.is_sample_table() {
        "SAMPLE TABLE"
    } else {
        "SONG TABLE"
    });
    asm.commented(&format!("dw {}-{}", end, start), "Transfer size (in bytes)");
    asm.commented(
        &format!("dw ${:04X}", table.spc_address),
        "Table SPC destination address",
    );
    asm.line(&format!("{}:", start));

    for (index, entry) in table.entries.iter().enumerate() {
        match *entry {
            TableEntry::Pointer { address } => {
                let target = match file.song_at(address) {
                    Some((song, _)) => song_label(file, song),
                    None => format!("${:04X}", address),
                };
                asm.commented(&format!("dw {}", target), &format!("Pointer to Sub {}", index));
            }
            TableEntry::Range { start, end } => {
                asm.commented(
                    &format!("dw ${:04X},${:04X}", start, end),
                    &format!("Sample {}: Start, Loop Addresses", index),
                );
            }
        }
    }
    if let Some(byte) = table.trailing {
        asm.commented(&format!("db ${:02X}", byte), "Trailing byte");
    }

    asm.line(&format!("{}:", end));
}

fn write_songs(
    asm: &mut AsmWriter,
    file: &AudioBinFile,
    section: &Section<'_>,
    result: &mut AsmExport,
) {
    let ChunkContent::Songs(songs) = &section.content else {
        return;
    };
    let chunk = section.chunk;

    asm.header("SONG DATA");
    asm.chunk_head(&chunk.length.to_string(), chunk.spc_address, "Song(s)");
    asm.line(&format!("base ${:04X}", chunk.spc_address));

    for song in songs {
        let label = file
            .songs
            .iter()
            .position(|s| std::ptr::eq(s, *song))
            .map(|index| song_label(file, index))
            .unwrap_or_else(|| format!("song_{:04X}", song.spc_address));
        let note = if song.is_default_item0 {
            "<- Default Song 0 failsafe"
        } else {
            "<- Song points here"
        };
        let binary = ExportedBinary {
            file_name: song_file_name(&file.file_name, song.spc_address),
            spc_address: song.spc_address,
            data: song.data.clone(),
        };

        asm.commented(&format!("{}:", label), note);
        asm.line(&format!("  incbin {}", binary.file_name));
        result.song_binaries.push(binary);
    }

    asm.line("base off");
}

fn write_blob(asm: &mut AsmWriter, heading: &str, what: &str, binary: &ExportedBinary) {
    asm.header(heading);
    asm.chunk_head(&binary.data.len().to_string(), binary.spc_address, what);
    asm.commented(&format!("  incbin {}", binary.file_name), "<- Data BIN here");
}

// =============================================================================
// Directory export
// =============================================================================

/// Export `file` into `directory`, which must already exist
///
/// Writes the assembler source, every binary it includes, and one
/// `SAMPLE_<n>_<ADDR>.BRR` per non-empty sample for audition.
pub fn export_to_directory(
    directory: impl AsRef<Path>,
    file: &AudioBinFile,
    options: &ExportOptions,
) -> Result<ExportDescriptor, crate::AbinError> {
    let directory = directory.as_ref();
    let rendered = export(file, options);

    let write = |name: &str, data: &[u8]| -> Result<PathBuf, crate::AbinError> {
        let path = directory.join(name);
        std::fs::write(&path, data)?;
        tracing::debug!("Wrote {} ({} bytes)", path.display(), data.len());
        Ok(path)
    };

    let mut descriptor = ExportDescriptor {
        directory: directory.to_path_buf(),
        ..ExportDescriptor::default()
    };

    for binary in &rendered.song_binaries {
        descriptor.song_paths.push(write(&binary.file_name, &binary.data)?);
    }
    for binary in &rendered.sample_binaries {
        descriptor.sample_paths.push(write(&binary.file_name, &binary.data)?);
    }
    for binary in &rendered.instrument_binaries {
        descriptor
            .instrument_paths
            .push(write(&binary.file_name, &binary.data)?);
    }
    for (index, sample) in file.samples.iter().enumerate() {
        if sample.is_empty() {
            continue;
        }
        let name = format!("SAMPLE_{}_{:04X}.BRR", index + 1, sample.spc_address);
        descriptor.brr_paths.push(write(&name, &sample.data)?);
    }

    descriptor.asm_path = write(&rendered.asm_file_name, rendered.asm_text.as_bytes())?;
    Ok(descriptor)
}
