//! In-memory Audio BIN model

use std::fmt;

use nether_brr::BrrError;

use crate::chunk::{Chunk, ChunkType};
use crate::error::AbinError;
use crate::table::AudioTable;

/// A blob of song, sample or instrument bytes cut from a chunk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioBinData {
    /// Where this blob starts in SPC memory
    pub spc_address: u16,
    /// File offset of the first byte
    pub file_position: u64,
    pub data: Vec<u8>,
    /// No table pointed into the chunk; the blob is the whole chunk
    pub is_default_item0: bool,
    /// Loop address from the sample table (samples only)
    pub loop_address: Option<u16>,
    /// Index of the source chunk in file order
    pub source_chunk: usize,
}

impl AudioBinData {
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Decode this blob as one BRR sample
    pub fn decode_pcm(&self) -> Result<Vec<i16>, BrrError> {
        nether_brr::decode_brr(&self.data)
    }
}

/// A chunk-local problem found during import
#[derive(Debug)]
pub struct Diagnostic {
    /// Index of the chunk in file order
    pub chunk_index: usize,
    pub spc_address: u16,
    pub error: AbinError,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "chunk {} (${:04X}): {}",
            self.chunk_index, self.spc_address, self.error
        )
    }
}

/// An imported Audio BIN container
#[derive(Debug, Default)]
pub struct AudioBinFile {
    /// Base name of the source file, used to name exported files
    pub file_name: String,
    /// Every chunk in file order, with its final classification
    pub chunks: Vec<Chunk>,
    pub song_tables: Vec<AudioTable>,
    pub sample_tables: Vec<AudioTable>,
    /// Songs, ascending by address
    pub songs: Vec<AudioBinData>,
    /// Samples, ascending by address
    pub samples: Vec<AudioBinData>,
    pub instruments: Vec<AudioBinData>,
    pub diagnostics: Vec<Diagnostic>,
}

/// What a chunk contributed to the model
#[derive(Debug, Clone)]
pub enum ChunkContent<'a> {
    Table(&'a AudioTable),
    Songs(Vec<&'a AudioBinData>),
    Samples(Vec<&'a AudioBinData>),
    Instrument(&'a AudioBinData),
}

/// One exported chunk and its content
#[derive(Debug, Clone)]
pub struct Section<'a> {
    pub index: usize,
    pub chunk: &'a Chunk,
    pub content: ChunkContent<'a>,
}

impl Section<'_> {
    /// The chunk payload rebuilt from the model
    pub fn payload(&self) -> Vec<u8> {
        match &self.content {
            ChunkContent::Table(table) => table.to_bytes(),
            ChunkContent::Songs(items) | ChunkContent::Samples(items) => {
                items.iter().flat_map(|item| item.data.iter().copied()).collect()
            }
            ChunkContent::Instrument(item) => item.data.clone(),
        }
    }
}

impl AudioBinFile {
    pub fn new(file_name: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            ..Self::default()
        }
    }

    /// All tables in chunk file order
    pub fn tables(&self) -> Vec<&AudioTable> {
        let mut tables: Vec<&AudioTable> =
            self.song_tables.iter().chain(&self.sample_tables).collect();
        tables.sort_by_key(|t| t.source_chunk);
        tables
    }

    /// Chunks that made it into the model, in file order
    ///
    /// Chunks left unclassified or unresolved, and tables that failed to
    /// decode, have no section.
    pub fn sections(&self) -> Vec<Section<'_>> {
        self.chunks
            .iter()
            .enumerate()
            .filter_map(|(index, chunk)| {
                let content = self.content_of(index, chunk.chunk_type)?;
                Some(Section {
                    index,
                    chunk,
                    content,
                })
            })
            .collect()
    }

    fn content_of(&self, index: usize, chunk_type: ChunkType) -> Option<ChunkContent<'_>> {
        match chunk_type {
            ChunkType::SongTable => self
                .song_tables
                .iter()
                .find(|t| t.source_chunk == index)
                .map(ChunkContent::Table),
            ChunkType::SampleTable => self
                .sample_tables
                .iter()
                .find(|t| t.source_chunk == index)
                .map(ChunkContent::Table),
            ChunkType::SongData => {
                Some(items_from(&self.songs, index)).filter(|v| !v.is_empty()).map(ChunkContent::Songs)
            }
            ChunkType::SampleData => {
                Some(items_from(&self.samples, index))
                    .filter(|v| !v.is_empty())
                    .map(ChunkContent::Samples)
            }
            ChunkType::InstrumentParameters => self
                .instruments
                .iter()
                .find(|d| d.source_chunk == index)
                .map(ChunkContent::Instrument),
            ChunkType::NotCalculated | ChunkType::AmbiguousTables => None,
        }
    }

    /// Whether every chunk of the source is represented in the model
    pub fn is_complete(&self) -> bool {
        self.sections().len() == self.chunks.len()
    }

    /// Decode every sample blob as BRR, in sample order
    pub fn decode_samples(&self) -> Vec<Result<Vec<i16>, BrrError>> {
        self.samples.iter().map(AudioBinData::decode_pcm).collect()
    }

    /// Find the song starting at `address`
    pub fn song_at(&self, address: u16) -> Option<(usize, &AudioBinData)> {
        self.songs
            .iter()
            .enumerate()
            .find(|(_, song)| song.spc_address == address)
    }
}

fn items_from(items: &[AudioBinData], chunk_index: usize) -> Vec<&AudioBinData> {
    items.iter().filter(|d| d.source_chunk == chunk_index).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::TableEntry;

    fn blob(address: u16, data: &[u8], source_chunk: usize) -> AudioBinData {
        AudioBinData {
            spc_address: address,
            file_position: 0,
            data: data.to_vec(),
            is_default_item0: false,
            loop_address: None,
            source_chunk,
        }
    }

    fn sample_model() -> AudioBinFile {
        let mut file = AudioBinFile::new("TEST");
        file.chunks = vec![
            Chunk::new(0x2F00, 0, 2).classified(ChunkType::SongTable),
            Chunk::new(0x3000, 6, 4).classified(ChunkType::SongData),
            Chunk::new(0x5000, 14, 2).classified(ChunkType::AmbiguousTables),
        ];
        file.song_tables.push(AudioTable {
            table_type: ChunkType::SongTable,
            spc_address: 0x2F00,
            source_chunk: 0,
            entries: vec![TableEntry::Pointer { address: 0x3002 }],
            trailing: None,
        });
        file.songs.push(blob(0x3000, &[1, 2], 1));
        file.songs.push(blob(0x3002, &[3, 0], 1));
        file
    }

    #[test]
    fn test_sections_skip_unresolved_chunks() {
        let file = sample_model();
        let sections = file.sections();

        assert_eq!(sections.len(), 2);
        assert!(!file.is_complete());
        assert_eq!(sections[0].index, 0);
        assert_eq!(sections[0].payload(), vec![0x02, 0x30]);
        assert_eq!(sections[1].payload(), vec![1, 2, 3, 0]);
        assert!(matches!(&sections[1].content, ChunkContent::Songs(songs) if songs.len() == 2));
    }

    #[test]
    fn test_song_at() {
        let file = sample_model();
        let (index, song) = file.song_at(0x3002).unwrap();
        assert_eq!(index, 1);
        assert_eq!(song.data, vec![3, 0]);
        assert!(file.song_at(0x3001).is_none());
    }

    #[test]
    fn test_decode_samples_per_blob() {
        let mut file = AudioBinFile::new("TEST");
        let mut block = vec![0x01u8, 0x12];
        block.extend_from_slice(&[0; 7]);
        file.samples.push(blob(0x4000, &block, 0));
        file.samples.push(blob(0x4009, &block[..5], 0));

        let decoded = file.decode_samples();
        assert_eq!(decoded.len(), 2);
        let pcm = decoded[0].as_ref().unwrap();
        assert_eq!(&pcm[..2], &[1, 2]);
        assert!(decoded[1].is_err());
    }

    #[test]
    fn test_diagnostic_display() {
        let diagnostic = Diagnostic {
            chunk_index: 4,
            spc_address: 0x2F00,
            error: AbinError::UnresolvedAmbiguity { address: 0x2F00 },
        };
        assert_eq!(
            diagnostic.to_string(),
            "chunk 4 ($2F00): Could not resolve ambiguous table at $2F00"
        );
    }
}
