//! BRR sample scanner
//!
//! Finds back-to-back BRR samples in a raw blob with no directory. Each sample
//! runs from its first block to the first block with END set (or end of data).
//! Strict mode filters out the false positives produced by scanning over
//! non-BRR bytes.

use crate::decode::decode_partial;
use crate::{BRR_BLOCK_SIZE, BrrHeader, DEFAULT_MIN_SAMPLE_LEN};

/// Scanner configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanOptions {
    /// Reject samples containing shifts 13-15 and samples shorter than `min_sample_len`
    pub strict: bool,
    /// Minimum plausible sample length in PCM samples (strict mode only)
    pub min_sample_len: usize,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            strict: true,
            min_sample_len: DEFAULT_MIN_SAMPLE_LEN,
        }
    }
}

impl ScanOptions {
    /// No validation: every decodable run is reported
    pub fn lenient() -> Self {
        Self {
            strict: false,
            ..Self::default()
        }
    }
}

/// A decoded BRR sample found in a blob
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrrSample {
    /// Display name ("Sample N", 1-based)
    pub name: String,
    /// Offset of the first block in the scanned data
    pub file_position: u64,
    /// Bytes consumed from the first block through the END block
    pub byte_length: u64,
    /// LOOP bit of the final block
    pub loops: bool,
    /// Decoded 16-bit PCM
    pub pcm: Vec<i16>,
}

impl BrrSample {
    /// The encoded bytes of this sample within the data it was scanned from
    pub fn raw_bytes<'a>(&self, source: &'a [u8]) -> Option<&'a [u8]> {
        let start = usize::try_from(self.file_position).ok()?;
        let len = usize::try_from(self.byte_length).ok()?;
        source.get(start..start.checked_add(len)?)
    }
}

/// Scan `data` for consecutive BRR samples
///
/// In strict mode a block with an invalid shift discards the whole sample in
/// progress; scanning resumes at the byte after the failed block.
pub fn read_samples(data: &[u8], options: &ScanOptions) -> Vec<BrrSample> {
    let mut samples = Vec::new();
    let mut pos = 0usize;

    while pos < data.len() {
        let entry = pos;
        let mut history = [0i32; 2];
        let mut pcm = Vec::new();
        let mut loops = false;
        let mut rejected = false;

        while pos < data.len() {
            let header = BrrHeader::from_byte(data[pos]);
            let block_end = (pos + BRR_BLOCK_SIZE).min(data.len());

            if options.strict && header.validate().is_err() {
                tracing::debug!(
                    "BRR block at 0x{:X} has shift {}, discarding sample from 0x{:X}",
                    pos,
                    header.shift,
                    entry
                );
                pos = block_end;
                rejected = true;
                break;
            }

            decode_partial(header, &data[pos + 1..block_end], &mut history, &mut pcm);
            pos = block_end;
            loops = header.loop_flag;

            if header.end {
                break;
            }
        }

        if rejected || pcm.is_empty() {
            continue;
        }

        if options.strict && pcm.len() < options.min_sample_len {
            tracing::debug!(
                "Dropping implausible BRR sample at 0x{:X} ({} samples)",
                entry,
                pcm.len()
            );
            continue;
        }

        let sample = BrrSample {
            name: format!("Sample {}", samples.len() + 1),
            file_position: entry as u64,
            byte_length: (pos - entry) as u64,
            loops,
            pcm,
        };
        tracing::debug!(
            "{}: offset 0x{:X}, {} bytes, {} samples",
            sample.name,
            sample.file_position,
            sample.byte_length,
            sample.pcm.len()
        );
        samples.push(sample);
    }

    samples
}
