//! Nether-BRR: BRR sample codec for SPC700 sound banks
//!
//! BRR (Bit Rate Reduction) is the block-based predictive PCM compression used
//! by the SNES sound co-processor. Every 9-byte block carries a header byte and
//! 16 signed 4-bit nibbles which are shifted and run through one of four
//! linear prediction filters to produce 16-bit PCM.
//!
//! **This is a pure codec** - it knows nothing about the sound bank container
//! the samples are stored in. Callers hand it raw bytes (see `nether-abin`).
//!
//! # Block Format
//!
//! ```text
//! Block (9 bytes, repeats until a header with END set):
//!   0x00: header
//!         bit 0    END    - last block of the sample
//!         bit 1    LOOP   - restart at the loop address after END
//!         bits 2-3 FILTER - prediction filter (0-3)
//!         bits 4-7 SHIFT  - left shift applied to each nibble (0-12 valid)
//!   0x01..0x08: 16 nibbles, high nibble of each byte first
//! ```
//!
//! # Filters
//!
//! | Filter | Prediction added to the shifted nibble |
//! |--------|-----------------------------------------|
//! | 0 | none |
//! | 1 | `h1 * 15/16` |
//! | 2 | `h1 * 61/32 - h2 * 15/16` |
//! | 3 | `h1 * 115/64 - h2 * 13/16` |
//!
//! `h1` is the previously decoded sample and `h2` the one before it. The
//! history carries across the blocks of one sample.
//!
//! # Usage
//!
//! ```
//! use nether_brr::{decode_block, encode_brr, read_samples, ScanOptions};
//!
//! // Decode a single block
//! let mut history = [0i32; 2];
//! let block = decode_block(0x01, &[0x12, 0, 0, 0, 0, 0, 0, 0], &mut history).unwrap();
//! assert_eq!(&block.samples[..2], &[1, 2]);
//!
//! // Encode PCM and scan it back out of a raw blob
//! let pcm: Vec<i16> = (0..512).map(|i| ((i % 64) * 256 - 8192) as i16).collect();
//! let brr = encode_brr(&pcm, false);
//! let samples = read_samples(&brr, &ScanOptions::default());
//! assert_eq!(samples.len(), 1);
//! ```

mod decode;
mod encode;
mod reader;

pub use decode::{DecodedBlock, decode_block, decode_block_unchecked, decode_brr};
pub use encode::{encode_block, encode_brr};
pub use reader::{BrrSample, ScanOptions, read_samples};

// =============================================================================
// Constants
// =============================================================================

/// Size of one BRR block in bytes (header + 8 data bytes)
pub const BRR_BLOCK_SIZE: usize = 9;

/// Number of data bytes following the header
pub const BRR_BLOCK_DATA_LEN: usize = 8;

/// PCM samples produced by one complete block
pub const BRR_SAMPLES_PER_BLOCK: usize = 16;

/// Largest shift accepted under strict validation
pub const BRR_MAX_SHIFT: u8 = 12;

/// Strict-mode plausibility threshold (PCM samples)
pub const DEFAULT_MIN_SAMPLE_LEN: usize = 250;

// =============================================================================
// Error Type
// =============================================================================

/// Errors that can occur during BRR decoding
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum BrrError {
    /// Header shift is 13-15, which real hardware never produces
    #[error("invalid BRR shift {0} (max 12)")]
    InvalidShift(u8),
    /// Data ended in the middle of a block
    #[error("truncated BRR block at offset 0x{offset:X}")]
    TruncatedBlock { offset: usize },
}

// =============================================================================
// Block Header
// =============================================================================

/// Decomposed BRR block header byte
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BrrHeader {
    /// Last block of the sample
    pub end: bool,
    /// Sample loops back after the end block
    pub loop_flag: bool,
    /// Prediction filter (0-3)
    pub filter: u8,
    /// Left shift applied to every nibble (0-15)
    pub shift: u8,
}

impl BrrHeader {
    pub fn from_byte(byte: u8) -> Self {
        Self {
            end: byte & 0x01 != 0,
            loop_flag: byte & 0x02 != 0,
            filter: (byte >> 2) & 0x03,
            shift: byte >> 4,
        }
    }

    pub fn to_byte(self) -> u8 {
        (self.shift << 4)
            | ((self.filter & 0x03) << 2)
            | if self.loop_flag { 0x02 } else { 0 }
            | if self.end { 0x01 } else { 0 }
    }

    /// Check the shift against the range hardware actually uses
    pub fn validate(self) -> Result<Self, BrrError> {
        if self.shift > BRR_MAX_SHIFT {
            return Err(BrrError::InvalidShift(self.shift));
        }
        Ok(self)
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Sign-extend a 4-bit nibble to 16 bits (-8..=7)
#[inline]
pub(crate) fn sign_extend_nibble(nibble: u8) -> i16 {
    (((nibble & 0x0F) as i16) << 12) >> 12
}

/// Prediction term for a filter, truncated toward zero like the hardware tables
#[inline]
pub(crate) fn filter_term(filter: u8, history: &[i32; 2]) -> i16 {
    let h1 = history[0] as f64;
    let h2 = history[1] as f64;
    let term = match filter {
        0 => return 0,
        1 => h1 * 15.0 / 16.0,
        2 => (h1 * 61.0 / 32.0) - (h2 * 15.0 / 16.0),
        _ => (h1 * 115.0 / 64.0) - (h2 * 13.0 / 16.0),
    };
    term as i16
}

/// Reconstruct one sample from a nibble and push it into the history
#[inline]
pub(crate) fn reconstruct(nibble: u8, header: BrrHeader, history: &mut [i32; 2]) -> i16 {
    let shifted = sign_extend_nibble(nibble) << header.shift;
    let sample = shifted.wrapping_add(filter_term(header.filter, history));
    history[1] = history[0];
    history[0] = sample as i32;
    sample
}

// =============================================================================
// Tests
// =============================================================================
