//! BRR decoder implementation
//!
//! Decodes BRR blocks to PCM. The history array is the only state; it must be
//! threaded through every block of one sample and reset between samples.

use crate::{
    BRR_BLOCK_DATA_LEN, BRR_BLOCK_SIZE, BRR_SAMPLES_PER_BLOCK, BrrError, BrrHeader, reconstruct,
};

/// One decoded block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodedBlock {
    /// Header flags (END/LOOP are returned to the caller, not applied)
    pub header: BrrHeader,
    /// 16 PCM samples
    pub samples: [i16; BRR_SAMPLES_PER_BLOCK],
}

/// Decode a single block with strict shift validation
///
/// # Arguments
/// * `header` - Raw header byte
/// * `data` - The 8 data bytes following the header
/// * `history` - `[h1, h2]`, updated in place
///
/// # Errors
/// Returns `BrrError::InvalidShift` for shifts 13-15. The history is left
/// untouched in that case.
pub fn decode_block(
    header: u8,
    data: &[u8; BRR_BLOCK_DATA_LEN],
    history: &mut [i32; 2],
) -> Result<DecodedBlock, BrrError> {
    BrrHeader::from_byte(header).validate()?;
    Ok(decode_block_unchecked(header, data, history))
}

/// Decode a single block without rejecting out-of-range shifts
pub fn decode_block_unchecked(
    header: u8,
    data: &[u8; BRR_BLOCK_DATA_LEN],
    history: &mut [i32; 2],
) -> DecodedBlock {
    let header = BrrHeader::from_byte(header);
    let mut samples = [0i16; BRR_SAMPLES_PER_BLOCK];

    for (i, &byte) in data.iter().enumerate() {
        samples[i * 2] = reconstruct(byte >> 4, header, history);
        samples[i * 2 + 1] = reconstruct(byte & 0x0F, header, history);
    }

    DecodedBlock { header, samples }
}

/// Decode however many data bytes are present (a final block may be short)
pub(crate) fn decode_partial(
    header: BrrHeader,
    data: &[u8],
    history: &mut [i32; 2],
    output: &mut Vec<i16>,
) {
    for &byte in data.iter().take(BRR_BLOCK_DATA_LEN) {
        output.push(reconstruct(byte >> 4, header, history));
        output.push(reconstruct(byte & 0x0F, header, history));
    }
}

/// Decode one sample starting at the beginning of `data`
///
/// Blocks are decoded until one has the END bit set or the data runs out on a
/// block boundary.
///
/// # Errors
/// * `BrrError::InvalidShift` - a block header has shift 13-15
/// * `BrrError::TruncatedBlock` - the data ends in the middle of a block
pub fn decode_brr(data: &[u8]) -> Result<Vec<i16>, BrrError> {
    let mut output = Vec::with_capacity(data.len() / BRR_BLOCK_SIZE * BRR_SAMPLES_PER_BLOCK);
    let mut history = [0i32; 2];

    for (index, block) in data.chunks(BRR_BLOCK_SIZE).enumerate() {
        let Ok(bytes) = <&[u8; BRR_BLOCK_SIZE]>::try_from(block) else {
            return Err(BrrError::TruncatedBlock {
                offset: index * BRR_BLOCK_SIZE,
            });
        };
        let [header, body @ ..] = bytes;
        let decoded = decode_block(*header, body, &mut history)?;
        output.extend_from_slice(&decoded.samples);

        if decoded.header.end {
            break;
        }
    }

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_end_block_filter0_nibbles() {
        let mut history = [0i32; 2];
        let block = decode_block(0x01, &[0x12, 0, 0, 0, 0, 0, 0, 0], &mut history).unwrap();

        assert!(block.header.end);
        assert!(!block.header.loop_flag);
        assert_eq!(block.samples[0], 1);
        assert_eq!(block.samples[1], 2);
        assert!(block.samples[2..].iter().all(|&s| s == 0));
    }

    #[test]
    fn test_negative_nibbles_and_shift() {
        // shift 4, filter 0: 0xF = -1 -> -16, 0x8 = -8 -> -128
        let mut history = [0i32; 2];
        let block = decode_block(0x40, &[0xF8, 0x7F, 0, 0, 0, 0, 0, 0], &mut history).unwrap();

        assert_eq!(&block.samples[..4], &[-16, -128, 112, -16]);
    }

    #[test]
    fn test_history_updated() {
        let mut history = [0i32; 2];
        let data = [0, 0, 0, 0, 0, 0, 0, 0x34];
        decode_block(0x00, &data, &mut history).unwrap();
        assert_eq!(history, [4, 3]);
    }

    #[test]
    fn test_filter1_uses_previous_sample() {
        // Block 1 leaves h1 = 7 (shift 4 -> 112), block 2 is all-zero nibbles with filter 1
        let mut history = [0i32; 2];
        decode_block(0x40, &[0, 0, 0, 0, 0, 0, 0, 0x07], &mut history).unwrap();
        assert_eq!(history[0], 112);

        let block = decode_block(0x04, &[0; 8], &mut history).unwrap();
        assert_eq!(block.samples[0], 105); // 112 * 15/16
        assert_eq!(block.samples[1], 98); // 105 * 15/16 = 98.4
    }

    #[test]
    fn test_filter_applies_from_second_sample() {
        // First block of a sample: shift 4, filter 1, END. Only the nibble of
        // sample 0 is set; samples 1 and 2 come from the filter alone.
        let pcm = decode_brr(&[0x45, 0x70, 0, 0, 0, 0, 0, 0, 0]).unwrap();
        assert_eq!(pcm[0], 112);
        assert_eq!(pcm[1], 105);
        assert_eq!(pcm[2], 98);
    }

    #[test]
    fn test_decode_deterministic() {
        let data = [0x9A, 0xBC, 0xDE, 0xF0, 0x12, 0x34, 0x56, 0x78];
        let mut h1 = [100i32, -50];
        let mut h2 = [100i32, -50];
        let a = decode_block(0xBC, &data, &mut h1).unwrap();
        let b = decode_block(0xBC, &data, &mut h2).unwrap();
        assert_eq!(a, b);
        assert_eq!(h1, h2);
    }

    #[test]
    fn test_invalid_shift_rejected() {
        let mut history = [5i32, 6];
        let result = decode_block(0xD0, &[0; 8], &mut history);
        assert_eq!(result, Err(BrrError::InvalidShift(13)));
        assert_eq!(history, [5, 6]);
    }

    #[test]
    fn test_unchecked_accepts_large_shift() {
        let mut history = [0i32; 2];
        let block = decode_block_unchecked(0xF0, &[0x10, 0, 0, 0, 0, 0, 0, 0], &mut history);
        // 1 << 15 wraps to i16::MIN
        assert_eq!(block.samples[0], i16::MIN);
    }

    #[test]
    fn test_decode_brr_stops_at_end() {
        let mut data = vec![0x00, 0x11, 0, 0, 0, 0, 0, 0, 0];
        data.extend_from_slice(&[0x01, 0x22, 0, 0, 0, 0, 0, 0, 0]);
        data.extend_from_slice(&[0x00, 0x33, 0, 0, 0, 0, 0, 0, 0]); // after END, ignored

        let pcm = decode_brr(&data).unwrap();
        assert_eq!(pcm.len(), 32);
        assert_eq!(pcm[16], 2);
    }

    #[test]
    fn test_decode_brr_truncated() {
        let data = [0x00, 0, 0, 0, 0, 0, 0, 0, 0, 0x01, 0, 0];
        assert_eq!(
            decode_brr(&data),
            Err(BrrError::TruncatedBlock { offset: 9 })
        );
    }

    #[test]
    fn test_decode_partial_short_block() {
        let mut output = Vec::new();
        let mut history = [0i32; 2];
        decode_partial(BrrHeader::from_byte(0), &[0x12, 0x34], &mut history, &mut output);
        assert_eq!(output, vec![1, 2, 3, 4]);
    }
}
