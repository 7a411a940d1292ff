//! BRR encoder implementation
//!
//! Brute-force encoder: every block tries all valid shift/filter pairs against
//! the real decoder arithmetic and keeps the one with the lowest squared error.

use crate::{
    BRR_BLOCK_SIZE, BRR_MAX_SHIFT, BRR_SAMPLES_PER_BLOCK, BrrHeader, filter_term, reconstruct,
};

/// Encode up to 16 samples into one 9-byte block
///
/// Missing samples (a short final block) are encoded as silence.
///
/// # Arguments
/// * `samples` - Input samples (up to 16)
/// * `history` - Decoder history `[h1, h2]` (updated to what the decoder will see)
/// * `end` - Set the END bit
/// * `loop_flag` - Set the LOOP bit
///
/// # Returns
/// The encoded block (header + 8 data bytes)
pub fn encode_block(
    samples: &[i16],
    history: &mut [i32; 2],
    end: bool,
    loop_flag: bool,
) -> [u8; BRR_BLOCK_SIZE] {
    let mut target = [0i16; BRR_SAMPLES_PER_BLOCK];
    for (slot, &sample) in target.iter_mut().zip(samples) {
        *slot = sample;
    }

    let mut best_block = [0u8; BRR_BLOCK_SIZE];
    let mut best_error = i64::MAX;
    let mut best_history = *history;

    for filter in 0..4u8 {
        for shift in 0..=BRR_MAX_SHIFT {
            let header = BrrHeader {
                end,
                loop_flag,
                filter,
                shift,
            };
            let mut test_history = *history;
            let mut block = [0u8; BRR_BLOCK_SIZE];
            block[0] = header.to_byte();
            let mut total_error = 0i64;

            for (i, &sample) in target.iter().enumerate() {
                let predicted = filter_term(filter, &test_history) as i32;
                let residual = (sample as i32 - predicted) as f64 / (1i32 << shift) as f64;
                let nibble = (residual.round() as i32).clamp(-8, 7);
                let nibble_bits = (nibble & 0x0F) as u8;

                let decoded = reconstruct(nibble_bits, header, &mut test_history);
                let error = (sample as i64 - decoded as i64).abs();
                total_error += error * error;

                let byte = &mut block[1 + i / 2];
                if i % 2 == 0 {
                    *byte |= nibble_bits << 4;
                } else {
                    *byte |= nibble_bits;
                }
            }

            if total_error < best_error {
                best_error = total_error;
                best_block = block;
                best_history = test_history;
            }
        }
    }

    *history = best_history;
    best_block
}

/// Encode PCM samples to a BRR sample
///
/// The sample is padded with silence to a whole number of blocks. The last
/// block carries the END bit; every block carries LOOP when `looping` is set.
///
/// # Returns
/// Encoded BRR data (empty input encodes to nothing)
pub fn encode_brr(samples: &[i16], looping: bool) -> Vec<u8> {
    let blocks = samples.len().div_ceil(BRR_SAMPLES_PER_BLOCK);
    let mut output = Vec::with_capacity(blocks * BRR_BLOCK_SIZE);
    let mut history = [0i32; 2];

    for (index, chunk) in samples.chunks(BRR_SAMPLES_PER_BLOCK).enumerate() {
        let end = index + 1 == blocks;
        output.extend_from_slice(&encode_block(chunk, &mut history, end, looping));
    }

    output
}
