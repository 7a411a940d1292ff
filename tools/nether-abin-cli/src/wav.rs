//! WAV audition files

use anyhow::{Context, Result, bail};
use std::path::Path;

/// Write mono 16-bit PCM
pub fn write_wav(path: &Path, pcm: &[i16], sample_rate: u32) -> Result<()> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    for &sample in pcm {
        writer.write_sample(sample)?;
    }
    writer
        .finalize()
        .with_context(|| format!("Failed to finish {}", path.display()))?;
    Ok(())
}

/// Read a 16-bit WAV as mono PCM, averaging stereo channels
///
/// Returns the samples and the file's sample rate.
pub fn read_wav_mono(path: &Path) -> Result<(Vec<i16>, u32)> {
    let mut reader = hound::WavReader::open(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;
    let spec = reader.spec();

    if spec.sample_format != hound::SampleFormat::Int || spec.bits_per_sample != 16 {
        bail!(
            "{}: only 16-bit integer WAV is supported (got {}-bit {:?})",
            path.display(),
            spec.bits_per_sample,
            spec.sample_format
        );
    }

    let samples: Vec<i16> = reader
        .samples::<i16>()
        .collect::<Result<_, _>>()
        .with_context(|| format!("Failed to read samples from {}", path.display()))?;

    let channels = spec.channels.max(1) as usize;
    let mono = if channels == 1 {
        samples
    } else {
        samples
            .chunks(channels)
            .map(|frame| {
                let sum: i32 = frame.iter().map(|&s| s as i32).sum();
                (sum / frame.len() as i32) as i16
            })
            .collect()
    };

    Ok((mono, spec.sample_rate))
}
