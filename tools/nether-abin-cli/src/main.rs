//! nether-abin - Audio BIN sound bank tool
//!
//! Inspects Audio BIN containers, exports them to assembler source plus
//! binaries, rebuilds them, writes single songs to .SPC snapshots, and scans
//! or encodes BRR sample data.

mod config;
mod wav;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use nether_abin::{AudioBinFile, ChunkType, ExportOptions, SpcFile};
use nether_brr::ScanOptions;
use rayon::prelude::*;
use std::path::{Path, PathBuf};

use config::ToolConfig;

#[derive(Parser)]
#[command(name = "nether-abin")]
#[command(about = "Audio BIN sound bank tool")]
#[command(version)]
struct Cli {
    /// Config file (default: nether-abin.toml in the working directory, if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List chunks, tables, songs and samples of an Audio BIN
    Info {
        /// Input Audio BIN file
        input: PathBuf,
    },

    /// Export an Audio BIN to assembler source and binaries
    Export {
        /// Input Audio BIN file
        input: PathBuf,

        /// Output directory (default: <name>_export next to the input)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Comment column in the assembler source (overrides config)
        #[arg(long)]
        pad_width: Option<usize>,
    },

    /// Re-serialize an Audio BIN from its parsed model
    Rebuild {
        /// Input Audio BIN file
        input: PathBuf,

        /// Output file (default: <name>.REBUILT.BIN next to the input)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Decode every sample of an Audio BIN to WAV
    Samples {
        /// Input Audio BIN file
        input: PathBuf,

        /// Output directory (default: <name>_samples next to the input)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// WAV sample rate (overrides config)
        #[arg(long)]
        sample_rate: Option<u32>,
    },

    /// Scan a raw blob for back-to-back BRR samples
    Brr {
        /// Input file containing BRR data
        input: PathBuf,

        /// Output directory (default: <name>_brr next to the input)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Keep every decodable run (no shift or length checks)
        #[arg(long)]
        lenient: bool,

        /// Also write each sample's raw .BRR bytes
        #[arg(long)]
        raw: bool,

        /// WAV sample rate (overrides config)
        #[arg(long)]
        sample_rate: Option<u32>,
    },

    /// Place one song of an Audio BIN into an .SPC snapshot
    Spc {
        /// Input Audio BIN file
        input: PathBuf,

        /// Song index as listed by `info`
        #[arg(short, long, default_value_t = 0)]
        song: usize,

        /// Snapshot to inject into, usually one with the sound driver loaded
        #[arg(long)]
        template: Option<PathBuf>,

        /// Output .spc file (default: <name>_<song>.spc next to the input)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// ID666 song title (default: the song's label)
        #[arg(long)]
        title: Option<String>,

        /// Keep the template's DSP registers instead of the driver defaults
        #[arg(long)]
        keep_dsp: bool,
    },

    /// Encode a 16-bit WAV file to BRR
    Encode {
        /// Input WAV file
        input: PathBuf,

        /// Output .BRR file (default: input with .BRR extension)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Set the loop flag on every block
        #[arg(long)]
        looping: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    let config = ToolConfig::resolve(cli.config.as_deref())?;

    match cli.command {
        Commands::Info { input } => {
            let file = import(&input)?;
            print_info(&file);
        }

        Commands::Export {
            input,
            output,
            pad_width,
        } => {
            let file = import(&input)?;
            let output = output.unwrap_or_else(|| sibling(&input, "_export"));
            export(&file, &output, &config.export_options(pad_width))?;
        }

        Commands::Rebuild { input, output } => {
            let file = import(&input)?;
            let output = output.unwrap_or_else(|| sibling(&input, ".REBUILT.BIN"));
            if !file.is_complete() {
                tracing::warn!(
                    "{} chunk(s) could not be classified and will be missing from the rebuild",
                    file.chunks.len() - file.sections().len()
                );
            }
            nether_abin::write_container_file(&output, &file)
                .with_context(|| format!("Failed to write {}", output.display()))?;
            tracing::info!("Rebuilt {:?} -> {:?}", input, output);
        }

        Commands::Samples {
            input,
            output,
            sample_rate,
        } => {
            let file = import(&input)?;
            let output = output.unwrap_or_else(|| sibling(&input, "_samples"));
            let rate = sample_rate.unwrap_or(config.brr.sample_rate);
            decode_bank_samples(&file, &output, rate)?;
        }

        Commands::Brr {
            input,
            output,
            lenient,
            raw,
            sample_rate,
        } => {
            let output = output.unwrap_or_else(|| sibling(&input, "_brr"));
            let rate = sample_rate.unwrap_or(config.brr.sample_rate);
            scan_brr(&input, &output, &config.scan_options(lenient), raw, rate)?;
        }

        Commands::Spc {
            input,
            song,
            template,
            output,
            title,
            keep_dsp,
        } => {
            let file = import(&input)?;
            let output = output.unwrap_or_else(|| sibling(&input, &format!("_{}.spc", song)));
            write_song_spc(&file, song, template.as_deref(), title, !keep_dsp, &output)?;
        }

        Commands::Encode {
            input,
            output,
            looping,
        } => {
            let output = output.unwrap_or_else(|| input.with_extension("BRR"));
            let (pcm, rate) = wav::read_wav_mono(&input)?;
            let encoded = nether_brr::encode_brr(&pcm, looping);
            std::fs::write(&output, &encoded)
                .with_context(|| format!("Failed to write {}", output.display()))?;
            tracing::info!(
                "Encoded {:?} ({} samples @ {} Hz) -> {:?} ({} bytes)",
                input,
                pcm.len(),
                rate,
                output,
                encoded.len()
            );
        }
    }

    Ok(())
}

fn import(input: &Path) -> Result<AudioBinFile> {
    let file = nether_abin::import_file(input)
        .with_context(|| format!("Failed to import {}", input.display()))?;
    tracing::info!(
        "Imported {:?}: {} chunks, {} songs, {} samples",
        input,
        file.chunks.len(),
        file.songs.len(),
        file.samples.len()
    );
    Ok(file)
}

/// `<dir>/<stem><suffix>` next to `input`
fn sibling(input: &Path, suffix: &str) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    input.with_file_name(format!("{}{}", stem, suffix))
}

fn create_dir(dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create directory: {}", dir.display()))
}

fn export(file: &AudioBinFile, output: &Path, options: &ExportOptions) -> Result<()> {
    create_dir(output)?;
    let descriptor = nether_abin::export_to_directory(output, file, options)
        .with_context(|| format!("Failed to export to {}", output.display()))?;

    for path in descriptor.all_paths() {
        tracing::debug!("  {}", path.display());
    }
    tracing::info!(
        "Exported {} -> {:?} ({} files)",
        file.file_name,
        descriptor.asm_path,
        descriptor.all_paths().count()
    );
    Ok(())
}

fn write_song_spc(
    file: &AudioBinFile,
    song: usize,
    template: Option<&Path>,
    title: Option<String>,
    default_dsp: bool,
    output: &Path,
) -> Result<()> {
    let mut spc = match template {
        Some(path) => nether_abin::read_spc_file(path)
            .with_context(|| format!("Failed to read SPC template {}", path.display()))?,
        None => SpcFile::default(),
    };

    nether_abin::inject_song(&mut spc, file, song, default_dsp)
        .with_context(|| format!("Failed to inject song {} of {}", song, file.file_name))?;
    spc.tag.song_title = title.unwrap_or_else(|| nether_abin::song_label(file, song));

    nether_abin::write_spc_file(output, &spc)
        .with_context(|| format!("Failed to write {}", output.display()))?;
    tracing::info!("Song {} of {} -> {:?}", song, file.file_name, output);
    Ok(())
}

fn decode_bank_samples(file: &AudioBinFile, output: &Path, rate: u32) -> Result<()> {
    create_dir(output)?;

    // Samples carry independent decoder history, so they decode in parallel
    let written: Vec<bool> = file
        .samples
        .par_iter()
        .enumerate()
        .map(|(index, sample)| -> Result<bool> {
            let pcm = match sample.decode_pcm() {
                Ok(pcm) => pcm,
                Err(e) => {
                    tracing::warn!("Sample {} at ${:04X}: {}", index + 1, sample.spc_address, e);
                    return Ok(false);
                }
            };
            let path = output.join(format!("SAMPLE_{}_{:04X}.wav", index + 1, sample.spc_address));
            wav::write_wav(&path, &pcm, rate)?;
            Ok(true)
        })
        .collect::<Result<_>>()?;

    let count = written.iter().filter(|&&w| w).count();
    tracing::info!("Wrote {} of {} sample(s) to {:?}", count, written.len(), output);
    Ok(())
}

fn scan_brr(input: &Path, output: &Path, options: &ScanOptions, raw: bool, rate: u32) -> Result<()> {
    let data = std::fs::read(input).with_context(|| format!("Failed to read {}", input.display()))?;
    let samples = nether_brr::read_samples(&data, options);
    tracing::info!(
        "Found {} BRR sample(s) in {:?} (strict: {})",
        samples.len(),
        input,
        options.strict
    );

    create_dir(output)?;
    samples.par_iter().enumerate().try_for_each(|(index, sample)| -> Result<()> {
        let stem = format!("{:03}_{:06X}", index + 1, sample.file_position);
        wav::write_wav(&output.join(format!("{}.wav", stem)), &sample.pcm, rate)?;
        if raw {
            if let Some(bytes) = sample.raw_bytes(&data) {
                let path = output.join(format!("{}.BRR", stem));
                std::fs::write(&path, bytes)
                    .with_context(|| format!("Failed to write {}", path.display()))?;
            }
        }
        Ok(())
    })
}

fn print_info(file: &AudioBinFile) {
    println!("{}: {} chunk(s)", file.file_name, file.chunks.len());
    println!("  {:>3}  {:>8}  {:>7}  {:>6}  type", "#", "offset", "address", "length");
    for (index, chunk) in file.chunks.iter().enumerate() {
        println!(
            "  {:>3}  {:>#8X}  {:>7}  {:>6}  {:?}",
            index,
            chunk.file_position,
            format!("${:04X}", chunk.spc_address),
            chunk.length,
            chunk.chunk_type
        );
    }

    for table in file.tables() {
        let kind = if table.table_type == ChunkType::SampleTable {
            "Sample"
        } else {
            "Song"
        };
        println!("{} table at ${:04X}: {} entries", kind, table.spc_address, table.entries.len());
    }

    for (index, song) in file.songs.iter().enumerate() {
        println!(
            "  {:<14} ${:04X}  {} bytes",
            nether_abin::song_label(file, index),
            song.spc_address,
            song.len()
        );
    }

    for (index, sample) in file.samples.iter().enumerate() {
        let loop_point = sample
            .loop_address
            .map(|a| format!("loop ${:04X}", a))
            .unwrap_or_default();
        println!(
            "  Sample {:<7} ${:04X}  {} bytes  {}",
            index + 1,
            sample.spc_address,
            sample.len(),
            loop_point
        );
    }

    for instrument in &file.instruments {
        println!("  Instruments    ${:04X}  {} bytes", instrument.spc_address, instrument.len());
    }

    if !file.diagnostics.is_empty() {
        println!("{} diagnostic(s):", file.diagnostics.len());
        for diagnostic in &file.diagnostics {
            println!("  {}", diagnostic);
        }
    }
}
