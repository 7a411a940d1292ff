//! Export, reassemble and re-import Audio BIN containers

use std::collections::HashMap;
use std::path::Path;

use nether_abin::{
    ChunkType, ExportOptions, export_to_directory, import_bytes, import_file, write_container,
};

// =============================================================================
// Fixture
// =============================================================================

fn push_chunk(out: &mut Vec<u8>, address: u16, payload: &[u8]) {
    out.extend_from_slice(&(payload.len() as u16).to_le_bytes());
    out.extend_from_slice(&address.to_le_bytes());
    out.extend_from_slice(payload);
}

fn sound_bank() -> Vec<u8> {
    let mut data = Vec::new();

    // Song table: two songs, listed out of order
    push_chunk(&mut data, 0x2F00, &[0x10, 0x30, 0x00, 0x30]);

    // Sample table: two samples with loop points
    push_chunk(
        &mut data,
        0x3E00,
        &[0x00, 0x40, 0x00, 0x40, 0x09, 0x40, 0x09, 0x40],
    );

    // Sample data: two single-block BRR samples
    let mut samples = vec![0x02, 0x00, 0x12, 0x34, 0x56, 0x78, 0x9A, 0xBC, 0xDE];
    samples.extend_from_slice(&[0x07, 0x11, 0x22, 0x33, 0x44, 0x55, 0x66, 0x77, 0x01]);
    push_chunk(&mut data, 0x4000, &samples);

    // Song data: 0x21 bytes, odd length, zero terminated
    let mut song: Vec<u8> = (0..0x21).map(|i| 0xE0 ^ i as u8).collect();
    song[0x20] = 0x00;
    push_chunk(&mut data, 0x3000, &song);

    // Instrument parameters
    push_chunk(&mut data, 0x3800, &[0x00, 0xFF, 0xE0, 0xB8, 0x03, 0x70]);

    data.extend_from_slice(&[0x00, 0x00, 0x00, 0x04]);
    data
}

// =============================================================================
// Minimal assembler for the exported dialect
// =============================================================================

fn assemble(source: &str, dir: &Path) -> Vec<u8> {
    let lines: Vec<&str> = source
        .lines()
        .map(|l| l.split("//").next().unwrap_or("").trim())
        .filter(|l| !l.is_empty())
        .collect();

    // First pass places labels, second pass resolves them
    let (_, labels) = walk(&lines, dir, &HashMap::new());
    let (output, _) = walk(&lines, dir, &labels);
    output
}

fn walk(
    lines: &[&str],
    dir: &Path,
    labels: &HashMap<String, i64>,
) -> (Vec<u8>, HashMap<String, i64>) {
    let mut out = Vec::new();
    let mut found = HashMap::new();
    let mut base: Option<(i64, usize)> = None;

    for line in lines {
        if let Some(label) = line.strip_suffix(':') {
            let value = match base {
                Some((address, at)) => address + (out.len() - at) as i64,
                None => out.len() as i64,
            };
            found.insert(label.to_string(), value);
        } else if let Some(args) = line.strip_prefix("dw ") {
            for expr in args.split(',') {
                let value = eval(expr.trim(), labels) as u16;
                out.extend_from_slice(&value.to_le_bytes());
            }
        } else if let Some(arg) = line.strip_prefix("db ") {
            out.push(eval(arg.trim(), labels) as u8);
        } else if let Some(name) = line.strip_prefix("incbin ") {
            out.extend(std::fs::read(dir.join(name.trim())).unwrap());
        } else if *line == "base off" {
            base = None;
        } else if let Some(arg) = line.strip_prefix("base ") {
            base = Some((eval(arg.trim(), labels), out.len()));
        } else {
            panic!("unknown directive: {}", line);
        }
    }

    (out, found)
}

fn eval(expr: &str, labels: &HashMap<String, i64>) -> i64 {
    if let Some(hex) = expr.strip_prefix('$') {
        return i64::from_str_radix(hex, 16).unwrap();
    }
    if let Ok(value) = expr.parse::<i64>() {
        return value;
    }
    if let Some((a, b)) = expr.split_once('-') {
        return eval(a, labels) - eval(b, labels);
    }
    labels.get(expr).copied().unwrap_or(0)
}

// =============================================================================
// Tests
// =============================================================================

#[test]
fn test_fixture_classification() {
    let file = import_bytes("BANK", &sound_bank()).unwrap();
    let types: Vec<ChunkType> = file.chunks.iter().map(|c| c.chunk_type).collect();

    assert_eq!(
        types,
        vec![
            ChunkType::SongTable,
            ChunkType::SampleTable,
            ChunkType::SampleData,
            ChunkType::SongData,
            ChunkType::InstrumentParameters,
        ]
    );
    assert!(file.diagnostics.is_empty());
    assert_eq!(file.songs.len(), 2);
    assert_eq!(file.samples.len(), 2);
    assert_eq!(file.instruments.len(), 1);
}

#[test]
fn test_reassembled_export_is_byte_identical() {
    let dir = tempfile::tempdir().unwrap();
    let original = sound_bank();
    let file = import_bytes("BANK", &original).unwrap();

    let descriptor = export_to_directory(dir.path(), &file, &ExportOptions::default()).unwrap();
    let source = std::fs::read_to_string(&descriptor.asm_path).unwrap();

    assert_eq!(assemble(&source, dir.path()), original);
}

#[test]
fn test_reimport_matches_direct_import() {
    let dir = tempfile::tempdir().unwrap();
    let direct = import_bytes("BANK", &sound_bank()).unwrap();

    let descriptor = export_to_directory(dir.path(), &direct, &ExportOptions::default()).unwrap();
    let source = std::fs::read_to_string(&descriptor.asm_path).unwrap();
    let rebuilt_path = dir.path().join("BANK.BIN");
    std::fs::write(&rebuilt_path, assemble(&source, dir.path())).unwrap();

    let again = import_file(&rebuilt_path).unwrap();
    assert_eq!(again.chunks, direct.chunks);
    assert_eq!(again.songs, direct.songs);
    assert_eq!(again.samples, direct.samples);
    assert_eq!(again.instruments, direct.instruments);
}

#[test]
fn test_writer_matches_assembler() {
    let dir = tempfile::tempdir().unwrap();
    let file = import_bytes("BANK", &sound_bank()).unwrap();

    let descriptor = export_to_directory(dir.path(), &file, &ExportOptions { pad_width: 24 }).unwrap();
    let source = std::fs::read_to_string(&descriptor.asm_path).unwrap();

    assert_eq!(assemble(&source, dir.path()), write_container(&file));
}

#[test]
fn test_song_pointers_become_labels() {
    let dir = tempfile::tempdir().unwrap();
    let file = import_bytes("BANK", &sound_bank()).unwrap();

    let descriptor = export_to_directory(dir.path(), &file, &ExportOptions::default()).unwrap();
    let source = std::fs::read_to_string(&descriptor.asm_path).unwrap();

    assert!(source.lines().any(|l| l.starts_with("dw song1 ")));
    assert!(source.lines().any(|l| l.starts_with("dw song0 ")));
    assert!(source.lines().any(|l| l.starts_with("dw $4000,$4000")));
    assert_eq!(descriptor.brr_paths.len(), 2);
    assert_eq!(descriptor.sample_paths.len(), 1);
    assert_eq!(descriptor.instrument_paths.len(), 1);
}

#[test]
fn test_sample_blobs_decode() {
    let file = import_bytes("BANK", &sound_bank()).unwrap();
    let decoded = file.decode_samples();

    assert_eq!(decoded.len(), 2);
    let first = decoded[0].as_ref().unwrap();
    assert_eq!(first.len(), 16);
    assert_eq!(&first[..4], &[0, 0, 1, 2]);
    assert_eq!(file.samples[1].loop_address, Some(0x4009));
}
