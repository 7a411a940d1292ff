//! Audio BIN container writer

use std::path::Path;

use crate::END_OF_DATA_ADDRESS;
use crate::error::AbinError;
use crate::model::AudioBinFile;

/// Serialize the model back into a chunk stream
///
/// Chunks are written in file order followed by the end-of-data marker.
/// Chunks that were excluded during import are not written, so the output
/// matches the source only when [`AudioBinFile::is_complete`] holds.
pub fn write_container(file: &AudioBinFile) -> Vec<u8> {
    let mut output = Vec::new();

    for section in file.sections() {
        let payload = section.payload();
        write_u16(&mut output, payload.len() as u16);
        write_u16(&mut output, section.chunk.spc_address);
        output.extend_from_slice(&payload);
    }

    write_u16(&mut output, 0);
    write_u16(&mut output, END_OF_DATA_ADDRESS);
    output
}

/// Write the container to `path`
pub fn write_container_file(path: impl AsRef<Path>, file: &AudioBinFile) -> Result<(), AbinError> {
    std::fs::write(path, write_container(file))?;
    Ok(())
}

fn write_u16(output: &mut Vec<u8>, val: u16) {
    output.extend_from_slice(&val.to_le_bytes());
}
