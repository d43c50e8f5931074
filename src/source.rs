//! Decoding Arrow IPC streams into record batches.
//!
//! Framing only: compression and transport are left to the caller.

use std::io::Cursor;

use arrow_array::RecordBatch;
use arrow_ipc::reader::StreamReader;
use log::debug;

use crate::ConvertError;

/// Decode every batch of an Arrow IPC stream.
///
/// # Errors
/// Returns `ConvertError::Arrow` if the stream is malformed.
pub fn read_ipc_stream(bytes: &[u8]) -> Result<Vec<RecordBatch>, ConvertError> {
    let reader = StreamReader::try_new(Cursor::new(bytes), None)?;
    let batches = reader.collect::<Result<Vec<_>, _>>()?;
    debug!("decoded {} batches from {} IPC bytes", batches.len(), bytes.len());
    Ok(batches)
}

/// Lazily decoding reader over an owned IPC stream.
pub(crate) fn ipc_stream(bytes: Vec<u8>) -> Result<StreamReader<Cursor<Vec<u8>>>, ConvertError> {
    let len = bytes.len();
    let reader = StreamReader::try_new(Cursor::new(bytes), None)?;
    debug!(
        "opened IPC stream of {len} bytes with {} columns",
        reader.schema().fields().len()
    );
    Ok(reader)
}

#[cfg(test)]
pub(crate) mod test_util {
    use arrow_array::RecordBatch;
    use arrow_ipc::writer::StreamWriter;

    /// Encode `batches` as one IPC stream.
    pub(crate) fn to_ipc(batches: &[RecordBatch]) -> Vec<u8> {
        let mut buf = Vec::new();
        let schema = batches[0].schema();
        let mut writer = StreamWriter::try_new(&mut buf, &schema).unwrap();
        for batch in batches {
            writer.write(batch).unwrap();
        }
        writer.finish().unwrap();
        drop(writer);
        buf
    }
}
