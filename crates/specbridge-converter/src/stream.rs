//! Chunked reads and writes that observe cancellation between chunks.

use std::io::{ErrorKind, Read, Write};

use crate::context::{Context, Meter};
use crate::error::ConvertError;

/// Streaming chunk size; cancellation is re-checked at each boundary.
pub const CHUNK_SIZE: usize = 64 * 1024;

/// Read `input` to the end into `buf`, returning the byte count.
pub(crate) fn read_chunked(
    ctx: &Context,
    meter: &mut Meter<'_>,
    input: &mut dyn Read,
    buf: &mut Vec<u8>,
) -> Result<u64, ConvertError> {
    let mut chunk = vec![0u8; CHUNK_SIZE];
    let mut read = 0u64;
    loop {
        ctx.check()?;
        let n = match input.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        };
        buf.extend_from_slice(&chunk[..n]);
        read += n as u64;
        meter.advance(n);
    }
    Ok(read)
}

/// Write `bytes` in chunks, stopping before the next chunk once cancelled.
pub(crate) fn write_chunked(
    ctx: &Context,
    meter: &mut Meter<'_>,
    output: &mut dyn Write,
    bytes: &[u8],
) -> Result<u64, ConvertError> {
    let mut written = 0u64;
    for chunk in bytes.chunks(CHUNK_SIZE) {
        ctx.check()?;
        output.write_all(chunk)?;
        written += chunk.len() as u64;
        meter.advance(chunk.len());
    }
    output.flush()?;
    Ok(written)
}
