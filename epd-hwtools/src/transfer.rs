//! EEPROM transfers.
//!
//! Bounded, chunked copies between an [`EepromDevice`] and a host byte
//! stream, and a write/read-back self test.
//!
//! A transfer moves `total_size` bytes starting at `skip_offset` in chunks of
//! at most [`TRANSFER_BLOCK_SIZE`] bytes. The abort signal is checked before
//! every chunk, never during one, and progress is reported after each chunk
//! has been committed to its destination. When writing, the source may run
//! dry before `total_size`; the rest of the range is then either filled with
//! zeros or left untouched.

use std::io;

use sha2::{Digest, Sha256};
use time::OffsetDateTime;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::abort::AbortSignal;
use crate::error::{Error, Result};
use crate::hw_trait::EepromDevice;
use crate::tracing::prelude::*;

/// Largest chunk moved between two abort checks
pub const TRANSFER_BLOCK_SIZE: usize = 4096;

/// Largest chunk of zero padding
pub const PAD_BLOCK_SIZE: usize = 64;

/// Bytes of context dumped around a self-test mismatch
const DUMP_WINDOW: usize = 256;

const HEX_DUMP_WIDTH: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// EEPROM to host sink
    DeviceToSink,
    /// Host source to EEPROM
    SourceToDevice,
}

impl Direction {
    pub fn verb(&self) -> &'static str {
        match self {
            Direction::DeviceToSink => "Reading",
            Direction::SourceToDevice => "Writing",
        }
    }
}

/// Parameters of one transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferJob {
    pub direction: Direction,
    pub total_size: usize,
    pub skip_offset: usize,
    pub block_size: usize,
    /// I2C transaction size forwarded to the device
    pub device_block_size: Option<usize>,
    pub device_page_size: Option<usize>,
    /// Fill the rest of the range with zeros when the source ends early
    pub zero_padding: bool,
}

impl TransferJob {
    pub fn new(direction: Direction, total_size: usize) -> Self {
        Self {
            direction,
            total_size,
            skip_offset: 0,
            block_size: TRANSFER_BLOCK_SIZE,
            device_block_size: None,
            device_page_size: None,
            zero_padding: false,
        }
    }

    fn validate(&self, capacity: usize) -> Result<()> {
        if self.total_size == 0 {
            return Err(Error::InvalidArgument("transfer size is 0".into()));
        }

        let end = self.skip_offset.checked_add(self.total_size);
        if end.map_or(true, |end| end > capacity) {
            return Err(Error::InvalidArgument(format!(
                "{} bytes at offset {} exceed EEPROM capacity {}",
                self.total_size, self.skip_offset, capacity
            )));
        }

        Ok(())
    }
}

/// Transfer progress after a committed chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub percent: usize,
    pub bytes: usize,
}

impl Progress {
    fn new(moved: usize, total: usize) -> Self {
        Self {
            percent: progress_percent(moved, total),
            bytes: moved,
        }
    }
}

/// Whole percentage of `total` done, rounded down.
pub fn progress_percent(moved: usize, total: usize) -> usize {
    if total == 0 {
        return 100;
    }
    moved.saturating_mul(100) / total
}

/// Host side of a transfer, matching the job direction.
pub enum Stream<'a> {
    Sink(&'a mut (dyn AsyncWrite + Unpin)),
    Source(&'a mut (dyn AsyncRead + Unpin)),
}

/// Run `job`, returning the number of bytes moved.
///
/// `progress` is called after every committed chunk. When `abort` is raised
/// the transfer stops before the next chunk with
/// [`Error::TransferAborted`]; the chunks already moved stay where they are.
pub async fn transfer<E, F>(
    job: &TransferJob,
    eeprom: &mut E,
    stream: Stream<'_>,
    abort: &AbortSignal,
    mut progress: F,
) -> Result<usize>
where
    E: EepromDevice + ?Sized,
    F: FnMut(Progress),
{
    job.validate(eeprom.capacity())?;

    if let Some(size) = job.device_block_size {
        eeprom.set_block_size(size);
    }
    if let Some(size) = job.device_page_size {
        eeprom.set_page_size(size);
    }
    eeprom.seek(job.skip_offset);

    debug!(
        direction = ?job.direction,
        size = job.total_size,
        skip = job.skip_offset,
        pad = job.zero_padding,
        "EEPROM transfer"
    );

    match (job.direction, stream) {
        (Direction::DeviceToSink, Stream::Sink(sink)) => {
            read_to_sink(job, eeprom, sink, abort, &mut progress).await
        }
        (Direction::SourceToDevice, Stream::Source(source)) => {
            write_from_source(job, eeprom, source, abort, &mut progress).await
        }
        _ => Err(Error::InvalidArgument(
            "host stream does not match transfer direction".into(),
        )),
    }
}

// Bus transfers never suspend, so yield to let the interrupt listener run
// on a current-thread runtime.
async fn check_abort(abort: &AbortSignal, moved: usize) -> Result<()> {
    tokio::task::yield_now().await;
    if abort.is_set() {
        debug!(moved, "EEPROM transfer aborted");
        return Err(Error::TransferAborted { bytes_moved: moved });
    }
    Ok(())
}

async fn read_to_sink<E, F>(
    job: &TransferJob,
    eeprom: &mut E,
    sink: &mut (dyn AsyncWrite + Unpin),
    abort: &AbortSignal,
    progress: &mut F,
) -> Result<usize>
where
    E: EepromDevice + ?Sized,
    F: FnMut(Progress),
{
    let result = copy_to_sink(job, eeprom, sink, abort, progress).await;

    // Committed chunks reach the sink on every exit path
    let flushed = sink.flush().await;
    let moved = result?;
    flushed?;
    Ok(moved)
}

async fn copy_to_sink<E, F>(
    job: &TransferJob,
    eeprom: &mut E,
    sink: &mut (dyn AsyncWrite + Unpin),
    abort: &AbortSignal,
    progress: &mut F,
) -> Result<usize>
where
    E: EepromDevice + ?Sized,
    F: FnMut(Progress),
{
    let total = job.total_size;
    let block_size = job.block_size.max(1);
    let mut buffer = vec![0u8; block_size.min(total)];
    let mut moved = 0;

    while moved < total {
        check_abort(abort, moved).await?;

        let chunk = (total - moved).min(block_size);
        let n = eeprom.read(&mut buffer[..chunk]).await?;
        if n != chunk {
            return Err(Error::Io(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("short EEPROM read: {} of {} bytes", n, chunk),
            )));
        }

        sink.write_all(&buffer[..chunk]).await?;
        moved += chunk;
        progress(Progress::new(moved, total));
    }

    Ok(moved)
}

async fn write_from_source<E, F>(
    job: &TransferJob,
    eeprom: &mut E,
    source: &mut (dyn AsyncRead + Unpin),
    abort: &AbortSignal,
    progress: &mut F,
) -> Result<usize>
where
    E: EepromDevice + ?Sized,
    F: FnMut(Progress),
{
    let total = job.total_size;
    let block_size = job.block_size.max(1);
    let mut buffer = vec![0u8; block_size.min(total)];
    let mut moved = 0;
    let mut exhausted = false;

    while moved < total {
        check_abort(abort, moved).await?;

        let chunk = (total - moved).min(block_size);
        let n = fill(source, &mut buffer[..chunk]).await?;
        if n > 0 {
            eeprom.write(&buffer[..n]).await?;
            moved += n;
            progress(Progress::new(moved, total));
        }

        if n < chunk {
            exhausted = true;
            break;
        }
    }

    if !exhausted {
        return Ok(moved);
    }

    if !job.zero_padding {
        debug!(moved, "End of input");
        return Ok(moved);
    }

    debug!(pad = total - moved, "Padding with zeros");
    let zeros = [0u8; PAD_BLOCK_SIZE];
    while moved < total {
        check_abort(abort, moved).await?;

        let chunk = (total - moved).min(PAD_BLOCK_SIZE);
        eeprom.write(&zeros[..chunk]).await?;
        moved += chunk;
        progress(Progress::new(moved, total));
    }

    Ok(moved)
}

// Read until `buffer` is full or the source ends.
async fn fill(source: &mut (dyn AsyncRead + Unpin), buffer: &mut [u8]) -> Result<usize> {
    let mut filled = 0;
    while filled < buffer.len() {
        let n = source.read(&mut buffer[filled..]).await?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}

/// Write random data to the whole EEPROM, read it back and compare.
///
/// The data is seeded from the current time; see [`self_test_seeded`].
pub async fn self_test<E: EepromDevice + ?Sized>(eeprom: &mut E) -> Result<()> {
    let seed = OffsetDateTime::now_utc().unix_timestamp_nanos() as u64;
    self_test_seeded(eeprom, seed).await
}

/// Self test with a fixed seed.
///
/// Returns [`Error::VerificationMismatch`] with the first offset that did
/// not read back as written. The EEPROM contents are lost either way.
pub async fn self_test_seeded<E: EepromDevice + ?Sized>(eeprom: &mut E, seed: u64) -> Result<()> {
    let size = eeprom.capacity();
    let written = random_bytes(seed, size);

    info!("Writing {} bytes...", size);
    eeprom.seek(0);
    eeprom.write(&written).await?;

    info!("Reading {} bytes...", size);
    eeprom.seek(0);
    let mut read = vec![0u8; size];
    let n = eeprom.read(&mut read).await?;
    if n != size {
        return Err(Error::Io(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            format!("short EEPROM read: {} of {} bytes", n, size),
        )));
    }

    let head = size.min(DUMP_WINDOW);
    log_dump("Data written", &written[..head], 0);
    log_dump("Data read", &read[..head], 0);

    if let Some(offset) = first_mismatch(&written, &read) {
        error!("Data mismatch at offset 0x{:04X}", offset);
        let start = offset.saturating_sub(DUMP_WINDOW / 2);
        let end = (start + DUMP_WINDOW).min(size);
        log_dump("Expected", &written[start..end], start);
        log_dump("Actual", &read[start..end], start);
        return Err(Error::VerificationMismatch { offset });
    }

    info!("Data verified OK");
    Ok(())
}

fn first_mismatch(expected: &[u8], actual: &[u8]) -> Option<usize> {
    expected.iter().zip(actual).position(|(a, b)| a != b)
}

// SHA-256 in counter mode
fn random_bytes(seed: u64, len: usize) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(len + 32);
    let mut counter: u64 = 0;
    while bytes.len() < len {
        let mut hasher = Sha256::new();
        hasher.update(seed.to_le_bytes());
        hasher.update(counter.to_le_bytes());
        bytes.extend_from_slice(&hasher.finalize());
        counter += 1;
    }
    bytes.truncate(len);
    bytes
}

fn log_dump(title: &str, data: &[u8], base: usize) {
    info!("{}:", title);
    for line in hex_dump(data, base) {
        info!("{}", line);
    }
}

/// Format `data` as hex lines of 16 bytes prefixed with their offset.
pub fn hex_dump(data: &[u8], base: usize) -> Vec<String> {
    data.chunks(HEX_DUMP_WIDTH)
        .enumerate()
        .map(|(i, line)| {
            let bytes: Vec<String> = line.iter().map(|b| format!("{:02X}", b)).collect();
            format!("{:04X}: {}", base + i * HEX_DUMP_WIDTH, bytes.join(" "))
        })
        .collect()
}
