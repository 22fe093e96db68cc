use std::io::{self, Read, Write};
use std::os::unix::fs::PermissionsExt;
use std::path::Path;

use anyhow::{bail, Context, Result};
use nix::sys::termios::{self, LocalFlags, SetArg, SpecialCharacterIndices, Termios};
use tokio::fs::{self, File};

use crate::abort::AbortSignal;
use crate::cli::{EepromCommand, RangeArgs};
use crate::error::Error;
use crate::hw_trait::EepromDevice;
use crate::tracing::prelude::*;
use crate::transfer::{self, Direction, Progress, Stream, TransferJob};

/// Parse the I2C block size given as command option.
pub fn parse_block_size(option: Option<&str>) -> crate::error::Result<Option<usize>> {
    option
        .map(|value| {
            value
                .parse()
                .map_err(|_| Error::InvalidArgument(format!("Failed to parse block size: {}", value)))
        })
        .transpose()
}

pub async fn run<E: EepromDevice>(
    eeprom: &mut E,
    command: &EepromCommand,
    block_size: Option<usize>,
    abort: &AbortSignal,
) -> Result<()> {
    match command {
        EepromCommand::FullRw => {
            if !confirm("Warning: this will overwrite the EEPROM data.\nContinue ? [N/y] ")? {
                eprintln!("aborted");
                bail!("EEPROM test declined");
            }
            if let Some(size) = block_size {
                eeprom.set_block_size(size);
            }
            info!("EEPROM size: {}", eeprom.capacity());
            info!("I2C block size: {}", eeprom.block_size());
            transfer::self_test(eeprom).await?;
            info!("All good.");
            Ok(())
        }
        EepromCommand::E2f { file, range } => {
            let job = build_job(Direction::DeviceToSink, eeprom, range, block_size, false);
            match file {
                Some(path) => eeprom_to_file(eeprom, &job, path, abort).await,
                None => {
                    let mut stdout = tokio::io::stdout();
                    run_job(eeprom, &job, Stream::Sink(&mut stdout), abort).await
                }
            }
        }
        EepromCommand::F2e { file, range, pad } => {
            let job = build_job(Direction::SourceToDevice, eeprom, range, block_size, *pad);
            match file {
                Some(path) => {
                    let mut source = File::open(path)
                        .await
                        .with_context(|| format!("failed to open the file ({})", path.display()))?;
                    run_job(eeprom, &job, Stream::Source(&mut source), abort).await
                }
                None => {
                    let mut stdin = tokio::io::stdin();
                    run_job(eeprom, &job, Stream::Source(&mut stdin), abort).await
                }
            }
        }
    }
}

fn build_job<E: EepromDevice>(
    direction: Direction,
    eeprom: &E,
    range: &RangeArgs,
    block_size: Option<usize>,
    zero_padding: bool,
) -> TransferJob {
    let total = range
        .size
        .unwrap_or_else(|| eeprom.capacity().saturating_sub(range.skip));

    let mut job = TransferJob::new(direction, total);
    job.skip_offset = range.skip;
    job.device_block_size = block_size;
    job.zero_padding = zero_padding;
    job
}

async fn eeprom_to_file<E: EepromDevice>(
    eeprom: &mut E,
    job: &TransferJob,
    path: &Path,
    abort: &AbortSignal,
) -> Result<()> {
    let mut file = File::create(path)
        .await
        .with_context(|| format!("failed to open the file ({})", path.display()))?;

    let result = run_job(eeprom, job, Stream::Sink(&mut file), abort).await;

    // Read-only even when the transfer failed
    if let Err(e) = fs::set_permissions(path, std::fs::Permissions::from_mode(0o444)).await {
        warn!("chmod failed: {}", e);
    }

    result
}

async fn run_job<E: EepromDevice>(
    eeprom: &mut E,
    job: &TransferJob,
    stream: Stream<'_>,
    abort: &AbortSignal,
) -> Result<()> {
    let verb = job.direction.verb();
    let result = transfer::transfer(job, eeprom, stream, abort, |progress: Progress| {
        eprint!("\r{} EEPROM... {}% ({})", verb, progress.percent, progress.bytes);
    })
    .await;
    eprintln!();

    let moved = result?;
    debug!(moved, "EEPROM transfer done");
    Ok(())
}

// Stdin in non-canonical, no-echo mode until dropped.
struct RawStdin {
    original: Option<Termios>,
}

impl RawStdin {
    fn enable() -> Self {
        let stdin = io::stdin();
        let original = match termios::tcgetattr(&stdin) {
            Ok(original) => original,
            Err(e) => {
                warn!("failed to disable input buffering: {}", e);
                return Self { original: None };
            }
        };

        let mut raw = original.clone();
        raw.local_flags.remove(LocalFlags::ICANON | LocalFlags::ECHO);
        raw.control_chars[SpecialCharacterIndices::VMIN as usize] = 1;
        raw.control_chars[SpecialCharacterIndices::VTIME as usize] = 0;

        if let Err(e) = termios::tcsetattr(&stdin, SetArg::TCSANOW, &raw) {
            warn!("failed to disable input buffering: {}", e);
            return Self { original: None };
        }

        Self {
            original: Some(original),
        }
    }
}

impl Drop for RawStdin {
    fn drop(&mut self) {
        if let Some(original) = &self.original {
            if let Err(e) = termios::tcsetattr(io::stdin(), SetArg::TCSANOW, original) {
                warn!("failed to restore input buffering: {}", e);
            }
        }
    }
}

/// Ask a yes/no question on stderr and read a single key; only `y` agrees.
fn confirm(prompt: &str) -> Result<bool> {
    let _raw = RawStdin::enable();

    let mut stderr = io::stderr();
    stderr.write_all(prompt.as_bytes())?;
    stderr.flush()?;

    let mut key = [0u8; 1];
    let n = io::stdin().read(&mut key)?;
    eprintln!();

    Ok(n == 1 && key[0] == b'y')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hw_trait::fake::FakeEeprom;
    use test_case::test_case;

    #[test_case(None => Some(None))]
    #[test_case(Some("32") => Some(Some(32)))]
    #[test_case(Some("big") => None)]
    fn test_parse_block_size(option: Option<&str>) -> Option<Option<usize>> {
        parse_block_size(option).ok()
    }

    #[test]
    fn test_job_defaults_to_rest_of_eeprom() {
        let eeprom = FakeEeprom::new(1024);
        let range = RangeArgs { skip: 24, size: None };

        let job = build_job(Direction::DeviceToSink, &eeprom, &range, Some(16), false);

        assert_eq!(job.total_size, 1000);
        assert_eq!(job.skip_offset, 24);
        assert_eq!(job.device_block_size, Some(16));
    }

    #[tokio::test]
    async fn test_dump_to_file_is_read_only() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("eeprom.bin");
        let mut eeprom = FakeEeprom::new(512);
        eeprom.data[0] = 0xA5;

        let command = EepromCommand::E2f {
            file: Some(path.clone()),
            range: RangeArgs { skip: 0, size: None },
        };
        run(&mut eeprom, &command, None, &AbortSignal::new()).await.unwrap();

        let data = std::fs::read(&path).unwrap();
        assert_eq!(data.len(), 512);
        assert_eq!(data[0], 0xA5);
        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o444);
    }

    #[tokio::test]
    async fn test_file_to_eeprom_with_padding() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("image.bin");
        std::fs::write(&path, [0x11u8; 100]).unwrap();
        let mut eeprom = FakeEeprom::new(512);

        let command = EepromCommand::F2e {
            file: Some(path),
            range: RangeArgs {
                skip: 0,
                size: Some(200),
            },
            pad: true,
        };
        run(&mut eeprom, &command, None, &AbortSignal::new()).await.unwrap();

        assert!(eeprom.data[..100].iter().all(|b| *b == 0x11));
        assert!(eeprom.data[100..200].iter().all(|b| *b == 0));
        assert!(eeprom.data[200..].iter().all(|b| *b == 0xFF));
    }

    #[tokio::test]
    async fn test_missing_input_file() {
        let mut eeprom = FakeEeprom::new(512);
        let command = EepromCommand::F2e {
            file: Some("/nonexistent/image.bin".into()),
            range: RangeArgs { skip: 0, size: None },
            pad: false,
        };

        assert!(run(&mut eeprom, &command, None, &AbortSignal::new()).await.is_err());
        assert!(eeprom.data.iter().all(|b| *b == 0xFF));
    }
}
