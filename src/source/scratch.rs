//! Scratch targets for size measurement.

use std::io::{self, BufWriter, Seek, Write};

use tempfile::NamedTempFile;

use crate::error::{Error, Result};
use crate::options::MeasureMode;

/// Where a builder serializes its candidate part when measuring.
///
/// A temp file is removed when the scratch is dropped, which happens when
/// its builder is finalized or discarded.
#[derive(Debug)]
pub(crate) enum Scratch {
    Memory,
    File(NamedTempFile),
}

impl Scratch {
    pub(crate) fn new(mode: &MeasureMode) -> Result<Self> {
        match mode {
            MeasureMode::InMemory => Ok(Scratch::Memory),
            MeasureMode::TempFile { dir } => {
                let mut builder = tempfile::Builder::new();
                builder.prefix("pdfsplit-measure-").suffix(".pdf");
                let file = match dir {
                    Some(dir) => builder
                        .tempfile_in(dir)
                        .map_err(|e| Error::io_at(dir, e))?,
                    None => builder.tempfile()?,
                };
                log::trace!("Measurement scratch file: {}", file.path().display());
                Ok(Scratch::File(file))
            }
        }
    }

    /// Run `render` against the scratch target and return the bytes written.
    pub(crate) fn measure<F>(&mut self, render: F) -> Result<u64>
    where
        F: FnOnce(&mut dyn Write) -> Result<()>,
    {
        match self {
            Scratch::Memory => {
                let mut counter = ByteCounter::default();
                render(&mut counter)?;
                Ok(counter.written)
            }
            Scratch::File(temp) => {
                let path = temp.path().to_path_buf();
                let file = temp.as_file_mut();
                file.set_len(0).map_err(|e| Error::io_at(&path, e))?;
                file.rewind().map_err(|e| Error::io_at(&path, e))?;
                {
                    let mut writer = BufWriter::new(&mut *file);
                    render(&mut writer)?;
                    writer.flush().map_err(|e| Error::io_at(&path, e))?;
                }
                let len = file.metadata().map_err(|e| Error::io_at(&path, e))?.len();
                Ok(len)
            }
        }
    }
}

/// A sink that only counts.
#[derive(Debug, Default)]
struct ByteCounter {
    written: u64,
}

impl Write for ByteCounter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.written += buf.len() as u64;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
