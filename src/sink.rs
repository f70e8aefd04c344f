//! Destinations for finalized parts.

use std::fs;
use std::ops::Range;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use crate::error::{Error, Result};
use crate::options::PublishMode;
use crate::partition::Part;

/// Receives finalized parts in sequence order.
pub trait PartSink {
    /// Take ownership of the next part.
    fn accept(&mut self, part: Part) -> Result<()>;

    /// Called once after the last part.
    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

impl PartSink for Vec<Part> {
    fn accept(&mut self, part: Part) -> Result<()> {
        self.push(part);
        Ok(())
    }
}

/// File name of a part: `{base}_part_{sequence}.{extension}`.
///
/// # Example
///
/// ```
/// use pdfsplit::sink::part_file_name;
///
/// assert_eq!(part_file_name("report", 3, Some("pdf")), "report_part_3.pdf");
/// assert_eq!(part_file_name("report", 1, None), "report_part_1");
/// ```
pub fn part_file_name(base: &str, sequence: u32, extension: Option<&str>) -> String {
    match extension {
        Some(ext) if !ext.is_empty() => format!("{}_part_{}.{}", base, sequence, ext),
        _ => format!("{}_part_{}", base, sequence),
    }
}

/// A part written to disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenPart {
    /// Sequence number
    pub sequence: u32,
    /// Final location of the part
    pub path: PathBuf,
    /// Size in bytes
    pub bytes: u64,
    /// Zero-based page indices covered
    pub pages: Range<usize>,
}

/// Writes parts as files into one directory.
///
/// With [`PublishMode::Atomic`] parts go to a hidden staging directory
/// inside the output directory and are renamed into place by
/// [`finish`](PartSink::finish). Dropping the sink before that removes the
/// staging directory and everything in it. If a rename fails during
/// `finish`, parts already moved into place are removed again; a file that
/// a rename replaced is not restored.
#[derive(Debug)]
pub struct DirectorySink {
    dir: PathBuf,
    base_name: String,
    extension: Option<String>,
    mode: PublishMode,
    staging: Option<TempDir>,
    written: Vec<WrittenPart>,
    prepared: bool,
}

impl DirectorySink {
    /// Create a sink writing `{base_name}_part_{n}.{extension}` files into `dir`.
    pub fn new(
        dir: impl Into<PathBuf>,
        base_name: impl Into<String>,
        extension: Option<String>,
    ) -> Self {
        Self {
            dir: dir.into(),
            base_name: base_name.into(),
            extension,
            mode: PublishMode::Immediate,
            staging: None,
            written: Vec::new(),
            prepared: false,
        }
    }

    /// Create a sink named after an input file (its stem and extension).
    pub fn for_input(dir: impl Into<PathBuf>, input: &Path) -> Self {
        let base = input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document".to_string());
        let extension = input
            .extension()
            .map(|e| e.to_string_lossy().into_owned());
        Self::new(dir, base, extension)
    }

    /// Set the publish mode.
    pub fn with_mode(mut self, mode: PublishMode) -> Self {
        self.mode = mode;
        self
    }

    /// Output directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Parts written so far. In atomic mode the paths are where the parts
    /// will be once published.
    pub fn written(&self) -> &[WrittenPart] {
        &self.written
    }

    fn file_name(&self, sequence: u32) -> String {
        part_file_name(&self.base_name, sequence, self.extension.as_deref())
    }

    fn prepare(&mut self) -> Result<()> {
        if self.prepared {
            return Ok(());
        }
        fs::create_dir_all(&self.dir).map_err(|e| Error::io_at(&self.dir, e))?;
        if self.mode == PublishMode::Atomic {
            let staging = tempfile::Builder::new()
                .prefix(&format!(".{}_staging", self.base_name))
                .tempdir_in(&self.dir)
                .map_err(|e| Error::io_at(&self.dir, e))?;
            log::debug!("Staging parts in {}", staging.path().display());
            self.staging = Some(staging);
        }
        self.prepared = true;
        Ok(())
    }
}

impl PartSink for DirectorySink {
    fn accept(&mut self, part: Part) -> Result<()> {
        self.prepare()?;

        let name = self.file_name(part.sequence);
        let target = match &self.staging {
            Some(staging) => staging.path().join(&name),
            None => self.dir.join(&name),
        };
        fs::write(&target, &part.content).map_err(|e| Error::io_at(&target, e))?;
        log::debug!("Wrote {} ({} bytes)", target.display(), part.size());

        self.written.push(WrittenPart {
            sequence: part.sequence,
            path: self.dir.join(name),
            bytes: part.size(),
            pages: part.pages,
        });
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        let Some(staging) = self.staging.take() else {
            return Ok(());
        };
        let mut published: Vec<&Path> = Vec::with_capacity(self.written.len());
        for part in &self.written {
            let name = self.file_name(part.sequence);
            let staged = staging.path().join(&name);
            if let Err(e) = fs::rename(&staged, &part.path) {
                for path in published {
                    if let Err(undo) = fs::remove_file(path) {
                        log::warn!("Could not withdraw {}: {}", path.display(), undo);
                    }
                }
                return Err(Error::io_at(&part.path, e));
            }
            published.push(&part.path);
        }
        log::debug!(
            "Published {} parts into {}",
            self.written.len(),
            self.dir.display()
        );
        staging.close().map_err(|e| Error::io_at(&self.dir, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn part(sequence: u32, pages: Range<usize>) -> Part {
        Part::new(sequence, pages, vec![b'x'; 16])
    }

    #[test]
    fn test_part_file_name() {
        assert_eq!(part_file_name("scan", 1, Some("pdf")), "scan_part_1.pdf");
        assert_eq!(part_file_name("scan", 12, Some("PDF")), "scan_part_12.PDF");
        assert_eq!(part_file_name("scan", 2, Some("")), "scan_part_2");
    }

    #[test]
    fn test_for_input_uses_stem_and_extension() {
        let sink = DirectorySink::for_input("/out", Path::new("/in/annual report.pdf"));
        assert_eq!(sink.file_name(4), "annual report_part_4.pdf");
    }

    #[test]
    fn test_vec_sink_collects_in_order() {
        let mut parts: Vec<Part> = Vec::new();
        parts.accept(part(1, 0..2)).unwrap();
        parts.accept(part(2, 2..3)).unwrap();
        parts.finish().unwrap();
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[1].sequence, 2);
    }

    #[test]
    fn test_immediate_writes_each_part() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("nested/out");
        let mut sink = DirectorySink::new(&out, "doc", Some("pdf".into()));

        sink.accept(part(1, 0..3)).unwrap();
        assert!(out.join("doc_part_1.pdf").exists());
        sink.accept(part(2, 3..4)).unwrap();
        sink.finish().unwrap();

        assert_eq!(sink.written().len(), 2);
        assert_eq!(sink.written()[1].path, out.join("doc_part_2.pdf"));
        assert_eq!(sink.written()[1].bytes, 16);
    }

    #[test]
    fn test_atomic_publishes_on_finish() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = DirectorySink::new(dir.path(), "doc", Some("pdf".into()))
            .with_mode(PublishMode::Atomic);

        sink.accept(part(1, 0..1)).unwrap();
        sink.accept(part(2, 1..2)).unwrap();
        assert!(!dir.path().join("doc_part_1.pdf").exists());

        sink.finish().unwrap();
        assert!(dir.path().join("doc_part_1.pdf").exists());
        assert!(dir.path().join("doc_part_2.pdf").exists());
        // Only the two parts remain; the staging directory is gone.
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 2);
    }

    #[test]
    fn test_atomic_drop_leaves_nothing() {
        let dir = tempfile::tempdir().unwrap();
        {
            let mut sink = DirectorySink::new(dir.path(), "doc", Some("pdf".into()))
                .with_mode(PublishMode::Atomic);
            sink.accept(part(1, 0..1)).unwrap();
        }
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_atomic_failed_publish_withdraws_parts() {
        let dir = tempfile::tempdir().unwrap();
        // A non-empty directory where part 2 should land blocks its rename.
        let blocker = dir.path().join("doc_part_2.pdf");
        fs::create_dir(&blocker).unwrap();
        fs::write(blocker.join("keep"), b"x").unwrap();

        let mut sink = DirectorySink::new(dir.path(), "doc", Some("pdf".into()))
            .with_mode(PublishMode::Atomic);
        sink.accept(part(1, 0..1)).unwrap();
        sink.accept(part(2, 1..2)).unwrap();
        sink.accept(part(3, 2..3)).unwrap();

        let err = sink.finish().unwrap_err();
        assert!(err.to_string().contains("doc_part_2.pdf"));
        assert!(!dir.path().join("doc_part_1.pdf").exists());
        assert!(!dir.path().join("doc_part_3.pdf").exists());
        // Only the blocking directory is left; staging is gone.
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }
}
