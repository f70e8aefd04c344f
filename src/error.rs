//! Error types for pdfsplit library.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for pdfsplit operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while splitting a document.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error when reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// I/O error tied to a specific file or directory.
    #[error("I/O error at {}: {source}", path.display())]
    IoAt {
        /// The file or directory being accessed.
        path: PathBuf,
        /// The underlying error.
        source: io::Error,
    },

    /// The input document does not exist.
    #[error("Input document not found: {}", .0.display())]
    NotFound(PathBuf),

    /// The input is not recognized as PDF.
    #[error("Unknown file format: not a valid PDF")]
    UnknownFormat,

    /// The PDF version is not supported.
    #[error("Unsupported PDF version: {0}")]
    UnsupportedVersion(String),

    /// Error parsing PDF structure.
    #[error("PDF parsing error: {0}")]
    PdfParse(String),

    /// The PDF document is encrypted.
    #[error("Document is encrypted")]
    Encrypted,

    /// Page index is out of range.
    #[error("Page index {0} is out of range (document has {1} pages)")]
    PageOutOfRange(usize, usize),

    /// The part serializer failed.
    #[error("Serialization error: {0}")]
    Serialize(String),

    /// The size threshold is unusable.
    #[error("Invalid size threshold: {0}")]
    InvalidThreshold(String),

    /// A required setting was not supplied.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The run was cancelled through its cancel flag.
    #[error("Cancelled before page index {page}")]
    Cancelled {
        /// Index of the page that was about to be processed.
        page: usize,
    },

    /// A failure raised while loading a document.
    #[error("{document}: {source}")]
    AtDocument {
        /// Path or name of the document.
        document: String,
        /// The underlying error.
        source: Box<Error>,
    },

    /// A failure raised while processing one page of a document.
    #[error("{document}: failed at page index {page}: {source}")]
    AtPage {
        /// Name of the document being split.
        document: String,
        /// Zero-based index of the page being processed.
        page: usize,
        /// The underlying error.
        source: Box<Error>,
    },
}

/// Coarse classification of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The source document cannot be located or parsed.
    Input,
    /// No input document or output location was supplied, or a setting is invalid.
    Configuration,
    /// A read, scratch write, or part write failed at the storage layer.
    Io,
    /// The caller cancelled the run.
    Cancelled,
}

impl Error {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Io(_) | Error::IoAt { .. } | Error::Serialize(_) => ErrorKind::Io,
            Error::NotFound(_)
            | Error::UnknownFormat
            | Error::UnsupportedVersion(_)
            | Error::PdfParse(_)
            | Error::Encrypted
            | Error::PageOutOfRange(..) => ErrorKind::Input,
            Error::InvalidThreshold(_) | Error::Config(_) => ErrorKind::Configuration,
            Error::Cancelled { .. } => ErrorKind::Cancelled,
            Error::AtDocument { source, .. } | Error::AtPage { source, .. } => source.kind(),
        }
    }

    /// Page index this error is attached to, if any.
    pub fn page(&self) -> Option<usize> {
        match self {
            Error::AtPage { page, .. } | Error::Cancelled { page } => Some(*page),
            _ => None,
        }
    }

    /// Attach the document identity, unless the error already names a path.
    pub(crate) fn in_document(self, document: &str) -> Self {
        match self {
            Error::NotFound(_) | Error::IoAt { .. } | Error::AtDocument { .. } => self,
            other => Error::AtDocument {
                document: document.to_string(),
                source: Box::new(other),
            },
        }
    }

    pub(crate) fn io_at(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Error::IoAt {
            path: path.into(),
            source,
        }
    }
}

impl From<lopdf::Error> for Error {
    fn from(err: lopdf::Error) -> Self {
        match err {
            lopdf::Error::IO(e) => Error::Io(e),
            lopdf::Error::Decryption(_) => Error::Encrypted,
            _ => Error::PdfParse(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::Encrypted;
        assert_eq!(err.to_string(), "Document is encrypted");

        let err = Error::PageOutOfRange(10, 5);
        assert_eq!(
            err.to_string(),
            "Page index 10 is out of range (document has 5 pages)"
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
        assert_eq!(err.kind(), ErrorKind::Io);
    }

    #[test]
    fn test_kind_classification() {
        assert_eq!(Error::UnknownFormat.kind(), ErrorKind::Input);
        assert_eq!(Error::PdfParse("bad xref".into()).kind(), ErrorKind::Input);
        assert_eq!(Error::Config("no input".into()).kind(), ErrorKind::Configuration);
        assert_eq!(
            Error::InvalidThreshold("0".into()).kind(),
            ErrorKind::Configuration
        );
        assert_eq!(Error::Cancelled { page: 3 }.kind(), ErrorKind::Cancelled);
    }

    #[test]
    fn test_page_context_keeps_source_kind() {
        let err = Error::AtPage {
            document: "report.pdf".into(),
            page: 4,
            source: Box::new(Error::io_at(
                "/tmp/out/report_part_2.pdf",
                io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
            )),
        };
        assert_eq!(err.kind(), ErrorKind::Io);
        assert_eq!(err.page(), Some(4));
        let message = err.to_string();
        assert!(message.starts_with("report.pdf: failed at page index 4"));
        assert!(message.contains("report_part_2.pdf"));
    }

    #[test]
    fn test_document_context() {
        let err = Error::PdfParse("invalid start value".into()).in_document("/data/q3.pdf");
        assert_eq!(err.kind(), ErrorKind::Input);
        assert_eq!(err.to_string(), "/data/q3.pdf: PDF parsing error: invalid start value");

        // Errors that already carry a path are left alone.
        let err = Error::NotFound("/data/q3.pdf".into()).in_document("/data/q3.pdf");
        assert!(matches!(err, Error::NotFound(_)));
    }
}
