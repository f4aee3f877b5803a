//! Error taxonomy for snapshot extraction.
//!
//! Errors fall into two propagation classes:
//!
//! - **Structural**: the archive or an entry cannot be opened or read, or
//!   the header record is malformed. These abort the extraction and are
//!   returned from [`Reader::extract`](crate::Reader::extract).
//! - **Per-line**: everything else. These are wrapped with the offending
//!   line ([`SnapshotError::Line`]) and forwarded to the caller's error
//!   sink while processing continues.

use std::num::ParseIntError;

use thiserror::Error;

/// Error returned by a record sink method.
pub type SinkError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, SnapshotError>;

#[derive(Debug, Error)]
pub enum SnapshotError {
    /// Archive or entry I/O failed. Fatal to the extraction.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The archive is not a readable ZIP. Fatal to the extraction.
    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// The header record is malformed. Fatal: the header anchors every
    /// fixed offset in the entry and cannot be recovered.
    #[error("header format error: {0}")]
    Format(String),

    /// A fixed-width integer field did not parse, after any applicable
    /// leading-zero repair.
    #[error("error reading {field}: {source}")]
    IntegerField {
        field: &'static str,
        source: ParseIntError,
    },

    /// A declared variable-section length overruns the physical line.
    #[error("{field} of {declared} bytes overruns line with {available} bytes remaining")]
    Bounds {
        field: &'static str,
        declared: usize,
        available: usize,
    },

    /// The line is too short to carry a discriminator byte.
    #[error("line too short to classify ({0} bytes)")]
    ShortLine(usize),

    /// Classification failed and the repair heuristic could not resolve it.
    #[error("unhandled record")]
    UnhandledRecord,

    /// The trailer's declared record count disagrees with the number of
    /// company and person records dispatched for the entry.
    #[error("unexpected number of records: trailer declares {declared}, counted {counted}")]
    CountMismatch { declared: u64, counted: u64 },

    /// A record sink rejected a record.
    #[error("record sink error: {0}")]
    Sink(SinkError),

    /// A per-line error carrying the offending line text.
    #[error("error: {source} handling line: {line}")]
    Line {
        line: String,
        #[source]
        source: Box<SnapshotError>,
    },
}

impl SnapshotError {
    /// Attach the offending line to a per-line error before it reaches the
    /// error sink.
    pub fn for_line(line: &[u8], source: SnapshotError) -> SnapshotError {
        SnapshotError::Line {
            line: String::from_utf8_lossy(line).into_owned(),
            source: Box::new(source),
        }
    }
}
