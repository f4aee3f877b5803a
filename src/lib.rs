//! # snapdat
//!
//! Decoder for the Companies House officers snapshot: a ZIP archive of
//! fixed-width, positional text files listing every company and officer
//! appointment on the register.
//!
//! ## Format
//!
//! Each archive entry is line-oriented:
//! - a header line (`DDDDSNAP`, run number, production date),
//! - company and person lines distinguished by a discriminator byte,
//!   each a block of fixed-offset fields followed by a variable-length
//!   section split on `<`,
//! - a trailer line declaring how many records the entry holds.
//!
//! Real snapshots are imperfect: some lines are missing a leading zero
//! (shifting every offset by one byte) and some declare a variable
//! section longer than the physical line. The decoder repairs the former
//! with a bounded retry and degrades or reports the latter, so one bad
//! line never aborts an extraction.
//!
//! ## Example
//!
//! ```no_run
//! use snapdat::{Company, Reader, RecordSink, SinkResult};
//!
//! struct NameSink;
//!
//! impl RecordSink for NameSink {
//!     fn company(&self, company: Company) -> SinkResult {
//!         println!("{} {}", company.company_number, company.name);
//!         Ok(())
//!     }
//! }
//!
//! let reader = Reader::new(NameSink);
//! reader.extract("Prod195.zip", 4, |err| eprintln!("{err}"))?;
//! # Ok::<(), snapdat::SnapshotError>(())
//! ```
//!
//! Records are transient: each is decoded from one line, handed to the
//! sink, and dropped. The only state kept per entry is a pair of atomic
//! tallies used to reconcile the trailer's declared record count.

pub mod archive;
pub mod decode;
pub mod error;
pub mod reader;
pub mod record;

pub use archive::{ByteLines, Entry, SnapshotArchive};
pub use decode::{
    decode_company, decode_footer, decode_header, decode_line, decode_person, Record,
    HEADER_MARKER, TRAILER_MARKER,
};
pub use error::{Result, SinkError, SnapshotError};
pub use reader::{NopSink, Reader, RecordSink, SinkResult};
pub use record::{Company, CompanyStatus, Footer, Header, NumberPrefix, Person};
