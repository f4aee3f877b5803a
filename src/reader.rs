//! Extraction driver: sinks, the worker pool, and count reconciliation.
//!
//! A [`Reader`] owns a caller-supplied [`RecordSink`] and walks a snapshot
//! archive one entry at a time. Within an entry, lines are handed to a
//! bounded pool of worker threads; each worker classifies, decodes,
//! repairs and dispatches independently, so callback order across workers
//! is not guaranteed. Two shared atomic tallies track dispatched company
//! and person records for the trailer reconciliation, which runs only
//! after the pool has fully drained.
//!
//! Error policy: failures opening the archive or an entry, and a
//! malformed header, abort the extraction. Every other failure is
//! per-line; it is wrapped with the offending line and forwarded to the
//! caller's error sink while processing continues.

use std::io;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;

use crossbeam_channel::bounded;
use tracing::debug;

use crate::archive::SnapshotArchive;
use crate::decode::{decode_footer, decode_header, decode_line, Record, TRAILER_MARKER};
use crate::error::{Result, SinkError, SnapshotError};
use crate::record::{Company, Footer, Header, Person};

/// Result of a sink method.
pub type SinkResult = std::result::Result<(), SinkError>;

/// Receiver for decoded records, one method per record kind.
///
/// Every method defaults to a no-op, so implementations only handle the
/// kinds they care about. Methods take `&self` and may be called from
/// multiple worker threads at once. A sink error is reported to the
/// extraction's error sink and does not stop processing.
pub trait RecordSink: Sync {
    fn header(&self, header: Header) -> SinkResult {
        let _ = header;
        Ok(())
    }

    fn footer(&self, footer: Footer) -> SinkResult {
        let _ = footer;
        Ok(())
    }

    fn company(&self, company: Company) -> SinkResult {
        let _ = company;
        Ok(())
    }

    fn person(&self, person: Person) -> SinkResult {
        let _ = person;
        Ok(())
    }
}

impl<S: RecordSink + ?Sized> RecordSink for &S {
    fn header(&self, header: Header) -> SinkResult {
        (**self).header(header)
    }

    fn footer(&self, footer: Footer) -> SinkResult {
        (**self).footer(footer)
    }

    fn company(&self, company: Company) -> SinkResult {
        (**self).company(company)
    }

    fn person(&self, person: Person) -> SinkResult {
        (**self).person(person)
    }
}

/// A sink that discards every record.
pub struct NopSink;

impl RecordSink for NopSink {}

/// Per-entry tallies of dispatched records, shared across workers.
#[derive(Default)]
struct EntryTally {
    companies: AtomicU64,
    persons: AtomicU64,
}

impl EntryTally {
    fn total(&self) -> u64 {
        self.companies.load(Ordering::Relaxed) + self.persons.load(Ordering::Relaxed)
    }
}

/// Snapshot extraction driver.
pub struct Reader<S = NopSink> {
    sink: S,
}

impl<S: RecordSink> Reader<S> {
    pub fn new(sink: S) -> Reader<S> {
        Reader { sink }
    }

    /// Extract every entry of the archive at `path`, decoding lines with
    /// `concurrency` worker threads per entry (values below 2 process
    /// sequentially).
    ///
    /// Returns an error only for structural failures: an unreadable
    /// archive or entry, or a malformed header. All per-line failures are
    /// forwarded to `errh` with the offending line attached, and
    /// extraction continues.
    pub fn extract<P, F>(&self, path: P, concurrency: usize, errh: F) -> Result<()>
    where
        P: AsRef<Path>,
        F: Fn(SnapshotError) + Sync,
    {
        let mut archive = SnapshotArchive::open(path)?;
        for index in 0..archive.len() {
            let entry = archive.entry(index)?;
            let name = entry.name().to_string();
            debug!(entry = %name, "processing entry");
            self.process_entry(&name, entry, concurrency, &errh)?;
        }
        Ok(())
    }

    /// Run the per-entry pipeline: header first, then the line pool, then
    /// the deferred trailer reconciliation.
    fn process_entry<I, F>(&self, name: &str, mut lines: I, concurrency: usize, errh: &F) -> Result<()>
    where
        I: Iterator<Item = io::Result<Vec<u8>>>,
        F: Fn(SnapshotError) + Sync,
    {
        let Some(first) = lines.next() else {
            debug!(entry = name, "entry contains no lines");
            return Ok(());
        };
        let first = first?;
        let header = decode_header(&first)?;
        if let Err(err) = self.sink.header(header) {
            errh(SnapshotError::for_line(&first, SnapshotError::Sink(err)));
        }

        let tally = EntryTally::default();
        // The trailer closes out the entry; it is held back until every
        // other line has been dispatched and counted.
        let mut trailer: Option<Vec<u8>> = None;

        if concurrency <= 1 {
            for (index, item) in (1..).zip(&mut lines) {
                let line = item?;
                if line.starts_with(TRAILER_MARKER) {
                    trailer = Some(line);
                    continue;
                }
                self.handle_line(&line, index, &tally, errh);
            }
        } else {
            let (tx, rx) = bounded::<(usize, Vec<u8>)>(concurrency * 10);
            let tally_ref = &tally;
            thread::scope(|scope| -> Result<()> {
                for _ in 0..concurrency {
                    let rx = rx.clone();
                    scope.spawn(move || {
                        for (index, line) in rx {
                            self.handle_line(&line, index, tally_ref, errh);
                        }
                    });
                }
                drop(rx);
                for (index, item) in (1..).zip(&mut lines) {
                    let line = item?;
                    if line.starts_with(TRAILER_MARKER) {
                        trailer = Some(line);
                        continue;
                    }
                    if tx.send((index, line)).is_err() {
                        break;
                    }
                }
                // Closing the channel releases the workers once they have
                // drained what is already buffered.
                drop(tx);
                Ok(())
            })?;
        }

        if let Some(line) = trailer {
            self.reconcile(&line, &tally, errh);
        }

        let companies = tally.companies.load(Ordering::Relaxed);
        let persons = tally.persons.load(Ordering::Relaxed);
        debug!(entry = name, companies, persons, "entry complete");
        Ok(())
    }

    /// Decode and dispatch one line, reporting any failure to the error
    /// sink with the line attached.
    fn handle_line<F>(&self, line: &[u8], index: usize, tally: &EntryTally, errh: &F)
    where
        F: Fn(SnapshotError) + Sync,
    {
        if let Err(err) = self.dispatch_line(line, index, tally) {
            errh(SnapshotError::for_line(line, err));
        }
    }

    fn dispatch_line(&self, line: &[u8], index: usize, tally: &EntryTally) -> Result<()> {
        match decode_line(line, index)? {
            Record::Header(header) => self.sink.header(header).map_err(SnapshotError::Sink),
            Record::Footer(footer) => self.sink.footer(footer).map_err(SnapshotError::Sink),
            Record::Company(company) => {
                tally.companies.fetch_add(1, Ordering::Relaxed);
                self.sink.company(company).map_err(SnapshotError::Sink)
            }
            Record::Person(person) => {
                tally.persons.fetch_add(1, Ordering::Relaxed);
                self.sink.person(person).map_err(SnapshotError::Sink)
            }
        }
    }

    /// Decode the held-back trailer, dispatch it, and check its declared
    /// count against the records actually dispatched.
    fn reconcile<F>(&self, line: &[u8], tally: &EntryTally, errh: &F)
    where
        F: Fn(SnapshotError) + Sync,
    {
        let footer = match decode_footer(line) {
            Ok(footer) => footer,
            Err(err) => {
                errh(SnapshotError::for_line(line, err));
                return;
            }
        };
        let declared = footer.record_count;
        if let Err(err) = self.sink.footer(footer) {
            errh(SnapshotError::for_line(line, SnapshotError::Sink(err)));
        }
        let counted = tally.total();
        if declared != counted {
            errh(SnapshotError::CountMismatch { declared, counted });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct CollectSink {
        headers: Mutex<Vec<Header>>,
        footers: Mutex<Vec<Footer>>,
        companies: Mutex<Vec<Company>>,
        persons: Mutex<Vec<Person>>,
    }

    impl RecordSink for CollectSink {
        fn header(&self, header: Header) -> SinkResult {
            self.headers.lock().unwrap().push(header);
            Ok(())
        }

        fn footer(&self, footer: Footer) -> SinkResult {
            self.footers.lock().unwrap().push(footer);
            Ok(())
        }

        fn company(&self, company: Company) -> SinkResult {
            self.companies.lock().unwrap().push(company);
            Ok(())
        }

        fn person(&self, person: Person) -> SinkResult {
            self.persons.lock().unwrap().push(person);
            Ok(())
        }
    }

    /// Rejects every company record.
    struct FailSink;

    impl RecordSink for FailSink {
        fn company(&self, _company: Company) -> SinkResult {
            Err("company rejected".into())
        }
    }

    fn header_line() -> Vec<u8> {
        b"DDDDSNAP021620230506".to_vec()
    }

    fn footer_line(count: u64) -> Vec<u8> {
        format!("99999999{count:08}").into_bytes()
    }

    fn company_line(index: usize) -> Vec<u8> {
        let name = format!("TEST COMPANY {index:03}");
        format!(
            "{index:08}1 {filler}0001{len:04}{name}<",
            filler = " ".repeat(22),
            len = name.len() + 1
        )
        .into_bytes()
    }

    fn person_line(index: usize) -> Vec<u8> {
        let section = "MS<TESS<EXAMPLE";
        format!(
            "{index:08}2101{pnum:012} {filler}20200101{blank}AB1 2CD {blank}{blank}{len:04}{section}",
            pnum = index,
            filler = " ".repeat(7),
            blank = " ".repeat(8),
            len = section.len()
        )
        .into_bytes()
    }

    fn entry(lines: Vec<Vec<u8>>) -> impl Iterator<Item = io::Result<Vec<u8>>> {
        lines.into_iter().map(Ok::<Vec<u8>, io::Error>)
    }

    /// Helper: process an in-memory entry and return accumulated errors.
    fn run(sink: &impl RecordSink, lines: Vec<Vec<u8>>, concurrency: usize) -> Vec<SnapshotError> {
        let errors = Mutex::new(Vec::new());
        let errh = |err| errors.lock().unwrap().push(err);
        Reader::new(sink)
            .process_entry("test", entry(lines), concurrency, &errh)
            .unwrap();
        errors.into_inner().unwrap()
    }

    #[test]
    fn sequential_entry_dispatches_every_record() {
        let sink = CollectSink::default();
        let errors = run(
            &sink,
            vec![
                header_line(),
                company_line(1),
                company_line(2),
                person_line(3),
                footer_line(3),
            ],
            1,
        );
        assert!(errors.is_empty(), "unexpected errors: {errors:?}");
        assert_eq!(sink.headers.lock().unwrap().len(), 1);
        assert_eq!(sink.footers.lock().unwrap().len(), 1);
        assert_eq!(sink.companies.lock().unwrap().len(), 2);
        assert_eq!(sink.persons.lock().unwrap().len(), 1);
    }

    #[test]
    fn count_mismatch_is_reported_after_drain() {
        let mut lines = vec![header_line()];
        for index in 0..40 {
            lines.push(company_line(index));
        }
        lines.push(person_line(40));
        lines.push(footer_line(42));

        let errors = run(&CollectSink::default(), lines, 1);
        assert_eq!(errors.len(), 1);
        assert!(matches!(
            errors[0],
            SnapshotError::CountMismatch {
                declared: 42,
                counted: 41
            }
        ));
    }

    #[test]
    fn concurrent_entry_counts_every_line_exactly_once() {
        let sink = CollectSink::default();
        let mut lines = vec![header_line()];
        for index in 0..120 {
            lines.push(company_line(index));
        }
        for index in 0..80 {
            lines.push(person_line(index));
        }
        lines.push(footer_line(200));

        let errors = run(&sink, lines, 4);
        assert!(errors.is_empty(), "unexpected errors: {errors:?}");
        assert_eq!(sink.companies.lock().unwrap().len(), 120);
        assert_eq!(sink.persons.lock().unwrap().len(), 80);
        assert_eq!(sink.footers.lock().unwrap().len(), 1);
    }

    #[test]
    fn sink_failure_is_reported_and_processing_continues() {
        let errors = run(
            &FailSink,
            vec![
                header_line(),
                company_line(1),
                person_line(2),
                footer_line(2),
            ],
            1,
        );
        assert_eq!(errors.len(), 1);
        match &errors[0] {
            SnapshotError::Line { source, .. } => {
                assert!(matches!(**source, SnapshotError::Sink(_)))
            }
            other => panic!("expected a wrapped sink error, got {other:?}"),
        }
    }

    #[test]
    fn unhandled_line_is_reported_and_processing_continues() {
        let sink = CollectSink::default();
        let errors = run(
            &sink,
            vec![
                header_line(),
                b"XXXXXXXXX UNKNOWN RECORD".to_vec(),
                company_line(1),
                footer_line(1),
            ],
            1,
        );
        assert_eq!(errors.len(), 1);
        match &errors[0] {
            SnapshotError::Line { source, .. } => {
                assert!(matches!(**source, SnapshotError::UnhandledRecord))
            }
            other => panic!("expected a wrapped unhandled record, got {other:?}"),
        }
        assert_eq!(sink.companies.lock().unwrap().len(), 1);
    }

    #[test]
    fn trailer_is_reconciled_after_drain_even_when_early() {
        let sink = CollectSink::default();
        let errors = run(
            &sink,
            vec![
                header_line(),
                footer_line(2),
                company_line(1),
                person_line(2),
            ],
            1,
        );
        assert!(errors.is_empty(), "unexpected errors: {errors:?}");
        assert_eq!(sink.footers.lock().unwrap().len(), 1);
    }

    #[test]
    fn garbled_trailer_count_is_reported() {
        let errors = run(
            &CollectSink::default(),
            vec![header_line(), b"99999999XXXXXXXX".to_vec()],
            1,
        );
        assert_eq!(errors.len(), 1);
        match &errors[0] {
            SnapshotError::Line { source, .. } => {
                assert!(matches!(**source, SnapshotError::IntegerField { .. }))
            }
            other => panic!("expected a wrapped integer error, got {other:?}"),
        }
    }

    #[test]
    fn empty_entry_is_ok() {
        let errors = run(&CollectSink::default(), vec![], 1);
        assert!(errors.is_empty());
    }

    #[test]
    fn malformed_header_aborts_the_entry() {
        let errors = Mutex::new(Vec::new());
        let errh = |err| errors.lock().unwrap().push(err);
        let err = Reader::new(NopSink)
            .process_entry("test", entry(vec![b"GARBAGE".to_vec()]), 1, &errh)
            .unwrap_err();
        assert!(matches!(err, SnapshotError::Format(_)));
    }
}
