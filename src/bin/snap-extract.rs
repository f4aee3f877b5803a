//! CLI tool to dump the records of a snapshot archive.
//!
//! Prints one line per decoded record and a summary when the archive is
//! done. Per-line decode failures are logged and counted but do not stop
//! the extraction.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::{AtomicU64, Ordering};

use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use snapdat::{Company, Footer, Header, Person, Reader, RecordSink, SinkResult};

#[derive(Parser)]
#[command(name = "snap-extract", about = "Dump records from an officers snapshot archive")]
struct Args {
    /// Path to the snapshot ZIP archive
    archive: PathBuf,

    /// Worker threads decoding lines within each entry
    #[arg(short = 'j', long, default_value_t = 1)]
    concurrency: usize,

    /// Suppress per-record output and print the summary only
    #[arg(long)]
    quiet: bool,
}

struct PrintSink {
    quiet: bool,
    companies: AtomicU64,
    persons: AtomicU64,
}

impl RecordSink for PrintSink {
    fn header(&self, header: Header) -> SinkResult {
        if !self.quiet {
            println!("header: run {} produced {}", header.run, header.production_date);
        }
        Ok(())
    }

    fn footer(&self, footer: Footer) -> SinkResult {
        if !self.quiet {
            println!("trailer: {} records declared", footer.record_count);
        }
        Ok(())
    }

    fn company(&self, company: Company) -> SinkResult {
        self.companies.fetch_add(1, Ordering::Relaxed);
        if !self.quiet {
            println!(
                "company {} [{}] {}",
                company.company_number, company.status, company.name
            );
        }
        Ok(())
    }

    fn person(&self, person: Person) -> SinkResult {
        self.persons.fetch_add(1, Ordering::Relaxed);
        if !self.quiet {
            println!(
                "person {} {} {} {} ({})",
                person.company_number,
                person.person_number,
                person.forenames,
                person.surname,
                person.appointment_type
            );
        }
        Ok(())
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let sink = PrintSink {
        quiet: args.quiet,
        companies: AtomicU64::new(0),
        persons: AtomicU64::new(0),
    };
    let line_errors = AtomicU64::new(0);

    let result = Reader::new(&sink).extract(&args.archive, args.concurrency, |err| {
        line_errors.fetch_add(1, Ordering::Relaxed);
        warn!("{err}");
    });

    match result {
        Ok(()) => {
            info!(
                companies = sink.companies.load(Ordering::Relaxed),
                persons = sink.persons.load(Ordering::Relaxed),
                line_errors = line_errors.load(Ordering::Relaxed),
                "extraction complete"
            );
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!("extraction failed: {err}");
            ExitCode::FAILURE
        }
    }
}
