//! Classification and decoding of fixed-width snapshot lines.
//!
//! Every line of an entry is one of four record kinds, determined by its
//! position and a discriminator byte:
//!
//! - line 0 is the header: `DDDDSNAP` marker, 4-digit run, 8-digit date;
//! - a line starting with the `99999999` marker is the trailer;
//! - byte 8 equal to `1` marks a company record, `2` a person record.
//!
//! Company layout: number `[0,8)`, discriminator `[8]`, status `[9]`,
//! officer count `[32,36)`, name length `[36,40)`, then the name occupying
//! the declared length minus its trailing `<` delimiter.
//!
//! Person layout: number `[0,8)`, discriminator `[8]`, date origin `[9]`,
//! appointment type `[10,12)`, person number `[12,24)`, corporate
//! indicator `[24]`, appointment date `[32,40)`, resignation date
//! `[40,48)`, postcode `[48,56)`, partial DOB `[56,64)`, full DOB
//! `[64,72)`, variable length `[72,76)`, then the variable section split
//! on `<` into up to fourteen positional subfields.
//!
//! # Repair heuristic
//!
//! Some snapshot lines are missing a leading zero, shifting every fixed
//! offset left by one byte. When classification fails, or a repairable
//! integer field does not parse, and the line starts with exactly one
//! zero, a single zero byte is prepended and the failing operation is
//! retried exactly once. A line starting with two zeros that still fails
//! is genuinely unrecognizable; refusing to repair it bounds the retry.

use std::num::ParseIntError;
use std::ops::Range;
use std::str::FromStr;

use chrono::NaiveDate;

use crate::error::{Result, SnapshotError};
use crate::record::{Company, CompanyStatus, Footer, Header, Person};

/// Marker opening the header line of every entry.
pub const HEADER_MARKER: &[u8; 8] = b"DDDDSNAP";
/// Marker opening the trailer line of every entry.
pub const TRAILER_MARKER: &[u8; 8] = b"99999999";

const COMPANY_DISCRIMINATOR: u8 = b'1';
const PERSON_DISCRIMINATOR: u8 = b'2';

/// Fixed-width prefix a person line must carry before its variable section.
const PERSON_FIXED_LEN: usize = 76;
/// Fixed-width prefix a company line must carry before its name.
const COMPANY_FIXED_LEN: usize = 40;
/// Header marker, run and production date.
const HEADER_LEN: usize = 20;
/// Trailer marker and record count.
const FOOTER_LEN: usize = 16;

/// A decoded snapshot record of any kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Record {
    Header(Header),
    Footer(Footer),
    Company(Company),
    Person(Person),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Header,
    Footer,
    Company,
    Person,
    Unrecognized,
}

/// Classify and decode one line at the given 0-based index in its entry.
///
/// Applies the leading-zero repair when classification fails; the field
/// decoders apply the same repair at their own integer-parse sites.
pub fn decode_line(line: &[u8], index: usize) -> Result<Record> {
    match classify(line, index)? {
        Kind::Header => Ok(Record::Header(decode_header(line)?)),
        Kind::Footer => Ok(Record::Footer(decode_footer(line)?)),
        Kind::Company => Ok(Record::Company(decode_company(line)?)),
        Kind::Person => Ok(Record::Person(decode_person(line)?)),
        Kind::Unrecognized => {
            let fixed = reinsert_leading_zero(line).ok_or(SnapshotError::UnhandledRecord)?;
            match classify(&fixed, index)? {
                Kind::Company => Ok(Record::Company(decode_company(&fixed)?)),
                Kind::Person => Ok(Record::Person(decode_person(&fixed)?)),
                _ => Err(SnapshotError::UnhandledRecord),
            }
        }
    }
}

fn classify(line: &[u8], index: usize) -> Result<Kind> {
    if index == 0 {
        return Ok(Kind::Header);
    }
    if line.starts_with(TRAILER_MARKER) {
        return Ok(Kind::Footer);
    }
    if line.len() < 9 {
        return Err(SnapshotError::ShortLine(line.len()));
    }
    Ok(match line[8] {
        COMPANY_DISCRIMINATOR => Kind::Company,
        PERSON_DISCRIMINATOR => Kind::Person,
        _ => Kind::Unrecognized,
    })
}

/// Prepend a zero when the line plausibly lost one, shifting every offset.
///
/// A line starting with exactly one zero qualifies; two leading zeros mean
/// the defect is something else, and repairing would loop.
fn reinsert_leading_zero(line: &[u8]) -> Option<Vec<u8>> {
    if line.first() == Some(&b'0') && line.get(1) != Some(&b'0') {
        let mut fixed = Vec::with_capacity(line.len() + 1);
        fixed.push(b'0');
        fixed.extend_from_slice(line);
        Some(fixed)
    } else {
        None
    }
}

/// Decode the header line of an entry.
///
/// Any failure here is fatal to the extraction: the header anchors every
/// fixed offset that follows.
pub fn decode_header(line: &[u8]) -> Result<Header> {
    if line.len() < HEADER_LEN {
        return Err(SnapshotError::Format(format!(
            "header line is {} bytes, expected at least {HEADER_LEN}",
            line.len()
        )));
    }
    if &line[..8] != HEADER_MARKER {
        return Err(SnapshotError::Format(
            "header line does not start with DDDDSNAP".to_string(),
        ));
    }
    let run = String::from_utf8_lossy(&line[8..12])
        .parse()
        .map_err(|err| SnapshotError::Format(format!("error reading run: {err}")))?;
    let date_text = String::from_utf8_lossy(&line[12..20]);
    let production_date = NaiveDate::parse_from_str(&date_text, "%Y%m%d")
        .map_err(|err| SnapshotError::Format(format!("error reading production date: {err}")))?;
    Ok(Header {
        run,
        production_date,
    })
}

/// Decode a trailer line. The caller is expected to have matched
/// [`TRAILER_MARKER`] already.
pub fn decode_footer(line: &[u8]) -> Result<Footer> {
    if line.len() < FOOTER_LEN {
        return Err(SnapshotError::ShortLine(line.len()));
    }
    let record_count = integer(line, 8..16, "record count")?;
    Ok(Footer { record_count })
}

/// Decode a company line, retrying once on a plausibly shifted name-length
/// field.
pub fn decode_company(line: &[u8]) -> Result<Company> {
    match company_fields(line) {
        Err(err @ SnapshotError::IntegerField { .. }) => match reinsert_leading_zero(line) {
            Some(fixed) => company_fields(&fixed),
            None => Err(err),
        },
        other => other,
    }
}

fn company_fields(line: &[u8]) -> Result<Company> {
    if line.len() < COMPANY_FIXED_LEN {
        return Err(SnapshotError::ShortLine(line.len()));
    }
    let name_len: usize = integer(line, 36..40, "name length")?;
    // The declared span includes a trailing `<` delimiter, dropped here.
    // A length overrunning the line yields a partial record, not an error:
    // truncated company lines are a known defect in the feed.
    let name = if name_len == 0 || COMPANY_FIXED_LEN + name_len > line.len() {
        String::new()
    } else {
        text(line, 40..40 + name_len - 1)
    };
    Ok(Company {
        company_number: text(line, 0..8),
        status: CompanyStatus::from_code(line[9]),
        number_of_officers: text(line, 32..36),
        name,
    })
}

/// Decode a person line, retrying once on a plausibly shifted
/// variable-length field.
pub fn decode_person(line: &[u8]) -> Result<Person> {
    match person_fields(line) {
        Err(err @ SnapshotError::IntegerField { .. }) => match reinsert_leading_zero(line) {
            Some(fixed) => person_fields(&fixed),
            None => Err(err),
        },
        other => other,
    }
}

fn person_fields(line: &[u8]) -> Result<Person> {
    if line.len() < PERSON_FIXED_LEN {
        return Err(SnapshotError::ShortLine(line.len()));
    }
    let variable_len: usize = integer(line, 72..76, "variable data length")?;
    let section = line
        .get(PERSON_FIXED_LEN..PERSON_FIXED_LEN + variable_len)
        .ok_or(SnapshotError::Bounds {
            field: "variable data",
            declared: variable_len,
            available: line.len() - PERSON_FIXED_LEN,
        })?;
    let section = String::from_utf8_lossy(section);
    let parts: Vec<&str> = section.split('<').collect();
    let part = |index: usize| {
        parts
            .get(index)
            .map(|text| text.trim().to_string())
            .unwrap_or_default()
    };
    Ok(Person {
        company_number: text(line, 0..8),
        app_date_origin: text(line, 9..10),
        appointment_type: text(line, 10..12),
        person_number: text(line, 12..24),
        corporate_indicator: text(line, 24..25),
        appointment_date: text(line, 32..40),
        resignation_date: text(line, 40..48),
        postcode: text(line, 48..56),
        partial_date_of_birth: text(line, 56..64),
        full_date_of_birth: text(line, 64..72),
        title: part(0),
        forenames: part(1),
        surname: part(2),
        honours: part(3),
        care_of: part(4),
        po_box: part(5),
        address_line1: part(6),
        address_line2: part(7),
        post_town: part(8),
        county: part(9),
        country: part(10),
        occupation: part(11),
        nationality: part(12),
        // The residential country subfield is only meaningful when the
        // section carries the full fourteen parts.
        res_country: if parts.len() == 14 {
            part(13)
        } else {
            String::new()
        },
    })
}

/// Lossy text of a fixed-width field, trimmed of space padding.
fn text(line: &[u8], range: Range<usize>) -> String {
    String::from_utf8_lossy(&line[range]).trim().to_string()
}

/// Parse a space-padded integer field.
fn integer<T>(line: &[u8], range: Range<usize>, field: &'static str) -> Result<T>
where
    T: FromStr<Err = ParseIntError>,
{
    String::from_utf8_lossy(&line[range])
        .trim()
        .parse()
        .map_err(|source| SnapshotError::IntegerField { field, source })
}
