//! ZIP archive access and byte-line iteration.
//!
//! The snapshot is distributed as a ZIP archive of line-oriented text
//! entries. This module is a thin seam over the `zip` crate: it opens the
//! archive, hands out one entry at a time, and splits the decompressed
//! byte stream into lines with the trailing `\n` (and any `\r`) removed.
//! Lines stay as raw bytes; decoding owns all interpretation.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::path::Path;

use crate::error::Result;

/// A snapshot ZIP archive.
pub struct SnapshotArchive {
    zip: zip::ZipArchive<BufReader<File>>,
}

impl SnapshotArchive {
    /// Open the archive at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<SnapshotArchive> {
        let file = File::open(path)?;
        let zip = zip::ZipArchive::new(BufReader::new(file))?;
        Ok(SnapshotArchive { zip })
    }

    /// Number of entries in the archive.
    pub fn len(&self) -> usize {
        self.zip.len()
    }

    pub fn is_empty(&self) -> bool {
        self.zip.len() == 0
    }

    /// Open the entry at `index` as a stream of byte lines.
    ///
    /// Entries are decompressed on the fly; only one can be open at a time.
    pub fn entry(&mut self, index: usize) -> Result<Entry<'_>> {
        let file = self.zip.by_index(index)?;
        let name = file.name().to_string();
        let reader: Box<dyn Read + '_> = Box::new(file);
        Ok(Entry {
            name,
            lines: ByteLines::new(BufReader::new(reader)),
        })
    }
}

/// One archive entry, iterated as byte lines.
pub struct Entry<'a> {
    name: String,
    lines: ByteLines<BufReader<Box<dyn Read + 'a>>>,
}

impl Entry<'_> {
    /// The entry's name within the archive.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Iterator for Entry<'_> {
    type Item = io::Result<Vec<u8>>;

    fn next(&mut self) -> Option<Self::Item> {
        self.lines.next()
    }
}

/// Splits a byte stream into lines, stripping `\n` and `\r\n` terminators.
pub struct ByteLines<R> {
    reader: R,
}

impl<R: BufRead> ByteLines<R> {
    pub fn new(reader: R) -> ByteLines<R> {
        ByteLines { reader }
    }
}

impl<R: BufRead> Iterator for ByteLines<R> {
    type Item = io::Result<Vec<u8>>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut line = Vec::new();
        match self.reader.read_until(b'\n', &mut line) {
            Ok(0) => None,
            Ok(_) => {
                if line.last() == Some(&b'\n') {
                    line.pop();
                }
                if line.last() == Some(&b'\r') {
                    line.pop();
                }
                Some(Ok(line))
            }
            Err(err) => Some(Err(err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn lines_of(input: &str) -> Vec<Vec<u8>> {
        ByteLines::new(Cursor::new(input.as_bytes()))
            .collect::<io::Result<Vec<_>>>()
            .unwrap()
    }

    #[test]
    fn splits_on_newline() {
        assert_eq!(lines_of("a\nbb\nccc\n"), vec![b"a".to_vec(), b"bb".to_vec(), b"ccc".to_vec()]);
    }

    #[test]
    fn strips_carriage_returns() {
        assert_eq!(lines_of("a\r\nb\r\n"), vec![b"a".to_vec(), b"b".to_vec()]);
    }

    #[test]
    fn final_line_without_terminator_is_kept() {
        assert_eq!(lines_of("a\nb"), vec![b"a".to_vec(), b"b".to_vec()]);
    }

    #[test]
    fn empty_input_yields_nothing() {
        assert!(lines_of("").is_empty());
    }
}
