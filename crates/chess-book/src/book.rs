//! The finished opening book.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::record::BookRecord;

/// Source format of a book.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookFormat {
    /// Polyglot binary book, 16 bytes per entry.
    Polyglot,
    /// PGN game collection.
    Pgn,
}

impl BookFormat {
    /// Returns the tag stored on books of this format.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            BookFormat::Polyglot => "polyglot",
            BookFormat::Pgn => "pgn",
        }
    }

    /// Guesses the format from a file extension (`.bin` or `.pgn`).
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "bin" => Some(BookFormat::Polyglot),
            "pgn" => Some(BookFormat::Pgn),
            _ => None,
        }
    }
}

impl fmt::Display for BookFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BookFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "polyglot" | "bin" => Ok(BookFormat::Polyglot),
            "pgn" => Ok(BookFormat::Pgn),
            other => Err(format!("unknown book format: {other}")),
        }
    }
}

/// An opening book: records sorted by position key.
///
/// Books are built by the loader and handed to the host by value once
/// loading finishes. Records with equal keys keep the order in which they
/// were decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Book {
    format: BookFormat,
    records: Vec<BookRecord>,
}

impl Book {
    pub(crate) fn new(format: BookFormat, records: Vec<BookRecord>) -> Self {
        Self { format, records }
    }

    /// Returns the source format of this book.
    #[must_use]
    pub fn format(&self) -> BookFormat {
        self.format
    }

    /// Returns the number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if the book has no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Returns all records in key order.
    #[must_use]
    pub fn records(&self) -> &[BookRecord] {
        &self.records
    }

    /// Returns the keys in book order.
    pub fn keys(&self) -> impl Iterator<Item = u64> + '_ {
        self.records.iter().map(|r| r.key)
    }

    /// Consumes the book and returns its records.
    #[must_use]
    pub fn into_records(self) -> Vec<BookRecord> {
        self.records
    }
}
