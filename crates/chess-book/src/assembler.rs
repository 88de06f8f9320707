//! Record accumulation and the final sort pass.

use crate::book::{Book, BookFormat};
use crate::record::BookRecord;

/// Collects decoded records for one load and turns them into a [`Book`].
///
/// The assembler remembers whether records arrived in key order. The flag is
/// sticky: once a key lower than its predecessor is seen, the book needs a
/// sort pass at [`finalize`](Self::finalize), even if later records are in
/// order again.
#[derive(Debug)]
pub struct BookAssembler {
    format: BookFormat,
    records: Vec<BookRecord>,
    is_sorted: bool,
}

impl BookAssembler {
    /// Creates an empty assembler for a book of the given format.
    #[must_use]
    pub fn new(format: BookFormat) -> Self {
        Self {
            format,
            records: Vec::new(),
            is_sorted: true,
        }
    }

    /// Returns true when `new_key` breaks the key order after `prev_key`.
    #[inline]
    #[must_use]
    pub fn mark_unsorted_if_needed(prev_key: u64, new_key: u64) -> bool {
        new_key < prev_key
    }

    /// Appends records in arrival order.
    pub fn append<I>(&mut self, records: I)
    where
        I: IntoIterator<Item = BookRecord>,
    {
        for record in records {
            self.push(record);
        }
    }

    /// Appends one record and returns its index.
    pub fn push(&mut self, record: BookRecord) -> usize {
        if let Some(last) = self.records.last() {
            if Self::mark_unsorted_if_needed(last.key, record.key) {
                self.is_sorted = false;
            }
        }
        self.records.push(record);
        self.records.len() - 1
    }

    /// Returns a mutable reference to the record at `index`.
    ///
    /// Used by merge strategies to update a record in place. Keys must not
    /// be changed through this reference.
    pub fn get_mut(&mut self, index: usize) -> Option<&mut BookRecord> {
        self.records.get_mut(index)
    }

    /// Returns the number of records collected so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if no records were collected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Returns true while records have arrived in non-decreasing key order.
    #[must_use]
    pub fn is_sorted(&self) -> bool {
        self.is_sorted
    }

    /// Returns the format of the book being assembled.
    #[must_use]
    pub fn format(&self) -> BookFormat {
        self.format
    }

    /// Freezes the collected records into a [`Book`].
    ///
    /// Runs a stable sort by key unless the records already arrived in
    /// order, so records with equal keys keep their arrival order either way.
    #[must_use]
    pub fn finalize(self) -> Book {
        let mut records = self.records;
        if !self.is_sorted {
            records.sort_by_key(|r| r.key);
        }
        Book::new(self.format, records)
    }
}
