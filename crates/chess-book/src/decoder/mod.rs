//! Pluggable per-format unit decoders.
//!
//! The loader knows nothing about file formats. It asks a [`RecordDecoder`]
//! how many units the input holds, then feeds it one unit at a time together
//! with the [`BookAssembler`] that collects the output. A unit is a fixed
//! 16-byte entry for Polyglot and one game for PGN.

mod pgn;
mod polyglot;

pub use pgn::{MergeStrategy, PgnDecoder, WeightedMerge};
pub use polyglot::{decode_entry, PolyglotDecoder, ENTRY_SIZE};

use thiserror::Error;

use crate::assembler::BookAssembler;
use crate::book::BookFormat;
use crate::pgn::GameParseError;

/// Errors confined to a single unit.
///
/// The loader records these and moves on to the next unit; they never abort
/// a load.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum UnitError {
    /// A game in a PGN collection could not be parsed.
    #[error("game {index}: {source}")]
    Game {
        index: usize,
        #[source]
        source: GameParseError,
    },

    /// The unit index is past the end of the input.
    #[error("unit {index} is out of range")]
    OutOfRange { index: usize },
}

/// Decodes one book format, unit by unit.
pub trait RecordDecoder {
    /// Format of the books this decoder produces.
    fn format(&self) -> BookFormat;

    /// One-time scan of the input before decoding starts.
    ///
    /// Called once per load, on the first resumption, so `load` itself
    /// returns quickly. The default does nothing.
    fn pre_split(&mut self, _input: &[u8]) {}

    /// Number of units in `input`. Only valid after [`pre_split`](Self::pre_split).
    fn unit_count(&self, input: &[u8]) -> usize;

    /// Decodes unit `index` of `input` into `sink`.
    fn decode_unit(
        &mut self,
        input: &[u8],
        index: usize,
        sink: &mut BookAssembler,
    ) -> Result<(), UnitError>;

    /// Drops any state kept from a previous load.
    fn reset(&mut self) {}
}

/// A decoder for either supported format.
#[derive(Debug)]
pub enum BookDecoder {
    Polyglot(PolyglotDecoder),
    Pgn(PgnDecoder),
}

impl BookDecoder {
    /// Creates the decoder for `format`.
    #[must_use]
    pub fn for_format(format: BookFormat) -> Self {
        match format {
            BookFormat::Polyglot => BookDecoder::Polyglot(PolyglotDecoder::new()),
            BookFormat::Pgn => BookDecoder::Pgn(PgnDecoder::new()),
        }
    }
}

impl RecordDecoder for BookDecoder {
    fn format(&self) -> BookFormat {
        match self {
            BookDecoder::Polyglot(d) => d.format(),
            BookDecoder::Pgn(d) => d.format(),
        }
    }

    fn pre_split(&mut self, input: &[u8]) {
        match self {
            BookDecoder::Polyglot(d) => d.pre_split(input),
            BookDecoder::Pgn(d) => d.pre_split(input),
        }
    }

    fn unit_count(&self, input: &[u8]) -> usize {
        match self {
            BookDecoder::Polyglot(d) => d.unit_count(input),
            BookDecoder::Pgn(d) => d.unit_count(input),
        }
    }

    fn decode_unit(
        &mut self,
        input: &[u8],
        index: usize,
        sink: &mut BookAssembler,
    ) -> Result<(), UnitError> {
        match self {
            BookDecoder::Polyglot(d) => d.decode_unit(input, index, sink),
            BookDecoder::Pgn(d) => d.decode_unit(input, index, sink),
        }
    }

    fn reset(&mut self) {
        match self {
            BookDecoder::Polyglot(d) => d.reset(),
            BookDecoder::Pgn(d) => d.reset(),
        }
    }
}
