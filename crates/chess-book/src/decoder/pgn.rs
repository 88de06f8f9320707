//! PGN game collection decoding.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::ops::Range;

use crate::assembler::BookAssembler;
use crate::book::BookFormat;
use crate::pgn::{self, GameTree};
use crate::record::{BookRecord, MovePayload};

use super::{RecordDecoder, UnitError};

/// Folds one parsed game into the cumulative book.
pub trait MergeStrategy {
    /// Merges every move of `tree` into `book`.
    fn merge(&mut self, tree: &GameTree, book: &mut BookAssembler);

    /// Forgets everything merged so far.
    fn reset(&mut self);
}

/// Counts games per (position, move).
///
/// The first game to play a move from a position appends a record with
/// weight 1; later games bump that record's weight.
#[derive(Debug, Clone, Default)]
pub struct WeightedMerge {
    index: HashMap<(u64, String), usize>,
}

impl WeightedMerge {
    /// Creates an empty merge index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl MergeStrategy for WeightedMerge {
    fn merge(&mut self, tree: &GameTree, book: &mut BookAssembler) {
        for (key, san) in tree.edges() {
            match self.index.entry((key, san.to_string())) {
                Entry::Occupied(slot) => {
                    if let Some(MovePayload::Pgn(mv)) =
                        book.get_mut(*slot.get()).map(|r| &mut r.payload)
                    {
                        mv.weight = mv.weight.saturating_add(1);
                    }
                }
                Entry::Vacant(slot) => {
                    slot.insert(book.push(BookRecord::pgn(key, san, 1)));
                }
            }
        }
    }

    fn reset(&mut self) {
        self.index.clear();
    }
}

/// Decoder for PGN game collections.
///
/// [`pre_split`](RecordDecoder::pre_split) indexes the games; each unit is
/// then parsed into a [`GameTree`], merged and dropped. A game that fails to
/// parse contributes nothing.
#[derive(Debug, Default)]
pub struct PgnDecoder<M = WeightedMerge> {
    games: Vec<Range<usize>>,
    merge: M,
}

impl PgnDecoder {
    /// Creates a decoder using [`WeightedMerge`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl<M: MergeStrategy> PgnDecoder<M> {
    /// Creates a decoder with a custom merge strategy.
    pub fn with_merge(merge: M) -> Self {
        Self {
            games: Vec::new(),
            merge,
        }
    }

    /// Byte ranges of the games found by the last pre-split.
    #[must_use]
    pub fn games(&self) -> &[Range<usize>] {
        &self.games
    }
}

impl<M: MergeStrategy> RecordDecoder for PgnDecoder<M> {
    fn format(&self) -> BookFormat {
        BookFormat::Pgn
    }

    fn pre_split(&mut self, input: &[u8]) {
        self.games = pgn::pre_split(input);
        self.merge.reset();
    }

    fn unit_count(&self, _input: &[u8]) -> usize {
        self.games.len()
    }

    fn decode_unit(
        &mut self,
        input: &[u8],
        index: usize,
        sink: &mut BookAssembler,
    ) -> Result<(), UnitError> {
        let unit = self
            .games
            .get(index)
            .and_then(|range| input.get(range.clone()))
            .ok_or(UnitError::OutOfRange { index })?;

        let tree = pgn::parse_game(unit).map_err(|source| UnitError::Game { index, source })?;
        self.merge.merge(&tree, sink);
        Ok(())
    }

    fn reset(&mut self) {
        self.games.clear();
        self.merge.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pgn::GameParseError;

    const GAMES: &str = "\
[Event \"A\"]

1. e4 e5 2. Nf3 Nc6 1-0

[Event \"B\"]

1. e4 c5 2. Nf3 0-1

[Event \"C\"]

1. d4 (1. e4 e5) d5 *
";

    fn decode_all(decoder: &mut PgnDecoder, input: &[u8]) -> (BookAssembler, Vec<UnitError>) {
        let mut sink = BookAssembler::new(BookFormat::Pgn);
        let mut errors = Vec::new();
        decoder.pre_split(input);
        for i in 0..decoder.unit_count(input) {
            if let Err(e) = decoder.decode_unit(input, i, &mut sink) {
                errors.push(e);
            }
        }
        (sink, errors)
    }

    fn weight_of(book: &crate::Book, san: &str) -> Vec<u32> {
        book.records()
            .iter()
            .filter_map(|r| match &r.payload {
                MovePayload::Pgn(mv) if mv.san == san => Some(mv.weight),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_games_are_merged_with_weights() {
        let mut decoder = PgnDecoder::new();
        let (sink, errors) = decode_all(&mut decoder, GAMES.as_bytes());
        assert!(errors.is_empty());
        assert_eq!(decoder.games().len(), 3);

        let book = sink.finalize();
        // 1. e4 appears in all three games (the third in a variation)
        assert_eq!(weight_of(&book, "e4"), vec![3]);
        // 1... e5 after 1. e4 in games A and C
        assert_eq!(weight_of(&book, "e5"), vec![2]);
        // 2. Nf3 from two different positions
        let mut nf3 = weight_of(&book, "Nf3");
        nf3.sort_unstable();
        assert_eq!(nf3, vec![1, 1]);
        assert_eq!(weight_of(&book, "d4"), vec![1]);
        for pair in book.records().windows(2) {
            assert!(pair[0].key <= pair[1].key);
        }
    }

    #[test]
    fn test_transpositions_share_a_record() {
        let input = "\
[Event \"A\"]

1. e4 e5 2. Nf3 Nc6 3. Bb5 *

[Event \"B\"]

1. Nf3 Nc6 2. e4 e5 3. Bb5 *
";
        let mut decoder = PgnDecoder::new();
        let (sink, errors) = decode_all(&mut decoder, input.as_bytes());
        assert!(errors.is_empty());

        let book = sink.finalize();
        assert_eq!(weight_of(&book, "Bb5"), vec![2]);
        let mut nf3 = weight_of(&book, "Nf3");
        nf3.sort_unstable();
        assert_eq!(nf3, vec![1, 1]);
    }

    #[test]
    fn test_illegal_move_fails_its_game() {
        let input = "[Event \"A\"]\n\n1. e4 e5 2. Ke3 *\n\n[Event \"B\"]\n\n1. d4 *\n";
        let mut decoder = PgnDecoder::new();
        let (sink, errors) = decode_all(&mut decoder, input.as_bytes());

        assert_eq!(
            errors,
            vec![UnitError::Game {
                index: 0,
                source: GameParseError::IllegalMove("Ke3".to_string())
            }]
        );
        let book = sink.finalize();
        assert_eq!(book.len(), 1);
        assert_eq!(weight_of(&book, "d4"), vec![1]);
    }

    #[test]
    fn test_bad_game_is_isolated() {
        let input = "[Event \"A\"]\n\n1. e4 e5 *\n\n[Event \"Bad\"]\n\n1. e4 {oops\n\n[Event \"C\"]\n\n1. d4 *\n";
        let mut decoder = PgnDecoder::new();
        let (sink, errors) = decode_all(&mut decoder, input.as_bytes());

        assert_eq!(
            errors,
            vec![UnitError::Game {
                index: 1,
                source: GameParseError::UnterminatedComment
            }]
        );
        let book = sink.finalize();
        assert_eq!(book.len(), 3);
        assert_eq!(weight_of(&book, "e4"), vec![1]);
    }

    #[test]
    fn test_pre_split_resets_merge_index() {
        let input = b"1. e4 *\n";
        let mut decoder = PgnDecoder::new();
        let (first, _) = decode_all(&mut decoder, input);
        let (second, _) = decode_all(&mut decoder, input);
        assert_eq!(first.finalize().records()[0].weight(), 1);
        assert_eq!(second.finalize().records()[0].weight(), 1);
    }

    #[test]
    fn test_out_of_range_unit() {
        let mut decoder = PgnDecoder::new();
        let mut sink = BookAssembler::new(BookFormat::Pgn);
        decoder.pre_split(b"1. e4 *");
        assert_eq!(
            decoder.decode_unit(b"1. e4 *", 5, &mut sink),
            Err(UnitError::OutOfRange { index: 5 })
        );
    }

    struct CountingMerge {
        games: usize,
    }

    impl MergeStrategy for CountingMerge {
        fn merge(&mut self, _tree: &GameTree, _book: &mut BookAssembler) {
            self.games += 1;
        }

        fn reset(&mut self) {
            self.games = 0;
        }
    }

    #[test]
    fn test_custom_merge_strategy() {
        let mut decoder = PgnDecoder::with_merge(CountingMerge { games: 0 });
        let mut sink = BookAssembler::new(BookFormat::Pgn);
        let input = GAMES.as_bytes();
        decoder.pre_split(input);
        for i in 0..decoder.unit_count(input) {
            decoder.decode_unit(input, i, &mut sink).unwrap();
        }
        assert_eq!(decoder.merge.games, 3);
        assert!(sink.is_empty());
    }
}
