//! Book records and their format-specific payloads.

use std::fmt;

/// One move suggestion at one position.
///
/// The loader only looks at `key`; the payload is carried through untouched.
/// Equal keys are normal (several moves from one position) and are never
/// deduplicated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookRecord {
    /// Position key. Records are ordered by this value.
    pub key: u64,
    /// Move, weight and annotation data.
    pub payload: MovePayload,
}

/// Format-specific move data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MovePayload {
    /// A raw Polyglot entry.
    Polyglot(PolyglotEntry),
    /// A move aggregated from a PGN game collection.
    Pgn(GameMove),
}

impl BookRecord {
    /// Creates a record from a decoded Polyglot entry.
    #[must_use]
    pub fn polyglot(entry: PolyglotEntry) -> Self {
        Self {
            key: entry.key,
            payload: MovePayload::Polyglot(entry),
        }
    }

    /// Creates a PGN record for `san` played from the position `key`.
    #[must_use]
    pub fn pgn(key: u64, san: impl Into<String>, weight: u32) -> Self {
        Self {
            key,
            payload: MovePayload::Pgn(GameMove {
                san: san.into(),
                weight,
            }),
        }
    }

    /// Returns the move weight, whatever the format.
    #[must_use]
    pub fn weight(&self) -> u32 {
        match &self.payload {
            MovePayload::Polyglot(entry) => u32::from(entry.weight),
            MovePayload::Pgn(mv) => mv.weight,
        }
    }
}

/// A Polyglot book entry, kept exactly as stored on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PolyglotEntry {
    /// Zobrist key of the position.
    pub key: u64,
    /// Packed move: to-file, to-rank, from-file, from-rank (3 bits each),
    /// then the promotion piece.
    pub raw_move: u16,
    /// Move weight.
    pub weight: u16,
    /// Learning data, unused by most tools.
    pub learn: u32,
}

impl PolyglotEntry {
    /// Renders the packed move in UCI notation, e.g. `e2e4` or `a7a8q`.
    ///
    /// Castling stays in the Polyglot king-takes-rook form (`e1h1`), since
    /// telling it apart from a rook capture needs the position.
    #[must_use]
    pub fn uci(&self) -> String {
        let mv = self.raw_move;
        let to_file = mv & 0x7;
        let to_rank = (mv >> 3) & 0x7;
        let from_file = (mv >> 6) & 0x7;
        let from_rank = (mv >> 9) & 0x7;
        let promotion = match (mv >> 12) & 0x7 {
            1 => Some('n'),
            2 => Some('b'),
            3 => Some('r'),
            4 => Some('q'),
            _ => None,
        };

        let mut uci = String::with_capacity(5);
        uci.push(file_char(from_file));
        uci.push(rank_char(from_rank));
        uci.push(file_char(to_file));
        uci.push(rank_char(to_rank));
        if let Some(piece) = promotion {
            uci.push(piece);
        }
        uci
    }
}

fn file_char(file: u16) -> char {
    char::from(b'a' + file as u8)
}

fn rank_char(rank: u16) -> char {
    char::from(b'1' + rank as u8)
}

/// A move from a PGN collection with the number of games that played it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameMove {
    /// Normalized SAN (no check or annotation suffixes).
    pub san: String,
    /// Number of games containing this move at this position.
    pub weight: u32,
}

impl fmt::Display for BookRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.payload {
            MovePayload::Polyglot(entry) => write!(
                f,
                "{:016x} {} weight={} learn={}",
                self.key,
                entry.uci(),
                entry.weight,
                entry.learn
            ),
            MovePayload::Pgn(mv) => write!(f, "{:016x} {} weight={}", self.key, mv.san, mv.weight),
        }
    }
}
