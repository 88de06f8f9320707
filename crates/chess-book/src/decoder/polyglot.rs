//! Polyglot binary book decoding.
//!
//! A Polyglot book is a flat list of 16-byte big-endian entries:
//! `[key:u64][move:u16][weight:u16][learn:u32]`. Files written by book tools
//! are already sorted by key, which lets the loader skip the sort pass.

use crate::assembler::BookAssembler;
use crate::book::BookFormat;
use crate::record::{BookRecord, PolyglotEntry};

use super::{RecordDecoder, UnitError};

/// Size of one Polyglot entry in bytes.
pub const ENTRY_SIZE: usize = 16;

/// Decodes one 16-byte Polyglot entry.
#[must_use]
pub fn decode_entry(bytes: &[u8; ENTRY_SIZE]) -> PolyglotEntry {
    let mut key = [0u8; 8];
    let mut raw_move = [0u8; 2];
    let mut weight = [0u8; 2];
    let mut learn = [0u8; 4];
    key.copy_from_slice(&bytes[0..8]);
    raw_move.copy_from_slice(&bytes[8..10]);
    weight.copy_from_slice(&bytes[10..12]);
    learn.copy_from_slice(&bytes[12..16]);

    PolyglotEntry {
        key: u64::from_be_bytes(key),
        raw_move: u16::from_be_bytes(raw_move),
        weight: u16::from_be_bytes(weight),
        learn: u32::from_be_bytes(learn),
    }
}

/// Stateless decoder for Polyglot books.
///
/// Trailing bytes that do not fill a whole entry are ignored.
#[derive(Debug, Clone, Copy, Default)]
pub struct PolyglotDecoder;

impl PolyglotDecoder {
    /// Creates a new decoder.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl RecordDecoder for PolyglotDecoder {
    fn format(&self) -> BookFormat {
        BookFormat::Polyglot
    }

    fn unit_count(&self, input: &[u8]) -> usize {
        input.len() / ENTRY_SIZE
    }

    fn decode_unit(
        &mut self,
        input: &[u8],
        index: usize,
        sink: &mut BookAssembler,
    ) -> Result<(), UnitError> {
        let offset = index * ENTRY_SIZE;
        let bytes: &[u8; ENTRY_SIZE] = input
            .get(offset..offset + ENTRY_SIZE)
            .and_then(|chunk| chunk.try_into().ok())
            .ok_or(UnitError::OutOfRange { index })?;

        sink.push(BookRecord::polyglot(decode_entry(bytes)));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(key: u64, raw_move: u16, weight: u16, learn: u32) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(ENTRY_SIZE);
        bytes.extend_from_slice(&key.to_be_bytes());
        bytes.extend_from_slice(&raw_move.to_be_bytes());
        bytes.extend_from_slice(&weight.to_be_bytes());
        bytes.extend_from_slice(&learn.to_be_bytes());
        bytes
    }

    #[test]
    fn test_decode_entry_is_big_endian() {
        let bytes = encode(0x463b_9618_1691_fc9c, 0x031c, 0x0102, 0xdead_beef);
        let entry = decode_entry(bytes.as_slice().try_into().unwrap());
        assert_eq!(entry.key, 0x463b_9618_1691_fc9c);
        assert_eq!(entry.raw_move, 0x031c);
        assert_eq!(entry.weight, 0x0102);
        assert_eq!(entry.learn, 0xdead_beef);
        assert_eq!(bytes[0], 0x46);
    }

    #[test]
    fn test_unit_count_ignores_trailing_bytes() {
        let decoder = PolyglotDecoder::new();
        assert_eq!(decoder.unit_count(&[]), 0);
        assert_eq!(decoder.unit_count(&[0u8; 15]), 0);
        assert_eq!(decoder.unit_count(&[0u8; 16]), 1);
        assert_eq!(decoder.unit_count(&[0u8; 47]), 2);
    }

    #[test]
    fn test_decode_unit_pushes_record() {
        let mut input = encode(7, 1, 2, 3);
        input.extend(encode(9, 4, 5, 6));
        let mut decoder = PolyglotDecoder::new();
        let mut sink = BookAssembler::new(BookFormat::Polyglot);

        decoder.decode_unit(&input, 1, &mut sink).unwrap();
        decoder.decode_unit(&input, 0, &mut sink).unwrap();
        assert_eq!(sink.len(), 2);
        assert!(!sink.is_sorted());

        let book = sink.finalize();
        assert_eq!(book.keys().collect::<Vec<_>>(), vec![7, 9]);
    }

    #[test]
    fn test_decode_unit_out_of_range() {
        let input = [0u8; 20];
        let mut decoder = PolyglotDecoder::new();
        let mut sink = BookAssembler::new(BookFormat::Polyglot);
        assert_eq!(
            decoder.decode_unit(&input, 1, &mut sink),
            Err(UnitError::OutOfRange { index: 1 })
        );
        assert!(sink.is_empty());
    }
}
