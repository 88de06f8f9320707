//! PGN (Portable Game Notation) reading for opening books.
//!
//! Loading a PGN book happens in two stages:
//!
//! 1. [`pre_split`] scans the whole collection once and returns the byte range
//!    of every game. This is cheap and gives the loader an exact unit count.
//! 2. [`parse_game`] turns one of those ranges into a [`GameTree`]: the main
//!    line plus every variation, each move replayed on a board.
//!
//! Position keys are Polyglot Zobrist hashes of the board, so a PGN book and
//! a Polyglot book are looked up with the same key, and move orders that
//! transpose into one position share it.

use std::ops::Range;

use shakmaty::fen::Fen;
use shakmaty::san::San;
use shakmaty::zobrist::{Zobrist64, ZobristHash};
use shakmaty::{CastlingMode, Chess, EnPassantMode, Move, Position};
use thiserror::Error;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Errors that can occur when parsing a single game.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GameParseError {
    #[error("game is not valid UTF-8")]
    InvalidUtf8,

    #[error("unterminated tag: {0}")]
    UnterminatedTag(String),

    #[error("invalid FEN: {0}")]
    InvalidFen(String),

    #[error("unterminated comment")]
    UnterminatedComment,

    #[error("unmatched ')' in movetext")]
    UnmatchedVariationEnd,

    #[error("variation not closed before end of game")]
    UnterminatedVariation,

    #[error("variation opened before any move")]
    VariationWithoutMove,

    #[error("invalid move: {0}")]
    InvalidMove(String),

    #[error("illegal move: {0}")]
    IllegalMove(String),
}

/// Splits a PGN collection into per-game byte ranges.
///
/// A new game starts at the first tag line (`[...]`) that follows movetext
/// outside a comment. A comment left open is closed by a blank line followed
/// by a tag pair, so one unterminated brace costs only its own game. Blank
/// lines before the first game and a leading UTF-8 byte order mark are
/// skipped; blank lines between games stay with the preceding game.
#[must_use]
pub fn pre_split(buf: &[u8]) -> Vec<Range<usize>> {
    let mut offset = if buf.starts_with(UTF8_BOM) {
        UTF8_BOM.len()
    } else {
        0
    };

    let mut games = Vec::new();
    let mut start: Option<usize> = None;
    let mut in_movetext = false;
    let mut in_comment = false;
    let mut prev_blank = false;

    for line in buf[offset..].split_inclusive(|&b| b == b'\n') {
        let trimmed = line.trim_ascii();
        if in_comment && prev_blank && is_tag_pair(trimmed) {
            in_comment = false;
        }
        let is_tag = !in_comment && trimmed.starts_with(b"[");

        if is_tag && in_movetext {
            if let Some(s) = start {
                games.push(s..offset);
            }
            start = Some(offset);
            in_movetext = false;
        } else if !trimmed.is_empty() {
            start.get_or_insert(offset);
            if !is_tag {
                in_movetext = true;
            }
        }

        if !is_tag && !trimmed.starts_with(b"%") {
            in_comment = scan_comments(trimmed, in_comment);
        }
        prev_blank = trimmed.is_empty();
        offset += line.len();
    }

    if let Some(s) = start {
        games.push(s..buf.len());
    }
    games
}

/// Returns whether a `{...}` comment is still open at the end of `line`.
fn scan_comments(line: &[u8], mut in_comment: bool) -> bool {
    for &b in line {
        match (in_comment, b) {
            (true, b'}') => in_comment = false,
            (false, b'{') => in_comment = true,
            (false, b';') => break,
            _ => {}
        }
    }
    in_comment
}

/// Matches a whole tag pair line such as `[Event "Casual game"]`.
fn is_tag_pair(line: &[u8]) -> bool {
    let Some(inner) = line.strip_prefix(b"[").and_then(|l| l.strip_suffix(b"]")) else {
        return false;
    };
    let name_len = inner
        .iter()
        .take_while(|b| b.is_ascii_alphanumeric() || **b == b'_')
        .count();
    let value = inner[name_len..].trim_ascii();
    name_len > 0 && value.len() >= 2 && value.starts_with(b"\"") && value.ends_with(b"\"")
}

fn zobrist_key(position: &Chess) -> u64 {
    position.zobrist_hash::<Zobrist64>(EnPassantMode::Legal).0
}

/// A node in a [`GameTree`]: one move and the position it leads to.
#[derive(Debug, Clone)]
pub struct TreeNode {
    parent: Option<usize>,
    mv: Move,
    san: String,
    position: Chess,
    key: u64,
    children: Vec<usize>,
}

impl TreeNode {
    /// The move, in canonical SAN without check marks.
    #[must_use]
    pub fn san(&self) -> &str {
        &self.san
    }

    /// Key of the position reached after this move.
    #[must_use]
    pub fn key(&self) -> u64 {
        self.key
    }
}

/// The moves of one game, main line and variations, as a tree.
///
/// Siblings are unique: a variation that repeats a move already present at
/// the same point reuses the existing node, however the move was spelled.
#[derive(Debug, Clone)]
pub struct GameTree {
    root: Chess,
    root_key: u64,
    root_children: Vec<usize>,
    nodes: Vec<TreeNode>,
}

impl Default for GameTree {
    fn default() -> Self {
        Self::new()
    }
}

impl GameTree {
    /// Creates an empty tree starting from the standard position.
    #[must_use]
    pub fn new() -> Self {
        Self::from_position(Chess::default())
    }

    /// Creates an empty tree starting from the position given by `fen`.
    pub fn from_fen(fen: &str) -> Result<Self, GameParseError> {
        let invalid = || GameParseError::InvalidFen(fen.to_string());
        let parsed: Fen = fen.trim().parse().map_err(|_| invalid())?;
        let position: Chess = parsed
            .into_position(CastlingMode::Standard)
            .map_err(|_| invalid())?;
        Ok(Self::from_position(position))
    }

    fn from_position(root: Chess) -> Self {
        Self {
            root_key: zobrist_key(&root),
            root,
            root_children: Vec::new(),
            nodes: Vec::new(),
        }
    }

    /// Key of the starting position.
    #[must_use]
    pub fn root_key(&self) -> u64 {
        self.root_key
    }

    /// Number of moves in the tree.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns true if the game has no moves.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Returns the node at `index`.
    #[must_use]
    pub fn node(&self, index: usize) -> Option<&TreeNode> {
        self.nodes.get(index)
    }

    fn position(&self, node: Option<usize>) -> &Chess {
        node.and_then(|i| self.nodes.get(i))
            .map_or(&self.root, |n| &n.position)
    }

    /// Key of the position after the move at `node`, or the start position
    /// for `None`.
    #[must_use]
    pub fn position_key(&self, node: Option<usize>) -> u64 {
        node.and_then(|i| self.nodes.get(i))
            .map_or(self.root_key, |n| n.key)
    }

    /// Plays `san` from the position after `parent` and returns the node
    /// index.
    ///
    /// # Errors
    ///
    /// [`GameParseError::InvalidMove`] if `san` is not SAN, and
    /// [`GameParseError::IllegalMove`] if it does not name a legal move in
    /// that position.
    pub fn add_move(&mut self, parent: Option<usize>, san: &str) -> Result<usize, GameParseError> {
        let before = self.position(parent);
        let parsed: San = san
            .parse()
            .map_err(|_| GameParseError::InvalidMove(san.to_string()))?;
        let mv = parsed
            .to_move(before)
            .map_err(|_| GameParseError::IllegalMove(san.to_string()))?;

        let siblings = match parent {
            Some(p) => &self.nodes[p].children,
            None => &self.root_children,
        };
        if let Some(&existing) = siblings.iter().find(|&&c| self.nodes[c].mv == mv) {
            return Ok(existing);
        }

        let canonical = San::from_move(before, &mv).to_string();
        let mut after = before.clone();
        after.play_unchecked(&mv);

        let index = self.nodes.len();
        self.nodes.push(TreeNode {
            parent,
            mv,
            san: canonical,
            key: zobrist_key(&after),
            position: after,
            children: Vec::new(),
        });
        match parent {
            Some(p) => self.nodes[p].children.push(index),
            None => self.root_children.push(index),
        }
        Ok(index)
    }

    /// Iterates over every move as `(key of the position it is played from,
    /// move)`, in the order the moves first appeared in the game.
    pub fn edges(&self) -> impl Iterator<Item = (u64, &str)> + '_ {
        self.nodes
            .iter()
            .map(|n| (self.position_key(n.parent), n.san.as_str()))
    }

    fn parent_of(&self, node: usize) -> Option<usize> {
        self.nodes.get(node).and_then(|n| n.parent)
    }
}

/// Parses one game (tags and movetext) into a [`GameTree`].
///
/// A `[FEN "..."]` tag sets the starting position; otherwise the standard
/// start is used. Parsing stops at the game termination marker.
pub fn parse_game(unit: &[u8]) -> Result<GameTree, GameParseError> {
    let text = std::str::from_utf8(unit).map_err(|_| GameParseError::InvalidUtf8)?;

    let mut fen: Option<String> = None;
    let mut movetext = String::new();
    for line in text.lines() {
        let trimmed = line.trim();
        if trimmed.starts_with('%') {
            continue;
        }
        if movetext.is_empty() && trimmed.starts_with('[') {
            let (name, value) = parse_tag(trimmed)?;
            if name == "FEN" {
                fen = Some(value);
            }
            continue;
        }
        if trimmed.is_empty() && movetext.is_empty() {
            continue;
        }
        movetext.push_str(line);
        movetext.push('\n');
    }

    let mut tree = match fen {
        Some(fen) => GameTree::from_fen(&fen)?,
        None => GameTree::new(),
    };
    parse_movetext(&movetext, &mut tree)?;
    Ok(tree)
}

/// Parses a tag pair line such as `[White "Carlsen, Magnus"]`.
fn parse_tag(line: &str) -> Result<(String, String), GameParseError> {
    let inner = line
        .strip_prefix('[')
        .and_then(|l| l.strip_suffix(']'))
        .ok_or_else(|| GameParseError::UnterminatedTag(line.to_string()))?
        .trim();

    let (name, rest) = inner.split_once(char::is_whitespace).unwrap_or((inner, ""));
    let rest = rest.trim();
    let value = match (rest.find('"'), rest.rfind('"')) {
        (Some(open), Some(close)) if close > open => {
            rest[open + 1..close].replace("\\\"", "\"").replace("\\\\", "\\")
        }
        _ => rest.to_string(),
    };
    Ok((name.to_string(), value))
}

fn is_token_delimiter(c: char) -> bool {
    c.is_whitespace() || matches!(c, '{' | '}' | '(' | ')' | ';')
}

fn parse_movetext(movetext: &str, tree: &mut GameTree) -> Result<(), GameParseError> {
    // Last move of the line being read; `None` before the first move.
    let mut current: Option<usize> = None;
    // Saved `current` of each enclosing line while inside variations.
    let mut stack: Vec<Option<usize>> = Vec::new();

    let mut chars = movetext.char_indices().peekable();
    while let Some((start, c)) = chars.next() {
        match c {
            '{' => {
                if !chars.by_ref().any(|(_, c)| c == '}') {
                    return Err(GameParseError::UnterminatedComment);
                }
            }
            ';' => {
                for (_, c) in chars.by_ref() {
                    if c == '\n' {
                        break;
                    }
                }
            }
            '(' => {
                let last = current.ok_or(GameParseError::VariationWithoutMove)?;
                stack.push(current);
                current = tree.parent_of(last);
            }
            ')' => {
                current = stack.pop().ok_or(GameParseError::UnmatchedVariationEnd)?;
            }
            c if c.is_whitespace() => {}
            _ => {
                let mut end = start + c.len_utf8();
                while let Some(&(i, next)) = chars.peek() {
                    if is_token_delimiter(next) {
                        break;
                    }
                    end = i + next.len_utf8();
                    chars.next();
                }

                match classify_token(&movetext[start..end]) {
                    Token::Skip => {}
                    Token::Termination if stack.is_empty() => break,
                    Token::Termination => {}
                    Token::Move(san) => current = Some(tree.add_move(current, san)?),
                }
            }
        }
    }

    if stack.is_empty() {
        Ok(())
    } else {
        Err(GameParseError::UnterminatedVariation)
    }
}

enum Token<'a> {
    Skip,
    Termination,
    Move(&'a str),
}

fn classify_token(token: &str) -> Token<'_> {
    if matches!(token, "1-0" | "0-1" | "1/2-1/2" | "*") {
        return Token::Termination;
    }
    if token.starts_with('$') || token.chars().all(|c| matches!(c, '!' | '?')) {
        return Token::Skip;
    }

    // Move numbers, possibly glued to the move: "12.", "12...", "12.Nf3".
    let mut body = token;
    let unnumbered = token.trim_start_matches(|c: char| c.is_ascii_digit());
    if unnumbered.len() < token.len() {
        body = unnumbered.trim_start_matches('.');
        if body.is_empty() {
            return Token::Skip;
        }
    }

    Token::Move(strip_suffixes(body))
}

/// Strips check marks and annotation glyphs and spells zero-castling with
/// letters.
fn strip_suffixes(token: &str) -> &str {
    match token.trim_end_matches(['+', '#', '!', '?']) {
        "0-0" => "O-O",
        "0-0-0" => "O-O-O",
        other => other,
    }
}
