//! Incremental opening book loading.
//!
//! This crate turns raw opening book files into a single in-memory [`Book`]:
//! a list of (position key, move, weight) records sorted by key. Two formats
//! are supported:
//!
//! - Polyglot `.bin` books, fixed 16-byte big-endian entries
//! - PGN game collections, where every game is parsed into a move tree and
//!   merged into the cumulative book
//!
//! Decoding is cooperative. The [`TimeSlicedLoader`] decodes units in batches,
//! reads the clock once per batch of units and hands control back to the host
//! once its time slice is spent, returning a [`Step::Yield`] that asks to be
//! resumed after a short delay. The [`scheduler`] module drives that loop on
//! the tokio timer.
//!
//! # Modules
//!
//! - [`record`] - Book records and format-specific payloads
//! - [`book`] - The finished book and its format tag
//! - [`assembler`] - Record accumulation and the final sort pass
//! - [`decoder`] - Pluggable per-format unit decoders
//! - [`pgn`] - PGN pre-splitting and movetext parsing
//! - [`loader`] - The time-sliced loader state machine
//! - [`host`] - Host notification interface
//! - [`scheduler`] - Async drivers for the loader
//! - [`config`] - Loader tuning loaded from TOML
//!
//! # Example
//!
//! ```ignore
//! use chess_book::{scheduler, BookFormat, LoaderConfig, RecordingHost, TimeSlicedLoader};
//!
//! let mut loader = TimeSlicedLoader::for_format(BookFormat::Polyglot, LoaderConfig::default());
//! let mut host = RecordingHost::new();
//! scheduler::load_and_drive(&mut loader, "book.bin", &mut host).await;
//! let book = host.take_book().expect("book loaded");
//! println!("{} moves", book.len());
//! ```

pub mod assembler;
pub mod book;
pub mod config;
pub mod decoder;
pub mod error;
pub mod host;
pub mod loader;
pub mod pgn;
pub mod record;
pub mod scheduler;

pub use assembler::BookAssembler;
pub use book::{Book, BookFormat};
pub use config::{ConfigError, LoaderConfig};
pub use decoder::{BookDecoder, PgnDecoder, PolyglotDecoder, RecordDecoder, UnitError};
pub use error::LoadError;
pub use host::{ChannelHost, Host, HostEvent, MessageColor, RecordingHost};
pub use loader::{LoadSummary, LoaderState, Step, TimeSlicedLoader};
pub use record::{BookRecord, GameMove, MovePayload, PolyglotEntry};
