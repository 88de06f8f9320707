//! Load-level errors.

use std::path::PathBuf;
use thiserror::Error;

/// Fatal errors that abort a whole load.
///
/// Unit-level problems inside a PGN file are not fatal; see
/// [`UnitError`](crate::decoder::UnitError).
#[derive(Debug, Error)]
pub enum LoadError {
    /// The book file could not be read.
    #[error("failed to read book {}: {}", .path.display(), .source)]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The host cancelled the load.
    #[error("load cancelled")]
    Cancelled,
}
