//! Drives a [`TimeSlicedLoader`] on the tokio runtime.
//!
//! The loader itself never sleeps or spawns. These helpers turn each
//! [`Step::Yield`] into a `tokio::time::sleep` so other tasks on the same
//! runtime get to run between slices.

use std::path::Path;

use tracing::trace;

use crate::decoder::RecordDecoder;
use crate::host::Host;
use crate::loader::{LoaderState, Step, TimeSlicedLoader};

/// Resumes `loader` until it reports [`Step::Done`].
///
/// Returns the loader's final state. The future holds the loader for the
/// whole load; to cancel, drop it (for example by racing it against a signal
/// in `tokio::select!`) and then call [`TimeSlicedLoader::abort`].
pub async fn drive<D, H>(loader: &mut TimeSlicedLoader<D>, first: Step, host: &mut H) -> LoaderState
where
    D: RecordDecoder,
    H: Host,
{
    let mut step = first;
    while let Step::Yield(delay) = step {
        trace!(delay_ms = delay.as_millis() as u64, "Waiting before next slice");
        tokio::time::sleep(delay).await;
        step = loader.resume(host);
    }
    loader.state()
}

/// Loads the book at `path` and drives it to completion.
pub async fn load_and_drive<D, H>(
    loader: &mut TimeSlicedLoader<D>,
    path: impl AsRef<Path>,
    host: &mut H,
) -> LoaderState
where
    D: RecordDecoder,
    H: Host,
{
    let first = loader.load(path, host);
    drive(loader, first, host).await
}

/// Loads an in-memory book and drives it to completion.
pub async fn load_bytes_and_drive<D, H>(
    loader: &mut TimeSlicedLoader<D>,
    bytes: Vec<u8>,
    host: &mut H,
) -> LoaderState
where
    D: RecordDecoder,
    H: Host,
{
    let first = loader.load_bytes(bytes, host);
    drive(loader, first, host).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::book::BookFormat;
    use crate::config::LoaderConfig;
    use crate::error::LoadError;
    use crate::host::RecordingHost;
    use std::time::Duration;

    fn polyglot(count: u64) -> Vec<u8> {
        (0..count)
            .rev()
            .flat_map(|key| {
                let mut bytes = [0u8; 16];
                bytes[0..8].copy_from_slice(&key.to_be_bytes());
                bytes
            })
            .collect()
    }

    #[tokio::test]
    async fn test_drive_runs_to_completion() {
        let config = LoaderConfig {
            slice_budget_ms: 0,
            resume_delay_ms: 5,
            check_interval: 16,
        };
        let mut loader = TimeSlicedLoader::for_format(BookFormat::Polyglot, config);
        let mut host = RecordingHost::new();

        let state = load_bytes_and_drive(&mut loader, polyglot(256), &mut host).await;
        assert_eq!(state, LoaderState::Finished);

        let book = host.take_book().unwrap();
        assert_eq!(book.len(), 256);
        assert_eq!(book.keys().next(), Some(0));
        assert!(loader.summary().unwrap().resorted);
        assert!(host.messages().iter().any(|m| m.starts_with("Loading... ")));
    }

    #[tokio::test]
    async fn test_cancel_by_dropping_drive_then_abort() {
        let config = LoaderConfig {
            slice_budget_ms: 0,
            resume_delay_ms: 5,
            check_interval: 16,
        };
        let mut loader = TimeSlicedLoader::for_format(BookFormat::Polyglot, config);
        let mut host = RecordingHost::new();

        let first = loader.load_bytes(polyglot(4096), &mut host);
        let finished = tokio::select! {
            _ = drive(&mut loader, first, &mut host) => true,
            _ = tokio::time::sleep(Duration::from_millis(20)) => false,
        };
        assert!(!finished);
        assert_eq!(loader.state(), LoaderState::Running);

        loader.abort(LoadError::Cancelled, &mut host);
        assert_eq!(loader.state(), LoaderState::Aborted);
        assert_eq!(host.books_installed(), 0);
        assert_eq!(loader.resume(&mut host), Step::Done);
    }

    #[tokio::test]
    async fn test_drive_done_returns_immediately() {
        let mut loader = TimeSlicedLoader::for_format(BookFormat::Pgn, LoaderConfig::default());
        let mut host = RecordingHost::new();
        assert_eq!(drive(&mut loader, Step::Done, &mut host).await, LoaderState::Idle);
        assert!(host.events().is_empty());
    }

    #[tokio::test]
    async fn test_load_and_drive_missing_file() {
        let mut loader = TimeSlicedLoader::for_format(BookFormat::Polyglot, LoaderConfig::default());
        let mut host = RecordingHost::new();
        let state = load_and_drive(&mut loader, "/nonexistent/book.bin", &mut host).await;
        assert_eq!(state, LoaderState::Aborted);
        assert_eq!(host.books_installed(), 0);
    }
}
