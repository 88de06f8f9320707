//! The time-sliced loader state machine.
//!
//! A [`TimeSlicedLoader`] owns the raw input of one load, a decode cursor and
//! the book being assembled. Each call to [`resume`](TimeSlicedLoader::resume)
//! decodes units until the input runs out or the slice budget is spent, and
//! tells the caller what to do next through a [`Step`]:
//!
//! ```text
//! Idle --load ok--> Running --input exhausted--> Finished
//!   |                 |  ^
//!   |                 |  | Step::Yield(delay), resumed by the host
//!   |                 +--+
//!   +--load failed--> Aborted <--abort-- Running
//! ```
//!
//! Only a new `load` leaves `Finished` or `Aborted`. A `resume` that arrives
//! in any state other than `Running` (for example a timer scheduled before an
//! abort) does nothing.

use std::fmt;
use std::path::Path;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::assembler::BookAssembler;
use crate::book::{Book, BookFormat};
use crate::config::LoaderConfig;
use crate::decoder::{BookDecoder, RecordDecoder};
use crate::error::LoadError;
use crate::host::{Host, MessageColor};

/// Message shown to the host when a load fails or is cancelled.
pub const ABORT_MESSAGE: &str = "Book load failed or was aborted.";

/// Lifecycle of a loader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoaderState {
    /// Nothing loaded yet.
    Idle,
    /// A load is in progress.
    Running,
    /// The last load completed and its book was handed to the host.
    Finished,
    /// The last load failed or was cancelled.
    Aborted,
}

/// What the host should do after a call into the loader.
#[must_use]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// The slice budget ran out. Call [`TimeSlicedLoader::resume`] again
    /// after this delay.
    Yield(Duration),
    /// Nothing left to do: the load finished, was aborted, or was not
    /// running.
    Done,
}

/// Statistics of the last finished load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadSummary {
    /// Format of the loaded book.
    pub format: BookFormat,
    /// Number of records in the finished book.
    pub records: usize,
    /// Number of units decoded.
    pub units: usize,
    /// True if any unit failed to decode and was skipped.
    pub had_errors: bool,
    /// True if records arrived out of order and a sort pass ran.
    pub resorted: bool,
    /// Time from `load` to completion.
    pub elapsed: Duration,
}

/// State owned by a load while it is running.
#[derive(Debug)]
struct InFlight {
    input: Vec<u8>,
    cursor: usize,
    total_units: Option<usize>,
    assembler: BookAssembler,
    error_flag: bool,
}

/// Loads one book at a time in cooperative slices.
///
/// The loader never blocks for much longer than its slice budget: it reads
/// the clock every [`check_interval`](LoaderConfig::check_interval) units and
/// yields once the budget is exceeded. The finished [`Book`] is moved to the
/// host; the loader keeps no reference to it.
#[derive(Debug)]
pub struct TimeSlicedLoader<D = BookDecoder> {
    decoder: D,
    config: LoaderConfig,
    state: LoaderState,
    in_flight: Option<InFlight>,
    started: Instant,
    summary: Option<LoadSummary>,
}

impl TimeSlicedLoader {
    /// Creates a loader for the given format.
    #[must_use]
    pub fn for_format(format: BookFormat, config: LoaderConfig) -> Self {
        Self::new(BookDecoder::for_format(format), config)
    }
}

impl<D: RecordDecoder> TimeSlicedLoader<D> {
    /// Creates an idle loader around `decoder`.
    pub fn new(decoder: D, config: LoaderConfig) -> Self {
        Self {
            decoder,
            config,
            state: LoaderState::Idle,
            in_flight: None,
            started: Instant::now(),
            summary: None,
        }
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> LoaderState {
        self.state
    }

    /// Format of the books this loader produces.
    #[must_use]
    pub fn format(&self) -> BookFormat {
        self.decoder.format()
    }

    /// The decoder driving this loader.
    #[must_use]
    pub fn decoder(&self) -> &D {
        &self.decoder
    }

    /// Statistics of the last finished load, if any.
    #[must_use]
    pub fn summary(&self) -> Option<&LoadSummary> {
        self.summary.as_ref()
    }

    /// Units decoded and total units of the running load.
    ///
    /// The total is unknown until the first slice has run.
    #[must_use]
    pub fn progress(&self) -> Option<(usize, Option<usize>)> {
        self.in_flight
            .as_ref()
            .map(|load| (load.cursor, load.total_units))
    }

    /// Reads the book at `path` and starts decoding it.
    ///
    /// Any previous load is discarded. If the file cannot be read the load
    /// is aborted right away and the host gets the abort message; otherwise
    /// the first slice runs before this returns.
    pub fn load(&mut self, path: impl AsRef<Path>, host: &mut impl Host) -> Step {
        let path = path.as_ref();
        self.reset();
        match std::fs::read(path) {
            Ok(bytes) => self.start(bytes, host),
            Err(source) => {
                let err = LoadError::Read {
                    path: path.to_path_buf(),
                    source,
                };
                self.fail(err, host);
                Step::Done
            }
        }
    }

    /// Starts decoding a book already held in memory.
    pub fn load_bytes(&mut self, bytes: Vec<u8>, host: &mut impl Host) -> Step {
        self.reset();
        self.start(bytes, host)
    }

    fn reset(&mut self) {
        self.state = LoaderState::Idle;
        self.in_flight = None;
        self.summary = None;
        self.started = Instant::now();
        self.decoder.reset();
    }

    fn start(&mut self, input: Vec<u8>, host: &mut impl Host) -> Step {
        debug!(format = %self.decoder.format(), bytes = input.len(), "Book load started");
        self.in_flight = Some(InFlight {
            input,
            cursor: 0,
            total_units: None,
            assembler: BookAssembler::new(self.decoder.format()),
            error_flag: false,
        });
        self.state = LoaderState::Running;
        self.resume(host)
    }

    /// Runs one slice of the load.
    ///
    /// Does nothing unless the loader is running. The first slice of a load
    /// also runs the decoder's pre-split.
    pub fn resume(&mut self, host: &mut impl Host) -> Step {
        if self.state != LoaderState::Running {
            return Step::Done;
        }
        let Some(load) = self.in_flight.as_mut() else {
            return Step::Done;
        };

        let slice_start = Instant::now();
        let budget = self.config.slice_budget();
        let interval = self.config.check_interval();

        let total = match load.total_units {
            Some(total) => total,
            None => {
                self.decoder.pre_split(&load.input);
                let total = self.decoder.unit_count(&load.input);
                debug!(units = total, "Pre-split complete");
                load.total_units = Some(total);
                total
            }
        };

        while load.cursor < total {
            if let Err(err) =
                self.decoder
                    .decode_unit(&load.input, load.cursor, &mut load.assembler)
            {
                if load.error_flag {
                    debug!(error = %err, "Skipping unit");
                } else {
                    warn!(error = %err, "Skipping unit; later unit errors are logged at debug level");
                }
                load.error_flag = true;
            }
            load.cursor += 1;

            if load.cursor < total
                && load.cursor % interval == 0
                && slice_start.elapsed() > budget
            {
                let percent = 100.0 * load.cursor as f64 / total as f64;
                host.set_special_message(&format!("Loading... {percent:.0}%"), None);
                debug!(
                    units_done = load.cursor,
                    units_total = total,
                    slice_ms = slice_start.elapsed().as_millis() as u64,
                    "Yielding to host"
                );
                return Step::Yield(self.config.resume_delay());
            }
        }

        self.finish(host);
        Step::Done
    }

    /// Cancels the running load.
    ///
    /// Releases the input and the partial book and shows the abort message.
    /// `reason` is logged. Does nothing unless a load is running.
    pub fn abort(&mut self, reason: impl fmt::Display, host: &mut impl Host) {
        if self.state != LoaderState::Running {
            debug!(reason = %reason, state = ?self.state, "Ignoring abort, no load in progress");
            return;
        }
        self.fail(reason, host);
    }

    fn fail(&mut self, reason: impl fmt::Display, host: &mut impl Host) {
        self.state = LoaderState::Aborted;
        self.in_flight = None;
        warn!(
            reason = %reason,
            elapsed_ms = self.started.elapsed().as_millis() as u64,
            "Book load aborted"
        );
        host.set_special_message(ABORT_MESSAGE, None);
    }

    fn finish(&mut self, host: &mut impl Host) {
        self.state = LoaderState::Finished;
        let Some(InFlight {
            input,
            cursor,
            assembler,
            error_flag,
            ..
        }) = self.in_flight.take()
        else {
            return;
        };
        drop(input);

        let resorted = !assembler.is_sorted();
        let book: Book = assembler.finalize();
        let format = book.format();
        let records = book.len();

        host.install_book(book);
        host.send_ack_book();
        if error_flag {
            host.set_special_message(
                &format!("Finished loading book (moves: {records}, some errors occurred)"),
                Some(MessageColor::Yellow),
            );
        } else {
            host.set_special_message(
                &format!("Finished loading book (moves: {records})"),
                Some(MessageColor::Green),
            );
        }

        let elapsed = self.started.elapsed();
        info!(
            format = %format,
            records,
            units = cursor,
            errors = error_flag,
            resorted,
            elapsed_ms = elapsed.as_millis() as u64,
            "Book load ended"
        );
        self.summary = Some(LoadSummary {
            format,
            records,
            units: cursor,
            had_errors: error_flag,
            resorted,
            elapsed,
        });
    }
}
