//! chess-book - Loads a Polyglot or PGN opening book and reports on it.
//!
//! The loader runs on a current-thread runtime, so every slice shares the
//! thread with the message printer and the Ctrl-C listener the same way it
//! would share a GUI event loop.

use std::path::PathBuf;

use anyhow::Context;
use chess_book::{
    scheduler, Book, BookFormat, ChannelHost, HostEvent, LoadError, LoaderConfig, LoaderState,
    MessageColor, TimeSlicedLoader,
};
use clap::Parser;
use tokio::signal;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing_subscriber::EnvFilter;

/// Loads an opening book in time slices.
#[derive(Parser)]
#[command(name = "chess-book")]
#[command(about = "Loads a Polyglot or PGN opening book")]
struct Args {
    /// Book file to load
    path: PathBuf,

    /// Book format (polyglot or pgn); detected from the extension if omitted
    #[arg(long)]
    format: Option<BookFormat>,

    /// TOML file with loader settings
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print the first N records of the finished book
    #[arg(long, default_value = "0")]
    top: usize,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
    let args = Args::parse();

    let format = match args.format {
        Some(format) => format,
        None => BookFormat::from_path(&args.path).with_context(|| {
            format!(
                "cannot detect book format of {}, pass --format",
                args.path.display()
            )
        })?,
    };
    let config = match &args.config {
        Some(path) => LoaderConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => LoaderConfig::default(),
    };
    tracing::info!(path = %args.path.display(), %format, ?config, "Loading book");

    let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
    let printer = tokio::spawn(print_events(rx));
    let mut host = ChannelHost::new(tx);
    let mut loader = TimeSlicedLoader::for_format(format, config);

    let first = loader.load(&args.path, &mut host);
    let interrupted = tokio::select! {
        _ = scheduler::drive(&mut loader, first, &mut host) => false,
        result = signal::ctrl_c() => {
            result.context("failed to listen for ctrl-c")?;
            true
        }
    };
    if interrupted {
        tracing::info!("Interrupt received");
        loader.abort(LoadError::Cancelled, &mut host);
    }

    // Closing the channel lets the printer finish.
    drop(host);
    let book = printer.await.context("message printer panicked")?;

    if loader.state() != LoaderState::Finished {
        anyhow::bail!("book was not loaded");
    }
    if let Some(summary) = loader.summary() {
        println!(
            "{} records from {} {} units in {} ms{}",
            summary.records,
            summary.units,
            summary.format,
            summary.elapsed.as_millis(),
            if summary.resorted { " (sorted)" } else { "" }
        );
    }
    if let Some(book) = book {
        for record in book.records().iter().take(args.top) {
            println!("{record}");
        }
    }
    Ok(())
}

/// Prints host messages until the loader side hangs up, returning the
/// installed book.
async fn print_events(mut rx: UnboundedReceiver<HostEvent>) -> Option<Book> {
    let mut book = None;
    while let Some(event) = rx.recv().await {
        match event {
            HostEvent::Message { text, color } => match color {
                Some(MessageColor::Green) => eprintln!("\x1b[32m{text}\x1b[0m"),
                Some(MessageColor::Yellow) => eprintln!("\x1b[33m{text}\x1b[0m"),
                None => eprintln!("{text}"),
            },
            HostEvent::BookInstalled(installed) => book = Some(installed),
            HostEvent::BookAck => tracing::debug!("Book acknowledged"),
        }
    }
    book
}
