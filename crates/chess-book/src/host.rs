//! The loader's view of its host application.
//!
//! The host is whatever owns the event loop: a GUI, a CLI, a test. The loader
//! talks to it only through [`Host`]: status messages, the finished book
//! (moved in by value), and an acknowledgement that the book is ready.

use tokio::sync::mpsc::UnboundedSender;

use crate::book::Book;

/// Colour hint for a status message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageColor {
    /// Finished without problems.
    Green,
    /// Finished, but some units were skipped.
    Yellow,
}

/// Notifications the loader sends to its host.
pub trait Host {
    /// Shows a progress or status message.
    fn set_special_message(&mut self, text: &str, color: Option<MessageColor>);

    /// Takes ownership of the finished book.
    fn install_book(&mut self, book: Book);

    /// Signals that the book passed to [`install_book`](Self::install_book)
    /// is ready for use.
    fn send_ack_book(&mut self);
}

/// A host notification, as recorded or sent over a channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostEvent {
    Message {
        text: String,
        color: Option<MessageColor>,
    },
    BookInstalled(Book),
    BookAck,
}

/// A host that records every notification in order.
#[derive(Debug, Default)]
pub struct RecordingHost {
    events: Vec<HostEvent>,
}

impl RecordingHost {
    /// Creates an empty recording host.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All notifications received so far.
    #[must_use]
    pub fn events(&self) -> &[HostEvent] {
        &self.events
    }

    /// The texts of all messages received so far.
    #[must_use]
    pub fn messages(&self) -> Vec<&str> {
        self.events
            .iter()
            .filter_map(|e| match e {
                HostEvent::Message { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    /// The last message received, with its colour.
    #[must_use]
    pub fn last_message(&self) -> Option<(&str, Option<MessageColor>)> {
        self.events.iter().rev().find_map(|e| match e {
            HostEvent::Message { text, color } => Some((text.as_str(), *color)),
            _ => None,
        })
    }

    /// Number of books installed so far.
    #[must_use]
    pub fn books_installed(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, HostEvent::BookInstalled(_)))
            .count()
    }

    /// Number of book acknowledgements so far.
    #[must_use]
    pub fn acks(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, HostEvent::BookAck))
            .count()
    }

    /// Removes and returns the most recently installed book.
    pub fn take_book(&mut self) -> Option<Book> {
        let pos = self
            .events
            .iter()
            .rposition(|e| matches!(e, HostEvent::BookInstalled(_)))?;
        match self.events.remove(pos) {
            HostEvent::BookInstalled(book) => Some(book),
            _ => None,
        }
    }

    /// Forgets all recorded notifications.
    pub fn clear(&mut self) {
        self.events.clear();
    }
}

impl Host for RecordingHost {
    fn set_special_message(&mut self, text: &str, color: Option<MessageColor>) {
        self.events.push(HostEvent::Message {
            text: text.to_string(),
            color,
        });
    }

    fn install_book(&mut self, book: Book) {
        self.events.push(HostEvent::BookInstalled(book));
    }

    fn send_ack_book(&mut self) {
        self.events.push(HostEvent::BookAck);
    }
}

/// A host that forwards notifications to a tokio channel.
///
/// Sends are fire-and-forget: if the receiver is gone the notification is
/// dropped.
#[derive(Debug, Clone)]
pub struct ChannelHost {
    tx: UnboundedSender<HostEvent>,
}

impl ChannelHost {
    /// Creates a host that sends on `tx`.
    #[must_use]
    pub fn new(tx: UnboundedSender<HostEvent>) -> Self {
        Self { tx }
    }
}

impl Host for ChannelHost {
    fn set_special_message(&mut self, text: &str, color: Option<MessageColor>) {
        let _ = self.tx.send(HostEvent::Message {
            text: text.to_string(),
            color,
        });
    }

    fn install_book(&mut self, book: Book) {
        let _ = self.tx.send(HostEvent::BookInstalled(book));
    }

    fn send_ack_book(&mut self) {
        let _ = self.tx.send(HostEvent::BookAck);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::book::BookFormat;
    use crate::record::BookRecord;

    fn book() -> Book {
        Book::new(BookFormat::Pgn, vec![BookRecord::pgn(1, "e4", 1)])
    }

    #[test]
    fn test_recording_host_keeps_order() {
        let mut host = RecordingHost::new();
        host.set_special_message("Loading... 50%", None);
        host.install_book(book());
        host.send_ack_book();
        host.set_special_message("done", Some(MessageColor::Green));

        assert_eq!(host.messages(), vec!["Loading... 50%", "done"]);
        assert_eq!(host.last_message(), Some(("done", Some(MessageColor::Green))));
        assert_eq!(host.books_installed(), 1);
        assert_eq!(host.acks(), 1);
        assert!(matches!(host.events()[1], HostEvent::BookInstalled(_)));

        assert_eq!(host.take_book().map(|b| b.len()), Some(1));
        assert_eq!(host.books_installed(), 0);

        host.clear();
        assert!(host.events().is_empty());
    }

    #[test]
    fn test_channel_host_forwards_events() {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let mut host = ChannelHost::new(tx);
        host.set_special_message("hello", None);
        host.install_book(book());
        host.send_ack_book();

        assert_eq!(
            rx.try_recv().unwrap(),
            HostEvent::Message {
                text: "hello".to_string(),
                color: None
            }
        );
        assert!(matches!(rx.try_recv().unwrap(), HostEvent::BookInstalled(_)));
        assert_eq!(rx.try_recv().unwrap(), HostEvent::BookAck);
    }

    #[test]
    fn test_channel_host_ignores_closed_receiver() {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        drop(rx);
        let mut host = ChannelHost::new(tx);
        host.set_special_message("nobody listening", None);
        host.send_ack_book();
    }
}
