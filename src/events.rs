//! The event surface emitted by the frame parser and handler binding.
//!
//! The library reports what it saw and sent on five streams: hex dumps
//! and raw byte literals of everything on the wire, decoded records,
//! framing and dispatch errors, and error chains escaping from handler
//! callbacks. Where the streams go is the embedder's business; the
//! default [LogSink] forwards them to the `log` facade under
//! per-stream targets so ordinary logger configuration can route them.

use std::fmt::Write as _;
use std::rc::Rc;
use std::sync::Arc;

use super::record::RecordValue;

/// One emission from the parse/dispatch pipeline.
#[derive(Debug)]
pub enum Event<'a> {
    /// Bytes consumed from the wire.
    RawReceived(&'a [u8]),
    /// Bytes about to be written to the wire.
    RawSent(&'a [u8]),
    /// A record decoded from the wire.
    StructReceived(&'a RecordValue),
    /// A record about to be serialized and sent.
    StructSent(&'a RecordValue),
    /// A framing or dispatch error, already rendered for humans.
    Error(&'a str),
    /// An error chain escaping from a handler callback.
    Stack(&'a str),
}

/// Where events go.
pub trait EventSink {
    /// Receives one event. Implementations must not fail.
    fn emit(&self, event: Event<'_>);
}

impl<T: EventSink + ?Sized> EventSink for &T {
    fn emit(&self, event: Event<'_>) {
        (**self).emit(event);
    }
}

impl<T: EventSink + ?Sized> EventSink for Rc<T> {
    fn emit(&self, event: Event<'_>) {
        (**self).emit(event);
    }
}

impl<T: EventSink + ?Sized> EventSink for Arc<T> {
    fn emit(&self, event: Event<'_>) {
        (**self).emit(event);
    }
}

/// The default sink: forwards every stream to the `log` facade.
///
/// Targets and levels: `wirerec::hex` and `wirerec::raw` at debug,
/// `wirerec::struct` at info, `wirerec::error` and `wirerec::stack` at
/// error.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl EventSink for LogSink {
    fn emit(&self, event: Event<'_>) {
        match event {
            Event::RawReceived(data) => log_binary(data, "received"),
            Event::RawSent(data) => log_binary(data, "sending"),
            Event::StructReceived(record) => {
                log::info!(target: "wirerec::struct", "received {record}");
            }
            Event::StructSent(record) => {
                log::info!(target: "wirerec::struct", "sending {record}");
            }
            Event::Error(message) => log::error!(target: "wirerec::error", "{message}"),
            Event::Stack(trace) => log::error!(target: "wirerec::stack", "{trace}"),
        }
    }
}

fn log_binary(data: &[u8], trans_type: &str) {
    log::debug!(target: "wirerec::hex", "{trans_type}\n{}", hexdump(data));
    log::debug!(target: "wirerec::raw", "{trans_type} b\"{}\"", data.escape_ascii());
}

/// Renders a table of the hexadecimal values of each byte, eight to a
/// row with decimal offsets down the left edge.
pub fn hexdump(data: &[u8]) -> String {
    let mut lines = String::from("     0  1  2  3  4  5  6  7");
    for (i, chunk) in data.chunks(8).enumerate() {
        let _ = write!(lines, "\n{:3}  ", i * 8);
        let hexed: Vec<String> = chunk.iter().map(|b| format!("{b:02x}")).collect();
        lines.push_str(&hexed.join(" "));
    }
    lines
}

#[cfg(test)]
pub(crate) mod test {
    use super::*;
    use std::cell::RefCell;

    /// Records every event as a rendered line, for assertions.
    #[derive(Debug, Default)]
    pub struct RecordingSink {
        pub events: RefCell<Vec<String>>,
    }

    impl RecordingSink {
        pub fn contains(&self, needle: &str) -> bool {
            self.events.borrow().iter().any(|line| line.contains(needle))
        }
    }

    impl EventSink for RecordingSink {
        fn emit(&self, event: Event<'_>) {
            let line = match event {
                Event::RawReceived(data) => format!("raw-received b\"{}\"", data.escape_ascii()),
                Event::RawSent(data) => format!("raw-sent b\"{}\"", data.escape_ascii()),
                Event::StructReceived(record) => format!("struct-received {record}"),
                Event::StructSent(record) => format!("struct-sent {record}"),
                Event::Error(message) => format!("error {message}"),
                Event::Stack(trace) => format!("stack {trace}"),
            };
            self.events.borrow_mut().push(line);
        }
    }
}

#[test]
fn test_hexdump_layout() {
    let dump = hexdump(&[0x12, 0x34, 0x00, 0xFF, 0x01, 0x02, 0x03, 0x04, 0x05]);
    let lines: Vec<&str> = dump.lines().collect();
    assert_eq!("     0  1  2  3  4  5  6  7", lines[0]);
    assert_eq!("  0  12 34 00 ff 01 02 03 04", lines[1]);
    assert_eq!("  8  05", lines[2]);
}

#[test]
fn test_hexdump_empty() {
    assert_eq!("     0  1  2  3  4  5  6  7", hexdump(&[]));
}
