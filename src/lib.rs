//! Declaratively define binary wire-format records and parse, validate,
//! emit and dispatch them over byte streams.
//!
//! A record is an ordered sequence of typed fields built from
//! [FieldType]s: scalars in network byte order, fixed and null-terminated
//! strings, text in named encodings, arrays with fixed or cross-field
//! lengths, and nested records. A [RecordDescriptor] validates the
//! declaration eagerly, a [RecordValue] carries the field values and
//! re-checks every assignment, and a [Parser] identifies incoming records
//! on a stream by their leading constant bytes, ready for a [Handler] to
//! route them to callbacks.
//!
//! ```
//! use wirerec::{FieldType, Frame, Parser, RecordDescriptor, RecordValue};
//!
//! let point = RecordDescriptor::new("NamedPoint", vec![
//!     ("code", FieldType::u16().always(0x1234)),
//!     ("x", FieldType::i32()),
//!     ("y", FieldType::i32()),
//!     ("name", FieldType::bytes(15).default(&b"unnamed"[..])),
//! ])?;
//!
//! let record = RecordValue::build(&point, vec![("x", 5.into()), ("y", 6.into())])?;
//! let wire = record.serialize()?;
//! assert_eq!(25, wire.len());
//!
//! let parser = Parser::new(vec![point])?;
//! match parser.parse(&mut &wire[..])? {
//!     Some(Frame::Record(parsed)) => assert_eq!(record, parsed),
//!     other => panic!("expected a NamedPoint, got {other:?}"),
//! }
//! # Ok::<(), wirerec::Error>(())
//! ```
#![deny(missing_docs)]

pub mod de;
pub mod error;
pub mod events;
pub mod frame;
pub mod handler;
pub mod record;
pub mod ser;
pub mod text;
pub mod types;
pub mod value;
pub mod warnings;

pub use error::{DescriptorError, Error, FramingError, Result};
pub use events::{hexdump, Event, EventSink, LogSink};
pub use frame::{Frame, Parser};
pub use handler::{callback_name, run_session, send_reply, CallbackError, Handler, Reply};
pub use record::{Field, RecordDescriptor, RecordValue};
pub use text::{TextEncoding, TextPolicy};
pub use types::{
    CoerceHook, DecodeHook, DefaultSource, EncodeHook, FieldKind, FieldType, Hooks, Length, Scalar,
};
pub use value::Value;
pub use warnings::{Warning, WarningSink};
