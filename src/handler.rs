//! Routing decoded records to user callbacks.
//!
//! A [Handler] owns some user state and a table of callbacks keyed by
//! the snake_case form of the record names they answer to. Raw bytes
//! that matched no discriminator go to a replaceable `raw_data` slot.
//! [run_session] glues a [Parser] and a [Handler] to one connection's
//! reader and writer.

use std::collections::HashMap;
use std::io::{Read, Write};

use bytes::Bytes;
use heck::ToSnakeCase;

use super::error::{DescriptorError, FramingError, Result};
use super::events::{Event, EventSink};
use super::frame::{Frame, Parser};
use super::record::RecordValue;

/// Errors user callbacks may return; anything displayable works.
pub type CallbackError = Box<dyn std::error::Error + Send + Sync>;

/// What a callback hands back to be sent to the peer.
#[derive(Debug)]
pub enum Reply {
    /// A record to serialize and send.
    Record(RecordValue),
    /// Raw bytes to send verbatim.
    Raw(Bytes),
}

impl From<RecordValue> for Reply {
    fn from(record: RecordValue) -> Reply {
        Reply::Record(record)
    }
}

impl From<Bytes> for Reply {
    fn from(data: Bytes) -> Reply {
        Reply::Raw(data)
    }
}

impl From<Vec<u8>> for Reply {
    fn from(data: Vec<u8>) -> Reply {
        Reply::Raw(Bytes::from(data))
    }
}

impl From<&'static [u8]> for Reply {
    fn from(data: &'static [u8]) -> Reply {
        Reply::Raw(Bytes::from_static(data))
    }
}

/// Derives the callback name for a record name: lowercased, with
/// underscores inserted at word boundaries.
///
/// ```
/// # use wirerec::callback_name;
/// assert_eq!("some_struct", callback_name("SomeStruct"));
/// assert_eq!("rs485_adaptor", callback_name("RS485Adaptor"));
/// ```
pub fn callback_name(record_name: &str) -> String {
    record_name.to_snake_case()
}

/// The name of the raw-bytes slot; record names may not collide with it.
const RAW_DATA: &str = "raw_data";

type Callback<S> = Box<dyn FnMut(&mut S, RecordValue) -> std::result::Result<Option<Reply>, CallbackError>>;
type RawCallback<S> =
    Box<dyn FnMut(&mut S, &[u8], &dyn EventSink) -> std::result::Result<Option<Reply>, CallbackError>>;

/// User state plus the callbacks that records are routed to.
pub struct Handler<S> {
    state: S,
    callbacks: HashMap<String, Callback<S>>,
    raw: RawCallback<S>,
}

impl<S: 'static> Handler<S> {
    /// A handler around the given state with no callbacks registered and
    /// the default raw handler, which logs an error for any unparsed
    /// bytes.
    pub fn new(state: S) -> Handler<S> {
        Handler {
            state,
            callbacks: HashMap::new(),
            raw: Box::new(default_raw_data),
        }
    }

    /// Registers a callback under a callback name, usually
    /// `callback_name(record_name)` of the record it answers to.
    pub fn on(
        mut self,
        callback: &str,
        f: impl FnMut(&mut S, RecordValue) -> std::result::Result<Option<Reply>, CallbackError>
            + 'static,
    ) -> Handler<S> {
        self.callbacks.insert(callback.to_string(), Box::new(f));
        self
    }

    /// Replaces the raw-bytes handler.
    pub fn on_raw(
        mut self,
        f: impl FnMut(&mut S, &[u8], &dyn EventSink) -> std::result::Result<Option<Reply>, CallbackError>
            + 'static,
    ) -> Handler<S> {
        self.raw = Box::new(f);
        self
    }

    /// The wrapped state.
    pub fn state(&self) -> &S {
        &self.state
    }

    /// The wrapped state, mutably.
    pub fn state_mut(&mut self) -> &mut S {
        &mut self.state
    }

    /// Checks every candidate of the parser against the reserved
    /// callback names.
    pub fn check_bindings(&self, parser: &Parser) -> Result<()> {
        for descriptor in parser.records() {
            let callback = callback_name(descriptor.name());
            if callback == RAW_DATA {
                return Err(DescriptorError::ReservedCallback {
                    record: descriptor.name().to_string(),
                    callback,
                }
                .into());
            }
        }
        Ok(())
    }

    /// Routes one frame to the matching callback and returns its reply.
    ///
    /// A record with no registered callback logs
    /// "`<name>` handler not defined" on the error stream. A callback
    /// error is logged on the stack stream; either way dispatch reports
    /// no reply and the caller can continue with the next frame.
    pub fn dispatch(&mut self, frame: Frame, events: &dyn EventSink) -> Option<Reply> {
        match frame {
            Frame::Raw(data) => match (self.raw)(&mut self.state, &data, events) {
                Ok(reply) => reply,
                Err(error) => {
                    events.emit(Event::Stack(&error_chain(&*error)));
                    None
                }
            },
            Frame::Record(record) => {
                let name = callback_name(record.descriptor().name());
                match self.callbacks.get_mut(&name) {
                    None => {
                        events.emit(Event::Error(&format!("{name} handler not defined")));
                        None
                    }
                    Some(callback) => match callback(&mut self.state, record) {
                        Ok(reply) => reply,
                        Err(error) => {
                            events.emit(Event::Stack(&error_chain(&*error)));
                            None
                        }
                    },
                }
            }
        }
    }
}

fn default_raw_data<S>(
    _state: &mut S,
    data: &[u8],
    events: &dyn EventSink,
) -> std::result::Result<Option<Reply>, CallbackError> {
    if !data.is_empty() {
        events.emit(Event::Error(&format!(
            "unable to resolve b\"{}\" to a record",
            data.escape_ascii()
        )));
    }
    Ok(None)
}

fn error_chain(error: &(dyn std::error::Error + 'static)) -> String {
    let mut out = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        out.push_str(&format!("\ncaused by: {cause}"));
        source = cause.source();
    }
    out
}

/// Serializes a reply, logs it on the struct/raw streams, and writes it.
pub fn send_reply(parser: &Parser, reply: &Reply, writer: &mut dyn Write) -> Result<()> {
    let data = match reply {
        Reply::Record(record) => {
            parser.events().emit(Event::StructSent(record));
            record.serialize_with(parser.warnings())?
        }
        Reply::Raw(data) => data.clone(),
    };
    parser.events().emit(Event::RawSent(&data));
    writer.write_all(&data).map_err(FramingError::Io)?;
    writer.flush().map_err(FramingError::Io)?;
    Ok(())
}

/// Reads frames off one connection until the stream is exhausted,
/// dispatching each and writing back any replies.
///
/// Callback errors are logged and the session continues with the next
/// frame; only parse and write failures end it early.
pub fn run_session<S: 'static>(
    parser: &Parser,
    handler: &mut Handler<S>,
    reader: &mut dyn Read,
    writer: &mut dyn Write,
) -> Result<()> {
    handler.check_bindings(parser)?;
    while let Some(frame) = parser.parse(reader)? {
        if let Some(reply) = handler.dispatch(frame, parser.events()) {
            send_reply(parser, &reply, writer)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::test::RecordingSink;
    use crate::record::test::{named_point, NP_BUF};
    use crate::record::{RecordDescriptor, RecordValue};
    use crate::types::FieldType;
    use crate::value::Value;
    use crate::warnings::WarningSink;
    use std::rc::Rc;
    use std::sync::Arc;

    #[test]
    fn test_callback_name_derivation() {
        assert_eq!("some_struct", callback_name("SomeStruct"));
        assert_eq!("ssn_lookup", callback_name("SSNLookup"));
        assert_eq!("rs485_adaptor", callback_name("RS485Adaptor"));
        assert_eq!("rot13_encoded", callback_name("Rot13Encoded"));
        assert_eq!("request_q", callback_name("RequestQ"));
        assert_eq!("john316", callback_name("John316"));
    }

    #[test]
    fn test_already_underscored_names_pass_through() {
        assert_eq!("rs485adaptor", callback_name("rs485adaptor"));
        assert_eq!("rot13_encoded", callback_name("rot13_encoded"));
    }

    fn recording_parser(
        records: Vec<Arc<RecordDescriptor>>,
    ) -> (Parser, Rc<RecordingSink>) {
        let sink = Rc::new(RecordingSink::default());
        let parser =
            Parser::with_options(records, Box::new(sink.clone()), WarningSink::default()).unwrap();
        (parser, sink)
    }

    #[test]
    fn test_dispatch_returns_the_reply() {
        let point = named_point();
        let renamed = RecordDescriptor::with_override(
            "RenamedPoint",
            &point,
            vec![("code", FieldType::u16().always(0x4321))],
        )
        .unwrap();
        let (parser, sink) = recording_parser(vec![point.clone()]);

        let mut handler = Handler::new(renamed.clone()).on("named_point", |renamed, np| {
            let reply = RecordValue::build(
                renamed,
                vec![
                    ("x", np.get("x").cloned().unwrap()),
                    ("y", np.get("y").cloned().unwrap()),
                ],
            )?;
            Ok(Some(reply.into()))
        });

        let mut reader: &[u8] = NP_BUF;
        let mut written = Vec::new();
        run_session(&parser, &mut handler, &mut reader, &mut written).unwrap();

        let parsed = RecordValue::parse(&renamed, &mut &written[..]).unwrap();
        assert_eq!(Some(&Value::Int(0x4321)), parsed.get("code"));
        assert_eq!(Some(&Value::Int(5)), parsed.get("x"));
        assert!(sink.contains("struct-sent RenamedPoint("));
        assert!(sink.contains("raw-sent"));
    }

    #[test]
    fn test_missing_handler_is_logged() {
        let (parser, sink) = recording_parser(vec![named_point()]);
        let mut handler: Handler<()> = Handler::new(());
        let mut reader: &[u8] = NP_BUF;
        let mut written = Vec::new();
        run_session(&parser, &mut handler, &mut reader, &mut written).unwrap();
        assert!(sink.contains("error named_point handler not defined"));
        assert!(written.is_empty());
    }

    #[test]
    fn test_raw_bytes_reach_the_raw_handler() {
        let (parser, sink) = recording_parser(vec![named_point()]);
        let mut handler: Handler<Vec<u8>> = Handler::new(Vec::new())
            .on_raw(|seen, data, _events| {
                seen.extend_from_slice(data);
                Ok(None)
            });
        let mut reader: &[u8] = b"raw data";
        let mut written = Vec::new();
        run_session(&parser, &mut handler, &mut reader, &mut written).unwrap();
        assert_eq!(b"raw data", &handler.state()[..]);
        assert!(sink.contains("raw-received b\"raw data\""));
    }

    #[test]
    fn test_default_raw_handler_logs_an_error() {
        let (parser, sink) = recording_parser(vec![named_point()]);
        let mut handler: Handler<()> = Handler::new(());
        let mut reader: &[u8] = b"junk";
        let mut written = Vec::new();
        run_session(&parser, &mut handler, &mut reader, &mut written).unwrap();
        assert!(sink.contains("error unable to resolve b\"junk\" to a record"));
    }

    #[test]
    fn test_callback_errors_are_logged_and_skipped() {
        let (parser, sink) = recording_parser(vec![named_point()]);
        let mut handler = Handler::new(0u32).on("named_point", |count, _np| {
            *count += 1;
            Err("callback exploded".into())
        });
        let mut wire = NP_BUF.to_vec();
        wire.extend_from_slice(NP_BUF);
        let mut reader: &[u8] = &wire;
        let mut written = Vec::new();
        run_session(&parser, &mut handler, &mut reader, &mut written).unwrap();
        assert_eq!(2, *handler.state(), "the session continues past errors");
        assert!(sink.contains("stack callback exploded"));
        assert!(written.is_empty());
    }

    #[test]
    fn test_raw_reply_is_written_verbatim() {
        let (parser, _) = recording_parser(vec![named_point()]);
        let mut handler = Handler::new(()).on("named_point", |_state, _np| {
            Ok(Some(b"Hello World!\n".to_vec().into()))
        });
        let mut reader: &[u8] = NP_BUF;
        let mut written = Vec::new();
        run_session(&parser, &mut handler, &mut reader, &mut written).unwrap();
        assert_eq!(b"Hello World!\n", &written[..]);
    }

    #[test]
    fn test_reserved_callback_name_rejected() {
        let bad = RecordDescriptor::new(
            "RawData",
            vec![("code", FieldType::i32().always(1))],
        )
        .unwrap();
        let (parser, _) = recording_parser(vec![bad]);
        let handler: Handler<()> = Handler::new(());
        let err = handler.check_bindings(&parser).unwrap_err();
        assert!(err.to_string().contains("reserved callback name"));
    }
}
