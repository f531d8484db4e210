//! Identifying and decoding framed records on a byte stream.
//!
//! Each candidate record whose first field carries an `always` constant
//! contributes a discriminator: the serialized bytes of that constant.
//! The [Parser] peeks just enough of the stream to tell the candidates
//! apart, then replays the peeked bytes through a chained reader so the
//! matched record parses its own discriminator like any other field.

use std::io::{self, Read};
use std::sync::Arc;

use bytes::Bytes;

use super::de::{drain, read_up_to};
use super::error::{DescriptorError, Error, Result};
use super::events::{Event, EventSink, LogSink};
use super::record::{RecordDescriptor, RecordValue};
use super::warnings::{Warning, WarningSink};

/// A reader that first replays a captured peek buffer, then continues
/// from the underlying stream, remembering everything it handed out so
/// error messages can account for consumed bytes.
struct ChainedReader<'a> {
    buffered: Vec<u8>,
    pos: usize,
    inner: &'a mut dyn Read,
    seen: Vec<u8>,
}

impl<'a> ChainedReader<'a> {
    fn new(buffered: Vec<u8>, inner: &'a mut dyn Read) -> ChainedReader<'a> {
        ChainedReader {
            buffered,
            pos: 0,
            inner,
            seen: Vec::new(),
        }
    }

    fn seen(&self) -> &[u8] {
        &self.seen
    }
}

impl Read for ChainedReader<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        let n = if self.pos < self.buffered.len() {
            let n = buf.len().min(self.buffered.len() - self.pos);
            buf[..n].copy_from_slice(&self.buffered[self.pos..self.pos + n]);
            self.pos += n;
            n
        } else {
            self.inner.read(buf)?
        };
        self.seen.extend_from_slice(&buf[..n]);
        Ok(n)
    }
}

/// What one call to [Parser::parse] produced.
#[derive(Debug, PartialEq)]
pub enum Frame {
    /// A record identified by its discriminator and fully decoded.
    Record(RecordValue),
    /// Bytes that matched no discriminator; the rest of the stream.
    Raw(Bytes),
}

/// Identifies incoming records on a stream by their leading constant
/// bytes and decodes them.
pub struct Parser {
    codes: Vec<(Bytes, Arc<RecordDescriptor>)>,
    events: Box<dyn EventSink>,
    warnings: WarningSink,
}

impl std::fmt::Debug for Parser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Parser")
            .field("codes", &self.codes)
            .field("warnings", &self.warnings)
            .finish_non_exhaustive()
    }
}

impl Parser {
    /// Builds a parser over the candidate records, logging events through
    /// the default [LogSink].
    ///
    /// At least one candidate must begin with an `always` constant.
    /// Candidates whose discriminator is a prefix of another's are
    /// reported as a warning: the framing is ambiguous and the shorter
    /// code wins.
    pub fn new(records: Vec<Arc<RecordDescriptor>>) -> Result<Parser> {
        Parser::with_options(records, Box::new(LogSink), WarningSink::default())
    }

    /// Builds a parser with an explicit event sink and warning sink. The
    /// sinks are also used by every subsequent [parse](Parser::parse).
    pub fn with_options(
        records: Vec<Arc<RecordDescriptor>>,
        events: Box<dyn EventSink>,
        warnings: WarningSink,
    ) -> Result<Parser> {
        let mut codes: Vec<(Bytes, Arc<RecordDescriptor>)> = Vec::new();
        for descriptor in records {
            let first = &descriptor.fields()[0];
            if let Some(always) = first.ty().always_value() {
                let code = first.ty().serialize_with(always, None, &warnings)?;
                codes.push((code, descriptor));
            }
        }
        if codes.is_empty() {
            return Err(DescriptorError::NoDiscriminators.into());
        }
        codes.sort_by_key(|(code, _)| code.len());

        let mut pending: Vec<usize> = (0..codes.len()).collect();
        while let Some(&first) = pending.first() {
            let prefix = codes[first].0.clone();
            let matches: Vec<usize> = pending
                .iter()
                .copied()
                .filter(|&i| codes[i].0.starts_with(&prefix))
                .collect();
            if matches.len() > 1 {
                let records: Vec<&str> = matches.iter().map(|&i| codes[i].1.name()).collect();
                warnings
                    .report(Warning::AmbiguousDiscriminator {
                        count: matches.len(),
                        code: format!("b\"{}\"", prefix.escape_ascii()),
                        records: records.join(", "),
                    })
                    .map_err(DescriptorError::Strict)?;
            }
            pending.retain(|i| !matches.contains(i));
        }

        Ok(Parser {
            codes,
            events,
            warnings,
        })
    }

    /// The candidate records, shortest discriminator first.
    pub fn records(&self) -> impl Iterator<Item = &Arc<RecordDescriptor>> {
        self.codes.iter().map(|(_, descriptor)| descriptor)
    }

    /// The event sink this parser reports through.
    pub fn events(&self) -> &dyn EventSink {
        self.events.as_ref()
    }

    pub(crate) fn warnings(&self) -> &WarningSink {
        &self.warnings
    }

    /// Reads one frame from the stream.
    ///
    /// - A recognized discriminator decodes to `Some(Frame::Record(..))`,
    ///   logged on the struct and raw streams.
    /// - Unrecognized leading bytes drain the stream and come back as
    ///   `Some(Frame::Raw(..))` for the caller to deal with.
    /// - A clean end of stream is `None`.
    /// - A framing failure against a recognized discriminator is logged
    ///   ("received only n bytes") and yields `None`; the broken bytes
    ///   have been consumed, so a fresh stream can carry on afterwards.
    pub fn parse(&self, stream: &mut dyn Read) -> Result<Option<Frame>> {
        let mut buf: Vec<u8> = Vec::new();
        let mut hit_eof = false;
        for (code, descriptor) in &self.codes {
            if buf.len() < code.len() {
                let more = read_up_to(stream, code.len() - buf.len())?;
                buf.extend_from_slice(&more);
                if buf.len() < code.len() {
                    hit_eof = true;
                    break;
                }
            }
            if buf[..] == code[..] {
                let mut chained = ChainedReader::new(std::mem::take(&mut buf), stream);
                match RecordValue::parse_with(descriptor, &mut chained, &self.warnings) {
                    Ok(record) => {
                        self.events.emit(Event::StructReceived(&record));
                        self.events.emit(Event::RawReceived(chained.seen()));
                        return Ok(Some(Frame::Record(record)));
                    }
                    Err(Error::Framing(_)) => {
                        let message = format!(
                            "{} record received only {} bytes",
                            descriptor.name(),
                            chained.seen().len()
                        );
                        self.events.emit(Event::Error(&message));
                        self.events.emit(Event::RawReceived(chained.seen()));
                        return Ok(None);
                    }
                    Err(error) => {
                        self.events.emit(Event::RawReceived(chained.seen()));
                        return Err(error);
                    }
                }
            }
        }
        if !hit_eof {
            let rest = drain(stream)?;
            buf.extend_from_slice(&rest);
        }
        if buf.is_empty() {
            Ok(None)
        } else {
            self.events.emit(Event::RawReceived(&buf));
            Ok(Some(Frame::Raw(Bytes::from(buf))))
        }
    }
}
