//! Parsing wire bytes back into field values.
//!
//! Parsing consumes a plain synchronous [Read] stream. A short read is
//! reported as a [FramingError] naming the field type and the byte count
//! obtained, which is what lets the frame parser produce its
//! "received only n bytes" diagnostics.

use std::io::Read;

use super::error::{FramingError, Result};
use super::record::{RecordDescriptor, RecordValue};
use super::types::{FieldKind, FieldType, Length, Scalar};
use super::value::{normalize_u64, Value};
use super::warnings::WarningSink;

/// Reads up to `n` bytes, looping until the stream is exhausted or the
/// count is reached. A shorter result means end of stream.
pub fn read_up_to(reader: &mut dyn Read, n: usize) -> Result<Vec<u8>> {
    let mut buf = vec![0u8; n];
    let mut filled = 0;
    while filled < n {
        let got = reader.read(&mut buf[filled..]).map_err(FramingError::Io)?;
        if got == 0 {
            break;
        }
        filled += got;
    }
    buf.truncate(filled);
    Ok(buf)
}

/// Reads single bytes until a null terminator, returning everything
/// before it. End of stream before the terminator is a framing error.
pub fn read_until_null(reader: &mut dyn Read) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    let mut byte = [0u8; 1];
    loop {
        if reader.read(&mut byte).map_err(FramingError::Io)? == 0 {
            return Err(FramingError::UnterminatedString.into());
        }
        if byte[0] == 0 {
            return Ok(out);
        }
        out.push(byte[0]);
    }
}

pub(crate) fn drain(reader: &mut dyn Read) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    reader.read_to_end(&mut out).map_err(FramingError::Io)?;
    Ok(out)
}

impl FieldType {
    /// Decodes one value of this field from the stream. The context is
    /// the enclosing record, used to resolve symbolic lengths.
    pub fn parse(&self, reader: &mut dyn Read, ctx: Option<&RecordValue>) -> Result<Value> {
        if let Some(hooks) = &self.hooks {
            if let Some(decode) = &hooks.decode {
                return decode(self, reader, ctx);
            }
        }
        self.parse_base(reader, ctx)
    }

    /// The parse behavior of the bare field type, ignoring any
    /// [Hooks](super::types::Hooks). Decode hooks call this to delegate.
    pub fn parse_base(&self, reader: &mut dyn Read, ctx: Option<&RecordValue>) -> Result<Value> {
        match &self.kind {
            FieldKind::Scalar(scalar) => parse_scalar(*scalar, reader),
            FieldKind::Bytes {
                length,
                full_string,
            } => match length {
                Length::Auto => Ok(Value::Bytes(read_until_null(reader)?)),
                other => {
                    let n = other.resolve(ctx, "byte string")?;
                    let mut data = read_exact(reader, n, "byte string")?;
                    if !*full_string {
                        if let Some(end) = data.iter().position(|b| *b == 0) {
                            data.truncate(end);
                        }
                    }
                    Ok(Value::Bytes(data))
                }
            },
            FieldKind::Text {
                length,
                encoding,
                policy,
            } => match length {
                Length::Auto => {
                    let raw = read_until_null(reader)?;
                    encoding.decode(&raw, *policy).map(Value::Text).map_err(|e| {
                        FramingError::Codec {
                            detail: format!("error parsing b\"{}\": {e}", raw.escape_ascii()),
                        }
                        .into()
                    })
                }
                other => {
                    let n = other.resolve(ctx, "text string")?;
                    let mut data = read_exact(reader, n, "text string")?;
                    if let Some(end) = data.iter().position(|b| *b == 0) {
                        data.truncate(end);
                    }
                    Ok(Value::Text(encoding.decode(&data, *policy)?))
                }
            },
            FieldKind::Array { length, element } => {
                let n = length.resolve(ctx, "array")?;
                let mut items = Vec::with_capacity(n);
                for _ in 0..n {
                    items.push(element.parse(reader, ctx)?);
                }
                Ok(Value::List(items))
            }
            FieldKind::Record(descriptor) => Ok(Value::Record(RecordValue::parse_with(
                descriptor,
                reader,
                &WarningSink::default(),
            )?)),
        }
    }
}

impl RecordValue {
    /// Decodes one record from the stream with the default lenient
    /// [WarningSink].
    pub fn parse(descriptor: &std::sync::Arc<RecordDescriptor>, reader: &mut dyn Read) -> Result<RecordValue> {
        RecordValue::parse_with(descriptor, reader, &WarningSink::default())
    }

    /// Decodes one record: a fresh value bound to the descriptor, each
    /// field parsed in declaration order with the partially-built record
    /// as context, so later fields can resolve their lengths from
    /// already-parsed ones. Every parsed value goes through the normal
    /// assignment checks, so a wire constant that disagrees with the
    /// declared `always` is reported to the sink.
    pub fn parse_with(
        descriptor: &std::sync::Arc<RecordDescriptor>,
        reader: &mut dyn Read,
        sink: &WarningSink,
    ) -> Result<RecordValue> {
        let mut record = RecordValue::empty(descriptor.clone());
        for field in descriptor.fields() {
            let value = field.ty().parse(reader, Some(&record))?;
            record.set_with(field.name(), value, sink)?;
        }
        Ok(record)
    }
}

fn read_exact(reader: &mut dyn Read, n: usize, ty: &str) -> Result<Vec<u8>> {
    let buf = read_up_to(reader, n)?;
    if buf.len() < n {
        return Err(FramingError::Short {
            ty: ty.to_string(),
            needed: n,
            got: buf.len(),
        }
        .into());
    }
    Ok(buf)
}

fn parse_scalar(scalar: Scalar, reader: &mut dyn Read) -> Result<Value> {
    let buf = read_exact(reader, scalar.wire_len(), scalar.name())?;
    let value = match scalar {
        Scalar::I8 => Value::Int(i64::from(buf[0] as i8)),
        Scalar::U8 => Value::Int(i64::from(buf[0])),
        Scalar::I16 => Value::Int(i64::from(i16::from_be_bytes([buf[0], buf[1]]))),
        Scalar::U16 => Value::Int(i64::from(u16::from_be_bytes([buf[0], buf[1]]))),
        Scalar::I32 => Value::Int(i64::from(i32::from_be_bytes([
            buf[0], buf[1], buf[2], buf[3],
        ]))),
        Scalar::U32 => Value::Int(i64::from(u32::from_be_bytes([
            buf[0], buf[1], buf[2], buf[3],
        ]))),
        Scalar::I64 => {
            let mut raw = [0u8; 8];
            raw.copy_from_slice(&buf);
            Value::Int(i64::from_be_bytes(raw))
        }
        Scalar::U64 => {
            let mut raw = [0u8; 8];
            raw.copy_from_slice(&buf);
            normalize_u64(u64::from_be_bytes(raw))
        }
        Scalar::F32 => Value::Float(f64::from(f32::from_be_bytes([
            buf[0], buf[1], buf[2], buf[3],
        ]))),
        Scalar::F64 => {
            let mut raw = [0u8; 8];
            raw.copy_from_slice(&buf);
            Value::Float(f64::from_be_bytes(raw))
        }
    };
    Ok(value)
}
