//! Serialization of field values into wire bytes.
//!
//! Everything is written in network byte order with no padding between
//! fields. The policies for truncation, padding and default fill are the
//! serializer's half of the failure-semantics table: out-of-range scalars
//! and unfillable arrays are errors, overruns are warnings.

use bytes::{BufMut, Bytes, BytesMut};

use super::error::{FramingError, Result};
use super::record::{RecordDescriptor, RecordValue};
use super::types::{FieldKind, FieldType, Length, Scalar};
use super::value::Value;
use super::warnings::{Warning, WarningSink};

impl FieldType {
    /// Serializes one value of this field with the default lenient
    /// [WarningSink].
    pub fn serialize(&self, value: &Value, ctx: Option<&RecordValue>) -> Result<Bytes> {
        self.serialize_with(value, ctx, &WarningSink::default())
    }

    /// Serializes one value of this field, reporting lossy situations to
    /// the given sink.
    pub fn serialize_with(
        &self,
        value: &Value,
        ctx: Option<&RecordValue>,
        sink: &WarningSink,
    ) -> Result<Bytes> {
        let mut out = BytesMut::new();
        self.serialize_into(value, ctx, &mut out, sink)?;
        Ok(out.freeze())
    }

    /// The serialization behavior of the bare field type, ignoring any
    /// [Hooks](super::types::Hooks). Encode hooks call this to delegate.
    pub fn serialize_base(
        &self,
        value: &Value,
        ctx: Option<&RecordValue>,
        sink: &WarningSink,
    ) -> Result<Bytes> {
        let mut out = BytesMut::new();
        self.serialize_base_into(value, ctx, &mut out, sink)?;
        Ok(out.freeze())
    }

    pub(crate) fn serialize_into(
        &self,
        value: &Value,
        ctx: Option<&RecordValue>,
        out: &mut BytesMut,
        sink: &WarningSink,
    ) -> Result<()> {
        if let Some(hooks) = &self.hooks {
            if let Some(encode) = &hooks.encode {
                let data = encode(self, value, ctx, sink)?;
                out.put_slice(&data);
                return Ok(());
            }
        }
        self.serialize_base_into(value, ctx, out, sink)
    }

    pub(crate) fn serialize_base_into(
        &self,
        value: &Value,
        ctx: Option<&RecordValue>,
        out: &mut BytesMut,
        sink: &WarningSink,
    ) -> Result<()> {
        match &self.kind {
            FieldKind::Scalar(scalar) => {
                write_scalar(*scalar, value, out)?;
                Ok(())
            }
            FieldKind::Bytes { length, .. } => {
                let data = bytes_value(value)?;
                match length {
                    // Embedded nulls would terminate the string early on
                    // the way back in, so they terminate it here too.
                    Length::Auto => {
                        let end = data.iter().position(|b| *b == 0).unwrap_or(data.len());
                        out.put_slice(&data[..end]);
                        out.put_u8(0);
                        Ok(())
                    }
                    other => {
                        let n = other.resolve(ctx, "byte string")?;
                        write_padded(&data, n, "byte string", out, sink)
                    }
                }
            }
            FieldKind::Text {
                length,
                encoding,
                policy,
            } => {
                let text = match value {
                    Value::Text(s) => s.clone(),
                    other => match self.convert_base(other.clone(), sink)? {
                        Value::Text(s) => s,
                        _ => return Err(not_serializable(other, "text string").into()),
                    },
                };
                let encoded = encoding.encode(&text, *policy)?;
                match length {
                    Length::Auto => {
                        out.put_slice(&encoded);
                        out.put_u8(0);
                        Ok(())
                    }
                    other => {
                        let n = other.resolve(ctx, "text string")?;
                        write_padded(&encoded, n, "text string", out, sink)
                    }
                }
            }
            FieldKind::Array { length, element } => {
                let n = length.resolve(ctx, "array")?;
                let mut items = match value {
                    Value::List(items) => items.clone(),
                    other => return Err(not_serializable(other, "array").into()),
                };
                if items.len() > n {
                    sink.report(Warning::ArrayOverrun {
                        limit: n,
                        got: items.len(),
                    })
                    .map_err(FramingError::Strict)?;
                    items.truncate(n);
                } else if items.len() < n {
                    let mut fill = match self.fallback() {
                        Some(Value::List(fill)) => fill,
                        _ => Vec::new(),
                    };
                    while fill.len() < n {
                        match element.fallback() {
                            Some(item) => fill.push(item),
                            None => break,
                        }
                    }
                    let have = items.len();
                    items.extend(fill.into_iter().skip(have));
                    items.truncate(n);
                    if items.len() < n {
                        return Err(FramingError::TooFewElements {
                            needed: n,
                            got: items.len(),
                        }
                        .into());
                    }
                }
                for item in &items {
                    let converted = element.convert_with(item.clone(), sink)?;
                    element.serialize_into(&converted, ctx, out, sink)?;
                }
                Ok(())
            }
            FieldKind::Record(descriptor) => match value {
                Value::Record(record) if record.is_instance_of(descriptor) => {
                    descriptor.serialize_record(record, out, sink)
                }
                other => {
                    Err(not_serializable(other, &format!("record {}", descriptor.name())).into())
                }
            },
        }
    }
}

impl RecordDescriptor {
    pub(crate) fn serialize_record(
        &self,
        record: &RecordValue,
        out: &mut BytesMut,
        sink: &WarningSink,
    ) -> Result<()> {
        for field in self.fields() {
            let ty = field.ty();
            let value = match record.get(field.name()) {
                Some(value) => value.clone(),
                None => {
                    if let Some(fallback) = ty.fallback() {
                        fallback
                    } else if let Some(empty) = empty_for_zero_length(ty, record)? {
                        empty
                    } else {
                        return Err(FramingError::FieldNotSet {
                            record: self.name().to_string(),
                            field: field.name().to_string(),
                        }
                        .into());
                    }
                }
            };
            ty.serialize_into(&value, Some(record), out, sink)?;
        }
        Ok(())
    }
}

impl RecordValue {
    /// Serializes the record with the default lenient [WarningSink].
    ///
    /// Every field must be set, have an applicable default, or be a
    /// variable-length field whose length resolves to zero.
    pub fn serialize(&self) -> Result<Bytes> {
        self.serialize_with(&WarningSink::default())
    }

    /// Serializes the record, reporting lossy situations to the sink.
    pub fn serialize_with(&self, sink: &WarningSink) -> Result<Bytes> {
        let mut out = BytesMut::new();
        self.descriptor().serialize_record(self, &mut out, sink)?;
        Ok(out.freeze())
    }
}

fn empty_for_zero_length(ty: &FieldType, record: &RecordValue) -> Result<Option<Value>> {
    match ty.kind() {
        FieldKind::Bytes {
            length: length @ Length::Field(_),
            ..
        } => {
            if length.resolve(Some(record), "byte string")? == 0 {
                Ok(Some(Value::Bytes(Vec::new())))
            } else {
                Ok(None)
            }
        }
        FieldKind::Text {
            length: length @ Length::Field(_),
            ..
        } => {
            if length.resolve(Some(record), "text string")? == 0 {
                Ok(Some(Value::Text(String::new())))
            } else {
                Ok(None)
            }
        }
        FieldKind::Array {
            length: length @ Length::Field(_),
            element,
        } => {
            let n = length.resolve(Some(record), "array")?;
            if n == 0 || element.has_fallback() {
                // An empty list; the array serializer fills the rest from
                // the element defaults.
                Ok(Some(Value::List(Vec::new())))
            } else {
                Ok(None)
            }
        }
        _ => Ok(None),
    }
}

fn not_serializable(value: &Value, ty: &str) -> FramingError {
    FramingError::NotSerializable {
        value: value.to_string(),
        ty: ty.to_string(),
    }
}

fn bytes_value(value: &Value) -> std::result::Result<Vec<u8>, FramingError> {
    match value {
        Value::Bytes(data) => Ok(data.clone()),
        Value::Text(s) => Ok(s.clone().into_bytes()),
        other => Err(not_serializable(other, "byte string")),
    }
}

fn write_padded(
    data: &[u8],
    n: usize,
    ty: &str,
    out: &mut BytesMut,
    sink: &WarningSink,
) -> Result<()> {
    if data.len() > n {
        sink.report(Warning::StringOverrun {
            ty: ty.to_string(),
            limit: n,
            got: data.len(),
        })
        .map_err(FramingError::Strict)?;
    }
    let kept = data.len().min(n);
    out.put_slice(&data[..kept]);
    if kept < n {
        out.put_bytes(0, n - kept);
    }
    Ok(())
}

fn write_scalar(
    scalar: Scalar,
    value: &Value,
    out: &mut BytesMut,
) -> std::result::Result<(), FramingError> {
    if scalar.is_float() {
        let v = match value {
            Value::Int(v) => *v as f64,
            Value::UInt(v) => *v as f64,
            Value::Float(v) => *v,
            other => return Err(not_serializable(other, scalar.name())),
        };
        match scalar {
            Scalar::F32 => {
                if v.is_finite() && v.abs() > f64::from(f32::MAX) {
                    return Err(FramingError::OutOfRange {
                        value: v.to_string(),
                        ty: scalar.name().to_string(),
                    });
                }
                out.put_f32(v as f32);
            }
            _ => out.put_f64(v),
        }
        return Ok(());
    }

    let v: i128 = match value {
        Value::Int(v) => i128::from(*v),
        Value::UInt(v) => i128::from(*v),
        other => return Err(not_serializable(other, scalar.name())),
    };
    let out_of_range = || FramingError::OutOfRange {
        value: v.to_string(),
        ty: scalar.name().to_string(),
    };
    let check = |lo: i128, hi: i128| if v < lo || v > hi { Err(out_of_range()) } else { Ok(()) };
    match scalar {
        Scalar::I8 => {
            check(i8::MIN.into(), i8::MAX.into())?;
            out.put_i8(v as i8);
        }
        Scalar::U8 => {
            check(0, u8::MAX.into())?;
            out.put_u8(v as u8);
        }
        Scalar::I16 => {
            check(i16::MIN.into(), i16::MAX.into())?;
            out.put_i16(v as i16);
        }
        Scalar::U16 => {
            check(0, u16::MAX.into())?;
            out.put_u16(v as u16);
        }
        Scalar::I32 => {
            check(i32::MIN.into(), i32::MAX.into())?;
            out.put_i32(v as i32);
        }
        Scalar::U32 => {
            check(0, u32::MAX.into())?;
            out.put_u32(v as u32);
        }
        Scalar::I64 => {
            check(i64::MIN.into(), i64::MAX.into())?;
            out.put_i64(v as i64);
        }
        Scalar::U64 => {
            check(0, u64::MAX.into())?;
            out.put_u64(v as u64);
        }
        Scalar::F32 | Scalar::F64 => unreachable!("floats are handled above"),
    }
    Ok(())
}
