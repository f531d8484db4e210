//! The dynamic values carried by record fields, and the coercion rules
//! that run whenever a value is assigned to a field.

use std::fmt::{self, Display, Formatter};

use super::error::FramingError;
use super::record::RecordValue;
use super::text::{TextEncoding, TextPolicy};
use super::types::{FieldKind, FieldType, Scalar};
use super::warnings::{Warning, WarningSink};

/// One value of any field type.
///
/// Integers are normalized so that [UInt](Value::UInt) only ever holds
/// values above `i64::MAX`; everything else lives in [Int](Value::Int).
/// Equality still compares across the two representations.
#[derive(Debug, Clone)]
pub enum Value {
    /// Any integer representable as an `i64`.
    Int(i64),
    /// Integers above `i64::MAX`.
    UInt(u64),
    /// A floating point number.
    Float(f64),
    /// The value of a byte string field.
    Bytes(Vec<u8>),
    /// The value of a text string field.
    Text(String),
    /// The value of an array field.
    List(Vec<Value>),
    /// The value of a nested record field.
    Record(RecordValue),
}

impl Value {
    /// Builds a [List](Value::List) from anything whose items convert.
    pub fn list<T: Into<Value>>(items: impl IntoIterator<Item = T>) -> Value {
        Value::List(items.into_iter().map(Into::into).collect())
    }

    /// The integer value, if this is an integer that fits an `i64`.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// The text value, if this is text.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// The raw bytes, if this is a byte string.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(b) => Some(b),
            _ => None,
        }
    }

    /// The elements, if this is a list.
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    /// The nested record, if this is one.
    pub fn as_record(&self) -> Option<&RecordValue> {
        match self {
            Value::Record(record) => Some(record),
            _ => None,
        }
    }

    pub(crate) fn kind_name(&self) -> &'static str {
        match self {
            Value::Int(_) | Value::UInt(_) => "integer",
            Value::Float(_) => "float",
            Value::Bytes(_) => "byte string",
            Value::Text(_) => "text string",
            Value::List(_) => "list",
            Value::Record(_) => "record",
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::UInt(a), Value::UInt(b)) => a == b,
            (Value::Int(a), Value::UInt(b)) | (Value::UInt(b), Value::Int(a)) => {
                *a >= 0 && *a as u64 == *b
            }
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Bytes(a), Value::Bytes(b)) => a == b,
            (Value::Text(a), Value::Text(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Record(a), Value::Record(b)) => a == b,
            _ => false,
        }
    }
}

impl Display for Value {
    fn fmt(&self, formatter: &mut Formatter) -> fmt::Result {
        match self {
            Value::Int(v) => write!(formatter, "{v}"),
            Value::UInt(v) => write!(formatter, "{v}"),
            Value::Float(v) => write!(formatter, "{v}"),
            Value::Bytes(b) => write!(formatter, "b\"{}\"", b.escape_ascii()),
            Value::Text(s) => write!(formatter, "{s:?}"),
            Value::List(items) => {
                formatter.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        formatter.write_str(", ")?;
                    }
                    write!(formatter, "{item}")?;
                }
                formatter.write_str("]")
            }
            Value::Record(record) => write!(formatter, "{record}"),
        }
    }
}

pub(crate) fn normalize_u64(v: u64) -> Value {
    if v > i64::MAX as u64 {
        Value::UInt(v)
    } else {
        Value::Int(v as i64)
    }
}

macro_rules! from_int {
    ($($ty:ty),+) => {
        $(impl From<$ty> for Value {
            fn from(v: $ty) -> Value {
                Value::Int(i64::from(v))
            }
        })+
    };
}

from_int!(i8, i16, i32, i64, u8, u16, u32);

impl From<u64> for Value {
    fn from(v: u64) -> Value {
        normalize_u64(v)
    }
}

impl From<usize> for Value {
    fn from(v: usize) -> Value {
        normalize_u64(v as u64)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Value {
        Value::Float(f64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Value {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Value {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Value {
        Value::Text(v)
    }
}

impl From<char> for Value {
    fn from(v: char) -> Value {
        Value::Text(v.to_string())
    }
}

impl From<&[u8]> for Value {
    fn from(v: &[u8]) -> Value {
        Value::Bytes(v.to_vec())
    }
}

impl<const N: usize> From<&[u8; N]> for Value {
    fn from(v: &[u8; N]) -> Value {
        Value::Bytes(v.to_vec())
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Value {
        Value::Bytes(v)
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Value {
        Value::List(v)
    }
}

impl From<RecordValue> for Value {
    fn from(v: RecordValue) -> Value {
        Value::Record(v)
    }
}

impl FieldType {
    /// Coerces a value into this field's native domain with the default
    /// lenient [WarningSink].
    pub fn convert(&self, value: Value) -> Result<Value, FramingError> {
        self.convert_with(value, &WarningSink::default())
    }

    /// Coerces a value into this field's native domain, reporting lossy
    /// coercions to the given sink.
    pub fn convert_with(&self, value: Value, sink: &WarningSink) -> Result<Value, FramingError> {
        if let Some(hooks) = &self.hooks {
            if let Some(coerce) = &hooks.coerce {
                return coerce(self, value, sink);
            }
        }
        self.convert_base(value, sink)
    }

    /// The coercion behavior of the bare field type, ignoring any
    /// [Hooks](super::types::Hooks). Coerce hooks call this to delegate.
    pub fn convert_base(&self, value: Value, sink: &WarningSink) -> Result<Value, FramingError> {
        match &self.kind {
            FieldKind::Scalar(scalar) => convert_scalar(*scalar, value, sink),
            FieldKind::Bytes { .. } => convert_bytes(value),
            FieldKind::Text {
                encoding, policy, ..
            } => convert_text(value, *encoding, *policy),
            FieldKind::Array { element, .. } => {
                let items = match value {
                    Value::List(items) => items,
                    Value::Bytes(bytes) if element.is_byte_scalar() => bytes
                        .into_iter()
                        .map(|b| Value::Int(i64::from(b)))
                        .collect(),
                    other => return Err(conversion(&other, "array", "expected a list of elements")),
                };
                let converted = items
                    .into_iter()
                    .map(|item| element.convert_with(item, sink))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Value::List(converted))
            }
            FieldKind::Record(descriptor) => match value {
                Value::Record(record) if record.is_instance_of(descriptor) => {
                    Ok(Value::Record(record))
                }
                other => Err(conversion(
                    &other,
                    &format!("record {}", descriptor.name()),
                    "only values of the exact record type are accepted",
                )),
            },
        }
    }
}

fn conversion(value: &Value, ty: &str, detail: &str) -> FramingError {
    FramingError::Conversion {
        value: value.to_string(),
        ty: ty.to_string(),
        detail: detail.to_string(),
    }
}

fn convert_scalar(scalar: Scalar, value: Value, sink: &WarningSink) -> Result<Value, FramingError> {
    if scalar.is_float() {
        return convert_float(scalar, value);
    }
    // A single-character string assigned to a one-byte scalar means its
    // code point, as with the C convention of writing chars for bytes.
    if scalar.wire_len() == 1 {
        match &value {
            Value::Text(s) => {
                let mut chars = s.chars();
                return match (chars.next(), chars.next()) {
                    (Some(c), None) => Ok(Value::Int(i64::from(u32::from(c)))),
                    _ => Err(conversion(&value, scalar.name(), "expected a single character")),
                };
            }
            Value::Bytes(b) => {
                return match b.as_slice() {
                    [byte] => Ok(Value::Int(i64::from(*byte))),
                    _ => Err(conversion(&value, scalar.name(), "expected a single byte")),
                };
            }
            _ => {}
        }
    }
    convert_int(scalar, value, sink)
}

fn convert_int(scalar: Scalar, value: Value, sink: &WarningSink) -> Result<Value, FramingError> {
    match value {
        Value::Int(_) | Value::UInt(_) => Ok(value),
        Value::Float(f) => {
            if !f.is_finite() {
                return Err(conversion(&Value::Float(f), scalar.name(), "not a finite number"));
            }
            if f.fract() != 0.0 {
                sink.report(Warning::PrecisionLoss { value: f })
                    .map_err(FramingError::Strict)?;
            }
            let t = f.trunc();
            if t >= i64::MIN as f64 && t <= i64::MAX as f64 {
                Ok(Value::Int(t as i64))
            } else if t >= 0.0 && t <= u64::MAX as f64 {
                Ok(normalize_u64(t as u64))
            } else {
                Err(FramingError::OutOfRange {
                    value: f.to_string(),
                    ty: scalar.name().to_string(),
                })
            }
        }
        Value::Text(s) => parse_int_text(&s, scalar),
        Value::Bytes(b) => match std::str::from_utf8(&b) {
            Ok(s) => parse_int_text(s, scalar),
            Err(_) => Err(conversion(&Value::Bytes(b), scalar.name(), "not an integer")),
        },
        other => Err(conversion(&other, scalar.name(), "not an integer")),
    }
}

fn parse_int_text(s: &str, scalar: Scalar) -> Result<Value, FramingError> {
    let trimmed = s.trim();
    if let Ok(v) = trimmed.parse::<i64>() {
        return Ok(Value::Int(v));
    }
    if let Ok(v) = trimmed.parse::<u64>() {
        return Ok(normalize_u64(v));
    }
    Err(FramingError::Conversion {
        value: format!("{s:?}"),
        ty: scalar.name().to_string(),
        detail: "not an integer".to_string(),
    })
}

fn convert_float(scalar: Scalar, value: Value) -> Result<Value, FramingError> {
    match value {
        Value::Int(v) => Ok(Value::Float(v as f64)),
        Value::UInt(v) => Ok(Value::Float(v as f64)),
        Value::Float(_) => Ok(value),
        Value::Text(s) => match s.trim().parse::<f64>() {
            Ok(v) => Ok(Value::Float(v)),
            Err(_) => Err(FramingError::Conversion {
                value: format!("{s:?}"),
                ty: scalar.name().to_string(),
                detail: "not a number".to_string(),
            }),
        },
        Value::Bytes(b) => match std::str::from_utf8(&b) {
            Ok(s) => convert_float(scalar, Value::Text(s.to_string())),
            Err(_) => Err(conversion(&Value::Bytes(b), scalar.name(), "not a number")),
        },
        other => Err(conversion(&other, scalar.name(), "not a number")),
    }
}

fn convert_bytes(value: Value) -> Result<Value, FramingError> {
    match value {
        Value::Bytes(_) => Ok(value),
        Value::Text(s) => Ok(Value::Bytes(s.into_bytes())),
        Value::Int(v) => Ok(Value::Bytes(v.to_string().into_bytes())),
        Value::UInt(v) => Ok(Value::Bytes(v.to_string().into_bytes())),
        Value::Float(v) => Ok(Value::Bytes(v.to_string().into_bytes())),
        other => Err(conversion(&other, "byte string", "cannot be rendered as bytes")),
    }
}

fn convert_text(
    value: Value,
    encoding: TextEncoding,
    policy: TextPolicy,
) -> Result<Value, FramingError> {
    match value {
        Value::Text(_) => Ok(value),
        Value::Bytes(b) => encoding.decode(&b, policy).map(Value::Text),
        Value::Int(v) => Ok(Value::Text(v.to_string())),
        Value::UInt(v) => Ok(Value::Text(v.to_string())),
        Value::Float(v) => Ok(Value::Text(v.to_string())),
        other => Err(conversion(&other, "text string", "cannot be rendered as text")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_normalization() {
        assert_eq!(Value::Int(5), Value::from(5u64));
        assert_eq!(Value::UInt(u64::MAX), Value::from(u64::MAX));
        assert_eq!(Value::Int(5), Value::from(5i32));
    }

    #[test]
    fn test_cross_representation_equality() {
        assert_eq!(Value::Int(42), Value::UInt(42));
        assert_ne!(Value::Int(-1), Value::UInt(42));
        assert_ne!(Value::Int(5), Value::Float(5.0));
    }

    #[test]
    fn test_display() {
        assert_eq!("5", Value::Int(5).to_string());
        assert_eq!("b\"hi\"", Value::from(&b"hi"[..]).to_string());
        assert_eq!("\"hi\"", Value::from("hi").to_string());
        assert_eq!("[1, 2]", Value::list([1, 2]).to_string());
    }

    #[test]
    fn test_int_conversion() {
        let ty = FieldType::i32();
        assert_eq!(Value::Int(5), ty.convert(Value::from("5")).unwrap());
        assert_eq!(Value::Int(5), ty.convert(Value::Float(5.0)).unwrap());
        assert!(ty.convert(Value::from("five")).is_err());
    }

    #[test]
    fn test_precision_loss_warns() {
        let (sink, warnings) = WarningSink::capture();
        let converted = FieldType::i32()
            .convert_with(Value::Float(5.6), &sink)
            .unwrap();
        assert_eq!(Value::Int(5), converted);
        assert_eq!(
            vec![Warning::PrecisionLoss { value: 5.6 }],
            warnings.borrow().clone()
        );

        let strict = WarningSink::strict();
        assert!(FieldType::i32()
            .convert_with(Value::Float(5.6), &strict)
            .is_err());
    }

    #[test]
    fn test_single_byte_conversion() {
        let ty = FieldType::i8();
        assert_eq!(Value::Int(65), ty.convert(Value::from("A")).unwrap());
        assert_eq!(Value::Int(5), ty.convert(Value::Int(5)).unwrap());
        assert!(ty.convert(Value::from("AB")).is_err());
    }

    #[test]
    fn test_bytes_conversion() {
        let ty = FieldType::bytes(5);
        assert_eq!(
            Value::Bytes(b"6".to_vec()),
            ty.convert(Value::Int(6)).unwrap()
        );
        assert_eq!(
            Value::Bytes(b"hi".to_vec()),
            ty.convert(Value::from("hi")).unwrap()
        );
    }

    #[test]
    fn test_float_conversion() {
        let ty = FieldType::f64();
        assert_eq!(Value::Float(6.0), ty.convert(Value::Int(6)).unwrap());
        assert_eq!(Value::Float(1.5), ty.convert(Value::from("1.5")).unwrap());
    }

    #[test]
    fn test_text_conversion_decodes_bytes() {
        let ty = FieldType::text(9, TextEncoding::Utf8);
        assert_eq!(
            Value::Text("andré".into()),
            ty.convert(Value::Bytes("andré".as_bytes().to_vec())).unwrap()
        );
        assert!(ty.convert(Value::Bytes(b"\x80".to_vec())).is_err());
        assert_eq!(Value::Text("5".into()), ty.convert(Value::Int(5)).unwrap());

        let lax = FieldType::text(9, TextEncoding::Utf8).with_policy(TextPolicy::Ignore);
        assert_eq!(
            Value::Text(String::new()),
            lax.convert(Value::Bytes(b"\x80".to_vec())).unwrap()
        );
        let replacing = FieldType::text(9, TextEncoding::Utf8).with_policy(TextPolicy::Replace);
        assert_eq!(
            Value::Text("\u{fffd}".into()),
            replacing.convert(Value::Bytes(b"\x80".to_vec())).unwrap()
        );
    }

    #[test]
    fn test_array_conversion_converts_elements() {
        let ty = FieldType::array(2, FieldType::i8());
        let converted = ty
            .convert(Value::List(vec![Value::Int(5), Value::from("A")]))
            .unwrap();
        assert_eq!(Value::list([5, 65]), converted);
    }

    #[test]
    fn test_byte_array_accepts_bytes() {
        let ty = FieldType::array(3, FieldType::u8());
        let converted = ty.convert(Value::from(&b"abc"[..])).unwrap();
        assert_eq!(Value::list([97, 98, 99]), converted);
    }
}
