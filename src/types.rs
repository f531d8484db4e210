//! The field-type descriptor algebra.
//!
//! A [FieldType] describes one wire field: what it is (the [FieldKind]),
//! an optional constant the field must always hold, an optional default,
//! and optional [Hooks] overriding the built-in behavior. Descriptors are
//! immutable once built and may be shared freely.

use std::fmt::{self, Display, Formatter};
use std::io::Read;
use std::sync::Arc;

use bytes::Bytes;

use super::error::{DescriptorError, FramingError, Result};
use super::record::{RecordDescriptor, RecordValue};
use super::text::{TextEncoding, TextPolicy};
use super::value::Value;
use super::warnings::WarningSink;

/// All wire scalars.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scalar {
    /// A signed byte.
    I8,
    /// An unsigned byte.
    U8,
    /// A signed 16 bit integer.
    I16,
    /// An unsigned 16 bit integer.
    U16,
    /// A signed 32 bit integer.
    I32,
    /// An unsigned 32 bit integer.
    U32,
    /// A signed 64 bit integer.
    I64,
    /// An unsigned 64 bit integer.
    U64,
    /// An IEEE-754 single.
    F32,
    /// An IEEE-754 double.
    F64,
}

impl Scalar {
    #[inline]
    pub(crate) fn wire_len(&self) -> usize {
        match self {
            Scalar::I8 | Scalar::U8 => 1,
            Scalar::I16 | Scalar::U16 => 2,
            Scalar::I32 | Scalar::U32 | Scalar::F32 => 4,
            Scalar::I64 | Scalar::U64 | Scalar::F64 => 8,
        }
    }

    /// The pack-style token used by [struct_format](FieldType::struct_format).
    #[inline]
    pub(crate) fn format_token(&self) -> char {
        match self {
            Scalar::I8 => 'b',
            Scalar::U8 => 'B',
            Scalar::I16 => 'h',
            Scalar::U16 => 'H',
            Scalar::I32 => 'i',
            Scalar::U32 => 'I',
            Scalar::I64 => 'q',
            Scalar::U64 => 'Q',
            Scalar::F32 => 'f',
            Scalar::F64 => 'd',
        }
    }

    #[inline]
    pub(crate) fn is_float(&self) -> bool {
        matches!(self, Scalar::F32 | Scalar::F64)
    }

    pub(crate) fn name(&self) -> &'static str {
        match self {
            Scalar::I8 => "i8",
            Scalar::U8 => "u8",
            Scalar::I16 => "i16",
            Scalar::U16 => "u16",
            Scalar::I32 => "i32",
            Scalar::U32 => "u32",
            Scalar::I64 => "i64",
            Scalar::U64 => "u64",
            Scalar::F32 => "f32",
            Scalar::F64 => "f64",
        }
    }
}

impl Display for Scalar {
    fn fmt(&self, formatter: &mut Formatter) -> fmt::Result {
        formatter.write_str(self.name())
    }
}

/// The wire length of a string or array field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Length {
    /// Exactly this many bytes (strings) or elements (arrays).
    Fixed(usize),
    /// The length is the current value of the named field of the
    /// enclosing record. The named field must appear earlier on the wire.
    Field(String),
    /// The AUTOSIZED sentinel: the string runs until a null terminator.
    /// Not allowed for arrays.
    Auto,
}

impl Length {
    pub(crate) fn resolve(&self, ctx: Option<&RecordValue>, what: &str) -> Result<usize> {
        match self {
            Length::Fixed(n) => Ok(*n),
            Length::Auto => Err(DescriptorError::AutosizedOutsideRecord {
                what: what.to_string(),
            }
            .into()),
            Length::Field(name) => {
                let record = ctx.ok_or_else(|| DescriptorError::MissingContext {
                    length: name.clone(),
                })?;
                let record_name = record.descriptor().name().to_string();
                match record.get(name) {
                    None => Err(FramingError::LengthFieldUnset {
                        record: record_name,
                        length: name.clone(),
                    }
                    .into()),
                    Some(Value::Int(v)) if *v < 0 => Err(FramingError::NegativeLength {
                        record: record_name,
                        length: name.clone(),
                        value: *v,
                    }
                    .into()),
                    Some(Value::Int(v)) => Ok(*v as usize),
                    Some(Value::UInt(v)) => Ok(*v as usize),
                    Some(other) => Err(FramingError::LengthFieldKind {
                        record: record_name,
                        length: name.clone(),
                        actual: other.kind_name().to_string(),
                    }
                    .into()),
                }
            }
        }
    }
}

/// Where an unset field takes its value from.
#[derive(Clone)]
pub enum DefaultSource {
    /// A plain value, cloned on use.
    Value(Value),
    /// A producer invoked each time a default is needed.
    Producer(Arc<dyn Fn() -> Value + Send + Sync>),
}

impl DefaultSource {
    pub(crate) fn produce(&self) -> Value {
        match self {
            DefaultSource::Value(value) => value.clone(),
            DefaultSource::Producer(producer) => producer(),
        }
    }
}

impl fmt::Debug for DefaultSource {
    fn fmt(&self, formatter: &mut Formatter) -> fmt::Result {
        match self {
            DefaultSource::Value(value) => write!(formatter, "Value({value:?})"),
            DefaultSource::Producer(_) => formatter.write_str("Producer(..)"),
        }
    }
}

/// A user-supplied decode override. Receives the base field so it can
/// delegate to [parse_base](FieldType::parse_base).
pub type DecodeHook =
    Arc<dyn Fn(&FieldType, &mut dyn Read, Option<&RecordValue>) -> Result<Value> + Send + Sync>;

/// A user-supplied encode override. Receives the base field so it can
/// delegate to [serialize_base](FieldType::serialize_base).
pub type EncodeHook = Arc<
    dyn Fn(&FieldType, &Value, Option<&RecordValue>, &WarningSink) -> Result<Bytes> + Send + Sync,
>;

/// A user-supplied coercion override. Receives the base field so it can
/// delegate to [convert_base](FieldType::convert_base).
pub type CoerceHook = Arc<
    dyn Fn(&FieldType, Value, &WarningSink) -> std::result::Result<Value, FramingError>
        + Send
        + Sync,
>;

/// Overrides for the decode, encode and coerce behavior of a field.
///
/// This is how custom field types are built: take the closest built-in
/// field as a base and replace the steps that differ, calling the
/// `*_base` methods for everything else.
#[derive(Clone, Default)]
pub struct Hooks {
    /// Replaces [parse](FieldType::parse).
    pub decode: Option<DecodeHook>,
    /// Replaces [serialize](FieldType::serialize).
    pub encode: Option<EncodeHook>,
    /// Replaces [convert](FieldType::convert).
    pub coerce: Option<CoerceHook>,
}

impl fmt::Debug for Hooks {
    fn fmt(&self, formatter: &mut Formatter) -> fmt::Result {
        formatter
            .debug_struct("Hooks")
            .field("decode", &self.decode.is_some())
            .field("encode", &self.encode.is_some())
            .field("coerce", &self.coerce.is_some())
            .finish()
    }
}

/// What a field is.
#[derive(Debug, Clone)]
pub enum FieldKind {
    /// A fixed-width scalar.
    Scalar(Scalar),
    /// A byte string. Parsed values are truncated at the first null byte
    /// unless `full_string` is set.
    Bytes {
        /// Fixed, symbolic or auto-terminated length.
        length: Length,
        /// Keep trailing null padding when parsing.
        full_string: bool,
    },
    /// A text string in a named encoding.
    Text {
        /// Fixed, symbolic or auto-terminated length, in encoded bytes.
        length: Length,
        /// The codec used on the wire.
        encoding: TextEncoding,
        /// What to do about undecodable or unencodable input.
        policy: TextPolicy,
    },
    /// A homogeneous sequence of a nested field type.
    Array {
        /// Fixed or symbolic element count. Never [Length::Auto].
        length: Length,
        /// The element type.
        element: Box<FieldType>,
    },
    /// A nested record.
    Record(Arc<RecordDescriptor>),
}

/// One wire field: a kind plus optional constant, default and hooks.
#[derive(Debug, Clone)]
pub struct FieldType {
    pub(crate) kind: FieldKind,
    pub(crate) always: Option<Value>,
    pub(crate) default: Option<DefaultSource>,
    pub(crate) hooks: Option<Hooks>,
}

macro_rules! scalar_constructor {
    ($(#[$doc:meta] $name:ident = $scalar:path),+ $(,)?) => {
        $(#[$doc]
        pub fn $name() -> FieldType {
            FieldType::scalar($scalar)
        })+
    };
}

impl FieldType {
    fn with_kind(kind: FieldKind) -> FieldType {
        FieldType {
            kind,
            always: None,
            default: None,
            hooks: None,
        }
    }

    /// A scalar field.
    pub fn scalar(scalar: Scalar) -> FieldType {
        FieldType::with_kind(FieldKind::Scalar(scalar))
    }

    scalar_constructor!(
        /// A signed byte field.
        i8 = Scalar::I8,
        /// An unsigned byte field.
        u8 = Scalar::U8,
        /// A signed 16 bit field.
        i16 = Scalar::I16,
        /// An unsigned 16 bit field.
        u16 = Scalar::U16,
        /// A signed 32 bit field.
        i32 = Scalar::I32,
        /// An unsigned 32 bit field.
        u32 = Scalar::U32,
        /// A signed 64 bit field.
        i64 = Scalar::I64,
        /// An unsigned 64 bit field.
        u64 = Scalar::U64,
        /// An IEEE-754 single field.
        f32 = Scalar::F32,
        /// An IEEE-754 double field.
        f64 = Scalar::F64,
    );

    /// A byte string of exactly `length` bytes, zero-padded on the right.
    /// Parsed values are truncated at the first null byte.
    pub fn bytes(length: usize) -> FieldType {
        FieldType::with_kind(FieldKind::Bytes {
            length: Length::Fixed(length),
            full_string: false,
        })
    }

    /// A fixed byte string whose parsed values keep their null padding.
    pub fn bytes_full(length: usize) -> FieldType {
        FieldType::with_kind(FieldKind::Bytes {
            length: Length::Fixed(length),
            full_string: true,
        })
    }

    /// A byte string whose length is the value of another field.
    pub fn bytes_var(length_field: &str) -> FieldType {
        FieldType::with_kind(FieldKind::Bytes {
            length: Length::Field(length_field.to_string()),
            full_string: false,
        })
    }

    /// An AUTOSIZED byte string, terminated by a null byte on the wire.
    pub fn bytes_auto() -> FieldType {
        FieldType::with_kind(FieldKind::Bytes {
            length: Length::Auto,
            full_string: false,
        })
    }

    /// A text string of exactly `length` encoded bytes.
    pub fn text(length: usize, encoding: TextEncoding) -> FieldType {
        FieldType::with_kind(FieldKind::Text {
            length: Length::Fixed(length),
            encoding,
            policy: TextPolicy::default(),
        })
    }

    /// A text string whose encoded length is the value of another field.
    pub fn text_var(length_field: &str, encoding: TextEncoding) -> FieldType {
        FieldType::with_kind(FieldKind::Text {
            length: Length::Field(length_field.to_string()),
            encoding,
            policy: TextPolicy::default(),
        })
    }

    /// An AUTOSIZED text string, terminated by a null byte on the wire.
    pub fn text_auto(encoding: TextEncoding) -> FieldType {
        FieldType::with_kind(FieldKind::Text {
            length: Length::Auto,
            encoding,
            policy: TextPolicy::default(),
        })
    }

    /// An array of exactly `length` elements.
    pub fn array(length: usize, element: FieldType) -> FieldType {
        FieldType::with_kind(FieldKind::Array {
            length: Length::Fixed(length),
            element: Box::new(element),
        })
    }

    /// An array whose element count is the value of another field.
    pub fn array_var(length_field: &str, element: FieldType) -> FieldType {
        FieldType::with_kind(FieldKind::Array {
            length: Length::Field(length_field.to_string()),
            element: Box::new(element),
        })
    }

    /// A nested record field.
    pub fn record(descriptor: &Arc<RecordDescriptor>) -> FieldType {
        FieldType::with_kind(FieldKind::Record(descriptor.clone()))
    }

    /// Declares a constant value for the field. The field never needs to
    /// be set, and a warning is reported whenever a different value is
    /// assigned, parsed or serialized.
    pub fn always(mut self, value: impl Into<Value>) -> FieldType {
        self.always = Some(value.into());
        self
    }

    /// Declares a default value used when the field is unset.
    pub fn default(mut self, value: impl Into<Value>) -> FieldType {
        self.default = Some(DefaultSource::Value(value.into()));
        self
    }

    /// Declares a default produced by a closure each time it is needed.
    pub fn default_with(
        mut self,
        producer: impl Fn() -> Value + Send + Sync + 'static,
    ) -> FieldType {
        self.default = Some(DefaultSource::Producer(Arc::new(producer)));
        self
    }

    /// Sets the error policy of a text field. Has no meaning elsewhere.
    pub fn with_policy(mut self, new_policy: TextPolicy) -> FieldType {
        if let FieldKind::Text { policy, .. } = &mut self.kind {
            *policy = new_policy;
        }
        self
    }

    /// Attaches decode/encode/coerce overrides.
    pub fn with_hooks(mut self, hooks: Hooks) -> FieldType {
        self.hooks = Some(hooks);
        self
    }

    /// What this field is.
    pub fn kind(&self) -> &FieldKind {
        &self.kind
    }

    /// The declared constant, if any.
    pub fn always_value(&self) -> Option<&Value> {
        self.always.as_ref()
    }

    /// The constant if declared, else a freshly produced default. A
    /// fixed array without constants of its own borrows its element's,
    /// repeated to the array length.
    pub(crate) fn fallback(&self) -> Option<Value> {
        if let Some(always) = &self.always {
            return Some(always.clone());
        }
        if let Some(default) = &self.default {
            return Some(default.produce());
        }
        if let FieldKind::Array {
            length: Length::Fixed(n),
            element,
        } = &self.kind
        {
            if element.has_fallback() {
                let mut items = Vec::with_capacity(*n);
                for _ in 0..*n {
                    if let Some(item) = element.fallback() {
                        items.push(item);
                    }
                }
                return Some(Value::List(items));
            }
        }
        None
    }

    pub(crate) fn has_fallback(&self) -> bool {
        if self.always.is_some() || self.default.is_some() {
            return true;
        }
        matches!(
            &self.kind,
            FieldKind::Array { length: Length::Fixed(_), element } if element.has_fallback()
        )
    }

    pub(crate) fn is_byte_scalar(&self) -> bool {
        matches!(self.kind, FieldKind::Scalar(Scalar::I8 | Scalar::U8))
    }

    pub(crate) fn length(&self) -> Option<&Length> {
        match &self.kind {
            FieldKind::Bytes { length, .. }
            | FieldKind::Text { length, .. }
            | FieldKind::Array { length, .. } => Some(length),
            _ => None,
        }
    }

    /// A short name for messages, e.g. `"i32"` or `"byte string"`.
    pub fn type_name(&self) -> String {
        match &self.kind {
            FieldKind::Scalar(scalar) => scalar.name().to_string(),
            FieldKind::Bytes { .. } => "byte string".to_string(),
            FieldKind::Text { .. } => "text string".to_string(),
            FieldKind::Array { .. } => "array".to_string(),
            FieldKind::Record(descriptor) => format!("record {}", descriptor.name()),
        }
    }

    pub(crate) fn is_const_size(&self) -> bool {
        match &self.kind {
            FieldKind::Scalar(_) => true,
            FieldKind::Bytes { length, .. } | FieldKind::Text { length, .. } => {
                matches!(length, Length::Fixed(_))
            }
            FieldKind::Array { length, element } => {
                matches!(length, Length::Fixed(_)) && element.is_const_size()
            }
            FieldKind::Record(descriptor) => descriptor.is_const_size(),
        }
    }

    /// The number of bytes one value of this field occupies on the wire.
    ///
    /// Needs a context record when the length is symbolic. Auto-terminated
    /// strings have no size of their own; ask the enclosing record.
    pub fn sizeof(&self, ctx: Option<&RecordValue>) -> Result<usize> {
        self.resolved_byte_len(ctx, None, &WarningSink::default())
    }

    pub(crate) fn resolved_byte_len(
        &self,
        ctx: Option<&RecordValue>,
        own: Option<&Value>,
        sink: &WarningSink,
    ) -> Result<usize> {
        match &self.kind {
            FieldKind::Scalar(scalar) => Ok(scalar.wire_len()),
            FieldKind::Bytes { length, .. } | FieldKind::Text { length, .. } => match length {
                Length::Auto => self.measured_len(ctx, own, sink),
                other => other.resolve(ctx, &self.type_name()),
            },
            FieldKind::Array { length, element } => {
                let n = length.resolve(ctx, "array")?;
                Ok(n * element.resolved_byte_len(ctx, None, sink)?)
            }
            FieldKind::Record(descriptor) => match own {
                Some(Value::Record(record)) => descriptor.sizeof(Some(record)),
                _ if descriptor.is_const_size() => descriptor.sizeof(None),
                _ => Err(DescriptorError::DynamicSize {
                    what: format!("record {}", descriptor.name()),
                }
                .into()),
            },
        }
    }

    fn measured_len(
        &self,
        ctx: Option<&RecordValue>,
        own: Option<&Value>,
        sink: &WarningSink,
    ) -> Result<usize> {
        match own {
            Some(value) => Ok(self.serialize_with(value, ctx, sink)?.len()),
            None => Err(DescriptorError::AutosizedOutsideRecord {
                what: self.type_name(),
            }
            .into()),
        }
    }

    /// The pack-style wire layout of one value of this field, e.g. `"h"`
    /// for an i16 or `"15s"` for a fixed 15 byte string.
    pub fn struct_format(&self, ctx: Option<&RecordValue>) -> Result<String> {
        self.struct_format_with(ctx, None)
    }

    pub(crate) fn struct_format_with(
        &self,
        ctx: Option<&RecordValue>,
        own: Option<&Value>,
    ) -> Result<String> {
        match &self.kind {
            FieldKind::Scalar(scalar) => Ok(scalar.format_token().to_string()),
            FieldKind::Bytes { length, .. } | FieldKind::Text { length, .. } => {
                let n = match length {
                    Length::Auto => self.measured_len(ctx, own, &WarningSink::default())?,
                    other => other.resolve(ctx, &self.type_name())?,
                };
                Ok(format!("{n}s"))
            }
            FieldKind::Array { length, element } => {
                let n = length.resolve(ctx, "array")?;
                Ok(element.struct_format_with(ctx, None)?.repeat(n))
            }
            FieldKind::Record(descriptor) => match own {
                Some(Value::Record(record)) => descriptor.struct_format(Some(record)),
                _ => descriptor.struct_format(None),
            },
        }
    }

    /// Converts the stored `always`/`default` constants into the field's
    /// native domain, failing on constants the field could never hold.
    pub(crate) fn normalize_constants(&mut self, field: &str) -> Result<()> {
        let invalid = |e: FramingError| DescriptorError::InvalidConstant {
            field: field.to_string(),
            detail: e.to_string(),
        };
        if let Some(always) = self.always.take() {
            self.always = Some(
                self.convert_with(always, &WarningSink::default())
                    .map_err(invalid)?,
            );
        }
        if let Some(DefaultSource::Value(value)) = self.default.clone() {
            self.default = Some(DefaultSource::Value(
                self.convert_with(value, &WarningSink::default())
                    .map_err(invalid)?,
            ));
        }
        // A constant on a fixed array must actually serialize, which
        // catches lists with too few elements for the array.
        if let FieldKind::Array {
            length: Length::Fixed(_),
            ..
        } = &self.kind
        {
            for constant in [self.always.clone(), self.fallback()].into_iter().flatten() {
                self.serialize_with(&constant, None, &WarningSink::default())
                    .map_err(|e| DescriptorError::InvalidConstant {
                        field: field.to_string(),
                        detail: e.to_string(),
                    })?;
            }
        }
        Ok(())
    }
}

impl Display for FieldKind {
    fn fmt(&self, formatter: &mut Formatter) -> fmt::Result {
        match self {
            FieldKind::Scalar(scalar) => write!(formatter, "{scalar}"),
            FieldKind::Bytes { .. } => formatter.write_str("byte string"),
            FieldKind::Text { encoding, .. } => write!(formatter, "text string ({encoding})"),
            FieldKind::Array { .. } => formatter.write_str("array"),
            FieldKind::Record(descriptor) => write!(formatter, "record {}", descriptor.name()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_tokens_and_widths() {
        assert_eq!('h', Scalar::I16.format_token());
        assert_eq!('B', Scalar::U8.format_token());
        assert_eq!('Q', Scalar::U64.format_token());
        assert_eq!(2, Scalar::I16.wire_len());
        assert_eq!(8, Scalar::F64.wire_len());
    }

    #[test]
    fn test_scalar_struct_format() {
        assert_eq!("i", FieldType::i32().struct_format(None).unwrap());
        assert_eq!("d", FieldType::f64().struct_format(None).unwrap());
    }

    #[test]
    fn test_string_struct_format() {
        assert_eq!("15s", FieldType::bytes(15).struct_format(None).unwrap());
        assert_eq!(
            "9s",
            FieldType::text(9, TextEncoding::Utf8)
                .struct_format(None)
                .unwrap()
        );
    }

    #[test]
    fn test_array_struct_format_repeats() {
        let ty = FieldType::array(3, FieldType::i16());
        assert_eq!("hhh", ty.struct_format(None).unwrap());
        assert_eq!(6, ty.sizeof(None).unwrap());
    }

    #[test]
    fn test_variable_length_needs_context() {
        let ty = FieldType::bytes_var("size");
        assert!(ty.sizeof(None).is_err());
        assert!(ty.struct_format(None).is_err());
    }

    #[test]
    fn test_autosized_has_no_standalone_size() {
        let err = FieldType::bytes_auto().sizeof(None).unwrap_err();
        assert!(err.is_descriptor());
    }

    #[test]
    fn test_hooks_override_the_wire_form() {
        use crate::record::{RecordDescriptor, RecordValue};

        // An auto-terminated string padded to an even byte count, the
        // way a peer with two-byte alignment would frame it.
        fn even_padded() -> FieldType {
            FieldType::bytes_auto().with_hooks(Hooks {
                decode: Some(Arc::new(
                    |ty: &FieldType, reader: &mut dyn Read, ctx: Option<&RecordValue>| {
                        let value = ty.parse_base(reader, ctx)?;
                        if let Some(data) = value.as_bytes() {
                            if data.len() % 2 == 0 {
                                crate::de::read_up_to(reader, 1)?;
                            }
                        }
                        Ok(value)
                    },
                )),
                encode: Some(Arc::new(
                    |ty: &FieldType,
                     value: &Value,
                     ctx: Option<&RecordValue>,
                     sink: &WarningSink| {
                        let mut data = ty.serialize_base(value, ctx, sink)?.to_vec();
                        if data.len() % 2 == 1 {
                            data.push(0);
                        }
                        Ok(data.into())
                    },
                )),
                coerce: None,
            })
        }

        let person = RecordDescriptor::new(
            "Person",
            vec![("name", even_padded()), ("age", FieldType::i16())],
        )
        .unwrap();

        let asher = RecordValue::build(
            &person,
            vec![("name", Value::from(&b"Asher"[..])), ("age", 4.into())],
        )
        .unwrap();
        let wire = asher.serialize().unwrap();
        assert_eq!(b"Asher\x00\x00\x04", &wire[..]);
        assert_eq!(asher, RecordValue::parse(&person, &mut &wire[..]).unwrap());

        let liam = RecordValue::build(
            &person,
            vec![("name", Value::from(&b"Liam"[..])), ("age", 1.into())],
        )
        .unwrap();
        let wire = liam.serialize().unwrap();
        assert_eq!(b"Liam\x00\x00\x00\x01", &wire[..]);
        assert_eq!(liam, RecordValue::parse(&person, &mut &wire[..]).unwrap());

        // sizeof measures through the encode hook.
        assert_eq!(8, person.sizeof(Some(&asher)).unwrap());
        assert_eq!(8, person.sizeof(Some(&liam)).unwrap());
    }

    #[test]
    fn test_coerce_hook_replaces_conversion() {
        let shouting = FieldType::bytes(8).with_hooks(Hooks {
            decode: None,
            encode: None,
            coerce: Some(Arc::new(
                |ty: &FieldType, value: Value, sink: &WarningSink| {
                    let converted = ty.convert_base(value, sink)?;
                    match converted {
                        Value::Bytes(data) => Ok(Value::Bytes(data.to_ascii_uppercase())),
                        other => Ok(other),
                    }
                },
            )),
        });
        assert_eq!(
            Value::Bytes(b"HI".to_vec()),
            shouting.convert(Value::from("hi")).unwrap()
        );
    }

    #[test]
    fn test_const_size_analysis() {
        assert!(FieldType::i64().is_const_size());
        assert!(FieldType::bytes(4).is_const_size());
        assert!(!FieldType::bytes_auto().is_const_size());
        assert!(!FieldType::array_var("n", FieldType::u8()).is_const_size());
        assert!(FieldType::array(4, FieldType::u8()).is_const_size());
    }
}
