//! This module contains the error types used throughout the crate.
//!
//! There are exactly two fatal categories: [DescriptorError] for static
//! inconsistencies in a field or record declaration, surfaced at
//! construction or at the first operation that needs the information, and
//! [FramingError] for dynamic failures while parsing or serializing one
//! record. The third, non-fatal channel lives in
//! [warnings](super::warnings).

use thiserror::Error;

use super::warnings::Warning;

/// A static inconsistency in a field or record declaration.
#[derive(Debug, Error)]
pub enum DescriptorError {
    /// A record was declared with no fields at all.
    #[error("record {record} contains no fields")]
    EmptyRecord {
        /// The offending record name.
        record: String,
    },

    /// Two fields of one record share a name.
    #[error("record {record} declares field {field} more than once")]
    DuplicateField {
        /// The record name.
        record: String,
        /// The duplicated field name.
        field: String,
    },

    /// A symbolic length must point backwards, at a field that has already
    /// been read by the time the variable-length field is reached.
    #[error("{record}.{length} is the length field for {record}.{field} but appears after it on the wire")]
    ForwardLengthReference {
        /// The record name.
        record: String,
        /// The length field name.
        length: String,
        /// The field using it as its length.
        field: String,
    },

    /// A symbolic length names a field the record does not declare.
    #[error("{record}.{field} uses {length} as its length field but no such field exists")]
    UnknownLengthField {
        /// The record name.
        record: String,
        /// The missing length field name.
        length: String,
        /// The field using it as its length.
        field: String,
    },

    /// No codec is registered under the requested label.
    #[error("no codec exists for encoding {label:?}")]
    UnknownEncoding {
        /// The label as given.
        label: String,
    },

    /// A symbolic length cannot be resolved without the enclosing record.
    #[error("no context record was provided to resolve the variable length field {length:?}")]
    MissingContext {
        /// The length field that needed resolving.
        length: String,
    },

    /// The byte count of an auto-terminated string is a property of its
    /// value, which only the enclosing record knows.
    #[error("the size of an auto-terminated {what} depends on its value and can only be computed within a record")]
    AutosizedOutsideRecord {
        /// What kind of field was asked about.
        what: String,
    },

    /// The size of the type varies and the value needed to compute it was
    /// not supplied.
    #[error("the size of {what} varies and cannot be computed without its value")]
    DynamicSize {
        /// What kind of field was asked about.
        what: String,
    },

    /// Field overrides must keep the parent's wire layout intact.
    #[error("field {field} of record {record} was overridden by a differently-sized type")]
    SizeChangingOverride {
        /// The record being derived.
        record: String,
        /// The field whose override changes the wire size.
        field: String,
    },

    /// An override named a field the parent does not have.
    #[error("record {record} has no field {field} to override")]
    UnknownOverride {
        /// The parent record name.
        record: String,
        /// The unknown field name.
        field: String,
    },

    /// An `always` or `default` value does not fit its field.
    #[error("invalid constant for field {field}: {detail}")]
    InvalidConstant {
        /// The field carrying the constant.
        field: String,
        /// Why the constant was rejected.
        detail: String,
    },

    /// A field was addressed by a name the record does not declare.
    #[error("record {record} has no field named {field}")]
    NoSuchField {
        /// The record name.
        record: String,
        /// The unknown field name.
        field: String,
    },

    /// A frame parser needs at least one record starting with a constant.
    #[error("none of the supplied records begin with a constant value")]
    NoDiscriminators,

    /// A record name maps onto a callback name the handler reserves.
    #[error("record {record} maps to the reserved callback name {callback}")]
    ReservedCallback {
        /// The record name.
        record: String,
        /// The derived callback name.
        callback: String,
    },

    /// A warning raised under a strict [WarningSink](super::warnings::WarningSink).
    #[error("warning treated as an error: {0}")]
    Strict(Warning),
}

/// A dynamic failure while parsing or serializing one record.
///
/// A framing error is tied to a single record; it does not corrupt
/// subsequent records on the same stream.
#[derive(Debug, Error)]
pub enum FramingError {
    /// The stream ended before the field was complete.
    #[error("{ty} requires {needed} bytes and was given {got}")]
    Short {
        /// The field type that was being parsed.
        ty: String,
        /// How many bytes it needed.
        needed: usize,
        /// How many bytes were available.
        got: usize,
    },

    /// An auto-terminated string never met its terminator.
    #[error("end of stream reached with no null byte found")]
    UnterminatedString,

    /// A scalar value does not fit its wire representation.
    #[error("{value} is out of range for {ty}")]
    OutOfRange {
        /// The value, rendered for the message.
        value: String,
        /// The scalar type it was serialized as.
        ty: String,
    },

    /// The value's kind cannot be serialized by the field at all.
    #[error("{value} is not serializable as a {ty}")]
    NotSerializable {
        /// The value, rendered for the message.
        value: String,
        /// The field type.
        ty: String,
    },

    /// A string could not be encoded or decoded.
    #[error("cannot encode or decode string: {detail}")]
    Codec {
        /// What the codec objected to.
        detail: String,
    },

    /// An array was given fewer elements than it holds and no default
    /// could fill the tail.
    #[error("array has length {needed} and was only given {got} elements")]
    TooFewElements {
        /// The element count of the array.
        needed: usize,
        /// The number of elements available after default fill.
        got: usize,
    },

    /// A field had no value and no applicable default at serialize time.
    #[error("{record}.{field} not set")]
    FieldNotSet {
        /// The record being serialized.
        record: String,
        /// The unset field.
        field: String,
    },

    /// A length field was consulted before it was given a value.
    #[error("{record}.{length} not set and is needed as a length field")]
    LengthFieldUnset {
        /// The record name.
        record: String,
        /// The length field name.
        length: String,
    },

    /// A length field held something other than an integer.
    #[error("{record}.{length} must be an integer to be used as a length field and was actually a {actual}")]
    LengthFieldKind {
        /// The record name.
        record: String,
        /// The length field name.
        length: String,
        /// The kind of value it held.
        actual: String,
    },

    /// A length field resolved to a negative count.
    #[error("length field {record}.{length} may not be negative (was {value})")]
    NegativeLength {
        /// The record name.
        record: String,
        /// The length field name.
        length: String,
        /// The negative value.
        value: i64,
    },

    /// A value could not be coerced into the field's domain.
    #[error("cannot convert {value} to {ty}: {detail}")]
    Conversion {
        /// The value, rendered for the message.
        value: String,
        /// The target field type.
        ty: String,
        /// Why the coercion failed.
        detail: String,
    },

    /// A warning raised under a strict [WarningSink](super::warnings::WarningSink).
    #[error("warning treated as an error: {0}")]
    Strict(Warning),

    /// Some [std::io::Error] occurred while reading or writing a stream.
    #[error("i/o error during parse or serialize: {0}")]
    Io(#[from] std::io::Error),
}

/// Either error category, as returned by operations that can hit both.
#[derive(Debug, Error)]
pub enum Error {
    /// See [DescriptorError].
    #[error(transparent)]
    Descriptor(#[from] DescriptorError),
    /// See [FramingError].
    #[error(transparent)]
    Framing(#[from] FramingError),
}

impl Error {
    /// True for the [FramingError] category.
    pub fn is_framing(&self) -> bool {
        matches!(self, Error::Framing(_))
    }

    /// True for the [DescriptorError] category.
    pub fn is_descriptor(&self) -> bool {
        matches!(self, Error::Descriptor(_))
    }
}

/// The result type used by parse, serialize and descriptor construction.
pub type Result<T> = std::result::Result<T, Error>;

#[test]
fn test_messages() {
    let err = FramingError::Short {
        ty: "i32".into(),
        needed: 4,
        got: 1,
    };
    assert_eq!("i32 requires 4 bytes and was given 1", err.to_string());

    let err = DescriptorError::ForwardLengthReference {
        record: "Group".into(),
        length: "count".into(),
        field: "items".into(),
    };
    assert!(err.to_string().contains("appears after it"));
}

#[test]
fn test_category_predicates() {
    let err = Error::from(FramingError::UnterminatedString);
    assert!(err.is_framing());
    assert!(!err.is_descriptor());

    let err = Error::from(DescriptorError::NoDiscriminators);
    assert!(err.is_descriptor());
}
