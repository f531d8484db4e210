//! Record descriptors and record values.
//!
//! A [RecordDescriptor] is an ordered list of named [FieldType]s plus the
//! construction-time checks that keep the wire layout coherent: unique
//! names, backward symbolic length references, size-preserving overrides.
//! A [RecordValue] binds a descriptor to field values and re-runs
//! conversion and validation on every assignment.

use std::collections::HashMap;
use std::fmt::{self, Display, Formatter};
use std::sync::Arc;

use super::error::{DescriptorError, FramingError, Result};
use super::types::{FieldKind, FieldType, Length};
use super::value::Value;
use super::warnings::{Warning, WarningSink};

/// One named field of a record.
#[derive(Debug, Clone)]
pub struct Field {
    name: String,
    ty: FieldType,
}

impl Field {
    /// The field name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The field type.
    pub fn ty(&self) -> &FieldType {
        &self.ty
    }
}

/// An ordered, immutable description of a record's wire layout.
#[derive(Debug)]
pub struct RecordDescriptor {
    name: String,
    fields: Vec<Field>,
}

impl RecordDescriptor {
    /// Builds a descriptor, validating the declaration eagerly: the
    /// record must have at least one field, names must be unique, and a
    /// symbolic length must name a field that appears earlier on the
    /// wire.
    pub fn new(name: &str, fields: Vec<(&str, FieldType)>) -> Result<Arc<RecordDescriptor>> {
        if fields.is_empty() {
            return Err(DescriptorError::EmptyRecord {
                record: name.to_string(),
            }
            .into());
        }

        let names: Vec<&str> = fields.iter().map(|(field_name, _)| *field_name).collect();
        for (i, field_name) in names.iter().enumerate() {
            if names[..i].contains(field_name) {
                return Err(DescriptorError::DuplicateField {
                    record: name.to_string(),
                    field: field_name.to_string(),
                }
                .into());
            }
        }

        for (i, (field_name, ty)) in fields.iter().enumerate() {
            if let Some(Length::Field(length_name)) = ty.length() {
                match names.iter().position(|n| n == length_name) {
                    Some(j) if j < i => {}
                    Some(_) => {
                        return Err(DescriptorError::ForwardLengthReference {
                            record: name.to_string(),
                            length: length_name.clone(),
                            field: field_name.to_string(),
                        }
                        .into());
                    }
                    None => {
                        return Err(DescriptorError::UnknownLengthField {
                            record: name.to_string(),
                            length: length_name.clone(),
                            field: field_name.to_string(),
                        }
                        .into());
                    }
                }
            }
        }

        let mut built = Vec::with_capacity(fields.len());
        for (field_name, mut ty) in fields {
            ty.normalize_constants(field_name)?;
            built.push(Field {
                name: field_name.to_string(),
                ty,
            });
        }

        Ok(Arc::new(RecordDescriptor {
            name: name.to_string(),
            fields: built,
        }))
    }

    /// Derives a descriptor from a parent by replacing fields by name.
    ///
    /// The parent's field order is kept. An override must preserve the
    /// wire size: either both types have the same fixed size, or both are
    /// symbolic on the same length field, or both are auto-terminated.
    /// This is what lets a subtype pin a discriminator with a different
    /// `always` without touching the layout.
    pub fn with_override(
        name: &str,
        parent: &Arc<RecordDescriptor>,
        overrides: Vec<(&str, FieldType)>,
    ) -> Result<Arc<RecordDescriptor>> {
        let mut fields = parent.fields.clone();
        for (field_name, mut ty) in overrides {
            let Some(position) = fields.iter().position(|f| f.name == field_name) else {
                return Err(DescriptorError::UnknownOverride {
                    record: parent.name.clone(),
                    field: field_name.to_string(),
                }
                .into());
            };
            if !wire_shape_matches(&fields[position].ty, &ty) {
                return Err(DescriptorError::SizeChangingOverride {
                    record: name.to_string(),
                    field: field_name.to_string(),
                }
                .into());
            }
            ty.normalize_constants(field_name)?;
            fields[position].ty = ty;
        }
        Ok(Arc::new(RecordDescriptor {
            name: name.to_string(),
            fields,
        }))
    }

    /// The record name, also used to derive handler callback names.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The fields in wire order.
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Retrieves the field with the given name.
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub(crate) fn is_const_size(&self) -> bool {
        self.fields.iter().all(|f| f.ty.is_const_size())
    }

    /// The number of bytes one value of this record occupies.
    ///
    /// Variable-length and auto-terminated fields need the record value
    /// as context; without it this fails with a descriptor error.
    pub fn sizeof(&self, ctx: Option<&RecordValue>) -> Result<usize> {
        let sink = WarningSink::default();
        let mut total = 0;
        for field in &self.fields {
            let own = ctx.and_then(|record| record.get(field.name()));
            total += field.ty.resolved_byte_len(ctx, own, &sink)?;
        }
        Ok(total)
    }

    /// The pack-style layout of this record, the concatenation of its
    /// fields' formats.
    pub fn struct_format(&self, ctx: Option<&RecordValue>) -> Result<String> {
        let mut out = String::new();
        for field in &self.fields {
            let own = ctx.and_then(|record| record.get(field.name()));
            out.push_str(&field.ty.struct_format_with(ctx, own)?);
        }
        Ok(out)
    }
}

fn wire_shape_matches(old: &FieldType, new: &FieldType) -> bool {
    match (old.length(), new.length()) {
        (Some(Length::Field(a)), Some(Length::Field(b))) => a == b,
        (Some(Length::Auto), Some(Length::Auto)) => true,
        _ => {
            old.is_const_size()
                && new.is_const_size()
                && matches!(
                    (old.sizeof(None), new.sizeof(None)),
                    (Ok(a), Ok(b)) if a == b
                )
        }
    }
}

/// A record descriptor bound to field values.
#[derive(Debug, Clone)]
pub struct RecordValue {
    descriptor: Arc<RecordDescriptor>,
    values: HashMap<String, Value>,
}

impl RecordValue {
    pub(crate) fn empty(descriptor: Arc<RecordDescriptor>) -> RecordValue {
        RecordValue {
            descriptor,
            values: HashMap::new(),
        }
    }

    /// A record with only its defaults applied.
    pub fn new(descriptor: &Arc<RecordDescriptor>) -> Result<RecordValue> {
        RecordValue::build(descriptor, Vec::new())
    }

    /// A record built from defaults plus the given field values, using
    /// the default lenient [WarningSink].
    pub fn build(descriptor: &Arc<RecordDescriptor>, values: Vec<(&str, Value)>) -> Result<RecordValue> {
        RecordValue::build_with(descriptor, values, &WarningSink::default())
    }

    /// Builds a record. Fields are initialized in declaration order: the
    /// constant or default first, then the caller's value, so that an
    /// invalid default is surfaced even when it is immediately replaced.
    /// Names the descriptor does not declare are reported as warnings and
    /// ignored.
    pub fn build_with(
        descriptor: &Arc<RecordDescriptor>,
        values: Vec<(&str, Value)>,
        sink: &WarningSink,
    ) -> Result<RecordValue> {
        let mut record = RecordValue::empty(descriptor.clone());
        let mut supplied: HashMap<String, Value> = values
            .into_iter()
            .map(|(name, value)| (name.to_string(), value))
            .collect();

        for field in descriptor.fields() {
            let name = field.name().to_string();
            let ty = field.ty();
            if let Some(fallback) = ty.fallback() {
                record.set_with(&name, fallback, sink)?;
            } else {
                match ty.kind() {
                    FieldKind::Bytes {
                        length: Length::Field(len),
                        ..
                    } if record.get(len).is_some() => {
                        if Length::Field(len.clone()).resolve(Some(&record), "byte string")? == 0 {
                            record.set_with(&name, Value::Bytes(Vec::new()), sink)?;
                        }
                    }
                    FieldKind::Text {
                        length: Length::Field(len),
                        ..
                    } if record.get(len).is_some() => {
                        if Length::Field(len.clone()).resolve(Some(&record), "text string")? == 0 {
                            record.set_with(&name, Value::Text(String::new()), sink)?;
                        }
                    }
                    FieldKind::Array {
                        length: Length::Field(len),
                        element,
                    } if element.has_fallback() && record.get(len).is_some() => {
                        let n = Length::Field(len.clone()).resolve(Some(&record), "array")?;
                        let mut items = Vec::with_capacity(n);
                        for _ in 0..n {
                            if let Some(item) = element.fallback() {
                                items.push(item);
                            }
                        }
                        record.set_with(&name, Value::List(items), sink)?;
                    }
                    _ => {}
                }
            }
            if let Some(value) = supplied.remove(&name) {
                record.set_with(&name, value, sink)?;
            }
        }

        for name in supplied.into_keys() {
            sink.report(Warning::UnknownField {
                record: descriptor.name().to_string(),
                name,
            })
            .map_err(FramingError::Strict)?;
        }

        Ok(record)
    }

    /// The descriptor this value is bound to.
    pub fn descriptor(&self) -> &Arc<RecordDescriptor> {
        &self.descriptor
    }

    /// The current value of a field, if it is set.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// Assigns a field with the default lenient [WarningSink].
    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> Result<()> {
        self.set_with(name, value.into(), &WarningSink::default())
    }

    /// Assigns a field: the value is converted into the field's domain,
    /// trial-serialized under the current record so impossible values are
    /// rejected immediately, and compared against the field's constant.
    pub fn set_with(&mut self, name: &str, value: Value, sink: &WarningSink) -> Result<()> {
        let ty = match self.descriptor.field(name) {
            Some(field) => field.ty().clone(),
            None => {
                return Err(DescriptorError::NoSuchField {
                    record: self.descriptor.name().to_string(),
                    field: name.to_string(),
                }
                .into());
            }
        };
        let converted = ty.convert_with(value, sink)?;
        ty.serialize_with(&converted, Some(self), sink)?;
        if let Some(always) = ty.always_value() {
            if *always != converted {
                sink.report(Warning::AlwaysMismatch {
                    record: self.descriptor.name().to_string(),
                    field: name.to_string(),
                    expected: always.to_string(),
                    actual: converted.to_string(),
                })
                .map_err(FramingError::Strict)?;
            }
        }
        self.values.insert(name.to_string(), converted);
        Ok(())
    }

    pub(crate) fn is_instance_of(&self, descriptor: &Arc<RecordDescriptor>) -> bool {
        Arc::ptr_eq(&self.descriptor, descriptor)
    }
}

impl PartialEq for RecordValue {
    fn eq(&self, other: &RecordValue) -> bool {
        Arc::ptr_eq(&self.descriptor, &other.descriptor)
            && self
                .descriptor
                .fields()
                .iter()
                .all(|f| self.values.get(f.name()) == other.values.get(f.name()))
    }
}

impl Display for RecordValue {
    fn fmt(&self, formatter: &mut Formatter) -> fmt::Result {
        write!(formatter, "{}(", self.descriptor.name)?;
        let mut first = true;
        for field in &self.descriptor.fields {
            if let Some(value) = self.values.get(field.name()) {
                if !first {
                    formatter.write_str(", ")?;
                }
                write!(formatter, "{}={}", field.name(), value)?;
                first = false;
            }
        }
        formatter.write_str(")")
    }
}

#[cfg(test)]
pub(crate) mod test {
    use super::*;
    use crate::types::FieldType;

    pub const NP_BUF: &[u8] =
        b"\x12\x34\x00\x00\x00\x05\x00\x00\x00\x06unnamed\x00\x00\x00\x00\x00\x00\x00\x00";

    pub fn named_point() -> Arc<RecordDescriptor> {
        RecordDescriptor::new(
            "NamedPoint",
            vec![
                ("code", FieldType::u16().always(0x1234)),
                ("x", FieldType::i32()),
                ("y", FieldType::i32()),
                ("name", FieldType::bytes(15).default(&b"unnamed"[..])),
            ],
        )
        .unwrap()
    }

    pub fn point_group(named_point: &Arc<RecordDescriptor>) -> Arc<RecordDescriptor> {
        RecordDescriptor::new(
            "PointGroup",
            vec![
                ("code", FieldType::u8().always(0xFF)),
                ("count", FieldType::i16()),
                ("points", FieldType::array_var("count", FieldType::record(named_point))),
            ],
        )
        .unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::test::{named_point, point_group, NP_BUF};
    use super::*;
    use crate::types::FieldType;

    #[test]
    fn test_construction_applies_constants_and_defaults() {
        let point = named_point();
        let record = RecordValue::build(&point, vec![("x", 5.into()), ("y", 6.into())]).unwrap();
        assert_eq!(Some(&Value::Int(0x1234)), record.get("code"));
        assert_eq!(Some(&Value::Bytes(b"unnamed".to_vec())), record.get("name"));
        assert_eq!(Some(&Value::Int(5)), record.get("x"));
    }

    #[test]
    fn test_serialized_layout() {
        let point = named_point();
        let record = RecordValue::build(&point, vec![("x", 5.into()), ("y", 6.into())]).unwrap();
        let wire = record.serialize().unwrap();
        assert_eq!(NP_BUF, &wire[..]);
        assert_eq!(25, point.sizeof(None).unwrap());
        assert_eq!("Hii15s", point.struct_format(None).unwrap());
    }

    #[test]
    fn test_equality() {
        let point = named_point();
        let a = RecordValue::build(&point, vec![("x", 5.into()), ("y", 6.into())]).unwrap();
        let b = RecordValue::build(&point, vec![("x", 5.into()), ("y", 6.into())]).unwrap();
        let c = RecordValue::build(&point, vec![("x", 0.into()), ("y", 0.into())]).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);

        // A different descriptor with the same layout is a different type.
        let other = named_point();
        let d = RecordValue::build(&other, vec![("x", 5.into()), ("y", 6.into())]).unwrap();
        assert_ne!(a, d);
    }

    #[test]
    fn test_display() {
        let point = named_point();
        let record = RecordValue::build(&point, vec![("x", 5.into()), ("y", 6.into())]).unwrap();
        let repr = record.to_string();
        assert!(repr.starts_with("NamedPoint("));
        assert!(repr.contains("x=5"));
        assert!(repr.contains("name=b\"unnamed\""));
    }

    #[test]
    fn test_unknown_field_warns() {
        let point = named_point();
        let (sink, warnings) = WarningSink::capture();
        let record = RecordValue::build_with(
            &point,
            vec![("x", 5.into()), ("y", 6.into()), ("z", 12.into())],
            &sink,
        )
        .unwrap();
        assert_eq!(None, record.get("z"));
        assert_eq!(
            vec![Warning::UnknownField {
                record: "NamedPoint".into(),
                name: "z".into()
            }],
            warnings.borrow().clone()
        );

        assert!(RecordValue::build_with(
            &point,
            vec![("x", 5.into()), ("y", 6.into()), ("z", 12.into())],
            &WarningSink::strict(),
        )
        .is_err());
    }

    #[test]
    fn test_always_mismatch_warns() {
        let point = named_point();
        let (sink, warnings) = WarningSink::capture();
        RecordValue::build_with(
            &point,
            vec![("code", 0x4321.into()), ("x", 5.into()), ("y", 6.into())],
            &sink,
        )
        .unwrap();
        assert!(matches!(
            warnings.borrow()[0],
            Warning::AlwaysMismatch { .. }
        ));
    }

    #[test]
    fn test_assignment_converts() {
        let point = named_point();
        let mut record = RecordValue::new(&point).unwrap();
        record.set("x", "5").unwrap();
        assert_eq!(Some(&Value::Int(5)), record.get("x"));
        record.set("name", 6).unwrap();
        assert_eq!(Some(&Value::Bytes(b"6".to_vec())), record.get("name"));
        assert!(record.set("x", Value::list(["wrong", "type"])).is_err());
        assert!(record.set("x", Value::from(1u64 << 33)).is_err());
    }

    #[test]
    fn test_empty_record_rejected() {
        assert!(RecordDescriptor::new("Empty", vec![]).is_err());
    }

    #[test]
    fn test_duplicate_field_rejected() {
        let err = RecordDescriptor::new(
            "Point",
            vec![("x", FieldType::i32()), ("x", FieldType::i32())],
        )
        .unwrap_err();
        assert!(err.to_string().contains("more than once"));
    }

    #[test]
    fn test_forward_length_reference_rejected() {
        let err = RecordDescriptor::new(
            "BadVarlength",
            vec![
                ("arr", FieldType::array_var("size", FieldType::i8())),
                ("size", FieldType::i8()),
            ],
        )
        .unwrap_err();
        assert!(err.to_string().contains("appears after it"));
    }

    #[test]
    fn test_unknown_length_field_rejected() {
        assert!(RecordDescriptor::new(
            "Dangling",
            vec![("greeting", FieldType::bytes_var("glen"))],
        )
        .is_err());
    }

    #[test]
    fn test_override_replaces_constant() {
        let point = named_point();
        let renamed = RecordDescriptor::with_override(
            "RenamedPoint",
            &point,
            vec![("code", FieldType::u16().always(0x4321))],
        )
        .unwrap();
        let record = RecordValue::build(&renamed, vec![("x", 5.into()), ("y", 6.into())]).unwrap();
        assert_eq!(Some(&Value::Int(0x4321)), record.get("code"));
        assert_eq!(25, renamed.sizeof(None).unwrap());
        assert_eq!(
            "code",
            renamed.fields()[0].name(),
            "parent field order is preserved"
        );
    }

    #[test]
    fn test_size_changing_override_rejected() {
        let point = named_point();
        let err = RecordDescriptor::with_override(
            "Origin",
            &point,
            vec![("x", FieldType::i8().always(0))],
        )
        .unwrap_err();
        assert!(err.to_string().contains("differently-sized"));
    }

    #[test]
    fn test_unknown_override_rejected() {
        let point = named_point();
        assert!(RecordDescriptor::with_override(
            "Origin",
            &point,
            vec![("zz", FieldType::i32())],
        )
        .is_err());
    }

    #[test]
    fn test_invalid_array_constants_rejected() {
        assert!(RecordDescriptor::new(
            "Bad",
            vec![("xs", FieldType::array(2, FieldType::i8()).always(Value::list([0])))],
        )
        .is_err());
        assert!(RecordDescriptor::new(
            "Bad",
            vec![("xs", FieldType::array(2, FieldType::i32()).default(Value::list([0, 1])))],
        )
        .is_ok());
    }

    #[test]
    fn test_array_element_defaults_prefill() {
        let derived = RecordDescriptor::new(
            "DerivedDefault",
            vec![
                ("size", FieldType::i8().default(2)),
                ("arr", FieldType::array_var("size", FieldType::i32().default(5))),
            ],
        )
        .unwrap();
        let record = RecordValue::new(&derived).unwrap();
        assert_eq!(Some(&Value::list([5, 5])), record.get("arr"));
    }

    #[test]
    fn test_zero_length_variable_fields_default_to_empty() {
        let desc = RecordDescriptor::new(
            "DefaultEmpty",
            vec![
                ("size", FieldType::i8().default(0)),
                ("string", FieldType::bytes_var("size")),
            ],
        )
        .unwrap();
        let record = RecordValue::new(&desc).unwrap();
        assert_eq!(Some(&Value::Bytes(Vec::new())), record.get("string"));
        assert_eq!(b"\x00", &record.serialize().unwrap()[..]);
    }

    #[test]
    fn test_zero_length_field_keeps_user_value() {
        let desc = RecordDescriptor::new(
            "DefaultEmpty",
            vec![
                ("size", FieldType::i8().default(0)),
                ("string", FieldType::bytes_var("size")),
            ],
        )
        .unwrap();
        let record = RecordValue::build(&desc, vec![("string", Value::from(&b"abc"[..]))]).unwrap();
        // The explicit value wins over the implied empty string; the
        // resolved zero width still governs the wire, with a warning.
        assert_eq!(Some(&Value::Bytes(b"abc".to_vec())), record.get("string"));
        let (sink, warnings) = WarningSink::capture();
        assert_eq!(b"\x00", &record.serialize_with(&sink).unwrap()[..]);
        assert!(matches!(warnings.borrow()[0], Warning::StringOverrun { .. }));
    }

    #[test]
    fn test_strict_mode_promotes_default_overrun() {
        let marvin = || {
            RecordDescriptor::new(
                "Person",
                vec![("name", FieldType::bytes(5).default(&b"marvin"[..]))],
            )
            .unwrap()
        };
        assert!(RecordValue::build_with(&marvin(), vec![], &WarningSink::strict()).is_err());
        assert!(RecordValue::build(&marvin(), vec![]).is_ok());
    }

    #[test]
    fn test_producer_defaults() {
        let desc = RecordDescriptor::new(
            "Stamped",
            vec![
                ("tag", FieldType::bytes(4).default_with(|| Value::from(&b"wire"[..]))),
                ("x", FieldType::i32()),
            ],
        )
        .unwrap();
        let record = RecordValue::build(&desc, vec![("x", 1.into())]).unwrap();
        assert_eq!(Some(&Value::Bytes(b"wire".to_vec())), record.get("tag"));
    }

    #[test]
    fn test_nested_record_fields_accept_exact_type_only() {
        let point = named_point();
        let segment = RecordDescriptor::new(
            "Segment",
            vec![
                ("p1", FieldType::record(&point)),
                ("p2", FieldType::record(&point)),
            ],
        )
        .unwrap();
        let p = RecordValue::build(&point, vec![("x", 5.into()), ("y", 6.into())]).unwrap();
        let mut seg = RecordValue::new(&segment).unwrap();
        seg.set("p1", p.clone()).unwrap();
        assert!(seg.set("p2", "not a point").is_err());

        let lookalike = named_point();
        let q = RecordValue::build(&lookalike, vec![("x", 5.into()), ("y", 6.into())]).unwrap();
        assert!(seg.set("p2", q).is_err());
        seg.set("p2", p).unwrap();
        seg.serialize().unwrap();
    }

    #[test]
    fn test_descriptors_are_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<RecordDescriptor>();
        assert_send_sync::<FieldType>();
        assert_send_sync::<RecordValue>();
    }

    #[test]
    fn test_varlength_group_sizeof_and_format() {
        let point = named_point();
        let group = point_group(&point);
        assert!(group.sizeof(None).is_err());
        assert!(group.struct_format(None).is_err());

        let p = RecordValue::build(&point, vec![("x", 5.into()), ("y", 6.into())]).unwrap();
        let pg = RecordValue::build(
            &group,
            vec![("count", 1.into()), ("points", Value::list([p]))],
        )
        .unwrap();
        assert_eq!(3 + 25, group.sizeof(Some(&pg)).unwrap());
        assert_eq!("BhHii15s", group.struct_format(Some(&pg)).unwrap());
    }
}
