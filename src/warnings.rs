//! The non-fatal warning channel.
//!
//! Silent-but-lossy situations (truncation, constant mismatches, unknown
//! field names, precision loss) are reported as [Warning]s instead of
//! errors. Where they end up is decided by the [WarningSink] passed to the
//! operation: forwarded to the `log` facade, collected for inspection, or
//! promoted to errors in strict mode.

use std::cell::RefCell;
use std::rc::Rc;

use thiserror::Error;

/// Every warning the library can emit.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Warning {
    /// A string value was longer than the field it is serialized into.
    #[error("{ty} has length {limit} and was told to serialize {got} bytes")]
    StringOverrun {
        /// The kind of string field, for the message.
        ty: String,
        /// The wire length of the field.
        limit: usize,
        /// The byte length of the value.
        got: usize,
    },
    /// An array value had more elements than the array holds.
    #[error("array has length {limit} and was given {got} elements")]
    ArrayOverrun {
        /// The element count of the array.
        limit: usize,
        /// The number of elements supplied.
        got: usize,
    },
    /// A field with a constant value was given a different value.
    #[error("{record}.{field} should always be {expected} but was given a value of {actual}")]
    AlwaysMismatch {
        /// The record declaring the field.
        record: String,
        /// The field name.
        field: String,
        /// The declared constant.
        expected: String,
        /// The value actually supplied.
        actual: String,
    },
    /// A record was constructed with a name it does not declare.
    #[error("{record} fields do not include {name}")]
    UnknownField {
        /// The record being constructed.
        record: String,
        /// The unknown name.
        name: String,
    },
    /// A non-integer float was coerced into an integer field.
    #[error("loss of precision when converting a float ({value}) to an integer field")]
    PrecisionLoss {
        /// The float that was truncated.
        value: f64,
    },
    /// Several framed records begin with the same constant bytes, so the
    /// shorter discriminator shadows the longer ones.
    #[error("{count} records always begin with {code}: {records}")]
    AmbiguousDiscriminator {
        /// How many records share the prefix.
        count: usize,
        /// The shared prefix, ascii-escaped.
        code: String,
        /// The record names, comma separated.
        records: String,
    },
}

#[derive(Debug, Clone, Default)]
enum Mode {
    #[default]
    Lenient,
    Strict,
    Capture(Rc<RefCell<Vec<Warning>>>),
}

/// Decides what happens to reported warnings.
///
/// The default sink is lenient: warnings are forwarded to
/// `log::warn!(target: "wirerec::warning", ...)` and the operation
/// continues. [strict](WarningSink::strict) promotes every warning to an
/// error, which is the only strictness knob the library has.
#[derive(Debug, Clone, Default)]
pub struct WarningSink(Mode);

impl WarningSink {
    /// A sink that logs warnings and carries on.
    pub fn lenient() -> WarningSink {
        WarningSink(Mode::Lenient)
    }

    /// A sink that turns every warning into an error.
    pub fn strict() -> WarningSink {
        WarningSink(Mode::Strict)
    }

    /// A sink that collects warnings into the returned buffer, for tests
    /// and callers that want to inspect them after the fact.
    pub fn capture() -> (WarningSink, Rc<RefCell<Vec<Warning>>>) {
        let buffer = Rc::new(RefCell::new(Vec::new()));
        (WarningSink(Mode::Capture(buffer.clone())), buffer)
    }

    /// `Ok(())` unless this sink is strict, in which case the warning is
    /// handed back to the caller to be raised as an error.
    pub fn report(&self, warning: Warning) -> Result<(), Warning> {
        match &self.0 {
            Mode::Lenient => {
                log::warn!(target: "wirerec::warning", "{warning}");
                Ok(())
            }
            Mode::Strict => Err(warning),
            Mode::Capture(buffer) => {
                buffer.borrow_mut().push(warning);
                Ok(())
            }
        }
    }
}

#[test]
fn test_lenient_swallows() {
    let sink = WarningSink::lenient();
    assert!(sink.report(Warning::PrecisionLoss { value: 1.5 }).is_ok());
}

#[test]
fn test_strict_returns_the_warning() {
    let sink = WarningSink::strict();
    let warning = Warning::ArrayOverrun { limit: 2, got: 3 };
    assert_eq!(Err(warning.clone()), sink.report(warning));
}

#[test]
fn test_capture_collects() {
    let (sink, buffer) = WarningSink::capture();
    sink.report(Warning::PrecisionLoss { value: 0.5 }).unwrap();
    sink.report(Warning::ArrayOverrun { limit: 1, got: 2 })
        .unwrap();
    assert_eq!(2, buffer.borrow().len());
}
