use crate::{Position, Value};

/// A single parsed key/value pair (§3): `(key, value, meta)`. Order of
/// `KeyValue`s within a [`crate::Section`] is significant — callers index
/// by position, and repeating keys (e.g. OpenFlow's five `output` actions
/// in `local,3,4,5,output:foo`) all survive distinctly.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct KeyValue<'a> {
    pub key: String,
    pub value: Value<'a>,
    pub meta: Position<'a>,
}

impl<'a> KeyValue<'a> {
    pub(crate) fn new(key: impl Into<String>, value: Value<'a>, meta: Position<'a>) -> Self {
        KeyValue {
            key: key.into(),
            value,
            meta,
        }
    }
}
