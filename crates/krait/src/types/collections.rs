//! Map and Set storage.
//!
//! Keys are hashed with SameValueZero semantics: `NaN` equals `NaN`, and
//! `-0` equals `+0`. The canonical [`MapKey`] owns its data (string content
//! copied out of the heap) so hashing never needs heap access.

use indexmap::IndexMap;
use num_bigint::BigInt;

use crate::{
    heap::{Heap, HeapData, HeapId},
    intern::Interns,
    value::{SymbolId, Value},
};

/// Hashable key with SameValueZero equality.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) enum MapKey {
    Undefined,
    Null,
    Bool(bool),
    /// Canonicalized bit pattern: NaN collapses to one NaN, -0 to +0.
    Num(u64),
    Str(String),
    BigInt(BigInt),
    Symbol(SymbolId),
    Obj(HeapId),
}

impl MapKey {
    pub fn from_value(value: Value, heap: &Heap, interns: &Interns) -> Self {
        match value {
            Value::Undefined => Self::Undefined,
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(b),
            Value::Number(n) => {
                let canonical = if n.is_nan() {
                    f64::NAN
                } else if n == 0.0 {
                    0.0
                } else {
                    n
                };
                Self::Num(canonical.to_bits())
            }
            Value::Str(id) => Self::Str(interns.get(id).to_owned()),
            Value::Symbol(id) => Self::Symbol(id),
            Value::Ref(id) => match heap.get(id) {
                HeapData::Str(s) => Self::Str(s.clone()),
                HeapData::BigInt(b) => Self::BigInt(b.clone()),
                HeapData::Object(_) => Self::Obj(id),
            },
        }
    }
}

/// Map entries: canonical key to (original key value, mapped value).
#[derive(Debug, Default)]
pub(crate) struct JsMap {
    pub entries: IndexMap<MapKey, (Value, Value)>,
}

impl JsMap {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Set entries: canonical key to the original value.
#[derive(Debug, Default)]
pub(crate) struct JsSet {
    pub entries: IndexMap<MapKey, Value>,
}

impl JsSet {
    pub fn new() -> Self {
        Self::default()
    }
}
