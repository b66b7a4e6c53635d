//! The object representation.
//!
//! Every object is a [`JsObject`]: an optional prototype handle, a class-like
//! tag, an insertion-ordered property map, and a payload for internal slots
//! (array elements, function closures, map entries, and so on). Keeping the
//! payload inside the object rather than splitting object kinds across heap
//! variants means property access is uniform: one map lookup plus a prototype
//! walk, regardless of what the object is.

use indexmap::IndexMap;

use crate::{
    builtins::Builtin,
    heap::HeapId,
    intern::{HostFnId, StringId},
    modules::ModuleId,
    types::{
        buffer::{DataViewData, TypedArrayData},
        collections::{JsMap, JsSet},
        function::{BoundData, ClosureData},
        generator::GeneratorData,
        iterator::NativeIter,
        promise::PromiseData,
        regexp::RegExpData,
    },
    value::{SymbolId, Value},
};

/// A property key: an interned string, a canonical array index, or a symbol.
///
/// Numeric strings in the array-index range are always normalized to
/// `Index`, which keeps enumeration order correct (integer keys ascending
/// before string keys in insertion order).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum PropKey {
    Str(StringId),
    Index(u32),
    Symbol(SymbolId),
}

/// Value-or-accessor part of a property.
#[derive(Debug, Clone, Copy)]
pub(crate) enum PropValue {
    Data(Value),
    Accessor { get: Option<Value>, set: Option<Value> },
}

/// A property descriptor.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Property {
    pub value: PropValue,
    pub writable: bool,
    pub enumerable: bool,
    pub configurable: bool,
}

impl Property {
    /// An ordinary writable/enumerable/configurable data property.
    pub fn data(value: Value) -> Self {
        Self {
            value: PropValue::Data(value),
            writable: true,
            enumerable: true,
            configurable: true,
        }
    }

    /// A non-enumerable data property (methods on prototypes).
    pub fn method(value: Value) -> Self {
        Self {
            value: PropValue::Data(value),
            writable: true,
            enumerable: false,
            configurable: true,
        }
    }

    /// A frozen data property (`Math.PI` and similar constants).
    pub fn constant(value: Value) -> Self {
        Self {
            value: PropValue::Data(value),
            writable: false,
            enumerable: false,
            configurable: false,
        }
    }

    /// An accessor property.
    pub fn accessor(get: Option<Value>, set: Option<Value>) -> Self {
        Self {
            value: PropValue::Accessor { get, set },
            writable: true,
            enumerable: false,
            configurable: true,
        }
    }
}

/// Class-like internal tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ClassTag {
    Object,
    Array,
    Function,
    Error,
    Map,
    Set,
    WeakMap,
    WeakSet,
    Date,
    RegExp,
    Promise,
    Generator,
    AsyncGenerator,
    ArrayBuffer,
    TypedArray,
    DataView,
    Arguments,
    Namespace,
    Iterator,
}

impl ClassTag {
    /// The name used by `Object.prototype.toString`.
    pub fn name(self) -> &'static str {
        match self {
            Self::Object | Self::Namespace | Self::Iterator => "Object",
            Self::Array => "Array",
            Self::Function => "Function",
            Self::Error => "Error",
            Self::Map => "Map",
            Self::Set => "Set",
            Self::WeakMap => "WeakMap",
            Self::WeakSet => "WeakSet",
            Self::Date => "Date",
            Self::RegExp => "RegExp",
            Self::Promise => "Promise",
            Self::Generator => "Generator",
            Self::AsyncGenerator => "AsyncGenerator",
            Self::ArrayBuffer => "ArrayBuffer",
            Self::TypedArray => "TypedArray",
            Self::DataView => "DataView",
            Self::Arguments => "Arguments",
        }
    }
}

/// Internal slots.
#[derive(Debug, Default)]
pub(crate) enum ObjectPayload {
    #[default]
    None,
    /// Dense array elements; holes read as `undefined`.
    Array(Vec<Value>),
    /// A script function (closure over its defining scope).
    Function(ClosureData),
    /// `Function.prototype.bind` result.
    Bound(Box<BoundData>),
    /// A native builtin function.
    Native(Builtin),
    /// A native function capturing engine state (promise capabilities).
    NativeClosure(crate::types::function::NativeClosure),
    /// A host-registered function.
    HostFn(HostFnId),
    Promise(PromiseData),
    Generator(Box<GeneratorData>),
    /// Placeholder while the generator machine owns the state.
    GeneratorRunning,
    Map(JsMap),
    Set(JsSet),
    WeakMap(JsMap),
    WeakSet(JsSet),
    /// Milliseconds since the epoch (NaN for invalid dates).
    Date(f64),
    RegExp(Box<RegExpData>),
    ArrayBuffer(Vec<u8>),
    TypedArray(TypedArrayData),
    DataView(DataViewData),
    /// A module namespace; property reads resolve through the module's
    /// exports table.
    Namespace(ModuleId),
    /// A builtin iterator (array/string/map/set iterators).
    NativeIter(NativeIter),
}

/// An object: prototype, tag, ordered property map, payload.
#[derive(Debug)]
pub(crate) struct JsObject {
    pub proto: Option<HeapId>,
    pub tag: ClassTag,
    pub extensible: bool,
    props: IndexMap<PropKey, Property>,
    pub payload: ObjectPayload,
}

impl JsObject {
    pub fn new(tag: ClassTag, proto: Option<HeapId>) -> Self {
        Self {
            proto,
            tag,
            extensible: true,
            props: IndexMap::new(),
            payload: ObjectPayload::None,
        }
    }

    pub fn with_payload(tag: ClassTag, proto: Option<HeapId>, payload: ObjectPayload) -> Self {
        Self {
            proto,
            tag,
            extensible: true,
            props: IndexMap::new(),
            payload,
        }
    }

    /// True when calling this object makes sense.
    pub fn is_callable(&self) -> bool {
        matches!(
            self.payload,
            ObjectPayload::Function(_)
                | ObjectPayload::Bound(_)
                | ObjectPayload::Native(_)
                | ObjectPayload::NativeClosure(_)
                | ObjectPayload::HostFn(_)
        )
    }

    #[inline]
    pub fn get_own(&self, key: PropKey) -> Option<&Property> {
        self.props.get(&key)
    }

    #[inline]
    pub fn get_own_mut(&mut self, key: PropKey) -> Option<&mut Property> {
        self.props.get_mut(&key)
    }

    /// Inserts or replaces a property wholesale.
    pub fn define(&mut self, key: PropKey, prop: Property) {
        self.props.insert(key, prop);
    }

    /// Convenience for an ordinary data property.
    pub fn set_data(&mut self, key: PropKey, value: Value) {
        match self.props.get_mut(&key) {
            Some(existing) => existing.value = PropValue::Data(value),
            None => {
                self.props.insert(key, Property::data(value));
            }
        }
    }

    pub fn delete(&mut self, key: PropKey) -> bool {
        self.props.shift_remove(&key).is_some()
    }

    pub fn has_own(&self, key: PropKey) -> bool {
        self.props.contains_key(&key)
    }

    /// Own keys in specification order: integer keys ascending, then the
    /// remaining string keys in insertion order, then symbols.
    pub fn own_keys(&self) -> Vec<PropKey> {
        let mut indices: Vec<u32> = Vec::new();
        let mut strings: Vec<PropKey> = Vec::new();
        let mut symbols: Vec<PropKey> = Vec::new();
        if let ObjectPayload::Array(elements) = &self.payload {
            indices.extend(0..u32::try_from(elements.len()).unwrap_or(u32::MAX));
        }
        for key in self.props.keys() {
            match key {
                PropKey::Index(i) => indices.push(*i),
                PropKey::Str(_) => strings.push(*key),
                PropKey::Symbol(_) => symbols.push(*key),
            }
        }
        indices.sort_unstable();
        indices.dedup();
        let mut out: Vec<PropKey> = indices.into_iter().map(PropKey::Index).collect();
        out.extend(strings);
        out.extend(symbols);
        out
    }

    /// Iterates the raw property map (insertion order, no payload indices).
    pub fn props_iter(&self) -> impl Iterator<Item = (&PropKey, &Property)> {
        self.props.iter()
    }

    /// Number of stored properties (excluding payload-backed elements).
    pub fn props_len(&self) -> usize {
        self.props.len()
    }

    /// The array elements, if this is an array.
    pub fn elements(&self) -> Option<&Vec<Value>> {
        match &self.payload {
            ObjectPayload::Array(elements) => Some(elements),
            _ => None,
        }
    }

    pub fn elements_mut(&mut self) -> Option<&mut Vec<Value>> {
        match &mut self.payload {
            ObjectPayload::Array(elements) => Some(elements),
            _ => None,
        }
    }
}
