//! Arena heap for runtime values.
//!
//! Values that do not fit inline in [`Value`](crate::value::Value) live here:
//! owned strings, BigInts, and every object. Handles are plain indices
//! (`HeapId`); the arena grows for the lifetime of the engine and is freed
//! when the engine drops. JavaScript object graphs are routinely cyclic
//! (`obj.self = obj`), so there is no per-value reclamation; the host bounds
//! a script's footprint externally.

use num_bigint::BigInt;

use crate::types::JsObject;

/// Handle to a heap-allocated value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HeapId(u32);

impl HeapId {
    #[inline]
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

/// A heap-resident value.
#[derive(Debug)]
pub(crate) enum HeapData {
    /// An owned (non-interned) string.
    Str(String),
    BigInt(BigInt),
    Object(JsObject),
}

/// The arena.
#[derive(Debug, Default)]
pub(crate) struct Heap {
    data: Vec<HeapData>,
}

impl Heap {
    pub fn new() -> Self {
        Self { data: Vec::with_capacity(256) }
    }

    /// Allocates a value and returns its handle.
    pub fn alloc(&mut self, data: HeapData) -> HeapId {
        let id = HeapId(u32::try_from(self.data.len()).expect("heap overflow"));
        self.data.push(data);
        id
    }

    /// Allocates an object.
    #[inline]
    pub fn alloc_object(&mut self, obj: JsObject) -> HeapId {
        self.alloc(HeapData::Object(obj))
    }

    /// Allocates an owned string.
    #[inline]
    pub fn alloc_str(&mut self, s: String) -> HeapId {
        self.alloc(HeapData::Str(s))
    }

    /// Allocates a BigInt.
    #[inline]
    pub fn alloc_bigint(&mut self, b: BigInt) -> HeapId {
        self.alloc(HeapData::BigInt(b))
    }

    #[inline]
    pub fn get(&self, id: HeapId) -> &HeapData {
        &self.data[id.index()]
    }

    #[inline]
    pub fn get_mut(&mut self, id: HeapId) -> &mut HeapData {
        &mut self.data[id.index()]
    }

    /// The object at `id`; panics if `id` is not an object. Object handles
    /// only come from object allocations, so a mismatch is an engine bug.
    #[inline]
    pub fn object(&self, id: HeapId) -> &JsObject {
        match self.get(id) {
            HeapData::Object(obj) => obj,
            other => panic!("expected object at {id:?}, found {other:?}"),
        }
    }

    #[inline]
    pub fn object_mut(&mut self, id: HeapId) -> &mut JsObject {
        match self.get_mut(id) {
            HeapData::Object(obj) => obj,
            _ => panic!("expected object at {id:?}"),
        }
    }

    /// Takes an object's payload out, leaving `placeholder` behind. Used by
    /// the generator machine to run a generator without holding a heap
    /// borrow across evaluation.
    pub fn replace_object(&mut self, id: HeapId, placeholder: JsObject) -> JsObject {
        match self.get_mut(id) {
            HeapData::Object(obj) => std::mem::replace(obj, placeholder),
            _ => panic!("expected object at {id:?}"),
        }
    }

    /// True when `id` is a RegExp object.
    pub fn is_regexp(&self, id: HeapId) -> bool {
        matches!(
            self.get(id),
            HeapData::Object(obj) if matches!(obj.payload, crate::types::ObjectPayload::RegExp(_))
        )
    }

    /// Number of live allocations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }
}
