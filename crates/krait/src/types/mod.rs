//! Runtime data types stored in object payloads.

pub(crate) mod buffer;
pub(crate) mod collections;
pub(crate) mod function;
pub(crate) mod generator;
pub(crate) mod iterator;
pub(crate) mod object;
pub(crate) mod promise;
pub(crate) mod regexp;

pub(crate) use buffer::{DataViewData, TypedArrayData, TypedKind};
pub(crate) use collections::{JsMap, JsSet, MapKey};
pub(crate) use function::{BoundData, ClassInfo, ClosureData, FieldInit, FieldKey, NativeClosure};
pub(crate) use generator::{
    DriverKind, GenKind, GenState, GeneratorData, IterDriver, LoopFrame, PendingCompletion, TryFrame,
};
pub(crate) use iterator::{NativeIter, NativeIterKind};
pub(crate) use object::{ClassTag, JsObject, ObjectPayload, PropKey, PropValue, Property};
pub(crate) use promise::{PromiseData, PromiseReaction, PromiseState, ReactionKind, ReactionTarget};
pub(crate) use regexp::RegExpData;
