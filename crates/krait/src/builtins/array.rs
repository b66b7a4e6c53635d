//! `Array` statics and `Array.prototype`.
//!
//! Methods operate on the dense element store. Callback-taking methods
//! (`map`, `filter`, `sort`, ...) snapshot the elements first, matching the
//! iteration-order guarantees scripts rely on even when the callback mutates
//! the array.

use crate::{
    builtins::{Builtin, CtorFn, define_method, define_symbol_method, install_ctor},
    error::RunResult,
    eval::Interp,
    heap::{HeapData, HeapId},
    types::{ClassTag, JsObject, NativeIter, NativeIterKind, ObjectPayload, PropKey},
    value::{SymbolId, Value},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ArrayFn {
    IsArray,
    From,
    Of,
    Push,
    Pop,
    Shift,
    Unshift,
    Slice,
    Splice,
    Concat,
    Join,
    Reverse,
    IndexOf,
    LastIndexOf,
    Includes,
    Find,
    FindIndex,
    FindLast,
    FindLastIndex,
    Filter,
    Map,
    ForEach,
    Reduce,
    ReduceRight,
    Some,
    Every,
    Sort,
    Flat,
    FlatMap,
    Fill,
    CopyWithin,
    At,
    With,
    ToSorted,
    ToReversed,
    ToSpliced,
    Keys,
    Values,
    Entries,
    ToString,
}

/// `new Array(len)` / `Array(a, b, c)`.
pub(crate) fn construct_array(interp: &mut Interp, args: &[Value]) -> RunResult<Value> {
    if args.len() == 1 {
        if let Value::Number(n) = args[0] {
            if n.fract() != 0.0 || !(0.0..=4_294_967_295.0).contains(&n) {
                return Err(interp.throw_range_error("invalid array length"));
            }
            return Ok(interp.new_array(vec![Value::Undefined; n as usize]));
        }
    }
    Ok(interp.new_array(args.to_vec()))
}

fn this_array(interp: &mut Interp, this: Value, what: &str) -> RunResult<HeapId> {
    if let Value::Ref(id) = this {
        if let HeapData::Object(obj) = interp.heap.get(id) {
            if matches!(obj.payload, ObjectPayload::Array(_)) {
                return Ok(id);
            }
        }
    }
    Err(interp.throw_type_error(format!("{what} requires an array receiver")))
}

fn elements_snapshot(interp: &Interp, id: HeapId) -> Vec<Value> {
    interp.heap.object(id).elements().cloned().unwrap_or_default()
}

fn callback_arg(interp: &mut Interp, args: &[Value], what: &str) -> RunResult<(Value, Value)> {
    let callback = args.first().copied().unwrap_or(Value::Undefined);
    if !interp.is_callable(callback) {
        return Err(interp.throw_type_error(format!("{what} requires a callback function")));
    }
    let this_arg = args.get(1).copied().unwrap_or(Value::Undefined);
    Ok((callback, this_arg))
}

fn normalize_range(interp: &mut Interp, args: &[Value], start_idx: usize, end_idx: usize, len: usize) -> RunResult<(usize, usize)> {
    let rel = |interp: &mut Interp, v: Option<Value>, default: usize| -> RunResult<usize> {
        match v {
            None | Some(Value::Undefined) => Ok(default),
            Some(v) => {
                let n = interp.to_integer_or_infinity(v)?;
                Ok(if n < 0.0 {
                    (len as f64 + n).max(0.0) as usize
                } else {
                    (n as usize).min(len)
                })
            }
        }
    };
    let start = rel(interp, args.get(start_idx).copied(), 0)?;
    let end = rel(interp, args.get(end_idx).copied(), len)?;
    Ok((start, end.max(start)))
}

#[expect(clippy::too_many_lines, reason = "one arm per method")]
pub(crate) fn call(interp: &mut Interp, f: ArrayFn, this: Value, args: &[Value]) -> RunResult<Value> {
    let arg0 = args.first().copied().unwrap_or(Value::Undefined);
    match f {
        ArrayFn::IsArray => {
            let is = matches!(arg0, Value::Ref(id)
                if matches!(interp.heap.get(id), HeapData::Object(obj) if obj.tag == ClassTag::Array));
            Ok(Value::Bool(is))
        }
        ArrayFn::From => {
            let items = interp.iterate_collect(arg0)?;
            let mapped = match args.get(1).copied() {
                Some(mapper) if interp.is_callable(mapper) => {
                    let mut out = Vec::with_capacity(items.len());
                    for (i, item) in items.into_iter().enumerate() {
                        let v = interp.call_value(mapper, Value::Undefined, &[item, Value::Number(i as f64)])?;
                        out.push(v);
                    }
                    out
                }
                _ => items,
            };
            Ok(interp.new_array(mapped))
        }
        ArrayFn::Of => Ok(interp.new_array(args.to_vec())),
        ArrayFn::Push => {
            let id = this_array(interp, this, "Array.prototype.push")?;
            let elements = interp.heap.object_mut(id).elements_mut().expect("array");
            elements.extend_from_slice(args);
            Ok(Value::Number(elements.len() as f64))
        }
        ArrayFn::Pop => {
            let id = this_array(interp, this, "Array.prototype.pop")?;
            let elements = interp.heap.object_mut(id).elements_mut().expect("array");
            Ok(elements.pop().unwrap_or(Value::Undefined))
        }
        ArrayFn::Shift => {
            let id = this_array(interp, this, "Array.prototype.shift")?;
            let elements = interp.heap.object_mut(id).elements_mut().expect("array");
            if elements.is_empty() {
                Ok(Value::Undefined)
            } else {
                Ok(elements.remove(0))
            }
        }
        ArrayFn::Unshift => {
            let id = this_array(interp, this, "Array.prototype.unshift")?;
            let elements = interp.heap.object_mut(id).elements_mut().expect("array");
            for (i, arg) in args.iter().enumerate() {
                elements.insert(i, *arg);
            }
            Ok(Value::Number(elements.len() as f64))
        }
        ArrayFn::Slice => {
            let id = this_array(interp, this, "Array.prototype.slice")?;
            let elements = elements_snapshot(interp, id);
            let (start, end) = normalize_range(interp, args, 0, 1, elements.len())?;
            Ok(interp.new_array(elements[start..end].to_vec()))
        }
        ArrayFn::Splice => {
            let id = this_array(interp, this, "Array.prototype.splice")?;
            let len = elements_snapshot(interp, id).len();
            let start = match args.first().copied() {
                None => 0,
                Some(v) => {
                    let n = interp.to_integer_or_infinity(v)?;
                    if n < 0.0 {
                        (len as f64 + n).max(0.0) as usize
                    } else {
                        (n as usize).min(len)
                    }
                }
            };
            let delete_count = match args.get(1).copied() {
                None => len - start,
                Some(v) => {
                    let n = interp.to_integer_or_infinity(v)?.max(0.0) as usize;
                    n.min(len - start)
                }
            };
            let inserted = args.get(2..).unwrap_or(&[]).to_vec();
            let elements = interp.heap.object_mut(id).elements_mut().expect("array");
            let removed: Vec<Value> = elements.splice(start..start + delete_count, inserted).collect();
            Ok(interp.new_array(removed))
        }
        ArrayFn::Concat => {
            let id = this_array(interp, this, "Array.prototype.concat")?;
            let mut out = elements_snapshot(interp, id);
            for arg in args {
                let is_array = matches!(arg, Value::Ref(other)
                    if matches!(interp.heap.get(*other), HeapData::Object(obj) if obj.tag == ClassTag::Array));
                if is_array {
                    let Value::Ref(other) = arg else { unreachable!() };
                    out.extend(elements_snapshot(interp, *other));
                } else {
                    out.push(*arg);
                }
            }
            Ok(interp.new_array(out))
        }
        ArrayFn::Join => {
            let id = this_array(interp, this, "Array.prototype.join")?;
            let separator = match args.first().copied() {
                None | Some(Value::Undefined) => ",".to_owned(),
                Some(v) => interp.to_string_value(v)?,
            };
            let elements = elements_snapshot(interp, id);
            let mut parts = Vec::with_capacity(elements.len());
            for element in elements {
                if element.is_nullish() {
                    parts.push(String::new());
                } else {
                    parts.push(interp.to_string_value(element)?);
                }
            }
            Ok(interp.alloc_string(parts.join(&separator)))
        }
        ArrayFn::ToString => {
            call(interp, ArrayFn::Join, this, &[])
        }
        ArrayFn::Reverse => {
            let id = this_array(interp, this, "Array.prototype.reverse")?;
            interp.heap.object_mut(id).elements_mut().expect("array").reverse();
            Ok(this)
        }
        ArrayFn::IndexOf | ArrayFn::LastIndexOf | ArrayFn::Includes => {
            let id = this_array(interp, this, "Array.prototype.indexOf")?;
            let elements = elements_snapshot(interp, id);
            let position = if f == ArrayFn::LastIndexOf {
                elements.iter().rposition(|v| interp.strict_equals(*v, arg0))
            } else if f == ArrayFn::Includes {
                elements.iter().position(|v| interp.same_value_zero(*v, arg0))
            } else {
                elements.iter().position(|v| interp.strict_equals(*v, arg0))
            };
            if f == ArrayFn::Includes {
                Ok(Value::Bool(position.is_some()))
            } else {
                Ok(Value::Number(position.map_or(-1.0, |i| i as f64)))
            }
        }
        ArrayFn::Find | ArrayFn::FindIndex | ArrayFn::FindLast | ArrayFn::FindLastIndex => {
            let id = this_array(interp, this, "Array.prototype.find")?;
            let (callback, this_arg) = callback_arg(interp, args, "Array.prototype.find")?;
            let elements = elements_snapshot(interp, id);
            let indices: Vec<usize> = if matches!(f, ArrayFn::FindLast | ArrayFn::FindLastIndex) {
                (0..elements.len()).rev().collect()
            } else {
                (0..elements.len()).collect()
            };
            for i in indices {
                let v = elements[i];
                let keep = interp.call_value(callback, this_arg, &[v, Value::Number(i as f64), this])?;
                if interp.to_boolean(keep) {
                    return Ok(match f {
                        ArrayFn::Find | ArrayFn::FindLast => v,
                        _ => Value::Number(i as f64),
                    });
                }
            }
            Ok(match f {
                ArrayFn::Find | ArrayFn::FindLast => Value::Undefined,
                _ => Value::Number(-1.0),
            })
        }
        ArrayFn::Filter => {
            let id = this_array(interp, this, "Array.prototype.filter")?;
            let (callback, this_arg) = callback_arg(interp, args, "Array.prototype.filter")?;
            let elements = elements_snapshot(interp, id);
            let mut out = Vec::new();
            for (i, v) in elements.into_iter().enumerate() {
                let keep = interp.call_value(callback, this_arg, &[v, Value::Number(i as f64), this])?;
                if interp.to_boolean(keep) {
                    out.push(v);
                }
            }
            Ok(interp.new_array(out))
        }
        ArrayFn::Map => {
            let id = this_array(interp, this, "Array.prototype.map")?;
            let (callback, this_arg) = callback_arg(interp, args, "Array.prototype.map")?;
            let elements = elements_snapshot(interp, id);
            let mut out = Vec::with_capacity(elements.len());
            for (i, v) in elements.into_iter().enumerate() {
                out.push(interp.call_value(callback, this_arg, &[v, Value::Number(i as f64), this])?);
            }
            Ok(interp.new_array(out))
        }
        ArrayFn::ForEach => {
            let id = this_array(interp, this, "Array.prototype.forEach")?;
            let (callback, this_arg) = callback_arg(interp, args, "Array.prototype.forEach")?;
            let elements = elements_snapshot(interp, id);
            for (i, v) in elements.into_iter().enumerate() {
                interp.call_value(callback, this_arg, &[v, Value::Number(i as f64), this])?;
            }
            Ok(Value::Undefined)
        }
        ArrayFn::Reduce | ArrayFn::ReduceRight => {
            let id = this_array(interp, this, "Array.prototype.reduce")?;
            let callback = arg0;
            if !interp.is_callable(callback) {
                return Err(interp.throw_type_error("Array.prototype.reduce requires a callback function"));
            }
            let elements = elements_snapshot(interp, id);
            let mut order: Vec<usize> = (0..elements.len()).collect();
            if f == ArrayFn::ReduceRight {
                order.reverse();
            }
            let mut iter = order.into_iter();
            let mut acc = match args.get(1).copied() {
                Some(initial) => initial,
                None => match iter.next() {
                    Some(i) => elements[i],
                    None => return Err(interp.throw_type_error("reduce of empty array with no initial value")),
                },
            };
            for i in iter {
                acc = interp.call_value(callback, Value::Undefined, &[acc, elements[i], Value::Number(i as f64), this])?;
            }
            Ok(acc)
        }
        ArrayFn::Some | ArrayFn::Every => {
            let id = this_array(interp, this, "Array.prototype.some")?;
            let (callback, this_arg) = callback_arg(interp, args, "Array.prototype.some")?;
            let elements = elements_snapshot(interp, id);
            for (i, v) in elements.into_iter().enumerate() {
                let result = interp.call_value(callback, this_arg, &[v, Value::Number(i as f64), this])?;
                let truthy = interp.to_boolean(result);
                if f == ArrayFn::Some && truthy {
                    return Ok(Value::Bool(true));
                }
                if f == ArrayFn::Every && !truthy {
                    return Ok(Value::Bool(false));
                }
            }
            Ok(Value::Bool(f == ArrayFn::Every))
        }
        ArrayFn::Sort | ArrayFn::ToSorted => {
            let id = this_array(interp, this, "Array.prototype.sort")?;
            let comparator = args.first().copied().filter(|v| interp.is_callable(*v));
            let elements = elements_snapshot(interp, id);
            let sorted = sort_elements(interp, elements, comparator)?;
            if f == ArrayFn::ToSorted {
                Ok(interp.new_array(sorted))
            } else {
                *interp.heap.object_mut(id).elements_mut().expect("array") = sorted;
                Ok(this)
            }
        }
        ArrayFn::Flat => {
            let id = this_array(interp, this, "Array.prototype.flat")?;
            let depth = match args.first().copied() {
                None | Some(Value::Undefined) => 1.0,
                Some(v) => interp.to_integer_or_infinity(v)?,
            };
            let elements = elements_snapshot(interp, id);
            let mut out = Vec::new();
            flatten_into(interp, &elements, depth, &mut out);
            Ok(interp.new_array(out))
        }
        ArrayFn::FlatMap => {
            let id = this_array(interp, this, "Array.prototype.flatMap")?;
            let (callback, this_arg) = callback_arg(interp, args, "Array.prototype.flatMap")?;
            let elements = elements_snapshot(interp, id);
            let mut mapped = Vec::with_capacity(elements.len());
            for (i, v) in elements.into_iter().enumerate() {
                mapped.push(interp.call_value(callback, this_arg, &[v, Value::Number(i as f64), this])?);
            }
            let mut out = Vec::new();
            flatten_into(interp, &mapped, 1.0, &mut out);
            Ok(interp.new_array(out))
        }
        ArrayFn::Fill => {
            let id = this_array(interp, this, "Array.prototype.fill")?;
            let len = elements_snapshot(interp, id).len();
            let (start, end) = normalize_range(interp, args, 1, 2, len)?;
            let elements = interp.heap.object_mut(id).elements_mut().expect("array");
            for slot in &mut elements[start..end] {
                *slot = arg0;
            }
            Ok(this)
        }
        ArrayFn::CopyWithin => {
            let id = this_array(interp, this, "Array.prototype.copyWithin")?;
            let len = elements_snapshot(interp, id).len();
            let target = match args.first().copied() {
                None => 0,
                Some(v) => {
                    let n = interp.to_integer_or_infinity(v)?;
                    if n < 0.0 { (len as f64 + n).max(0.0) as usize } else { (n as usize).min(len) }
                }
            };
            let (start, end) = normalize_range(interp, args, 1, 2, len)?;
            let snapshot = elements_snapshot(interp, id);
            let elements = interp.heap.object_mut(id).elements_mut().expect("array");
            for (offset, i) in (start..end).enumerate() {
                if target + offset >= len {
                    break;
                }
                elements[target + offset] = snapshot[i];
            }
            Ok(this)
        }
        ArrayFn::At => {
            let id = this_array(interp, this, "Array.prototype.at")?;
            let elements = elements_snapshot(interp, id);
            let index = interp.to_integer_or_infinity(arg0)?;
            let index = if index < 0.0 { elements.len() as f64 + index } else { index };
            if index < 0.0 || index >= elements.len() as f64 {
                return Ok(Value::Undefined);
            }
            Ok(elements[index as usize])
        }
        ArrayFn::With => {
            let id = this_array(interp, this, "Array.prototype.with")?;
            let mut elements = elements_snapshot(interp, id);
            let index = interp.to_integer_or_infinity(arg0)?;
            let index = if index < 0.0 { elements.len() as f64 + index } else { index };
            if index < 0.0 || index >= elements.len() as f64 {
                return Err(interp.throw_range_error("invalid index for Array.prototype.with"));
            }
            elements[index as usize] = args.get(1).copied().unwrap_or(Value::Undefined);
            Ok(interp.new_array(elements))
        }
        ArrayFn::ToReversed => {
            let id = this_array(interp, this, "Array.prototype.toReversed")?;
            let mut elements = elements_snapshot(interp, id);
            elements.reverse();
            Ok(interp.new_array(elements))
        }
        ArrayFn::ToSpliced => {
            let id = this_array(interp, this, "Array.prototype.toSpliced")?;
            let mut elements = elements_snapshot(interp, id);
            let len = elements.len();
            let start = match args.first().copied() {
                None => 0,
                Some(v) => {
                    let n = interp.to_integer_or_infinity(v)?;
                    if n < 0.0 { (len as f64 + n).max(0.0) as usize } else { (n as usize).min(len) }
                }
            };
            let delete_count = match args.get(1).copied() {
                None => len - start,
                Some(v) => (interp.to_integer_or_infinity(v)?.max(0.0) as usize).min(len - start),
            };
            let inserted = args.get(2..).unwrap_or(&[]).to_vec();
            elements.splice(start..start + delete_count, inserted);
            Ok(interp.new_array(elements))
        }
        ArrayFn::Keys | ArrayFn::Values | ArrayFn::Entries => {
            let kind = match f {
                ArrayFn::Keys => NativeIterKind::ArrayKeys,
                ArrayFn::Values => NativeIterKind::ArrayValues,
                _ => NativeIterKind::ArrayEntries,
            };
            let proto = interp.realm.iterator_proto;
            let obj = JsObject::with_payload(
                ClassTag::Iterator,
                Some(proto),
                ObjectPayload::NativeIter(NativeIter::new(kind, this)),
            );
            Ok(Value::Ref(interp.heap.alloc_object(obj)))
        }
    }
}

fn flatten_into(interp: &Interp, elements: &[Value], depth: f64, out: &mut Vec<Value>) {
    for element in elements {
        let nested = if depth >= 1.0 {
            match element {
                Value::Ref(id) => match interp.heap.get(*id) {
                    HeapData::Object(obj) if obj.tag == ClassTag::Array => obj.elements().cloned(),
                    _ => None,
                },
                _ => None,
            }
        } else {
            None
        };
        match nested {
            Some(inner) => flatten_into(interp, &inner, depth - 1.0, out),
            None => out.push(*element),
        }
    }
}

/// Sort with the default string comparison or a user comparator. Holes and
/// undefined sort to the end.
fn sort_elements(interp: &mut Interp, elements: Vec<Value>, comparator: Option<Value>) -> RunResult<Vec<Value>> {
    let mut defined: Vec<Value> = Vec::with_capacity(elements.len());
    let mut undefined_count = 0usize;
    for v in elements {
        if v == Value::Undefined {
            undefined_count += 1;
        } else {
            defined.push(v);
        }
    }
    // Precompute sort keys; user comparators run through insertion sort to
    // keep fallible comparisons simple and stable.
    match comparator {
        Some(comparator) => {
            let mut sorted: Vec<Value> = Vec::with_capacity(defined.len());
            for v in defined {
                let mut insert_at = sorted.len();
                for (i, existing) in sorted.iter().enumerate() {
                    let order = interp.call_value(comparator, Value::Undefined, &[v, *existing])?;
                    let order = interp.to_number(order)?;
                    if order < 0.0 {
                        insert_at = i;
                        break;
                    }
                }
                sorted.insert(insert_at, v);
            }
            sorted.extend(std::iter::repeat_n(Value::Undefined, undefined_count));
            Ok(sorted)
        }
        None => {
            let mut keyed: Vec<(String, Value)> = Vec::with_capacity(defined.len());
            for v in defined {
                keyed.push((interp.to_string_value(v)?, v));
            }
            keyed.sort_by(|a, b| a.0.cmp(&b.0));
            let mut sorted: Vec<Value> = keyed.into_iter().map(|(_, v)| v).collect();
            sorted.extend(std::iter::repeat_n(Value::Undefined, undefined_count));
            Ok(sorted)
        }
    }
}

pub(crate) fn install(interp: &mut Interp) {
    let proto = interp.realm.array_proto;
    let methods: &[(&str, ArrayFn, usize)] = &[
        ("push", ArrayFn::Push, 1),
        ("pop", ArrayFn::Pop, 0),
        ("shift", ArrayFn::Shift, 0),
        ("unshift", ArrayFn::Unshift, 1),
        ("slice", ArrayFn::Slice, 2),
        ("splice", ArrayFn::Splice, 2),
        ("concat", ArrayFn::Concat, 1),
        ("join", ArrayFn::Join, 1),
        ("reverse", ArrayFn::Reverse, 0),
        ("indexOf", ArrayFn::IndexOf, 1),
        ("lastIndexOf", ArrayFn::LastIndexOf, 1),
        ("includes", ArrayFn::Includes, 1),
        ("find", ArrayFn::Find, 1),
        ("findIndex", ArrayFn::FindIndex, 1),
        ("findLast", ArrayFn::FindLast, 1),
        ("findLastIndex", ArrayFn::FindLastIndex, 1),
        ("filter", ArrayFn::Filter, 1),
        ("map", ArrayFn::Map, 1),
        ("forEach", ArrayFn::ForEach, 1),
        ("reduce", ArrayFn::Reduce, 1),
        ("reduceRight", ArrayFn::ReduceRight, 1),
        ("some", ArrayFn::Some, 1),
        ("every", ArrayFn::Every, 1),
        ("sort", ArrayFn::Sort, 1),
        ("flat", ArrayFn::Flat, 0),
        ("flatMap", ArrayFn::FlatMap, 1),
        ("fill", ArrayFn::Fill, 1),
        ("copyWithin", ArrayFn::CopyWithin, 2),
        ("at", ArrayFn::At, 1),
        ("with", ArrayFn::With, 2),
        ("toSorted", ArrayFn::ToSorted, 1),
        ("toReversed", ArrayFn::ToReversed, 0),
        ("toSpliced", ArrayFn::ToSpliced, 2),
        ("keys", ArrayFn::Keys, 0),
        ("values", ArrayFn::Values, 0),
        ("entries", ArrayFn::Entries, 0),
        ("toString", ArrayFn::ToString, 0),
    ];
    for (name, f, length) in methods {
        define_method(interp, proto, name, Builtin::ArrayB(*f), *length);
    }
    define_symbol_method(
        interp,
        proto,
        SymbolId::ITERATOR,
        "[Symbol.iterator]",
        Builtin::ArrayB(ArrayFn::Values),
    );

    let ctor = install_ctor(interp, "Array", CtorFn::Array, proto, 1);
    define_method(interp, ctor, "isArray", Builtin::ArrayB(ArrayFn::IsArray), 1);
    define_method(interp, ctor, "from", Builtin::ArrayB(ArrayFn::From), 1);
    define_method(interp, ctor, "of", Builtin::ArrayB(ArrayFn::Of), 0);
}
