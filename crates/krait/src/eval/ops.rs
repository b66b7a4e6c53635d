//! Coercion and operator semantics.
//!
//! `ToPrimitive`, `ToNumber`, `ToString`, `ToBoolean`, the `==` table, `===`,
//! SameValue/SameValueZero, and the binary/unary operator implementations.
//! Number-to-string goes through `ryu` for the shortest round-trip digits and
//! is then shaped to the ECMAScript format (integer forms, the 1e21 exponent
//! cutoff, no `+` only on negative exponents).

use num_bigint::BigInt;
use num_traits::{Signed, ToPrimitive, Zero};

use crate::{
    ast::{BinaryOp, UnaryOp},
    error::RunResult,
    eval::Interp,
    heap::HeapData,
    types::{ClassTag, ObjectPayload, PropKey},
    value::Value,
};

/// Preferred type for `ToPrimitive`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PrimitiveHint {
    Default,
    Number,
    String,
}

/// A numeric operand: JS has two numeric types that never mix implicitly.
#[derive(Debug, Clone)]
pub(crate) enum Numeric {
    Num(f64),
    Big(BigInt),
}

impl Interp {
    // === ToBoolean / ToNumber / ToString ===

    pub fn to_boolean(&self, value: Value) -> bool {
        match value {
            Value::Undefined | Value::Null => false,
            Value::Bool(b) => b,
            Value::Number(n) => n != 0.0 && !n.is_nan(),
            Value::Str(id) => !self.interns.get(id).is_empty(),
            Value::Symbol(_) => true,
            Value::Ref(id) => match self.heap.get(id) {
                HeapData::Str(s) => !s.is_empty(),
                HeapData::BigInt(b) => !b.is_zero(),
                HeapData::Object(_) => true,
            },
        }
    }

    pub fn to_number(&mut self, value: Value) -> RunResult<f64> {
        match value {
            Value::Undefined => Ok(f64::NAN),
            Value::Null => Ok(0.0),
            Value::Bool(b) => Ok(if b { 1.0 } else { 0.0 }),
            Value::Number(n) => Ok(n),
            Value::Str(id) => Ok(string_to_number(self.interns.get(id))),
            Value::Symbol(_) => Err(self.throw_type_error("cannot convert a Symbol to a number")),
            Value::Ref(id) => match self.heap.get(id) {
                HeapData::Str(s) => Ok(string_to_number(s)),
                HeapData::BigInt(_) => Err(self.throw_type_error("cannot convert a BigInt to a number")),
                HeapData::Object(_) => {
                    let prim = self.to_primitive(value, PrimitiveHint::Number)?;
                    self.to_number(prim)
                }
            },
        }
    }

    /// ToNumber or BigInt, for arithmetic operators.
    pub fn to_numeric(&mut self, value: Value) -> RunResult<Numeric> {
        let prim = if value.is_object(&self.heap) {
            self.to_primitive(value, PrimitiveHint::Number)?
        } else {
            value
        };
        if let Value::Ref(id) = prim {
            if let HeapData::BigInt(b) = self.heap.get(id) {
                return Ok(Numeric::Big(b.clone()));
            }
        }
        Ok(Numeric::Num(self.to_number(prim)?))
    }

    pub fn to_string_value(&mut self, value: Value) -> RunResult<String> {
        match value {
            Value::Undefined => Ok("undefined".to_owned()),
            Value::Null => Ok("null".to_owned()),
            Value::Bool(b) => Ok(if b { "true" } else { "false" }.to_owned()),
            Value::Number(n) => Ok(js_number_to_string(n)),
            Value::Str(id) => Ok(self.interns.get(id).to_owned()),
            Value::Symbol(_) => Err(self.throw_type_error("cannot convert a Symbol to a string")),
            Value::Ref(id) => match self.heap.get(id) {
                HeapData::Str(s) => Ok(s.clone()),
                HeapData::BigInt(b) => Ok(b.to_string()),
                HeapData::Object(_) => {
                    let prim = self.to_primitive(value, PrimitiveHint::String)?;
                    self.to_string_value(prim)
                }
            },
        }
    }

    /// ToPrimitive for objects: `valueOf`/`toString` in hint order, Date
    /// preferring string by default.
    pub fn to_primitive(&mut self, value: Value, hint: PrimitiveHint) -> RunResult<Value> {
        let Value::Ref(id) = value else {
            return Ok(value);
        };
        if !matches!(self.heap.get(id), HeapData::Object(_)) {
            return Ok(value);
        }
        let is_date = self.heap.object(id).tag == ClassTag::Date;
        let string_first = hint == PrimitiveHint::String || (hint == PrimitiveHint::Default && is_date);
        let value_of = self.interns.intern("valueOf");
        let to_string = self.interns.intern("toString");
        let order = if string_first {
            [to_string, value_of]
        } else {
            [value_of, to_string]
        };
        for method_name in order {
            let method = self.get_property(value, PropKey::Str(method_name))?;
            if self.is_callable(method) {
                let result = self.call_value(method, value, &[])?;
                if !result.is_object(&self.heap) {
                    return Ok(result);
                }
            }
        }
        Err(self.throw_type_error("cannot convert object to primitive value"))
    }

    /// True when `value` can be called.
    pub fn is_callable(&self, value: Value) -> bool {
        match value {
            Value::Ref(id) => match self.heap.get(id) {
                HeapData::Object(obj) => obj.is_callable(),
                _ => false,
            },
            _ => false,
        }
    }

    // === equality ===

    pub fn strict_equals(&self, a: Value, b: Value) -> bool {
        match (a, b) {
            (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
            (Value::Bool(x), Value::Bool(y)) => x == y,
            (Value::Number(x), Value::Number(y)) => x == y,
            (Value::Symbol(x), Value::Symbol(y)) => x == y,
            _ => {
                // Strings compare by content; BigInts by value; objects by
                // identity.
                if let (Some(x), Some(y)) = (a.as_str(&self.heap, &self.interns), b.as_str(&self.heap, &self.interns)) {
                    return x == y;
                }
                match (a, b) {
                    (Value::Ref(x), Value::Ref(y)) => match (self.heap.get(x), self.heap.get(y)) {
                        (HeapData::BigInt(bx), HeapData::BigInt(by)) => bx == by,
                        (HeapData::Object(_), HeapData::Object(_)) => x == y,
                        _ => false,
                    },
                    _ => false,
                }
            }
        }
    }

    /// SameValue: like `===` but NaN equals NaN and -0 differs from +0.
    pub fn same_value(&self, a: Value, b: Value) -> bool {
        if let (Value::Number(x), Value::Number(y)) = (a, b) {
            if x.is_nan() && y.is_nan() {
                return true;
            }
            if x == 0.0 && y == 0.0 {
                return x.is_sign_negative() == y.is_sign_negative();
            }
        }
        self.strict_equals(a, b)
    }

    /// SameValueZero: like SameValue but -0 equals +0.
    pub fn same_value_zero(&self, a: Value, b: Value) -> bool {
        if let (Value::Number(x), Value::Number(y)) = (a, b) {
            if x.is_nan() && y.is_nan() {
                return true;
            }
        }
        self.strict_equals(a, b)
    }

    /// The full `==` coercion table.
    pub fn loose_equals(&mut self, a: Value, b: Value) -> RunResult<bool> {
        if self.strict_equals(a, b) {
            return Ok(true);
        }
        match (a, b) {
            (Value::Null, Value::Undefined) | (Value::Undefined, Value::Null) => Ok(true),
            (Value::Number(x), _) if b.is_string(&self.heap) => {
                let n = self.to_number(b)?;
                Ok(x == n)
            }
            (_, Value::Number(y)) if a.is_string(&self.heap) => {
                let n = self.to_number(a)?;
                Ok(n == y)
            }
            (Value::Bool(_), _) => {
                let n = self.to_number(a)?;
                self.loose_equals(Value::Number(n), b)
            }
            (_, Value::Bool(_)) => {
                let n = self.to_number(b)?;
                self.loose_equals(a, Value::Number(n))
            }
            _ if a.is_bigint(&self.heap) && (matches!(b, Value::Number(_)) || b.is_string(&self.heap)) => {
                let Value::Ref(id) = a else { unreachable!() };
                let HeapData::BigInt(big) = self.heap.get(id) else { unreachable!() };
                let big = big.clone();
                Ok(bigint_equals_value(&big, b, self))
            }
            _ if b.is_bigint(&self.heap) && (matches!(a, Value::Number(_)) || a.is_string(&self.heap)) => {
                let Value::Ref(id) = b else { unreachable!() };
                let HeapData::BigInt(big) = self.heap.get(id) else { unreachable!() };
                let big = big.clone();
                Ok(bigint_equals_value(&big, a, self))
            }
            // object == primitive: ToPrimitive the object.
            (Value::Ref(id), _) if matches!(self.heap.get(id), HeapData::Object(_)) && !b.is_nullish() => {
                if b.is_object(&self.heap) {
                    return Ok(false);
                }
                let prim = self.to_primitive(a, PrimitiveHint::Default)?;
                self.loose_equals(prim, b)
            }
            (_, Value::Ref(id)) if matches!(self.heap.get(id), HeapData::Object(_)) && !a.is_nullish() => {
                let prim = self.to_primitive(b, PrimitiveHint::Default)?;
                self.loose_equals(a, prim)
            }
            _ => Ok(false),
        }
    }

    // === binary operators ===

    pub fn binary_op(&mut self, op: BinaryOp, left: Value, right: Value) -> RunResult<Value> {
        match op {
            BinaryOp::Add => self.op_add(left, right),
            BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Rem | BinaryOp::Exp => {
                let a = self.to_numeric(left)?;
                let b = self.to_numeric(right)?;
                self.numeric_arith(op, a, b)
            }
            BinaryOp::BitAnd | BinaryOp::BitOr | BinaryOp::BitXor | BinaryOp::Shl | BinaryOp::Shr | BinaryOp::UShr => {
                let a = self.to_numeric(left)?;
                let b = self.to_numeric(right)?;
                match (a, b) {
                    (Numeric::Big(x), Numeric::Big(y)) => {
                        let result = match op {
                            BinaryOp::BitAnd => x & y,
                            BinaryOp::BitOr => x | y,
                            BinaryOp::BitXor => x ^ y,
                            BinaryOp::Shl => x << y.to_i64().unwrap_or(0),
                            BinaryOp::Shr => x >> y.to_i64().unwrap_or(0),
                            BinaryOp::UShr => {
                                return Err(self.throw_type_error("BigInts have no unsigned right shift"));
                            }
                            _ => unreachable!(),
                        };
                        Ok(self.alloc_bigint_value(result))
                    }
                    (Numeric::Num(x), Numeric::Num(y)) => {
                        let xi = crate::types::buffer::to_int32(x);
                        let yu = crate::types::buffer::to_uint32(y);
                        let shift = yu & 31;
                        let result = match op {
                            BinaryOp::BitAnd => f64::from(xi & crate::types::buffer::to_int32(y)),
                            BinaryOp::BitOr => f64::from(xi | crate::types::buffer::to_int32(y)),
                            BinaryOp::BitXor => f64::from(xi ^ crate::types::buffer::to_int32(y)),
                            BinaryOp::Shl => f64::from(xi << shift),
                            BinaryOp::Shr => f64::from(xi >> shift),
                            BinaryOp::UShr => f64::from(crate::types::buffer::to_uint32(x) >> shift),
                            _ => unreachable!(),
                        };
                        Ok(Value::Number(result))
                    }
                    _ => Err(self.throw_type_error("cannot mix BigInt and other types")),
                }
            }
            BinaryOp::Lt | BinaryOp::Gt | BinaryOp::Le | BinaryOp::Ge => self.op_relational(op, left, right),
            BinaryOp::Eq => Ok(Value::Bool(self.loose_equals(left, right)?)),
            BinaryOp::Ne => Ok(Value::Bool(!self.loose_equals(left, right)?)),
            BinaryOp::StrictEq => Ok(Value::Bool(self.strict_equals(left, right))),
            BinaryOp::StrictNe => Ok(Value::Bool(!self.strict_equals(left, right))),
            BinaryOp::In => {
                let Value::Ref(id) = right else {
                    return Err(self.throw_type_error("cannot use 'in' on a non-object"));
                };
                if !matches!(self.heap.get(id), HeapData::Object(_)) {
                    return Err(self.throw_type_error("cannot use 'in' on a non-object"));
                }
                let key = self.to_property_key(left)?;
                Ok(Value::Bool(self.has_property(right, key)))
            }
            BinaryOp::InstanceOf => {
                let result = self.instance_of(left, right)?;
                Ok(Value::Bool(result))
            }
        }
    }

    /// `+` is string-biased: if either primitive is a string, concatenate.
    fn op_add(&mut self, left: Value, right: Value) -> RunResult<Value> {
        let lp = self.to_primitive(left, PrimitiveHint::Default)?;
        let rp = self.to_primitive(right, PrimitiveHint::Default)?;
        if lp.is_string(&self.heap) || rp.is_string(&self.heap) {
            let mut s = self.to_string_value(lp)?;
            s.push_str(&self.to_string_value(rp)?);
            return Ok(self.alloc_string(s));
        }
        let a = self.to_numeric(lp)?;
        let b = self.to_numeric(rp)?;
        self.numeric_arith(BinaryOp::Add, a, b)
    }

    fn numeric_arith(&mut self, op: BinaryOp, a: Numeric, b: Numeric) -> RunResult<Value> {
        match (a, b) {
            (Numeric::Num(x), Numeric::Num(y)) => {
                let result = match op {
                    BinaryOp::Add => x + y,
                    BinaryOp::Sub => x - y,
                    BinaryOp::Mul => x * y,
                    BinaryOp::Div => x / y,
                    // JS % keeps the dividend's sign (unlike Euclidean).
                    BinaryOp::Rem => x % y,
                    BinaryOp::Exp => x.powf(y),
                    _ => unreachable!(),
                };
                Ok(Value::Number(result))
            }
            (Numeric::Big(x), Numeric::Big(y)) => {
                let result = match op {
                    BinaryOp::Add => x + y,
                    BinaryOp::Sub => x - y,
                    BinaryOp::Mul => x * y,
                    BinaryOp::Div => {
                        if y.is_zero() {
                            return Err(self.throw_range_error("division by zero"));
                        }
                        x / y
                    }
                    BinaryOp::Rem => {
                        if y.is_zero() {
                            return Err(self.throw_range_error("division by zero"));
                        }
                        x % y
                    }
                    BinaryOp::Exp => {
                        if y.is_negative() {
                            return Err(self.throw_range_error("BigInt exponent must be non-negative"));
                        }
                        let exp = y.to_u32().ok_or_else(|| self.throw_range_error("BigInt exponent too large"))?;
                        x.pow(exp)
                    }
                    _ => unreachable!(),
                };
                Ok(self.alloc_bigint_value(result))
            }
            _ => Err(self.throw_type_error("cannot mix BigInt and other types in arithmetic")),
        }
    }

    fn op_relational(&mut self, op: BinaryOp, left: Value, right: Value) -> RunResult<Value> {
        let lp = self.to_primitive(left, PrimitiveHint::Number)?;
        let rp = self.to_primitive(right, PrimitiveHint::Number)?;
        if lp.is_string(&self.heap) && rp.is_string(&self.heap) {
            let a = self.string_content(lp).expect("string checked");
            let b = self.string_content(rp).expect("string checked");
            let result = match op {
                BinaryOp::Lt => a < b,
                BinaryOp::Gt => a > b,
                BinaryOp::Le => a <= b,
                BinaryOp::Ge => a >= b,
                _ => unreachable!(),
            };
            return Ok(Value::Bool(result));
        }
        // Mixed BigInt/Number comparisons go through f64 approximation.
        let a = self.relational_number(lp)?;
        let b = self.relational_number(rp)?;
        let result = match op {
            BinaryOp::Lt => a < b,
            BinaryOp::Gt => a > b,
            BinaryOp::Le => a <= b,
            BinaryOp::Ge => a >= b,
            _ => unreachable!(),
        };
        Ok(Value::Bool(result))
    }

    fn relational_number(&mut self, value: Value) -> RunResult<f64> {
        if let Value::Ref(id) = value {
            if let HeapData::BigInt(b) = self.heap.get(id) {
                return Ok(b.to_f64().unwrap_or(f64::NAN));
            }
        }
        self.to_number(value)
    }

    pub fn instance_of(&mut self, value: Value, ctor: Value) -> RunResult<bool> {
        if !self.is_callable(ctor) {
            return Err(self.throw_type_error("right-hand side of 'instanceof' is not callable"));
        }
        let proto_key = PropKey::Str(self.interns.intern("prototype"));
        let proto = self.get_property(ctor, proto_key)?;
        let Value::Ref(proto_id) = proto else {
            return Err(self.throw_type_error("prototype is not an object"));
        };
        let Value::Ref(mut cursor) = value else {
            return Ok(false);
        };
        if !matches!(self.heap.get(cursor), HeapData::Object(_)) {
            return Ok(false);
        }
        loop {
            let Some(parent) = self.heap.object(cursor).proto else {
                return Ok(false);
            };
            if parent == proto_id {
                return Ok(true);
            }
            cursor = parent;
        }
    }

    // === unary operators ===

    pub fn unary_op(&mut self, op: UnaryOp, operand: Value) -> RunResult<Value> {
        match op {
            UnaryOp::Neg => match self.to_numeric(operand)? {
                Numeric::Num(n) => Ok(Value::Number(-n)),
                Numeric::Big(b) => Ok(self.alloc_bigint_value(-b)),
            },
            UnaryOp::Plus => Ok(Value::Number(self.to_number(operand)?)),
            UnaryOp::Not => Ok(Value::Bool(!self.to_boolean(operand))),
            UnaryOp::BitNot => match self.to_numeric(operand)? {
                Numeric::Num(n) => Ok(Value::Number(f64::from(!crate::types::buffer::to_int32(n)))),
                Numeric::Big(b) => Ok(self.alloc_bigint_value(!b)),
            },
            UnaryOp::TypeOf => {
                let name = operand.type_of(&self.heap);
                Ok(Value::Str(self.interns.intern(name)))
            }
            UnaryOp::Void => Ok(Value::Undefined),
            // `delete` is handled in expression evaluation (needs the
            // reference, not the value).
            UnaryOp::Delete => Ok(Value::Bool(true)),
        }
    }

    pub fn alloc_bigint_value(&mut self, b: BigInt) -> Value {
        Value::Ref(self.heap.alloc_bigint(b))
    }

    /// ToInt32 on an arbitrary value.
    pub fn value_to_int32(&mut self, value: Value) -> RunResult<i32> {
        let n = self.to_number(value)?;
        Ok(crate::types::buffer::to_int32(n))
    }

    /// ToUint32 on an arbitrary value.
    pub fn value_to_uint32(&mut self, value: Value) -> RunResult<u32> {
        let n = self.to_number(value)?;
        Ok(crate::types::buffer::to_uint32(n))
    }

    /// ToInteger-or-infinity, the index-coercion used across the library.
    pub fn to_integer_or_infinity(&mut self, value: Value) -> RunResult<f64> {
        let n = self.to_number(value)?;
        if n.is_nan() {
            return Ok(0.0);
        }
        Ok(n.trunc())
    }
}

fn bigint_equals_value(big: &BigInt, other: Value, interp: &Interp) -> bool {
    match other {
        Value::Number(n) => {
            if n.fract() != 0.0 || !n.is_finite() {
                return false;
            }
            BigInt::from(n as i128) == *big
        }
        _ => {
            if let Some(s) = other.as_str(&interp.heap, &interp.interns) {
                s.trim().parse::<BigInt>().map(|parsed| parsed == *big).unwrap_or(false)
            } else {
                false
            }
        }
    }
}

/// ToNumber on string content (ES2015 7.1.3.1): trimmed, hex/octal/binary
/// prefixes, `Infinity`, empty string is 0.
pub(crate) fn string_to_number(s: &str) -> f64 {
    let t = s.trim();
    if t.is_empty() {
        return 0.0;
    }
    if let Some(rest) = t.strip_prefix("0x").or_else(|| t.strip_prefix("0X")) {
        return u128::from_str_radix(rest, 16).map_or(f64::NAN, |v| v as f64);
    }
    if let Some(rest) = t.strip_prefix("0o").or_else(|| t.strip_prefix("0O")) {
        return u128::from_str_radix(rest, 8).map_or(f64::NAN, |v| v as f64);
    }
    if let Some(rest) = t.strip_prefix("0b").or_else(|| t.strip_prefix("0B")) {
        return u128::from_str_radix(rest, 2).map_or(f64::NAN, |v| v as f64);
    }
    match t {
        "Infinity" | "+Infinity" => return f64::INFINITY,
        "-Infinity" => return f64::NEG_INFINITY,
        _ => {}
    }
    t.parse::<f64>().unwrap_or(f64::NAN)
}

/// Number-to-string in the ECMAScript format.
pub(crate) fn js_number_to_string(n: f64) -> String {
    if n.is_nan() {
        return "NaN".to_owned();
    }
    if n == f64::INFINITY {
        return "Infinity".to_owned();
    }
    if n == f64::NEG_INFINITY {
        return "-Infinity".to_owned();
    }
    if n == 0.0 {
        return "0".to_owned();
    }
    if n.fract() == 0.0 && n.abs() < 1e21 {
        return format!("{}", n as i128);
    }
    // Shortest digits from ryu, reshaped to the ECMAScript exponent cutoffs.
    let mut buffer = ryu::Buffer::new();
    let shortest = buffer.format(n);
    let (mantissa, exp) = match shortest.split_once(['e', 'E']) {
        Some((m, e)) => (m.to_owned(), e.parse::<i32>().unwrap_or(0)),
        None => (shortest.to_owned(), 0),
    };
    let negative = mantissa.starts_with('-');
    let digits: String = mantissa.chars().filter(|c| c.is_ascii_digit()).collect();
    let digits = digits.trim_end_matches('0');
    let digits = if digits.is_empty() { "0" } else { digits };
    // Position of the decimal point relative to the digit string.
    let int_len = mantissa
        .trim_start_matches('-')
        .split('.')
        .next()
        .map_or(0, str::len) as i32;
    let point = int_len + exp;
    let mut out = String::new();
    if negative {
        out.push('-');
    }
    if point > 21 || point < -5 {
        // Exponential form: d.ddd e(+|-)N
        out.push_str(&digits[..1]);
        if digits.len() > 1 {
            out.push('.');
            out.push_str(&digits[1..]);
        }
        let e = point - 1;
        out.push('e');
        if e >= 0 {
            out.push('+');
        }
        out.push_str(&e.to_string());
    } else if point <= 0 {
        out.push_str("0.");
        for _ in 0..-point {
            out.push('0');
        }
        out.push_str(digits);
    } else if (point as usize) >= digits.len() {
        out.push_str(digits);
        for _ in 0..(point as usize - digits.len()) {
            out.push('0');
        }
    } else {
        out.push_str(&digits[..point as usize]);
        out.push('.');
        out.push_str(&digits[point as usize..]);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn number_formatting() {
        assert_eq!(js_number_to_string(9.0), "9");
        assert_eq!(js_number_to_string(-0.5), "-0.5");
        assert_eq!(js_number_to_string(1.5), "1.5");
        assert_eq!(js_number_to_string(1e21), "1e+21");
        assert_eq!(js_number_to_string(1e-7), "1e-7");
        assert_eq!(js_number_to_string(0.000001), "0.000001");
        assert_eq!(js_number_to_string(f64::NAN), "NaN");
        assert_eq!(js_number_to_string(-f64::INFINITY), "-Infinity");
        assert_eq!(js_number_to_string(100.0), "100");
    }

    #[test]
    fn string_parsing() {
        assert_eq!(string_to_number("  42  "), 42.0);
        assert_eq!(string_to_number(""), 0.0);
        assert_eq!(string_to_number("0x10"), 16.0);
        assert!(string_to_number("12abc").is_nan());
        assert_eq!(string_to_number("-Infinity"), f64::NEG_INFINITY);
        assert_eq!(string_to_number("1e3"), 1000.0);
    }

    #[test]
    fn roundtrip_property() {
        // Number(String(n)) === n for assorted finite numbers.
        for n in [0.1, 123.456, -7.5e-8, 3.141_592_653_589_793, 2e20] {
            let s = js_number_to_string(n);
            assert_eq!(string_to_number(&s), n, "roundtrip failed for {n} via {s}");
        }
    }
}
