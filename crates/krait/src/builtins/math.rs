//! The `Math` namespace.

use rand::Rng as _;

use crate::{
    builtins::{Builtin, define_method, install_namespace},
    error::RunResult,
    eval::Interp,
    types::{PropKey, Property},
    value::Value,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MathFn {
    Abs,
    Floor,
    Ceil,
    Round,
    Trunc,
    Sign,
    Sqrt,
    Cbrt,
    Pow,
    Exp,
    Expm1,
    Log,
    Log2,
    Log10,
    Log1p,
    Sin,
    Cos,
    Tan,
    Asin,
    Acos,
    Atan,
    Atan2,
    Sinh,
    Cosh,
    Tanh,
    Asinh,
    Acosh,
    Atanh,
    Min,
    Max,
    Random,
    Hypot,
    Fround,
    Imul,
    Clz32,
}

pub(crate) fn call(interp: &mut Interp, f: MathFn, args: &[Value]) -> RunResult<Value> {
    // Variadic functions first.
    match f {
        MathFn::Min | MathFn::Max => {
            let mut acc = if f == MathFn::Min { f64::INFINITY } else { f64::NEG_INFINITY };
            for arg in args {
                let n = interp.to_number(*arg)?;
                if n.is_nan() {
                    return Ok(Value::Number(f64::NAN));
                }
                acc = if f == MathFn::Min { acc.min(n) } else { acc.max(n) };
            }
            return Ok(Value::Number(acc));
        }
        MathFn::Hypot => {
            let mut sum = 0.0f64;
            for arg in args {
                let n = interp.to_number(*arg)?;
                sum += n * n;
            }
            return Ok(Value::Number(sum.sqrt()));
        }
        MathFn::Random => return Ok(Value::Number(rand::thread_rng().r#gen::<f64>())),
        _ => {}
    }

    let x = match args.first() {
        Some(v) => interp.to_number(*v)?,
        None => f64::NAN,
    };
    let result = match f {
        MathFn::Abs => x.abs(),
        MathFn::Floor => x.floor(),
        MathFn::Ceil => x.ceil(),
        // JS rounds half toward +Infinity, unlike Rust's half-away-from-zero.
        MathFn::Round => {
            if x.is_finite() {
                (x + 0.5).floor()
            } else {
                x
            }
        }
        MathFn::Trunc => x.trunc(),
        MathFn::Sign => {
            if x.is_nan() || x == 0.0 {
                x
            } else if x > 0.0 {
                1.0
            } else {
                -1.0
            }
        }
        MathFn::Sqrt => x.sqrt(),
        MathFn::Cbrt => x.cbrt(),
        MathFn::Pow => {
            let y = match args.get(1) {
                Some(v) => interp.to_number(*v)?,
                None => f64::NAN,
            };
            x.powf(y)
        }
        MathFn::Exp => x.exp(),
        MathFn::Expm1 => x.exp_m1(),
        MathFn::Log => x.ln(),
        MathFn::Log2 => x.log2(),
        MathFn::Log10 => x.log10(),
        MathFn::Log1p => x.ln_1p(),
        MathFn::Sin => x.sin(),
        MathFn::Cos => x.cos(),
        MathFn::Tan => x.tan(),
        MathFn::Asin => x.asin(),
        MathFn::Acos => x.acos(),
        MathFn::Atan => x.atan(),
        MathFn::Atan2 => {
            let y = match args.get(1) {
                Some(v) => interp.to_number(*v)?,
                None => f64::NAN,
            };
            x.atan2(y)
        }
        MathFn::Sinh => x.sinh(),
        MathFn::Cosh => x.cosh(),
        MathFn::Tanh => x.tanh(),
        MathFn::Asinh => x.asinh(),
        MathFn::Acosh => x.acosh(),
        MathFn::Atanh => x.atanh(),
        MathFn::Fround => f64::from(x as f32),
        MathFn::Imul => {
            let y = match args.get(1) {
                Some(v) => interp.to_number(*v)?,
                None => 0.0,
            };
            let a = crate::types::buffer::to_int32(x);
            let b = crate::types::buffer::to_int32(y);
            f64::from(a.wrapping_mul(b))
        }
        MathFn::Clz32 => f64::from(crate::types::buffer::to_uint32(x).leading_zeros()),
        MathFn::Min | MathFn::Max | MathFn::Hypot | MathFn::Random => unreachable!("handled above"),
    };
    Ok(Value::Number(result))
}

pub(crate) fn install(interp: &mut Interp) {
    let math = install_namespace(interp, "Math");
    let constants: &[(&str, f64)] = &[
        ("PI", std::f64::consts::PI),
        ("E", std::f64::consts::E),
        ("LN2", std::f64::consts::LN_2),
        ("LN10", std::f64::consts::LN_10),
        ("LOG2E", std::f64::consts::LOG2_E),
        ("LOG10E", std::f64::consts::LOG10_E),
        ("SQRT2", std::f64::consts::SQRT_2),
        ("SQRT1_2", std::f64::consts::FRAC_1_SQRT_2),
    ];
    for (name, value) in constants {
        let key = PropKey::Str(interp.interns.intern(name));
        interp.heap.object_mut(math).define(key, Property::constant(Value::Number(*value)));
    }
    let fns: &[(&str, MathFn, usize)] = &[
        ("abs", MathFn::Abs, 1),
        ("floor", MathFn::Floor, 1),
        ("ceil", MathFn::Ceil, 1),
        ("round", MathFn::Round, 1),
        ("trunc", MathFn::Trunc, 1),
        ("sign", MathFn::Sign, 1),
        ("sqrt", MathFn::Sqrt, 1),
        ("cbrt", MathFn::Cbrt, 1),
        ("pow", MathFn::Pow, 2),
        ("exp", MathFn::Exp, 1),
        ("expm1", MathFn::Expm1, 1),
        ("log", MathFn::Log, 1),
        ("log2", MathFn::Log2, 1),
        ("log10", MathFn::Log10, 1),
        ("log1p", MathFn::Log1p, 1),
        ("sin", MathFn::Sin, 1),
        ("cos", MathFn::Cos, 1),
        ("tan", MathFn::Tan, 1),
        ("asin", MathFn::Asin, 1),
        ("acos", MathFn::Acos, 1),
        ("atan", MathFn::Atan, 1),
        ("atan2", MathFn::Atan2, 2),
        ("sinh", MathFn::Sinh, 1),
        ("cosh", MathFn::Cosh, 1),
        ("tanh", MathFn::Tanh, 1),
        ("asinh", MathFn::Asinh, 1),
        ("acosh", MathFn::Acosh, 1),
        ("atanh", MathFn::Atanh, 1),
        ("min", MathFn::Min, 2),
        ("max", MathFn::Max, 2),
        ("random", MathFn::Random, 0),
        ("hypot", MathFn::Hypot, 2),
        ("fround", MathFn::Fround, 1),
        ("imul", MathFn::Imul, 2),
        ("clz32", MathFn::Clz32, 1),
    ];
    for (name, f, length) in fns {
        define_method(interp, math, name, Builtin::Math(*f), *length);
    }
}
