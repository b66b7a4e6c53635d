//! The `Date` builtin, backed by `chrono`.
//!
//! Internally a date is its millisecond timestamp (NaN when invalid); all
//! accessors are UTC-based, which sidesteps host timezone lookups and keeps
//! runs deterministic.

use chrono::{DateTime, Datelike, TimeZone, Timelike, Utc};

use crate::{
    builtins::{Builtin, CtorFn, define_method, install_ctor},
    error::RunResult,
    eval::Interp,
    heap::HeapData,
    types::{ClassTag, JsObject, ObjectPayload},
    value::Value,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DateFn {
    Now,
    Parse,
    GetTime,
    GetFullYear,
    GetMonth,
    GetDate,
    GetDay,
    GetHours,
    GetMinutes,
    GetSeconds,
    GetMilliseconds,
    SetTime,
    ToIsoString,
    ToString,
    ValueOf,
    ToJson,
}

fn this_date_ms(interp: &mut Interp, this: Value) -> RunResult<f64> {
    if let Value::Ref(id) = this {
        if let HeapData::Object(obj) = interp.heap.get(id) {
            if let ObjectPayload::Date(ms) = obj.payload {
                return Ok(ms);
            }
        }
    }
    Err(interp.throw_type_error("method requires a Date receiver"))
}

fn datetime_of(ms: f64) -> Option<DateTime<Utc>> {
    if !ms.is_finite() {
        return None;
    }
    Utc.timestamp_millis_opt(ms as i64).single()
}

/// Formats a timestamp as an ISO 8601 string, or None for invalid dates.
pub(crate) fn to_iso_string(ms: f64) -> Option<String> {
    let dt = datetime_of(ms)?;
    Some(format!(
        "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}.{:03}Z",
        dt.year(),
        dt.month(),
        dt.day(),
        dt.hour(),
        dt.minute(),
        dt.second(),
        dt.timestamp_subsec_millis()
    ))
}

fn parse_date(text: &str) -> f64 {
    let t = text.trim();
    // RFC 3339 / ISO first, then a couple of laxer shapes.
    if let Ok(dt) = DateTime::parse_from_rfc3339(t) {
        return dt.timestamp_millis() as f64;
    }
    if let Ok(date) = chrono::NaiveDate::parse_from_str(t, "%Y-%m-%d") {
        let dt = date.and_hms_opt(0, 0, 0).expect("midnight is valid");
        return Utc.from_utc_datetime(&dt).timestamp_millis() as f64;
    }
    if let Ok(dt) = chrono::NaiveDateTime::parse_from_str(t, "%Y-%m-%dT%H:%M:%S") {
        return Utc.from_utc_datetime(&dt).timestamp_millis() as f64;
    }
    if let Ok(dt) = chrono::NaiveDateTime::parse_from_str(t, "%Y-%m-%d %H:%M:%S") {
        return Utc.from_utc_datetime(&dt).timestamp_millis() as f64;
    }
    f64::NAN
}

fn new_date_value(interp: &mut Interp, ms: f64) -> Value {
    let proto = interp.realm.date_proto;
    let obj = JsObject::with_payload(ClassTag::Date, Some(proto), ObjectPayload::Date(ms));
    Value::Ref(interp.heap.alloc_object(obj))
}

pub(crate) fn construct_date(interp: &mut Interp, args: &[Value], is_new: bool) -> RunResult<Value> {
    let now_ms = Utc::now().timestamp_millis() as f64;
    if !is_new {
        // `Date()` without new returns the string form.
        let s = to_iso_string(now_ms).unwrap_or_else(|| "Invalid Date".to_owned());
        return Ok(interp.alloc_string(s));
    }
    let ms = match args.len() {
        0 => now_ms,
        1 => {
            let arg = args[0];
            if let Some(text) = interp.string_content(arg) {
                parse_date(&text)
            } else {
                interp.to_number(arg)?
            }
        }
        _ => {
            let year = interp.to_number(args[0])? as i32;
            let month = interp.to_number(args[1])? as u32;
            let day = match args.get(2) {
                Some(v) => interp.to_number(*v)? as u32,
                None => 1,
            };
            let hour = match args.get(3) {
                Some(v) => interp.to_number(*v)? as u32,
                None => 0,
            };
            let minute = match args.get(4) {
                Some(v) => interp.to_number(*v)? as u32,
                None => 0,
            };
            let second = match args.get(5) {
                Some(v) => interp.to_number(*v)? as u32,
                None => 0,
            };
            match Utc.with_ymd_and_hms(year, month + 1, day, hour, minute, second).single() {
                Some(dt) => dt.timestamp_millis() as f64,
                None => f64::NAN,
            }
        }
    };
    Ok(new_date_value(interp, ms))
}

pub(crate) fn call(interp: &mut Interp, f: DateFn, this: Value, args: &[Value]) -> RunResult<Value> {
    match f {
        DateFn::Now => Ok(Value::Number(Utc::now().timestamp_millis() as f64)),
        DateFn::Parse => {
            let text = match args.first() {
                Some(v) => interp.to_string_value(*v)?,
                None => return Ok(Value::Number(f64::NAN)),
            };
            Ok(Value::Number(parse_date(&text)))
        }
        DateFn::GetTime | DateFn::ValueOf => Ok(Value::Number(this_date_ms(interp, this)?)),
        DateFn::SetTime => {
            let ms = match args.first() {
                Some(v) => interp.to_number(*v)?,
                None => f64::NAN,
            };
            let Value::Ref(id) = this else {
                return Err(interp.throw_type_error("method requires a Date receiver"));
            };
            if let HeapData::Object(obj) = interp.heap.get_mut(id) {
                if let ObjectPayload::Date(slot) = &mut obj.payload {
                    *slot = ms;
                    return Ok(Value::Number(ms));
                }
            }
            Err(interp.throw_type_error("method requires a Date receiver"))
        }
        DateFn::GetFullYear
        | DateFn::GetMonth
        | DateFn::GetDate
        | DateFn::GetDay
        | DateFn::GetHours
        | DateFn::GetMinutes
        | DateFn::GetSeconds
        | DateFn::GetMilliseconds => {
            let ms = this_date_ms(interp, this)?;
            let Some(dt) = datetime_of(ms) else {
                return Ok(Value::Number(f64::NAN));
            };
            let n = match f {
                DateFn::GetFullYear => f64::from(dt.year()),
                DateFn::GetMonth => f64::from(dt.month0()),
                DateFn::GetDate => f64::from(dt.day()),
                DateFn::GetDay => f64::from(dt.weekday().num_days_from_sunday()),
                DateFn::GetHours => f64::from(dt.hour()),
                DateFn::GetMinutes => f64::from(dt.minute()),
                DateFn::GetSeconds => f64::from(dt.second()),
                DateFn::GetMilliseconds => f64::from(dt.timestamp_subsec_millis()),
                _ => unreachable!(),
            };
            Ok(Value::Number(n))
        }
        DateFn::ToIsoString => {
            let ms = this_date_ms(interp, this)?;
            match to_iso_string(ms) {
                Some(s) => Ok(interp.alloc_string(s)),
                None => Err(interp.throw_range_error("invalid time value")),
            }
        }
        DateFn::ToString | DateFn::ToJson => {
            let ms = this_date_ms(interp, this)?;
            let s = to_iso_string(ms).unwrap_or_else(|| "Invalid Date".to_owned());
            Ok(interp.alloc_string(s))
        }
    }
}

pub(crate) fn install(interp: &mut Interp) {
    let proto = interp.realm.date_proto;
    define_method(interp, proto, "getTime", Builtin::DateB(DateFn::GetTime), 0);
    define_method(interp, proto, "getFullYear", Builtin::DateB(DateFn::GetFullYear), 0);
    define_method(interp, proto, "getMonth", Builtin::DateB(DateFn::GetMonth), 0);
    define_method(interp, proto, "getDate", Builtin::DateB(DateFn::GetDate), 0);
    define_method(interp, proto, "getDay", Builtin::DateB(DateFn::GetDay), 0);
    define_method(interp, proto, "getHours", Builtin::DateB(DateFn::GetHours), 0);
    define_method(interp, proto, "getMinutes", Builtin::DateB(DateFn::GetMinutes), 0);
    define_method(interp, proto, "getSeconds", Builtin::DateB(DateFn::GetSeconds), 0);
    define_method(interp, proto, "getMilliseconds", Builtin::DateB(DateFn::GetMilliseconds), 0);
    define_method(interp, proto, "setTime", Builtin::DateB(DateFn::SetTime), 1);
    define_method(interp, proto, "toISOString", Builtin::DateB(DateFn::ToIsoString), 0);
    define_method(interp, proto, "toString", Builtin::DateB(DateFn::ToString), 0);
    define_method(interp, proto, "toJSON", Builtin::DateB(DateFn::ToJson), 1);
    define_method(interp, proto, "valueOf", Builtin::DateB(DateFn::ValueOf), 0);
    let ctor = install_ctor(interp, "Date", CtorFn::Date, proto, 7);
    define_method(interp, ctor, "now", Builtin::DateB(DateFn::Now), 0);
    define_method(interp, ctor, "parse", Builtin::DateB(DateFn::Parse), 1);
}
