//! Runtime type coercion
//!
//! Converts an arbitrary [`Value`] into the canonical representation of a
//! target [`Type`], or fails. This is the single conversion routine used by
//! property descriptors, typed collections and method channels.
//!
//! # Algorithm
//!
//! 1. Absent values (undefined/null) are rejected; no defaulting happens here
//! 2. Values that already are instances of the target are returned unchanged
//! 3. Built-in kinds apply their dedicated rule (stringify, parse, ...)
//! 4. Declared kinds construct a new value from the input, which recursively
//!    coerces nested members

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};

use crate::error::{MooseError, MooseResult};
use crate::ty::Type;
use crate::value::Value;

/// Naive formats accepted for dates, interpreted as UTC
const NAIVE_DATE_TIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

/// Coerce `value` to `target`
///
/// # Errors
///
/// - `UndefinedValue` if the value is undefined or null
/// - `InvalidNumber` / `InvalidDate` if numeric or temporal parsing fails
/// - `CannotConvert` for raw list targets and unconvertible inputs
/// - any error raised while constructing a declared type from the value
pub fn coerce(target: &Type, value: Value) -> MooseResult<Value> {
    if value.is_absent() {
        return Err(MooseError::UndefinedValue);
    }

    if target.contains(&value) {
        return Ok(value);
    }

    match target {
        Type::Any => Ok(value),

        Type::String => Ok(Value::String(value.to_string())),

        Type::Buffer => Ok(Value::Buffer(value.to_string().into_bytes())),

        Type::Boolean => Ok(Value::Bool(value.is_truthy())),

        Type::Number => coerce_number(value),

        Type::Date => coerce_date(value),

        Type::List | Type::Function => Err(MooseError::CannotConvert {
            from: value.type_name(),
            to: target.name(),
        }),

        Type::Array(class) => class.construct(value).map(Value::Array),

        Type::Map(class) => class.construct(value).map(Value::Map),

        Type::Class(class) => class.construct(value).map(Value::Object),

        Type::Interface(interface) => Err(MooseError::InterfaceDirectlyInvoked {
            interface: interface.name().to_string(),
        }),

        Type::Enum(e) => e.construct(value),
    }
}

fn coerce_number(value: Value) -> MooseResult<Value> {
    let parsed = match &value {
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::String(s) => parse_number(s),
        Value::Date(date) => Some(date.timestamp_millis() as f64),
        _ => None,
    };

    match parsed {
        Some(n) if !n.is_nan() => Ok(Value::Number(n)),
        _ => Err(MooseError::InvalidNumber {
            from: value.type_name(),
        }),
    }
}

/// Numeric text: surrounding whitespace ignored, empty text is zero
fn parse_number(text: &str) -> Option<f64> {
    let text = text.trim();
    if text.is_empty() {
        return Some(0.0);
    }
    match text {
        "Infinity" | "+Infinity" => return Some(f64::INFINITY),
        "-Infinity" => return Some(f64::NEG_INFINITY),
        _ => {}
    }
    if let Some(radix) = radix_prefix(text) {
        return parse_radix(&text[2..], radix);
    }
    // Rust accepts "inf"/"nan" spellings that are not numeric text here
    if text.chars().any(|c| c.is_ascii_alphabetic() && c != 'e' && c != 'E') {
        return None;
    }
    text.parse::<f64>().ok()
}

fn radix_prefix(text: &str) -> Option<u32> {
    match text.get(..2)? {
        "0x" | "0X" => Some(16),
        "0o" | "0O" => Some(8),
        "0b" | "0B" => Some(2),
        _ => None,
    }
}

// Unsigned digits only; a sign after the prefix is not numeric text
fn parse_radix(digits: &str, radix: u32) -> Option<f64> {
    if digits.is_empty() || !digits.chars().all(|c| c.is_digit(radix)) {
        return None;
    }
    u64::from_str_radix(digits, radix).ok().map(|n| n as f64)
}

fn coerce_date(value: Value) -> MooseResult<Value> {
    let parsed = match &value {
        Value::String(s) => parse_date(s),
        Value::Number(n) if n.is_finite() => Utc.timestamp_millis_opt(*n as i64).single(),
        _ => None,
    };

    parsed.map(Value::Date).ok_or_else(|| MooseError::InvalidDate {
        from: value.type_name(),
    })
}

fn parse_date(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();

    if let Ok(date) = DateTime::parse_from_rfc3339(text) {
        return Some(date.with_timezone(&Utc));
    }
    if let Ok(date) = DateTime::parse_from_rfc2822(text) {
        return Some(date.with_timezone(&Utc));
    }
    for format in NAIVE_DATE_TIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
}
