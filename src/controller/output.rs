//! # Output Coercion
//!
//! Terraform Cloud returns computed values as untyped JSON scalars or structures.
//! Before they are written to a key-value output store they are rendered into one
//! stable string form.
//!
//! `null` values are dropped at the API boundary (`OutputValue::from_json` returns `None`),
//! so coercion never sees them.

use serde_json::Value;

/// Untyped value returned by the Terraform Cloud API
#[derive(Debug, Clone, PartialEq)]
pub enum OutputValue {
    /// `true` / `false`
    Bool(bool),
    /// Every JSON number is carried as a float, as Terraform does
    Number(f64),
    /// Passed through unchanged
    String(String),
    /// Lists, maps and nested structures
    Structured(Value),
}

impl OutputValue {
    /// Tag a JSON value, returning `None` for `null`
    pub fn from_json(value: Value) -> Option<Self> {
        match value {
            Value::Null => None,
            Value::Bool(b) => Some(Self::Bool(b)),
            // Numbers outside the f64 range are kept as structured text
            Value::Number(n) => Some(match n.as_f64() {
                Some(f) => Self::Number(f),
                None => Self::Structured(Value::Number(n)),
            }),
            Value::String(s) => Some(Self::String(s)),
            other @ (Value::Array(_) | Value::Object(_)) => Some(Self::Structured(other)),
        }
    }
}

impl From<bool> for OutputValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<f64> for OutputValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<&str> for OutputValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for OutputValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

/// Render an output value as a string for the output store
///
/// - Booleans become `"true"` / `"false"`
/// - Numbers use the shortest decimal form; an exponent (`1e+06`, `1.5e-07`) appears once
///   the decimal exponent is below -4 or at least 6
/// - Strings are returned unchanged
/// - Structured values become compact JSON with keys sorted at every level. Numbers inside
///   are rendered as floats without a trailing `.0`, and `<`, `>`, `&` are escaped
pub fn format_output(value: &OutputValue) -> String {
    match value {
        OutputValue::Bool(b) => b.to_string(),
        OutputValue::Number(n) => format_number(*n),
        OutputValue::String(s) => s.clone(),
        OutputValue::Structured(v) => {
            let mut out = String::new();
            write_canonical(v, &mut out);
            out
        }
    }
}

fn format_number(n: f64) -> String {
    if n.is_nan() {
        return "NaN".to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 { "+Inf" } else { "-Inf" }.to_string();
    }
    if n == 0.0 {
        return n.to_string();
    }

    match split_scientific(n) {
        Some((mantissa, exponent)) if !(-4..6).contains(&exponent) => {
            let sign = if exponent < 0 { '-' } else { '+' };
            format!("{mantissa}e{sign}{:02}", exponent.abs())
        }
        _ => n.to_string(),
    }
}

/// Number inside a structured value; exponent form below `1e-6` or from `1e21` upwards
fn format_json_number(n: f64) -> String {
    let magnitude = n.abs();
    if magnitude == 0.0 || (1e-6..1e21).contains(&magnitude) {
        return n.to_string();
    }
    match split_scientific(n) {
        Some((mantissa, exponent)) => {
            let sign = if exponent < 0 { "-" } else { "+" };
            format!("{mantissa}e{sign}{}", exponent.abs())
        }
        None => n.to_string(),
    }
}

/// Shortest round-trip mantissa and decimal exponent, e.g. `("1.5", -7)`
fn split_scientific(n: f64) -> Option<(String, i32)> {
    let scientific = format!("{n:e}");
    let (mantissa, exponent) = scientific.split_once('e')?;
    let exponent = exponent.parse::<i32>().ok()?;
    Some((mantissa.to_string(), exponent))
}

/// Compact JSON with sorted object keys
fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (i, key) in keys.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_string(key, out);
                out.push(':');
                write_canonical(&map[key], out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        Value::String(s) => write_string(s, out),
        Value::Number(n) => match n.as_f64() {
            Some(f) => out.push_str(&format_json_number(f)),
            None => out.push_str(&n.to_string()),
        },
        Value::Bool(_) | Value::Null => out.push_str(&value.to_string()),
    }
}

fn write_string(s: &str, out: &mut String) {
    let quoted = Value::String(s.to_string()).to_string();
    for c in quoted.chars() {
        match c {
            '<' => out.push_str("\\u003c"),
            '>' => out.push_str("\\u003e"),
            '&' => out.push_str("\\u0026"),
            '\u{2028}' => out.push_str("\\u2028"),
            '\u{2029}' => out.push_str("\\u2029"),
            other => out.push(other),
        }
    }
}
