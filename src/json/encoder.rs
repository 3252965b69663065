//! Structural serializer for [`JsonValue`] trees.
//!
//! Emits compact JSON (no whitespace). String payloads go out verbatim
//! between quotes, and no escaping happens here. Anything that put raw text
//! into the tree was responsible for pre-escaping it with
//! [`escape_text`](super::escape_text).

use std::fmt::Write;

use super::value::JsonValue;

/// Serialize a tree to compact JSON text.
pub fn encode(value: &JsonValue) -> String {
    let mut out = String::new();
    write_value(value, &mut out);
    out
}

fn write_value(value: &JsonValue, out: &mut String) {
    match value {
        JsonValue::Null => out.push_str("null"),
        JsonValue::Bool(true) => out.push_str("true"),
        JsonValue::Bool(false) => out.push_str("false"),
        JsonValue::Int(n) => {
            let _ = write!(out, "{}", n);
        }
        JsonValue::Float(f) => write_float(*f, out),
        JsonValue::Str(s) => {
            out.push('"');
            out.push_str(s);
            out.push('"');
        }
        JsonValue::Object(members) => {
            out.push('{');
            for (i, (key, value)) in members.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push('"');
                out.push_str(key);
                out.push_str("\":");
                write_value(value, out);
            }
            out.push('}');
        }
        JsonValue::Array(elements) => {
            out.push('[');
            for (i, element) in elements.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_value(element, out);
            }
            out.push(']');
        }
    }
}

fn write_float(f: f64, out: &mut String) {
    if !f.is_finite() {
        // JSON has no spelling for NaN or infinities.
        out.push_str("null");
        return;
    }
    let start = out.len();
    let _ = write!(out, "{}", f);
    // Keep a decimal point so a re-parse stays a Float.
    if !out[start..].contains('.') && !out[start..].contains('e') {
        out.push_str(".0");
    }
}
