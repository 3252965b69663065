//! Tagged-variant JSON document tree.
//!
//! Object members keep insertion order and unique keys; arrays keep
//! insertion order and allow heterogeneous elements. Every node exclusively
//! owns its children, so dropping a tree reclaims it recursively.

use std::borrow::Cow;

/// Discriminant of a [`JsonValue`], for callers that need to check what the
/// permissive parser produced before trusting it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonKind {
    Null,
    Bool,
    Int,
    Float,
    Str,
    Object,
    Array,
}

/// A dynamically-typed JSON document node.
///
/// String payloads are a `Cow<'static, str>` so that the large static wire
/// vocabulary (method names, capability tokens) can sit in the tree without
/// allocation, while decoded wire text is owned. Moving an owned string out
/// of the tree is an explicit ownership transfer via [`JsonValue::into_string`].
#[derive(Debug, Clone, PartialEq)]
pub enum JsonValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(Cow<'static, str>),
    Object(Vec<(Cow<'static, str>, JsonValue)>),
    Array(Vec<JsonValue>),
}

impl JsonValue {
    /// Build a string node from either a `&'static str` or an owned `String`.
    pub fn string(s: impl Into<Cow<'static, str>>) -> JsonValue {
        JsonValue::Str(s.into())
    }

    /// Empty object node.
    pub fn object() -> JsonValue {
        JsonValue::Object(Vec::new())
    }

    /// Empty array node.
    pub fn array() -> JsonValue {
        JsonValue::Array(Vec::new())
    }

    /// The node's discriminant.
    pub fn kind(&self) -> JsonKind {
        match self {
            JsonValue::Null => JsonKind::Null,
            JsonValue::Bool(_) => JsonKind::Bool,
            JsonValue::Int(_) => JsonKind::Int,
            JsonValue::Float(_) => JsonKind::Float,
            JsonValue::Str(_) => JsonKind::Str,
            JsonValue::Object(_) => JsonKind::Object,
            JsonValue::Array(_) => JsonKind::Array,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, JsonValue::Null)
    }

    /// Set `key` on an object. An existing key is replaced in place, keeping
    /// its position; a new key is appended. Returns `self` for chaining while
    /// assembling envelopes.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let mut params = JsonValue::object();
    /// params.set("uri", JsonValue::string(uri));
    /// params.set("version", JsonValue::Int(1));
    /// ```
    pub fn set(&mut self, key: impl Into<Cow<'static, str>>, value: JsonValue) -> &mut JsonValue {
        let key = key.into();
        if let JsonValue::Object(members) = self {
            if let Some(slot) = members.iter_mut().find(|(k, _)| *k == key) {
                slot.1 = value;
            } else {
                members.push((key, value));
            }
        } else {
            debug_assert!(false, "set() on a non-object JsonValue");
        }
        self
    }

    /// Append `value` to an array node.
    pub fn push(&mut self, value: JsonValue) -> &mut JsonValue {
        if let JsonValue::Array(elements) = self {
            elements.push(value);
        } else {
            debug_assert!(false, "push() on a non-array JsonValue");
        }
        self
    }

    /// Look up an object member by key.
    pub fn get(&self, key: &str) -> Option<&JsonValue> {
        match self {
            JsonValue::Object(members) => {
                members.iter().find(|(k, _)| k == key).map(|(_, v)| v)
            }
            _ => None,
        }
    }

    /// Index into an array node.
    pub fn at(&self, index: usize) -> Option<&JsonValue> {
        match self {
            JsonValue::Array(elements) => elements.get(index),
            _ => None,
        }
    }

    /// Member count for objects, element count for arrays, 0 otherwise.
    pub fn len(&self) -> usize {
        match self {
            JsonValue::Object(members) => members.len(),
            JsonValue::Array(elements) => elements.len(),
            _ => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Object members in insertion order; empty for non-objects.
    pub fn members(&self) -> &[(Cow<'static, str>, JsonValue)] {
        match self {
            JsonValue::Object(members) => members,
            _ => &[],
        }
    }

    /// Array elements in order; empty for non-arrays.
    pub fn elements(&self) -> &[JsonValue] {
        match self {
            JsonValue::Array(elements) => elements,
            _ => &[],
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            JsonValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            JsonValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            JsonValue::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Numeric value as f64; integers coerce.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            JsonValue::Int(n) => Some(*n as f64),
            JsonValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Transfer ownership of a string payload out of the tree, consuming the
    /// node. Borrowed (static) payloads are copied; non-string nodes yield
    /// `None`.
    pub fn into_string(self) -> Option<String> {
        match self {
            JsonValue::Str(s) => Some(s.into_owned()),
            _ => None,
        }
    }
}

/// Escape raw text for insertion into a [`JsonValue`] string node.
///
/// Maps `\n \t \r \x08 \x0c " \` to their two-character escape sequences.
/// The forward slash is left alone (escaping it is optional in JSON and the
/// unescape direction still accepts `\/`). This helper is never applied
/// automatically; see the module-level contract.
pub fn escape_text(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            '\u{0008}' => out.push_str("\\b"),
            '\u{000c}' => out.push_str("\\f"),
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            _ => out.push(ch),
        }
    }
    out
}

/// Reverse of [`escape_text`], applied explicitly by consumers of wire text.
///
/// Recognizes `\n \t \r \b \f \" \\ \/`. Unicode escapes (`\uXXXX`) are NOT
/// decoded: the sequence passes through untouched. This is a known gap kept
/// for wire compatibility with the rest of the engine.
pub fn unescape_text(escaped: &str) -> String {
    let mut out = String::with_capacity(escaped.len());
    let mut chars = escaped.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('b') => out.push('\u{0008}'),
            Some('f') => out.push('\u{000c}'),
            Some('"') => out.push('"'),
            Some('\\') => out.push('\\'),
            Some('/') => out.push('/'),
            // Unknown escape (including \uXXXX): keep it verbatim.
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            // Trailing lone backslash.
            None => out.push('\\'),
        }
    }
    out
}
