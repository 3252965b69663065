//! Self-contained JSON document model used on the LSP wire.
//!
//! This module deliberately does not pull in a serialization framework: the
//! wire handling needs an ordered, dynamically-typed document tree that can
//! be assembled field by field while building JSON-RPC envelopes, and picked
//! apart permissively when decoding whatever a language server sends back.
//!
//! # Contract
//!
//! - `parse` never fails: malformed input decodes to [`JsonValue::Null`] and
//!   callers check the value's kind before use. There is no error channel.
//! - `encode` is purely structural: string payloads are emitted verbatim
//!   between quotes, with **no escaping applied**. Call sites inserting raw
//!   text into the tree must pre-escape it with [`escape_text`].
//! - String unescaping is likewise explicit: the parser stores literal
//!   contents exactly as they appeared on the wire, and consumers that need
//!   the raw text call [`unescape_text`] themselves.
//!
//! The asymmetry (lazy unescape, no auto-escape) is intentional; parts of
//! the engine insert pre-escaped strings and re-emit them untouched.

mod encoder;
mod parser;
mod value;

pub use encoder::encode;
pub use parser::parse;
pub use value::{escape_text, unescape_text, JsonKind, JsonValue};
