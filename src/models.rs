//! Decoded protocol data delivered to the embedder.
//!
//! Everything here is hand-decoded from [`JsonValue`] trees with permissive
//! defaults: real-world servers differ widely in which optional fields they
//! send, so absent members become zero/false/empty instead of aborting the
//! parse. Human-readable text (messages, names) is unescaped at this
//! boundary, since the parser stores wire text verbatim by contract.

use crate::json::{unescape_text, JsonValue};

/// Lifecycle state of a server connection.
///
/// `Connecting` covers the window between process spawn and the initialize
/// response; there is no errored state, as spawn failure is reported
/// synchronously at connect time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    NotConnected,
    Connecting,
    Connected,
}

impl ConnectionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionStatus::NotConnected => "not connected",
            ConnectionStatus::Connecting => "connecting",
            ConnectionStatus::Connected => "connected",
        }
    }
}

/// Name and version a server reports in its initialize response.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ServerInfo {
    pub name: String,
    pub version: String,
}

impl ServerInfo {
    pub(crate) fn from_json(value: &JsonValue) -> ServerInfo {
        ServerInfo {
            name: value
                .get("name")
                .and_then(JsonValue::as_str)
                .map(unescape_text)
                .unwrap_or_default(),
            version: value
                .get("version")
                .and_then(JsonValue::as_str)
                .map(unescape_text)
                .unwrap_or_default(),
        }
    }
}

/// Zero-based line/character position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Position {
    pub line: u32,
    pub character: u32,
}

impl Position {
    pub(crate) fn from_json(value: &JsonValue) -> Position {
        Position {
            line: value.get("line").and_then(JsonValue::as_i64).unwrap_or(0) as u32,
            character: value
                .get("character")
                .and_then(JsonValue::as_i64)
                .unwrap_or(0) as u32,
        }
    }
}

/// Half-open text range between two positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Range {
    pub start: Position,
    pub end: Position,
}

impl Range {
    pub(crate) fn from_json(value: &JsonValue) -> Range {
        Range {
            start: value
                .get("start")
                .map(Position::from_json)
                .unwrap_or_default(),
            end: value.get("end").map(Position::from_json).unwrap_or_default(),
        }
    }
}

/// Diagnostic severity levels (LSP spec).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticSeverity {
    Error = 1,
    Warning = 2,
    Information = 3,
    Hint = 4,
}

impl DiagnosticSeverity {
    pub fn from_i64(value: i64) -> Self {
        match value {
            1 => DiagnosticSeverity::Error,
            2 => DiagnosticSeverity::Warning,
            3 => DiagnosticSeverity::Information,
            4 => DiagnosticSeverity::Hint,
            _ => DiagnosticSeverity::Error,
        }
    }
}

/// One diagnostic from a `textDocument/publishDiagnostics` push.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub range: Range,
    pub message: String,
    pub severity: Option<DiagnosticSeverity>,
    pub source: Option<String>,
    pub code: Option<String>,
    /// Raw diagnostic tag values (1 = unnecessary, 2 = deprecated).
    pub tags: Vec<i64>,
}

impl Diagnostic {
    pub(crate) fn from_json(value: &JsonValue) -> Diagnostic {
        Diagnostic {
            range: value.get("range").map(Range::from_json).unwrap_or_default(),
            message: value
                .get("message")
                .and_then(JsonValue::as_str)
                .map(unescape_text)
                .unwrap_or_default(),
            severity: value
                .get("severity")
                .and_then(JsonValue::as_i64)
                .map(DiagnosticSeverity::from_i64),
            source: value
                .get("source")
                .and_then(JsonValue::as_str)
                .map(unescape_text),
            // Codes come over the wire as either strings or integers.
            code: value.get("code").and_then(|c| match c {
                JsonValue::Int(n) => Some(n.to_string()),
                JsonValue::Str(s) => Some(unescape_text(s)),
                _ => None,
            }),
            tags: value
                .get("tags")
                .map(|tags| {
                    tags.elements()
                        .iter()
                        .filter_map(JsonValue::as_i64)
                        .collect()
                })
                .unwrap_or_default(),
        }
    }
}

/// A node in the `textDocument/documentSymbol` result tree.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentSymbol {
    pub name: String,
    pub detail: Option<String>,
    /// Raw symbol-kind wire value (1–26); see
    /// [`symbol_kind_name`](crate::capabilities::symbol_kind_name).
    pub kind: i64,
    pub range: Range,
    pub selection_range: Range,
    pub children: Vec<DocumentSymbol>,
}

impl DocumentSymbol {
    /// Decode one symbol node, recursing into `children`.
    ///
    /// Also accepts the flat `SymbolInformation` shape (a `location` member
    /// instead of `range`/`selectionRange`) that older servers send; those
    /// nodes have no children.
    pub(crate) fn from_json(value: &JsonValue) -> DocumentSymbol {
        let (range, selection_range) = if let Some(location) = value.get("location") {
            let range = location
                .get("range")
                .map(Range::from_json)
                .unwrap_or_default();
            (range, range)
        } else {
            (
                value.get("range").map(Range::from_json).unwrap_or_default(),
                value
                    .get("selectionRange")
                    .map(Range::from_json)
                    .unwrap_or_default(),
            )
        };
        DocumentSymbol {
            name: value
                .get("name")
                .and_then(JsonValue::as_str)
                .map(unescape_text)
                .unwrap_or_default(),
            detail: value
                .get("detail")
                .and_then(JsonValue::as_str)
                .map(unescape_text),
            kind: value.get("kind").and_then(JsonValue::as_i64).unwrap_or(0),
            range,
            selection_range,
            children: value
                .get("children")
                .map(|c| c.elements().iter().map(DocumentSymbol::from_json).collect())
                .unwrap_or_default(),
        }
    }
}

/// Verbosity values accepted by `$/setTrace`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceLevel {
    Off,
    Messages,
    Verbose,
}

impl TraceLevel {
    /// Canonical wire spelling.
    pub fn as_wire_str(&self) -> &'static str {
        match self {
            TraceLevel::Off => "off",
            TraceLevel::Messages => "messages",
            TraceLevel::Verbose => "verbose",
        }
    }
}

/// A decoded event queued for the embedder.
///
/// Distinct from a JSON-RPC notification *message*: both solicited results
/// (document symbols) and unsolicited pushes (diagnostics) end up here.
#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    DocumentSymbols {
        uri: String,
        symbols: Vec<DocumentSymbol>,
    },
    PublishDiagnostics {
        uri: String,
        diagnostics: Vec<Diagnostic>,
    },
}

impl Notification {
    /// The document this event concerns.
    pub fn uri(&self) -> &str {
        match self {
            Notification::DocumentSymbols { uri, .. } => uri,
            Notification::PublishDiagnostics { uri, .. } => uri,
        }
    }
}

/// Queue slot for a [`Notification`].
///
/// `polled` flips when the embedder consumes the entry; the slot itself is
/// purged only on the *next* pump cycle, never at poll time, so a consumer
/// holding the just-polled value is never surprised mid-read.
#[derive(Debug)]
pub(crate) struct QueuedNotification {
    pub payload: Notification,
    pub polled: bool,
}
