//! JSON-RPC 2.0 envelope construction and response dispatch.
//!
//! # Message shapes
//!
//! ```text
//! notification  {"jsonrpc":"2.0","method":M,"params":P?}
//! request       {"jsonrpc":"2.0","id":N,"method":M,"params":P?}
//! response      {"jsonrpc":"2.0","id":N,"result":R} | {"jsonrpc":"2.0","id":N,"error":E}
//! ```
//!
//! Outgoing requests carry ids from the per-server counter and are recorded
//! in the server's pending list. An incoming message with a `method` member
//! is a server push (or server-to-client request) and bypasses correlation;
//! one with only an `id` is a response and is matched against the pending
//! list to recover the originating method, which decides the post-processing
//! side effects below.

use tracing::{debug, info, warn};

use crate::capabilities::parse_server_capabilities;
use crate::json::{unescape_text, JsonValue};
use crate::models::{ConnectionStatus, Diagnostic, DocumentSymbol, Notification, ServerInfo};
use crate::server::{PendingRequest, ServerConnection};

/// Wire spellings of every method the engine speaks.
pub mod methods {
    pub const INITIALIZE: &str = "initialize";
    pub const INITIALIZED: &str = "initialized";
    pub const SHUTDOWN: &str = "shutdown";
    pub const EXIT: &str = "exit";
    pub const DID_OPEN: &str = "textDocument/didOpen";
    pub const DID_CLOSE: &str = "textDocument/didClose";
    pub const DOCUMENT_SYMBOL: &str = "textDocument/documentSymbol";
    pub const PUBLISH_DIAGNOSTICS: &str = "textDocument/publishDiagnostics";
    pub const SET_TRACE: &str = "$/setTrace";
}

/// Build a notification envelope (no id).
pub fn notification(method: &'static str, params: Option<JsonValue>) -> JsonValue {
    let mut envelope = JsonValue::object();
    envelope.set("jsonrpc", JsonValue::string("2.0"));
    envelope.set("method", JsonValue::string(method));
    if let Some(params) = params {
        envelope.set("params", params);
    }
    envelope
}

/// Build a request envelope carrying `id`.
pub fn request(id: i64, method: &'static str, params: Option<JsonValue>) -> JsonValue {
    let mut envelope = JsonValue::object();
    envelope.set("jsonrpc", JsonValue::string("2.0"));
    envelope.set("id", JsonValue::Int(id));
    envelope.set("method", JsonValue::string(method));
    if let Some(params) = params {
        envelope.set("params", params);
    }
    envelope
}

/// What the registry should do with the server after a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Dispatch {
    Keep,
    /// The shutdown/exit handshake completed; drop the server.
    Remove,
}

/// Route one decoded wire message through the engine.
pub(crate) fn dispatch_message(server: &mut ServerConnection, message: &JsonValue) -> Dispatch {
    // A method member marks a server-originated message; these never
    // correlate against our pending ids (a server request's id lives in the
    // server's own number space).
    if let Some(method) = message.get("method").and_then(JsonValue::as_str) {
        let method = method.to_string();
        handle_server_push(server, &method, message.get("params"));
        return Dispatch::Keep;
    }

    let Some(id) = message.get("id").and_then(JsonValue::as_i64) else {
        warn!("server {}: message with neither method nor id", server.id);
        return Dispatch::Keep;
    };
    let Some(pending) = server.take_pending(id) else {
        debug!("server {}: response for unknown request id {}", server.id, id);
        return Dispatch::Keep;
    };

    if let Some(error) = message.get("error") {
        let code = error.get("code").and_then(JsonValue::as_i64).unwrap_or(-1);
        let text = error
            .get("message")
            .and_then(JsonValue::as_str)
            .map(unescape_text)
            .unwrap_or_default();
        warn!(
            "server {}: error response to {} (code {}): {}",
            server.id, pending.method, code, text
        );
        return Dispatch::Keep;
    }

    let result = message.get("result").unwrap_or(&JsonValue::Null);
    match pending.method.as_str() {
        methods::INITIALIZE => handle_initialize(server, result),
        methods::SHUTDOWN => return handle_shutdown(server),
        methods::DOCUMENT_SYMBOL => handle_document_symbol(server, &pending, result),
        // Extension point: other methods just clear their pending entry.
        other => debug!("server {}: response to {} dropped", server.id, other),
    }
    Dispatch::Keep
}

/// Unsolicited server message: parse what we understand, log the rest.
fn handle_server_push(server: &mut ServerConnection, method: &str, params: Option<&JsonValue>) {
    match method {
        methods::PUBLISH_DIAGNOSTICS => {
            let Some(params) = params else {
                warn!("server {}: publishDiagnostics without params", server.id);
                return;
            };
            let uri = params
                .get("uri")
                .and_then(JsonValue::as_str)
                .map(unescape_text)
                .unwrap_or_default();
            let diagnostics: Vec<Diagnostic> = params
                .get("diagnostics")
                .map(|d| d.elements().iter().map(Diagnostic::from_json).collect())
                .unwrap_or_default();
            debug!(
                "server {}: {} diagnostics for {}",
                server.id,
                diagnostics.len(),
                uri
            );
            server.enqueue_notification(Notification::PublishDiagnostics { uri, diagnostics });
        }
        other => {
            debug!("server {}: unhandled server method {}", server.id, other);
        }
    }
}

/// Initialize response: absorb the negotiation result, go Connected, and
/// confirm with the `initialized` notification, exactly once.
fn handle_initialize(server: &mut ServerConnection, result: &JsonValue) {
    if server.status != ConnectionStatus::Connecting {
        debug!(
            "server {}: initialize response in state {}, ignoring",
            server.id,
            server.status.as_str()
        );
        return;
    }
    if let Some(capabilities) = result.get("capabilities") {
        server.capabilities = parse_server_capabilities(capabilities);
    }
    if let Some(info) = result.get("serverInfo") {
        server.server_info = ServerInfo::from_json(info);
    }
    server.status = ConnectionStatus::Connected;
    info!(
        "server {} connected: {} {}",
        server.id, server.server_info.name, server.server_info.version
    );
    if let Err(e) = server.send_notification(methods::INITIALIZED, Some(JsonValue::object())) {
        warn!("server {}: failed to send initialized: {}", server.id, e);
    }
}

/// Shutdown response: acknowledge with `exit`, tear the transport down, and
/// tell the registry to forget the server.
fn handle_shutdown(server: &mut ServerConnection) -> Dispatch {
    if let Err(e) = server.send_notification(methods::EXIT, None) {
        debug!("server {}: failed to send exit: {}", server.id, e);
    }
    server.transport.close();
    info!("server {}: shutdown handshake complete", server.id);
    Dispatch::Remove
}

/// Document-symbol response: the result carries no document reference, so
/// the URI is recovered from the original request's params.
fn handle_document_symbol(
    server: &mut ServerConnection,
    pending: &PendingRequest,
    result: &JsonValue,
) {
    let uri = pending
        .params
        .get("textDocument")
        .and_then(|t| t.get("uri"))
        .and_then(JsonValue::as_str)
        .map(unescape_text)
        .unwrap_or_default();
    let symbols: Vec<DocumentSymbol> = result
        .elements()
        .iter()
        .map(DocumentSymbol::from_json)
        .collect();
    debug!(
        "server {}: {} top-level symbols for {}",
        server.id,
        symbols.len(),
        uri
    );
    server.enqueue_notification(Notification::DocumentSymbols { uri, symbols });
}
