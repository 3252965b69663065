//! Context / connection registry: the engine's public surface.
//!
//! [`LspContext`] owns every active server connection, the shared client
//! identity, and the single polling pump. The contract with the embedder is
//! strictly cooperative: nothing runs in the background, and all I/O and
//! state transitions happen inside [`LspContext::process_responses`], which
//! the host event loop calls at its own cadence.
//!
//! One pump cycle = one non-blocking read per server, every complete frame
//! from those reads dispatched, then a purge of the notifications the
//! embedder polled during the *previous* cycle. The purge delay is a
//! deliberate part of the contract: a caller still holding the value it just
//! polled is never invalidated mid-read.

use std::path::Path;

use anyhow::{anyhow, Context as _, Result};
use tracing::{debug, error, info, warn};

use crate::capabilities::{build_client_capabilities, ClientCapabilities, ServerCapabilities};
use crate::fs::{FileProvider, OsFileSystem};
use crate::json::{escape_text, parse, JsonValue};
use crate::models::{ConnectionStatus, Notification, ServerInfo, TraceLevel};
use crate::rpc::{self, methods, Dispatch};
use crate::server::{ServerConnection, ServerId};
use crate::transport::{ChildTransport, Transport, TransportError};
use crate::uri::path_to_file_uri;

/// Connection parameters for [`LspContext::connect`].
#[derive(Debug, Clone)]
pub struct ConnectParams {
    /// Extra command-line arguments for the server process.
    pub args: Vec<String>,
    /// Name of a PATH-like environment variable to search for the
    /// executable; `None` spawns the program path verbatim.
    pub search_path_env: Option<String>,
    /// Workspace root advertised in the initialize request.
    pub root_uri: Option<String>,
    /// Language id reported when documents are opened on this server.
    pub language_id: String,
    /// Initial trace verbosity advertised to the server.
    pub trace: TraceLevel,
}

impl Default for ConnectParams {
    fn default() -> Self {
        ConnectParams {
            args: Vec::new(),
            search_path_env: None,
            root_uri: None,
            language_id: "plaintext".to_string(),
            trace: TraceLevel::Off,
        }
    }
}

/// Registry of live server connections plus the client identity they all
/// share. Create one per embedding editor instance.
pub struct LspContext {
    servers: Vec<ServerConnection>,
    next_server_id: u32,
    client_name: String,
    client_version: String,
    locale: String,
    capabilities: ClientCapabilities,
    file_provider: Box<dyn FileProvider>,
}

impl Default for LspContext {
    fn default() -> Self {
        LspContext::new()
    }
}

impl LspContext {
    pub fn new() -> LspContext {
        LspContext {
            servers: Vec::new(),
            next_server_id: 1,
            client_name: env!("CARGO_PKG_NAME").to_string(),
            client_version: env!("CARGO_PKG_VERSION").to_string(),
            locale: "en".to_string(),
            capabilities: ClientCapabilities::default(),
            file_provider: Box::new(OsFileSystem),
        }
    }

    /// Override the identity reported in `clientInfo` during initialize.
    pub fn set_client_info(&mut self, name: &str, version: &str, locale: &str) {
        self.client_name = name.to_string();
        self.client_version = version.to_string();
        self.locale = locale.to_string();
    }

    /// Narrow or widen the declared client capabilities. Applies to servers
    /// connected after the call.
    pub fn set_capabilities(&mut self, capabilities: ClientCapabilities) {
        self.capabilities = capabilities;
    }

    /// Substitute the file-system collaborator (dependency injection for
    /// embedders and tests).
    pub fn set_file_provider(&mut self, provider: Box<dyn FileProvider>) {
        self.file_provider = provider;
    }

    /// Spawn a language server and start the initialize handshake.
    ///
    /// Returns [`ServerId::INVALID`] when the process cannot be spawned or
    /// the initialize request cannot be written. The failure is synchronous,
    /// never a later status transition. A valid id starts in `Connecting` and
    /// reaches `Connected` once the server's initialize response is pumped.
    pub fn connect(&mut self, program: &str, params: ConnectParams) -> ServerId {
        let transport =
            match ChildTransport::spawn(program, &params.args, params.search_path_env.as_deref()) {
                Ok(transport) => transport,
                Err(e) => {
                    error!("connect failed for {}: {}", program, e);
                    return ServerId::INVALID;
                }
            };
        info!("spawned {} (pid {})", program, transport.pid());
        self.register_server(Box::new(transport), &params)
    }

    /// Shared tail of `connect`: allocate the id, send initialize, enroll.
    fn register_server(
        &mut self,
        transport: Box<dyn Transport>,
        params: &ConnectParams,
    ) -> ServerId {
        let id = ServerId(self.next_server_id);
        self.next_server_id += 1;

        let mut server = ServerConnection::new(id, transport);
        server.language_id = params.language_id.clone();
        server.status = ConnectionStatus::Connecting;

        let init = self.build_initialize_params(params);
        if let Err(e) = server.send_request(methods::INITIALIZE, init) {
            error!("server {}: failed to send initialize: {}", id, e);
            server.transport.close();
            return ServerId::INVALID;
        }

        self.servers.push(server);
        id
    }

    fn build_initialize_params(&self, params: &ConnectParams) -> JsonValue {
        let mut client_info = JsonValue::object();
        client_info.set("name", JsonValue::string(escape_text(&self.client_name)));
        client_info.set(
            "version",
            JsonValue::string(escape_text(&self.client_version)),
        );

        let mut init = JsonValue::object();
        init.set("processId", JsonValue::Int(std::process::id() as i64));
        init.set("clientInfo", client_info);
        init.set("locale", JsonValue::string(escape_text(&self.locale)));
        init.set(
            "rootUri",
            match &params.root_uri {
                Some(uri) => JsonValue::string(escape_text(uri)),
                None => JsonValue::Null,
            },
        );
        init.set("capabilities", build_client_capabilities(&self.capabilities));
        init.set("trace", JsonValue::string(params.trace.as_wire_str()));
        init
    }

    /// Lifecycle state of a connection; unknown or removed ids report
    /// `NotConnected`.
    pub fn connection_status(&self, id: ServerId) -> ConnectionStatus {
        self.find(id)
            .map(|s| s.status)
            .unwrap_or(ConnectionStatus::NotConnected)
    }

    /// Name/version the server reported at initialize.
    pub fn server_info(&self, id: ServerId) -> Option<&ServerInfo> {
        self.find(id).map(|s| &s.server_info)
    }

    /// Capabilities negotiated with the server at initialize.
    pub fn server_capabilities(&self, id: ServerId) -> Option<&ServerCapabilities> {
        self.find(id).map(|s| &s.capabilities)
    }

    /// Initiate the graceful shutdown/exit handshake.
    ///
    /// The server stays registered until its shutdown response is pumped;
    /// the engine then sends `exit`, tears the transport down, and removes
    /// it. Use [`LspContext::close`] to skip the handshake.
    pub fn shutdown_server(&mut self, id: ServerId) -> Result<()> {
        let server = self
            .find_mut(id)
            .ok_or_else(|| anyhow!("no server {}", id))?;
        server
            .send_request(methods::SHUTDOWN, JsonValue::Null)
            .with_context(|| format!("failed to send shutdown to server {}", id))?;
        Ok(())
    }

    /// Force-close a connection: kill the process, drop its pending
    /// requests and queued notifications, remove it from the registry. No
    /// cancellation or farewell frames are sent. Unknown ids are a no-op.
    pub fn close(&mut self, id: ServerId) {
        if let Some(index) = self.servers.iter().position(|s| s.id == id) {
            let mut server = self.servers.remove(index);
            if !server.pending.is_empty() {
                debug!(
                    "server {}: dropping {} pending requests on close",
                    id,
                    server.pending.len()
                );
            }
            server.transport.close();
            info!("server {} closed", id);
        }
    }

    /// Force-close every live server. The registry is empty afterwards.
    pub fn shutdown_all(&mut self) {
        for server in &mut self.servers {
            server.transport.close();
        }
        let count = self.servers.len();
        self.servers.clear();
        if count > 0 {
            info!("closed {} server connections", count);
        }
    }

    /// The pump: the only place I/O happens.
    ///
    /// For every server, performs exactly one non-blocking read, runs all
    /// complete frames through the RPC engine, and finally purges the
    /// notifications marked polled in the previous cycle.
    pub fn process_responses(&mut self) {
        let mut removals: Vec<ServerId> = Vec::new();

        for server in &mut self.servers {
            let chunk = match server.transport.read_available() {
                Ok(Some(chunk)) => chunk,
                Ok(None) => continue,
                Err(TransportError::Closed) => {
                    // The embedder decides what to do with a dead server;
                    // status never transitions on its own.
                    debug!("server {}: pipe closed", server.id);
                    continue;
                }
                Err(e) => {
                    warn!("server {}: read failed: {}", server.id, e);
                    continue;
                }
            };

            for body in server.framer.feed(&chunk) {
                let message = parse(&body);
                if message.is_null() {
                    warn!("server {}: discarding malformed message", server.id);
                    continue;
                }
                if rpc::dispatch_message(server, &message) == Dispatch::Remove {
                    removals.push(server.id);
                    break;
                }
            }
        }

        self.servers.retain(|s| !removals.contains(&s.id));

        // Deferred deletion: only now do the slots polled before this pump
        // go away.
        for server in &mut self.servers {
            server.purge_polled();
        }
    }

    /// Oldest unpolled notification for a server, or `None`.
    ///
    /// The returned value is the embedder's to keep; the internal queue slot
    /// is marked polled and reclaimed on the next pump.
    pub fn poll_notification(&mut self, id: ServerId) -> Option<Notification> {
        self.find_mut(id).and_then(|s| s.poll_notification())
    }

    /// Open a document on a server, reading its contents through the file
    /// provider. Opening an already-open document is a no-op.
    pub fn text_document_did_open(&mut self, id: ServerId, path: &str) -> Result<()> {
        let content = self
            .file_provider
            .read_to_string(Path::new(path))
            .with_context(|| format!("failed to read {}", path))?;
        let server = self
            .find_mut(id)
            .ok_or_else(|| anyhow!("no server {}", id))?;

        let uri = path_to_file_uri(path);
        if !server.open_document(&uri) {
            debug!("server {}: {} already open", id, uri);
            return Ok(());
        }

        let mut text_document = JsonValue::object();
        text_document.set("uri", JsonValue::string(uri));
        text_document.set(
            "languageId",
            JsonValue::string(escape_text(&server.language_id)),
        );
        text_document.set("version", JsonValue::Int(1));
        // Raw file text enters the tree here, so this is a mandatory
        // pre-escape call site (the encoder emits payloads verbatim).
        text_document.set("text", JsonValue::string(escape_text(&content)));
        let mut params = JsonValue::object();
        params.set("textDocument", text_document);

        server
            .send_notification(methods::DID_OPEN, Some(params))
            .with_context(|| format!("failed to send didOpen to server {}", id))
    }

    /// Close a document on a server. Closing a document that is not open is
    /// a no-op.
    pub fn text_document_did_close(&mut self, id: ServerId, path: &str) -> Result<()> {
        let server = self
            .find_mut(id)
            .ok_or_else(|| anyhow!("no server {}", id))?;

        let uri = path_to_file_uri(path);
        if !server.close_document(&uri) {
            debug!("server {}: {} was not open", id, uri);
            return Ok(());
        }

        let mut text_document = JsonValue::object();
        text_document.set("uri", JsonValue::string(uri));
        let mut params = JsonValue::object();
        params.set("textDocument", text_document);

        server
            .send_notification(methods::DID_CLOSE, Some(params))
            .with_context(|| format!("failed to send didClose to server {}", id))
    }

    /// Request the symbol outline of a document. The decoded tree arrives
    /// later as a [`Notification::DocumentSymbols`] tagged with this
    /// document's URI. Returns the request id.
    pub fn text_document_symbol(&mut self, id: ServerId, path: &str) -> Result<i64> {
        let server = self
            .find_mut(id)
            .ok_or_else(|| anyhow!("no server {}", id))?;

        let mut text_document = JsonValue::object();
        text_document.set("uri", JsonValue::string(path_to_file_uri(path)));
        let mut params = JsonValue::object();
        params.set("textDocument", text_document);

        server
            .send_request(methods::DOCUMENT_SYMBOL, params)
            .with_context(|| format!("failed to request symbols from server {}", id))
    }

    /// Adjust the server's trace verbosity via `$/setTrace`.
    pub fn set_trace(&mut self, id: ServerId, level: TraceLevel) -> Result<()> {
        let server = self
            .find_mut(id)
            .ok_or_else(|| anyhow!("no server {}", id))?;

        let mut params = JsonValue::object();
        params.set("value", JsonValue::string(level.as_wire_str()));
        server
            .send_notification(methods::SET_TRACE, Some(params))
            .with_context(|| format!("failed to send setTrace to server {}", id))
    }

    /// Version of a document currently open on a server, or `None` when it
    /// is not open there.
    pub fn document_version(&self, id: ServerId, path: &str) -> Option<i64> {
        let uri = path_to_file_uri(path);
        self.find(id)?
            .open_documents
            .iter()
            .find(|d| d.uri == uri)
            .map(|d| d.version)
    }

    /// Number of live connections.
    pub fn server_count(&self) -> usize {
        self.servers.len()
    }

    fn find(&self, id: ServerId) -> Option<&ServerConnection> {
        self.servers.iter().find(|s| s.id == id)
    }

    fn find_mut(&mut self, id: ServerId) -> Option<&mut ServerConnection> {
        self.servers.iter_mut().find(|s| s.id == id)
    }

    /// Test seam mirroring `connect`, with the transport supplied directly.
    #[cfg(test)]
    pub(crate) fn connect_with_transport(
        &mut self,
        transport: Box<dyn Transport>,
        params: ConnectParams,
    ) -> ServerId {
        self.register_server(transport, &params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::framing::MessageFramer;
    use crate::transport::testing::SharedTransport;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;
    use std::path::PathBuf;

    /// In-memory file provider.
    struct MapFs(HashMap<PathBuf, String>);

    impl FileProvider for MapFs {
        fn read_to_string(&self, path: &Path) -> std::io::Result<String> {
            self.0.get(path).cloned().ok_or_else(|| {
                std::io::Error::new(std::io::ErrorKind::NotFound, "no such test file")
            })
        }
    }

    fn context_with_files(files: &[(&str, &str)]) -> LspContext {
        let mut ctx = LspContext::new();
        ctx.set_file_provider(Box::new(MapFs(
            files
                .iter()
                .map(|(p, c)| (PathBuf::from(p), c.to_string()))
                .collect(),
        )));
        ctx
    }

    fn connect_scripted(ctx: &mut LspContext) -> (ServerId, SharedTransport) {
        let shared = SharedTransport::new();
        let id = ctx.connect_with_transport(Box::new(shared.clone()), ConnectParams::default());
        assert!(id.is_valid());
        (id, shared)
    }

    fn written_envelopes(shared: &SharedTransport) -> Vec<JsonValue> {
        let mut framer = MessageFramer::new();
        framer
            .feed(&shared.written())
            .iter()
            .map(|b| parse(b))
            .collect()
    }

    fn methods_written(shared: &SharedTransport) -> Vec<String> {
        written_envelopes(shared)
            .iter()
            .filter_map(|e| e.get("method").and_then(JsonValue::as_str).map(String::from))
            .collect()
    }

    #[test]
    fn test_connect_sends_initialize_with_capabilities() {
        let mut ctx = LspContext::new();
        let (id, shared) = connect_scripted(&mut ctx);

        assert_eq!(ctx.connection_status(id), ConnectionStatus::Connecting);
        let sent = written_envelopes(&shared);
        assert_eq!(sent.len(), 1);
        let init = &sent[0];
        assert_eq!(init.get("id").and_then(JsonValue::as_i64), Some(1));
        assert_eq!(
            init.get("method").and_then(JsonValue::as_str),
            Some("initialize")
        );
        let params = init.get("params").expect("params");
        assert!(params.get("processId").and_then(JsonValue::as_i64).is_some());
        assert!(params
            .get("capabilities")
            .and_then(|c| c.get("textDocument"))
            .is_some());
        assert_eq!(
            params.get("trace").and_then(JsonValue::as_str),
            Some("off")
        );
    }

    #[test]
    fn test_handshake_transitions_once_and_confirms() {
        let mut ctx = LspContext::new();
        let (id, shared) = connect_scripted(&mut ctx);
        shared.clear_written();

        shared.push_message(r#"{"id":1,"result":{"capabilities":{}}}"#);
        ctx.process_responses();

        assert_eq!(ctx.connection_status(id), ConnectionStatus::Connected);
        assert_eq!(methods_written(&shared), vec!["initialized"]);

        // Pumping again with no input changes nothing.
        ctx.process_responses();
        assert_eq!(ctx.connection_status(id), ConnectionStatus::Connected);
        assert_eq!(methods_written(&shared), vec!["initialized"]);
    }

    #[test]
    fn test_shutdown_handshake_removes_server() {
        let mut ctx = LspContext::new();
        let (id, shared) = connect_scripted(&mut ctx);
        shared.push_message(r#"{"id":1,"result":{"capabilities":{}}}"#);
        ctx.process_responses();
        shared.clear_written();

        ctx.shutdown_server(id).unwrap();
        shared.push_message(r#"{"id":2,"result":null}"#);
        ctx.process_responses();

        assert_eq!(methods_written(&shared), vec!["shutdown", "exit"]);
        assert!(shared.is_closed());
        assert_eq!(ctx.server_count(), 0);
        assert_eq!(ctx.connection_status(id), ConnectionStatus::NotConnected);
    }

    #[test]
    fn test_request_ids_monotonic_across_operations() {
        let mut ctx = context_with_files(&[("/w/a.rs", "fn a() {}")]);
        let (id, shared) = connect_scripted(&mut ctx);
        shared.push_message(r#"{"id":1,"result":{"capabilities":{}}}"#);
        ctx.process_responses();

        let first = ctx.text_document_symbol(id, "/w/a.rs").unwrap();
        let second = ctx.text_document_symbol(id, "/w/a.rs").unwrap();
        let third = ctx.text_document_symbol(id, "/w/a.rs").unwrap();
        assert_eq!((first, second, third), (2, 3, 4));
    }

    #[test]
    fn test_did_open_escapes_content_and_is_idempotent() {
        let mut ctx = context_with_files(&[("/w/main.rs", "fn main() {\n    print!(\"hi\");\n}\n")]);
        let (id, shared) = connect_scripted(&mut ctx);
        shared.push_message(r#"{"id":1,"result":{"capabilities":{}}}"#);
        ctx.process_responses();
        shared.clear_written();

        ctx.text_document_did_open(id, "/w/main.rs").unwrap();
        let sent = written_envelopes(&shared);
        assert_eq!(sent.len(), 1);
        let text_document = sent[0]
            .get("params")
            .and_then(|p| p.get("textDocument"))
            .expect("textDocument");
        assert_eq!(
            text_document.get("version").and_then(JsonValue::as_i64),
            Some(1)
        );
        // The tree holds the pre-escaped form; raw newlines and quotes never
        // reach the wire.
        let text = text_document
            .get("text")
            .and_then(JsonValue::as_str)
            .unwrap();
        assert!(!text.contains('\n'));
        assert!(text.contains("\\n"));
        assert!(text.contains("\\\"hi\\\""));

        // Second open of the same document: no message.
        ctx.text_document_did_open(id, "/w/main.rs").unwrap();
        assert_eq!(written_envelopes(&shared).len(), 1);
        assert_eq!(ctx.document_version(id, "/w/main.rs"), Some(1));

        ctx.text_document_did_close(id, "/w/main.rs").unwrap();
        assert_eq!(ctx.document_version(id, "/w/main.rs"), None);
    }

    #[test]
    fn test_did_close_only_when_open() {
        let mut ctx = context_with_files(&[("/w/main.rs", "x")]);
        let (id, shared) = connect_scripted(&mut ctx);
        shared.push_message(r#"{"id":1,"result":{"capabilities":{}}}"#);
        ctx.process_responses();
        shared.clear_written();

        // Not open: nothing sent.
        ctx.text_document_did_close(id, "/w/main.rs").unwrap();
        assert!(methods_written(&shared).is_empty());

        ctx.text_document_did_open(id, "/w/main.rs").unwrap();
        ctx.text_document_did_close(id, "/w/main.rs").unwrap();
        assert_eq!(
            methods_written(&shared),
            vec!["textDocument/didOpen", "textDocument/didClose"]
        );

        // Close again: gone already, nothing new.
        ctx.text_document_did_close(id, "/w/main.rs").unwrap();
        assert_eq!(methods_written(&shared).len(), 2);
    }

    #[test]
    fn test_missing_file_fails_without_side_effects() {
        let mut ctx = context_with_files(&[]);
        let (id, shared) = connect_scripted(&mut ctx);
        shared.clear_written();

        let result = ctx.text_document_did_open(id, "/nope.rs");
        assert!(result.is_err());
        assert!(methods_written(&shared).is_empty());
    }

    #[test]
    fn test_document_symbol_notification_round_trip() {
        let mut ctx = context_with_files(&[("/w/widget.rs", "struct W;")]);
        let (id, shared) = connect_scripted(&mut ctx);
        shared.push_message(r#"{"id":1,"result":{"capabilities":{"documentSymbolProvider":true}}}"#);
        ctx.process_responses();

        ctx.text_document_symbol(id, "/w/widget.rs").unwrap();
        shared.push_message(
            r#"{"id":2,"result":[{"name":"W","kind":23,
                "range":{"start":{"line":0,"character":0},"end":{"line":0,"character":9}},
                "selectionRange":{"start":{"line":0,"character":7},"end":{"line":0,"character":8}}}]}"#,
        );
        ctx.process_responses();

        let notification = ctx.poll_notification(id).expect("symbols queued");
        match notification {
            Notification::DocumentSymbols { uri, symbols } => {
                assert!(uri.ends_with("/w/widget.rs"));
                assert_eq!(symbols.len(), 1);
                assert_eq!(symbols[0].name, "W");
                assert_eq!(symbols[0].kind, 23);
            }
            other => panic!("expected symbols, got {:?}", other),
        }
    }

    #[test]
    fn test_notification_polled_once_and_purged_next_pump() {
        let mut ctx = LspContext::new();
        let (id, shared) = connect_scripted(&mut ctx);
        shared.push_message(r#"{"id":1,"result":{"capabilities":{}}}"#);
        shared.push_message(
            r#"{"method":"textDocument/publishDiagnostics",
                "params":{"uri":"file:///w/a.rs","diagnostics":[{"message":"bad"}]}}"#,
        );
        ctx.process_responses();
        ctx.process_responses();

        let first = ctx.poll_notification(id).expect("diagnostics queued");
        assert_eq!(first.uri(), "file:///w/a.rs");
        // Consumed once.
        assert!(ctx.poll_notification(id).is_none());

        // The slot survives until the next pump; the polled copy stays valid
        // the whole time, then the queue is reclaimed.
        ctx.process_responses();
        assert!(ctx.poll_notification(id).is_none());
        assert_eq!(first.uri(), "file:///w/a.rs");
    }

    #[test]
    fn test_multiple_frames_drained_in_one_pump() {
        let mut ctx = LspContext::new();
        let (id, shared) = connect_scripted(&mut ctx);

        // Initialize response and two diagnostic pushes concatenated into a
        // single read.
        let mut glued = Vec::new();
        for body in [
            r#"{"id":1,"result":{"capabilities":{}}}"#,
            r#"{"method":"textDocument/publishDiagnostics","params":{"uri":"file:///1.rs","diagnostics":[]}}"#,
            r#"{"method":"textDocument/publishDiagnostics","params":{"uri":"file:///2.rs","diagnostics":[]}}"#,
        ] {
            glued.extend_from_slice(
                format!("Content-Length: {}\r\n\r\n{}", body.len(), body).as_bytes(),
            );
        }
        shared.0.borrow_mut().incoming.push_back(glued);
        ctx.process_responses();

        assert_eq!(ctx.connection_status(id), ConnectionStatus::Connected);
        assert_eq!(ctx.poll_notification(id).unwrap().uri(), "file:///1.rs");
        assert_eq!(ctx.poll_notification(id).unwrap().uri(), "file:///2.rs");
        assert!(ctx.poll_notification(id).is_none());
    }

    #[test]
    fn test_connect_spawn_failure_returns_invalid_id() {
        let mut ctx = LspContext::new();
        let id = ctx.connect(
            "/nonexistent/path/to/language-server",
            ConnectParams::default(),
        );
        assert_eq!(id, ServerId::INVALID);
        assert_eq!(ctx.server_count(), 0);
        assert_eq!(
            ctx.connection_status(id),
            ConnectionStatus::NotConnected
        );
    }

    #[test]
    fn test_close_drops_pending_silently() {
        let mut ctx = context_with_files(&[("/w/a.rs", "x")]);
        let (id, shared) = connect_scripted(&mut ctx);
        shared.push_message(r#"{"id":1,"result":{"capabilities":{}}}"#);
        ctx.process_responses();
        ctx.text_document_symbol(id, "/w/a.rs").unwrap();
        shared.clear_written();

        ctx.close(id);
        assert!(shared.is_closed());
        assert_eq!(ctx.server_count(), 0);
        // Forced close sends nothing: no cancellation frames exist.
        assert!(methods_written(&shared).is_empty());
        assert_eq!(ctx.connection_status(id), ConnectionStatus::NotConnected);
    }

    #[test]
    fn test_shutdown_all_clears_registry() {
        let mut ctx = LspContext::new();
        let (a, ta) = connect_scripted(&mut ctx);
        let (b, tb) = connect_scripted(&mut ctx);
        assert_ne!(a, b);
        assert_eq!(ctx.server_count(), 2);

        ctx.shutdown_all();
        assert_eq!(ctx.server_count(), 0);
        assert!(ta.is_closed());
        assert!(tb.is_closed());
    }

    #[test]
    fn test_server_ids_unique_and_increasing() {
        let mut ctx = LspContext::new();
        let (a, _) = connect_scripted(&mut ctx);
        let (b, _) = connect_scripted(&mut ctx);
        let (c, _) = connect_scripted(&mut ctx);
        assert!(a.0 < b.0 && b.0 < c.0);
    }

    #[test]
    fn test_set_trace_spelling() {
        let mut ctx = LspContext::new();
        let (id, shared) = connect_scripted(&mut ctx);
        shared.clear_written();

        ctx.set_trace(id, TraceLevel::Verbose).unwrap();
        let sent = written_envelopes(&shared);
        assert_eq!(sent.len(), 1);
        assert_eq!(
            sent[0].get("method").and_then(JsonValue::as_str),
            Some("$/setTrace")
        );
        assert_eq!(
            sent[0]
                .get("params")
                .and_then(|p| p.get("value"))
                .and_then(JsonValue::as_str),
            Some("verbose")
        );
    }

    #[test]
    fn test_operations_on_unknown_server_fail() {
        let mut ctx = context_with_files(&[("/w/a.rs", "x")]);
        let ghost = ServerId(42);
        assert!(ctx.text_document_did_open(ghost, "/w/a.rs").is_err());
        assert!(ctx.text_document_symbol(ghost, "/w/a.rs").is_err());
        assert!(ctx.set_trace(ghost, TraceLevel::Off).is_err());
        assert!(ctx.shutdown_server(ghost).is_err());
    }

    #[test]
    fn test_malformed_message_is_discarded() {
        let mut ctx = LspContext::new();
        let (id, shared) = connect_scripted(&mut ctx);
        // Valid frame, garbage body: the parser yields Null and the pump
        // drops it without touching connection state.
        shared.push_message(r#"{"id": oops}"#);
        ctx.process_responses();
        assert_eq!(ctx.connection_status(id), ConnectionStatus::Connecting);
        assert!(ctx.poll_notification(id).is_none());
    }
}
