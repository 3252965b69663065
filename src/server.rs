//! Per-connection state for one language server.
//!
//! A [`ServerConnection`] owns everything scoped to a single spawned server:
//! the transport, the request-id counter, the pending-request list used for
//! response correlation, the negotiated capabilities, the set of open
//! documents, the framer holding at most one partial wire message, and the
//! notification queue drained by the embedder.

use std::collections::VecDeque;
use std::fmt;

use tracing::trace;

use crate::capabilities::ServerCapabilities;
use crate::framing::MessageFramer;
use crate::json::{encode, JsonValue};
use crate::models::{ConnectionStatus, Notification, QueuedNotification, ServerInfo};
use crate::rpc;
use crate::transport::{Transport, TransportError};

/// Registry-unique handle for a server connection.
///
/// Ids are allocated monotonically from 1; the value 0 is the invalid
/// sentinel returned when connecting fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ServerId(pub u32);

impl ServerId {
    pub const INVALID: ServerId = ServerId(0);

    pub fn is_valid(&self) -> bool {
        self.0 != 0
    }
}

impl fmt::Display for ServerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A request written to the server and awaiting its response.
///
/// The original params stay attached because some responses (document
/// symbols) carry no document reference of their own; the URI is recovered
/// from here at dispatch time.
#[derive(Debug)]
pub(crate) struct PendingRequest {
    pub id: i64,
    pub method: String,
    pub params: JsonValue,
}

/// A text document currently open on a server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct OpenDocument {
    pub uri: String,
    pub version: i64,
}

/// State of one spawned language server.
pub struct ServerConnection {
    pub(crate) id: ServerId,
    pub(crate) transport: Box<dyn Transport>,
    pub(crate) status: ConnectionStatus,
    next_request_id: i64,
    pub(crate) pending: Vec<PendingRequest>,
    pub(crate) server_info: ServerInfo,
    pub(crate) capabilities: ServerCapabilities,
    /// Language id reported for documents opened on this server.
    pub(crate) language_id: String,
    pub(crate) open_documents: Vec<OpenDocument>,
    notifications: VecDeque<QueuedNotification>,
    pub(crate) framer: MessageFramer,
}

impl ServerConnection {
    pub(crate) fn new(id: ServerId, transport: Box<dyn Transport>) -> ServerConnection {
        ServerConnection {
            id,
            transport,
            status: ConnectionStatus::NotConnected,
            next_request_id: 1,
            pending: Vec::new(),
            server_info: ServerInfo::default(),
            capabilities: ServerCapabilities::default(),
            language_id: "plaintext".to_string(),
            open_documents: Vec::new(),
            notifications: VecDeque::new(),
            framer: MessageFramer::new(),
        }
    }

    /// Frame and write one JSON-RPC envelope.
    fn write_message(&mut self, envelope: &JsonValue) -> Result<(), TransportError> {
        let body = encode(envelope);
        trace!("server {} <- {}", self.id, body);
        let framed = format!("Content-Length: {}\r\n\r\n{}", body.len(), body);
        self.transport.write_all(framed.as_bytes())
    }

    /// Allocate the next request id, record the pending request, and send it.
    ///
    /// Ids are strictly increasing from 1 for the lifetime of the connection
    /// and never reused.
    pub(crate) fn send_request(
        &mut self,
        method: &'static str,
        params: JsonValue,
    ) -> Result<i64, TransportError> {
        let id = self.next_request_id;
        self.next_request_id += 1;
        let envelope = rpc::request(id, method, Some(params.clone()));
        self.pending.push(PendingRequest {
            id,
            method: method.to_string(),
            params,
        });
        self.write_message(&envelope)?;
        Ok(id)
    }

    /// Send a notification (no id, no pending entry).
    pub(crate) fn send_notification(
        &mut self,
        method: &'static str,
        params: Option<JsonValue>,
    ) -> Result<(), TransportError> {
        let envelope = rpc::notification(method, params);
        self.write_message(&envelope)
    }

    /// Remove and return the pending request matching a response id.
    pub(crate) fn take_pending(&mut self, id: i64) -> Option<PendingRequest> {
        self.pending
            .iter()
            .position(|p| p.id == id)
            .map(|i| self.pending.remove(i))
    }

    pub(crate) fn enqueue_notification(&mut self, payload: Notification) {
        self.notifications.push_back(QueuedNotification {
            payload,
            polled: false,
        });
    }

    /// Oldest unpolled notification, marked polled on the way out. The queue
    /// slot survives until the next pump purges it.
    pub(crate) fn poll_notification(&mut self) -> Option<Notification> {
        self.notifications.iter_mut().find(|n| !n.polled).map(|n| {
            n.polled = true;
            n.payload.clone()
        })
    }

    /// Drop every slot marked polled in a previous cycle.
    pub(crate) fn purge_polled(&mut self) {
        self.notifications.retain(|n| !n.polled);
    }

    pub(crate) fn is_document_open(&self, uri: &str) -> bool {
        self.open_documents.iter().any(|d| d.uri == uri)
    }

    /// Record a document as open. Returns false when it already was; open
    /// is idempotent per the connection invariants.
    pub(crate) fn open_document(&mut self, uri: &str) -> bool {
        if self.is_document_open(uri) {
            return false;
        }
        self.open_documents.push(OpenDocument {
            uri: uri.to_string(),
            version: 1,
        });
        true
    }

    /// Forget an open document. Returns false when it was not open.
    pub(crate) fn close_document(&mut self, uri: &str) -> bool {
        let before = self.open_documents.len();
        self.open_documents.retain(|d| d.uri != uri);
        self.open_documents.len() != before
    }
}
