//! lspwire: an embedded Language Server Protocol client engine.
//!
//! This library lets a text-editor control talk to external language-server
//! processes over their stdio pipes. It is deliberately self-contained: its
//! own JSON document model and parser, Content-Length framing, process
//! transport with POSIX and Windows backends, JSON-RPC correlation, and a
//! declarative capability negotiator.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐   connect/open/symbol/poll   ┌─────────────────────┐
//! │ editor widget│ ◄──────────────────────────► │ LspContext          │
//! └──────────────┘                              │  ├ rpc (correlate)  │
//!        ▲ pump each frame                      │  ├ framing          │
//!        └───────────────────────────────────── │  ├ json             │
//!                                               │  └ transport ──────────► language
//!                                               └─────────────────────┘    server
//! ```
//!
//! # Concurrency model
//!
//! Single-threaded and cooperative. No internal threads, no async runtime:
//! all I/O happens inside [`LspContext::process_responses`], which the host
//! event loop calls periodically. Reads never block; decoded events queue up
//! per server and are drained with [`LspContext::poll_notification`].
//!
//! # Usage
//!
//! ```ignore
//! use lspwire::{ConnectParams, LspContext, Notification};
//!
//! let mut ctx = LspContext::new();
//! let id = ctx.connect("rust-analyzer", ConnectParams::default());
//!
//! // inside the host event loop:
//! ctx.process_responses();
//! while let Some(event) = ctx.poll_notification(id) {
//!     match event {
//!         Notification::PublishDiagnostics { uri, diagnostics } => { /* … */ }
//!         Notification::DocumentSymbols { uri, symbols } => { /* … */ }
//!     }
//! }
//! ```

pub mod capabilities;
pub mod context;
pub mod framing;
pub mod fs;
pub mod json;
pub mod models;
pub mod rpc;
pub mod server;
pub mod transport;
pub mod uri;

pub use context::{ConnectParams, LspContext};
pub use models::{
    ConnectionStatus, Diagnostic, DiagnosticSeverity, DocumentSymbol, Notification, Position,
    Range, ServerInfo, TraceLevel,
};
pub use server::ServerId;
pub use transport::{Transport, TransportError};
