//! Process transport: spawn a language server with redirected stdio and
//! exchange raw bytes with it over the pipe pair.
//!
//! # Contract
//!
//! Both platform backends present the same surface:
//!
//! - `spawn` resolves the executable (optionally searching a PATH-like
//!   environment variable) and starts it with piped stdin/stdout; failure is
//!   reported synchronously and never retried.
//! - `read_available` never blocks: it returns whatever bytes the pipe holds
//!   right now, `None` when the pipe is empty (distinct from an empty read),
//!   or [`TransportError::Closed`] once the child has gone away.
//! - `write_all` blocks until the OS pipe buffer accepts the bytes.
//! - `close` force-terminates the child and reaps it; there is no graceful
//!   shutdown wait at this layer (the RPC layer owns the shutdown/exit
//!   handshake).
//!
//! The POSIX backend flips the child's stdout to `O_NONBLOCK`; the Windows
//! backend peeks the pipe before reading. Tests target the shared contract,
//! not the adapter underneath.

use std::path::PathBuf;

use thiserror::Error;

#[cfg(unix)]
mod posix;
#[cfg(windows)]
mod windows;

#[cfg(unix)]
pub use posix::ChildTransport;
#[cfg(windows)]
pub use windows::ChildTransport;

/// Upper bound on the bytes pulled from the pipe by a single
/// `read_available` call. Larger messages simply arrive over several pump
/// cycles; the framer accumulates across reads.
pub(crate) const READ_CHUNK: usize = 64 * 1024;

/// The transport contract the protocol layers are written against.
///
/// [`ChildTransport`] is the production implementation on both platforms;
/// tests substitute scripted implementations so handshake and dispatch logic
/// can run without spawning processes.
pub trait Transport {
    /// One non-blocking read: `Ok(None)` when nothing is buffered,
    /// [`TransportError::Closed`] once the peer is gone.
    fn read_available(&mut self) -> Result<Option<Vec<u8>>, TransportError>;

    /// Blocking write of the full byte run.
    fn write_all(&mut self, bytes: &[u8]) -> Result<(), TransportError>;

    /// Force-terminate the peer. Idempotent.
    fn close(&mut self);
}

impl Transport for ChildTransport {
    fn read_available(&mut self) -> Result<Option<Vec<u8>>, TransportError> {
        ChildTransport::read_available(self)
    }

    fn write_all(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        ChildTransport::write_all(self, bytes)
    }

    fn close(&mut self) {
        ChildTransport::close(self)
    }
}


/// Typed failure modes of the process transport.
///
/// These cover the only errors the engine surfaces as values; everything at
/// the protocol layer degrades permissively instead.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The executable was not found in any directory of the search variable.
    #[error("no executable named {program} found via ${search_var}")]
    NotFound { program: String, search_var: String },

    /// Process creation failed.
    #[error("failed to spawn {0}: {1}")]
    Spawn(String, #[source] std::io::Error),

    /// The spawned child did not expose the expected stdio pipes.
    #[error("child stdio pipes unavailable")]
    PipeSetup,

    /// The child exited or its pipe was torn down.
    #[error("child process pipe closed")]
    Closed,

    /// Any other I/O failure on the pipes.
    #[error("pipe I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Resolve `program` to a spawnable path.
///
/// With `search_path_env` set, the named environment variable is read and
/// split on the platform's path-list separator; the first directory holding
/// a matching file wins (Windows also probes `program.exe`). Without it,
/// `program` is used verbatim and the OS does its own lookup at spawn time.
pub(crate) fn resolve_program(
    program: &str,
    search_path_env: Option<&str>,
) -> Result<PathBuf, TransportError> {
    let Some(search_var) = search_path_env else {
        return Ok(PathBuf::from(program));
    };
    let not_found = || TransportError::NotFound {
        program: program.to_string(),
        search_var: search_var.to_string(),
    };
    let Some(raw) = std::env::var_os(search_var) else {
        return Err(not_found());
    };
    for dir in std::env::split_paths(&raw) {
        let candidate = dir.join(program);
        if candidate.is_file() {
            return Ok(candidate);
        }
        #[cfg(windows)]
        {
            let with_exe = dir.join(format!("{}.exe", program));
            if with_exe.is_file() {
                return Ok(with_exe);
            }
        }
    }
    Err(not_found())
}
