//! POSIX transport backend: `pipe`/`fork`/`exec` via `std::process`, with
//! the child's stdout flipped to `O_NONBLOCK` so the pump never stalls on a
//! quiet server.

use std::io::{ErrorKind, Read, Write};
use std::os::fd::AsRawFd;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};

use tracing::{debug, warn};

use super::{resolve_program, TransportError, READ_CHUNK};

/// A spawned language-server process and its stdio pipe pair.
pub struct ChildTransport {
    child: Child,
    stdin: ChildStdin,
    stdout: ChildStdout,
    closed: bool,
}

impl ChildTransport {
    /// Spawn `program` with redirected stdio.
    ///
    /// See [`resolve_program`](super::resolve_program) for the search
    /// semantics of `search_path_env`. The child's stderr is discarded;
    /// language servers log there freely and none of it is protocol.
    pub fn spawn(
        program: &str,
        args: &[String],
        search_path_env: Option<&str>,
    ) -> Result<Self, TransportError> {
        let resolved = resolve_program(program, search_path_env)?;
        debug!("spawning language server: {}", resolved.display());

        let mut child = Command::new(&resolved)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| TransportError::Spawn(resolved.display().to_string(), e))?;

        let stdin = child.stdin.take().ok_or(TransportError::PipeSetup)?;
        let stdout = child.stdout.take().ok_or(TransportError::PipeSetup)?;

        set_nonblocking(stdout.as_raw_fd())?;

        Ok(ChildTransport {
            child,
            stdin,
            stdout,
            closed: false,
        })
    }

    /// One non-blocking read from the child's stdout.
    ///
    /// `Ok(None)` means the pipe currently holds nothing; `Closed` means the
    /// child hung up. At most [`READ_CHUNK`] bytes come back per call.
    pub fn read_available(&mut self) -> Result<Option<Vec<u8>>, TransportError> {
        let mut buf = [0u8; READ_CHUNK];
        match self.stdout.read(&mut buf) {
            Ok(0) => Err(TransportError::Closed),
            Ok(n) => Ok(Some(buf[..n].to_vec())),
            Err(e) if e.kind() == ErrorKind::WouldBlock => Ok(None),
            Err(e) if e.kind() == ErrorKind::Interrupted => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Write the full byte run to the child's stdin, blocking at the OS pipe
    /// buffer if necessary.
    pub fn write_all(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        self.stdin.write_all(bytes)?;
        self.stdin.flush()?;
        Ok(())
    }

    /// Force-terminate the child and reap it. Idempotent.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        if let Err(e) = self.child.kill() {
            // Already exited on its own; reaping below still applies.
            debug!("kill on closed child: {}", e);
        }
        if let Err(e) = self.child.wait() {
            warn!("failed to reap language server process: {}", e);
        }
    }

    /// OS process id of the child, for diagnostics.
    pub fn pid(&self) -> u32 {
        self.child.id()
    }
}

impl Drop for ChildTransport {
    fn drop(&mut self) {
        if !self.closed {
            debug!("transport dropped while open; killing child {}", self.pid());
            self.close();
        }
    }
}

/// Set `O_NONBLOCK` on a pipe fd.
fn set_nonblocking(fd: i32) -> Result<(), TransportError> {
    // Safety: fcntl on a fd we own; no memory is involved.
    unsafe {
        let flags = libc::fcntl(fd, libc::F_GETFL);
        if flags < 0 {
            return Err(std::io::Error::last_os_error().into());
        }
        if libc::fcntl(fd, libc::F_SETFL, flags | libc::O_NONBLOCK) < 0 {
            return Err(std::io::Error::last_os_error().into());
        }
    }
    Ok(())
}
