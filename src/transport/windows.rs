//! Windows transport backend: `CreateProcess` via `std::process`, with
//! `PeekNamedPipe` probing the child's stdout so reads never block.
//!
//! Anonymous pipes on Windows have no non-blocking mode; instead the peek
//! reports how many bytes are available and the subsequent read is bounded
//! by that count, which makes it return immediately.

use std::io::Read;
use std::io::Write;
use std::os::windows::io::AsRawHandle;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::ptr;

use tracing::{debug, warn};
use windows_sys::Win32::System::Pipes::PeekNamedPipe;

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
    /// semantics of `search_path_env`; on Windows a bare name also matches
    /// `name.exe` inside the searched directories.
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
        let available = self.peek_available()?;
        if available == 0 {
            return Ok(None);
        }
        let mut buf = vec![0u8; available.min(READ_CHUNK)];
        match self.stdout.read(&mut buf) {
            Ok(0) => Err(TransportError::Closed),
            Ok(n) => {
                buf.truncate(n);
                Ok(Some(buf))
            }
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

    /// Number of bytes waiting on the stdout pipe right now.
    fn peek_available(&self) -> Result<usize, TransportError> {
        let mut available: u32 = 0;
        // Safety: the handle is owned by the ChildStdout we hold; only the
        // bytes-available out-parameter is written.
        let ok = unsafe {
            PeekNamedPipe(
                self.stdout.as_raw_handle() as _,
                ptr::null_mut(),
                0,
                ptr::null_mut(),
                &mut available,
                ptr::null_mut(),
            )
        };
        if ok == 0 {
            // A failed peek on an anonymous pipe means the write end is gone:
            // the child exited.
            return Err(TransportError::Closed);
        }
        Ok(available as usize)
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
