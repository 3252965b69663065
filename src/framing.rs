//! Content-Length message framing over a non-blocking byte stream.
//!
//! Language servers speak HTTP-style framing on their stdio pipes:
//!
//! ```text
//! Content-Length: <length>\r\n
//! \r\n
//! <length bytes of JSON>
//! ```
//!
//! Because the transport read is non-blocking, a single read can hand back
//! anything from a few header bytes to several complete messages glued
//! together. [`MessageFramer`] accumulates raw bytes per connection and
//! yields every complete message body present, leaving at most one partial
//! message buffered for the next read.
//!
//! Header parsing is case-insensitive and tolerant of both CRLF and LF line
//! endings; the body is taken to start at the first `{` after the length
//! value, which is where every JSON-RPC message begins.

use tracing::warn;

/// Maximum message size (100MB) to prevent OOM from malicious/buggy servers.
const MAX_MESSAGE_SIZE: usize = 100 * 1024 * 1024;

/// Per-connection framing state: an accumulation buffer plus the declared
/// length of the body currently being collected, once its header has been
/// seen in full.
#[derive(Debug, Default)]
pub struct MessageFramer {
    buf: Vec<u8>,
    expected: Option<usize>,
}

impl MessageFramer {
    pub fn new() -> Self {
        MessageFramer::default()
    }

    /// Absorb one read's worth of bytes and return every complete message
    /// body now available, in arrival order.
    ///
    /// The loop inside drains the buffer: with a pending length it waits for
    /// that many body bytes; otherwise it looks for the next header. Either
    /// can straddle a chunk boundary, in which case the bytes stay buffered
    /// and the next call picks up where this one stopped.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buf.extend_from_slice(chunk);
        let mut bodies = Vec::new();
        loop {
            if self.expected.is_none() {
                match locate_body(&self.buf) {
                    Some((body_start, length)) => {
                        if length > MAX_MESSAGE_SIZE {
                            warn!(
                                "message length {} exceeds cap {}, dropping buffered stream state",
                                length, MAX_MESSAGE_SIZE
                            );
                            self.buf.clear();
                            break;
                        }
                        self.buf.drain(..body_start);
                        self.expected = Some(length);
                    }
                    // Header not fully present yet.
                    None => break,
                }
            }
            let length = self.expected.expect("length set above or in a prior call");
            if self.buf.len() < length {
                break;
            }
            let body: Vec<u8> = self.buf.drain(..length).collect();
            self.expected = None;
            match String::from_utf8(body) {
                Ok(text) => bodies.push(text),
                Err(e) => warn!("discarding message body with invalid UTF-8: {}", e),
            }
        }
        bodies
    }

    /// Whether an incomplete header or body is currently buffered.
    pub fn has_partial(&self) -> bool {
        self.expected.is_some() || !self.buf.is_empty()
    }
}

/// Find the next complete header in `buf`.
///
/// Returns `(body_start, length)` where `body_start` indexes the `{` that
/// opens the message body. Returns `None` while any part of the header has
/// yet to arrive (the `Content-Length` name, its digits, or the body opener).
/// The digit run is only trusted once the `{` has been seen, since the
/// terminator proves the number was not cut mid-digit by the chunk boundary.
fn locate_body(buf: &[u8]) -> Option<(usize, usize)> {
    const NAME: &[u8] = b"content-length";
    let name_at = find_case_insensitive(buf, NAME)?;
    let mut i = name_at + NAME.len();

    // Optional whitespace, then the colon.
    while i < buf.len() && (buf[i] == b' ' || buf[i] == b'\t') {
        i += 1;
    }
    if i >= buf.len() {
        return None;
    }
    if buf[i] != b':' {
        // Not actually the header (e.g. inside some other header value);
        // wait for more context rather than guessing.
        return None;
    }
    i += 1;
    while i < buf.len() && (buf[i] == b' ' || buf[i] == b'\t') {
        i += 1;
    }

    let digits_start = i;
    while i < buf.len() && buf[i].is_ascii_digit() {
        i += 1;
    }
    if i == digits_start {
        return None;
    }

    // The body opener doubles as proof that the digit run is complete.
    let body_start = (i..buf.len()).find(|&j| buf[j] == b'{')?;

    let digits = std::str::from_utf8(&buf[digits_start..i]).ok()?;
    let length: usize = match digits.parse() {
        Ok(n) => n,
        Err(_) => {
            warn!("unparseable Content-Length value: {}", digits);
            return None;
        }
    };
    Some((body_start, length))
}

fn find_case_insensitive(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if haystack.len() < needle.len() {
        return None;
    }
    (0..=haystack.len() - needle.len()).find(|&i| {
        haystack[i..i + needle.len()]
            .iter()
            .zip(needle)
            .all(|(a, b)| a.eq_ignore_ascii_case(b))
    })
}
