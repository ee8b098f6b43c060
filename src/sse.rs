//! Server-Sent Events (SSE) delta decoding.
//!
//! The chat endpoint streams its reply as blank-line separated frames,
//! each carrying one JSON payload on a `data:` line:
//! ```text
//! data: {"delta": "Hi"}
//!
//! data: {"delta": " there"}
//!
//! data: [DONE]
//! ```
//!
//! [`DeltaDecoder`] is the whole state of one decoding session: it is fed
//! raw network chunks and hands back `delta` strings one at a time. The
//! async and blocking drivers built on top of it live in [`crate::stream`].

use serde::Deserialize;

/// Separator between two frames.
pub const FRAME_SEPARATOR: &str = "\n\n";

/// Prefix of the only significant line inside a frame.
pub const DATA_PREFIX: &str = "data:";

/// Payload that ends the stream.
pub const DONE_MARKER: &str = "[DONE]";

/// Outcome of decoding a single complete frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// A non-empty text fragment.
    Delta(String),
    /// The `[DONE]` sentinel.
    Done,
    /// A frame that contributes nothing to the output.
    Skipped(SkipReason),
}

/// Why a frame was dropped. Never surfaced to stream consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// No line of the frame starts with `data:`.
    NoData,
    /// The payload is not a JSON object with a string `delta`.
    InvalidJson,
    /// `delta` is missing, null or empty.
    EmptyDelta,
}

#[derive(Debug, Deserialize)]
struct DeltaPayload {
    #[serde(default)]
    delta: Option<String>,
}

/// Parse an SSE line to extract the data portion.
///
/// # Example
/// ```
/// use vibetune::sse::parse_sse_line;
///
/// assert_eq!(parse_sse_line("data: {\"delta\": \"a\"}"), Some("{\"delta\": \"a\"}"));
/// assert_eq!(parse_sse_line("data:[DONE]"), Some("[DONE]"));
/// assert_eq!(parse_sse_line("event: message"), None);
/// ```
pub fn parse_sse_line(line: &str) -> Option<&str> {
    line.strip_prefix(DATA_PREFIX).map(str::trim)
}

/// Check if an SSE payload is the end-of-stream sentinel.
///
/// The comparison is exact: a renamed sentinel is treated as an ordinary
/// (unparseable) payload and the stream then runs until the body ends.
///
/// # Example
/// ```
/// use vibetune::sse::is_done_marker;
///
/// assert!(is_done_marker("[DONE]"));
/// assert!(!is_done_marker("[done]"));
/// assert!(!is_done_marker("{\"delta\": \"x\"}"));
/// ```
pub fn is_done_marker(data: &str) -> bool {
    data == DONE_MARKER
}

/// Decode one complete frame (without its trailing separator).
pub fn parse_frame(frame: &str) -> Frame {
    let Some(data) = frame.lines().find_map(parse_sse_line) else {
        return Frame::Skipped(SkipReason::NoData);
    };

    if is_done_marker(data) {
        return Frame::Done;
    }

    match serde_json::from_str::<DeltaPayload>(data) {
        Ok(DeltaPayload { delta: Some(delta) }) if !delta.is_empty() => Frame::Delta(delta),
        Ok(_) => Frame::Skipped(SkipReason::EmptyDelta),
        Err(_) => Frame::Skipped(SkipReason::InvalidJson),
    }
}

/// Incremental UTF-8 decoding across chunk boundaries.
///
/// Bytes of a character that is cut off at the end of a chunk are held
/// back until the next chunk completes them. Invalid sequences become
/// U+FFFD, the same as a lossy conversion would produce.
#[derive(Debug, Default)]
struct Utf8Carry {
    pending: Vec<u8>,
}

impl Utf8Carry {
    fn decode_into(&mut self, chunk: &[u8], out: &mut String) {
        if self.pending.is_empty() {
            let tail = Self::decode_complete(chunk, out);
            self.pending.extend_from_slice(&chunk[tail..]);
        } else {
            self.pending.extend_from_slice(chunk);
            let pending = std::mem::take(&mut self.pending);
            let tail = Self::decode_complete(&pending, out);
            self.pending.extend_from_slice(&pending[tail..]);
        }
    }

    /// Decode `bytes` into `out` and return where the incomplete trailing
    /// sequence, if any, starts.
    fn decode_complete(bytes: &[u8], out: &mut String) -> usize {
        let mut start = 0;
        loop {
            match std::str::from_utf8(&bytes[start..]) {
                Ok(text) => {
                    out.push_str(text);
                    return bytes.len();
                }
                Err(e) => {
                    let valid_end = start + e.valid_up_to();
                    out.push_str(&String::from_utf8_lossy(&bytes[start..valid_end]));
                    match e.error_len() {
                        Some(len) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            start = valid_end + len;
                        }
                        // Incomplete sequence at the end: wait for more bytes.
                        None => return valid_end,
                    }
                }
            }
        }
    }

    fn clear(&mut self) {
        self.pending.clear();
    }
}

/// Pull-based decoder for one streamed chat response.
///
/// Feed it chunks with [`feed`](Self::feed) and drain fragments with
/// [`next_delta`](Self::next_delta). When `next_delta` returns `None`,
/// [`is_finished`](Self::is_finished) tells whether the sentinel was seen
/// (nothing more will ever be produced) or more input is needed.
///
/// # Example
/// ```
/// use vibetune::sse::DeltaDecoder;
///
/// let mut decoder = DeltaDecoder::new();
/// decoder.feed(b"data: {\"delta\":\"Hi\"}\n\ndata: {\"del");
/// assert_eq!(decoder.next_delta().as_deref(), Some("Hi"));
/// assert_eq!(decoder.next_delta(), None);
/// assert!(!decoder.is_finished());
///
/// decoder.feed(b"ta\":\" there\"}\n\ndata: [DONE]\n\n");
/// assert_eq!(decoder.next_delta().as_deref(), Some(" there"));
/// assert_eq!(decoder.next_delta(), None);
/// assert!(decoder.is_finished());
/// ```
#[derive(Debug, Default)]
pub struct DeltaDecoder {
    buffer: String,
    /// Start of the first frame not yet handed out.
    cursor: usize,
    /// Where the next separator search starts; everything in
    /// `cursor..scan_from` is known not to contain one.
    scan_from: usize,
    carry: Utf8Carry,
    finished: bool,
}

impl DeltaDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a network chunk. Ignored once the decoder is finished.
    pub fn feed(&mut self, chunk: &[u8]) {
        if self.finished {
            return;
        }
        self.compact();
        self.carry.decode_into(chunk, &mut self.buffer);
    }

    /// Drop consumed frames from the front of the buffer.
    fn compact(&mut self) {
        if self.cursor == 0 {
            return;
        }
        self.buffer.drain(..self.cursor);
        self.scan_from -= self.cursor;
        self.cursor = 0;
    }

    fn find_separator(&mut self) -> Option<usize> {
        let bytes = self.buffer.as_bytes();
        let sep = FRAME_SEPARATOR.as_bytes();

        match bytes[self.scan_from..]
            .windows(sep.len())
            .position(|w| w == sep)
        {
            Some(offset) => Some(self.scan_from + offset),
            None => {
                // The last byte may be the first half of a separator.
                self.scan_from = bytes
                    .len()
                    .saturating_sub(sep.len() - 1)
                    .max(self.cursor);
                None
            }
        }
    }

    /// Take the next complete frame out of the buffer, if there is one.
    ///
    /// Seeing [`Frame::Done`] finishes the decoder and discards whatever
    /// is still buffered.
    pub fn next_frame(&mut self) -> Option<Frame> {
        if self.finished {
            return None;
        }

        let pos = self.find_separator()?;
        let frame = parse_frame(&self.buffer[self.cursor..pos]);
        self.cursor = pos + FRAME_SEPARATOR.len();
        self.scan_from = self.cursor;

        if frame == Frame::Done {
            self.finish();
        }
        Some(frame)
    }

    /// Next text fragment available from the buffered input.
    pub fn next_delta(&mut self) -> Option<String> {
        while let Some(frame) = self.next_frame() {
            match frame {
                Frame::Delta(delta) => return Some(delta),
                Frame::Done => {
                    tracing::trace!("sse stream reached done marker");
                    return None;
                }
                Frame::Skipped(reason) => {
                    tracing::debug!(?reason, "skipping sse frame");
                }
            }
        }
        None
    }

    /// Stop decoding and drop all buffered input.
    pub fn finish(&mut self) {
        self.finished = true;
        self.buffer.clear();
        self.cursor = 0;
        self.scan_from = 0;
        self.carry.clear();
    }

    /// Whether the session is over; no further fragments will be produced.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Text received but not yet part of a complete frame.
    pub fn buffered(&self) -> &str {
        &self.buffer[self.cursor..]
    }
}
