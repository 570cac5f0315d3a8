//! Incremental assembly of streamed model output into text.
//!
//! A [`StreamAssembler`] reads a byte body chunk by chunk, decodes it,
//! works out whether the producer is sending plain text or SSE events, and
//! appends every extracted fragment to a running value. Observers can watch
//! that value grow through [`StreamAssembler::subscribe`].

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use bytes::Bytes;
use futures::StreamExt;
use thiserror::Error;
use tokio::sync::watch;
use tracing::debug;

use crate::cancel::CancelHandle;
use crate::decode::{DecodeError, Utf8Decoder};
use crate::source::{BoxError, ByteStream, StreamSource};
use crate::sse::{extract_fragment, is_done_marker, parse_sse_line, DATA_PREFIX};

/// Errors that can end a parse session.
#[derive(Error, Debug)]
pub enum AssembleError {
    #[error("Stream cancelled")]
    Cancelled,

    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("Failed to read stream: {0}")]
    Read(#[source] BoxError),
}

/// How chunks are framed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Framing {
    /// Plain text until a chunk contains `data:`, SSE from then on.
    #[default]
    Auto,
    /// Every chunk is plain text, even if it contains `data:`.
    Raw,
    /// Every chunk is SSE from the first byte.
    Sse,
}

/// Observable state of an assembler.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    /// Text assembled so far in the current session.
    pub value: String,

    /// Whether a session is reading right now.
    pub streaming: bool,

    /// Message of the error that ended the last session, if any.
    pub error: Option<String>,

    /// Identifier of the session this snapshot belongs to.
    pub session: u64,
}

type FragmentCallback<'a> = Box<dyn FnMut(&str) + Send + 'a>;

/// Per-call options for [`StreamAssembler::parse`].
///
/// # Example
/// ```
/// use streamtext::assembler::{Framing, ParseOptions};
/// use streamtext::cancel::CancelHandle;
///
/// let options = ParseOptions::new()
///     .with_cancel(CancelHandle::new())
///     .with_framing(Framing::Sse)
///     .on_fragment(|fragment| print!("{fragment}"));
/// ```
#[derive(Default)]
pub struct ParseOptions<'a> {
    /// Aborts the session when cancelled
    pub cancel: Option<CancelHandle>,

    /// Invoked once per non-empty fragment, in order
    pub on_fragment: Option<FragmentCallback<'a>>,

    pub framing: Framing,
}

impl<'a> ParseOptions<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the cancellation handle.
    pub fn with_cancel(mut self, cancel: CancelHandle) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// Set the framing mode.
    pub fn with_framing(mut self, framing: Framing) -> Self {
        self.framing = framing;
        self
    }

    /// Set the fragment callback.
    ///
    /// The callback only sees text. A raw chunk that decodes to nothing,
    /// such as one holding only the first bytes of a split character, gets
    /// no call of its own; its text arrives with the next chunk.
    pub fn on_fragment(mut self, callback: impl FnMut(&str) + Send + 'a) -> Self {
        self.on_fragment = Some(Box::new(callback));
        self
    }
}

impl fmt::Debug for ParseOptions<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParseOptions")
            .field("cancel", &self.cancel)
            .field("on_fragment", &self.on_fragment.is_some())
            .field("framing", &self.framing)
            .finish()
    }
}

/// Turns a streamed body into text, one fragment at a time.
///
/// One assembler runs one session at a time; starting a new session (or
/// calling [`reset`](Self::reset)) detaches any older session from the
/// observable state.
///
/// # Example
/// ```
/// use streamtext::assembler::{ParseOptions, StreamAssembler};
/// use streamtext::source::from_chunks;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let assembler = StreamAssembler::new();
/// let body = from_chunks(["data: \"Hello\"\n\n", "data: {\"value\":\" world\"}\n\n", "data: [DONE]\n\n"]);
///
/// let text = assembler.parse(body, ParseOptions::new()).await?;
/// assert_eq!(text, "Hello world");
/// assert_eq!(assembler.snapshot().value, "Hello world");
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct StreamAssembler {
    state: watch::Sender<Snapshot>,
    sessions: AtomicU64,
}

impl Default for StreamAssembler {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamAssembler {
    pub fn new() -> Self {
        let (state, _) = watch::channel(Snapshot::default());
        Self {
            state,
            sessions: AtomicU64::new(0),
        }
    }

    /// Current observable state.
    pub fn snapshot(&self) -> Snapshot {
        self.state.borrow().clone()
    }

    /// Subscribe to state changes.
    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.state.subscribe()
    }

    /// Clear value, streaming flag and error.
    ///
    /// A session still running keeps reading but no longer updates the
    /// observable state.
    pub fn reset(&self) {
        let session = self.next_session();
        self.state.send_replace(Snapshot {
            session,
            ..Snapshot::default()
        });
    }

    /// Read `source` to the end and return the assembled text.
    ///
    /// A source without a body yields an empty string. The body is dropped
    /// before this returns on every path, releasing the underlying
    /// connection. Dropping the returned future ends the session too:
    /// `streaming` is cleared and the text read so far stays observable.
    pub async fn parse<S: StreamSource>(
        &self,
        source: S,
        options: ParseOptions<'_>,
    ) -> Result<String, AssembleError> {
        let session = self.next_session();

        let Some(body) = source.into_body() else {
            debug!(session, "source has no body");
            self.state.send_replace(Snapshot {
                session,
                ..Snapshot::default()
            });
            return Ok(String::new());
        };

        self.state.send_replace(Snapshot {
            streaming: true,
            session,
            ..Snapshot::default()
        });
        let _streaming = StreamingGuard {
            state: &self.state,
            session,
        };
        debug!(session, framing = ?options.framing, "parse session started");

        let ParseOptions {
            cancel,
            mut on_fragment,
            framing,
        } = options;
        let mut run = Session {
            session,
            state: &self.state,
            on_fragment: on_fragment.as_deref_mut(),
            framing,
            sse: framing == Framing::Sse,
            carry: String::new(),
            aggregated: String::new(),
            fragments: 0,
        };

        let result = run.read_to_end(body, cancel.as_ref()).await;
        let Session {
            aggregated,
            fragments,
            ..
        } = run;

        match result {
            Ok(()) => {
                debug!(session, fragments, len = aggregated.len(), "parse session finished");
                self.update(session, |state| state.streaming = false);
                Ok(aggregated)
            }
            Err(e) => {
                debug!(session, fragments, error = %e, "parse session failed");
                let message = e.to_string();
                self.update(session, |state| {
                    state.streaming = false;
                    state.error = Some(message);
                });
                Err(e)
            }
        }
    }

    fn next_session(&self) -> u64 {
        self.sessions.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn update(&self, session: u64, apply: impl FnOnce(&mut Snapshot)) {
        self.state.send_if_modified(|state| {
            if state.session != session {
                return false;
            }
            apply(state);
            true
        });
    }
}

/// Clears `streaming` for its session when a parse ends, including when the
/// parse future is dropped before completing.
struct StreamingGuard<'s> {
    state: &'s watch::Sender<Snapshot>,
    session: u64,
}

impl Drop for StreamingGuard<'_> {
    fn drop(&mut self) {
        let session = self.session;
        self.state.send_if_modified(|state| {
            if state.session != session || !state.streaming {
                return false;
            }
            debug!(session, "parse session dropped while streaming");
            state.streaming = false;
            true
        });
    }
}

/// State of one `parse` call.
struct Session<'s, 'a> {
    session: u64,
    state: &'s watch::Sender<Snapshot>,
    on_fragment: Option<&'s mut (dyn FnMut(&str) + Send + 'a)>,
    framing: Framing,
    /// Latched once a chunk is recognized as SSE
    sse: bool,
    /// Incomplete trailing line held across chunks
    carry: String,
    aggregated: String,
    fragments: usize,
}

impl Session<'_, '_> {
    async fn read_to_end(
        &mut self,
        mut body: ByteStream,
        cancel: Option<&CancelHandle>,
    ) -> Result<(), AssembleError> {
        let mut decoder = Utf8Decoder::new();

        loop {
            let Some(chunk) = next_chunk(&mut body, cancel).await? else {
                break;
            };
            let text = decoder.decode(&chunk)?;
            self.push_text(&text);
        }
        drop(body);

        // A character cut off by the end of the body flushes as U+FFFD:
        // emitted directly in raw mode, appended to the last line in SSE mode.
        let tail = decoder.finish();
        if !tail.is_empty() {
            debug!(session = self.session, "stream ended inside a character");
            self.push_text(&tail);
        }
        self.flush_carry();
        Ok(())
    }

    fn push_text(&mut self, text: &str) {
        if !self.sse && self.framing == Framing::Auto && text.contains(DATA_PREFIX) {
            debug!(session = self.session, "switching to SSE framing");
            self.sse = true;
        }

        if !self.sse {
            self.emit(text);
            return;
        }

        self.carry.push_str(text);
        while let Some(pos) = self.carry.find('\n') {
            let line: String = self.carry.drain(..=pos).collect();
            self.handle_line(&line);
        }
    }

    fn flush_carry(&mut self) {
        if self.carry.is_empty() {
            return;
        }
        let line = std::mem::take(&mut self.carry);
        self.handle_line(&line);
    }

    fn handle_line(&mut self, line: &str) {
        let Some(payload) = parse_sse_line(line) else {
            return;
        };
        if payload.is_empty() || is_done_marker(payload) {
            return;
        }
        let fragment = extract_fragment(payload);
        self.emit(&fragment);
    }

    fn emit(&mut self, fragment: &str) {
        if fragment.is_empty() {
            return;
        }

        self.aggregated.push_str(fragment);
        self.fragments += 1;

        let session = self.session;
        self.state.send_if_modified(|state| {
            if state.session != session {
                return false;
            }
            state.value.push_str(fragment);
            true
        });

        if let Some(callback) = self.on_fragment.as_deref_mut() {
            callback(fragment);
        }
    }
}

/// Read the next chunk, giving up as soon as `cancel` fires.
async fn next_chunk(
    body: &mut ByteStream,
    cancel: Option<&CancelHandle>,
) -> Result<Option<Bytes>, AssembleError> {
    let next = match cancel {
        Some(cancel) => {
            if cancel.is_cancelled() {
                return Err(AssembleError::Cancelled);
            }
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(AssembleError::Cancelled),
                next = body.next() => next,
            }
        }
        None => body.next().await,
    };

    next.transpose().map_err(AssembleError::Read)
}
