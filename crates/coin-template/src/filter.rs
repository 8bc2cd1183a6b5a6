//! Streaming template filter.
//!
//! A [`Filter`] wraps any byte source and replaces every substitution marker
//! (`__._` + 1 to 8 decimal digits + `-`) with the bytes mapped to that index
//! in a [`FilterMap`]. Everything else passes through untouched.
//!
//! The filter is pull-based and resumable: all parse progress lives in the
//! filter itself, so markers may be split across any number of underlying
//! reads and the caller may read with any buffer size. Output is identical
//! regardless of how input and output are chunked.

use std::collections::BTreeMap;
use std::fmt;
use std::io::{self, Read};
use std::sync::Arc;

use log::trace;
use thiserror::Error;

/// Size of the internal input buffer on construction.
pub const DEFAULT_BUFFER_SIZE: usize = 8 * 1024;
/// Maximum number of digits in a substitution marker index.
pub const MAX_MARK_DIGITS: usize = 8;
/// Literal that opens a substitution marker.
pub const LEAD_MARKER: &[u8] = b"__._";
/// Literal that closes a substitution marker.
pub const TAIL_MARKER: &[u8] = b"-";

/// Mapping of substitution marker indices to the bytes that replace them.
pub type FilterMap = BTreeMap<u32, Vec<u8>>;

/// Parser state of a filter between reads.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum State {
    /// Copying bytes until the start of a lead marker.
    #[default]
    Seek,
    /// Matching the rest of a lead marker.
    MatchingLead,
    /// Reading index digits.
    CollectingDigits,
    /// Matching the tail marker.
    MatchingTail,
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            State::Seek => "SEEK",
            State::MatchingLead => "MATCHING_LEAD",
            State::CollectingDigits => "COLLECTING_DIGITS",
            State::MatchingTail => "MATCHING_TAIL",
        };
        f.write_str(name)
    }
}

/// Errors that stop a template stream.
///
/// Offsets count bytes consumed from the underlying source.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FilterError {
    /// A byte other than a digit or the tail marker followed the lead marker
    #[error("templating interrupted @{offset}: illegal character {byte:#04x} in template substitution specifier")]
    IllegalCharacter { byte: u8, offset: u64 },
    /// More than [`MAX_MARK_DIGITS`] digits in one marker
    #[error("templating interrupted @{offset}: too many digits in substitution specifier")]
    TooManyDigits { offset: u64 },
    /// The tail marker started but did not complete
    #[error("templating interrupted @{offset}: malformed tail marker")]
    MalformedTail { offset: u64 },
    /// A tail marker directly after the lead marker
    #[error("templating interrupted @{offset}: substitution specifier has no index")]
    MissingIndex { offset: u64 },
    /// The source ended inside a marker
    #[error("templating interrupted @{offset}: template ends inside a substitution specifier")]
    Unterminated { offset: u64 },
    /// The marker index has no entry in the substitution map; reported at the closing tail
    #[error("templating interrupted @{offset}: unknown substitution specifier {index}")]
    UnknownSubstitution { index: u32, offset: u64 },
    /// Internal invariant violation; indicates a bug, not a template problem
    #[error("bad filter state @{offset} {state}: {reason}")]
    BadState { state: State, reason: &'static str, offset: u64 },
}

impl FilterError {
    /// Byte offset in the source at which the error was detected.
    pub fn offset(&self) -> u64 {
        match self {
            FilterError::IllegalCharacter { offset, .. }
            | FilterError::TooManyDigits { offset }
            | FilterError::MalformedTail { offset }
            | FilterError::MissingIndex { offset }
            | FilterError::Unterminated { offset }
            | FilterError::UnknownSubstitution { offset, .. }
            | FilterError::BadState { offset, .. } => *offset,
        }
    }

    /// Recover a filter error from an error returned by [`Filter::read`].
    pub fn from_io(err: &io::Error) -> Option<&FilterError> {
        err.get_ref().and_then(|inner| inner.downcast_ref::<FilterError>())
    }
}

impl From<FilterError> for io::Error {
    fn from(err: FilterError) -> Self {
        io::Error::new(io::ErrorKind::InvalidData, err)
    }
}

/// Parse progress persisted across reads.
#[derive(Debug, Default)]
struct Progress {
    state: State,
    /// Number of marker bytes matched so far in the current lead or tail.
    match_offset: usize,
    /// Index digits collected so far.
    digits: Vec<u8>,
    /// Partially matched lead bytes waiting to be scanned again.
    replay: Vec<u8>,
    /// Substitution bytes that did not fit the caller's buffer.
    pending_out: Vec<u8>,
    pending_out_pos: usize,
}

impl Progress {
    fn clear(&mut self) {
        self.state = State::Seek;
        self.match_offset = 0;
        self.digits.clear();
        self.replay.clear();
        self.pending_out.clear();
        self.pending_out_pos = 0;
    }

    /// Copy pending substitution output into `out`.
    fn drain_pending(&mut self, out: &mut [u8]) -> usize {
        let pending = &self.pending_out[self.pending_out_pos..];
        let n = pending.len().min(out.len());
        out[..n].copy_from_slice(&pending[..n]);
        self.pending_out_pos += n;
        if self.pending_out_pos == self.pending_out.len() {
            self.pending_out.clear();
            self.pending_out_pos = 0;
        }
        n
    }
}

/// Streaming substitution filter over a byte source.
pub struct Filter<R> {
    progress: Progress,
    substitutions: Arc<FilterMap>,
    input: R,
    buf: Vec<u8>,
    buf_pos: usize,
    buf_len: usize,
    bytes_processed: u64,
    eof: bool,
    failure: Option<FilterError>,
}

impl<R> Filter<R> {
    /// Create a filter replacing markers in `input` with `substitutions`.
    pub fn new(input: R, substitutions: impl Into<Arc<FilterMap>>) -> Self {
        Self::with_capacity(input, substitutions, DEFAULT_BUFFER_SIZE)
    }

    /// Create a filter with an explicit initial input buffer size.
    pub fn with_capacity(input: R, substitutions: impl Into<Arc<FilterMap>>, capacity: usize) -> Self {
        Filter {
            progress: Progress::default(),
            substitutions: substitutions.into(),
            input,
            buf: vec![0u8; capacity],
            buf_pos: 0,
            buf_len: 0,
            bytes_processed: 0,
            eof: false,
            failure: None,
        }
    }

    /// Bind a new input source, clearing all parse state.
    ///
    /// The substitution map and the working buffers are kept, so one filter
    /// can be reused across many short streams.
    pub fn reset<S>(self, input: S) -> Filter<S> {
        let Filter { mut progress, substitutions, buf, .. } = self;
        progress.clear();
        Filter {
            progress,
            substitutions,
            input,
            buf,
            buf_pos: 0,
            buf_len: 0,
            bytes_processed: 0,
            eof: false,
            failure: None,
        }
    }

    /// Current parser state.
    pub fn state(&self) -> State {
        self.progress.state
    }

    /// Bytes consumed from the current source so far.
    pub fn bytes_processed(&self) -> u64 {
        self.bytes_processed
    }

    /// The substitution map.
    pub fn substitutions(&self) -> &FilterMap {
        &self.substitutions
    }

    /// Unwrap the input source.
    pub fn into_inner(self) -> R {
        self.input
    }

    /// Next unconsumed input byte, replayed lead bytes first.
    fn peek(&self) -> Option<u8> {
        match self.progress.replay.first() {
            Some(&byte) => Some(byte),
            None if self.buf_pos < self.buf_len => Some(self.buf[self.buf_pos]),
            None => None,
        }
    }

    fn advance(&mut self) {
        if self.progress.replay.is_empty() {
            self.buf_pos += 1;
            self.bytes_processed += 1;
        } else {
            self.progress.replay.remove(0);
        }
    }

    /// Copy literal bytes up to the next lead marker candidate.
    fn copy_through(&mut self, dst: &mut [u8]) -> usize {
        if !self.progress.replay.is_empty() {
            dst[0] = self.progress.replay.remove(0);
            return 1;
        }
        let available = &self.buf[self.buf_pos..self.buf_len];
        let limit = available.len().min(dst.len());
        let run = available[..limit]
            .iter()
            .position(|&b| b == LEAD_MARKER[0])
            .unwrap_or(limit);
        dst[..run].copy_from_slice(&available[..run]);
        self.buf_pos += run;
        self.bytes_processed += run as u64;
        run
    }

    /// Give up on a partial lead match.
    ///
    /// The first matched byte is emitted and the rest are pushed back in
    /// front of the unconsumed input so they can start a new match.
    fn abandon_lead(&mut self, out: &mut [u8], written: &mut usize) {
        let matched = self.progress.match_offset;
        if matched > 0 {
            out[*written] = LEAD_MARKER[0];
            *written += 1;
            self.progress.replay.splice(0..0, LEAD_MARKER[1..matched].iter().copied());
        }
        self.progress.state = State::Seek;
        self.progress.match_offset = 0;
    }

    /// Emit the mapped value for the collected digits.
    ///
    /// `tail_offset` is the input position of the tail that closed the marker.
    fn substitute(&mut self, dst: &mut [u8], tail_offset: u64) -> Result<usize, FilterError> {
        let index = self
            .progress
            .digits
            .iter()
            .fold(0u32, |acc, digit| acc * 10 + u32::from(digit - b'0'));
        self.progress.digits.clear();
        self.progress.state = State::Seek;
        self.progress.match_offset = 0;

        let Some(value) = self.substitutions.get(&index) else {
            return Err(FilterError::UnknownSubstitution { index, offset: tail_offset });
        };
        let n = value.len().min(dst.len());
        dst[..n].copy_from_slice(&value[..n]);
        if n < value.len() {
            self.progress.pending_out.extend_from_slice(&value[n..]);
        }
        Ok(n)
    }

    fn bad_state(&self, reason: &'static str) -> FilterError {
        FilterError::BadState { state: self.progress.state, reason, offset: self.bytes_processed }
    }

    /// Record a fatal error; the filter keeps returning it until reset.
    fn poison(&mut self, err: FilterError) {
        self.progress.state = State::Seek;
        self.progress.match_offset = 0;
        self.progress.digits.clear();
        self.failure = Some(err);
    }

    /// Run the state machine for one byte, writing output at `written`.
    fn step(&mut self, byte: u8, out: &mut [u8], written: &mut usize) -> Result<(), FilterError> {
        match self.progress.state {
            State::Seek => {
                if byte == LEAD_MARKER[0] {
                    self.progress.state = State::MatchingLead;
                    self.progress.match_offset = 0;
                } else {
                    *written += self.copy_through(&mut out[*written..]);
                }
            }
            State::MatchingLead => {
                let offset = self.progress.match_offset;
                if offset >= LEAD_MARKER.len() {
                    return Err(self.bad_state("impossible match offset (too big)"));
                }
                if byte != LEAD_MARKER[offset] {
                    self.abandon_lead(out, written);
                    return Ok(());
                }
                self.advance();
                self.progress.match_offset += 1;
                if self.progress.match_offset == LEAD_MARKER.len() {
                    self.progress.state = State::CollectingDigits;
                    self.progress.digits.clear();
                }
            }
            State::CollectingDigits => {
                if byte.is_ascii_digit() {
                    if self.progress.digits.len() >= MAX_MARK_DIGITS {
                        return Err(FilterError::TooManyDigits { offset: self.bytes_processed });
                    }
                    self.progress.digits.push(byte);
                    self.advance();
                } else if byte == TAIL_MARKER[0] {
                    if self.progress.digits.is_empty() {
                        return Err(FilterError::MissingIndex { offset: self.bytes_processed });
                    }
                    self.progress.state = State::MatchingTail;
                    self.progress.match_offset = 0;
                } else {
                    return Err(FilterError::IllegalCharacter { byte, offset: self.bytes_processed });
                }
            }
            State::MatchingTail => {
                let offset = self.progress.match_offset;
                if offset >= TAIL_MARKER.len() {
                    return Err(self.bad_state("impossible match offset (too big)"));
                }
                // unlike the lead, a broken tail is fatal
                if byte != TAIL_MARKER[offset] {
                    return Err(FilterError::MalformedTail { offset: self.bytes_processed });
                }
                let tail_offset = self.bytes_processed;
                self.advance();
                self.progress.match_offset += 1;
                if self.progress.match_offset == TAIL_MARKER.len() {
                    *written += self.substitute(&mut out[*written..], tail_offset)?;
                }
            }
        }
        Ok(())
    }

    /// Handle an exhausted source. Returns `true` if replayed bytes remain.
    fn finish(&mut self, out: &mut [u8], written: &mut usize) -> Result<bool, FilterError> {
        match self.progress.state {
            State::Seek => Ok(false),
            State::MatchingLead => {
                self.abandon_lead(out, written);
                Ok(true)
            }
            State::CollectingDigits | State::MatchingTail => {
                Err(FilterError::Unterminated { offset: self.bytes_processed })
            }
        }
    }
}

impl<R: Read> Filter<R> {
    /// Refill the input buffer from the source.
    ///
    /// The buffer is first grown to at least the caller's requested size.
    fn fill(&mut self, requested: usize) -> io::Result<()> {
        if self.buf.len() < requested {
            self.buf.resize(requested, 0);
        }
        loop {
            match self.input.read(&mut self.buf) {
                Ok(0) => {
                    self.eof = true;
                    return Ok(());
                }
                Ok(n) => {
                    trace!("template filter refilled {} bytes at offset {}", n, self.bytes_processed);
                    self.buf_pos = 0;
                    self.buf_len = n;
                    return Ok(());
                }
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => return Err(err),
            }
        }
    }
}

impl<R: Read> Read for Filter<R> {
    fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
        if out.is_empty() {
            return Ok(0);
        }
        if let Some(err) = &self.failure {
            return Err(err.clone().into());
        }

        let mut written = self.progress.drain_pending(out);

        while written < out.len() {
            let byte = match self.peek() {
                Some(byte) => byte,
                None if self.eof => match self.finish(out, &mut written) {
                    Ok(true) => continue,
                    Ok(false) => break,
                    Err(err) => {
                        self.poison(err);
                        break;
                    }
                },
                None => {
                    // hand back what is ready rather than block on the source
                    if written > 0 {
                        break;
                    }
                    self.fill(out.len())?;
                    continue;
                }
            };
            if let Err(err) = self.step(byte, out, &mut written) {
                self.poison(err);
                break;
            }
        }

        if written == 0 {
            if let Some(err) = &self.failure {
                return Err(err.clone().into());
            }
        }
        Ok(written)
    }
}
