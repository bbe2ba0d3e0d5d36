//! HTTP body processors: a fixed-length byte counter and a chunked
//! transfer-encoding decoder, sharing one `process`/callback contract so the
//! message parser can drive either behind a trait object.

use crate::error::ParseError;
use crate::newline::{find_newline, starts_with_newline};

/// Something that can consume body bytes incrementally and report data,
/// errors, and completion through callbacks, mirroring [`crate::MessageParser`]'s
/// own `process`/event contract.
pub trait BodyProcessor {
    /// Feed the next chunk of body bytes. Returns the number of bytes
    /// consumed, or `-1` if an error occurred (in which case the processor
    /// is absorbing: every further call also returns `-1`).
    fn process(&mut self, chunk: &[u8], allow_lf: bool) -> i64;

    /// Register the callback invoked with each span of body bytes as it
    /// becomes available.
    fn on_data(&mut self, callback: Box<dyn FnMut(&[u8])>);

    /// Register the callback invoked once, the first time `process` fails.
    fn on_error(&mut self, callback: Box<dyn FnMut(&ParseError)>);

    /// Register the callback invoked once the body has been fully received.
    fn on_finished(&mut self, callback: Box<dyn FnMut()>);
}

/// Tracks a body of known length (from a `Content-Length` header).
///
/// Invariant: `0 <= received_len <= expected_len`; `finished` only becomes
/// true once, when `received_len == expected_len`.
pub struct FixedLenProcessor {
    expected_len: u64,
    received_len: u64,
    finished: bool,
    on_data: Option<Box<dyn FnMut(&[u8])>>,
    on_error: Option<Box<dyn FnMut(&ParseError)>>,
    on_finished: Option<Box<dyn FnMut()>>,
}

impl FixedLenProcessor {
    /// Create a processor expecting exactly `body_len` bytes.
    pub fn new(body_len: u64) -> Self {
        Self {
            expected_len: body_len,
            received_len: 0,
            finished: false,
            on_data: None,
            on_error: None,
            on_finished: None,
        }
    }

    /// Number of bytes received so far.
    pub fn received_len(&self) -> u64 {
        self.received_len
    }

    /// Total body length this processor expects.
    pub fn expected_len(&self) -> u64 {
        self.expected_len
    }
}

impl BodyProcessor for FixedLenProcessor {
    fn process(&mut self, chunk: &[u8], _allow_lf: bool) -> i64 {
        if self.finished {
            if let Some(cb) = &mut self.on_error {
                cb(&ParseError::Done);
            }
            return -1;
        }

        let chunk_len = chunk.len() as u64;
        let nprocessed = if chunk_len + self.received_len <= self.expected_len {
            self.received_len += chunk_len;
            if let Some(cb) = &mut self.on_data {
                cb(chunk);
            }
            chunk_len
        } else {
            let remaining = self.expected_len as i64 - self.received_len as i64;
            if remaining < 0 {
                if let Some(cb) = &mut self.on_error {
                    cb(&ParseError::Length("body length is negative".into()));
                }
                return -1;
            }
            let remaining = remaining as u64;
            self.received_len += remaining;
            if let Some(cb) = &mut self.on_data {
                cb(&chunk[..remaining as usize]);
            }
            remaining
        };

        if self.received_len == self.expected_len {
            self.finished = true;
            if let Some(cb) = &mut self.on_finished {
                cb();
            }
        }

        nprocessed as i64
    }

    fn on_data(&mut self, callback: Box<dyn FnMut(&[u8])>) {
        self.on_data = Some(callback);
    }

    fn on_error(&mut self, callback: Box<dyn FnMut(&ParseError)>) {
        self.on_error = Some(callback);
    }

    fn on_finished(&mut self, callback: Box<dyn FnMut()>) {
        self.on_finished = Some(callback);
    }
}

/// Decodes a chunked-transfer-encoded body. Imposes no limit on the number
/// of chunks, but each chunk's size is bounded by [`ChunkedProcessor::MAX_CHUNK_SIZE`].
///
/// Chunk extensions are captured verbatim, never parsed or validated, and
/// bounded by [`ChunkedProcessor::MAX_CHUNK_EXTENSION_SIZE`] per chunk. There is no
/// trailer-section state: once the zero-chunk's terminating newline is
/// consumed, `finished` fires and any bytes after it are left unconsumed.
pub struct ChunkedProcessor {
    finished: bool,
    had_error: bool,
    next_chunk_size: Option<u64>,
    expecting_extensions: bool,
    extensions: Vec<String>,
    on_data: Option<Box<dyn FnMut(&[u8])>>,
    on_error: Option<Box<dyn FnMut(&ParseError)>>,
    on_finished: Option<Box<dyn FnMut()>>,
}

impl ChunkedProcessor {
    /// Largest accepted single chunk size (16 MiB).
    pub const MAX_CHUNK_SIZE: u64 = 16_777_216;
    /// Chunk-size lines longer than this many bytes without a terminator
    /// are rejected outright rather than held as incomplete.
    pub const MAX_CHUNK_SIZE_DIGITS: usize = 7;
    /// Chunk-extension text longer than this many bytes without a
    /// terminator is rejected outright rather than held as incomplete.
    pub const MAX_CHUNK_EXTENSION_SIZE: usize = 4096;

    /// Create a processor with no chunk currently in progress.
    pub fn new() -> Self {
        Self {
            finished: false,
            had_error: false,
            next_chunk_size: None,
            expecting_extensions: false,
            extensions: Vec::new(),
            on_data: None,
            on_error: None,
            on_finished: None,
        }
    }

    /// Raw extension strings accumulated so far, one per chunk that carried
    /// a non-empty extension section, in chunk order.
    pub fn extensions(&self) -> &[String] {
        &self.extensions
    }

    fn raise(&mut self, err: ParseError) {
        if let Some(cb) = &mut self.on_error {
            cb(&err);
        }
        self.had_error = true;
    }

    /// Parse one chunk-size line starting at `buf`. Returns the chunk size,
    /// bytes consumed, and whether extensions follow, or `None` if `buf`
    /// does not yet contain a complete size line.
    fn parse_chunk_size(
        buf: &[u8],
        allow_lf: bool,
    ) -> Result<Option<(u64, usize, bool)>, ParseError> {
        let semi_index = buf.iter().position(|&b| b == b';');
        let newline = find_newline(buf, allow_lf)?;

        if semi_index.is_none() && newline.is_none() {
            if buf.len() > Self::MAX_CHUNK_SIZE_DIGITS {
                return Err(ParseError::InvalidChunkSize(
                    "chunk size too large".into(),
                ));
            }
            return Ok(None);
        }

        // Extensions follow only if the semicolon precedes the newline, or
        // no newline has arrived yet.
        let has_extensions_first = match (semi_index, &newline) {
            (Some(semi), Some((nl_idx, _))) => semi < *nl_idx,
            (Some(_), None) => true,
            (None, _) => false,
        };

        let (nparsed, raw_chunk_size, has_chunk_extensions) = if has_extensions_first {
            let semi = semi_index.unwrap();
            (semi + 1, &buf[..semi], true)
        } else {
            let (nl_idx, kind) = newline.unwrap();
            (nl_idx + kind.len(), &buf[..nl_idx], false)
        };

        if !crate::charclass::are_hex_digits(raw_chunk_size) {
            return Err(ParseError::InvalidChunkSize(
                "chunk size must only contain hexadecimal digits".into(),
            ));
        }
        let as_str = std::str::from_utf8(raw_chunk_size)
            .map_err(|_| ParseError::InvalidChunkSize("chunk size too large".into()))?;
        let chunk_size = u64::from_str_radix(as_str, 16)
            .map_err(|_| ParseError::InvalidChunkSize("chunk size too large".into()))?;
        if chunk_size > Self::MAX_CHUNK_SIZE {
            return Err(ParseError::InvalidChunkSize(
                "chunk size too large".into(),
            ));
        }

        Ok(Some((chunk_size, nparsed, has_chunk_extensions)))
    }

    /// Capture chunk-extension text up to the next newline, verbatim.
    /// Returns the extension text and bytes consumed, or `None` if `buf`
    /// does not yet contain a terminating newline.
    fn recv_chunk_extensions(
        buf: &[u8],
        allow_lf: bool,
    ) -> Result<Option<(String, usize)>, ParseError> {
        let Some((nl_idx, kind)) = find_newline(buf, allow_lf)? else {
            if buf.len() > Self::MAX_CHUNK_EXTENSION_SIZE {
                return Err(ParseError::InvalidChunkExtensions(
                    "chunk extensions too large".into(),
                ));
            }
            return Ok(None);
        };

        let raw = &buf[..nl_idx];
        let text = String::from_utf8(raw.to_vec()).map_err(|_| {
            ParseError::InvalidChunkExtensions("chunk extensions are not valid UTF-8".into())
        })?;
        Ok(Some((text, nl_idx + kind.len())))
    }

    /// Consume the payload for the chunk currently in progress, plus its
    /// terminating newline. Returns bytes consumed, or `None` if the
    /// payload or its terminator is not yet fully buffered.
    fn process_chunk(&mut self, buf: &[u8], allow_lf: bool) -> Result<Option<usize>, ParseError> {
        let Some(size) = self.next_chunk_size else {
            return Err(ParseError::InvalidChunk(
                "chunk payload requested before its size was known".into(),
            ));
        };
        let size = size as usize;
        if buf.len() < size {
            return Ok(None);
        }

        let payload = &buf[..size];
        let after_payload = &buf[size..];
        let Some(newline) = starts_with_newline(after_payload, allow_lf)? else {
            return Ok(None);
        };
        let Some(kind) = newline else {
            return Err(ParseError::InvalidChunk(
                "expected newline to terminate chunk".into(),
            ));
        };

        let nprocessed = size + kind.len();
        self.next_chunk_size = None;

        if size == 0 {
            self.finished = true;
            if let Some(cb) = &mut self.on_finished {
                cb();
            }
        } else if let Some(cb) = &mut self.on_data {
            cb(payload);
        }

        Ok(Some(nprocessed))
    }

    fn process_inner(&mut self, chunk: &[u8], allow_lf: bool) -> Result<i64, ParseError> {
        let mut nprocessed = 0usize;
        let mut buf = chunk;

        while !self.finished {
            if self.next_chunk_size.is_none() {
                match Self::parse_chunk_size(buf, allow_lf)? {
                    Some((size, parsed, has_extensions)) => {
                        self.next_chunk_size = Some(size);
                        self.expecting_extensions = has_extensions;
                        nprocessed += parsed;
                        buf = &buf[parsed..];
                    }
                    None => break,
                }
            }
            if self.next_chunk_size.is_none() {
                break;
            }

            if self.expecting_extensions {
                match Self::recv_chunk_extensions(buf, allow_lf)? {
                    Some((extension, parsed)) => {
                        self.expecting_extensions = false;
                        if !extension.is_empty() {
                            self.extensions.push(extension);
                        }
                        nprocessed += parsed;
                        buf = &buf[parsed..];
                    }
                    None => break,
                }
            }
            if self.expecting_extensions {
                break;
            }

            match self.process_chunk(buf, allow_lf)? {
                Some(parsed) => {
                    nprocessed += parsed;
                    buf = &buf[parsed..];
                }
                None => break,
            }
        }

        Ok(nprocessed as i64)
    }
}

impl Default for ChunkedProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl BodyProcessor for ChunkedProcessor {
    fn process(&mut self, chunk: &[u8], allow_lf: bool) -> i64 {
        if self.finished {
            self.raise(ParseError::Done);
            return -1;
        }
        if self.had_error {
            return -1;
        }

        match self.process_inner(chunk, allow_lf) {
            Ok(n) => n,
            Err(err) => {
                self.raise(err);
                -1
            }
        }
    }

    fn on_data(&mut self, callback: Box<dyn FnMut(&[u8])>) {
        self.on_data = Some(callback);
    }

    fn on_error(&mut self, callback: Box<dyn FnMut(&ParseError)>) {
        self.on_error = Some(callback);
    }

    fn on_finished(&mut self, callback: Box<dyn FnMut()>) {
        self.on_finished = Some(callback);
    }
}
