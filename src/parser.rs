//! The central state machine: start line and header parsing, dispatching
//! body bytes to a caller-supplied [`BodyProcessor`].

use std::cell::RefCell;
use std::rc::Rc;

use crate::body::BodyProcessor;
use crate::charclass::{are_digits, is_obs_text, is_token, is_uri_char, is_vchar_or_whsp};
use crate::error::ParseError;
use crate::event::{Event, EventEmitter, EventKind, ListenerId};
use crate::newline::{find_newline, starts_with_newline};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Configurable limits for the message parser. All sizes are in bytes.
#[derive(Debug, Clone)]
pub struct ParserConfig {
    /// Maximum length of the request method token (default: 64).
    pub max_req_method_len: usize,
    /// Maximum length of the request URI (default: 65 535).
    pub max_uri_len: usize,
    /// Maximum length of a response reason phrase (default: 1 024).
    pub max_reason_len: usize,
    /// Maximum length of a single header field name (default: 128).
    pub max_header_name_len: usize,
    /// Maximum length of a single header field value (default: 16 384).
    pub max_header_val_len: usize,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            max_req_method_len: 64,
            max_uri_len: 65_535,
            max_reason_len: 1_024,
            max_header_name_len: 128,
            max_header_val_len: 16_384,
        }
    }
}

// ---------------------------------------------------------------------------
// Strictness and parser state
// ---------------------------------------------------------------------------

/// How strictly line terminators are enforced. Ordered: `Lenient < Normal <
/// Strict`. Only `Strict` forbids a bare LF in place of CRLF.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum Strictness {
    Lenient = 1,
    #[default]
    Normal = 2,
    Strict = 3,
}

/// The message parser's current position in the grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParserState {
    Empty,
    Done,
    HadError,
    ReceivingMethod,
    ReceivingUri,
    ReceivingStatusCode,
    ReceivingReason,
    ParsingVersion,
    ParsingHeaderName,
    ParsingHeaderValue,
    DoneStartline,
    DoneHeaders,
    ProcessingBody,
}

// ---------------------------------------------------------------------------
// Byte-scanning helpers shared by the request-line / status-line / header
// stages. None of these retain any input; every captured byte is copied
// into an owned `String` before being handed back.
// ---------------------------------------------------------------------------

/// Scan for `sep`, slice the token before it, and validate it. Shared shape
/// behind request method / request URI / header name parsing: all three are
/// "a token, then a single separator byte, bounded by a configurable
/// length".
fn recv_until_separator(
    buf: &[u8],
    sep: u8,
    limit: usize,
    is_valid: fn(&[u8]) -> bool,
    make_err: fn(String) -> ParseError,
) -> Result<Option<(String, usize)>, ParseError> {
    let Some(idx) = buf.iter().position(|&b| b == sep) else {
        if buf.len() > limit {
            return Err(make_err("exceeds configured length limit".into()));
        }
        return Ok(None);
    };

    if idx == 0 {
        return Err(make_err(format!(
            "expected token, received {:?} as the first byte",
            sep as char
        )));
    }

    let nparsed = idx + 1;
    if nparsed > limit {
        return Err(make_err("exceeds configured length limit".into()));
    }

    let token = &buf[..idx];
    if !is_valid(token) {
        return Err(make_err("invalid characters".into()));
    }

    Ok(Some((
        String::from_utf8_lossy(token).into_owned(),
        nparsed,
    )))
}

/// `HTTP/1.0` or `HTTP/1.1`, always exactly 8 bytes when present.
fn parse_version(buf: &[u8]) -> Result<Option<(u8, u8)>, ParseError> {
    if buf.len() < 8 {
        return Ok(None);
    }
    if &buf[..7] != b"HTTP/1." {
        return Err(ParseError::InvalidVersion(format!(
            "expected HTTP version start, received {:?}",
            String::from_utf8_lossy(&buf[..7])
        )));
    }
    match buf[7] {
        b'0' => Ok(Some((1, 0))),
        b'1' => Ok(Some((1, 1))),
        other => Err(ParseError::InvalidVersion(format!(
            "expected 0 or 1 for HTTP minor version, received {:?}",
            other as char
        ))),
    }
}

fn recv_status_code(buf: &[u8]) -> Result<Option<u16>, ParseError> {
    if buf.len() < 3 {
        return Ok(None);
    }
    let raw = &buf[..3];
    if !are_digits(raw) {
        return Err(ParseError::InvalidStatus(
            "expected only digits in status code".into(),
        ));
    }
    let code = raw
        .iter()
        .fold(0u16, |acc, &b| acc * 10 + (b - b'0') as u16);
    Ok(Some(code))
}

/// Python's `bytes.strip()` whitespace set: space, tab, LF, CR, FF, VT.
fn trim_ascii_ws(buf: &[u8]) -> &[u8] {
    fn is_ws(b: u8) -> bool {
        matches!(b, b' ' | b'\t' | b'\n' | b'\r' | 0x0b | 0x0c)
    }
    let start = buf.iter().position(|&b| !is_ws(b)).unwrap_or(buf.len());
    let end = buf.iter().rposition(|&b| !is_ws(b)).map_or(0, |i| i + 1);
    if start >= end {
        &[]
    } else {
        &buf[start..end]
    }
}

/// Validate `raw` as VCHAR-or-whitespace; if that fails, fall back to
/// treating it as obsolete text (0x80-0xFF), in which case the emitted
/// value is the empty string -- matching the source parser's historical
/// behavior. `None` means neither check passed.
fn decode_vchar_or_obsolete(raw: &[u8]) -> Option<String> {
    if is_vchar_or_whsp(raw) {
        return Some(String::from_utf8_lossy(raw).into_owned());
    }
    let remainder: Vec<u8> = raw
        .iter()
        .copied()
        .filter(|&b| !(b == b' ' || b == b'\t' || (0x21..=0x7e).contains(&b)))
        .collect();
    if is_obs_text(&remainder) {
        Some(String::new())
    } else {
        None
    }
}

/// Scan for the next newline, bounding how long we'll wait for one. Shared
/// by the reason phrase and header value stages.
fn scan_newline_terminated(
    buf: &[u8],
    allow_lf: bool,
    max_len: usize,
    too_large: fn(String) -> ParseError,
) -> Result<Option<(usize, usize)>, ParseError> {
    match find_newline(buf, allow_lf)? {
        None => {
            if buf.len() > max_len {
                Err(too_large("exceeds configured length limit".into()))
            } else {
                Ok(None)
            }
        }
        Some((idx, kind)) => {
            if idx > max_len {
                return Err(too_large("exceeds configured length limit".into()));
            }
            Ok(Some((idx, idx + kind.len())))
        }
    }
}

fn recv_reason(
    buf: &[u8],
    allow_lf: bool,
    max_len: usize,
) -> Result<Option<(String, usize)>, ParseError> {
    let Some((idx, consumed)) =
        scan_newline_terminated(buf, allow_lf, max_len, ParseError::InvalidStatus)?
    else {
        return Ok(None);
    };
    let trimmed = trim_ascii_ws(&buf[..idx]);
    let text = decode_vchar_or_obsolete(trimmed).ok_or_else(|| {
        ParseError::InvalidStatus("invalid characters in response reason phrase".into())
    })?;
    Ok(Some((text, consumed)))
}

fn recv_header_value(
    buf: &[u8],
    allow_lf: bool,
    max_len: usize,
) -> Result<Option<(String, usize)>, ParseError> {
    let Some((idx, consumed)) =
        scan_newline_terminated(buf, allow_lf, max_len, ParseError::InvalidHeaderVal)?
    else {
        return Ok(None);
    };
    let trimmed = trim_ascii_ws(&buf[..idx]);
    let text = decode_vchar_or_obsolete(trimmed)
        .ok_or_else(|| ParseError::InvalidHeaderVal("invalid characters in header value".into()))?;
    Ok(Some((text, consumed)))
}

/// Skip a leading run of empty lines (any mix of CRLF, or bare LF when
/// `allow_lf`). Returns the number of bytes to skip before non-empty-line
/// data begins, or `None` if `buf` consists entirely of empty lines (in
/// which case the whole buffer should be treated as consumed-but-paused,
/// not advanced into the request line with nothing left to parse).
fn skip_empty_lines(buf: &[u8], allow_lf: bool) -> Result<Option<usize>, ParseError> {
    let mut pos = 0;
    loop {
        if buf[pos..].starts_with(b"\r") {
            if !buf[pos..].starts_with(b"\r\n") {
                return Err(ParseError::Newline(
                    "expected CRLF, received bare CR".into(),
                ));
            }
            pos += 2;
            continue;
        }
        if buf[pos..].starts_with(b"\n") {
            if !allow_lf {
                return Err(ParseError::Newline("CRLF is required".into()));
            }
            pos += 1;
            continue;
        }
        break;
    }
    if pos == buf.len() {
        Ok(None)
    } else {
        Ok(Some(pos))
    }
}

// ---------------------------------------------------------------------------
// MessageParser
// ---------------------------------------------------------------------------

/// An incremental, event-driven HTTP/1.1 start-line-and-headers parser.
///
/// Feed it byte fragments via [`MessageParser::process`] in any split; it
/// returns how many bytes it consumed and emits events for each field as
/// soon as it becomes available. Once headers finish, if [`Self::has_body`]
/// is set, the caller must have already wired a [`BodyProcessor`] via
/// [`Self::body_processor`] -- remaining bytes are then forwarded to it.
pub struct MessageParser {
    strictness: Strictness,
    is_response: bool,
    state: ParserState,
    has_body: bool,
    body_processor: Option<Box<dyn BodyProcessor>>,
    emitter: EventEmitter<EventKind, Event>,
    config: ParserConfig,
}

impl MessageParser {
    /// Create a parser for requests (or responses, if `is_response`) using
    /// default limits.
    pub fn new(strictness: Strictness, is_response: bool) -> Self {
        Self::with_config(strictness, is_response, ParserConfig::default())
    }

    /// Create a parser with custom configured limits.
    pub fn with_config(strictness: Strictness, is_response: bool, config: ParserConfig) -> Self {
        Self {
            strictness,
            is_response,
            state: ParserState::Empty,
            has_body: false,
            body_processor: None,
            emitter: EventEmitter::new(),
            config,
        }
    }

    /// The parser's current state.
    pub fn state(&self) -> ParserState {
        self.state
    }

    /// `true` once the message has been fully parsed (`process` will never
    /// consume more input).
    pub fn finished(&self) -> bool {
        self.state == ParserState::Done
    }

    /// Get, or if `flag` is `Some`, set whether this message has a body.
    /// Must be set before headers finish if the message does carry one.
    pub fn has_body(&mut self, flag: Option<bool>) -> bool {
        if let Some(flag) = flag {
            self.has_body = flag;
        }
        self.has_body
    }

    /// Get, or if `processor` is `Some`, set the body processor used once
    /// headers finish.
    pub fn body_processor<'a>(
        &'a mut self,
        processor: Option<Box<dyn BodyProcessor>>,
    ) -> Option<&'a mut (dyn BodyProcessor + 'a)> {
        if let Some(processor) = processor {
            self.body_processor = Some(processor);
        }
        match &mut self.body_processor {
            Some(p) => Some(p.as_mut()),
            None => None,
        }
    }

    /// Register a listener that fires on every future occurrence of `kind`.
    pub fn on(&mut self, kind: EventKind, callback: Box<dyn FnMut(&Event)>) -> ListenerId {
        self.emitter.on(kind, callback)
    }

    /// Register a listener that fires once, then is removed.
    pub fn once(&mut self, kind: EventKind, callback: Box<dyn FnMut(&Event)>) -> ListenerId {
        self.emitter.once(kind, callback)
    }

    /// Remove a previously-registered listener.
    pub fn off(&mut self, kind: EventKind, id: ListenerId) {
        self.emitter.off(kind, id)
    }

    /// Return to [`ParserState::Empty`] without touching `strictness`,
    /// `is_response`, or the listener table.
    pub fn reset(&mut self) {
        self.has_body = false;
        self.body_processor = None;
        self.state = ParserState::Empty;
    }

    fn allow_lf(&self) -> bool {
        self.strictness != Strictness::Strict
    }

    fn raise_error(&mut self, err: ParseError) {
        self.state = ParserState::HadError;
        self.emitter.emit(EventKind::Error, &Event::Error(err));
    }

    /// Feed the next fragment of the message. Returns the number of bytes
    /// consumed, or `-1` on error (after which the parser is absorbing:
    /// every further call also returns `-1` until [`Self::reset`]).
    pub fn process(&mut self, bytes: &[u8]) -> i64 {
        if self.state == ParserState::Done {
            self.raise_error(ParseError::Done);
            return -1;
        }
        if self.state == ParserState::HadError {
            return -1;
        }

        let mut buf = bytes;
        let mut prefix_consumed: i64 = 0;

        if self.state == ParserState::Empty {
            if self.is_response {
                self.state = ParserState::ParsingVersion;
            } else {
                match skip_empty_lines(buf, self.allow_lf()) {
                    Ok(None) => return bytes.len() as i64,
                    Ok(Some(pos)) => {
                        self.state = ParserState::ReceivingMethod;
                        buf = &buf[pos..];
                        prefix_consumed = pos as i64;
                    }
                    Err(err) => {
                        self.raise_error(err);
                        return -1;
                    }
                }
            }
        }

        match self.process_buf(buf) {
            Ok(n) => prefix_consumed + n,
            Err(err) => {
                self.raise_error(err);
                -1
            }
        }
    }

    fn process_buf(&mut self, buf: &[u8]) -> Result<i64, ParseError> {
        let mut nparsed: i64 = 0;
        let mut rest = buf;

        if self.is_response
            && matches!(
                self.state,
                ParserState::ParsingVersion
                    | ParserState::ReceivingStatusCode
                    | ParserState::ReceivingReason
            )
        {
            let consumed = self.process_status_line(rest)?;
            nparsed += consumed as i64;
            rest = &rest[consumed..];
        } else if matches!(
            self.state,
            ParserState::ReceivingMethod | ParserState::ReceivingUri | ParserState::ParsingVersion
        ) {
            let consumed = self.process_request_line(rest)?;
            nparsed += consumed as i64;
            rest = &rest[consumed..];
        }

        if self.state == ParserState::DoneStartline {
            self.emitter
                .emit(EventKind::StartlineComplete, &Event::StartlineComplete);
            self.state = ParserState::ParsingHeaderName;
        }

        if matches!(
            self.state,
            ParserState::ParsingHeaderName | ParserState::ParsingHeaderValue
        ) {
            let consumed = self.process_headers(rest)?;
            nparsed += consumed as i64;
            rest = &rest[consumed..];
        }

        if self.state == ParserState::DoneHeaders {
            if self.has_body {
                if self.body_processor.is_none() {
                    return Err(ParseError::BodyProcessorRequired);
                }
                self.state = ParserState::ProcessingBody;
            } else {
                self.state = ParserState::Done;
            }
        }

        if self.state == ParserState::ProcessingBody {
            let allow_lf = self.allow_lf();
            let consumed = self.drive_body_processor(rest, allow_lf)?;
            nparsed += consumed;
        }

        if self.state == ParserState::Done {
            self.emitter
                .emit(EventKind::MessageComplete, &Event::MessageComplete);
        }

        Ok(nparsed)
    }

    fn process_request_line(&mut self, buf: &[u8]) -> Result<usize, ParseError> {
        let allow_lf = self.allow_lf();
        let mut nparsed = 0usize;
        let mut rest = buf;

        if self.state == ParserState::ReceivingMethod {
            match recv_until_separator(
                rest,
                b' ',
                self.config.max_req_method_len,
                is_token,
                ParseError::InvalidToken,
            )? {
                None => return Ok(nparsed),
                Some((method, consumed)) => {
                    nparsed += consumed;
                    rest = &rest[consumed..];
                    self.emitter
                        .emit(EventKind::ReqMethod, &Event::ReqMethod(method));
                    self.state = ParserState::ReceivingUri;
                }
            }
        }

        if self.state == ParserState::ReceivingUri {
            match recv_until_separator(
                rest,
                b' ',
                self.config.max_uri_len,
                is_uri_char,
                ParseError::InvalidUri,
            )? {
                None => return Ok(nparsed),
                Some((uri, consumed)) => {
                    nparsed += consumed;
                    rest = &rest[consumed..];
                    self.emitter.emit(EventKind::ReqUri, &Event::ReqUri(uri));
                    self.state = ParserState::ParsingVersion;
                }
            }
        }

        if self.state == ParserState::ParsingVersion {
            match parse_version(rest)? {
                None => return Ok(nparsed),
                Some((major, minor)) => {
                    let after_version = &rest[8..];
                    match starts_with_newline(after_version, allow_lf)? {
                        None => return Ok(nparsed),
                        Some(None) => {
                            return Err(ParseError::InvalidVersion(
                                "expected newline after version".into(),
                            ));
                        }
                        Some(Some(nl)) => {
                            nparsed += 8 + nl.len();
                            self.emitter
                                .emit(EventKind::Version, &Event::Version(major, minor));
                            self.state = ParserState::DoneStartline;
                        }
                    }
                }
            }
        }

        Ok(nparsed)
    }

    fn process_status_line(&mut self, buf: &[u8]) -> Result<usize, ParseError> {
        let allow_lf = self.allow_lf();
        let mut nparsed = 0usize;
        let mut rest = buf;

        if self.state == ParserState::ParsingVersion {
            match parse_version(rest)? {
                None => return Ok(nparsed),
                Some((major, minor)) => {
                    let after = &rest[8..];
                    match after.first() {
                        Some(b' ') => {}
                        Some(&other) => {
                            return Err(ParseError::UnexpectedChar(format!(
                                "expected space after version, received {:?}",
                                other as char
                            )));
                        }
                        None => return Ok(nparsed),
                    }
                    nparsed += 1 + 8;
                    rest = &after[1..];
                    self.emitter
                        .emit(EventKind::Version, &Event::Version(major, minor));
                    self.state = ParserState::ReceivingStatusCode;
                }
            }
        }

        if self.state == ParserState::ReceivingStatusCode {
            match recv_status_code(rest)? {
                None => return Ok(nparsed),
                Some(code) => {
                    nparsed += 3;
                    rest = &rest[3..];
                    self.emitter
                        .emit(EventKind::StatusCode, &Event::StatusCode(code));
                    self.state = ParserState::ReceivingReason;
                }
            }
        }

        if self.state == ParserState::ReceivingReason {
            match starts_with_newline(rest, allow_lf)? {
                None => return Ok(nparsed),
                Some(Some(nl)) => {
                    nparsed += nl.len();
                    self.emitter
                        .emit(EventKind::Reason, &Event::Reason(String::new()));
                    self.state = ParserState::DoneStartline;
                }
                Some(None) => {
                    match rest.first() {
                        Some(b' ') => {}
                        Some(&other) => {
                            return Err(ParseError::UnexpectedChar(format!(
                                "expected space before reason phrase, received {:?}",
                                other as char
                            )));
                        }
                        None => return Ok(nparsed),
                    }
                    let after_space = &rest[1..];
                    match recv_reason(after_space, allow_lf, self.config.max_reason_len)? {
                        None => return Ok(nparsed),
                        Some((reason, consumed)) => {
                            nparsed += consumed + 1;
                            self.emitter.emit(EventKind::Reason, &Event::Reason(reason));
                            self.state = ParserState::DoneStartline;
                        }
                    }
                }
            }
        }

        Ok(nparsed)
    }

    fn process_headers(&mut self, buf: &[u8]) -> Result<usize, ParseError> {
        let allow_lf = self.allow_lf();
        let mut nparsed = 0usize;
        let mut rest = buf;
        let mut headers_over = false;

        loop {
            if self.state == ParserState::ParsingHeaderName {
                match starts_with_newline(rest, allow_lf)? {
                    None => break,
                    Some(Some(nl)) => {
                        nparsed += nl.len();
                        headers_over = true;
                        break;
                    }
                    Some(None) => {
                        match recv_until_separator(
                            rest,
                            b':',
                            self.config.max_header_name_len,
                            is_token,
                            ParseError::InvalidToken,
                        )? {
                            None => break,
                            Some((name, consumed)) => {
                                nparsed += consumed;
                                rest = &rest[consumed..];
                                self.emitter
                                    .emit(EventKind::HeaderName, &Event::HeaderName(name));
                                self.state = ParserState::ParsingHeaderValue;
                            }
                        }
                    }
                }
            }

            if self.state == ParserState::ParsingHeaderValue {
                match recv_header_value(rest, allow_lf, self.config.max_header_val_len)? {
                    None => break,
                    Some((value, consumed)) => {
                        nparsed += consumed;
                        rest = &rest[consumed..];
                        self.emitter
                            .emit(EventKind::HeaderValue, &Event::HeaderValue(value));
                        self.state = ParserState::ParsingHeaderName;
                    }
                }
            } else {
                break;
            }
        }

        if headers_over {
            self.emitter
                .emit(EventKind::HeadersComplete, &Event::HeadersComplete);
            self.state = ParserState::DoneHeaders;
        }

        Ok(nparsed)
    }

    /// Wire temporary callbacks into the body processor for the duration of
    /// one `process` call, forward `buf` to it, then translate whatever it
    /// reported back into our own events and state. Callbacks are rewired
    /// on every call rather than once at `DoneHeaders`, since a `Box<dyn
    /// BodyProcessor>` field can't hold a closure that borrows `self` back.
    fn drive_body_processor(&mut self, buf: &[u8], allow_lf: bool) -> Result<i64, ParseError> {
        let data_chunks: Rc<RefCell<Vec<Vec<u8>>>> = Rc::new(RefCell::new(Vec::new()));
        let finished = Rc::new(RefCell::new(false));
        let error: Rc<RefCell<Option<ParseError>>> = Rc::new(RefCell::new(None));

        let processor = self
            .body_processor
            .as_mut()
            .ok_or(ParseError::BodyProcessorRequired)?;

        {
            let data_chunks = data_chunks.clone();
            processor.on_data(Box::new(move |chunk| {
                data_chunks.borrow_mut().push(chunk.to_vec());
            }));
        }
        {
            let finished = finished.clone();
            processor.on_finished(Box::new(move || *finished.borrow_mut() = true));
        }
        {
            let error = error.clone();
            processor.on_error(Box::new(move |err| *error.borrow_mut() = Some(err.clone())));
        }

        let ret = processor.process(buf, allow_lf);

        for chunk in data_chunks.borrow_mut().drain(..) {
            self.emitter.emit(EventKind::Data, &Event::Data(chunk));
        }
        if let Some(err) = error.borrow_mut().take() {
            return Err(err);
        }
        if *finished.borrow() {
            self.state = ParserState::Done;
        }

        Ok(ret)
    }
}
