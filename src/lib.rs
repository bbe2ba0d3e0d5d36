//! # WireFrame
//!
//! A **strict, streaming HTTP/1.1 message parser** implemented as an
//! event-driven state machine, designed for use both as a Rust library and
//! as a CLI tool.
//!
//! WireFrame processes HTTP requests and responses incrementally
//! (byte-by-byte or in arbitrarily-sized chunks), making it suitable for
//! both synchronous and asynchronous transport layers. It follows
//! **RFC 9112** and supports both `Content-Length` and chunked transfer
//! encoding bodies.
//!
//! ## Quick start — one-shot parsing
//!
//! ```rust
//! use wireframe::parse_request;
//!
//! let raw = b"GET /hello HTTP/1.1\r\nHost: example.com\r\n\r\n";
//! let request = parse_request(raw).expect("valid request");
//! assert_eq!(request.method.as_deref(), Some("GET"));
//! assert_eq!(request.uri.as_deref(), Some("/hello"));
//! ```
//!
//! ## Quick start — incremental parsing
//!
//! ```rust
//! use wireframe::{MessageParser, Strictness};
//!
//! let mut parser = MessageParser::new(Strictness::Normal, false);
//! parser.has_body(Some(false));
//!
//! let n = parser.process(b"GET / HTTP/1.1\r\n");
//! assert!(n >= 0 && !parser.finished());
//!
//! let n = parser.process(b"Host: example.com\r\n\r\n");
//! assert!(n >= 0 && parser.finished());
//! ```

mod body;
mod charclass;
mod error;
mod event;
mod newline;
mod output;
mod parser;
mod types;

use std::cell::RefCell;
use std::rc::Rc;

pub use body::{BodyProcessor, ChunkedProcessor, FixedLenProcessor};
pub use error::ParseError;
pub use event::{Event, EventEmitter, EventKind, ListenerId};
pub use newline::Newline;
pub use output::{format_debug, format_headers_only, format_json};
pub use parser::{MessageParser, ParserConfig, ParserState, Strictness};
pub use types::{Header, HttpVersion, ParsedMessage};

/// Feed `data` through a fresh [`MessageParser`], collecting every emitted
/// field into a [`ParsedMessage`]. Used by [`parse_request`]/[`parse_response`]
/// and their `_with_config` variants: this is the one-shot convenience layer
/// built on top of the streaming API, not a separate parsing path.
fn collect_message(
    data: &[u8],
    strictness: Strictness,
    is_response: bool,
    config: ParserConfig,
) -> Result<ParsedMessage, ParseError> {
    let mut parser = MessageParser::with_config(strictness, is_response, config);

    let message = Rc::new(RefCell::new(ParsedMessage::default()));
    let pending_header_name: Rc<RefCell<Option<String>>> = Rc::new(RefCell::new(None));
    let error: Rc<RefCell<Option<ParseError>>> = Rc::new(RefCell::new(None));

    {
        let m = message.clone();
        parser.on(
            EventKind::ReqMethod,
            Box::new(move |e| {
                if let Event::ReqMethod(v) = e {
                    m.borrow_mut().method = Some(v.clone());
                }
            }),
        );
    }
    {
        let m = message.clone();
        parser.on(
            EventKind::ReqUri,
            Box::new(move |e| {
                if let Event::ReqUri(v) = e {
                    m.borrow_mut().uri = Some(v.clone());
                }
            }),
        );
    }
    {
        let m = message.clone();
        parser.on(
            EventKind::Version,
            Box::new(move |e| {
                if let Event::Version(major, minor) = e {
                    m.borrow_mut().version = Some(HttpVersion(*major, *minor));
                }
            }),
        );
    }
    {
        let m = message.clone();
        parser.on(
            EventKind::StatusCode,
            Box::new(move |e| {
                if let Event::StatusCode(v) = e {
                    m.borrow_mut().status_code = Some(*v);
                }
            }),
        );
    }
    {
        let m = message.clone();
        parser.on(
            EventKind::Reason,
            Box::new(move |e| {
                if let Event::Reason(v) = e {
                    m.borrow_mut().reason = Some(v.clone());
                }
            }),
        );
    }
    {
        let pending = pending_header_name.clone();
        parser.on(
            EventKind::HeaderName,
            Box::new(move |e| {
                if let Event::HeaderName(v) = e {
                    *pending.borrow_mut() = Some(v.clone());
                }
            }),
        );
    }
    {
        let m = message.clone();
        let pending = pending_header_name.clone();
        parser.on(
            EventKind::HeaderValue,
            Box::new(move |e| {
                if let Event::HeaderValue(value) = e {
                    let name = pending
                        .borrow_mut()
                        .take()
                        .expect("header value always follows a header name");
                    m.borrow_mut().headers.push(Header {
                        name,
                        value: value.clone(),
                    });
                }
            }),
        );
    }
    {
        let e = error.clone();
        parser.on(
            EventKind::Error,
            Box::new(move |ev| {
                if let Event::Error(err) = ev {
                    *e.borrow_mut() = Some(err.clone());
                }
            }),
        );
    }

    // `has_body` stays false: the convenience layer determines body framing
    // from the collected headers only once the start line and headers have
    // finished, then drives a body processor directly over the remainder.
    let consumed = parser.process(data);
    if consumed == -1 {
        return Err(error
            .borrow_mut()
            .take()
            .unwrap_or(ParseError::Length("parse failed with no recorded error".into())));
    }
    let finished = parser.finished();

    // Drop the parser (and the listener closures it owns) before unwrapping
    // `message` -- otherwise those closures still hold a clone of the `Rc`
    // and `try_unwrap` would fail.
    drop(parser);

    if !finished {
        return Err(ParseError::Length(
            "message incomplete: missing terminating blank line".into(),
        ));
    }

    let mut message = Rc::try_unwrap(message)
        .map(RefCell::into_inner)
        .unwrap_or_default();

    let remainder = &data[consumed as usize..];
    message.body = collect_body(&message, remainder, strictness.allows_lf())?;

    Ok(message)
}

/// Drive a fresh body processor (chosen from the message's headers) over
/// `remainder`, returning the fully assembled body.
fn collect_body(
    message: &ParsedMessage,
    remainder: &[u8],
    allow_lf: bool,
) -> Result<Vec<u8>, ParseError> {
    let body = Rc::new(RefCell::new(Vec::new()));
    let error: Rc<RefCell<Option<ParseError>>> = Rc::new(RefCell::new(None));

    if message.is_chunked() {
        let mut processor = ChunkedProcessor::new();
        {
            let b = body.clone();
            processor.on_data(Box::new(move |chunk| b.borrow_mut().extend_from_slice(chunk)));
        }
        {
            let e = error.clone();
            processor.on_error(Box::new(move |err| *e.borrow_mut() = Some(err.clone())));
        }
        if processor.process(remainder, allow_lf) == -1 {
            return Err(error
                .borrow_mut()
                .take()
                .unwrap_or(ParseError::Length("chunked body failed with no recorded error".into())));
        }
    } else if let Some(len) = message.content_length()
        && len > 0
    {
        let mut processor = FixedLenProcessor::new(len);
        {
            let b = body.clone();
            processor.on_data(Box::new(move |chunk| b.borrow_mut().extend_from_slice(chunk)));
        }
        {
            let e = error.clone();
            processor.on_error(Box::new(move |err| *e.borrow_mut() = Some(err.clone())));
        }
        if processor.process(remainder, allow_lf) == -1 {
            return Err(error.borrow_mut().take().unwrap_or(ParseError::Length(
                "fixed-length body failed with no recorded error".into(),
            )));
        }
        if processor.received_len() != processor.expected_len() {
            return Err(ParseError::Length("body shorter than Content-Length".into()));
        }
    }

    Ok(Rc::try_unwrap(body).map(RefCell::into_inner).unwrap_or_default())
}

impl Strictness {
    fn allows_lf(self) -> bool {
        self != Strictness::Strict
    }
}

/// Parse a **complete** HTTP request from a byte slice in one call.
///
/// This is a convenience wrapper around [`MessageParser`]: for incremental
/// or streaming use-cases, drive a `MessageParser` directly.
///
/// # Errors
///
/// Returns [`ParseError`] if the data is malformed or incomplete.
pub fn parse_request(data: &[u8]) -> Result<ParsedMessage, ParseError> {
    collect_message(data, Strictness::Normal, false, ParserConfig::default())
}

/// Parse a **complete** HTTP request using custom strictness and limits.
///
/// # Errors
///
/// Returns [`ParseError`] if the data is malformed, incomplete, or exceeds
/// the configured limits.
pub fn parse_request_with_config(
    data: &[u8],
    strictness: Strictness,
    config: ParserConfig,
) -> Result<ParsedMessage, ParseError> {
    collect_message(data, strictness, false, config)
}

/// Parse a **complete** HTTP response from a byte slice in one call.
///
/// # Errors
///
/// Returns [`ParseError`] if the data is malformed or incomplete.
pub fn parse_response(data: &[u8]) -> Result<ParsedMessage, ParseError> {
    collect_message(data, Strictness::Normal, true, ParserConfig::default())
}

/// Parse a **complete** HTTP response using custom strictness and limits.
///
/// # Errors
///
/// Returns [`ParseError`] if the data is malformed, incomplete, or exceeds
/// the configured limits.
pub fn parse_response_with_config(
    data: &[u8],
    strictness: Strictness,
    config: ParserConfig,
) -> Result<ParsedMessage, ParseError> {
    collect_message(data, strictness, true, config)
}
