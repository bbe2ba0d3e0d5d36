use std::fmt;

/// Errors raised while parsing a HTTP/1.1 message or body.
///
/// Every variant carries a stable, short error code (see [`ParseError::code`]).
/// Once any variant is raised from [`crate::MessageParser::process`] or a
/// body processor's `process`, that instance becomes absorbing: every
/// further call returns `-1` without emitting further events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// A bare CR was found where a newline terminator was expected, or a
    /// bare LF was found while strictness forbids LF-only terminators.
    Newline(String),
    /// The HTTP version string did not match `HTTP/1.0` or `HTTP/1.1`.
    InvalidVersion(String),
    /// A byte was encountered that is not valid at the current position
    /// (e.g. a non-space where a single space separator is required).
    UnexpectedChar(String),
    /// The status line's status code is not three decimal digits, or the
    /// reason phrase contains disallowed bytes or exceeds its size limit.
    InvalidStatus(String),
    /// A method, header name, or other token contains a non-token byte, or
    /// exceeds its configured length limit.
    InvalidToken(String),
    /// The request URI contains a disallowed byte, is empty, or exceeds
    /// its configured length limit.
    InvalidUri(String),
    /// A header value contains disallowed bytes, or exceeds its configured
    /// size limit.
    InvalidHeaderVal(String),
    /// A chunk's terminating newline was missing or malformed.
    InvalidChunk(String),
    /// A chunk-size line was not valid hexadecimal, or exceeded the maximum
    /// chunk size or digit count.
    InvalidChunkSize(String),
    /// Chunk extensions exceeded the configured maximum size before a
    /// newline was found.
    InvalidChunkExtensions(String),
    /// `process` was called after the parser/processor already finished.
    Done,
    /// `has_body` is set but no body processor was installed before the
    /// headers finished.
    BodyProcessorRequired,
    /// A length-related invariant was violated.
    Length(String),
}

impl ParseError {
    /// Stable, short error code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Newline(_) => "ENEWLINE",
            Self::InvalidVersion(_) => "EHTTPVER",
            Self::UnexpectedChar(_) => "ECHAR",
            Self::InvalidStatus(_) => "ESTATUS",
            Self::InvalidToken(_) => "ETOKEN",
            Self::InvalidUri(_) => "EURICHAR",
            Self::InvalidHeaderVal(_) => "EHEADERVAL",
            Self::InvalidChunk(_) => "ECHUNK",
            Self::InvalidChunkSize(_) => "ECHUNKSIZE",
            Self::InvalidChunkExtensions(_) => "ECHUNKEXTS",
            Self::Done => "EDONE",
            Self::BodyProcessorRequired => "EBODYPROCESSOR",
            Self::Length(_) => "ELENGTH",
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Newline(m) => write!(f, "[{}] {m}", self.code()),
            Self::InvalidVersion(m) => write!(f, "[{}] invalid HTTP version: {m}", self.code()),
            Self::UnexpectedChar(m) => write!(f, "[{}] {m}", self.code()),
            Self::InvalidStatus(m) => write!(f, "[{}] {m}", self.code()),
            Self::InvalidToken(m) => write!(f, "[{}] {m}", self.code()),
            Self::InvalidUri(m) => write!(f, "[{}] invalid request URI: {m}", self.code()),
            Self::InvalidHeaderVal(m) => write!(f, "[{}] {m}", self.code()),
            Self::InvalidChunk(m) => write!(f, "[{}] {m}", self.code()),
            Self::InvalidChunkSize(m) => write!(f, "[{}] invalid chunk size: {m}", self.code()),
            Self::InvalidChunkExtensions(m) => write!(f, "[{}] {m}", self.code()),
            Self::Done => write!(f, "[{}] parser already finished", self.code()),
            Self::BodyProcessorRequired => {
                write!(f, "[{}] body processor required but not set", self.code())
            }
            Self::Length(m) => write!(f, "[{}] {m}", self.code()),
        }
    }
}

impl std::error::Error for ParseError {}
