//! Newline classification and scanning.
//!
//! A bare CR is never a valid terminator: it must always be followed by LF.
//! Whether a bare LF is accepted as a terminator on its own is controlled by
//! the caller-supplied `allow_lf` flag (false only under [`crate::Strictness::Strict`]).

use crate::error::ParseError;

const CR: u8 = b'\r';
const LF: u8 = b'\n';

/// Which kind of newline terminator was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Newline {
    /// A bare `\n`.
    Lf,
    /// `\r\n`.
    CrLf,
}

impl Newline {
    /// Number of bytes this newline occupies (1 for LF, 2 for CRLF).
    pub fn len(&self) -> usize {
        match self {
            Self::Lf => 1,
            Self::CrLf => 2,
        }
    }

    /// Never empty; kept for clippy's `len_without_is_empty`.
    pub fn is_empty(&self) -> bool {
        false
    }
}

/// Does `buf` begin with a newline?
///
/// Returns:
/// - `Ok(None)` if `buf` is empty, or begins with CR but has fewer than two
///   bytes total (the terminating LF may arrive in a later fragment).
/// - `Ok(Some(None))` if `buf` does not begin with a newline at all.
/// - `Ok(Some(Some(Newline::Lf)))` / `Ok(Some(Some(Newline::CrLf)))` on a match.
/// - `Err(ParseError::Newline(_))` if `buf` begins with a bare CR (CR not
///   followed by LF), or begins with LF while `allow_lf` is false.
#[allow(clippy::type_complexity)]
pub fn starts_with_newline(
    buf: &[u8],
    allow_lf: bool,
) -> Result<Option<Option<Newline>>, ParseError> {
    let Some(&first) = buf.first() else {
        return Ok(None);
    };

    if first == CR {
        let Some(&second) = buf.get(1) else {
            // Incomplete: the LF may still be on its way.
            return Ok(None);
        };
        if second != LF {
            return Err(ParseError::Newline(
                "expected CRLF, received bare CR".into(),
            ));
        }
        return Ok(Some(Some(Newline::CrLf)));
    }

    if first == LF {
        if !allow_lf {
            return Err(ParseError::Newline("CRLF is required".into()));
        }
        return Ok(Some(Some(Newline::Lf)));
    }

    Ok(Some(None))
}

/// Scan `buf` for the earliest newline terminator.
///
/// Returns `Ok(None)` if no newline was found in the currently-available
/// bytes (more data may still produce one). Returns `Ok(Some((index, kind)))`
/// on a match; `index` is the offset of the first byte of the terminator
/// (the CR for `CrLf`, the LF for `Lf`). Returns `Err` on a bare CR (CR not
/// immediately followed by LF), or on a bare LF when `allow_lf` is false.
///
/// Ties are resolved in favor of reporting `CrLf` at the CR's index, since a
/// CRLF pair's LF would otherwise also match as a standalone LF at a later
/// index.
pub fn find_newline(buf: &[u8], allow_lf: bool) -> Result<Option<(usize, Newline)>, ParseError> {
    let lf_index = buf.iter().position(|&b| b == LF);
    let cr_index = buf.iter().position(|&b| b == CR);

    match (cr_index, lf_index) {
        (Some(cr), lf) => {
            // A CR was found. If it's the very last byte, the matching LF
            // (if any) may not have arrived yet.
            if cr == buf.len() - 1 {
                return Ok(None);
            }
            if buf[cr + 1] != LF {
                return Err(ParseError::Newline(
                    "expected CRLF, received bare CR".into(),
                ));
            }
            // The CR's matching LF is at cr + 1. If some other bare LF
            // appears earlier than the CR, that earlier LF wins.
            if let Some(lf) = lf {
                if lf < cr {
                    if !allow_lf {
                        return Err(ParseError::Newline("CRLF is required".into()));
                    }
                    return Ok(Some((lf, Newline::Lf)));
                }
            }
            Ok(Some((cr, Newline::CrLf)))
        }
        (None, Some(lf)) => {
            if !allow_lf {
                return Err(ParseError::Newline("CRLF is required".into()));
            }
            Ok(Some((lf, Newline::Lf)))
        }
        (None, None) => Ok(None),
    }
}
