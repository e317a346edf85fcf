//! SCGI request reader.
//!
//! # Responsibilities
//! - Read the netstring-framed header block (`<len>:<pairs>,`)
//! - Decode NUL-separated name/value pairs
//! - Read exactly `CONTENT_LENGTH` body bytes
//! - Enforce header and body size limits before allocating

use std::collections::HashMap;
use std::io::{self, BufReader, Read};

use crate::protocol::Request;

/// Longest accepted netstring length prefix, in digits.
const MAX_LENGTH_DIGITS: usize = 10;

/// Errors raised while reading a request.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("connection error: {0}")]
    Io(#[from] io::Error),

    #[error("connection closed before a request arrived")]
    Empty,

    #[error("invalid netstring length prefix")]
    InvalidLength,

    #[error("header block of {len} bytes exceeds limit of {max}")]
    HeaderTooLarge { len: usize, max: usize },

    #[error("header block not terminated by ','")]
    MissingTerminator,

    #[error("malformed header block")]
    MalformedHeaders,

    #[error("CONTENT_LENGTH header missing")]
    MissingContentLength,

    #[error("invalid CONTENT_LENGTH {0:?}")]
    InvalidContentLength(String),

    #[error("body of {len} bytes exceeds limit of {max}")]
    BodyTooLarge { len: usize, max: usize },

    #[error("REQUEST_METHOD header missing")]
    MissingMethod,
}

/// Size bounds applied while reading a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestLimits {
    pub max_header_bytes: usize,
    pub max_body_bytes: usize,
}

impl Default for RequestLimits {
    fn default() -> Self {
        Self {
            max_header_bytes: 64 * 1024,
            max_body_bytes: 1024 * 1024,
        }
    }
}

/// Block until one complete request has been read from `conn`.
pub fn read_request<R: Read>(conn: R, limits: &RequestLimits) -> Result<Request, ProtocolError> {
    let mut reader = BufReader::new(conn);

    let len = read_length(&mut reader)?;
    if len > limits.max_header_bytes {
        return Err(ProtocolError::HeaderTooLarge {
            len,
            max: limits.max_header_bytes,
        });
    }

    let mut block = vec![0u8; len];
    reader.read_exact(&mut block)?;
    let mut terminator = [0u8; 1];
    reader.read_exact(&mut terminator)?;
    if terminator[0] != b',' {
        return Err(ProtocolError::MissingTerminator);
    }

    let vars = parse_headers(&block)?;

    let raw_length = vars
        .get("CONTENT_LENGTH")
        .ok_or(ProtocolError::MissingContentLength)?;
    let content_length: usize = raw_length
        .trim()
        .parse()
        .map_err(|_| ProtocolError::InvalidContentLength(raw_length.clone()))?;
    if content_length > limits.max_body_bytes {
        return Err(ProtocolError::BodyTooLarge {
            len: content_length,
            max: limits.max_body_bytes,
        });
    }

    let mut body = vec![0u8; content_length];
    reader.read_exact(&mut body)?;

    Request::from_vars(vars, body).ok_or(ProtocolError::MissingMethod)
}

fn read_length<R: Read>(reader: &mut R) -> Result<usize, ProtocolError> {
    let mut digits = 0usize;
    let mut len = 0usize;
    let mut byte = [0u8; 1];

    loop {
        match reader.read(&mut byte) {
            Ok(0) if digits == 0 => return Err(ProtocolError::Empty),
            Ok(0) => return Err(io::Error::from(io::ErrorKind::UnexpectedEof).into()),
            Ok(_) => {}
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }

        match byte[0] {
            b':' if digits > 0 => return Ok(len),
            b @ b'0'..=b'9' if digits < MAX_LENGTH_DIGITS => {
                len = len * 10 + usize::from(b - b'0');
                digits += 1;
            }
            _ => return Err(ProtocolError::InvalidLength),
        }
    }
}

fn parse_headers(block: &[u8]) -> Result<HashMap<String, String>, ProtocolError> {
    let Some((&0, pairs)) = block.split_last() else {
        return Err(ProtocolError::MalformedHeaders);
    };

    let fields: Vec<&[u8]> = pairs.split(|b| *b == 0).collect();
    if fields.len() % 2 != 0 {
        return Err(ProtocolError::MalformedHeaders);
    }

    let mut vars = HashMap::with_capacity(fields.len() / 2);
    for pair in fields.chunks_exact(2) {
        if pair[0].is_empty() {
            return Err(ProtocolError::MalformedHeaders);
        }
        let name = String::from_utf8_lossy(pair[0]).into_owned();
        let value = String::from_utf8_lossy(pair[1]).into_owned();
        vars.entry(name).or_insert(value);
    }
    Ok(vars)
}

/// Frame a request the way a front-end server would.
///
/// `CONTENT_LENGTH` is always sent first and derived from `body`.
pub fn encode_request(vars: &[(&str, &str)], body: &[u8]) -> Vec<u8> {
    let mut block = Vec::new();
    let length = body.len().to_string();
    for (name, value) in std::iter::once(&("CONTENT_LENGTH", length.as_str())).chain(vars) {
        block.extend_from_slice(name.as_bytes());
        block.push(0);
        block.extend_from_slice(value.as_bytes());
        block.push(0);
    }

    let mut framed = format!("{}:", block.len()).into_bytes();
    framed.extend_from_slice(&block);
    framed.push(b',');
    framed.extend_from_slice(body);
    framed
}
