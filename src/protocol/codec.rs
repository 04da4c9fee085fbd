//! Frame encoder and decoder
//!
//! Decoding is incremental: `Ok(None)` means the buffer does not hold a
//! complete frame yet and nothing was consumed.

use super::status::{Code, Status};
use super::types::{Method, Reply, Request, Response};
use bytes::{Buf, BufMut, Bytes, BytesMut};
use thiserror::Error;
use xxhash_rust::xxh64::xxh64;

/// Maximum frame body size (16 MB)
pub const MAX_FRAME_SIZE: usize = 16 * 1024 * 1024;

/// Length prefix size
const LEN_SIZE: usize = 4;

/// Trailing checksum size
const CHECKSUM_SIZE: usize = 8;

/// Request header: method
const REQUEST_HEAD: usize = 1;

/// Response header: code + method
const RESPONSE_HEAD: usize = 2;

/// Framing errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameError {
    #[error("frame too large: {0} bytes")]
    TooLarge(usize),

    #[error("checksum mismatch: expected {expected:#018x}, got {actual:#018x}")]
    ChecksumMismatch { expected: u64, actual: u64 },

    #[error("unknown method: 0x{0:02x}")]
    UnknownMethod(u8),

    #[error("unknown status code: {0}")]
    UnknownCode(u8),

    #[error("{method} expects {expected} fields, got {actual}")]
    FieldCount {
        method: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("invalid UTF-8 in field")]
    InvalidUtf8,

    #[error("malformed frame: {0}")]
    Malformed(&'static str),
}

// =============================================================================
// Encoding
// =============================================================================

/// Encode a request frame into `buf`
pub fn encode_request(buf: &mut BytesMut, request: &Request) -> Result<(), FrameError> {
    let head = [request.method() as u8];
    match request {
        Request::Put { key, value } => write_frame(buf, &head, &[key.as_bytes(), value.as_bytes()]),
        Request::Get { key } | Request::Delete { key } => write_frame(buf, &head, &[key.as_bytes()]),
    }
}

/// Encode a response frame into `buf`
///
/// Error responses carry a zero method byte and the status message as
/// their only field.
pub fn encode_response(buf: &mut BytesMut, response: &Response) -> Result<(), FrameError> {
    match response {
        Ok(reply) => {
            let head = [Code::Ok as u8, reply.method() as u8];
            match reply {
                Reply::Put { status } => write_frame(buf, &head, &[status.as_bytes()]),
                Reply::Get { value } => write_frame(buf, &head, &[value.as_bytes()]),
                Reply::Delete { success } => write_frame(buf, &head, &[&[*success as u8]]),
            }
        }
        Err(status) => {
            let head = [status.code() as u8, 0];
            write_frame(buf, &head, &[status.message().as_bytes()])
        }
    }
}

fn write_frame(buf: &mut BytesMut, head: &[u8], fields: &[&[u8]]) -> Result<(), FrameError> {
    let body_len = head.len()
        + 1
        + fields.iter().map(|f| LEN_SIZE + f.len()).sum::<usize>()
        + CHECKSUM_SIZE;

    if body_len > MAX_FRAME_SIZE {
        return Err(FrameError::TooLarge(body_len));
    }

    buf.reserve(LEN_SIZE + body_len);
    buf.put_u32(body_len as u32);

    let start = buf.len();
    buf.put_slice(head);
    buf.put_u8(fields.len() as u8);
    for field in fields {
        buf.put_u32(field.len() as u32);
        buf.put_slice(field);
    }

    let checksum = xxh64(&buf[start..], 0);
    buf.put_u64(checksum);

    Ok(())
}

// =============================================================================
// Decoding
// =============================================================================

/// Decode one request frame from the front of `buf`
pub fn decode_request(buf: &mut BytesMut) -> Result<Option<Request>, FrameError> {
    let (head, fields) = match read_frame(buf, REQUEST_HEAD)? {
        Some(frame) => frame,
        None => return Ok(None),
    };

    let method = Method::from_u8(head[0]).ok_or(FrameError::UnknownMethod(head[0]))?;

    let request = match method {
        Method::Put => {
            let mut fields = Fields::exact(method.name(), fields, 2)?;
            Request::Put {
                key: fields.string()?,
                value: fields.string()?,
            }
        }
        Method::Get => Request::Get {
            key: Fields::exact(method.name(), fields, 1)?.string()?,
        },
        Method::Delete => Request::Delete {
            key: Fields::exact(method.name(), fields, 1)?.string()?,
        },
    };

    Ok(Some(request))
}

/// Decode one response frame from the front of `buf`
pub fn decode_response(buf: &mut BytesMut) -> Result<Option<Response>, FrameError> {
    let (head, fields) = match read_frame(buf, RESPONSE_HEAD)? {
        Some(frame) => frame,
        None => return Ok(None),
    };

    let code = Code::from_u8(head[0]).ok_or(FrameError::UnknownCode(head[0]))?;

    if code != Code::Ok {
        let message = Fields::exact("error", fields, 1)?.string()?;
        return Ok(Some(Err(Status::new(code, message))));
    }

    let method = Method::from_u8(head[1]).ok_or(FrameError::UnknownMethod(head[1]))?;
    let mut fields = Fields::exact(method.name(), fields, 1)?;

    let reply = match method {
        Method::Put => Reply::Put {
            status: fields.string()?,
        },
        Method::Get => Reply::Get {
            value: fields.string()?,
        },
        Method::Delete => Reply::Delete {
            success: fields.boolean()?,
        },
    };

    Ok(Some(Ok(reply)))
}

/// Split one complete, checksum-verified frame off the buffer
///
/// Returns the fixed-size header and the length-prefixed fields.
fn read_frame(buf: &mut BytesMut, head_len: usize) -> Result<Option<(Bytes, Vec<Bytes>)>, FrameError> {
    if buf.len() < LEN_SIZE {
        return Ok(None);
    }

    let body_len = (&buf[..LEN_SIZE]).get_u32() as usize;

    if body_len > MAX_FRAME_SIZE {
        return Err(FrameError::TooLarge(body_len));
    }
    if body_len < head_len + 1 + CHECKSUM_SIZE {
        return Err(FrameError::Malformed("frame shorter than its header"));
    }

    if buf.len() < LEN_SIZE + body_len {
        buf.reserve(LEN_SIZE + body_len - buf.len());
        return Ok(None);
    }

    buf.advance(LEN_SIZE);
    let mut body = buf.split_to(body_len).freeze();
    let mut payload = body.split_to(body_len - CHECKSUM_SIZE);

    let expected = body.get_u64();
    let actual = xxh64(&payload, 0);
    if expected != actual {
        return Err(FrameError::ChecksumMismatch { expected, actual });
    }

    let head = payload.split_to(head_len);
    let count = payload.get_u8() as usize;

    let mut fields = Vec::with_capacity(count);
    for _ in 0..count {
        if payload.remaining() < LEN_SIZE {
            return Err(FrameError::Malformed("truncated field length"));
        }
        let len = payload.get_u32() as usize;
        if payload.remaining() < len {
            return Err(FrameError::Malformed("truncated field"));
        }
        fields.push(payload.split_to(len));
    }

    if payload.has_remaining() {
        return Err(FrameError::Malformed("trailing bytes after fields"));
    }

    Ok(Some((head, fields)))
}

/// Typed access to the fields of one frame
struct Fields {
    fields: std::vec::IntoIter<Bytes>,
}

impl Fields {
    fn exact(method: &'static str, fields: Vec<Bytes>, expected: usize) -> Result<Self, FrameError> {
        if fields.len() != expected {
            return Err(FrameError::FieldCount {
                method,
                expected,
                actual: fields.len(),
            });
        }
        Ok(Fields {
            fields: fields.into_iter(),
        })
    }

    fn next(&mut self) -> Result<Bytes, FrameError> {
        self.fields.next().ok_or(FrameError::Malformed("missing field"))
    }

    fn string(&mut self) -> Result<String, FrameError> {
        String::from_utf8(self.next()?.to_vec()).map_err(|_| FrameError::InvalidUtf8)
    }

    fn boolean(&mut self) -> Result<bool, FrameError> {
        match self.next()?.as_ref() {
            [0] => Ok(false),
            [1] => Ok(true),
            _ => Err(FrameError::Malformed("invalid boolean field")),
        }
    }
}
