//! RPC wire protocol
//!
//! This module handles the message types, status codes and binary framing
//! shared by the RPC server and the RPC client.
//!
//! ## Frame Format
//! ```text
//! request : len(u32) | method(u8) | nfields(u8) | fields... | xxh64(u64)
//! response: len(u32) | code(u8)   | method(u8)  | nfields(u8) | fields... | xxh64(u64)
//! field   : flen(u32) | bytes
//! ```
//!
//! All integers are big-endian. `len` counts every byte after itself and the
//! checksum covers everything between `len` and the checksum.

mod codec;
mod connection;
mod status;
mod types;

pub use codec::{decode_request, decode_response, encode_request, encode_response, FrameError, MAX_FRAME_SIZE};
pub use connection::{Connection, ConnectionError};
pub use status::{Code, Status};
pub use types::{Method, Reply, Request, Response};
