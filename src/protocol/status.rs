//! RPC status codes

use crate::store::StoreError;
use std::fmt;
use thiserror::Error;

/// Status code carried by every response frame
///
/// Numeric values follow the gRPC code table so that callers used to it
/// read them the same way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Code {
    Ok = 0,
    InvalidArgument = 3,
    NotFound = 5,
    Internal = 13,
}

impl Code {
    /// Convert from u8
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Code::Ok),
            3 => Some(Code::InvalidArgument),
            5 => Some(Code::NotFound),
            13 => Some(Code::Internal),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Code::Ok => "ok",
            Code::InvalidArgument => "invalid argument",
            Code::NotFound => "not found",
            Code::Internal => "internal",
        }
    }
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failed RPC outcome: a code plus a human readable message
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{code}: {message}")]
pub struct Status {
    code: Code,
    message: String,
}

impl Status {
    pub fn new(code: Code, message: impl Into<String>) -> Self {
        Status {
            code,
            message: message.into(),
        }
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(Code::InvalidArgument, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(Code::NotFound, message)
    }

    /// Transport, framing and timeout failures
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(Code::Internal, message)
    }

    pub fn code(&self) -> Code {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<StoreError> for Status {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::InvalidArgument(msg) => Status::invalid_argument(msg),
            StoreError::NotFound => Status::not_found(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_round_trip() {
        for code in [Code::Ok, Code::InvalidArgument, Code::NotFound, Code::Internal] {
            assert_eq!(Code::from_u8(code as u8), Some(code));
        }
        assert_eq!(Code::from_u8(1), None);
    }

    #[test]
    fn test_store_error_mapping() {
        let status = Status::from(StoreError::InvalidArgument("key is required"));
        assert_eq!(status.code(), Code::InvalidArgument);
        assert_eq!(status.message(), "key is required");

        let status = Status::from(StoreError::NotFound);
        assert_eq!(status.code(), Code::NotFound);
        assert_eq!(status.to_string(), "not found: key not found");
    }
}
