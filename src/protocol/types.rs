//! RPC message types

use super::status::Status;
use std::fmt;

/// Remote procedure identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Method {
    Put = 1,
    Get = 2,
    Delete = 3,
}

impl Method {
    /// Convert from u8
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(Method::Put),
            2 => Some(Method::Get),
            3 => Some(Method::Delete),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Method::Put => "Put",
            Method::Get => "Get",
            Method::Delete => "Delete",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A call on the store service
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    Put { key: String, value: String },
    Get { key: String },
    Delete { key: String },
}

impl Request {
    pub fn method(&self) -> Method {
        match self {
            Request::Put { .. } => Method::Put,
            Request::Get { .. } => Method::Get,
            Request::Delete { .. } => Method::Delete,
        }
    }

    pub fn key(&self) -> &str {
        match self {
            Request::Put { key, .. } | Request::Get { key } | Request::Delete { key } => key,
        }
    }
}

/// Successful payload of a call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Status confirmation, "OK"
    Put { status: String },
    Get { value: String },
    Delete { success: bool },
}

impl Reply {
    pub fn method(&self) -> Method {
        match self {
            Reply::Put { .. } => Method::Put,
            Reply::Get { .. } => Method::Get,
            Reply::Delete { .. } => Method::Delete,
        }
    }
}

/// Outcome of a call as seen on the wire
pub type Response = Result<Reply, Status>;
