//! Framed TCP connection
//!
//! Wraps a socket with read and write buffers and moves whole frames in
//! and out of it. Used by both ends of the RPC link.

use super::codec::{decode_request, decode_response, encode_request, encode_response, FrameError};
use super::types::{Request, Response};
use bytes::BytesMut;
use std::io;
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpStream, ToSocketAddrs};
use tracing::trace;

/// Transport errors on a framed connection
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    #[error("protocol error: {0}")]
    Frame(#[from] FrameError),

    /// Peer closed the socket in the middle of a frame
    #[error("connection reset by peer")]
    Reset,

    /// Peer closed the socket before answering
    #[error("connection closed before a response was received")]
    Closed,
}

/// Framed connection
pub struct Connection {
    /// TCP stream
    stream: TcpStream,

    /// Read buffer
    read_buffer: BytesMut,

    /// Write buffer
    write_buffer: BytesMut,
}

impl Connection {
    /// Create a new connection handler
    pub fn new(stream: TcpStream) -> Self {
        Connection {
            stream,
            read_buffer: BytesMut::with_capacity(4096),
            write_buffer: BytesMut::with_capacity(4096),
        }
    }

    /// Dial a server
    pub async fn connect(addr: impl ToSocketAddrs) -> io::Result<Self> {
        let stream = TcpStream::connect(addr).await?;
        stream.set_nodelay(true)?;
        Ok(Self::new(stream))
    }

    /// Give back the underlying socket
    pub fn into_inner(self) -> TcpStream {
        self.stream
    }

    /// Check, without blocking, whether an idle connection is still usable
    ///
    /// A hung-up peer, a socket error or unsolicited bytes all mean the
    /// connection is out of step with the server.
    pub fn is_closed(&self) -> bool {
        let mut scratch = [0u8; 1];
        match self.stream.try_read(&mut scratch) {
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => false,
            Ok(_) | Err(_) => true,
        }
    }

    /// Read the next request
    ///
    /// Returns `Ok(None)` when the peer closed the connection cleanly
    /// between frames.
    pub async fn read_request(&mut self) -> Result<Option<Request>, ConnectionError> {
        self.read_frame(decode_request).await
    }

    /// Read the response to the last request sent
    pub async fn read_response(&mut self) -> Result<Response, ConnectionError> {
        self.read_frame(decode_response)
            .await?
            .ok_or(ConnectionError::Closed)
    }

    pub async fn write_request(&mut self, request: &Request) -> Result<(), ConnectionError> {
        self.write_buffer.clear();
        encode_request(&mut self.write_buffer, request)?;
        self.flush_buffer().await
    }

    pub async fn write_response(&mut self, response: &Response) -> Result<(), ConnectionError> {
        self.write_buffer.clear();
        encode_response(&mut self.write_buffer, response)?;
        self.flush_buffer().await
    }

    async fn read_frame<T>(
        &mut self,
        decode: fn(&mut BytesMut) -> Result<Option<T>, FrameError>,
    ) -> Result<Option<T>, ConnectionError> {
        loop {
            // A previous read may already hold the next frame
            if let Some(frame) = decode(&mut self.read_buffer)? {
                return Ok(Some(frame));
            }

            let n = self.stream.read_buf(&mut self.read_buffer).await?;

            // Connection closed
            if n == 0 {
                if self.read_buffer.is_empty() {
                    return Ok(None);
                } else {
                    return Err(ConnectionError::Reset);
                }
            }

            trace!("Read {} bytes", n);
        }
    }

    async fn flush_buffer(&mut self) -> Result<(), ConnectionError> {
        self.stream.write_all(&self.write_buffer).await?;
        self.stream.flush().await?;
        Ok(())
    }
}
