//! Request/response transport
//!
//! `TcpTransport` opens a fresh connection per exchange and closes it when
//! the exchange finishes or its future is dropped. Anything that can carry
//! one line out and one line back (a pooled connection, an in-memory fake)
//! can stand in through the `Transport` trait.

use async_trait::async_trait;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

use crate::types::NodeEndpoint;

/// Failures below the protocol layer. All but `NotUtf8` say nothing about
/// the server's answer.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("connect failed: {0}")]
    Connect(String),

    #[error("i/o error: {0}")]
    Io(String),

    #[error("connection closed before a response arrived")]
    Closed,

    #[error("response exceeded {0} bytes")]
    TooLarge(usize),

    #[error("response is not valid UTF-8")]
    NotUtf8,
}

#[async_trait]
pub trait Transport: Send + Sync {
    /// Send `request_line` (already newline-terminated) and return the first
    /// response line, at most `max_response_bytes` long.
    async fn exchange(
        &self,
        endpoint: &NodeEndpoint,
        request_line: &str,
        max_response_bytes: usize,
    ) -> Result<String, TransportError>;
}

/// Plain TCP, one connection per request
#[derive(Debug, Default, Clone, Copy)]
pub struct TcpTransport;

#[async_trait]
impl Transport for TcpTransport {
    async fn exchange(
        &self,
        endpoint: &NodeEndpoint,
        request_line: &str,
        max_response_bytes: usize,
    ) -> Result<String, TransportError> {
        let mut stream = TcpStream::connect(endpoint.socket_addr())
            .await
            .map_err(|e| TransportError::Connect(e.to_string()))?;
        stream
            .write_all(request_line.as_bytes())
            .await
            .map_err(|e| TransportError::Io(e.to_string()))?;
        stream.flush().await.map_err(|e| TransportError::Io(e.to_string()))?;

        let mut reader = BufReader::new(stream);
        let mut buf = Vec::new();
        let read = (&mut reader)
            .take(max_response_bytes as u64 + 1)
            .read_until(b'\n', &mut buf)
            .await
            .map_err(|e| TransportError::Io(e.to_string()))?;

        // Best effort; the socket is dropped either way
        let _ = reader.into_inner().shutdown().await;

        if read == 0 {
            return Err(TransportError::Closed);
        }
        if buf.last() == Some(&b'\n') {
            buf.pop();
        }
        if buf.len() > max_response_bytes {
            return Err(TransportError::TooLarge(max_response_bytes));
        }
        String::from_utf8(buf).map_err(|_| TransportError::NotUtf8)
    }
}
